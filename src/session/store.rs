use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, warn};

use super::Session;

/// Opaque id a UI instance picks for itself and sends on every request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Rejects blank ids and anything longer than 128 bytes.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.len() > 128 {
            return None;
        }
        Some(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Exclusive hold on one client's session. Requests from the same client
/// queue behind it; other clients are unaffected.
pub type SessionGuard = OwnedMutexGuard<Session>;

struct Slot {
    session: Arc<Mutex<Session>>,
    last_seen: u64,
}

impl Slot {
    /// Nobody holds the session and nobody is waiting for it.
    fn is_idle(&self) -> bool {
        Arc::strong_count(&self.session) == 1 && self.session.try_lock().is_ok()
    }

    fn is_initial(&self) -> bool {
        self.session
            .try_lock()
            .map(|s| *s == Session::default())
            .unwrap_or(false)
    }
}

#[derive(Default)]
struct Slots {
    map: HashMap<ClientId, Slot>,
    clock: u64,
}

impl Slots {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Drop idle sessions until there is space for one more. Initial-state
    /// sessions go first, then the least recently used.
    fn make_room(&mut self, capacity: usize) {
        self.map.retain(|_, slot| !(slot.is_idle() && slot.is_initial()));
        while self.map.len() >= capacity {
            let victim = self
                .map
                .iter()
                .filter(|(_, slot)| slot.is_idle())
                .min_by_key(|(_, slot)| slot.last_seen)
                .map(|(client, _)| client.clone());
            match victim {
                Some(client) => {
                    warn!(client_id = client.as_str(), "session table full; evicting");
                    self.map.remove(&client);
                }
                // every session is in use; let the table run over
                None => break,
            }
        }
    }
}

/// In-process session table, bounded by `capacity`. Lost on restart.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Slots>>,
    capacity: usize,
}

impl SessionStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Slots::default())),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of a client's session; unknown clients read as a fresh anonymous one.
    pub async fn load(&self, client: &ClientId) -> Session {
        let shared = self
            .inner
            .read()
            .await
            .map
            .get(client)
            .map(|slot| slot.session.clone());
        match shared {
            Some(session) => session.lock().await.clone(),
            None => Session::default(),
        }
    }

    /// Lock a client's session for a read-modify-write, creating it if needed.
    pub async fn acquire(&self, client: &ClientId) -> SessionGuard {
        let shared = {
            let mut slots = self.inner.write().await;
            let now = slots.tick();
            match slots.map.get_mut(client) {
                Some(slot) => {
                    slot.last_seen = now;
                    slot.session.clone()
                }
                None => {
                    if slots.map.len() >= self.capacity {
                        slots.make_room(self.capacity);
                    }
                    let session = Arc::new(Mutex::new(Session::default()));
                    slots.map.insert(
                        client.clone(),
                        Slot {
                            session: session.clone(),
                            last_seen: now,
                        },
                    );
                    debug!(client_id = client.as_str(), sessions = slots.map.len(), "session created");
                    session
                }
            }
        };
        shared.lock_owned().await
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }
}
