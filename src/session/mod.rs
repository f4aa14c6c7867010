use serde::{Deserialize, Serialize};

mod store;

pub use store::{ClientId, SessionStore};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated,
}

/// Which form an anonymous client is looking at.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Login,
    Register,
}

/// What the client should render next.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum View {
    Login,
    Register,
    Home { username: String },
}

/// Per-client authentication context. Handlers get one of these explicitly;
/// nothing here is shared between clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    state: SessionState,
    username: Option<String>,
    auth_mode: AuthMode,
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn authenticate(&mut self, username: impl Into<String>) {
        self.state = SessionState::Authenticated;
        self.username = Some(username.into());
    }

    /// Back to the initial anonymous session.
    pub fn logout(&mut self) {
        *self = Self::default();
    }

    /// Returns false when the session is authenticated and the mode was left alone.
    #[must_use]
    pub fn set_auth_mode(&mut self, mode: AuthMode) -> bool {
        if self.is_authenticated() {
            return false;
        }
        self.auth_mode = mode;
        true
    }

    pub fn view(&self) -> View {
        match (&self.state, &self.username) {
            (SessionState::Authenticated, Some(username)) => View::Home {
                username: username.clone(),
            },
            _ => match self.auth_mode {
                AuthMode::Login => View::Login,
                AuthMode::Register => View::Register,
            },
        }
    }
}
