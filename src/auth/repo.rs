use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tracing::debug;

use crate::auth::repo_types::{NewUser, RepoError, UniqueColumn, User};

/// Narrow access to the `users` table. Rows are only ever inserted and read.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user; the store assigns `id` and `created_at`.
    async fn insert_user(&self, new_user: &NewUser) -> Result<User, RepoError>;

    /// Find the user whose username and password both match exactly.
    async fn find_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, RepoError>;

    async fn count_users(&self) -> Result<i64, RepoError>;
}

/// Postgres-backed repository. Every call holds one pooled connection for
/// the duration of a single statement; the connection goes back to the pool
/// when it is dropped, on success and on error alike.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert_user(&self, new_user: &NewUser) -> Result<User, RepoError> {
        let mut conn = self.pool.acquire().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password, created_at
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password)
        .fetch_one(&mut *conn)
        .await
        .map_err(classify_insert_error)?;
        debug!(user_id = user.id, "user row inserted");
        Ok(user)
    }

    async fn find_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, RepoError> {
        let mut conn = self.pool.acquire().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password, created_at
            FROM users
            WHERE username = $1 AND password = $2
            "#,
        )
        .bind(username)
        .bind(password)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(user)
    }

    async fn count_users(&self) -> Result<i64, RepoError> {
        let mut conn = self.pool.acquire().await?;
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }
}

/// Turn a unique-index violation into the column it collided on.
fn classify_insert_error(err: sqlx::Error) -> RepoError {
    let sqlx::Error::Database(db_err) = &err else {
        return RepoError::Database(err);
    };
    if !db_err.is_unique_violation() {
        return RepoError::Database(err);
    }
    // Prefer the constraint name, fall back to the message text.
    let hint = db_err
        .constraint()
        .map(str::to_owned)
        .unwrap_or_else(|| db_err.message().to_owned());
    match unique_column_from_hint(&hint) {
        Some(column) => RepoError::Duplicate(column),
        None => RepoError::UnknownConstraint(hint),
    }
}

pub(crate) fn unique_column_from_hint(hint: &str) -> Option<UniqueColumn> {
    let hint = hint.to_lowercase();
    if hint.contains("username") {
        Some(UniqueColumn::Username)
    } else if hint.contains("email") {
        Some(UniqueColumn::Email)
    } else {
        None
    }
}

/// Process-local store with the same uniqueness rules as the `users` table.
#[derive(Default)]
pub struct MemoryUserRepository {
    rows: Mutex<Vec<User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<User>>, RepoError> {
        self.rows
            .lock()
            .map_err(|_| RepoError::Unavailable("memory store lock poisoned"))
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert_user(&self, new_user: &NewUser) -> Result<User, RepoError> {
        let mut rows = self.lock()?;
        if rows.iter().any(|u| u.username == new_user.username) {
            return Err(RepoError::Duplicate(UniqueColumn::Username));
        }
        if rows.iter().any(|u| u.email == new_user.email) {
            return Err(RepoError::Duplicate(UniqueColumn::Email));
        }
        let user = User {
            id: rows.len() as i64 + 1,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password: new_user.password.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        rows.push(user.clone());
        Ok(user)
    }

    async fn find_by_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, RepoError> {
        let rows = self.lock()?;
        Ok(rows
            .iter()
            .find(|u| u.username == username && u.password == password)
            .cloned())
    }

    async fn count_users(&self) -> Result<i64, RepoError> {
        Ok(self.lock()?.len() as i64)
    }
}

/// Repository whose every call fails the way an unreachable or misbehaving store does.
#[cfg(test)]
pub struct UnavailableUserRepository {
    unknown_constraint: bool,
}

#[cfg(test)]
impl UnavailableUserRepository {
    pub fn connection_lost() -> Self {
        Self {
            unknown_constraint: false,
        }
    }

    /// Inserts fail on a unique index that names neither username nor email.
    pub fn unknown_constraint() -> Self {
        Self {
            unknown_constraint: true,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl UserRepository for UnavailableUserRepository {
    async fn insert_user(&self, _new_user: &NewUser) -> Result<User, RepoError> {
        if self.unknown_constraint {
            Err(RepoError::UnknownConstraint("users_pkey".into()))
        } else {
            Err(RepoError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    async fn find_by_credentials(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<Option<User>, RepoError> {
        Err(RepoError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn count_users(&self) -> Result<i64, RepoError> {
        Err(RepoError::Database(sqlx::Error::PoolTimedOut))
    }
}
