use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::dto::{LoginRequest, RegisterRequest};
use crate::auth::error::AuthError;
use crate::auth::repo::UserRepository;
use crate::auth::repo_types::{NewUser, RepoError, UniqueColumn, User};
use crate::session::{AuthMode, Session};

pub const MIN_USERNAME_CHARS: usize = 3;
pub const MIN_PASSWORD_CHARS: usize = 6;
const STRONG_PASSWORD_CHARS: usize = 10;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Checks a registration form in order; the first failing rule wins.
pub fn validate_registration(form: &RegisterRequest) -> Result<(), AuthError> {
    if form.username.is_empty() || form.email.is_empty() || form.password.is_empty() {
        return Err(AuthError::MissingFields);
    }
    if form.username.chars().count() < MIN_USERNAME_CHARS {
        return Err(AuthError::UsernameTooShort);
    }
    if form.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::PasswordTooShort);
    }
    if form.password != form.confirm_password {
        return Err(AuthError::PasswordMismatch);
    }
    if !is_valid_email(&form.email) {
        return Err(AuthError::InvalidEmail);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PasswordStrength {
    Weak,
    Medium,
    Strong,
}

/// Length-only hint shown while the user types a new password.
pub fn password_strength(password: &str) -> PasswordStrength {
    match password.chars().count() {
        n if n < MIN_PASSWORD_CHARS => PasswordStrength::Weak,
        n if n < STRONG_PASSWORD_CHARS => PasswordStrength::Medium,
        _ => PasswordStrength::Strong,
    }
}

/// Validate and insert a new user, then point the client at the login form.
/// Only an anonymous session may register.
///
/// The password is stored exactly as entered.
pub async fn register(
    repo: &dyn UserRepository,
    session: &mut Session,
    form: RegisterRequest,
) -> Result<User, AuthError> {
    if session.is_authenticated() {
        warn!(username = ?session.username(), "registration attempted while logged in");
        return Err(AuthError::AlreadyAuthenticated);
    }
    if let Err(e) = validate_registration(&form) {
        warn!(username = %form.username, reason = %e, "registration rejected");
        return Err(e);
    }

    let new_user = NewUser {
        username: form.username,
        email: form.email,
        password: form.password,
    };
    let user = repo.insert_user(&new_user).await.map_err(|e| match e {
        RepoError::Duplicate(UniqueColumn::Username) => {
            warn!(username = %new_user.username, "username already exists");
            AuthError::UsernameTaken
        }
        RepoError::Duplicate(UniqueColumn::Email) => {
            warn!(email = %new_user.email, "email already registered");
            AuthError::EmailTaken
        }
        other => AuthError::Store(other),
    })?;

    // anonymous was checked on entry and the session is held exclusively
    let switched = session.set_auth_mode(AuthMode::Login);
    debug_assert!(switched);
    info!(user_id = user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Check credentials and mark the session authenticated. A failed attempt
/// leaves the session as it was.
pub async fn login(
    repo: &dyn UserRepository,
    session: &mut Session,
    form: LoginRequest,
) -> Result<User, AuthError> {
    if form.username.is_empty() || form.password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let user = repo
        .find_by_credentials(&form.username, &form.password)
        .await
        .map_err(AuthError::Store)?
        .ok_or_else(|| {
            warn!(username = %form.username, "login failed");
            AuthError::InvalidCredentials
        })?;

    session.authenticate(user.username.clone());
    info!(user_id = user.id, username = %user.username, "user logged in");
    Ok(user)
}

pub fn logout(session: &mut Session) {
    match session.username() {
        Some(username) => info!(%username, "user logged out"),
        None => debug!("logout on anonymous session"),
    }
    session.logout();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::{MemoryUserRepository, UnavailableUserRepository};
    use crate::session::{SessionState, View};

    fn form(username: &str, email: &str, password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    fn valid_form(username: &str, email: &str) -> RegisterRequest {
        form(username, email, "secret123", "secret123")
    }

    fn creds(username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            username: username.into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_pattern_requires_two_letter_tld() {
        assert!(!is_valid_email("a@b.c"));
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("a@b.c0"));
        assert!(!is_valid_email("a b@c.com"));
    }

    #[test]
    fn validation_order_first_failure_wins() {
        // empty email beats the short username
        assert!(matches!(
            validate_registration(&form("ab", "", "x", "y")),
            Err(AuthError::MissingFields)
        ));
        assert!(matches!(
            validate_registration(&form("ab", "bad", "x", "y")),
            Err(AuthError::UsernameTooShort)
        ));
        assert!(matches!(
            validate_registration(&form("abc", "bad", "12345", "y")),
            Err(AuthError::PasswordTooShort)
        ));
        assert!(matches!(
            validate_registration(&form("abc", "bad", "123456", "1234567")),
            Err(AuthError::PasswordMismatch)
        ));
        assert!(matches!(
            validate_registration(&form("abc", "bad", "123456", "123456")),
            Err(AuthError::InvalidEmail)
        ));
        assert!(validate_registration(&form("abc", "a@b.co", "123456", "123456")).is_ok());
    }

    #[test]
    fn empty_confirmation_is_a_mismatch() {
        assert!(matches!(
            validate_registration(&form("alice", "a@b.co", "123456", "")),
            Err(AuthError::PasswordMismatch)
        ));
    }

    #[test]
    fn lengths_count_characters_not_bytes() {
        // three characters, six bytes
        assert!(validate_registration(&form("äöü", "a@b.co", "123456", "123456")).is_ok());
        assert!(matches!(
            validate_registration(&form("äö", "a@b.co", "123456", "123456")),
            Err(AuthError::UsernameTooShort)
        ));
    }

    #[test]
    fn strength_buckets() {
        assert_eq!(password_strength(""), PasswordStrength::Weak);
        assert_eq!(password_strength("12345"), PasswordStrength::Weak);
        assert_eq!(password_strength("123456"), PasswordStrength::Medium);
        assert_eq!(password_strength("123456789"), PasswordStrength::Medium);
        assert_eq!(password_strength("1234567890"), PasswordStrength::Strong);
    }

    #[tokio::test]
    async fn short_username_persists_nothing() {
        let repo = MemoryUserRepository::new();
        let mut session = Session::default();
        let err = register(&repo, &mut session, valid_form("al", "al@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UsernameTooShort));
        assert_eq!(repo.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mismatch_persists_nothing() {
        let repo = MemoryUserRepository::new();
        let mut session = Session::default();
        let err = register(
            &repo,
            &mut session,
            form("alice", "alice@example.com", "secret123", "secret124"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::PasswordMismatch));
        assert_eq!(repo.count_users().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_username_is_reported_and_not_stored() {
        let repo = MemoryUserRepository::new();
        let mut session = Session::default();
        register(&repo, &mut session, valid_form("alice", "alice@example.com"))
            .await
            .expect("first registration");
        let err = register(&repo, &mut session, valid_form("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UsernameTaken));
        assert_eq!(repo.count_users().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_reported() {
        let repo = MemoryUserRepository::new();
        let mut session = Session::default();
        register(&repo, &mut session, valid_form("alice", "alice@example.com"))
            .await
            .expect("first registration");
        let err = register(&repo, &mut session, valid_form("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn registration_switches_to_login_form() {
        let repo = MemoryUserRepository::new();
        let mut session = Session::default();
        assert!(session.set_auth_mode(AuthMode::Register));
        let user = register(&repo, &mut session, valid_form("alice", "alice@example.com"))
            .await
            .expect("registration");
        assert_eq!(user.password, "secret123");
        assert_eq!(session.view(), View::Login);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn login_success_and_generic_failure() {
        let repo = MemoryUserRepository::new();
        let mut session = Session::default();
        register(&repo, &mut session, valid_form("alice", "alice@example.com"))
            .await
            .expect("registration");

        let err = login(&repo, &mut session, creds("alice", "wrong-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        let unknown = login(&repo, &mut session, creds("nobody", "secret123"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), unknown.to_string());
        assert_eq!(session.state(), SessionState::Anonymous);

        login(&repo, &mut session, creds("alice", "secret123"))
            .await
            .expect("login");
        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.username(), Some("alice"));
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let repo = MemoryUserRepository::new();
        let mut session = Session::default();
        for (u, p) in [("", "secret123"), ("alice", ""), ("", "")] {
            let err = login(&repo, &mut session, creds(u, p)).await.unwrap_err();
            assert!(matches!(err, AuthError::MissingCredentials));
        }
    }

    #[tokio::test]
    async fn logout_returns_to_anonymous() {
        let repo = MemoryUserRepository::new();
        let mut session = Session::default();
        register(&repo, &mut session, valid_form("alice", "alice@example.com"))
            .await
            .expect("registration");
        login(&repo, &mut session, creds("alice", "secret123"))
            .await
            .expect("login");

        logout(&mut session);
        assert_eq!(session, Session::default());
    }

    #[tokio::test]
    async fn logged_in_session_cannot_register() {
        let repo = MemoryUserRepository::new();
        let mut session = Session::default();
        register(&repo, &mut session, valid_form("alice", "alice@example.com"))
            .await
            .expect("registration");
        login(&repo, &mut session, creds("alice", "secret123"))
            .await
            .expect("login");

        // rejected before validation, even for an invalid form
        let err = register(&repo, &mut session, valid_form("b", "bad"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyAuthenticated));
        let err = register(&repo, &mut session, valid_form("bob", "bob@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyAuthenticated));

        assert_eq!(repo.count_users().await.unwrap(), 1);
        assert_eq!(
            session.view(),
            View::Home {
                username: "alice".into()
            }
        );
    }

    #[tokio::test]
    async fn store_failure_on_insert_is_generic_and_keeps_session() {
        for repo in [
            UnavailableUserRepository::connection_lost(),
            UnavailableUserRepository::unknown_constraint(),
        ] {
            let mut session = Session::default();
            assert!(session.set_auth_mode(AuthMode::Register));
            let before = session.clone();

            let err = register(&repo, &mut session, valid_form("alice", "alice@example.com"))
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::Store(_)));
            assert_eq!(err.to_string(), "Database error");
            assert_eq!(session, before);
        }
    }

    #[tokio::test]
    async fn store_failure_on_login_is_not_a_credential_error() {
        let repo = UnavailableUserRepository::connection_lost();
        let mut session = Session::default();

        let err = login(&repo, &mut session, creds("alice", "secret123"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Store(RepoError::Database(_))));
        assert_eq!(session, Session::default());
    }
}
