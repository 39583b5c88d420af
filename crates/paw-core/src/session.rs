//! # Session State Machine
//!
//! [`AuthSession`] owns the current [`SessionState`] and the last error
//! message shown to the user. Every transition either succeeds and publishes
//! the new state to subscribers, or fails, records its message and leaves the
//! state untouched.
//!
//! Persisted pieces live behind the ports in [`crate::traits`]:
//! accounts in a [`CredentialStore`], the saved email and guest flag in a
//! [`SessionMarkerStore`].

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::models::{AppUser, SessionMarker};
use crate::traits::{CredentialStore, PasswordHasher, SessionMarkerStore};
use crate::validation::{LoginInput, SignUpInput};

pub const DEMO_NAME: &str = "Demo";
pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "password123";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    LoggedOut,
    Guest,
    LoggedIn(AppUser),
}

/// Why a transition was refused. `Display` is the message shown to the user.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("Please fill all fields.")]
    MissingSignUpFields,

    #[error("Please enter a valid email.")]
    InvalidEmail,

    #[error("An account with this email already exists.")]
    DuplicateAccount,

    #[error("Please enter email and password.")]
    MissingLoginFields,

    #[error("No account found for this email.")]
    AccountNotFound,

    #[error("User credentials did not match.")]
    CredentialMismatch,

    /// A store read or write failed; the cause is logged, not shown.
    #[error("Something went wrong. Please try again.")]
    Persistence,
}

fn persistence(err: AppError) -> AuthError {
    error!(error = %err, "session store failure");
    AuthError::Persistence
}

pub struct AuthSession {
    users: Arc<dyn CredentialStore>,
    markers: Arc<dyn SessionMarkerStore>,
    hasher: Arc<dyn PasswordHasher>,
    state: watch::Sender<SessionState>,
    last_error: Option<String>,
}

impl AuthSession {
    /// Builds a session in `LoggedOut` without reading any persisted marker.
    pub fn new(
        users: Arc<dyn CredentialStore>,
        markers: Arc<dyn SessionMarkerStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::LoggedOut);
        Self {
            users,
            markers,
            hasher,
            state,
            last_error: None,
        }
    }

    /// Builds a session and restores the state persisted by a previous run.
    ///
    /// Guest flag wins; otherwise a saved email that still has an account
    /// logs that account back in. Unreadable stores fall back to `LoggedOut`.
    pub async fn restore(
        users: Arc<dyn CredentialStore>,
        markers: Arc<dyn SessionMarkerStore>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        let session = Self::new(users, markers, hasher);
        let restored = session.resolve_initial_state().await;
        debug!(state = ?restored, "session restored");
        session.state.send_replace(restored);
        session
    }

    async fn resolve_initial_state(&self) -> SessionState {
        let marker = match self.markers.load_marker().await {
            Ok(marker) => marker,
            Err(err) => {
                warn!(error = %err, "could not read session marker");
                return SessionState::LoggedOut;
            }
        };

        if marker.is_guest {
            return SessionState::Guest;
        }

        let Some(email) = marker.saved_email.filter(|e| !e.is_empty()) else {
            return SessionState::LoggedOut;
        };

        match self.users.find_user_by_email(&email).await {
            Ok(Some(user)) => SessionState::LoggedIn(user.to_app_user()),
            Ok(None) => {
                debug!(%email, "saved email has no account");
                SessionState::LoggedOut
            }
            Err(err) => {
                warn!(error = %err, "could not look up saved account");
                SessionState::LoggedOut
            }
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<AppUser> {
        match &*self.state.borrow() {
            SessionState::LoggedIn(user) => Some(user.clone()),
            _ => None,
        }
    }

    /// The message from the most recent failed transition, cleared by the next call.
    pub fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Every later state change is delivered to the returned receiver.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub async fn sign_up(&mut self, name: &str, email: &str, password: &str) -> Result<AppUser, AuthError> {
        let outcome = self.try_sign_up(name, email, password).await;
        self.settle("sign_up", outcome)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<AppUser, AuthError> {
        let outcome = self.try_login(email, password).await;
        self.settle("login", outcome)
    }

    pub async fn continue_as_guest(&mut self) -> Result<(), AuthError> {
        let marker = SessionMarker {
            saved_email: None,
            is_guest: true,
        };
        let outcome = match self.markers.save_marker(&marker).await {
            Ok(()) => {
                self.state.send_replace(SessionState::Guest);
                info!("continuing as guest");
                Ok(())
            }
            Err(err) => Err(persistence(err)),
        };
        self.settle("continue_as_guest", outcome)
    }

    pub async fn logout(&mut self) -> Result<(), AuthError> {
        let outcome = match self.markers.clear_marker().await {
            Ok(()) => {
                self.state.send_replace(SessionState::LoggedOut);
                info!("logged out");
                Ok(())
            }
            Err(err) => Err(persistence(err)),
        };
        self.settle("logout", outcome)
    }

    /// Creates the demo account when no account exists yet. Returns whether it did.
    pub async fn seed_demo_if_empty(&self) -> Result<bool, AppError> {
        if !self.users.list_users().await?.is_empty() {
            return Ok(false);
        }
        let digest = self.hasher.hash(DEMO_PASSWORD)?;
        self.users.create_user(DEMO_NAME, DEMO_EMAIL, &digest).await?;
        info!(email = DEMO_EMAIL, "seeded demo account");
        Ok(true)
    }

    async fn try_sign_up(&self, name: &str, email: &str, password: &str) -> Result<AppUser, AuthError> {
        let input = SignUpInput::normalize(name, email, password)?;

        if self.users.find_user_by_email(&input.email).await.map_err(persistence)?.is_some() {
            return Err(AuthError::DuplicateAccount);
        }

        let digest = self.hasher.hash(&input.password).map_err(persistence)?;
        let record = match self.users.create_user(&input.name, &input.email, &digest).await {
            Ok(record) => record,
            // lost a race with another writer between lookup and insert
            Err(AppError::Conflict(_)) => return Err(AuthError::DuplicateAccount),
            Err(err) => return Err(persistence(err)),
        };

        info!(email = %record.email, "account created");
        self.commit_login(record.to_app_user()).await
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<AppUser, AuthError> {
        let input = LoginInput::normalize(email, password)?;

        let record = self
            .users
            .find_user_by_email(&input.email)
            .await
            .map_err(persistence)?
            .ok_or(AuthError::AccountNotFound)?;

        if !self.hasher.verify(&input.password, &record.password_hash) {
            return Err(AuthError::CredentialMismatch);
        }

        self.commit_login(record.to_app_user()).await
    }

    async fn commit_login(&self, user: AppUser) -> Result<AppUser, AuthError> {
        let marker = SessionMarker {
            saved_email: Some(user.email.clone()),
            is_guest: false,
        };
        self.markers.save_marker(&marker).await.map_err(persistence)?;

        info!(email = %user.email, "logged in");
        self.state.send_replace(SessionState::LoggedIn(user.clone()));
        Ok(user)
    }

    fn settle<T>(&mut self, transition: &str, outcome: Result<T, AuthError>) -> Result<T, AuthError> {
        match &outcome {
            Ok(_) => self.last_error = None,
            Err(err) => {
                if *err != AuthError::Persistence {
                    warn!(transition, reason = %err, "transition rejected");
                }
                self.last_error = Some(err.to_string());
            }
        }
        outcome
    }
}
