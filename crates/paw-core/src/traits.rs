//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{AnimalStatus, NotificationPrefs, Report, ReportCategory, SessionMarker, UserRecord};

/// Persistence contract for user accounts.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Case-insensitive exact match on the normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Inserts a new record. Fails with `AppError::Conflict` if the email is taken.
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<UserRecord>;

    async fn list_users(&self) -> Result<Vec<UserRecord>>;

    /// Deletes every account. Returns how many were removed.
    async fn reset(&self) -> Result<u64>;
}

/// Key-value persistence for the saved email and guest flag.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait SessionMarkerStore: Send + Sync {
    async fn load_marker(&self) -> Result<SessionMarker>;
    async fn save_marker(&self, marker: &SessionMarker) -> Result<()>;
    async fn clear_marker(&self) -> Result<()>;
}

/// Nearby-alert settings, one entry per normalized account email.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NotificationPrefsStore: Send + Sync {
    /// Defaults when nothing was saved for `email` or the entry is unreadable.
    async fn load_prefs(&self, email: &str) -> Result<NotificationPrefs>;
    async fn save_prefs(&self, email: &str, prefs: &NotificationPrefs) -> Result<()>;
}

/// One-way password digest used at sign-up and verified at login.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;

    /// Returns false on mismatch and on a stored value this scheme cannot read.
    fn verify(&self, password: &str, stored: &str) -> bool;
}

/// Request/response contract for the hosted report table.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReportClient: Send + Sync {
    async fn create_report(&self, report: &Report) -> Result<()>;

    /// Newest first. `None` lists every category.
    async fn list_reports(&self, category: Option<ReportCategory>) -> Result<Vec<Report>>;

    async fn update_status(&self, id: Uuid, status: AnimalStatus) -> Result<()>;

    /// Cheapest possible round trip; returns the HTTP status.
    async fn ping(&self) -> Result<u16>;
}
