//! # paw-db-sqlite
//!
//! SQLite implementation of [`CredentialStore`] and [`SessionMarkerStore`].
//! Accounts and the session marker share one database file, so there is a
//! single durable store on the device.
//!
//! Tables:
//! - `users`: id, name, email (unique, case-insensitive), password_hash, created_at
//! - `preferences`: key/value pairs; holds `savedEmail`, `isGuest` and one
//!   `notifPrefs:<email>` JSON entry per account

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paw_core::error::{AppError, Result};
use paw_core::models::{NotificationPrefs, SessionMarker, UserRecord};
use paw_core::traits::{CredentialStore, NotificationPrefsStore, SessionMarkerStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, warn};
use uuid::Uuid;

const SAVED_EMAIL_KEY: &str = "savedEmail";
const IS_GUEST_KEY: &str = "isGuest";
const NOTIF_PREFS_PREFIX: &str = "notifPrefs:";

pub struct SqliteStore {
    pool: SqlitePool,
}

fn db_err(e: sqlx::Error) -> AppError {
    AppError::Internal(format!("sqlite: {e}"))
}

fn row_to_user(row: &SqliteRow) -> Result<UserRecord> {
    Ok(UserRecord {
        id: row.try_get::<Uuid, _>("id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        email: row.try_get("email").map_err(db_err)?,
        password_hash: row.try_get("password_hash").map_err(db_err)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(db_err)?,
    })
}

impl SqliteStore {
    /// Opens (or creates) the database at `url` and applies the schema.
    ///
    /// Accepts `sqlite://path/to/file.db` and `sqlite::memory:`.
    pub async fn new(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(db_err)?
            .create_if_missing(true);

        // One connection: a single reader/writer, and an in-memory database
        // lives exactly as long as its connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(db_err)?;

        let store = Self { pool };
        store.migrate().await?;
        debug!(%url, "sqlite store ready");
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id            BLOB PRIMARY KEY,
                name          TEXT NOT NULL,
                email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password_hash TEXT NOT NULL,
                created_at    TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS preferences (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_pref(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT value FROM preferences WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)
    }

    async fn put_pref(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO preferences (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

fn notif_prefs_key(email: &str) -> String {
    format!("{NOTIF_PREFS_PREFIX}{}", email.trim().to_lowercase())
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let email = email.trim().to_lowercase();
        debug!(%email, "looking up account");

        let row = sqlx::query("SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.as_ref().map(row_to_user).transpose()
    }

    /// The unique index makes the duplicate check atomic with the insert.
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<UserRecord> {
        let user = UserRecord::new(name, email.trim(), password_hash.to_string());

        sqlx::query("INSERT INTO users (id, name, email, password_hash, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Conflict(format!("account {} already exists", user.email))
                }
                other => db_err(other),
            })?;

        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>> {
        let rows = sqlx::query("SELECT id, name, email, password_hash, created_at FROM users ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(row_to_user).collect()
    }

    async fn reset(&self) -> Result<u64> {
        let done = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl SessionMarkerStore for SqliteStore {
    async fn load_marker(&self) -> Result<SessionMarker> {
        let saved_email = self.get_pref(SAVED_EMAIL_KEY).await?.filter(|e| !e.is_empty());
        let is_guest = self.get_pref(IS_GUEST_KEY).await?.as_deref() == Some("true");
        Ok(SessionMarker { saved_email, is_guest })
    }

    /// Both keys are written in one transaction.
    async fn save_marker(&self, marker: &SessionMarker) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let pairs = [
            (SAVED_EMAIL_KEY, marker.saved_email.clone().unwrap_or_default()),
            (IS_GUEST_KEY, marker.is_guest.to_string()),
        ];
        for (key, value) in pairs {
            sqlx::query(
                "INSERT INTO preferences (key, value) VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn clear_marker(&self) -> Result<()> {
        sqlx::query("DELETE FROM preferences WHERE key IN (?, ?)")
            .bind(SAVED_EMAIL_KEY)
            .bind(IS_GUEST_KEY)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl NotificationPrefsStore for SqliteStore {
    async fn load_prefs(&self, email: &str) -> Result<NotificationPrefs> {
        let key = notif_prefs_key(email);
        let Some(raw) = self.get_pref(&key).await? else {
            return Ok(NotificationPrefs::default());
        };

        match serde_json::from_str(&raw) {
            Ok(prefs) => Ok(prefs),
            Err(e) => {
                warn!(%key, error = %e, "unreadable notification prefs, using defaults");
                Ok(NotificationPrefs::default())
            }
        }
    }

    async fn save_prefs(&self, email: &str, prefs: &NotificationPrefs) -> Result<()> {
        let key = notif_prefs_key(email);
        let value = serde_json::to_string(prefs)
            .map_err(|e| AppError::Internal(format!("encode notification prefs: {e}")))?;
        self.put_pref(&key, &value).await?;
        debug!(%key, enabled = prefs.enabled, radius = prefs.radius_miles, "notification prefs saved");
        Ok(())
    }
}
