//! Shared fixtures for the cross-crate tests in `tests/`.

use std::sync::Arc;

use paw_auth_digest::Sha256Hasher;
use paw_core::AuthSession;
use paw_db_sqlite::SqliteStore;

/// Opens `url` and builds a session restored from whatever it holds.
pub async fn session_on(url: &str) -> (Arc<SqliteStore>, AuthSession) {
    let store = Arc::new(SqliteStore::new(url).await.expect("open sqlite store"));
    let session = AuthSession::restore(store.clone(), store.clone(), Arc::new(Sha256Hasher)).await;
    (store, session)
}

/// A fresh in-memory store and a logged-out session on it.
pub async fn memory_session() -> (Arc<SqliteStore>, AuthSession) {
    session_on("sqlite::memory:").await
}
