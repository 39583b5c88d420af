//! paw-core
//!
//! Domain models, port traits and the session state machine for PawRescue.
//! Plugins under `crates/paw-plugins` implement the ports.

pub mod error;
pub mod models;
pub mod session;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use session::{AuthError, AuthSession, SessionState};
pub use traits::*;
