//! Client-side session for the dashboard: credential decoding, role mapping,
//! the durable credential slot and the controller that ties them together.
//!
//! Flow Overview: bootstrap reads the stored credential, drops it when expired
//! or unreadable, and otherwise installs the decoded identity. Login and
//! register exchange email and password for a credential (login may instead
//! return a second-factor challenge, completed by `verify_two_factor`).
//! Logout, including the one triggered by an unauthorized API response,
//! clears the store and always wins over requests still in flight.
//!
//! This module handles bearer credentials and must not log token material.

pub mod controller;
pub mod credential;
mod error;
pub mod role;
mod state;
pub mod store;

pub use controller::{Session, SessionController};
pub use credential::{is_expired, is_expired_at, parse, CredentialError, Identity};
pub use error::{SessionError, SessionResult};
pub use role::{resolve, Role, RoleClaim};
pub use state::{ChallengeToken, LoginOutcome, SessionState};
pub use store::{FileStore, MemoryStore, SessionStore, STORAGE_KEY};
