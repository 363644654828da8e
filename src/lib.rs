//! # Skill Sync client core
//!
//! Session handling for the Skill Sync learning dashboard: restoring a stored
//! bearer credential, signing in (with an optional second factor), signing
//! up, signing out, and deciding which dashboard views the current role may
//! open.
//!
//! ## Layout
//!
//! - [`session`]: credential decoding, role mapping, the durable credential
//!   slot and the controller that owns the observable `SessionState`.
//! - [`transport`]: the seam to the platform API plus the `reqwest` client.
//! - [`guard`]: route guard, route table and role-based navigation.
//! - [`config`]: endpoints, timeout and storage location.
//! - [`cli`]: the `skillsync` command line front end.
//!
//! ## Wiring
//!
//! ```no_run
//! use std::sync::Arc;
//! use skillsync::{
//!     config::ClientConfig,
//!     session::{FileStore, Session, SessionController},
//!     transport::HttpTransport,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::from_env()?;
//! let session = Session::new(Arc::new(FileStore::in_dir(&config.storage_dir)));
//! let transport = HttpTransport::new(
//!     &config,
//!     Arc::new(session.clone()),
//!     Arc::new(session.clone()),
//! )?;
//! let controller = SessionController::new(session, Arc::new(transport));
//! controller.bootstrap();
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod guard;
pub mod session;
pub mod transport;
