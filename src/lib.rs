//! Warden - offline activation keys and machine-bound license files
//!
//! # Overview
//!
//! - [`activation`] decodes human-typed activation keys and verifies them
//!   against the vendor's Ed25519 public key.
//! - [`persistence`] stores an activated key in a local license file that is
//!   encrypted, integrity-tagged and bound to the current machine, and
//!   re-validates that file on later runs without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use warden::config::get_config;
//! use warden::persistence::LicenseStore;
//!
//! let config = get_config()?;
//! let store = LicenseStore::from_config(&config.license)?;
//! let path = config.license.license_path()?;
//!
//! if !store.load_and_validate(&path) {
//!     store.save(&path, &typed_key)?;
//! }
//! ```

// Core modules
pub mod activation;
pub mod config;
pub mod encryption;
pub mod errors;
pub mod hardware;
pub mod signer;

// License file modules
pub mod persistence;
pub mod record;
pub mod storage;

pub use activation::{ActivationValidator, ValidationCode};
pub use errors::{LicenseError, LicenseResult};
pub use persistence::{LicenseStore, RejectReason};
