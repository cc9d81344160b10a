//! # vaultkit
//!
//! Blocking client for the parts of the Vault HTTP API that configuration
//! reconciliation needs:
//!
//! - `sys/auth` - list, enable (or retune) and disable auth methods
//! - `sys/policy` - list, read, write and delete ACL policies
//! - logical paths - read, write and list arbitrary documents
//!
//! ## Example
//!
//! ```no_run
//! use vaultkit::{ClientConfig, HttpBackend, VaultBackend};
//!
//! let config = ClientConfig::new("https://vault.example.com:8200", "s.token");
//! let backend = HttpBackend::new(&config).expect("invalid config");
//!
//! for (path, mount) in backend.list_auth().expect("list failed") {
//!     println!("{path} -> {}", mount.mount_type);
//! }
//! ```
//!
//! The [`VaultBackend`] trait is the seam used by the reconciler, so tests
//! can substitute an in-memory implementation.

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::VaultBackend;
pub use backend::http::HttpBackend;
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    AuthConfigInput, AuthConfigOutput, AuthMount, ClientConfig, DEFAULT_ADDRESS,
    DEFAULT_TIMEOUT, EnableAuthOptions, Secret, TtlValue,
};
