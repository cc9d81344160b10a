//! # Reconcile
//!
//! Converges a Vault server to the configuration declared in a directory
//! tree.
//!
//! ## Directory layout
//!
//! - `sys/auth/<mount>.json`: auth methods, handled by [`SysAuthHandler`]
//! - `sys/policy/<name>.json`: ACL policies, handled by [`SysPolicyHandler`]
//! - anything else: raw documents written to their logical path by
//!   [`GenericHandler`]
//!
//! Files whose name starts with `_` are never applied.
//!
//! ## Core Concepts
//!
//! - **PathHandler**: owns one subtree; ensures each declared resource, then
//!   prunes live resources that were not declared
//! - **ConfigWalker**: binds handlers to prefixes and dispatches them in
//!   priority order, falling back to the generic handler
//! - **Canonicalization**: declared auth config is normalized to the shape
//!   Vault reports so that unchanged mounts cause no calls
//!
//! ## Example
//!
//! ```no_run
//! use reconcile::{ApplyContext, ConfigWalker, TemplateParams};
//! use std::sync::Arc;
//! use vaultkit::{ClientConfig, HttpBackend};
//!
//! let backend = HttpBackend::new(&ClientConfig::new("http://127.0.0.1:8200", "root")).unwrap();
//! let mut walker = ConfigWalker::new(Arc::new(backend), "./vault-config", TemplateParams::new()).unwrap();
//! let report = walker.run(&ApplyContext::new(true)).unwrap();
//! println!("{} change(s) pending", report.summary().skipped);
//! ```

#![warn(clippy::all)]

pub mod canonical;
pub mod context;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod mock;
pub mod template;
pub mod types;
pub mod walker;

pub use canonical::{CanonicalAuthConfig, CanonicalError, CanonicalMount, canonicalize, parse_duration};
pub use context::ApplyContext;
pub use error::{Error, Result};
pub use handler::PathHandler;
pub use handlers::{GenericHandler, SysAuthHandler, SysPolicyHandler};
pub use template::{TemplateError, TemplateParams};
pub use types::{ApplyResult, HandlerReport, ResourceOutcome, RunReport, RunSummary};
pub use walker::{ConfigWalker, HandlerBinding, OwnershipIndex};
