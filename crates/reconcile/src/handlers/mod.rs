//! Concrete handlers.
//!
//! - [`SysAuthHandler`] owns `sys/auth`
//! - [`SysPolicyHandler`] owns `sys/policy`
//! - [`GenericHandler`] is the wildcard fallback

pub mod generic;
pub mod sys_auth;
pub mod sys_policy;

pub use generic::GenericHandler;
pub use sys_auth::{DeclaredMount, SysAuthHandler};
pub use sys_policy::{DeclaredPolicy, SysPolicyHandler};
