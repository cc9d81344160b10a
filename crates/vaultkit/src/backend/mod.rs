//! Backend trait for the Vault operations the reconciler needs.
//!
//! [`http::HttpBackend`] talks to a real server. Tests use an in-memory
//! implementation of the same trait.

pub mod http;

use crate::error::{Error, Result};
use crate::types::{AuthMount, EnableAuthOptions, Secret};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The subset of the Vault API used to reconcile configuration.
///
/// Every method is a single pass-through call. Mutating calls are expected
/// to be safe to repeat with the same input.
pub trait VaultBackend: Send + Sync {
    /// List enabled auth methods, keyed by mount path (with trailing `/`).
    fn list_auth(&self) -> Result<BTreeMap<String, AuthMount>>;

    /// Enable an auth method at `path`, or retune it if already enabled.
    fn enable_auth(&self, path: &str, options: &EnableAuthOptions) -> Result<()>;

    /// Disable the auth method at `path`.
    fn disable_auth(&self, path: &str) -> Result<()>;

    /// List policy names.
    fn list_policies(&self) -> Result<Vec<String>>;

    /// Fetch a policy document.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the policy doesn't exist.
    fn get_policy(&self, name: &str) -> Result<String>;

    /// Create or replace a policy.
    fn put_policy(&self, name: &str, rules: &str) -> Result<()>;

    /// Delete a policy.
    fn delete_policy(&self, name: &str) -> Result<()>;

    /// Read a logical path. Returns `None` when nothing is stored there.
    fn read(&self, path: &str) -> Result<Option<Secret>>;

    /// Write a JSON object to a logical path.
    fn write(&self, path: &str, data: &Map<String, Value>) -> Result<Option<Secret>>;

    /// List keys under a logical path. Returns `None` when there are none.
    fn list(&self, path: &str) -> Result<Option<Secret>>;
}

/// Decode the `GET sys/auth` response.
///
/// Newer servers wrap the mounts in `data`; older ones return them at the
/// top level next to the request metadata. Only `path/` keys are mounts.
pub(crate) fn parse_auth_mounts(body: &Value) -> Result<BTreeMap<String, AuthMount>> {
    let object = body
        .get("data")
        .and_then(Value::as_object)
        .or_else(|| body.as_object())
        .ok_or_else(|| Error::invalid_response("sys/auth", "expected a JSON object"))?;

    let mut mounts = BTreeMap::new();
    for (path, value) in object {
        if !path.ends_with('/') || !value.is_object() {
            continue;
        }
        let mount: AuthMount = serde_json::from_value(value.clone())
            .map_err(|e| Error::invalid_response("sys/auth", format!("mount {path}: {e}")))?;
        mounts.insert(path.clone(), mount);
    }
    Ok(mounts)
}

/// Decode the `GET sys/policy` response.
pub(crate) fn parse_policy_list(body: &Value) -> Result<Vec<String>> {
    let list = body
        .get("policies")
        .or_else(|| body.pointer("/data/policies"))
        .or_else(|| body.pointer("/data/keys"))
        .and_then(Value::as_array)
        .ok_or_else(|| Error::invalid_response("sys/policy", "missing policies list"))?;

    list.iter()
        .map(|v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::invalid_response("sys/policy", "policy name is not a string"))
        })
        .collect()
}

/// Decode the `GET sys/policy/:name` response.
pub(crate) fn parse_policy_rules(name: &str, body: &Value) -> Result<String> {
    body.get("rules")
        .or_else(|| body.pointer("/data/rules"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_response(format!("sys/policy/{name}"), "missing rules"))
}
