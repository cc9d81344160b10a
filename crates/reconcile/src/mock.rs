//! In-memory Vault for tests.
//!
//! [`MockBackend`] implements [`VaultBackend`] over shared state and records
//! every mutating call, so tests can assert exactly which changes a run made.
//! Policy names are lowercased on every call, as Vault does.
//!
//! ```
//! use reconcile::mock::{MockBackend, MockCall};
//! use vaultkit::VaultBackend;
//!
//! let mock = MockBackend::with_default_state();
//! mock.put_policy("ops", "path \"secret/*\" {}").unwrap();
//! assert_eq!(mock.calls(), vec![MockCall::PutPolicy("ops".into())]);
//! ```

use crate::canonical::CanonicalAuthConfig;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use vaultkit::{AuthMount, EnableAuthOptions, Error, Result, Secret, VaultBackend};

/// A mutating call received by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    EnableAuth(String),
    DisableAuth(String),
    PutPolicy(String),
    DeletePolicy(String),
    Write(String),
}

#[derive(Debug, Default)]
struct MockState {
    auth: BTreeMap<String, AuthMount>,
    policies: BTreeMap<String, String>,
    secrets: BTreeMap<String, Map<String, Value>>,
    calls: Vec<MockCall>,
    failing: BTreeSet<String>,
}

/// Mock backend for testing without a Vault server.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock with what a fresh server has: the `token/` auth mount
    /// and the `root` and `default` policies.
    #[must_use]
    pub fn with_default_state() -> Self {
        let mock = Self::new();
        mock.add_auth(
            "token/",
            AuthMount {
                mount_type: "token".into(),
                description: "token based credentials".into(),
                ..Default::default()
            },
        );
        mock.add_policy("root", "");
        mock.add_policy("default", "path \"auth/token/lookup-self\" {\n  capabilities = [\"read\"]\n}\n");
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a live auth mount without recording a call.
    pub fn add_auth(&self, path: impl Into<String>, mount: AuthMount) {
        self.state().auth.insert(path.into(), mount);
    }

    /// Add a live policy without recording a call.
    pub fn add_policy(&self, name: impl Into<String>, rules: impl Into<String>) {
        self.state().policies.insert(name.into().to_lowercase(), rules.into());
    }

    /// Add a stored document without recording a call.
    pub fn add_secret(&self, path: impl Into<String>, data: Map<String, Value>) {
        self.state().secrets.insert(path.into(), data);
    }

    /// Make every call addressing `path` fail with HTTP 500.
    ///
    /// Paths are API paths: `sys/auth` for listing mounts,
    /// `sys/auth/<mount>` for a single mount, `sys/policy/<name>` for a
    /// policy, or a logical path.
    pub fn fail_on(&self, path: impl Into<String>) {
        self.state().failing.insert(path.into());
    }

    /// Mutating calls received so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Number of mutating calls received so far.
    pub fn mutation_count(&self) -> usize {
        self.state().calls.len()
    }

    pub fn auth_mount(&self, path: &str) -> Option<AuthMount> {
        self.state().auth.get(path).cloned()
    }

    pub fn policy(&self, name: &str) -> Option<String> {
        self.state().policies.get(&name.to_lowercase()).cloned()
    }

    pub fn secret(&self, path: &str) -> Option<Map<String, Value>> {
        self.state().secrets.get(path).cloned()
    }

    fn check(&self, method: &'static str, path: &str) -> Result<()> {
        if self.state().failing.contains(path) {
            return Err(Error::http(method, path, 500, vec!["injected failure".into()]));
        }
        Ok(())
    }
}

fn mount_api_path(path: &str) -> String {
    format!("sys/auth/{}", path.trim_end_matches('/'))
}

impl VaultBackend for MockBackend {
    fn list_auth(&self) -> Result<BTreeMap<String, AuthMount>> {
        self.check("GET", "sys/auth")?;
        Ok(self.state().auth.clone())
    }

    fn enable_auth(&self, path: &str, options: &EnableAuthOptions) -> Result<()> {
        let api_path = mount_api_path(path);
        self.check("POST", &api_path)?;

        let config = CanonicalAuthConfig::from_input(&options.config)
            .map_err(|e| Error::http("POST", api_path.as_str(), 400, vec![e.to_string()]))?;

        let mut state = self.state();
        state.calls.push(MockCall::EnableAuth(path.to_string()));
        if let Some(existing) = state.auth.get_mut(path) {
            if existing.mount_type != options.mount_type {
                return Err(Error::http(
                    "POST",
                    api_path,
                    400,
                    vec![format!("path is already in use at {path}")],
                ));
            }
            existing.config = config.to_output();
            if !options.description.is_empty() {
                existing.description = options.description.clone();
            }
            return Ok(());
        }

        state.auth.insert(
            path.to_string(),
            AuthMount {
                mount_type: options.mount_type.clone(),
                description: options.description.clone(),
                accessor: format!("auth_{}_mock", options.mount_type),
                config: config.to_output(),
                local: options.local,
                seal_wrap: options.seal_wrap,
                options: options.options.clone(),
            },
        );
        Ok(())
    }

    fn disable_auth(&self, path: &str) -> Result<()> {
        self.check("DELETE", &mount_api_path(path))?;
        let mut state = self.state();
        state.calls.push(MockCall::DisableAuth(path.to_string()));
        state.auth.remove(path);
        Ok(())
    }

    fn list_policies(&self) -> Result<Vec<String>> {
        self.check("GET", "sys/policy")?;
        Ok(self.state().policies.keys().cloned().collect())
    }

    fn get_policy(&self, name: &str) -> Result<String> {
        let name = name.to_lowercase();
        let path = format!("sys/policy/{name}");
        self.check("GET", &path)?;
        self.state()
            .policies
            .get(&name)
            .cloned()
            .ok_or(Error::NotFound(path))
    }

    fn put_policy(&self, name: &str, rules: &str) -> Result<()> {
        let name = name.to_lowercase();
        self.check("PUT", &format!("sys/policy/{name}"))?;
        let mut state = self.state();
        state.calls.push(MockCall::PutPolicy(name.clone()));
        state.policies.insert(name, rules.to_string());
        Ok(())
    }

    fn delete_policy(&self, name: &str) -> Result<()> {
        let name = name.to_lowercase();
        self.check("DELETE", &format!("sys/policy/{name}"))?;
        let mut state = self.state();
        state.calls.push(MockCall::DeletePolicy(name.clone()));
        state.policies.remove(&name);
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Option<Secret>> {
        self.check("GET", path)?;
        Ok(self.state().secrets.get(path).map(|data| Secret {
            data: Some(data.clone()),
            ..Default::default()
        }))
    }

    fn write(&self, path: &str, data: &Map<String, Value>) -> Result<Option<Secret>> {
        self.check("PUT", path)?;
        let mut state = self.state();
        state.calls.push(MockCall::Write(path.to_string()));
        state.secrets.insert(path.to_string(), data.clone());
        Ok(None)
    }

    fn list(&self, path: &str) -> Result<Option<Secret>> {
        self.check("GET", path)?;
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let keys: BTreeSet<String> = self
            .state()
            .secrets
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .map(|rest| match rest.split_once('/') {
                Some((dir, _)) => format!("{dir}/"),
                None => rest.to_string(),
            })
            .collect();
        if keys.is_empty() {
            return Ok(None);
        }

        let mut data = Map::new();
        data.insert(
            "keys".into(),
            Value::Array(keys.into_iter().map(Value::String).collect()),
        );
        Ok(Some(Secret {
            data: Some(data),
            ..Default::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vaultkit::TtlValue;

    #[test]
    fn test_default_state() {
        let mock = MockBackend::with_default_state();
        assert_eq!(mock.list_policies().unwrap(), vec!["default", "root"]);
        assert_eq!(mock.list_auth().unwrap()["token/"].mount_type, "token");
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_enable_auth_stores_canonical_config() {
        let mock = MockBackend::new();
        let mut options = EnableAuthOptions {
            mount_type: "ldap".into(),
            ..Default::default()
        };
        options.config.default_lease_ttl = Some(TtlValue::Text("1m10s".into()));

        mock.enable_auth("ldap/", &options).unwrap();
        assert_eq!(mock.auth_mount("ldap/").unwrap().config.default_lease_ttl, 70);
        assert_eq!(mock.calls(), vec![MockCall::EnableAuth("ldap/".into())]);
    }

    #[test]
    fn test_enable_auth_rejects_type_change() {
        let mock = MockBackend::with_default_state();
        let options = EnableAuthOptions {
            mount_type: "ldap".into(),
            ..Default::default()
        };
        let err = mock.enable_auth("token/", &options).unwrap_err();
        assert!(err.to_string().contains("path is already in use"));
    }

    #[test]
    fn test_get_missing_policy_is_not_found() {
        let mock = MockBackend::new();
        assert!(mock.get_policy("ops").unwrap_err().is_not_found());
    }

    #[test]
    fn test_policy_names_are_case_folded() {
        let mock = MockBackend::new();
        mock.put_policy("Ops", "path \"a\" {}").unwrap();
        assert_eq!(mock.list_policies().unwrap(), vec!["ops"]);
        assert_eq!(mock.get_policy("OPS").unwrap(), "path \"a\" {}");

        mock.delete_policy("oPs").unwrap();
        assert!(mock.policy("ops").is_none());
        assert_eq!(
            mock.calls(),
            vec![MockCall::PutPolicy("ops".into()), MockCall::DeletePolicy("ops".into())]
        );
    }

    #[test]
    fn test_fail_on() {
        let mock = MockBackend::new();
        mock.fail_on("sys/policy");
        let err = mock.list_policies().unwrap_err();
        assert_eq!(err.category(), vaultkit::ErrorCategory::Other);
        assert!(mock.put_policy("ops", "").is_ok());
    }

    #[test]
    fn test_list_children() {
        let mock = MockBackend::new();
        mock.add_secret("secret/app/db", Map::new());
        mock.add_secret("secret/app/api", Map::new());
        mock.add_secret("secret/app/nested/key", Map::new());

        let listed = mock.list("secret/app").unwrap().unwrap();
        assert_eq!(listed.data.unwrap()["keys"], json!(["api", "db", "nested/"]));
        assert!(mock.list("secret/none").unwrap().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let mock = MockBackend::new();
        let clone = mock.clone();
        clone.write("secret/a", &Map::new()).unwrap();
        assert_eq!(mock.mutation_count(), 1);
        assert!(mock.read("secret/a").unwrap().is_some());
    }
}
