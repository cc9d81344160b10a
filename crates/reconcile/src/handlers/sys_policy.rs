//! ACL policy handler for `sys/policy`.
//!
//! Each file holds `{"policy": "<rules>"}`. The policy name is the file's
//! base name without the `.json` extension, lowercased the way Vault stores
//! it.

use crate::context::ApplyContext;
use crate::error::{Error, Result};
use crate::handler::{PathHandler, read_file};
use crate::types::ApplyResult;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vaultkit::VaultBackend;

/// Logical prefix owned by this handler.
pub const SYS_POLICY_PREFIX: &str = "sys/policy";

/// Policies that are never deleted.
pub const PROTECTED_POLICIES: &[&str] = &["root", "default"];

/// One declared policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredPolicy {
    pub name: String,
    pub rules: String,
}

#[derive(Deserialize)]
struct PolicyFile {
    policy: String,
}

impl DeclaredPolicy {
    /// Vault lowercases policy names, so the name is folded here.
    pub fn new(name: impl Into<String>, rules: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            rules: rules.into(),
        }
    }

    /// Parse a policy file. The name is the last segment of `logical`.
    pub fn parse(source: &Path, logical: &str, content: &str) -> Result<Self> {
        let name = logical.rsplit('/').next().unwrap_or(logical);
        if name.is_empty() {
            return Err(Error::parse(source, "policy file has no name"));
        }
        let file: PolicyFile =
            serde_json::from_str(content).map_err(|e| Error::parse(source, e.to_string()))?;
        Ok(Self::new(name, file.policy))
    }
}

/// Reconciles ACL policies.
pub struct SysPolicyHandler {
    backend: Arc<dyn VaultBackend>,
    root: PathBuf,
    live: Vec<String>,
    configured: BTreeSet<String>,
}

impl fmt::Debug for SysPolicyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SysPolicyHandler")
            .field("root", &self.root)
            .field("live", &self.live)
            .field("configured", &self.configured)
            .finish_non_exhaustive()
    }
}

impl SysPolicyHandler {
    /// Create the handler, snapshotting the live policy names.
    pub fn new(backend: Arc<dyn VaultBackend>, root: impl Into<PathBuf>) -> Result<Self> {
        let live = backend
            .list_policies()
            .map_err(|e| Error::remote(SYS_POLICY_PREFIX, e))?;
        log::debug!("Loaded {} live policies", live.len());
        Ok(Self {
            backend,
            root: root.into(),
            live,
            configured: BTreeSet::new(),
        })
    }

    /// Ensure a declared policy exists with identical rules.
    pub fn ensure(&mut self, policy: &DeclaredPolicy, ctx: &ApplyContext) -> Result<ApplyResult> {
        self.configured.insert(policy.name.clone());
        let resource = format!("{SYS_POLICY_PREFIX}/{}", policy.name);

        let current = if self.live.contains(&policy.name) {
            match self.backend.get_policy(&policy.name) {
                Ok(rules) => Some(rules),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(Error::remote(resource, e)),
            }
        } else {
            None
        };

        if current.as_deref() == Some(policy.rules.as_str()) {
            log::debug!("Policy {} already applied", policy.name);
            return Ok(ApplyResult::NoChange);
        }
        if let Some(live_rules) = &current {
            log::debug!("Policy {} differs:\n{}", policy.name, line_diff(live_rules, &policy.rules));
        }

        if ctx.dry_run {
            log::info!("Would write policy {}", policy.name);
            return Ok(ApplyResult::dry_run());
        }

        log::info!("Writing policy {}", policy.name);
        self.backend
            .put_policy(&policy.name, &policy.rules)
            .map_err(|e| Error::remote(resource, e))?;

        Ok(if current.is_some() {
            ApplyResult::Modified
        } else {
            ApplyResult::Created
        })
    }

    /// Live policy names that are neither declared nor protected, in
    /// snapshot order.
    pub fn undeclared(&self) -> Vec<String> {
        self.live
            .iter()
            .filter(|name| !PROTECTED_POLICIES.contains(&name.as_str()))
            .filter(|name| !self.configured.contains(*name))
            .cloned()
            .collect()
    }
}

impl PathHandler for SysPolicyHandler {
    fn name(&self) -> &str {
        SYS_POLICY_PREFIX
    }

    fn priority(&self) -> u32 {
        20
    }

    fn document_root(&self) -> &Path {
        &self.root
    }

    fn apply_file(&mut self, file: &Path, logical: &str, ctx: &ApplyContext) -> Result<ApplyResult> {
        let content = read_file(file)?;
        let policy = DeclaredPolicy::parse(file, logical, &content)?;
        self.ensure(&policy, ctx)
    }

    fn prune_undeclared(&mut self, ctx: &ApplyContext) -> Result<Vec<String>> {
        let names = self.undeclared();
        for name in &names {
            if ctx.dry_run {
                log::info!("Would delete policy {name}");
                continue;
            }
            log::info!("Deleting policy {name}");
            self.backend
                .delete_policy(name)
                .map_err(|e| Error::remote(format!("{SYS_POLICY_PREFIX}/{name}"), e))?;
        }
        Ok(names)
    }
}

fn line_diff(old: &str, new: &str) -> String {
    let diff = similar::TextDiff::from_lines(old, new);
    let mut out = String::new();
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            similar::ChangeTag::Delete => "-",
            similar::ChangeTag::Insert => "+",
            similar::ChangeTag::Equal => continue,
        };
        out.push_str(sign);
        out.push_str(change.value().trim_end_matches('\n'));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBackend, MockCall};
    use std::fs;
    use tempfile::TempDir;

    fn handler(mock: &MockBackend) -> SysPolicyHandler {
        SysPolicyHandler::new(Arc::new(mock.clone()), "/docs").unwrap()
    }

    #[test]
    fn test_parse_policy_file() {
        let policy = DeclaredPolicy::parse(
            Path::new("/docs/sys/policy/ops.json"),
            "sys/policy/ops",
            r#"{"policy": "path \"secret/*\" { capabilities = [\"read\"] }"}"#,
        )
        .unwrap();
        assert_eq!(policy.name, "ops");
        assert!(policy.rules.starts_with("path"));

        let nested = DeclaredPolicy::parse(Path::new("x"), "sys/policy/team/dev", r#"{"policy": ""}"#).unwrap();
        assert_eq!(nested.name, "dev");
    }

    #[test]
    fn test_parse_lowercases_name() {
        let policy = DeclaredPolicy::parse(Path::new("Ops.json"), "sys/policy/Ops", r#"{"policy": ""}"#).unwrap();
        assert_eq!(policy.name, "ops");
    }

    #[test]
    fn test_parse_rejects_missing_policy_field() {
        let err = DeclaredPolicy::parse(Path::new("ops.json"), "sys/policy/ops", r#"{"rules": "x"}"#).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_ensure_creates_new_policy() {
        let mock = MockBackend::with_default_state();
        let mut handler = handler(&mock);

        let result = handler
            .ensure(&DeclaredPolicy::new("ops", "path \"a\" {}"), &ApplyContext::default())
            .unwrap();
        assert_eq!(result, ApplyResult::Created);
        assert_eq!(mock.calls(), vec![MockCall::PutPolicy("ops".into())]);
        assert_eq!(mock.policy("ops").as_deref(), Some("path \"a\" {}"));
    }

    #[test]
    fn test_ensure_identical_policy_makes_no_call() {
        let mock = MockBackend::with_default_state();
        mock.add_policy("ops", "path \"a\" {}");
        let mut handler = handler(&mock);

        let result = handler
            .ensure(&DeclaredPolicy::new("ops", "path \"a\" {}"), &ApplyContext::default())
            .unwrap();
        assert_eq!(result, ApplyResult::NoChange);
        assert_eq!(mock.mutation_count(), 0);
    }

    #[test]
    fn test_ensure_compares_text_verbatim() {
        let mock = MockBackend::with_default_state();
        mock.add_policy("ops", "path \"a\" {}");
        let mut handler = handler(&mock);

        let result = handler
            .ensure(&DeclaredPolicy::new("ops", "path \"a\" {}\n"), &ApplyContext::default())
            .unwrap();
        assert_eq!(result, ApplyResult::Modified);
    }

    #[test]
    fn test_ensure_propagates_fetch_failure() {
        let mock = MockBackend::with_default_state();
        mock.add_policy("ops", "old");
        mock.fail_on("sys/policy/ops");
        let mut handler = handler(&mock);

        let err = handler
            .ensure(&DeclaredPolicy::new("ops", "new"), &ApplyContext::default())
            .unwrap_err();
        assert!(matches!(err, Error::Remote { .. }));
        assert_eq!(mock.mutation_count(), 0);
    }

    #[test]
    fn test_prune_never_deletes_protected() {
        let mock = MockBackend::with_default_state();
        mock.add_policy("legacy", "");
        let mut handler = handler(&mock);

        let pruned = handler.prune_undeclared(&ApplyContext::default()).unwrap();
        assert_eq!(pruned, vec!["legacy"]);
        assert!(mock.policy("root").is_some());
        assert!(mock.policy("default").is_some());
        assert!(mock.policy("legacy").is_none());
    }

    #[test]
    fn test_end_to_end_policy_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("sys/policy");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("ops.json"), r#"{"policy": "path \"ops/*\" {}"}"#).unwrap();

        let mock = MockBackend::with_default_state();
        mock.add_policy("legacy", "path \"old/*\" {}");
        let mut handler = SysPolicyHandler::new(Arc::new(mock.clone()), temp.path()).unwrap();

        let report = handler.apply_directory(&dir, &ApplyContext::default()).unwrap();
        assert_eq!(report.outcomes[0].resource, "sys/policy/ops");
        assert_eq!(report.outcomes[0].result, ApplyResult::Created);
        assert_eq!(report.pruned, vec!["legacy"]);
        assert_eq!(
            mock.calls(),
            vec![
                MockCall::PutPolicy("ops".into()),
                MockCall::DeletePolicy("legacy".into()),
            ]
        );
    }

    #[test]
    fn test_dry_run_makes_no_mutations() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("sys/policy");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("ops.json"), r#"{"policy": "x"}"#).unwrap();

        let mock = MockBackend::with_default_state();
        mock.add_policy("legacy", "");
        let mut handler = SysPolicyHandler::new(Arc::new(mock.clone()), temp.path()).unwrap();

        let report = handler.apply_directory(&dir, &ApplyContext::new(true)).unwrap();
        assert_eq!(report.outcomes[0].result, ApplyResult::dry_run());
        assert_eq!(report.pruned, vec!["legacy"]);
        assert!(mock.calls().is_empty());
        assert!(mock.policy("legacy").is_some());
    }

    #[test]
    fn test_mixed_case_file_name_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("sys/policy");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("Ops.json"), r#"{"policy": "path \"ops/*\" {}"}"#).unwrap();

        let mock = MockBackend::with_default_state();
        for _ in 0..2 {
            let mut handler = SysPolicyHandler::new(Arc::new(mock.clone()), temp.path()).unwrap();
            let report = handler.apply_directory(&dir, &ApplyContext::default()).unwrap();
            assert!(report.pruned.is_empty());
        }

        assert_eq!(mock.calls(), vec![MockCall::PutPolicy("ops".into())]);
        assert_eq!(mock.policy("ops").as_deref(), Some("path \"ops/*\" {}"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_policy_is_declared() {
        let shared = TempDir::new().unwrap();
        let target = shared.path().join("ops.json");
        fs::write(&target, r#"{"policy": "path \"ops/*\" {}"}"#).unwrap();

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("sys/policy");
        fs::create_dir_all(&dir).unwrap();
        std::os::unix::fs::symlink(&target, dir.join("ops.json")).unwrap();

        let mock = MockBackend::with_default_state();
        mock.add_policy("ops", "path \"ops/*\" {}");
        let mut handler = SysPolicyHandler::new(Arc::new(mock.clone()), temp.path()).unwrap();

        let report = handler.apply_directory(&dir, &ApplyContext::default()).unwrap();
        assert_eq!(report.outcomes[0].result, ApplyResult::NoChange);
        assert!(report.pruned.is_empty());
        assert!(mock.calls().is_empty());
        assert!(mock.policy("ops").is_some());
    }

    #[test]
    fn test_line_diff() {
        let diff = line_diff("a\nb\n", "a\nc\n");
        assert_eq!(diff, "-b\n+c\n");
    }
}
