//! Auth mount handler for `sys/auth`.
//!
//! Each file under `sys/auth` declares one auth method. The mount path is
//! the file's logical path below `sys/auth/`, with a trailing `/`.

use crate::canonical::{CanonicalError, CanonicalMount};
use crate::context::ApplyContext;
use crate::error::{Error, Result};
use crate::handler::{PathHandler, read_file};
use crate::types::ApplyResult;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vaultkit::{AuthMount, EnableAuthOptions, VaultBackend};

/// Logical prefix owned by this handler.
pub const SYS_AUTH_PREFIX: &str = "sys/auth";

/// Mount types that are never disabled.
pub const PROTECTED_MOUNT_TYPES: &[&str] = &["token"];

/// One declared auth mount.
#[derive(Debug, Clone)]
pub struct DeclaredMount {
    /// Mount path with trailing `/`, e.g. `ldap/`
    pub path: String,
    /// File the declaration came from
    pub source: PathBuf,
    pub options: EnableAuthOptions,
}

impl DeclaredMount {
    /// Parse a declaration from file content.
    pub fn parse(source: &Path, logical: &str, content: &str) -> Result<Self> {
        let relative = logical
            .strip_prefix(SYS_AUTH_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| Error::parse(source, format!("{logical} is not under {SYS_AUTH_PREFIX}/")))?;

        let options: EnableAuthOptions =
            serde_json::from_str(content).map_err(|e| Error::parse(source, e.to_string()))?;
        if options.mount_type.is_empty() {
            return Err(Error::parse(source, "auth mount is missing \"type\""));
        }

        Ok(Self {
            path: format!("{relative}/"),
            source: source.to_path_buf(),
            options,
        })
    }
}

/// Reconciles auth mounts.
pub struct SysAuthHandler {
    backend: Arc<dyn VaultBackend>,
    root: PathBuf,
    live: BTreeMap<String, AuthMount>,
    configured: BTreeMap<String, CanonicalMount>,
}

impl fmt::Debug for SysAuthHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SysAuthHandler")
            .field("root", &self.root)
            .field("live", &self.live.keys().collect::<Vec<_>>())
            .field("configured", &self.configured.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SysAuthHandler {
    /// Create the handler, snapshotting the live auth mounts.
    pub fn new(backend: Arc<dyn VaultBackend>, root: impl Into<PathBuf>) -> Result<Self> {
        let live = backend
            .list_auth()
            .map_err(|e| Error::remote(SYS_AUTH_PREFIX, e))?;
        log::debug!("Loaded {} live auth mount(s)", live.len());
        Ok(Self {
            backend,
            root: root.into(),
            live,
            configured: BTreeMap::new(),
        })
    }

    /// Ensure a declared mount exists with matching configuration.
    pub fn ensure(&mut self, mount: &DeclaredMount, ctx: &ApplyContext) -> Result<ApplyResult> {
        let declared = CanonicalMount::from_declared(&mount.options).map_err(|source| {
            Error::ConfigMismatch {
                path: mount.source.clone(),
                source,
            }
        })?;
        self.configured.insert(mount.path.clone(), declared.clone());

        let existing = self.live.get(&mount.path).map(CanonicalMount::from_live);
        if let Some(live) = &existing {
            if live.mount_type != declared.mount_type {
                return Err(Error::ConfigMismatch {
                    path: mount.source.clone(),
                    source: CanonicalError::MountTypeChanged {
                        path: mount.path.clone(),
                        live: live.mount_type.clone(),
                        declared: declared.mount_type.clone(),
                    },
                });
            }
            if *live == declared {
                log::debug!("Auth mount {} already applied", mount.path);
                return Ok(ApplyResult::NoChange);
            }
        }

        if ctx.dry_run {
            log::info!("Would apply auth mount {} ({})", mount.path, declared.mount_type);
            return Ok(ApplyResult::dry_run());
        }

        log::info!("Applying auth mount {} ({})", mount.path, declared.mount_type);
        self.backend
            .enable_auth(&mount.path, &mount.options)
            .map_err(|e| Error::remote(format!("{SYS_AUTH_PREFIX}/{}", mount.path), e))?;

        Ok(if existing.is_some() {
            ApplyResult::Modified
        } else {
            ApplyResult::Created
        })
    }

    /// Live mount paths that are neither declared nor protected.
    pub fn undeclared(&self) -> Vec<String> {
        self.live
            .iter()
            .filter(|(path, _)| !self.configured.contains_key(*path))
            .filter(|(_, mount)| !PROTECTED_MOUNT_TYPES.contains(&mount.mount_type.as_str()))
            .map(|(path, _)| path.clone())
            .collect()
    }
}

impl PathHandler for SysAuthHandler {
    fn name(&self) -> &str {
        SYS_AUTH_PREFIX
    }

    fn priority(&self) -> u32 {
        10
    }

    fn document_root(&self) -> &Path {
        &self.root
    }

    fn apply_file(&mut self, file: &Path, logical: &str, ctx: &ApplyContext) -> Result<ApplyResult> {
        let content = read_file(file)?;
        let mount = DeclaredMount::parse(file, logical, &content)?;
        self.ensure(&mount, ctx)
    }

    fn prune_undeclared(&mut self, ctx: &ApplyContext) -> Result<Vec<String>> {
        let paths = self.undeclared();
        for path in &paths {
            if ctx.dry_run {
                log::info!("Would disable auth mount {path}");
                continue;
            }
            log::info!("Disabling auth mount {path}");
            self.backend
                .disable_auth(path)
                .map_err(|e| Error::remote(format!("{SYS_AUTH_PREFIX}/{path}"), e))?;
        }
        Ok(paths)
    }
}
