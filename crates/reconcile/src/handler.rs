//! Handler trait for owned subtrees of the declared tree
//!
//! A handler owns every file under one directory. Applying the directory
//! ensures each declared resource, then prunes live resources that were not
//! declared.

use crate::context::ApplyContext;
use crate::error::{Error, Result};
use crate::types::{ApplyResult, HandlerReport};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Core trait for resource handlers
///
/// Every handler provides:
/// - Identity and dispatch priority
/// - Ensure for a single declared file ([`PathHandler::apply_file`])
/// - Pruning of undeclared live resources
///
/// Live state is snapshotted when the handler is constructed and never
/// refreshed during a run.
pub trait PathHandler: fmt::Debug {
    /// Handler name used in logs and reports
    fn name(&self) -> &str;

    /// Dispatch priority. Lower runs first; zero runs after all others.
    fn priority(&self) -> u32 {
        0
    }

    /// Root of the declared tree, used to derive logical paths
    fn document_root(&self) -> &Path;

    /// Ensure the resource declared in `file` exists and matches.
    ///
    /// `logical` is the file's path relative to the document root, with
    /// `/` separators and without a `.json` extension.
    fn apply_file(&mut self, file: &Path, logical: &str, ctx: &ApplyContext) -> Result<ApplyResult>;

    /// Remove live resources that were not declared during this run.
    ///
    /// Returns the removed identifiers in order. On a dry run, returns what
    /// would be removed without removing anything.
    fn prune_undeclared(&mut self, ctx: &ApplyContext) -> Result<Vec<String>>;

    /// Apply every file under `dir`, then prune exactly once.
    ///
    /// Directories are only traversed. Symlinks are followed, so a link to a
    /// file declares that file under the link's own path. Files whose name
    /// starts with `_` are never resources. A missing `dir` contributes no
    /// files.
    fn apply_directory(&mut self, dir: &Path, ctx: &ApplyContext) -> Result<HandlerReport> {
        let mut report = HandlerReport::new(self.name());
        report.dry_run = ctx.dry_run;

        if dir.is_dir() {
            for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
                let entry = entry.map_err(|e| walk_error(dir, e))?;
                if !entry.file_type().is_file() || is_ignored(entry.path()) {
                    continue;
                }

                let logical = logical_path(self.document_root(), entry.path());
                log::debug!("[{}] applying {}", self.name(), logical);
                let result = self.apply_file(entry.path(), &logical, ctx)?;
                log::info!("{}: {:?}", logical, result);
                report.push(logical, result);
            }
        } else {
            log::debug!("[{}] {} does not exist, nothing to apply", self.name(), dir.display());
        }

        report.pruned = self.prune_undeclared(ctx)?;
        Ok(report)
    }
}

/// Whether a file is excluded from the declared resources.
pub fn is_ignored(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

/// Path of `path` relative to `root`, with `/` separators.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Derive the logical resource path of `file` relative to `root`.
///
/// A trailing `.json` is dropped, so `<root>/sys/policy/ops.json` becomes
/// `sys/policy/ops`.
pub fn logical_path(root: &Path, file: &Path) -> String {
    let joined = relative_path(root, file);
    match joined.strip_suffix(".json") {
        Some(stripped) => stripped.to_string(),
        None => joined,
    }
}

/// Read a declared file to a string.
pub fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::io(path, e))
}

pub(crate) fn walk_error(dir: &Path, err: walkdir::Error) -> Error {
    let path = err.path().map_or_else(|| dir.to_path_buf(), PathBuf::from);
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    Error::io(path, source)
}
