//! Dispatch of the declared tree to handlers.
//!
//! The walker binds handlers to logical prefixes (`sys/auth`,
//! `sys/policy`), dispatches them in priority order, then walks the rest of
//! the tree and hands every unowned top-level subtree to the generic
//! fallback.
//!
//! A bound prefix owns all of its descendants: a binding below another
//! binding is shadowed and never dispatched, and the walk never descends
//! into an owned subtree.

use crate::context::ApplyContext;
use crate::error::{Error, Result};
use crate::handler::{PathHandler, relative_path, walk_error};
use crate::handlers::sys_auth::SYS_AUTH_PREFIX;
use crate::handlers::sys_policy::SYS_POLICY_PREFIX;
use crate::handlers::{GenericHandler, SysAuthHandler, SysPolicyHandler};
use crate::template::TemplateParams;
use crate::types::RunReport;
use std::collections::BTreeSet;
use std::io;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use vaultkit::VaultBackend;
use walkdir::WalkDir;

/// Prefix shown for the wildcard fallback binding.
pub const WILDCARD: &str = "*";

/// A handler bound to the directory at `prefix`.
#[derive(Debug)]
pub struct HandlerBinding {
    /// Logical prefix relative to the document root, `/`-separated
    pub prefix: String,
    pub handler: Box<dyn PathHandler>,
}

impl HandlerBinding {
    pub fn new(prefix: impl Into<String>, handler: Box<dyn PathHandler>) -> Self {
        Self {
            prefix: prefix.into(),
            handler,
        }
    }
}

/// Set of bound prefixes, answering ownership questions for a path.
#[derive(Debug, Clone, Default)]
pub struct OwnershipIndex {
    prefixes: BTreeSet<String>,
}

impl OwnershipIndex {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `path` itself is bound.
    pub fn is_bound(&self, path: &str) -> bool {
        self.prefixes.contains(path)
    }

    /// The outermost bound proper ancestor of `path`, if any.
    pub fn owner_of(&self, path: &str) -> Option<&str> {
        path.match_indices('/')
            .map(|(i, _)| &path[..i])
            .find_map(|ancestor| self.prefixes.get(ancestor))
            .map(String::as_str)
    }

    /// Whether some bound prefix lies strictly below `path`.
    pub fn has_bound_descendant(&self, path: &str) -> bool {
        let lower = format!("{path}/");
        self.prefixes
            .range::<str, _>((Bound::Included(lower.as_str()), Bound::Unbounded))
            .next()
            .is_some_and(|p| p.starts_with(&lower))
    }
}

/// Top-level orchestrator for one reconciliation run.
#[derive(Debug)]
pub struct ConfigWalker {
    root: PathBuf,
    bindings: Vec<HandlerBinding>,
    fallback: Box<dyn PathHandler>,
    index: OwnershipIndex,
}

impl ConfigWalker {
    /// Create a walker with the standard handlers.
    ///
    /// `sys/auth` and `sys/policy` are bound only when present as
    /// directories under `root`. Handlers snapshot live state here.
    pub fn new(backend: Arc<dyn VaultBackend>, root: impl Into<PathBuf>, params: TemplateParams) -> Result<Self> {
        let root = root.into();
        ensure_directory(&root)?;

        let mut bindings = Vec::new();
        if root.join(SYS_AUTH_PREFIX).is_dir() {
            log::debug!("Instantiating handler for {SYS_AUTH_PREFIX}");
            bindings.push(HandlerBinding::new(
                SYS_AUTH_PREFIX,
                Box::new(SysAuthHandler::new(backend.clone(), &root)?),
            ));
        }
        if root.join(SYS_POLICY_PREFIX).is_dir() {
            log::debug!("Instantiating handler for {SYS_POLICY_PREFIX}");
            bindings.push(HandlerBinding::new(
                SYS_POLICY_PREFIX,
                Box::new(SysPolicyHandler::new(backend.clone(), &root)?),
            ));
        }

        let fallback = Box::new(GenericHandler::new(backend, &root, params));
        Ok(Self::with_bindings(root, bindings, fallback))
    }

    /// Create a walker from explicit bindings.
    ///
    /// Bindings are ordered by ascending priority, priority zero after all
    /// others, ties broken by prefix.
    pub fn with_bindings(root: impl Into<PathBuf>, mut bindings: Vec<HandlerBinding>, fallback: Box<dyn PathHandler>) -> Self {
        bindings.sort_by(|a, b| {
            let (pa, pb) = (a.handler.priority(), b.handler.priority());
            (pa == 0, pa, &a.prefix).cmp(&(pb == 0, pb, &b.prefix))
        });
        let index = OwnershipIndex::new(bindings.iter().map(|b| b.prefix.clone()));
        Self {
            root: root.into(),
            bindings,
            fallback,
            index,
        }
    }

    /// Document root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Binding prefixes in the order they will be dispatched, ending with
    /// the wildcard. Shadowed bindings are left out.
    pub fn dispatch_order(&self) -> Vec<&str> {
        self.bindings
            .iter()
            .map(|b| b.prefix.as_str())
            .filter(|prefix| self.index.owner_of(prefix).is_none())
            .chain(std::iter::once(WILDCARD))
            .collect()
    }

    /// Apply the whole tree.
    ///
    /// Any error aborts the run; handlers dispatched before the failure
    /// have already applied their changes.
    pub fn run(&mut self, ctx: &ApplyContext) -> Result<RunReport> {
        ensure_directory(&self.root)?;
        log::info!("Starting in directory {}", self.root.display());

        let mut report = RunReport::default();
        let mut visited = BTreeSet::new();

        for binding in &mut self.bindings {
            if let Some(owner) = self.index.owner_of(&binding.prefix) {
                log::debug!("Not dispatching {}, handled by {}", binding.prefix, owner);
                continue;
            }
            log::info!("Processing {}", binding.prefix);
            let dir = join_logical(&self.root, &binding.prefix);
            report.handlers.push(binding.handler.apply_directory(&dir, ctx)?);
            visited.insert(binding.prefix.clone());
        }

        let mut entries = WalkDir::new(&self.root).min_depth(1).sort_by_file_name().into_iter();
        while let Some(entry) = entries.next() {
            let entry = entry.map_err(|e| walk_error(&self.root, e))?;
            if !entry.file_type().is_dir() {
                continue;
            }

            let relative = relative_path(&self.root, entry.path());
            if entry.file_name().to_string_lossy().starts_with('.') {
                log::debug!("Skipping hidden directory {relative}");
                entries.skip_current_dir();
                continue;
            }
            if visited.contains(&relative) || self.index.is_bound(&relative) {
                entries.skip_current_dir();
                continue;
            }
            if let Some(owner) = self.index.owner_of(&relative) {
                log::debug!("Skipping {relative}, handled by {owner}");
                entries.skip_current_dir();
                continue;
            }
            if self.index.has_bound_descendant(&relative) {
                log::info!("No handler for path {relative}");
                report.unhandled.push(relative);
                continue;
            }

            log::info!("Processing {relative}");
            report.handlers.push(self.fallback.apply_directory(entry.path(), ctx)?);
            entries.skip_current_dir();
        }

        Ok(report)
    }
}

fn ensure_directory(root: &Path) -> Result<()> {
    if root.is_dir() {
        return Ok(());
    }
    Err(Error::io(
        root,
        io::Error::new(io::ErrorKind::NotFound, "document root is not a directory"),
    ))
}

fn join_logical(root: &Path, logical: &str) -> PathBuf {
    logical.split('/').fold(root.to_path_buf(), |path, part| path.join(part))
}
