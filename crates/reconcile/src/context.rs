//! Apply context passed to handlers

/// Per-run flags passed to handler apply operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyContext {
    /// Whether this is a dry run (no mutating calls)
    pub dry_run: bool,
}

impl ApplyContext {
    /// Create a new apply context
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}
