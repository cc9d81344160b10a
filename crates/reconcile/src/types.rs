//! Core types for reconciliation results

use serde::{Deserialize, Serialize};

/// Result of ensuring or pruning a single resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplyResult {
    /// Live state already matches the declaration
    NoChange,
    /// Resource was created
    Created,
    /// Resource was updated in place
    Modified,
    /// Resource was removed
    Removed,
    /// Change was not made
    Skipped { reason: String },
}

impl ApplyResult {
    /// Result used for every change withheld by a dry run
    pub fn dry_run() -> Self {
        Self::Skipped {
            reason: "Dry run".to_string(),
        }
    }

    /// Check if the result represents a change
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Created | Self::Modified | Self::Removed)
    }
}

/// Outcome of applying one resource file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOutcome {
    /// Logical path of the resource, e.g. `sys/policy/ops`
    pub resource: String,
    pub result: ApplyResult,
}

/// Everything one handler did while applying its directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerReport {
    /// Handler name
    pub handler: String,
    /// Per-file outcomes, in visit order
    pub outcomes: Vec<ResourceOutcome>,
    /// Identifiers removed (or, on a dry run, that would be removed)
    pub pruned: Vec<String>,
    /// Whether pruning only reported
    pub dry_run: bool,
}

impl HandlerReport {
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            ..Default::default()
        }
    }

    /// Record the outcome for one resource
    pub fn push(&mut self, resource: impl Into<String>, result: ApplyResult) {
        self.outcomes.push(ResourceOutcome {
            resource: resource.into(),
            result,
        });
    }

    /// Summarize this report
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for outcome in &self.outcomes {
            summary.add_result(&outcome.result);
        }
        let prune_result = if self.dry_run {
            ApplyResult::dry_run()
        } else {
            ApplyResult::Removed
        };
        for _ in &self.pruned {
            summary.add_result(&prune_result);
        }
        summary
    }
}

/// Counts of each outcome across a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub created: usize,
    pub modified: usize,
    pub removed: usize,
    pub skipped: usize,
    pub no_change: usize,
}

impl RunSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.modified + self.removed
    }

    /// Total number of resources processed
    pub fn total(&self) -> usize {
        self.created + self.modified + self.removed + self.skipped + self.no_change
    }

    /// Merge another summary into this one
    pub fn merge(&mut self, other: &RunSummary) {
        self.created += other.created;
        self.modified += other.modified;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.no_change += other.no_change;
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::NoChange => self.no_change += 1,
            ApplyResult::Created => self.created += 1,
            ApplyResult::Modified => self.modified += 1,
            ApplyResult::Removed => self.removed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Reports of every dispatched handler, in dispatch order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub handlers: Vec<HandlerReport>,
    /// Directories that no handler owned
    pub unhandled: Vec<String>,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for report in &self.handlers {
            summary.merge(&report.summary());
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_result_is_change() {
        assert!(ApplyResult::Created.is_change());
        assert!(ApplyResult::Modified.is_change());
        assert!(ApplyResult::Removed.is_change());
        assert!(!ApplyResult::NoChange.is_change());
        assert!(!ApplyResult::dry_run().is_change());
    }

    #[test]
    fn test_summary_add_and_merge() {
        let mut a = RunSummary::default();
        a.add_result(&ApplyResult::Created);
        a.add_result(&ApplyResult::NoChange);

        let mut b = RunSummary::default();
        b.add_result(&ApplyResult::Removed);
        b.add_result(&ApplyResult::dry_run());

        a.merge(&b);
        assert_eq!(a.total_changes(), 2);
        assert_eq!(a.total(), 4);
        assert_eq!(a.skipped, 1);
    }

    #[test]
    fn test_handler_report_counts_pruned() {
        let mut report = HandlerReport::new("sys/policy");
        report.push("sys/policy/ops", ApplyResult::Created);
        report.pruned = vec!["legacy".into(), "old".into()];

        let summary = report.summary();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.removed, 2);

        report.dry_run = true;
        let summary = report.summary();
        assert_eq!(summary.removed, 0);
        assert_eq!(summary.skipped, 2);
    }

    #[test]
    fn test_run_report_summary() {
        let mut first = HandlerReport::new("sys/auth");
        first.push("sys/auth/ldap", ApplyResult::Modified);
        let mut second = HandlerReport::new("generic");
        second.push("secret/app", ApplyResult::Modified);

        let report = RunReport {
            handlers: vec![first, second],
            unhandled: vec![],
        };
        assert_eq!(report.summary().modified, 2);
    }
}
