use colored::Colorize;
use reconcile::{ApplyResult, RunReport, RunSummary};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Short label for an apply result
pub fn result_label(result: &ApplyResult) -> String {
    match result {
        ApplyResult::NoChange => "unchanged".dimmed().to_string(),
        ApplyResult::Created => "created".green().to_string(),
        ApplyResult::Modified => "updated".yellow().to_string(),
        ApplyResult::Removed => "removed".red().to_string(),
        ApplyResult::Skipped { reason } => format!("skipped ({reason})").blue().to_string(),
    }
}

/// One-line summary, e.g. "2 created, 1 updated, 4 unchanged"
pub fn summary_line(summary: &RunSummary) -> String {
    let parts: Vec<String> = [
        (summary.created, "created"),
        (summary.modified, "updated"),
        (summary.removed, "removed"),
        (summary.skipped, "skipped"),
        (summary.no_change, "unchanged"),
    ]
    .iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, label)| format!("{count} {label}"))
    .collect();

    if parts.is_empty() {
        "nothing to apply".to_string()
    } else {
        parts.join(", ")
    }
}

/// Print every handler's outcomes followed by the totals
pub fn report(report: &RunReport, dry_run: bool, verbose: bool) {
    for handler in &report.handlers {
        let changed: Vec<_> = handler
            .outcomes
            .iter()
            .filter(|o| verbose || o.result != ApplyResult::NoChange)
            .collect();
        if changed.is_empty() && handler.pruned.is_empty() {
            continue;
        }

        section(&handler.handler);
        for outcome in changed {
            println!("  {} {}", result_label(&outcome.result), outcome.resource);
        }
        let verb = if dry_run { "would remove" } else { "removed" };
        for id in &handler.pruned {
            println!("  {} {}", verb.red(), id);
        }
    }

    if verbose {
        for dir in &report.unhandled {
            dim(&format!("no handler for {dir}"));
        }
    }

    println!();
    let summary = report.summary();
    if dry_run {
        info(&format!("Dry run: {}", summary_line(&summary)));
    } else if summary.total_changes() == 0 {
        success("Vault already matches the configuration");
    } else {
        success(&summary_line(&summary));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let summary = RunSummary {
            created: 2,
            modified: 1,
            no_change: 4,
            ..Default::default()
        };
        assert_eq!(summary_line(&summary), "2 created, 1 updated, 4 unchanged");
    }

    #[test]
    fn test_summary_line_empty() {
        assert_eq!(summary_line(&RunSummary::default()), "nothing to apply");
    }

    #[test]
    fn test_result_label_mentions_reason() {
        colored::control::set_override(false);
        assert_eq!(result_label(&ApplyResult::dry_run()), "skipped (Dry run)");
        assert_eq!(result_label(&ApplyResult::Modified), "updated");
    }
}
