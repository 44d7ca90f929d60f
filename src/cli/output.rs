//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{ConfigDocument, ConfigParser, ValidationResult};
use crate::diff::{Change, DiffResult, EntityKind};
use crate::reconciler::{PlanReport, RunReport, SkippedEntity};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Planned call row for table display.
#[derive(Tabled)]
struct OperationRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Entity")]
    entity: String,
    #[tabled(rename = "Call")]
    call: String,
}

/// Per-kind summary row of an apply run.
#[derive(Tabled)]
struct RunRow {
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Changes")]
    changes: usize,
    #[tabled(rename = "Calls")]
    calls: usize,
    #[tabled(rename = "Succeeded")]
    succeeded: String,
    #[tabled(rename = "Failed")]
    failed: String,
    #[tabled(rename = "Skipped")]
    skipped: String,
    #[tabled(rename = "Duration")]
    duration: String,
}

/// Changes of one kind, for JSON output.
#[derive(Serialize)]
struct KindChanges<'c> {
    kind: EntityKind,
    changes: &'c [Change],
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of validating a document.
    #[must_use]
    pub fn format_validation(
        &self,
        document: &ConfigDocument,
        result: &ValidationResult,
        show_warnings: bool,
    ) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "valid": result.is_valid(),
                "errors": result
                    .errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect::<Vec<_>>(),
                "warnings": result.warnings,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid!\n", "✓".green())
                } else {
                    let mut output = format!("{} Configuration is invalid:\n", "✗".red());
                    for error in &result.errors {
                        let _ = writeln!(output, "   - {}: {}", error.field, error.message);
                    }
                    output
                };

                if show_warnings && !result.warnings.is_empty() {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }

                let spec = &document.spec;
                output.push_str("\nConfiguration summary:\n");
                let _ = writeln!(
                    output,
                    "   Space developers: {}",
                    Self::section_size(spec.space_developers.as_ref().map(Vec::len))
                );
                let _ = writeln!(
                    output,
                    "   Services: {}",
                    Self::section_size(spec.services.as_ref().map(|s| s.len()))
                );
                let _ = writeln!(
                    output,
                    "   Applications: {}",
                    Self::section_size(spec.apps.as_ref().map(|a| a.len()))
                );
                output
            }
        }
    }

    /// Formats the change lists of several kinds.
    #[must_use]
    pub fn format_changes(&self, changes: &[(EntityKind, Vec<Change>)]) -> String {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<KindChanges<'_>> = changes
                    .iter()
                    .map(|(kind, changes)| KindChanges { kind: *kind, changes })
                    .collect();
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                if changes.iter().all(|(_, c)| c.is_empty()) {
                    return format!("{} No drift detected - space is converged.\n", "✓".green());
                }

                let mut output = String::new();
                for (kind, changes) in changes {
                    if changes.is_empty() {
                        continue;
                    }
                    let _ = writeln!(output, "\n{} ({}):", kind.field_name().bold(), changes.len());
                    for change in changes {
                        let line = change.to_string();
                        let line = if change.is_object_added() {
                            line.green()
                        } else if change.is_object_removed() {
                            line.red()
                        } else {
                            line.yellow()
                        };
                        let _ = writeln!(output, "   {line}");
                    }
                }

                let all = changes.iter().flat_map(|(_, c)| c.iter().cloned()).collect();
                if let Ok(result) = DiffResult::build(all) {
                    let summary = result.summary();
                    let _ = write!(
                        output,
                        "\nDiff: {} to create, {} to update, {} to delete\n",
                        summary.creates.to_string().green(),
                        summary.updates.to_string().yellow(),
                        summary.deletes.to_string().red()
                    );
                }
                output
            }
        }
    }

    /// Formats dry-run plans.
    #[must_use]
    pub fn format_plans(&self, plans: &[PlanReport]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(plans).unwrap_or_default(),
            OutputFormat::Text => {
                if plans.iter().all(PlanReport::is_empty) {
                    return format!(
                        "{} No changes required - space is up to date.\n",
                        "✓".green()
                    );
                }

                let mut output = String::from("\nPlan\n");
                for plan in plans {
                    let _ = writeln!(
                        output,
                        "   {} desired: {}",
                        plan.kind.field_name(),
                        plan.fingerprint
                    );
                }
                output.push('\n');

                let rows: Vec<OperationRow> = plans
                    .iter()
                    .flat_map(|p| &p.operations)
                    .enumerate()
                    .map(|(i, op)| OperationRow {
                        index: i + 1,
                        kind: op.kind.display_name().to_string(),
                        entity: op.entity.clone(),
                        call: op.operation.to_string(),
                    })
                    .collect();

                let calls = rows.len();
                if !rows.is_empty() {
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }

                Self::write_skipped(&mut output, plans.iter().flat_map(|p| &p.skipped));
                let _ = write!(output, "\nPlan: {} calls\n", calls.to_string().yellow());
                output
            }
        }
    }

    /// Formats the reports of an apply run.
    #[must_use]
    pub fn format_runs(&self, runs: &[RunReport]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(runs).unwrap_or_default(),
            OutputFormat::Text => {
                if runs.is_empty() {
                    return String::from("Nothing to reconcile.\n");
                }

                let rows: Vec<RunRow> = runs
                    .iter()
                    .map(|r| RunRow {
                        kind: r.kind.field_name().to_string(),
                        changes: r.changes,
                        calls: r.batch.total(),
                        succeeded: r.batch.succeeded().to_string().green().to_string(),
                        failed: Self::count_colored(r.batch.failed()),
                        skipped: Self::count_colored(r.skipped.len()),
                        duration: format!("{}ms", r.batch.duration().num_milliseconds()),
                    })
                    .collect();

                let mut output = String::from("\n");
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');

                let failures: Vec<_> = runs.iter().flat_map(|r| r.batch.failures()).collect();
                if !failures.is_empty() {
                    let _ = write!(output, "\n{} Failed calls:\n", "✗".red());
                    for failure in failures {
                        let _ = writeln!(
                            output,
                            "   - {}: {}",
                            failure.operation,
                            failure.error.as_deref().unwrap_or_default()
                        );
                    }
                }
                Self::write_skipped(&mut output, runs.iter().flat_map(|r| &r.skipped));

                let status = if runs.iter().all(RunReport::is_converged) {
                    format!("{} Reconciliation successful", "✓".green())
                } else {
                    format!("{} Reconciliation finished with errors", "⚠".yellow())
                };
                let _ = writeln!(output, "\n{status}");
                output
            }
        }
    }

    /// Formats a configuration document.
    #[must_use]
    pub fn format_document(&self, document: &ConfigDocument) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(document).unwrap_or_default(),
            OutputFormat::Text => ConfigParser::to_yaml(document).unwrap_or_default(),
        }
    }

    fn write_skipped<'r>(
        output: &mut String,
        skipped: impl Iterator<Item = &'r SkippedEntity>,
    ) {
        let mut skipped = skipped.peekable();
        if skipped.peek().is_none() {
            return;
        }
        let _ = write!(output, "\n{} Skipped entities:\n", "⚠".yellow());
        for entity in skipped {
            let name = if entity.entity.is_empty() {
                "space developers"
            } else {
                entity.entity.as_str()
            };
            let _ = writeln!(output, "   - {name}: {}", entity.reason);
        }
    }

    fn count_colored(count: usize) -> String {
        if count == 0 {
            count.to_string()
        } else {
            count.to_string().red().to_string()
        }
    }

    fn section_size(size: Option<usize>) -> String {
        size.map_or_else(|| String::from("not managed"), |n| n.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::diff::{AffectedObject, ChangePath};
    use crate::planner::BatchReport;

    fn removal() -> (EntityKind, Vec<Change>) {
        (
            EntityKind::Services,
            vec![Change::object_removed(
                ChangePath::entity(EntityKind::Services, "s1"),
                AffectedObject::Service(ServiceConfig::new("redis", "small")),
            )],
        )
    }

    #[test]
    fn test_changes_text_lists_paths() {
        colored::control::set_override(false);
        let output = OutputFormatter::new(OutputFormat::Text).format_changes(&[removal()]);
        assert!(output.contains("- services/s1"));
    }

    #[test]
    fn test_changes_text_summarizes_entities() {
        colored::control::set_override(false);
        let output = OutputFormatter::new(OutputFormat::Text).format_changes(&[removal()]);
        assert!(output.contains("Diff: 0 to create, 0 to update, 1 to delete"));
    }

    #[test]
    fn test_runs_text_shows_duration() {
        colored::control::set_override(false);
        let run = RunReport {
            kind: EntityKind::Services,
            fingerprint: String::from("abc"),
            changes: 0,
            entities_planned: 0,
            skipped: Vec::new(),
            batch: BatchReport::empty(),
        };
        let output = OutputFormatter::new(OutputFormat::Text).format_runs(&[run]);
        assert!(output.contains("Duration"));
        assert!(output.contains("0ms"));
        assert!(output.contains("Reconciliation successful"));
    }

    #[test]
    fn test_changes_json() {
        let output = OutputFormatter::new(OutputFormat::Json).format_changes(&[removal()]);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value[0]["changes"][0]["change"], "objectRemoved");
    }

    #[test]
    fn test_empty_changes_are_converged() {
        colored::control::set_override(false);
        let output = OutputFormatter::new(OutputFormat::Text)
            .format_changes(&[(EntityKind::Applications, Vec::new())]);
        assert!(output.contains("converged"));
    }

    #[test]
    fn test_document_as_yaml() {
        let mut document = ConfigDocument::default();
        document.spec.space_developers = Some(vec![String::from("alice")]);
        let output = OutputFormatter::new(OutputFormat::Text).format_document(&document);
        assert!(output.contains("spaceDevelopers"));
        assert!(output.contains("alice"));
    }
}
