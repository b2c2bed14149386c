// restmigrate/src/import/loader.rs
use anyhow::Result;

use super::prompt::{Answer, Confirm};
use crate::target::TargetStore;

/// What to do when the target table already has rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearMode {
    /// Ask; empty answer or no available input means clear.
    Ask,
    /// Clear without asking.
    Force,
    /// Never clear; append to existing rows.
    Keep,
}

/// How statement failures inside one table's batch are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Run every statement; show the first `shown_errors` failures and count the rest.
    Tolerant { shown_errors: usize },
    /// Stop the batch at the first failure.
    Strict,
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub clear_mode: ClearMode,
    pub execution: ExecutionMode,
    pub reset_sequences: bool,
}

/// Per-table outcome of a load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub table: String,
    pub statements: usize,
    pub target_before: Option<i64>,
    pub target_after: Option<i64>,
    pub cleared: bool,
    pub executed: usize,
    pub failed: usize,
    /// Set when the batch was not (fully) applied: truncate failed or strict mode stopped.
    pub aborted: Option<String>,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.aborted.is_none() && self.failed == 0
    }
}

/// Decides whether to clear a table that holds `existing_rows` rows.
pub async fn should_clear<C>(mode: ClearMode, table: &str, existing_rows: i64, confirm: &mut C) -> Result<bool>
where
    C: Confirm + ?Sized,
{
    if existing_rows <= 0 {
        return Ok(false);
    }
    println!("  ⚠️  Table {} already has {} rows", table, existing_rows);

    match mode {
        ClearMode::Force => Ok(true),
        ClearMode::Keep => {
            println!("  Keeping existing data, appending new data...");
            Ok(false)
        }
        ClearMode::Ask => match confirm.ask("Clear existing data before import?", true).await? {
            Answer::Yes => Ok(true),
            Answer::No => {
                println!("  Keeping existing data, appending new data...");
                Ok(false)
            }
            Answer::Unavailable => {
                println!(
                    "  ⚠️  Non-interactive mode detected: CLEARING {} existing rows of {} by default (use --keep to append instead)",
                    existing_rows, table
                );
                Ok(true)
            }
        },
    }
}

/// Loads one table's statement batch into the target.
///
/// Only a failing prompt is returned as an error; every per-table problem
/// ends up in the report.
pub async fn load_table<T, C>(
    target: &mut T,
    confirm: &mut C,
    table: &str,
    statements: &[String],
    options: &ImportOptions,
) -> Result<LoadReport>
where
    T: TargetStore + ?Sized,
    C: Confirm + ?Sized,
{
    let mut report = LoadReport {
        table: table.to_string(),
        statements: statements.len(),
        ..LoadReport::default()
    };

    let before = match target.count_rows(table).await {
        Ok(count) => {
            println!("  Current rows in target: {}", count);
            Some(count)
        }
        Err(e) => {
            println!("  ⚠️  Could not get row count for {}: {:#}", table, e);
            None
        }
    };
    report.target_before = before;

    if should_clear(options.clear_mode, table, before.unwrap_or(0), confirm).await? {
        println!("  Clearing existing data...");
        if let Err(e) = target.truncate(table).await {
            println!("  ❌ Failed to truncate {}: {:#}", table, e);
            println!("  ❌ Skipping import for {}", table);
            report.aborted = Some(format!("truncate failed: {:#}", e));
            return Ok(report);
        }
        report.cleared = true;
    }

    println!("  Importing {} statements...", statements.len());
    for (index, statement) in statements.iter().enumerate() {
        match target.execute(statement).await {
            Ok(()) => report.executed += 1,
            Err(e) => {
                report.failed += 1;
                match options.execution {
                    ExecutionMode::Strict => {
                        println!("    ❌ SQL error in statement {}: {}", index + 1, truncate_message(&e));
                        report.aborted = Some(format!(
                            "statement {} failed in strict mode: {:#}",
                            index + 1,
                            e
                        ));
                        break;
                    }
                    ExecutionMode::Tolerant { shown_errors } => {
                        if report.failed <= shown_errors {
                            println!("    ⚠️  SQL error: {}", truncate_message(&e));
                        } else {
                            tracing::debug!(table, statement = index + 1, error = %format!("{:#}", e), "statement failed");
                        }
                    }
                }
            }
        }
    }

    if report.failed > 0 {
        if let ExecutionMode::Tolerant { shown_errors } = options.execution {
            let hidden = report.failed.saturating_sub(shown_errors);
            println!(
                "    ⚠️  {} statements had errors (might be expected for duplicates){}",
                report.failed,
                if hidden > 0 {
                    format!(", {} not shown (RUST_LOG=debug to see them)", hidden)
                } else {
                    String::new()
                }
            );
        }
    }

    if options.reset_sequences && report.executed > 0 {
        match target.reset_sequences(table).await {
            Ok(0) => {}
            Ok(n) => println!("  🔄 Reset {} sequence(s) for {}", n, table),
            Err(e) => println!("  ⚠️  Could not reset sequences for {}: {:#}", table, e),
        }
    }

    report.target_after = match target.count_rows(table).await {
        Ok(count) => Some(count),
        Err(e) => {
            println!("  ⚠️  Could not get row count for {}: {:#}", table, e);
            None
        }
    };

    if report.aborted.is_some() {
        println!("  ❌ Import of {} stopped early", table);
    } else {
        println!("  ✅ Import finished: {} executed, {} failed", report.executed, report.failed);
    }
    if let Some(after) = report.target_after {
        println!("  New row count: {}", after);
    }

    Ok(report)
}

fn truncate_message(err: &anyhow::Error) -> String {
    let message = format!("{:#}", err);
    match message.char_indices().nth(100) {
        Some((cut, _)) => format!("{}...", &message[..cut]),
        None => message,
    }
}
