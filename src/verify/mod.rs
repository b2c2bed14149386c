pub(crate) mod report;

use anyhow::{Context, Result};

use crate::config::{self, AppConfig};
use crate::errors::AppError;
use crate::source::{self, RestSource, RowSource};
use crate::target::{PgTarget, TargetStore};
use crate::utils::print_header;
pub use report::{Status, TableComparison, VerificationReport};

/// Public entry point for verification.
///
/// Prints the full report, then returns `AppError::Verification` if any table
/// did not match.
pub async fn run_verify_flow(app_config: &AppConfig) -> Result<VerificationReport> {
    let source_config = config::load_source_config(&app_config.raw_env_config)
        .context("Failed to load source configuration")?;
    let target_config = config::load_target_config(&app_config.raw_env_config)
        .context("Failed to load target configuration")?;

    let rest_source = RestSource::new(&source_config)?;
    let mut target = PgTarget::connect(&target_config).await?;

    let report = verify_tables(
        &rest_source,
        &mut target,
        &app_config.tables,
        source_config.page_size,
    )
    .await;
    target.close().await?;

    println!();
    print!("{}", report.render());
    println!();

    let mismatches = report.mismatches();
    if mismatches.is_empty() {
        println!("✅ All {} tables match", report.tables.len());
        return Ok(report);
    }

    let names: Vec<&str> = mismatches.iter().map(|t| t.table.as_str()).collect();
    println!("⚠️  {} table(s) differ: {}", names.len(), names.join(", "));
    Err(AppError::Verification(format!(
        "{} of {} tables do not match: {}",
        names.len(),
        report.tables.len(),
        names.join(", ")
    ))
    .into())
}

/// Recounts every table on both sides. Read-only; a count that cannot be
/// obtained is recorded as `None` rather than failing the run.
pub async fn verify_tables<S, T>(
    source: &S,
    target: &mut T,
    tables: &[String],
    page_size: usize,
) -> VerificationReport
where
    S: RowSource + ?Sized,
    T: TargetStore + ?Sized,
{
    print_header("STEP 3: Verifying row counts");

    let mut comparisons = Vec::with_capacity(tables.len());
    for table in tables {
        println!("🔍 Checking {}...", table);
        let source_rows = source_row_count(source, table, page_size).await;
        let target_rows = match target.count_rows(table).await {
            Ok(count) => u64::try_from(count).ok(),
            Err(e) => {
                println!("  ❌ Target count failed for {}: {:#}", table, e);
                None
            }
        };
        comparisons.push(TableComparison {
            table: table.clone(),
            source_rows,
            target_rows,
        });
    }

    VerificationReport { tables: comparisons }
}

/// Exact count first; when the source cannot count, fetch every page and use
/// the number of rows. An interrupted fetch gives no count.
async fn source_row_count<S>(source: &S, table: &str, page_size: usize) -> Option<u64>
where
    S: RowSource + ?Sized,
{
    match source.count_rows(table).await {
        Ok(count) => return Some(count),
        Err(e) => {
            tracing::debug!(table, error = %format!("{:#}", e), "exact count failed, falling back to full fetch");
        }
    }

    let fetched = source::fetch_table(source, table, page_size, None).await;
    if fetched.is_complete() {
        Some(fetched.records.len() as u64)
    } else {
        println!("  ❌ Source count failed for {}", table);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{export_tables, snapshot};
    use crate::import::import_snapshot;
    use crate::import::loader::{ClearMode, ExecutionMode, ImportOptions};
    use crate::import::prompt::tests::ScriptedConfirm;
    use crate::source::tests::{numbered_rows, FakeSource};
    use crate::target::tests::FakeTarget;

    #[tokio::test]
    async fn test_verify_is_repeatable() {
        let source = FakeSource::default()
            .with_table("users", numbered_rows(5))
            .with_table("sales_log", numbered_rows(12));
        let mut target = FakeTarget::default()
            .with_rows("users", 5)
            .with_rows("sales_log", 10);
        let tables = vec!["users".to_string(), "sales_log".to_string()];

        let first = verify_tables(&source, &mut target, &tables, 100).await;
        let second = verify_tables(&source, &mut target, &tables, 100).await;

        assert_eq!(first, second);
        assert_eq!(first.tables[0].status(), Status::Match);
        assert_eq!(first.tables[1].status(), Status::Mismatch);
        assert_eq!(first.total_source(), 17);
        assert_eq!(first.total_target(), 15);
        assert!(target.executed.is_empty());
    }

    #[tokio::test]
    async fn test_source_count_falls_back_to_fetch() {
        let mut source = FakeSource::default().with_table("daily_rates", numbered_rows(23));
        source.fail_count = true;
        let mut target = FakeTarget::default().with_rows("daily_rates", 23);
        let tables = vec!["daily_rates".to_string()];

        let report = verify_tables(&source, &mut target, &tables, 10).await;

        assert_eq!(report.tables[0].source_rows, Some(23));
        assert!(report.all_match());
        assert_eq!(source.requests.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unobtainable_source_count_is_a_mismatch() {
        let mut source = FakeSource::default();
        source.fail_count = true;
        let mut target = FakeTarget::default();
        let tables = vec!["missing_table".to_string()];

        let report = verify_tables(&source, &mut target, &tables, 10).await;

        assert_eq!(report.tables[0].source_rows, None);
        assert_eq!(report.tables[0].target_rows, Some(0));
        assert_eq!(report.tables[0].status(), Status::Mismatch);
        assert!(report.render().contains("ERROR"));
    }

    #[tokio::test]
    async fn test_export_import_verify_round() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let pointer = root.path().join(".last_export");
        let source = FakeSource::default().with_table("users", numbered_rows(5));
        let tables = vec!["users".to_string()];

        let summary =
            export_tables(&source, &tables, 2, &root.path().join("exports"), &pointer).await?;
        let users = summary.snapshot.read_table("users")?.unwrap_or_default();
        assert_eq!(users.lines().filter(|l| l.starts_with("INSERT INTO")).count(), 5);

        let snapshot = snapshot::resolve_last_export(&pointer)?;
        let mut target = FakeTarget::default();
        let mut confirm = ScriptedConfirm::new(Vec::new());
        let options = ImportOptions {
            clear_mode: ClearMode::Ask,
            execution: ExecutionMode::Tolerant { shown_errors: 3 },
            reset_sequences: true,
        };
        let reports = import_snapshot(&mut target, &mut confirm, &snapshot, &tables, &options).await?;
        assert!(reports[0].is_success());
        assert_eq!(target.rows.get("users"), Some(&5));

        let report = verify_tables(&source, &mut target, &tables, 2).await;
        assert!(report.all_match());
        assert_eq!(report.total_source(), 5);
        assert_eq!(report.total_target(), 5);
        Ok(())
    }
}
