pub(crate) mod loader;
pub(crate) mod prompt;
pub(crate) mod statements;

use anyhow::{Context, Result};

use crate::config::{self, AppConfig};
use crate::export::snapshot::{self, Snapshot};
use crate::target::{PgTarget, TargetStore};
use crate::utils::print_header;
use loader::{ImportOptions, LoadReport};
use prompt::{Confirm, StdinConfirm};

/// Public entry point for the import process.
///
/// Imports `snapshot` when given, otherwise the one recorded as the last
/// export.
pub async fn run_import_flow(
    app_config: &AppConfig,
    options: &ImportOptions,
    snapshot: Option<Snapshot>,
) -> Result<Vec<LoadReport>> {
    let snapshot = match snapshot {
        Some(snapshot) => snapshot,
        None => snapshot::resolve_last_export(&app_config.last_export_file)?,
    };
    let target_config = config::load_target_config(&app_config.raw_env_config)
        .context("Failed to load target configuration")?;

    let mut target = PgTarget::connect(&target_config).await?;
    let reports = import_snapshot(
        &mut target,
        &mut StdinConfirm,
        &snapshot,
        &app_config.tables,
        options,
    )
    .await?;
    target.close().await?;

    Ok(reports)
}

/// Loads each configured table's file from `snapshot`, in order. Tables with
/// no file in the snapshot are skipped with a warning.
pub async fn import_snapshot<T, C>(
    target: &mut T,
    confirm: &mut C,
    snapshot: &Snapshot,
    tables: &[String],
    options: &ImportOptions,
) -> Result<Vec<LoadReport>>
where
    T: TargetStore + ?Sized,
    C: Confirm + ?Sized,
{
    print_header("STEP 2: Importing data into the target database");
    println!("📂 Using export from: {}\n", snapshot.dir().display());

    let mut reports = Vec::with_capacity(tables.len());

    for table in tables {
        let script = match snapshot.read_table(table) {
            Ok(Some(script)) => script,
            Ok(None) => {
                println!("⚠️  Export file not found for {}, skipping\n", table);
                continue;
            }
            Err(e) => {
                println!("❌ Could not read export file for {}: {:#}\n", table, e);
                continue;
            }
        };

        println!("📥 Importing table: {}", table);
        let batch = statements::split_statements(&script);
        let report = loader::load_table(&mut *target, &mut *confirm, table, &batch, options).await?;
        reports.push(report);
        println!();
    }

    for report in &reports {
        println!("  {}", summary_line(report));
    }

    let failed: Vec<&str> = reports
        .iter()
        .filter(|r| !r.is_success())
        .map(|r| r.table.as_str())
        .collect();
    if failed.is_empty() {
        println!("✅ Import complete: {} tables loaded", reports.len());
    } else {
        println!(
            "⚠️  Import complete with problems in: {}",
            failed.join(", ")
        );
    }

    Ok(reports)
}

fn summary_line(report: &LoadReport) -> String {
    let rows = report
        .target_after
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string());
    format!(
        "{}: {}/{} statements applied, {} failed, {} rows now{}",
        report.table,
        report.executed,
        report.statements,
        report.failed,
        rows,
        if report.aborted.is_some() { " (stopped early)" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::loader::{ClearMode, ExecutionMode};
    use crate::import::prompt::tests::ScriptedConfirm;
    use crate::target::tests::FakeTarget;
    use chrono::Local;
    use snapshot::TableFileHeader;

    #[tokio::test]
    async fn test_import_skips_tables_without_files() -> anyhow::Result<()> {
        let root = tempfile::tempdir()?;
        let snapshot = Snapshot::create(root.path(), Local::now())?;
        let header = TableFileHeader {
            table: "users",
            rows: 2,
            exported_at: Local::now(),
            partial: false,
        };
        snapshot.write_table(
            &header,
            &[
                "INSERT INTO \"users\" (\"id\", \"bio\") VALUES (1, 'a;b');".to_string(),
                "INSERT INTO \"users\" (\"id\", \"bio\") VALUES (2, 'multi\nline');".to_string(),
            ],
        )?;

        let mut target = FakeTarget::default();
        let mut confirm = ScriptedConfirm::new(Vec::new());
        let options = ImportOptions {
            clear_mode: ClearMode::Ask,
            execution: ExecutionMode::Tolerant { shown_errors: 3 },
            reset_sequences: false,
        };
        let tables = vec!["users".to_string(), "sales_log".to_string()];

        let reports = import_snapshot(&mut target, &mut confirm, &snapshot, &tables, &options).await?;

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].table, "users");
        assert_eq!(reports[0].executed, 2);
        assert_eq!(reports[0].statements, 2);
        assert_eq!(target.rows.get("users"), Some(&2));
        assert!(target.sequences_reset.is_empty());
        Ok(())
    }

    #[test]
    fn test_summary_line_shows_applied_out_of_total() {
        let report = LoadReport {
            table: "sales_log".to_string(),
            statements: 10,
            executed: 7,
            failed: 3,
            target_after: Some(7),
            ..LoadReport::default()
        };
        assert_eq!(
            summary_line(&report),
            "sales_log: 7/10 statements applied, 3 failed, 7 rows now"
        );

        let stopped = LoadReport {
            aborted: Some("statement 2 failed in strict mode".to_string()),
            target_after: None,
            ..report
        };
        assert!(summary_line(&stopped).ends_with("? rows now (stopped early)"));
    }
}
