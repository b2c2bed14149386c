pub(crate) mod serializer;
pub(crate) mod snapshot;

use anyhow::{Context, Result};
use chrono::Local;
use std::path::Path;

use crate::config::{self, AppConfig};
use crate::source::{self, RestSource, RowSource};
use crate::utils::print_header;
use snapshot::{Snapshot, TableFileHeader};

/// What happened to one table during export.
#[derive(Debug, Clone)]
pub struct TableExport {
    pub table: String,
    pub rows: usize,
    pub partial: bool,
}

#[derive(Debug)]
pub struct ExportSummary {
    pub snapshot: Snapshot,
    pub tables: Vec<TableExport>,
}

/// Public entry point for the export process.
pub async fn run_export_flow(app_config: &AppConfig) -> Result<ExportSummary> {
    let source_config = config::load_source_config(&app_config.raw_env_config)
        .context("Failed to load source configuration")?;
    println!("Source: {}", source_config.base_url);
    let rest_source = RestSource::new(&source_config)?;

    export_tables(
        &rest_source,
        &app_config.tables,
        source_config.page_size,
        &app_config.export_root,
        &app_config.last_export_file,
    )
    .await
}

/// Fetches each table in order, writes its statement file into a fresh
/// snapshot, then the combined file, then moves the last-export pointer.
///
/// A table whose fetch fails part-way is still written with the rows that
/// arrived, and is flagged as partial.
pub async fn export_tables<S>(
    source: &S,
    tables: &[String],
    page_size: usize,
    export_root: &Path,
    last_export_file: &Path,
) -> Result<ExportSummary>
where
    S: RowSource + ?Sized,
{
    print_header("STEP 1: Exporting data from the source store");

    let snapshot = Snapshot::create(export_root, Local::now())?;
    println!("📂 Export directory: {}\n", snapshot.dir().display());

    let mut batches: Vec<(String, Vec<String>)> = Vec::with_capacity(tables.len());
    let mut exported = Vec::with_capacity(tables.len());

    for table in tables {
        println!("🔍 Processing table: {}", table);

        let total_hint = match source.count_rows(table).await {
            Ok(count) => {
                println!("  Total rows in {}: {}", table, count);
                Some(count)
            }
            Err(e) => {
                println!("  ⚠️  Could not get row count, fetching with pagination: {:#}", e);
                None
            }
        };

        let fetched = source::fetch_table(source, table, page_size, total_hint).await;
        let partial = !fetched.is_complete();
        if partial {
            println!(
                "  ⚠️  Export of {} is PARTIAL: {} rows fetched before the error",
                table,
                fetched.records.len()
            );
        }

        let statements = serializer::insert_statements(table, &fetched.records);
        let header = TableFileHeader {
            table,
            rows: statements.len(),
            exported_at: Local::now(),
            partial,
        };
        match snapshot.write_table(&header, &statements) {
            Ok(_) if statements.is_empty() => {
                println!("  ⚠️  No data to export for {}", table)
            }
            Ok(_) => println!("  ✅ Exported {} rows to {}.sql", statements.len(), table),
            Err(e) => println!("  ❌ Failed to write {}.sql: {:#}", table, e),
        }

        exported.push(TableExport {
            table: table.clone(),
            rows: statements.len(),
            partial,
        });
        batches.push((table.clone(), statements));
        println!();
    }

    snapshot.write_combined(&batches)?;
    println!("✅ Combined file created: {}", snapshot::COMBINED_FILE_NAME);

    snapshot::record_last_export(last_export_file, &snapshot)?;
    println!("📌 Last export recorded in {}", last_export_file.display());

    let total_rows: usize = exported.iter().map(|t| t.rows).sum();
    let partial: Vec<&str> = exported
        .iter()
        .filter(|t| t.partial)
        .map(|t| t.table.as_str())
        .collect();
    if partial.is_empty() {
        println!("✅ Export complete: {} rows across {} tables", total_rows, exported.len());
    } else {
        println!(
            "⚠️  Export complete with PARTIAL tables: {} ({} rows total)",
            partial.join(", "),
            total_rows
        );
    }

    Ok(ExportSummary {
        snapshot,
        tables: exported,
    })
}
