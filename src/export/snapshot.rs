// restmigrate/src/export/snapshot.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const COMBINED_FILE_NAME: &str = "all_tables.sql";

/// A timestamped export directory. Files in it are written once and never
/// replaced; a new export always gets a new directory.
#[derive(Debug, Clone)]
pub struct Snapshot {
    dir: PathBuf,
}

/// Header written at the top of every table file.
#[derive(Debug, Clone)]
pub struct TableFileHeader<'a> {
    pub table: &'a str,
    pub rows: usize,
    pub exported_at: DateTime<Local>,
    pub partial: bool,
}

impl Snapshot {
    /// Creates `{export_root}/export_{YYYYmmdd_HHMMSS}`, adding a numeric
    /// suffix when a snapshot with that timestamp already exists.
    pub fn create(export_root: &Path, now: DateTime<Local>) -> Result<Self> {
        fs::create_dir_all(export_root).with_context(|| {
            format!("Failed to create export root directory: {}", export_root.display())
        })?;

        let base_name = format!("export_{}", now.format("%Y%m%d_%H%M%S"));
        for attempt in 0..100 {
            let name = if attempt == 0 {
                base_name.clone()
            } else {
                format!("{}_{}", base_name, attempt)
            };
            let dir = export_root.join(name);
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(Snapshot { dir }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(e).with_context(|| {
                        format!("Failed to create snapshot directory: {}", dir.display())
                    });
                }
            }
        }

        anyhow::bail!(
            "Could not find a free snapshot directory name for {} under {}",
            base_name,
            export_root.display()
        )
    }

    /// Opens an existing snapshot directory.
    pub fn open(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            anyhow::bail!("Snapshot directory not found: {}", dir.display());
        }
        Ok(Snapshot {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.sql", table))
    }

    pub fn combined_path(&self) -> PathBuf {
        self.dir.join(COMBINED_FILE_NAME)
    }

    /// Writes `{table}.sql`: header comments, then one statement per line.
    pub fn write_table(&self, header: &TableFileHeader<'_>, statements: &[String]) -> Result<PathBuf> {
        let path = self.table_path(header.table);
        let mut contents = String::new();
        contents.push_str(&format!("-- Table: {}\n", header.table));
        contents.push_str(&format!("-- Rows: {}\n", header.rows));
        contents.push_str(&format!("-- Exported at: {}\n", header.exported_at.to_rfc3339()));
        if header.partial {
            contents.push_str("-- WARNING: partial export, the fetch was interrupted\n");
        }
        for statement in statements {
            contents.push_str(statement);
            contents.push('\n');
        }
        write_new_file(&path, &contents)?;
        Ok(path)
    }

    /// Writes `all_tables.sql` from the table batches, in order.
    pub fn write_combined(&self, batches: &[(String, Vec<String>)]) -> Result<PathBuf> {
        let path = self.combined_path();
        let sections: Vec<String> = batches
            .iter()
            .filter(|(_, statements)| !statements.is_empty())
            .map(|(table, statements)| format!("-- Table: {}\n{}", table, statements.join("\n")))
            .collect();
        let mut contents = sections.join("\n\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        write_new_file(&path, &contents)?;
        Ok(path)
    }

    /// Reads `{table}.sql`, or `None` when the snapshot has no file for it.
    pub fn read_table(&self, table: &str) -> Result<Option<String>> {
        let path = self.table_path(table);
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }
}

/// Points the last-export file at `snapshot`, replacing it atomically.
pub fn record_last_export(pointer_file: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = pointer_file.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create directory for {}", pointer_file.display())
            })?;
        }
    }

    let tmp_path = pointer_file.with_extension("tmp");
    fs::write(&tmp_path, snapshot.dir().to_string_lossy().as_bytes())
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, pointer_file)
        .with_context(|| format!("Failed to update last export pointer {}", pointer_file.display()))?;
    Ok(())
}

/// Opens the snapshot recorded in the last-export file.
pub fn resolve_last_export(pointer_file: &Path) -> Result<Snapshot> {
    let recorded = match fs::read_to_string(pointer_file) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            anyhow::bail!(
                "No export found ({} does not exist). Please run export first.",
                pointer_file.display()
            );
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", pointer_file.display()));
        }
    };

    let dir = recorded.trim();
    if dir.is_empty() {
        anyhow::bail!("Last export pointer {} is empty", pointer_file.display());
    }
    Snapshot::open(Path::new(dir))
}

fn write_new_file(path: &Path, contents: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("Failed to create snapshot file: {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write snapshot file: {}", path.display()))?;
    Ok(())
}
