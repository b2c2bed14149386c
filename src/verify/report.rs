// restmigrate/src/verify/report.rs
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Match,
    Mismatch,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Match => write!(f, "MATCH"),
            Status::Mismatch => write!(f, "MISMATCH"),
        }
    }
}

/// Source and target row counts for one table. `None` means the count could
/// not be obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableComparison {
    pub table: String,
    pub source_rows: Option<u64>,
    pub target_rows: Option<u64>,
}

impl TableComparison {
    pub fn status(&self) -> Status {
        match (self.source_rows, self.target_rows) {
            (Some(source), Some(target)) if source == target => Status::Match,
            _ => Status::Mismatch,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub tables: Vec<TableComparison>,
}

impl VerificationReport {
    pub fn total_source(&self) -> u64 {
        self.tables.iter().filter_map(|t| t.source_rows).sum()
    }

    pub fn total_target(&self) -> u64 {
        self.tables.iter().filter_map(|t| t.target_rows).sum()
    }

    pub fn mismatches(&self) -> Vec<&TableComparison> {
        self.tables
            .iter()
            .filter(|t| t.status() == Status::Mismatch)
            .collect()
    }

    pub fn all_match(&self) -> bool {
        self.mismatches().is_empty()
    }

    /// The row-count table printed at the end of `verify`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<20} | {:>15} | {:>15} | {:>10}\n",
            "TABLE", "SOURCE ROWS", "TARGET ROWS", "STATUS"
        ));
        out.push_str(&"-".repeat(70));
        out.push('\n');
        for t in &self.tables {
            out.push_str(&format!(
                "{:<20} | {:>15} | {:>15} | {:>10}\n",
                t.table,
                count_cell(t.source_rows),
                count_cell(t.target_rows),
                t.status().to_string()
            ));
        }
        out.push_str(&"-".repeat(70));
        out.push('\n');
        out.push_str(&format!(
            "{:<20} | {:>15} | {:>15} |\n",
            "TOTAL",
            self.total_source(),
            self.total_target()
        ));
        out
    }
}

fn count_cell(count: Option<u64>) -> String {
    count.map(|c| c.to_string()).unwrap_or_else(|| "ERROR".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparison(table: &str, source: Option<u64>, target: Option<u64>) -> TableComparison {
        TableComparison {
            table: table.to_string(),
            source_rows: source,
            target_rows: target,
        }
    }

    #[test]
    fn test_status_and_totals() {
        let report = VerificationReport {
            tables: vec![
                comparison("users", Some(5), Some(5)),
                comparison("sales_log", Some(674), Some(670)),
                comparison("activity_log", None, Some(1000)),
            ],
        };

        assert_eq!(report.tables[0].status(), Status::Match);
        assert_eq!(report.tables[1].status(), Status::Mismatch);
        assert_eq!(report.tables[2].status(), Status::Mismatch);
        assert_eq!(report.total_source(), 679);
        assert_eq!(report.total_target(), 1675);
        assert_eq!(report.mismatches().len(), 2);
        assert!(!report.all_match());
    }

    #[test]
    fn test_render_rows() {
        let report = VerificationReport {
            tables: vec![
                comparison("users", Some(5), Some(5)),
                comparison("daily_rates", Some(256), None),
            ],
        };

        let rendered = report.render();
        let users_line = rendered.lines().find(|l| l.starts_with("users")).unwrap();
        assert!(users_line.contains("MATCH"));
        assert!(!users_line.contains("MISMATCH"));
        let rates_line = rendered.lines().find(|l| l.starts_with("daily_rates")).unwrap();
        assert!(rates_line.contains("ERROR"));
        assert!(rates_line.ends_with("MISMATCH"));
        assert!(rendered.lines().last().unwrap().starts_with("TOTAL"));
    }
}
