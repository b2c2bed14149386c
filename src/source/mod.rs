//! Reading rows out of the source table store.
//!
//! `fetch_table` owns the pagination loop; a `RowSource` only knows how to
//! fetch one page or count one table.

pub(crate) mod rest;

use anyhow::Result;
use async_trait::async_trait;

pub use rest::RestSource;

/// One source row: column name to JSON value, in the order the API returned.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Page-at-a-time access to a table in the source store.
#[async_trait]
pub trait RowSource {
    /// Fetch up to `limit` rows starting at `offset`.
    async fn fetch_page(&self, table: &str, limit: usize, offset: usize) -> Result<Vec<Record>>;

    /// Exact row count for `table`.
    async fn count_rows(&self, table: &str) -> Result<u64>;
}

/// Rows fetched for a table, plus the error that cut the fetch short, if any.
///
/// An interrupted fetch keeps whatever pages arrived before the failure.
#[derive(Debug)]
pub struct FetchedTable {
    pub records: Vec<Record>,
    pub interrupted: Option<anyhow::Error>,
}

impl FetchedTable {
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }
}

/// Fetches every row of `table`, one page of `page_size` rows at a time.
///
/// Stops after an empty page or a page shorter than `page_size`. The
/// `total_hint` only feeds progress output.
pub async fn fetch_table<S>(
    source: &S,
    table: &str,
    page_size: usize,
    total_hint: Option<u64>,
) -> FetchedTable
where
    S: RowSource + ?Sized,
{
    let page_size = page_size.max(1);
    let mut records = Vec::new();
    let mut offset = 0;

    loop {
        let page = match source.fetch_page(table, page_size, offset).await {
            Ok(page) => page,
            Err(e) => {
                println!(
                    "  ❌ Fetch of {} failed at offset {}: {:#}",
                    table, offset, e
                );
                return FetchedTable {
                    records,
                    interrupted: Some(e),
                };
            }
        };

        if page.is_empty() {
            break;
        }

        let fetched = page.len();
        records.extend(page);
        match total_hint {
            Some(total) => println!(
                "  Fetched {} rows (offset: {}) [{}/{}]",
                fetched,
                offset,
                records.len(),
                total
            ),
            None => println!("  Fetched {} rows (offset: {})", fetched, offset),
        }

        if fetched < page_size {
            break;
        }
        offset += page_size;
    }

    tracing::debug!(table, rows = records.len(), "fetch complete");
    FetchedTable {
        records,
        interrupted: None,
    }
}
