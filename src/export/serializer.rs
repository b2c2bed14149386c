// restmigrate/src/export/serializer.rs
use serde_json::Value;

use crate::source::Record;
use crate::utils::{quote_ident, quote_literal};

/// Builds one `INSERT` statement per record.
///
/// Columns come from the first record, in its key order. A later record
/// missing one of those columns gets `NULL`; keys it has beyond them are
/// dropped. An empty slice yields an empty batch.
pub fn insert_statements(table_name: &str, records: &[Record]) -> Vec<String> {
    let Some(first) = records.first() else {
        return Vec::new();
    };

    let columns: Vec<&String> = first.keys().collect();
    let column_list = columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let table = quote_ident(table_name);

    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            if record.len() > columns.len() || record.keys().any(|k| !first.contains_key(k)) {
                tracing::debug!(
                    table = table_name,
                    row = index,
                    "row has columns not present in the first row; extra values dropped"
                );
            }

            let values = columns
                .iter()
                .map(|c| sql_literal(record.get(c.as_str()).unwrap_or(&Value::Null)))
                .collect::<Vec<_>>()
                .join(", ");

            format!("INSERT INTO {} ({}) VALUES ({});", table, column_list, values)
        })
        .collect()
}

/// Renders a JSON value as a PostgreSQL literal. Numbers are written with
/// the digits the API sent.
pub fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(_) | Value::Array(_) => format!("{}::jsonb", quote_literal(&value.to_string())),
        Value::String(s) => quote_literal(s),
    }
}
