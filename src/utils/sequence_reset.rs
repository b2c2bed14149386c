// restmigrate/src/utils/sequence_reset.rs
use anyhow::{Context, Result};
use sqlx::PgConnection;

use crate::utils::quote_ident;

/// Advances every sequence owned by a column of `table_name` to one past the
/// column's current maximum, so application inserts after an import do not
/// collide with imported ids.
///
/// Returns the number of sequences that were reset.
pub async fn reset_table_sequences(conn: &mut PgConnection, table_name: &str) -> Result<usize> {
    // Sequences owned by a column (serial / identity) of the given public table
    let sequences_query = r#"
        SELECT
            seq.relname AS sequence_name,
            attr.attname AS column_name
        FROM
            pg_class seq
        JOIN
            pg_depend dep ON dep.objid = seq.oid AND dep.deptype IN ('a', 'i')
        JOIN
            pg_class tab ON dep.refobjid = tab.oid
        JOIN
            pg_attribute attr ON dep.refobjid = attr.attrelid AND dep.refobjsubid = attr.attnum
        JOIN
            pg_namespace nsp ON seq.relnamespace = nsp.oid
        WHERE
            seq.relkind = 'S'
            AND tab.relkind = 'r'
            AND nsp.nspname = 'public'
            AND tab.relname = $1
        ORDER BY
            attr.attname
    "#;

    let sequences = sqlx::query_as::<_, (String, String)>(sequences_query)
        .bind(table_name)
        .fetch_all(&mut *conn)
        .await
        .with_context(|| format!("Failed to fetch sequence information for table {}", table_name))?;

    if sequences.is_empty() {
        tracing::debug!(table = table_name, "no owned sequences to reset");
        return Ok(0);
    }

    let mut reset_count = 0;

    for (sequence_name, column_name) in sequences {
        let reset_query = format!(
            "SELECT setval($1::regclass, (SELECT COALESCE(MAX({}), 0) + 1 FROM {}), false)",
            quote_ident(&column_name),
            quote_ident(table_name)
        );

        match sqlx::query(&reset_query)
            .bind(format!("public.{}", quote_ident(&sequence_name)))
            .execute(&mut *conn)
            .await
        {
            Ok(_) => {
                tracing::debug!(
                    table = table_name,
                    sequence = %sequence_name,
                    column = %column_name,
                    "sequence reset"
                );
                reset_count += 1;
            }
            Err(e) => {
                println!("   ⚠️  Failed to reset sequence {}: {}", sequence_name, e);
            }
        }
    }

    Ok(reset_count)
}
