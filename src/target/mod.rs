// restmigrate/src/target/mod.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, Executor, PgConnection};

use crate::config::TargetConfig;
use crate::errors::AppError;
use crate::utils::{quote_ident, sequence_reset};

/// Operations the loader and verifier need from the target database.
#[async_trait]
pub trait TargetStore {
    async fn count_rows(&mut self, table: &str) -> Result<i64>;

    /// `TRUNCATE TABLE … CASCADE` inside its own transaction.
    async fn truncate(&mut self, table: &str) -> Result<()>;

    /// Runs one statement on its own; a failure leaves earlier ones applied.
    async fn execute(&mut self, statement: &str) -> Result<()>;

    /// Returns how many sequences were moved past the table's current ids.
    async fn reset_sequences(&mut self, table: &str) -> Result<usize>;
}

/// A single PostgreSQL connection.
pub struct PgTarget {
    conn: PgConnection,
}

impl PgTarget {
    /// Connects within the configured timeout. On failure prints the
    /// connection details and a checklist, then returns `AppError::Connection`.
    pub async fn connect(target_config: &TargetConfig) -> Result<Self> {
        println!("🔌 Connecting to {}...", target_config.display_target());

        let options = PgConnectOptions::new()
            .host(&target_config.host)
            .port(target_config.port)
            .database(&target_config.database)
            .username(&target_config.user)
            .password(&target_config.password);

        let attempt =
            tokio::time::timeout(target_config.connect_timeout, PgConnection::connect_with(&options))
                .await;

        let reason = match attempt {
            Ok(Ok(conn)) => {
                println!("✅ Connected to {}", target_config.display_target());
                return Ok(PgTarget { conn });
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "timed out after {} seconds",
                target_config.connect_timeout.as_secs()
            ),
        };

        eprintln!("❌ Failed to connect to database: {}", reason);
        eprintln!();
        eprintln!("Connection details:");
        eprintln!("  Host: {}", target_config.host);
        eprintln!("  Port: {}", target_config.port);
        eprintln!("  Database: {}", target_config.database);
        eprintln!("  User: {}", target_config.user);
        eprintln!();
        eprintln!("Please check:");
        eprintln!("  1. PostgreSQL is running");
        eprintln!("  2. Database exists");
        eprintln!("  3. Credentials are correct");
        eprintln!("  4. Firewall allows connection");

        Err(AppError::Connection {
            target: target_config.display_target(),
            reason,
        }
        .into())
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await.context("Failed to close target connection")
    }
}

#[async_trait]
impl TargetStore for PgTarget {
    async fn count_rows(&mut self, table: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)))
            .fetch_one(&mut self.conn)
            .await
            .with_context(|| format!("Failed to count rows in {}", table))?;
        Ok(count)
    }

    async fn truncate(&mut self, table: &str) -> Result<()> {
        let mut tx = self.conn.begin().await.context("Failed to begin transaction")?;
        (&mut *tx)
            .execute(format!("TRUNCATE TABLE {} CASCADE", quote_ident(table)).as_str())
            .await
            .with_context(|| format!("Failed to truncate {}", table))?;
        tx.commit()
            .await
            .with_context(|| format!("Failed to commit truncate of {}", table))?;
        Ok(())
    }

    async fn execute(&mut self, statement: &str) -> Result<()> {
        (&mut self.conn).execute(statement).await?;
        Ok(())
    }

    async fn reset_sequences(&mut self, table: &str) -> Result<usize> {
        sequence_reset::reset_table_sequences(&mut self.conn, table).await
    }
}
