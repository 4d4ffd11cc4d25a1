use std::time::Duration;

use anyhow::Context;
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use log::{info, warn};
use tokio_postgres::NoTls;

use crate::config::PostgresSettings;

/// Schema applied by [`PostgresClient::migrate`], relative to the working directory.
const SCHEMA_PATH: &str = "schema/postgres.sql";

const MAX_CONNECT_ATTEMPTS: u32 = 3;

/// Split a SQL script into statements.
///
/// Semicolons inside `$$ ... $$` bodies and `--` line comments do not end a
/// statement. Comment-only fragments are dropped.
fn split_sql_statements(sql: &str) -> Vec<&str> {
    let mut statements = Vec::new();
    let bytes = sql.as_bytes();
    let mut start = 0;
    let mut in_dollar_quote = false;
    let mut in_comment = false;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' if in_comment => in_comment = false,
            _ if in_comment => {},
            b'-' if !in_dollar_quote && bytes.get(i + 1) == Some(&b'-') => {
                in_comment = true;
                i += 1;
            },
            b'$' if bytes.get(i + 1) == Some(&b'$') => {
                in_dollar_quote = !in_dollar_quote;
                i += 1;
            },
            b';' if !in_dollar_quote => {
                let stmt = &sql[start..i];
                if has_code(stmt) {
                    statements.push(stmt);
                }
                start = i + 1;
            },
            _ => {},
        }
        i += 1;
    }

    if start < sql.len() && has_code(&sql[start..]) {
        statements.push(&sql[start..]);
    }

    statements
}

fn has_code(stmt: &str) -> bool {
    stmt.lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with("--"))
}

/// PostgreSQL client with connection pooling.
///
/// Stores vault samples, derived APYs, snapshots and sync checkpoints.
#[derive(Clone)]
pub struct PostgresClient {
    pub pool: Pool,
}

impl PostgresClient {
    /// Build the pool and wait until one connection succeeds.
    ///
    /// Retries with exponential backoff (200ms, 400ms) before giving up.
    pub async fn new(settings: PostgresSettings) -> anyhow::Result<Self> {
        info!(
            "Connecting to PostgreSQL at {}:{}/{}",
            settings.host, settings.port, settings.database
        );

        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&settings.host)
            .port(settings.port)
            .user(&settings.user)
            .password(&settings.password)
            .dbname(&settings.database);

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(settings.pool_size)
            .build()
            .context("Failed to create PostgreSQL connection pool")?;

        let mut attempt = 1;
        loop {
            match pool.get().await {
                Ok(_conn) => {
                    info!("Connected to PostgreSQL (pool size {})", settings.pool_size);
                    return Ok(Self { pool });
                },
                Err(e) if attempt < MAX_CONNECT_ATTEMPTS => {
                    let delay = Duration::from_millis(100 * 2_u64.pow(attempt));
                    warn!(
                        "Failed to connect to PostgreSQL (attempt {}/{}): {}. Retrying in {:?}...",
                        attempt, MAX_CONNECT_ATTEMPTS, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(e) => {
                    return Err(anyhow::anyhow!(
                        "Failed to connect to PostgreSQL after {} attempts: {}",
                        MAX_CONNECT_ATTEMPTS,
                        e
                    ));
                },
            }
        }
    }

    /// Apply the schema inside one transaction. Every statement is idempotent.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        let schema = tokio::fs::read_to_string(SCHEMA_PATH)
            .await
            .with_context(|| format!("Failed to read {}", SCHEMA_PATH))?;

        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;

        let statements = split_sql_statements(&schema);
        for stmt in &statements {
            let stmt = stmt.trim();
            tx.execute(stmt, &[])
                .await
                .with_context(|| format!("Failed to execute migration statement: {}", stmt))?;
        }

        tx.commit().await?;
        info!("Applied {} schema statements", statements.len());
        Ok(())
    }
}
