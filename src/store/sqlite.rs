use std::path::PathBuf;

use async_trait::async_trait;
use rusqlite::{params, Connection};
use tracing::{debug, error};

use super::TIMESTAMP_FORMAT;
use crate::contract::{Store, Table, TableRows};
use crate::error::PipelineError;
use crate::model::{CampaignStats, ProcessedDonation};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS donations (
    donor_id     INTEGER NOT NULL,
    amount       REAL    NOT NULL,
    campaign_id  INTEGER NOT NULL,
    timestamp    TEXT    NOT NULL,
    processed_at TEXT    NOT NULL
);
CREATE TABLE IF NOT EXISTS stats (
    campaign_id    INTEGER NOT NULL,
    total_amount   REAL    NOT NULL,
    donation_count INTEGER NOT NULL
);
";

/// File-backed SQLite store. A connection is opened per operation on a
/// blocking thread; nothing is held between calls.
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Runs `work` inside one transaction on a fresh connection.
    async fn with_transaction<T, F>(&self, work: F) -> Result<T, PipelineError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, PipelineError> + Send + 'static,
    {
        let path = self.path.clone();
        let result = tokio::task::spawn_blocking(move || -> Result<T, PipelineError> {
            let mut conn = Connection::open(&path)?;
            conn.execute_batch(SCHEMA)?;
            let tx = conn.transaction()?;
            let value = work(&tx)?;
            tx.commit()?;
            Ok(value)
        })
        .await
        .map_err(|e| PipelineError::storage(format!("sqlite worker panicked: {e}")))?;

        if let Err(e) = &result {
            error!(path = %self.path.display(), error = %e, "SQLite transaction rolled back");
        }
        result
    }
}

enum OwnedRows {
    Donations(Vec<ProcessedDonation>),
    Stats(Vec<CampaignStats>),
}

impl From<TableRows<'_>> for OwnedRows {
    fn from(rows: TableRows<'_>) -> Self {
        match rows {
            TableRows::Donations(d) => OwnedRows::Donations(d.to_vec()),
            TableRows::Stats(s) => OwnedRows::Stats(s.to_vec()),
        }
    }
}

fn insert(conn: &Connection, rows: &OwnedRows) -> Result<usize, PipelineError> {
    match rows {
        OwnedRows::Donations(donations) => insert_donations(conn, donations),
        OwnedRows::Stats(stats) => insert_stats(conn, stats),
    }
}

fn insert_donations(conn: &Connection, rows: &[ProcessedDonation]) -> Result<usize, PipelineError> {
    let mut stmt = conn.prepare(
        "INSERT INTO donations (donor_id, amount, campaign_id, timestamp, processed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for d in rows {
        stmt.execute(params![
            d.donor_id,
            d.amount,
            d.campaign_id,
            d.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            d.processed_at.to_rfc3339(),
        ])?;
    }
    Ok(rows.len())
}

fn insert_stats(conn: &Connection, rows: &[CampaignStats]) -> Result<usize, PipelineError> {
    let mut stmt = conn.prepare(
        "INSERT INTO stats (campaign_id, total_amount, donation_count) VALUES (?1, ?2, ?3)",
    )?;
    for s in rows {
        stmt.execute(params![s.campaign_id, s.total_amount, s.donation_count])?;
    }
    Ok(rows.len())
}

fn clear(conn: &Connection, table: Table) -> Result<(), PipelineError> {
    conn.execute(&format!("DELETE FROM {}", table.name()), [])?;
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn append<'a>(&self, rows: TableRows<'a>) -> Result<usize, PipelineError> {
        let table = rows.table();
        let owned = OwnedRows::from(rows);
        let written = self.with_transaction(move |conn| insert(conn, &owned)).await?;
        debug!(table = table.name(), rows = written, "Appended rows");
        Ok(written)
    }

    async fn replace<'a>(&self, rows: TableRows<'a>) -> Result<usize, PipelineError> {
        let table = rows.table();
        let owned = OwnedRows::from(rows);
        let written = self
            .with_transaction(move |conn| {
                clear(conn, table)?;
                insert(conn, &owned)
            })
            .await?;
        debug!(table = table.name(), rows = written, "Replaced table contents");
        Ok(written)
    }

    async fn write_run<'a>(
        &self,
        donations: &'a [ProcessedDonation],
        stats: &'a [CampaignStats],
    ) -> Result<(), PipelineError> {
        let donations = donations.to_vec();
        let stats = stats.to_vec();
        self.with_transaction(move |conn| {
            insert_donations(conn, &donations)?;
            clear(conn, Table::Stats)?;
            insert_stats(conn, &stats)?;
            Ok(())
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
