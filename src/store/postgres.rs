use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Transaction};
use tracing::{debug, error};

use crate::contract::{Store, Table, TableRows};
use crate::error::PipelineError;
use crate::model::{CampaignStats, ProcessedDonation};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS public.donations (
    donor_id     BIGINT           NOT NULL,
    amount       DOUBLE PRECISION NOT NULL,
    campaign_id  BIGINT           NOT NULL,
    "timestamp"  TIMESTAMP        NOT NULL,
    processed_at TIMESTAMPTZ      NOT NULL
);
CREATE TABLE IF NOT EXISTS public.stats (
    campaign_id    BIGINT           NOT NULL,
    total_amount   DOUBLE PRECISION NOT NULL,
    donation_count BIGINT           NOT NULL
);
"#;

/// Postgres store writing to the `public` schema. Each operation opens its own
/// connection and runs in one transaction.
pub struct PostgresStore {
    conn_string: String,
}

impl PostgresStore {
    /// `conn_string` is a libpq style key/value string or a `postgres://` URL.
    pub fn new(conn_string: impl Into<String>) -> Self {
        Self {
            conn_string: conn_string.into(),
        }
    }

    async fn connect(&self) -> Result<Client, PipelineError> {
        let (client, connection) = tokio_postgres::connect(&self.conn_string, NoTls)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to connect to postgres");
                PipelineError::from(e)
            })?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "Postgres connection closed with error");
            }
        });
        client.batch_execute(SCHEMA).await?;
        Ok(client)
    }
}

async fn insert(tx: &Transaction<'_>, rows: TableRows<'_>) -> Result<usize, PipelineError> {
    match rows {
        TableRows::Donations(donations) => insert_donations(tx, donations).await,
        TableRows::Stats(stats) => insert_stats(tx, stats).await,
    }
}

async fn insert_donations(
    tx: &Transaction<'_>,
    rows: &[ProcessedDonation],
) -> Result<usize, PipelineError> {
    let stmt = tx
        .prepare(
            r#"INSERT INTO public.donations (donor_id, amount, campaign_id, "timestamp", processed_at)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .await?;
    for d in rows {
        tx.execute(
            &stmt,
            &[&d.donor_id, &d.amount, &d.campaign_id, &d.timestamp, &d.processed_at],
        )
        .await?;
    }
    Ok(rows.len())
}

async fn insert_stats(tx: &Transaction<'_>, rows: &[CampaignStats]) -> Result<usize, PipelineError> {
    let stmt = tx
        .prepare(
            "INSERT INTO public.stats (campaign_id, total_amount, donation_count) VALUES ($1, $2, $3)",
        )
        .await?;
    for s in rows {
        tx.execute(&stmt, &[&s.campaign_id, &s.total_amount, &s.donation_count])
            .await?;
    }
    Ok(rows.len())
}

async fn clear(tx: &Transaction<'_>, table: Table) -> Result<(), PipelineError> {
    tx.execute(&format!("DELETE FROM public.{}", table.name()), &[])
        .await?;
    Ok(())
}

#[async_trait]
impl Store for PostgresStore {
    async fn append<'a>(&self, rows: TableRows<'a>) -> Result<usize, PipelineError> {
        let mut client = self.connect().await?;
        let tx = client.transaction().await?;
        let written = insert(&tx, rows).await?;
        tx.commit().await?;
        debug!(table = rows.table().name(), rows = written, "Appended rows");
        Ok(written)
    }

    async fn replace<'a>(&self, rows: TableRows<'a>) -> Result<usize, PipelineError> {
        let mut client = self.connect().await?;
        let tx = client.transaction().await?;
        clear(&tx, rows.table()).await?;
        let written = insert(&tx, rows).await?;
        tx.commit().await?;
        debug!(table = rows.table().name(), rows = written, "Replaced table contents");
        Ok(written)
    }

    async fn write_run<'a>(
        &self,
        donations: &'a [ProcessedDonation],
        stats: &'a [CampaignStats],
    ) -> Result<(), PipelineError> {
        let mut client = self.connect().await?;
        let tx = client.transaction().await?;
        let result = async {
            insert_donations(&tx, donations).await?;
            clear(&tx, Table::Stats).await?;
            insert_stats(&tx, stats).await?;
            Ok::<_, PipelineError>(())
        }
        .await;
        match result {
            Ok(()) => Ok(tx.commit().await?),
            Err(e) => {
                error!(error = %e, "Postgres transaction rolled back");
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}
