//! # contract: seams between the orchestrator and its I/O
//!
//! The orchestrator ([`crate::pipeline::Pipeline`]) never talks to HTTP, the
//! filesystem fixture, or a database directly. It depends on two traits:
//!
//! - [`Extractor`]: yields raw [`DonationRecord`]s from a remote endpoint or
//!   a local fixture.
//! - [`Store`]: relational persistence with an `append` / `replace` contract
//!   per table, plus a transactional `write_run` used by the load stage.
//!
//! Both traits are annotated for `mockall` so tests can script stage failures
//! without a network or a database.

use async_trait::async_trait;
use mockall::automock;

use crate::error::PipelineError;
use crate::model::{CampaignStats, DonationRecord, ProcessedDonation};

/// The two tables the pipeline writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// Append-only history of processed donations.
    Donations,
    /// Point-in-time snapshot of campaign aggregates.
    Stats,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Table::Donations => "donations",
            Table::Stats => "stats",
        }
    }
}

/// Rows bound to the table they belong to.
#[derive(Debug, Clone, Copy)]
pub enum TableRows<'a> {
    Donations(&'a [ProcessedDonation]),
    Stats(&'a [CampaignStats]),
}

impl TableRows<'_> {
    pub fn table(&self) -> Table {
        match self {
            TableRows::Donations(_) => Table::Donations,
            TableRows::Stats(_) => Table::Stats,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            TableRows::Donations(rows) => rows.len(),
            TableRows::Stats(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Source of raw donation records.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Fetch records from the remote endpoint (`use_remote = true`) or the
    /// local fixture, seeding the fixture if it does not exist yet.
    async fn extract(&self, use_remote: bool) -> Result<Vec<DonationRecord>, PipelineError>;
}

/// Relational persistence for processed donations and campaign stats.
///
/// Implementors create the tables on first use. Every method either commits
/// fully or leaves the store unchanged.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Append rows to their table. Returns the number of rows written.
    async fn append<'a>(&self, rows: TableRows<'a>) -> Result<usize, PipelineError>;

    /// Replace the whole content of the table with `rows`.
    async fn replace<'a>(&self, rows: TableRows<'a>) -> Result<usize, PipelineError>;

    /// Append `donations` and replace `stats` in a single transaction.
    async fn write_run<'a>(
        &self,
        donations: &'a [ProcessedDonation],
        stats: &'a [CampaignStats],
    ) -> Result<(), PipelineError>;

    /// Human readable backend name for logs.
    fn backend(&self) -> &'static str;
}
