#![doc = "donation-etl: extract, clean, aggregate and persist donation records."]

//! Stages, leaf first:
//!
//! - [`extract`]: raw records from a remote endpoint or a local fixture
//! - [`transform`]: cleaning, deduplication and per-campaign aggregation
//! - [`load`] / [`store`]: transactional writes to SQLite or Postgres
//! - [`export`]: CSV or JSON-lines snapshots of cleaned records
//! - [`pipeline`]: the fail-fast run that composes the stages
//! - [`schedule`]: periodic re-execution
//!
//! Seams between the orchestrator and I/O are the traits in [`contract`].

pub mod cli;
pub mod config;
pub mod contract;
pub mod error;
pub mod export;
pub mod extract;
pub mod load;
pub mod load_config;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod schedule;
pub mod session;
pub mod store;
pub mod transform;

pub use cli::{run, Cli, Commands};
pub use error::PipelineError;
