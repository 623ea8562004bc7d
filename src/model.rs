//! Record shapes flowing through the pipeline.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A donation exactly as it came out of the source.
///
/// Fields are kept as loose JSON values: sources are allowed to send nulls,
/// strings for numbers, or to omit keys entirely. The transformer decides
/// what survives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DonationRecord {
    #[serde(default)]
    pub donor_id: Option<serde_json::Value>,
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default)]
    pub campaign_id: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
}

impl DonationRecord {
    /// Convenience constructor for well-formed records.
    pub fn new(donor_id: i64, amount: f64, campaign_id: i64, timestamp: &str) -> Self {
        Self {
            donor_id: Some(donor_id.into()),
            amount: Some(amount.into()),
            campaign_id: Some(campaign_id.into()),
            timestamp: Some(timestamp.into()),
        }
    }
}

/// A cleaned donation, as persisted to the `donations` table and exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedDonation {
    pub donor_id: i64,
    pub amount: f64,
    pub campaign_id: i64,
    pub timestamp: NaiveDateTime,
    pub processed_at: DateTime<Utc>,
}

/// Per-campaign aggregate, one row per campaign in the processed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignStats {
    pub campaign_id: i64,
    pub total_amount: f64,
    pub donation_count: i64,
}

/// Output of the transform stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutput {
    pub donations: Vec<ProcessedDonation>,
    pub stats: Vec<CampaignStats>,
}

/// Result of one successful pipeline run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run_id: Uuid,
    pub donations: Vec<ProcessedDonation>,
    pub stats: Vec<CampaignStats>,
}
