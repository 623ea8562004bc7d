//! Cleaning and aggregation of raw donation records.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::TimestampPolicy;
use crate::error::PipelineError;
use crate::model::{CampaignStats, DonationRecord, ProcessedDonation, TransformOutput};

/// Counts of records removed during cleaning, by reason.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DropCounts {
    pub missing_field: usize,
    pub invalid_id: usize,
    pub invalid_amount: usize,
    pub invalid_timestamp: usize,
    pub duplicate: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.missing_field
            + self.invalid_id
            + self.invalid_amount
            + self.invalid_timestamp
            + self.duplicate
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer {
    policy: TimestampPolicy,
}

impl Transformer {
    pub fn new(policy: TimestampPolicy) -> Self {
        Self { policy }
    }

    /// Clean `records` and aggregate per campaign, stamping with the current time.
    pub fn transform(&self, records: Vec<DonationRecord>) -> Result<TransformOutput, PipelineError> {
        self.transform_at(records, Utc::now())
    }

    /// Same as [`Transformer::transform`] with an explicit processing time.
    pub fn transform_at(
        &self,
        records: Vec<DonationRecord>,
        processed_at: DateTime<Utc>,
    ) -> Result<TransformOutput, PipelineError> {
        let result = self.clean(records, processed_at);
        match &result {
            Ok((donations, dropped)) => info!(
                stage = "transform",
                records = donations.len(),
                dropped = dropped.total(),
                "Transformation complete"
            ),
            Err(e) => error!(stage = "transform", kind = e.kind(), error = %e, "Transformation failed"),
        }
        let (donations, _) = result?;
        let stats = aggregate(&donations);
        debug!(campaigns = stats.len(), "Aggregated campaign stats");
        Ok(TransformOutput { donations, stats })
    }

    fn clean(
        &self,
        records: Vec<DonationRecord>,
        processed_at: DateTime<Utc>,
    ) -> Result<(Vec<ProcessedDonation>, DropCounts), PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        let input = records.len();

        let mut dropped = DropCounts::default();
        let mut seen: HashSet<(i64, NaiveDateTime)> = HashSet::new();
        let mut donations = Vec::with_capacity(input);

        for (index, record) in records.into_iter().enumerate() {
            let (Some(donor), Some(amount), Some(campaign)) = (
                present(&record.donor_id),
                present(&record.amount),
                present(&record.campaign_id),
            ) else {
                dropped.missing_field += 1;
                continue;
            };

            let (Some(donor_id), Some(campaign_id)) = (coerce_id(donor), coerce_id(campaign))
            else {
                dropped.invalid_id += 1;
                continue;
            };

            let Some(amount) = coerce_amount(amount) else {
                dropped.invalid_amount += 1;
                continue;
            };

            let timestamp = match present(&record.timestamp).and_then(parse_timestamp) {
                Some(ts) => ts,
                None => match self.policy {
                    TimestampPolicy::Drop => {
                        dropped.invalid_timestamp += 1;
                        continue;
                    }
                    TimestampPolicy::Reject => {
                        return Err(PipelineError::InvalidTimestamp(format!(
                            "record {index}: {}",
                            record
                                .timestamp
                                .as_ref()
                                .map(Value::to_string)
                                .unwrap_or_else(|| "missing".to_string())
                        )));
                    }
                },
            };

            if !seen.insert((donor_id, timestamp)) {
                dropped.duplicate += 1;
                continue;
            }

            donations.push(ProcessedDonation {
                donor_id,
                amount,
                campaign_id,
                timestamp,
                processed_at,
            });
        }

        if dropped.total() > 0 {
            warn!(
                input,
                missing_field = dropped.missing_field,
                invalid_id = dropped.invalid_id,
                invalid_amount = dropped.invalid_amount,
                invalid_timestamp = dropped.invalid_timestamp,
                duplicate = dropped.duplicate,
                "Dropped records during cleaning"
            );
        }
        Ok((donations, dropped))
    }
}

/// Sum and count per campaign, ordered by campaign id.
pub fn aggregate(donations: &[ProcessedDonation]) -> Vec<CampaignStats> {
    let mut groups: BTreeMap<i64, (f64, i64)> = BTreeMap::new();
    for d in donations {
        let entry = groups.entry(d.campaign_id).or_insert((0.0, 0));
        entry.0 += d.amount;
        entry.1 += 1;
    }
    groups
        .into_iter()
        .map(|(campaign_id, (total_amount, donation_count))| CampaignStats {
            campaign_id,
            total_amount,
            donation_count,
        })
        .collect()
}

fn present(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|v| !v.is_null())
}

/// Integers, integral floats (as produced by sources that mix in nulls) and
/// integer strings.
fn coerce_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    amount.is_finite().then_some(amount)
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offsets RFC 3339 rejects: basic form (`+0200`) or a space separator.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parses the timestamp formats sources are known to send. Offsets are
/// normalised to UTC.
pub fn parse_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let raw = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.naive_utc());
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
