//! Feature encoding for surplus prediction
//!
//! Maps a request payload onto the fixed-order feature vector the model was
//! trained on. Missing fields are defaulted from the request time; values are
//! never range-checked.

use crate::models::{DonorType, FeatureVector, PredictRequest, ResolvedFeatures};
use chrono::{DateTime, Datelike, TimeZone, Timelike};
use serde_json::Number;

/// Donor type assumed when the request omits one
pub const DEFAULT_DONOR_TYPE: &str = "RESTAURANT";

/// Number of previous donations assumed when omitted
pub const DEFAULT_PREVIOUS_DONATIONS: i64 = 0;

/// Average donation size (kg) assumed when omitted
pub const DEFAULT_AVG_DONATION_SIZE: f64 = 10.0;

/// Encodes prediction requests into model features
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Apply defaults to a request, using `now` for the temporal fields
    pub fn resolve<Tz: TimeZone>(
        &self,
        request: &PredictRequest,
        now: &DateTime<Tz>,
    ) -> ResolvedFeatures {
        ResolvedFeatures {
            donor_type: request
                .donor_type
                .clone()
                .unwrap_or_else(|| DEFAULT_DONOR_TYPE.to_string()),
            day_of_week: request
                .day_of_week
                .clone()
                .unwrap_or_else(|| now.weekday().num_days_from_monday().into()),
            month: request.month.clone().unwrap_or_else(|| now.month().into()),
            hour: request.hour.clone().unwrap_or_else(|| now.hour().into()),
            previous_donations: request
                .previous_donations
                .clone()
                .unwrap_or_else(|| DEFAULT_PREVIOUS_DONATIONS.into()),
            avg_donation_size: request
                .avg_donation_size
                .unwrap_or(DEFAULT_AVG_DONATION_SIZE),
        }
    }

    /// Build the ordered feature vector from resolved values
    pub fn encode(&self, resolved: &ResolvedFeatures) -> FeatureVector {
        [
            DonorType::from_name(&resolved.donor_type).code() as f64,
            numeric(&resolved.day_of_week),
            numeric(&resolved.month),
            numeric(&resolved.hour),
            numeric(&resolved.previous_donations),
            resolved.avg_donation_size,
        ]
    }
}

fn numeric(value: &Number) -> f64 {
    value.as_f64().unwrap_or_default()
}
