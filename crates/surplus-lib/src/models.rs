//! Core data models for the surplus predictor

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Number of model input features
pub const NUM_FEATURES: usize = 6;

/// Static model version reported by every endpoint
pub const MODEL_VERSION: &str = "1.0.0";

/// Ordered model input:
/// `[donor_type_code, day_of_week, month, hour, previous_donations, avg_donation_size]`
pub type FeatureVector = [f64; NUM_FEATURES];

/// Categorical source of a donation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DonorType {
    Restaurant,
    Event,
    Hostel,
    Individual,
}

impl DonorType {
    pub const ALL: [DonorType; 4] = [
        DonorType::Restaurant,
        DonorType::Event,
        DonorType::Hostel,
        DonorType::Individual,
    ];

    /// Case-insensitive lookup; unknown names fall back to `Restaurant`
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "EVENT" => DonorType::Event,
            "HOSTEL" => DonorType::Hostel,
            "INDIVIDUAL" => DonorType::Individual,
            _ => DonorType::Restaurant,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            DonorType::Restaurant => 0,
            DonorType::Event => 1,
            DonorType::Hostel => 2,
            DonorType::Individual => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// Prediction request payload; every field may be omitted.
///
/// Numeric fields accept integers or floats and are echoed back as sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictRequest {
    pub donor_type: Option<String>,
    pub day_of_week: Option<Number>,
    pub month: Option<Number>,
    pub hour: Option<Number>,
    pub previous_donations: Option<Number>,
    pub avg_donation_size: Option<f64>,
}

/// Request values after defaults were applied, echoed back to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedFeatures {
    pub donor_type: String,
    pub day_of_week: Number,
    pub month: Number,
    pub hour: Number,
    pub previous_donations: Number,
    pub avg_donation_size: f64,
}

/// Raw predictor output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub quantity_kg: f64,
    pub confidence: f64,
}

/// Response body of a surplus prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub prediction_id: String,
    pub donor_type: String,
    pub predicted_quantity_kg: f64,
    pub confidence: f64,
    pub prediction_date: DateTime<Local>,
    pub valid_until: DateTime<Local>,
    pub model_version: String,
    pub features_used: ResolvedFeatures,
}

/// Model status as reported by `/model-info`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_samples: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Local>>,
}

impl ModelInfo {
    pub fn not_loaded() -> Self {
        Self {
            status: "No model loaded".to_string(),
            version: MODEL_VERSION.to_string(),
            model_type: None,
            features: None,
            training_samples: None,
            last_updated: None,
        }
    }
}
