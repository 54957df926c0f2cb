//! Food surplus prediction library
//!
//! This crate provides:
//! - Feature encoding of donation requests
//! - Synthetic-data training of a scaled random forest regressor
//! - Model persistence and the shared live model store
//! - Health tracking and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod store;

pub use error::{StoreError, TrainError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{ServiceMetrics, StructuredLogger};
pub use store::ModelStore;
