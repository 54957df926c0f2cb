//! Service configuration

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Listening port, taken from `PORT`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Directory holding the model and scaler artifacts
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

fn default_port() -> u16 {
    5000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            model_dir: default_model_dir(),
        }
    }
}

impl ServiceConfig {
    /// Load from `SURPLUS_*` environment variables plus the bare `PORT`
    pub fn load() -> Result<Self> {
        Self::from_env(std::env::var("PORT").ok())
    }

    fn from_env(port: Option<String>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("SURPLUS"))
            .set_override_option("port", port)?
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
