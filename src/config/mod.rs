#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::engine::DEFAULT_CONCURRENT_REQUESTS;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/";
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Fully resolved configuration, after the TOML file and CLI overrides are merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub concurrent_requests: usize,
    pub timeout_seconds: Option<u64>,
    pub request_timeout_seconds: u64,
    pub format: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_token: None,
            concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
            timeout_seconds: None,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            format: "json".to_string(),
        }
    }
}

impl ConfigProvider for Settings {
    fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    fn concurrent_requests(&self) -> usize {
        self.concurrent_requests
    }

    fn timeout_seconds(&self) -> Option<u64> {
        self.timeout_seconds
    }

    fn request_timeout_seconds(&self) -> u64 {
        self.request_timeout_seconds
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("api.base_url", &self.api_base_url)?;
        if let Some(token) = &self.api_token {
            validation::validate_non_empty_string("api.token", token)?;
        }
        validation::validate_positive_number("engine.concurrent_requests", self.concurrent_requests, 1)?;
        if let Some(timeout) = self.timeout_seconds {
            validation::validate_range("engine.timeout_seconds", timeout, 1, 3600)?;
        }
        validation::validate_range("api.request_timeout_seconds", self.request_timeout_seconds, 1, 600)?;
        validation::validate_output_format("output.format", &self.format)?;
        Ok(())
    }
}
