use crate::config::toml_config::TomlConfig;
use crate::config::Settings;
use crate::domain::model::ProfileId;
use crate::utils::error::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "skill-progress")]
#[command(about = "Compute developmental-skill progress statistics for a profile")]
pub struct CliConfig {
    /// Profile whose category tree is aggregated
    #[arg(long)]
    pub profile_id: ProfileId,

    /// Base URL of the profile REST API
    #[arg(long)]
    pub api_base_url: Option<String>,

    /// Bearer token sent with every API request
    #[arg(long, env = "SKILL_PROGRESS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Maximum repository calls in flight
    #[arg(long)]
    pub concurrent_requests: Option<usize>,

    /// Abort the whole aggregation after this many seconds
    #[arg(long)]
    pub timeout_seconds: Option<u64>,

    /// Timeout for a single API request
    #[arg(long)]
    pub request_timeout_seconds: Option<u64>,

    /// Output format: json, csv or tsv
    #[arg(long)]
    pub format: Option<String>,

    /// Read the tree from a JSON snapshot instead of the API
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

impl CliConfig {
    /// Defaults, then the TOML file (if any), then command-line flags.
    pub fn resolve(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => TomlConfig::from_file(path)?.into_settings(),
            None => Settings::default(),
        };

        if let Some(url) = &self.api_base_url {
            settings.api_base_url = url.clone();
        }
        if let Some(token) = &self.token {
            settings.api_token = Some(token.clone());
        }
        if let Some(concurrent) = self.concurrent_requests {
            settings.concurrent_requests = concurrent;
        }
        if let Some(timeout) = self.timeout_seconds {
            settings.timeout_seconds = Some(timeout);
        }
        if let Some(timeout) = self.request_timeout_seconds {
            settings.request_timeout_seconds = timeout;
        }
        if let Some(format) = &self.format {
            settings.format = format.clone();
        }

        Ok(settings)
    }
}
