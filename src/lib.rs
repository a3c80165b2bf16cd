pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::{HttpRepository, MemoryRepository};
pub use config::Settings;
pub use crate::core::engine::{EngineConfig, StatisticsEngine};
pub use crate::core::report::OutputFormat;
pub use domain::stats::{CategoryStats, DomainStats, OverallStats, RecentActivity};
pub use utils::error::{Result, StatsError};
