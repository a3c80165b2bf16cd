use crate::domain::stats::{DomainStats, OverallStats};
use crate::utils::error::{Result, StatsError};
use csv::WriterBuilder;
use std::str::FromStr;

const TABLE_HEADER: [&str; 9] = [
    "category",
    "domain",
    "total",
    "acquired",
    "partial",
    "not_acquired",
    "not_evaluated",
    "progress",
    "last_evaluation",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Tsv,
}

impl FromStr for OutputFormat {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "tsv" => Ok(Self::Tsv),
            other => Err(StatsError::InvalidConfigValueError {
                field: "output.format".to_string(),
                value: other.to_string(),
                reason: "Unsupported format. Valid formats: json, csv, tsv".to_string(),
            }),
        }
    }
}

pub fn render(stats: &OverallStats, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => render_json(stats, true),
        OutputFormat::Csv => render_table(stats, b','),
        OutputFormat::Tsv => render_table(stats, b'\t'),
    }
}

pub fn render_json(stats: &OverallStats, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(stats)?
    } else {
        serde_json::to_string(stats)?
    };
    Ok(json)
}

/// One row per domain in traversal order; a category without domains still
/// gets a row so it shows up in the table.
pub fn render_table(stats: &OverallStats, delimiter: u8) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(TABLE_HEADER)?;

    for category in &stats.category_stats {
        if category.domains.is_empty() {
            writer.write_record([
                category.category_name.as_str(),
                "",
                "0",
                "0",
                "0",
                "0",
                "0",
                "0",
                "",
            ])?;
            continue;
        }

        for domain in &category.domains {
            writer.write_record(domain_row(&category.category_name, domain))?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| StatsError::IoError(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| StatsError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

fn domain_row(category_name: &str, domain: &DomainStats) -> [String; 9] {
    [
        category_name.to_string(),
        domain.domain_name.clone(),
        domain.counts.total_items.to_string(),
        domain.counts.acquired_items.to_string(),
        domain.counts.partial_items.to_string(),
        domain.counts.not_acquired_items.to_string(),
        domain.counts.not_evaluated_items.to_string(),
        domain.progress_percentage.to_string(),
        domain
            .last_evaluation_date
            .map(|d| d.to_rfc3339())
            .unwrap_or_default(),
    ]
}
