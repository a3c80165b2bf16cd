//! Pure aggregation over already-fetched data.
//!
//! Percentages are computed once from raw counts at every level (never by
//! averaging child percentages) and rounded half away from zero. All
//! arithmetic is integer so `62.5` reliably becomes `63`.

use crate::core::recent::resolve_recent_activity;
use crate::domain::model::{Category, Domain, Item};
use crate::domain::stats::{CategoryStats, DomainStats, OverallStats, ProgressCounts};
use chrono::NaiveDate;

/// Divide and round half away from zero. `denominator` must be non-zero.
fn div_round(numerator: u64, denominator: u64) -> u64 {
    (2 * numerator + denominator) / (2 * denominator)
}

/// `round(100 * (acquired + 0.5 * partial) / total)`, or 0 for an empty set.
pub fn progress_percentage(counts: &ProgressCounts) -> u8 {
    if counts.total_items == 0 {
        return 0;
    }

    // Doubled to keep the half credit for partial items integral.
    let credit = 2 * counts.acquired_items + counts.partial_items;
    let pct = div_round(100 * credit, 2 * counts.total_items);
    pct.min(100) as u8
}

/// Item-count-weighted mean of category percentages.
pub fn weighted_progress(categories: &[CategoryStats]) -> u8 {
    let total: u64 = categories.iter().map(CategoryStats::total_items).sum();
    if total == 0 {
        return 0;
    }

    let weighted: u64 = categories
        .iter()
        .map(|c| u64::from(c.progress_percentage) * c.total_items())
        .sum();
    div_round(weighted, total).min(100) as u8
}

pub fn aggregate_domain(domain: &Domain, items: &[Item]) -> DomainStats {
    let mut counts = ProgressCounts::default();
    for item in items {
        counts.record(item.state);
    }

    let last_evaluation_date = items
        .iter()
        .filter(|item| item.is_evaluated())
        .filter_map(|item| item.last_modified_at)
        .max();

    DomainStats {
        domain_id: domain.id,
        domain_name: domain.name.clone(),
        progress_percentage: progress_percentage(&counts),
        counts,
        last_evaluation_date,
    }
}

pub fn aggregate_category(category: &Category, domains: Vec<DomainStats>) -> CategoryStats {
    let mut counts = ProgressCounts::default();
    for domain in &domains {
        counts.merge(&domain.counts);
    }

    CategoryStats {
        category_id: category.id,
        category_name: category.name.clone(),
        progress_percentage: progress_percentage(&counts),
        counts,
        domains,
    }
}

/// Fold category results into the final snapshot. `today` is the local
/// calendar date used to count same-day evaluations.
pub fn aggregate_overall(category_stats: Vec<CategoryStats>, today: NaiveDate) -> OverallStats {
    let total_domains: u64 = category_stats.iter().map(|c| c.domains.len() as u64).sum();
    let total_items: u64 = category_stats.iter().map(CategoryStats::total_items).sum();
    let overall_progress = weighted_progress(&category_stats);
    let recent_activity = resolve_recent_activity(
        category_stats.iter().flat_map(|c| c.domains.iter()),
        today,
    );

    OverallStats {
        total_categories: category_stats.len() as u64,
        total_domains,
        total_items,
        overall_progress,
        category_stats,
        recent_activity,
    }
}
