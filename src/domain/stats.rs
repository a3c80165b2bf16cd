use crate::domain::model::{Category, CategoryId, Domain, DomainId, ItemState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-state item counts shared by every level of the tree.
///
/// Invariant: `acquired + partial + not_acquired + not_evaluated == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCounts {
    pub total_items: u64,
    pub acquired_items: u64,
    pub partial_items: u64,
    pub not_acquired_items: u64,
    pub not_evaluated_items: u64,
}

impl ProgressCounts {
    pub fn record(&mut self, state: ItemState) {
        self.total_items += 1;
        match state {
            ItemState::Acquired => self.acquired_items += 1,
            ItemState::Partial => self.partial_items += 1,
            ItemState::NotAcquired => self.not_acquired_items += 1,
            ItemState::NotRated => self.not_evaluated_items += 1,
        }
    }

    pub fn merge(&mut self, other: &ProgressCounts) {
        self.total_items += other.total_items;
        self.acquired_items += other.acquired_items;
        self.partial_items += other.partial_items;
        self.not_acquired_items += other.not_acquired_items;
        self.not_evaluated_items += other.not_evaluated_items;
    }

    pub fn is_consistent(&self) -> bool {
        self.acquired_items + self.partial_items + self.not_acquired_items + self.not_evaluated_items
            == self.total_items
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStats {
    pub domain_id: DomainId,
    pub domain_name: String,
    #[serde(flatten)]
    pub counts: ProgressCounts,
    pub progress_percentage: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluation_date: Option<DateTime<Utc>>,
}

impl DomainStats {
    /// Placeholder for a domain whose items could not be fetched.
    pub fn empty(domain: &Domain) -> Self {
        Self {
            domain_id: domain.id,
            domain_name: domain.name.clone(),
            counts: ProgressCounts::default(),
            progress_percentage: 0,
            last_evaluation_date: None,
        }
    }

    pub fn total_items(&self) -> u64 {
        self.counts.total_items
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category_id: CategoryId,
    pub category_name: String,
    #[serde(flatten)]
    pub counts: ProgressCounts,
    pub progress_percentage: u8,
    pub domains: Vec<DomainStats>,
}

impl CategoryStats {
    /// Placeholder for a category whose domains could not be fetched.
    pub fn empty(category: &Category) -> Self {
        Self {
            category_id: category.id,
            category_name: category.name.clone(),
            counts: ProgressCounts::default(),
            progress_percentage: 0,
            domains: Vec::new(),
        }
    }

    pub fn total_items(&self) -> u64 {
        self.counts.total_items
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    #[serde(
        rename = "lastEvaluatedDomain",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_evaluated_domain_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluation_date: Option<DateTime<Utc>>,
    #[serde(rename = "totalEvaluationsToday")]
    pub evaluations_today: u64,
}

/// Final output of one aggregation. `Default` is the fully-empty result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub total_categories: u64,
    pub total_domains: u64,
    pub total_items: u64,
    pub overall_progress: u8,
    pub category_stats: Vec<CategoryStats>,
    pub recent_activity: RecentActivity,
}

impl OverallStats {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// All domains in category/domain traversal order.
    pub fn domains(&self) -> impl Iterator<Item = &DomainStats> {
        self.category_stats.iter().flat_map(|c| c.domains.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_record_keeps_invariant() {
        let mut counts = ProgressCounts::default();
        for state in [
            ItemState::Acquired,
            ItemState::Partial,
            ItemState::NotAcquired,
            ItemState::NotRated,
            ItemState::NotRated,
        ] {
            counts.record(state);
        }

        assert_eq!(counts.total_items, 5);
        assert_eq!(counts.not_evaluated_items, 2);
        assert!(counts.is_consistent());
    }

    #[test]
    fn test_empty_fallbacks_keep_labels() {
        let domain = Domain {
            id: 4,
            name: "Motricité fine".to_string(),
        };
        let stats = DomainStats::empty(&domain);
        assert_eq!(stats.domain_id, 4);
        assert_eq!(stats.domain_name, "Motricité fine");
        assert_eq!(stats.counts, ProgressCounts::default());
        assert_eq!(stats.progress_percentage, 0);
        assert!(stats.last_evaluation_date.is_none());

        let category = Category {
            id: 9,
            name: "Communication".to_string(),
        };
        let stats = CategoryStats::empty(&category);
        assert_eq!(stats.category_name, "Communication");
        assert!(stats.domains.is_empty());
        assert_eq!(stats.total_items(), 0);
    }

    #[test]
    fn test_overall_json_shape() {
        let json = serde_json::to_value(OverallStats::empty()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "totalCategories": 0,
                "totalDomains": 0,
                "totalItems": 0,
                "overallProgress": 0,
                "categoryStats": [],
                "recentActivity": { "totalEvaluationsToday": 0 }
            })
        );
    }

    #[test]
    fn test_domain_json_flattens_counts() {
        let stats = DomainStats::empty(&Domain {
            id: 1,
            name: "Langage".to_string(),
        });
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["domainId"], 1);
        assert_eq!(json["totalItems"], 0);
        assert_eq!(json["notEvaluatedItems"], 0);
        assert!(json.get("lastEvaluationDate").is_none());
    }
}
