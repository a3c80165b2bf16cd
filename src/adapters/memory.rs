use crate::domain::model::{Category, CategoryId, Domain, DomainId, Item, ProfileId};
use crate::domain::ports::{CategoryRepository, DomainRepository, ItemRepository};
use crate::utils::error::{Result, StatsError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// JSON snapshot of one or more profile trees.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub profiles: Vec<ProfileNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileNode {
    pub id: ProfileId,
    #[serde(default)]
    pub categories: Vec<CategoryNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub domains: Vec<DomainNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainNode {
    pub id: DomainId,
    pub name: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Repository backed by an in-process tree.
///
/// Serves offline snapshots for the CLI and doubles as the test fake: any
/// node can be made to fail and calls can be slowed down. Ids that are not
/// in the tree list as empty.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    categories: HashMap<ProfileId, Vec<Category>>,
    domains: HashMap<CategoryId, Vec<Domain>>,
    items: HashMap<DomainId, Vec<Item>>,
    failing_profiles: HashSet<ProfileId>,
    failing_categories: HashSet<CategoryId>,
    failing_domains: HashSet<DomainId>,
    latency: Option<Duration>,
    item_latency: HashMap<DomainId, Duration>,
    started_calls: AtomicUsize,
    completed_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut repository = Self::new();
        for profile in snapshot.profiles {
            // a profile with no categories still lists as present
            repository.categories.entry(profile.id).or_default();
            for category in profile.categories {
                repository = repository.with_category(
                    profile.id,
                    Category {
                        id: category.id,
                        name: category.name,
                    },
                );
                for domain in category.domains {
                    repository = repository
                        .with_domain(
                            category.id,
                            Domain {
                                id: domain.id,
                                name: domain.name,
                            },
                        )
                        .with_items(domain.id, domain.items);
                }
            }
        }
        repository
    }

    pub fn from_snapshot_json(content: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(content)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_snapshot_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        tracing::debug!("Loaded snapshot from {}", path.as_ref().display());
        Self::from_snapshot_json(&content)
    }

    pub fn with_category(mut self, profile_id: ProfileId, category: Category) -> Self {
        self.categories.entry(profile_id).or_default().push(category);
        self
    }

    pub fn with_domain(mut self, category_id: CategoryId, domain: Domain) -> Self {
        self.domains.entry(category_id).or_default().push(domain);
        self
    }

    pub fn with_items(mut self, domain_id: DomainId, items: Vec<Item>) -> Self {
        self.items.entry(domain_id).or_default().extend(items);
        self
    }

    pub fn fail_categories_for(mut self, profile_id: ProfileId) -> Self {
        self.failing_profiles.insert(profile_id);
        self
    }

    pub fn fail_domains_for(mut self, category_id: CategoryId) -> Self {
        self.failing_categories.insert(category_id);
        self
    }

    pub fn fail_items_for(mut self, domain_id: DomainId) -> Self {
        self.failing_domains.insert(domain_id);
        self
    }

    /// Delay applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Extra delay for one domain's item listing, on top of `with_latency`.
    pub fn with_item_latency(mut self, domain_id: DomainId, latency: Duration) -> Self {
        self.item_latency.insert(domain_id, latency);
        self
    }

    pub fn started_calls(&self) -> usize {
        self.started_calls.load(Ordering::SeqCst)
    }

    pub fn completed_calls(&self) -> usize {
        self.completed_calls.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn serve<T: Clone>(
        &self,
        extra_latency: Option<Duration>,
        failing: bool,
        what: &'static str,
        id: i64,
        rows: Option<&Vec<T>>,
    ) -> Result<Vec<T>> {
        self.started_calls.fetch_add(1, Ordering::SeqCst);
        let _guard = InFlight::enter(self);

        let delay = self.latency.unwrap_or_default() + extra_latency.unwrap_or_default();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.completed_calls.fetch_add(1, Ordering::SeqCst);

        if failing {
            return Err(StatsError::HttpStatusError {
                status: 503,
                message: format!("{} unavailable for {}", what, id),
            });
        }
        Ok(rows.cloned().unwrap_or_default())
    }
}

// Released on drop so aborted calls leave the in-flight count too.
struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(repository: &'a MemoryRepository) -> Self {
        let now = repository.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        repository.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self {
            counter: &repository.in_flight,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CategoryRepository for MemoryRepository {
    async fn list_categories(&self, profile_id: ProfileId) -> Result<Vec<Category>> {
        self.serve(
            None,
            self.failing_profiles.contains(&profile_id),
            "categories",
            profile_id,
            self.categories.get(&profile_id),
        )
        .await
    }
}

#[async_trait]
impl DomainRepository for MemoryRepository {
    async fn list_domains(&self, category_id: CategoryId) -> Result<Vec<Domain>> {
        self.serve(
            None,
            self.failing_categories.contains(&category_id),
            "domains",
            category_id,
            self.domains.get(&category_id),
        )
        .await
    }
}

#[async_trait]
impl ItemRepository for MemoryRepository {
    async fn list_items(&self, domain_id: DomainId) -> Result<Vec<Item>> {
        self.serve(
            self.item_latency.get(&domain_id).copied(),
            self.failing_domains.contains(&domain_id),
            "items",
            domain_id,
            self.items.get(&domain_id),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ItemState;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SNAPSHOT: &str = r#"
{
  "profiles": [
    {
      "id": 1,
      "categories": [
        {
          "id": 10,
          "name": "Communication",
          "domains": [
            {
              "id": 100,
              "name": "Langage réceptif",
              "items": [
                {"id": 1, "etat": "ACQUIS", "modified_at": "2024-03-01T10:00:00Z"},
                {"id": 2, "etat": "NON_COTE"}
              ]
            }
          ]
        },
        { "id": 11, "name": "Autonomie" }
      ]
    }
  ]
}
"#;

    #[tokio::test]
    async fn test_snapshot_lists_tree() {
        let repository = MemoryRepository::from_snapshot_json(SNAPSHOT).unwrap();

        let categories = repository.list_categories(1).await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "Communication");

        let domains = repository.list_domains(10).await.unwrap();
        assert_eq!(domains[0].id, 100);
        assert!(repository.list_domains(11).await.unwrap().is_empty());

        let items = repository.list_items(100).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].state, ItemState::Acquired);
        assert!(items[1].last_modified_at.is_none());
    }

    #[tokio::test]
    async fn test_unknown_ids_list_empty() {
        let repository = MemoryRepository::new();
        assert!(repository.list_categories(42).await.unwrap().is_empty());
        assert!(repository.list_items(42).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let repository = MemoryRepository::new()
            .fail_categories_for(1)
            .fail_domains_for(2)
            .fail_items_for(3);

        assert!(repository.list_categories(1).await.is_err());
        assert!(repository.list_domains(2).await.is_err());
        assert!(matches!(
            repository.list_items(3).await,
            Err(StatsError::HttpStatusError { status: 503, .. })
        ));
        assert_eq!(repository.completed_calls(), 3);
        assert_eq!(repository.in_flight(), 0);
    }

    #[test]
    fn test_snapshot_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();

        let repository = MemoryRepository::from_snapshot_file(file.path()).unwrap();
        assert_eq!(repository.categories.get(&1).map(Vec::len), Some(2));
    }

    #[test]
    fn test_invalid_snapshot_is_an_error() {
        assert!(matches!(
            MemoryRepository::from_snapshot_json("{\"profiles\": 3}"),
            Err(StatsError::SerializationError(_))
        ));
    }
}
