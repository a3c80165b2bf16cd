//! Profile-level orchestration: categories -> domains -> items, fetched
//! concurrently and folded back in repository order.
//!
//! Every branch owns its own result slot. A failed fetch turns into the
//! empty fallback for that branch only; cancellation is the one outcome that
//! propagates, and dropping an aggregation aborts all of its spawned tasks.

use crate::core::aggregate::{aggregate_category, aggregate_domain, aggregate_overall};
use crate::domain::model::{Category, Domain, ProfileId};
use crate::domain::ports::{ConfigProvider, ProfileRepository};
use crate::domain::stats::{CategoryStats, DomainStats, OverallStats};
use crate::utils::error::{Result, StatsError};
use chrono::Local;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONCURRENT_REQUESTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on repository calls in flight for one aggregation.
    pub concurrent_requests: usize,
    pub timeout_seconds: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrent_requests: DEFAULT_CONCURRENT_REQUESTS,
            timeout_seconds: None,
        }
    }
}

impl EngineConfig {
    pub fn from_provider<C: ConfigProvider>(config: &C) -> Self {
        Self {
            concurrent_requests: config.concurrent_requests(),
            timeout_seconds: config.timeout_seconds(),
        }
    }
}

pub struct StatisticsEngine<R: ProfileRepository + ?Sized + 'static> {
    repository: Arc<R>,
    config: EngineConfig,
}

impl<R: ProfileRepository + ?Sized + 'static> StatisticsEngine<R> {
    pub fn new(repository: Arc<R>, config: EngineConfig) -> Self {
        Self { repository, config }
    }

    pub fn with_defaults(repository: Arc<R>) -> Self {
        Self::new(repository, EngineConfig::default())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Aggregate a profile. Never fails: fetch errors degrade the affected
    /// branch, and an unavailable category list yields the empty result.
    pub async fn get_profile_statistics(&self, profile_id: ProfileId) -> OverallStats {
        let token = CancellationToken::new();
        match self.aggregate(profile_id, &token).await {
            Ok(stats) => stats,
            // only reachable through cancellation, which this token never sees
            Err(e) => {
                tracing::warn!("Statistics for profile {} abandoned: {}", profile_id, e);
                OverallStats::empty()
            }
        }
    }

    /// Aggregate a profile unless `cancel` fires or the configured timeout
    /// elapses first, in which case nothing partial is returned.
    pub async fn get_profile_statistics_cancellable(
        &self,
        profile_id: ProfileId,
        cancel: &CancellationToken,
    ) -> Result<OverallStats> {
        let token = cancel.child_token();
        // Anything still running once we return sees the cancellation.
        let _guard = token.clone().drop_guard();

        let run = self.aggregate(profile_id, &token);
        let result = match self.config.timeout_seconds {
            Some(seconds) => match tokio::time::timeout(Duration::from_secs(seconds), run).await {
                Ok(result) => result,
                Err(_) => Err(StatsError::TimedOut { seconds }),
            },
            None => run.await,
        };

        if let Err(e) = &result {
            tracing::info!("Statistics for profile {} stopped: {}", profile_id, e);
        }
        result
    }

    async fn aggregate(&self, profile_id: ProfileId, token: &CancellationToken) -> Result<OverallStats> {
        tracing::info!("Loading statistics for profile {}", profile_id);
        let limiter = Arc::new(Semaphore::new(self.config.concurrent_requests.max(1)));

        let categories = match guarded(
            token,
            &limiter,
            self.repository.list_categories(profile_id),
        )
        .await
        {
            Ok(categories) => categories,
            Err(e) if e.is_cancellation() => return Err(e),
            Err(e) => {
                tracing::warn!("Error loading categories for profile {}: {}", profile_id, e);
                return Ok(OverallStats::empty());
            }
        };
        tracing::debug!("{} categories loaded for profile {}", categories.len(), profile_id);

        let mut slots: Vec<CategoryStats> = categories.iter().map(CategoryStats::empty).collect();
        let mut tasks = JoinSet::new();
        for (idx, category) in categories.into_iter().enumerate() {
            let repository = Arc::clone(&self.repository);
            let limiter = Arc::clone(&limiter);
            let token = token.clone();
            tasks.spawn(async move {
                (idx, category_branch(repository, limiter, token, category).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, Ok(stats))) => {
                    if let Some(slot) = slots.get_mut(idx) {
                        *slot = stats;
                    }
                }
                // dropping `tasks` aborts the remaining branches
                Ok((_, Err(e))) => return Err(e),
                Err(e) => tracing::warn!("Category task failed, keeping empty statistics: {}", e),
            }
        }

        let overall = aggregate_overall(slots, Local::now().date_naive());
        tracing::info!(
            "Profile {}: {} categories, {} domains, {} items, {}% overall",
            profile_id,
            overall.total_categories,
            overall.total_domains,
            overall.total_items,
            overall.overall_progress
        );
        Ok(overall)
    }
}

async fn category_branch<R: ProfileRepository + ?Sized + 'static>(
    repository: Arc<R>,
    limiter: Arc<Semaphore>,
    token: CancellationToken,
    category: Category,
) -> Result<CategoryStats> {
    let domains = match guarded(&token, &limiter, repository.list_domains(category.id)).await {
        Ok(domains) => domains,
        Err(e) if e.is_cancellation() => return Err(e),
        Err(e) => {
            tracing::warn!("Error loading statistics for category {}: {}", category.id, e);
            return Ok(CategoryStats::empty(&category));
        }
    };

    let mut slots: Vec<DomainStats> = domains.iter().map(DomainStats::empty).collect();
    let mut tasks = JoinSet::new();
    for (idx, domain) in domains.into_iter().enumerate() {
        let repository = Arc::clone(&repository);
        let limiter = Arc::clone(&limiter);
        let token = token.clone();
        tasks.spawn(async move { (idx, domain_branch(repository, limiter, token, domain).await) });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, Ok(stats))) => {
                if let Some(slot) = slots.get_mut(idx) {
                    *slot = stats;
                }
            }
            Ok((_, Err(e))) => return Err(e),
            Err(e) => tracing::warn!(
                "Domain task in category {} failed, keeping empty statistics: {}",
                category.id,
                e
            ),
        }
    }

    Ok(aggregate_category(&category, slots))
}

async fn domain_branch<R: ProfileRepository + ?Sized + 'static>(
    repository: Arc<R>,
    limiter: Arc<Semaphore>,
    token: CancellationToken,
    domain: Domain,
) -> Result<DomainStats> {
    match guarded(&token, &limiter, repository.list_items(domain.id)).await {
        Ok(items) => Ok(aggregate_domain(&domain, &items)),
        Err(e) if e.is_cancellation() => Err(e),
        Err(e) => {
            tracing::warn!("Error loading items for domain {}: {}", domain.id, e);
            Ok(DomainStats::empty(&domain))
        }
    }
}

/// Run one repository call under the concurrency limit, racing the token.
/// The permit is held for the call only, so parents never starve children.
async fn guarded<T, F>(token: &CancellationToken, limiter: &Semaphore, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(StatsError::Cancelled),
        result = async {
            let _permit = limiter.acquire().await.map_err(|_| StatsError::Cancelled)?;
            call.await
        } => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryRepository;
    use crate::domain::model::{Item, ItemState};
    use chrono::Utc;

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
        }
    }

    fn domain(id: i64, name: &str) -> Domain {
        Domain {
            id,
            name: name.to_string(),
        }
    }

    fn items(states: &[ItemState]) -> Vec<Item> {
        states
            .iter()
            .enumerate()
            .map(|(i, s)| Item::new(i as i64 + 1, *s))
            .collect()
    }

    /// Profile 1: category 10 with domains 100, 101, 102 and category 20 with domain 200.
    fn sample_repository() -> MemoryRepository {
        use ItemState::*;
        MemoryRepository::new()
            .with_category(1, category(10, "Communication"))
            .with_category(1, category(20, "Autonomie"))
            .with_domain(10, domain(100, "Langage"))
            .with_domain(10, domain(101, "Gestes"))
            .with_domain(10, domain(102, "Imitation"))
            .with_domain(20, domain(200, "Habillage"))
            .with_items(100, items(&[Acquired, Acquired, Partial, NotAcquired]))
            .with_items(101, items(&[Acquired, NotRated]))
            .with_items(102, items(&[Partial, Partial]))
            .with_items(200, items(&[NotAcquired, NotAcquired, Acquired, Acquired]))
    }

    #[tokio::test]
    async fn test_full_tree_aggregation() {
        let engine = StatisticsEngine::with_defaults(Arc::new(sample_repository()));
        let stats = engine.get_profile_statistics(1).await;

        assert_eq!(stats.total_categories, 2);
        assert_eq!(stats.total_domains, 4);
        assert_eq!(stats.total_items, 12);

        let communication = &stats.category_stats[0];
        assert_eq!(communication.category_name, "Communication");
        assert_eq!(communication.counts.total_items, 8);
        assert_eq!(communication.counts.acquired_items, 3);
        assert_eq!(communication.counts.partial_items, 3);
        // (3 + 1.5) / 8 = 56.25
        assert_eq!(communication.progress_percentage, 56);
        assert_eq!(stats.category_stats[0].domains[0].progress_percentage, 63);

        let autonomie = &stats.category_stats[1];
        assert_eq!(autonomie.progress_percentage, 50);

        // (56 * 8 + 50 * 4) / 12 = 54
        assert_eq!(stats.overall_progress, 54);

        for category in &stats.category_stats {
            assert!(category.counts.is_consistent());
            let summed: u64 = category.domains.iter().map(DomainStats::total_items).sum();
            assert_eq!(summed, category.total_items());
            for domain in &category.domains {
                assert!(domain.counts.is_consistent());
                assert!(domain.progress_percentage <= 100);
            }
        }
    }

    #[tokio::test]
    async fn test_item_failure_is_isolated_to_its_domain() {
        let repository = Arc::new(sample_repository().fail_items_for(101));
        let engine = StatisticsEngine::with_defaults(repository);

        let stats = engine.get_profile_statistics(1).await;
        let communication = &stats.category_stats[0];

        assert_eq!(communication.domains.len(), 3);
        assert_eq!(communication.domains[1], DomainStats::empty(&domain(101, "Gestes")));
        assert_eq!(communication.domains[0].total_items(), 4);
        assert_eq!(communication.domains[2].total_items(), 2);
        assert_eq!(communication.total_items(), 6);
        assert_eq!(stats.category_stats[1].total_items(), 4);
    }

    #[tokio::test]
    async fn test_domain_failure_empties_only_that_category() {
        let engine = StatisticsEngine::with_defaults(Arc::new(sample_repository().fail_domains_for(10)));
        let stats = engine.get_profile_statistics(1).await;

        assert_eq!(stats.total_categories, 2);
        assert_eq!(
            stats.category_stats[0],
            CategoryStats::empty(&category(10, "Communication"))
        );
        assert_eq!(stats.category_stats[1].total_items(), 4);
        assert_eq!(stats.total_domains, 1);
        assert_eq!(stats.overall_progress, 50);
    }

    #[tokio::test]
    async fn test_category_failure_yields_empty_result() {
        let engine = StatisticsEngine::with_defaults(Arc::new(sample_repository().fail_categories_for(1)));
        let stats = engine.get_profile_statistics(1).await;

        assert!(stats.is_empty());
        assert!(stats.category_stats.is_empty());
        assert_eq!(stats.recent_activity.evaluations_today, 0);
    }

    #[tokio::test]
    async fn test_profile_without_categories() {
        let engine = StatisticsEngine::with_defaults(Arc::new(MemoryRepository::new()));
        assert!(engine.get_profile_statistics(5).await.is_empty());
    }

    #[tokio::test]
    async fn test_output_follows_repository_order_not_completion_order() {
        let repository = sample_repository()
            .with_item_latency(100, Duration::from_millis(80))
            .with_item_latency(101, Duration::from_millis(40));
        let engine = StatisticsEngine::with_defaults(Arc::new(repository));

        let stats = engine.get_profile_statistics(1).await;
        let names: Vec<&str> = stats
            .domains()
            .map(|d| d.domain_name.as_str())
            .collect();
        assert_eq!(names, vec!["Langage", "Gestes", "Imitation", "Habillage"]);
    }

    #[tokio::test]
    async fn test_item_fetches_run_concurrently_within_limit() {
        let repository = Arc::new(sample_repository().with_latency(Duration::from_millis(30)));
        let engine = StatisticsEngine::new(
            Arc::clone(&repository),
            EngineConfig {
                concurrent_requests: 3,
                timeout_seconds: None,
            },
        );

        engine.get_profile_statistics(1).await;

        // 1 category call + 2 domain calls + 4 item calls
        assert_eq!(repository.completed_calls(), 7);
        assert!(repository.max_in_flight() > 1);
        assert!(repository.max_in_flight() <= 3);
    }

    #[tokio::test]
    async fn test_recent_activity_from_tree() {
        let now = Utc::now();
        let older = now - chrono::Duration::days(3);
        let repository = MemoryRepository::new()
            .with_category(1, category(10, "Communication"))
            .with_domain(10, domain(100, "Langage"))
            .with_domain(10, domain(101, "Gestes"))
            .with_items(100, vec![Item::new(1, ItemState::Acquired).modified_at(older)])
            .with_items(
                101,
                vec![
                    Item::new(2, ItemState::Partial).modified_at(now),
                    Item::new(3, ItemState::NotRated),
                ],
            );
        let engine = StatisticsEngine::with_defaults(Arc::new(repository));

        let stats = engine.get_profile_statistics(1).await;
        assert_eq!(
            stats.recent_activity.last_evaluated_domain_name.as_deref(),
            Some("Gestes")
        );
        assert_eq!(stats.recent_activity.last_evaluation_date, Some(now));
        assert_eq!(stats.recent_activity.evaluations_today, 1);
    }

    #[tokio::test]
    async fn test_cancellation_is_not_an_empty_result() {
        let repository = Arc::new(sample_repository().with_item_latency(102, Duration::from_secs(30)));
        let engine = StatisticsEngine::with_defaults(Arc::clone(&repository));
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = engine.get_profile_statistics_cancellable(1, &token).await;
        assert!(matches!(result, Err(StatsError::Cancelled)));

        // the slow item call was abandoned, not left running
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(repository.in_flight(), 0);
        assert!(repository.completed_calls() < repository.started_calls());
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let repository = Arc::new(sample_repository());
        let engine = StatisticsEngine::with_defaults(Arc::clone(&repository));
        let token = CancellationToken::new();
        token.cancel();

        let result = engine.get_profile_statistics_cancellable(1, &token).await;
        assert!(matches!(result, Err(StatsError::Cancelled)));
        assert_eq!(repository.started_calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_cancels_aggregation() {
        let repository = Arc::new(sample_repository().with_item_latency(200, Duration::from_secs(30)));
        let engine = StatisticsEngine::new(
            Arc::clone(&repository),
            EngineConfig {
                concurrent_requests: 4,
                timeout_seconds: Some(1),
            },
        );

        let result = engine
            .get_profile_statistics_cancellable(1, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(StatsError::TimedOut { seconds: 1 })));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(repository.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancellable_success_matches_infallible_entry_point() {
        let engine = StatisticsEngine::with_defaults(Arc::new(sample_repository()));
        let token = CancellationToken::new();

        let cancellable = engine.get_profile_statistics_cancellable(1, &token).await.unwrap();
        let plain = engine.get_profile_statistics(1).await;
        assert_eq!(cancellable, plain);
        // the caller's token is left untouched
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_works_through_trait_object() {
        let repository: Arc<dyn ProfileRepository> = Arc::new(sample_repository());
        let engine = StatisticsEngine::with_defaults(repository);
        assert_eq!(engine.config(), &EngineConfig::default());
        assert_eq!(engine.config().concurrent_requests, DEFAULT_CONCURRENT_REQUESTS);
        assert_eq!(engine.get_profile_statistics(1).await.total_items, 12);
    }
}
