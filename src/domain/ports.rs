use crate::domain::model::{Category, CategoryId, Domain, DomainId, Item, ProfileId};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list_categories(&self, profile_id: ProfileId) -> Result<Vec<Category>>;
}

#[async_trait]
pub trait DomainRepository: Send + Sync {
    async fn list_domains(&self, category_id: CategoryId) -> Result<Vec<Domain>>;
}

#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn list_items(&self, domain_id: DomainId) -> Result<Vec<Item>>;
}

/// Everything the statistics engine reads from.
pub trait ProfileRepository: CategoryRepository + DomainRepository + ItemRepository {}

impl<T> ProfileRepository for T where T: CategoryRepository + DomainRepository + ItemRepository {}

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn api_token(&self) -> Option<&str>;
    fn concurrent_requests(&self) -> usize;
    fn timeout_seconds(&self) -> Option<u64>;
    fn request_timeout_seconds(&self) -> u64;
}
