use crate::domain::model::{Category, CategoryId, Domain, DomainId, Item, ProfileId};
use crate::domain::ports::{CategoryRepository, ConfigProvider, DomainRepository, ItemRepository};
use crate::utils::error::{Result, StatsError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

const CATEGORIES_PATH: &str = "category/categories/";
const DOMAINS_PATH: &str = "domains/domains/";
const ITEMS_PATH: &str = "items/items/";

/// `{ "message"?, "data"?, "error"? }` wrapper used by every list endpoint.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

/// Repository over the profile REST API.
#[derive(Debug, Clone)]
pub struct HttpRepository {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpRepository {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_options(base_url, None, Duration::from_secs(30))
    }

    pub fn with_options(
        base_url: impl Into<String>,
        token: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(request_timeout).build()?;
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::with_options(
            config.api_base_url(),
            config.api_token().map(str::to_string),
            Duration::from_secs(config.request_timeout_seconds()),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn list<T: DeserializeOwned>(&self, path: &str, param: &str, id: i64) -> Result<Vec<T>> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}?{}={}", url, param, id);

        let mut request = self.client.get(&url).query(&[(param, id)]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.error)
                .unwrap_or_else(|| format!("Error Code: {}", status.as_u16()));
            return Err(StatsError::HttpStatusError {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<Vec<T>> = response.json().await?;
        Ok(envelope.data.unwrap_or_default())
    }
}

#[async_trait]
impl CategoryRepository for HttpRepository {
    async fn list_categories(&self, profile_id: ProfileId) -> Result<Vec<Category>> {
        self.list(CATEGORIES_PATH, "profile_id", profile_id).await
    }
}

#[async_trait]
impl DomainRepository for HttpRepository {
    async fn list_domains(&self, category_id: CategoryId) -> Result<Vec<Domain>> {
        self.list(DOMAINS_PATH, "category_id", category_id).await
    }
}

#[async_trait]
impl ItemRepository for HttpRepository {
    async fn list_items(&self, domain_id: DomainId) -> Result<Vec<Item>> {
        self.list(ITEMS_PATH, "domain_id", domain_id).await
    }
}
