pub mod imdb;

use crate::{
    Result,
    types::{ActorProfile, DetailOutcome, Recommendation, SearchResult},
};
use async_trait::async_trait;
use std::sync::Arc;

/// Declared provider capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Work metadata (search, detail, recommendations)
    Movie,
    /// Cover/portrait image resolution
    Image,
}

/// Filters for recommendation resolution
///
/// A missing threshold means "no filter" on that dimension.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationFilter {
    pub min_rating: Option<f64>,
    pub min_year: Option<i32>,
    /// Suppress repeated identifiers across results for the same query
    pub dedup: bool,
}

impl RecommendationFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_rating(mut self, rating: f64) -> Self {
        self.min_rating = Some(rating);
        self
    }

    pub fn with_min_year(mut self, year: i32) -> Self {
        self.min_year = Some(year);
        self
    }

    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }
}

/// Core trait for metadata providers
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider identifier (e.g. "imdb")
    fn id(&self) -> &'static str;

    /// Human-readable provider name
    fn name(&self) -> &'static str;

    /// Capabilities this provider declares
    fn capabilities(&self) -> &[Capability];

    /// Resolve a free-text query into candidate records, page order
    async fn search(&self, query: &str, alternate_titles: bool) -> Result<Vec<SearchResult>>;

    /// Fetch and normalize the full record for an identifier
    async fn fetch_detail(&self, id: &str) -> Result<DetailOutcome>;

    /// Similar titles meeting the filter, original listing order
    async fn recommendations(
        &self,
        id: &str,
        filter: &RecommendationFilter,
    ) -> Result<Vec<Recommendation>>;

    /// Resolve a person's canonical page and portrait
    async fn resolve_actor(
        &self,
        name: Option<&str>,
        id: Option<&str>,
    ) -> Result<Option<ActorProfile>>;
}

/// Provider registry; selection is a lookup, not inheritance
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider<P: Provider + 'static>(&mut self, provider: P) {
        self.providers.push(Arc::new(provider));
    }

    pub fn providers(&self) -> &[Arc<dyn Provider>] {
        &self.providers
    }

    /// Look up a provider by identifier
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.id() == id)
    }

    /// All providers declaring a capability
    pub fn with_capability(&self, capability: Capability) -> Vec<&Arc<dyn Provider>> {
        self.providers
            .iter()
            .filter(|p| p.capabilities().contains(&capability))
            .collect()
    }
}
