//! Metadata extraction engine for movie collections.
//!
//! Given a work's external identifier the engine fetches the upstream
//! detail/credits pages, prefers the structured-data blob embedded in the
//! page and falls back to pattern-matching the rendered markup, and
//! produces a normalized [`MetadataRecord`].

mod cache;
mod config;
mod fetch;
mod provider;
mod types;

#[cfg(test)]
mod tests;

pub use cache::{CacheKind, FileCache};
pub use config::EngineConfig;
pub use fetch::{FetchOptions, FetchResponse, HttpClient};
pub use provider::{
    Capability, Provider, ProviderRegistry, RecommendationFilter, imdb::ImdbProvider,
};
pub use types::{
    ActorProfile, CastEntry, DetailOutcome, MetadataRecord, Recommendation, SearchResult,
};

/// Engine result type
pub type Result<T> = std::result::Result<T, Error>;

/// Engine error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned wrong status: {status} Reason: {message}")]
    Status { status: u16, message: String },

    #[error("Upstream error message: {0}")]
    Upstream(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Create a registry with all built-in providers
pub fn create_default_registry(config: EngineConfig) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();
    registry.add_provider(ImdbProvider::new(config)?);
    Ok(registry)
}
