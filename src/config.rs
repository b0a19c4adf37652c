use std::path::PathBuf;
use std::time::Duration;

/// Engine configuration
///
/// Collaborators hand this in once; everything here maps to a setup screen
/// value on their side (language preference, cache ages, proxy).
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Preferred `Accept-Language` header value (e.g. "de-DE,en;q=0.9")
    pub language: Option<String>,
    /// Proxy URL, applied to all requests unless disabled per call
    pub proxy: Option<String>,
    /// User agent sent upstream
    pub user_agent: String,
    /// Default referer sent upstream
    pub referer: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Cache directory; `None` disables the response cache entirely
    pub cache_dir: Option<PathBuf>,
    /// Maximum age for cached HTML-like responses; zero disables that kind
    pub html_max_age: Duration,
    /// Maximum age for cached image payloads; zero disables that kind
    pub image_max_age: Duration,
    /// Prune expired siblings of a key whenever it is read
    pub cache_pruning: bool,
    /// Degree of parallelism for independent candidate fetches
    pub max_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            language: None,
            proxy: None,
            user_agent: format!("cinedex/{}", env!("CARGO_PKG_VERSION")),
            referer: String::new(),
            timeout: Duration::from_secs(15),
            cache_dir: None,
            html_max_age: Duration::from_secs(7 * 24 * 3600),
            image_max_age: Duration::from_secs(30 * 24 * 3600),
            cache_pruning: false,
            max_concurrency: 4,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n.max(1);
        self
    }
}
