use crate::{
    Error, Result,
    cache::{CacheKind, FileCache},
    config::EngineConfig,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Read from / write through the response cache
    pub use_cache: bool,
    /// Skip the cache read and fetch fresh (the result is still cached)
    pub reload: bool,
    /// URL-encoded POST body; switches the request method to POST
    pub post: Option<String>,
    /// Disable the configured proxy for this call
    pub no_proxy: bool,
    /// Cache kind of the payload
    pub kind: CacheKind,
    /// Override the configured Accept-Language for this call
    pub language: Option<String>,
    /// Override the configured Referer for this call
    pub referer: Option<String>,
}

impl FetchOptions {
    pub fn cached() -> Self {
        Self {
            use_cache: true,
            ..Self::default()
        }
    }

    pub fn with_post(mut self, body: impl Into<String>) -> Self {
        self.post = Some(body.into());
        self
    }

    pub fn with_kind(mut self, kind: CacheKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }
}

/// Response from a fetch, possibly served from the cache
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Body decoded to text
    pub data: String,
    /// Raw body bytes
    pub bytes: Vec<u8>,
    /// Response headers; empty for cache hits
    pub headers: HashMap<String, Vec<String>>,
    /// Character-encoding label of the source document
    pub encoding: String,
    /// Final URL after redirects
    pub source_url: String,
    /// Served from the cache without a network call
    pub cached: bool,
}

/// HTTP client with header policy and cache read/write around the call
pub struct HttpClient {
    client: Client,
    direct: Client,
    config: EngineConfig,
    cache: Option<FileCache>,
}

impl HttpClient {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let direct = Self::build_client(&config, None)?;
        let client = match config.proxy.as_deref() {
            Some(proxy) => Self::build_client(&config, Some(proxy))?,
            None => direct.clone(),
        };

        let cache = config.cache_dir.as_ref().map(|dir| {
            FileCache::new(
                dir,
                config.html_max_age,
                config.image_max_age,
                config.cache_pruning,
            )
        });

        Ok(Self {
            client,
            direct,
            config,
            cache,
        })
    }

    fn build_client(config: &EngineConfig, proxy: Option<&str>) -> Result<Client> {
        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout);

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| Error::Config(format!("Invalid proxy: {e}")))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))
    }

    /// Fetch a URL with the engine's header policy
    ///
    /// Transport failures, non-OK statuses and upstream-embedded error
    /// payloads all surface as `Err`; callers decide whether to abort or
    /// degrade. Failed fetches are never cached.
    pub async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<FetchResponse> {
        let body = options.post.as_deref().unwrap_or("");

        if options.use_cache
            && !options.reload
            && let Some(cache) = &self.cache
            && let Some(raw) = cache.get(url, body, options.kind)
        {
            // entries that fail to decode are refetched, not fatal
            if let Some((meta, bytes)) = decode_entry(&raw) {
                debug!("Cache hit: {url}");
                return Ok(FetchResponse {
                    data: String::from_utf8_lossy(&bytes).into_owned(),
                    bytes,
                    headers: HashMap::new(),
                    encoding: meta.encoding,
                    source_url: meta.source_url,
                    cached: true,
                });
            }
            debug!("Discarding undecodable cache entry: {url}");
        }

        let client = if options.no_proxy {
            &self.direct
        } else {
            &self.client
        };

        let mut request = match options.post.as_deref() {
            Some(post) => client
                .post(url)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(post.to_string()),
            None => client.get(url),
        };

        request = request.header("Accept", DEFAULT_ACCEPT).header("DNT", "1");

        if let Some(lang) = options.language.as_deref().or(self.config.language.as_deref()) {
            request = request.header("Accept-Language", lang);
        }

        let referer = options
            .referer
            .as_deref()
            .unwrap_or(self.config.referer.as_str());
        if !referer.is_empty() {
            request = request.header("Referer", referer);
        }

        let response = request.send().await?;

        let status = response.status();
        let source_url = response.url().to_string();
        let headers = header_map(response.headers());
        let encoding = encoding_from_headers(&headers);
        let bytes = response.bytes().await?.to_vec();
        let data = String::from_utf8_lossy(&bytes).into_owned();

        if status != reqwest::StatusCode::OK {
            return Err(Error::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        if let Some(message) = upstream_error(&data) {
            return Err(Error::Upstream(message));
        }

        if options.use_cache && let Some(cache) = &self.cache {
            let meta = CacheEnvelope {
                source_url: source_url.clone(),
                encoding: encoding.clone(),
            };
            cache.put(url, body, options.kind, &encode_entry(&meta, &bytes));
        }

        Ok(FetchResponse {
            data,
            bytes,
            headers,
            encoding,
            source_url,
            cached: false,
        })
    }

    /// Download a URL to the given local file
    pub async fn download(&self, url: &str, output_path: &Path) -> Result<()> {
        let options = FetchOptions::cached().with_kind(CacheKind::Image);
        let response = self.fetch(url, &options).await?;

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(output_path).await?;
        file.write_all(&response.bytes).await?;

        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&FileCache> {
        self.cache.as_ref()
    }
}

/// Response envelope stored beside the body so a cache hit restores the
/// redirect target and charset label, not just the bytes
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    source_url: String,
    encoding: String,
}

/// One JSON meta line, a newline, then the raw body bytes
fn encode_entry(meta: &CacheEnvelope, bytes: &[u8]) -> Vec<u8> {
    let mut entry = serde_json::to_vec(meta).unwrap_or_default();
    entry.push(b'\n');
    entry.extend_from_slice(bytes);
    entry
}

fn decode_entry(raw: &[u8]) -> Option<(CacheEnvelope, Vec<u8>)> {
    let split = raw.iter().position(|&b| b == b'\n')?;
    let meta = serde_json::from_slice(&raw[..split]).ok()?;
    Some((meta, raw[split + 1..].to_vec()))
}

fn header_map(headers: &reqwest::header::HeaderMap) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        if let Ok(value) = value.to_str() {
            map.entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
    }
    map
}

/// Extract the charset label from the Content-Type header, UTF-8 otherwise
fn encoding_from_headers(headers: &HashMap<String, Vec<String>>) -> String {
    headers
        .get("content-type")
        .and_then(|values| values.first())
        .and_then(|value| charset_param(value))
        .unwrap_or_else(|| "utf-8".to_string())
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("charset="))
        .map(|charset| charset.trim_matches('"').to_lowercase())
}

/// Some upstreams answer 200 with an error payload; treat that as a failure
fn upstream_error(data: &str) -> Option<String> {
    let trimmed = data.trim_start();
    if !trimmed.starts_with('{') {
        return None;
    }

    let json: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    match json.get("errorMessage") {
        Some(serde_json::Value::String(message)) if !message.is_empty() => Some(message.clone()),
        _ => None,
    }
}
