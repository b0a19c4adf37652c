use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Payload kind stored in the cache
///
/// HTML-like responses and binary images expire independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheKind {
    #[default]
    Html,
    Image,
}

impl CacheKind {
    fn dir(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Image => "img",
        }
    }
}

/// Content-addressable response cache on disk
///
/// Keys are derived from the full request signature (URL plus any POST
/// body) so distinct query parameters never collide. Entries are immutable
/// once written; concurrent writers to the same key may race and the last
/// writer wins.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    html_max_age: Duration,
    image_max_age: Duration,
    pruning: bool,
}

impl FileCache {
    pub fn new(
        root: impl Into<PathBuf>,
        html_max_age: Duration,
        image_max_age: Duration,
        pruning: bool,
    ) -> Self {
        Self {
            root: root.into(),
            html_max_age,
            image_max_age,
            pruning,
        }
    }

    /// Stable cache key for a request signature
    #[must_use]
    pub fn key(url: &str, body: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hasher.update(body.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn max_age(&self, kind: CacheKind) -> Duration {
        match kind {
            CacheKind::Html => self.html_max_age,
            CacheKind::Image => self.image_max_age,
        }
    }

    fn entry_path(&self, url: &str, body: &str, kind: CacheKind) -> PathBuf {
        let key = Self::key(url, body);
        self.root.join(kind.dir()).join(&key[..2]).join(key)
    }

    /// Read an entry, missing when expired or when the kind is disabled
    pub fn get(&self, url: &str, body: &str, kind: CacheKind) -> Option<Vec<u8>> {
        let max_age = self.max_age(kind);
        if max_age.is_zero() {
            return None;
        }

        let path = self.entry_path(url, body, kind);

        if self.pruning
            && let Some(dir) = path.parent()
        {
            prune_folder(dir, max_age);
        }

        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        if entry_age(modified) > max_age {
            debug!("Cache entry expired: {}", path.display());
            return None;
        }

        fs::read(&path).ok()
    }

    /// Write an entry, a no-op when the kind is disabled
    pub fn put(&self, url: &str, body: &str, kind: CacheKind, data: &[u8]) {
        if self.max_age(kind).is_zero() {
            return;
        }

        let path = self.entry_path(url, body, kind);
        let result = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::write(&path, data));

        if let Err(e) = result {
            warn!("Failed to write cache entry {}: {}", path.display(), e);
        }
    }

    /// Remove all entries of a kind older than its max age
    ///
    /// Deletion is best-effort; failures are logged and swallowed.
    pub fn prune(&self, kind: CacheKind) {
        let max_age = self.max_age(kind);
        let kind_root = self.root.join(kind.dir());
        let Ok(buckets) = fs::read_dir(&kind_root) else {
            return;
        };

        for bucket in buckets.flatten() {
            prune_folder(&bucket.path(), max_age);
        }
    }
}

fn entry_age(modified: SystemTime) -> Duration {
    SystemTime::now()
        .duration_since(modified)
        .unwrap_or_default()
}

fn prune_folder(dir: &Path, max_age: Duration) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let expired = entry
            .metadata()
            .and_then(|m| m.modified())
            .map(|t| entry_age(t) > max_age)
            .unwrap_or(false);

        if expired && let Err(e) = fs::remove_file(entry.path()) {
            warn!("Failed to prune {}: {}", entry.path().display(), e);
        }
    }
}
