//! Fetch Cache (§4.A): single-host HTTP fetcher with a global rate
//! limit, bounded retry with exponential backoff, and an on-disk cache
//! keyed by an explicit path the caller derives from the URL (the
//! builder lays these out per the cache directory convention in §6:
//! `list/<org>.json`, `raw/<source>/<org>/<pathway-id>.<ext>`).
//!
//! Durable writes are always write-to-temp-then-rename inside the
//! target directory, so a crash mid-fetch never exposes a partial cache
//! entry; cancellation is handled the same way by simply never writing
//! the file in the first place.

use crate::error::{CoreError, Result};
use crate::worker::{CancelledError, NoopMonitor, ProgressMonitor};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(250);
const MAX_ATTEMPTS: u32 = 5;
const MAX_BACKOFF_SECS: u64 = 10;

/// A rate-limited, retrying, cache-backed HTTP fetcher.
///
/// One `FetchCache` holds the single rate-limit clock for a process;
/// share it (behind an `Arc`, if workers run on separate threads)
/// rather than constructing one per request.
pub struct FetchCache {
    client: reqwest::blocking::Client,
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl Default for FetchCache {
    fn default() -> Self {
        Self::with_interval(DEFAULT_MIN_INTERVAL)
    }
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    fn throttle(&self) {
        let mut last = self.last_request.lock().unwrap();
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn get_with_retry(&self, url: &str, monitor: &dyn ProgressMonitor) -> Result<String> {
        let mut last_cause = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            if !monitor.keep_going() {
                return Err(CoreError::Cancelled(CancelledError));
            }
            self.throttle();
            match self.client.get(url).send() {
                Ok(resp) if resp.status().as_u16() == 404 => {
                    return Err(CoreError::NotFound(url.to_string()));
                }
                Ok(resp) if resp.status().is_success() => {
                    return resp.text().map_err(|e| CoreError::FetchExhausted {
                        url: url.to_string(),
                        cause: e.to_string(),
                    });
                }
                Ok(resp) => last_cause = format!("HTTP {}", resp.status()),
                Err(e) => last_cause = e.to_string(),
            }
            if attempt < MAX_ATTEMPTS {
                let backoff = 2u64.saturating_pow(attempt - 1).min(MAX_BACKOFF_SECS);
                std::thread::sleep(Duration::from_secs(backoff));
            }
        }
        Err(CoreError::FetchExhausted {
            url: url.to_string(),
            cause: last_cause,
        })
    }

    fn write_atomic(&self, path: &Path, content: &str) -> Result<()> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).map_err(CoreError::Io)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(CoreError::Io)?;
        tmp.write_all(content.as_bytes()).map_err(CoreError::Io)?;
        tmp.flush().map_err(CoreError::Io)?;
        tmp.persist(path).map_err(|e| CoreError::Io(e.error))?;
        Ok(())
    }

    /// Fetch `url` as text, honoring the on-disk cache at `cache_path`.
    pub fn fetch_text(&self, url: &str, cache_path: &Path, monitor: &dyn ProgressMonitor) -> Result<String> {
        if let Ok(cached) = std::fs::read_to_string(cache_path) {
            tracing::debug!(url, path = %cache_path.display(), "fetch cache hit");
            return Ok(cached);
        }
        tracing::debug!(url, "fetch cache miss");
        let text = self.get_with_retry(url, monitor)?;
        self.write_atomic(cache_path, &text)?;
        Ok(text)
    }

    /// Fetch `url` as text and parse it as JSON.
    pub fn fetch_json(
        &self,
        url: &str,
        cache_path: &Path,
        monitor: &dyn ProgressMonitor,
    ) -> Result<serde_json::Value> {
        let text = self.fetch_text(url, cache_path, monitor)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Convenience wrapper using [`NoopMonitor`] for call sites that
    /// don't need cancellation (tests, simple scripts).
    pub fn fetch_text_uncancellable(&self, url: &str, cache_path: &Path) -> Result<String> {
        self.fetch_text(url, cache_path, &NoopMonitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_hit_avoids_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cached.txt");
        std::fs::write(&path, "already here").unwrap();
        let cache = FetchCache::new();
        let text = cache.fetch_text_uncancellable("http://example.invalid/unused", &path).unwrap();
        assert_eq!(text, "already here");
    }
}
