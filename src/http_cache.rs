use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result, status_hint};
use crate::fingerprint::fingerprint;

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "panel_pitch";
const CACHE_FILE: &str = "fetch_cache.json";
pub const AUTH_HEADER: &str = "X-Auth-Token";
/// How much of an error body is kept in the reported message.
const ERROR_BODY_LIMIT: usize = 200;

static CACHE: Mutex<Option<FetchCache>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    fetched_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

/// Successful response bodies keyed by request fingerprint, valid for a fixed TTL.
#[derive(Debug, Default)]
pub struct FetchCache {
    path: Option<PathBuf>,
    entries: HashMap<String, CacheEntry>,
}

impl FetchCache {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the on-disk cache. An unreadable or outdated file starts empty.
    pub fn open(path: Option<PathBuf>) -> Self {
        let entries = path
            .as_ref()
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|raw| serde_json::from_str::<CacheFile>(&raw).ok())
            .filter(|file| file.version == CACHE_VERSION)
            .map(|file| file.entries)
            .unwrap_or_default();
        Self { path, entries }
    }

    pub fn get_fresh(&self, key: &str, ttl: Duration, now: u64) -> Option<&str> {
        let entry = self.entries.get(key)?;
        let age = now.saturating_sub(entry.fetched_at);
        (age < ttl.as_secs()).then_some(entry.body.as_str())
    }

    pub fn insert(&mut self, key: String, body: String, now: u64) {
        self.entries.insert(
            key,
            CacheEntry {
                body,
                fetched_at: now,
            },
        );
    }

    /// Drops entries older than `ttl`.
    pub fn prune(&mut self, ttl: Duration, now: u64) {
        self.entries
            .retain(|_, e| now.saturating_sub(e.fetched_at) < ttl.as_secs());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn save(&self) -> anyhow::Result<()> {
        use anyhow::Context;

        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).ok();
        }
        let file = CacheFile {
            version: CACHE_VERSION,
            entries: self.entries.clone(),
        };
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string(&file).context("serialize fetch cache")?;
        fs::write(&tmp, json).context("write fetch cache")?;
        fs::rename(&tmp, path).context("swap fetch cache")?;
        Ok(())
    }
}

/// Cache key for a request. The key is never stored in clear text.
pub fn request_key(url: &str, api_key: &str) -> String {
    fingerprint([url, api_key])
}

/// GETs `url` with the API token, serving a cached body while it is younger than `ttl`.
pub fn fetch_json_cached(client: &Client, url: &str, api_key: &str, ttl: Duration) -> Result<String> {
    let key = request_key(url, api_key);
    let now = now_secs();
    {
        let mut guard = lock_cache();
        let cache = guard.get_or_insert_with(|| FetchCache::open(cache_path()));
        if let Some(body) = cache.get_fresh(&key, ttl, now) {
            log::debug!("fetch cache hit: {url}");
            return Ok(body.to_string());
        }
    }

    log::info!("GET {url}");
    let resp = client
        .get(url)
        .header(AUTH_HEADER, api_key)
        .send()
        .map_err(|e| AnalysisError::RemoteFetch {
            status: e.status().map(|s| s.as_u16()),
            message: format!("request failed: {e}"),
            hint: None,
        })?;
    let status = resp.status().as_u16();
    let body = resp.text().map_err(|e| AnalysisError::RemoteFetch {
        status: Some(status),
        message: format!("failed reading body: {e}"),
        hint: None,
    })?;

    let mut guard = lock_cache();
    let cache = guard.get_or_insert_with(|| FetchCache::open(cache_path()));
    let body = store_response(cache, key, status, body, ttl, now)?;
    if let Err(err) = cache.save() {
        log::warn!("fetch cache not persisted: {err:#}");
    }
    Ok(body)
}

/// Turns a received response into a body or a `RemoteFetch` error.
/// Only 2xx bodies enter the cache.
fn store_response(
    cache: &mut FetchCache,
    key: String,
    status: u16,
    body: String,
    ttl: Duration,
    now: u64,
) -> Result<String> {
    if !(200..300).contains(&status) {
        return Err(AnalysisError::RemoteFetch {
            status: Some(status),
            message: truncate(&body, ERROR_BODY_LIMIT),
            hint: status_hint(status),
        });
    }
    cache.prune(ttl, now);
    cache.insert(key, body.clone(), now);
    Ok(body)
}

fn lock_cache() -> std::sync::MutexGuard<'static, Option<FetchCache>> {
    CACHE.lock().unwrap_or_else(|e| e.into_inner())
}

fn truncate(body: &str, limit: usize) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn cache_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_FILE))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
