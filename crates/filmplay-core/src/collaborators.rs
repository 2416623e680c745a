//! Contracts for the external collaborators the core drives
//!
//! Rule engines, the sniffer, the proxy subsystem and the stores live outside
//! this crate. The engine and pipelines only see these traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{FilmError, Result};
use crate::types::{MediaType, RawPlay, RecommendationItem, SiteDescriptor, SnifferConfig};

/// Per-site-type adapter turning an episode reference into a raw play URL
#[async_trait]
pub trait SiteResolver: Send + Sync {
    /// Prepare the rule context for `site`
    async fn init(&self, _site: &SiteDescriptor) -> Result<()> {
        Ok(())
    }

    /// Resolve `reference` for the source line `flag`
    async fn resolve(&self, site: &SiteDescriptor, flag: &str, reference: &str) -> Result<RawPlay>;

    /// Fetch the rule-engine proxy response behind a loopback proxy URL
    async fn rule_proxy(&self, url: &str) -> Result<serde_json::Value> {
        Err(FilmError::collaborator(
            "rule proxy",
            format!("resolver has no proxy support for {}", url),
        ))
    }
}

/// Decides whether a URL is a directly playable stream
#[async_trait]
pub trait MediaTypeClassifier: Send + Sync {
    async fn classify(&self, url: &str) -> MediaType;
}

/// Last-resort page inspection returning a playable stream URL
#[async_trait]
pub trait Sniffer: Send + Sync {
    async fn sniff(&self, mode: &SnifferConfig, url: &str) -> Result<String>;
}

/// Accepts rule-engine proxy responses for the local proxy server
#[async_trait]
pub trait ProxyRegistrar: Send + Sync {
    async fn register(&self, proxy_response: serde_json::Value) -> Result<()>;
}

/// External source of recommended titles for a subject
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn recommend(&self, external_id: &str, name: &str, year: &str) -> Result<Vec<String>>;
}

/// Site search and detail endpoints
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn search(&self, site: &SiteDescriptor, title: &str) -> Result<Vec<RecommendationItem>>;

    /// Detail lookup for one id or a comma-joined id list
    async fn detail(&self, site: &SiteDescriptor, ids: &str) -> Result<Vec<RecommendationItem>>;

    /// Whether search already returns detail-grade records
    ///
    /// `None` lets the pipeline probe the first record for `vod_pic`.
    fn search_includes_detail(&self, _site: &SiteDescriptor) -> Option<bool> {
        None
    }
}

/// A watch-history record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: Option<String>,
    pub date: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub relate_id: String,
    pub site_source: String,
    pub play_end: bool,
    pub video_id: String,
    pub video_image: String,
    pub video_name: String,
    pub video_index: String,
    pub watch_time: f64,
    pub duration: Option<f64>,
    pub skip_time_in_start: u32,
    pub skip_time_in_end: u32,
}

impl Default for HistoryRecord {
    fn default() -> Self {
        Self {
            id: None,
            date: 1715018234,
            kind: "film".to_string(),
            relate_id: String::new(),
            site_source: String::new(),
            play_end: false,
            video_id: String::new(),
            video_image: String::new(),
            video_name: String::new(),
            video_index: String::new(),
            watch_time: 0.0,
            duration: None,
            skip_time_in_start: 30,
            skip_time_in_end: 30,
        }
    }
}

/// Watch-history persistence
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn get(&self, relate_id: &str, video_id: &str) -> Result<Option<HistoryRecord>>;
    async fn add(&self, doc: &HistoryRecord) -> Result<HistoryRecord>;
    async fn update(&self, id: &str, doc: &HistoryRecord) -> Result<HistoryRecord>;
}

/// Favorites ("binge") persistence; records are opaque JSON documents
#[async_trait]
pub trait FavoritesStore: Send + Sync {
    async fn get(&self, relate_id: &str, video_id: &str) -> Result<Option<serde_json::Value>>;
    async fn add(&self, doc: &serde_json::Value) -> Result<serde_json::Value>;
    async fn update(&self, id: &str, doc: &serde_json::Value) -> Result<serde_json::Value>;
    async fn delete(&self, id: &str) -> Result<serde_json::Value>;
}

/// Stored analyzer settings, as returned by [`AnalyzeStore::load`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeSettings {
    /// Default analyzer record
    #[serde(default)]
    pub default: serde_json::Value,
    /// Source flags considered official
    #[serde(default)]
    pub flag: Vec<String>,
    /// Enabled analyzers
    #[serde(default)]
    pub active: Vec<serde_json::Value>,
}

#[async_trait]
pub trait AnalyzeStore: Send + Sync {
    async fn load(&self) -> Result<AnalyzeSettings>;
}
