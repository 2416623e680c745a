//! Instrumented collaborator doubles shared by the unit tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::collaborators::{
    CatalogBackend, MediaTypeClassifier, ProxyRegistrar, RecommendationSource, SiteResolver,
    Sniffer,
};
use crate::error::{FilmError, Result};
use crate::types::{MediaType, RawPlay, RecommendationItem, SiteDescriptor, SnifferConfig};

/// Resolver answering with a fixed [`RawPlay`], or failing when `fail` is set
#[derive(Default)]
pub struct StubResolver {
    pub answer: RawPlay,
    pub fail: bool,
    pub proxy_response: Option<serde_json::Value>,
    pub inits: AtomicUsize,
    pub calls: Mutex<Vec<(String, String)>>,
    pub proxied: Mutex<Vec<String>>,
}

impl StubResolver {
    pub fn answering(answer: RawPlay) -> Self {
        Self {
            answer,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SiteResolver for StubResolver {
    async fn init(&self, _site: &SiteDescriptor) -> Result<()> {
        self.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn resolve(&self, _site: &SiteDescriptor, flag: &str, reference: &str) -> Result<RawPlay> {
        self.calls
            .lock()
            .unwrap()
            .push((flag.to_string(), reference.to_string()));
        if self.fail {
            return Err(FilmError::collaborator("stub resolver", "rule error"));
        }
        Ok(self.answer.clone())
    }

    async fn rule_proxy(&self, url: &str) -> Result<serde_json::Value> {
        self.proxied.lock().unwrap().push(url.to_string());
        self.proxy_response
            .clone()
            .ok_or_else(|| FilmError::collaborator("rule proxy", "no response"))
    }
}

/// Classifier with a per-URL answer table; unlisted URLs are `Unknown`
#[derive(Default)]
pub struct StubClassifier {
    pub answers: HashMap<String, MediaType>,
    pub seen: Mutex<Vec<String>>,
}

impl StubClassifier {
    pub fn with(url: &str, media_type: MediaType) -> Self {
        let mut answers = HashMap::new();
        answers.insert(url.to_string(), media_type);
        Self {
            answers,
            ..Self::default()
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaTypeClassifier for StubClassifier {
    async fn classify(&self, url: &str) -> MediaType {
        self.seen.lock().unwrap().push(url.to_string());
        self.answers.get(url).copied().unwrap_or(MediaType::Unknown)
    }
}

/// Sniffer echoing a fixed URL, or failing when `answer` is `None`
#[derive(Default)]
pub struct StubSniffer {
    pub answer: Option<String>,
    pub requests: Mutex<Vec<(String, String)>>,
}

impl StubSniffer {
    pub fn answering(url: &str) -> Self {
        Self {
            answer: Some(url.to_string()),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sniffer for StubSniffer {
    async fn sniff(&self, mode: &SnifferConfig, url: &str) -> Result<String> {
        self.requests
            .lock()
            .unwrap()
            .push((mode.kind.clone(), url.to_string()));
        self.answer
            .clone()
            .ok_or_else(|| FilmError::collaborator("sniffer", "nothing sniffed"))
    }
}

#[derive(Default)]
pub struct StubRegistrar {
    pub registered: Mutex<Vec<serde_json::Value>>,
}

#[async_trait]
impl ProxyRegistrar for StubRegistrar {
    async fn register(&self, proxy_response: serde_json::Value) -> Result<()> {
        self.registered.lock().unwrap().push(proxy_response);
        Ok(())
    }
}

/// Recommendation source returning fixed titles and counting calls
#[derive(Default)]
pub struct StubRecommendations {
    pub titles: Vec<String>,
    pub calls: AtomicUsize,
}

impl StubRecommendations {
    pub fn titles(titles: &[&str]) -> Self {
        Self {
            titles: titles.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl RecommendationSource for StubRecommendations {
    async fn recommend(&self, _external_id: &str, _name: &str, _year: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.titles.clone())
    }
}

/// Catalog backend that records peak concurrency
///
/// Search for title `t` yields one record with id `id-t` unless `t` is in
/// `failing`; detail for an id in `failing_details` fails. Search calls
/// sleep for a duration that shrinks with the call order so completions
/// arrive out of submission order.
#[derive(Default)]
pub struct StubCatalog {
    pub failing: Vec<String>,
    pub failing_details: Vec<String>,
    pub with_pic: bool,
    pub includes_detail: Option<bool>,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub searches: AtomicUsize,
    pub details: Mutex<Vec<String>>,
}

impl StubCatalog {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> Vec<String> {
        self.details.lock().unwrap().clone()
    }

    async fn enter(&self, delay: Duration) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn record(&self, id: &str) -> RecommendationItem {
        RecommendationItem {
            vod_id: id.to_string(),
            vod_name: format!("name {}", id),
            vod_pic: self.with_pic.then(|| format!("https://img/{}.jpg", id)),
            extra: serde_json::Map::new(),
        }
    }
}

#[async_trait]
impl CatalogBackend for StubCatalog {
    async fn search(&self, _site: &SiteDescriptor, title: &str) -> Result<Vec<RecommendationItem>> {
        let order = self.searches.fetch_add(1, Ordering::SeqCst) as u64;
        self.enter(Duration::from_millis(30u64.saturating_sub(order * 2))).await;

        if self.failing.iter().any(|t| t == title) {
            return Err(FilmError::collaborator("search", format!("no hit for {}", title)));
        }
        Ok(vec![self.record(&format!("id-{}", title))])
    }

    async fn detail(&self, _site: &SiteDescriptor, ids: &str) -> Result<Vec<RecommendationItem>> {
        self.details.lock().unwrap().push(ids.to_string());
        self.enter(Duration::from_millis(5)).await;

        if self.failing_details.iter().any(|id| id == ids) {
            return Err(FilmError::collaborator("detail", ids.to_string()));
        }
        Ok(ids
            .split(',')
            .map(|id| RecommendationItem {
                vod_pic: Some(format!("https://img/{}.jpg", id)),
                ..self.record(id)
            })
            .collect())
    }

    fn search_includes_detail(&self, _site: &SiteDescriptor) -> Option<bool> {
        self.includes_detail
    }
}
