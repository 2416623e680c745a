//! Recommendation enrichment pipeline
//!
//! Fetches recommended titles for a subject, looks each one up on the
//! current site and upgrades search hits to detail records. Every search and
//! detail call goes through one owned [`WorkerPool`], so the whole batch never
//! has more than `concurrency` calls outstanding against the site.

use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::collaborators::{CatalogBackend, RecommendationSource};
use crate::error::Result;
use crate::outcome::Outcome;
use crate::pool::{DEFAULT_CONCURRENCY, WorkerPool};
use crate::resolver::ResolverRegistry;
use crate::types::{RecommendationItem, SiteDescriptor, SiteKind, SubjectInfo};

/// Pipeline settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RecommendConfig {
    /// Maximum concurrent search/detail calls (default: 5)
    pub concurrency: usize,
    /// Maximum number of returned items (default: 10)
    pub max_results: usize,
    /// Site types whose detail API accepts a comma-joined id list
    pub batch_detail_kinds: Vec<SiteKind>,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_results: 10,
            batch_detail_kinds: vec![SiteKind::CmsXml, SiteKind::CmsJson],
        }
    }
}

/// Search-and-enrich pipeline for recommended titles
pub struct RecommendationPipeline {
    source: Arc<dyn RecommendationSource>,
    catalog: Arc<dyn CatalogBackend>,
    registry: ResolverRegistry,
    pool: WorkerPool,
    config: RecommendConfig,
}

impl RecommendationPipeline {
    /// Create a pipeline owning a pool sized by `config.concurrency`
    pub fn new(
        source: Arc<dyn RecommendationSource>,
        catalog: Arc<dyn CatalogBackend>,
        registry: ResolverRegistry,
        config: RecommendConfig,
    ) -> Self {
        Self {
            source,
            catalog,
            registry,
            pool: WorkerPool::new(config.concurrency),
            config,
        }
    }

    /// Replace the owned pool, e.g. to share one bound between pipelines
    pub fn with_pool(mut self, pool: WorkerPool) -> Self {
        self.pool = pool;
        self
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Build at most `max_results` recommendation records for `info`
    ///
    /// Sites with search disabled get an empty list without any backend call.
    /// Individual search or detail failures only drop that item; a failure
    /// of the recommendation source or rule init degrades to an empty list.
    #[instrument(skip_all, fields(site = %site.key, subject = %info.vod_name))]
    pub async fn enrich(&self, site: &SiteDescriptor, info: &SubjectInfo) -> Outcome<Vec<RecommendationItem>> {
        if !site.supports_search() {
            debug!("site search disabled, skipping recommendations");
            return Outcome::complete(Vec::new());
        }

        match self.try_enrich(site, info).await {
            Ok(items) => {
                info!(count = items.len(), "recommendations enriched");
                Outcome::complete(items)
            }
            Err(e) => {
                warn!(error = %e, "recommendation enrichment failed");
                Outcome::degraded(Vec::new(), e.to_string())
            }
        }
    }

    async fn try_enrich(&self, site: &SiteDescriptor, info: &SubjectInfo) -> Result<Vec<RecommendationItem>> {
        let titles = self
            .source
            .recommend(&info.vod_douban_id, &info.vod_name, &info.vod_year)
            .await?;
        debug!(titles = titles.len(), "recommended titles fetched");

        if let Some(resolver) = self.registry.init_target(site.kind) {
            resolver.init(site).await?;
        }

        let searches = titles
            .iter()
            .map(|title| self.pool.run(self.search_one(site, title)));
        let mut items: Vec<RecommendationItem> = join_all(searches)
            .await
            .into_iter()
            .flatten()
            .take(self.config.max_results)
            .collect();

        let needs_detail = match items.first() {
            Some(first) => !self
                .catalog
                .search_includes_detail(site)
                .unwrap_or(first.vod_pic.is_some()),
            None => false,
        };

        if needs_detail {
            items = if self.config.batch_detail_kinds.contains(&site.kind) {
                self.batch_detail(site, items).await
            } else {
                let details = items
                    .iter()
                    .map(|item| self.pool.run(self.detail_one(site, &item.vod_id)));
                join_all(details).await.into_iter().flatten().collect()
            };
        }

        items.truncate(self.config.max_results);
        Ok(items)
    }

    async fn search_one(&self, site: &SiteDescriptor, title: &str) -> Option<RecommendationItem> {
        match self.catalog.search(site, title).await {
            Ok(results) => results.into_iter().next(),
            Err(e) => {
                warn!(title, error = %e, "recommendation search failed");
                None
            }
        }
    }

    async fn detail_one(&self, site: &SiteDescriptor, id: &str) -> Option<RecommendationItem> {
        match self.catalog.detail(site, id).await {
            Ok(results) => results.into_iter().next(),
            Err(e) => {
                warn!(id, error = %e, "recommendation detail failed");
                None
            }
        }
    }

    /// One combined detail call; search hits are kept if it fails
    async fn batch_detail(&self, site: &SiteDescriptor, items: Vec<RecommendationItem>) -> Vec<RecommendationItem> {
        let ids = items
            .iter()
            .map(|item| item.vod_id.as_str())
            .collect::<Vec<_>>()
            .join(",");

        match self.pool.run(self.catalog.detail(site, &ids)).await {
            Ok(details) => details,
            Err(e) => {
                warn!(ids, error = %e, "batch detail failed, keeping search results");
                items
            }
        }
    }
}
