//! Filmplay Core Library
//!
//! Resolves play intents into directly playable media URLs, parses site
//! episode catalogs and enriches recommendation lists.
//!
//! # Overview
//!
//! - [`PlayEngine`] runs the play resolution chain: `playUrl` template, site
//!   resolver, official-source analyzer, media type classification and
//!   finally the generic sniffer
//! - [`season`] turns raw `vod_play_from` / `vod_play_url` strings into a
//!   per-source [`SeasonIndex`]
//! - [`RecommendationPipeline`] searches recommended titles on a site and
//!   upgrades hits to detail records under a bounded [`WorkerPool`]
//!
//! Rule engines, the sniffer, the proxy subsystem and persistence are
//! external collaborators behind the traits in [`collaborators`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use filmplay_core::{
//!     HttpClient, HttpMediaClassifier, JsonPlayResolver, PlayEngine, PlayIntent,
//!     ResolverRegistry, Result,
//! };
//! # use filmplay_core::collaborators::{ProxyRegistrar, Sniffer};
//! # async fn example(sniffer: Arc<dyn Sniffer>, proxy: Arc<dyn ProxyRegistrar>) -> Result<()> {
//! let client = Arc::new(HttpClient::new()?);
//! let engine = PlayEngine::new(
//!     ResolverRegistry::new(),
//!     JsonPlayResolver::new(client.clone()),
//!     Arc::new(HttpMediaClassifier::new(client)),
//!     sniffer,
//!     proxy,
//! );
//!
//! let intent: PlayIntent = serde_json::from_str(
//!     r#"{"url":"https://v.qq.com/x/cover/abc.html","site":{"type":1},"sourceFlag":"qq"}"#,
//! )?;
//! let outcome = engine.resolve(&intent).await;
//! if outcome.value().is_playable() {
//!     println!("{} ({:?})", outcome.value().url, outcome.value().media_type);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Fail-soft entry points
//!
//! Public operations return an [`Outcome`] instead of an error. A degraded
//! outcome still carries a renderable value (an empty play result, the
//! catalog placeholder entry, an empty list) together with the reason.

mod classifier;
mod client;
pub mod collaborators;
mod error;
mod outcome;
mod play;
mod pool;
mod recommend;
mod resolver;
pub mod season;
pub mod store;
mod types;

#[cfg(test)]
mod testing;

// Re-export client types
pub use client::{ClientConfig, HttpClient};

// Re-export classification
pub use classifier::{HttpMediaClassifier, classify_by_extension, classify_content_type};

// Re-export error types
pub use error::{FilmError, Result};
pub use outcome::Outcome;

// Re-export the play engine
pub use play::{EngineConfig, OFFICIAL_DOMAINS, OfficialPlay, PlayEngine, is_official_url};
pub use resolver::{
    JsonPlayResolver, LOOPBACK_PROXY, RegisteredResolver, ResolverPolicy, ResolverRegistry,
    extract_play_url,
};

// Re-export recommendation pipeline
pub use pool::WorkerPool;
pub use recommend::{RecommendConfig, RecommendationPipeline};

// Re-export season formatters for convenience
pub use season::{
    EpisodeOrder, format_content, format_index, format_name, format_reverse_order, format_season,
    reverse_order_helper,
};

// Re-export data types
pub use types::{
    AnalyzeConfig, AnalyzerProtocol, EpisodeEntry, MediaType, PlayIntent, PlayResult, RawPlay,
    RecommendationItem, SeasonIndex, SiteDescriptor, SiteKind, SnifferConfig, SubjectInfo,
    VodCatalog,
};
