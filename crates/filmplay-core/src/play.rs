//! Play resolution engine
//!
//! Turns a [`PlayIntent`] into a [`PlayResult`] through a fixed chain:
//!
//! 1. `playUrl` template via the JSON resolver (skips steps 2 and 3)
//! 2. the site resolver registered for the site type, falling back to the
//!    original reference when it yields nothing
//! 3. official-source rewriting through the configured analyzer
//! 4. media type classification; a conclusive type ends the chain
//! 5. generic sniffing as the terminal fallback
//!
//! Stages run strictly in order. Failures inside steps 1-3 are absorbed and
//! only narrow the candidate; a failure in step 5 degrades the whole result.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::collaborators::{MediaTypeClassifier, ProxyRegistrar, Sniffer};
use crate::error::{FilmError, Result};
use crate::outcome::Outcome;
use crate::resolver::{JsonPlayResolver, LOOPBACK_PROXY, RegisteredResolver, ResolverRegistry};
use crate::types::{
    AnalyzeConfig, AnalyzerProtocol, MediaType, PlayIntent, PlayResult, SnifferConfig,
};

/// Hosts of licensed providers whose pages go through the analyzer
pub const OFFICIAL_DOMAINS: &[&str] = &[
    "iqiyi.com",
    "iq.com",
    "mgtv.com",
    "qq.com",
    "youku.com",
    "le.com",
    "sohu.com",
    "pptv.com",
    "bilibili.com",
    "tudou.com",
];

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound for each collaborator call; `None` waits forever
    pub call_timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: Some(60),
        }
    }
}

/// Result of the official-source step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficialPlay {
    pub url: String,
    pub is_official: bool,
}

/// Whether `url` is an absolute http(s) URL on a licensed provider's host
pub fn is_official_url(url: &str) -> bool {
    if !url.starts_with("http") {
        return false;
    }
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .is_some_and(|host| OFFICIAL_DOMAINS.iter().any(|domain| host.contains(domain)))
}

/// Working state carried between stages
#[derive(Default)]
struct Candidate {
    url: String,
    script: String,
    extra: String,
    parse: bool,
    is_official: bool,
}

/// Orchestrates resolvers, analyzer, classifier and sniffer
pub struct PlayEngine {
    registry: ResolverRegistry,
    json: JsonPlayResolver,
    classifier: Arc<dyn MediaTypeClassifier>,
    sniffer: Arc<dyn Sniffer>,
    proxy: Arc<dyn ProxyRegistrar>,
    config: EngineConfig,
}

impl PlayEngine {
    pub fn new(
        registry: ResolverRegistry,
        json: JsonPlayResolver,
        classifier: Arc<dyn MediaTypeClassifier>,
        sniffer: Arc<dyn Sniffer>,
        proxy: Arc<dyn ProxyRegistrar>,
    ) -> Self {
        Self {
            registry,
            json,
            classifier,
            sniffer,
            proxy,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve a play intent into a playable URL and media type
    ///
    /// Never fails: when the chain cannot produce a URL, the result is
    /// degraded to an empty [`PlayResult`] whose `media_type` is `None`.
    #[instrument(skip_all, fields(site = %intent.site.key, url = %intent.url))]
    pub async fn resolve(&self, intent: &PlayIntent) -> Outcome<PlayResult> {
        match self.try_resolve(intent).await {
            Ok(result) => {
                info!(url = %result.url, media_type = ?result.media_type, official = result.is_official, "play resolved");
                Outcome::complete(result)
            }
            Err(e) => {
                error!(error = %e, "play resolution failed");
                Outcome::degraded(PlayResult::default(), e.to_string())
            }
        }
    }

    async fn try_resolve(&self, intent: &PlayIntent) -> Result<PlayResult> {
        let candidate = match intent.site.play_template() {
            Some(template) => Candidate {
                url: self.json_play(template, &intent.url).await,
                ..Candidate::default()
            },
            None => {
                let mut candidate = self.site_play(intent).await;
                if candidate.url.is_empty() {
                    candidate.url = intent.url.clone();
                }

                if let Some(analyze) = intent.analyze.as_ref().filter(|a| a.is_configured()) {
                    let official = self
                        .official_play(&candidate.url, analyze, &intent.sniffer_mode, &intent.source_flag)
                        .await?;
                    candidate.url = official.url;
                    candidate.is_official = official.is_official;
                }
                candidate
            }
        };
        debug!(
            url = %candidate.url,
            parse = candidate.parse,
            official = candidate.is_official,
            "candidate before classification"
        );

        if !candidate.url.is_empty() {
            let media_type = self
                .within("media classifier", async {
                    Ok::<_, FilmError>(self.classifier.classify(&candidate.url).await)
                })
                .await
                .unwrap_or(MediaType::Error);

            if media_type.is_conclusive() {
                return Ok(PlayResult {
                    url: candidate.url,
                    media_type: Some(media_type),
                    is_official: candidate.is_official,
                });
            }
            debug!(%media_type, "classification inconclusive");
        }

        info!("falling back to sniffer");
        let prefix = intent.sniffer_mode.endpoint_prefix()?;
        let sniff_url = format!(
            "{}?url={}&script={}{}",
            prefix, candidate.url, candidate.script, candidate.extra
        );
        let url = self
            .within("sniffer", self.sniffer.sniff(&intent.sniffer_mode, &sniff_url))
            .await?;
        if url.is_empty() {
            return Err(FilmError::NotFound(format!("sniffer found no stream in {}", sniff_url)));
        }

        Ok(PlayResult {
            url,
            media_type: Some(MediaType::M3u8),
            is_official: false,
        })
    }

    /// Official-source sub-resolver
    ///
    /// A URL is official when its host is in [`OFFICIAL_DOMAINS`] or one of the
    /// analyzer flags occurs in `source_flag`. Only official URLs with a
    /// configured analyzer are rewritten; an empty analyzer answer keeps `url`.
    ///
    /// # Errors
    /// Returns `InvalidUrl` if a web analyzer needs a malformed custom sniffer URL
    pub async fn official_play(
        &self,
        url: &str,
        analyze: &AnalyzeConfig,
        sniffer: &SnifferConfig,
        source_flag: &str,
    ) -> Result<OfficialPlay> {
        let is_official = is_official_url(url) || analyze.matches_flag(source_flag);
        if !is_official || !analyze.is_configured() {
            return Ok(OfficialPlay {
                url: url.to_string(),
                is_official,
            });
        }

        let resolved = match analyze.protocol() {
            Ok(AnalyzerProtocol::Json) => self.json_play(&analyze.url, url).await,
            Ok(AnalyzerProtocol::Web) => {
                let prefix = sniffer.endpoint_prefix()?;
                let page = format!("{}?url={}{}", prefix, analyze.url, url);
                self.web_play(sniffer, &page).await
            }
            Err(e) => {
                warn!(error = %e, "analyzer skipped, keeping url");
                String::new()
            }
        };

        Ok(OfficialPlay {
            url: if resolved.is_empty() { url.to_string() } else { resolved },
            is_official,
        })
    }

    async fn site_play(&self, intent: &PlayIntent) -> Candidate {
        let Some(entry) = self.registry.get(intent.site.kind) else {
            debug!(kind = ?intent.site.kind, "no site resolver registered");
            return Candidate::default();
        };

        match self.run_site_resolver(entry, intent).await {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(kind = ?intent.site.kind, error = %e, "site resolver failed, using original url");
                Candidate::default()
            }
        }
    }

    async fn run_site_resolver(&self, entry: &RegisteredResolver, intent: &PlayIntent) -> Result<Candidate> {
        let policy = entry.policy;
        let resolver = &entry.resolver;

        if policy.requires_init {
            self.within("rule init", resolver.init(&intent.site)).await?;
        }

        let raw = self
            .within(
                "site resolver",
                resolver.resolve(&intent.site, &intent.source_flag, &intent.url),
            )
            .await?;

        if policy.loopback_proxy && raw.parse == Some(0) && raw.url.contains(LOOPBACK_PROXY) {
            info!(url = %raw.url, "registering loopback proxy");
            let response = self.within("rule proxy", resolver.rule_proxy(&raw.url)).await?;
            self.within("proxy registrar", self.proxy.register(response)).await?;
        }

        if policy.requires_redirect && !raw.redirect {
            debug!("resolver did not redirect, url discarded");
            return Ok(Candidate::default());
        }

        let mut candidate = Candidate {
            url: raw.url,
            ..Candidate::default()
        };
        if policy.captures_companion {
            candidate.script = raw
                .js
                .filter(|js| !js.is_empty())
                .map(|js| BASE64.encode(js.as_bytes()))
                .unwrap_or_default();
            candidate.extra = raw.parse_extra.unwrap_or_default();
            candidate.parse = raw.parse.unwrap_or(0) != 0;
        }
        Ok(candidate)
    }

    async fn json_play(&self, template: &str, reference: &str) -> String {
        match self.within("json resolver", self.json.resolve(template, reference)).await {
            Ok(url) => url,
            Err(e) => {
                warn!(template, error = %e, "json resolver failed");
                String::new()
            }
        }
    }

    async fn web_play(&self, sniffer: &SnifferConfig, page: &str) -> String {
        match self.within("web analyzer", self.sniffer.sniff(sniffer, page)).await {
            Ok(url) => url,
            Err(e) => {
                warn!(page, error = %e, "web analyzer failed");
                String::new()
            }
        }
    }

    async fn within<T>(&self, stage: &'static str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.call_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), call)
                .await
                .map_err(|_| FilmError::Timeout { stage, secs })?,
            None => call.await,
        }
    }
}
