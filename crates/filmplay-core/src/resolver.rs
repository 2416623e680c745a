//! Site resolver lookup table and the generic JSON play resolver
//!
//! Behaviour that differs between site types (redirect gating, companion
//! scripts, rule-context init, loopback proxy) is data on [`ResolverPolicy`],
//! so the play engine never branches on the site type itself.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::client::HttpClient;
use crate::collaborators::SiteResolver;
use crate::error::Result;
use crate::types::SiteKind;

/// Loopback address of the local rule-engine proxy
pub const LOOPBACK_PROXY: &str = "http://127.0.0.1:9978/proxy";

/// How the play engine treats a resolver's answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverPolicy {
    /// Run [`SiteResolver::init`] before resolving or searching
    pub requires_init: bool,
    /// Accept the URL only when the resolver reports `redirect`
    pub requires_redirect: bool,
    /// Keep the companion script, `parse_extra` and `parse` flag
    pub captures_companion: bool,
    /// Forward loopback proxy URLs with `parse == 0` to the proxy registrar
    pub loopback_proxy: bool,
}

impl ResolverPolicy {
    pub fn drpy() -> Self {
        Self {
            requires_redirect: true,
            ..Self::default()
        }
    }

    pub fn hipy() -> Self {
        Self {
            captures_companion: true,
            ..Self::default()
        }
    }

    pub fn t3() -> Self {
        Self {
            requires_init: true,
            captures_companion: true,
            loopback_proxy: true,
            ..Self::default()
        }
    }

    pub fn catvod() -> Self {
        Self {
            requires_init: true,
            ..Self::default()
        }
    }

    /// Built-in policy for a site type, if it has a rule-engine resolver
    pub fn for_kind(kind: SiteKind) -> Option<Self> {
        match kind {
            SiteKind::Drpy => Some(Self::drpy()),
            SiteKind::Hipy => Some(Self::hipy()),
            SiteKind::T3 => Some(Self::t3()),
            SiteKind::Catvod => Some(Self::catvod()),
            _ => None,
        }
    }
}

/// A registered resolver together with its policy
#[derive(Clone)]
pub struct RegisteredResolver {
    pub policy: ResolverPolicy,
    pub resolver: Arc<dyn SiteResolver>,
}

/// Lookup table from site type to resolver
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    entries: HashMap<SiteKind, RegisteredResolver>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `resolver` under the built-in policy for `kind`
    ///
    /// Kinds without a built-in policy get the default one (URL accepted as is).
    pub fn register(&mut self, kind: SiteKind, resolver: Arc<dyn SiteResolver>) -> &mut Self {
        let policy = ResolverPolicy::for_kind(kind).unwrap_or_default();
        self.register_with_policy(kind, policy, resolver)
    }

    pub fn register_with_policy(
        &mut self,
        kind: SiteKind,
        policy: ResolverPolicy,
        resolver: Arc<dyn SiteResolver>,
    ) -> &mut Self {
        info!(?kind, ?policy, "registering site resolver");
        self.entries.insert(kind, RegisteredResolver { policy, resolver });
        self
    }

    pub fn get(&self, kind: SiteKind) -> Option<&RegisteredResolver> {
        self.entries.get(&kind)
    }

    /// Resolver whose rule context must be initialized for `kind`
    pub fn init_target(&self, kind: SiteKind) -> Option<&Arc<dyn SiteResolver>> {
        self.entries
            .get(&kind)
            .filter(|entry| entry.policy.requires_init)
            .map(|entry| &entry.resolver)
    }
}

/// Resolves `template + reference` against a JSON endpoint
pub struct JsonPlayResolver {
    client: Arc<HttpClient>,
}

impl JsonPlayResolver {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Request `template` with `reference` appended and extract the play URL
    ///
    /// # Returns
    /// The URL found in `url` or `data.url`, or an empty string when the
    /// body carries neither
    ///
    /// # Errors
    /// - `HttpError` / `NotFound` / `RateLimited` - request failed
    /// - `JsonError` - body is not JSON
    pub async fn resolve(&self, template: &str, reference: &str) -> Result<String> {
        let endpoint = format!("{}{}", template, reference);
        debug!(endpoint, "json play request");

        let body = self.client.fetch_json(&endpoint).await?;
        Ok(extract_play_url(&body).unwrap_or_default())
    }
}

/// Pull a non-empty play URL out of `{url}` or `{data:{url}}`
pub fn extract_play_url(body: &Value) -> Option<String> {
    [body.get("url"), body.pointer("/data/url")]
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|url| !url.is_empty())
        .map(str::to_string)
}
