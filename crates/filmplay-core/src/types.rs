//! Core data types for play resolution and catalog parsing
//!
//! Field names follow the site JSON payloads (`vod_*`, `playUrl`, `type`)
//! so records round-trip unchanged between the rule engines and the UI.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{FilmError, Result};

/// Site adapter family, carried on the wire as an integer code
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum SiteKind {
    /// Apple CMS XML API (code 0)
    CmsXml,
    /// Apple CMS JSON API (code 1)
    #[default]
    CmsJson,
    /// drpy rule engine (code 2)
    Drpy,
    /// hipy rule engine (code 6)
    Hipy,
    /// t3 rule engine (code 7)
    T3,
    /// catvod rule engine (code 8)
    Catvod,
    /// Any other code
    Other(u8),
}

impl From<u8> for SiteKind {
    fn from(code: u8) -> Self {
        match code {
            0 => SiteKind::CmsXml,
            1 => SiteKind::CmsJson,
            2 => SiteKind::Drpy,
            6 => SiteKind::Hipy,
            7 => SiteKind::T3,
            8 => SiteKind::Catvod,
            other => SiteKind::Other(other),
        }
    }
}

impl From<SiteKind> for u8 {
    fn from(kind: SiteKind) -> Self {
        match kind {
            SiteKind::CmsXml => 0,
            SiteKind::CmsJson => 1,
            SiteKind::Drpy => 2,
            SiteKind::Hipy => 6,
            SiteKind::T3 => 7,
            SiteKind::Catvod => 8,
            SiteKind::Other(code) => code,
        }
    }
}

/// A configured content site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDescriptor {
    #[serde(default)]
    pub key: String,

    #[serde(default)]
    pub name: String,

    /// Backend API root or rule file location
    #[serde(default)]
    pub api: String,

    /// Which site resolver applies
    #[serde(rename = "type", default)]
    pub kind: SiteKind,

    /// JSON play template; when set, play resolution bypasses the site resolver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_url: Option<String>,

    /// 0 disables search-based lookups for this site
    #[serde(default = "default_search")]
    pub search: i64,

    /// Rule-engine specific extension payload
    #[serde(default)]
    pub ext: serde_json::Value,
}

fn default_search() -> i64 {
    1
}

// Must agree with the serde defaults: sites built in code search unless told otherwise
impl Default for SiteDescriptor {
    fn default() -> Self {
        Self {
            key: String::new(),
            name: String::new(),
            api: String::new(),
            kind: SiteKind::default(),
            play_url: None,
            search: default_search(),
            ext: serde_json::Value::Null,
        }
    }
}

impl SiteDescriptor {
    /// Non-empty `playUrl` template, if the site declares one
    pub fn play_template(&self) -> Option<&str> {
        self.play_url.as_deref().filter(|t| !t.is_empty())
    }

    pub fn supports_search(&self) -> bool {
        self.search != 0
    }
}

/// Analyzer protocol, decoded from [`AnalyzeConfig::kind`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerProtocol {
    /// Analyzer page is driven through the sniffer (code 0)
    Web,
    /// Analyzer answers with a JSON body carrying the media URL (code 1)
    Json,
}

/// Analyzer endpoint configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeConfig {
    /// Endpoint prefix; the target URL is appended verbatim
    #[serde(default)]
    pub url: String,

    #[serde(rename = "type", default)]
    pub kind: i64,

    /// Source flags treated as official for this analyzer
    #[serde(default)]
    pub flag: Vec<String>,
}

impl AnalyzeConfig {
    /// # Errors
    /// Returns `UnsupportedAnalyzer` for any code other than 0 or 1
    pub fn protocol(&self) -> Result<AnalyzerProtocol> {
        match self.kind {
            0 => Ok(AnalyzerProtocol::Web),
            1 => Ok(AnalyzerProtocol::Json),
            other => Err(FilmError::UnsupportedAnalyzer(other)),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.url.is_empty()
    }

    /// Whether any declared flag occurs inside `source_flag`
    ///
    /// Empty flags are ignored; they would otherwise match every source.
    pub fn matches_flag(&self, source_flag: &str) -> bool {
        self.flag
            .iter()
            .any(|flag| !flag.is_empty() && source_flag.contains(flag.as_str()))
    }
}

/// Sniffer selection passed through to the generic sniffer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnifferConfig {
    /// Sniffer backend name; `"custom"` enables [`SnifferConfig::url`]
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub url: String,
}

impl SnifferConfig {
    /// Endpoint prefix for sniff requests
    ///
    /// Only a `custom` sniffer with an http(s) URL yields a prefix, reduced to
    /// origin plus path. Everything else yields an empty prefix.
    ///
    /// # Errors
    /// Returns `InvalidUrl` if the custom URL starts with `http` but does not parse
    pub fn endpoint_prefix(&self) -> Result<String> {
        if self.kind != "custom" || !self.url.starts_with("http") {
            return Ok(String::new());
        }

        let parsed = Url::parse(&self.url).map_err(|e| FilmError::InvalidUrl(format!("{}: {}", self.url, e)))?;
        Ok(format!("{}{}", parsed.origin().ascii_serialization(), parsed.path()))
    }
}

/// Immutable input to play resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayIntent {
    /// Episode reference as listed in the catalog
    pub url: String,
    pub site: SiteDescriptor,
    #[serde(default)]
    pub analyze: Option<AnalyzeConfig>,
    #[serde(default)]
    pub sniffer_mode: SnifferConfig,
    /// Currently selected source (line) name
    #[serde(default)]
    pub source_flag: String,
}

/// Media type reported by the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    M3u8,
    Mp4,
    Flv,
    Mpd,
    Mkv,
    Webm,
    Unknown,
    Error,
}

impl MediaType {
    /// A concrete type the player can open directly
    pub fn is_conclusive(self) -> bool {
        !matches!(self, MediaType::Unknown | MediaType::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::M3u8 => "m3u8",
            MediaType::Mp4 => "mp4",
            MediaType::Flv => "flv",
            MediaType::Mpd => "mpd",
            MediaType::Mkv => "mkv",
            MediaType::Webm => "webm",
            MediaType::Unknown => "unknown",
            MediaType::Error => "error",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal output of play resolution
///
/// `media_type == None` means the URL cannot be played.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResult {
    pub url: String,
    pub media_type: Option<MediaType>,
    pub is_official: bool,
}

impl PlayResult {
    pub fn is_playable(&self) -> bool {
        self.media_type.is_some() && !self.url.is_empty()
    }
}

/// Raw answer of a site resolver
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPlay {
    #[serde(default)]
    pub url: String,

    /// Companion script to run inside the sniffer page
    #[serde(default)]
    pub js: Option<String>,

    /// Query-string fragment appended to sniff requests
    #[serde(default)]
    pub parse_extra: Option<String>,

    /// 0 = direct, 1 = needs parsing
    #[serde(default)]
    pub parse: Option<i64>,

    /// drpy: the URL is already the final media URL
    #[serde(default)]
    pub redirect: bool,
}

/// One episode split into its label and URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeEntry {
    pub index: String,
    pub url: String,
}

/// Ordered mapping from source name to its raw episode tokens
///
/// Keys keep the declaration order of the catalog. Inserting an existing key
/// replaces its tokens but keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonIndex {
    entries: Vec<(String, Vec<String>)>,
}

impl SeasonIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, episodes: Vec<String>) {
        let source = source.into();
        match self.entries.iter_mut().find(|(name, _)| *name == source) {
            Some((_, existing)) => *existing = episodes,
            None => self.entries.push((source, episodes)),
        }
    }

    pub fn get(&self, source: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(name, _)| name == source)
            .map(|(_, episodes)| episodes.as_slice())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, episodes)| (name.as_str(), episodes.as_slice()))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Vec<String>> {
        self.entries.iter_mut().map(|(_, episodes)| episodes)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Vec<String>)> for SeasonIndex {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut index = SeasonIndex::new();
        for (source, episodes) in iter {
            index.insert(source, episodes);
        }
        index
    }
}

impl Serialize for SeasonIndex {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (source, episodes) in &self.entries {
            map.serialize_entry(source, episodes)?;
        }
        map.end()
    }
}

/// Raw catalog fields consumed by season parsing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VodCatalog {
    /// `$`-delimited source names
    #[serde(default)]
    pub vod_play_from: Option<String>,

    /// `$$$` between sources, `#` between episodes
    #[serde(default)]
    pub vod_play_url: Option<String>,
}

/// Subject a recommendation batch is built for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectInfo {
    #[serde(default)]
    pub vod_name: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub vod_year: String,

    #[serde(default, deserialize_with = "string_or_number")]
    pub vod_douban_id: String,
}

/// Search or detail record for a recommended title
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationItem {
    #[serde(deserialize_with = "string_or_number")]
    pub vod_id: String,

    #[serde(default)]
    pub vod_name: String,

    /// Present only on detail-grade records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vod_pic: Option<String>,

    /// Remaining site-specific fields, passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Accepts `"123"`, `123` or `null` and yields a string
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!("expected string or number, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_kind_codes() {
        assert_eq!(SiteKind::from(2), SiteKind::Drpy);
        assert_eq!(SiteKind::from(8), SiteKind::Catvod);
        assert_eq!(SiteKind::from(42), SiteKind::Other(42));
        assert_eq!(u8::from(SiteKind::T3), 7);
    }

    #[test]
    fn test_site_descriptor_from_json() {
        let site: SiteDescriptor = serde_json::from_str(
            r#"{"key":"t3","name":"T3 site","api":"csp_Demo","type":7,"search":0}"#,
        )
        .expect("Deserialization should succeed");

        assert_eq!(site.kind, SiteKind::T3);
        assert!(!site.supports_search());
        assert_eq!(site.play_template(), None);
    }

    #[test]
    fn test_site_descriptor_empty_play_url_is_ignored() {
        let site: SiteDescriptor = serde_json::from_str(r#"{"type":1,"playUrl":""}"#).unwrap();
        assert_eq!(site.play_template(), None);
        assert!(site.supports_search());
    }

    #[test]
    fn test_site_descriptor_default_matches_empty_json() {
        let from_json: SiteDescriptor = serde_json::from_str("{}").unwrap();
        let built = SiteDescriptor::default();
        assert_eq!(built.search, from_json.search);
        assert_eq!(built, from_json);
        assert!(built.supports_search());
    }

    #[test]
    fn test_analyze_protocol() {
        let mut analyze = AnalyzeConfig::default();
        assert_eq!(analyze.protocol().unwrap(), AnalyzerProtocol::Web);
        analyze.kind = 1;
        assert_eq!(analyze.protocol().unwrap(), AnalyzerProtocol::Json);
        analyze.kind = 5;
        assert!(matches!(analyze.protocol(), Err(FilmError::UnsupportedAnalyzer(5))));
    }

    #[test]
    fn test_analyze_matches_flag() {
        let analyze = AnalyzeConfig {
            url: "https://jx.example/?url=".to_string(),
            kind: 1,
            flag: vec!["qiyi".to_string(), "".to_string()],
        };
        assert!(analyze.matches_flag("qiyi-line"));
        assert!(!analyze.matches_flag("ffm3u8"));
    }

    #[test]
    fn test_sniffer_prefix_custom() {
        let sniffer = SnifferConfig {
            kind: "custom".to_string(),
            url: "http://127.0.0.1:57573/api/v1/sniffer?url=abc#frag".to_string(),
        };
        assert_eq!(
            sniffer.endpoint_prefix().unwrap(),
            "http://127.0.0.1:57573/api/v1/sniffer"
        );
    }

    #[test]
    fn test_sniffer_prefix_non_custom() {
        let sniffer = SnifferConfig {
            kind: "pie".to_string(),
            url: "http://127.0.0.1:57573/api".to_string(),
        };
        assert_eq!(sniffer.endpoint_prefix().unwrap(), "");

        let relative = SnifferConfig {
            kind: "custom".to_string(),
            url: "/api/sniffer".to_string(),
        };
        assert_eq!(relative.endpoint_prefix().unwrap(), "");
    }

    #[test]
    fn test_play_result_serialization() {
        let result = PlayResult {
            url: "https://cdn.example/a.m3u8".to_string(),
            media_type: Some(MediaType::M3u8),
            is_official: true,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["mediaType"], "m3u8");
        assert_eq!(json["isOfficial"], true);
    }

    #[test]
    fn test_season_index_keeps_position_on_replace() {
        let mut index = SeasonIndex::new();
        index.insert("a", vec!["1$x".to_string()]);
        index.insert("b", vec!["1$y".to_string()]);
        index.insert("a", vec!["2$z".to_string()]);

        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(index.get("a").unwrap(), &["2$z".to_string()]);
    }

    #[test]
    fn test_season_index_serializes_in_order() {
        let index: SeasonIndex = vec![
            ("z".to_string(), vec!["1$u".to_string()]),
            ("a".to_string(), vec![]),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&index).unwrap();
        assert_eq!(json, r#"{"z":["1$u"],"a":[]}"#);
    }

    #[test]
    fn test_recommendation_item_numeric_id() {
        let item: RecommendationItem =
            serde_json::from_str(r#"{"vod_id":1024,"vod_name":"Movie","vod_remarks":"HD"}"#)
                .unwrap();
        assert_eq!(item.vod_id, "1024");
        assert_eq!(item.vod_pic, None);
        assert_eq!(item.extra["vod_remarks"], "HD");
    }
}
