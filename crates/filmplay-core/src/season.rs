//! Episode catalog formatters
//!
//! Sites publish their episode lists as two delimited strings:
//!
//! - `vod_play_from`: source names separated by `$`
//! - `vod_play_url`: one segment per source separated by `$$$`, episodes
//!   separated by `#`, each episode written as `label$url`
//!
//! [`format_season`] turns these into a [`SeasonIndex`]; the remaining
//! helpers format single episode tokens for display.

use std::str::FromStr;

use regex::Regex;
use tracing::{debug, warn};

use crate::error::{FilmError, Result};
use crate::outcome::Outcome;
use crate::types::{EpisodeEntry, SeasonIndex, VodCatalog};

/// Separator between an episode label and its URL
pub const EPISODE_SEPARATOR: char = '$';

/// Separator between per-source segments of `vod_play_url`
pub const SOURCE_SEPARATOR: &str = "$$$";

/// Label used for episodes that carry no name of their own
pub const MAIN_FEATURE: &str = "正片";

/// Key of the placeholder entry returned when a catalog cannot be parsed
pub const PARSE_ERROR_KEY: &str = "报错";

/// Episode token of the placeholder entry
pub const PARSE_ERROR_HINT: &str = "格式化报错$查看日志获取更多报错信息";

/// Display label of an episode token
///
/// Returns [`MAIN_FEATURE`] when the label part is itself a URL.
pub fn format_name(token: &str) -> String {
    let first = token.split(EPISODE_SEPARATOR).next().unwrap_or_default();
    if first.contains("http") {
        MAIN_FEATURE.to_string()
    } else {
        first.to_string()
    }
}

/// Split an episode token at its first separator
pub fn format_index(token: &str) -> EpisodeEntry {
    let (index, url) = token
        .split_once(EPISODE_SEPARATOR)
        .unwrap_or((token, ""));
    EpisodeEntry {
        index: index.to_string(),
        url: url.to_string(),
    }
}

/// Strip inline `style="..."` attributes from a description
pub fn format_content(html: Option<&str>) -> String {
    let Some(html) = html.filter(|h| !h.is_empty()) else {
        return String::new();
    };

    let Ok(re) = Regex::new(r#"(?i)style\s*=\s*(?:"[^"]*"|‘[^‘]*‘)"#) else {
        return html.to_string();
    };
    re.replace_all(html, "").into_owned()
}

/// Parse a raw catalog into a per-source episode index
///
/// Runs of `$` inside a segment collapse to one and a token without `$` is
/// read as an unnamed main feature. A catalog with missing fields or with a
/// different number of source names and segments yields a degraded outcome
/// holding a single [`PARSE_ERROR_KEY`] entry.
pub fn format_season(catalog: &VodCatalog) -> Outcome<SeasonIndex> {
    match parse_season(catalog) {
        Ok(index) => {
            debug!(sources = index.len(), "season formatted");
            Outcome::complete(index)
        }
        Err(e) => {
            warn!(error = %e, "season format failed");
            Outcome::degraded(parse_error_index(), e.to_string())
        }
    }
}

fn parse_season(catalog: &VodCatalog) -> Result<SeasonIndex> {
    let play_from = catalog
        .vod_play_from
        .as_deref()
        .ok_or_else(|| FilmError::ParseError("vod_play_from is missing".to_string()))?;
    let play_url = catalog
        .vod_play_url
        .as_deref()
        .ok_or_else(|| FilmError::ParseError("vod_play_url is missing".to_string()))?;

    let sources: Vec<&str> = play_from
        .split(EPISODE_SEPARATOR)
        .filter(|name| !name.is_empty())
        .collect();
    let segments: Vec<Vec<String>> = play_url.split(SOURCE_SEPARATOR).map(repair_segment).collect();

    if sources.len() != segments.len() {
        return Err(FilmError::ParseError(format!(
            "{} source names but {} episode segments",
            sources.len(),
            segments.len()
        )));
    }

    Ok(sources
        .into_iter()
        .map(str::to_string)
        .zip(segments)
        .collect())
}

fn repair_segment(segment: &str) -> Vec<String> {
    let mut collapsed = String::with_capacity(segment.len());
    for c in segment.chars() {
        if c == EPISODE_SEPARATOR && collapsed.ends_with(EPISODE_SEPARATOR) {
            continue;
        }
        collapsed.push(c);
    }

    collapsed
        .split('#')
        .map(|episode| {
            if episode.contains(EPISODE_SEPARATOR) {
                episode.to_string()
            } else {
                format!("{}{}{}", MAIN_FEATURE, EPISODE_SEPARATOR, episode)
            }
        })
        .collect()
}

fn parse_error_index() -> SeasonIndex {
    let mut index = SeasonIndex::new();
    index.insert(PARSE_ERROR_KEY, vec![PARSE_ERROR_HINT.to_string()]);
    index
}

/// Episode numbering direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeOrder {
    /// First episode is numbered 1
    Positive,
    /// First episode gets the highest number
    Negative,
    /// Unrecognized direction
    Unspecified,
}

impl FromStr for EpisodeOrder {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "positive" => EpisodeOrder::Positive,
            "negative" => EpisodeOrder::Negative,
            _ => EpisodeOrder::Unspecified,
        })
    }
}

/// Displayed number of the episode at zero-based `current` out of `total`
///
/// ```
/// use filmplay_core::season::{format_reverse_order, EpisodeOrder};
/// assert_eq!(format_reverse_order(EpisodeOrder::Positive, 0, 37), 1);
/// assert_eq!(format_reverse_order(EpisodeOrder::Negative, 0, 37), 37);
/// ```
pub fn format_reverse_order(order: EpisodeOrder, current: usize, total: usize) -> usize {
    match order {
        EpisodeOrder::Positive => current + 1,
        EpisodeOrder::Negative => total.saturating_sub(current),
        EpisodeOrder::Unspecified => 1,
    }
}

/// Copy of `dataset` with every source's episodes in the requested order
///
/// Catalogs are stored in positive order, so only `Negative` reverses.
pub fn reverse_order_helper(order: EpisodeOrder, dataset: &SeasonIndex) -> SeasonIndex {
    let mut ordered = dataset.clone();
    if order == EpisodeOrder::Negative {
        for episodes in ordered.iter_mut() {
            episodes.reverse();
        }
    }
    ordered
}
