//! HTTP-backed media type classification
//!
//! Looks at the URL path extension first and only probes the server when the
//! extension says nothing.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::client::HttpClient;
use crate::collaborators::MediaTypeClassifier;
use crate::types::MediaType;

/// Classifies by extension, then by `Content-Type`
pub struct HttpMediaClassifier {
    client: Arc<HttpClient>,
}

impl HttpMediaClassifier {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaTypeClassifier for HttpMediaClassifier {
    async fn classify(&self, url: &str) -> MediaType {
        let Ok(parsed) = Url::parse(url) else {
            debug!(url, "not an absolute URL");
            return MediaType::Unknown;
        };

        if !matches!(parsed.scheme(), "http" | "https") {
            return MediaType::Unknown;
        }

        if let Some(media_type) = classify_by_extension(&parsed) {
            return media_type;
        }

        match self.client.content_type(url).await {
            Ok(Some(content_type)) => classify_content_type(&content_type),
            Ok(None) => MediaType::Unknown,
            Err(e) => {
                warn!(url, error = %e, "media type probe failed");
                MediaType::Error
            }
        }
    }
}

/// Maps a path extension to a media type
pub fn classify_by_extension(url: &Url) -> Option<MediaType> {
    let last = url.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;

    match ext.to_ascii_lowercase().as_str() {
        "m3u8" | "m3u" => Some(MediaType::M3u8),
        "mp4" | "m4v" | "mov" => Some(MediaType::Mp4),
        "flv" => Some(MediaType::Flv),
        "mpd" => Some(MediaType::Mpd),
        "mkv" => Some(MediaType::Mkv),
        "webm" => Some(MediaType::Webm),
        _ => None,
    }
}

/// Maps a lowercase `Content-Type` value to a media type
pub fn classify_content_type(content_type: &str) -> MediaType {
    let essence = content_type.split(';').next().unwrap_or_default().trim();

    match essence {
        "application/vnd.apple.mpegurl" | "application/x-mpegurl" | "audio/mpegurl"
        | "audio/x-mpegurl" => MediaType::M3u8,
        "video/mp4" | "video/quicktime" => MediaType::Mp4,
        "video/x-flv" | "video/flv" => MediaType::Flv,
        "application/dash+xml" => MediaType::Mpd,
        "video/x-matroska" => MediaType::Mkv,
        "video/webm" => MediaType::Webm,
        _ => MediaType::Unknown,
    }
}
