//! Fail-soft wrappers around the history, favorites and analyzer stores
//!
//! The stores themselves live outside this crate; these helpers only pass
//! calls through and substitute well-shaped defaults on failure.

use serde::Serialize;
use tracing::{debug, error};

use crate::collaborators::{AnalyzeSettings, AnalyzeStore, FavoritesStore, HistoryRecord, HistoryStore};
use crate::error::{FilmError, Result};
use crate::outcome::Outcome;

/// Status-tagged favorites answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BingeData {
    pub status: bool,
    pub data: serde_json::Value,
}

impl BingeData {
    fn failed() -> Self {
        Self {
            status: false,
            data: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

/// Favorites mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BingeAction {
    Add,
    Delete,
    Update,
}

/// Stored history for `(relate_id, video_id)`, or the default record
pub async fn fetch_history_data(store: &dyn HistoryStore, relate_id: &str, video_id: &str) -> Outcome<HistoryRecord> {
    match store.get(relate_id, video_id).await {
        Ok(record) => {
            debug!(relate_id, video_id, found = record.is_some(), "history fetched");
            Outcome::complete(record.unwrap_or_default())
        }
        Err(e) => {
            error!(relate_id, video_id, error = %e, "history fetch failed");
            Outcome::degraded(HistoryRecord::default(), e.to_string())
        }
    }
}

/// Update the record `id`, or add `doc` when no id is given
pub async fn put_history_data(store: &dyn HistoryStore, id: Option<&str>, doc: &HistoryRecord) -> Outcome<HistoryRecord> {
    let result = match id {
        Some(id) => store.update(id, doc).await,
        None => store.add(doc).await,
    };
    if let Err(e) = &result {
        error!(?id, error = %e, "history write failed");
    }
    Outcome::from_result(result, HistoryRecord::default)
}

/// Favorites record for `(relate_id, video_id)`; `status` tells whether it exists
pub async fn fetch_binge_data(store: &dyn FavoritesStore, relate_id: &str, video_id: &str) -> BingeData {
    match store.get(relate_id, video_id).await {
        Ok(Some(data)) => BingeData { status: true, data },
        Ok(None) => BingeData::failed(),
        Err(e) => {
            error!(relate_id, video_id, error = %e, "favorites fetch failed");
            BingeData::failed()
        }
    }
}

/// Apply a favorites mutation; `status` is false when the store call failed
pub async fn put_binge_data(
    store: &dyn FavoritesStore,
    action: BingeAction,
    id: Option<&str>,
    doc: &serde_json::Value,
) -> BingeData {
    let result = apply_binge_action(store, action, id, doc).await;

    match result {
        Ok(data) => BingeData { status: true, data },
        Err(e) => {
            error!(?action, ?id, error = %e, "favorites write failed");
            BingeData::failed()
        }
    }
}

async fn apply_binge_action(
    store: &dyn FavoritesStore,
    action: BingeAction,
    id: Option<&str>,
    doc: &serde_json::Value,
) -> Result<serde_json::Value> {
    match (action, id) {
        (BingeAction::Add, _) => store.add(doc).await,
        (BingeAction::Delete, Some(id)) => store.delete(id).await,
        (BingeAction::Update, Some(id)) => store.update(id, doc).await,
        (action, None) => Err(FilmError::InvalidArgument(format!("{:?} needs a record id", action))),
    }
}

/// Analyzer settings with empty defaults on failure
pub async fn fetch_analyze_data(store: &dyn AnalyzeStore) -> Outcome<AnalyzeSettings> {
    let result: Result<AnalyzeSettings> = store.load().await.map(|mut settings| {
        if settings.default.is_null() {
            settings.default = serde_json::Value::Object(serde_json::Map::new());
        }
        settings
    });
    if let Err(e) = &result {
        error!(error = %e, "analyzer settings fetch failed");
    }
    Outcome::from_result(result, || AnalyzeSettings {
        default: serde_json::Value::Object(serde_json::Map::new()),
        ..AnalyzeSettings::default()
    })
}
