//! Preload Cache
//!
//! Holds an immutable snapshot of chain-wide data (validator sets, era
//! progress) and republishes it on a watch channel whenever it changes.
//! A refresh only runs when the snapshot is older than the configured max
//! age or when the source's cheap marker moved.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

use crate::config::PreloadSettings;
use crate::error::HawalaResult;

/// Family-specific producer of preload data
#[async_trait]
pub trait PreloadSource: Send + Sync {
    type Data: Clone + Default + Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Cheap chain-state marker; a change forces a refresh
    async fn marker(&self) -> HawalaResult<u64>;

    /// Full, possibly heavy, fetch
    async fn fetch(&self) -> HawalaResult<Self::Data>;

    /// Rebuild data from a persisted value, defaulting whatever is malformed
    fn hydrate(&self, value: &Value) -> Self::Data;
}

/// One published version of the preload data
#[derive(Debug)]
pub struct PreloadSnapshot<T> {
    pub data: Arc<T>,
    /// Incremented on every publish
    pub generation: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub marker: Option<u64>,
    fetched_at: Option<Instant>,
}

impl<T> Clone for PreloadSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            generation: self.generation,
            refreshed_at: self.refreshed_at,
            marker: self.marker,
            fetched_at: self.fetched_at,
        }
    }
}

impl<T> PreloadSnapshot<T> {
    fn is_fresh(&self, max_age: Duration) -> bool {
        self.fetched_at.is_some_and(|at| at.elapsed() < max_age)
    }
}

/// Owned preload state of one family
pub struct PreloadCache<S: PreloadSource> {
    source: S,
    max_age: Duration,
    sender: watch::Sender<PreloadSnapshot<S::Data>>,
    refresh: Mutex<()>,
}

impl<S: PreloadSource> PreloadCache<S> {
    pub fn new(source: S, settings: &PreloadSettings) -> Self {
        let (sender, _) = watch::channel(PreloadSnapshot {
            data: Arc::new(S::Data::default()),
            generation: 0,
            refreshed_at: None,
            marker: None,
            fetched_at: None,
        });
        Self {
            source,
            max_age: settings.max_age(),
            sender,
            refresh: Mutex::new(()),
        }
    }

    pub fn current(&self) -> PreloadSnapshot<S::Data> {
        self.sender.borrow().clone()
    }

    /// Receive every future snapshot
    pub fn subscribe(&self) -> watch::Receiver<PreloadSnapshot<S::Data>> {
        self.sender.subscribe()
    }

    /// Refresh if stale or if the marker advanced, then return the snapshot.
    ///
    /// Concurrent callers wait for a single refresh.
    pub async fn preload(&self) -> HawalaResult<PreloadSnapshot<S::Data>> {
        let _refreshing = self.refresh.lock().await;
        let previous = self.current();

        let marker = self.source.marker().await?;
        if previous.is_fresh(self.max_age) && previous.marker == Some(marker) {
            crate::log_debug!("preload", "Snapshot still fresh", generation = previous.generation);
            return Ok(previous);
        }

        let data = self.source.fetch().await?;
        let snapshot = PreloadSnapshot {
            data: Arc::new(data),
            generation: previous.generation + 1,
            refreshed_at: Some(Utc::now()),
            marker: Some(marker),
            fetched_at: Some(Instant::now()),
        };
        self.sender.send_replace(snapshot.clone());

        crate::log_info!(
            "preload",
            "Preload data refreshed",
            generation = snapshot.generation,
            marker = marker,
        );
        Ok(snapshot)
    }

    /// Persistable form of the current snapshot
    pub fn serialize(&self) -> HawalaResult<Value> {
        let snapshot = self.current();
        Ok(json!({
            "data": serde_json::to_value(snapshot.data.as_ref())?,
            "marker": snapshot.marker,
            "refreshedAt": snapshot.refreshed_at,
        }))
    }

    /// Publish a snapshot rebuilt from [`serialize`](Self::serialize) output.
    ///
    /// Hydrated data is treated as stale: the next `preload` refetches it.
    pub fn hydrate(&self, value: &Value) -> PreloadSnapshot<S::Data> {
        let data = self.source.hydrate(value.get("data").unwrap_or(&Value::Null));
        let marker = value.get("marker").and_then(Value::as_u64);
        let refreshed_at = value
            .get("refreshedAt")
            .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v.clone()).ok());

        let mut snapshot = PreloadSnapshot {
            data: Arc::new(data),
            generation: 0,
            refreshed_at,
            marker,
            fetched_at: None,
        };
        self.sender.send_modify(|current| {
            snapshot.generation = current.generation + 1;
            *current = snapshot.clone();
        });
        snapshot
    }
}
