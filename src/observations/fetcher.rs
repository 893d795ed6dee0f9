use crate::observations::error::ObservationError;
use crate::observations::loader::HourlyDataLoader;
use log::{info, warn};
use polars::prelude::LazyFrame;
use reqwest::StatusCode;
use std::collections::{hash_map::Entry, HashMap};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;

/// Keeps one LazyFrame per station in memory so repeated snapshots over the
/// same stations do not rescan the cache directory.
///
/// Stations without a hourly file on the server are stored as `None`.
pub struct FrameFetcher {
    loader: HourlyDataLoader,
    lazyframe_cache: Mutex<HashMap<String, Option<LazyFrame>>>,
}

impl FrameFetcher {
    pub fn new(cache_dir: &Path, max_age: Duration) -> Self {
        Self::from_loader(HourlyDataLoader::new(cache_dir, max_age))
    }

    pub(crate) fn from_loader(loader: HourlyDataLoader) -> Self {
        Self {
            loader,
            lazyframe_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Gets the hourly LazyFrame for a station, using the in-memory cache if possible.
    ///
    /// Returns `Ok(None)` when Meteostat has no hourly file for the station.
    pub async fn get_cache_lazyframe(
        &self,
        station: &str,
    ) -> Result<Option<LazyFrame>, ObservationError> {
        {
            let cache = self.lazyframe_cache.lock().await;
            if let Some(cached) = cache.get(station) {
                return Ok(cached.clone());
            }
        }

        // Loading may download; keep it outside the lock.
        let loaded_frame = match self.loader.get_frame(station).await {
            Ok(frame) => Some(frame),
            Err(ObservationError::HttpStatus { status, url, .. })
                if status == StatusCode::NOT_FOUND =>
            {
                warn!("No hourly data for station {} at {}", station, url);
                None
            }
            Err(e) => return Err(e),
        };

        let mut cache = self.lazyframe_cache.lock().await;
        match cache.entry(station.to_string()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                if loaded_frame.is_none() {
                    info!("Station {} marked as missing for this run", station);
                }
                entry.insert(loaded_frame.clone());
                Ok(loaded_frame)
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn mark_missing(&self, station: &str) {
        self.lazyframe_cache
            .lock()
            .await
            .insert(station.to_string(), None);
    }

    #[cfg(test)]
    pub(crate) async fn cached_stations(&self) -> usize {
        self.lazyframe_cache.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_station_is_not_downloaded_again() -> Result<(), ObservationError> {
        let tmp = tempfile::tempdir().expect("temp dir");
        // Nothing listens here, so any download attempt fails.
        let loader = HourlyDataLoader::new(tmp.path(), Duration::from_secs(3600))
            .with_base_url("http://127.0.0.1:9");
        let fetcher = FrameFetcher::from_loader(loader);
        fetcher.mark_missing("99999").await;

        assert!(fetcher.get_cache_lazyframe("99999").await?.is_none());
        assert!(fetcher.get_cache_lazyframe("99999").await?.is_none());
        assert_eq!(fetcher.cached_stations().await, 1);
        assert!(!tmp.path().join("hourly-99999.parquet").exists());
        Ok(())
    }

    #[tokio::test]
    async fn network_failures_are_not_cached() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let loader = HourlyDataLoader::new(tmp.path(), Duration::from_secs(3600))
            .with_base_url("http://127.0.0.1:9");
        let fetcher = FrameFetcher::from_loader(loader);

        let result = fetcher.get_cache_lazyframe("45005").await;
        assert!(matches!(result, Err(ObservationError::NetworkRequest(..))));
        assert_eq!(fetcher.cached_stations().await, 0);
    }
}
