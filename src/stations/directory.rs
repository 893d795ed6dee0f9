//! Station lookup by bounding box.
//!
//! [`MeteostatStationDirectory`] downloads the Meteostat station listing once,
//! caches it as bincode and answers box queries from an in-memory R-tree.

use crate::config::BoundingBox;
use crate::stations::error::StationDirectoryError;
use crate::types::station::{MeteostatStation, Station};
use crate::utils::is_fresh;
use async_compression::tokio::bufread::GzipDecoder;
use bincode::config::{Configuration, Fixint, LittleEndian};
use futures_util::TryStreamExt;
use log::info;
use reqwest::Client;
use rstar::{RTree, AABB};
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, BufReader};
use tokio_util::io::StreamReader;

const DATA_URL: &str = "https://bulk.meteostat.net/v2/stations/lite.json.gz";
const BINCODE_CACHE_FILE_NAME: &str = "stations_lite.bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

/// Lists the stations inside a bounding box.
#[allow(async_fn_in_trait)]
pub trait StationDirectory {
    /// Returns every station whose location lies inside `bounds` (inclusive).
    async fn stations_in(&self, bounds: &BoundingBox) -> Result<Vec<Station>, StationDirectoryError>;
}

#[derive(Debug, Clone)]
pub struct MeteostatStationDirectory {
    rtree: RTree<Station>,
}

impl MeteostatStationDirectory {
    /// Loads the station listing, from cache when it is younger than `max_age`.
    pub async fn new(cache_dir: &Path, max_age: Duration) -> Result<Self, StationDirectoryError> {
        let cache_file = cache_dir.join(BINCODE_CACHE_FILE_NAME);

        let stations: Vec<Station> = if is_fresh(&cache_file, max_age).await {
            let path_clone = cache_file.clone();
            tokio::task::spawn_blocking(move || Self::get_cached_stations(&path_clone)).await??
        } else {
            info!("Station cache missing or stale. Fetching from URL: {}", DATA_URL);
            let stations = Self::fetch_stations().await?;
            Self::cache_stations(stations.clone(), &cache_file).await?;
            stations
        };

        Ok(Self::from_stations(stations))
    }

    /// Builds a directory over an already known station list.
    pub fn from_stations(stations: Vec<Station>) -> Self {
        Self {
            rtree: RTree::bulk_load(stations),
        }
    }

    pub fn len(&self) -> usize {
        self.rtree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.rtree.size() == 0
    }

    /// Stations inside `bounds`, sorted by station id.
    pub fn query(&self, bounds: &BoundingBox) -> Vec<Station> {
        let envelope = AABB::from_corners(
            [bounds.lat_min, bounds.lon_min],
            [bounds.lat_max, bounds.lon_max],
        );
        let mut stations: Vec<Station> = self
            .rtree
            .locate_in_envelope(&envelope)
            .cloned()
            .collect();
        stations.sort_by(|a, b| a.id.cmp(&b.id));
        stations
    }

    fn get_cached_stations(cache_path: &Path) -> Result<Vec<Station>, StationDirectoryError> {
        let bytes = std::fs::read(cache_path)
            .map_err(|e| StationDirectoryError::CacheRead(cache_path.to_path_buf(), e))?;
        let (decoded_stations, _) =
            bincode::serde::decode_from_slice::<Vec<Station>, _>(&bytes, BINCODE_CONFIG).map_err(
                |e| StationDirectoryError::CacheDecode(cache_path.to_path_buf(), Box::from(e)),
            )?;
        Ok(decoded_stations)
    }

    async fn fetch_stations() -> Result<Vec<Station>, StationDirectoryError> {
        let client = Client::new();
        let response = client
            .get(DATA_URL)
            .send()
            .await
            .map_err(|e| StationDirectoryError::NetworkRequest(DATA_URL.to_string(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(match e.status() {
                    Some(status) => StationDirectoryError::HttpStatus {
                        url: DATA_URL.to_string(),
                        status,
                        source: e,
                    },
                    None => StationDirectoryError::NetworkRequest(DATA_URL.to_string(), e),
                });
            }
        };
        let stream = response.bytes_stream().map_err(io::Error::other);
        let stream_reader = StreamReader::new(stream);
        let gzip_decoder = GzipDecoder::new(BufReader::new(stream_reader));
        let mut decoder_reader = BufReader::new(gzip_decoder);
        let mut decompressed_json = Vec::with_capacity(20_000_000);
        decoder_reader.read_to_end(&mut decompressed_json).await?;

        let parse_start = std::time::Instant::now();
        let stations = tokio::task::spawn_blocking(move || {
            serde_json::from_slice::<Vec<MeteostatStation>>(&decompressed_json)
                .map(|raw| raw.into_iter().map(Station::from).collect::<Vec<_>>())
                .map_err(StationDirectoryError::from)
        })
        .await??;
        info!(
            "Parsed {} stations from JSON in {:?}",
            stations.len(),
            parse_start.elapsed()
        );
        Ok(stations)
    }

    async fn cache_stations(
        stations: Vec<Station>,
        cache_path: &Path,
    ) -> Result<(), StationDirectoryError> {
        let bincode_data = tokio::task::spawn_blocking(move || {
            bincode::serde::encode_to_vec(stations, BINCODE_CONFIG)
                .map_err(|e| StationDirectoryError::CacheEncode(Box::new(e)))
        })
        .await??;
        tokio::fs::write(cache_path, &bincode_data)
            .await
            .map_err(|e| StationDirectoryError::CacheWrite(cache_path.to_path_buf(), e))?;
        info!(
            "Wrote station cache ({} bytes) to {}",
            bincode_data.len(),
            cache_path.display()
        );
        Ok(())
    }
}

impl StationDirectory for MeteostatStationDirectory {
    async fn stations_in(&self, bounds: &BoundingBox) -> Result<Vec<Station>, StationDirectoryError> {
        let stations = self.query(bounds);
        info!("Found {} stations in region", stations.len());
        Ok(stations)
    }
}
