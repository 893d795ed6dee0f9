use crate::observations::error::ObservationError;
use crate::utils::is_fresh;
use async_compression::tokio::bufread::GzipDecoder;
use futures_util::TryStreamExt;
use log::{info, warn};
use polars::frame::DataFrame;
use polars::prelude::*;
use reqwest::Client;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::io::AsyncReadExt;
use tokio::{fs, task};
use tokio_util::io::StreamReader;

const HOURLY_URL: &str = "https://bulk.meteostat.net/v2/hourly";
const CACHE_FILE_PREFIX: &str = "hourly-";

/// Column layout of the headerless Meteostat hourly CSV files.
pub const HOURLY_COLUMNS: [&str; 13] = [
    "date", "hour", "temp", "dwpt", "rhum", "prcp", "snow", "wdir", "wspd", "wpgt", "pres",
    "tsun", "coco",
];

/// Columns read as `f64`; everything after `date` and `hour`.
const MEASUREMENT_COLUMNS: [&str; 11] = [
    "temp", "dwpt", "rhum", "prcp", "snow", "wdir", "wspd", "wpgt", "pres", "tsun", "coco",
];

/// Fixed types for the hourly files. Inference only samples the first rows and
/// would type a column as integer when a decimal shows up later.
fn hourly_schema() -> Schema {
    let mut fields = vec![
        Field::new("date".into(), DataType::String),
        Field::new("hour".into(), DataType::Int64),
    ];
    fields.extend(
        MEASUREMENT_COLUMNS
            .iter()
            .map(|name| Field::new((*name).into(), DataType::Float64)),
    );
    Schema::from_iter(fields)
}

/// Number of fields on the first non-blank line, `None` for blank input.
fn field_count(bytes: &[u8]) -> Option<usize> {
    bytes
        .split(|b| *b == b'\n')
        .map(|line| line.trim_ascii())
        .find(|line| !line.is_empty())
        .map(|line| line.iter().filter(|b| **b == b',').count() + 1)
}

/// Downloads per-station hourly data and keeps it as parquet on disk.
pub struct HourlyDataLoader {
    cache_dir: PathBuf,
    max_age: Duration,
    base_url: String,
    download_client: Client,
}

impl HourlyDataLoader {
    pub fn new(cache_dir: &Path, max_age: Duration) -> HourlyDataLoader {
        HourlyDataLoader {
            cache_dir: cache_dir.to_path_buf(),
            max_age,
            base_url: HOURLY_URL.to_string(),
            download_client: Client::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    pub(crate) fn cache_path(&self, station: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}{}.parquet", CACHE_FILE_PREFIX, station))
    }

    /// Returns a LazyFrame over the station's full hourly history.
    ///
    /// The parquet cache is reused while it is younger than the configured max age.
    pub async fn get_frame(&self, station: &str) -> Result<LazyFrame, ObservationError> {
        let parquet_path = self.cache_path(station);

        if is_fresh(&parquet_path, self.max_age).await {
            info!("Cache hit for hourly data of station {} at {:?}", station, parquet_path);
        } else {
            warn!(
                "Cache miss for hourly data of station {}. Downloading and processing.",
                station
            );
            let raw_bytes = self.download(station).await?;
            let df = Self::csv_to_dataframe(raw_bytes, station).await?;

            fs::create_dir_all(&self.cache_dir)
                .await
                .map_err(|e| ObservationError::CacheDirCreation(self.cache_dir.clone(), e))?;

            Self::cache_dataframe(df, &parquet_path).await?;
            info!("Cached hourly data for station {} to {:?}", station, parquet_path);
        }

        LazyFrame::scan_parquet(&parquet_path, Default::default())
            .map_err(|e| ObservationError::ParquetScan(parquet_path.clone(), e))
    }

    /// Downloads and decompresses the hourly file of a station.
    async fn download(&self, station: &str) -> Result<Vec<u8>, ObservationError> {
        let url = format!("{}/{}.csv.gz", self.base_url, station);
        info!("Downloading data from {}", url);

        let response = self
            .download_client
            .get(&url)
            .send()
            .await
            .map_err(|e| ObservationError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(match e.status() {
                    Some(status) => ObservationError::HttpStatus {
                        url,
                        status,
                        source: e,
                    },
                    None => ObservationError::NetworkRequest(url, e),
                });
            }
        };

        let stream = response.bytes_stream().map_err(std::io::Error::other);
        let stream_reader = StreamReader::new(stream);
        let mut decoder = GzipDecoder::new(stream_reader);
        let mut decompressed = Vec::new();
        decoder
            .read_to_end(&mut decompressed)
            .await
            .map_err(ObservationError::DownloadIo)?;
        info!(
            "Downloaded and decompressed {} bytes for station {}",
            decompressed.len(),
            station
        );
        Ok(decompressed)
    }

    /// Parses raw headerless CSV bytes into a DataFrame with the hourly schema,
    /// on a blocking task.
    pub(crate) async fn csv_to_dataframe(
        bytes: Vec<u8>,
        station: &str,
    ) -> Result<DataFrame, ObservationError> {
        let station_owned = station.to_string();

        task::spawn_blocking(move || {
            let schema = hourly_schema();
            let Some(found) = field_count(&bytes) else {
                return Ok(DataFrame::empty_with_schema(&schema));
            };
            if found != HOURLY_COLUMNS.len() {
                warn!(
                    "CSV column count ({}) does not match hourly schema length ({}) for station {}",
                    found,
                    HOURLY_COLUMNS.len(),
                    station_owned
                );
                return Err(ObservationError::SchemaMismatch {
                    station: station_owned,
                    expected: HOURLY_COLUMNS.len(),
                    found,
                });
            }

            let io_err = |e| ObservationError::CsvReadIo {
                station: station_owned.clone(),
                source: e,
            };
            let mut temp_file = NamedTempFile::new().map_err(io_err)?;
            temp_file.write_all(&bytes).map_err(io_err)?;
            temp_file.flush().map_err(io_err)?;

            let polars_err = |e| ObservationError::CsvReadPolars {
                station: station_owned.clone(),
                source: e,
            };
            CsvReadOptions::default()
                .with_has_header(false)
                .with_schema(Some(Arc::new(schema)))
                .try_into_reader_with_file_path(Some(temp_file.path().to_path_buf()))
                .map_err(polars_err)?
                .finish()
                .map_err(polars_err)
        })
        .await?
    }

    /// Writes a DataFrame to a Parquet file using spawn_blocking.
    async fn cache_dataframe(mut df: DataFrame, path: &Path) -> Result<(), ObservationError> {
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let file = std::fs::File::create(&path_buf)
                .map_err(|e| ObservationError::ParquetWriteIo(path_buf.clone(), e))?;
            ParquetWriter::new(file)
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| ObservationError::ParquetWritePolars(path_buf, e))?;
            Ok::<(), ObservationError>(())
        })
        .await??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
2025-01-01,0,14.2,8.1,67,0.0,,40,11.2,,1021.3,,2
2025-01-01,1,13.8,8.0,68,0.0,,50,9.4,,1021.0,,2
2025-01-01,2,,7.9,70,,,,7.6,,1020.8,,
";

    #[tokio::test]
    async fn csv_is_parsed_with_hourly_schema() -> Result<(), ObservationError> {
        let df = HourlyDataLoader::csv_to_dataframe(SAMPLE_CSV.as_bytes().to_vec(), "45005").await?;
        assert_eq!(df.shape(), (3, 13));
        let names: Vec<&str> = df.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(names, HOURLY_COLUMNS);

        let temp = df.column("temp").unwrap().f64().unwrap();
        assert_eq!(temp.get(0), Some(14.2));
        assert_eq!(temp.get(2), None);
        // Integer-looking columns are read as f64.
        let wdir = df.column("wdir").unwrap().f64().unwrap();
        assert_eq!(wdir.get(1), Some(50.0));
        let hour = df.column("hour").unwrap().i64().unwrap();
        assert_eq!(hour.get(2), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn wrong_column_count_is_a_schema_mismatch() {
        let result =
            HourlyDataLoader::csv_to_dataframe(b"2025-01-01,0,14.2\n".to_vec(), "45005").await;
        assert!(matches!(
            result,
            Err(ObservationError::SchemaMismatch {
                expected: 13,
                found: 3,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn late_decimals_keep_float_columns() -> Result<(), ObservationError> {
        let mut csv = String::new();
        for hour in 0..120 {
            csv.push_str(&format!("2025-01-01,{},14,8,67,0,,40,11,,1021,,2\n", hour % 24));
        }
        csv.push_str("2025-01-06,0,14.5,8.2,67,0.3,,45,11.6,,1020.9,,2\n");

        let df = HourlyDataLoader::csv_to_dataframe(csv.into_bytes(), "45005").await?;
        assert_eq!(df.height(), 121);
        let temp = df.column("temp").unwrap().f64().unwrap();
        assert_eq!(temp.get(0), Some(14.0));
        assert_eq!(temp.get(120), Some(14.5));
        let wspd = df.column("wspd").unwrap().f64().unwrap();
        assert_eq!(wspd.get(120), Some(11.6));
        Ok(())
    }

    #[tokio::test]
    async fn blank_csv_is_an_empty_frame() -> Result<(), ObservationError> {
        let df = HourlyDataLoader::csv_to_dataframe(b"\n".to_vec(), "45005").await?;
        assert_eq!(df.shape(), (0, 13));
        Ok(())
    }

    #[tokio::test]
    async fn cached_parquet_is_scannable() -> Result<(), ObservationError> {
        let tmp = tempfile::tempdir().expect("temp dir");
        let loader = HourlyDataLoader::new(tmp.path(), Duration::from_secs(3600));
        let df = HourlyDataLoader::csv_to_dataframe(SAMPLE_CSV.as_bytes().to_vec(), "45005").await?;
        HourlyDataLoader::cache_dataframe(df, &loader.cache_path("45005")).await?;

        // Fresh cache: no download happens.
        let frame = loader.get_frame("45005").await?.collect().map_err(|e| {
            ObservationError::PolarsError {
                station: "45005".into(),
                source: e,
            }
        })?;
        assert_eq!(frame.height(), 3);
        Ok(())
    }
}
