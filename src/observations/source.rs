//! Hourly observations for one station over a time window.

use crate::observations::error::ObservationError;
use crate::observations::fetcher::FrameFetcher;
use crate::types::observation::ObservationRow;
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use polars::prelude::*;
use std::path::Path;
use std::time::Duration;

/// Supplies raw hourly observation rows for a station.
#[allow(async_fn_in_trait)]
pub trait ObservationSource {
    /// Returns the rows of `station_id` with `start <= time <= end`, sorted by time.
    ///
    /// An empty vector means the station reported nothing in the window.
    async fn hourly(
        &self,
        station_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<ObservationRow>, ObservationError>;
}

/// Observation source backed by the Meteostat bulk hourly files.
pub struct MeteostatObservationSource {
    fetcher: FrameFetcher,
}

impl MeteostatObservationSource {
    pub fn new(cache_dir: &Path, max_age: Duration) -> Self {
        Self {
            fetcher: FrameFetcher::new(cache_dir, max_age),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_fetcher(fetcher: FrameFetcher) -> Self {
        Self { fetcher }
    }
}

impl ObservationSource for MeteostatObservationSource {
    async fn hourly(
        &self,
        station_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<ObservationRow>, ObservationError> {
        let Some(frame) = self.fetcher.get_cache_lazyframe(station_id).await? else {
            debug!("Station {}: no hourly file, nothing to select", station_id);
            return Ok(Vec::new());
        };
        let filtered = filter_dates(frame, start.date(), end.date());

        let station_owned = station_id.to_string();
        let df = tokio::task::spawn_blocking(move || filtered.collect())
            .await?
            .map_err(|e| ObservationError::PolarsError {
                station: station_owned,
                source: e,
            })?;

        let mut rows: Vec<ObservationRow> = extract_rows(&df, station_id)?
            .into_iter()
            .filter(|row| row.time >= start && row.time <= end)
            .collect();
        rows.sort_by_key(|row| row.time);
        debug!(
            "Station {}: {} hourly rows between {} and {}",
            station_id,
            rows.len(),
            start,
            end
        );
        Ok(rows)
    }
}

/// Narrows the frame to the calendar dates touched by `[first, last]` and the
/// columns a station plot needs.
fn filter_dates(frame: LazyFrame, first: NaiveDate, last: NaiveDate) -> LazyFrame {
    let predicate = first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| col("date").eq(lit(day.format("%Y-%m-%d").to_string())))
        .reduce(|acc, expr| acc.or(expr))
        .unwrap_or_else(|| lit(false));

    frame.filter(predicate).select([
        col("date"),
        col("hour"),
        col("temp"),
        col("dwpt"),
        col("wspd"),
        col("wdir"),
    ])
}

fn column<'a>(df: &'a DataFrame, name: &str, station: &str) -> Result<&'a Column, ObservationError> {
    df.column(name).map_err(|e| ObservationError::PolarsError {
        station: station.to_string(),
        source: e,
    })
}

fn float_column<'a>(
    df: &'a DataFrame,
    name: &str,
    station: &str,
) -> Result<&'a Float64Chunked, ObservationError> {
    column(df, name, station)?
        .f64()
        .map_err(|e| ObservationError::PolarsError {
            station: station.to_string(),
            source: e,
        })
}

/// Converts a collected hourly frame into observation rows.
///
/// Rows without a parsable date or hour are dropped; measurements keep their nulls.
fn extract_rows(df: &DataFrame, station: &str) -> Result<Vec<ObservationRow>, ObservationError> {
    let polars_err = |e| ObservationError::PolarsError {
        station: station.to_string(),
        source: e,
    };
    let dates = column(df, "date", station)?.str().map_err(polars_err)?;
    let hours = column(df, "hour", station)?.i64().map_err(polars_err)?;
    let temperature = float_column(df, "temp", station)?;
    let dew_point = float_column(df, "dwpt", station)?;
    let wind_speed = float_column(df, "wspd", station)?;
    let wind_direction = float_column(df, "wdir", station)?;

    let mut rows = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let time = dates
            .get(idx)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .zip(hours.get(idx).and_then(|h| u32::try_from(h).ok()))
            .and_then(|(date, hour)| date.and_hms_opt(hour, 0, 0));
        let Some(time) = time else {
            debug!("Station {}: skipping row {} without a valid date/hour", station, idx);
            continue;
        };
        rows.push(ObservationRow {
            time,
            temperature: temperature.get(idx),
            dew_point: dew_point.get(idx),
            wind_speed: wind_speed.get(idx),
            wind_direction: wind_direction.get(idx),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observations::loader::HourlyDataLoader;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    const SAMPLE_CSV: &str = "\
2024-12-31,23,12.0,7.0,71,,,30,8.0,,1020.0,,
2025-01-01,0,11.5,6.8,72,,,20,7.2,,1020.4,,
2025-01-01,1,11.1,6.6,73,,,,6.5,,1020.6,,
2025-01-01,12,18.3,9.0,50,,,90,14.0,,1018.2,,
";

    async fn frame_for_sample() -> LazyFrame {
        HourlyDataLoader::csv_to_dataframe(SAMPLE_CSV.as_bytes().to_vec(), "45005")
            .await
            .expect("sample csv parses")
            .lazy()
    }

    #[tokio::test]
    async fn extracts_rows_across_midnight() -> Result<(), ObservationError> {
        let frame = frame_for_sample().await;
        let start = at(1, 0, 0) - chrono::TimeDelta::minutes(30);
        let end = at(1, 0, 30);
        let df = filter_dates(frame, start.date(), end.date())
            .collect()
            .expect("collect");
        let rows = extract_rows(&df, "45005")?;

        // Both dates are kept by the date filter; the exact window is applied later.
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[0].time,
            NaiveDate::from_ymd_opt(2024, 12, 31)
                .unwrap()
                .and_hms_opt(23, 0, 0)
                .unwrap()
        );
        assert_eq!(rows[1].temperature, Some(11.5));
        assert_eq!(rows[2].wind_direction, None);
        Ok(())
    }

    #[tokio::test]
    async fn filter_dates_drops_other_days() {
        let frame = frame_for_sample().await;
        let df = filter_dates(frame, at(1, 0, 0).date(), at(1, 0, 0).date())
            .collect()
            .expect("collect");
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 6);
    }

    #[tokio::test]
    async fn hourly_applies_the_exact_window() -> Result<(), ObservationError> {
        let tmp = tempfile::tempdir().expect("temp dir");
        let fetcher = FrameFetcher::new(tmp.path(), Duration::from_secs(3600));
        // Seed the parquet cache so no download happens.
        let mut df = HourlyDataLoader::csv_to_dataframe(SAMPLE_CSV.as_bytes().to_vec(), "45005").await?;
        let file = std::fs::File::create(tmp.path().join("hourly-45005.parquet")).expect("create");
        ParquetWriter::new(file).finish(&mut df).expect("write parquet");

        let source = MeteostatObservationSource::from_fetcher(fetcher);
        let target = at(1, 0, 0);
        let rows = source
            .hourly(
                "45005",
                target - chrono::TimeDelta::minutes(30),
                target + chrono::TimeDelta::minutes(30),
            )
            .await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time, target);
        assert_eq!(rows[0].wind_speed, Some(7.2));

        // The second query is served from the in-memory frame cache.
        source.hourly("45005", at(1, 11, 30), at(1, 12, 30)).await?;
        assert_eq!(source.fetcher.cached_stations().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn missing_station_yields_no_rows() -> Result<(), ObservationError> {
        let tmp = tempfile::tempdir().expect("temp dir");
        let loader = HourlyDataLoader::new(tmp.path(), Duration::from_secs(3600))
            .with_base_url("http://127.0.0.1:9");
        let fetcher = FrameFetcher::from_loader(loader);
        fetcher.mark_missing("99999").await;
        let source = MeteostatObservationSource::from_fetcher(fetcher);

        let target = at(1, 0, 0);
        let window = chrono::TimeDelta::minutes(30);
        for _ in 0..2 {
            let rows = source.hourly("99999", target - window, target + window).await?;
            assert!(rows.is_empty());
        }
        assert!(!tmp.path().join("hourly-99999.parquet").exists());
        Ok(())
    }

    #[tokio::test]
    #[ignore = "downloads hourly data from bulk.meteostat.net"]
    async fn fetches_real_hong_kong_observations() -> Result<(), ObservationError> {
        let cache_dir = crate::utils::get_cache_dir().expect("cache dir");
        let source = MeteostatObservationSource::new(&cache_dir, Duration::from_secs(24 * 3600));
        let target = NaiveDate::from_ymd_opt(2023, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let rows = source
            .hourly(
                "45005",
                target - chrono::TimeDelta::minutes(30),
                target + chrono::TimeDelta::minutes(30),
            )
            .await?;
        assert!(rows.len() <= 1);
        Ok(())
    }
}
