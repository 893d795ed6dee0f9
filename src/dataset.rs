//! Accumulated observations of a whole run, written once as CSV.

use crate::error::DatasetError;
use crate::types::snapshot::WeatherSnapshot;
use log::info;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// CSV header, in column order.
pub const CSV_COLUMNS: [&str; 9] = ["T", "Td", "ff", "dd", "station_id", "lat", "lon", "name", "datetime"];

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Every non-empty snapshot of a run, in processing order.
#[derive(Debug, Default, Clone)]
pub struct YearlyDataset {
    snapshots: Vec<WeatherSnapshot>,
}

impl YearlyDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a snapshot. Empty snapshots are ignored.
    pub fn push(&mut self, snapshot: WeatherSnapshot) {
        if !snapshot.is_empty() {
            self.snapshots.push(snapshot);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn row_count(&self) -> usize {
        self.snapshots.iter().map(WeatherSnapshot::len).sum()
    }

    /// One row per selected observation. `datetime` is the snapshot target,
    /// not the time of the chosen row.
    pub fn to_dataframe(&self) -> Result<DataFrame, DatasetError> {
        let rows = self
            .snapshots
            .iter()
            .flat_map(|s| s.observations.iter().map(move |o| (s.datetime, o)));

        let capacity = self.row_count();
        let mut temperature = Vec::with_capacity(capacity);
        let mut dew_point = Vec::with_capacity(capacity);
        let mut wind_speed = Vec::with_capacity(capacity);
        let mut wind_direction = Vec::with_capacity(capacity);
        let mut station_id = Vec::with_capacity(capacity);
        let mut latitude = Vec::with_capacity(capacity);
        let mut longitude = Vec::with_capacity(capacity);
        let mut name = Vec::with_capacity(capacity);
        let mut datetime = Vec::with_capacity(capacity);

        for (target, observation) in rows {
            temperature.push(observation.temperature);
            dew_point.push(observation.dew_point);
            wind_speed.push(observation.wind_speed);
            wind_direction.push(observation.wind_direction);
            station_id.push(observation.station.id.clone());
            latitude.push(observation.station.latitude);
            longitude.push(observation.station.longitude);
            name.push(observation.station.name.clone());
            datetime.push(target.format(DATETIME_FORMAT).to_string());
        }

        df!(
            CSV_COLUMNS[0] => temperature,
            CSV_COLUMNS[1] => dew_point,
            CSV_COLUMNS[2] => wind_speed,
            CSV_COLUMNS[3] => wind_direction,
            CSV_COLUMNS[4] => station_id,
            CSV_COLUMNS[5] => latitude,
            CSV_COLUMNS[6] => longitude,
            CSV_COLUMNS[7] => name,
            CSV_COLUMNS[8] => datetime,
        )
        .map_err(DatasetError::Frame)
    }

    /// Writes the dataset with a header row. Returns the number of data rows.
    pub fn write_csv(&self, path: &Path) -> Result<usize, DatasetError> {
        let mut df = self.to_dataframe()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| DatasetError::CsvCreate(parent.to_path_buf(), e))?;
        }
        let mut file =
            File::create(path).map_err(|e| DatasetError::CsvCreate(path.to_path_buf(), e))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| DatasetError::CsvWrite(path.to_path_buf(), e))?;
        info!("Saved {} rows to {}", df.height(), path.display());
        Ok(df.height())
    }
}
