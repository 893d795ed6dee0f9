//! Year-long orchestration: schedule, select, render, save.

use crate::config::PlotterConfig;
use crate::dataset::YearlyDataset;
use crate::error::PlotterError;
use crate::observations::source::ObservationSource;
use crate::render::{MapRenderer, RenderOutcome};
use crate::selection::NearestObservationSelector;
use crate::stations::directory::StationDirectory;
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use log::{error, info, warn};
use std::fmt;

/// Target datetimes for a year: every `interval_days` from January 1st, at each
/// of `hours`, in chronological date order.
///
/// ```
/// use weather_map_plotter::schedule;
///
/// assert_eq!(schedule(2024, 3, &[0, 12]).unwrap().len(), 244);
/// assert_eq!(schedule(2025, 5, &[0, 12]).unwrap().len(), 146);
/// assert!(schedule(2025, 0, &[0]).is_err());
/// ```
pub fn schedule(year: i32, interval_days: u32, hours: &[u32]) -> Result<Vec<NaiveDateTime>, PlotterError> {
    if interval_days == 0 {
        return Err(PlotterError::InvalidSchedule(
            "interval_days must be at least 1".to_string(),
        ));
    }
    if let Some(hour) = hours.iter().find(|h| **h > 23) {
        return Err(PlotterError::InvalidSchedule(format!(
            "hour {} is outside 0..=23",
            hour
        )));
    }
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| PlotterError::InvalidSchedule(format!("year {} is out of range", year)))?;

    let step = TimeDelta::days(i64::from(interval_days));
    let mut datetimes = Vec::new();
    let mut date = start;
    while date.year() == year {
        for hour in hours {
            if let Some(datetime) = date.and_hms_opt(*hour, 0, 0) {
                datetimes.push(datetime);
            }
        }
        date = match date.checked_add_signed(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(datetimes)
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub datetimes_processed: usize,
    pub snapshots_with_data: usize,
    pub maps_written: usize,
    pub maps_skipped: usize,
    pub render_failures: usize,
    pub directory_failures: usize,
    pub station_skips: usize,
    pub csv_rows: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} datetimes processed, {} with data, {} maps written, {} maps skipped, \
             {} render failures, {} station lookups failed, {} station skips, {} CSV rows",
            self.datetimes_processed,
            self.snapshots_with_data,
            self.maps_written,
            self.maps_skipped,
            self.render_failures,
            self.directory_failures,
            self.station_skips,
            self.csv_rows
        )
    }
}

/// Runs the whole pipeline for the configured year.
pub struct YearlyDriver<'a, D, S, R> {
    config: &'a PlotterConfig,
    directory: &'a D,
    source: &'a S,
    renderer: &'a R,
}

impl<'a, D, S, R> YearlyDriver<'a, D, S, R>
where
    D: StationDirectory,
    S: ObservationSource,
    R: MapRenderer,
{
    pub fn new(config: &'a PlotterConfig, directory: &'a D, source: &'a S, renderer: &'a R) -> Self {
        Self {
            config,
            directory,
            source,
            renderer,
        }
    }

    /// Processes every scheduled datetime and writes the CSV if anything was selected.
    ///
    /// Per-datetime failures are logged and counted; only an invalid schedule or
    /// a failed CSV write ends the run with an error.
    pub async fn run(&self) -> Result<RunSummary, PlotterError> {
        let datetimes = schedule(self.config.year, self.config.interval_days, &self.config.hours)?;
        info!(
            "Processing {} datetimes for {} (every {} days at hours {:?})",
            datetimes.len(),
            self.config.year,
            self.config.interval_days,
            self.config.hours
        );

        let selector = NearestObservationSelector::new(self.source, self.config.window);
        let mut dataset = YearlyDataset::new();
        let mut summary = RunSummary::default();

        for datetime in datetimes {
            info!("Processing {}", datetime);
            summary.datetimes_processed += 1;

            let stations = match self.directory.stations_in(&self.config.bounds).await {
                Ok(stations) => stations,
                Err(e) => {
                    error!("Failed to list stations for {}: {}", datetime, e);
                    summary.directory_failures += 1;
                    continue;
                }
            };

            let snapshot = selector.snapshot(&stations, datetime).await;
            summary.station_skips += snapshot.skipped.len();
            if snapshot.is_empty() {
                info!("No data for {}", datetime);
                continue;
            }
            summary.snapshots_with_data += 1;

            match self.renderer.render(&snapshot) {
                Ok(RenderOutcome::Written(_)) => summary.maps_written += 1,
                Ok(RenderOutcome::Skipped) => summary.maps_skipped += 1,
                Err(e) => {
                    error!("Failed to render map for {}: {}", datetime, e);
                    summary.render_failures += 1;
                }
            }
            dataset.push(snapshot);
        }

        if dataset.is_empty() {
            warn!("No data to save");
        } else {
            summary.csv_rows = dataset.write_csv(&self.config.csv_path)?;
        }

        info!("Run finished: {}", summary);
        Ok(summary)
    }
}
