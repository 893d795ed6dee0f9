//! Nearest-in-time observation selection.

use crate::observations::source::ObservationSource;
use crate::types::observation::{Measurements, ObservationRow, SelectedObservation};
use crate::types::snapshot::{SkipReason, SkippedStation, StationOutcome, WeatherSnapshot};
use crate::types::station::Station;
use chrono::{NaiveDateTime, TimeDelta};
use log::{debug, info, warn};

/// Picks the complete row closest to `target` within `target ± window`.
///
/// Bounds are inclusive. Among equidistant rows the earliest timestamp wins;
/// rows sharing a timestamp keep their input order.
pub fn nearest_observation(
    rows: &[ObservationRow],
    target: NaiveDateTime,
    window: TimeDelta,
) -> Result<(NaiveDateTime, Measurements), SkipReason> {
    let start = target - window;
    let end = target + window;

    let mut in_window = rows
        .iter()
        .filter(|row| row.time >= start && row.time <= end)
        .peekable();
    if in_window.peek().is_none() {
        return Err(SkipReason::NoData);
    }

    in_window
        .filter_map(|row| row.complete().map(|m| (row.time, m)))
        .min_by_key(|(time, _)| ((*time - target).abs(), *time))
        .ok_or(SkipReason::NoCompleteRows)
}

/// Builds snapshots by asking an [`ObservationSource`] for each station's rows.
pub struct NearestObservationSelector<'a, S> {
    source: &'a S,
    window: TimeDelta,
}

impl<'a, S: ObservationSource> NearestObservationSelector<'a, S> {
    pub fn new(source: &'a S, window: TimeDelta) -> Self {
        Self { source, window }
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// Selects one observation for `station`, or reports why it was skipped.
    pub async fn select(&self, station: &Station, target: NaiveDateTime) -> StationOutcome {
        let rows = match self
            .source
            .hourly(&station.id, target - self.window, target + self.window)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!("Failed to fetch data for station {}: {}", station.id, e);
                return skipped(station, SkipReason::FetchFailed(e.to_string()));
            }
        };

        match nearest_observation(&rows, target, self.window) {
            Ok((time, measurements)) => {
                debug!("Station {}: using observation at {}", station.id, time);
                StationOutcome::Selected(SelectedObservation::new(
                    station.clone(),
                    time,
                    measurements,
                ))
            }
            Err(reason) => {
                info!("No valid data for station {} at {}: {}", station.id, target, reason);
                skipped(station, reason)
            }
        }
    }

    /// Runs [`select`](Self::select) for every station in order.
    pub async fn snapshot(&self, stations: &[Station], target: NaiveDateTime) -> WeatherSnapshot {
        let mut outcomes = Vec::with_capacity(stations.len());
        for station in stations {
            outcomes.push(self.select(station, target).await);
        }
        WeatherSnapshot::from_outcomes(target, outcomes)
    }
}

fn skipped(station: &Station, reason: SkipReason) -> StationOutcome {
    StationOutcome::Skipped(SkippedStation {
        station_id: station.id.clone(),
        reason,
    })
}
