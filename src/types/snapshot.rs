use crate::types::observation::SelectedObservation;
use chrono::NaiveDateTime;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Why a station contributed no row to a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// The source returned no rows inside the observation window.
    NoData,
    /// Rows were found, but every one of them misses T, Td, ff or dd.
    NoCompleteRows,
    /// Fetching or parsing the station's data failed.
    FetchFailed(String),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData => write!(f, "no data"),
            SkipReason::NoCompleteRows => write!(f, "no complete observations"),
            SkipReason::FetchFailed(message) => write!(f, "fetch failed: {message}"),
        }
    }
}

/// A station that was left out of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedStation {
    pub station_id: String,
    pub reason: SkipReason,
}

/// Per-station result of the nearest-observation selection.
#[derive(Debug, Clone, PartialEq)]
pub enum StationOutcome {
    Selected(SelectedObservation),
    Skipped(SkippedStation),
}

/// All selected observations for a single target datetime.
///
/// Observations keep the order in which the station directory listed the
/// stations. A snapshot with no observations is valid and simply means no
/// station had usable data.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub datetime: NaiveDateTime,
    pub observations: Vec<SelectedObservation>,
    pub skipped: Vec<SkippedStation>,
}

impl WeatherSnapshot {
    pub fn new(datetime: NaiveDateTime) -> Self {
        Self {
            datetime,
            observations: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Assembles a snapshot from per-station outcomes, preserving their order.
    pub fn from_outcomes(
        datetime: NaiveDateTime,
        outcomes: impl IntoIterator<Item = StationOutcome>,
    ) -> Self {
        let mut snapshot = Self::new(datetime);
        for outcome in outcomes {
            match outcome {
                StationOutcome::Selected(observation) => snapshot.observations.push(observation),
                StationOutcome::Skipped(skipped) => snapshot.skipped.push(skipped),
            }
        }
        snapshot
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::observation::{Measurements, SelectedObservation};
    use crate::types::station::Station;
    use chrono::NaiveDate;

    #[test]
    fn from_outcomes_splits_and_keeps_order() {
        let dt = NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let measurements = Measurements {
            temperature: 20.0,
            dew_point: 15.0,
            wind_speed: 12.0,
            wind_direction: 180.0,
        };
        let outcomes = vec![
            StationOutcome::Selected(SelectedObservation::new(
                Station::new("b", "B", 22.0, 114.0),
                dt,
                measurements,
            )),
            StationOutcome::Skipped(SkippedStation {
                station_id: "c".into(),
                reason: SkipReason::NoData,
            }),
            StationOutcome::Selected(SelectedObservation::new(
                Station::new("a", "A", 23.0, 113.0),
                dt,
                measurements,
            )),
        ];

        let snapshot = WeatherSnapshot::from_outcomes(dt, outcomes);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.observations[0].station.id, "b");
        assert_eq!(snapshot.observations[1].station.id, "a");
        assert_eq!(snapshot.skipped.len(), 1);
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn skip_reason_display() {
        assert_eq!(SkipReason::NoData.to_string(), "no data");
        assert_eq!(
            SkipReason::FetchFailed("HTTP 404".into()).to_string(),
            "fetch failed: HTTP 404"
        );
    }
}
