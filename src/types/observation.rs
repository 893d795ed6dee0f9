use crate::types::station::Station;
use chrono::NaiveDateTime;

/// One hourly observation as fetched from the observation source.
///
/// Every measurement may be missing. `NaN` values are treated the same as
/// `None` by [`ObservationRow::complete`].
#[derive(Debug, PartialEq, Clone)]
pub struct ObservationRow {
    /// Observation time, UTC.
    pub time: NaiveDateTime,
    /// Air temperature, °C.
    pub temperature: Option<f64>,
    /// Dew point, °C.
    pub dew_point: Option<f64>,
    /// Average wind speed, km/h.
    pub wind_speed: Option<f64>,
    /// Wind direction the wind blows from, degrees.
    pub wind_direction: Option<f64>,
}

/// The four measurements a station plot needs, all present.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Measurements {
    pub temperature: f64,
    pub dew_point: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
}

impl ObservationRow {
    /// Returns the measurements if all of T, Td, ff and dd are present and not NaN.
    pub fn complete(&self) -> Option<Measurements> {
        fn present(value: Option<f64>) -> Option<f64> {
            value.filter(|v| !v.is_nan())
        }
        Some(Measurements {
            temperature: present(self.temperature)?,
            dew_point: present(self.dew_point)?,
            wind_speed: present(self.wind_speed)?,
            wind_direction: present(self.wind_direction)?,
        })
    }
}

/// The single observation chosen for a station at a snapshot's target time.
#[derive(Debug, PartialEq, Clone)]
pub struct SelectedObservation {
    pub station: Station,
    /// Time of the chosen row (may differ from the snapshot target).
    pub time: NaiveDateTime,
    pub temperature: f64,
    pub dew_point: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
}

impl SelectedObservation {
    pub fn new(station: Station, time: NaiveDateTime, measurements: Measurements) -> Self {
        Self {
            station,
            time,
            temperature: measurements.temperature,
            dew_point: measurements.dew_point,
            wind_speed: measurements.wind_speed,
            wind_direction: measurements.wind_direction,
        }
    }

    /// True when every numeric field, including the location, is finite.
    pub fn is_plottable(&self) -> bool {
        [
            self.temperature,
            self.dew_point,
            self.wind_speed,
            self.wind_direction,
            self.station.latitude,
            self.station.longitude,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}
