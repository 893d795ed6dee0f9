//! Weather station records: the raw Meteostat metadata shape and the slim
//! [`Station`] the rest of the pipeline works with. Also includes the `rstar`
//! implementation used to index stations for bounding-box queries.

use rstar::{RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A weather station inside (or considered for) the map region.
///
/// Immutable once fetched from the station directory.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Station {
    /// The Meteostat station identifier (e.g. "59287").
    pub id: String,
    /// Human readable station name.
    pub name: String,
    /// Latitude in decimal degrees (positive for North).
    pub latitude: f64,
    /// Longitude in decimal degrees (positive for East).
    pub longitude: f64,
}

impl Station {
    pub fn new(id: impl Into<String>, name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

/// One entry of the Meteostat `stations/lite.json.gz` listing.
///
/// Only the fields the directory needs are deserialized; the rest of the
/// record (identifiers, inventory, timezone) is ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct MeteostatStation {
    pub id: String,
    /// Station names keyed by language code (e.g. {"en": "Hong Kong Observatory"}).
    #[serde(default)]
    pub name: HashMap<String, String>,
    pub location: MeteostatLocation,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MeteostatLocation {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<MeteostatStation> for Station {
    fn from(raw: MeteostatStation) -> Self {
        // Prefer English, then any name in a stable order, then the id itself.
        let name = raw.name.get("en").cloned().or_else(|| {
            let mut names: Vec<(&String, &String)> = raw.name.iter().collect();
            names.sort();
            names.first().map(|(_, name)| name.to_string())
        });
        Station {
            name: name.unwrap_or_else(|| raw.id.clone()),
            id: raw.id,
            latitude: raw.location.latitude,
            longitude: raw.location.longitude,
        }
    }
}

/// Lets `rstar` index a `Station` as a point at `[latitude, longitude]`.
impl RTreeObject for Station {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.latitude, self.longitude])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lite_json_record() {
        let json = r#"{
            "id": "45005",
            "country": "HK",
            "region": null,
            "timezone": "Asia/Hong_Kong",
            "name": {"en": "Hong Kong Observatory", "zh": "香港天文台"},
            "identifiers": {"national": null, "wmo": "45005", "icao": null},
            "location": {"latitude": 22.3, "longitude": 114.1667, "elevation": 32},
            "inventory": {
                "daily": {"start": "1884-01-01", "end": "2024-12-31"},
                "hourly": {"start": "1884-01-01", "end": "2024-12-31"},
                "model": {"start": null, "end": null},
                "monthly": {"start": 1884, "end": 2024},
                "normals": {"start": 1991, "end": 2020}
            }
        }"#;
        let raw: MeteostatStation = serde_json::from_str(json).unwrap();
        let station = Station::from(raw);
        assert_eq!(
            station,
            Station::new("45005", "Hong Kong Observatory", 22.3, 114.1667)
        );
    }

    #[test]
    fn name_falls_back_to_other_language_then_id() {
        let only_zh: MeteostatStation = serde_json::from_str(
            r#"{"id": "59287", "name": {"zh": "广州"}, "location": {"latitude": 23.2, "longitude": 113.5}}"#,
        )
        .unwrap();
        assert_eq!(Station::from(only_zh).name, "广州");

        let unnamed: MeteostatStation = serde_json::from_str(
            r#"{"id": "59287", "location": {"latitude": 23.2, "longitude": 113.5}}"#,
        )
        .unwrap();
        assert_eq!(Station::from(unnamed).name, "59287");
    }

    #[test]
    fn envelope_is_the_station_point() {
        let station = Station::new("1", "x", 22.0, 114.0);
        let envelope = station.envelope();
        assert_eq!(envelope.lower(), [22.0, 114.0]);
        assert_eq!(envelope.upper(), [22.0, 114.0]);
    }
}
