//! Immutable run configuration shared by every stage of the pipeline.
//!
//! A [`PlotterConfig`] is built once (usually through [`PlotterConfig::builder`])
//! and passed by reference to the station directory, the renderer and the
//! driver. Nothing mutates it after construction.

use crate::render::basemap::BasemapScale;
use bon::Builder;
use chrono::TimeDelta;
use geo::{coord, Rect};
use std::path::PathBuf;
use std::time::Duration;

/// A rectangular latitude/longitude region, in decimal degrees.
///
/// Both bounds are inclusive.
///
/// # Examples
///
/// ```
/// use weather_map_plotter::BoundingBox;
///
/// let bounds = BoundingBox::new(21.0, 34.0, 110.0, 120.0);
/// assert!(bounds.contains(25.03, 121.0 - 1.5));
/// assert!(!bounds.contains(35.0, 115.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    pub const fn new(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
        }
    }

    /// Coastal southern China, Taiwan and the northern South China Sea.
    pub const SOUTH_CHINA: BoundingBox = BoundingBox::new(21.0, 34.0, 110.0, 120.0);

    /// North-west corner as `(lat, lon)`.
    pub fn top_left(&self) -> (f64, f64) {
        (self.lat_max, self.lon_min)
    }

    /// South-east corner as `(lat, lon)`.
    pub fn bottom_right(&self) -> (f64, f64) {
        (self.lat_min, self.lon_max)
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.lat_min
            && latitude <= self.lat_max
            && longitude >= self.lon_min
            && longitude <= self.lon_max
    }

    /// The box as a `geo` rectangle, x = longitude, y = latitude.
    pub(crate) fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.lon_min, y: self.lat_min },
            coord! { x: self.lon_max, y: self.lat_max },
        )
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::SOUTH_CHINA
    }
}

/// Output image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapSize {
    pub width: u32,
    pub height: u32,
}

impl Default for MapSize {
    fn default() -> Self {
        Self {
            width: 1500,
            height: 1500,
        }
    }
}

/// Configuration for a full run.
///
/// Every field has a default, so `PlotterConfig::default()` reproduces the
/// stock run: year 2025, every third day, 00:00 and 12:00 UTC.
///
/// # Examples
///
/// ```
/// use weather_map_plotter::PlotterConfig;
///
/// let config = PlotterConfig::builder()
///     .year(2024)
///     .interval_days(7)
///     .output_dir("out/maps")
///     .build();
///
/// assert_eq!(config.year, 2024);
/// assert_eq!(config.hours, vec![0, 12]);
/// assert_eq!(config.csv_path.to_str(), Some("weather.csv"));
/// ```
#[derive(Debug, Clone, Builder)]
pub struct PlotterConfig {
    #[builder(default)]
    pub bounds: BoundingBox,

    #[builder(default)]
    pub map_size: MapSize,

    #[builder(into, default = PathBuf::from("maps"))]
    pub output_dir: PathBuf,

    #[builder(into, default = PathBuf::from("weather.csv"))]
    pub csv_path: PathBuf,

    #[builder(default = 2025)]
    pub year: i32,

    #[builder(default = 3)]
    pub interval_days: u32,

    /// Hours of day (UTC) rendered for every scheduled date.
    #[builder(default = vec![0, 12])]
    pub hours: Vec<u32>,

    /// Half-width of the observation window around each target time.
    #[builder(default = TimeDelta::minutes(30))]
    pub window: TimeDelta,

    /// Where station metadata, hourly parquet files and basemap layers are cached.
    /// `None` resolves to the system cache directory.
    #[builder(into)]
    pub cache_dir: Option<PathBuf>,

    #[builder(default = Duration::from_secs(24 * 60 * 60))]
    pub cache_max_age: Duration,

    #[builder(default)]
    pub basemap_scale: BasemapScale,
}

impl Default for PlotterConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
