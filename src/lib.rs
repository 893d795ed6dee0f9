mod config;
mod dataset;
mod driver;
mod error;
mod observations;
mod render;
mod selection;
mod stations;
mod types;
mod utils;

pub use config::{BoundingBox, MapSize, PlotterConfig};
pub use dataset::{YearlyDataset, CSV_COLUMNS};
pub use driver::{schedule, RunSummary, YearlyDriver};
pub use error::{DatasetError, PlotterError};
pub use selection::{nearest_observation, NearestObservationSelector};
pub use utils::{ensure_dir_exists, get_cache_dir};

pub use observations::error::ObservationError;
pub use observations::source::{MeteostatObservationSource, ObservationSource};

pub use stations::directory::{MeteostatStationDirectory, StationDirectory};
pub use stations::error::StationDirectoryError;

pub use render::basemap::{Basemap, BasemapScale};
pub use render::error::{BasemapError, RenderError};
pub use render::wind::{barb_glyph, kmh_to_knots, wind_components, BarbCounts, BarbGlyph, WindComponents};
pub use render::{map_file_path, MapRenderer, RenderOutcome, StationPlotRenderer};

pub use types::observation::{Measurements, ObservationRow, SelectedObservation};
pub use types::snapshot::{SkipReason, SkippedStation, StationOutcome, WeatherSnapshot};
pub use types::station::Station;
