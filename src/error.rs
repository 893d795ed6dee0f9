use crate::observations::error::ObservationError;
use crate::render::error::{BasemapError, RenderError};
use crate::stations::error::StationDirectoryError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to build dataset frame")]
    Frame(#[source] PolarsError),

    #[error("Failed to create CSV file '{0}'")]
    CsvCreate(PathBuf, #[source] std::io::Error),

    #[error("Failed to write CSV file '{0}'")]
    CsvWrite(PathBuf, #[source] PolarsError),
}

#[derive(Debug, Error)]
pub enum PlotterError {
    #[error(transparent)]
    StationDirectory(#[from] StationDirectoryError),

    #[error(transparent)]
    Observation(#[from] ObservationError),

    #[error(transparent)]
    Basemap(#[from] BasemapError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}
