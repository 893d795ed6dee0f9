//! Station-plot map rendering.

pub mod basemap;
pub mod error;
pub mod wind;

use crate::config::{BoundingBox, MapSize, PlotterConfig};
use crate::render::basemap::Basemap;
use crate::render::error::RenderError;
use crate::render::wind::{barb_glyph, kmh_to_knots, wind_components, BarbGlyph};
use crate::types::observation::SelectedObservation;
use crate::types::snapshot::WeatherSnapshot;
use chrono::NaiveDateTime;
use log::{info, warn};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error;
use std::path::{Path, PathBuf};

const OCEAN: RGBColor = RGBColor(176, 196, 222);
const LAND: RGBColor = RGBColor(245, 245, 245);
const BORDER: RGBColor = RGBColor(128, 128, 128);
const TEMPERATURE: RGBColor = RGBColor(139, 0, 0);
const DEW_POINT: RGBColor = RGBColor(0, 100, 0);
const STATION_ID: RGBColor = RGBColor(211, 211, 211);

const BARB_LENGTH: f64 = 40.0;
const LABEL_OFFSET: i32 = 8;

/// Result of rendering one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    Written(PathBuf),
    /// Nothing plottable remained after dropping non-finite rows.
    Skipped,
}

/// Turns a snapshot into a map file.
pub trait MapRenderer {
    fn render(&self, snapshot: &WeatherSnapshot) -> Result<RenderOutcome, RenderError>;
}

/// `<output_dir>/<YYYY-MM-DD_HHMM>_weather_map.png`
pub fn map_file_path(output_dir: &Path, datetime: NaiveDateTime) -> PathBuf {
    output_dir.join(format!(
        "{}_weather_map.png",
        datetime.format("%Y-%m-%d_%H%M")
    ))
}

/// Draws T, Td, a wind barb and the station id around each station on a
/// plate carrée map of the configured bounding box.
pub struct StationPlotRenderer {
    output_dir: PathBuf,
    size: MapSize,
    bounds: BoundingBox,
    basemap: Basemap,
}

impl StationPlotRenderer {
    /// Creates the output directory if needed.
    pub fn new(config: &PlotterConfig, basemap: Basemap) -> Result<Self, RenderError> {
        std::fs::create_dir_all(&config.output_dir)
            .map_err(|e| RenderError::OutputDir(config.output_dir.clone(), e))?;
        if basemap.is_empty() {
            warn!("Rendering without land, coastline and border layers");
        }
        Ok(Self {
            output_dir: config.output_dir.clone(),
            size: config.map_size,
            bounds: config.bounds,
            basemap,
        })
    }

    fn draw(
        &self,
        path: &Path,
        datetime: NaiveDateTime,
        observations: &[&SelectedObservation],
    ) -> Result<(), Box<dyn Error>> {
        let root =
            BitMapBackend::new(path, (self.size.width, self.size.height)).into_drawing_area();
        root.fill(&WHITE)?;

        let title = format!("Weather map for {}", datetime.format("%Y-%m-%d %H:%M"));
        let mut chart = ChartBuilder::on(&root)
            .caption(
                title,
                FontDesc::new(FontFamily::SansSerif, 40.0, FontStyle::Bold),
            )
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(
                self.bounds.lon_min..self.bounds.lon_max,
                self.bounds.lat_min..self.bounds.lat_max,
            )?;

        chart.plotting_area().fill(&OCEAN)?;
        chart.draw_series(
            self.basemap
                .land
                .iter()
                .map(|ring| Polygon::new(ring.clone(), LAND.filled())),
        )?;
        chart.draw_series(
            self.basemap
                .holes
                .iter()
                .map(|ring| Polygon::new(ring.clone(), OCEAN.filled())),
        )?;
        chart.draw_series(
            self.basemap
                .borders
                .iter()
                .map(|line| PathElement::new(line.clone(), BORDER.stroke_width(1))),
        )?;
        chart.draw_series(
            self.basemap
                .coastlines
                .iter()
                .map(|line| PathElement::new(line.clone(), BLACK.stroke_width(1))),
        )?;

        chart
            .configure_mesh()
            .x_labels(12)
            .y_labels(14)
            .x_label_formatter(&|lon| format!("{:.0}°E", lon))
            .y_label_formatter(&|lat| format!("{:.0}°N", lat))
            .bold_line_style(BLACK.mix(0.15))
            .light_line_style(TRANSPARENT)
            .label_style(("sans-serif", 18))
            .draw()?;

        let value_font = FontDesc::new(FontFamily::SansSerif, 20.0, FontStyle::Bold);
        let id_font = FontDesc::new(FontFamily::SansSerif, 14.0, FontStyle::Normal);

        for observation in observations {
            let (x, y) = chart.backend_coord(&(
                observation.station.longitude,
                observation.station.latitude,
            ));

            let temperature = value_font
                .color(&TEMPERATURE)
                .pos(Pos::new(HPos::Right, VPos::Bottom));
            root.draw(&Text::new(
                format!("{:.0}", observation.temperature),
                (x - LABEL_OFFSET, y - LABEL_OFFSET),
                temperature,
            ))?;

            let dew_point = value_font
                .color(&DEW_POINT)
                .pos(Pos::new(HPos::Right, VPos::Top));
            root.draw(&Text::new(
                format!("{:.0}", observation.dew_point),
                (x - LABEL_OFFSET, y + LABEL_OFFSET),
                dew_point,
            ))?;

            let id = id_font
                .color(&STATION_ID)
                .pos(Pos::new(HPos::Left, VPos::Center));
            root.draw(&Text::new(
                observation.station.id.clone(),
                (x + LABEL_OFFSET * 2, y),
                id,
            ))?;

            let components = wind_components(
                kmh_to_knots(observation.wind_speed),
                observation.wind_direction,
            );
            draw_barb(&root, (x, y), barb_glyph(components, BARB_LENGTH))?;
        }

        root.present()?;
        Ok(())
    }
}

fn draw_barb<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    (x, y): (i32, i32),
    glyph: BarbGlyph,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let shift = |(dx, dy): (i32, i32)| (x + dx, y + dy);
    match glyph {
        BarbGlyph::Calm { radius } => {
            root.draw(&Circle::new((x, y), radius, BLACK.stroke_width(2)))?;
        }
        BarbGlyph::Barb {
            staff,
            flags,
            barbs,
        } => {
            root.draw(&PathElement::new(
                vec![shift(staff.0), shift(staff.1)],
                BLACK.stroke_width(2),
            ))?;
            for triangle in flags {
                root.draw(&Polygon::new(
                    triangle.iter().map(|p| shift(*p)).collect::<Vec<_>>(),
                    BLACK.filled(),
                ))?;
            }
            for (from, to) in barbs {
                root.draw(&PathElement::new(
                    vec![shift(from), shift(to)],
                    BLACK.stroke_width(2),
                ))?;
            }
        }
    }
    Ok(())
}

impl MapRenderer for StationPlotRenderer {
    fn render(&self, snapshot: &WeatherSnapshot) -> Result<RenderOutcome, RenderError> {
        let plottable: Vec<&SelectedObservation> = snapshot
            .observations
            .iter()
            .filter(|o| o.is_plottable())
            .collect();
        if plottable.is_empty() {
            info!("No plottable data for {}", snapshot.datetime);
            return Ok(RenderOutcome::Skipped);
        }

        let path = map_file_path(&self.output_dir, snapshot.datetime);
        self.draw(&path, snapshot.datetime, &plottable)
            .map_err(|e| RenderError::Draw {
                path: path.clone(),
                message: e.to_string(),
            })?;
        info!("Saved map to {}", path.display());
        Ok(RenderOutcome::Written(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::observation::Measurements;
    use crate::types::station::Station;
    use chrono::NaiveDate;

    fn datetime() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn observation(temperature: f64) -> SelectedObservation {
        SelectedObservation::new(
            Station::new("45005", "Hong Kong Observatory", 22.3, 114.17),
            datetime(),
            Measurements {
                temperature,
                dew_point: 12.0,
                wind_speed: 36.0,
                wind_direction: 45.0,
            },
        )
    }

    fn renderer(dir: &Path) -> StationPlotRenderer {
        let config = PlotterConfig::builder()
            .output_dir(dir.join("maps"))
            .map_size(MapSize {
                width: 600,
                height: 600,
            })
            .build();
        StationPlotRenderer::new(&config, Basemap::empty()).expect("renderer")
    }

    #[test]
    fn file_name_is_derived_from_datetime() {
        let path = map_file_path(Path::new("maps"), datetime());
        assert_eq!(path, PathBuf::from("maps/2025-01-01_1200_weather_map.png"));
    }

    #[test]
    fn new_creates_output_dir() {
        let tmp = tempfile::tempdir().expect("temp dir");
        renderer(tmp.path());
        assert!(tmp.path().join("maps").is_dir());
    }

    #[test]
    fn non_finite_rows_only_skip_the_render() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let renderer = renderer(tmp.path());
        let mut snapshot = WeatherSnapshot::new(datetime());
        snapshot.observations.push(observation(f64::INFINITY));

        let outcome = renderer.render(&snapshot).expect("render");
        assert_eq!(outcome, RenderOutcome::Skipped);
        assert!(!map_file_path(&tmp.path().join("maps"), datetime()).exists());
    }

    #[test]
    #[ignore = "needs system fonts"]
    fn writes_png_for_station() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let renderer = renderer(tmp.path());
        let mut snapshot = WeatherSnapshot::new(datetime());
        snapshot.observations.push(observation(18.4));

        let outcome = renderer.render(&snapshot).expect("render");
        let expected = map_file_path(&tmp.path().join("maps"), datetime());
        assert_eq!(outcome, RenderOutcome::Written(expected.clone()));
        assert!(std::fs::metadata(expected).unwrap().len() > 0);
    }
}
