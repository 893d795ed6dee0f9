//! Natural Earth land, coastline and border layers, clipped to the map extent.
//!
//! Layers are downloaded as GeoJSON from the `nvkelso/natural-earth-vector`
//! repository, cached on disk and reduced to plain `(lon, lat)` rings and
//! polylines that lie inside the [`BoundingBox`].

use crate::config::BoundingBox;
use crate::render::error::BasemapError;
use crate::utils::is_fresh;
use geo::{
    BooleanOps, BoundingRect, Geometry, Intersects, LineString, MultiLineString, MultiPolygon,
    Polygon, Rect,
};
use geojson::FeatureCollection;
use log::{debug, info, warn};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

const NATURAL_EARTH_URL: &str =
    "https://raw.githubusercontent.com/nvkelso/natural-earth-vector/master/geojson";
const BASEMAP_DIR_NAME: &str = "basemap";

/// A `(lon, lat)` pair.
pub type Point = (f64, f64);

/// Natural Earth resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BasemapScale {
    /// 1:10m
    #[default]
    Fine,
    /// 1:50m
    Medium,
    /// 1:110m
    Coarse,
}

impl BasemapScale {
    pub fn resolution(&self) -> &'static str {
        match self {
            BasemapScale::Fine => "10m",
            BasemapScale::Medium => "50m",
            BasemapScale::Coarse => "110m",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    Land,
    Coastline,
    Borders,
}

impl Layer {
    fn file_name(&self, scale: BasemapScale) -> String {
        let name = match self {
            Layer::Land => "land",
            Layer::Coastline => "coastline",
            Layer::Borders => "admin_0_boundary_lines_land",
        };
        format!("ne_{}_{}.geojson", scale.resolution(), name)
    }
}

/// Converts the features of a collection into `geo` geometries, skipping
/// features without geometry.
fn geometries(collection: FeatureCollection) -> impl Iterator<Item = Geometry<f64>> {
    collection
        .features
        .into_iter()
        .filter_map(|feature| feature.geometry)
        .filter_map(|geometry| match Geometry::<f64>::try_from(geometry) {
            Ok(geometry) => Some(geometry),
            Err(e) => {
                debug!("Skipping unconvertible basemap geometry: {}", e);
                None
            }
        })
}

/// Basemap layers in `(lon, lat)` coordinates, already clipped to the map extent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Basemap {
    /// Outer rings of land polygons.
    pub land: Vec<Vec<Point>>,
    /// Inner rings of land polygons (lakes, inland seas).
    pub holes: Vec<Vec<Point>>,
    pub coastlines: Vec<Vec<Point>>,
    pub borders: Vec<Vec<Point>>,
}

impl Basemap {
    /// A basemap without any layer. Maps drawn with it show only the ocean background.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.land.is_empty() && self.coastlines.is_empty() && self.borders.is_empty()
    }

    /// Loads all three layers, downloading any that are missing or older than `max_age`.
    pub async fn load(
        cache_dir: &Path,
        scale: BasemapScale,
        bounds: &BoundingBox,
        max_age: Duration,
    ) -> Result<Self, BasemapError> {
        let layer_dir = cache_dir.join(BASEMAP_DIR_NAME);
        fs::create_dir_all(&layer_dir)
            .await
            .map_err(|e| BasemapError::CacheDirCreation(layer_dir.clone(), e))?;

        let client = Client::new();
        let land = load_layer(&client, &layer_dir, Layer::Land, scale, max_age).await?;
        let coastlines = load_layer(&client, &layer_dir, Layer::Coastline, scale, max_age).await?;
        let borders = load_layer(&client, &layer_dir, Layer::Borders, scale, max_age).await?;

        let bounds = *bounds;
        let basemap = tokio::task::spawn_blocking(move || {
            Self::from_collections(land, coastlines, borders, &bounds)
        })
        .await?;
        info!(
            "Basemap ready: {} land rings, {} coastline paths, {} border paths",
            basemap.land.len(),
            basemap.coastlines.len(),
            basemap.borders.len()
        );
        Ok(basemap)
    }

    /// Clips parsed layers to `bounds`.
    pub(crate) fn from_collections(
        land: FeatureCollection,
        coastlines: FeatureCollection,
        borders: FeatureCollection,
        bounds: &BoundingBox,
    ) -> Self {
        let frame = bounds.to_rect();
        let clip_area = frame.to_polygon();
        let mut basemap = Self::empty();

        for geometry in geometries(land) {
            let polygons = match geometry {
                Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
                Geometry::MultiPolygon(polygons) => polygons,
                _ => continue,
            };
            for polygon in polygons {
                if !overlaps(polygon.bounding_rect(), &frame) {
                    continue;
                }
                for clipped in polygon.intersection(&clip_area) {
                    basemap.land.push(to_points(clipped.exterior()));
                    basemap
                        .holes
                        .extend(clipped.interiors().iter().map(to_points));
                }
            }
        }

        basemap.coastlines = clip_lines(coastlines, &clip_area, &frame);
        basemap.borders = clip_lines(borders, &clip_area, &frame);
        basemap
    }
}

async fn load_layer(
    client: &Client,
    layer_dir: &Path,
    layer: Layer,
    scale: BasemapScale,
    max_age: Duration,
) -> Result<FeatureCollection, BasemapError> {
    let file_name = layer.file_name(scale);
    let path: PathBuf = layer_dir.join(&file_name);

    if is_fresh(&path, max_age).await {
        debug!("Cache hit for basemap layer {:?}", path);
    } else {
        let url = format!("{}/{}", NATURAL_EARTH_URL, file_name);
        info!("Downloading basemap layer from {}", url);
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| BasemapError::NetworkRequest(url.clone(), e))?;
        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(match e.status() {
                    Some(status) => BasemapError::HttpStatus {
                        url,
                        status,
                        source: e,
                    },
                    None => BasemapError::NetworkRequest(url, e),
                });
            }
        };
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BasemapError::NetworkRequest(url.clone(), e))?;
        fs::write(&path, &bytes)
            .await
            .map_err(|e| BasemapError::CacheWrite(path.clone(), e))?;
    }

    let bytes = fs::read(&path)
        .await
        .map_err(|e| BasemapError::CacheRead(path.clone(), e))?;
    tokio::task::spawn_blocking(move || {
        serde_json::from_slice::<FeatureCollection>(&bytes)
            .map_err(|e| BasemapError::JsonParse(file_name, e))
    })
    .await?
}

fn to_points(line: &LineString<f64>) -> Vec<Point> {
    line.coords().map(|c| (c.x, c.y)).collect()
}

fn overlaps(extent: Option<Rect<f64>>, frame: &Rect<f64>) -> bool {
    extent.is_some_and(|extent| extent.intersects(frame))
}

fn clip_lines(
    collection: FeatureCollection,
    clip_area: &Polygon<f64>,
    frame: &Rect<f64>,
) -> Vec<Vec<Point>> {
    let lines: Vec<LineString<f64>> = geometries(collection)
        .flat_map(|geometry| match geometry {
            Geometry::LineString(line) => vec![line],
            Geometry::MultiLineString(lines) => lines.0,
            _ => Vec::new(),
        })
        .filter(|line| overlaps(line.bounding_rect(), frame))
        .collect();

    clip_area
        .clip(&MultiLineString::new(lines), false)
        .iter()
        .map(to_points)
        .collect()
}
