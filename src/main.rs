use anyhow::Context;
use env_logger::{Builder, Env, Target};
use log::{info, warn};
use weather_map_plotter::{
    ensure_dir_exists, get_cache_dir, Basemap, MeteostatObservationSource,
    MeteostatStationDirectory, PlotterConfig, StationPlotRenderer, YearlyDriver,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG overrides the default level.
    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Stdout)
        .init();

    let config = PlotterConfig::default();
    let cache_dir = match &config.cache_dir {
        Some(dir) => dir.clone(),
        None => get_cache_dir()?,
    };
    ensure_dir_exists(&cache_dir).await?;
    info!("Using cache directory {}", cache_dir.display());

    let directory = MeteostatStationDirectory::new(&cache_dir, config.cache_max_age)
        .await
        .context("Failed to load station metadata")?;
    info!("Loaded {} stations", directory.len());

    let source = MeteostatObservationSource::new(&cache_dir, config.cache_max_age);

    let basemap = match Basemap::load(
        &cache_dir,
        config.basemap_scale,
        &config.bounds,
        config.cache_max_age,
    )
    .await
    {
        Ok(basemap) => basemap,
        Err(e) => {
            warn!("Failed to load basemap, drawing maps without it: {}", e);
            Basemap::empty()
        }
    };
    let renderer = StationPlotRenderer::new(&config, basemap)?;

    let summary = YearlyDriver::new(&config, &directory, &source, &renderer)
        .run()
        .await?;
    info!(
        "Done: {} maps in {}, {} rows in {}",
        summary.maps_written,
        config.output_dir.display(),
        summary.csv_rows,
        config.csv_path.display()
    );
    Ok(())
}
