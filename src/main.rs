//! tiled-raster - inspect and read tiled raster datasets.
//!
//! This binary opens a dataset manifest through the tiled reader and prints
//! JSON reports to stdout. Logs go to stderr.

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiled_raster::{
    config::{Cli, Command, InfoConfig, ReadConfig},
    dataset::LocalSource,
    geo::{DPoint, GeometrySummary},
    raster::{DataStatus, Rect, TileBuffer, TileGrid},
    reader::{ReaderRegistry, TiledReader},
    tile::CacheStats,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Command::Info(config) => run_info(config).await,
        Command::Read(config) => run_read(config).await,
    }
}

/// Initialize the tracing subscriber, writing to stderr.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "tiled_raster=debug"
    } else {
        "tiled_raster=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn open_reader(
    path: &std::path::Path,
    registry: &ReaderRegistry<LocalSource>,
) -> Option<TiledReader<LocalSource>> {
    match registry.open(path).await {
        Ok(reader) => Some(reader),
        Err(e) => {
            error!("Failed to open {}: {}", path.display(), e);
            None
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to serialize report: {}", e);
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Info Command
// =============================================================================

#[derive(Serialize)]
struct LevelReport {
    level: u32,
    width: u32,
    height: u32,
    rect: Option<Rect>,
}

#[derive(Serialize)]
struct InfoReport {
    path: String,
    reader: &'static str,
    image_rect: Option<Rect>,
    tile_grid: Option<TileGrid>,
    bands: u32,
    element_type: Option<&'static str>,
    levels: Vec<LevelReport>,
    decimation: Vec<DPoint>,
    min_values: Vec<Option<f64>>,
    max_values: Vec<Option<f64>>,
    geometry: Option<GeometrySummary>,
    geometry_error: Option<String>,
}

async fn run_info(config: InfoConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let registry = ReaderRegistry::with_options(LocalSource::new(), config.cache.reader_options());
    let Some(reader) = open_reader(&config.path, &registry).await else {
        return ExitCode::FAILURE;
    };

    let levels = (0..reader.number_of_decimation_levels())
        .map(|level| LevelReport {
            level,
            width: reader.number_of_samples(level),
            height: reader.number_of_lines(level),
            rect: reader.level_rect(level),
        })
        .collect();

    let bands = reader.number_of_output_bands();
    let (geometry, geometry_error) = match reader.image_geometry().await {
        Ok(geometry) => (Some(geometry.summary()), None),
        Err(e) => (None, Some(e.to_string())),
    };

    let report = InfoReport {
        path: config.path.display().to_string(),
        reader: reader.long_name(),
        image_rect: reader.image_rect(),
        tile_grid: reader.tile_grid(),
        bands,
        element_type: reader.element_type().map(|t| t.name()),
        levels,
        decimation: reader.decimation_factors(),
        min_values: (0..bands).map(|b| reader.min_pixel_value(b)).collect(),
        max_values: (0..bands).map(|b| reader.max_pixel_value(b)).collect(),
        geometry,
        geometry_error,
    };

    print_json(&report)
}

// =============================================================================
// Read Command
// =============================================================================

#[derive(Serialize)]
struct BandStats {
    band: u32,
    min: f64,
    max: f64,
    mean: f64,
}

#[derive(Serialize)]
struct ReadReport {
    rect: Rect,
    level: u32,
    status: DataStatus,
    element_type: &'static str,
    bands: Vec<BandStats>,
    cache: Option<CacheStats>,
}

fn band_stats(tile: &TileBuffer) -> Vec<BandStats> {
    let len = tile.band_len();
    (0..tile.bands())
        .map(|band| {
            let start = band as usize * len;
            let values = (start..start + len).filter_map(|i| tile.data().value_f64(i));

            let (mut min, mut max, mut sum, mut n) = (f64::INFINITY, f64::NEG_INFINITY, 0.0, 0usize);
            for v in values {
                min = min.min(v);
                max = max.max(v);
                sum += v;
                n += 1;
            }
            if n == 0 {
                (min, max) = (0.0, 0.0);
            }
            BandStats {
                band,
                min,
                max,
                mean: if n == 0 { 0.0 } else { sum / n as f64 },
            }
        })
        .collect()
}

async fn run_read(config: ReadConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }
    let rect = match config.request_rect() {
        Ok(rect) => rect,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let registry = ReaderRegistry::with_options(LocalSource::new(), config.cache.reader_options());
    let Some(reader) = open_reader(&config.path, &registry).await else {
        return ExitCode::FAILURE;
    };

    let tile = match reader.try_get_tile(rect, config.level).await {
        Ok(tile) => tile,
        Err(e) => {
            error!("Failed to read {} at level {}: {}", rect, config.level, e);
            return ExitCode::FAILURE;
        }
    };

    let report = ReadReport {
        rect,
        level: config.level,
        status: tile.status(),
        element_type: tile.element_type().name(),
        bands: band_stats(&tile),
        cache: reader.cache_stats(config.level).await,
    };

    print_json(&report)
}
