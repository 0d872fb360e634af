//! Configuration for the `tiled-raster` binary.
//!
//! Options come from command-line arguments via clap, with environment
//! variable fallbacks using the `TILED_` prefix:
//!
//! - `TILED_CACHE_BYTES` - Tile cache bound per level in bytes, 0 = unbounded (default: 0)
//! - `TILED_CACHE_ENTRIES` - Max cached tiles per level (default: 10000)
//! - `TILED_LEVEL` - Resolution level for `read` (default: 0)
//!
//! # Example
//!
//! ```text
//! tiled-raster info scene.idaho
//! tiled-raster read scene.idaho --rect 300,300,201,201 --level 1 -v
//! ```

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::raster::Rect;
use crate::reader::ReaderOptions;
use crate::tile::{CachePolicy, DEFAULT_MAX_ENTRIES};

// =============================================================================
// Default Values
// =============================================================================

/// Default per-level cache byte bound (unbounded).
pub const DEFAULT_CACHE_BYTES: usize = 0;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Tiled raster reader - inspect and read decimation-aware tiled datasets.
#[derive(Parser, Debug, Clone)]
#[command(name = "tiled-raster")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print image metadata, levels, decimation and geometry as JSON.
    Info(InfoConfig),

    /// Read a pixel rectangle and print per-band statistics as JSON.
    Read(ReadConfig),
}

/// Tile cache settings shared by all commands.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CacheArgs {
    /// Maximum decoded bytes cached per resolution level (0 = unbounded).
    #[arg(long, default_value_t = DEFAULT_CACHE_BYTES, env = "TILED_CACHE_BYTES")]
    pub cache_bytes: usize,

    /// Maximum number of tiles cached per resolution level.
    #[arg(long, default_value_t = DEFAULT_MAX_ENTRIES, env = "TILED_CACHE_ENTRIES")]
    pub cache_entries: usize,
}

impl CacheArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_entries == 0 {
            return Err("cache_entries must be greater than 0".to_string());
        }
        Ok(())
    }

    pub fn policy(&self) -> CachePolicy {
        let mut policy = CachePolicy::unbounded();
        if self.cache_bytes > 0 {
            policy = policy.with_max_bytes(self.cache_bytes);
        }
        if let Some(entries) = NonZeroUsize::new(self.cache_entries) {
            policy = policy.with_max_entries(entries);
        }
        policy
    }

    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions {
            cache_policy: self.policy(),
        }
    }
}

/// Arguments for `info`.
#[derive(Args, Debug, Clone)]
pub struct InfoConfig {
    /// Dataset manifest (`*.idaho`).
    pub path: PathBuf,

    #[command(flatten)]
    pub cache: CacheArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InfoConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()
    }
}

/// Arguments for `read`.
#[derive(Args, Debug, Clone)]
pub struct ReadConfig {
    /// Dataset manifest (`*.idaho`).
    pub path: PathBuf,

    /// Pixel rectangle as `x,y,width,height`.
    #[arg(long)]
    pub rect: String,

    /// Resolution level (0 = full resolution).
    #[arg(long, default_value_t = 0, env = "TILED_LEVEL")]
    pub level: u32,

    #[command(flatten)]
    pub cache: CacheArgs,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ReadConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.cache.validate()?;
        self.request_rect()?;
        Ok(())
    }

    /// The requested rectangle parsed from `x,y,width,height`.
    pub fn request_rect(&self) -> Result<Rect, String> {
        parse_rect(&self.rect)
    }
}

/// Parse `x,y,width,height` into a rectangle.
pub fn parse_rect(s: &str) -> Result<Rect, String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, w, h] = parts.as_slice() else {
        return Err(format!("rect must be x,y,width,height, got '{}'", s));
    };

    let x: i32 = x.parse().map_err(|_| format!("invalid rect x '{}'", x))?;
    let y: i32 = y.parse().map_err(|_| format!("invalid rect y '{}'", y))?;
    let w: u32 = w.parse().map_err(|_| format!("invalid rect width '{}'", w))?;
    let h: u32 = h.parse().map_err(|_| format!("invalid rect height '{}'", h))?;

    Rect::from_origin_size(x, y, w, h)
        .ok_or_else(|| format!("rect '{}' is empty or out of range", s))
}

// =============================================================================
// Tests
// =============================================================================
