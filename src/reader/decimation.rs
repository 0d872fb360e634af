use std::sync::OnceLock;

use tracing::debug;

use crate::dataset::LevelSize;
use crate::geo::DPoint;

/// Per-level scale factors relative to full resolution.
///
/// Computed on first use and kept for the lifetime of the table; a reader
/// builds a fresh table on every open.
#[derive(Debug)]
pub struct DecimationTable {
    levels: Vec<LevelSize>,
    factors: OnceLock<Vec<DPoint>>,
}

impl DecimationTable {
    /// `levels[0]` is full resolution.
    pub fn new(levels: Vec<LevelSize>) -> Self {
        Self {
            levels,
            factors: OnceLock::new(),
        }
    }

    pub fn number_of_levels(&self) -> u32 {
        self.levels.len() as u32
    }

    pub fn level_size(&self, level: u32) -> Option<LevelSize> {
        self.levels.get(level as usize).copied()
    }

    pub fn level_sizes(&self) -> &[LevelSize] {
        &self.levels
    }

    /// Factors for every level, empty if any level has a zero dimension.
    pub fn factors(&self) -> &[DPoint] {
        self.factors.get_or_init(|| compute_factors(&self.levels))
    }

    /// Factor for one level. `None` for invalid levels or an empty table.
    pub fn factor(&self, level: u32) -> Option<DPoint> {
        self.factors().get(level as usize).copied()
    }
}

fn compute_factors(levels: &[LevelSize]) -> Vec<DPoint> {
    let Some(full) = levels.first() else {
        return Vec::new();
    };

    let mut factors = Vec::with_capacity(levels.len());
    for (level, size) in levels.iter().enumerate() {
        if level == 0 {
            factors.push(DPoint::new(1.0, 1.0));
            continue;
        }
        if full.width == 0 || size.width == 0 || full.height == 0 || size.height == 0 {
            debug!(level, "cannot determine decimation");
            return Vec::new();
        }
        factors.push(DPoint::new(
            f64::from(size.width) / f64::from(full.width),
            f64::from(size.height) / f64::from(full.height),
        ));
    }

    for (level, factor) in factors.iter().enumerate() {
        debug!(level, x = factor.x, y = factor.y, "decimation");
    }
    factors
}
