//! Integer pixel rectangles and tile-grid arithmetic.
//!
//! Rectangles use inclusive corners: `(0,0)-(255,255)` is 256 pixels wide.
//! Tile indices are computed with floor division against a grid anchored at
//! the coordinate origin, so images with negative or non-zero origins keep
//! consistent tile boundaries.

use std::fmt;

use serde::Serialize;

/// A pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Index of a cell in a tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileIndex {
    pub x: i32,
    pub y: i32,
}

// =============================================================================
// Rect
// =============================================================================

/// Axis-aligned integer rectangle with inclusive corners.
///
/// A `Rect` is never empty; operations that can produce an empty result
/// return `Option<Rect>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rect {
    min_x: i32,
    min_y: i32,
    max_x: i32,
    max_y: i32,
}

impl Rect {
    /// Create a rectangle from inclusive corners.
    ///
    /// Returns `None` if the max corner lies before the min corner, or if
    /// the width or height does not fit in `u32`.
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Option<Self> {
        if max_x < min_x || max_y < min_y {
            return None;
        }
        // The full i32 range spans 2^32 pixels
        if max_x as i64 - min_x as i64 >= u32::MAX as i64
            || max_y as i64 - min_y as i64 >= u32::MAX as i64
        {
            return None;
        }
        Some(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Create a rectangle from its upper-left corner and size.
    ///
    /// Returns `None` for a zero width or height, or if the far corner does
    /// not fit in `i32`.
    pub fn from_origin_size(x: i32, y: i32, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let max_x = i32::try_from(x as i64 + width as i64 - 1).ok()?;
        let max_y = i32::try_from(y as i64 + height as i64 - 1).ok()?;
        Self::new(x, y, max_x, max_y)
    }

    pub fn min_x(&self) -> i32 {
        self.min_x
    }

    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    pub fn max_x(&self) -> i32 {
        self.max_x
    }

    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    /// Upper-left corner.
    pub fn origin(&self) -> Point {
        Point::new(self.min_x, self.min_y)
    }

    pub fn width(&self) -> u32 {
        u32::try_from(self.max_x as i64 - self.min_x as i64 + 1).unwrap_or(u32::MAX)
    }

    pub fn height(&self) -> u32 {
        u32::try_from(self.max_y as i64 - self.min_y as i64 + 1).unwrap_or(u32::MAX)
    }

    /// Number of pixels covered.
    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// Intersection of two rectangles, `None` when they are disjoint.
    pub fn clip_to(&self, bounds: &Rect) -> Option<Rect> {
        Rect::new(
            self.min_x.max(bounds.min_x),
            self.min_y.max(bounds.min_y),
            self.max_x.min(bounds.max_x),
            self.max_y.min(bounds.max_y),
        )
    }

    /// Whether `inner` lies completely within `self`.
    pub fn contains(&self, inner: &Rect) -> bool {
        inner.min_x >= self.min_x
            && inner.max_x <= self.max_x
            && inner.min_y >= self.min_y
            && inner.max_y <= self.max_y
    }

    /// Expand outward so both corners land on tile boundaries.
    ///
    /// The result is tile-aligned and contains `self`.
    pub fn stretch_to_tile_boundary(&self, grid: TileGrid) -> Rect {
        let tw = grid.tile_width as i64;
        let th = grid.tile_height as i64;

        let min_x = (self.min_x as i64).div_euclid(tw) * tw;
        let min_y = (self.min_y as i64).div_euclid(th) * th;
        let max_x = ((self.max_x as i64).div_euclid(tw) + 1) * tw - 1;
        let max_y = ((self.max_y as i64).div_euclid(th) + 1) * th - 1;

        Rect {
            min_x: min_x.max(i32::MIN as i64) as i32,
            min_y: min_y.max(i32::MIN as i64) as i32,
            max_x: max_x.min(i32::MAX as i64) as i32,
            max_y: max_y.min(i32::MAX as i64) as i32,
        }
    }

    /// Whether both corners fall on tile boundaries of `grid`.
    pub fn is_tile_aligned(&self, grid: TileGrid) -> bool {
        self.stretch_to_tile_boundary(grid) == *self
    }

    /// Upper-left corners of every grid cell this rectangle touches, row-major.
    pub fn tile_origins(&self, grid: TileGrid) -> Vec<Point> {
        let stretched = self.stretch_to_tile_boundary(grid);
        let mut origins = Vec::new();
        let mut y = stretched.min_y as i64;
        while y <= stretched.max_y as i64 {
            let mut x = stretched.min_x as i64;
            while x <= stretched.max_x as i64 {
                origins.push(Point::new(x as i32, y as i32));
                x += grid.tile_width as i64;
            }
            y += grid.tile_height as i64;
        }
        origins
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{})-({},{})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

// =============================================================================
// TileGrid
// =============================================================================

/// Native tiling granularity of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileGrid {
    tile_width: u32,
    tile_height: u32,
}

impl TileGrid {
    /// Create a grid; both dimensions must be positive.
    pub fn new(tile_width: u32, tile_height: u32) -> Option<Self> {
        if tile_width == 0 || tile_height == 0 || tile_width > i32::MAX as u32 || tile_height > i32::MAX as u32 {
            return None;
        }
        Some(Self {
            tile_width,
            tile_height,
        })
    }

    pub fn tile_width(&self) -> u32 {
        self.tile_width
    }

    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    /// Tile index containing `point` (floor division).
    pub fn tile_index_of(&self, point: Point) -> TileIndex {
        TileIndex {
            x: (point.x as i64).div_euclid(self.tile_width as i64) as i32,
            y: (point.y as i64).div_euclid(self.tile_height as i64) as i32,
        }
    }

    /// Upper-left corner of a tile.
    pub fn tile_origin(&self, index: TileIndex) -> Point {
        Point::new(
            (index.x as i64 * self.tile_width as i64) as i32,
            (index.y as i64 * self.tile_height as i64) as i32,
        )
    }

    /// Full rectangle of the tile whose upper-left corner is `origin`.
    pub fn tile_rect(&self, origin: Point) -> Option<Rect> {
        Rect::from_origin_size(origin.x, origin.y, self.tile_width, self.tile_height)
    }
}
