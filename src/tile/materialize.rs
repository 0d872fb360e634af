//! Copy decoded raw tiles into cache buffers.
//!
//! A [`RawTile`] arrives pixel-interleaved (`[row][col][band]`); cache
//! buffers are band-sequential. The copy is written once, generically, and
//! dispatched by an exhaustive match over [`ElementType`]. Samples are never
//! converted between types.

use crate::dataset::RawTile;
use crate::error::{InvariantViolation, TileError};
use crate::raster::{DataStatus, Element, ElementType, Point, Rect, TileBuffer};

/// Fill `dest` from `raw`, placing the raw tile's first pixel at `at`.
///
/// `raw` may be smaller than `dest` (an edge tile clipped to the image); the
/// pixels it does not cover keep their current value.
///
/// # Errors
///
/// - [`TileError::ShapeMismatch`] if `raw` has a different band count or
///   does not fit inside `dest` at `at`
/// - [`TileError::Invariant`] if the element types differ
pub fn materialize(raw: &RawTile, at: Point, dest: &mut TileBuffer) -> Result<(), TileError> {
    let fits = Rect::from_origin_size(at.x, at.y, raw.cols() as u32, raw.rows() as u32)
        .is_some_and(|covered| dest.rect().contains(&covered));
    if raw.bands() != dest.bands() as usize || !fits {
        return Err(TileError::ShapeMismatch {
            rows: raw.rows(),
            cols: raw.cols(),
            bands: raw.bands(),
            expected: format!("{} with {} bands", dest.rect(), dest.bands()),
        });
    }

    let dx = (at.x - dest.rect().min_x()) as usize;
    let dy = (at.y - dest.rect().min_y()) as usize;

    match dest.element_type() {
        ElementType::U8 => materialize_typed::<u8>(raw, dx, dy, dest)?,
        ElementType::U16 => materialize_typed::<u16>(raw, dx, dy, dest)?,
        ElementType::I16 => materialize_typed::<i16>(raw, dx, dy, dest)?,
        ElementType::U32 => materialize_typed::<u32>(raw, dx, dy, dest)?,
        ElementType::I32 => materialize_typed::<i32>(raw, dx, dy, dest)?,
        ElementType::F32 => materialize_typed::<f32>(raw, dx, dy, dest)?,
        ElementType::F64 => materialize_typed::<f64>(raw, dx, dy, dest)?,
    }

    dest.set_status(DataStatus::Full);
    Ok(())
}

fn materialize_typed<T: Element>(
    raw: &RawTile,
    dx: usize,
    dy: usize,
    dest: &mut TileBuffer,
) -> Result<(), TileError> {
    let src = T::samples(raw.samples()).ok_or(InvariantViolation::ElementTypeMismatch {
        expected: T::TYPE,
        actual: raw.element_type(),
    })?;

    let (rows, cols, bands) = (raw.rows(), raw.cols(), raw.bands());
    let width = dest.width() as usize;

    for band in 0..bands {
        let dst = dest
            .band_mut::<T>(band as u32)
            .ok_or(InvariantViolation::BandCountMismatch {
                expected: bands as u32,
                actual: band as u32,
            })?;
        for row in 0..rows {
            let start = (row + dy) * width + dx;
            for (col, out) in dst[start..start + cols].iter_mut().enumerate() {
                *out = src[(row * cols + col) * bands + band];
            }
        }
    }

    Ok(())
}
