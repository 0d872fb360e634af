//! Window copy from a cached tile into a caller's buffer.
//!
//! No interpolation and no type conversion: the source and destination must
//! share element type and band count, and the copied window must lie inside
//! both rectangles. Any violation is an [`InvariantViolation`].

use crate::error::InvariantViolation;
use crate::raster::{Element, ElementType, Rect, TileBuffer};

/// Copy the part of `source` covering `output`'s rectangle into `output`.
///
/// `output.rect()` must be fully contained in `source.rect()`.
pub fn project(source: &TileBuffer, output: &mut TileBuffer) -> Result<(), InvariantViolation> {
    let window = output.rect();
    copy_window(source, window, output)
}

/// Copy the pixels of `window` from `source` into `output`.
///
/// `window` must be fully contained in both buffers' rectangles.
pub fn copy_window(
    source: &TileBuffer,
    window: Rect,
    output: &mut TileBuffer,
) -> Result<(), InvariantViolation> {
    if !source.rect().contains(&window) {
        return Err(InvariantViolation::NotContained {
            outer: source.rect(),
            inner: window,
        });
    }
    if !output.rect().contains(&window) {
        return Err(InvariantViolation::NotContained {
            outer: output.rect(),
            inner: window,
        });
    }
    if source.element_type() != output.element_type() {
        return Err(InvariantViolation::ElementTypeMismatch {
            expected: output.element_type(),
            actual: source.element_type(),
        });
    }
    if source.bands() != output.bands() {
        return Err(InvariantViolation::BandCountMismatch {
            expected: output.bands(),
            actual: source.bands(),
        });
    }

    match output.element_type() {
        ElementType::U8 => copy_typed::<u8>(source, window, output),
        ElementType::U16 => copy_typed::<u16>(source, window, output),
        ElementType::I16 => copy_typed::<i16>(source, window, output),
        ElementType::U32 => copy_typed::<u32>(source, window, output),
        ElementType::I32 => copy_typed::<i32>(source, window, output),
        ElementType::F32 => copy_typed::<f32>(source, window, output),
        ElementType::F64 => copy_typed::<f64>(source, window, output),
    }
}

fn copy_typed<T: Element>(
    source: &TileBuffer,
    window: Rect,
    output: &mut TileBuffer,
) -> Result<(), InvariantViolation> {
    let src_width = source.width() as usize;
    let dst_width = output.width() as usize;
    let src_dx = (window.min_x() - source.rect().min_x()) as usize;
    let src_dy = (window.min_y() - source.rect().min_y()) as usize;
    let dst_dx = (window.min_x() - output.rect().min_x()) as usize;
    let dst_dy = (window.min_y() - output.rect().min_y()) as usize;
    let w = window.width() as usize;
    let h = window.height() as usize;

    let mismatch = InvariantViolation::ElementTypeMismatch {
        expected: T::TYPE,
        actual: source.element_type(),
    };

    for band in 0..output.bands() {
        let src = source.band::<T>(band).ok_or_else(|| mismatch.clone())?;
        let dst = output.band_mut::<T>(band).ok_or_else(|| mismatch.clone())?;
        for row in 0..h {
            let s = (row + src_dy) * src_width + src_dx;
            let d = (row + dst_dy) * dst_width + dst_dx;
            dst[d..d + w].copy_from_slice(&src[s..s + w]);
        }
    }

    Ok(())
}
