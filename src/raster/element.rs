//! Supported pixel element types.
//!
//! Datasets describe their sample type with a [`DataTypeTag`], which may name
//! a type this crate cannot represent. Opening a dataset resolves the tag into
//! an [`ElementType`], the closed set of seven numeric kinds. Every buffer
//! then carries its samples in a [`TileData`] variant, so type dispatch is an
//! exhaustive `match` rather than a runtime lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sample type tag as reported by dataset metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTypeTag {
    Byte,
    UnsignedShort,
    Short,
    UnsignedInteger,
    Integer,
    Float,
    Double,
    #[serde(other)]
    Unknown,
}

/// Numeric element type of a resolved dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    U8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl ElementType {
    /// All supported element types.
    pub const ALL: [ElementType; 7] = [
        ElementType::U8,
        ElementType::U16,
        ElementType::I16,
        ElementType::U32,
        ElementType::I32,
        ElementType::F32,
        ElementType::F64,
    ];

    /// Resolve a metadata tag, `None` for tags without a representation.
    pub const fn from_tag(tag: DataTypeTag) -> Option<Self> {
        match tag {
            DataTypeTag::Byte => Some(ElementType::U8),
            DataTypeTag::UnsignedShort => Some(ElementType::U16),
            DataTypeTag::Short => Some(ElementType::I16),
            DataTypeTag::UnsignedInteger => Some(ElementType::U32),
            DataTypeTag::Integer => Some(ElementType::I32),
            DataTypeTag::Float => Some(ElementType::F32),
            DataTypeTag::Double => Some(ElementType::F64),
            DataTypeTag::Unknown => None,
        }
    }

    /// Size of one sample in bytes.
    pub const fn size_in_bytes(&self) -> usize {
        match self {
            ElementType::U8 => 1,
            ElementType::U16 | ElementType::I16 => 2,
            ElementType::U32 | ElementType::I32 | ElementType::F32 => 4,
            ElementType::F64 => 8,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            ElementType::U8 => "uint8",
            ElementType::U16 => "uint16",
            ElementType::I16 => "int16",
            ElementType::U32 => "uint32",
            ElementType::I32 => "int32",
            ElementType::F32 => "float32",
            ElementType::F64 => "float64",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Element trait
// =============================================================================

/// A Rust numeric type that backs one [`ElementType`].
pub trait Element: Copy + Default + PartialEq + Send + Sync + fmt::Debug + 'static {
    const TYPE: ElementType;

    /// Borrow the samples of `data` if it holds this type.
    fn samples(data: &TileData) -> Option<&[Self]>;

    /// Mutably borrow the samples of `data` if it holds this type.
    fn samples_mut(data: &mut TileData) -> Option<&mut [Self]>;

    /// Wrap a sample vector in the matching variant.
    fn wrap(samples: Vec<Self>) -> TileData;

    /// Lossless widening used for statistics.
    fn to_f64(self) -> f64;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const TYPE: ElementType = ElementType::$variant;

            fn samples(data: &TileData) -> Option<&[Self]> {
                match data {
                    TileData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn samples_mut(data: &mut TileData) -> Option<&mut [Self]> {
                match data {
                    TileData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn wrap(samples: Vec<Self>) -> TileData {
                TileData::$variant(samples)
            }

            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_element!(u8, U8);
impl_element!(u16, U16);
impl_element!(i16, I16);
impl_element!(u32, U32);
impl_element!(i32, I32);
impl_element!(f32, F32);
impl_element!(f64, F64);

// =============================================================================
// TileData
// =============================================================================

/// Typed sample storage, band-sequential.
///
/// Band `b` of a `width x height` buffer occupies
/// `[b * width * height, (b + 1) * width * height)`, row-major within the band.
#[derive(Debug, Clone, PartialEq)]
pub enum TileData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    I16(Vec<i16>),
    U32(Vec<u32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl TileData {
    /// Allocate `len` zeroed samples of the given type.
    pub fn zeroed(element_type: ElementType, len: usize) -> Self {
        match element_type {
            ElementType::U8 => TileData::U8(vec![0; len]),
            ElementType::U16 => TileData::U16(vec![0; len]),
            ElementType::I16 => TileData::I16(vec![0; len]),
            ElementType::U32 => TileData::U32(vec![0; len]),
            ElementType::I32 => TileData::I32(vec![0; len]),
            ElementType::F32 => TileData::F32(vec![0.0; len]),
            ElementType::F64 => TileData::F64(vec![0.0; len]),
        }
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            TileData::U8(_) => ElementType::U8,
            TileData::U16(_) => ElementType::U16,
            TileData::I16(_) => ElementType::I16,
            TileData::U32(_) => ElementType::U32,
            TileData::I32(_) => ElementType::I32,
            TileData::F32(_) => ElementType::F32,
            TileData::F64(_) => ElementType::F64,
        }
    }

    /// Number of samples across all bands.
    pub fn len(&self) -> usize {
        match self {
            TileData::U8(v) => v.len(),
            TileData::U16(v) => v.len(),
            TileData::I16(v) => v.len(),
            TileData::U32(v) => v.len(),
            TileData::I32(v) => v.len(),
            TileData::F32(v) => v.len(),
            TileData::F64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Heap size of the samples in bytes.
    pub fn size_in_bytes(&self) -> usize {
        self.len() * self.element_type().size_in_bytes()
    }

    /// Reset every sample to zero.
    pub fn fill_zero(&mut self) {
        match self {
            TileData::U8(v) => v.fill(0),
            TileData::U16(v) => v.fill(0),
            TileData::I16(v) => v.fill(0),
            TileData::U32(v) => v.fill(0),
            TileData::I32(v) => v.fill(0),
            TileData::F32(v) => v.fill(0.0),
            TileData::F64(v) => v.fill(0.0),
        }
    }

    /// Sample at a flat index, widened to `f64`.
    pub fn value_f64(&self, index: usize) -> Option<f64> {
        match self {
            TileData::U8(v) => v.get(index).map(|s| s.to_f64()),
            TileData::U16(v) => v.get(index).map(|s| s.to_f64()),
            TileData::I16(v) => v.get(index).map(|s| s.to_f64()),
            TileData::U32(v) => v.get(index).map(|s| s.to_f64()),
            TileData::I32(v) => v.get(index).map(|s| s.to_f64()),
            TileData::F32(v) => v.get(index).map(|s| s.to_f64()),
            TileData::F64(v) => v.get(index).map(|s| s.to_f64()),
        }
    }
}
