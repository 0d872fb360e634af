//! Element type integration tests.
//!
//! Every supported sample type must come back from a read exactly as the
//! dataset delivered it, including values at the edge of the type's range.

use tiled_raster::raster::{DataStatus, DataTypeTag, ElementType, Point, TileData};

use super::test_utils::{assert_window, open_mock, rect, MockImage};

fn typed_scene(data_type: DataTypeTag) -> MockImage {
    MockImage::new(300, 300, 128)
        .with_bands(2)
        .with_data_type(data_type)
}

#[tokio::test]
async fn test_extreme_values_round_trip() {
    let cases = [
        (DataTypeTag::Byte, ElementType::U8, 255.0),
        (DataTypeTag::UnsignedShort, ElementType::U16, 65535.0),
        (DataTypeTag::Short, ElementType::I16, -32768.0),
        (DataTypeTag::UnsignedInteger, ElementType::U32, 4294967295.0),
        (DataTypeTag::Integer, ElementType::I32, -2147483648.0),
        (DataTypeTag::Float, ElementType::F32, -1.25),
        (DataTypeTag::Double, ElementType::F64, 3.14159),
    ];

    for (tag, element_type, value) in cases {
        let (reader, _) = open_mock(typed_scene(tag).with_constant(value)).await;
        assert_eq!(reader.element_type(), Some(element_type));

        let request = rect(100, 100, 200, 200);
        let tile = reader.get_tile(request, 0).await;

        assert_eq!(tile.status(), DataStatus::Full, "{}", element_type);
        assert_eq!(tile.element_type(), element_type);
        for point in [Point::new(100, 100), Point::new(150, 170), Point::new(200, 200)] {
            for band in 0..2 {
                assert_eq!(tile.pixel(point, band), Some(value), "{} at {}", element_type, point);
            }
        }
    }
}

#[tokio::test]
async fn test_generated_samples_per_type() {
    for tag in [
        DataTypeTag::Byte,
        DataTypeTag::UnsignedShort,
        DataTypeTag::Short,
        DataTypeTag::UnsignedInteger,
        DataTypeTag::Integer,
        DataTypeTag::Float,
        DataTypeTag::Double,
    ] {
        let (reader, _) = open_mock(typed_scene(tag)).await;
        let request = rect(120, 120, 140, 140);
        let tile = reader.get_tile(request, 0).await;
        assert_window(&tile, 0, request);
    }
}

#[tokio::test]
async fn test_typed_band_access() {
    let (reader, _) = open_mock(typed_scene(DataTypeTag::Double).with_constant(3.14159)).await;
    let tile = reader.get_tile(rect(0, 0, 3, 3), 0).await;

    assert_eq!(tile.band::<f64>(1).unwrap(), &[3.14159; 16]);
    assert!(tile.band::<f32>(1).is_none());
    assert!(matches!(tile.data(), TileData::F64(v) if v.len() == 32));
}

#[tokio::test]
async fn test_blank_tiles_keep_element_type() {
    let (reader, _) = open_mock(typed_scene(DataTypeTag::Short)).await;
    let tile = reader.get_tile(rect(1000, 1000, 1009, 1009), 0).await;

    assert_eq!(tile.status(), DataStatus::Empty);
    assert_eq!(tile.element_type(), ElementType::I16);
    assert_eq!(tile.band::<i16>(0).unwrap(), &[0i16; 100]);
}
