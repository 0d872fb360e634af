//! Image geometry.
//!
//! Georeferencing is consumed, not computed: the dataset supplies a six
//! coefficient [`GeoTransform`] and a spatial reference code, a
//! [`ProjectionFactory`] turns the code into a [`Projection`], and the reader
//! pushes origin and pixel size into it. A [`SidecarGeometry`] may override
//! the whole process with a projection stored next to the image.

mod geometry;
mod projection;
mod transform;

pub use geometry::{
    internal_projection, sidecar_path, GeometrySource, GeometrySummary, ImageGeometry, NoSidecar,
    SidecarGeometry,
};
pub use projection::{
    compute_projection_origin, EpsgProjectionFactory, GroundPoint, MapProjection,
    MapProjectionKind, Projection, ProjectionFactory, ProjectionParams, ProjectionUnits,
};
pub use transform::{DPoint, GeoTransform};
