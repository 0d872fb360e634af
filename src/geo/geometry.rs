use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use super::projection::{
    compute_projection_origin, GroundPoint, Projection, ProjectionFactory, ProjectionParams,
    ProjectionUnits,
};
use super::transform::DPoint;
use crate::dataset::{Georeferencing, LevelSize};
use crate::error::GeometryError;

/// Source of a projection stored next to the image, e.g. `<image>.aux.xml`.
pub trait SidecarGeometry: Send + Sync {
    /// Projection described by the sidecar file, `None` if it has none.
    fn projection(&self, sidecar: &Path) -> Option<Box<dyn Projection>>;
}

/// Sidecar support that never finds a projection.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSidecar;

impl SidecarGeometry for NoSidecar {
    fn projection(&self, _sidecar: &Path) -> Option<Box<dyn Projection>> {
        None
    }
}

/// `<image>.aux.xml` for an image path.
pub fn sidecar_path(image: &Path) -> PathBuf {
    let mut name = OsString::from(image.as_os_str());
    name.push(".aux.xml");
    PathBuf::from(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometrySource {
    /// Projection from an external sidecar file
    Sidecar,
    /// Projection derived from the dataset's georeferencing
    Internal,
}

/// Projection plus the image parameters it applies to.
#[derive(Debug)]
pub struct ImageGeometry {
    projection: Box<dyn Projection>,
    source: GeometrySource,
    image_size: LevelSize,
    decimations: Vec<DPoint>,
}

impl ImageGeometry {
    pub fn new(
        projection: Box<dyn Projection>,
        source: GeometrySource,
        image_size: LevelSize,
        decimations: Vec<DPoint>,
    ) -> Self {
        Self {
            projection,
            source,
            image_size,
            decimations,
        }
    }

    pub fn projection(&self) -> &dyn Projection {
        self.projection.as_ref()
    }

    pub fn source(&self) -> GeometrySource {
        self.source
    }

    pub fn image_size(&self) -> LevelSize {
        self.image_size
    }

    /// Decimation factor per resolution level.
    pub fn decimations(&self) -> &[DPoint] {
        &self.decimations
    }

    pub fn summary(&self) -> GeometrySummary {
        GeometrySummary {
            projection: self.projection.description().to_string(),
            geographic: self.projection.is_geographic(),
            units: self.projection.units(),
            source: self.source,
            params: self.projection.params().clone(),
        }
    }
}

/// Serializable view of an [`ImageGeometry`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometrySummary {
    pub projection: String,
    pub geographic: bool,
    pub units: ProjectionUnits,
    pub source: GeometrySource,
    pub params: ProjectionParams,
}

/// Build a projection from a dataset's georeferencing.
///
/// Geographic projections receive the upper-left ground point, the derived
/// image centre as origin and the pixel size in degrees. Meter-based
/// projections receive the pixel size in meters and the tie point.
pub fn internal_projection(
    georef: &Georeferencing,
    factory: &dyn ProjectionFactory,
    width: u32,
    height: u32,
) -> Result<Box<dyn Projection>, GeometryError> {
    let code = georef.epsg_code().ok_or_else(|| {
        GeometryError::UnknownSpatialReference(georef.spatial_reference_system_code.clone())
    })?;
    let code = format!("EPSG:{code}");
    let mut projection = factory
        .create_projection(&code)
        .ok_or_else(|| GeometryError::UnknownSpatialReference(code.clone()))?;

    debug!(code = %code, projection = projection.description(), "resolved projection");

    let mut transform = georef.transform();
    let mut units = projection.units();

    if projection.is_geographic() {
        units = ProjectionUnits::Degrees;
        let origin = compute_projection_origin(projection.as_ref(), &mut transform, width, height)?;
        let tie = transform.tie_point();
        projection.set_ul_gpt(GroundPoint::new(tie.y, tie.x));
        projection.set_origin(origin);
        projection.set_decimal_degrees_per_pixel(transform.gsd());
    }

    if units == ProjectionUnits::Meters {
        projection.set_meters_per_pixel(transform.gsd());
        projection.set_ul_tie_point(transform.tie_point());
    }

    if georef.transform().has_rotation() {
        warn!(
            shear_x = georef.shear_x,
            shear_y = georef.shear_y,
            "unhandled rotation in georeferencing"
        );
    }

    Ok(projection)
}
