//! Map projection capability seam.
//!
//! The reader never does projection math. It asks a [`ProjectionFactory`] for
//! a [`Projection`] by spatial reference code, checks its capabilities and
//! pushes the georeferencing parameters into it through setters.

use std::fmt;

use serde::Serialize;

use super::transform::{DPoint, GeoTransform};
use crate::error::GeometryError;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GroundPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GroundPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionUnits {
    Degrees,
    Meters,
    Unknown,
}

/// Parameters a reader pushes into a projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectionParams {
    pub ul_gpt: Option<GroundPoint>,
    pub origin: Option<GroundPoint>,
    pub degrees_per_pixel: Option<DPoint>,
    pub meters_per_pixel: Option<DPoint>,
    pub ul_tie_point: Option<DPoint>,
}

/// A map projection as seen by the reader: capability checks plus setters.
pub trait Projection: fmt::Debug + Send + Sync {
    fn description(&self) -> &str;

    /// Whether ground coordinates are latitude/longitude.
    fn is_geographic(&self) -> bool;

    /// Whether the projection is a plain lat/lon grid (equidistant
    /// cylindrical or lat/lon-xy). Only these support origin derivation.
    fn is_lat_lon_cylindrical(&self) -> bool;

    fn units(&self) -> ProjectionUnits;

    fn params(&self) -> &ProjectionParams;

    fn params_mut(&mut self) -> &mut ProjectionParams;

    fn set_ul_gpt(&mut self, gpt: GroundPoint) {
        self.params_mut().ul_gpt = Some(gpt);
    }

    fn set_origin(&mut self, origin: GroundPoint) {
        self.params_mut().origin = Some(origin);
    }

    fn set_decimal_degrees_per_pixel(&mut self, gsd: DPoint) {
        self.params_mut().degrees_per_pixel = Some(gsd);
    }

    fn set_meters_per_pixel(&mut self, gsd: DPoint) {
        self.params_mut().meters_per_pixel = Some(gsd);
    }

    fn set_ul_tie_point(&mut self, tie: DPoint) {
        self.params_mut().ul_tie_point = Some(tie);
    }
}

/// Creates projections from `"EPSG:<code>"` strings.
pub trait ProjectionFactory: Send + Sync {
    fn create_projection(&self, code: &str) -> Option<Box<dyn Projection>>;
}

// =============================================================================
// Built-in projections
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapProjectionKind {
    /// Geographic equidistant cylindrical (plate carrée)
    EquidistantCylindrical,
    /// Projected, e.g. UTM or web mercator
    Projected(ProjectionUnits),
}

/// Parameter holder used by [`EpsgProjectionFactory`].
#[derive(Debug, Clone, PartialEq)]
pub struct MapProjection {
    description: String,
    kind: MapProjectionKind,
    params: ProjectionParams,
}

impl MapProjection {
    pub fn new(description: impl Into<String>, kind: MapProjectionKind) -> Self {
        Self {
            description: description.into(),
            kind,
            params: ProjectionParams::default(),
        }
    }

    pub fn kind(&self) -> MapProjectionKind {
        self.kind
    }
}

impl Projection for MapProjection {
    fn description(&self) -> &str {
        &self.description
    }

    fn is_geographic(&self) -> bool {
        matches!(self.kind, MapProjectionKind::EquidistantCylindrical)
    }

    fn is_lat_lon_cylindrical(&self) -> bool {
        matches!(self.kind, MapProjectionKind::EquidistantCylindrical)
    }

    fn units(&self) -> ProjectionUnits {
        match self.kind {
            MapProjectionKind::EquidistantCylindrical => ProjectionUnits::Degrees,
            MapProjectionKind::Projected(units) => units,
        }
    }

    fn params(&self) -> &ProjectionParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut ProjectionParams {
        &mut self.params
    }
}

/// Small EPSG table covering the codes tiled imagery is usually delivered in.
///
/// Geographic CRSs (4326, 4269, 4267) map to equidistant cylindrical;
/// WGS84 UTM zones (326xx, 327xx) and web mercator (3857) map to projected
/// meter grids. Anything else is unknown.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpsgProjectionFactory;

impl ProjectionFactory for EpsgProjectionFactory {
    fn create_projection(&self, code: &str) -> Option<Box<dyn Projection>> {
        let (authority, number) = code.split_once(':')?;
        if !authority.eq_ignore_ascii_case("EPSG") {
            return None;
        }
        let number: u32 = number.trim().parse().ok()?;

        let projection = match number {
            4326 | 4269 | 4267 => MapProjection::new(
                format!("Equidistant Cylindrical (EPSG:{number})"),
                MapProjectionKind::EquidistantCylindrical,
            ),
            3857 => MapProjection::new(
                "Web Mercator (EPSG:3857)",
                MapProjectionKind::Projected(ProjectionUnits::Meters),
            ),
            32601..=32660 => MapProjection::new(
                format!("UTM zone {}N (EPSG:{number})", number - 32600),
                MapProjectionKind::Projected(ProjectionUnits::Meters),
            ),
            32701..=32760 => MapProjection::new(
                format!("UTM zone {}S (EPSG:{number})", number - 32700),
                MapProjectionKind::Projected(ProjectionUnits::Meters),
            ),
            _ => return None,
        };
        Some(Box::new(projection))
    }
}

// =============================================================================
// Origin derivation
// =============================================================================

fn almost_equal(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// Centre ground point of a geographic image.
///
/// Also corrects `transform` for whole-world scenes: a tie point past
/// -180 / 90 is pulled in by half a pixel, and a pixel size within one pixel
/// of covering the full 360 / 180 degrees is snapped to exactly cover it.
///
/// Only lat/lon cylindrical projections are supported.
pub fn compute_projection_origin(
    projection: &dyn Projection,
    transform: &mut GeoTransform,
    width: u32,
    height: u32,
) -> Result<GroundPoint, GeometryError> {
    if !projection.is_lat_lon_cylindrical() {
        return Err(GeometryError::UnsupportedProjectionForOrigin(
            projection.description().to_string(),
        ));
    }

    let mut gsd = transform.gsd();
    let mut tie = transform.tie_point();
    let half = DPoint::new(gsd.x / 2.0, gsd.y / 2.0);

    if tie.x - half.x < -180.0 {
        tie.x = -180.0 + half.x;
        transform.translate_x = tie.x;
    }
    if tie.y + half.y > 90.0 {
        tie.y = 90.0 - half.y;
        transform.translate_y = tie.y;
    }

    let samples = f64::from(width);
    let degrees = samples * gsd.x;
    if degrees > 360.0 && (degrees - 360.0).abs() <= gsd.x {
        gsd.x = 360.0 / samples;
        transform.scale_x = gsd.x.copysign(transform.scale_x);
        if almost_equal(tie.x - half.x, -180.0) {
            tie.x = -180.0 + gsd.x / 2.0;
            transform.translate_x = tie.x;
        }
    }

    let lines = f64::from(height);
    let degrees = lines * gsd.y;
    if degrees > 180.0 && (degrees - 180.0).abs() <= gsd.y {
        gsd.y = 180.0 / lines;
        transform.scale_y = gsd.y.copysign(transform.scale_y);
        if almost_equal(tie.y + half.y, 90.0) {
            tie.y = 90.0 - gsd.y / 2.0;
            transform.translate_y = tie.y;
        }
    }

    let half = DPoint::new(gsd.x / 2.0, gsd.y / 2.0);
    let shift_lon = f64::from(width / 2) * gsd.x;
    let shift_lat = -f64::from(height / 2) * gsd.y;

    Ok(GroundPoint::new(
        tie.y + half.y + shift_lat,
        tie.x - half.x + shift_lon,
    ))
}
