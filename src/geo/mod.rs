//! Great-circle distance and radius filtering.
//!
//! All distances are in kilometers, computed with the haversine formula on a
//! sphere with the Earth's mean radius. Coordinates are in degrees.

use thiserror::Error;

/// Earth mean radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("Latitude must be between -90 and 90.")]
    InvalidLatitude,

    #[error("Longitude must be between -180 and 180.")]
    InvalidLongitude,

    #[error("Radius must be a non-negative number.")]
    InvalidRadius,
}

pub fn validate_latitude(latitude: f64) -> Result<(), CoordinateError> {
    if latitude.is_finite() && (MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude) {
        Ok(())
    } else {
        Err(CoordinateError::InvalidLatitude)
    }
}

pub fn validate_longitude(longitude: f64) -> Result<(), CoordinateError> {
    if longitude.is_finite() && (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude) {
        Ok(())
    } else {
        Err(CoordinateError::InvalidLongitude)
    }
}

/// Checks both coordinates, latitude first.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), CoordinateError> {
    validate_latitude(latitude)?;
    validate_longitude(longitude)
}

/// Haversine distance in kilometers between two points.
pub fn distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push `a` marginally outside [0, 1] for near-antipodal points.
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// True iff the point lies at most `radius` kilometers from the origin.
pub fn within_radius(
    origin_lat: f64,
    origin_lon: f64,
    point_lat: f64,
    point_lon: f64,
    radius: f64,
) -> bool {
    distance(origin_lat, origin_lon, point_lat, point_lon) <= radius
}

/// A validated radius search around a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Search radius in kilometers.
    pub radius: f64,
}

impl GeoQuery {
    pub fn new(latitude: f64, longitude: f64, radius: f64) -> Result<Self, CoordinateError> {
        validate_coordinates(latitude, longitude)?;
        if !radius.is_finite() || radius < 0.0 {
            return Err(CoordinateError::InvalidRadius);
        }
        Ok(Self {
            latitude,
            longitude,
            radius,
        })
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        within_radius(
            self.latitude,
            self.longitude,
            latitude,
            longitude,
            self.radius,
        )
    }
}
