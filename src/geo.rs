use serde::{Deserialize, Serialize};

use crate::error::{Result, SecsError};

// Earth radius in meters
pub const R_EARTH: f64 = 6371e3;

/// A point on or above the sphere.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Copy)]
pub struct SphericalPoint {
    /// The latitude in degrees
    pub lat: f64,
    /// The longitude in degrees, not wrapped
    pub lon: f64,
    /// Distance from the center of the earth in meters (not the altitude)
    pub r: f64,
}

impl SphericalPoint {
    pub fn new(latitude: f64, longitude: f64, radius: f64) -> Self {
        Self {
            lat: latitude,
            lon: longitude,
            r: radius,
        }
    }

    /// Builds a point `altitude` meters above the surface of the earth.
    pub fn from_altitude(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self::new(latitude, longitude, R_EARTH + altitude)
    }

    /// Returns latitude in radians
    pub fn lat_rad(&self) -> f64 {
        self.lat.to_radians()
    }

    /// Returns longitude in radians
    pub fn lon_rad(&self) -> f64 {
        self.lon.to_radians()
    }

    /// Checks that the point can go through the transfer function without
    /// producing NaN. `index` is only used to locate the point in the error.
    pub fn validate(&self, index: usize) -> Result<()> {
        let reason = if !self.lat.is_finite() {
            format!("latitude {} is not finite", self.lat)
        } else if !self.lon.is_finite() {
            format!("longitude {} is not finite", self.lon)
        } else if !self.r.is_finite() {
            format!("radius {} is not finite", self.r)
        } else if self.r <= 0.0 {
            format!("radius {} must be strictly positive", self.r)
        } else if !(-90.0..=90.0).contains(&self.lat) {
            format!("latitude {} is outside [-90, 90]", self.lat)
        } else {
            return Ok(());
        };

        Err(SecsError::InvalidGeometry { index, reason })
    }
}

/// Validates every point of a slice, failing on the first invalid one.
pub fn validate_points(points: &[SphericalPoint]) -> Result<()> {
    points
        .iter()
        .enumerate()
        .try_for_each(|(index, point)| point.validate(index))
}
