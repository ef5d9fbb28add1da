use serde::{Deserialize, Serialize};

use crate::error::{Result, SecsError};
use crate::geo::{SphericalPoint, R_EARTH};
use crate::grid::geographical_grid;
use crate::svd::Truncation;

/// A regular latitude/longitude grid at a fixed altitude.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// `[start, end]` in degrees, both included
    pub lat_range: [f64; 2],
    pub lat_steps: usize,
    /// `[start, end]` in degrees, both included
    pub lon_range: [f64; 2],
    pub lon_steps: usize,
    /// Altitude above the surface of the earth in meters
    pub altitude: f64,
}

impl GridConfig {
    pub fn points(&self) -> Result<Vec<SphericalPoint>> {
        geographical_grid(
            self.lat_range[0]..self.lat_range[1],
            self.lat_steps,
            self.lon_range[0]..self.lon_range[1],
            self.lon_steps,
            R_EARTH + self.altitude,
        )
    }
}

/// Parameters of [`crate::secs::secs_interpolate`]. Missing fields take the default values.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct InterpolationConfig {
    /// Where the SEC poles are placed
    pub secs_grid: GridConfig,
    /// Where the field is predicted
    pub prediction_grid: GridConfig,
    /// Regularization of the SVD, see [`Truncation`]
    pub epsilon: f64,
    pub truncation: Truncation,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            secs_grid: GridConfig {
                lat_range: [45.0, 85.0],
                lat_steps: 50,
                lon_range: [-180.0, 179.0],
                lon_steps: 50,
                altitude: 110e3,
            },
            prediction_grid: GridConfig {
                lat_range: [45.0, 85.0],
                lat_steps: 37,
                lon_range: [-180.0, 179.0],
                lon_steps: 130,
                altitude: 0.0,
            },
            epsilon: 0.1,
            truncation: Truncation::Relative,
        }
    }
}

impl InterpolationConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| SecsError::Config(e.to_string()))
    }
}
