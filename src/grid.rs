use std::ops::Range;

use crate::error::{Result, SecsError};
use crate::geo::SphericalPoint;

/// Return evenly spaced numbers over a specified interval, both ends included.
///
/// # Errors
///
/// Returns [`SecsError::InvalidGrid`] if `end` is not strictly superior to `start` or if `num`
/// is 0.
///
/// # Arguments
///
/// * `start` - The starting value of the sequence.
/// * `end` - The ending value of the sequence.
/// * `num` - The number of samples to generate.
pub fn linspace(start: f64, end: f64, num: usize) -> Result<Vec<f64>> {
    if start.is_nan() || end.is_nan() || end <= start {
        return Err(SecsError::InvalidGrid(format!(
            "end value {} needs to be strictly superior to start value {}",
            end, start
        )));
    }
    if num == 0 {
        return Err(SecsError::InvalidGrid(
            "a grid needs at least one step".to_string(),
        ));
    }

    let mut result = Vec::with_capacity(num);

    if num == 1 {
        result.push(start);
        return Ok(result);
    }

    let step = (end - start) / ((num - 1) as f64);
    for i in 0..num {
        result.push(start + (i as f64) * step);
    }

    Ok(result)
}

/// Generates a grid of points over the provided latitude and longitude ranges, all at the
/// same radius. Points are ordered latitude first, then longitude.
///
/// # Arguments
///
/// * `lat_range` - The range of latitudes in degrees.
/// * `lat_steps` - The number of latitude steps.
/// * `lon_range` - The range of longitudes in degrees.
/// * `lon_steps` - The number of longitude steps.
/// * `radius` - Distance from the center of the earth in meters.
///
/// # Returns
///
/// A vector of `lat_steps * lon_steps` `SphericalPoint` instances.
pub fn geographical_grid(
    lat_range: Range<f64>,
    lat_steps: usize,
    lon_range: Range<f64>,
    lon_steps: usize,
    radius: f64,
) -> Result<Vec<SphericalPoint>> {
    let latitudes = linspace(lat_range.start, lat_range.end, lat_steps)?;
    let longitudes = linspace(lon_range.start, lon_range.end, lon_steps)?;
    let mut result = Vec::with_capacity(lat_steps * lon_steps);

    for lat in latitudes {
        for &lon in &longitudes {
            result.push(SphericalPoint::new(lat, lon, radius));
        }
    }

    Ok(result)
}
