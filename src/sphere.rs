use std::f64::consts::FRAC_PI_2;

use ndarray::Array2;

use crate::geo::SphericalPoint;

/// Angular distance in radians between two points, spherical law of cosines.
/// Radii are ignored.
fn pair_angular_distance(p1: &SphericalPoint, p2: &SphericalPoint) -> f64 {
    // exact zero for coincident points, acos(1 - ulp) would give ~1.5e-8
    if p1.lat == p2.lat && p1.lon == p2.lon {
        return 0.0;
    }

    let (lat1, lat2) = (p1.lat_rad(), p2.lat_rad());
    let dlon = p2.lon_rad() - p1.lon_rad();

    // Clamp before acos, round-off on identical or antipodal points leaves [-1, 1]
    (lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * dlon.cos())
        .clamp(-1.0, 1.0)
        .acos()
}

/// Bearing from `p1` towards `p2`, going from the local east axis towards north.
fn pair_bearing(p1: &SphericalPoint, p2: &SphericalPoint) -> f64 {
    let (lat1, lat2) = (p1.lat_rad(), p2.lat_rad());
    let dlon = p2.lon_rad() - p1.lon_rad();

    let x = lat2.cos() * dlon.sin();
    let y = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    // pi/2 - forward azimuth: rotates the SEC (colatitude, longitude) frame into the
    // observation (north, east) frame. Identical points give atan2(0, 0) = 0, i.e. pi/2.
    FRAC_PI_2 - x.atan2(y)
}

/// Calculates the angular distance between two sets of points
///
/// # Arguments
/// * `points1` - First set of points, latitude and longitude in degrees
/// * `points2` - Second set of points, latitude and longitude in degrees
///
/// # Returns
/// A `[points1.len(), points2.len()]` matrix of angular distances in radians
pub fn angular_distance(points1: &[SphericalPoint], points2: &[SphericalPoint]) -> Array2<f64> {
    Array2::from_shape_fn((points1.len(), points2.len()), |(i, j)| {
        pair_angular_distance(&points1[i], &points2[j])
    })
}

/// Calculates the bearing from each point in `points1` to each point in `points2`
///
/// The angle is `pi/2 - azimuth`, where the azimuth is measured clockwise from true north.
/// This is the angle needed to rotate a SEC local field into the observation's
/// north/east frame, not a compass bearing.
///
/// # Returns
/// A `[points1.len(), points2.len()]` matrix of angles in radians
pub fn bearing(points1: &[SphericalPoint], points2: &[SphericalPoint]) -> Array2<f64> {
    Array2::from_shape_fn((points1.len(), points2.len()), |(i, j)| {
        pair_bearing(&points1[i], &points2[j])
    })
}

/// Calculates both the angular distance and the bearing in a single pass.
///
/// # Returns
/// A tuple of `(theta, alpha)` matrices, see [`angular_distance`] and [`bearing`]
pub fn angular_distance_and_bearing(
    points1: &[SphericalPoint],
    points2: &[SphericalPoint],
) -> (Array2<f64>, Array2<f64>) {
    let shape = (points1.len(), points2.len());
    let mut theta = Array2::<f64>::zeros(shape);
    let mut alpha = Array2::<f64>::zeros(shape);

    for (i, p1) in points1.iter().enumerate() {
        for (j, p2) in points2.iter().enumerate() {
            theta[[i, j]] = pair_angular_distance(p1, p2);
            alpha[[i, j]] = pair_bearing(p1, p2);
        }
    }

    (theta, alpha)
}
