use crate::{
    config::InterpolationConfig,
    error::Result,
    geo::{SphericalPoint, R_EARTH},
    model::{BasisSet, ObservationSet, SecsModel},
};
use serde::{Deserialize, Serialize};

fn missing() -> f64 {
    f64::NAN
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ObservationVector {
    /// The latitude in degrees.
    #[serde(alias = "latitude")]
    pub lat: f64,
    /// The longitude in degrees.
    #[serde(alias = "longitude")]
    pub lon: f64,
    // Altitude from the surface of the earth where the measurement has been conducted (usually 0)
    // in meters
    #[serde(default, alias = "altitude")]
    pub alt: f64,
    // i vector (usually x magnetometer component) in nano teslas
    pub i: f64,
    // j vector (usually y magnetometer component) in nano teslas
    pub j: f64,
    // k vector (vertical, positive down), left out of the fit when absent
    #[serde(default = "missing")]
    pub k: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PredictionVector {
    /// The latitude in degrees.
    pub lat: f64,
    /// The longitude in degrees.
    pub lon: f64,
    pub i: f64,
    pub j: f64,
    pub k: f64,
}

/// Fits a SECS basis laid out on `config.secs_grid` to the observations and predicts the field on
/// `config.prediction_grid`, latitude-major like the grid itself.
///
/// Without observations the fit is unconstrained and the predicted field is zero everywhere.
pub fn secs_interpolate(
    observations: &[ObservationVector],
    config: &InterpolationConfig,
) -> Result<Vec<PredictionVector>> {
    let basis = BasisSet::new(config.secs_grid.points()?)?;
    let secs = SecsModel::new(basis).with_truncation(config.truncation);

    let (locations, vectors): (Vec<_>, Vec<_>) = observations
        .iter()
        .map(|obs| {
            (
                SphericalPoint::new(obs.lat, obs.lon, R_EARTH + obs.alt),
                [obs.i, obs.j, obs.k],
            )
        })
        .unzip();
    let obs = ObservationSet::new(locations, vectors)?;

    log::debug!(
        "interpolating {} observations with {} SECs",
        obs.len(),
        secs.basis().len()
    );

    let fit = secs.fit(&obs, config.epsilon)?;
    let pred = secs.predict(&fit, &config.prediction_grid.points()?)?;

    Ok(pred
        .iter()
        .map(|(p, b)| PredictionVector {
            lat: p.lat,
            lon: p.lon,
            i: b[0],
            j: b[1],
            k: b[2],
        })
        .collect())
}
