use log::debug;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SecsError};
use crate::geo::{validate_points, SphericalPoint};
use crate::svd::{solve_svd, validate_epsilon, Inversion, Truncation};
use crate::t_df::TransferMatrix;

/// Ordered set of divergence-free SEC poles. The position of a pole is the index of its
/// amplitude in a [`FitResult`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasisSet {
    points: Vec<SphericalPoint>,
}

impl BasisSet {
    /// # Errors
    /// [`SecsError::InvalidGeometry`] for the first invalid pole.
    pub fn new(points: Vec<SphericalPoint>) -> Result<Self> {
        validate_points(&points)?;
        Ok(Self { points })
    }

    pub fn points(&self) -> &[SphericalPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Measured vectors `(Bx, By, Bz)` (north, east, down) at a set of locations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObservationSet {
    locations: Vec<SphericalPoint>,
    vectors: Vec<[f64; 3]>,
    /// Standard deviation of each component, unit when missing
    std: Option<Vec<[f64; 3]>>,
}

impl ObservationSet {
    /// Pairs every location with its measured vector. Non-finite components are treated as
    /// missing measurements.
    ///
    /// # Errors
    /// * [`SecsError::DimensionMismatch`] if there is not one vector per location
    /// * [`SecsError::InvalidGeometry`] for the first invalid location
    pub fn new(locations: Vec<SphericalPoint>, vectors: Vec<[f64; 3]>) -> Result<Self> {
        if locations.len() != vectors.len() {
            return Err(SecsError::DimensionMismatch {
                what: "observed vectors",
                expected: locations.len(),
                found: vectors.len(),
            });
        }
        validate_points(&locations)?;

        Ok(Self {
            locations,
            vectors,
            std: None,
        })
    }

    /// Attaches a standard deviation to every measured component. `+inf` disables a component.
    ///
    /// # Errors
    /// * [`SecsError::DimensionMismatch`] if there is not one entry per location
    /// * [`SecsError::InvalidUncertainty`] if a standard deviation is not strictly positive
    pub fn with_std(mut self, std: Vec<[f64; 3]>) -> Result<Self> {
        if std.len() != self.locations.len() {
            return Err(SecsError::DimensionMismatch {
                what: "standard deviations",
                expected: self.locations.len(),
                found: std.len(),
            });
        }

        for (index, components) in std.iter().enumerate() {
            if let Some(&value) = components.iter().find(|v| v.is_nan() || **v <= 0.0) {
                return Err(SecsError::InvalidUncertainty { index, value });
            }
        }

        self.std = Some(std);
        Ok(self)
    }

    pub fn locations(&self) -> &[SphericalPoint] {
        &self.locations
    }

    pub fn vectors(&self) -> &[[f64; 3]] {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Weight of component `c` of observation `m`, 0 when it is missing.
    fn weight(&self, m: usize, c: usize) -> f64 {
        if !self.vectors[m][c].is_finite() {
            return 0.0;
        }

        match &self.std {
            Some(std) => 1.0 / std[m][c],
            None => 1.0,
        }
    }
}

/// Amplitudes of the SECs for one fit, in basis order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FitResult {
    pub amplitudes: Vec<f64>,
    /// Diagonal of the amplitude covariance. `+inf` for amplitudes nothing constrains.
    pub variances: Vec<f64>,
}

impl From<Inversion> for FitResult {
    fn from(inv: Inversion) -> Self {
        Self {
            amplitudes: inv.amplitudes,
            variances: inv.variances,
        }
    }
}

/// Predicted `(Bx, By, Bz)` at each target location, in target order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PredictionSet {
    pub locations: Vec<SphericalPoint>,
    pub vectors: Vec<[f64; 3]>,
}

impl PredictionSet {
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SphericalPoint, &[f64; 3])> {
        self.locations.iter().zip(self.vectors.iter())
    }
}

/// Fits SEC amplitudes to the observations with the given truncation of the SVD.
pub fn fit_with_truncation(
    basis: &BasisSet,
    observations: &ObservationSet,
    epsilon: f64,
    truncation: Truncation,
) -> Result<FitResult> {
    let nsec = basis.len();
    if nsec == 0 {
        return Ok(FitResult::default());
    }
    validate_epsilon(epsilon)?;

    debug!(
        "fitting {} observations with {} SECs (epsilon {}, {:?})",
        observations.len(),
        nsec,
        epsilon,
        truncation
    );

    let mut t_flat: Array2<f64> =
        TransferMatrix::build(observations.locations(), basis)?.flatten();
    let mut b_flat = Array1::<f64>::zeros(observations.len() * 3);

    for (m, vector) in observations.vectors().iter().enumerate() {
        for (c, &value) in vector.iter().enumerate() {
            let row = 3 * m + c;
            let weight = observations.weight(m, c);
            if weight != 1.0 {
                t_flat.row_mut(row).mapv_inplace(|v| v * weight);
            }
            b_flat[row] = if weight == 0.0 { 0.0 } else { value * weight };
        }
    }

    solve_svd(&t_flat, &b_flat, epsilon, truncation).map(FitResult::from)
}

/// Fits SEC amplitudes to the observations, relative truncation of the singular values.
///
/// # Arguments
/// * `basis` - The SEC poles
/// * `observations` - Measured vectors, may be empty
/// * `epsilon` - Singular values below `epsilon * max` are discarded, in `(0, 1)`
pub fn fit(basis: &BasisSet, observations: &ObservationSet, epsilon: f64) -> Result<FitResult> {
    fit_with_truncation(basis, observations, epsilon, Truncation::Relative)
}

/// Field at `targets` produced by the fitted amplitudes of `basis`.
///
/// # Errors
/// * [`SecsError::DimensionMismatch`] if `fit` was not made against a basis of this size
/// * [`SecsError::InvalidGeometry`] for the first invalid target
pub fn predict(
    fit: &FitResult,
    basis: &BasisSet,
    targets: &[SphericalPoint],
) -> Result<PredictionSet> {
    if fit.amplitudes.len() != basis.len() {
        return Err(SecsError::DimensionMismatch {
            what: "amplitudes",
            expected: basis.len(),
            found: fit.amplitudes.len(),
        });
    }

    let t_pred = TransferMatrix::build(targets, basis)?;

    Ok(PredictionSet {
        locations: targets.to_vec(),
        vectors: t_pred.apply(&fit.amplitudes)?,
    })
}

/// A fixed set of SECs. Holds no fitted state: every [`SecsModel::fit`] returns an independent
/// [`FitResult`] and the model can be shared across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct SecsModel {
    basis: BasisSet,
    truncation: Truncation,
}

impl SecsModel {
    pub fn new(basis: BasisSet) -> Self {
        Self {
            basis,
            truncation: Truncation::default(),
        }
    }

    pub fn with_truncation(mut self, truncation: Truncation) -> Self {
        self.truncation = truncation;
        self
    }

    pub fn basis(&self) -> &BasisSet {
        &self.basis
    }

    pub fn fit(&self, observations: &ObservationSet, epsilon: f64) -> Result<FitResult> {
        fit_with_truncation(&self.basis, observations, epsilon, self.truncation)
    }

    pub fn predict(&self, fit: &FitResult, targets: &[SphericalPoint]) -> Result<PredictionSet> {
        predict(fit, &self.basis, targets)
    }

    /// Transfer matrix from this basis to `targets`, to be reused with [`SecsModel::predict_with`].
    pub fn transfer_matrix(&self, targets: &[SphericalPoint]) -> Result<TransferMatrix> {
        TransferMatrix::build(targets, &self.basis)
    }

    /// Same as [`SecsModel::predict`] with a transfer matrix built beforehand.
    pub fn predict_with(&self, t_pred: &TransferMatrix, fit: &FitResult) -> Result<Vec<[f64; 3]>> {
        if t_pred.n_basis() != self.basis.len() {
            return Err(SecsError::DimensionMismatch {
                what: "transfer matrix basis",
                expected: self.basis.len(),
                found: t_pred.n_basis(),
            });
        }

        t_pred.apply(&fit.amplitudes)
    }
}
