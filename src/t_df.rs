use ndarray::{Array1, Array2, Array3, ArrayView1, Zip};

use crate::error::{Result, SecsError};
use crate::geo::{validate_points, SphericalPoint};
use crate::model::BasisSet;
use crate::sphere::angular_distance_and_bearing;

/// Physical constant: permeability of free space over 4π (µ0 / 4π)
const MU0_4PI: f64 = 1e-7;

/// Radial and colatitudinal field at radius `obs_r` produced by a unit divergence-free SEC at
/// radius `sec_r`, `theta` radians away (given through its cosine).
///
/// The over/under choice is made for this pair only: a basis spanning several altitudes can
/// be both above and below the same observation.
fn sec_field(cos_theta: f64, obs_r: f64, sec_r: f64) -> (f64, f64) {
    if obs_r > sec_r {
        let x = sec_r / obs_r;
        let factor = 1.0 / (1.0 - 2.0 * x * cos_theta + x.powi(2)).sqrt();

        // Amm & Viljanen: Equation A.7
        let br = MU0_4PI * x / obs_r * (factor - 1.0);
        // Amm & Viljanen: Equation A.8
        let b_theta = -MU0_4PI / obs_r
            * ((obs_r - sec_r * cos_theta)
                / (obs_r.powi(2) - 2.0 * obs_r * sec_r * cos_theta + sec_r.powi(2)).sqrt()
                - 1.0);

        (br, b_theta)
    } else {
        let x = obs_r / sec_r;
        // Infinite when obs_r == sec_r and theta == 0, kept as is
        let factor = 1.0 / (1.0 - 2.0 * x * cos_theta + x.powi(2)).sqrt();

        // Amm & Viljanen: Equation 9
        let br = MU0_4PI / obs_r * (factor - 1.0);
        // Amm & Viljanen: Equation 10
        let b_theta = -MU0_4PI / obs_r * (factor * (x - cos_theta) + cos_theta);

        (br, b_theta)
    }
}

/// Calculates the "Transfer Matrix" (T) for Divergence-Free Spherical Elementary Current
/// Systems (SECS).
///
/// **What it does:**
/// This function determines the magnetic field influence that each elementary current located at
/// `secs_locs` (usually ~110km above the ground) would have on each point of `obs_locs`.
/// Divergence-free SECS represent currents that flow in closed loops around their pole.
///
/// **The Physics:**
/// The fields are analytical solutions of the Biot-Savart law for the geometry of a spherical
/// elementary current, from Amm & Viljanen (ionospheric field continuation). Comments reference
/// the equations of that paper (Eq. 9, 10, A.7, A.8).
/// (See: https://link.springer.com/content/pdf/10.1007/978-3-030-26732-2.pdf)
///
/// `B_theta` only matters divided by `sin(theta)`. Where `sin(theta) == 0` the horizontal
/// contribution is set to 0. `B_r` is left untouched, it is `+inf` when an observation sits exactly
/// on a SEC pole at the same radius.
///
/// **The Transfer Matrix (Output):**
/// Each element `T[i][k][j]` is the k-th component (0=Bx/North, 1=By/East, 2=Bz/Down) of the
/// field at `obs_locs[i]` caused by a unit amplitude at `secs_locs[j]`.
///
/// # Returns
/// `Array3<f64>` with dimensions [nobs][3][nsec].
pub fn t_df(obs_locs: &[SphericalPoint], secs_locs: &[SphericalPoint]) -> Array3<f64> {
    let nobs = obs_locs.len();
    let nsec = secs_locs.len();

    let (theta, alpha) = angular_distance_and_bearing(obs_locs, secs_locs);

    let mut t = Array3::<f64>::zeros((nobs, 3, nsec));

    Zip::indexed(&theta)
        .and(&alpha)
        .for_each(|(i, j), &theta, &alpha| {
            let (br, b_theta) = sec_field(theta.cos(), obs_locs[i].r, secs_locs[j].r);

            let sin_theta = theta.sin();
            let b_theta_divided = if sin_theta == 0.0 {
                0.0
            } else {
                b_theta / sin_theta
            };

            t[[i, 0, j]] = -b_theta_divided * alpha.sin();
            t[[i, 1, j]] = -b_theta_divided * alpha.cos();
            t[[i, 2, j]] = -br;
        });

    t
}

/// Transfer matrix between a basis and a set of locations, `[locations][3][basis]`.
///
/// Deterministic for given inputs, so callers can keep one around for a fixed
/// prediction grid and reuse it with [`crate::model::SecsModel::predict_with`].
#[derive(Debug, Clone, PartialEq)]
pub struct TransferMatrix(Array3<f64>);

impl TransferMatrix {
    /// Builds the transfer matrix from `basis` to `locations`.
    ///
    /// # Errors
    /// [`SecsError::InvalidGeometry`] if any of the locations is not a valid point.
    pub fn build(locations: &[SphericalPoint], basis: &BasisSet) -> Result<Self> {
        validate_points(locations)?;
        Ok(Self(t_df(locations, basis.points())))
    }

    /// Number of locations (M)
    pub fn n_locations(&self) -> usize {
        self.0.dim().0
    }

    /// Number of basis elements (N)
    pub fn n_basis(&self) -> usize {
        self.0.dim().2
    }

    pub fn as_array(&self) -> &Array3<f64> {
        &self.0
    }

    /// Stacks locations and components into rows, `(3M, N)`. Row `3 * m + c` is
    /// component `c` of location `m`.
    pub fn flatten(&self) -> Array2<f64> {
        let (nloc, _, nsec) = self.0.dim();
        Array2::from_shape_fn((nloc * 3, nsec), |(row, j)| self.0[[row / 3, row % 3, j]])
    }

    /// Field at every location for the given basis amplitudes.
    ///
    /// # Errors
    /// [`SecsError::DimensionMismatch`] if there is not exactly one amplitude per basis element.
    pub fn apply(&self, amplitudes: &[f64]) -> Result<Vec<[f64; 3]>> {
        if amplitudes.len() != self.n_basis() {
            return Err(SecsError::DimensionMismatch {
                what: "amplitudes",
                expected: self.n_basis(),
                found: amplitudes.len(),
            });
        }

        let b: Array1<f64> = self.flatten().dot(&ArrayView1::from(amplitudes));

        Ok(b.to_vec()
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect())
    }
}
