use crate::geometry::Lattice;
use crate::likelihood::{d_log_weight_d_energy, log_weight};
use crate::spins::energy::{energy_gradient, total_energy};
use crate::spins::SpinField;

/// Raw pairs with a norm below this are degenerate: the direction σ = x/|x|
/// is undefined, so the configuration is rejected before the energy
/// functional ever sees it.
const MIN_RAW_NORM: f64 = 1e-10;

/// The declarative model handed to a [`crate::sampler::SamplerEngine`]:
/// `dim_x * dim_y` independent unit-norm 2-vectors with the canonical
/// Boltzmann weight as the scalar target.
///
/// Engines work in an unconstrained raw space of `2 * n_spins` reals. Each
/// raw pair `x_i` maps to the unit spin `σ_i = x_i / |x_i|`, and the raw
/// vector carries a standard Gaussian base density so the induced
/// distribution over directions is uniform before the energy term — the
/// same embedding Stan uses for `unit_vector` parameters. The target is
///
/// ```text
/// logp(x) = -E(σ(x)) / T  -  ½ Σ |x_i|²
/// ```
///
/// with the gradient obtained by projecting the energy gradient onto the
/// tangent of each unit circle.
pub struct XyModel {
    pub lattice: Lattice,
    pub coupling: f64,
    pub temperature: f64,
}

impl XyModel {
    pub fn new(lattice: Lattice, coupling: f64, temperature: f64) -> Self {
        Self {
            lattice,
            coupling,
            temperature,
        }
    }

    /// Dimension of the raw parameter space.
    #[inline]
    pub fn n_params(&self) -> usize {
        2 * self.lattice.n_spins
    }

    /// Normalize a raw parameter vector into a [`SpinField`].
    ///
    /// Returns `None` if any pair is degenerate; engines treat that exactly
    /// like a `-inf` log-density (reject the proposal).
    pub fn spins_from_raw(&self, raw: &[f64]) -> Option<SpinField> {
        debug_assert_eq!(raw.len(), self.n_params());
        let mut components = vec![0.0; raw.len()];
        for i in 0..self.lattice.n_spins {
            let (rx, ry) = (raw[2 * i], raw[2 * i + 1]);
            let r = (rx * rx + ry * ry).sqrt();
            if r < MIN_RAW_NORM {
                return None;
            }
            components[2 * i] = rx / r;
            components[2 * i + 1] = ry / r;
        }
        Some(SpinField {
            dim_x: self.lattice.dim_x,
            dim_y: self.lattice.dim_y,
            components,
        })
    }

    /// Raw starting point corresponding to a given spin configuration.
    /// Unit vectors are themselves valid raw coordinates.
    pub fn raw_from_spins(&self, field: &SpinField) -> Vec<f64> {
        debug_assert_eq!(field.components.len(), self.n_params());
        field.components.clone()
    }

    /// Evaluate the joint log-density and write its gradient into `grad`.
    ///
    /// Returns `f64::NEG_INFINITY` (with `grad` zeroed) for degenerate raw
    /// pairs; finite otherwise.
    pub fn logp_and_grad(&self, raw: &[f64], grad: &mut [f64]) -> f64 {
        debug_assert_eq!(raw.len(), self.n_params());
        debug_assert_eq!(grad.len(), self.n_params());

        let field = match self.spins_from_raw(raw) {
            Some(f) => f,
            None => {
                grad.fill(0.0);
                return f64::NEG_INFINITY;
            }
        };

        let energy = total_energy(&self.lattice, &field, self.coupling);
        let mut de_dsigma = vec![0.0; self.n_params()];
        energy_gradient(&self.lattice, &field, self.coupling, &mut de_dsigma);
        let scale = d_log_weight_d_energy(self.temperature);

        let mut base = 0.0;
        for i in 0..self.lattice.n_spins {
            let (rx, ry) = (raw[2 * i], raw[2 * i + 1]);
            let r = (rx * rx + ry * ry).sqrt();
            let [sx, sy] = field.spin(i);

            // dlogp/dσ_i, then project onto the tangent of the unit circle
            // and rescale by 1/r (Jacobian of σ = x/|x|).
            let gx = scale * de_dsigma[2 * i];
            let gy = scale * de_dsigma[2 * i + 1];
            let radial = gx * sx + gy * sy;
            grad[2 * i] = (gx - radial * sx) / r - rx;
            grad[2 * i + 1] = (gy - radial * sy) / r - ry;

            base += rx * rx + ry * ry;
        }

        log_weight(self.temperature, energy) - 0.5 * base
    }
}
