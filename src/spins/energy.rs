use crate::geometry::Lattice;
use crate::spins::SpinField;

/// Total interaction energy `E = -J * Σ_sites Σ_{d ∈ {+x,+y}} σ_i · σ_n(i,d)`.
///
/// Summing only the two forward directions per site counts every neighbor
/// pair exactly once on the torus. Dot products are bounded in [-1, 1], so
/// the total is bounded in `[-2N, 2N]` for `N = n_spins`.
///
/// The field is assumed to satisfy the unit-norm invariant already; the
/// constraint-enforcement layer upstream rejects violating configurations.
pub fn total_energy(lattice: &Lattice, field: &SpinField, coupling: f64) -> f64 {
    let mut acc = 0.0;
    for i in 0..lattice.n_spins {
        let [sx, sy] = field.spin(i);
        for dim in 0..2 {
            let j = lattice.neighbor(i, dim, true);
            let [nx, ny] = field.spin(j);
            acc += sx * nx + sy * ny;
        }
    }
    -coupling * acc
}

/// Energy normalized per site, for cross-lattice-size comparison.
pub fn energy_per_spin(lattice: &Lattice, field: &SpinField, coupling: f64) -> f64 {
    total_energy(lattice, field, coupling) / lattice.n_spins as f64
}

/// Analytic gradient `∂E/∂σ_i = -J * Σ_{4 neighbors} σ_j`, written into
/// `grad` (length `2 * n_spins`, same layout as the field components).
///
/// Both forward and backward neighbors contribute: site `i` appears once as
/// the anchor of its own forward bonds and once as the forward neighbor of
/// each backward partner.
pub fn energy_gradient(lattice: &Lattice, field: &SpinField, coupling: f64, grad: &mut [f64]) {
    debug_assert_eq!(grad.len(), 2 * lattice.n_spins);
    for i in 0..lattice.n_spins {
        let mut gx = 0.0;
        let mut gy = 0.0;
        for dim in 0..2 {
            for forward in [true, false] {
                let j = lattice.neighbor(i, dim, forward);
                let [nx, ny] = field.spin(j);
                gx += nx;
                gy += ny;
            }
        }
        grad[2 * i] = -coupling * gx;
        grad[2 * i + 1] = -coupling * gy;
    }
}
