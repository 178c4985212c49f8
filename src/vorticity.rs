//! Topological charge of sampled configurations.
//!
//! For every plaquette the four corner spins are traversed in a fixed
//! counter-clockwise order and the shortest signed angle between
//! consecutive corners is accumulated. The sum is an exact multiple of 2π
//! up to float error: +2π marks a counter-clockwise vortex, −2π its
//! clockwise partner (antivortex). On the torus the two populations are
//! equal in count; only the counter-clockwise one enters the reported
//! density, matching the source data this crate reproduces.

use crate::geometry::Lattice;
use crate::spins::SpinField;

/// Winding magnitude (radians) above which a cell is classified a vortex.
///
/// True windings land on exact multiples of 2π, so anything comfortably
/// between 0 and 2π separates the classes; 1 radian is a heuristic
/// tolerance, not a principled bound.
pub const WINDING_THRESHOLD: f64 = 1.0;

/// Shortest signed angle from spin `a` to spin `b`.
///
/// The dot product is clamped before `acos`: accumulated float error can
/// push it past ±1 by epsilon and must not NaN the winding sum.
#[inline]
fn signed_angle(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dot = (a[0] * b[0] + a[1] * b[1]).clamp(-1.0, 1.0);
    let cross = a[0] * b[1] - a[1] * b[0];
    // Antipodal corners (cross exactly 0) contribute nothing, like the
    // zero sign convention of the reference data.
    let sign = if cross > 0.0 {
        1.0
    } else if cross < 0.0 {
        -1.0
    } else {
        0.0
    };
    dot.acos() * sign
}

/// Sum of the four signed corner-to-corner angles around the plaquette
/// anchored at `(x, y)`.
pub fn plaquette_winding(lattice: &Lattice, field: &SpinField, x: usize, y: usize) -> f64 {
    let corners = lattice.plaquette(x, y);
    let mut winding = 0.0;
    for k in 0..4 {
        let a = field.spin(corners[k]);
        let b = field.spin(corners[(k + 1) % 4]);
        winding += signed_angle(a, b);
    }
    winding
}

/// Per-cell topological charge: +1 counter-clockwise, −1 clockwise, 0
/// otherwise. Row-major over plaquette anchors.
pub fn vortex_field(lattice: &Lattice, field: &SpinField) -> Vec<i8> {
    let mut charges = Vec::with_capacity(lattice.n_spins);
    for x in 0..lattice.dim_x {
        for y in 0..lattice.dim_y {
            let w = plaquette_winding(lattice, field, x, y);
            charges.push(if w > WINDING_THRESHOLD {
                1
            } else if w < -WINDING_THRESHOLD {
                -1
            } else {
                0
            });
        }
    }
    charges
}

/// Number of counter-clockwise vortices in the configuration.
pub fn vortex_count(lattice: &Lattice, field: &SpinField) -> usize {
    vortex_field(lattice, field)
        .iter()
        .filter(|&&c| c > 0)
        .count()
}

/// Vortices per lattice site.
pub fn vortex_density(lattice: &Lattice, field: &SpinField) -> f64 {
    vortex_count(lattice, field) as f64 / lattice.n_spins as f64
}
