pub mod energy;

use rand::Rng;
use rand_xoshiro::Xoshiro256StarStar;

/// One microstate of the lattice: a 2D unit vector per site.
///
/// Components are stored in a single flat `Vec` of length `2 * n_spins`,
/// where site `i` occupies `components[2*i .. 2*i + 2]` as `(sx, sy)`.
/// Every accepted draw satisfies the unit-norm invariant within
/// [`UNIT_NORM_TOL`]; producers that cannot guarantee it must go through
/// [`SpinField::validate_norms`] before handing the field to the energy
/// functional.
#[derive(Debug, Clone)]
pub struct SpinField {
    pub dim_x: usize,
    pub dim_y: usize,
    /// Flat components, length `2 * dim_x * dim_y`.
    pub components: Vec<f64>,
}

/// Tolerance on `|σ|² − 1` for the unit-norm invariant.
pub const UNIT_NORM_TOL: f64 = 1e-8;

impl SpinField {
    /// All spins pointing along +y — the cold start used at the lowest
    /// temperature of a sweep.
    pub fn aligned(dim_x: usize, dim_y: usize) -> Self {
        let n = dim_x * dim_y;
        let mut components = vec![0.0; 2 * n];
        for i in 0..n {
            components[2 * i + 1] = 1.0;
        }
        Self {
            dim_x,
            dim_y,
            components,
        }
    }

    /// Build a field from one angle per site (row-major, radians).
    pub fn from_angles(dim_x: usize, dim_y: usize, angles: &[f64]) -> Self {
        assert_eq!(angles.len(), dim_x * dim_y);
        let mut components = Vec::with_capacity(2 * angles.len());
        for &theta in angles {
            components.push(theta.cos());
            components.push(theta.sin());
        }
        Self {
            dim_x,
            dim_y,
            components,
        }
    }

    /// Uniformly random spin directions.
    pub fn random(dim_x: usize, dim_y: usize, rng: &mut Xoshiro256StarStar) -> Self {
        let n = dim_x * dim_y;
        let angles: Vec<f64> = (0..n)
            .map(|_| rng.gen::<f64>() * std::f64::consts::TAU)
            .collect();
        Self::from_angles(dim_x, dim_y, &angles)
    }

    #[inline]
    pub fn n_spins(&self) -> usize {
        self.dim_x * self.dim_y
    }

    /// Components of the spin at flat site index `i`.
    #[inline]
    pub fn spin(&self, i: usize) -> [f64; 2] {
        [self.components[2 * i], self.components[2 * i + 1]]
    }

    /// Angle of the spin at flat site index `i`, in (−π, π].
    #[inline]
    pub fn angle(&self, i: usize) -> f64 {
        self.components[2 * i + 1].atan2(self.components[2 * i])
    }

    /// Check the unit-norm invariant on every site.
    pub fn validate_norms(&self, tol: f64) -> Result<(), String> {
        for i in 0..self.n_spins() {
            let [sx, sy] = self.spin(i);
            let norm2 = sx * sx + sy * sy;
            if (norm2 - 1.0).abs() > tol {
                return Err(format!(
                    "spin {i} violates unit-norm constraint: |sigma|^2 = {norm2}"
                ));
            }
        }
        Ok(())
    }

    /// Order parameter `|Σ σ| / N`.
    pub fn magnetization(&self) -> f64 {
        let mut mx = 0.0;
        let mut my = 0.0;
        for i in 0..self.n_spins() {
            let [sx, sy] = self.spin(i);
            mx += sx;
            my += sy;
        }
        (mx * mx + my * my).sqrt() / self.n_spins() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_aligned_field() {
        let field = SpinField::aligned(4, 4);
        field.validate_norms(UNIT_NORM_TOL).unwrap();
        assert!((field.magnetization() - 1.0).abs() < 1e-12);
        assert_eq!(field.spin(7), [0.0, 1.0]);
    }

    #[test]
    fn test_random_field_norms() {
        let mut rng = Xoshiro256StarStar::seed_from_u64(7);
        let field = SpinField::random(8, 8, &mut rng);
        field.validate_norms(UNIT_NORM_TOL).unwrap();
    }

    #[test]
    fn test_norm_violation_detected() {
        let mut field = SpinField::aligned(2, 2);
        field.components[0] = 0.5;
        field.components[1] = 0.5;
        assert!(field.validate_norms(UNIT_NORM_TOL).is_err());
    }

    #[test]
    fn test_angle_roundtrip() {
        let angles = [0.0, 1.2, -2.5, 3.0];
        let field = SpinField::from_angles(2, 2, &angles);
        for (i, &theta) in angles.iter().enumerate() {
            assert!((field.angle(i) - theta).abs() < 1e-12);
        }
    }
}
