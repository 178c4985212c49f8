use validator::{Validate, ValidationError};

fn validate_run_config(cfg: &RunConfig) -> Result<(), ValidationError> {
    if cfg.n_chains < 1 {
        return Err(ValidationError::new("n_chains must be >= 1"));
    }
    if cfg.n_iterations < 2 {
        return Err(ValidationError::new("n_iterations must be >= 2"));
    }
    if cfg.warmup_iterations >= cfg.n_iterations {
        return Err(ValidationError::new(
            "warmup_iterations must be < n_iterations",
        ));
    }
    if !(cfg.target_accept > 0.0 && cfg.target_accept < 1.0) {
        return Err(ValidationError::new("target_accept must be in (0, 1)"));
    }
    if cfg.max_treedepth < 1 || cfg.max_treedepth > 20 {
        return Err(ValidationError::new("max_treedepth must be in [1, 20]"));
    }
    Ok(())
}

/// Per-point sampler run configuration, handed to the engine.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_run_config"))]
pub struct RunConfig {
    /// Independent chains per experiment point.
    pub n_chains: usize,
    /// Total iterations per chain, warmup included.
    pub n_iterations: usize,
    /// Iterations discarded for step-size adaptation before draws are kept.
    pub warmup_iterations: usize,
    /// Acceptance rate the step-size adaptation aims for.
    pub target_accept: f64,
    /// Cap on trajectory length: at most `2^max_treedepth` integrator steps.
    pub max_treedepth: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            n_chains: 4,
            n_iterations: 5000,
            warmup_iterations: 2500,
            target_accept: 0.8,
            max_treedepth: 15,
        }
    }
}

fn validate_sweep_config(cfg: &SweepConfig) -> Result<(), ValidationError> {
    if cfg.sizes.is_empty() {
        return Err(ValidationError::new("sizes must be non-empty"));
    }
    if cfg.sizes.iter().any(|&s| s < 1) {
        return Err(ValidationError::new("lattice sizes must be >= 1"));
    }
    if cfg.temperatures.is_empty() {
        return Err(ValidationError::new("temperatures must be non-empty"));
    }
    if cfg.temperatures.iter().any(|&t| !(t > 0.0) || !t.is_finite()) {
        return Err(ValidationError::new(
            "temperatures must be finite and strictly positive",
        ));
    }
    if cfg.coupling != 1.0 && cfg.coupling != -1.0 {
        return Err(ValidationError::new("coupling must be +1 or -1"));
    }
    if cfg.vorticity_samples < 1 {
        return Err(ValidationError::new("vorticity_samples must be >= 1"));
    }
    Ok(())
}

/// Full sweep configuration: which (lattice size, temperature) points to
/// sample and how. Validation fails fast, before any sampling begins.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_sweep_config"))]
pub struct SweepConfig {
    /// Side lengths of the square lattices to sweep.
    pub sizes: Vec<usize>,
    /// Temperature grid, sampled in order (warm-starting relies on it).
    pub temperatures: Vec<f64>,
    /// Interaction sign, +1 (ferromagnetic) or -1.
    pub coupling: f64,
    /// Cap on the number of draws fed to the vorticity analyzer per point.
    pub vorticity_samples: usize,
    /// Base RNG seed; chains derive deterministic sub-seeds from it.
    pub base_seed: u64,
    #[validate]
    pub run: RunConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            sizes: vec![4],
            temperatures: (1..=20).map(|i| i as f64 * 0.1).collect(),
            coupling: 1.0,
            vorticity_samples: 1000,
            base_seed: 42,
            run: RunConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        RunConfig::default().validate().unwrap();
        SweepConfig::default().validate().unwrap();
    }

    #[test]
    fn test_rejects_nonpositive_temperature() {
        let cfg = SweepConfig {
            temperatures: vec![0.5, 0.0],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_lattice_dim() {
        let cfg = SweepConfig {
            sizes: vec![4, 0],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_warmup_past_iterations() {
        let cfg = RunConfig {
            n_iterations: 100,
            warmup_iterations: 100,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_fractional_coupling() {
        let cfg = SweepConfig {
            coupling: 0.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_nested_run_config_validated() {
        let cfg = SweepConfig {
            run: RunConfig {
                target_accept: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
