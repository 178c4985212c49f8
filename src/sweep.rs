use validator::Validate;

use crate::config::SweepConfig;
use crate::geometry::Lattice;
use crate::model::XyModel;
use crate::sampler::{Chain, SampleOutput, SamplerEngine};
use crate::spins::SpinField;
use crate::stats::Moments;
use crate::vorticity::vortex_density;

/// Acceptable band for the potential scale reduction statistic.
pub const RHAT_BOUNDS: (f64, f64) = (0.9, 1.1);
/// A chain counts as well mixed when the effective sample size reaches this
/// fraction of the kept draws.
pub const ESS_FRACTION: f64 = 0.1;

/// One (lattice size, temperature) entry of the sweep, immutable once all
/// chains have finished. Statistics outside the convergence band are kept
/// but flagged; sampling is never retried.
#[derive(Debug, Clone)]
pub struct ExperimentPoint {
    pub dim_x: usize,
    pub dim_y: usize,
    pub temperature: f64,
    /// ⟨E⟩ / N over all kept draws.
    pub mean_energy_per_spin: f64,
    /// Var(E / N).
    pub energy_per_spin_variance: f64,
    /// Var(E) / N / T².
    pub specific_heat: f64,
    /// Mean counter-clockwise vortices per site over the draw subsample.
    pub vortex_density: f64,
    /// Mean order parameter over the draw subsample.
    pub magnetization: f64,
    pub rhat: f64,
    pub ess: f64,
    pub divergences: usize,
    /// Set when the diagnostics fall outside the acceptance bounds.
    pub low_confidence: bool,
    pub chains: Vec<Chain>,
}

/// Derive an [`ExperimentPoint`] from one engine run.
fn summarize_point(
    lattice: &Lattice,
    temperature: f64,
    vorticity_samples: usize,
    output: SampleOutput,
) -> ExperimentPoint {
    let n_draws = output.n_draws();
    let n_spins = lattice.n_spins as f64;

    // Pooled subsample for the topological observables: every stride-th
    // draw, bounded by the configured cap.
    let stride = n_draws.div_ceil(vorticity_samples).max(1);
    let mut vortices = Moments::new();
    let mut mags = Moments::new();
    for (idx, draw) in output
        .chains
        .iter()
        .flat_map(|c| c.draws.iter())
        .enumerate()
    {
        if idx % stride != 0 {
            continue;
        }
        vortices.update(vortex_density(lattice, &draw.spins));
        mags.update(draw.spins.magnetization());
    }

    let rhat = output.energy_per_spin.rhat;
    let ess = output.energy_per_spin.ess;
    let low_confidence =
        !(RHAT_BOUNDS.0..=RHAT_BOUNDS.1).contains(&rhat) || ess < ESS_FRACTION * n_draws as f64;

    ExperimentPoint {
        dim_x: lattice.dim_x,
        dim_y: lattice.dim_y,
        temperature,
        mean_energy_per_spin: output.energy_per_spin.mean,
        energy_per_spin_variance: output.energy_per_spin.variance,
        specific_heat: output.energy.variance / n_spins / (temperature * temperature),
        vortex_density: vortices.mean(),
        magnetization: mags.mean(),
        rhat,
        ess,
        divergences: output.chains.iter().map(|c| c.divergences).sum(),
        low_confidence,
        chains: output.chains,
    }
}

/// Run the full sweep: for each lattice size, walk the temperature grid in
/// order, sampling one experiment point per entry.
///
/// The first temperature of each size starts every chain from the aligned
/// configuration; each later temperature warm-starts from the previous
/// point's final draws, so low-temperature points inherit an equilibrated
/// state. `on_point` is called once per finished point (useful for
/// progress bars).
pub fn run_sweep_loop(
    engine: &dyn SamplerEngine,
    cfg: &SweepConfig,
    on_point: &(dyn Fn() + Sync),
) -> Result<Vec<ExperimentPoint>, String> {
    cfg.validate().map_err(|e| format!("{e}"))?;

    let mut points = Vec::with_capacity(cfg.sizes.len() * cfg.temperatures.len());
    let mut point_idx = 0u64;

    for &size in &cfg.sizes {
        let lattice = Lattice::new(size, size);
        let mut init: Vec<SpinField> =
            (0..cfg.run.n_chains).map(|_| SpinField::aligned(size, size)).collect();

        for &temperature in &cfg.temperatures {
            let model = XyModel::new(Lattice::new(size, size), cfg.coupling, temperature);
            let seed = cfg.base_seed + point_idx * cfg.run.n_chains as u64;
            let output = engine.sample(&model, Some(&init), &cfg.run, seed)?;

            for (slot, chain) in init.iter_mut().zip(output.chains.iter()) {
                if let Some(last) = chain.draws.last() {
                    *slot = last.spins.clone();
                }
            }

            points.push(summarize_point(
                &lattice,
                temperature,
                cfg.vorticity_samples,
                output,
            ));
            on_point();
            point_idx += 1;
        }
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::sampler::{Draw, HmcEngine, ScalarSummary};

    fn constant_output(lattice: &Lattice, energy: f64, n: usize) -> SampleOutput {
        let field = SpinField::aligned(lattice.dim_x, lattice.dim_y);
        let eps = energy / lattice.n_spins as f64;
        let draws: Vec<Draw> = (0..n)
            .map(|_| Draw {
                spins: field.clone(),
                energy,
                energy_per_spin: eps,
            })
            .collect();
        let chain = Chain {
            draws,
            accept_rate: 1.0,
            divergences: 0,
        };
        let series = vec![chain.energies(), chain.energies()];
        let eps_series = vec![chain.energies_per_spin(), chain.energies_per_spin()];
        SampleOutput {
            energy: ScalarSummary::from_chains(&series),
            energy_per_spin: ScalarSummary::from_chains(&eps_series),
            chains: vec![chain.clone(), chain],
        }
    }

    /// Zero-variance energy chains give exactly zero specific heat.
    #[test]
    fn test_specific_heat_of_constant_chain_is_zero() {
        let lattice = Lattice::new(4, 4);
        let output = constant_output(&lattice, -32.0, 50);
        let point = summarize_point(&lattice, 1.0, 100, output);
        assert_eq!(point.specific_heat, 0.0);
        assert_eq!(point.vortex_density, 0.0);
        assert!(!point.low_confidence);
    }

    #[test]
    fn test_malformed_config_fails_before_sampling() {
        let cfg = SweepConfig {
            temperatures: vec![-1.0],
            ..Default::default()
        };
        let err = run_sweep_loop(&HmcEngine::default(), &cfg, &|| {}).unwrap_err();
        assert!(err.contains("positive"), "unexpected error: {err}");
    }

    /// End-to-end physics check: a 4×4 lattice at T = 2 sits well above the
    /// transition, where the documented vortex density is ≈ 0.08–0.09; the
    /// colder point must be lower-energy and essentially vortex-free.
    #[test]
    fn test_sweep_end_to_end_small_lattice() {
        let cfg = SweepConfig {
            sizes: vec![4],
            temperatures: vec![0.5, 2.0],
            coupling: 1.0,
            vorticity_samples: 500,
            base_seed: 1234,
            run: RunConfig {
                n_chains: 2,
                n_iterations: 1600,
                warmup_iterations: 800,
                target_accept: 0.8,
                max_treedepth: 10,
            },
        };

        let points = run_sweep_loop(&HmcEngine::default(), &cfg, &|| {}).unwrap();
        assert_eq!(points.len(), 2);

        let cold = &points[0];
        let hot = &points[1];
        assert!(cold.mean_energy_per_spin < hot.mean_energy_per_spin);
        assert!(cold.vortex_density < 0.02, "cold: {}", cold.vortex_density);
        assert!(
            (0.04..=0.14).contains(&hot.vortex_density),
            "hot vortex density = {}",
            hot.vortex_density
        );
        assert!(
            (0.8..=1.2).contains(&hot.rhat),
            "hot rhat = {}",
            hot.rhat
        );
        assert!(hot.specific_heat > 0.0);
        // Chains were retained with their full draw histories.
        assert_eq!(hot.chains.len(), 2);
        assert_eq!(hot.chains[0].draws.len(), 800);
    }
}
