//! Default sampler engine: Hamiltonian Monte Carlo on the raw embedding
//! space, with dual-averaging step-size adaptation during warmup.
//!
//! The engine only sees the model through `logp_and_grad`, so the core
//! stays engine-agnostic; swapping in a different gradient-based engine
//! means implementing [`SamplerEngine`] for it.

use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_xoshiro::Xoshiro256StarStar;
use rayon::prelude::*;
use validator::Validate;

use crate::config::RunConfig;
use crate::model::XyModel;
use crate::spins::energy::{energy_per_spin, total_energy};
use crate::spins::SpinField;

use super::{Chain, Draw, SampleOutput, SamplerEngine, ScalarSummary};

/// Energy error (nats) above which a transition is declared divergent.
const DIVERGENCE_THRESHOLD: f64 = 1000.0;

/// Dual-averaging constants from Hoffman & Gelman.
const ADAPT_GAMMA: f64 = 0.05;
const ADAPT_T0: f64 = 10.0;
const ADAPT_KAPPA: f64 = 0.75;

pub struct HmcEngine {
    /// Target integration time per proposal; the step count is this divided
    /// by the adapted step size, capped at `2^max_treedepth`.
    pub trajectory_length: f64,
    /// Step size before adaptation takes over.
    pub initial_step: f64,
}

impl Default for HmcEngine {
    fn default() -> Self {
        Self {
            trajectory_length: 1.2,
            initial_step: 0.1,
        }
    }
}

impl SamplerEngine for HmcEngine {
    fn sample(
        &self,
        model: &XyModel,
        init: Option<&[SpinField]>,
        cfg: &RunConfig,
        base_seed: u64,
    ) -> Result<SampleOutput, String> {
        cfg.validate().map_err(|e| format!("{e}"))?;

        let chains: Vec<Result<Chain, String>> = (0..cfg.n_chains)
            .into_par_iter()
            .map(|c| {
                let mut rng = Xoshiro256StarStar::seed_from_u64(base_seed + c as u64);
                let start = init.map(|fields| &fields[c % fields.len()]);
                self.run_chain(model, start, cfg, &mut rng)
            })
            .collect();
        let chains: Vec<Chain> = chains.into_iter().collect::<Result<Vec<_>, _>>()?;

        let energy_series: Vec<Vec<f64>> = chains.iter().map(|c| c.energies()).collect();
        let eps_series: Vec<Vec<f64>> = chains.iter().map(|c| c.energies_per_spin()).collect();

        Ok(SampleOutput {
            energy: ScalarSummary::from_chains(&energy_series),
            energy_per_spin: ScalarSummary::from_chains(&eps_series),
            chains,
        })
    }
}

impl HmcEngine {
    fn run_chain(
        &self,
        model: &XyModel,
        start: Option<&SpinField>,
        cfg: &RunConfig,
        rng: &mut Xoshiro256StarStar,
    ) -> Result<Chain, String> {
        let dim = model.n_params();
        let mut pos = match start {
            Some(field) => model.raw_from_spins(field),
            None => {
                let field = SpinField::random(model.lattice.dim_x, model.lattice.dim_y, rng);
                model.raw_from_spins(&field)
            }
        };

        let mut grad = vec![0.0; dim];
        let mut logp = model.logp_and_grad(&pos, &mut grad);
        if !logp.is_finite() {
            return Err("initial position has non-finite log-density".to_string());
        }

        let max_steps = 1usize << cfg.max_treedepth.min(20);
        let mut step = self.initial_step;
        let mu = (10.0 * self.initial_step).ln();
        let mut h_bar = 0.0;
        let mut log_step_bar = self.initial_step.ln();

        let n_keep = cfg.n_iterations - cfg.warmup_iterations;
        let mut draws = Vec::with_capacity(n_keep);
        let mut accept_acc = 0.0;
        let mut divergences = 0usize;

        let mut momentum = vec![0.0; dim];
        let mut new_pos = vec![0.0; dim];
        let mut new_grad = vec![0.0; dim];

        for it in 0..cfg.n_iterations {
            for p in momentum.iter_mut() {
                *p = rng.sample(StandardNormal);
            }
            let kinetic0: f64 = momentum.iter().map(|p| 0.5 * p * p).sum();
            let h0 = -logp + kinetic0;

            let full = ((self.trajectory_length / step).ceil() as usize).clamp(1, max_steps);
            // Randomized step count breaks periodic-orbit resonances.
            let n_steps = rng.gen_range(1..=full);

            new_pos.copy_from_slice(&pos);
            new_grad.copy_from_slice(&grad);
            let mut new_logp = logp;
            let mut ok = true;

            for (p, g) in momentum.iter_mut().zip(new_grad.iter()) {
                *p += 0.5 * step * g;
            }
            for leap in 0..n_steps {
                for (q, p) in new_pos.iter_mut().zip(momentum.iter()) {
                    *q += step * p;
                }
                new_logp = model.logp_and_grad(&new_pos, &mut new_grad);
                if !new_logp.is_finite() {
                    ok = false;
                    break;
                }
                let scale = if leap + 1 == n_steps { 0.5 } else { 1.0 };
                for (p, g) in momentum.iter_mut().zip(new_grad.iter()) {
                    *p += scale * step * g;
                }
            }

            let alpha = if ok {
                let kinetic1: f64 = momentum.iter().map(|p| 0.5 * p * p).sum();
                let h1 = -new_logp + kinetic1;
                if !(h1 - h0).is_finite() || h1 - h0 > DIVERGENCE_THRESHOLD {
                    ok = false;
                    0.0
                } else {
                    (h0 - h1).exp().min(1.0)
                }
            } else {
                0.0
            };

            if !ok && it >= cfg.warmup_iterations {
                divergences += 1;
            }

            if ok && rng.gen::<f64>() < alpha {
                std::mem::swap(&mut pos, &mut new_pos);
                std::mem::swap(&mut grad, &mut new_grad);
                logp = new_logp;
            }

            if it < cfg.warmup_iterations {
                let t = (it + 1) as f64;
                h_bar = (1.0 - 1.0 / (t + ADAPT_T0)) * h_bar
                    + (cfg.target_accept - alpha) / (t + ADAPT_T0);
                let log_step = mu - t.sqrt() / ADAPT_GAMMA * h_bar;
                let eta = t.powf(-ADAPT_KAPPA);
                log_step_bar = eta * log_step + (1.0 - eta) * log_step_bar;
                step = log_step.exp();
                if it + 1 == cfg.warmup_iterations {
                    step = log_step_bar.exp();
                }
            } else {
                accept_acc += alpha;

                let spins = model
                    .spins_from_raw(&pos)
                    .ok_or_else(|| "accepted draw has degenerate spin pair".to_string())?;
                let energy = total_energy(&model.lattice, &spins, model.coupling);
                let eps = energy_per_spin(&model.lattice, &spins, model.coupling);
                draws.push(Draw {
                    spins,
                    energy,
                    energy_per_spin: eps,
                });
            }
        }

        Ok(Chain {
            draws,
            accept_rate: if n_keep > 0 {
                accept_acc / n_keep as f64
            } else {
                0.0
            },
            divergences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Lattice;

    fn short_run_config() -> RunConfig {
        RunConfig {
            n_chains: 2,
            n_iterations: 600,
            warmup_iterations: 300,
            target_accept: 0.8,
            max_treedepth: 10,
        }
    }

    #[test]
    fn test_draw_count_and_constraint() {
        let model = XyModel::new(Lattice::new(3, 3), 1.0, 1.5);
        let out = HmcEngine::default()
            .sample(&model, None, &short_run_config(), 7)
            .unwrap();

        assert_eq!(out.chains.len(), 2);
        for chain in &out.chains {
            assert_eq!(chain.draws.len(), 300);
            for draw in chain.draws.iter().step_by(50) {
                draw.spins
                    .validate_norms(crate::spins::UNIT_NORM_TOL)
                    .unwrap();
            }
        }
    }

    #[test]
    fn test_acceptance_adapts_toward_target() {
        let model = XyModel::new(Lattice::new(4, 4), 1.0, 2.0);
        let cfg = RunConfig {
            n_chains: 1,
            n_iterations: 1500,
            warmup_iterations: 750,
            ..short_run_config()
        };
        let out = HmcEngine::default().sample(&model, None, &cfg, 11).unwrap();
        let rate = out.chains[0].accept_rate;
        assert!((0.6..=0.95).contains(&rate), "accept rate = {rate}");
    }

    #[test]
    fn test_warm_start_is_used() {
        let model = XyModel::new(Lattice::new(3, 3), 1.0, 0.05);
        let cfg = RunConfig {
            n_chains: 1,
            n_iterations: 2,
            warmup_iterations: 1,
            ..short_run_config()
        };
        // One post-warmup draw from a cold start at a very low temperature
        // stays close to aligned.
        let init = vec![SpinField::aligned(3, 3)];
        let out = HmcEngine::default()
            .sample(&model, Some(&init), &cfg, 13)
            .unwrap();
        let e = out.chains[0].draws[0].energy_per_spin;
        assert!(e < -1.5, "energy per spin = {e}");
    }

    #[test]
    fn test_deterministic_given_seed() {
        let model = XyModel::new(Lattice::new(3, 3), 1.0, 1.0);
        let cfg = RunConfig {
            n_chains: 2,
            n_iterations: 50,
            warmup_iterations: 25,
            ..short_run_config()
        };
        let engine = HmcEngine::default();
        let a = engine.sample(&model, None, &cfg, 99).unwrap();
        let b = engine.sample(&model, None, &cfg, 99).unwrap();
        assert_eq!(a.energy.mean, b.energy.mean);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let model = XyModel::new(Lattice::new(2, 2), 1.0, 1.0);
        let cfg = RunConfig {
            n_chains: 0,
            ..short_run_config()
        };
        assert!(HmcEngine::default().sample(&model, None, &cfg, 1).is_err());
    }
}
