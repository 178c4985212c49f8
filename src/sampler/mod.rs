pub mod diagnostics;
pub mod hmc;

pub use hmc::HmcEngine;

use crate::config::RunConfig;
use crate::model::XyModel;
use crate::spins::SpinField;
use crate::stats::Moments;
use self::diagnostics::{effective_sample_size, split_rhat};

/// One accepted sample: the full parameter draw plus its derived scalars.
#[derive(Debug, Clone)]
pub struct Draw {
    pub spins: SpinField,
    pub energy: f64,
    pub energy_per_spin: f64,
}

/// Ordered draws from one independent sampler run at a fixed temperature.
#[derive(Debug, Clone)]
pub struct Chain {
    pub draws: Vec<Draw>,
    /// Mean acceptance probability over the kept draws.
    pub accept_rate: f64,
    /// Post-warmup transitions whose integration error blew up.
    pub divergences: usize,
}

impl Chain {
    pub fn energies(&self) -> Vec<f64> {
        self.draws.iter().map(|d| d.energy).collect()
    }

    pub fn energies_per_spin(&self) -> Vec<f64> {
        self.draws.iter().map(|d| d.energy_per_spin).collect()
    }
}

/// Engine-supplied summary for one derived scalar. The sweep driver
/// consumes these diagnostics; it never recomputes them.
#[derive(Debug, Clone, Copy)]
pub struct ScalarSummary {
    pub mean: f64,
    pub variance: f64,
    /// Split potential scale reduction across chains.
    pub rhat: f64,
    /// Autocorrelation-adjusted effective sample size.
    pub ess: f64,
}

impl ScalarSummary {
    /// Pool per-chain series into mean/variance and convergence diagnostics.
    pub fn from_chains(series: &[Vec<f64>]) -> Self {
        let pooled: Moments = series.iter().flatten().copied().collect();
        Self {
            mean: pooled.mean(),
            variance: pooled.sample_variance(),
            rhat: split_rhat(series),
            ess: effective_sample_size(series),
        }
    }
}

/// Everything an engine returns for one experiment point.
#[derive(Debug, Clone)]
pub struct SampleOutput {
    pub chains: Vec<Chain>,
    pub energy: ScalarSummary,
    pub energy_per_spin: ScalarSummary,
}

impl SampleOutput {
    /// Total kept draws across all chains.
    pub fn n_draws(&self) -> usize {
        self.chains.iter().map(|c| c.draws.len()).sum()
    }
}

/// The boundary to the gradient-based MCMC engine.
///
/// The core (energy, likelihood, vorticity, sweep) is engine-agnostic: it
/// declares the model, hands over an optional warm start per chain, and
/// gets back immutable per-chain results plus scalar summaries. Chains are
/// independent; engines are free to run them in parallel.
pub trait SamplerEngine: Sync {
    fn sample(
        &self,
        model: &XyModel,
        init: Option<&[SpinField]>,
        cfg: &RunConfig,
        base_seed: u64,
    ) -> Result<SampleOutput, String>;
}
