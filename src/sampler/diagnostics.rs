//! Convergence diagnostics over per-chain scalar series, following the
//! split-chain formulation used by Stan: each chain is halved so that
//! within-chain drift shows up as between-sequence variance.

use crate::stats::Moments;

/// Split each chain into front and back halves, truncated to equal length.
fn split_sequences(series: &[Vec<f64>]) -> Vec<&[f64]> {
    let mut seqs = Vec::with_capacity(series.len() * 2);
    for chain in series {
        let half = chain.len() / 2;
        if half == 0 {
            continue;
        }
        seqs.push(&chain[..half]);
        seqs.push(&chain[chain.len() - half..]);
    }
    seqs
}

fn pooled_variances(seqs: &[&[f64]]) -> Option<(f64, f64, usize)> {
    let n = seqs.iter().map(|s| s.len()).min()?;
    if n < 2 || seqs.len() < 2 {
        return None;
    }

    let mut within = Moments::new();
    let mut means = Moments::new();
    for seq in seqs {
        let m: Moments = seq[..n].iter().copied().collect();
        within.update(m.sample_variance());
        means.update(m.mean());
    }

    let w = within.mean();
    let b = n as f64 * means.sample_variance();
    // Marginal posterior variance estimate, biased upward before convergence.
    let var_plus = (n as f64 - 1.0) / n as f64 * w + b / n as f64;
    Some((w, var_plus, n))
}

/// Split potential scale reduction.
///
/// Ratio of the pooled variance estimate to the mean within-sequence
/// variance; approaches 1 from above as the chains mix. Degenerate input
/// (constant chains, or fewer than 2 draws per half) reports 1.
pub fn split_rhat(series: &[Vec<f64>]) -> f64 {
    let seqs = split_sequences(series);
    match pooled_variances(&seqs) {
        Some((w, var_plus, _)) if w > 0.0 => (var_plus / w).sqrt(),
        _ => 1.0,
    }
}

/// Effective sample size, adjusted for autocorrelation.
///
/// Combined autocorrelations are estimated from the split sequences and
/// summed in Geyer pairs, truncating at the first non-positive pair; the
/// result is capped at the nominal draw count.
pub fn effective_sample_size(series: &[Vec<f64>]) -> f64 {
    let seqs = split_sequences(series);
    let total: usize = seqs.iter().map(|s| s.len()).sum();
    let (w, var_plus, n) = match pooled_variances(&seqs) {
        Some(v) => v,
        None => return total as f64,
    };
    if var_plus <= 0.0 || w <= 0.0 {
        // Zero-variance chains carry no autocorrelation information.
        return total as f64;
    }

    let m = seqs.len();
    let nominal = (m * n) as f64;

    // Mean within-sequence autocovariance at each lag.
    let means: Vec<f64> = seqs
        .iter()
        .map(|s| s[..n].iter().copied().collect::<Moments>().mean())
        .collect();
    let acov = |t: usize| -> f64 {
        let mut acc = 0.0;
        for (seq, &mean) in seqs.iter().zip(means.iter()) {
            let mut c = 0.0;
            for i in 0..n - t {
                c += (seq[i] - mean) * (seq[i + t] - mean);
            }
            acc += c / n as f64;
        }
        acc / m as f64
    };

    let rho = |t: usize| 1.0 - (w - acov(t)) / var_plus;

    let mut tau = -1.0;
    let mut t = 0;
    while t + 1 < n {
        let pair = rho(t) + rho(t + 1);
        if pair <= 0.0 {
            break;
        }
        tau += 2.0 * pair;
        t += 2;
    }

    (nominal / tau.max(1.0)).min(nominal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256StarStar;

    fn iid_chains(n_chains: usize, n: usize, seed: u64) -> Vec<Vec<f64>> {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        (0..n_chains)
            .map(|_| (0..n).map(|_| rng.gen::<f64>() - 0.5).collect())
            .collect()
    }

    #[test]
    fn test_rhat_near_one_for_iid_chains() {
        let rhat = split_rhat(&iid_chains(4, 500, 1));
        assert!((0.98..1.05).contains(&rhat), "rhat = {rhat}");
    }

    #[test]
    fn test_rhat_detects_disjoint_chains() {
        let mut chains = iid_chains(2, 200, 2);
        for v in chains[1].iter_mut() {
            *v += 10.0;
        }
        assert!(split_rhat(&chains) > 2.0);
    }

    #[test]
    fn test_rhat_of_constant_chains_is_one() {
        let chains = vec![vec![1.5; 100], vec![1.5; 100]];
        assert_eq!(split_rhat(&chains), 1.0);
    }

    #[test]
    fn test_ess_near_nominal_for_iid_chains() {
        let chains = iid_chains(4, 500, 3);
        let ess = effective_sample_size(&chains);
        assert!(ess > 1000.0, "ess = {ess}");
        assert!(ess <= 2000.0);
    }

    #[test]
    fn test_ess_small_for_sticky_chains() {
        // Strongly autocorrelated AR(1) series.
        let mut rng = Xoshiro256StarStar::seed_from_u64(4);
        let chains: Vec<Vec<f64>> = (0..4)
            .map(|_| {
                let mut x = 0.0;
                (0..500)
                    .map(|_| {
                        x = 0.99 * x + 0.01 * (rng.gen::<f64>() - 0.5);
                        x
                    })
                    .collect()
            })
            .collect();
        let ess = effective_sample_size(&chains);
        assert!(ess < 200.0, "ess = {ess}");
    }
}
