/// Canonical-ensemble sampling weight.
///
/// `log_weight(T, E) = -E / T` is the unnormalized log-probability of a
/// microstate with energy `E` in contact with a bath at temperature `T`.
/// Lower energy means higher weight, so with the energy convention
/// `E = -J Σ dot` a positive coupling favors aligned spins.
///
/// The temperature is a fixed external scalar per sampling run; callers
/// validate positivity at configuration time, before any sampling.
#[inline]
pub fn log_weight(temperature: f64, energy: f64) -> f64 {
    -energy / temperature
}

/// Derivative of [`log_weight`] with respect to the energy, for chaining
/// through the energy gradient.
#[inline]
pub fn d_log_weight_d_energy(temperature: f64) -> f64 {
    -1.0 / temperature
}
