/// Generate a random `f64` in the range `[low, high)`.
#[inline]
pub(crate) fn f64_range(rng: &mut fastrand::Rng, low: f64, high: f64) -> f64 {
    low + rng.f64() * (high - low)
}

/// Draw a standard normal variate (Box-Muller).
pub(crate) fn standard_normal(rng: &mut fastrand::Rng) -> f64 {
    // Avoid ln(0)
    let u1 = rng.f64().max(f64::MIN_POSITIVE);
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (core::f64::consts::TAU * u2).cos()
}

/// Draw a value from the standard Gumbel distribution's inverse CDF at a
/// uniform variate in `(0, 1)`.
pub(crate) fn gumbel_unit(rng: &mut fastrand::Rng) -> f64 {
    let u = rng.f64().clamp(1e-12, 1.0 - 1e-12);
    -(-u.ln()).ln()
}
