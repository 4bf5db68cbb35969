//! Estimated GDP derivation
//!
//! `estimated_gdp = population * U / exchange_rate` with `U` drawn uniformly
//! from `[1000, 2000)` on every call. The figure is a display metric only and
//! repeated calls with the same inputs give different results.

use rand::Rng;

/// Lower bound (inclusive) of the random GDP multiplier
pub const GDP_MULTIPLIER_MIN: f64 = 1000.0;

/// Upper bound (exclusive) of the random GDP multiplier
pub const GDP_MULTIPLIER_MAX: f64 = 2000.0;

/// Estimate GDP using the thread-local RNG
pub fn estimate(population: i64, exchange_rate: Option<f64>) -> Option<f64> {
    estimate_with(&mut rand::thread_rng(), population, exchange_rate)
}

/// Estimate GDP with a caller-supplied RNG
///
/// Returns `None` when there is no usable rate (missing or zero), when the
/// population is negative, or when the arithmetic does not produce a finite
/// number.
pub fn estimate_with<R: Rng + ?Sized>(
    rng: &mut R,
    population: i64,
    exchange_rate: Option<f64>,
) -> Option<f64> {
    let rate = exchange_rate?;
    if rate == 0.0 || population < 0 {
        return None;
    }

    let multiplier = rng.gen_range(GDP_MULTIPLIER_MIN..GDP_MULTIPLIER_MAX);
    let gdp = population as f64 * multiplier / rate;
    gdp.is_finite().then_some(gdp)
}
