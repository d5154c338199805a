//! Bounded-lag cross-correlation between a master and a candidate channel.

use crate::fft::cross_correlate;

/// Correlation of a candidate against the master over a lag window.
#[derive(Debug, Clone, PartialEq)]
pub struct LagCorrelation {
    /// Lag of the peak, in samples. Positive means the candidate is delayed.
    pub lag: i64,
    /// Normalized coefficient at the peak.
    pub coefficient: f64,
    /// Coefficient at every lag from `-shift_len` to `+shift_len`.
    pub coefficients: Vec<f64>,
}

/// Cross-correlate `candidate` against `master` for lags in
/// `-shift_len..=shift_len`.
///
/// Both signals are demeaned and the coefficients are normalized by the
/// total energies, so identical signals give 1.0 at lag 0. The peak is the
/// highest coefficient; ties resolve to the lag closest to zero (negative
/// first). If either signal has no energy every coefficient is zero and the
/// lag is 0.
///
/// Samples must be finite.
pub fn xcorr_lag(master: &[f64], candidate: &[f64], shift_len: usize) -> LagCorrelation {
    let window = 2 * shift_len + 1;
    let master = demean(master);
    let candidate = demean(candidate);

    let master_energy: f64 = master.iter().map(|x| x * x).sum();
    let candidate_energy: f64 = candidate.iter().map(|x| x * x).sum();
    let norm = (master_energy * candidate_energy).sqrt();

    if !(norm > 0.0) {
        return LagCorrelation {
            lag: 0,
            coefficient: 0.0,
            coefficients: vec![0.0; window],
        };
    }

    let products = cross_correlate(&candidate, &master);
    let shift = shift_len as i64;
    let coefficients: Vec<f64> = (-shift..=shift).map(|lag| products.at(lag) / norm).collect();

    // Search outward from zero lag so ties favour the smallest shift
    let mut best_lag = 0i64;
    let mut best = coefficients[shift_len];
    for step in 1..=shift {
        for lag in [-step, step] {
            let value = coefficients[(lag + shift) as usize];
            if value > best {
                best = value;
                best_lag = lag;
            }
        }
    }

    LagCorrelation {
        lag: best_lag,
        coefficient: best,
        coefficients,
    }
}

fn demean(samples: &[f64]) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    samples.iter().map(|x| x - mean).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise_like(len: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.random_range(-1.0..1.0)).collect()
    }

    #[test]
    fn identical_signals_peak_at_zero() {
        let signal = noise_like(500, 1);
        let result = xcorr_lag(&signal, &signal, 150);

        assert_eq!(result.lag, 0);
        assert!((result.coefficient - 1.0).abs() < 1e-12);
        assert_eq!(result.coefficients.len(), 301);
        assert!(result.coefficients.iter().all(|&c| c <= result.coefficient));
    }

    #[test]
    fn delayed_candidate_has_positive_lag() {
        let master = noise_like(600, 2);
        let mut candidate = vec![0.0; 40];
        candidate.extend_from_slice(&master[..560]);

        let result = xcorr_lag(&master, &candidate, 180);

        assert_eq!(result.lag, 40);
    }

    #[test]
    fn advanced_candidate_has_negative_lag() {
        let master = noise_like(600, 2);
        let mut candidate = master[25..].to_vec();
        candidate.extend(vec![0.0; 25]);

        let result = xcorr_lag(&master, &candidate, 180);

        assert_eq!(result.lag, -25);
    }

    #[test]
    fn silent_signal_gives_zero_lag() {
        let result = xcorr_lag(&noise_like(100, 3), &[0.0; 100], 30);
        assert_eq!(result.lag, 0);
        assert_eq!(result.coefficient, 0.0);
        assert_eq!(result.coefficients, vec![0.0; 61]);
    }

    #[test]
    fn zero_shift_window_only_checks_zero_lag() {
        let signal = noise_like(50, 4);
        let result = xcorr_lag(&signal, &signal, 0);
        assert_eq!(result.lag, 0);
        assert_eq!(result.coefficients.len(), 1);
    }

    #[test]
    fn long_traces_match_direct_sum() {
        let master = noise_like(4000, 5);
        let mut candidate = vec![0.0; 333];
        candidate.extend_from_slice(&master[..3667]);

        let result = xcorr_lag(&master, &candidate, 1200);

        assert_eq!(result.lag, 333);
        let m = demean(&master);
        let c = demean(&candidate);
        let norm = (m.iter().map(|x| x * x).sum::<f64>() * c.iter().map(|x| x * x).sum::<f64>())
            .sqrt();
        for lag in [-1200i64, -17, 0, 333, 1200] {
            let direct: f64 = (0..m.len() as i64)
                .filter(|i| i + lag >= 0 && i + lag < c.len() as i64)
                .map(|i| m[i as usize] * c[(i + lag) as usize])
                .sum();
            let got = result.coefficients[(lag + 1200) as usize];
            assert!((got - direct / norm).abs() < 1e-9, "lag {}", lag);
        }
    }
}
