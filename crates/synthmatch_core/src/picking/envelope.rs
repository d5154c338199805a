//! Amplitude envelope via the analytic signal.
//!
//! The analytic signal is built in the frequency domain: keep DC (and
//! Nyquist for even lengths), double positive frequencies, zero negative
//! ones, then transform back. Its magnitude is the envelope.

use rustfft::{num_complex::Complex, FftPlanner};

/// Envelope (analytic-signal magnitude) of a real signal.
///
/// Input samples must be finite.
pub fn envelope(samples: &[f64]) -> Vec<f64> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let ifft = planner.plan_fft_inverse(n);

    let mut spectrum: Vec<Complex<f64>> = samples.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut spectrum);

    let half = n / 2;
    for (i, bin) in spectrum.iter_mut().enumerate() {
        let weight = if i == 0 || (n % 2 == 0 && i == half) {
            1.0
        } else if i <= (n - 1) / 2 {
            2.0
        } else {
            0.0
        };
        *bin *= weight;
    }

    ifft.process(&mut spectrum);

    let scale = 1.0 / n as f64;
    spectrum.iter().map(|c| c.norm() * scale).collect()
}
