//! FFT cross-correlation shared by the matcher and the picker.

use rustfft::{num_complex::Complex, FftPlanner};

/// Linear cross-correlation of a signal with a kernel at every lag.
pub(crate) struct CrossCorrelation {
    values: Vec<f64>,
    signal_len: usize,
    kernel_len: usize,
}

impl CrossCorrelation {
    /// `sum_j signal[j + lag] * kernel[j]` over the overlapping samples.
    ///
    /// Zero when the two do not overlap at `lag`.
    pub(crate) fn at(&self, lag: i64) -> f64 {
        if self.values.is_empty()
            || lag >= self.signal_len as i64
            || lag <= -(self.kernel_len as i64)
        {
            return 0.0;
        }
        let n = self.values.len() as i64;
        self.values[lag.rem_euclid(n) as usize]
    }
}

/// Cross-correlate `signal` with `kernel` through one forward/inverse FFT
/// pair, zero-padded so the circular product holds every linear lag.
pub(crate) fn cross_correlate(signal: &[f64], kernel: &[f64]) -> CrossCorrelation {
    if signal.is_empty() || kernel.is_empty() {
        return CrossCorrelation {
            values: Vec::new(),
            signal_len: signal.len(),
            kernel_len: kernel.len(),
        };
    }

    let fft_len = (signal.len() + kernel.len() - 1).next_power_of_two();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_len);
    let ifft = planner.plan_fft_inverse(fft_len);

    let mut signal_complex: Vec<Complex<f64>> =
        signal.iter().map(|&x| Complex::new(x, 0.0)).collect();
    signal_complex.resize(fft_len, Complex::new(0.0, 0.0));

    let mut kernel_complex: Vec<Complex<f64>> =
        kernel.iter().map(|&x| Complex::new(x, 0.0)).collect();
    kernel_complex.resize(fft_len, Complex::new(0.0, 0.0));

    fft.process(&mut signal_complex);
    fft.process(&mut kernel_complex);

    let mut product: Vec<Complex<f64>> = signal_complex
        .iter()
        .zip(kernel_complex.iter())
        .map(|(a, b)| a * b.conj())
        .collect();

    ifft.process(&mut product);

    let scale = 1.0 / fft_len as f64;
    CrossCorrelation {
        values: product.iter().map(|c| c.re * scale).collect(),
        signal_len: signal.len(),
        kernel_len: kernel.len(),
    }
}
