//! Normalized sliding cross-correlation of template channels.
//!
//! Each template channel is slid across the matching recording channel and
//! the zero-mean normalized cross-correlation coefficient is computed at every
//! offset where the template fits entirely inside the recording.
//!
//! The numerator is computed with an FFT. Window means and energies come from
//! prefix sums, so the cost is dominated by the transforms.
//!
//! Invalid samples are never treated as data: offsets whose recording window
//! holds an invalid sample report [`NO_CORRELATION`], and a template channel
//! with any invalid sample correlates nowhere.

use crate::fft::cross_correlate;
use crate::models::{is_valid_sample, ChannelTrace, Recording, Template};
use crate::pool::TaskPool;

use super::types::{
    ChannelCorrelation, ChannelStatus, DeadReason, MatchError, MatchResult, NO_CORRELATION,
};

/// Relative tolerance for treating a variance as zero.
const FLAT_TOLERANCE: f64 = 1e-12;

/// Relative tolerance for comparing sample rates.
const RATE_TOLERANCE: f64 = 1e-9;

/// One unit of work: a template channel and its recording counterpart.
struct ChannelTask<'a> {
    template_index: usize,
    template: &'a ChannelTrace,
    recording: Option<&'a ChannelTrace>,
}

impl ChannelTask<'_> {
    fn execute(self) -> (usize, MatchResult<ChannelCorrelation>) {
        let result = match self.recording {
            Some(recording) => correlate_channel(self.template, recording),
            None => Err(MatchError::MissingChannel(self.template.key.clone())),
        };
        (self.template_index, result)
    }
}

/// Correlate every channel of one template against the recording.
///
/// Channel computations are dispatched to `pool`; the result is in the
/// template's channel order whatever the pool.
///
/// # Errors
/// Returns the first channel error in channel order, see
/// [`correlate_channel`].
pub fn correlate_template<P: TaskPool>(
    template: &Template,
    recording: &Recording,
    pool: &P,
) -> MatchResult<Vec<ChannelCorrelation>> {
    correlate_all(std::slice::from_ref(template), recording, pool)
        .pop()
        .unwrap_or_else(|| Ok(Vec::new()))
}

/// Correlate every channel of every template against the recording.
///
/// All (template, channel) tasks are submitted to `pool` at once and joined
/// per template. Entry `i` of the result belongs to `templates[i]`.
pub fn correlate_all<P: TaskPool>(
    templates: &[Template],
    recording: &Recording,
    pool: &P,
) -> Vec<MatchResult<Vec<ChannelCorrelation>>> {
    let tasks: Vec<ChannelTask<'_>> = templates
        .iter()
        .enumerate()
        .flat_map(|(template_index, template)| {
            template.iter().map(move |trace| ChannelTask {
                template_index,
                template: trace,
                recording: recording.get(&trace.key),
            })
        })
        .collect();

    tracing::debug!(
        "Dispatching {} channel correlation(s) for {} template(s) on {} worker(s)",
        tasks.len(),
        templates.len(),
        pool.workers()
    );

    let results = pool.run(tasks, ChannelTask::execute);

    // Join: one slot per template, filled in channel order
    let mut slots: Vec<MatchResult<Vec<ChannelCorrelation>>> =
        templates.iter().map(|t| Ok(Vec::with_capacity(t.len()))).collect();

    for (template_index, result) in results {
        let slot = &mut slots[template_index];
        match result {
            Ok(channel) => {
                if let Ok(channels) = slot {
                    channels.push(channel);
                }
            }
            // First failing channel decides the template's error
            Err(e) => {
                if slot.is_ok() {
                    *slot = Err(e);
                }
            }
        }
    }

    slots
}

/// Correlate one template channel against one recording channel.
///
/// # Errors
/// - [`MatchError::ChannelLengthMismatch`] if the template channel is empty
///   or longer than the recording channel.
/// - [`MatchError::SampleRateMismatch`] if the sample rates differ.
pub fn correlate_channel(
    template: &ChannelTrace,
    recording: &ChannelTrace,
) -> MatchResult<ChannelCorrelation> {
    let key = template.key.clone();
    let m = template.len();
    let n = recording.len();

    if m == 0 || m > n {
        return Err(MatchError::ChannelLengthMismatch {
            key,
            template_len: m,
            recording_len: n,
        });
    }

    if !rates_match(template.sample_rate, recording.sample_rate) {
        return Err(MatchError::SampleRateMismatch {
            key,
            template_rate: template.sample_rate,
            recording_rate: recording.sample_rate,
        });
    }

    let offsets = n - m + 1;

    let invalid_in_template = template.invalid_count();
    if invalid_in_template == m {
        return Ok(ChannelCorrelation::dead(key, offsets, DeadReason::Placeholder));
    }
    if invalid_in_template > 0 {
        return Ok(ChannelCorrelation::dead(
            key,
            offsets,
            DeadReason::InvalidTemplateSamples,
        ));
    }

    let mean = template.samples.iter().sum::<f64>() / m as f64;
    let centered: Vec<f64> = template.samples.iter().map(|&x| x - mean).collect();
    let template_energy: f64 = centered.iter().map(|x| x * x).sum();

    // Deviations at rounding level of the mean count as flat
    let max_deviation = centered.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
    if max_deviation <= FLAT_TOLERANCE * mean.abs() || template_energy == 0.0 {
        return Ok(ChannelCorrelation::dead(key, offsets, DeadReason::FlatTemplate));
    }

    let window = normalized_xcorr(&centered, template_energy, &recording.samples);

    let status = if window.invalid_offsets == offsets {
        ChannelStatus::Dead {
            reason: DeadReason::AllWindowsInvalid,
        }
    } else if window.invalid_offsets + window.flat_offsets == offsets {
        ChannelStatus::Dead {
            reason: DeadReason::NoUsableWindows,
        }
    } else if window.invalid_offsets == 0 && window.flat_offsets == 0 {
        ChannelStatus::Live
    } else {
        ChannelStatus::Partial {
            invalid_offsets: window.invalid_offsets,
            flat_offsets: window.flat_offsets,
        }
    };

    if status != ChannelStatus::Live {
        tracing::debug!("Channel {}: {}", key, status);
    }

    Ok(ChannelCorrelation {
        key,
        series: window.series,
        status,
    })
}

fn rates_match(a: f64, b: f64) -> bool {
    (a - b).abs() <= RATE_TOLERANCE * a.abs().max(b.abs())
}

/// Series of one channel plus counts of the offsets that carry
/// [`NO_CORRELATION`] instead of a coefficient.
struct WindowedSeries {
    series: Vec<f64>,
    /// Windows holding an invalid sample.
    invalid_offsets: usize,
    /// Windows with zero variance.
    flat_offsets: usize,
}

/// Sliding normalized cross-correlation of a zero-mean template.
fn normalized_xcorr(centered: &[f64], template_energy: f64, recording: &[f64]) -> WindowedSeries {
    let m = centered.len();
    let n = recording.len();
    let offsets = n - m + 1;

    // Demeaned over valid samples so prefix sums of a DC offset keep precision
    let (valid_sum, valid_count) = recording
        .iter()
        .filter(|&&x| is_valid_sample(x))
        .fold((0.0, 0usize), |(sum, count), &x| (sum + x, count + 1));
    let offset = if valid_count > 0 {
        valid_sum / valid_count as f64
    } else {
        0.0
    };

    // Invalid samples contribute nothing to the sums; their windows are masked
    let mut cleaned = Vec::with_capacity(n);
    let mut sum = vec![0.0; n + 1];
    let mut sum_sq = vec![0.0; n + 1];
    let mut bad = vec![0usize; n + 1];
    // Length of the run of identical valid samples ending at each index
    let mut run = vec![0usize; n];
    for (i, &x) in recording.iter().enumerate() {
        let (value, invalid) = if is_valid_sample(x) {
            run[i] = if i > 0 && recording[i - 1] == x {
                run[i - 1] + 1
            } else {
                1
            };
            (x - offset, 0)
        } else {
            (0.0, 1)
        };
        cleaned.push(value);
        sum[i + 1] = sum[i] + value;
        sum_sq[i + 1] = sum_sq[i] + value * value;
        bad[i + 1] = bad[i] + invalid;
    }

    let numerators = cross_correlate(&cleaned, centered);

    let mut invalid_offsets = 0;
    let mut flat_offsets = 0;
    let series = (0..offsets)
        .map(|k| {
            if bad[k + m] - bad[k] > 0 {
                invalid_offsets += 1;
                return NO_CORRELATION;
            }

            let window_sum = sum[k + m] - sum[k];
            let window_sq = sum_sq[k + m] - sum_sq[k];
            let window_energy = window_sq - window_sum * window_sum / m as f64;

            // Prefix-sum rounding scales with the running total, not the window
            let flat = run[k + m - 1] >= m
                || window_energy <= FLAT_TOLERANCE * sum_sq[k + m].max(f64::MIN_POSITIVE);
            if flat {
                flat_offsets += 1;
                return NO_CORRELATION;
            }

            (numerators.at(k as i64) / (window_energy * template_energy).sqrt()).clamp(-1.0, 1.0)
        })
        .collect();

    WindowedSeries {
        series,
        invalid_offsets,
        flat_offsets,
    }
}
