//! Per-template score aggregation.

use super::types::{ChannelCorrelation, TemplateScore};

/// Aggregate channel series into one template score.
///
/// The series are summed offset by offset (truncated to the shortest series)
/// and the score is the maximum of that sum. Channels are not weighted or
/// normalized by count, so templates with more live channels can reach higher
/// scores.
///
/// A template with no live channel scores [`TemplateScore::minimum`].
pub fn score(channels: &[ChannelCorrelation]) -> TemplateScore {
    let live_channels = channels.iter().filter(|c| c.is_live()).count();
    if live_channels == 0 {
        return TemplateScore::minimum();
    }

    let len = channels.iter().map(|c| c.series.len()).min().unwrap_or(0);
    let mut aggregate = vec![0.0; len];
    for channel in channels {
        for (sum, value) in aggregate.iter_mut().zip(&channel.series) {
            *sum += value;
        }
    }

    let Some((peak_offset, peak)) = first_max(&aggregate) else {
        return TemplateScore {
            live_channels,
            ..TemplateScore::minimum()
        };
    };

    TemplateScore {
        score: peak,
        peak_offset: Some(peak_offset),
        live_channels,
        aggregate,
    }
}

/// Index and value of the first maximum, ignoring NaN.
pub(crate) fn first_max(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if v <= b => best,
            _ => Some((i, v)),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::types::{ChannelStatus, DeadReason, MIN_SCORE};
    use crate::models::ChannelKey;

    fn live(series: Vec<f64>) -> ChannelCorrelation {
        ChannelCorrelation {
            key: ChannelKey::new("A", "Z"),
            series,
            status: ChannelStatus::Live,
        }
    }

    #[test]
    fn sums_channels_before_taking_max() {
        let channels = vec![live(vec![0.1, 0.9, 0.2]), live(vec![0.8, 0.1, 0.3])];
        let result = score(&channels);

        // Sums are [0.9, 1.0, 0.5]; individual maxima would give 1.7
        assert!((result.score - 1.0).abs() < 1e-12);
        assert_eq!(result.peak_offset, Some(1));
        assert_eq!(result.live_channels, 2);
        assert_eq!(result.aggregate.len(), 3);
    }

    #[test]
    fn truncates_to_shortest_series() {
        let channels = vec![live(vec![0.1, 0.2, 0.3, 5.0]), live(vec![0.1, 0.2, 0.3])];
        let result = score(&channels);
        assert_eq!(result.aggregate.len(), 3);
        assert_eq!(result.peak_offset, Some(2));
    }

    #[test]
    fn dead_channels_add_nothing() {
        let channels = vec![
            live(vec![0.2, 0.4]),
            ChannelCorrelation::dead(ChannelKey::new("B", "Z"), 2, DeadReason::Placeholder),
        ];
        let result = score(&channels);
        assert!((result.score - 0.4).abs() < 1e-12);
        assert_eq!(result.live_channels, 1);
    }

    #[test]
    fn no_live_channels_scores_minimum() {
        let channels = vec![ChannelCorrelation::dead(
            ChannelKey::new("A", "Z"),
            10,
            DeadReason::Placeholder,
        )];
        let result = score(&channels);
        assert_eq!(result.score, MIN_SCORE);
        assert!(result.peak_offset.is_none());

        assert_eq!(score(&[]).score, MIN_SCORE);
    }

    #[test]
    fn ties_resolve_to_first_offset() {
        assert_eq!(first_max(&[0.5, 0.7, 0.7, 0.1]), Some((1, 0.7)));
        assert_eq!(first_max(&[f64::NAN, 0.2]), Some((1, 0.2)));
        assert_eq!(first_max(&[]), None);
    }
}
