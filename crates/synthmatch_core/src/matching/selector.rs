//! Best-match selection.

use super::scorer::first_max;
use super::types::{MatchError, MatchResult, MIN_SCORE};

/// Pick the highest score; ties go to the lowest index.
///
/// NaN scores never win. If every score is NaN the first index is returned
/// with [`MIN_SCORE`].
///
/// # Errors
/// [`MatchError::EmptyScoreList`] if `scores` is empty.
pub fn select_best(scores: &[f64]) -> MatchResult<(usize, f64)> {
    if scores.is_empty() {
        return Err(MatchError::EmptyScoreList);
    }

    Ok(first_max(scores).unwrap_or((0, MIN_SCORE)))
}
