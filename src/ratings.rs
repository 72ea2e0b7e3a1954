use crate::models::{RatingSummary, ReviewRecord, ReviewScores, FACTOR_LABELS};

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 5.0;
pub const SCORE_STEP: f64 = 0.5;

/// Reduce all reviews for one doctor into its summary.
///
/// Pure and order-independent: each per-factor average is the plain
/// arithmetic mean of that factor, and the overall rating is the mean of
/// the five averages. No weighting and no recency decay. Zero reviews
/// produce an all-zero summary rather than NaN so downstream sorting
/// stays total.
pub fn summarize(reviews: &[ReviewRecord]) -> RatingSummary {
    if reviews.is_empty() {
        return RatingSummary::default();
    }

    let mut sums = [0.0f64; 5];
    for review in reviews {
        let s = &review.scores;
        sums[0] += s.teaching_quality;
        sums[1] += s.availability;
        sums[2] += s.communication;
        sums[3] += s.knowledge;
        sums[4] += s.fairness;
    }

    let total = reviews.len();
    let avgs: Vec<f64> = sums.iter().map(|sum| sum / total as f64).collect();
    let overall = avgs.iter().sum::<f64>() / avgs.len() as f64;

    RatingSummary {
        avg_teaching_quality: avgs[0],
        avg_availability: avgs[1],
        avg_communication: avgs[2],
        avg_knowledge: avgs[3],
        avg_fairness: avgs[4],
        overall_rating: overall,
        total_reviews: total,
    }
}

/// A score is accepted when it falls on the 0.0-5.0 scale in 0.5 steps.
pub fn valid_score(score: f64) -> bool {
    if !(SCORE_MIN..=SCORE_MAX).contains(&score) {
        return false;
    }
    let steps = score / SCORE_STEP;
    (steps - steps.round()).abs() < 1e-9
}

/// Returns the label of the first factor whose score is off the scale,
/// or None when the whole submission is valid.
pub fn invalid_factor(scores: &ReviewScores) -> Option<&'static str> {
    let values = [
        scores.teaching_quality,
        scores.availability,
        scores.communication,
        scores.knowledge,
        scores.fairness,
    ];
    values
        .iter()
        .zip(FACTOR_LABELS)
        .find(|(value, _)| !valid_score(**value))
        .map(|(_, label)| label)
}
