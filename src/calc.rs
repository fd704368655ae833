/// Tolerance used when comparing a weight total against 100.
///
/// Weights are entered as decimals (e.g. 33.3 + 33.3 + 33.4), so the sum can
/// miss 100 by one ulp.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// Total weight a gradebook must reach before a class average exists.
pub const FULL_WEIGHT: f64 = 100.0;

/// Half-away-from-zero rounding to 2 decimals, used for every stored average.
pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Inclusive range test. Returns false for NaN or an inverted range.
pub fn in_range(x: f64, min: f64, max: f64) -> bool {
    if !x.is_finite() || min > max {
        return false;
    }
    x >= min && x <= max
}

pub fn is_full_weight(total: f64) -> bool {
    (total - FULL_WEIGHT).abs() < WEIGHT_EPSILON
}

/// Arithmetic mean of the scores rounded to 2 decimals; `None` when empty.
pub fn mean_2_decimals<I>(scores: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0_f64;
    let mut count: usize = 0;
    for s in scores {
        sum += s;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(round_2_decimals(sum / (count as f64)))
}

/// One category's share of the class average.
///
/// A category without an average counts as 100% of its weight so that a
/// student's running grade is not dragged down by work that has not happened.
pub fn weighted_contribution(average: Option<f64>, weight: f64) -> f64 {
    match average {
        Some(avg) => (avg / 100.0) * weight,
        None => weight,
    }
}
