// Weighted random choice over parallel item/weight lists.

use rand::Rng;

use crate::error::ResolveError;

/// Pick one item with probability proportional to its weight.
///
/// `weights` of `None` means every item weighs 1. Returns the chosen index and item.
/// Zero-weight items are never chosen. Empty input, mismatched lengths, negative or
/// non-finite weights, and an all-zero total are errors.
pub fn pick_weighted<'a, T, R: Rng + ?Sized>(
    items: &'a [T],
    weights: Option<&[f64]>,
    rng: &mut R,
) -> Result<(usize, &'a T), ResolveError> {
    if items.is_empty() {
        return Err(ResolveError::InvalidWeights(
            "cannot choose from an empty list".to_string(),
        ));
    }

    let uniform;
    let weights = match weights {
        Some(w) => w,
        None => {
            uniform = vec![1.0; items.len()];
            uniform.as_slice()
        }
    };

    if weights.len() != items.len() {
        return Err(ResolveError::InvalidWeights(format!(
            "{} weights given for {} items",
            weights.len(),
            items.len()
        )));
    }
    if let Some(bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(ResolveError::InvalidWeights(format!(
            "weight {} is not a finite non-negative number",
            bad
        )));
    }

    // Scale by the largest weight so huge finite weights cannot overflow the total.
    let largest = weights.iter().copied().fold(0.0_f64, f64::max);
    if largest <= 0.0 {
        return Err(ResolveError::InvalidWeights(
            "weights sum to zero".to_string(),
        ));
    }
    let scaled: Vec<f64> = weights.iter().map(|w| w / largest).collect();
    let total: f64 = scaled.iter().sum();

    let draw = rng.gen_range(0.0..total);
    let mut cumulative = 0.0;
    for (index, weight) in scaled.iter().enumerate() {
        cumulative += weight;
        // Strict comparison: a zero-weight item never owns the draw.
        if draw < cumulative {
            return Ok((index, &items[index]));
        }
    }

    // Rounding can leave the draw a hair above the running sum; the last
    // positively weighted item owns that remainder.
    let last = weights
        .iter()
        .rposition(|w| *w > 0.0)
        .unwrap_or(items.len() - 1);
    Ok((last, &items[last]))
}
