//! Weighted random selection

use rand::Rng;

/// Pick one item with probability proportional to its weight.
///
/// Draws `r = uniform * total` and walks the items subtracting each weight
/// until `r <= 0`. Items with non-positive or non-finite weights are never
/// chosen. Returns `None` when no item carries a positive weight.
pub fn weighted_choice<'a, T, R, F>(rng: &mut R, items: &'a [T], weight: F) -> Option<&'a T>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f64,
{
    let usable = |w: f64| w.is_finite() && w > 0.0;
    let total: f64 = items.iter().map(&weight).filter(|w| usable(*w)).sum();
    if !usable(total) {
        return None;
    }

    let mut remaining = rng.gen::<f64>() * total;
    let mut last = None;
    for item in items {
        let w = weight(item);
        if !usable(w) {
            continue;
        }
        last = Some(item);
        remaining -= w;
        if remaining <= 0.0 {
            return Some(item);
        }
    }

    // Float residue can leave `remaining` a hair above zero
    last
}
