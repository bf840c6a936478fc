//! Anti-repetition scoring between consecutive patterns

use crate::types::pattern::PatternNotes;
use std::collections::BTreeSet;

const POSITIONAL_WEIGHT: f64 = 0.7;
const SET_WEIGHT: f64 = 0.3;

/// Similarity in `[0, 1]` between two candidate note lists.
///
/// `0.7 * positional + 0.3 * jaccard`, where positional is the share of
/// positions holding the same MIDI note and jaccard compares the note sets.
/// Patterns of different difficulty never count as similar.
pub fn similarity(a: &PatternNotes, b: &PatternNotes) -> f64 {
    if a.difficulty() != b.difficulty() {
        return 0.0;
    }

    let left = a.midi_notes();
    let right = b.midi_notes();
    let longest = left.len().max(right.len());
    if longest == 0 {
        return 0.0;
    }

    let matching = left.iter().zip(&right).filter(|(l, r)| l == r).count();
    let positional = matching as f64 / longest as f64;

    POSITIONAL_WEIGHT * positional + SET_WEIGHT * jaccard(&left, &right)
}

fn jaccard(left: &[u8], right: &[u8]) -> f64 {
    let left: BTreeSet<u8> = left.iter().copied().collect();
    let right: BTreeSet<u8> = right.iter().copied().collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::pattern::PatternNote;

    fn interval(a: u8, b: u8) -> PatternNotes {
        PatternNotes::Interval([
            PatternNote::quarter(a, 0).unwrap(),
            PatternNote::quarter(b, 1).unwrap(),
        ])
    }

    #[test]
    fn test_identical_is_one() {
        let notes = interval(60, 67);
        assert!((similarity(&notes, &notes) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_reversed_interval() {
        // No positional matches, same set
        let score = similarity(&interval(60, 67), &interval(67, 60));
        assert!((score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_shared_root() {
        // One of two positions match, jaccard 1/3
        let score = similarity(&interval(60, 64), &interval(60, 67));
        assert!((score - (0.35 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_different_difficulty_is_zero() {
        let single = PatternNotes::SingleNote([PatternNote::quarter(60, 0).unwrap()]);
        assert_eq!(similarity(&single, &interval(60, 67)), 0.0);
    }
}
