//! Rational beat positions and durations
//!
//! Pattern rhythm is stored as exact rationals so notation durations never
//! drift through floating point conversions.

use num_rational::Ratio;
use num_traits::{Signed, ToPrimitive, Zero};

/// Exact beat count (quarter notes in 4/4)
pub type Beats = Ratio<i64>;

/// MusicXML divisions per quarter note used by the notation renderer
pub const DIVISIONS_PER_BEAT: i64 = 4;

/// Helper to create Beats from a ratio n/d
#[inline]
pub fn beats_ratio(n: i64, d: i64) -> Beats {
    Ratio::new(n, d)
}

/// Create Beats from an integer (whole beats)
#[inline]
pub fn beats(n: i64) -> Beats {
    Ratio::from_integer(n)
}

/// Convert rational to f64
#[inline]
pub fn to_f64(t: Beats) -> f64 {
    t.to_f64().unwrap_or(0.0)
}

/// True for strictly positive durations
pub fn is_positive(t: Beats) -> bool {
    t.is_positive()
}

/// True for offsets at or after the pattern origin
pub fn is_non_negative(t: Beats) -> bool {
    !t.is_negative()
}

/// Convert a beat duration to whole MusicXML divisions.
///
/// Returns `None` when the duration is finer than a sixteenth note and cannot
/// be expressed with [`DIVISIONS_PER_BEAT`].
pub fn to_divisions(t: Beats) -> Option<i64> {
    let scaled = t * beats(DIVISIONS_PER_BEAT);
    if scaled.is_integer() && !scaled.is_zero() {
        Some(scaled.to_integer())
    } else {
        None
    }
}

/// Milliseconds a beat span lasts at the given tempo
pub fn to_millis(t: Beats, bpm: f64) -> f64 {
    if bpm <= 0.0 {
        return 0.0;
    }
    to_f64(t) * 60_000.0 / bpm
}
