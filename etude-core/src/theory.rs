//! Static music-theory tables: note pools, interval and triad shapes, and the
//! pedagogical weights that bias generation toward stable scale degrees.

use crate::types::note::is_natural_pitch_class;
use std::fmt;
use std::str::FromStr;

/// Lowest note of every pool (C4)
pub const POOL_LOW: u8 = 60;
/// Highest note of every pool (G5)
pub const POOL_HIGH: u8 = 79;

/// Black keys admitted by the intermediate tier: C#, Eb, F#, Bb
const COMMON_BLACK_KEYS: [u8; 4] = [1, 3, 6, 10];

/// Progression tier for the set of notes patterns are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum PoolTier {
    #[default]
    WhiteKeys,
    CommonBlackKeys,
    FullChromatic,
}

impl PoolTier {
    pub fn name(&self) -> &'static str {
        match self {
            PoolTier::WhiteKeys => "white-keys",
            PoolTier::CommonBlackKeys => "common-black-keys",
            PoolTier::FullChromatic => "full-chromatic",
        }
    }

    fn admits(&self, pitch_class: u8) -> bool {
        match self {
            PoolTier::WhiteKeys => is_natural_pitch_class(pitch_class),
            PoolTier::CommonBlackKeys => {
                is_natural_pitch_class(pitch_class) || COMMON_BLACK_KEYS.contains(&pitch_class)
            }
            PoolTier::FullChromatic => true,
        }
    }

    /// The note pool for this tier across the practice range
    pub fn pool(&self) -> NotePool {
        NotePool::from_range(*self, POOL_LOW, POOL_HIGH)
    }
}

impl FromStr for PoolTier {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "white" | "white-keys" | "naturals" => Ok(PoolTier::WhiteKeys),
            "common" | "common-black-keys" | "black" => Ok(PoolTier::CommonBlackKeys),
            "chromatic" | "full-chromatic" | "all" => Ok(PoolTier::FullChromatic),
            other => Err(anyhow::anyhow!("Unknown note pool: {}", other)),
        }
    }
}

impl fmt::Display for PoolTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Sorted, de-duplicated set of MIDI notes a generator may draw from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePool {
    notes: Vec<u8>,
    chromatic: bool,
}

impl NotePool {
    /// Every note of `tier` between `low` and `high` inclusive
    pub fn from_range(tier: PoolTier, low: u8, high: u8) -> Self {
        let notes = (low..=high.min(127))
            .filter(|midi| tier.admits(midi % 12))
            .collect();
        NotePool {
            notes,
            chromatic: tier == PoolTier::FullChromatic,
        }
    }

    /// An explicit pool. Snapping applies unless `chromatic` is set.
    pub fn from_notes(notes: impl IntoIterator<Item = u8>, chromatic: bool) -> Self {
        let mut notes: Vec<u8> = notes.into_iter().filter(|&m| m <= 127).collect();
        notes.sort_unstable();
        notes.dedup();
        NotePool { notes, chromatic }
    }

    pub fn notes(&self) -> &[u8] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Whether every semitone in range is a member (no snapping required)
    pub fn is_chromatic(&self) -> bool {
        self.chromatic
    }

    pub fn lowest(&self) -> Option<u8> {
        self.notes.first().copied()
    }

    pub fn highest(&self) -> Option<u8> {
        self.notes.last().copied()
    }

    pub fn contains(&self, midi: u8) -> bool {
        self.notes.binary_search(&midi).is_ok()
    }

    /// Nearest pool member to `target`; ties resolve to the lower member
    pub fn nearest(&self, target: i16) -> Option<u8> {
        self.notes
            .iter()
            .copied()
            .min_by_key(|&m| ((m as i16 - target).abs(), m))
    }
}

/// Pedagogical weight per pitch class: tonic highest, leading tone lowest
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeightTable {
    pub weights: [f64; 12],
}

impl WeightTable {
    pub const DEFAULT_WEIGHTS: [f64; 12] = [
        1.0,  // C  tonic
        0.5,  // C#
        0.6,  // D  supertonic
        0.5,  // Eb
        0.8,  // E  mediant
        0.7,  // F  subdominant
        0.5,  // F#
        0.9,  // G  dominant
        0.5,  // Ab
        0.6,  // A  submediant
        0.5,  // Bb
        0.4,  // B  leading tone
    ];

    pub fn new(weights: [f64; 12]) -> Self {
        WeightTable { weights }
    }

    /// Uniform weights, useful for tests and for "no bias" practice
    pub fn uniform() -> Self {
        WeightTable { weights: [1.0; 12] }
    }

    pub fn weight_for(&self, midi: u8) -> f64 {
        self.weights[(midi % 12) as usize]
    }

    /// True when every weight is finite, none is negative and at least one is positive
    pub fn is_usable(&self) -> bool {
        self.weights.iter().all(|w| w.is_finite() && *w >= 0.0)
            && self.weights.iter().any(|w| *w > 0.0)
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        WeightTable::new(Self::DEFAULT_WEIGHTS)
    }
}

/// A weighted interval used to derive the second note of an interval pattern
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntervalShape {
    pub name: &'static str,
    pub semitones: i16,
    pub weight: f64,
}

pub const INTERVALS: [IntervalShape; 5] = [
    IntervalShape { name: "minor 3rd", semitones: 3, weight: 1.0 },
    IntervalShape { name: "major 3rd", semitones: 4, weight: 1.0 },
    IntervalShape { name: "perfect 4th", semitones: 5, weight: 0.8 },
    IntervalShape { name: "perfect 5th", semitones: 7, weight: 0.9 },
    IntervalShape { name: "octave", semitones: 12, weight: 0.6 },
];

/// A weighted triad quality: semitone offsets of the third and fifth above the root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriadShape {
    pub name: &'static str,
    pub offsets: [i16; 2],
    pub weight: f64,
}

pub const TRIADS: [TriadShape; 4] = [
    TriadShape { name: "major", offsets: [4, 7], weight: 1.0 },
    TriadShape { name: "minor", offsets: [3, 7], weight: 0.9 },
    TriadShape { name: "diminished", offsets: [3, 6], weight: 0.4 },
    TriadShape { name: "augmented", offsets: [4, 8], weight: 0.3 },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_white_key_pool() {
        let pool = PoolTier::WhiteKeys.pool();
        assert_eq!(pool.lowest(), Some(60));
        assert_eq!(pool.highest(), Some(79));
        assert!(pool.notes().iter().all(|m| is_natural_pitch_class(m % 12)));
        assert!(!pool.is_chromatic());
        // C4..G5 naturals: C D E F G A B C D E F G
        assert_eq!(pool.len(), 12);
    }

    #[test]
    fn test_tiers_grow() {
        let white = PoolTier::WhiteKeys.pool().len();
        let common = PoolTier::CommonBlackKeys.pool().len();
        let chromatic = PoolTier::FullChromatic.pool().len();
        assert!(white < common && common < chromatic);
        assert_eq!(chromatic, 20);
        assert!(PoolTier::FullChromatic.pool().is_chromatic());
    }

    #[test]
    fn test_common_black_keys_excludes_ab() {
        let pool = PoolTier::CommonBlackKeys.pool();
        assert!(pool.contains(61)); // C#4
        assert!(pool.contains(70)); // Bb4
        assert!(!pool.contains(68)); // Ab4
    }

    #[test]
    fn test_nearest_snaps_down_on_ties() {
        let pool = PoolTier::WhiteKeys.pool();
        // C#4 is equidistant from C4 and D4
        assert_eq!(pool.nearest(61), Some(60));
        assert_eq!(pool.nearest(66), Some(65));
        assert_eq!(pool.nearest(200), Some(79));
        assert_eq!(NotePool::from_notes(vec![], false).nearest(60), None);
    }

    #[test]
    fn test_weight_table_defaults() {
        let table = WeightTable::default();
        let max = table.weights.iter().cloned().fold(f64::MIN, f64::max);
        let min = table.weights.iter().cloned().fold(f64::MAX, f64::min);
        assert_eq!(table.weight_for(60), max);
        assert_eq!(table.weight_for(71), min);
        assert!(table.is_usable());
        assert!(!WeightTable::new([0.0; 12]).is_usable());
        assert!(!WeightTable::new([f64::NAN; 12]).is_usable());
    }

    #[test]
    fn test_pool_tier_parsing() {
        assert_eq!("white".parse::<PoolTier>().unwrap(), PoolTier::WhiteKeys);
        assert_eq!("chromatic".parse::<PoolTier>().unwrap(), PoolTier::FullChromatic);
        assert!("lydian".parse::<PoolTier>().is_err());
    }
}
