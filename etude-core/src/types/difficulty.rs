use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

/// Practice tier. Ordered so that progression only ever moves "up" the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum DifficultyLevel {
    #[default]
    SingleNote,
    Interval,
    Triad,
}

impl DifficultyLevel {
    /// All tiers in progression order
    pub const ALL: [DifficultyLevel; 3] = [
        DifficultyLevel::SingleNote,
        DifficultyLevel::Interval,
        DifficultyLevel::Triad,
    ];

    /// Number of notes every pattern of this tier carries
    pub fn note_count(&self) -> usize {
        match self {
            DifficultyLevel::SingleNote => 1,
            DifficultyLevel::Interval => 2,
            DifficultyLevel::Triad => 3,
        }
    }

    /// The tier above this one, if any
    pub fn next(&self) -> Option<DifficultyLevel> {
        match self {
            DifficultyLevel::SingleNote => Some(DifficultyLevel::Interval),
            DifficultyLevel::Interval => Some(DifficultyLevel::Triad),
            DifficultyLevel::Triad => None,
        }
    }

    pub fn is_top(&self) -> bool {
        self.next().is_none()
    }

    /// Position in [`DifficultyLevel::ALL`]
    pub fn index(&self) -> usize {
        match self {
            DifficultyLevel::SingleNote => 0,
            DifficultyLevel::Interval => 1,
            DifficultyLevel::Triad => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DifficultyLevel::SingleNote => "single-note",
            DifficultyLevel::Interval => "interval",
            DifficultyLevel::Triad => "triad",
        }
    }

    /// Human readable label for summaries and prompts
    pub fn label(&self) -> &'static str {
        match self {
            DifficultyLevel::SingleNote => "Single notes",
            DifficultyLevel::Interval => "Intervals",
            DifficultyLevel::Triad => "Triads",
        }
    }
}

impl FromStr for DifficultyLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "single" | "single-note" | "single_note" | "note" | "1" => {
                Ok(DifficultyLevel::SingleNote)
            }
            "interval" | "intervals" | "2" => Ok(DifficultyLevel::Interval),
            "triad" | "triads" | "chord" | "3" => Ok(DifficultyLevel::Triad),
            other => Err(anyhow!("Unknown difficulty: {}", other)),
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
