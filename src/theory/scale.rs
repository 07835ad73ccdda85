use serde::{Deserialize, Serialize};

use super::PitchClass;

const MAJOR: [PitchClass; 7] = [0, 2, 4, 5, 7, 9, 11];
const MINOR: [PitchClass; 7] = [0, 2, 3, 5, 7, 8, 10];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleMode {
    #[default]
    Major,
    Minor,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 2] = [ScaleMode::Major, ScaleMode::Minor];

    pub fn intervals(self) -> [PitchClass; 7] {
        match self {
            ScaleMode::Major => MAJOR,
            ScaleMode::Minor => MINOR,
        }
    }

    /// Triad quality of each scale degree. Only used for labelling.
    pub fn triad_qualities(self) -> [TriadQuality; 7] {
        use TriadQuality::*;
        match self {
            ScaleMode::Major => [Major, Minor, Minor, Major, Major, Minor, Diminished],
            ScaleMode::Minor => [Minor, Diminished, Major, Minor, Minor, Major, Major],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ScaleMode::Major => "major",
            ScaleMode::Minor => "minor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriadQuality {
    Major,
    Minor,
    Diminished,
}

impl TriadQuality {
    pub fn label(self) -> &'static str {
        match self {
            TriadQuality::Major => "Major",
            TriadQuality::Minor => "minor",
            TriadQuality::Diminished => "diminished",
        }
    }
}

/// The seven pitch classes of `mode` starting at `root`, in degree order.
pub fn scale_of(root: PitchClass, mode: ScaleMode) -> [PitchClass; 7] {
    mode.intervals().map(|step| (step + root % 12) % 12)
}
