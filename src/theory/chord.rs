use serde::{Deserialize, Serialize};

use super::PitchClass;

/// Builds the chord on `degree` of `scale` by stacking scale thirds.
///
/// The ninth is always placed an octave up. Afterwards every note that is
/// not strictly above its predecessor is raised by octaves until it is, so
/// the result is a strictly ascending voicing.
pub fn diatonic_chord(
    scale: &[PitchClass; 7],
    degree: usize,
    add_seventh: bool,
    add_ninth: bool,
) -> Vec<PitchClass> {
    let at = |offset: usize| scale[(degree + offset) % 7];

    let mut notes = vec![at(0), at(2), at(4)];
    if add_seventh {
        notes.push(at(6));
    }
    if add_ninth {
        notes.push(at(1) + 12);
    }

    for i in 1..notes.len() {
        while notes[i] <= notes[i - 1] {
            notes[i] += 12;
        }
    }
    notes
}

/// Root plus the fixed intervals of `chord`. No voicing normalisation.
pub fn free_chord(root: PitchClass, chord: FreeChord) -> Vec<PitchClass> {
    chord.intervals().iter().map(|&iv| root + iv).collect()
}

/// The eight chord types reachable in free mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FreeChord {
    Major,
    Minor,
    Major7,
    Dominant7,
    Sus4,
    Add9,
    Diminished,
    Minor7,
}

impl FreeChord {
    /// Clockwise from the top of the wheel.
    pub const WHEEL_ORDER: [FreeChord; 8] = [
        FreeChord::Major,
        FreeChord::Sus4,
        FreeChord::Add9,
        FreeChord::Major7,
        FreeChord::Minor,
        FreeChord::Diminished,
        FreeChord::Dominant7,
        FreeChord::Minor7,
    ];

    pub fn intervals(self) -> &'static [PitchClass] {
        match self {
            FreeChord::Major => &[0, 4, 7],
            FreeChord::Minor => &[0, 3, 7],
            FreeChord::Major7 => &[0, 4, 7, 11],
            FreeChord::Dominant7 => &[0, 4, 7, 10],
            FreeChord::Sus4 => &[0, 5, 7],
            FreeChord::Add9 => &[0, 4, 7, 14],
            FreeChord::Diminished => &[0, 3, 6],
            FreeChord::Minor7 => &[0, 3, 7, 10],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FreeChord::Major => "major",
            FreeChord::Minor => "minor",
            FreeChord::Major7 => "maj7",
            FreeChord::Dominant7 => "7",
            FreeChord::Sus4 => "sus4",
            FreeChord::Add9 => "add9",
            FreeChord::Diminished => "dim",
            FreeChord::Minor7 => "min7",
        }
    }
}

/// Chord colour selected by stick distance from centre. Reported to the
/// display; chord construction takes its extensions from the modifier
/// buttons instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Triad,
    Seventh,
    Sus4,
    Add9,
}

impl Flavor {
    pub const ALL: [Flavor; 4] = [Flavor::Triad, Flavor::Seventh, Flavor::Sus4, Flavor::Add9];

    pub fn name(self) -> &'static str {
        match self {
            Flavor::Triad => "Triad",
            Flavor::Seventh => "7th",
            Flavor::Sus4 => "sus4",
            Flavor::Add9 => "add9",
        }
    }
}
