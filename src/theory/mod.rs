mod chord;
mod scale;

pub use chord::{Flavor, FreeChord, diatonic_chord, free_chord};
pub use scale::{ScaleMode, TriadQuality, scale_of};

/// A note identity irrespective of octave, 0 = C .. 11 = B. Chord voicings
/// may carry values above 11.
pub type PitchClass = u8;

pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub const ROMAN_NUMERALS: [&str; 7] = ["I", "II", "III", "IV", "V", "VI", "VII"];

pub fn note_name(pc: PitchClass) -> &'static str {
    NOTE_NAMES[(pc % 12) as usize]
}

/// `12 * octave + pc % 12`, where the octave is the base octave plus the
/// octave embedded in the voicing plus the user shift. Clamped to 0..=127.
pub fn midi_note(pc: PitchClass, base_octave: i32, octave_shift: i32) -> u8 {
    let octave = base_octave + (pc / 12) as i32 + octave_shift;
    let note = 12 * octave + (pc % 12) as i32;
    note.clamp(0, 127) as u8
}

pub fn midi_notes(chord: &[PitchClass], base_octave: i32, octave_shift: i32) -> Vec<u8> {
    chord
        .iter()
        .map(|&pc| midi_note(pc, base_octave, octave_shift))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midi_note_uses_embedded_octave() {
        assert_eq!(midi_note(0, 5, 0), 60);
        assert_eq!(midi_note(14, 5, 0), 74);
        assert_eq!(midi_note(7, 5, -1), 55);
        assert_eq!(midi_note(11, 5, 1), 83);
    }

    #[test]
    fn midi_note_clamps_to_range() {
        assert_eq!(midi_note(11, 12, 1), 127);
        assert_eq!(midi_note(0, -3, -1), 0);
    }

    #[test]
    fn note_names_wrap() {
        assert_eq!(note_name(0), "C");
        assert_eq!(note_name(13), "C#");
        assert_eq!(note_name(23), "B");
    }
}
