/// A note-level event produced by the control loop. The recorder timestamps
/// these and the live MIDI mirror forwards them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteEvent {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8 },
}

impl NoteEvent {
    pub fn pitch(&self) -> u8 {
        match *self {
            NoteEvent::NoteOn { pitch, .. } | NoteEvent::NoteOff { pitch } => pitch,
        }
    }

    /// Raw channel-1 MIDI bytes.
    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            NoteEvent::NoteOn { pitch, velocity } => [0x90, pitch & 0x7F, velocity & 0x7F],
            NoteEvent::NoteOff { pitch } => [0x80, pitch & 0x7F, 0],
        }
    }
}

pub fn note_ons(pitches: &[u8], velocity: u8) -> impl Iterator<Item = NoteEvent> + '_ {
    pitches
        .iter()
        .map(move |&pitch| NoteEvent::NoteOn { pitch, velocity })
}

pub fn note_offs(pitches: &[u8]) -> impl Iterator<Item = NoteEvent> + '_ {
    pitches.iter().map(|&pitch| NoteEvent::NoteOff { pitch })
}
