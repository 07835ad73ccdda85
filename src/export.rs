use std::path::Path;

use midly::MidiMessage;
use midly::live::LiveEvent;
use midly::num::{u4, u7};
use serde::{Deserialize, Serialize};

use crate::recorder::{RecordedEvent, RecordedKind};
use crate::{Error, Result};

const MAX_DELTA: u32 = 0x0FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub ticks_per_quarter: u16,
    /// Microseconds per quarter note.
    pub tempo: u32,
    pub program: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            ticks_per_quarter: 480,
            tempo: 500_000,
            program: 0,
        }
    }
}

impl ExportOptions {
    /// Absolute tick for a millisecond timestamp.
    pub fn tick_at(&self, time_ms: u64) -> u32 {
        let ticks_per_ms = self.ticks_per_quarter as f64 / (self.tempo.max(1) as f64 / 1000.0);
        (time_ms as f64 * ticks_per_ms).round() as u32
    }
}

pub fn write_midi(events: &[RecordedEvent], options: &ExportOptions, path: &Path) -> Result<()> {
    let bytes = to_smf_bytes(events, options)?;
    std::fs::write(path, &bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "Wrote MIDI file");
    Ok(())
}

/// Format 1, one track: tempo and program change at time zero, the notes on
/// channel 1, end-of-track. Every channel event carries its own status byte.
pub fn to_smf_bytes(events: &[RecordedEvent], options: &ExportOptions) -> Result<Vec<u8>> {
    if events.is_empty() {
        return Err(Error::EmptyRecording);
    }
    let track = track_body(events, options)?;

    let mut out = Vec::with_capacity(22 + track.len());
    out.extend_from_slice(b"MThd");
    out.extend_from_slice(&6u32.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&options.ticks_per_quarter.clamp(1, 0x7FFF).to_be_bytes());
    out.extend_from_slice(b"MTrk");
    out.extend_from_slice(&(track.len() as u32).to_be_bytes());
    out.extend_from_slice(&track);
    Ok(out)
}

fn track_body(events: &[RecordedEvent], options: &ExportOptions) -> Result<Vec<u8>> {
    let channel = u4::new(0);
    let mut sorted = events.to_vec();
    sorted.sort_by_key(|e| e.time_ms);

    let mut t = Vec::with_capacity(16 + sorted.len() * 4);
    write_vlq(&mut t, 0);
    t.extend_from_slice(&[0xFF, 0x51, 0x03]);
    t.extend_from_slice(&(options.tempo & 0xFF_FFFF).to_be_bytes()[1..]);

    write_vlq(&mut t, 0);
    let program = MidiMessage::ProgramChange {
        program: u7::new(options.program & 0x7F),
    };
    write_channel_event(&mut t, channel, program)?;

    let mut last_tick = 0u32;
    for event in &sorted {
        let tick = options.tick_at(event.time_ms);
        write_vlq(&mut t, tick.saturating_sub(last_tick));
        let key = u7::new(event.note & 0x7F);
        let vel = u7::new(event.velocity & 0x7F);
        let message = match event.kind {
            RecordedKind::On => MidiMessage::NoteOn { key, vel },
            RecordedKind::Off => MidiMessage::NoteOff { key, vel },
        };
        write_channel_event(&mut t, channel, message)?;
        last_tick = tick;
    }

    write_vlq(&mut t, 0);
    t.extend_from_slice(&[0xFF, 0x2F, 0x00]);
    Ok(t)
}

fn write_channel_event(buf: &mut Vec<u8>, channel: u4, message: MidiMessage) -> Result<()> {
    LiveEvent::Midi { channel, message }
        .write_std(buf)
        .map_err(|e| Error::MidiWrite(e.to_string()))
}

fn write_vlq(buf: &mut Vec<u8>, value: u32) {
    let mut value = value.min(MAX_DELTA);
    let mut bytes = [0u8; 4];
    let mut i = 3;
    bytes[i] = (value & 0x7F) as u8;
    value >>= 7;
    while value > 0 {
        i -= 1;
        bytes[i] = ((value & 0x7F) | 0x80) as u8;
        value >>= 7;
    }
    buf.extend_from_slice(&bytes[i..]);
}
