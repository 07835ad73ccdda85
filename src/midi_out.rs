use midir::{MidiOutput, MidiOutputConnection};

use crate::events::NoteEvent;
use crate::{Error, Result};

/// Mirrors played chords to an external MIDI port.
pub struct MidiMirror {
    port_name: String,
    connection: MidiOutputConnection,
    failed_sends: usize,
}

impl MidiMirror {
    /// Connects to the first output port whose name contains `filter`. An
    /// empty filter picks the first port.
    pub fn connect(filter: &str) -> Result<Self> {
        let midi_out = MidiOutput::new("chordstick")?;
        let ports = midi_out.ports();
        let port = ports
            .iter()
            .find(|p| midi_out.port_name(p).unwrap_or_default().contains(filter))
            .ok_or_else(|| Error::MidiPortNotFound(filter.to_string()))?;
        let port_name = midi_out.port_name(port).unwrap_or_default();
        let connection = midi_out.connect(port, "chordstick-mirror")?;
        tracing::info!(port = %port_name, "MIDI output connected");

        Ok(Self {
            port_name,
            connection,
            failed_sends: 0,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn send(&mut self, event: &NoteEvent) -> Result<()> {
        self.connection
            .send(&event.to_bytes())
            .map_err(|e| Error::MidiWrite(e.to_string()))
    }

    /// Sends a frame's events, logging the first failure of each run.
    pub fn send_all(&mut self, events: &[NoteEvent]) {
        for event in events {
            match self.send(event) {
                Ok(()) => self.failed_sends = 0,
                Err(e) => {
                    if self.failed_sends == 0 {
                        tracing::warn!(port = %self.port_name, "{e}");
                    }
                    self.failed_sends += 1;
                }
            }
        }
    }
}
