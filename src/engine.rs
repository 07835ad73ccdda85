use crate::audio::{
    AudioOutput, LayerSpec, OutputState, SynthParams, VoiceCommand, VoiceId, detuned_freq,
};

/// Frequency glide used when a held chord changes.
pub const MORPH_RAMP_SECS: f32 = 0.08;
/// Upper bound on the release fade so letting go stays responsive.
pub const MAX_RELEASE_FADE_SECS: f32 = 0.5;

const SECOND_LAYER_DETUNE_CENTS: f32 = 3.0;
const SECOND_LAYER_LEVEL: f32 = 0.6;
const OCTAVE_GAIN_STEP: f32 = 1.4;
const MAX_COMPENSATED_OCTAVES: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A chord is already sounding; use `morph` or `stop` first.
    AlreadySounding,
    /// Another creation is in flight.
    Busy,
    /// Output still being acquired. Retry on a later frame.
    NotReady,
    /// Output failed; sound is disabled.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MorphOutcome {
    /// Voices retargeted in place.
    Morphed,
    /// Nothing was sounding, or the chord size changed, so voices were
    /// (re)started.
    Restarted(StartOutcome),
}

#[derive(Debug, Clone)]
struct ActiveVoice {
    id: VoiceId,
    note: u8,
    generation: u64,
}

/// Proof that a creation was begun under a given generation.
#[derive(Debug)]
struct CreationTicket {
    generation: u64,
}

pub struct VoiceEngine<O> {
    output: O,
    params: SynthParams,
    base_octave: i32,
    voices: Vec<ActiveVoice>,
    creating: bool,
    generation: u64,
    next_id: VoiceId,
}

/// Gain multiplier that lifts notes below `base_octave` and tames notes
/// above it, limited to two octaves either way.
pub fn octave_gain_compensation(note: u8, base_octave: i32) -> f32 {
    let diff = (note as i32 / 12 - base_octave).clamp(-MAX_COMPENSATED_OCTAVES, MAX_COMPENSATED_OCTAVES);
    OCTAVE_GAIN_STEP.powi(-diff)
}

impl<O: AudioOutput> VoiceEngine<O> {
    pub fn new(output: O, params: SynthParams, base_octave: i32) -> Self {
        Self {
            output,
            params,
            base_octave,
            voices: Vec::new(),
            creating: false,
            generation: 0,
            next_id: 1,
        }
    }

    pub fn is_sounding(&self) -> bool {
        !self.voices.is_empty()
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    pub fn sounding_notes(&self) -> Vec<u8> {
        self.voices.iter().map(|v| v.note).collect()
    }

    pub fn params(&self) -> &SynthParams {
        &self.params
    }

    /// Applies to voices started from now on.
    pub fn set_params(&mut self, params: SynthParams) {
        self.params = params;
    }

    pub fn set_base_octave(&mut self, base_octave: i32) {
        self.base_octave = base_octave;
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    #[cfg(test)]
    pub(crate) fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Output state without triggering acquisition.
    pub fn audio_state(&mut self) -> OutputState {
        self.output.state()
    }

    /// Current output state, kicking off acquisition on first use.
    pub fn output_state(&mut self) -> OutputState {
        if self.output.state() == OutputState::Uninitialized {
            self.output.initialize();
        }
        self.output.state()
    }

    pub fn start(&mut self, notes: &[u8]) -> StartOutcome {
        if self.is_sounding() {
            return StartOutcome::AlreadySounding;
        }
        match self.output_state() {
            OutputState::Ready => {}
            OutputState::Failed => return StartOutcome::Unavailable,
            OutputState::Uninitialized | OutputState::Pending => return StartOutcome::NotReady,
        }
        let Some(ticket) = self.begin_creation() else {
            tracing::debug!("voice creation already in progress, dropping start");
            return StartOutcome::Busy;
        };

        let voices: Vec<ActiveVoice> = notes
            .iter()
            .map(|&note| self.spawn_voice(note, ticket.generation))
            .collect();
        self.finish_creation(ticket, voices)
    }

    pub fn morph(&mut self, notes: &[u8]) -> MorphOutcome {
        if !self.is_sounding() {
            return MorphOutcome::Restarted(self.start(notes));
        }
        if notes.len() != self.voices.len() {
            self.stop();
            return MorphOutcome::Restarted(self.start(notes));
        }

        let detune = self.params.detune;
        for (voice, &note) in self.voices.iter_mut().zip(notes) {
            if voice.note == note {
                continue;
            }
            let command = VoiceCommand::Retarget {
                id: voice.id,
                freqs: [
                    detuned_freq(note, detune),
                    detuned_freq(note, detune + SECOND_LAYER_DETUNE_CENTS),
                ],
                ramp: MORPH_RAMP_SECS,
            };
            if !self.output.send(command) {
                tracing::warn!(voice = voice.id, "command queue full, retarget dropped");
            }
            voice.note = note;
        }
        MorphOutcome::Morphed
    }

    /// Fades every voice out and forgets it at once.
    pub fn stop(&mut self) {
        self.generation += 1;
        if self.voices.is_empty() {
            return;
        }
        let fade = self.params.release.clamp(0.0, MAX_RELEASE_FADE_SECS);
        let voices = std::mem::take(&mut self.voices);
        self.release_all(&voices, fade);
    }

    fn release_all(&mut self, voices: &[ActiveVoice], fade: f32) {
        for voice in voices {
            let command = VoiceCommand::Release {
                id: voice.id,
                generation: voice.generation,
                fade,
            };
            if !self.output.send(command) {
                tracing::warn!(voice = voice.id, "command queue full, release dropped");
            }
        }
    }

    /// `start` takes and returns its ticket in one call, so the busy flag and
    /// the stale-ticket check in [`Self::finish_creation`] only trip when a
    /// ticket is held across calls.
    fn begin_creation(&mut self) -> Option<CreationTicket> {
        if self.creating {
            return None;
        }
        self.creating = true;
        self.generation += 1;
        Some(CreationTicket {
            generation: self.generation,
        })
    }

    fn finish_creation(&mut self, ticket: CreationTicket, voices: Vec<ActiveVoice>) -> StartOutcome {
        self.creating = false;
        if ticket.generation != self.generation {
            tracing::debug!(
                stale = ticket.generation,
                current = self.generation,
                "discarding voices from a superseded start"
            );
            self.release_all(&voices, 0.0);
            return StartOutcome::Busy;
        }
        tracing::trace!(count = voices.len(), "voices started");
        self.voices = voices;
        StartOutcome::Started
    }

    fn spawn_voice(&mut self, note: u8, generation: u64) -> ActiveVoice {
        let id = self.next_id;
        self.next_id += 1;
        let command = VoiceCommand::Start {
            id,
            generation,
            layers: self.layer_specs(note),
        };
        if !self.output.send(command) {
            tracing::warn!(voice = id, note, "command queue full, voice start dropped");
        }
        ActiveVoice {
            id,
            note,
            generation,
        }
    }

    fn layer_specs(&self, note: u8) -> [Option<LayerSpec>; 2] {
        let p = &self.params;
        let compensation = octave_gain_compensation(note, self.base_octave);

        let peak = p.gain * compensation;
        let main = LayerSpec {
            wave: p.wave,
            freq: detuned_freq(note, p.detune),
            peak,
            sustain_level: peak * p.sustain,
            attack: p.attack,
            decay: p.decay,
        };

        let second = (p.mix > 0.0).then(|| {
            let peak = p.gain * p.mix * SECOND_LAYER_LEVEL * compensation;
            LayerSpec {
                wave: p.wave.companion(),
                freq: detuned_freq(note, p.detune + SECOND_LAYER_DETUNE_CENTS),
                peak,
                sustain_level: peak * p.sustain,
                attack: p.attack,
                decay: p.decay,
            }
        });

        [Some(main), second]
    }
}
