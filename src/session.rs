use std::time::Instant;

use crate::audio::{AudioOutput, OutputState, SynthParams, preset};
use crate::config::{PlayMode, Settings};
use crate::engine::{StartOutcome, VoiceEngine};
use crate::events::{NoteEvent, note_offs, note_ons};
use crate::input::ControlState;
use crate::mapping::{magnitude_of, map_diatonic, map_free, outside_deadzone};
use crate::recorder::{RecordedEvent, Recorder};
use crate::theory::{
    PitchClass, ScaleMode, diatonic_chord, free_chord, midi_notes, note_name, scale_of,
};

/// What a renderer needs to draw the wheel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayState {
    /// Scale pitch classes in degree order.
    pub scale: [PitchClass; 7],
    pub highlighted: Option<usize>,
    /// Pitch classes (0..12) of the held chord, root first. Empty when
    /// nothing is held.
    pub chord: Vec<PitchClass>,
}

/// Output of one control-loop iteration.
#[derive(Debug, Clone)]
pub struct Frame {
    pub display: DisplayState,
    pub chord_label: String,
    pub status: String,
    /// Note changes this frame, in order, for live MIDI output.
    pub events: Vec<NoteEvent>,
    pub sounding: bool,
    pub magnitude: f64,
}

struct ChordChoice {
    pitch_classes: Vec<PitchClass>,
    scale: [PitchClass; 7],
    highlighted: usize,
    label: String,
    status: String,
}

pub struct Session<O> {
    settings: Settings,
    engine: VoiceEngine<O>,
    recorder: Recorder,
    playing: bool,
    last_played: Vec<u8>,
}

impl<O: AudioOutput> Session<O> {
    pub fn new(settings: Settings, output: O) -> Self {
        let engine = VoiceEngine::new(output, settings.synth, settings.base_octave);
        Self {
            settings,
            engine,
            recorder: Recorder::new(),
            playing: false,
            last_played: Vec::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn engine(&self) -> &VoiceEngine<O> {
        &self.engine
    }

    pub fn audio_state(&mut self) -> OutputState {
        self.engine.audio_state()
    }

    /// Swaps in new settings. Sounding voices keep their parameters; the next
    /// chord uses the new ones.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.engine.set_params(settings.synth);
        self.engine.set_base_octave(settings.base_octave);
        self.settings = settings;
    }

    pub fn set_synth(&mut self, synth: SynthParams) {
        self.settings.synth = synth;
        self.engine.set_params(synth);
    }

    /// Loads the named preset into the live synth parameters.
    pub fn select_preset(&mut self, key: &str) -> bool {
        let Some(preset) = preset(key) else {
            tracing::warn!(preset = key, "Unknown preset");
            return false;
        };
        self.settings.preset = preset.key.to_string();
        self.set_synth(SynthParams::from_preset(preset));
        true
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn last_played(&self) -> &[u8] {
        &self.last_played
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    pub fn recorded_count(&self) -> usize {
        self.recorder.event_count()
    }

    pub fn start_recording(&mut self, now: Instant) -> bool {
        self.recorder.start(now)
    }

    /// `None` if no recording was running.
    pub fn stop_recording(&mut self) -> Option<Vec<RecordedEvent>> {
        self.recorder.stop()
    }

    pub fn tick(&mut self, input: &ControlState, now: Instant) -> Frame {
        let magnitude = magnitude_of(input.x, input.y);
        let mut events = Vec::new();

        if !outside_deadzone(input.x, input.y, self.settings.deadzone) {
            self.release(now, &mut events);
            return Frame {
                display: DisplayState {
                    scale: self.neutral_scale(input),
                    highlighted: None,
                    chord: Vec::new(),
                },
                chord_label: "-".to_string(),
                status: "-".to_string(),
                events,
                sounding: false,
                magnitude,
            };
        }

        let choice = self.choose_chord(input);
        let midis = midi_notes(
            &choice.pitch_classes,
            self.settings.base_octave,
            input.octave_shift(),
        );

        let chord = if input.hold {
            self.hold(&midis, now, &mut events);
            choice.pitch_classes.iter().map(|pc| pc % 12).collect()
        } else {
            self.release(now, &mut events);
            Vec::new()
        };

        Frame {
            display: DisplayState {
                scale: choice.scale,
                highlighted: Some(choice.highlighted),
                chord,
            },
            chord_label: choice.label,
            status: choice.status,
            events,
            sounding: self.playing,
            magnitude,
        }
    }

    fn hold(&mut self, midis: &[u8], now: Instant, events: &mut Vec<NoteEvent>) {
        if !self.playing {
            match self.engine.start(midis) {
                StartOutcome::Started
                | StartOutcome::Unavailable
                | StartOutcome::AlreadySounding => {
                    let ons: Vec<_> = note_ons(midis, self.settings.velocity).collect();
                    self.emit(&ons, true, now, events);
                    self.playing = true;
                    self.last_played = midis.to_vec();
                }
                StartOutcome::Busy | StartOutcome::NotReady => {}
            }
            return;
        }

        self.engine.morph(midis);
        if self.last_played != midis {
            let mut changes: Vec<_> = note_offs(&self.last_played).collect();
            changes.extend(note_ons(midis, self.settings.velocity));
            let record = self.settings.record_morphs;
            self.emit(&changes, record, now, events);
            self.last_played = midis.to_vec();
        }
    }

    fn release(&mut self, now: Instant, events: &mut Vec<NoteEvent>) {
        if !self.playing {
            return;
        }
        self.engine.stop();
        let offs: Vec<_> = note_offs(&self.last_played).collect();
        self.emit(&offs, true, now, events);
        self.playing = false;
        self.last_played.clear();
    }

    fn emit(&mut self, new: &[NoteEvent], record: bool, now: Instant, events: &mut Vec<NoteEvent>) {
        if record {
            for &event in new {
                self.recorder.record(event, now);
            }
        }
        events.extend_from_slice(new);
    }

    fn effective_root(&self, input: &ControlState) -> PitchClass {
        match self.settings.mode {
            PlayMode::Diatonic => self.settings.root % 12,
            PlayMode::Free => input.root_override.unwrap_or(self.settings.root) % 12,
        }
    }

    fn neutral_scale(&self, input: &ControlState) -> [PitchClass; 7] {
        let root = self.effective_root(input);
        match self.settings.mode {
            PlayMode::Diatonic => scale_of(root, self.settings.scale),
            PlayMode::Free => scale_of(root, ScaleMode::Major),
        }
    }

    fn choose_chord(&self, input: &ControlState) -> ChordChoice {
        let root = self.effective_root(input);
        let shift = input.octave_shift();
        match self.settings.mode {
            PlayMode::Diatonic => {
                let mode = self.settings.scale;
                let scale = scale_of(root, mode);
                let selection = map_diatonic(input.x, input.y, scale.len());
                let degree = selection.degree;
                let quality = mode.triad_qualities()[degree].label();

                let mut label = format!("{} {}", note_name(scale[degree]), quality);
                if input.seventh {
                    label.push('7');
                }
                if input.ninth {
                    label.push_str(if input.seventh { "/9" } else { "add9" });
                }
                label.push_str(&octave_suffix(shift));

                let mut status = format!("Degree:{degree} Type:{quality}");
                if input.seventh || input.ninth {
                    status.push_str(" Extensions:");
                    if input.seventh {
                        status.push_str(" 7th");
                    }
                    if input.ninth {
                        status.push_str(" 9th");
                    }
                }
                if shift != 0 {
                    status.push_str(&format!(" Octave:{shift:+}"));
                }
                status.push_str(&format!(" Flavor:{}", selection.flavor.name()));

                ChordChoice {
                    pitch_classes: diatonic_chord(&scale, degree, input.seventh, input.ninth),
                    scale,
                    highlighted: degree,
                    label,
                    status,
                }
            }
            PlayMode::Free => {
                let chord = map_free(input.x, input.y);
                let mut status = format!("Chord:{}", chord.name());
                if shift != 0 {
                    status.push_str(&format!(" Octave:{shift:+}"));
                }
                ChordChoice {
                    pitch_classes: free_chord(root, chord),
                    scale: scale_of(root, ScaleMode::Major),
                    highlighted: 0,
                    label: format!("{} {}{}", note_name(root), chord.name(), octave_suffix(shift)),
                    status,
                }
            }
        }
    }
}

fn octave_suffix(shift: i32) -> String {
    match shift {
        0 => String::new(),
        s if s > 0 => format!(" (+{s} oct)"),
        s => format!(" ({s} oct)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::VoiceCommand;
    use crate::input::InputSource;
    use crate::recorder::RecordedKind;
    use std::time::Duration;

    struct FakeOutput {
        state: OutputState,
        sent: Vec<VoiceCommand>,
    }

    impl AudioOutput for FakeOutput {
        fn state(&mut self) -> OutputState {
            self.state
        }

        fn initialize(&mut self) {}

        fn send(&mut self, command: VoiceCommand) -> bool {
            self.sent.push(command);
            true
        }
    }

    fn session(mode: PlayMode, state: OutputState) -> Session<FakeOutput> {
        let settings = Settings {
            mode,
            ..Settings::default()
        };
        Session::new(
            settings,
            FakeOutput {
                state,
                sent: Vec::new(),
            },
        )
    }

    fn input(x: f64, y: f64, hold: bool) -> ControlState {
        ControlState {
            x,
            y,
            hold,
            ..ControlState::neutral()
        }
    }

    const UP: (f64, f64) = (0.0, -1.0);
    const RIGHT: (f64, f64) = (1.0, 0.0);

    #[test]
    fn inside_deadzone_is_neutral() {
        let mut session = session(PlayMode::Diatonic, OutputState::Ready);
        let frame = session.tick(&input(0.0, -0.149, true), Instant::now());
        assert_eq!(frame.display.highlighted, None);
        assert!(frame.display.chord.is_empty());
        assert_eq!(frame.chord_label, "-");
        assert!(!session.is_playing());
        assert_eq!(frame.display.scale, [0, 2, 4, 5, 7, 9, 11]);
    }

    #[test]
    fn just_outside_deadzone_sounds() {
        let mut session = session(PlayMode::Diatonic, OutputState::Ready);
        let frame = session.tick(&input(0.0, -0.151, true), Instant::now());
        assert!(frame.sounding);
        assert_eq!(session.engine().sounding_notes(), vec![60, 64, 67]);
    }

    #[test]
    fn display_tracks_pointer_without_hold() {
        let mut session = session(PlayMode::Diatonic, OutputState::Ready);
        let frame = session.tick(&input(RIGHT.0, RIGHT.1, false), Instant::now());
        assert_eq!(frame.display.highlighted, Some(1));
        assert!(frame.display.chord.is_empty());
        assert_eq!(frame.chord_label, "D minor");
        assert!(!frame.sounding);
    }

    #[test]
    fn hold_starts_morphs_and_releases() {
        let mut session = session(PlayMode::Diatonic, OutputState::Ready);
        let now = Instant::now();

        let frame = session.tick(&input(UP.0, UP.1, true), now);
        assert_eq!(frame.display.chord, vec![0, 4, 7]);
        assert_eq!(frame.events.len(), 3);
        assert!(matches!(frame.events[0], NoteEvent::NoteOn { pitch: 60, .. }));

        let frame = session.tick(&input(RIGHT.0, RIGHT.1, true), now);
        assert_eq!(session.engine().sounding_notes(), vec![62, 65, 69]);
        assert_eq!(session.engine().voice_count(), 3);
        assert_eq!(frame.display.chord, vec![2, 5, 9]);

        let frame = session.tick(&input(RIGHT.0, RIGHT.1, false), now);
        assert!(!session.is_playing());
        assert!(!session.engine().is_sounding());
        assert_eq!(
            frame.events,
            vec![
                NoteEvent::NoteOff { pitch: 62 },
                NoteEvent::NoteOff { pitch: 65 },
                NoteEvent::NoteOff { pitch: 69 },
            ]
        );
    }

    #[test]
    fn pending_output_retries_next_frame() {
        let mut session = session(PlayMode::Diatonic, OutputState::Pending);
        let now = Instant::now();
        let frame = session.tick(&input(UP.0, UP.1, true), now);
        assert!(!frame.sounding);
        assert!(frame.events.is_empty());

        session.engine.output_mut().state = OutputState::Ready;
        let frame = session.tick(&input(UP.0, UP.1, true), now);
        assert!(frame.sounding);
        assert_eq!(frame.events.len(), 3);
    }

    #[test]
    fn failed_output_still_records() {
        let mut session = session(PlayMode::Diatonic, OutputState::Failed);
        let t0 = Instant::now();
        session.start_recording(t0);
        session.tick(&input(UP.0, UP.1, true), t0);
        session.tick(&input(UP.0, UP.1, false), t0 + Duration::from_millis(250));
        let events = session.stop_recording().unwrap();
        assert_eq!(events.len(), 6);
        assert!(session.engine().output().sent.is_empty());
    }

    #[test]
    fn morphs_are_not_recorded_by_default() {
        let mut session = session(PlayMode::Diatonic, OutputState::Ready);
        let t0 = Instant::now();
        session.start_recording(t0);
        session.tick(&input(UP.0, UP.1, true), t0);
        let frame = session.tick(&input(RIGHT.0, RIGHT.1, true), t0 + Duration::from_millis(100));
        assert_eq!(frame.events.len(), 6);
        session.tick(&input(RIGHT.0, RIGHT.1, false), t0 + Duration::from_millis(200));

        let events = session.stop_recording().unwrap();
        let ons: Vec<_> = events.iter().filter(|e| e.kind == RecordedKind::On).map(|e| e.note).collect();
        let offs: Vec<_> = events.iter().filter(|e| e.kind == RecordedKind::Off).map(|e| e.note).collect();
        assert_eq!(ons, vec![60, 64, 67]);
        assert_eq!(offs, vec![62, 65, 69]);
        assert!(events.iter().filter(|e| e.kind == RecordedKind::Off).all(|e| e.time_ms == 200));
    }

    #[test]
    fn morphs_recorded_when_enabled() {
        let mut session = session(PlayMode::Diatonic, OutputState::Ready);
        let mut settings = session.settings().clone();
        settings.record_morphs = true;
        session.apply_settings(settings);
        let t0 = Instant::now();
        session.start_recording(t0);
        session.tick(&input(UP.0, UP.1, true), t0);
        session.tick(&input(RIGHT.0, RIGHT.1, true), t0);
        session.tick(&input(0.0, 0.0, false), t0);
        let events = session.stop_recording().unwrap();
        assert_eq!(events.len(), 12);
    }

    #[test]
    fn diatonic_labels_show_extensions_and_octave() {
        let mut session = session(PlayMode::Diatonic, OutputState::Ready);
        let mut state = input(UP.0, UP.1, false);
        state.seventh = true;
        state.ninth = true;
        state.octave_up = true;
        let frame = session.tick(&state, Instant::now());
        assert_eq!(frame.chord_label, "C Major7/9 (+1 oct)");
        assert!(frame.status.starts_with("Degree:0 Type:Major Extensions: 7th 9th Octave:+1"));
        assert!(frame.status.ends_with("Flavor:add9"));
    }

    #[test]
    fn extensions_and_octave_shift_reach_the_engine() {
        let mut session = session(PlayMode::Diatonic, OutputState::Ready);
        let mut state = input(UP.0, UP.1, true);
        state.seventh = true;
        state.octave_down = true;
        session.tick(&state, Instant::now());
        assert_eq!(session.engine().sounding_notes(), vec![48, 52, 55, 59]);
    }

    #[test]
    fn free_mode_uses_root_override() {
        let mut session = session(PlayMode::Free, OutputState::Ready);
        // just below horizontal-right: third sector
        let mut state = input(1.0, 0.1, true);
        state.root_override = Some(9);
        state.source = InputSource::Controller;
        let frame = session.tick(&state, Instant::now());
        assert_eq!(frame.chord_label, "A add9");
        assert_eq!(frame.display.scale[0], 9);
        assert_eq!(frame.display.highlighted, Some(0));
        assert_eq!(session.engine().sounding_notes(), vec![69, 73, 76, 83]);
    }

    #[test]
    fn root_override_ignored_in_diatonic_mode() {
        let mut session = session(PlayMode::Diatonic, OutputState::Ready);
        let mut state = input(UP.0, UP.1, false);
        state.root_override = Some(4);
        let frame = session.tick(&state, Instant::now());
        assert_eq!(frame.chord_label, "C Major");
    }

    #[test]
    fn changing_chord_size_restarts_voices() {
        let mut session = session(PlayMode::Diatonic, OutputState::Ready);
        let now = Instant::now();
        session.tick(&input(UP.0, UP.1, true), now);
        let mut state = input(UP.0, UP.1, true);
        state.seventh = true;
        session.tick(&state, now);
        assert_eq!(session.engine().voice_count(), 4);
        assert_eq!(session.last_played(), &[60, 64, 67, 71]);
    }

    #[test]
    fn select_preset_updates_synth() {
        let mut session = session(PlayMode::Diatonic, OutputState::Ready);
        assert!(session.select_preset("vintage"));
        assert_eq!(session.settings().preset, "vintage");
        assert_eq!(session.engine().params().attack, 0.001);
        assert!(!session.select_preset("nope"));
    }
}
