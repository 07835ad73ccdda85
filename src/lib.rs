pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod export;
pub mod input;
pub mod mapping;
pub mod midi_out;
pub mod recorder;
pub mod session;
pub mod theory;
pub mod ui;

pub use audio::{AudioOutput, CpalOutput, OutputState, SynthParams};
pub use config::{PlayMode, Settings};
pub use engine::{StartOutcome, VoiceEngine};
pub use error::{Error, Result};
pub use events::NoteEvent;
pub use export::{ExportOptions, to_smf_bytes, write_midi};
pub use input::ControlState;
pub use recorder::{RecordedEvent, RecordedKind, Recorder};
pub use session::{DisplayState, Frame, Session};
pub use ui::ChordstickApp;
