use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    SettingsParse(#[from] ron::error::SpannedError),

    #[error("Failed to write settings: {0}")]
    SettingsWrite(#[from] ron::Error),

    #[error("No events recorded")]
    EmptyRecording,

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("MIDI init error: {0}")]
    MidiInit(#[from] midir::InitError),

    #[error("MIDI connect error: {0}")]
    MidiConnect(String),

    #[error("No MIDI port matching {0:?}")]
    MidiPortNotFound(String),

    #[error("MIDI write error: {0}")]
    MidiWrite(String),

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::MidiConnect(e.to_string())
    }
}

impl From<midir::ConnectError<midir::MidiOutput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiOutput>) -> Self {
        Error::MidiConnect(e.to_string())
    }
}

impl From<cpal::BuildStreamError> for Error {
    fn from(e: cpal::BuildStreamError) -> Self {
        Error::AudioDevice(e.to_string())
    }
}

impl From<cpal::PlayStreamError> for Error {
    fn from(e: cpal::PlayStreamError) -> Self {
        Error::AudioDevice(e.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for Error {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        Error::AudioDevice(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
