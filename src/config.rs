use std::fs;
use std::path::{Path, PathBuf};

use crossbeam::channel::{Receiver, Sender};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::audio::SynthParams;
use crate::export::ExportOptions;
use crate::mapping::DEFAULT_DEADZONE;
use crate::theory::{PitchClass, ScaleMode};

pub const DEFAULT_SETTINGS_FILE: &str = "chordstick.ron";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayMode {
    /// Stick angle picks a degree of the selected scale.
    #[default]
    Diatonic,
    /// Stick angle picks a chord type on the selected root.
    Free,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: PlayMode,
    pub root: PitchClass,
    pub scale: ScaleMode,
    pub preset: String,
    pub synth: SynthParams,
    pub base_octave: i32,
    pub deadzone: f64,
    pub velocity: u8,
    pub export: ExportOptions,
    /// Also record off/on pairs when a held chord changes.
    pub record_morphs: bool,
    /// Substring of the MIDI input port used as the analog controller.
    pub controller_port: Option<String>,
    /// Substring of the MIDI output port to mirror notes to.
    pub midi_out_port: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: PlayMode::Diatonic,
            root: 0,
            scale: ScaleMode::Major,
            preset: "piano".to_string(),
            synth: SynthParams::default(),
            base_octave: 5,
            deadzone: DEFAULT_DEADZONE,
            velocity: 100,
            export: ExportOptions::default(),
            record_morphs: false,
            controller_port: None,
            midi_out_port: None,
        }
    }
}

impl Settings {
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, ron_string)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let ron_string = fs::read_to_string(path)?;
        Self::parse(&ron_string)
    }

    pub fn parse(ron_string: &str) -> Result<Self> {
        let mut settings: Settings = ron::from_str(ron_string)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Defaults when `path` does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn sanitize(&mut self) {
        self.root %= 12;
        self.velocity = self.velocity.min(127);
        self.deadzone = self.deadzone.clamp(0.0, 1.0);
        self.base_octave = self.base_octave.clamp(0, 9);
        let s = &mut self.synth;
        s.sustain = s.sustain.clamp(0.0, 1.0);
        s.mix = s.mix.clamp(0.0, 1.0);
        s.attack = s.attack.max(0.0);
        s.decay = s.decay.max(0.0);
        s.release = s.release.max(0.0);
        s.gain = s.gain.max(0.0);
        let e = &mut self.export;
        e.tempo = e.tempo.clamp(1, 0xFF_FFFF);
        e.ticks_per_quarter = e.ticks_per_quarter.clamp(1, 0x7FFF);
    }
}

/// Reloads the settings file whenever it is modified and sends the result
/// over a channel. Parse failures are logged and skipped.
pub struct SettingsWatcher {
    _watcher: RecommendedWatcher,
    updates: Receiver<Settings>,
}

impl SettingsWatcher {
    pub fn watch(path: &Path) -> Result<Self> {
        let (tx, updates) = crossbeam::channel::unbounded();
        let path_owned: PathBuf = path.to_path_buf();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| {
                handle_event(res, &path_owned, &tx)
            },
            Config::default(),
        )?;
        watcher.watch(path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %path.display(), "Watching settings");
        Ok(Self {
            _watcher: watcher,
            updates,
        })
    }

    /// Most recent reload since the last call, if any.
    pub fn latest(&self) -> Option<Settings> {
        self.updates.try_iter().last()
    }
}

fn handle_event(
    res: std::result::Result<notify::Event, notify::Error>,
    path: &Path,
    tx: &Sender<Settings>,
) {
    match res {
        Ok(event) if event.kind.is_modify() => match Settings::load(path) {
            Ok(settings) => {
                tracing::info!("Settings reloaded");
                let _ = tx.send(settings);
            }
            Err(e) => tracing::warn!(error = %e, "Ignoring invalid settings"),
        },
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Settings watch error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_ron() {
        let settings = Settings {
            mode: PlayMode::Free,
            root: 7,
            scale: ScaleMode::Minor,
            record_morphs: true,
            midi_out_port: Some("IAC".into()),
            ..Settings::default()
        };
        let text = ron::ser::to_string_pretty(&settings, ron::ser::PrettyConfig::default()).unwrap();
        assert_eq!(Settings::parse(&text).unwrap(), settings);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings = Settings::parse("(root: 14, mode: Free)").unwrap();
        assert_eq!(settings.root, 2);
        assert_eq!(settings.mode, PlayMode::Free);
        assert_eq!(settings.base_octave, 5);
        assert_eq!(settings.deadzone, DEFAULT_DEADZONE);
        assert_eq!(settings.export.ticks_per_quarter, 480);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        assert!(matches!(
            Settings::parse("(root: \"C\")"),
            Err(crate::Error::SettingsParse(_))
        ));
    }

    #[test]
    fn absent_file_means_defaults() {
        let path = std::env::temp_dir().join("chordstick-does-not-exist.ron");
        assert_eq!(Settings::load_or_default(&path).unwrap(), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("chordstick-test-{}.ron", std::process::id()));
        let settings = Settings {
            root: 5,
            ..Settings::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn zero_tempo_and_resolution_are_raised() {
        let settings =
            Settings::parse("(export: (ticks_per_quarter: 0, tempo: 0, program: 0))").unwrap();
        assert_eq!(settings.export.tempo, 1);
        assert_eq!(settings.export.ticks_per_quarter, 1);
        let tick = settings.export.tick_at(1000);
        assert_eq!(tick, 1_000_000);
    }
}
