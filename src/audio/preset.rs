use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Wave {
    Sine,
    Square,
    Saw,
    #[default]
    Triangle,
}

impl Wave {
    pub const ALL: [Wave; 4] = [Wave::Sine, Wave::Square, Wave::Saw, Wave::Triangle];

    /// One sample at `phase` in `[0, 1)`.
    pub fn sample(self, phase: f32) -> f32 {
        match self {
            Wave::Sine => (phase * 2.0 * std::f32::consts::PI).sin(),
            Wave::Square => {
                if phase < 0.5 {
                    -1.0
                } else {
                    1.0
                }
            }
            Wave::Saw => phase * 2.0 - 1.0,
            Wave::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }

    /// Waveform of the second layer when layering is enabled.
    pub fn companion(self) -> Wave {
        match self {
            Wave::Sine => Wave::Triangle,
            _ => Wave::Sine,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Wave::Sine => "sine",
            Wave::Square => "square",
            Wave::Saw => "sawtooth",
            Wave::Triangle => "triangle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerConfig {
    pub wave: Wave,
    /// Cents
    pub detune: f32,
    pub gain: f32,
    /// Seconds
    pub attack: f32,
    /// Seconds
    pub release: f32,
}

#[derive(Debug)]
pub struct SoundPreset {
    pub key: &'static str,
    pub name: &'static str,
    pub layers: &'static [LayerConfig],
}

const fn layer(wave: Wave, detune: f32, gain: f32, attack: f32, release: f32) -> LayerConfig {
    LayerConfig {
        wave,
        detune,
        gain,
        attack,
        release,
    }
}

pub const PRESETS: [SoundPreset; 5] = [
    SoundPreset {
        key: "piano",
        name: "Soft Synth",
        layers: &[
            layer(Wave::Triangle, 0.0, 0.15, 0.02, 0.4),
            layer(Wave::Sine, 3.0, 0.08, 0.05, 0.6),
        ],
    },
    SoundPreset {
        key: "warm",
        name: "Warm Pads",
        layers: &[
            layer(Wave::Saw, 0.0, 0.05, 1.2, 2.0),
            layer(Wave::Saw, -7.0, 0.04, 1.5, 2.2),
            layer(Wave::Triangle, 12.0, 0.03, 1.8, 2.5),
            layer(Wave::Sine, 5.0, 0.025, 2.0, 3.0),
        ],
    },
    SoundPreset {
        key: "bright",
        name: "Bright Synth",
        layers: &[
            layer(Wave::Saw, 0.0, 0.08, 0.005, 0.12),
            layer(Wave::Square, 12.0, 0.04, 0.01, 0.08),
            layer(Wave::Saw, 7.0, 0.03, 0.008, 0.10),
        ],
    },
    SoundPreset {
        key: "mellow",
        name: "Mellow Bells",
        layers: &[
            layer(Wave::Sine, 0.0, 0.12, 0.08, 3.5),
            layer(Wave::Sine, 12.0, 0.06, 0.12, 2.8),
            layer(Wave::Sine, 19.0, 0.04, 0.15, 4.0),
            layer(Wave::Triangle, 24.0, 0.02, 0.20, 5.0),
        ],
    },
    SoundPreset {
        key: "vintage",
        name: "Vintage Organ",
        layers: &[
            layer(Wave::Square, 0.0, 0.10, 0.001, 0.05),
            layer(Wave::Square, 12.0, 0.06, 0.001, 0.05),
            layer(Wave::Saw, 7.0, 0.04, 0.002, 0.08),
            layer(Wave::Square, 19.0, 0.03, 0.001, 0.06),
            layer(Wave::Sine, 0.0, 0.02, 0.001, 0.10),
        ],
    },
];

pub fn preset(key: &str) -> Option<&'static SoundPreset> {
    PRESETS.iter().find(|p| p.key == key)
}

/// Live synthesis parameters every new voice is built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynthParams {
    pub wave: Wave,
    /// Seconds
    pub attack: f32,
    /// Seconds
    pub decay: f32,
    /// 0.0 -> 1.0, fraction of peak
    pub sustain: f32,
    /// Seconds
    pub release: f32,
    /// Cents
    pub detune: f32,
    pub gain: f32,
    /// 0.0 -> 1.0, second layer level. Zero disables the layer.
    pub mix: f32,
}

impl SynthParams {
    /// Loads the first layer of `preset`; decay, sustain and mix take the
    /// control defaults.
    pub fn from_preset(preset: &SoundPreset) -> Self {
        let first = preset.layers.first().copied().unwrap_or(PRESETS[0].layers[0]);
        Self {
            wave: first.wave,
            attack: first.attack,
            decay: 0.1,
            sustain: 0.7,
            release: first.release,
            detune: first.detune,
            gain: first.gain,
            mix: if preset.layers.len() > 1 { 0.5 } else { 0.0 },
        }
    }
}

impl Default for SynthParams {
    fn default() -> Self {
        Self::from_preset(&PRESETS[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn piano_is_the_default() {
        let params = SynthParams::default();
        assert_eq!(params.wave, Wave::Triangle);
        assert_eq!(params.attack, 0.02);
        assert_eq!(params.release, 0.4);
        assert_eq!(params.gain, 0.15);
        assert_eq!(params.mix, 0.5);
        assert_eq!(params.sustain, 0.7);
    }

    #[test]
    fn lookup_by_key() {
        assert_eq!(preset("vintage").map(|p| p.name), Some("Vintage Organ"));
        assert!(preset("kazoo").is_none());
    }

    #[test]
    fn companion_wave_differs_from_main() {
        for wave in Wave::ALL {
            assert_ne!(wave.companion(), wave);
        }
    }

    #[test]
    fn waves_stay_in_unit_range() {
        for wave in Wave::ALL {
            for i in 0..100 {
                let s = wave.sample(i as f32 / 100.0);
                assert!((-1.0..=1.0).contains(&s), "{wave:?} {s}");
            }
        }
    }
}
