mod output;
mod preset;
mod renderer;
mod voice;

pub use output::{AudioOutput, CpalOutput, OutputState};
pub use preset::{LayerConfig, PRESETS, SoundPreset, SynthParams, Wave, preset};
pub use renderer::{Renderer, VoiceCommand, VoiceId};
pub use voice::{GAIN_FLOOR, LayerSpec};

pub fn midi_to_freq(note: u8) -> f32 {
    440.0 * 2.0_f32.powf((note as f32 - 69.0) / 12.0)
}

/// Frequency of `note` shifted by `cents`.
pub fn detuned_freq(note: u8, cents: f32) -> f32 {
    midi_to_freq(note) * 2.0_f32.powf(cents / 1200.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concert_pitch() {
        assert!((midi_to_freq(69) - 440.0).abs() < 1e-3);
        assert!((midi_to_freq(81) - 880.0).abs() < 1e-2);
        assert!((detuned_freq(69, 1200.0) - 880.0).abs() < 1e-2);
    }
}
