use super::voice::{Layer, LayerSpec};

pub type VoiceId = u64;

/// Voices the mixer holds before it starts stealing fading ones.
pub const MAX_VOICES: usize = 256;

/// Control-thread to audio-thread messages. `Copy` so they can travel
/// through the lock-free queue without allocating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceCommand {
    Start {
        id: VoiceId,
        generation: u64,
        layers: [Option<LayerSpec>; 2],
    },
    Retarget {
        id: VoiceId,
        freqs: [f32; 2],
        /// Seconds
        ramp: f32,
    },
    Release {
        id: VoiceId,
        generation: u64,
        /// Seconds
        fade: f32,
    },
}

struct RenderVoice {
    id: VoiceId,
    layers: [Option<Layer>; 2],
}

impl RenderVoice {
    fn is_finished(&self) -> bool {
        self.layers.iter().flatten().all(Layer::is_stopped)
    }

    fn is_fading(&self) -> bool {
        self.layers
            .iter()
            .flatten()
            .all(|layer| layer.is_releasing() || layer.is_stopped())
    }
}

/// Audio-thread side of the voice engine: applies queued commands and mixes
/// every sounding layer.
pub struct Renderer {
    voices: Vec<RenderVoice>,
    sample_rate: f32,
    retired_generation: u64,
}

impl Renderer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            voices: Vec::with_capacity(MAX_VOICES),
            sample_rate,
            retired_generation: 0,
        }
    }

    pub fn apply(&mut self, command: VoiceCommand) {
        match command {
            VoiceCommand::Start {
                id,
                generation,
                layers,
            } => {
                // a release for this generation already went through
                if generation <= self.retired_generation {
                    return;
                }
                if self.voices.len() >= MAX_VOICES {
                    // stay within the preallocated pool
                    let Some(oldest) = self.voices.iter().position(RenderVoice::is_fading) else {
                        return;
                    };
                    self.voices.remove(oldest);
                }
                self.voices.push(RenderVoice {
                    id,
                    layers: layers.map(|slot| slot.map(Layer::new)),
                });
            }
            VoiceCommand::Retarget { id, freqs, ramp } => {
                if let Some(voice) = self.voices.iter_mut().find(|v| v.id == id) {
                    for (layer, freq) in voice.layers.iter_mut().zip(freqs) {
                        if let Some(layer) = layer {
                            layer.retarget(freq, ramp);
                        }
                    }
                }
            }
            VoiceCommand::Release {
                id,
                generation,
                fade,
            } => {
                self.retired_generation = self.retired_generation.max(generation);
                if let Some(voice) = self.voices.iter_mut().find(|v| v.id == id) {
                    for layer in voice.layers.iter_mut().flatten() {
                        layer.release(fade);
                    }
                }
            }
        }
    }

    /// Fills an interleaved buffer of `channels` channels.
    pub fn render(&mut self, data: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in data.chunks_mut(channels) {
            let mut sample = 0.0;
            for voice in &mut self.voices {
                for layer in voice.layers.iter_mut().flatten() {
                    sample += layer.next_sample(self.sample_rate);
                }
            }
            frame.fill(sample);
        }
        self.voices.retain(|voice| !voice.is_finished());
    }

    /// Voices still producing sound, including those fading out.
    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Wave;

    fn shape(freq: f32) -> LayerSpec {
        LayerSpec {
            wave: Wave::Sine,
            freq,
            peak: 0.2,
            sustain_level: 0.1,
            attack: 0.001,
            decay: 0.001,
        }
    }

    fn start(id: VoiceId, generation: u64) -> VoiceCommand {
        VoiceCommand::Start {
            id,
            generation,
            layers: [Some(shape(220.0)), None],
        }
    }

    #[test]
    fn renders_started_voices_into_every_channel() {
        let mut renderer = Renderer::new(8000.0);
        renderer.apply(start(1, 1));
        let mut buffer = vec![0.0; 256];
        renderer.render(&mut buffer, 2);
        assert_eq!(renderer.voice_count(), 1);
        assert!(buffer.iter().any(|s| s.abs() > 0.0));
        for frame in buffer.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
    }

    #[test]
    fn released_voices_are_dropped_after_the_fade() {
        let mut renderer = Renderer::new(8000.0);
        renderer.apply(start(1, 1));
        renderer.apply(start(2, 1));
        let mut buffer = vec![0.0; 64];
        renderer.render(&mut buffer, 1);
        for id in [1, 2] {
            renderer.apply(VoiceCommand::Release {
                id,
                generation: 1,
                fade: 0.01,
            });
        }
        let mut tail = vec![0.0; 400];
        renderer.render(&mut tail, 1);
        assert_eq!(renderer.voice_count(), 0);
        assert!(tail[..10].iter().any(|s| s.abs() > 0.0));
    }

    #[test]
    fn stale_generation_start_is_ignored() {
        let mut renderer = Renderer::new(8000.0);
        renderer.apply(VoiceCommand::Release {
            id: 7,
            generation: 3,
            fade: 0.01,
        });
        renderer.apply(start(8, 3));
        renderer.apply(start(9, 2));
        assert_eq!(renderer.voice_count(), 0);
        renderer.apply(start(10, 4));
        assert_eq!(renderer.voice_count(), 1);
    }

    #[test]
    fn full_pool_steals_the_oldest_fading_voice() {
        let mut renderer = Renderer::new(8000.0);
        for id in 0..MAX_VOICES as VoiceId {
            renderer.apply(start(id, 1));
        }
        assert_eq!(renderer.voice_count(), MAX_VOICES);

        // nothing is fading yet, so the start is dropped
        renderer.apply(start(1000, 1));
        assert_eq!(renderer.voice_count(), MAX_VOICES);
        assert!(renderer.voices.iter().all(|v| v.id != 1000));

        renderer.apply(VoiceCommand::Release {
            id: 5,
            generation: 0,
            fade: 1.0,
        });
        renderer.apply(start(1001, 1));
        assert_eq!(renderer.voice_count(), MAX_VOICES);
        assert!(renderer.voices.iter().all(|v| v.id != 5));
        assert!(renderer.voices.iter().any(|v| v.id == 1001));
        assert!(renderer.voices.capacity() >= MAX_VOICES);
    }
}
