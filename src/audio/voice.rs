use super::Wave;

/// Near-silent gain ramps start from and fade towards. Exponential ramps
/// cannot reach zero.
pub const GAIN_FLOOR: f32 = 0.0001;

/// Everything the audio thread needs to start one oscillator layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSpec {
    pub wave: Wave,
    pub freq: f32,
    pub peak: f32,
    pub sustain_level: f32,
    /// Seconds
    pub attack: f32,
    /// Seconds
    pub decay: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnvelopeState {
    Attack { time: f32 },
    Decay { time: f32 },
    Sustain,
    Release { time: f32, duration: f32, from: f32 },
    Stopped,
}

/// Exponential frequency glide.
#[derive(Debug, Clone, Copy)]
struct Glide {
    from: f32,
    to: f32,
    time: f32,
    duration: f32,
}

impl Glide {
    fn settled(freq: f32) -> Self {
        Self {
            from: freq,
            to: freq,
            time: 0.0,
            duration: 0.0,
        }
    }

    fn value(&self) -> f32 {
        if self.duration <= 0.0 || self.time >= self.duration {
            return self.to;
        }
        let progress = self.time / self.duration;
        self.from * (self.to / self.from).powf(progress)
    }
}

/// One oscillator and its gain envelope.
#[derive(Debug, Clone)]
pub struct Layer {
    shape: LayerSpec,
    phase: f32,
    glide: Glide,
    pub envelope_state: EnvelopeState,
    pub envelope_level: f32,
}

impl Layer {
    pub fn new(shape: LayerSpec) -> Self {
        Self {
            shape,
            phase: 0.0,
            glide: Glide::settled(shape.freq),
            envelope_state: EnvelopeState::Attack { time: 0.0 },
            envelope_level: GAIN_FLOOR,
        }
    }

    pub fn freq(&self) -> f32 {
        self.glide.value()
    }

    pub fn retarget(&mut self, freq: f32, ramp: f32) {
        let current = self.glide.value();
        self.glide = Glide {
            from: current,
            to: freq,
            time: 0.0,
            duration: ramp,
        };
    }

    /// Fades from the current level to the floor over `fade` seconds, then stops.
    pub fn release(&mut self, fade: f32) {
        if matches!(self.envelope_state, EnvelopeState::Stopped) {
            return;
        }
        self.envelope_state = EnvelopeState::Release {
            time: 0.0,
            duration: fade,
            from: self.envelope_level.max(GAIN_FLOOR),
        };
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.envelope_state, EnvelopeState::Stopped)
    }

    pub fn is_releasing(&self) -> bool {
        matches!(self.envelope_state, EnvelopeState::Release { .. })
    }

    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        if self.is_stopped() {
            return 0.0;
        }
        let dt = 1.0 / sample_rate;
        let freq = self.glide.value();
        let sample = self.shape.wave.sample(self.phase) * self.envelope_level;

        self.phase += freq / sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        self.glide.time += dt;
        advance_envelope(self, dt);
        sample
    }
}

pub fn calculate_envelope(state: &EnvelopeState, shape: &LayerSpec) -> f32 {
    match *state {
        EnvelopeState::Attack { time } => {
            if shape.attack <= 0.0 {
                shape.peak
            } else {
                let progress = (time / shape.attack).min(1.0);
                GAIN_FLOOR + (shape.peak - GAIN_FLOOR) * progress
            }
        }
        EnvelopeState::Decay { time } => {
            let progress = if shape.decay <= 0.0 {
                1.0
            } else {
                (time / shape.decay).min(1.0)
            };
            shape.peak + (shape.sustain_level - shape.peak) * progress
        }
        EnvelopeState::Sustain => shape.sustain_level,
        EnvelopeState::Release {
            time,
            duration,
            from,
        } => {
            if duration <= 0.0 || time >= duration {
                GAIN_FLOOR
            } else {
                from * (GAIN_FLOOR / from).powf(time / duration)
            }
        }
        EnvelopeState::Stopped => 0.0,
    }
}

fn advance_envelope(layer: &mut Layer, dt: f32) {
    let shape = layer.shape;
    match &mut layer.envelope_state {
        EnvelopeState::Attack { time } => {
            *time += dt;
            if *time >= shape.attack {
                layer.envelope_state = EnvelopeState::Decay { time: 0.0 };
                layer.envelope_level = shape.peak;
                return;
            }
        }
        EnvelopeState::Decay { time } => {
            *time += dt;
            if *time >= shape.decay {
                layer.envelope_state = EnvelopeState::Sustain;
                layer.envelope_level = shape.sustain_level;
                return;
            }
        }
        EnvelopeState::Sustain => {}
        EnvelopeState::Release { time, duration, .. } => {
            *time += dt;
            if *time >= *duration {
                layer.envelope_state = EnvelopeState::Stopped;
                layer.envelope_level = 0.0;
                return;
            }
        }
        EnvelopeState::Stopped => return,
    }
    layer.envelope_level = calculate_envelope(&layer.envelope_state, &shape);
}
