use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use ringbuf::{
    HeapProd, HeapRb,
    traits::{Consumer, Producer, Split},
};

use super::{Renderer, VoiceCommand};
use crate::{Error, Result};

const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// Lifecycle of the platform audio output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Uninitialized,
    /// Stream created, first callback not seen yet.
    Pending,
    Ready,
    /// Sound is disabled for the rest of the session.
    Failed,
}

/// Where the voice engine sends its commands.
pub trait AudioOutput {
    /// Current state, advancing `Pending` to `Ready` or `Failed` when the
    /// platform has reported back.
    fn state(&mut self) -> OutputState;

    /// Starts acquiring the output. No-op unless `Uninitialized`.
    fn initialize(&mut self);

    /// Queues a command for the audio thread. Returns false if it was not
    /// accepted.
    fn send(&mut self, command: VoiceCommand) -> bool;
}

/// Default-device output through cpal.
pub struct CpalOutput {
    state: OutputState,
    stream: Option<cpal::Stream>,
    producer: Option<HeapProd<VoiceCommand>>,
    running: Arc<AtomicBool>,
    stream_error: Arc<Mutex<Option<String>>>,
}

impl CpalOutput {
    pub fn new() -> Self {
        Self {
            state: OutputState::Uninitialized,
            stream: None,
            producer: None,
            running: Arc::new(AtomicBool::new(false)),
            stream_error: Arc::new(Mutex::new(None)),
        }
    }

    fn open_stream(&mut self) -> Result<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioDevice("No output device".into()))?;
        let config = device.default_output_config()?;
        let stream_config: cpal::StreamConfig = config.into();

        let channels = stream_config.channels as usize;
        let sample_rate = stream_config.sample_rate as f32;
        tracing::info!(channels, sample_rate, "Opening audio output");

        let (producer, mut consumer) = HeapRb::<VoiceCommand>::new(COMMAND_QUEUE_CAPACITY).split();
        let mut renderer = Renderer::new(sample_rate);
        let running = self.running.clone();
        let error_slot = self.stream_error.clone();

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                running.store(true, Ordering::Release);
                while let Some(command) = consumer.try_pop() {
                    renderer.apply(command);
                }
                renderer.render(data, channels);
            },
            move |err| {
                *error_slot.lock() = Some(err.to_string());
            },
            None,
        )?;
        stream.play()?;

        self.stream = Some(stream);
        self.producer = Some(producer);
        Ok(())
    }

    fn fail(&mut self, reason: &str) {
        tracing::error!(reason, "Audio output disabled");
        self.state = OutputState::Failed;
        self.stream = None;
        self.producer = None;
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for CpalOutput {
    fn state(&mut self) -> OutputState {
        let reported = self.stream_error.lock().take();
        if let Some(err) = reported {
            self.fail(&err);
        }
        if self.state == OutputState::Pending && self.running.load(Ordering::Acquire) {
            tracing::info!("Audio output running");
            self.state = OutputState::Ready;
        }
        self.state
    }

    fn initialize(&mut self) {
        if self.state != OutputState::Uninitialized {
            return;
        }
        match self.open_stream() {
            Ok(()) => self.state = OutputState::Pending,
            Err(e) => self.fail(&e.to_string()),
        }
    }

    fn send(&mut self, command: VoiceCommand) -> bool {
        match self.producer.as_mut() {
            Some(producer) => producer.try_push(command).is_ok(),
            None => false,
        }
    }
}
