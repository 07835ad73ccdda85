use std::time::Instant;

use crate::events::NoteEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedKind {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedEvent {
    pub kind: RecordedKind,
    pub note: u8,
    /// Milliseconds since recording started.
    pub time_ms: u64,
    pub velocity: u8,
}

#[derive(Debug, Default)]
pub struct Recorder {
    started_at: Option<Instant>,
    events: Vec<RecordedEvent>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Clears the buffer and starts the clock. Ignored while recording.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.is_recording() {
            return false;
        }
        self.events.clear();
        self.started_at = Some(now);
        tracing::info!("Recording started");
        true
    }

    /// Freezes the buffer and hands it over, sorted by time. `None` if not
    /// recording.
    pub fn stop(&mut self) -> Option<Vec<RecordedEvent>> {
        self.started_at.take()?;
        let mut events = std::mem::take(&mut self.events);
        // stable: simultaneous events keep insertion order
        events.sort_by_key(|e| e.time_ms);
        tracing::info!(events = events.len(), "Recording stopped");
        Some(events)
    }

    pub fn record(&mut self, event: NoteEvent, now: Instant) {
        let Some(started_at) = self.started_at else {
            return;
        };
        let elapsed = now.saturating_duration_since(started_at);
        let time_ms = (elapsed.as_secs_f64() * 1000.0).round() as u64;
        let recorded = match event {
            NoteEvent::NoteOn { pitch, velocity } => RecordedEvent {
                kind: RecordedKind::On,
                note: pitch,
                time_ms,
                velocity,
            },
            NoteEvent::NoteOff { pitch } => RecordedEvent {
                kind: RecordedKind::Off,
                note: pitch,
                time_ms,
                velocity: 0,
            },
        };
        self.events.push(recorded);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn events_outside_recording_are_ignored() {
        let mut recorder = Recorder::new();
        recorder.record(NoteEvent::NoteOn { pitch: 60, velocity: 100 }, Instant::now());
        assert_eq!(recorder.event_count(), 0);
        assert!(recorder.stop().is_none());
    }

    #[test]
    fn timestamps_are_relative_milliseconds() {
        let t0 = Instant::now();
        let mut recorder = Recorder::new();
        assert!(recorder.start(t0));
        recorder.record(NoteEvent::NoteOn { pitch: 60, velocity: 100 }, t0);
        recorder.record(NoteEvent::NoteOff { pitch: 60 }, t0 + Duration::from_micros(500_400));
        let events = recorder.stop().unwrap();
        assert_eq!(events[0].time_ms, 0);
        assert_eq!(events[0].velocity, 100);
        assert_eq!(events[1].time_ms, 500);
        assert_eq!(events[1].kind, RecordedKind::Off);
        assert_eq!(events[1].velocity, 0);
        assert!(!recorder.is_recording());
    }

    #[test]
    fn start_is_idempotent_and_resets() {
        let t0 = Instant::now();
        let mut recorder = Recorder::new();
        recorder.start(t0);
        recorder.record(NoteEvent::NoteOn { pitch: 60, velocity: 90 }, t0);
        assert!(!recorder.start(t0 + Duration::from_secs(1)));
        assert_eq!(recorder.event_count(), 1);
        recorder.stop();
        recorder.start(t0 + Duration::from_secs(2));
        assert_eq!(recorder.event_count(), 0);
    }

    #[test]
    fn simultaneous_events_keep_insertion_order() {
        let t0 = Instant::now();
        let mut recorder = Recorder::new();
        recorder.start(t0);
        let later = t0 + Duration::from_millis(20);
        recorder.record(NoteEvent::NoteOff { pitch: 64 }, later);
        for pitch in [60, 64, 67] {
            recorder.record(NoteEvent::NoteOn { pitch, velocity: 100 }, t0);
        }
        let events = recorder.stop().unwrap();
        let notes: Vec<_> = events.iter().map(|e| e.note).collect();
        assert_eq!(notes, vec![60, 64, 67, 64]);
    }
}
