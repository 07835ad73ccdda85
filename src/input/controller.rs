use std::sync::Arc;

use arc_swap::ArcSwap;
use midir::{MidiInput, MidiInputConnection};

use crate::{Error, Result};

pub const BUTTON_COUNT: usize = 16;

/// Control change numbers carrying the stick axes.
pub const X_AXIS_CC: u8 = 16;
pub const Y_AXIS_CC: u8 = 17;

/// Frames between scans for a port while no controller is attached.
const RESCAN_INTERVAL_FRAMES: u32 = 30;

/// Latest state of an analog controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerSnapshot {
    /// x right, y down, each in [-1, 1].
    pub axes: [f32; 2],
    pub buttons: [bool; BUTTON_COUNT],
}

impl ControllerSnapshot {
    pub fn pressed(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }

    /// Folds one raw MIDI message into the snapshot. Returns whether
    /// anything changed.
    pub fn apply_midi(&mut self, message: &[u8]) -> bool {
        let [status, data1, data2] = match message {
            [status, data1, data2, ..] => [*status, *data1, *data2],
            _ => return false,
        };
        match status & 0xF0 {
            0x90 if data2 > 0 => self.set_button(data1, true),
            0x80 | 0x90 => self.set_button(data1, false),
            0xB0 if data1 == X_AXIS_CC => self.set_axis(0, data2),
            0xB0 if data1 == Y_AXIS_CC => self.set_axis(1, data2),
            _ => false,
        }
    }

    fn set_button(&mut self, note: u8, pressed: bool) -> bool {
        let slot = &mut self.buttons[note as usize % BUTTON_COUNT];
        let changed = *slot != pressed;
        *slot = pressed;
        changed
    }

    fn set_axis(&mut self, axis: usize, value: u8) -> bool {
        let position = ((value as f32 - 64.0) / 63.0).clamp(-1.0, 1.0);
        let changed = self.axes[axis] != position;
        self.axes[axis] = position;
        changed
    }
}

/// An analog controller polled once per frame. `None` means no controller
/// is connected and input should fall back to the pointer.
pub trait Controller {
    fn poll(&mut self) -> Option<ControllerSnapshot>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortAction {
    /// The attached port is still listed.
    Keep,
    /// The attached port vanished this frame.
    Lost,
    /// Nothing attached and a matching port was found.
    Attach(String),
    Idle,
}

/// Decides, from the current port list, whether the controller is still
/// there or which port to attach to.
#[derive(Debug)]
pub struct PortTracker {
    filter: String,
    attached: Option<String>,
    frames_since_scan: u32,
}

impl PortTracker {
    /// An empty filter matches any port.
    pub fn new(filter: &str) -> Self {
        Self {
            filter: filter.to_string(),
            attached: None,
            frames_since_scan: RESCAN_INTERVAL_FRAMES,
        }
    }

    pub fn attached(&self) -> Option<&str> {
        self.attached.as_deref()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn update(&mut self, ports: &[String]) -> PortAction {
        if let Some(name) = &self.attached {
            if ports.iter().any(|p| p == name) {
                return PortAction::Keep;
            }
            self.attached = None;
            self.frames_since_scan = 0;
            return PortAction::Lost;
        }

        self.frames_since_scan += 1;
        if self.frames_since_scan < RESCAN_INTERVAL_FRAMES {
            return PortAction::Idle;
        }
        self.frames_since_scan = 0;
        match ports.iter().find(|p| p.contains(&self.filter)) {
            Some(name) => PortAction::Attach(name.clone()),
            None => PortAction::Idle,
        }
    }

    pub fn mark_attached(&mut self, name: &str) {
        self.attached = Some(name.to_string());
    }
}

struct Link {
    snapshot: Arc<ArcSwap<ControllerSnapshot>>,
    _connection: MidiInputConnection<()>,
}

/// A MIDI device used as the analog controller: two CCs for the stick and
/// notes for buttons. The port list is checked every frame; a vanished
/// port falls back immediately and is re-attached when it reappears.
pub struct MidiController {
    scanner: MidiInput,
    tracker: PortTracker,
    link: Option<Link>,
}

impl MidiController {
    /// Watches for the first input port whose name contains `filter`.
    pub fn new(filter: &str) -> Result<Self> {
        Ok(Self {
            scanner: MidiInput::new("chordstick-scanner")?,
            tracker: PortTracker::new(filter),
            link: None,
        })
    }

    pub fn port_name(&self) -> Option<&str> {
        self.tracker.attached()
    }

    pub fn filter(&self) -> &str {
        self.tracker.filter()
    }

    fn port_names(&self) -> Vec<String> {
        self.scanner
            .ports()
            .iter()
            .filter_map(|p| self.scanner.port_name(p).ok())
            .collect()
    }

    fn attach(&mut self, name: &str) -> Result<()> {
        let midi_in = MidiInput::new("chordstick")?;
        let ports = midi_in.ports();
        let port = ports
            .iter()
            .find(|p| midi_in.port_name(p).is_ok_and(|n| n == name))
            .ok_or_else(|| Error::MidiPortNotFound(name.to_string()))?;

        let snapshot = Arc::new(ArcSwap::from_pointee(ControllerSnapshot::default()));
        let writer = snapshot.clone();
        let connection = midi_in.connect(
            port,
            "chordstick-controller",
            move |_, message, _| {
                let mut next = **writer.load();
                if next.apply_midi(message) {
                    writer.store(Arc::new(next));
                }
            },
            (),
        )?;
        tracing::info!(port = %name, "Controller connected");

        self.link = Some(Link {
            snapshot,
            _connection: connection,
        });
        self.tracker.mark_attached(name);
        Ok(())
    }
}

impl Controller for MidiController {
    fn poll(&mut self) -> Option<ControllerSnapshot> {
        let ports = self.port_names();
        match self.tracker.update(&ports) {
            PortAction::Keep => {}
            PortAction::Lost => {
                tracing::warn!("Controller disconnected");
                self.link = None;
            }
            PortAction::Attach(name) => {
                if let Err(e) = self.attach(&name) {
                    tracing::warn!(port = %name, "Controller attach failed: {e}");
                }
            }
            PortAction::Idle => {}
        }
        self.link.as_ref().map(|link| **link.snapshot.load())
    }
}
