mod controller;

pub use controller::{Controller, ControllerSnapshot, MidiController, PortAction, PortTracker};

use crate::theory::PitchClass;

/// Controller button indices.
pub mod buttons {
    pub const OCTAVE_UP: usize = 0;
    pub const OCTAVE_DOWN: usize = 1;
    pub const SEVENTH: usize = 4;
    pub const NINTH: usize = 6;
    pub const HOLD: usize = 7;
    /// Buttons `0..ROOT_BUTTONS` double as root selectors in free mode.
    pub const ROOT_BUTTONS: usize = 12;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Controller,
    Pointer,
}

/// Everything the control loop needs from input for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlState {
    /// Device axes: x right, y down, each in [-1, 1].
    pub x: f64,
    pub y: f64,
    pub hold: bool,
    pub seventh: bool,
    pub ninth: bool,
    pub octave_up: bool,
    pub octave_down: bool,
    pub root_override: Option<PitchClass>,
    pub source: InputSource,
}

impl ControlState {
    pub fn neutral() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            hold: false,
            seventh: false,
            ninth: false,
            octave_up: false,
            octave_down: false,
            root_override: None,
            source: InputSource::Pointer,
        }
    }

    pub fn octave_shift(&self) -> i32 {
        self.octave_up as i32 - self.octave_down as i32
    }
}

/// Pointer position normalised to the wheel, plus whether a mouse button or
/// touch is down on it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerState {
    pub x: f64,
    pub y: f64,
    pub down: bool,
}

/// Space, Shift, Ctrl, X and Z.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyboardState {
    pub space: bool,
    pub shift: bool,
    pub ctrl: bool,
    pub x: bool,
    pub z: bool,
}

/// The on-screen hold / 7th / 9th / octave buttons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VirtualButtons {
    pub hold: bool,
    pub seventh: bool,
    pub ninth: bool,
    pub octave_up: bool,
    pub octave_down: bool,
}

/// Tracks which source was active last frame so switches get logged once.
#[derive(Debug, Default)]
pub struct InputSampler {
    last_source: Option<InputSource>,
}

impl InputSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(
        &mut self,
        controller: Option<&ControllerSnapshot>,
        pointer: &PointerState,
        keyboard: &KeyboardState,
        virtual_buttons: &VirtualButtons,
    ) -> ControlState {
        let state = merge(controller, pointer, keyboard, virtual_buttons);
        if self.last_source != Some(state.source) {
            match state.source {
                InputSource::Controller => tracing::info!("Controller active"),
                InputSource::Pointer => tracing::info!("Using pointer + keyboard"),
            }
            self.last_source = Some(state.source);
        }
        state
    }
}

/// Pure merge of one frame's raw input.
pub fn merge(
    controller: Option<&ControllerSnapshot>,
    pointer: &PointerState,
    keyboard: &KeyboardState,
    virtual_buttons: &VirtualButtons,
) -> ControlState {
    let pressed = |index: usize| controller.is_some_and(|c| c.pressed(index));

    let (x, y, source) = match controller {
        Some(c) => (c.axes[0] as f64, c.axes[1] as f64, InputSource::Controller),
        None => (pointer.x, pointer.y, InputSource::Pointer),
    };

    let root_override = controller.and_then(|c| {
        (0..buttons::ROOT_BUTTONS)
            .find(|&i| c.pressed(i))
            .map(|i| i as PitchClass)
    });

    ControlState {
        x: x.clamp(-1.0, 1.0),
        y: y.clamp(-1.0, 1.0),
        hold: pressed(buttons::HOLD) || pointer.down || keyboard.space || virtual_buttons.hold,
        seventh: pressed(buttons::SEVENTH) || keyboard.shift || virtual_buttons.seventh,
        ninth: pressed(buttons::NINTH) || keyboard.ctrl || virtual_buttons.ninth,
        octave_up: pressed(buttons::OCTAVE_UP) || keyboard.x || virtual_buttons.octave_up,
        octave_down: pressed(buttons::OCTAVE_DOWN) || keyboard.z || virtual_buttons.octave_down,
        root_override,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(axes: [f32; 2], pressed: &[usize]) -> ControllerSnapshot {
        let mut snap = ControllerSnapshot::default();
        snap.axes = axes;
        for &i in pressed {
            snap.buttons[i] = true;
        }
        snap
    }

    #[test]
    fn pointer_drives_when_no_controller() {
        let pointer = PointerState {
            x: 0.5,
            y: -0.25,
            down: true,
        };
        let state = merge(None, &pointer, &KeyboardState::default(), &VirtualButtons::default());
        assert_eq!(state.source, InputSource::Pointer);
        assert_eq!((state.x, state.y), (0.5, -0.25));
        assert!(state.hold);
        assert_eq!(state.root_override, None);
    }

    #[test]
    fn controller_axes_take_precedence() {
        let pointer = PointerState {
            x: 0.9,
            y: 0.9,
            down: false,
        };
        let snap = snapshot([0.0, -1.0], &[]);
        let state = merge(Some(&snap), &pointer, &KeyboardState::default(), &VirtualButtons::default());
        assert_eq!(state.source, InputSource::Controller);
        assert_eq!((state.x, state.y), (0.0, -1.0));
        assert!(!state.hold);
    }

    #[test]
    fn modifiers_are_ored_across_sources() {
        let snap = snapshot([0.0, 0.0], &[buttons::SEVENTH]);
        let keyboard = KeyboardState {
            ctrl: true,
            x: true,
            ..KeyboardState::default()
        };
        let virtual_buttons = VirtualButtons {
            hold: true,
            octave_down: true,
            ..VirtualButtons::default()
        };
        let state = merge(Some(&snap), &PointerState::default(), &keyboard, &virtual_buttons);
        assert!(state.hold && state.seventh && state.ninth);
        assert!(state.octave_up && state.octave_down);
        assert_eq!(state.octave_shift(), 0);
    }

    #[test]
    fn first_pressed_button_overrides_root() {
        let snap = snapshot([0.0, 0.0], &[9, 3]);
        let state = merge(
            Some(&snap),
            &PointerState::default(),
            &KeyboardState::default(),
            &VirtualButtons::default(),
        );
        assert_eq!(state.root_override, Some(3));

        let high_only = snapshot([0.0, 0.0], &[13]);
        let state = merge(
            Some(&high_only),
            &PointerState::default(),
            &KeyboardState::default(),
            &VirtualButtons::default(),
        );
        assert_eq!(state.root_override, None);
    }

    #[test]
    fn disconnect_falls_back_in_the_same_frame() {
        let mut sampler = InputSampler::new();
        let pointer = PointerState {
            x: -0.3,
            y: 0.4,
            down: false,
        };
        let snap = snapshot([1.0, 0.0], &[]);
        let keys = KeyboardState::default();
        let virt = VirtualButtons::default();
        let with = sampler.sample(Some(&snap), &pointer, &keys, &virt);
        assert_eq!(with.source, InputSource::Controller);
        let without = sampler.sample(None, &pointer, &keys, &virt);
        assert_eq!(without.source, InputSource::Pointer);
        assert_eq!((without.x, without.y), (-0.3, 0.4));
    }

    struct FakePad {
        tracker: PortTracker,
        ports: Vec<String>,
        snapshot: ControllerSnapshot,
    }

    impl Controller for FakePad {
        fn poll(&mut self) -> Option<ControllerSnapshot> {
            if let PortAction::Attach(name) = self.tracker.update(&self.ports) {
                self.tracker.mark_attached(&name);
            }
            self.tracker.attached().map(|_| self.snapshot)
        }
    }

    #[test]
    fn unplugged_controller_releases_hold_that_frame() {
        let mut pad = FakePad {
            tracker: PortTracker::new("Pad"),
            ports: vec!["USB Pad".to_string()],
            snapshot: snapshot([0.0, -1.0], &[buttons::HOLD]),
        };
        let mut sampler = InputSampler::new();
        let pointer = PointerState::default();
        let keys = KeyboardState::default();
        let virt = VirtualButtons::default();

        let held = sampler.sample(pad.poll().as_ref(), &pointer, &keys, &virt);
        assert_eq!(held.source, InputSource::Controller);
        assert!(held.hold);

        pad.ports.clear();
        let after = sampler.sample(pad.poll().as_ref(), &pointer, &keys, &virt);
        assert_eq!(after.source, InputSource::Pointer);
        assert!(!after.hold);
    }

    #[test]
    fn keyboard_octave_keys_shift() {
        let keyboard = KeyboardState {
            z: true,
            ..KeyboardState::default()
        };
        let state = merge(None, &PointerState::default(), &keyboard, &VirtualButtons::default());
        assert_eq!(state.octave_shift(), -1);
    }
}
