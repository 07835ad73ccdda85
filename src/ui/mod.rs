mod wheel;

use std::path::PathBuf;
use std::time::Instant;

use eframe::egui;
use wheel::WheelGeometry;

use crate::audio::{CpalOutput, PRESETS, Wave};
use crate::config::{PlayMode, Settings, SettingsWatcher};
use crate::export::write_midi;
use crate::input::{
    Controller, InputSampler, InputSource, KeyboardState, MidiController, PointerState,
    VirtualButtons,
};
use crate::midi_out::MidiMirror;
use crate::recorder::RecordedEvent;
use crate::session::{Frame, Session};
use crate::theory::{ScaleMode, note_name};
use crate::Error;

const EXPORT_FILE_NAME: &str = "chordstick_session.mid";

pub struct ChordstickApp {
    session: Session<CpalOutput>,
    sampler: InputSampler,
    controller: Option<MidiController>,
    mirror: Option<MidiMirror>,
    watcher: Option<SettingsWatcher>,
    settings_path: PathBuf,
    virtual_buttons: VirtualButtons,
    last_frame: Option<Frame>,
    last_source: InputSource,
    notice: Option<String>,
    error_message: Option<String>,
}

impl ChordstickApp {
    pub fn new(settings: Settings, settings_path: PathBuf) -> Self {
        let controller = settings.controller_port.as_deref().and_then(|filter| {
            MidiController::new(filter)
                .inspect_err(|e| tracing::warn!("Controller unavailable: {e}"))
                .ok()
        });
        let mirror = settings.midi_out_port.as_deref().and_then(|filter| {
            MidiMirror::connect(filter)
                .inspect_err(|e| tracing::warn!("MIDI output unavailable: {e}"))
                .ok()
        });
        let watcher = if settings_path.exists() {
            SettingsWatcher::watch(&settings_path)
                .inspect_err(|e| tracing::warn!("Settings will not hot-reload: {e}"))
                .ok()
        } else {
            None
        };

        Self {
            session: Session::new(settings, CpalOutput::new()),
            sampler: InputSampler::new(),
            controller,
            mirror,
            watcher,
            settings_path,
            virtual_buttons: VirtualButtons::default(),
            last_frame: None,
            last_source: InputSource::Pointer,
            notice: None,
            error_message: None,
        }
    }

    fn poll_settings(&mut self) {
        if let Some(settings) = self.watcher.as_ref().and_then(|w| w.latest()) {
            tracing::info!("Settings reloaded");
            self.session.apply_settings(settings);
        }
    }

    fn menu_bar(&mut self, ui: &mut egui::Ui) {
        egui::MenuBar::new().ui(ui, |ui| {
            ui.menu_button("File", |ui| {
                if ui.button("💾 Save Settings").clicked() {
                    match self.session.settings().save(&self.settings_path) {
                        Ok(()) => {
                            tracing::info!(path = %self.settings_path.display(), "Settings saved");
                            self.notice = Some("Settings saved".to_string());
                        }
                        Err(e) => {
                            self.error_message = Some(format!("Failed to save settings: {}", e));
                        }
                    }
                    ui.close();
                }

                ui.separator();

                if ui.button("Quit").clicked() {
                    ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });
        });
    }

    fn settings_panel(&mut self, ui: &mut egui::Ui) {
        let mut settings = self.session.settings().clone();

        ui.heading("Chord");
        egui::ComboBox::from_label("Mode")
            .selected_text(match settings.mode {
                PlayMode::Diatonic => "Diatonic",
                PlayMode::Free => "Free",
            })
            .show_ui(ui, |ui| {
                ui.selectable_value(&mut settings.mode, PlayMode::Diatonic, "Diatonic");
                ui.selectable_value(&mut settings.mode, PlayMode::Free, "Free");
            });
        egui::ComboBox::from_label("Root")
            .selected_text(note_name(settings.root))
            .show_ui(ui, |ui| {
                for pc in 0..12 {
                    ui.selectable_value(&mut settings.root, pc, note_name(pc));
                }
            });
        egui::ComboBox::from_label("Scale")
            .selected_text(settings.scale.name())
            .show_ui(ui, |ui| {
                for mode in ScaleMode::ALL {
                    ui.selectable_value(&mut settings.scale, mode, mode.name());
                }
            });

        ui.separator();
        ui.heading("Sound");

        let mut preset_choice = None;
        egui::ComboBox::from_label("Preset")
            .selected_text(
                PRESETS
                    .iter()
                    .find(|p| p.key == settings.preset)
                    .map_or(settings.preset.as_str(), |p| p.name),
            )
            .show_ui(ui, |ui| {
                for preset in PRESETS {
                    if ui.selectable_label(settings.preset == preset.key, preset.name).clicked() {
                        preset_choice = Some(preset.key);
                    }
                }
            });

        let synth = &mut settings.synth;
        egui::ComboBox::from_label("Wave")
            .selected_text(synth.wave.name())
            .show_ui(ui, |ui| {
                for wave in Wave::ALL {
                    ui.selectable_value(&mut synth.wave, wave, wave.name());
                }
            });
        ui.add(egui::Slider::new(&mut synth.attack, 0.0..=2.0).text("Attack"));
        ui.add(egui::Slider::new(&mut synth.decay, 0.0..=2.0).text("Decay"));
        ui.add(egui::Slider::new(&mut synth.sustain, 0.0..=1.0).text("Sustain"));
        ui.add(egui::Slider::new(&mut synth.release, 0.0..=3.0).text("Release"));
        ui.add(egui::Slider::new(&mut synth.detune, -50.0..=50.0).text("Detune"));
        ui.add(egui::Slider::new(&mut synth.gain, 0.0..=1.0).text("Gain"));
        ui.add(egui::Slider::new(&mut synth.mix, 0.0..=1.0).text("Layer mix"));
        if ui.button("Reset to preset").clicked() {
            preset_choice = Some(PRESETS
                .iter()
                .find(|p| p.key == settings.preset)
                .map_or("piano", |p| p.key));
        }

        if &settings != self.session.settings() {
            self.session.apply_settings(settings);
        }
        if let Some(key) = preset_choice {
            self.session.select_preset(key);
        }
    }

    fn recording_controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Record");
        ui.horizontal(|ui| {
            if self.session.is_recording() {
                if ui.button("⏹ Stop").clicked() {
                    if let Some(events) = self.session.stop_recording() {
                        self.export(events);
                    }
                }
                ui.label(format!("{} events", self.session.recorded_count()));
            } else if ui.button("⏺ Record").clicked() {
                self.session.start_recording(Instant::now());
                self.notice = None;
            }
        });

        ui.horizontal(|ui| {
            match &self.controller {
                Some(controller) => {
                    ui.label(match controller.port_name() {
                        Some(port) => format!("Controller: {port}"),
                        None => format!("Controller: waiting for {:?}", controller.filter()),
                    });
                }
                None => {
                    if ui.button("Connect controller").clicked() {
                        let filter = self.session.settings().controller_port.clone().unwrap_or_default();
                        match MidiController::new(&filter) {
                            Ok(controller) => self.controller = Some(controller),
                            Err(e) => self.error_message = Some(e.to_string()),
                        }
                    }
                }
            }
        });

        ui.horizontal(|ui| {
            match &self.mirror {
                Some(mirror) => {
                    ui.label(format!("MIDI out: {}", mirror.port_name()));
                }
                None => {
                    if ui.button("Connect MIDI output").clicked() {
                        let filter = self.session.settings().midi_out_port.clone().unwrap_or_default();
                        match MidiMirror::connect(&filter) {
                            Ok(mirror) => self.mirror = Some(mirror),
                            Err(e) => self.error_message = Some(e.to_string()),
                        }
                    }
                }
            }
        });
    }

    fn export(&mut self, events: Vec<RecordedEvent>) {
        if events.is_empty() {
            self.notice = Some(Error::EmptyRecording.to_string());
            return;
        }
        let Some(path) = rfd::FileDialog::new()
            .set_title("Export Recording")
            .set_file_name(EXPORT_FILE_NAME)
            .add_filter("MIDI", &["mid"])
            .save_file()
        else {
            return;
        };
        match write_midi(&events, &self.session.settings().export, &path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), events = events.len(), "Recording exported");
                self.notice = Some(format!("Saved {}", path.display()));
            }
            Err(e) => self.error_message = Some(format!("Export failed: {}", e)),
        }
    }

    fn virtual_buttons(&mut self, ui: &mut egui::Ui) {
        ui.heading("Buttons");
        ui.horizontal(|ui| {
            self.virtual_buttons.hold = ui.button("Hold").is_pointer_button_down_on();
            self.virtual_buttons.seventh = ui.button("7th").is_pointer_button_down_on();
            self.virtual_buttons.ninth = ui.button("9th").is_pointer_button_down_on();
        });
        ui.horizontal(|ui| {
            self.virtual_buttons.octave_down = ui.button("Oct −").is_pointer_button_down_on();
            self.virtual_buttons.octave_up = ui.button("Oct +").is_pointer_button_down_on();
        });
    }

    fn status_lines(&mut self, ui: &mut egui::Ui) {
        if let Some(frame) = &self.last_frame {
            ui.heading(&frame.chord_label);
            ui.label(&frame.status);
            ui.label(format!("Magnitude: {:.2}", frame.magnitude));
        }
        ui.label(format!("Audio: {:?}", self.session.audio_state()));
        ui.label(match (self.last_source, &self.controller) {
            (InputSource::Controller, Some(c)) => {
                format!("Input: {}", c.port_name().unwrap_or("controller"))
            }
            _ => "Input: pointer + keyboard".to_string(),
        });
        if let Some(notice) = &self.notice {
            ui.label(notice);
        }
    }
}

fn keyboard_state(ctx: &egui::Context) -> KeyboardState {
    ctx.input(|i| KeyboardState {
        space: i.key_down(egui::Key::Space),
        shift: i.modifiers.shift,
        ctrl: i.modifiers.ctrl,
        x: i.key_down(egui::Key::X),
        z: i.key_down(egui::Key::Z),
    })
}

impl eframe::App for ChordstickApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_settings();

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ui);
        });

        if let Some(ref error) = self.error_message {
            egui::TopBottomPanel::top("error").show(ctx, |ui| {
                ui.colored_label(egui::Color32::RED, error);
            });
        }

        egui::SidePanel::left("controls")
            .min_width(240.0)
            .show(ctx, |ui| {
                self.status_lines(ui);
                ui.separator();
                self.virtual_buttons(ui);
                ui.separator();
                self.recording_controls(ui);
                ui.separator();
                self.settings_panel(ui);
            });

        let keyboard = keyboard_state(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            let (response, painter) =
                ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
            let geometry = WheelGeometry::from_rect(response.rect);
            let pointer: PointerState = wheel::pointer_state(&response, &geometry);

            let snapshot = self.controller.as_mut().and_then(|c| c.poll());
            let control =
                self.sampler
                    .sample(snapshot.as_ref(), &pointer, &keyboard, &self.virtual_buttons);
            self.last_source = control.source;

            let frame = self.session.tick(&control, Instant::now());
            if let Some(mirror) = self.mirror.as_mut() {
                mirror.send_all(&frame.events);
            }

            wheel::paint(
                &painter,
                &geometry,
                &frame.display,
                (control.x, control.y),
                self.session.settings().deadzone,
            );
            self.last_frame = Some(frame);
        });

        ctx.request_repaint();
    }
}
