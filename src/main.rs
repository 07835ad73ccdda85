use std::path::PathBuf;

use chordstick::ChordstickApp;
use chordstick::config::{DEFAULT_SETTINGS_FILE, Settings};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let settings = match Settings::load_or_default(&settings_path) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(path = %settings_path.display(), "{e}, using defaults");
            Settings::default()
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1000.0, 720.0])
            .with_title("Chordstick"),
        ..Default::default()
    };

    if let Err(e) = eframe::run_native(
        "Chordstick",
        options,
        Box::new(|_cc| Ok(Box::new(ChordstickApp::new(settings, settings_path)))),
    ) {
        tracing::error!("{e}");
    }
}
