//! Virtual Table Viewer GUI Application
//!
//! Interactive viewer for table datasets built on egui. The viewer features:
//! - Virtually scrolled rows with variable heights and tree expansion
//! - Multi-level, resizable, reorderable column headers with sorting
//! - Local or simulated remote data with lazy child loading
//! - Saved view templates and XLSX export

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
//!
//! The application is built with a modular architecture:
//! - `app/` - Application state, settings and coordination
//! - `io/` - Background dataset loading and demo generation
//! - `ui/` - UI panel rendering and interaction
//! - `rendering/` - Low-level row and text drawing

use eframe::egui;
use log::LevelFilter;
use simplelog::{Config, WriteLogger};
use std::fs::{self, File};
use std::path::PathBuf;

mod app;
mod io;
mod rendering;
mod ui;

use app::{AppState, ApplicationCoordinator, SettingsCoordinator, ThemeCoordinator};
use io::AsyncLoader;
use ui::PanelManager;

const LOG_ENV: &str = "RVTABLE_LOG";

/// Logs to a file in the user cache directory. Level comes from
/// `RVTABLE_LOG` (error, warn, info, debug, trace), default info.
fn init_logging() {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    let Some(dir) = dirs::cache_dir().map(|dir| dir.join("rvtable")) else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    if let Ok(log_file) = File::create(dir.join("vtable-gui.log")) {
        let _ = WriteLogger::init(level, Config::default(), log_file);
    }
}

/// Main application entry point that initializes and launches the viewer GUI.
fn main() -> eframe::Result {
    init_logging();

    // Optional dataset to open on startup
    let initial_file = std::env::args().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title("Virtual Table Viewer"),
        ..Default::default()
    };

    eframe::run_native(
        "Virtual Table Viewer",
        options,
        Box::new(move |cc| Ok(Box::new(VTableApp::new(cc, initial_file)))),
    )
}

/// The viewer application.
///
/// Delegates to coordinators:
/// - `ApplicationCoordinator` handles loading, polling and interactions
/// - `ThemeCoordinator` applies light or dark visuals
/// - `PanelManager` handles UI panel layout and rendering
struct VTableApp {
    state: AppState,
    loader: AsyncLoader,
    /// File to load on the first frame
    pending_file_load: Option<PathBuf>,
}

impl VTableApp {
    fn new(cc: &eframe::CreationContext, initial_file: Option<PathBuf>) -> Self {
        let settings = SettingsCoordinator::load(cc.storage);
        log::info!("starting viewer ({:?} mode)", settings.mode);
        Self {
            state: AppState::new(settings),
            loader: AsyncLoader::new(),
            pending_file_load: initial_file,
        }
    }
}

impl eframe::App for VTableApp {
    /// Called when the app is being shut down - ensures preferences are saved.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        SettingsCoordinator::save(storage, &self.state.settings);
    }

    /// Main update loop:
    /// 1. Install a finished dataset load
    /// 2. Apply theme
    /// 3. Apply finished provider requests
    /// 4. Render all panels and handle the interaction
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ApplicationCoordinator::check_loading_completion(&mut self.state, &mut self.loader, ctx);
        ThemeCoordinator::apply_current_theme(ctx, &self.state);

        if let Some(path) = self.pending_file_load.take() {
            ApplicationCoordinator::open_file(&mut self.state, &mut self.loader, path, ctx);
        }

        ApplicationCoordinator::poll_table(&mut self.state);

        if let Some(interaction) = PanelManager::render_all_panels(ctx, &mut self.state, &self.loader) {
            ApplicationCoordinator::handle_interaction(&mut self.state, &mut self.loader, interaction, ctx);
        }
    }
}
