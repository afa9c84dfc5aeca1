// =============================================================================
// VULKAN BOOTSTRAP - window, instance, device, queues, event loop
// =============================================================================
//
// Brings Vulkan up to the point where rendering could start, then idles until
// the window is closed. There is no swapchain and nothing is drawn.
//
// FLOW:
// 1. Load config + logging
// 2. Event loop starts, `resumed` runs the ordered bring-up (see lifecycle.rs)
// 3. Pending events are handled, then the close flag is checked
// 4. On exit everything is destroyed newest-first, then the event loop goes
//
// Any failure: message on stderr, wait for a key, non-zero exit status.
//
// =============================================================================

mod backend;
mod config;
mod error;
mod lifecycle;

use anyhow::{Context, Result};
use backend::negotiation::ENABLE_VALIDATION;
use config::Config;
use error::BootstrapError;
use lifecycle::AppContext;
use std::fs::File;
use std::io::{Read, Write};
use std::process::ExitCode;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::WindowId,
};

// =============================================================================
// ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    // Load configuration from config.toml
    let (config, load_error) = Config::load();

    init_logging(&config);
    if let Some(e) = load_error {
        log::warn!("Failed to load config.toml: {:#}. Using defaults.", e);
    }
    log::info!("Starting Vulkan bootstrap");

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            wait_for_keypress();
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let event_loop = EventLoop::new().context("Failed to initialize windowing")?;
    // Block on the platform between iterations instead of spinning
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new();
    event_loop.run_app(&mut app)?;
    // run_app consumed the event loop, so the windowing platform is released

    app.finish()?;
    log::info!("Exited cleanly");
    Ok(())
}

/// Initialize logging, optionally into a file instead of stderr
fn init_logging(config: &Config) {
    use env_logger::{Builder, Target};

    let mut builder = Builder::from_default_env();
    builder.filter_level(config.log_level());

    if config.logging.to_file {
        match File::create(&config.logging.file) {
            Ok(mut file) => {
                let _ = writeln!(file, "=== Vulkan Bootstrap Log ===");
                let _ = writeln!(file, "Started: {:?}", std::time::SystemTime::now());
                let _ = writeln!(file);
                builder.target(Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Could not open {}: {}", config.logging.file, e),
        }
    }

    builder.init();
}

fn wait_for_keypress() {
    eprintln!("Press Enter to exit...");
    let _ = std::io::stdin().read(&mut [0u8; 1]);
}

// =============================================================================
// APPLICATION STATE
// =============================================================================

struct App {
    context: AppContext,
    /// Set by CloseRequested, acted on once the pending events are drained
    close_requested: bool,
    failure: Option<BootstrapError>,
}

impl App {
    fn new() -> Self {
        Self {
            context: AppContext::new(ENABLE_VALIDATION),
            close_requested: false,
            failure: None,
        }
    }

    /// Tear down (if the loop didn't already) and report how the run ended
    fn finish(mut self) -> Result<(), BootstrapError> {
        self.context.teardown();
        match self.failure.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn log_queues(&self) {
        log::debug!(
            "Physical device {:?}, graphics queue {:?}, present queue {:?}",
            self.context.physical_device(),
            self.context.graphics_queue(),
            self.context.present_queue()
        );
    }
}

// =============================================================================
// EVENT HANDLING
// =============================================================================

impl ApplicationHandler for App {
    /// Called when the application is ready to create windows.
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.state() != lifecycle::LifecycleState::Uninitialized {
            return;
        }

        if let Err(e) = self.context.initialize(event_loop) {
            log::error!("Failed to initialize Vulkan: {}", e);
            self.context.teardown();
            self.failure = Some(e);
            event_loop.exit();
            return;
        }

        self.log_queues();
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if self.context.window().map(|w| w.id()) != Some(id) {
            return;
        }

        if let WindowEvent::CloseRequested = event {
            log::info!("Close requested, shutting down...");
            self.close_requested = true;
        }
    }

    /// All pending events for this iteration have been handled.
    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.close_requested {
            event_loop.exit();
        }
    }

    /// Last callback before the loop returns; the window must go while the
    /// platform is still alive.
    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.context.teardown();
    }
}
