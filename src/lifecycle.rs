// =============================================================================
// LIFECYCLE - ordered bring-up and reverse teardown
// =============================================================================
//
// BRING-UP (each step needs the one before it):
//   window -> instance -> debug channel (validation only) -> surface
//          -> physical device -> logical device + queues -> running
//
// TEARDOWN runs the same list backwards, starting from the highest state
// reached. Handles that were never created are skipped, so a failure halfway
// through unwinds exactly what exists.
//
// =============================================================================

use crate::backend::debug::{DebugChannel, DEFAULT_REPORT_FLAGS};
use crate::backend::instance::{self, InstanceInfo};
use crate::backend::{device, negotiation, surface, LogicalDevice, QueueFamilies, WindowSurface};
use crate::error::{BootstrapError, BootstrapResult};
use ash::prelude::VkResult;
use ash::{vk, Entry, Instance};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes};

pub const WINDOW_TITLE: &str = "Vulkan";
pub const WINDOW_WIDTH: u32 = 800;
pub const WINDOW_HEIGHT: u32 = 600;

/// How far bring-up got. Ordered: later states imply the earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Uninitialized,
    WindowReady,
    InstanceReady,
    DebugChannelReady,
    SurfaceReady,
    DeviceSelected,
    LogicalDeviceReady,
    Running,
    Terminated,
}

/// One destruction step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    DestroyLogicalDevice,
    DestroyDebugChannel,
    DestroySurface,
    DestroyInstance,
    DestroyWindow,
}

impl LifecycleState {
    /// Destruction steps for everything created up to this state, newest first.
    ///
    /// With validation off the state goes straight from `InstanceReady` to
    /// `SurfaceReady`; the debug channel step then finds nothing to destroy.
    pub fn teardown_steps(self) -> Vec<TeardownStep> {
        use LifecycleState as S;

        if self == S::Terminated {
            return Vec::new();
        }

        // (state that created it, how to destroy it); selecting a physical
        // device creates nothing
        let plan = [
            (S::LogicalDeviceReady, TeardownStep::DestroyLogicalDevice),
            (S::DebugChannelReady, TeardownStep::DestroyDebugChannel),
            (S::SurfaceReady, TeardownStep::DestroySurface),
            (S::InstanceReady, TeardownStep::DestroyInstance),
            (S::WindowReady, TeardownStep::DestroyWindow),
        ];

        plan.into_iter()
            .filter(|&(created_at, _)| self >= created_at)
            .map(|(_, step)| step)
            .collect()
    }
}

/// Everything the bootstrap owns. Field order follows creation order.
pub struct AppContext {
    state: LifecycleState,
    enable_validation: bool,

    window: Option<Window>,
    entry: Option<Entry>,
    instance: Option<Instance>,
    debug_channel: Option<DebugChannel>,
    surface: Option<WindowSurface>,
    /// Not owned; the driver keeps physical devices alive
    physical_device: Option<vk::PhysicalDevice>,
    device: Option<LogicalDevice>,
}

impl AppContext {
    pub fn new(enable_validation: bool) -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            enable_validation,
            window: None,
            entry: None,
            instance: None,
            debug_channel: None,
            surface: None,
            physical_device: None,
            device: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    pub fn physical_device(&self) -> Option<vk::PhysicalDevice> {
        self.physical_device
    }

    pub fn graphics_queue(&self) -> Option<vk::Queue> {
        self.device.as_ref().map(|d| d.graphics_queue)
    }

    pub fn present_queue(&self) -> Option<vk::Queue> {
        self.device.as_ref().map(|d| d.present_queue)
    }

    /// Run every bring-up step in order, stopping at the first failure.
    ///
    /// On failure the caller gets the error; whatever was created stays owned
    /// by the context until [`teardown`](Self::teardown) or drop.
    pub fn initialize(&mut self, event_loop: &ActiveEventLoop) -> BootstrapResult<()> {
        log::info!("Initializing (validation {})", if self.enable_validation { "on" } else { "off" });

        self.create_window(event_loop)?;
        self.create_instance()?;
        self.setup_debug_channel()?;
        self.create_surface()?;
        // Resolved families go straight to the device builder, never stored
        let (physical_device, families) = self.pick_physical_device()?;
        self.create_logical_device(physical_device, families)?;

        self.advance(LifecycleState::Running);
        log::info!("Vulkan initialized successfully!");
        Ok(())
    }

    fn advance(&mut self, next: LifecycleState) {
        log::debug!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> BootstrapResult<()> {
        let attributes = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(winit::dpi::PhysicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .with_resizable(false);

        let window = event_loop
            .create_window(attributes)
            .map_err(|e| BootstrapError::init(format!("failed to create window: {e}")))?;

        log::info!("Window: {}x{} \"{}\"", WINDOW_WIDTH, WINDOW_HEIGHT, WINDOW_TITLE);
        self.window = Some(window);
        self.advance(LifecycleState::WindowReady);
        Ok(())
    }

    fn create_instance(&mut self) -> BootstrapResult<()> {
        let window = self.window.as_ref().ok_or_else(|| BootstrapError::init("window not created"))?;
        let window_extensions = surface::window_extensions(window)?;
        let extensions = negotiation::required_extensions(window_extensions, self.enable_validation);

        let entry = instance::load_entry()?;
        let instance = instance::create_instance(&entry, &InstanceInfo::default(), &extensions, self.enable_validation)?;

        self.entry = Some(entry);
        self.instance = Some(instance);
        self.advance(LifecycleState::InstanceReady);
        Ok(())
    }

    fn setup_debug_channel(&mut self) -> BootstrapResult<()> {
        let (entry, instance) = self.loaded()?;
        let channel = DebugChannel::setup(entry, instance, DEFAULT_REPORT_FLAGS, self.enable_validation)?;

        if channel.is_some() {
            self.debug_channel = channel;
            self.advance(LifecycleState::DebugChannelReady);
        }
        Ok(())
    }

    fn create_surface(&mut self) -> BootstrapResult<()> {
        let (entry, instance) = self.loaded()?;
        let window = self.window.as_ref().ok_or_else(|| BootstrapError::init("window not created"))?;
        let surface = WindowSurface::create(entry, instance, window)?;

        self.surface = Some(surface);
        self.advance(LifecycleState::SurfaceReady);
        Ok(())
    }

    fn pick_physical_device(&mut self) -> BootstrapResult<(vk::PhysicalDevice, QueueFamilies)> {
        let (_, instance) = self.loaded()?;
        let surface = self.surface.as_ref().ok_or_else(|| BootstrapError::init("surface not created"))?;
        let (physical_device, families) = device::pick_physical_device(instance, surface)?;

        self.physical_device = Some(physical_device);
        self.advance(LifecycleState::DeviceSelected);
        Ok((physical_device, families))
    }

    fn create_logical_device(
        &mut self,
        physical_device: vk::PhysicalDevice,
        families: QueueFamilies,
    ) -> BootstrapResult<()> {
        let (_, instance) = self.loaded()?;
        let device = LogicalDevice::create(instance, physical_device, &families, self.enable_validation)?;

        self.device = Some(device);
        self.advance(LifecycleState::LogicalDeviceReady);
        Ok(())
    }

    fn loaded(&self) -> BootstrapResult<(&Entry, &Instance)> {
        match (&self.entry, &self.instance) {
            (Some(entry), Some(instance)) => Ok((entry, instance)),
            _ => Err(BootstrapError::init("instance not created")),
        }
    }

    /// Destroy everything created so far, newest first. Safe to call twice.
    pub fn teardown(&mut self) {
        let steps = self.state.teardown_steps();
        if steps.is_empty() {
            return;
        }

        log::info!("Cleaning up Vulkan resources...");

        if let Some(device) = &self.device {
            // Nothing is submitted, but don't destroy a busy device
            idle_before_destroy(unsafe { device.device.device_wait_idle() });
        }

        for step in steps {
            log::debug!("Teardown: {:?}", step);
            match step {
                TeardownStep::DestroyLogicalDevice => {
                    if let Some(device) = self.device.take() {
                        device.destroy();
                    }
                }
                TeardownStep::DestroyDebugChannel => {
                    if let Some(channel) = self.debug_channel.take() {
                        channel.destroy();
                    }
                }
                TeardownStep::DestroySurface => {
                    if let Some(surface) = self.surface.take() {
                        surface.destroy();
                    }
                }
                TeardownStep::DestroyInstance => {
                    self.physical_device = None;
                    if let Some(instance) = self.instance.take() {
                        unsafe { instance.destroy_instance(None) };
                    }
                    // Unload the library only after the instance is gone
                    self.entry = None;
                }
                TeardownStep::DestroyWindow => {
                    self.window = None;
                }
            }
        }

        self.state = LifecycleState::Terminated;
        log::info!("Cleanup complete");
    }
}

/// Report a failed wait-idle; teardown goes ahead either way
fn idle_before_destroy(result: VkResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Device did not go idle before teardown: {}", e);
            false
        }
    }
}

impl Drop for AppContext {
    fn drop(&mut self) {
        self.teardown();
    }
}
