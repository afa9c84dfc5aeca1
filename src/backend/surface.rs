// Window surface
//
// Platform-specific VkSurfaceKHR created through ash-window from the winit
// window's raw handles. Destroyed by the owner before the instance.

use crate::error::{BootstrapError, BootstrapResult};
use ash::extensions::khr::Surface;
use ash::{vk, Entry, Instance};
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use std::ffi::c_char;
use winit::window::Window;

pub struct WindowSurface {
    pub loader: Surface,
    pub surface: vk::SurfaceKHR,
}

impl WindowSurface {
    pub fn create(entry: &Entry, instance: &Instance, window: &Window) -> BootstrapResult<Self> {
        let loader = Surface::new(entry, instance);

        let surface = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                window.raw_display_handle(),
                window.raw_window_handle(),
                None,
            )
        }
        .map_err(|e| BootstrapError::vulkan("failed to create window surface", e))?;

        Ok(Self { loader, surface })
    }

    /// Can `queue_family` on `physical_device` present to this surface?
    pub fn supports_present(
        &self,
        physical_device: vk::PhysicalDevice,
        queue_family: u32,
    ) -> BootstrapResult<bool> {
        unsafe {
            self.loader
                .get_physical_device_surface_support(physical_device, queue_family, self.surface)
        }
        .map_err(|e| BootstrapError::vulkan("failed to query presentation support", e))
    }

    pub fn destroy(self) {
        unsafe {
            self.loader.destroy_surface(self.surface, None);
        }
    }
}

/// Instance extensions the window system needs for surface creation
pub fn window_extensions(window: &Window) -> BootstrapResult<&'static [*const c_char]> {
    ash_window::enumerate_required_extensions(window.raw_display_handle())
        .map_err(|e| BootstrapError::vulkan("failed to query required window extensions", e))
}
