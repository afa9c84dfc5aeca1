// Vulkan Device - physical device selection + logical device
//
// Responsibilities:
// - Queue family discovery (graphics + present against one surface)
// - Physical device selection (first device with both queue roles)
// - Logical device + queue creation
//
// The selection rules are plain functions over driver data so they can be
// tested without a GPU; the `ash` calls just feed them.

use super::negotiation;
use super::surface::WindowSurface;
use crate::error::{BootstrapError, BootstrapResult};
use ash::{vk, Instance};
use std::collections::BTreeSet;
use std::ffi::CStr;

/// Every queue gets maximum priority; roles aren't differentiated
static QUEUE_PRIORITIES: [f32; 1] = [1.0];

/// Queue family indices for one (physical device, surface) pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Both indices, if both roles were found
    pub fn complete(&self) -> Option<QueueFamilies> {
        Some(QueueFamilies {
            graphics: self.graphics?,
            present: self.present?,
        })
    }
}

/// Resolved queue families of the selected device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Distinct family indices, ascending. One entry when the roles share a family.
    pub fn unique(&self) -> BTreeSet<u32> {
        [self.graphics, self.present].into_iter().collect()
    }
}

/// Find the lowest-index graphics family and the lowest-index present family.
///
/// `supports_present` is asked about each family with queues until a present
/// family is found. Scanning stops once both roles are filled.
pub fn resolve_queue_families<F>(
    families: &[vk::QueueFamilyProperties],
    mut supports_present: F,
) -> BootstrapResult<QueueFamilyIndices>
where
    F: FnMut(u32) -> BootstrapResult<bool>,
{
    let mut indices = QueueFamilyIndices::default();

    for (index, family) in (0u32..).zip(families) {
        if family.queue_count > 0 {
            if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                indices.graphics = Some(index);
            }

            if indices.present.is_none() && supports_present(index)? {
                indices.present = Some(index);
            }
        }

        if indices.is_complete() {
            break;
        }
    }

    Ok(indices)
}

/// Pick the first candidate whose queue families are complete.
///
/// Candidates are tried in the order given; a later device is never preferred
/// over an earlier one that qualifies.
pub fn select_first_suitable<D, F>(
    candidates: &[D],
    mut resolve: F,
) -> BootstrapResult<(D, QueueFamilies)>
where
    D: Copy,
    F: FnMut(D) -> BootstrapResult<QueueFamilyIndices>,
{
    if candidates.is_empty() {
        return Err(BootstrapError::NoSuitableDevice(
            "failed to find GPUs with Vulkan support".into(),
        ));
    }

    for &candidate in candidates {
        if let Some(families) = resolve(candidate)?.complete() {
            return Ok((candidate, families));
        }
    }

    Err(BootstrapError::NoSuitableDevice("failed to find a suitable GPU".into()))
}

/// Queue families of `physical_device` as seen from `surface`
pub fn find_queue_families(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    surface: &WindowSurface,
) -> BootstrapResult<QueueFamilyIndices> {
    let families = unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
    resolve_queue_families(&families, |index| surface.supports_present(physical_device, index))
}

/// Enumerate GPUs and take the first that can both draw and present.
pub fn pick_physical_device(
    instance: &Instance,
    surface: &WindowSurface,
) -> BootstrapResult<(vk::PhysicalDevice, QueueFamilies)> {
    let devices = unsafe { instance.enumerate_physical_devices() }
        .map_err(|e| BootstrapError::vulkan("failed to enumerate physical devices", e))?;

    log::debug!("Found {} physical device(s)", devices.len());

    let (physical_device, families) = select_first_suitable(&devices, |device| {
        find_queue_families(instance, device, surface)
    })?;

    let properties = unsafe { instance.get_physical_device_properties(physical_device) };
    log::info!(
        "Selected GPU: {}",
        unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy()
    );
    log::info!(
        "Queue families: graphics={}, present={}",
        families.graphics,
        families.present
    );

    Ok((physical_device, families))
}

/// One create info per distinct family, one queue each at priority 1.0
pub fn queue_create_infos(families: &QueueFamilies) -> Vec<vk::DeviceQueueCreateInfo> {
    families
        .unique()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::builder()
                .queue_family_index(family)
                .queue_priorities(&QUEUE_PRIORITIES)
                .build()
        })
        .collect()
}

/// Logical device with its graphics and present queues
pub struct LogicalDevice {
    pub device: ash::Device,
    pub graphics_queue: vk::Queue,
    pub present_queue: vk::Queue,
}

impl LogicalDevice {
    /// Create the device. Validation layers are passed here too when enabled;
    /// older drivers still read device-level layers.
    pub fn create(
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        families: &QueueFamilies,
        enable_validation: bool,
    ) -> BootstrapResult<Self> {
        let queue_infos = queue_create_infos(families);
        let features = vk::PhysicalDeviceFeatures::default();
        let layer_names = negotiation::enabled_layer_names(enable_validation);

        #[allow(deprecated)]
        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_features(&features)
            .enabled_layer_names(&layer_names);

        let device = unsafe { instance.create_device(physical_device, &create_info, None) }
            .map_err(|e| BootstrapError::vulkan("failed to create logical device", e))?;

        // Two lookups even if the families match; the handles are then equal
        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };

        log::info!("Logical device created with {} queue(s)", queue_infos.len());

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
        })
    }

    pub fn destroy(self) {
        unsafe {
            self.device.destroy_device(None);
        }
    }
}
