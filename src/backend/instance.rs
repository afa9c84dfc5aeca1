// Vulkan instance creation
//
// Validation support is checked before the driver is asked for anything,
// so a missing layer never reaches vkCreateInstance.

use super::negotiation;
use crate::error::{BootstrapError, BootstrapResult};
use ash::prelude::VkResult;
use ash::{vk, Entry, Instance};
use std::ffi::{c_char, CString};

/// What the instance reports about the application
pub struct InstanceInfo<'a> {
    pub app_name: &'a str,
    pub engine_name: &'a str,
}

impl Default for InstanceInfo<'static> {
    fn default() -> Self {
        Self {
            app_name: "Hello Triangle",
            engine_name: "No Engine",
        }
    }
}

/// Load the Vulkan library
pub fn load_entry() -> BootstrapResult<Entry> {
    unsafe { Entry::load() }
        .map_err(|e| BootstrapError::init(format!("failed to load Vulkan library ({e}). Is Vulkan installed?")))
}

pub fn create_instance(
    entry: &Entry,
    info: &InstanceInfo<'_>,
    extensions: &[*const c_char],
    enable_validation: bool,
) -> BootstrapResult<Instance> {
    let instance = build_instance(
        info,
        extensions,
        enable_validation,
        || entry.enumerate_instance_layer_properties(),
        |create_info| unsafe { entry.create_instance(create_info, None) },
    )?;

    negotiation::log_available_extensions(entry);

    Ok(instance)
}

/// Check layers (when validating), then hand the create info to `create`.
///
/// `available_layers` is only asked when validation is on; `create` is never
/// called if a requested layer is missing.
pub fn build_instance<T, L, C>(
    info: &InstanceInfo<'_>,
    extensions: &[*const c_char],
    enable_validation: bool,
    available_layers: L,
    create: C,
) -> BootstrapResult<T>
where
    L: FnOnce() -> VkResult<Vec<vk::LayerProperties>>,
    C: FnOnce(&vk::InstanceCreateInfo) -> VkResult<T>,
{
    if enable_validation {
        let available = available_layers()
            .map_err(|e| BootstrapError::vulkan("failed to enumerate instance layers", e))?;
        negotiation::check_validation_layers(&available)?;
    }

    let app_name = CString::new(info.app_name)
        .map_err(|_| BootstrapError::init("application name contains a NUL byte"))?;
    let engine_name = CString::new(info.engine_name)
        .map_err(|_| BootstrapError::init("engine name contains a NUL byte"))?;

    let app_info = vk::ApplicationInfo::builder()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 1, 0, 0))
        .engine_name(&engine_name)
        .engine_version(vk::make_api_version(0, 1, 0, 0))
        .api_version(vk::API_VERSION_1_0);

    let layer_names = negotiation::enabled_layer_names(enable_validation);

    let create_info = vk::InstanceCreateInfo::builder()
        .application_info(&app_info)
        .enabled_extension_names(extensions)
        .enabled_layer_names(&layer_names);

    create(&*create_info).map_err(|e| BootstrapError::vulkan("failed to create vulkan instance", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::ffi::CStr;

    fn layer(name: &CStr) -> vk::LayerProperties {
        let mut props = vk::LayerProperties::default();
        for (dst, &src) in props.layer_name.iter_mut().zip(name.to_bytes()) {
            *dst = src as c_char;
        }
        props
    }

    /// Layer and extension counts the driver would have seen
    fn counts(create_info: &vk::InstanceCreateInfo) -> VkResult<(u32, u32)> {
        Ok((create_info.enabled_layer_count, create_info.enabled_extension_count))
    }

    #[test]
    fn missing_layer_fails_before_instance_creation() {
        let created = Cell::new(false);
        let result = build_instance(
            &InstanceInfo::default(),
            &[],
            true,
            || Ok(vec![layer(c"VK_LAYER_MESA_overlay")]),
            |_| {
                created.set(true);
                Ok(())
            },
        );

        match result {
            Err(BootstrapError::Initialization(msg)) => {
                assert!(msg.contains("VK_LAYER_KHRONOS_validation"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!created.get());
    }

    #[test]
    fn layer_enumeration_failure_is_an_init_error() {
        let result = build_instance(
            &InstanceInfo::default(),
            &[],
            true,
            || Err(vk::Result::ERROR_OUT_OF_HOST_MEMORY),
            counts,
        );
        assert!(matches!(result, Err(BootstrapError::Initialization(_))));
    }

    #[test]
    fn validation_requests_the_layers() {
        let extensions = [c"VK_KHR_surface".as_ptr(), c"VK_EXT_debug_report".as_ptr()];
        let (layers, exts) = build_instance(
            &InstanceInfo::default(),
            &extensions,
            true,
            || Ok(vec![layer(c"VK_LAYER_KHRONOS_validation")]),
            counts,
        )
        .unwrap();
        assert_eq!((layers, exts), (1, 2));
    }

    #[test]
    fn no_validation_skips_layer_query() {
        let queried = Cell::new(false);
        let (layers, _) = build_instance(
            &InstanceInfo::default(),
            &[c"VK_KHR_surface".as_ptr()],
            false,
            || {
                queried.set(true);
                Ok(Vec::new())
            },
            counts,
        )
        .unwrap();
        assert_eq!(layers, 0);
        assert!(!queried.get());
    }

    #[test]
    fn application_info_targets_vulkan_1_0() {
        let (api, app, engine) = build_instance(
            &InstanceInfo::default(),
            &[],
            false,
            || Ok(Vec::new()),
            |create_info| {
                let app_info = unsafe { &*create_info.p_application_info };
                let names = unsafe {
                    (
                        CStr::from_ptr(app_info.p_application_name).to_owned(),
                        CStr::from_ptr(app_info.p_engine_name).to_owned(),
                    )
                };
                Ok((app_info.api_version, names.0, names.1))
            },
        )
        .unwrap();
        assert_eq!(api, vk::API_VERSION_1_0);
        assert_eq!(app.as_c_str(), c"Hello Triangle");
        assert_eq!(engine.as_c_str(), c"No Engine");
    }

    #[test]
    fn driver_rejection_is_an_init_error() {
        let result: BootstrapResult<()> = build_instance(
            &InstanceInfo::default(),
            &[],
            false,
            || Ok(Vec::new()),
            |_| Err(vk::Result::ERROR_EXTENSION_NOT_PRESENT),
        );
        assert!(matches!(result, Err(BootstrapError::Initialization(_))));
    }
}
