// Extension / layer negotiation
//
// Decides what the instance asks the driver for:
// - the window system's surface extensions (+ debug report when validating)
// - the fixed validation layer list, but only if every layer is installed

use crate::error::{BootstrapError, BootstrapResult};
#[allow(deprecated)]
use ash::extensions::ext::DebugReport;
use ash::{vk, Entry};
use std::ffi::{c_char, CStr};

/// Validation follows the build profile: on in debug builds, off in release
pub const ENABLE_VALIDATION: bool = cfg!(debug_assertions);

/// Layers requested when validation is enabled
pub const VALIDATION_LAYERS: &[&CStr] = &[c"VK_LAYER_KHRONOS_validation"];

/// Window-system extensions, plus debug report if validation is on.
#[allow(deprecated)]
pub fn required_extensions(
    window_extensions: &[*const c_char],
    enable_validation: bool,
) -> Vec<*const c_char> {
    let mut extensions = window_extensions.to_vec();

    if enable_validation {
        extensions.push(DebugReport::name().as_ptr());
    }

    extensions
}

/// Raw pointers for `enabled_layer_names`; empty when validation is off
pub fn enabled_layer_names(enable_validation: bool) -> Vec<*const c_char> {
    if enable_validation {
        VALIDATION_LAYERS.iter().map(|name| name.as_ptr()).collect()
    } else {
        Vec::new()
    }
}

/// Requested layers that are not in `available`
pub fn missing_layers<'a, 'b>(
    requested: &[&'a CStr],
    available: impl IntoIterator<Item = &'b CStr> + Clone,
) -> Vec<&'a CStr> {
    requested
        .iter()
        .copied()
        .filter(|wanted| !available.clone().into_iter().any(|name| name == *wanted))
        .collect()
}

/// True iff every requested layer name appears in `available` (exact match)
pub fn all_layers_present<'b>(
    requested: &[&CStr],
    available: impl IntoIterator<Item = &'b CStr> + Clone,
) -> bool {
    missing_layers(requested, available).is_empty()
}

pub fn layer_name(props: &vk::LayerProperties) -> &CStr {
    // Driver strings are NUL-terminated within the fixed-size array
    unsafe { CStr::from_ptr(props.layer_name.as_ptr()) }
}

pub fn extension_name(props: &vk::ExtensionProperties) -> &CStr {
    unsafe { CStr::from_ptr(props.extension_name.as_ptr()) }
}

/// Check `available` for every layer in [`VALIDATION_LAYERS`].
///
/// Missing layers are an error, never a silent downgrade.
pub fn check_validation_layers(available: &[vk::LayerProperties]) -> BootstrapResult<()> {
    let names = available.iter().map(layer_name);
    if !all_layers_present(VALIDATION_LAYERS, names.clone()) {
        let names: Vec<_> = missing_layers(VALIDATION_LAYERS, names)
            .into_iter()
            .map(|name| name.to_string_lossy())
            .collect();
        return Err(BootstrapError::init(format!(
            "validation layers requested, but not available: {}",
            names.join(", ")
        )));
    }

    Ok(())
}

/// Log every instance extension the driver offers.
///
/// Purely informational: requested extensions are not checked against this
/// list, a missing one shows up as an instance creation failure instead.
pub fn log_available_extensions(entry: &Entry) {
    match entry.enumerate_instance_extension_properties(None) {
        Ok(extensions) => {
            log::info!("Available extensions:");
            for extension in &extensions {
                log::info!("\t{}", extension_name(extension).to_string_lossy());
            }
        }
        Err(e) => log::warn!("Could not enumerate instance extensions: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str) -> vk::LayerProperties {
        let mut props = vk::LayerProperties::default();
        for (dst, src) in props.layer_name.iter_mut().zip(name.bytes()) {
            *dst = src as c_char;
        }
        props
    }

    #[test]
    fn layers_present_in_any_order() {
        let requested = [c"VK_LAYER_A", c"VK_LAYER_B"];
        let available = [c"VK_LAYER_B", c"VK_LAYER_C", c"VK_LAYER_A"];
        assert!(all_layers_present(&requested, available.iter().copied()));
    }

    #[test]
    fn one_missing_layer_fails_the_whole_list() {
        let requested = [c"VK_LAYER_A", c"VK_LAYER_B"];
        let available = [c"VK_LAYER_A"];
        assert!(!all_layers_present(&requested, available.iter().copied()));
        assert_eq!(missing_layers(&requested, available.iter().copied()), vec![c"VK_LAYER_B"]);
    }

    #[test]
    fn layer_names_match_case_sensitively() {
        let requested = [c"VK_LAYER_KHRONOS_validation"];
        let available = [c"vk_layer_khronos_validation"];
        assert!(!all_layers_present(&requested, available.iter().copied()));
    }

    #[test]
    fn prefix_is_not_a_match() {
        let requested = [c"VK_LAYER_KHRONOS_validation"];
        let available = [c"VK_LAYER_KHRONOS"];
        assert!(!all_layers_present(&requested, available.iter().copied()));
    }

    #[test]
    fn empty_request_is_always_satisfied() {
        assert!(all_layers_present(&[], std::iter::empty::<&CStr>()));
    }

    #[test]
    fn layer_properties_are_read_by_name() {
        let available = [layer("VK_LAYER_KHRONOS_validation"), layer("VK_LAYER_MESA_overlay")];
        assert!(all_layers_present(VALIDATION_LAYERS, available.iter().map(layer_name)));

        let without = [layer("VK_LAYER_MESA_overlay")];
        assert!(!all_layers_present(VALIDATION_LAYERS, without.iter().map(layer_name)));
    }

    #[test]
    fn missing_validation_layer_is_an_init_error() {
        let err = check_validation_layers(&[layer("VK_LAYER_MESA_overlay")]).unwrap_err();
        assert!(matches!(err, BootstrapError::Initialization(_)));
        assert!(err.to_string().contains("VK_LAYER_KHRONOS_validation"));

        assert!(check_validation_layers(&[layer("VK_LAYER_KHRONOS_validation")]).is_ok());
    }

    #[test]
    fn validation_follows_build_profile() {
        assert_eq!(ENABLE_VALIDATION, cfg!(debug_assertions));
    }

    #[test]
    fn debug_report_appended_only_when_validating() {
        let surface = [c"VK_KHR_surface".as_ptr(), c"VK_KHR_xlib_surface".as_ptr()];

        let plain = required_extensions(&surface, false);
        assert_eq!(plain, surface.to_vec());

        let validating = required_extensions(&surface, true);
        assert_eq!(validating.len(), 3);
        assert_eq!(&validating[..2], &surface[..]);
        let last = unsafe { CStr::from_ptr(validating[2]) };
        assert_eq!(last, c"VK_EXT_debug_report");
    }

    #[test]
    fn no_layers_without_validation() {
        assert!(enabled_layer_names(false).is_empty());
        let layers = enabled_layer_names(true);
        assert_eq!(layers.len(), VALIDATION_LAYERS.len());
        assert_eq!(unsafe { CStr::from_ptr(layers[0]) }, VALIDATION_LAYERS[0]);
    }
}
