// Debug report channel
//
// VK_EXT_debug_report entry points are not part of core Vulkan, so they have
// to be looked up on the instance at runtime. `DebugReportSupport::lookup`
// does that and only hands back a usable loader when both entry points
// exist.
//
// Messages go to the `log` facade under the "vulkan" target. The callback
// always returns VK_FALSE so the triggering call is never aborted.

use crate::error::{BootstrapError, BootstrapResult};
#[allow(deprecated)]
use ash::extensions::ext::DebugReport;
use ash::{vk, Entry, Instance};
use std::ffi::{c_char, c_void, CStr};

/// Severities we ask the driver to report
pub const DEFAULT_REPORT_FLAGS: vk::DebugReportFlagsEXT = vk::DebugReportFlagsEXT::from_raw(
    vk::DebugReportFlagsEXT::DEBUG.as_raw() | vk::DebugReportFlagsEXT::WARNING.as_raw(),
);

const CREATE_CALLBACK: &CStr = c"vkCreateDebugReportCallbackEXT";
const DESTROY_CALLBACK: &CStr = c"vkDestroyDebugReportCallbackEXT";

/// Proof that the driver exposes the debug report entry points
#[allow(deprecated)]
pub struct DebugReportSupport {
    loader: DebugReport,
}

#[allow(deprecated)]
impl DebugReportSupport {
    /// Look up the create/destroy entry points on `instance`.
    ///
    /// Returns `None` if either is missing. ash's own loader would otherwise
    /// install stubs that panic when called.
    pub fn lookup(entry: &Entry, instance: &Instance) -> Option<Self> {
        let lookup = |name: &CStr| unsafe {
            entry.get_instance_proc_addr(instance.handle(), name.as_ptr())
        };

        if lookup(CREATE_CALLBACK).is_none() || lookup(DESTROY_CALLBACK).is_none() {
            return None;
        }

        Some(Self {
            loader: DebugReport::new(entry, instance),
        })
    }
}

/// A registered debug report callback. Must be destroyed before its instance.
#[allow(deprecated)]
pub struct DebugChannel {
    loader: DebugReport,
    callback: vk::DebugReportCallbackEXT,
}

#[allow(deprecated)]
impl DebugChannel {
    /// Register the debug callback, or do nothing when validation is off.
    pub fn setup(
        entry: &Entry,
        instance: &Instance,
        flags: vk::DebugReportFlagsEXT,
        enable_validation: bool,
    ) -> BootstrapResult<Option<Self>> {
        if !enable_validation {
            return Ok(None);
        }

        let support = DebugReportSupport::lookup(entry, instance).ok_or_else(|| {
            BootstrapError::init(
                "failed to set up debug callback: vkCreateDebugReportCallbackEXT not present",
            )
        })?;

        Self::register(support, flags).map(Some)
    }

    fn register(support: DebugReportSupport, flags: vk::DebugReportFlagsEXT) -> BootstrapResult<Self> {
        let create_info = vk::DebugReportCallbackCreateInfoEXT::builder()
            .flags(flags)
            .pfn_callback(Some(debug_report_callback));

        let callback = unsafe { support.loader.create_debug_report_callback(&create_info, None) }
            .map_err(|e| BootstrapError::vulkan("failed to set up debug callback", e))?;

        log::info!("Debug report callback registered ({:?})", flags);

        Ok(Self {
            loader: support.loader,
            callback,
        })
    }

    /// Unregister the callback. Consumes the channel so it can't run twice.
    pub fn destroy(self) {
        unsafe {
            self.loader.destroy_debug_report_callback(self.callback, None);
        }
    }
}

/// Pick a log level for a debug report message
pub fn report_level(flags: vk::DebugReportFlagsEXT) -> log::Level {
    if flags.contains(vk::DebugReportFlagsEXT::ERROR) {
        log::Level::Error
    } else if flags.intersects(
        vk::DebugReportFlagsEXT::WARNING | vk::DebugReportFlagsEXT::PERFORMANCE_WARNING,
    ) {
        log::Level::Warn
    } else if flags.contains(vk::DebugReportFlagsEXT::INFORMATION) {
        log::Level::Info
    } else {
        log::Level::Debug
    }
}

fn lossy(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
    }
}

// Debug callback for validation layers
unsafe extern "system" fn debug_report_callback(
    flags: vk::DebugReportFlagsEXT,
    object_type: vk::DebugReportObjectTypeEXT,
    object: u64,
    _location: usize,
    message_code: i32,
    p_layer_prefix: *const c_char,
    p_message: *const c_char,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    log::log!(
        target: "vulkan",
        report_level(flags),
        "Validation layer [{}] {:?} {:#x} (code {}): {}",
        lossy(p_layer_prefix),
        object_type,
        object,
        message_code,
        lossy(p_message),
    );

    // Never abort the call that triggered the report
    vk::FALSE
}
