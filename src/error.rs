// Bootstrap errors
//
// Two kinds of failure stop startup: something could not be created, or no
// GPU can do both graphics and presentation.

use ash::vk;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Instance, device, surface, debug channel or window creation failed,
    /// or a requested validation layer is unavailable
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Zero physical devices, or none with complete queue families
    #[error("no suitable device: {0}")]
    NoSuitableDevice(String),
}

impl BootstrapError {
    pub fn init(reason: impl Into<String>) -> Self {
        Self::Initialization(reason.into())
    }

    /// Wrap a driver result code with what we were trying to do
    pub fn vulkan(what: &str, result: vk::Result) -> Self {
        Self::Initialization(format!("{what}: {result}"))
    }
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;
