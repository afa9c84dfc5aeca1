// Backend module - Vulkan bring-up
//
// Design: thin wrappers around ash; decisions are plain functions so they
// can be tested without a driver

pub mod debug;
pub mod device;
pub mod instance;
pub mod negotiation;
pub mod surface;

pub use device::{LogicalDevice, QueueFamilies};
pub use surface::WindowSurface;
