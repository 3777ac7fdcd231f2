//! A Vulkan installable client driver that fronts a native driver behind a
//! translated window-system interface.
//!
//! Every dispatchable handle handed to the loader is a magic-tagged proxy
//! object owning its native counterpart; every entry point unwraps proxies,
//! forwards to the native driver through per-object function tables, and
//! wraps whatever comes back. The platform surface extension is renamed at
//! the boundary: applications enable `VK_KHR_win32_surface`, the native
//! driver sees `VK_KHR_xlib_surface`.

#![deny(unsafe_op_in_unsafe_fn)]

pub mod device;
pub mod error;
pub mod extensions;
pub mod fns;
pub mod instance;
pub mod native;
pub mod proxy;
pub mod surface;
pub mod swapchain;

#[cfg(test)]
mod stub_driver;

use std::ffi::CStr;
use std::os::raw::c_char;

use ash::vk;

pub use crate::{
    error::Error,
    surface::{install_window_system, WindowSystem},
};

/// Highest loader/ICD interface version this driver implements.
pub const ICD_INTERFACE_VERSION: u32 = 4;

fn fn_cast(f: *const ()) -> vk::PFN_vkVoidFunction {
    // Safety: only reached with `extern "system"` entry points; the caller
    // transmutes back to the signature matching the queried name.
    Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(f) })
}

macro_rules! entry {
    ($f:path) => {
        fn_cast($f as *const ())
    };
}

/// Functions addressable with no instance.
fn global_proc(name: &[u8]) -> vk::PFN_vkVoidFunction {
    match name {
        b"vkCreateInstance" => entry!(instance::create_instance),
        b"vkEnumerateInstanceExtensionProperties" => {
            entry!(extensions::enumerate_instance_extension_properties)
        }
        b"vkGetInstanceProcAddr" => entry!(vkGetInstanceProcAddr),
        _ => None,
    }
}

/// Functions dispatched on an instance or physical device.
fn instance_proc(name: &[u8]) -> vk::PFN_vkVoidFunction {
    match name {
        b"vkDestroyInstance" => entry!(instance::destroy_instance),
        b"vkEnumeratePhysicalDevices" => entry!(instance::enumerate_physical_devices),
        b"vkEnumerateDeviceExtensionProperties" => {
            entry!(instance::enumerate_device_extension_properties)
        }
        b"vkGetPhysicalDeviceProperties" => entry!(instance::get_physical_device_properties),
        b"vkGetPhysicalDeviceFeatures" => entry!(instance::get_physical_device_features),
        b"vkGetPhysicalDeviceMemoryProperties" => {
            entry!(instance::get_physical_device_memory_properties)
        }
        b"vkGetPhysicalDeviceFormatProperties" => {
            entry!(instance::get_physical_device_format_properties)
        }
        b"vkGetPhysicalDeviceQueueFamilyProperties" => {
            entry!(instance::get_physical_device_queue_family_properties)
        }
        b"vkCreateDevice" => entry!(device::create_device),
        b"vkGetDeviceProcAddr" => entry!(vkGetDeviceProcAddr),
        b"vkCreateWin32SurfaceKHR" => entry!(surface::create_win32_surface),
        b"vkDestroySurfaceKHR" => entry!(surface::destroy_surface),
        b"vkGetPhysicalDeviceSurfaceSupportKHR" => {
            entry!(surface::get_physical_device_surface_support)
        }
        b"vkGetPhysicalDeviceSurfaceCapabilitiesKHR" => {
            entry!(surface::get_physical_device_surface_capabilities)
        }
        b"vkGetPhysicalDeviceSurfaceFormatsKHR" => {
            entry!(surface::get_physical_device_surface_formats)
        }
        b"vkGetPhysicalDeviceSurfacePresentModesKHR" => {
            entry!(surface::get_physical_device_surface_present_modes)
        }
        b"vkGetPhysicalDeviceWin32PresentationSupportKHR" => {
            entry!(surface::get_physical_device_win32_presentation_support)
        }
        _ => None,
    }
}

/// Functions dispatched on a device or one of its children.
fn device_proc(name: &[u8]) -> vk::PFN_vkVoidFunction {
    match name {
        b"vkDestroyDevice" => entry!(device::destroy_device),
        b"vkGetDeviceQueue" => entry!(device::get_device_queue),
        b"vkQueueSubmit" => entry!(device::queue_submit),
        b"vkQueueWaitIdle" => entry!(device::queue_wait_idle),
        b"vkDeviceWaitIdle" => entry!(device::device_wait_idle),
        b"vkCreateCommandPool" => entry!(device::create_command_pool),
        b"vkDestroyCommandPool" => entry!(device::destroy_command_pool),
        b"vkAllocateCommandBuffers" => entry!(device::allocate_command_buffers),
        b"vkFreeCommandBuffers" => entry!(device::free_command_buffers),
        b"vkBeginCommandBuffer" => entry!(device::begin_command_buffer),
        b"vkEndCommandBuffer" => entry!(device::end_command_buffer),
        b"vkResetCommandBuffer" => entry!(device::reset_command_buffer),
        b"vkCmdExecuteCommands" => entry!(device::cmd_execute_commands),
        b"vkCreateSwapchainKHR" => entry!(swapchain::create_swapchain),
        b"vkDestroySwapchainKHR" => entry!(swapchain::destroy_swapchain),
        b"vkGetSwapchainImagesKHR" => entry!(swapchain::get_swapchain_images),
        b"vkAcquireNextImageKHR" => entry!(swapchain::acquire_next_image),
        b"vkQueuePresentKHR" => entry!(swapchain::queue_present),
        _ => None,
    }
}

/// `vk_icdNegotiateLoaderICDInterfaceVersion`
///
/// The agreed version is the smaller of what the loader asked for and what
/// this driver implements.
///
/// # Safety
///
/// `p_supported_version`, when non-null, must be valid for reads and writes.
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "system" fn vk_icdNegotiateLoaderICDInterfaceVersion(
    p_supported_version: *mut u32,
) -> vk::Result {
    if p_supported_version.is_null() {
        return vk::Result::INCOMPLETE;
    }

    let requested = unsafe { *p_supported_version };
    let agreed = requested.min(ICD_INTERFACE_VERSION);
    unsafe { *p_supported_version = agreed };

    log::debug!(
        "loader requested interface version {}, using {}",
        requested,
        agreed
    );
    vk::Result::SUCCESS
}

/// `vk_icdGetInstanceProcAddr`
///
/// # Safety
///
/// `p_name`, when non-null, must point to a NUL-terminated string.
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "system" fn vk_icdGetInstanceProcAddr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    unsafe { vkGetInstanceProcAddr(instance, p_name) }
}

/// `vkGetInstanceProcAddr`
///
/// Global names resolve with or without an instance; everything else needs
/// one. Device-level names are resolvable here too, as the loader expects.
///
/// # Safety
///
/// `p_name`, when non-null, must point to a NUL-terminated string.
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "system" fn vkGetInstanceProcAddr(
    instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    if p_name.is_null() {
        return None;
    }
    let name = unsafe { CStr::from_ptr(p_name) }.to_bytes();

    let global = global_proc(name);
    if global.is_some() {
        return global;
    }

    if instance == vk::Instance::null() {
        log::debug!(
            "{} queried without an instance",
            String::from_utf8_lossy(name)
        );
        return None;
    }

    let scoped = instance_proc(name);
    if scoped.is_some() {
        return scoped;
    }

    let device_scoped = device_proc(name);
    if device_scoped.is_some() {
        return device_scoped;
    }

    log::debug!("unsupported function {}", String::from_utf8_lossy(name));
    None
}

/// `vkGetDeviceProcAddr`
///
/// # Safety
///
/// `p_name`, when non-null, must point to a NUL-terminated string.
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "system" fn vkGetDeviceProcAddr(
    device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    if device == vk::Device::null() || p_name.is_null() {
        return None;
    }
    let name = unsafe { CStr::from_ptr(p_name) }.to_bytes();

    let scoped = device_proc(name);
    if scoped.is_none() {
        log::debug!(
            "unsupported device function {}",
            String::from_utf8_lossy(name)
        );
    }
    scoped
}
