//! Resolved native function tables.
//!
//! Global functions come from the capability table in [`crate::native`].
//! Everything else is resolved by name exactly once per instance or device
//! through the native `vkGetInstanceProcAddr` / `vkGetDeviceProcAddr` and
//! cached in the owning proxy. Core functions are required: a single missing
//! name fails the whole resolution, so no partially usable table ever
//! escapes. Extension functions are grouped in all-or-nothing sub-tables
//! that are simply absent when the native driver lacks the extension.

use ash::vk;

use crate::error::Error;

/// Function pointer types for the entry points this layer resolves by name.
pub mod pfn {
    use ash::vk;
    use std::os::raw::c_char;

    pub type GetInstanceProcAddr =
        unsafe extern "system" fn(vk::Instance, *const c_char) -> vk::PFN_vkVoidFunction;
    pub type GetDeviceProcAddr =
        unsafe extern "system" fn(vk::Device, *const c_char) -> vk::PFN_vkVoidFunction;

    pub type CreateInstance = unsafe extern "system" fn(
        *const vk::InstanceCreateInfo,
        *const vk::AllocationCallbacks,
        *mut vk::Instance,
    ) -> vk::Result;
    pub type DestroyInstance =
        unsafe extern "system" fn(vk::Instance, *const vk::AllocationCallbacks);
    pub type EnumerateInstanceExtensionProperties = unsafe extern "system" fn(
        *const c_char,
        *mut u32,
        *mut vk::ExtensionProperties,
    ) -> vk::Result;

    pub type EnumeratePhysicalDevices =
        unsafe extern "system" fn(vk::Instance, *mut u32, *mut vk::PhysicalDevice) -> vk::Result;
    pub type GetPhysicalDeviceProperties =
        unsafe extern "system" fn(vk::PhysicalDevice, *mut vk::PhysicalDeviceProperties);
    pub type GetPhysicalDeviceFeatures =
        unsafe extern "system" fn(vk::PhysicalDevice, *mut vk::PhysicalDeviceFeatures);
    pub type GetPhysicalDeviceMemoryProperties =
        unsafe extern "system" fn(vk::PhysicalDevice, *mut vk::PhysicalDeviceMemoryProperties);
    pub type GetPhysicalDeviceFormatProperties =
        unsafe extern "system" fn(vk::PhysicalDevice, vk::Format, *mut vk::FormatProperties);
    pub type GetPhysicalDeviceQueueFamilyProperties =
        unsafe extern "system" fn(vk::PhysicalDevice, *mut u32, *mut vk::QueueFamilyProperties);
    pub type EnumerateDeviceExtensionProperties = unsafe extern "system" fn(
        vk::PhysicalDevice,
        *const c_char,
        *mut u32,
        *mut vk::ExtensionProperties,
    ) -> vk::Result;
    pub type CreateDevice = unsafe extern "system" fn(
        vk::PhysicalDevice,
        *const vk::DeviceCreateInfo,
        *const vk::AllocationCallbacks,
        *mut vk::Device,
    ) -> vk::Result;

    pub type DestroyDevice = unsafe extern "system" fn(vk::Device, *const vk::AllocationCallbacks);
    pub type GetDeviceQueue = unsafe extern "system" fn(vk::Device, u32, u32, *mut vk::Queue);
    pub type QueueSubmit = unsafe extern "system" fn(
        vk::Queue,
        u32,
        *const vk::SubmitInfo,
        vk::Fence,
    ) -> vk::Result;
    pub type QueueWaitIdle = unsafe extern "system" fn(vk::Queue) -> vk::Result;
    pub type DeviceWaitIdle = unsafe extern "system" fn(vk::Device) -> vk::Result;
    pub type CreateCommandPool = unsafe extern "system" fn(
        vk::Device,
        *const vk::CommandPoolCreateInfo,
        *const vk::AllocationCallbacks,
        *mut vk::CommandPool,
    ) -> vk::Result;
    pub type DestroyCommandPool =
        unsafe extern "system" fn(vk::Device, vk::CommandPool, *const vk::AllocationCallbacks);
    pub type AllocateCommandBuffers = unsafe extern "system" fn(
        vk::Device,
        *const vk::CommandBufferAllocateInfo,
        *mut vk::CommandBuffer,
    ) -> vk::Result;
    pub type FreeCommandBuffers =
        unsafe extern "system" fn(vk::Device, vk::CommandPool, u32, *const vk::CommandBuffer);
    pub type BeginCommandBuffer = unsafe extern "system" fn(
        vk::CommandBuffer,
        *const vk::CommandBufferBeginInfo,
    ) -> vk::Result;
    pub type EndCommandBuffer = unsafe extern "system" fn(vk::CommandBuffer) -> vk::Result;
    pub type ResetCommandBuffer =
        unsafe extern "system" fn(vk::CommandBuffer, vk::CommandBufferResetFlags) -> vk::Result;
    pub type CmdExecuteCommands =
        unsafe extern "system" fn(vk::CommandBuffer, u32, *const vk::CommandBuffer);

    pub type CreateXlibSurfaceKHR = unsafe extern "system" fn(
        vk::Instance,
        *const vk::XlibSurfaceCreateInfoKHR,
        *const vk::AllocationCallbacks,
        *mut vk::SurfaceKHR,
    ) -> vk::Result;
    pub type DestroySurfaceKHR =
        unsafe extern "system" fn(vk::Instance, vk::SurfaceKHR, *const vk::AllocationCallbacks);
    pub type GetPhysicalDeviceSurfaceSupportKHR = unsafe extern "system" fn(
        vk::PhysicalDevice,
        u32,
        vk::SurfaceKHR,
        *mut vk::Bool32,
    ) -> vk::Result;
    pub type GetPhysicalDeviceSurfaceCapabilitiesKHR = unsafe extern "system" fn(
        vk::PhysicalDevice,
        vk::SurfaceKHR,
        *mut vk::SurfaceCapabilitiesKHR,
    ) -> vk::Result;
    pub type GetPhysicalDeviceSurfaceFormatsKHR = unsafe extern "system" fn(
        vk::PhysicalDevice,
        vk::SurfaceKHR,
        *mut u32,
        *mut vk::SurfaceFormatKHR,
    ) -> vk::Result;
    pub type GetPhysicalDeviceSurfacePresentModesKHR = unsafe extern "system" fn(
        vk::PhysicalDevice,
        vk::SurfaceKHR,
        *mut u32,
        *mut vk::PresentModeKHR,
    ) -> vk::Result;
    pub type GetPhysicalDeviceXlibPresentationSupportKHR = unsafe extern "system" fn(
        vk::PhysicalDevice,
        u32,
        *mut vk::Display,
        vk::VisualID,
    ) -> vk::Bool32;

    pub type CreateSwapchainKHR = unsafe extern "system" fn(
        vk::Device,
        *const vk::SwapchainCreateInfoKHR,
        *const vk::AllocationCallbacks,
        *mut vk::SwapchainKHR,
    ) -> vk::Result;
    pub type DestroySwapchainKHR =
        unsafe extern "system" fn(vk::Device, vk::SwapchainKHR, *const vk::AllocationCallbacks);
    pub type GetSwapchainImagesKHR = unsafe extern "system" fn(
        vk::Device,
        vk::SwapchainKHR,
        *mut u32,
        *mut vk::Image,
    ) -> vk::Result;
    pub type AcquireNextImageKHR = unsafe extern "system" fn(
        vk::Device,
        vk::SwapchainKHR,
        u64,
        vk::Semaphore,
        vk::Fence,
        *mut u32,
    ) -> vk::Result;
    pub type QueuePresentKHR =
        unsafe extern "system" fn(vk::Queue, *const vk::PresentInfoKHR) -> vk::Result;
}

/// Resolves a required entry point or fails the surrounding `load`.
macro_rules! require {
    ($loader:expr, $handle:expr, $name:literal) => {
        match unsafe { ($loader)($handle, concat!($name, "\0").as_ptr().cast()) } {
            Some(f) => unsafe { ::std::mem::transmute(f) },
            None => return Err(Error::MissingEntryPoint($name)),
        }
    };
}

/// Resolves an extension entry point or abandons the whole sub-table.
macro_rules! optional {
    ($loader:expr, $handle:expr, $name:literal) => {
        match unsafe { ($loader)($handle, concat!($name, "\0").as_ptr().cast()) } {
            Some(f) => unsafe { ::std::mem::transmute(f) },
            None => {
                log::debug!("native driver does not expose {}", $name);
                return None;
            }
        }
    };
}

/// Surface-related instance functions, present only when the native driver
/// exposes `VK_KHR_surface` and `VK_KHR_xlib_surface`.
pub struct SurfaceFns {
    pub create_xlib_surface: pfn::CreateXlibSurfaceKHR,
    pub destroy_surface: pfn::DestroySurfaceKHR,
    pub get_physical_device_surface_support: pfn::GetPhysicalDeviceSurfaceSupportKHR,
    pub get_physical_device_surface_capabilities: pfn::GetPhysicalDeviceSurfaceCapabilitiesKHR,
    pub get_physical_device_surface_formats: pfn::GetPhysicalDeviceSurfaceFormatsKHR,
    pub get_physical_device_surface_present_modes: pfn::GetPhysicalDeviceSurfacePresentModesKHR,
    pub get_physical_device_xlib_presentation_support:
        pfn::GetPhysicalDeviceXlibPresentationSupportKHR,
}

impl SurfaceFns {
    fn load(instance: vk::Instance, gipa: pfn::GetInstanceProcAddr) -> Option<SurfaceFns> {
        Some(SurfaceFns {
            create_xlib_surface: optional!(gipa, instance, "vkCreateXlibSurfaceKHR"),
            destroy_surface: optional!(gipa, instance, "vkDestroySurfaceKHR"),
            get_physical_device_surface_support: optional!(
                gipa,
                instance,
                "vkGetPhysicalDeviceSurfaceSupportKHR"
            ),
            get_physical_device_surface_capabilities: optional!(
                gipa,
                instance,
                "vkGetPhysicalDeviceSurfaceCapabilitiesKHR"
            ),
            get_physical_device_surface_formats: optional!(
                gipa,
                instance,
                "vkGetPhysicalDeviceSurfaceFormatsKHR"
            ),
            get_physical_device_surface_present_modes: optional!(
                gipa,
                instance,
                "vkGetPhysicalDeviceSurfacePresentModesKHR"
            ),
            get_physical_device_xlib_presentation_support: optional!(
                gipa,
                instance,
                "vkGetPhysicalDeviceXlibPresentationSupportKHR"
            ),
        })
    }
}

/// Instance-scoped function table, resolved once at instance creation.
pub struct InstanceFns {
    pub destroy_instance: pfn::DestroyInstance,
    pub enumerate_physical_devices: pfn::EnumeratePhysicalDevices,
    pub get_physical_device_properties: pfn::GetPhysicalDeviceProperties,
    pub get_physical_device_features: pfn::GetPhysicalDeviceFeatures,
    pub get_physical_device_memory_properties: pfn::GetPhysicalDeviceMemoryProperties,
    pub get_physical_device_format_properties: pfn::GetPhysicalDeviceFormatProperties,
    pub get_physical_device_queue_family_properties: pfn::GetPhysicalDeviceQueueFamilyProperties,
    pub enumerate_device_extension_properties: pfn::EnumerateDeviceExtensionProperties,
    pub create_device: pfn::CreateDevice,
    pub get_device_proc_addr: pfn::GetDeviceProcAddr,
    pub surface: Option<SurfaceFns>,
}

impl InstanceFns {
    /// Resolves the instance function subset through the native
    /// `vkGetInstanceProcAddr`.
    ///
    /// # Safety
    ///
    /// `instance` must be a live native instance handle and `gipa` the
    /// native resolver it was created from.
    pub unsafe fn load(
        instance: vk::Instance,
        gipa: pfn::GetInstanceProcAddr,
    ) -> Result<InstanceFns, Error> {
        Ok(InstanceFns {
            destroy_instance: require!(gipa, instance, "vkDestroyInstance"),
            enumerate_physical_devices: require!(gipa, instance, "vkEnumeratePhysicalDevices"),
            get_physical_device_properties: require!(
                gipa,
                instance,
                "vkGetPhysicalDeviceProperties"
            ),
            get_physical_device_features: require!(gipa, instance, "vkGetPhysicalDeviceFeatures"),
            get_physical_device_memory_properties: require!(
                gipa,
                instance,
                "vkGetPhysicalDeviceMemoryProperties"
            ),
            get_physical_device_format_properties: require!(
                gipa,
                instance,
                "vkGetPhysicalDeviceFormatProperties"
            ),
            get_physical_device_queue_family_properties: require!(
                gipa,
                instance,
                "vkGetPhysicalDeviceQueueFamilyProperties"
            ),
            enumerate_device_extension_properties: require!(
                gipa,
                instance,
                "vkEnumerateDeviceExtensionProperties"
            ),
            create_device: require!(gipa, instance, "vkCreateDevice"),
            get_device_proc_addr: require!(gipa, instance, "vkGetDeviceProcAddr"),
            surface: SurfaceFns::load(instance, gipa),
        })
    }
}

/// Swapchain functions, present only when the native driver exposes
/// `VK_KHR_swapchain` for the device.
pub struct SwapchainFns {
    pub create_swapchain: pfn::CreateSwapchainKHR,
    pub destroy_swapchain: pfn::DestroySwapchainKHR,
    pub get_swapchain_images: pfn::GetSwapchainImagesKHR,
    pub acquire_next_image: pfn::AcquireNextImageKHR,
    pub queue_present: pfn::QueuePresentKHR,
}

impl SwapchainFns {
    fn load(device: vk::Device, gdpa: pfn::GetDeviceProcAddr) -> Option<SwapchainFns> {
        Some(SwapchainFns {
            create_swapchain: optional!(gdpa, device, "vkCreateSwapchainKHR"),
            destroy_swapchain: optional!(gdpa, device, "vkDestroySwapchainKHR"),
            get_swapchain_images: optional!(gdpa, device, "vkGetSwapchainImagesKHR"),
            acquire_next_image: optional!(gdpa, device, "vkAcquireNextImageKHR"),
            queue_present: optional!(gdpa, device, "vkQueuePresentKHR"),
        })
    }
}

/// Device-scoped function table, resolved once at device creation.
pub struct DeviceFns {
    pub destroy_device: pfn::DestroyDevice,
    pub get_device_queue: pfn::GetDeviceQueue,
    pub queue_submit: pfn::QueueSubmit,
    pub queue_wait_idle: pfn::QueueWaitIdle,
    pub device_wait_idle: pfn::DeviceWaitIdle,
    pub create_command_pool: pfn::CreateCommandPool,
    pub destroy_command_pool: pfn::DestroyCommandPool,
    pub allocate_command_buffers: pfn::AllocateCommandBuffers,
    pub free_command_buffers: pfn::FreeCommandBuffers,
    pub begin_command_buffer: pfn::BeginCommandBuffer,
    pub end_command_buffer: pfn::EndCommandBuffer,
    pub reset_command_buffer: pfn::ResetCommandBuffer,
    pub cmd_execute_commands: pfn::CmdExecuteCommands,
    pub swapchain: Option<SwapchainFns>,
}

impl DeviceFns {
    /// Resolves the device function subset through the native
    /// `vkGetDeviceProcAddr`.
    ///
    /// # Safety
    ///
    /// `device` must be a live native device handle and `gdpa` the native
    /// resolver of the instance it was created from.
    pub unsafe fn load(
        device: vk::Device,
        gdpa: pfn::GetDeviceProcAddr,
    ) -> Result<DeviceFns, Error> {
        Ok(DeviceFns {
            destroy_device: require!(gdpa, device, "vkDestroyDevice"),
            get_device_queue: require!(gdpa, device, "vkGetDeviceQueue"),
            queue_submit: require!(gdpa, device, "vkQueueSubmit"),
            queue_wait_idle: require!(gdpa, device, "vkQueueWaitIdle"),
            device_wait_idle: require!(gdpa, device, "vkDeviceWaitIdle"),
            create_command_pool: require!(gdpa, device, "vkCreateCommandPool"),
            destroy_command_pool: require!(gdpa, device, "vkDestroyCommandPool"),
            allocate_command_buffers: require!(gdpa, device, "vkAllocateCommandBuffers"),
            free_command_buffers: require!(gdpa, device, "vkFreeCommandBuffers"),
            begin_command_buffer: require!(gdpa, device, "vkBeginCommandBuffer"),
            end_command_buffer: require!(gdpa, device, "vkEndCommandBuffer"),
            reset_command_buffer: require!(gdpa, device, "vkResetCommandBuffer"),
            cmd_execute_commands: require!(gdpa, device, "vkCmdExecuteCommands"),
            swapchain: SwapchainFns::load(device, gdpa),
        })
    }

    /// Last-resort teardown used when table resolution itself fails partway
    /// through device construction: fetch `vkDestroyDevice` alone so the
    /// native device does not leak.
    ///
    /// # Safety
    ///
    /// Same contract as [`DeviceFns::load`].
    pub unsafe fn destroy_orphan(device: vk::Device, gdpa: pfn::GetDeviceProcAddr) {
        let name = "vkDestroyDevice\0";
        if let Some(f) = unsafe { gdpa(device, name.as_ptr().cast()) } {
            let destroy: pfn::DestroyDevice = unsafe { std::mem::transmute(f) };
            unsafe { destroy(device, std::ptr::null()) };
        } else {
            log::error!("cannot resolve vkDestroyDevice; native device handle leaked");
        }
    }
}
