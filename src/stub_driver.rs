//! An in-process native driver stub for the unit tests.
//!
//! The stub records every call it receives in a global state block and can
//! be told to fail at specific points, which is how the rollback paths are
//! exercised. Tests serialize on [`begin`], which also installs the stub
//! capability table and resets the recorded state.

use std::{ffi::CStr, os::raw::c_char, slice};

use ash::vk::{self, Handle};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};

use crate::{
    extensions,
    native::{self, GlobalFns},
    surface::WindowSystem,
};

const RAW_INSTANCE: u64 = 0x1000;
const RAW_PHYSICAL_DEVICES: [u64; 2] = [0x2001, 0x2002];
const RAW_DEVICE: u64 = 0x3000;
const RAW_QUEUE_BASE: u64 = 0x4000;
const RAW_COMMAND_BUFFER_BASE: u64 = 0x5000;
const RAW_SURFACE: u64 = 0x6000;
const RAW_SWAPCHAIN: u64 = 0x7000;
const RAW_COMMAND_POOL: u64 = 0x8000;
const RAW_IMAGE_BASE: u64 = 0x9000;
const RAW_DRAWABLE_BASE: u64 = 0xD000;

pub static NATIVE_PHYSICAL_DEVICES: Lazy<[vk::PhysicalDevice; 2]> = Lazy::new(|| {
    [
        vk::PhysicalDevice::from_raw(RAW_PHYSICAL_DEVICES[0]),
        vk::PhysicalDevice::from_raw(RAW_PHYSICAL_DEVICES[1]),
    ]
});
pub static NATIVE_SURFACE: Lazy<vk::SurfaceKHR> =
    Lazy::new(|| vk::SurfaceKHR::from_raw(RAW_SURFACE));
pub static NATIVE_SWAPCHAIN: Lazy<vk::SwapchainKHR> =
    Lazy::new(|| vk::SwapchainKHR::from_raw(RAW_SWAPCHAIN));

pub const FAKE_VISUAL: vk::VisualID = 0x2A;

pub fn native_queue(family: u32, index: u32) -> vk::Queue {
    vk::Queue::from_raw(RAW_QUEUE_BASE + u64::from(family) * 0x10 + u64::from(index))
}

/// Instance create info as the stub driver saw it.
pub struct CapturedInstanceCreateInfo {
    pub p_next_was_null: bool,
    pub layer_count: u32,
    pub extensions: Vec<String>,
}

#[derive(Default)]
pub struct StubState {
    pub instances_created: u32,
    pub instances_destroyed: u32,
    pub instance_create_info: Option<CapturedInstanceCreateInfo>,
    pub physical_device_fill_calls: u32,

    pub devices_created: u32,
    pub devices_destroyed: u32,
    pub submits: Vec<Vec<u64>>,
    pub executed_command_buffers: Vec<Vec<u64>>,
    pub freed_command_buffers: Vec<Vec<u64>>,
    pub allocated_command_buffers: u32,

    pub drawables_created: Vec<u64>,
    pub drawables_destroyed: Vec<u64>,
    pub xlib_surface_windows: Vec<u64>,
    pub surfaces_destroyed: u32,
    pub queried_surfaces: Vec<u64>,
    pub presentation_support_visuals: Vec<vk::VisualID>,

    pub swapchain_surfaces: Vec<u64>,
    pub swapchain_old_swapchains: Vec<u64>,
    pub swapchains_destroyed: u32,
    pub acquire_timeouts: Vec<u64>,
    pub presents: Vec<Vec<u64>>,

    // Failure knobs.
    pub hide_instance_symbol: Option<&'static str>,
    pub hide_device_symbol: Option<&'static str>,
    pub fail_create_device: bool,
    pub fail_queue_family: Option<u32>,
    pub cb_fail_after: Option<u32>,
    pub fail_create_xlib_surface: bool,
    pub fail_drawable: bool,
}

static SERIAL: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static STATE: Lazy<Mutex<StubState>> = Lazy::new(|| Mutex::new(StubState::default()));

/// Serializes the calling test against every other stub-driven test,
/// installs the stub capability table and resets the recorded state. Hold
/// the returned guard for the whole test.
pub fn begin() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock();
    install();
    *STATE.lock() = StubState::default();
    guard
}

/// Runs `f` on the recorded state. Must not be held across shim calls; the
/// stub entry points take the same lock.
pub fn with_state<R>(f: impl FnOnce(&mut StubState) -> R) -> R {
    f(&mut STATE.lock())
}

/// Seeds the process-wide capability table with the stub driver.
pub fn install() {
    native::install_for_tests(GlobalFns {
        create_instance: stub_create_instance,
        destroy_instance: stub_destroy_instance,
        enumerate_instance_extension_properties: stub_enumerate_instance_extension_properties,
        get_instance_proc_addr: stub_get_instance_proc_addr,
        get_device_proc_addr: stub_get_device_proc_addr,
    });
}

/// Installs the fake window system; a no-op if one is already in place.
pub fn install_window_system() {
    let _ = crate::surface::install_window_system(Box::new(FakeWindowSystem));
}

pub struct FakeWindowSystem;

impl WindowSystem for FakeWindowSystem {
    fn create_drawable(&self, _window: vk::HWND) -> Option<vk::Window> {
        let mut state = STATE.lock();
        if state.fail_drawable {
            return None;
        }
        let drawable = RAW_DRAWABLE_BASE + state.drawables_created.len() as u64;
        state.drawables_created.push(drawable);
        Some(drawable as vk::Window)
    }

    fn destroy_drawable(&self, drawable: vk::Window) {
        STATE.lock().drawables_destroyed.push(drawable as u64);
    }

    fn display(&self) -> *mut vk::Display {
        static DISPLAY: u8 = 0;
        &DISPLAY as *const u8 as *mut vk::Display
    }

    fn default_visual(&self) -> vk::VisualID {
        FAKE_VISUAL
    }
}

fn export(f: *const ()) -> vk::PFN_vkVoidFunction {
    Some(unsafe { std::mem::transmute::<*const (), unsafe extern "system" fn()>(f) })
}

macro_rules! symbol {
    ($f:path) => {
        export($f as *const ())
    };
}

unsafe extern "system" fn stub_get_instance_proc_addr(
    _instance: vk::Instance,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    let name = unsafe { CStr::from_ptr(p_name) }.to_bytes();
    if let Some(hidden) = STATE.lock().hide_instance_symbol {
        if name == hidden.as_bytes() {
            return None;
        }
    }

    match name {
        b"vkDestroyInstance" => symbol!(stub_destroy_instance),
        b"vkEnumeratePhysicalDevices" => symbol!(stub_enumerate_physical_devices),
        b"vkGetPhysicalDeviceProperties" => symbol!(stub_get_physical_device_properties),
        b"vkGetPhysicalDeviceFeatures" => symbol!(stub_get_physical_device_features),
        b"vkGetPhysicalDeviceMemoryProperties" => {
            symbol!(stub_get_physical_device_memory_properties)
        }
        b"vkGetPhysicalDeviceFormatProperties" => {
            symbol!(stub_get_physical_device_format_properties)
        }
        b"vkGetPhysicalDeviceQueueFamilyProperties" => {
            symbol!(stub_get_physical_device_queue_family_properties)
        }
        b"vkEnumerateDeviceExtensionProperties" => {
            symbol!(stub_enumerate_device_extension_properties)
        }
        b"vkCreateDevice" => symbol!(stub_create_device),
        b"vkGetDeviceProcAddr" => symbol!(stub_get_device_proc_addr),
        b"vkCreateXlibSurfaceKHR" => symbol!(stub_create_xlib_surface),
        b"vkDestroySurfaceKHR" => symbol!(stub_destroy_surface),
        b"vkGetPhysicalDeviceSurfaceSupportKHR" => symbol!(stub_surface_support),
        b"vkGetPhysicalDeviceSurfaceCapabilitiesKHR" => symbol!(stub_surface_capabilities),
        b"vkGetPhysicalDeviceSurfaceFormatsKHR" => symbol!(stub_surface_formats),
        b"vkGetPhysicalDeviceSurfacePresentModesKHR" => symbol!(stub_surface_present_modes),
        b"vkGetPhysicalDeviceXlibPresentationSupportKHR" => {
            symbol!(stub_xlib_presentation_support)
        }
        _ => None,
    }
}

unsafe extern "system" fn stub_get_device_proc_addr(
    _device: vk::Device,
    p_name: *const c_char,
) -> vk::PFN_vkVoidFunction {
    let name = unsafe { CStr::from_ptr(p_name) }.to_bytes();
    if let Some(hidden) = STATE.lock().hide_device_symbol {
        if name == hidden.as_bytes() {
            return None;
        }
    }

    match name {
        b"vkDestroyDevice" => symbol!(stub_destroy_device),
        b"vkGetDeviceQueue" => symbol!(stub_get_device_queue),
        b"vkQueueSubmit" => symbol!(stub_queue_submit),
        b"vkQueueWaitIdle" => symbol!(stub_queue_wait_idle),
        b"vkDeviceWaitIdle" => symbol!(stub_device_wait_idle),
        b"vkCreateCommandPool" => symbol!(stub_create_command_pool),
        b"vkDestroyCommandPool" => symbol!(stub_destroy_command_pool),
        b"vkAllocateCommandBuffers" => symbol!(stub_allocate_command_buffers),
        b"vkFreeCommandBuffers" => symbol!(stub_free_command_buffers),
        b"vkBeginCommandBuffer" => symbol!(stub_begin_command_buffer),
        b"vkEndCommandBuffer" => symbol!(stub_end_command_buffer),
        b"vkResetCommandBuffer" => symbol!(stub_reset_command_buffer),
        b"vkCmdExecuteCommands" => symbol!(stub_cmd_execute_commands),
        b"vkCreateSwapchainKHR" => symbol!(stub_create_swapchain),
        b"vkDestroySwapchainKHR" => symbol!(stub_destroy_swapchain),
        b"vkGetSwapchainImagesKHR" => symbol!(stub_get_swapchain_images),
        b"vkAcquireNextImageKHR" => symbol!(stub_acquire_next_image),
        b"vkQueuePresentKHR" => symbol!(stub_queue_present),
        _ => None,
    }
}

unsafe extern "system" fn stub_create_instance(
    p_create_info: *const vk::InstanceCreateInfo,
    _p_allocator: *const vk::AllocationCallbacks,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    let create_info = unsafe { &*p_create_info };
    let extensions = if create_info.enabled_extension_count > 0 {
        unsafe {
            slice::from_raw_parts(
                create_info.pp_enabled_extension_names,
                create_info.enabled_extension_count as usize,
            )
        }
        .iter()
        .map(|&name| {
            unsafe { CStr::from_ptr(name) }
                .to_string_lossy()
                .into_owned()
        })
        .collect()
    } else {
        Vec::new()
    };

    let mut state = STATE.lock();
    state.instances_created += 1;
    state.instance_create_info = Some(CapturedInstanceCreateInfo {
        p_next_was_null: create_info.p_next.is_null(),
        layer_count: create_info.enabled_layer_count,
        extensions,
    });

    unsafe { *p_instance = vk::Instance::from_raw(RAW_INSTANCE) };
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_destroy_instance(
    _instance: vk::Instance,
    _p_allocator: *const vk::AllocationCallbacks,
) {
    STATE.lock().instances_destroyed += 1;
}

unsafe extern "system" fn stub_enumerate_instance_extension_properties(
    _p_layer_name: *const c_char,
    p_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    let native = [
        extensions::make_properties("VK_KHR_surface", 25),
        extensions::make_properties("VK_KHR_xlib_surface", 4),
        extensions::make_properties("VK_EXT_debug_report", 9),
    ];
    unsafe { extensions::copy_out(&native, p_count, p_properties) }
}

unsafe extern "system" fn stub_enumerate_physical_devices(
    _instance: vk::Instance,
    p_count: *mut u32,
    p_physical_devices: *mut vk::PhysicalDevice,
) -> vk::Result {
    if !p_physical_devices.is_null() {
        STATE.lock().physical_device_fill_calls += 1;
    }
    unsafe { extensions::copy_out(&*NATIVE_PHYSICAL_DEVICES, p_count, p_physical_devices) }
}

unsafe extern "system" fn stub_get_physical_device_properties(
    _physical_device: vk::PhysicalDevice,
    p_properties: *mut vk::PhysicalDeviceProperties,
) {
    unsafe { *p_properties = vk::PhysicalDeviceProperties::default() };
}

unsafe extern "system" fn stub_get_physical_device_features(
    _physical_device: vk::PhysicalDevice,
    p_features: *mut vk::PhysicalDeviceFeatures,
) {
    unsafe { *p_features = vk::PhysicalDeviceFeatures::default() };
}

unsafe extern "system" fn stub_get_physical_device_memory_properties(
    _physical_device: vk::PhysicalDevice,
    p_memory_properties: *mut vk::PhysicalDeviceMemoryProperties,
) {
    unsafe { *p_memory_properties = vk::PhysicalDeviceMemoryProperties::default() };
}

unsafe extern "system" fn stub_get_physical_device_format_properties(
    _physical_device: vk::PhysicalDevice,
    _format: vk::Format,
    p_format_properties: *mut vk::FormatProperties,
) {
    unsafe { *p_format_properties = vk::FormatProperties::default() };
}

unsafe extern "system" fn stub_get_physical_device_queue_family_properties(
    _physical_device: vk::PhysicalDevice,
    p_count: *mut u32,
    p_properties: *mut vk::QueueFamilyProperties,
) {
    let families = [
        vk::QueueFamilyProperties {
            queue_count: 1,
            ..Default::default()
        },
        vk::QueueFamilyProperties {
            queue_count: 2,
            ..Default::default()
        },
        vk::QueueFamilyProperties {
            queue_count: 4,
            ..Default::default()
        },
    ];
    unsafe { extensions::copy_out(&families, p_count, p_properties) };
}

unsafe extern "system" fn stub_enumerate_device_extension_properties(
    _physical_device: vk::PhysicalDevice,
    _p_layer_name: *const c_char,
    p_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    let native = [
        extensions::make_properties("VK_KHR_swapchain", 70),
        extensions::make_properties("VK_NV_glsl_shader", 1),
    ];
    unsafe { extensions::copy_out(&native, p_count, p_properties) }
}

unsafe extern "system" fn stub_create_device(
    _physical_device: vk::PhysicalDevice,
    _p_create_info: *const vk::DeviceCreateInfo,
    _p_allocator: *const vk::AllocationCallbacks,
    p_device: *mut vk::Device,
) -> vk::Result {
    let mut state = STATE.lock();
    if state.fail_create_device {
        return vk::Result::ERROR_OUT_OF_HOST_MEMORY;
    }
    state.devices_created += 1;
    unsafe { *p_device = vk::Device::from_raw(RAW_DEVICE) };
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_destroy_device(
    _device: vk::Device,
    _p_allocator: *const vk::AllocationCallbacks,
) {
    STATE.lock().devices_destroyed += 1;
}

unsafe extern "system" fn stub_get_device_queue(
    _device: vk::Device,
    queue_family_index: u32,
    queue_index: u32,
    p_queue: *mut vk::Queue,
) {
    let failed = STATE.lock().fail_queue_family == Some(queue_family_index);
    let queue = if failed {
        vk::Queue::null()
    } else {
        native_queue(queue_family_index, queue_index)
    };
    unsafe { *p_queue = queue };
}

unsafe extern "system" fn stub_queue_submit(
    _queue: vk::Queue,
    submit_count: u32,
    p_submits: *const vk::SubmitInfo,
    _fence: vk::Fence,
) -> vk::Result {
    let submits = if submit_count > 0 {
        unsafe { slice::from_raw_parts(p_submits, submit_count as usize) }
    } else {
        &[]
    };

    let mut command_buffers = Vec::new();
    for submit in submits {
        if submit.command_buffer_count > 0 {
            let natives = unsafe {
                slice::from_raw_parts(
                    submit.p_command_buffers,
                    submit.command_buffer_count as usize,
                )
            };
            command_buffers.extend(natives.iter().map(|cb| cb.as_raw()));
        }
    }

    STATE.lock().submits.push(command_buffers);
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_queue_wait_idle(_queue: vk::Queue) -> vk::Result {
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_device_wait_idle(_device: vk::Device) -> vk::Result {
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_create_command_pool(
    _device: vk::Device,
    _p_create_info: *const vk::CommandPoolCreateInfo,
    _p_allocator: *const vk::AllocationCallbacks,
    p_command_pool: *mut vk::CommandPool,
) -> vk::Result {
    unsafe { *p_command_pool = vk::CommandPool::from_raw(RAW_COMMAND_POOL) };
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_destroy_command_pool(
    _device: vk::Device,
    _command_pool: vk::CommandPool,
    _p_allocator: *const vk::AllocationCallbacks,
) {
}

unsafe extern "system" fn stub_allocate_command_buffers(
    _device: vk::Device,
    p_allocate_info: *const vk::CommandBufferAllocateInfo,
    p_command_buffers: *mut vk::CommandBuffer,
) -> vk::Result {
    let allocate_info = unsafe { &*p_allocate_info };
    let mut state = STATE.lock();

    for i in 0..allocate_info.command_buffer_count {
        if let Some(limit) = state.cb_fail_after {
            if state.allocated_command_buffers >= limit {
                return vk::Result::ERROR_OUT_OF_DEVICE_MEMORY;
            }
        }
        let raw = RAW_COMMAND_BUFFER_BASE + u64::from(state.allocated_command_buffers);
        state.allocated_command_buffers += 1;
        unsafe { *p_command_buffers.add(i as usize) = vk::CommandBuffer::from_raw(raw) };
    }

    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_free_command_buffers(
    _device: vk::Device,
    _command_pool: vk::CommandPool,
    command_buffer_count: u32,
    p_command_buffers: *const vk::CommandBuffer,
) {
    let natives = if command_buffer_count > 0 {
        unsafe { slice::from_raw_parts(p_command_buffers, command_buffer_count as usize) }
    } else {
        &[]
    };
    STATE
        .lock()
        .freed_command_buffers
        .push(natives.iter().map(|cb| cb.as_raw()).collect());
}

unsafe extern "system" fn stub_begin_command_buffer(
    _command_buffer: vk::CommandBuffer,
    _p_begin_info: *const vk::CommandBufferBeginInfo,
) -> vk::Result {
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_end_command_buffer(
    _command_buffer: vk::CommandBuffer,
) -> vk::Result {
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_reset_command_buffer(
    _command_buffer: vk::CommandBuffer,
    _flags: vk::CommandBufferResetFlags,
) -> vk::Result {
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_cmd_execute_commands(
    _command_buffer: vk::CommandBuffer,
    command_buffer_count: u32,
    p_command_buffers: *const vk::CommandBuffer,
) {
    let natives = if command_buffer_count > 0 {
        unsafe { slice::from_raw_parts(p_command_buffers, command_buffer_count as usize) }
    } else {
        &[]
    };
    STATE
        .lock()
        .executed_command_buffers
        .push(natives.iter().map(|cb| cb.as_raw()).collect());
}

unsafe extern "system" fn stub_create_xlib_surface(
    _instance: vk::Instance,
    p_create_info: *const vk::XlibSurfaceCreateInfoKHR,
    _p_allocator: *const vk::AllocationCallbacks,
    p_surface: *mut vk::SurfaceKHR,
) -> vk::Result {
    let create_info = unsafe { &*p_create_info };
    let mut state = STATE.lock();
    if state.fail_create_xlib_surface {
        return vk::Result::ERROR_OUT_OF_HOST_MEMORY;
    }
    state.xlib_surface_windows.push(create_info.window as u64);

    unsafe { *p_surface = *NATIVE_SURFACE };
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_destroy_surface(
    _instance: vk::Instance,
    _surface: vk::SurfaceKHR,
    _p_allocator: *const vk::AllocationCallbacks,
) {
    STATE.lock().surfaces_destroyed += 1;
}

unsafe extern "system" fn stub_surface_support(
    _physical_device: vk::PhysicalDevice,
    _queue_family_index: u32,
    surface: vk::SurfaceKHR,
    p_supported: *mut vk::Bool32,
) -> vk::Result {
    STATE.lock().queried_surfaces.push(surface.as_raw());
    unsafe { *p_supported = vk::TRUE };
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_surface_capabilities(
    _physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    p_capabilities: *mut vk::SurfaceCapabilitiesKHR,
) -> vk::Result {
    STATE.lock().queried_surfaces.push(surface.as_raw());
    unsafe { *p_capabilities = vk::SurfaceCapabilitiesKHR::default() };
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_surface_formats(
    _physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    p_count: *mut u32,
    p_formats: *mut vk::SurfaceFormatKHR,
) -> vk::Result {
    STATE.lock().queried_surfaces.push(surface.as_raw());
    let formats = [vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    }];
    unsafe { extensions::copy_out(&formats, p_count, p_formats) }
}

unsafe extern "system" fn stub_surface_present_modes(
    _physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    p_count: *mut u32,
    p_present_modes: *mut vk::PresentModeKHR,
) -> vk::Result {
    STATE.lock().queried_surfaces.push(surface.as_raw());
    let modes = [vk::PresentModeKHR::FIFO];
    unsafe { extensions::copy_out(&modes, p_count, p_present_modes) }
}

unsafe extern "system" fn stub_xlib_presentation_support(
    _physical_device: vk::PhysicalDevice,
    _queue_family_index: u32,
    _dpy: *mut vk::Display,
    visual_id: vk::VisualID,
) -> vk::Bool32 {
    STATE.lock().presentation_support_visuals.push(visual_id);
    vk::TRUE
}

unsafe extern "system" fn stub_create_swapchain(
    _device: vk::Device,
    p_create_info: *const vk::SwapchainCreateInfoKHR,
    _p_allocator: *const vk::AllocationCallbacks,
    p_swapchain: *mut vk::SwapchainKHR,
) -> vk::Result {
    let create_info = unsafe { &*p_create_info };
    let mut state = STATE.lock();
    state.swapchain_surfaces.push(create_info.surface.as_raw());
    state
        .swapchain_old_swapchains
        .push(create_info.old_swapchain.as_raw());

    unsafe { *p_swapchain = *NATIVE_SWAPCHAIN };
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_destroy_swapchain(
    _device: vk::Device,
    _swapchain: vk::SwapchainKHR,
    _p_allocator: *const vk::AllocationCallbacks,
) {
    STATE.lock().swapchains_destroyed += 1;
}

unsafe extern "system" fn stub_get_swapchain_images(
    _device: vk::Device,
    _swapchain: vk::SwapchainKHR,
    p_count: *mut u32,
    p_images: *mut vk::Image,
) -> vk::Result {
    let images = [
        vk::Image::from_raw(RAW_IMAGE_BASE + 1),
        vk::Image::from_raw(RAW_IMAGE_BASE + 2),
    ];
    unsafe { extensions::copy_out(&images, p_count, p_images) }
}

unsafe extern "system" fn stub_acquire_next_image(
    _device: vk::Device,
    _swapchain: vk::SwapchainKHR,
    timeout: u64,
    _semaphore: vk::Semaphore,
    _fence: vk::Fence,
    p_image_index: *mut u32,
) -> vk::Result {
    STATE.lock().acquire_timeouts.push(timeout);
    unsafe { *p_image_index = 0 };
    vk::Result::SUCCESS
}

unsafe extern "system" fn stub_queue_present(
    _queue: vk::Queue,
    p_present_info: *const vk::PresentInfoKHR,
) -> vk::Result {
    let present_info = unsafe { &*p_present_info };
    let swapchains = if present_info.swapchain_count > 0 {
        unsafe {
            slice::from_raw_parts(
                present_info.p_swapchains,
                present_info.swapchain_count as usize,
            )
        }
    } else {
        &[]
    };
    STATE
        .lock()
        .presents
        .push(swapchains.iter().map(|swapchain| swapchain.as_raw()).collect());
    vk::Result::SUCCESS
}
