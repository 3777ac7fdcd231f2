//! Surface proxies and the window-system seam.
//!
//! Applications hand this layer win32-style surface create infos; the native
//! driver only understands xlib surfaces. The [`WindowSystem`] trait is the
//! seam between the two: it turns a foreign window handle into a native
//! drawable and owns the connection to the native display. Exactly one
//! implementation can be installed per process.

use std::ptr;

use ash::vk;
use once_cell::sync::OnceCell;

use crate::{
    error::Error,
    fns::SurfaceFns,
    instance::{Instance, PhysicalDevice},
    proxy::{self, HandleKind, Proxy, ProxyHeader},
};

/// Bridges foreign window handles to native drawables.
pub trait WindowSystem: Send + Sync {
    /// Creates a native drawable backing the given foreign window, or `None`
    /// when the window cannot be mapped.
    fn create_drawable(&self, window: vk::HWND) -> Option<vk::Window>;

    /// Releases a drawable previously returned by
    /// [`create_drawable`](WindowSystem::create_drawable).
    fn destroy_drawable(&self, drawable: vk::Window);

    /// The native display connection surfaces are created against.
    fn display(&self) -> *mut vk::Display;

    /// Visual used for presentation-support queries that have no concrete
    /// drawable yet.
    fn default_visual(&self) -> vk::VisualID;
}

static WINDOW_SYSTEM: OnceCell<Box<dyn WindowSystem>> = OnceCell::new();

/// Installs the process-wide window system. Fails if one is already
/// installed, returning the rejected implementation.
pub fn install_window_system(
    window_system: Box<dyn WindowSystem>,
) -> Result<(), Box<dyn WindowSystem>> {
    WINDOW_SYSTEM.set(window_system)
}

fn window_system() -> Option<&'static dyn WindowSystem> {
    WINDOW_SYSTEM.get().map(|ws| &**ws)
}

/// Proxy standing in for a native `VkSurfaceKHR`, paired with the drawable
/// created for it.
#[repr(C)]
pub struct Surface {
    header: ProxyHeader,
    pub(crate) instance: *mut Instance,
    drawable: vk::Window,
    pub(crate) native: vk::SurfaceKHR,
}

unsafe impl Proxy for Surface {
    const KIND: HandleKind = HandleKind::Surface;
    type Handle = vk::SurfaceKHR;

    fn header(&self) -> &ProxyHeader {
        &self.header
    }
}

fn surface_fns(instance: &Instance) -> Result<&SurfaceFns, vk::Result> {
    instance.fns.surface.as_ref().ok_or_else(|| {
        log::error!("native driver does not support surface extensions");
        vk::Result::ERROR_EXTENSION_NOT_PRESENT
    })
}

/// `vkCreateWin32SurfaceKHR`
///
/// Creates a drawable for the foreign window, then the native xlib surface
/// over it. If the native creation fails, the drawable is destroyed again.
pub unsafe extern "system" fn create_win32_surface(
    instance: vk::Instance,
    p_create_info: *const vk::Win32SurfaceCreateInfoKHR,
    p_allocator: *const vk::AllocationCallbacks,
    p_surface: *mut vk::SurfaceKHR,
) -> vk::Result {
    log::debug!(
        "vkCreateWin32SurfaceKHR {:?} {:?} {:?} {:?}",
        instance,
        p_create_info,
        p_allocator,
        p_surface
    );

    if !p_allocator.is_null() {
        log::warn!("allocation callbacks are not supported; ignoring");
    }

    let instance_proxy = unsafe { proxy::as_mut::<Instance>(instance) };
    let fns = match surface_fns(instance_proxy) {
        Ok(fns) => fns,
        Err(code) => return code,
    };

    let ws = match window_system() {
        Some(ws) => ws,
        None => {
            log::error!("{}", Error::NoWindowSystem);
            return Error::NoWindowSystem.result_code();
        }
    };

    let create_info = unsafe { &*p_create_info };
    let drawable = match ws.create_drawable(create_info.hwnd) {
        Some(drawable) => drawable,
        None => {
            log::error!("{}", Error::DrawableCreation);
            return Error::DrawableCreation.result_code();
        }
    };

    let xlib_info = vk::XlibSurfaceCreateInfoKHR {
        s_type: vk::StructureType::XLIB_SURFACE_CREATE_INFO_KHR,
        p_next: ptr::null(),
        flags: vk::XlibSurfaceCreateFlagsKHR::empty(),
        dpy: ws.display(),
        window: drawable,
    };

    let mut native = vk::SurfaceKHR::null();
    let res = unsafe {
        (fns.create_xlib_surface)(instance_proxy.native, &xlib_info, ptr::null(), &mut native)
    };
    if res != vk::Result::SUCCESS {
        log::error!("native surface creation failed: {:?}", res);
        ws.destroy_drawable(drawable);
        return res;
    }

    let surface = Box::new(Surface {
        header: ProxyHeader::new(HandleKind::Surface),
        instance: instance_proxy as *mut Instance,
        drawable,
        native,
    });

    unsafe { *p_surface = proxy::wrap(surface) };
    vk::Result::SUCCESS
}

/// `vkDestroySurfaceKHR`
///
/// Destroys the native surface before the drawable under it.
pub unsafe extern "system" fn destroy_surface(
    instance: vk::Instance,
    surface: vk::SurfaceKHR,
    p_allocator: *const vk::AllocationCallbacks,
) {
    log::debug!(
        "vkDestroySurfaceKHR {:?} {:?} {:?}",
        instance,
        surface,
        p_allocator
    );

    if surface == vk::SurfaceKHR::null() {
        return;
    }

    let proxy = unsafe { proxy::reclaim::<Surface>(surface) };
    let instance_proxy = unsafe { &*proxy.instance };

    // A surface proxy can only exist if the surface table resolved.
    if let Some(fns) = instance_proxy.fns.surface.as_ref() {
        unsafe { (fns.destroy_surface)(instance_proxy.native, proxy.native, ptr::null()) };
    }
    if let Some(ws) = window_system() {
        ws.destroy_drawable(proxy.drawable);
    }
}

/// `vkGetPhysicalDeviceSurfaceSupportKHR`
pub unsafe extern "system" fn get_physical_device_surface_support(
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
    surface: vk::SurfaceKHR,
    p_supported: *mut vk::Bool32,
) -> vk::Result {
    let phys = unsafe { proxy::as_ref::<PhysicalDevice>(physical_device) };
    let surface_proxy = unsafe { proxy::as_ref::<Surface>(surface) };
    let fns = match surface_fns(unsafe { &*phys.instance }) {
        Ok(fns) => fns,
        Err(code) => return code,
    };

    unsafe {
        (fns.get_physical_device_surface_support)(
            phys.native,
            queue_family_index,
            surface_proxy.native,
            p_supported,
        )
    }
}

/// `vkGetPhysicalDeviceSurfaceCapabilitiesKHR`
pub unsafe extern "system" fn get_physical_device_surface_capabilities(
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    p_capabilities: *mut vk::SurfaceCapabilitiesKHR,
) -> vk::Result {
    let phys = unsafe { proxy::as_ref::<PhysicalDevice>(physical_device) };
    let surface_proxy = unsafe { proxy::as_ref::<Surface>(surface) };
    let fns = match surface_fns(unsafe { &*phys.instance }) {
        Ok(fns) => fns,
        Err(code) => return code,
    };

    unsafe {
        (fns.get_physical_device_surface_capabilities)(
            phys.native,
            surface_proxy.native,
            p_capabilities,
        )
    }
}

/// `vkGetPhysicalDeviceSurfaceFormatsKHR`
///
/// The two-call protocol runs in the native driver; pointers pass through.
pub unsafe extern "system" fn get_physical_device_surface_formats(
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    p_count: *mut u32,
    p_formats: *mut vk::SurfaceFormatKHR,
) -> vk::Result {
    let phys = unsafe { proxy::as_ref::<PhysicalDevice>(physical_device) };
    let surface_proxy = unsafe { proxy::as_ref::<Surface>(surface) };
    let fns = match surface_fns(unsafe { &*phys.instance }) {
        Ok(fns) => fns,
        Err(code) => return code,
    };

    unsafe {
        (fns.get_physical_device_surface_formats)(
            phys.native,
            surface_proxy.native,
            p_count,
            p_formats,
        )
    }
}

/// `vkGetPhysicalDeviceSurfacePresentModesKHR`
pub unsafe extern "system" fn get_physical_device_surface_present_modes(
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    p_count: *mut u32,
    p_present_modes: *mut vk::PresentModeKHR,
) -> vk::Result {
    let phys = unsafe { proxy::as_ref::<PhysicalDevice>(physical_device) };
    let surface_proxy = unsafe { proxy::as_ref::<Surface>(surface) };
    let fns = match surface_fns(unsafe { &*phys.instance }) {
        Ok(fns) => fns,
        Err(code) => return code,
    };

    unsafe {
        (fns.get_physical_device_surface_present_modes)(
            phys.native,
            surface_proxy.native,
            p_count,
            p_present_modes,
        )
    }
}

/// `vkGetPhysicalDeviceWin32PresentationSupportKHR`
///
/// Answered through the native xlib query using the window system's display
/// and default visual. Without a window system or surface support there is
/// nothing to present to.
pub unsafe extern "system" fn get_physical_device_win32_presentation_support(
    physical_device: vk::PhysicalDevice,
    queue_family_index: u32,
) -> vk::Bool32 {
    let phys = unsafe { proxy::as_ref::<PhysicalDevice>(physical_device) };
    let fns = match surface_fns(unsafe { &*phys.instance }) {
        Ok(fns) => fns,
        Err(_) => return vk::FALSE,
    };
    let ws = match window_system() {
        Some(ws) => ws,
        None => {
            log::warn!("{}", Error::NoWindowSystem);
            return vk::FALSE;
        }
    };

    unsafe {
        (fns.get_physical_device_xlib_presentation_support)(
            phys.native,
            queue_family_index,
            ws.display(),
            ws.default_visual(),
        )
    }
}
