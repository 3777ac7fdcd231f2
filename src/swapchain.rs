//! Swapchain proxies.
//!
//! Swapchains are the only child objects created against a surface; their
//! create info and present info both carry wrapped handles that must be
//! unwrapped before the native driver sees them. Swapchain images are
//! non-dispatchable and pass through untouched.

use std::{ptr, slice};

use ash::vk;

use crate::{
    device::{Device, Queue},
    fns::SwapchainFns,
    proxy::{self, HandleKind, Proxy, ProxyHeader},
    surface::Surface,
};

/// Proxy standing in for a native `VkSwapchainKHR`.
#[repr(C)]
pub struct Swapchain {
    header: ProxyHeader,
    pub(crate) device: *mut Device,
    pub(crate) native: vk::SwapchainKHR,
}

unsafe impl Proxy for Swapchain {
    const KIND: HandleKind = HandleKind::Swapchain;
    type Handle = vk::SwapchainKHR;

    fn header(&self) -> &ProxyHeader {
        &self.header
    }
}

fn swapchain_fns(device: &Device) -> Result<&SwapchainFns, vk::Result> {
    device.fns.swapchain.as_ref().ok_or_else(|| {
        log::error!("native driver does not support VK_KHR_swapchain");
        vk::Result::ERROR_EXTENSION_NOT_PRESENT
    })
}

/// `vkCreateSwapchainKHR`
///
/// The create info is copied so the surface and old-swapchain handles can be
/// replaced with their native counterparts.
pub unsafe extern "system" fn create_swapchain(
    device: vk::Device,
    p_create_info: *const vk::SwapchainCreateInfoKHR,
    p_allocator: *const vk::AllocationCallbacks,
    p_swapchain: *mut vk::SwapchainKHR,
) -> vk::Result {
    log::debug!(
        "vkCreateSwapchainKHR {:?} {:?} {:?} {:?}",
        device,
        p_create_info,
        p_allocator,
        p_swapchain
    );

    if !p_allocator.is_null() {
        log::warn!("allocation callbacks are not supported; ignoring");
    }

    let device_proxy = unsafe { proxy::as_ref::<Device>(device) };
    let device_ptr = device_proxy as *const Device as *mut Device;
    let fns = match swapchain_fns(device_proxy) {
        Ok(fns) => fns,
        Err(code) => return code,
    };

    let mut create_info = unsafe { *p_create_info };
    create_info.surface = unsafe { proxy::as_ref::<Surface>(create_info.surface) }.native;
    if create_info.old_swapchain != vk::SwapchainKHR::null() {
        create_info.old_swapchain =
            unsafe { proxy::as_ref::<Swapchain>(create_info.old_swapchain) }.native;
    }

    let mut native = vk::SwapchainKHR::null();
    let res = unsafe {
        (fns.create_swapchain)(device_proxy.native, &create_info, ptr::null(), &mut native)
    };
    if res != vk::Result::SUCCESS {
        log::error!("native swapchain creation failed: {:?}", res);
        return res;
    }

    let swapchain = Box::new(Swapchain {
        header: ProxyHeader::new(HandleKind::Swapchain),
        device: device_ptr,
        native,
    });

    unsafe { *p_swapchain = proxy::wrap(swapchain) };
    vk::Result::SUCCESS
}

/// `vkDestroySwapchainKHR`
pub unsafe extern "system" fn destroy_swapchain(
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    p_allocator: *const vk::AllocationCallbacks,
) {
    log::debug!(
        "vkDestroySwapchainKHR {:?} {:?} {:?}",
        device,
        swapchain,
        p_allocator
    );

    if swapchain == vk::SwapchainKHR::null() {
        return;
    }

    let device_proxy = unsafe { proxy::as_ref::<Device>(device) };
    let proxy = unsafe { proxy::reclaim::<Swapchain>(swapchain) };

    // A swapchain proxy can only exist if the swapchain table resolved.
    if let Some(fns) = device_proxy.fns.swapchain.as_ref() {
        unsafe { (fns.destroy_swapchain)(device_proxy.native, proxy.native, ptr::null()) };
    }
}

/// `vkGetSwapchainImagesKHR`
///
/// Images are non-dispatchable and not wrapped; the native driver runs the
/// two-call protocol directly on the caller's buffer.
pub unsafe extern "system" fn get_swapchain_images(
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    p_count: *mut u32,
    p_images: *mut vk::Image,
) -> vk::Result {
    let device_proxy = unsafe { proxy::as_ref::<Device>(device) };
    let proxy = unsafe { proxy::as_ref::<Swapchain>(swapchain) };
    let fns = match swapchain_fns(device_proxy) {
        Ok(fns) => fns,
        Err(code) => return code,
    };

    unsafe { (fns.get_swapchain_images)(device_proxy.native, proxy.native, p_count, p_images) }
}

/// `vkAcquireNextImageKHR`
///
/// The timeout is the application's contract with the native driver and
/// passes through untouched.
pub unsafe extern "system" fn acquire_next_image(
    device: vk::Device,
    swapchain: vk::SwapchainKHR,
    timeout: u64,
    semaphore: vk::Semaphore,
    fence: vk::Fence,
    p_image_index: *mut u32,
) -> vk::Result {
    let device_proxy = unsafe { proxy::as_ref::<Device>(device) };
    let proxy = unsafe { proxy::as_ref::<Swapchain>(swapchain) };
    let fns = match swapchain_fns(device_proxy) {
        Ok(fns) => fns,
        Err(code) => return code,
    };

    unsafe {
        (fns.acquire_next_image)(
            device_proxy.native,
            proxy.native,
            timeout,
            semaphore,
            fence,
            p_image_index,
        )
    }
}

/// `vkQueuePresentKHR`
///
/// The present info's swapchain array is unwrapped into a call-scoped
/// temporary.
pub unsafe extern "system" fn queue_present(
    queue: vk::Queue,
    p_present_info: *const vk::PresentInfoKHR,
) -> vk::Result {
    let queue_proxy = unsafe { proxy::as_ref::<Queue>(queue) };
    let device = unsafe { &*queue_proxy.device };
    let fns = match swapchain_fns(device) {
        Ok(fns) => fns,
        Err(code) => return code,
    };

    let mut present_info = unsafe { *p_present_info };
    let wrapped = if present_info.swapchain_count > 0 && !present_info.p_swapchains.is_null() {
        unsafe {
            slice::from_raw_parts(present_info.p_swapchains, present_info.swapchain_count as usize)
        }
    } else {
        &[]
    };
    let natives: Vec<vk::SwapchainKHR> = wrapped
        .iter()
        .map(|&swapchain| unsafe { proxy::as_ref::<Swapchain>(swapchain) }.native)
        .collect();
    if !natives.is_empty() {
        present_info.p_swapchains = natives.as_ptr();
    }

    unsafe { (fns.queue_present)(queue_proxy.native, &present_info) }
}
