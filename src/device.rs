//! Device, queue and command-buffer proxies.
//!
//! Queues are pre-wrapped at device creation so that `vkGetDeviceQueue` can
//! hand out stable proxy handles without allocating. Command buffers are
//! wrapped at allocation; submission paths unwrap handle arrays into
//! call-scoped temporaries that are freed when the native call returns.

use std::{ptr, slice};

use ash::vk;

use crate::{
    fns::DeviceFns,
    instance::PhysicalDevice,
    proxy::{self, HandleKind, Proxy, ProxyHeader},
};

/// Proxy standing in for a native `VkDevice`.
#[repr(C)]
pub struct Device {
    header: ProxyHeader,
    /// Non-owning back-reference; the physical device outlives its devices.
    pub physical_device: *mut PhysicalDevice,
    pub(crate) native: vk::Device,
    pub(crate) fns: DeviceFns,
    // Indexed by queue family, then queue index within the family.
    queues: Vec<Vec<Box<Queue>>>,
}

unsafe impl Proxy for Device {
    const KIND: HandleKind = HandleKind::Device;
    type Handle = vk::Device;

    fn header(&self) -> &ProxyHeader {
        &self.header
    }
}

/// Proxy standing in for a native `VkQueue`. Owned by its device's queue
/// table for the device's whole lifetime.
#[repr(C)]
pub struct Queue {
    header: ProxyHeader,
    pub(crate) device: *mut Device,
    pub(crate) native: vk::Queue,
}

unsafe impl Proxy for Queue {
    const KIND: HandleKind = HandleKind::Queue;
    type Handle = vk::Queue;

    fn header(&self) -> &ProxyHeader {
        &self.header
    }
}

/// Proxy standing in for a native `VkCommandBuffer`.
#[repr(C)]
pub struct CommandBuffer {
    header: ProxyHeader,
    pub(crate) device: *mut Device,
    pub(crate) native: vk::CommandBuffer,
}

unsafe impl Proxy for CommandBuffer {
    const KIND: HandleKind = HandleKind::CommandBuffer;
    type Handle = vk::CommandBuffer;

    fn header(&self) -> &ProxyHeader {
        &self.header
    }
}

/// Fetches and wraps every queue requested by the create info. A null
/// native queue, or a family index past what the driver reported, fails the
/// whole device.
unsafe fn populate_queues(
    device: &mut Device,
    create_info: &vk::DeviceCreateInfo,
) -> Result<(), vk::Result> {
    let device_ptr = device as *mut Device;

    let queue_infos = if create_info.queue_create_info_count > 0 {
        unsafe {
            slice::from_raw_parts(
                create_info.p_queue_create_infos,
                create_info.queue_create_info_count as usize,
            )
        }
    } else {
        &[]
    };

    for queue_info in queue_infos {
        let family = queue_info.queue_family_index as usize;
        if family >= device.queues.len() {
            log::error!(
                "queue family index {} out of range ({} families)",
                family,
                device.queues.len()
            );
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }

        let mut family_queues = Vec::with_capacity(queue_info.queue_count as usize);
        for index in 0..queue_info.queue_count {
            let mut native = vk::Queue::null();
            unsafe {
                (device.fns.get_device_queue)(
                    device.native,
                    queue_info.queue_family_index,
                    index,
                    &mut native,
                )
            };
            if native == vk::Queue::null() {
                log::error!(
                    "native driver returned no queue for family {} index {}",
                    family,
                    index
                );
                return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
            }

            family_queues.push(Box::new(Queue {
                header: ProxyHeader::new(HandleKind::Queue),
                device: device_ptr,
                native,
            }));
        }

        device.queues[family] = family_queues;
    }

    Ok(())
}

/// Tears a device proxy down: queue proxies first, then the native device.
unsafe fn free_device(mut device: Box<Device>) {
    device.queues.clear();
    unsafe { (device.fns.destroy_device)(device.native, ptr::null()) };
}

/// `vkCreateDevice`
///
/// The create info passes through unmodified; device extension names need no
/// translation. Any failure after the native device exists rolls it back so
/// nothing leaks.
pub unsafe extern "system" fn create_device(
    physical_device: vk::PhysicalDevice,
    p_create_info: *const vk::DeviceCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_device: *mut vk::Device,
) -> vk::Result {
    log::debug!(
        "vkCreateDevice {:?} {:?} {:?} {:?}",
        physical_device,
        p_create_info,
        p_allocator,
        p_device
    );

    if !p_allocator.is_null() {
        log::warn!("allocation callbacks are not supported; ignoring");
    }

    let phys = unsafe { proxy::as_ref::<PhysicalDevice>(physical_device) };
    let instance_fns = unsafe { &(*phys.instance).fns };
    let create_info = unsafe { &*p_create_info };

    let mut native_device = vk::Device::null();
    let res = unsafe {
        (instance_fns.create_device)(phys.native, p_create_info, ptr::null(), &mut native_device)
    };
    if res != vk::Result::SUCCESS {
        log::error!("native device creation failed: {:?}", res);
        return res;
    }

    let gdpa = instance_fns.get_device_proc_addr;
    let fns = match unsafe { DeviceFns::load(native_device, gdpa) } {
        Ok(fns) => fns,
        Err(e) => {
            log::error!("failed to resolve device functions: {}", e);
            unsafe { DeviceFns::destroy_orphan(native_device, gdpa) };
            return e.result_code();
        }
    };

    let mut family_count = 0u32;
    unsafe {
        (instance_fns.get_physical_device_queue_family_properties)(
            phys.native,
            &mut family_count,
            ptr::null_mut(),
        )
    };

    let mut device = Box::new(Device {
        header: ProxyHeader::new(HandleKind::Device),
        physical_device: phys as *const PhysicalDevice as *mut PhysicalDevice,
        native: native_device,
        fns,
        queues: (0..family_count).map(|_| Vec::new()).collect(),
    });

    if let Err(res) = unsafe { populate_queues(&mut device, create_info) } {
        unsafe { free_device(device) };
        return res;
    }

    unsafe { *p_device = proxy::wrap(device) };
    vk::Result::SUCCESS
}

/// `vkDestroyDevice`
pub unsafe extern "system" fn destroy_device(
    device: vk::Device,
    p_allocator: *const vk::AllocationCallbacks,
) {
    log::debug!("vkDestroyDevice {:?} {:?}", device, p_allocator);

    if device == vk::Device::null() {
        return;
    }

    let proxy = unsafe { proxy::reclaim::<Device>(device) };
    unsafe { free_device(proxy) };
}

/// `vkGetDeviceQueue`
///
/// Returns the queue proxy pre-wrapped at device creation. Asking for a
/// queue that was not requested in the device create info is a usage error.
pub unsafe extern "system" fn get_device_queue(
    device: vk::Device,
    queue_family_index: u32,
    queue_index: u32,
    p_queue: *mut vk::Queue,
) {
    let proxy = unsafe { proxy::as_ref::<Device>(device) };

    let family = queue_family_index as usize;
    let index = queue_index as usize;
    debug_assert!(family < proxy.queues.len() && index < proxy.queues[family].len());

    unsafe { *p_queue = proxy::handle_of(&*proxy.queues[family][index]) };
}

/// `vkQueueSubmit`
///
/// Command-buffer handle arrays inside each submit are unwrapped into
/// temporaries that live exactly as long as the native call.
pub unsafe extern "system" fn queue_submit(
    queue: vk::Queue,
    submit_count: u32,
    p_submits: *const vk::SubmitInfo,
    fence: vk::Fence,
) -> vk::Result {
    let queue_proxy = unsafe { proxy::as_ref::<Queue>(queue) };
    let device = unsafe { &*queue_proxy.device };

    let submits = if submit_count > 0 && !p_submits.is_null() {
        unsafe { slice::from_raw_parts(p_submits, submit_count as usize) }
    } else {
        &[]
    };

    let mut native_submits = submits.to_vec();
    let mut unwrapped: Vec<Vec<vk::CommandBuffer>> = Vec::with_capacity(native_submits.len());
    for submit in &mut native_submits {
        if submit.command_buffer_count == 0 || submit.p_command_buffers.is_null() {
            continue;
        }

        let wrapped = unsafe {
            slice::from_raw_parts(submit.p_command_buffers, submit.command_buffer_count as usize)
        };
        let natives: Vec<vk::CommandBuffer> = wrapped
            .iter()
            .map(|&cb| unsafe { proxy::as_ref::<CommandBuffer>(cb) }.native)
            .collect();

        // The Vec's heap buffer stays put when the Vec moves into
        // `unwrapped`, so the pointer stored here remains valid.
        submit.p_command_buffers = natives.as_ptr();
        unwrapped.push(natives);
    }

    let p_native_submits = if native_submits.is_empty() {
        ptr::null()
    } else {
        native_submits.as_ptr()
    };

    unsafe { (device.fns.queue_submit)(queue_proxy.native, submit_count, p_native_submits, fence) }
}

/// `vkQueueWaitIdle`
pub unsafe extern "system" fn queue_wait_idle(queue: vk::Queue) -> vk::Result {
    let queue_proxy = unsafe { proxy::as_ref::<Queue>(queue) };
    let device = unsafe { &*queue_proxy.device };
    unsafe { (device.fns.queue_wait_idle)(queue_proxy.native) }
}

/// `vkDeviceWaitIdle`
pub unsafe extern "system" fn device_wait_idle(device: vk::Device) -> vk::Result {
    let proxy = unsafe { proxy::as_ref::<Device>(device) };
    unsafe { (proxy.fns.device_wait_idle)(proxy.native) }
}

/// `vkCreateCommandPool`
///
/// Command pools are non-dispatchable; the native handle passes through.
pub unsafe extern "system" fn create_command_pool(
    device: vk::Device,
    p_create_info: *const vk::CommandPoolCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_command_pool: *mut vk::CommandPool,
) -> vk::Result {
    if !p_allocator.is_null() {
        log::warn!("allocation callbacks are not supported; ignoring");
    }

    let proxy = unsafe { proxy::as_ref::<Device>(device) };
    unsafe {
        (proxy.fns.create_command_pool)(proxy.native, p_create_info, ptr::null(), p_command_pool)
    }
}

/// `vkDestroyCommandPool`
pub unsafe extern "system" fn destroy_command_pool(
    device: vk::Device,
    command_pool: vk::CommandPool,
    p_allocator: *const vk::AllocationCallbacks,
) {
    let _ = p_allocator;
    let proxy = unsafe { proxy::as_ref::<Device>(device) };
    unsafe { (proxy.fns.destroy_command_pool)(proxy.native, command_pool, ptr::null()) };
}

/// `vkAllocateCommandBuffers`
///
/// Native command buffers are allocated one at a time so each can be paired
/// with its proxy as it appears. On a partial failure every native buffer
/// already allocated is freed in one batch and the output array is left
/// unwritten.
pub unsafe extern "system" fn allocate_command_buffers(
    device: vk::Device,
    p_allocate_info: *const vk::CommandBufferAllocateInfo,
    p_command_buffers: *mut vk::CommandBuffer,
) -> vk::Result {
    let proxy = unsafe { proxy::as_ref::<Device>(device) };
    let device_ptr = proxy as *const Device as *mut Device;
    let allocate_info = unsafe { &*p_allocate_info };
    let count = allocate_info.command_buffer_count as usize;

    let mut natives: Vec<vk::CommandBuffer> = Vec::with_capacity(count);
    let mut proxies: Vec<Box<CommandBuffer>> = Vec::with_capacity(count);

    for _ in 0..count {
        let mut single = *allocate_info;
        single.command_buffer_count = 1;

        let mut native = vk::CommandBuffer::null();
        let res =
            unsafe { (proxy.fns.allocate_command_buffers)(proxy.native, &single, &mut native) };
        if res != vk::Result::SUCCESS {
            log::error!(
                "command buffer allocation failed after {} of {}: {:?}",
                natives.len(),
                count,
                res
            );
            if !natives.is_empty() {
                unsafe {
                    (proxy.fns.free_command_buffers)(
                        proxy.native,
                        allocate_info.command_pool,
                        natives.len() as u32,
                        natives.as_ptr(),
                    )
                };
            }
            return res;
        }

        natives.push(native);
        proxies.push(Box::new(CommandBuffer {
            header: ProxyHeader::new(HandleKind::CommandBuffer),
            device: device_ptr,
            native,
        }));
    }

    for (i, command_buffer) in proxies.into_iter().enumerate() {
        unsafe { *p_command_buffers.add(i) = proxy::wrap(command_buffer) };
    }

    vk::Result::SUCCESS
}

/// `vkFreeCommandBuffers`
///
/// Null entries are permitted by the API and skipped; the surviving native
/// handles are released in a single batched call before the proxies drop.
pub unsafe extern "system" fn free_command_buffers(
    device: vk::Device,
    command_pool: vk::CommandPool,
    command_buffer_count: u32,
    p_command_buffers: *const vk::CommandBuffer,
) {
    let proxy = unsafe { proxy::as_ref::<Device>(device) };

    let handles = if command_buffer_count > 0 && !p_command_buffers.is_null() {
        unsafe { slice::from_raw_parts(p_command_buffers, command_buffer_count as usize) }
    } else {
        &[]
    };

    let mut natives = Vec::with_capacity(handles.len());
    let mut reclaimed = Vec::with_capacity(handles.len());
    for &handle in handles {
        if handle == vk::CommandBuffer::null() {
            continue;
        }
        let command_buffer = unsafe { proxy::reclaim::<CommandBuffer>(handle) };
        natives.push(command_buffer.native);
        reclaimed.push(command_buffer);
    }

    if !natives.is_empty() {
        unsafe {
            (proxy.fns.free_command_buffers)(
                proxy.native,
                command_pool,
                natives.len() as u32,
                natives.as_ptr(),
            )
        };
    }
}

/// `vkBeginCommandBuffer`
pub unsafe extern "system" fn begin_command_buffer(
    command_buffer: vk::CommandBuffer,
    p_begin_info: *const vk::CommandBufferBeginInfo,
) -> vk::Result {
    let proxy = unsafe { proxy::as_ref::<CommandBuffer>(command_buffer) };
    let device = unsafe { &*proxy.device };
    unsafe { (device.fns.begin_command_buffer)(proxy.native, p_begin_info) }
}

/// `vkEndCommandBuffer`
pub unsafe extern "system" fn end_command_buffer(
    command_buffer: vk::CommandBuffer,
) -> vk::Result {
    let proxy = unsafe { proxy::as_ref::<CommandBuffer>(command_buffer) };
    let device = unsafe { &*proxy.device };
    unsafe { (device.fns.end_command_buffer)(proxy.native) }
}

/// `vkResetCommandBuffer`
pub unsafe extern "system" fn reset_command_buffer(
    command_buffer: vk::CommandBuffer,
    flags: vk::CommandBufferResetFlags,
) -> vk::Result {
    let proxy = unsafe { proxy::as_ref::<CommandBuffer>(command_buffer) };
    let device = unsafe { &*proxy.device };
    unsafe { (device.fns.reset_command_buffer)(proxy.native, flags) }
}

/// `vkCmdExecuteCommands`
///
/// The secondary handle array is unwrapped into a call-scoped temporary.
pub unsafe extern "system" fn cmd_execute_commands(
    command_buffer: vk::CommandBuffer,
    command_buffer_count: u32,
    p_command_buffers: *const vk::CommandBuffer,
) {
    let primary = unsafe { proxy::as_ref::<CommandBuffer>(command_buffer) };
    let device = unsafe { &*primary.device };

    let wrapped = if command_buffer_count > 0 && !p_command_buffers.is_null() {
        unsafe { slice::from_raw_parts(p_command_buffers, command_buffer_count as usize) }
    } else {
        &[]
    };
    let natives: Vec<vk::CommandBuffer> = wrapped
        .iter()
        .map(|&cb| unsafe { proxy::as_ref::<CommandBuffer>(cb) }.native)
        .collect();

    unsafe {
        (device.fns.cmd_execute_commands)(primary.native, natives.len() as u32, natives.as_ptr())
    };
}
