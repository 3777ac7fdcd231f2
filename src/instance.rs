//! Instance and physical-device proxies.

use std::ptr;

use ash::vk;

use crate::{
    extensions::{self, ConvertedInstanceCreateInfo},
    fns::InstanceFns,
    native,
    proxy::{self, HandleKind, Proxy, ProxyHeader},
};

/// Proxy standing in for a native `VkInstance`.
///
/// Owns the native instance, the instance-scoped function table resolved at
/// creation, and the lazily populated physical-device cache.
#[repr(C)]
pub struct Instance {
    header: ProxyHeader,
    pub(crate) native: vk::Instance,
    pub(crate) fns: InstanceFns,
    physical_devices: Option<Vec<Box<PhysicalDevice>>>,
}

unsafe impl Proxy for Instance {
    const KIND: HandleKind = HandleKind::Instance;
    type Handle = vk::Instance;

    fn header(&self) -> &ProxyHeader {
        &self.header
    }
}

/// Proxy standing in for a native `VkPhysicalDevice`.
///
/// Holds the filtered device extension list, computed once at construction.
/// The instance pointer is a non-owning back-reference; the instance always
/// outlives its cached physical devices.
#[repr(C)]
pub struct PhysicalDevice {
    header: ProxyHeader,
    pub(crate) instance: *mut Instance,
    pub(crate) native: vk::PhysicalDevice,
    extensions: Vec<vk::ExtensionProperties>,
}

unsafe impl Proxy for PhysicalDevice {
    const KIND: HandleKind = HandleKind::PhysicalDevice;
    type Handle = vk::PhysicalDevice;

    fn header(&self) -> &ProxyHeader {
        &self.header
    }
}

impl PhysicalDevice {
    /// Wraps a native physical-device handle, querying and filtering its
    /// extension list.
    ///
    /// # Safety
    ///
    /// `instance` must point to the live owning proxy and `native` must be
    /// a handle enumerated from it.
    unsafe fn new(
        instance: *mut Instance,
        native: vk::PhysicalDevice,
    ) -> Result<Box<PhysicalDevice>, vk::Result> {
        let fns = unsafe { &(*instance).fns };
        let enumerate = fns.enumerate_device_extension_properties;

        let mut count = 0u32;
        let res = unsafe { enumerate(native, ptr::null(), &mut count, ptr::null_mut()) };
        if res != vk::Result::SUCCESS {
            return Err(res);
        }

        let mut native_list = vec![vk::ExtensionProperties::default(); count as usize];
        if count > 0 {
            let res = unsafe { enumerate(native, ptr::null(), &mut count, native_list.as_mut_ptr()) };
            if res != vk::Result::SUCCESS && res != vk::Result::INCOMPLETE {
                return Err(res);
            }
            native_list.truncate(count as usize);
        }

        Ok(Box::new(PhysicalDevice {
            header: ProxyHeader::new(HandleKind::PhysicalDevice),
            instance,
            native,
            extensions: extensions::filter_device_extensions(&native_list),
        }))
    }
}

/// `vkCreateInstance`
pub unsafe extern "system" fn create_instance(
    p_create_info: *const vk::InstanceCreateInfo,
    p_allocator: *const vk::AllocationCallbacks,
    p_instance: *mut vk::Instance,
) -> vk::Result {
    log::debug!(
        "vkCreateInstance {:?} {:?} {:?}",
        p_create_info,
        p_allocator,
        p_instance
    );

    let table = match native::capabilities() {
        Ok(table) => table,
        Err(code) => return code,
    };

    if !p_allocator.is_null() {
        log::warn!("allocation callbacks are not supported; ignoring");
    }

    let create_info = unsafe { &*p_create_info };
    let converted = unsafe { ConvertedInstanceCreateInfo::new(create_info) };

    let mut native_instance = vk::Instance::null();
    let res =
        unsafe { (table.fns.create_instance)(converted.as_raw(), ptr::null(), &mut native_instance) };
    if res != vk::Result::SUCCESS {
        log::error!("native instance creation failed: {:?}", res);
        return res;
    }

    let fns = match unsafe { InstanceFns::load(native_instance, table.fns.get_instance_proc_addr) }
    {
        Ok(fns) => fns,
        Err(e) => {
            log::error!("failed to resolve instance functions: {}", e);
            unsafe { (table.fns.destroy_instance)(native_instance, ptr::null()) };
            return e.result_code();
        }
    };

    let instance = Box::new(Instance {
        header: ProxyHeader::new(HandleKind::Instance),
        native: native_instance,
        fns,
        physical_devices: None,
    });

    unsafe { *p_instance = proxy::wrap(instance) };
    vk::Result::SUCCESS
}

/// `vkDestroyInstance`
///
/// Frees cached physical-device proxies before the native instance.
pub unsafe extern "system" fn destroy_instance(
    instance: vk::Instance,
    p_allocator: *const vk::AllocationCallbacks,
) {
    log::debug!("vkDestroyInstance {:?} {:?}", instance, p_allocator);

    if instance == vk::Instance::null() {
        return;
    }

    let mut proxy = unsafe { proxy::reclaim::<Instance>(instance) };
    drop(proxy.physical_devices.take());
    unsafe { (proxy.fns.destroy_instance)(proxy.native, ptr::null()) };
}

/// Queries the native physical-device handles and wraps each one. Any
/// per-device failure frees everything built so far and leaves the cache
/// unpopulated so a later call can retry.
unsafe fn load_physical_devices(
    instance: &mut Instance,
) -> Result<Vec<Box<PhysicalDevice>>, vk::Result> {
    let enumerate = instance.fns.enumerate_physical_devices;

    let mut count = 0u32;
    let res = unsafe { enumerate(instance.native, &mut count, ptr::null_mut()) };
    if res != vk::Result::SUCCESS {
        return Err(res);
    }

    let mut natives = vec![vk::PhysicalDevice::null(); count as usize];
    if count > 0 {
        let res = unsafe { enumerate(instance.native, &mut count, natives.as_mut_ptr()) };
        if res != vk::Result::SUCCESS && res != vk::Result::INCOMPLETE {
            return Err(res);
        }
        natives.truncate(count as usize);
    }

    let instance_ptr = instance as *mut Instance;
    let mut wrapped = Vec::with_capacity(natives.len());
    for native in natives {
        match unsafe { PhysicalDevice::new(instance_ptr, native) } {
            Ok(physical_device) => wrapped.push(physical_device),
            Err(res) => {
                log::error!("failed to wrap physical device: {:?}", res);
                // Proxies built so far are dropped here; no native resource
                // is held by a physical-device proxy.
                return Err(res);
            }
        }
    }

    Ok(wrapped)
}

/// `vkEnumeratePhysicalDevices`
///
/// The wrapped set is computed once and cached; repeated calls replay the
/// cache through the copy-out protocol without touching the native driver.
pub unsafe extern "system" fn enumerate_physical_devices(
    instance: vk::Instance,
    p_count: *mut u32,
    p_physical_devices: *mut vk::PhysicalDevice,
) -> vk::Result {
    log::debug!(
        "vkEnumeratePhysicalDevices {:?} {:?} {:?}",
        instance,
        p_count,
        p_physical_devices
    );

    let proxy = unsafe { proxy::as_mut::<Instance>(instance) };

    if proxy.physical_devices.is_none() {
        let loaded = match unsafe { load_physical_devices(proxy) } {
            Ok(loaded) => loaded,
            Err(res) => return res,
        };
        proxy.physical_devices = Some(loaded);
    }

    let handles: Vec<vk::PhysicalDevice> = proxy
        .physical_devices
        .iter()
        .flatten()
        .map(|physical_device| proxy::handle_of(&**physical_device))
        .collect();

    unsafe { extensions::copy_out(&handles, p_count, p_physical_devices) }
}

/// `vkEnumerateDeviceExtensionProperties`
///
/// Replays the filtered list cached on the physical-device proxy.
pub unsafe extern "system" fn enumerate_device_extension_properties(
    physical_device: vk::PhysicalDevice,
    p_layer_name: *const std::os::raw::c_char,
    p_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    log::debug!(
        "vkEnumerateDeviceExtensionProperties {:?} {:?} {:?} {:?}",
        physical_device,
        p_layer_name,
        p_count,
        p_properties
    );

    if unsafe { extensions::layer_requested(p_layer_name) } {
        log::error!("layer enumeration not supported by a driver");
        return vk::Result::ERROR_LAYER_NOT_PRESENT;
    }

    let proxy = unsafe { proxy::as_ref::<PhysicalDevice>(physical_device) };
    unsafe { extensions::copy_out(&proxy.extensions, p_count, p_properties) }
}

/// `vkGetPhysicalDeviceProperties`
pub unsafe extern "system" fn get_physical_device_properties(
    physical_device: vk::PhysicalDevice,
    p_properties: *mut vk::PhysicalDeviceProperties,
) {
    let proxy = unsafe { proxy::as_ref::<PhysicalDevice>(physical_device) };
    let fns = unsafe { &(*proxy.instance).fns };
    unsafe { (fns.get_physical_device_properties)(proxy.native, p_properties) };
}

/// `vkGetPhysicalDeviceFeatures`
pub unsafe extern "system" fn get_physical_device_features(
    physical_device: vk::PhysicalDevice,
    p_features: *mut vk::PhysicalDeviceFeatures,
) {
    let proxy = unsafe { proxy::as_ref::<PhysicalDevice>(physical_device) };
    let fns = unsafe { &(*proxy.instance).fns };
    unsafe { (fns.get_physical_device_features)(proxy.native, p_features) };
}

/// `vkGetPhysicalDeviceMemoryProperties`
pub unsafe extern "system" fn get_physical_device_memory_properties(
    physical_device: vk::PhysicalDevice,
    p_memory_properties: *mut vk::PhysicalDeviceMemoryProperties,
) {
    let proxy = unsafe { proxy::as_ref::<PhysicalDevice>(physical_device) };
    let fns = unsafe { &(*proxy.instance).fns };
    unsafe { (fns.get_physical_device_memory_properties)(proxy.native, p_memory_properties) };
}

/// `vkGetPhysicalDeviceFormatProperties`
pub unsafe extern "system" fn get_physical_device_format_properties(
    physical_device: vk::PhysicalDevice,
    format: vk::Format,
    p_format_properties: *mut vk::FormatProperties,
) {
    let proxy = unsafe { proxy::as_ref::<PhysicalDevice>(physical_device) };
    let fns = unsafe { &(*proxy.instance).fns };
    unsafe { (fns.get_physical_device_format_properties)(proxy.native, format, p_format_properties) };
}

/// `vkGetPhysicalDeviceQueueFamilyProperties`
///
/// The two-call protocol is the native driver's to run; both pointers pass
/// through untouched.
pub unsafe extern "system" fn get_physical_device_queue_family_properties(
    physical_device: vk::PhysicalDevice,
    p_count: *mut u32,
    p_properties: *mut vk::QueueFamilyProperties,
) {
    let proxy = unsafe { proxy::as_ref::<PhysicalDevice>(physical_device) };
    let fns = unsafe { &(*proxy.instance).fns };
    unsafe { (fns.get_physical_device_queue_family_properties)(proxy.native, p_count, p_properties) };
}
