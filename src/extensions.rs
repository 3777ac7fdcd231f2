//! Extension list translation.
//!
//! The native driver advertises xlib surface support; applications on the
//! other side of this shim expect win32 surface support. The translator
//! filters the native extension lists down to the names this layer can
//! forward and rewrites the platform-specific surface extension in both
//! directions: `VK_KHR_xlib_surface` becomes [`FACING_SURFACE_EXTENSION`]
//! on enumeration, and the reverse substitution is applied to the enabled
//! extension names at instance creation.

use std::{ffi::CStr, os::raw::c_char, ptr};

use ash::vk;

use crate::native;

/// The surface extension name applications see.
pub const FACING_SURFACE_EXTENSION: &str = "VK_KHR_win32_surface";

/// The surface extension name the native driver understands.
pub const NATIVE_SURFACE_EXTENSION: &str = "VK_KHR_xlib_surface";

/// Version advertised for the substituted surface extension. Forced rather
/// than copied from the native entry: the native extension's versioning is
/// unrelated to the facing one's.
pub const FACING_SURFACE_SPEC_VERSION: u32 = 6;

/// Instance extensions (by native name) this layer has forwarding support
/// for. Anything else the native driver advertises is hidden.
const SUPPORTED_INSTANCE_EXTENSIONS: [&str; 2] = ["VK_KHR_surface", NATIVE_SURFACE_EXTENSION];

/// Device extensions this layer has forwarding support for.
const SUPPORTED_DEVICE_EXTENSIONS: [&str; 1] = ["VK_KHR_swapchain"];

const NATIVE_SURFACE_EXTENSION_NUL: &[u8] = b"VK_KHR_xlib_surface\0";

/// Extracts the NUL-terminated name from an extension properties record.
fn extension_name(properties: &vk::ExtensionProperties) -> Option<&CStr> {
    if properties.extension_name.contains(&0) {
        // Safety: NUL byte is known to exist in bounds of the array.
        Some(unsafe { CStr::from_ptr(properties.extension_name.as_ptr()) })
    } else {
        None
    }
}

pub(crate) fn make_properties(name: &str, spec_version: u32) -> vk::ExtensionProperties {
    let mut properties = vk::ExtensionProperties {
        extension_name: [0; vk::MAX_EXTENSION_NAME_SIZE],
        spec_version,
    };
    for (dst, &src) in properties.extension_name.iter_mut().zip(name.as_bytes()) {
        *dst = src as c_char;
    }
    properties
}

fn name_matches(properties: &vk::ExtensionProperties, name: &str) -> bool {
    extension_name(properties).map_or(false, |n| n.to_bytes() == name.as_bytes())
}

/// Filters a native instance extension list to the supported subset and
/// substitutes the platform surface extension.
pub fn translate_instance_extensions(
    native: &[vk::ExtensionProperties],
) -> Vec<vk::ExtensionProperties> {
    native
        .iter()
        .filter(|p| {
            SUPPORTED_INSTANCE_EXTENSIONS
                .iter()
                .any(|name| name_matches(p, name))
        })
        .map(|p| {
            if name_matches(p, NATIVE_SURFACE_EXTENSION) {
                make_properties(FACING_SURFACE_EXTENSION, FACING_SURFACE_SPEC_VERSION)
            } else {
                *p
            }
        })
        .collect()
}

/// Filters a native device extension list to the supported subset.
pub fn filter_device_extensions(
    native: &[vk::ExtensionProperties],
) -> Vec<vk::ExtensionProperties> {
    native
        .iter()
        .filter(|p| {
            SUPPORTED_DEVICE_EXTENSIONS
                .iter()
                .any(|name| name_matches(p, name))
        })
        .copied()
        .collect()
}

/// Copies an already-computed list out through the two-call enumeration
/// protocol: a null buffer requests the count, an undersized buffer takes a
/// truncated copy and `VK_INCOMPLETE`.
///
/// # Safety
///
/// `p_count` must be valid for reads and writes; `p_out`, when non-null,
/// must be valid for `*p_count` writes of `T`.
pub unsafe fn copy_out<T: Copy>(items: &[T], p_count: *mut u32, p_out: *mut T) -> vk::Result {
    if p_out.is_null() {
        unsafe { *p_count = items.len() as u32 };
        return vk::Result::SUCCESS;
    }

    let capacity = unsafe { *p_count } as usize;
    let (copied, result) = if capacity < items.len() {
        (capacity, vk::Result::INCOMPLETE)
    } else {
        (items.len(), vk::Result::SUCCESS)
    };

    unsafe {
        ptr::copy_nonoverlapping(items.as_ptr(), p_out, copied);
        *p_count = copied as u32;
    }

    result
}

pub(crate) unsafe fn layer_requested(p_layer_name: *const c_char) -> bool {
    !p_layer_name.is_null() && unsafe { *p_layer_name } != 0
}

/// `vkEnumerateInstanceExtensionProperties`
///
/// Queries the native driver's list, then filters and renames it before
/// applying the copy-out protocol. Layer-scoped enumeration is not something
/// a driver supports.
pub unsafe extern "system" fn enumerate_instance_extension_properties(
    p_layer_name: *const c_char,
    p_count: *mut u32,
    p_properties: *mut vk::ExtensionProperties,
) -> vk::Result {
    log::debug!(
        "vkEnumerateInstanceExtensionProperties {:?} {:?} {:?}",
        p_layer_name,
        p_count,
        p_properties
    );

    if unsafe { layer_requested(p_layer_name) } {
        log::error!("layer enumeration not supported by a driver");
        return vk::Result::ERROR_LAYER_NOT_PRESENT;
    }

    let table = match native::capabilities() {
        Ok(table) => table,
        Err(code) => return code,
    };

    let enumerate = table.fns.enumerate_instance_extension_properties;

    let mut count = 0u32;
    let res = unsafe { enumerate(ptr::null(), &mut count, ptr::null_mut()) };
    if res != vk::Result::SUCCESS {
        return res;
    }

    let mut native_list = vec![vk::ExtensionProperties::default(); count as usize];
    if count > 0 {
        let res = unsafe { enumerate(ptr::null(), &mut count, native_list.as_mut_ptr()) };
        if res != vk::Result::SUCCESS && res != vk::Result::INCOMPLETE {
            return res;
        }
        native_list.truncate(count as usize);
    }

    let translated = translate_instance_extensions(&native_list);
    unsafe { copy_out(&translated, p_count, p_properties) }
}

/// An instance create-info rewritten for the native driver: layers stripped,
/// unrecognized chained structures dropped, and the facing surface extension
/// name replaced with the native one. Owns the substituted name array for
/// the duration of the forwarded call.
pub struct ConvertedInstanceCreateInfo {
    enabled_extensions: Vec<*const c_char>,
    info: vk::InstanceCreateInfo,
}

impl ConvertedInstanceCreateInfo {
    /// # Safety
    ///
    /// `src` must point to a valid `VkInstanceCreateInfo` with
    /// `enabled_extension_count` readable extension name pointers.
    pub unsafe fn new(src: &vk::InstanceCreateInfo) -> ConvertedInstanceCreateInfo {
        // Chained structures often carry host-side resources (callbacks,
        // allocators) that cannot be forwarded as-is; report and drop them.
        let mut chained = src.p_next as *const vk::BaseInStructure;
        while !chained.is_null() {
            let header = unsafe { &*chained };
            log::warn!(
                "dropping unsupported chained structure of type {:?}",
                header.s_type
            );
            chained = header.p_next;
        }

        if src.enabled_layer_count > 0 {
            log::debug!(
                "stripping {} enabled layers; layers never reach a driver",
                src.enabled_layer_count
            );
        }

        let enabled_extensions: Vec<*const c_char> =
            if src.enabled_extension_count > 0 && !src.pp_enabled_extension_names.is_null() {
                let names = unsafe {
                    std::slice::from_raw_parts(
                        src.pp_enabled_extension_names,
                        src.enabled_extension_count as usize,
                    )
                };
                names
                    .iter()
                    .map(|&name| {
                        let cstr = unsafe { CStr::from_ptr(name) };
                        if cstr.to_bytes() == FACING_SURFACE_EXTENSION.as_bytes() {
                            NATIVE_SURFACE_EXTENSION_NUL.as_ptr().cast()
                        } else {
                            name
                        }
                    })
                    .collect()
            } else {
                Vec::new()
            };

        let info = vk::InstanceCreateInfo {
            s_type: src.s_type,
            p_next: ptr::null(),
            flags: src.flags,
            p_application_info: src.p_application_info,
            enabled_layer_count: 0,
            pp_enabled_layer_names: ptr::null(),
            enabled_extension_count: enabled_extensions.len() as u32,
            pp_enabled_extension_names: if enabled_extensions.is_empty() {
                ptr::null()
            } else {
                enabled_extensions.as_ptr()
            },
        };

        ConvertedInstanceCreateInfo {
            enabled_extensions,
            info,
        }
    }

    pub fn as_raw(&self) -> *const vk::InstanceCreateInfo {
        // The name array is heap-allocated, so the pointer stored in `info`
        // stays valid across moves of this struct.
        debug_assert!(
            self.enabled_extensions.is_empty()
                || self.info.pp_enabled_extension_names == self.enabled_extensions.as_ptr()
        );
        &self.info
    }
}
