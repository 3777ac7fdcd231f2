//! The native capability table.
//!
//! The native Vulkan library is loaded by name exactly once per process and
//! a fixed list of global entry points is resolved from it by exact symbol
//! name. If the library cannot be loaded, or any required symbol is absent,
//! the whole driver is unavailable: the failed result is cached and every
//! later call observes the same permanent failure. There is no unload path.

use std::env;

use ash::vk;
use once_cell::sync::OnceCell;

use crate::{
    error::Error,
    fns::pfn,
};

/// Environment variable overriding the native library name.
pub const NATIVE_LIBRARY_ENV: &str = "VKBRIDGE_NATIVE_LIBRARY";

/// Library loaded when [`NATIVE_LIBRARY_ENV`] is unset.
pub const DEFAULT_NATIVE_LIBRARY: &str = "libvulkan.so.1";

/// An untyped resolved symbol, transmuted to its real signature on storage.
pub type RawFn = unsafe extern "system" fn();

/// The fixed set of entry points resolved directly from the native library.
pub struct GlobalFns {
    pub create_instance: pfn::CreateInstance,
    pub destroy_instance: pfn::DestroyInstance,
    pub enumerate_instance_extension_properties: pfn::EnumerateInstanceExtensionProperties,
    pub get_instance_proc_addr: pfn::GetInstanceProcAddr,
    pub get_device_proc_addr: pfn::GetDeviceProcAddr,
}

impl GlobalFns {
    /// Resolves every required global entry point through `lookup`, failing
    /// wholesale on the first missing name.
    pub fn resolve<F>(mut lookup: F) -> Result<GlobalFns, Error>
    where
        F: FnMut(&'static str) -> Option<RawFn>,
    {
        macro_rules! require {
            ($name:literal) => {
                match lookup($name) {
                    // Safety: the symbol was resolved under exactly this
                    // name; the native library defines its signature.
                    Some(f) => unsafe { std::mem::transmute(f) },
                    None => return Err(Error::MissingEntryPoint($name)),
                }
            };
        }

        Ok(GlobalFns {
            create_instance: require!("vkCreateInstance"),
            destroy_instance: require!("vkDestroyInstance"),
            enumerate_instance_extension_properties: require!(
                "vkEnumerateInstanceExtensionProperties"
            ),
            get_instance_proc_addr: require!("vkGetInstanceProcAddr"),
            get_device_proc_addr: require!("vkGetDeviceProcAddr"),
        })
    }
}

/// The resolved native driver, alive for the rest of the process.
pub struct CapabilityTable {
    pub fns: GlobalFns,
    // Keeps the dynamic library mapped for as long as the function pointers
    // above are reachable. `None` only for tables injected by tests.
    _library: Option<libloading::Library>,
}

static TABLE: OnceCell<Result<CapabilityTable, Error>> = OnceCell::new();

fn load_native_library() -> Result<CapabilityTable, Error> {
    let name = env::var(NATIVE_LIBRARY_ENV).unwrap_or_else(|_| DEFAULT_NATIVE_LIBRARY.to_owned());

    // Safety: loading the native Vulkan library runs its initializers; that
    // is the entire point of this layer.
    let library = unsafe { libloading::Library::new(&name) }.map_err(|e| {
        Error::LibraryUnavailable {
            library: name.clone(),
            reason: e.to_string(),
        }
    })?;

    let fns = GlobalFns::resolve(|symbol| {
        // Safety: symbols are only stored behind their exact names.
        unsafe { library.get::<RawFn>(symbol.as_bytes()) }
            .ok()
            .map(|s| *s)
    })?;

    log::debug!("resolved native driver `{}`", name);

    Ok(CapabilityTable {
        fns,
        _library: Some(library),
    })
}

/// Returns the process-wide capability table, resolving it on first use.
///
/// The failure result is returned as the code surfaced to callers; a failed
/// resolution is permanent and is not retried.
pub fn capabilities() -> Result<&'static CapabilityTable, vk::Result> {
    let resolved = TABLE.get_or_init(|| {
        // A driver library has no main() to set up logging from.
        let _ = env_logger::try_init();
        load_native_library()
    });

    match resolved {
        Ok(table) => Ok(table),
        Err(e) => {
            log::error!("native driver unavailable: {}", e);
            Err(e.result_code())
        }
    }
}

/// Installs a capability table directly, bypassing library resolution. Used
/// by the unit tests; a no-op if the table is already resolved.
#[cfg(test)]
pub(crate) fn install_for_tests(fns: GlobalFns) -> &'static CapabilityTable {
    TABLE
        .get_or_init(|| {
            let _ = env_logger::builder().is_test(true).try_init();
            Ok(CapabilityTable {
                fns,
                _library: None,
            })
        })
        .as_ref()
        .expect("test capability table failed to install")
}
