//! Tagged proxy objects standing in for native handles.
//!
//! Every handle this layer gives out is a pointer to a heap-allocated proxy
//! whose first pointer-sized word holds the loader magic. The loader is free
//! to overwrite that word with its own dispatch pointer once the handle is
//! returned, so the proxy carries a second, private kind tag which is set at
//! construction and never mutated; handle unwrapping checks it.

use ash::vk::{self, Handle};

/// Initial value of the first word of every dispatchable object. The loader
/// recognizes it and replaces it with its dispatch table pointer.
pub const LOADER_MAGIC: usize = 0x01CD_C0DE;

/// Discriminates the proxy kinds at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum HandleKind {
    Instance,
    PhysicalDevice,
    Device,
    Queue,
    CommandBuffer,
    Surface,
    Swapchain,
}

/// Common prefix of every proxy object.
#[repr(C)]
pub struct ProxyHeader {
    loader_data: usize,
    kind: HandleKind,
}

impl ProxyHeader {
    pub fn new(kind: HandleKind) -> ProxyHeader {
        ProxyHeader {
            loader_data: LOADER_MAGIC,
            kind,
        }
    }

    pub fn kind(&self) -> HandleKind {
        self.kind
    }
}

/// A proxy type wrapping exactly one native handle for its entire lifetime.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` with a `ProxyHeader` as their first
/// field, and `header()` must return that field.
pub unsafe trait Proxy: Sized {
    const KIND: HandleKind;

    /// The handle type under which the loader sees this proxy.
    type Handle: Handle + Copy;

    fn header(&self) -> &ProxyHeader;
}

/// Moves a fully constructed proxy to the heap and returns the handle under
/// which the loader will refer to it.
pub fn wrap<P: Proxy>(proxy: Box<P>) -> P::Handle {
    P::Handle::from_raw(Box::into_raw(proxy) as usize as u64)
}

/// Returns the handle for a proxy that is owned elsewhere (e.g. an entry in
/// a parent's pre-wrapped child array).
pub fn handle_of<P: Proxy>(proxy: &P) -> P::Handle {
    P::Handle::from_raw(proxy as *const P as usize as u64)
}

/// Borrows the proxy behind a handle.
///
/// # Safety
///
/// `handle` must be non-null and must have been produced by [`wrap`] or
/// [`handle_of`] for a proxy of type `P` that is still live.
pub unsafe fn as_ref<'a, P: Proxy>(handle: P::Handle) -> &'a P {
    let proxy = unsafe { &*(handle.as_raw() as usize as *const P) };
    debug_assert_eq!(proxy.header().kind(), P::KIND);
    proxy
}

/// Mutably borrows the proxy behind a handle.
///
/// # Safety
///
/// Same as [`as_ref`]; additionally the caller must hold the API's external
/// synchronization guarantee for the object, since no locking is done here.
pub unsafe fn as_mut<'a, P: Proxy>(handle: P::Handle) -> &'a mut P {
    let proxy = unsafe { &mut *(handle.as_raw() as usize as *mut P) };
    debug_assert_eq!(proxy.header().kind(), P::KIND);
    proxy
}

/// Takes back ownership of the proxy behind a handle for destruction.
///
/// # Safety
///
/// `handle` must be non-null, produced by [`wrap`], and must not be used
/// again afterwards.
pub unsafe fn reclaim<P: Proxy>(handle: P::Handle) -> Box<P> {
    let proxy = unsafe { Box::from_raw(handle.as_raw() as usize as *mut P) };
    debug_assert_eq!(proxy.header().kind(), P::KIND);
    proxy
}
