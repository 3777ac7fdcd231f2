use ash::vk;
use thiserror::Error;

/// Errors originated by this layer.
///
/// Native driver failures are never redefined: a `vk::Result` returned by
/// the native library travels through `Error::Native` and surfaces to the
/// caller unchanged. The remaining variants cover the conditions this layer
/// detects itself.
#[derive(Debug, Error)]
pub enum Error {
    #[error("native driver library `{library}` could not be loaded: {reason}")]
    LibraryUnavailable { library: String, reason: String },

    #[error("native entry point `{0}` is missing")]
    MissingEntryPoint(&'static str),

    #[error("layer enumeration is not supported by a driver")]
    LayerEnumeration,

    #[error("no window system has been installed")]
    NoWindowSystem,

    #[error("failed to create a native drawable for the window")]
    DrawableCreation,

    #[error("native call failed: {0:?}")]
    Native(vk::Result),
}

impl Error {
    /// The result code reported to the caller for this error.
    pub fn result_code(&self) -> vk::Result {
        match self {
            Error::LibraryUnavailable { .. } => vk::Result::ERROR_INCOMPATIBLE_DRIVER,
            Error::MissingEntryPoint(_) => vk::Result::ERROR_INCOMPATIBLE_DRIVER,
            Error::LayerEnumeration => vk::Result::ERROR_LAYER_NOT_PRESENT,
            Error::NoWindowSystem => vk::Result::ERROR_INITIALIZATION_FAILED,
            Error::DrawableCreation => vk::Result::ERROR_OUT_OF_HOST_MEMORY,
            Error::Native(res) => *res,
        }
    }
}

impl From<vk::Result> for Error {
    fn from(res: vk::Result) -> Error {
        Error::Native(res)
    }
}
