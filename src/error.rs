//! Error types for window capture.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Window '{0}' not found")]
    WindowNotFound(String),

    #[error("Capture failed: {0}")]
    CaptureFailed(String),

    #[error("Pixel buffer has {actual} bytes, expected {expected}")]
    BufferDecode { expected: usize, actual: usize },

    #[error("Window capture is only supported on Windows")]
    PlatformUnsupported,
}

pub type Result<T> = std::result::Result<T, CaptureError>;
