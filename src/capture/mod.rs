//! Window capture.
//!
//! This module provides:
//! - Window discovery (`resolve_window`, `DesktopWindows`)
//! - Off-screen capture (`OffscreenCapturer`) with full-content and legacy render modes
//!
//! The GDI implementation is Windows-only; other targets get stubs that
//! report `PlatformUnsupported`.

pub mod offscreen;
pub mod window;

#[cfg(windows)]
mod gdi;
#[cfg(windows)]
pub use gdi::OffscreenCapturer;
#[cfg(windows)]
pub use window::DesktopWindows;

#[cfg(not(windows))]
mod stub;
#[cfg(not(windows))]
pub use stub::{DesktopWindows, OffscreenCapturer};

pub use offscreen::{FrameCapturer, RenderMode};
pub use window::{resolve_window, WindowInfo, WindowRef, WindowSource};
