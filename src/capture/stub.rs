//! Non-Windows stand-ins. Every lookup and capture reports the platform as unsupported.

use super::offscreen::FrameCapturer;
use super::window::{WindowInfo, WindowRef, WindowSource};
use crate::error::{CaptureError, Result};
use crate::frame::CaptureFrame;

#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopWindows;

impl WindowSource for DesktopWindows {
    fn find_exact(&self, _title: &str) -> Result<Option<WindowRef>> {
        Err(CaptureError::PlatformUnsupported)
    }

    fn top_level_windows(&self) -> Result<Vec<WindowInfo>> {
        Err(CaptureError::PlatformUnsupported)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct OffscreenCapturer;

impl FrameCapturer for OffscreenCapturer {
    fn capture(&self, _window: &WindowRef) -> Result<CaptureFrame> {
        Err(CaptureError::PlatformUnsupported)
    }
}
