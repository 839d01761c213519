//! Off-screen window capture: render strategies and the capturer interface.
//!
//! A window is asked to paint itself into a memory bitmap rather than being
//! copied from the screen, so covered and minimized windows still produce
//! their real contents.

use super::window::WindowRef;
use crate::error::{CaptureError, Result};
use crate::frame::CaptureFrame;

/// How a window is asked to render itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// Full composited content, including windows that are covered or
    /// minimized (`PW_RENDERFULLCONTENT`, Windows 8.1+).
    FullContent,
    /// Legacy print; may come back blank for covered windows.
    Legacy,
}

impl RenderMode {
    /// `PrintWindow` flags for this mode.
    pub fn print_flags(self) -> u32 {
        match self {
            RenderMode::FullContent => 0x0000_0002,
            RenderMode::Legacy => 0,
        }
    }
}

/// Render modes in the order they are attempted.
pub const RENDER_STRATEGIES: [RenderMode; 2] = [RenderMode::FullContent, RenderMode::Legacy];

/// Tries each strategy in order and returns the first that succeeds.
pub fn first_successful<F>(strategies: &[RenderMode], mut render: F) -> Option<RenderMode>
where
    F: FnMut(RenderMode) -> bool,
{
    strategies.iter().copied().find(|&mode| render(mode))
}

/// Checks a window rectangle's size before any graphics resources are acquired.
///
/// Collapsed windows report an empty rectangle; that is a failed capture.
pub fn validate_bounds(width: i32, height: i32) -> Result<(u32, u32)> {
    if width <= 0 || height <= 0 {
        return Err(CaptureError::CaptureFailed(format!(
            "window has no area ({}x{})",
            width, height
        )));
    }
    Ok((width as u32, height as u32))
}

/// Produces a raw top-down pixel buffer for a window.
pub trait FrameCapturer {
    fn capture(&self, window: &WindowRef) -> Result<CaptureFrame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_content_tried_first() {
        let mut attempts = Vec::new();
        let mode = first_successful(&RENDER_STRATEGIES, |mode| {
            attempts.push(mode);
            true
        });

        assert_eq!(mode, Some(RenderMode::FullContent));
        assert_eq!(attempts, vec![RenderMode::FullContent]);
    }

    #[test]
    fn test_falls_back_to_legacy_once() {
        let mut attempts = Vec::new();
        let mode = first_successful(&RENDER_STRATEGIES, |mode| {
            attempts.push(mode);
            mode == RenderMode::Legacy
        });

        assert_eq!(mode, Some(RenderMode::Legacy));
        assert_eq!(attempts, vec![RenderMode::FullContent, RenderMode::Legacy]);
    }

    #[test]
    fn test_all_strategies_failing() {
        let mut attempts = 0;
        let mode = first_successful(&RENDER_STRATEGIES, |_| {
            attempts += 1;
            false
        });

        assert_eq!(mode, None);
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_print_flags() {
        assert_eq!(RenderMode::FullContent.print_flags(), 2);
        assert_eq!(RenderMode::Legacy.print_flags(), 0);
    }

    #[test]
    fn test_zero_area_window_is_capture_failure() {
        assert!(matches!(validate_bounds(0, 100), Err(CaptureError::CaptureFailed(_))));
        assert!(matches!(validate_bounds(100, 0), Err(CaptureError::CaptureFailed(_))));
        assert!(matches!(validate_bounds(-5, 10), Err(CaptureError::CaptureFailed(_))));
        assert_eq!(validate_bounds(800, 600).unwrap(), (800, 600));
    }
}
