//! The polled image source: one call in, one frame out.
//!
//! Each poll resolves the window, captures and decodes it, looks up (or
//! selects) its region and returns the cropped, normalized frame. Failures
//! never reach the caller of [`WindowCaptureSource::poll`]; they turn into a
//! black placeholder frame so a consumer ticking on a timer always gets an
//! image of the expected layout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capture::{
    resolve_window, DesktopWindows, FrameCapturer, OffscreenCapturer, WindowSource,
};
use crate::error::{CaptureError, Result};
use crate::frame::decode;
use crate::normalize::{crop, OutputFrame};
use crate::region::{RegionCache, RegionSelector};

/// Set once the "unsupported platform" message has been logged.
static PLATFORM_WARNED: AtomicBool = AtomicBool::new(false);

/// Inputs for a single poll.
#[derive(Clone, Debug, Default)]
pub struct CaptureRequest {
    /// Exact title or case-insensitive part of a title
    pub window_title: String,
    /// Ask for a new region even if one is cached
    pub reset_roi: bool,
    /// Changes on every tick so the host re-runs the capture. Not used otherwise
    pub poll_token: u64,
}

impl CaptureRequest {
    pub fn new(window_title: impl Into<String>) -> Self {
        Self {
            window_title: window_title.into(),
            ..Default::default()
        }
    }
}

/// Captures a window and crops it to its cached region of interest.
pub struct WindowCaptureSource {
    windows: Box<dyn WindowSource>,
    capturer: Box<dyn FrameCapturer>,
    selector: Box<dyn RegionSelector>,
    regions: Arc<RegionCache>,
}

impl WindowCaptureSource {
    pub fn new(
        windows: Box<dyn WindowSource>,
        capturer: Box<dyn FrameCapturer>,
        selector: Box<dyn RegionSelector>,
        regions: Arc<RegionCache>,
    ) -> Self {
        Self {
            windows,
            capturer,
            selector,
            regions,
        }
    }

    /// A source backed by the real desktop and the platform capturer.
    pub fn desktop(selector: Box<dyn RegionSelector>, regions: Arc<RegionCache>) -> Self {
        Self::new(
            Box::new(DesktopWindows),
            Box::new(OffscreenCapturer),
            selector,
            regions,
        )
    }

    pub fn regions(&self) -> &Arc<RegionCache> {
        &self.regions
    }

    /// Runs one poll, reporting why it failed.
    pub fn try_poll(&self, request: &CaptureRequest) -> Result<OutputFrame> {
        let window = resolve_window(self.windows.as_ref(), &request.window_title)?;
        let frame = self.capturer.capture(&window)?;
        drop(window);

        // No GDI handle is open past this point, the selector may block for a long time
        let image = decode(frame)?;
        let roi = self.regions.get_or_select(
            &request.window_title,
            request.reset_roi,
            &image,
            self.selector.as_ref(),
        );

        Ok(crop(&image, &roi))
    }

    /// Runs one poll. Any failure yields [`OutputFrame::placeholder`].
    pub fn poll(&self, request: &CaptureRequest) -> OutputFrame {
        match self.try_poll(request) {
            Ok(frame) => frame,
            Err(CaptureError::PlatformUnsupported) => {
                if !PLATFORM_WARNED.swap(true, Ordering::Relaxed) {
                    crate::log(&format!(
                        "{}, returning black image.",
                        CaptureError::PlatformUnsupported
                    ));
                }
                OutputFrame::placeholder()
            }
            Err(e) => {
                crate::log(&format!("{}, returning black image.", e));
                OutputFrame::placeholder()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{WindowInfo, WindowRef};
    use crate::frame::{CaptureFrame, ChannelOrder};
    use crate::normalize::PLACEHOLDER_SIZE;
    use crate::region::{RoiRect, SelectedRect};
    use image::RgbImage;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeDesktop(Vec<(isize, &'static str)>);

    impl WindowSource for FakeDesktop {
        fn find_exact(&self, title: &str) -> Result<Option<WindowRef>> {
            Ok(self
                .0
                .iter()
                .find(|(_, t)| *t == title)
                .map(|(h, _)| WindowRef::from_raw(*h)))
        }

        fn top_level_windows(&self) -> Result<Vec<WindowInfo>> {
            Ok(self
                .0
                .iter()
                .map(|&(handle, title)| WindowInfo {
                    handle,
                    title: title.to_string(),
                    visible: true,
                })
                .collect())
        }
    }

    /// Captures a solid BGRX frame whose size can be changed between polls.
    struct FakeCapturer {
        size: Rc<Cell<(u32, u32)>>,
        truncate: bool,
    }

    impl FrameCapturer for FakeCapturer {
        fn capture(&self, _window: &WindowRef) -> Result<CaptureFrame> {
            let (w, h) = self.size.get();
            if w == 0 || h == 0 {
                return Err(CaptureError::CaptureFailed("window has no area".to_string()));
            }
            let mut pixels = [51u8, 102, 255, 0].repeat((w * h) as usize);
            if self.truncate {
                pixels.pop();
            }
            Ok(CaptureFrame::new(w, h, pixels, ChannelOrder::Bgrx))
        }
    }

    struct Scripted {
        answer: Option<SelectedRect>,
        calls: Rc<Cell<usize>>,
    }

    impl RegionSelector for Scripted {
        fn select(&self, _image: &RgbImage, _label: &str) -> anyhow::Result<Option<SelectedRect>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.answer)
        }
    }

    struct Harness {
        source: WindowCaptureSource,
        size: Rc<Cell<(u32, u32)>>,
        calls: Rc<Cell<usize>>,
    }

    fn harness(size: (u32, u32), answer: Option<SelectedRect>, truncate: bool) -> Harness {
        let size = Rc::new(Cell::new(size));
        let calls = Rc::new(Cell::new(0));
        let source = WindowCaptureSource::new(
            Box::new(FakeDesktop(vec![(1, "Notepad - a.txt"), (2, "Notepad - b.txt")])),
            Box::new(FakeCapturer {
                size: size.clone(),
                truncate,
            }),
            Box::new(Scripted {
                answer,
                calls: calls.clone(),
            }),
            Arc::new(RegionCache::new()),
        );
        Harness {
            source,
            size,
            calls,
        }
    }

    fn assert_placeholder(frame: &OutputFrame) {
        assert_eq!(
            frame.shape(),
            [1, PLACEHOLDER_SIZE as usize, PLACEHOLDER_SIZE as usize, 3]
        );
        assert!(frame.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_missing_window_returns_placeholder() {
        let h = harness((100, 100), None, false);

        let request = CaptureRequest::new("Photoshop");
        assert!(matches!(
            h.source.try_poll(&request),
            Err(CaptureError::WindowNotFound(_))
        ));
        assert_placeholder(&h.source.poll(&request));
        assert_eq!(h.calls.get(), 0);
    }

    #[test]
    fn test_zero_area_window_returns_placeholder() {
        let h = harness((0, 0), None, false);

        assert_placeholder(&h.source.poll(&CaptureRequest::new("notepad")));
        assert!(h.source.regions().is_empty());
    }

    #[test]
    fn test_bad_buffer_returns_placeholder() {
        let h = harness((10, 10), None, true);

        let request = CaptureRequest::new("notepad");
        assert!(matches!(
            h.source.try_poll(&request),
            Err(CaptureError::BufferDecode { .. })
        ));
        assert_placeholder(&h.source.poll(&request));
    }

    #[test]
    fn test_unsupported_platform_returns_placeholder() {
        struct Unsupported;
        impl FrameCapturer for Unsupported {
            fn capture(&self, _window: &WindowRef) -> Result<CaptureFrame> {
                Err(CaptureError::PlatformUnsupported)
            }
        }

        let source = WindowCaptureSource::new(
            Box::new(FakeDesktop(vec![(1, "Notepad")])),
            Box::new(Unsupported),
            Box::new(crate::selector::NoSelector),
            Arc::new(RegionCache::new()),
        );
        for _ in 0..2 {
            assert_placeholder(&source.poll(&CaptureRequest::new("Notepad")));
        }
    }

    #[test]
    fn test_first_poll_selects_then_reuses_region() {
        let h = harness((200, 150), Some(SelectedRect::new(20, 30, 120, 80)), false);
        let mut request = CaptureRequest::new("notepad");

        let first = h.source.poll(&request);
        request.poll_token = 42;
        let second = h.source.poll(&request);

        assert_eq!(first.shape(), [1, 50, 100, 3]);
        assert_eq!(second.shape(), first.shape());
        assert_eq!(second, first);
        assert_eq!(h.calls.get(), 1);
        assert_eq!(
            h.source.regions().get("notepad"),
            Some(RoiRect::new(20, 30, 100, 50))
        );
    }

    #[test]
    fn test_decoded_colors_reach_output() {
        let h = harness((4, 4), None, false);

        let frame = h.source.poll(&CaptureRequest::new("notepad"));
        // BGRX [51, 102, 255, _] -> RGB [255, 102, 51]
        assert_eq!(frame.pixel(3, 3), Some([1.0, 0.4, 0.2]));
        assert!(frame.data().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_window_shrinking_clips_cached_region() {
        let h = harness((200, 200), Some(SelectedRect::new(10, 10, 110, 110)), false);
        let request = CaptureRequest::new("notepad");
        assert_eq!(h.source.poll(&request).shape(), [1, 100, 100, 3]);

        h.size.set((50, 50));
        assert_eq!(h.source.poll(&request).shape(), [1, 40, 40, 3]);
        // Stored region is untouched by the clip
        assert_eq!(
            h.source.regions().get("notepad"),
            Some(RoiRect::new(10, 10, 100, 100))
        );
    }

    #[test]
    fn test_reset_asks_again() {
        let h = harness((64, 64), None, false);
        let mut request = CaptureRequest::new("notepad");

        assert_eq!(h.source.poll(&request).shape(), [1, 64, 64, 3]);
        request.reset_roi = true;
        h.source.poll(&request);
        h.source.poll(&request);

        assert_eq!(h.calls.get(), 3);
    }

    #[test]
    fn test_cache_survives_window_disappearing() {
        let h = harness((80, 60), Some(SelectedRect::new(0, 0, 40, 30)), false);
        let request = CaptureRequest::new("notepad");
        h.source.poll(&request);

        h.size.set((0, 0));
        assert_placeholder(&h.source.poll(&request));

        h.size.set((80, 60));
        assert_eq!(h.source.poll(&request).shape(), [1, 30, 40, 3]);
        assert_eq!(h.calls.get(), 1);
    }
}
