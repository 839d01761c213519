//! Off-screen capture through GDI `PrintWindow`.
//!
//! Every GDI object acquired here is owned by a guard whose `Drop` releases
//! it, so early returns cannot leak handles. Capture runs on every poll and a
//! leak would pile up for the lifetime of the process.

use std::ffi::c_void;

use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::Graphics::Gdi::{
    CreateCompatibleBitmap, CreateCompatibleDC, DeleteDC, DeleteObject, GetDIBits, GetWindowDC,
    ReleaseDC, SelectObject, BITMAPINFO, BITMAPINFOHEADER, BI_RGB, DIB_RGB_COLORS, HBITMAP, HDC,
    HGDIOBJ,
};
use windows::Win32::Storage::Xps::{PrintWindow, PRINT_WINDOW_FLAGS};
use windows::Win32::UI::WindowsAndMessaging::GetWindowRect;

use super::offscreen::{
    first_successful, validate_bounds, FrameCapturer, RenderMode, RENDER_STRATEGIES,
};
use super::window::WindowRef;
use crate::error::{CaptureError, Result};
use crate::frame::{expected_len, CaptureFrame, ChannelOrder};

/// Device context of a whole window (title bar and borders included).
struct WindowDc {
    hwnd: HWND,
    hdc: HDC,
}

impl WindowDc {
    fn acquire(hwnd: HWND) -> Result<Self> {
        let hdc = unsafe { GetWindowDC(hwnd) };
        if hdc.is_invalid() {
            return Err(CaptureError::CaptureFailed("GetWindowDC failed".to_string()));
        }
        Ok(Self { hwnd, hdc })
    }
}

impl Drop for WindowDc {
    fn drop(&mut self) {
        unsafe {
            let _ = ReleaseDC(self.hwnd, self.hdc);
        }
    }
}

/// Memory device context compatible with a window DC.
struct MemoryDc(HDC);

impl MemoryDc {
    fn compatible_with(window_dc: &WindowDc) -> Result<Self> {
        let hdc = unsafe { CreateCompatibleDC(window_dc.hdc) };
        if hdc.is_invalid() {
            return Err(CaptureError::CaptureFailed(
                "CreateCompatibleDC failed".to_string(),
            ));
        }
        Ok(Self(hdc))
    }
}

impl Drop for MemoryDc {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

/// Bitmap sized to the window, in the window DC's format.
struct CompatibleBitmap(HBITMAP);

impl CompatibleBitmap {
    fn create(window_dc: &WindowDc, width: u32, height: u32) -> Result<Self> {
        let bitmap = unsafe { CreateCompatibleBitmap(window_dc.hdc, width as i32, height as i32) };
        if bitmap.is_invalid() {
            return Err(CaptureError::CaptureFailed(format!(
                "CreateCompatibleBitmap failed for {}x{}",
                width, height
            )));
        }
        Ok(Self(bitmap))
    }
}

impl Drop for CompatibleBitmap {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteObject(self.0);
        }
    }
}

/// A bitmap selected into a memory DC. Dropping restores the previous object.
///
/// Must be dropped before the bitmap is read or deleted.
struct SelectedBitmap<'a> {
    memory_dc: &'a MemoryDc,
    previous: HGDIOBJ,
}

impl<'a> SelectedBitmap<'a> {
    fn select(memory_dc: &'a MemoryDc, bitmap: &CompatibleBitmap) -> Result<Self> {
        let previous = unsafe { SelectObject(memory_dc.0, bitmap.0) };
        if previous.is_invalid() {
            return Err(CaptureError::CaptureFailed("SelectObject failed".to_string()));
        }
        Ok(Self {
            memory_dc,
            previous,
        })
    }
}

impl Drop for SelectedBitmap<'_> {
    fn drop(&mut self) {
        unsafe {
            let _ = SelectObject(self.memory_dc.0, self.previous);
        }
    }
}

/// Captures windows with `PrintWindow`, falling back from full-content to legacy rendering.
#[derive(Clone, Copy, Debug, Default)]
pub struct OffscreenCapturer;

impl FrameCapturer for OffscreenCapturer {
    fn capture(&self, window: &WindowRef) -> Result<CaptureFrame> {
        let hwnd = HWND(window.raw() as *mut c_void);

        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd, &mut rect) }
            .map_err(|e| CaptureError::CaptureFailed(format!("GetWindowRect failed: {}", e)))?;
        let (width, height) = validate_bounds(rect.right - rect.left, rect.bottom - rect.top)?;

        // Dropped in reverse order: selection, bitmap, memory DC, window DC
        let window_dc = WindowDc::acquire(hwnd)?;
        let memory_dc = MemoryDc::compatible_with(&window_dc)?;
        let bitmap = CompatibleBitmap::create(&window_dc, width, height)?;
        let selection = SelectedBitmap::select(&memory_dc, &bitmap)?;

        let mode = first_successful(&RENDER_STRATEGIES, |mode| unsafe {
            PrintWindow(hwnd, memory_dc.0, PRINT_WINDOW_FLAGS(mode.print_flags())).as_bool()
        })
        .ok_or_else(|| {
            CaptureError::CaptureFailed("PrintWindow failed in every render mode".to_string())
        })?;
        if mode == RenderMode::Legacy {
            crate::log("Full-content render unavailable, used legacy PrintWindow");
        }

        // GetDIBits requires the bitmap to be deselected
        drop(selection);

        let pixels = read_top_down_bits(&memory_dc, &bitmap, width, height)?;
        Ok(CaptureFrame::new(width, height, pixels, ChannelOrder::Bgrx))
    }
}

/// Copies the bitmap out as a top-down, 32 bits per pixel, uncompressed buffer.
fn read_top_down_bits(
    memory_dc: &MemoryDc,
    bitmap: &CompatibleBitmap,
    width: u32,
    height: u32,
) -> Result<Vec<u8>> {
    let len = expected_len(width, height)
        .ok_or_else(|| CaptureError::CaptureFailed(format!("{}x{} is too large", width, height)))?;

    let mut info = BITMAPINFO {
        bmiHeader: BITMAPINFOHEADER {
            biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
            biWidth: width as i32,
            // Negative height = top-down rows
            biHeight: -(height as i32),
            biPlanes: 1,
            biBitCount: 32,
            biCompression: BI_RGB.0,
            ..Default::default()
        },
        ..Default::default()
    };

    let mut pixels = vec![0u8; len];
    let lines = unsafe {
        GetDIBits(
            memory_dc.0,
            bitmap.0,
            0,
            height,
            Some(pixels.as_mut_ptr() as *mut c_void),
            &mut info,
            DIB_RGB_COLORS,
        )
    };

    if lines <= 0 || lines as u32 != height {
        return Err(CaptureError::CaptureFailed(format!(
            "GetDIBits copied {} of {} lines",
            lines, height
        )));
    }

    Ok(pixels)
}
