//! Window discovery: turning a user-typed name into a live window handle.

use crate::error::{CaptureError, Result};

/// Handle to a live top-level window.
///
/// Not `Clone`: a handle belongs to the poll that resolved it and is dropped
/// when that poll ends. Windows close and reopen between polls, so every poll
/// resolves its own.
#[derive(Debug, PartialEq, Eq)]
pub struct WindowRef(isize);

impl WindowRef {
    pub fn from_raw(raw: isize) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> isize {
        self.0
    }
}

/// A top-level window as seen during enumeration.
#[derive(Clone, Debug)]
pub struct WindowInfo {
    pub handle: isize,
    pub title: String,
    pub visible: bool,
}

/// Read-only view of the desktop's top-level windows.
pub trait WindowSource {
    /// Finds a top-level window whose title is exactly `title`.
    fn find_exact(&self, title: &str) -> Result<Option<WindowRef>>;

    /// Lists all top-level windows in enumeration order.
    fn top_level_windows(&self) -> Result<Vec<WindowInfo>>;
}

/// Resolves `name` to a window.
///
/// Tries an exact title match first, then the first *visible* window whose
/// title contains `name` ignoring case, in enumeration order. An empty
/// `name` is contained in every title.
pub fn resolve_window(source: &dyn WindowSource, name: &str) -> Result<WindowRef> {
    if let Some(window) = source.find_exact(name)? {
        return Ok(window);
    }

    let needle = name.to_lowercase();
    source
        .top_level_windows()?
        .into_iter()
        .find(|w| w.visible && w.title.to_lowercase().contains(&needle))
        .map(|w| {
            crate::log(&format!("Matched \"{}\" to window \"{}\"", name, w.title));
            WindowRef::from_raw(w.handle)
        })
        .ok_or_else(|| CaptureError::WindowNotFound(name.to_string()))
}

#[cfg(windows)]
pub use desktop::DesktopWindows;

#[cfg(windows)]
mod desktop {
    use std::ffi::OsString;
    use std::os::windows::ffi::OsStringExt;

    use windows::core::{HSTRING, PCWSTR};
    use windows::Win32::Foundation::{BOOL, HWND, LPARAM, TRUE};
    use windows::Win32::UI::WindowsAndMessaging::{
        EnumWindows, FindWindowW, GetWindowTextLengthW, GetWindowTextW, IsWindowVisible,
    };

    use super::{WindowInfo, WindowRef, WindowSource};
    use crate::error::{CaptureError, Result};

    /// The real desktop, queried through user32.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct DesktopWindows;

    fn window_title(hwnd: HWND) -> String {
        unsafe {
            let title_len = GetWindowTextLengthW(hwnd);
            if title_len <= 0 {
                return String::new();
            }
            let mut title_buf: Vec<u16> = vec![0; (title_len + 1) as usize];
            let copied = GetWindowTextW(hwnd, &mut title_buf);
            let copied = copied.clamp(0, title_len) as usize;
            OsString::from_wide(&title_buf[..copied])
                .to_string_lossy()
                .to_string()
        }
    }

    impl WindowSource for DesktopWindows {
        fn find_exact(&self, title: &str) -> Result<Option<WindowRef>> {
            let title = HSTRING::from(title);
            let found = unsafe { FindWindowW(PCWSTR::null(), PCWSTR(title.as_ptr())) };
            // FindWindowW reports "no such window" as an error
            Ok(found
                .ok()
                .filter(|hwnd| !hwnd.is_invalid())
                .map(|hwnd| WindowRef::from_raw(hwnd.0 as isize)))
        }

        fn top_level_windows(&self) -> Result<Vec<WindowInfo>> {
            unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
                unsafe {
                    let windows = &mut *(lparam.0 as *mut Vec<WindowInfo>);
                    windows.push(WindowInfo {
                        handle: hwnd.0 as isize,
                        title: window_title(hwnd),
                        visible: IsWindowVisible(hwnd).as_bool(),
                    });
                }
                TRUE
            }

            let mut windows: Vec<WindowInfo> = Vec::new();
            unsafe {
                EnumWindows(
                    Some(enum_callback),
                    LPARAM(&mut windows as *mut Vec<WindowInfo> as isize),
                )
            }
            .map_err(|e| CaptureError::CaptureFailed(format!("EnumWindows failed: {}", e)))?;

            Ok(windows)
        }
    }
}
