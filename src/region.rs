//! Per-window region of interest cache.
//!
//! Remembers which part of each window the user wants, keyed by the window
//! title exactly as the caller typed it. A region is chosen once (or again on
//! reset) through a [`RegionSelector`] and reused on every later poll.

use image::RgbImage;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

/// A crop rectangle in pixel coordinates of the frame it was selected on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl RoiRect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// The rectangle covering an entire frame.
    pub fn full_frame(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            w: i32::try_from(width).unwrap_or(i32::MAX),
            h: i32::try_from(height).unwrap_or(i32::MAX),
        }
    }

    pub fn has_area(&self) -> bool {
        self.w > 0 && self.h > 0
    }
}

/// Corner coordinates returned by a selector, in image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectedRect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl SelectedRect {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Converts corners (in any order) to an origin + size rectangle.
    pub fn to_roi(&self) -> RoiRect {
        let x = self.x1.min(self.x2);
        let y = self.y1.min(self.y2);
        RoiRect {
            x,
            y,
            w: self.x1.max(self.x2).saturating_sub(x),
            h: self.y1.max(self.y2).saturating_sub(y),
        }
    }
}

/// Lets a human (or anything else) pick a region on a full captured frame.
///
/// Blocks until a choice is made. `Ok(None)` means the user cancelled.
pub trait RegionSelector {
    fn select(&self, image: &RgbImage, label: &str) -> anyhow::Result<Option<SelectedRect>>;
}

/// Region storage shared by every poll of a capture source.
///
/// Entries never expire. The map lock is never held while a selector runs.
#[derive(Debug, Default)]
pub struct RegionCache {
    regions: Mutex<HashMap<String, RoiRect>>,
}

impl RegionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn regions(&self) -> std::sync::MutexGuard<'_, HashMap<String, RoiRect>> {
        self.regions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<RoiRect> {
        self.regions().get(key).copied()
    }

    pub fn remove(&self, key: &str) -> Option<RoiRect> {
        self.regions().remove(key)
    }

    pub fn clear(&self) {
        self.regions().clear();
    }

    pub fn len(&self) -> usize {
        self.regions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions().is_empty()
    }

    /// Returns the cached region for `key`, or asks `selector` for one.
    ///
    /// A cached region is returned as stored, even if `frame` has since
    /// changed size; clipping happens at crop time. When the selector
    /// cancels, fails or returns an empty rectangle, the full frame is stored.
    pub fn get_or_select(
        &self,
        key: &str,
        reset: bool,
        frame: &RgbImage,
        selector: &dyn RegionSelector,
    ) -> RoiRect {
        if !reset {
            if let Some(rect) = self.get(key) {
                return rect;
            }
        }

        crate::log(&format!("Select a region for \"{}\"...", key));
        let rect = match run_selector(selector, frame, key).map(|s| s.to_roi()) {
            Some(rect) if rect.has_area() => {
                crate::log(&format!("Region cached for \"{}\": {:?}", key, rect));
                rect
            }
            _ => {
                let (width, height) = frame.dimensions();
                crate::log(&format!(
                    "No region selected for \"{}\", using full frame {}x{}",
                    key, width, height
                ));
                RoiRect::full_frame(width, height)
            }
        };

        self.regions().insert(key.to_string(), rect);
        rect
    }
}

/// Runs the selector, treating errors and panics as "no selection".
fn run_selector(
    selector: &dyn RegionSelector,
    frame: &RgbImage,
    label: &str,
) -> Option<SelectedRect> {
    match panic::catch_unwind(AssertUnwindSafe(|| selector.select(frame, label))) {
        Ok(Ok(selection)) => selection,
        Ok(Err(e)) => {
            crate::log(&format!("Region selector failed: {}", e));
            None
        }
        Err(_) => {
            crate::log("Region selector panicked");
            None
        }
    }
}
