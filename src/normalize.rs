//! Cropping and conversion of captured images into output frames.

use image::RgbImage;

use crate::region::RoiRect;

/// Width and height of the all-zero frame returned when capture fails.
pub const PLACEHOLDER_SIZE: u32 = 512;

/// A single-image RGB batch with values in `[0, 1]`.
///
/// Shape is `(1, height, width, 3)`, stored row-major with interleaved channels.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputFrame {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl OutputFrame {
    /// An all-zero frame of the given size.
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width as usize * height as usize * 3],
        }
    }

    /// The fixed-size frame delivered in place of a failed capture.
    pub fn placeholder() -> Self {
        Self::zeros(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `[batch, height, width, channels]`
    pub fn shape(&self) -> [usize; 4] {
        [1, self.height as usize, self.width as usize, 3]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    /// RGB values of one pixel, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[f32; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 3;
        self.data.get(i..i + 3).map(|px| [px[0], px[1], px[2]])
    }

    /// Converts back to 8-bit RGB for saving or display.
    pub fn to_rgb_image(&self) -> RgbImage {
        let bytes = self
            .data
            .iter()
            .map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect();
        RgbImage::from_raw(self.width, self.height, bytes)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}

/// Clips `roi` to a `width` x `height` frame.
///
/// Returns `(x, y, w, h)`. A rectangle that clips down to nothing becomes the
/// whole frame, since the window may have shrunk since the region was chosen.
pub fn clip_roi(roi: &RoiRect, width: u32, height: u32) -> (u32, u32, u32, u32) {
    if width == 0 || height == 0 {
        return (0, 0, width, height);
    }

    let (w, h) = (i64::from(width), i64::from(height));
    let x1 = i64::from(roi.x).clamp(0, w - 1);
    let y1 = i64::from(roi.y).clamp(0, h - 1);
    let x2 = (i64::from(roi.x) + i64::from(roi.w)).clamp(x1, w);
    let y2 = (i64::from(roi.y) + i64::from(roi.h)).clamp(y1, h);

    if x2 == x1 || y2 == y1 {
        return (0, 0, width, height);
    }

    // All values lie within 0..=width / 0..=height here
    (x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32)
}

/// Crops `frame` to `roi` (clipped to the frame) and scales bytes to `[0, 1]`.
pub fn crop(frame: &RgbImage, roi: &RoiRect) -> OutputFrame {
    let (x, y, w, h) = clip_roi(roi, frame.width(), frame.height());
    let cropped = image::imageops::crop_imm(frame, x, y, w, h).to_image();

    OutputFrame {
        width: w,
        height: h,
        data: cropped
            .into_raw()
            .into_iter()
            .map(|v| f32::from(v) / 255.0)
            .collect(),
    }
}
