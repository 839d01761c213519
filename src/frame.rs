//! Raw capture buffers and their conversion to RGB images.

use image::RgbImage;

use crate::error::{CaptureError, Result};

/// Every captured pixel is 32 bits.
pub const BYTES_PER_PIXEL: usize = 4;

/// Byte layout of a captured pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Blue, green, red, alpha
    Bgra,
    /// Blue, green, red, undefined padding byte (GDI DIB sections)
    Bgrx,
}

/// A top-down 32-bit pixel buffer straight from the capturer.
///
/// Row 0 is the visual top of the window. Rows are tightly packed
/// (`width * 4` bytes, no stride padding).
#[derive(Debug)]
pub struct CaptureFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub channel_order: ChannelOrder,
}

impl CaptureFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>, channel_order: ChannelOrder) -> Self {
        Self {
            width,
            height,
            pixels,
            channel_order,
        }
    }
}

/// Buffer length required for a frame of the given size, `None` on overflow.
pub fn expected_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}

/// Converts a captured frame into an RGB image, dropping the 4th byte of each pixel.
///
/// Fails only when the buffer length does not match `width * height * 4`.
pub fn decode(frame: CaptureFrame) -> Result<RgbImage> {
    let actual = frame.pixels.len();
    let expected = match expected_len(frame.width, frame.height) {
        Some(len) if len == actual => len,
        other => {
            return Err(CaptureError::BufferDecode {
                expected: other.unwrap_or(usize::MAX),
                actual,
            });
        }
    };

    let mut rgb = Vec::with_capacity(expected / BYTES_PER_PIXEL * 3);
    for px in frame.pixels.chunks_exact(BYTES_PER_PIXEL) {
        match frame.channel_order {
            // Alpha and padding are both discarded, so the two layouts decode the same way
            ChannelOrder::Bgra | ChannelOrder::Bgrx => {
                rgb.extend_from_slice(&[px[2], px[1], px[0]]);
            }
        }
    }

    RgbImage::from_raw(frame.width, frame.height, rgb).ok_or(CaptureError::BufferDecode {
        expected,
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn bgrx_frame(width: u32, height: u32) -> CaptureFrame {
        let mut pixels = Vec::new();
        for y in 0..height {
            for x in 0..width {
                // B, G, R, X
                pixels.extend_from_slice(&[x as u8, y as u8, 200, 0xAB]);
            }
        }
        CaptureFrame::new(width, height, pixels, ChannelOrder::Bgrx)
    }

    #[test]
    fn test_decode_reorders_to_rgb() {
        let img = decode(bgrx_frame(3, 2)).unwrap();

        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(*img.get_pixel(0, 0), Rgb([200, 0, 0]));
        assert_eq!(*img.get_pixel(2, 1), Rgb([200, 1, 2]));
    }

    #[test]
    fn test_decode_is_top_down() {
        // Row 0 of the buffer must stay row 0 of the image
        let mut pixels = vec![0u8; 2 * 2 * 4];
        pixels[0..4].copy_from_slice(&[10, 20, 30, 255]);
        let frame = CaptureFrame::new(2, 2, pixels, ChannelOrder::Bgra);

        let img = decode(frame).unwrap();
        assert_eq!(*img.get_pixel(0, 0), Rgb([30, 20, 10]));
        assert_eq!(*img.get_pixel(0, 1), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_decode_accepts_any_exact_length() {
        for (w, h) in [(1, 1), (1, 7), (13, 1), (64, 48), (100, 3)] {
            let frame = CaptureFrame::new(w, h, vec![0; (w * h * 4) as usize], ChannelOrder::Bgrx);
            let img = decode(frame).unwrap();
            assert_eq!(img.dimensions(), (w, h));
        }
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        for len in [0usize, 15, 17, 4 * 4 * 3] {
            let frame = CaptureFrame::new(2, 2, vec![0; len], ChannelOrder::Bgrx);
            match decode(frame) {
                Err(CaptureError::BufferDecode { expected, actual }) => {
                    assert_eq!(expected, 16);
                    assert_eq!(actual, len);
                }
                other => panic!("expected BufferDecode, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_expected_len() {
        assert_eq!(expected_len(10, 20), Some(800));
        assert_eq!(expected_len(0, 20), Some(0));
    }
}
