//! Frame type and pixel conversion — YUYV/BGR to RGB, downsampling.

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Byte order of the three samples in each pixel of a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    Rgb,
    /// Red and blue swapped, as delivered by `BGR3` capture.
    Bgr,
}

/// A captured colour camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Packed 3-channel pixels in `order`.
    pub image: RgbImage,
    pub order: ChannelOrder,
    pub timestamp: std::time::Instant,
    pub sequence: u32,
}

impl Frame {
    /// Wrap an image that is already in RGB order.
    pub fn from_rgb(image: RgbImage, sequence: u32) -> Self {
        Self {
            image,
            order: ChannelOrder::Rgb,
            timestamp: std::time::Instant::now(),
            sequence,
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Resize by `factor` on both axes, keeping the channel order.
    ///
    /// Output dimensions are rounded and never drop below 1×1.
    pub fn downsample(&self, factor: f32) -> Frame {
        let (w, h) = scaled_dimensions(self.width(), self.height(), factor);
        Frame {
            image: imageops::resize(&self.image, w, h, FilterType::Triangle),
            order: self.order,
            timestamp: self.timestamp,
            sequence: self.sequence,
        }
    }

    /// Return the pixels in RGB order, swapping red and blue if needed.
    pub fn to_rgb(&self) -> RgbImage {
        let mut image = self.image.clone();
        if self.order == ChannelOrder::Bgr {
            swap_red_blue(&mut image);
        }
        image
    }

    /// Mean of all samples (0.0–255.0).
    pub fn avg_brightness(&self) -> f32 {
        let raw = self.image.as_raw();
        if raw.is_empty() {
            return 0.0;
        }
        raw.iter().map(|&b| b as f32).sum::<f32>() / raw.len() as f32
    }
}

/// Dimensions after scaling by `factor`, rounded, clamped to at least 1.
pub fn scaled_dimensions(width: u32, height: u32, factor: f32) -> (u32, u32) {
    let w = ((width as f32 * factor).round() as u32).max(1);
    let h = ((height as f32 * factor).round() as u32).max(1);
    (w, h)
}

/// Swap the first and third sample of every pixel in place.
pub fn swap_red_blue(image: &mut RgbImage) {
    for pixel in image.pixels_mut() {
        pixel.0.swap(0, 2);
    }
}

/// Convert packed YUYV (4:2:2) to RGB using BT.601 coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share U/V.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let pixels = (width as usize) * (height as usize);
    let expected = pixels * 2;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity(pixels * 3);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0] as f32, chunk[2] as f32] {
            rgb.push((y + 1.402 * v).round().clamp(0.0, 255.0) as u8);
            rgb.push((y - 0.344 * u - 0.714 * v).round().clamp(0.0, 255.0) as u8);
            rgb.push((y + 1.772 * u).round().clamp(0.0, 255.0) as u8);
        }
    }

    RgbImage::from_raw(width, height, rgb).ok_or(FrameError::InvalidLength {
        expected,
        actual: yuyv.len(),
    })
}

/// Copy a packed 3-byte-per-pixel buffer (`RGB3` or `BGR3`) into an image.
pub fn packed_to_image(buf: &[u8], width: u32, height: u32) -> Result<RgbImage, FrameError> {
    let expected = (width as usize) * (height as usize) * 3;
    if buf.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: buf.len(),
        });
    }
    RgbImage::from_raw(width, height, buf[..expected].to_vec()).ok_or(FrameError::InvalidLength {
        expected,
        actual: buf.len(),
    })
}

/// Decode one MJPEG buffer into an RGB image.
pub fn decode_mjpeg(buf: &[u8]) -> Result<RgbImage, FrameError> {
    let decoded = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg)?;
    Ok(decoded.to_rgb8())
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("MJPEG decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_yuyv_grey_maps_to_grey() {
        // U = V = 128 means no chroma: R = G = B = Y
        let yuyv = vec![100, 128, 200, 128];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([100, 100, 100]));
        assert_eq!(rgb.get_pixel(1, 0), &Rgb([200, 200, 200]));
    }

    #[test]
    fn test_yuyv_red_chroma() {
        // High V pushes red up and green down
        let yuyv = vec![100, 128, 100, 228];
        let rgb = yuyv_to_rgb(&yuyv, 2, 1).unwrap();
        let px = rgb.get_pixel(0, 0);
        assert!(px[0] > 200, "red = {}", px[0]);
        assert!(px[1] < 50, "green = {}", px[1]);
        assert_eq!(px[2], 100);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        let yuyv = vec![100, 128];
        assert!(matches!(
            yuyv_to_rgb(&yuyv, 2, 1),
            Err(FrameError::InvalidLength { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_packed_short_buffer() {
        assert!(packed_to_image(&[0u8; 5], 2, 1).is_err());
        let img = packed_to_image(&[1, 2, 3, 4, 5, 6, 7], 2, 1).unwrap();
        assert_eq!(img.get_pixel(1, 0), &Rgb([4, 5, 6]));
    }

    #[test]
    fn test_bgr_frame_converts_to_rgb() {
        let mut image = RgbImage::new(1, 1);
        image.put_pixel(0, 0, Rgb([10, 20, 30]));
        let frame = Frame {
            image,
            order: ChannelOrder::Bgr,
            timestamp: std::time::Instant::now(),
            sequence: 0,
        };
        assert_eq!(frame.to_rgb().get_pixel(0, 0), &Rgb([30, 20, 10]));
        // The frame itself is untouched
        assert_eq!(frame.image.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }

    #[test]
    fn test_rgb_frame_unchanged() {
        let image = RgbImage::from_pixel(2, 2, Rgb([1, 2, 3]));
        let frame = Frame::from_rgb(image.clone(), 7);
        assert_eq!(frame.to_rgb(), image);
    }

    #[test]
    fn test_downsample_quarter() {
        let frame = Frame::from_rgb(RgbImage::from_pixel(640, 480, Rgb([90, 90, 90])), 1);
        let small = frame.downsample(0.25);
        assert_eq!((small.width(), small.height()), (160, 120));
        assert_eq!(small.order, ChannelOrder::Rgb);
        assert_eq!(small.sequence, 1);
        // Uniform input stays uniform
        assert!(small.image.pixels().all(|p| *p == Rgb([90, 90, 90])));
    }

    #[test]
    fn test_scaled_dimensions_never_zero() {
        assert_eq!(scaled_dimensions(2, 1, 0.25), (1, 1));
        assert_eq!(scaled_dimensions(642, 482, 0.25), (161, 121));
    }

    #[test]
    fn test_avg_brightness() {
        let frame = Frame::from_rgb(RgbImage::from_pixel(4, 4, Rgb([0, 128, 255])), 0);
        assert!((frame.avg_brightness() - 127.666_67).abs() < 1e-3);
    }
}
