//! V4L2 camera capture via the `v4l` crate.

use crate::frame::{self, ChannelOrder, Frame};
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

const REQUESTED_WIDTH: u32 = 640;
const REQUESTED_HEIGHT: u32 = 480;
const STREAM_BUFFERS: u32 = 4;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("streaming not supported")]
    StreamingNotSupported,
    #[error("camera already released")]
    Released,
}

/// A source of frames pulled one at a time by the display loop.
pub trait VideoSource {
    /// Read the next frame. `None` means no frame was available this time;
    /// callers skip the tick and try again later.
    fn read(&mut self) -> Option<Frame>;

    /// Release the underlying device. Safe to call more than once.
    fn release(&mut self);
}

/// Info about a discovered V4L2 device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Negotiated pixel format for the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed, converted to RGB with BT.601.
    Yuyv,
    /// Motion-JPEG, one JPEG per buffer.
    Mjpeg,
    /// Packed 24-bit RGB.
    Rgb24,
    /// Packed 24-bit BGR.
    Bgr24,
}

impl PixelFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        match &fourcc.repr {
            b"YUYV" => Some(Self::Yuyv),
            b"MJPG" => Some(Self::Mjpeg),
            b"RGB3" => Some(Self::Rgb24),
            b"BGR3" => Some(Self::Bgr24),
            _ => None,
        }
    }
}

/// V4L2 camera device handle.
///
/// The device and its mmap stream live in `Option`s so that
/// [`VideoSource::release`] can drop them early and idempotently.
pub struct Camera {
    device: Option<Device>,
    stream: Option<MmapStream<'static>>,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a V4L2 camera device by path (e.g., "/dev/video0").
    pub fn open(device_path: &str) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.to_string().contains("busy") || e.to_string().contains("EBUSY") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device.query_caps().map_err(|e| {
            CameraError::CaptureFailed(format!("failed to query capabilities: {e}"))
        })?;

        tracing::info!(
            device = device_path,
            driver = %caps.driver,
            card = %caps.card,
            "opened camera"
        );

        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }

        // Ask for YUYV at 640x480; webcams that only stream MJPEG or packed
        // RGB/BGR renegotiate and are accepted as well.
        let mut fmt = device.format().map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to get format: {e}"))
        })?;

        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = REQUESTED_WIDTH;
        fmt.height = REQUESTED_HEIGHT;

        let negotiated = device.set_format(&fmt).map_err(|e| {
            CameraError::FormatNegotiationFailed(format!("failed to set format: {e}"))
        })?;

        let fourcc = negotiated.fourcc;
        let pixel_format = PixelFormat::from_fourcc(fourcc).ok_or_else(|| {
            CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format: {fourcc:?} (need YUYV, MJPG, RGB3 or BGR3)"
            ))
        })?;

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            fourcc = ?fourcc,
            "negotiated format"
        );

        let stream = MmapStream::with_buffers(&device, BufType::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))?;

        Ok(Self {
            device: Some(device),
            stream: Some(stream),
            width: negotiated.width,
            height: negotiated.height,
            device_path: device_path.to_string(),
            pixel_format,
        })
    }

    /// Capture a single frame, converting the raw buffer to 3-channel pixels.
    pub fn capture_frame(&mut self) -> Result<Frame, CameraError> {
        let stream = self.stream.as_mut().ok_or(CameraError::Released)?;

        let (buf, meta) = stream
            .next()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;
        let sequence = meta.sequence;

        let (image, order) = match self.pixel_format {
            PixelFormat::Yuyv => (frame::yuyv_to_rgb(buf, self.width, self.height), ChannelOrder::Rgb),
            PixelFormat::Mjpeg => (frame::decode_mjpeg(buf), ChannelOrder::Rgb),
            PixelFormat::Rgb24 => (frame::packed_to_image(buf, self.width, self.height), ChannelOrder::Rgb),
            PixelFormat::Bgr24 => (frame::packed_to_image(buf, self.width, self.height), ChannelOrder::Bgr),
        };
        let image = image.map_err(|e| {
            CameraError::CaptureFailed(format!("{:?} conversion failed: {e}", self.pixel_format))
        })?;

        Ok(Frame {
            image,
            order,
            timestamp: std::time::Instant::now(),
            sequence,
        })
    }

    /// Discard `count` frames while auto exposure settles.
    pub fn warmup(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        tracing::info!(count, "discarding warmup frames");
        let mut last = None;
        for _ in 0..count {
            if let Ok(frame) = self.capture_frame() {
                last = Some(frame);
            }
        }
        if let Some(frame) = last {
            tracing::debug!(brightness = frame.avg_brightness(), "warmup done");
        }
    }

    /// List available V4L2 video capture devices.
    pub fn list_devices() -> Vec<DeviceInfo> {
        let mut devices = Vec::new();

        for i in 0..16 {
            let path = format!("/dev/video{i}");
            if !Path::new(&path).exists() {
                continue;
            }
            let Ok(dev) = Device::with_path(&path) else {
                continue;
            };
            let Ok(caps) = dev.query_caps() else {
                continue;
            };
            if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                continue;
            }
            devices.push(DeviceInfo {
                path,
                name: caps.card.clone(),
                driver: caps.driver.clone(),
                bus: caps.bus.clone(),
            });
        }

        devices
    }
}

impl VideoSource for Camera {
    fn read(&mut self) -> Option<Frame> {
        match self.capture_frame() {
            Ok(frame) => Some(frame),
            Err(CameraError::Released) => None,
            Err(e) => {
                tracing::warn!(device = %self.device_path, error = %e, "frame read failed");
                None
            }
        }
    }

    fn release(&mut self) {
        // Stream first: its buffers are mapped from the device.
        let had_stream = self.stream.take().is_some();
        let had_device = self.device.take().is_some();
        if had_stream || had_device {
            tracing::info!(device = %self.device_path, "camera released");
        }
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.release();
    }
}
