//! facetag-hw — Hardware abstraction for camera capture.
//!
//! Provides a V4L2-based video source and the RGB frame type the
//! recognition loop consumes.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat, VideoSource};
pub use frame::{ChannelOrder, Frame, FrameError};
