//! adorn-hw — Camera capture for the try-on preview.
//!
//! Provides V4L2-based colour capture and conversion of the negotiated
//! pixel format to packed RGB.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, FrameStream, PixelFormat};
pub use frame::{Frame, FrameError};
