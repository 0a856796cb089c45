//! Camera resource.
//!
//! Owns the lifecycle of a live capture device: acquisition, frame sampling
//! into a JPEG still, and guaranteed release. A session stops every
//! underlying track on `close()`, and `Drop` closes as well, so the device is
//! released on every control-flow exit, including cancellation and errors.
//!
//! Device paths starting with `stub://` use an in-memory synthetic device;
//! real V4L2 devices (e.g. `/dev/video0`) require the `camera-v4l2` feature.

#[cfg(feature = "camera-v4l2")]
mod v4l2;

use thiserror::Error;

/// Fixed JPEG quality factor for captured stills.
const JPEG_QUALITY: u8 = 80;

#[derive(Debug, Clone, Error)]
pub enum CameraError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("camera device not found: {0}")]
    DeviceNotFound(String),

    #[error("camera device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The device has not rendered a frame yet (still warming up).
    #[error("no camera frame available yet")]
    NoActiveFrame,
}

/// Preferred device orientation. Advisory: when the hint cannot be honored
/// any available device is accepted (non-fatal degradation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingHint {
    #[default]
    Environment,
    User,
    Any,
}

#[derive(Debug, Clone)]
pub struct CameraOptions {
    /// Device path: `stub://<name>` for the synthetic device, otherwise a
    /// platform device node such as `/dev/video0`.
    pub device: String,
    pub facing: FacingHint,
    /// Requested resolution hint; the device may pick the closest mode.
    pub width: u32,
    pub height: u32,
    /// Frames the device discards before the first capture succeeds.
    pub warmup_frames: u32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            device: "stub://default".to_string(),
            facing: FacingHint::Environment,
            width: 1280,
            height: 720,
            warmup_frames: 0,
        }
    }
}

/// One decoded frame from a device backend.
pub(crate) struct RgbFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub struct Camera;

impl Camera {
    /// Acquire exclusive access to a capture device.
    ///
    /// The facing hint is best-effort: if the preferred orientation is not
    /// available the device is used anyway.
    pub fn open(options: &CameraOptions) -> Result<CameraSession, CameraError> {
        let backend = if options.device.starts_with("stub://") {
            Backend::Synthetic(SyntheticDevice::new(options))
        } else {
            #[cfg(feature = "camera-v4l2")]
            {
                Backend::V4l2(v4l2::V4l2Device::open(options)?)
            }
            #[cfg(not(feature = "camera-v4l2"))]
            {
                return Err(CameraError::DeviceNotFound(format!(
                    "{} (build without camera-v4l2 feature)",
                    options.device
                )));
            }
        };

        // Orientation metadata is not exposed by either backend; a facing
        // preference degrades to whatever device we got, without error.
        match options.facing {
            FacingHint::Any => {}
            FacingHint::Environment | FacingHint::User => {
                tracing::debug!(
                    device = %options.device,
                    facing = ?options.facing,
                    "facing hint is best-effort"
                );
            }
        }

        tracing::debug!(device = %options.device, "camera session opened");
        Ok(CameraSession {
            device: options.device.clone(),
            backend: Some(backend),
        })
    }
}

enum Backend {
    Synthetic(SyntheticDevice),
    #[cfg(feature = "camera-v4l2")]
    V4l2(v4l2::V4l2Device),
}

impl Backend {
    fn grab(&mut self) -> Result<Option<RgbFrame>, CameraError> {
        match self {
            Backend::Synthetic(device) => Ok(device.grab()),
            #[cfg(feature = "camera-v4l2")]
            Backend::V4l2(device) => device.grab(),
        }
    }
}

/// One open device stream. At most one session should exist per pipeline;
/// the coordinator enforces that by closing any prior session before opening
/// a new one.
pub struct CameraSession {
    device: String,
    backend: Option<Backend>,
}

impl std::fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSession")
            .field("device", &self.device)
            .field("closed", &self.backend.is_none())
            .finish()
    }
}

impl CameraSession {
    /// Sample one still frame as JPEG bytes at a fixed quality factor.
    ///
    /// Fails with `NoActiveFrame` while the device is still warming up.
    pub fn capture_frame(&mut self) -> Result<Vec<u8>, CameraError> {
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| CameraError::DeviceUnavailable("session is closed".to_string()))?;

        let frame = backend.grab()?.ok_or(CameraError::NoActiveFrame)?;
        encode_jpeg(&frame)
    }

    /// Stop every underlying track. Idempotent: closing an already-closed
    /// session is a no-op, not an error.
    pub fn close(&mut self) {
        if self.backend.take().is_some() {
            tracing::debug!(device = %self.device, "camera session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.backend.is_none()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn encode_jpeg(frame: &RgbFrame) -> Result<Vec<u8>, CameraError> {
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode(
            &frame.pixels,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|err| CameraError::DeviceUnavailable(format!("jpeg encode failed: {err}")))?;
    Ok(out)
}

// ----------------------------------------------------------------------------
// Synthetic device (stub://) for tests and development
// ----------------------------------------------------------------------------

struct SyntheticDevice {
    width: u32,
    height: u32,
    warmup_remaining: u32,
    frame_count: u64,
}

impl SyntheticDevice {
    fn new(options: &CameraOptions) -> Self {
        Self {
            width: options.width,
            height: options.height,
            warmup_remaining: options.warmup_frames,
            frame_count: 0,
        }
    }

    fn grab(&mut self) -> Option<RgbFrame> {
        if self.warmup_remaining > 0 {
            self.warmup_remaining -= 1;
            return None;
        }
        self.frame_count += 1;

        // Simple moving gradient so consecutive frames differ.
        let pixel_count = (self.width * self.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }

        Some(RgbFrame {
            pixels,
            width: self.width,
            height: self.height,
        })
    }
}
