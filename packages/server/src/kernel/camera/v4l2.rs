//! V4L2 device backend (feature `camera-v4l2`).
//!
//! Connects to a local device node, asks for RGB frames at the hinted
//! resolution and hands decoded frames to the session for JPEG encoding.

use ouroboros::self_referencing;

use super::{CameraError, CameraOptions, RgbFrame};

pub(crate) struct V4l2Device {
    state: Option<DeviceState>,
    width: u32,
    height: u32,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Device {
    pub(crate) fn open(options: &CameraOptions) -> Result<Self, CameraError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&options.device)
            .map_err(|err| classify_open_error(&options.device, err))?;

        let mut format = device
            .format()
            .map_err(|err| unavailable(&options.device, "read format", &err))?;
        format.width = options.width;
        format.height = options.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        // Resolution and pixel format hints are best-effort; fall back to
        // whatever the device reports.
        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                tracing::warn!(device = %options.device, error = %err, "failed to set format");
                device
                    .format()
                    .map_err(|err| unavailable(&options.device, "read format", &err))?
            }
        };

        let width = format.width;
        let height = format.height;

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
            },
        }
        .try_build()
        .map_err(|err| unavailable(&options.device, "create buffer stream", &err))?;

        Ok(Self {
            state: Some(state),
            width,
            height,
        })
    }

    pub(crate) fn grab(&mut self) -> Result<Option<RgbFrame>, CameraError> {
        use v4l::io::traits::CaptureStream;

        let state = self
            .state
            .as_mut()
            .ok_or_else(|| CameraError::DeviceUnavailable("device not connected".to_string()))?;

        let width = self.width;
        let height = self.height;
        let frame = state.with_mut(|fields| -> Result<Option<RgbFrame>, CameraError> {
            let (buf, _meta) = fields
                .stream
                .next()
                .map_err(|err| CameraError::DeviceUnavailable(format!("capture frame: {err}")))?;

            if buf.len() < (width * height * 3) as usize {
                // Device has not filled a full frame yet.
                return Ok(None);
            }
            Ok(Some(RgbFrame {
                pixels: buf.to_vec(),
                width,
                height,
            }))
        })?;

        Ok(frame)
    }
}

fn classify_open_error(device: &str, err: std::io::Error) -> CameraError {
    match err.kind() {
        std::io::ErrorKind::NotFound => CameraError::DeviceNotFound(device.to_string()),
        std::io::ErrorKind::PermissionDenied => CameraError::PermissionDenied(device.to_string()),
        _ => CameraError::DeviceUnavailable(format!("{device}: {err}")),
    }
}

fn unavailable(device: &str, action: &str, err: &dyn std::fmt::Display) -> CameraError {
    CameraError::DeviceUnavailable(format!("{device}: {action}: {err}"))
}
