//! Live camera source.
//!
//! `CameraSource` opens a local capture device and hands out one `Frame` per
//! `next_frame` call, in arrival order.
//!
//! - Numeric indices and `/dev/videoN` paths go to V4L2 (feature: camera-v4l2).
//! - `stub://` identifiers produce synthetic frames for tests and dry runs.
//!
//! Requested width, height and frame rate are best effort; the negotiated
//! values are what frames carry.

use anyhow::{anyhow, Result};

use super::normalize::{normalize_capture, CaptureFormat};
use super::{CameraConfig, DeviceId, FrameSource, SourceStats};
use crate::error::CaptureError;
use crate::frame::Frame;

pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "camera-v4l2")]
    Device(DeviceCamera),
}

impl CameraSource {
    /// Open the configured device. Fails if the device cannot be opened; there
    /// is no retry.
    pub fn open(config: &CameraConfig) -> Result<Self> {
        match &config.device {
            DeviceId::Stub { name, frames } => {
                let camera = SyntheticCamera::new(config.clone(), name.clone(), *frames);
                log::info!(
                    "CameraSource: opened stub://{} ({}x{} @ {} fps, synthetic)",
                    name,
                    config.width,
                    config.height,
                    config.target_fps
                );
                Ok(Self {
                    backend: CameraBackend::Synthetic(camera),
                })
            }
            device => {
                let path = device
                    .device_path()
                    .ok_or_else(|| anyhow!("camera {} has no device node", device))?;
                open_device(config, path)
            }
        }
    }
}

#[cfg(feature = "camera-v4l2")]
fn open_device(config: &CameraConfig, path: String) -> Result<CameraSource> {
    Ok(CameraSource {
        backend: CameraBackend::Device(DeviceCamera::open(config, path)?),
    })
}

#[cfg(not(feature = "camera-v4l2"))]
fn open_device(_config: &CameraConfig, path: String) -> Result<CameraSource> {
    Err(anyhow!(
        "opening {} requires the camera-v4l2 feature",
        path
    ))
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.next_frame(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(camera) => camera.next_frame(),
        }
    }

    fn stats(&self) -> SourceStats {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.stats(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(camera) => camera.stats(),
        }
    }
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://)
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    config: CameraConfig,
    name: String,
    limit: Option<u64>,
    frame_count: u64,
}

impl SyntheticCamera {
    fn new(config: CameraConfig, name: String, limit: Option<u64>) -> Self {
        Self {
            config,
            name,
            limit,
            frame_count: 0,
        }
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.limit.is_some_and(|limit| self.frame_count >= limit) {
            return Err(CaptureError::EndOfStream);
        }
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        normalize_capture(
            &pixels,
            self.config.width,
            self.config.height,
            CaptureFormat::Rgb24,
        )
        .map_err(|err| CaptureError::Malformed(err.to_string()))
    }

    /// Horizontal gradient that drifts one column per frame.
    fn generate_pixels(&self) -> Vec<u8> {
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let mut pixels = Vec::with_capacity(width * height * 3);
        for y in 0..height {
            for x in 0..width {
                let shade = ((x as u64 + self.frame_count) % 256) as u8;
                let row = (y % 256) as u8;
                pixels.extend_from_slice(&[shade, row, shade ^ row]);
            }
        }
        pixels
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: format!("stub://{}", self.name),
        }
    }
}

// ----------------------------------------------------------------------------
// V4L2 device camera
// ----------------------------------------------------------------------------

#[cfg(feature = "camera-v4l2")]
struct DeviceCamera {
    path: String,
    state: DeviceState,
    format: CaptureFormat,
    width: u32,
    height: u32,
    frame_count: u64,
}

#[cfg(feature = "camera-v4l2")]
#[ouroboros::self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[cfg(feature = "camera-v4l2")]
impl DeviceCamera {
    fn open(config: &CameraConfig, path: String) -> Result<Self> {
        use anyhow::Context;
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let device =
            v4l::Device::with_path(&path).with_context(|| format!("open v4l2 device {}", path))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = config.width;
        format.height = config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("CameraSource: failed to set format on {}: {}", path, err);
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        let capture_format = CaptureFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            anyhow!(
                "{} negotiated unsupported pixel format {}",
                path,
                format.fourcc
            )
        })?;

        if config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!("CameraSource: failed to set fps on {}: {}", path, err);
            }
        }

        let state = DeviceStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "CameraSource: opened {} ({}x{} {:?})",
            path,
            format.width,
            format.height,
            capture_format
        );
        Ok(Self {
            path,
            state,
            format: capture_format,
            width: format.width,
            height: format.height,
            frame_count: 0,
        })
    }

    fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        use v4l::io::traits::CaptureStream;

        let pixels = self.state.with_stream_mut(|stream| {
            stream.next().map(|(buf, meta)| {
                let used = (meta.bytesused as usize).min(buf.len());
                if used == 0 {
                    buf.to_vec()
                } else {
                    buf[..used].to_vec()
                }
            })
        })?;
        if pixels.is_empty() {
            return Err(CaptureError::BlankFrame);
        }

        self.frame_count += 1;
        normalize_capture(&pixels, self.width, self.height, self.format)
            .map_err(|err| CaptureError::Malformed(err.to_string()))
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.path.clone(),
        }
    }
}
