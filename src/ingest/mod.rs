//! Frame sources.
//!
//! This module provides the sources a session pulls frames from:
//! - Local cameras through V4L2 (feature: camera-v4l2)
//! - Synthetic `stub://` cameras (testing, dry runs)
//!
//! Every source is opened before the first `next_frame` call and blocks the
//! calling thread until a frame arrives or the device fails. A source never
//! retries internally; any error it returns ends the session.

mod camera;
mod normalize;

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

pub use camera::CameraSource;

use crate::error::CaptureError;
use crate::frame::Frame;

pub const DEFAULT_WIDTH: u32 = 640;
pub const DEFAULT_HEIGHT: u32 = 480;
pub const DEFAULT_FPS: u32 = 30;

/// A sequence of frames pulled on demand.
pub trait FrameSource {
    /// Block until the next frame is available.
    ///
    /// `CaptureError::EndOfStream` means the source is exhausted; any other
    /// error is a device failure. Neither is retried by callers.
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;

    fn stats(&self) -> SourceStats;
}

/// Counters reported by a source.
#[derive(Clone, Debug, Default)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub device: String,
}

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceId {
    /// Camera index, mapped to `/dev/video<N>`.
    Index(u32),
    /// Device node path.
    Path(String),
    /// Synthetic camera: `stub://name`, optionally `?frames=N` to end the stream.
    Stub { name: String, frames: Option<u64> },
}

impl DeviceId {
    pub fn device_path(&self) -> Option<String> {
        match self {
            DeviceId::Index(index) => Some(format!("/dev/video{}", index)),
            DeviceId::Path(path) => Some(path.clone()),
            DeviceId::Stub { .. } => None,
        }
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        DeviceId::Index(0)
    }
}

impl FromStr for DeviceId {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> anyhow::Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(anyhow::anyhow!("camera device must not be empty"));
        }
        if let Some(rest) = value.strip_prefix("stub://") {
            let (name, query) = match rest.split_once('?') {
                Some((name, query)) => (name, Some(query)),
                None => (rest, None),
            };
            let mut frames = None;
            for pair in query.into_iter().flat_map(|q| q.split('&')) {
                match pair.split_once('=') {
                    Some(("frames", count)) => {
                        frames = Some(count.parse().map_err(|_| {
                            anyhow::anyhow!("stub frame count must be an integer: {}", count)
                        })?);
                    }
                    _ => return Err(anyhow::anyhow!("unknown stub camera option '{}'", pair)),
                }
            }
            return Ok(DeviceId::Stub {
                name: name.to_string(),
                frames,
            });
        }
        if value.contains("://") {
            return Err(anyhow::anyhow!(
                "camera ingestion only supports local devices (got {})",
                value
            ));
        }
        match value.parse::<u32>() {
            Ok(index) => Ok(DeviceId::Index(index)),
            Err(_) => Ok(DeviceId::Path(value.to_string())),
        }
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceId::Index(index) => write!(f, "{}", index),
            DeviceId::Path(path) => write!(f, "{}", path),
            DeviceId::Stub {
                name,
                frames: Some(n),
            } => write!(f, "stub://{}?frames={}", name, n),
            DeviceId::Stub { name, frames: None } => write!(f, "stub://{}", name),
        }
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Index(u32),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Index(index) => Ok(DeviceId::Index(index)),
            Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Requested capture settings. The device may negotiate different values.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub device: DeviceId,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: DeviceId::default(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            target_fps: DEFAULT_FPS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_device_maps_to_video_node() {
        let id: DeviceId = "0".parse().unwrap();
        assert_eq!(id, DeviceId::Index(0));
        assert_eq!(id.device_path().as_deref(), Some("/dev/video0"));
    }

    #[test]
    fn path_device_is_kept_verbatim() {
        let id: DeviceId = "/dev/video2".parse().unwrap();
        assert_eq!(id.device_path().as_deref(), Some("/dev/video2"));
    }

    #[test]
    fn stub_device_parses_frame_limit() {
        let id: DeviceId = "stub://bench?frames=60".parse().unwrap();
        assert_eq!(
            id,
            DeviceId::Stub {
                name: "bench".into(),
                frames: Some(60)
            }
        );
        assert_eq!(id.to_string(), "stub://bench?frames=60");
        assert!("stub://bench?fps=2".parse::<DeviceId>().is_err());
    }

    #[test]
    fn network_urls_are_rejected() {
        assert!("rtsp://camera/stream".parse::<DeviceId>().is_err());
        assert!("  ".parse::<DeviceId>().is_err());
    }
}
