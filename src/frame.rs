//! Captured image buffers.
//!
//! A `Frame` is produced by a `FrameSource`, optionally rewritten by the
//! preprocessor, and handed by reference to the tracking engine. It is owned by
//! exactly one loop iteration; there is intentionally no `Clone`.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fmt;

/// Pixel layout tag carried by every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgb8,
    Bgr8,
    Gray8,
}

impl PixelFormat {
    /// Interleaved channels per pixel.
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb8 | PixelFormat::Bgr8 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Immutable 2-D pixel buffer.
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

impl Frame {
    /// Wrap interleaved pixel bytes, checking the length against the dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let expected = expected_len(width, height, format)?;
        if data.len() != expected {
            return Err(anyhow!(
                "{:?} frame length mismatch: expected {}, got {}",
                format,
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            format,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    /// A frame with no pixels. Sources report these as blank grabs.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.data
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

pub(crate) fn expected_len(width: u32, height: u32, format: PixelFormat) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(format.channels()))
        .ok_or_else(|| anyhow!("frame dimensions overflow ({}x{})", width, height))
}
