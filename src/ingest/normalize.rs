use anyhow::{anyhow, Result};

use crate::frame::{expected_len, Frame, PixelFormat};

/// Buffer layouts a capture device may negotiate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(not(feature = "camera-v4l2"), allow(dead_code))]
pub(crate) enum CaptureFormat {
    Rgb24,
    Bgr24,
    Grey,
    Yuyv,
}

impl CaptureFormat {
    #[cfg_attr(not(feature = "camera-v4l2"), allow(dead_code))]
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(CaptureFormat::Rgb24),
            b"BGR3" => Some(CaptureFormat::Bgr24),
            b"GREY" => Some(CaptureFormat::Grey),
            b"YUYV" => Some(CaptureFormat::Yuyv),
            _ => None,
        }
    }
}

/// Turn a captured buffer into a `Frame`.
///
/// Drivers may hand back buffers longer than the image (padding); the excess
/// is dropped. Short buffers are an error.
pub(crate) fn normalize_capture(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: CaptureFormat,
) -> Result<Frame> {
    match format {
        CaptureFormat::Rgb24 => passthrough(pixels, width, height, PixelFormat::Rgb8),
        CaptureFormat::Bgr24 => passthrough(pixels, width, height, PixelFormat::Bgr8),
        CaptureFormat::Grey => passthrough(pixels, width, height, PixelFormat::Gray8),
        CaptureFormat::Yuyv => {
            Frame::new(yuyv_to_rgb(pixels, width, height)?, width, height, PixelFormat::Rgb8)
        }
    }
}

fn passthrough(pixels: &[u8], width: u32, height: u32, format: PixelFormat) -> Result<Frame> {
    let expected = expected_len(width, height, format)?;
    if pixels.len() < expected {
        return Err(anyhow!(
            "{:?} capture too short: expected {}, got {}",
            format,
            expected,
            pixels.len()
        ));
    }
    Frame::new(pixels[..expected].to_vec(), width, height, format)
}

fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let pixel_count = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| anyhow!("YUYV frame dimensions overflow"))?;
    if width % 2 != 0 {
        return Err(anyhow!("YUYV frame width must be even, got {}", width));
    }
    let expected = pixel_count * 2;
    if pixels.len() < expected {
        return Err(anyhow!(
            "YUYV capture too short: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = Vec::with_capacity(pixel_count * 3);
    for chunk in pixels[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0] as f32, chunk[2] as f32] {
            let r = y + 1.402_f32 * v;
            let g = y - 0.344_136_f32 * u - 0.714_136_f32 * v;
            let b = y + 1.772_f32 * u;
            rgb.extend_from_slice(&[clamp_to_u8(r), clamp_to_u8(g), clamp_to_u8(b)]);
        }
    }
    Ok(rgb)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
