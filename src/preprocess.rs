//! Per-frame normalization applied before submission.
//!
//! Color conversion runs first, then resizing. A preprocessor with no color
//! target and unity scale hands frames back untouched, without copying.

use anyhow::{anyhow, Result};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, Rgb};
use serde::Deserialize;
use std::str::FromStr;

use crate::frame::{Frame, PixelFormat};

/// Largest accepted resize factor.
pub const MAX_SCALE: f32 = 8.0;
/// Largest width or height a frame is resized to.
pub const MAX_DIMENSION: u32 = 16_384;

/// Whether `factor` is usable as a resize factor.
pub fn valid_scale(factor: f32) -> bool {
    factor.is_finite() && factor > 0.0 && factor <= MAX_SCALE
}

/// Colorspace a frame is converted into before submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorTarget {
    #[default]
    Keep,
    Rgb,
    Gray,
}

impl FromStr for ColorTarget {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keep" | "none" => Ok(ColorTarget::Keep),
            "rgb" => Ok(ColorTarget::Rgb),
            "gray" | "grey" | "grayscale" => Ok(ColorTarget::Gray),
            other => Err(anyhow!("unknown color target '{}'", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Resize {
    #[default]
    None,
    /// Multiply both dimensions, truncating to whole pixels.
    Factor(f32),
    Exact { width: u32, height: u32 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PreprocessConfig {
    pub color: ColorTarget,
    pub resize: Resize,
}

#[derive(Clone, Debug)]
pub struct FramePreprocessor {
    color: ColorTarget,
    resize: Resize,
}

impl FramePreprocessor {
    /// Out-of-range resize settings are dropped with a warning.
    pub fn new(config: PreprocessConfig) -> Self {
        Self {
            color: config.color,
            resize: checked_resize(config.resize),
        }
    }

    /// Build from configuration, falling back to the engine's image scale when
    /// no explicit resize was configured.
    pub fn with_engine_scale(config: PreprocessConfig, engine_scale: f32) -> Self {
        let resize = match config.resize {
            Resize::None if valid_scale(engine_scale) => Resize::Factor(engine_scale),
            Resize::None => {
                log::warn!("ignoring engine image scale {}", engine_scale);
                Resize::None
            }
            other => other,
        };
        Self::new(PreprocessConfig {
            color: config.color,
            resize,
        })
    }

    pub fn is_identity(&self) -> bool {
        self.color == ColorTarget::Keep
            && match self.resize {
                Resize::None => true,
                Resize::Factor(factor) => factor == 1.0,
                Resize::Exact { .. } => false,
            }
    }

    pub fn process(&self, frame: Frame) -> Frame {
        if self.is_identity() || frame.is_empty() {
            return frame;
        }
        let frame = convert_color(frame, self.color);
        match self.target_size(frame.width, frame.height) {
            Some((width, height)) => resize(frame, width, height),
            None => frame,
        }
    }

    fn target_size(&self, width: u32, height: u32) -> Option<(u32, u32)> {
        let (w, h) = match self.resize {
            Resize::None => return None,
            Resize::Factor(factor) => (
                ((width as f32 * factor) as u32).max(1),
                ((height as f32 * factor) as u32).max(1),
            ),
            Resize::Exact { width, height } => (width.max(1), height.max(1)),
        };
        if w > MAX_DIMENSION || h > MAX_DIMENSION {
            log::debug!("resize to {}x{} skipped", w, h);
            return None;
        }
        (w != width || h != height).then_some((w, h))
    }
}

fn checked_resize(resize: Resize) -> Resize {
    match resize {
        Resize::Factor(factor) if !valid_scale(factor) => {
            log::warn!("ignoring resize factor {} (limit {})", factor, MAX_SCALE);
            Resize::None
        }
        Resize::Exact { width, height }
            if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION =>
        {
            log::warn!("ignoring resize to {}x{}", width, height);
            Resize::None
        }
        other => other,
    }
}

fn convert_color(frame: Frame, target: ColorTarget) -> Frame {
    let format = match (target, frame.format) {
        (ColorTarget::Keep, _)
        | (ColorTarget::Rgb, PixelFormat::Rgb8)
        | (ColorTarget::Gray, PixelFormat::Gray8) => return frame,
        (ColorTarget::Rgb, _) => PixelFormat::Rgb8,
        (ColorTarget::Gray, _) => PixelFormat::Gray8,
    };

    let src = frame.pixels();
    let pixels: Vec<u8> = match (frame.format, format) {
        (PixelFormat::Bgr8, PixelFormat::Rgb8) => src
            .chunks_exact(3)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect(),
        (PixelFormat::Gray8, PixelFormat::Rgb8) => src.iter().flat_map(|&y| [y, y, y]).collect(),
        (PixelFormat::Rgb8, PixelFormat::Gray8) => src
            .chunks_exact(3)
            .map(|px| luma(px[0], px[1], px[2]))
            .collect(),
        (PixelFormat::Bgr8, PixelFormat::Gray8) => src
            .chunks_exact(3)
            .map(|px| luma(px[2], px[1], px[0]))
            .collect(),
        _ => return frame,
    };

    rebuild(frame, pixels, None, format)
}

fn resize(frame: Frame, width: u32, height: u32) -> Frame {
    let resized = match frame.format {
        PixelFormat::Rgb8 | PixelFormat::Bgr8 => {
            ImageBuffer::<Rgb<u8>, &[u8]>::from_raw(frame.width, frame.height, frame.pixels())
                .map(|img| imageops::resize(&img, width, height, FilterType::Triangle).into_raw())
        }
        PixelFormat::Gray8 => {
            ImageBuffer::<Luma<u8>, &[u8]>::from_raw(frame.width, frame.height, frame.pixels())
                .map(|img| imageops::resize(&img, width, height, FilterType::Triangle).into_raw())
        }
    };
    match resized {
        Some(pixels) => {
            let format = frame.format;
            rebuild(frame, pixels, Some((width, height)), format)
        }
        None => {
            log::warn!("resize skipped: buffer does not match {:?}", frame);
            frame
        }
    }
}

fn rebuild(
    original: Frame,
    pixels: Vec<u8>,
    size: Option<(u32, u32)>,
    format: PixelFormat,
) -> Frame {
    let (width, height) = size.unwrap_or((original.width, original.height));
    match Frame::new(pixels, width, height, format) {
        Ok(frame) => frame,
        Err(err) => {
            log::warn!("preprocessing skipped: {}", err);
            original
        }
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    (0.299_f32 * r as f32 + 0.587_f32 * g as f32 + 0.114_f32 * b as f32)
        .round()
        .clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32, format: PixelFormat) -> Frame {
        let len = width as usize * height as usize * format.channels();
        let pixels = (0..len).map(|i| (i % 251) as u8).collect();
        Frame::new(pixels, width, height, format).unwrap()
    }

    #[test]
    fn unity_configuration_is_bit_identical() {
        let frame = gradient(16, 9, PixelFormat::Bgr8);
        let before = frame.pixels().to_vec();
        let pre = FramePreprocessor::new(PreprocessConfig {
            color: ColorTarget::Keep,
            resize: Resize::Factor(1.0),
        });
        assert!(pre.is_identity());
        let out = pre.process(frame);
        assert_eq!(out.pixels(), before.as_slice());
        assert_eq!((out.width, out.height, out.format), (16, 9, PixelFormat::Bgr8));
    }

    #[test]
    fn bgr_is_swapped_to_rgb() {
        let frame = Frame::new(vec![1, 2, 3, 4, 5, 6], 2, 1, PixelFormat::Bgr8).unwrap();
        let pre = FramePreprocessor::new(PreprocessConfig {
            color: ColorTarget::Rgb,
            resize: Resize::None,
        });
        let out = pre.process(frame);
        assert_eq!(out.format, PixelFormat::Rgb8);
        assert_eq!(out.pixels(), &[3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn grayscale_uses_luma_weights() {
        let frame = Frame::new(vec![255, 0, 0, 0, 0, 255], 2, 1, PixelFormat::Rgb8).unwrap();
        let pre = FramePreprocessor::new(PreprocessConfig {
            color: ColorTarget::Gray,
            resize: Resize::None,
        });
        let out = pre.process(frame);
        assert_eq!(out.format, PixelFormat::Gray8);
        assert_eq!(out.pixels(), &[76, 29]);
    }

    #[test]
    fn scale_factor_truncates_dimensions() {
        let pre = FramePreprocessor::new(PreprocessConfig {
            color: ColorTarget::Keep,
            resize: Resize::Factor(0.5),
        });
        let out = pre.process(gradient(641, 480, PixelFormat::Rgb8));
        assert_eq!((out.width, out.height), (320, 240));
        assert_eq!(out.pixels().len(), 320 * 240 * 3);
    }

    #[test]
    fn exact_resize_after_color_conversion() {
        let pre = FramePreprocessor::new(PreprocessConfig {
            color: ColorTarget::Gray,
            resize: Resize::Exact {
                width: 60,
                height: 35,
            },
        });
        let out = pre.process(gradient(64, 48, PixelFormat::Bgr8));
        assert_eq!((out.width, out.height, out.format), (60, 35, PixelFormat::Gray8));
        assert_eq!(out.pixels().len(), 60 * 35);
    }

    #[test]
    fn engine_scale_applies_only_without_explicit_resize() {
        let pre = FramePreprocessor::with_engine_scale(PreprocessConfig::default(), 0.5);
        assert!(!pre.is_identity());
        let out = pre.process(gradient(8, 8, PixelFormat::Gray8));
        assert_eq!((out.width, out.height), (4, 4));

        let explicit = PreprocessConfig {
            color: ColorTarget::Keep,
            resize: Resize::Factor(1.0),
        };
        assert!(FramePreprocessor::with_engine_scale(explicit, 0.5).is_identity());
    }

    #[test]
    fn oversized_factor_leaves_frame_untouched() {
        let pre = FramePreprocessor::new(PreprocessConfig {
            color: ColorTarget::Keep,
            resize: Resize::Factor(1.0e6),
        });
        assert!(pre.is_identity());
        let out = pre.process(gradient(640, 480, PixelFormat::Rgb8));
        assert_eq!((out.width, out.height), (640, 480));
    }

    #[test]
    fn out_of_range_engine_scale_is_ignored() {
        for scale in [1.0e6, f32::INFINITY, 0.0, -2.0] {
            let pre = FramePreprocessor::with_engine_scale(PreprocessConfig::default(), scale);
            assert!(pre.is_identity(), "scale {}", scale);
        }
    }

    #[test]
    fn large_target_dimensions_are_skipped() {
        let pre = FramePreprocessor::new(PreprocessConfig {
            color: ColorTarget::Keep,
            resize: Resize::Factor(MAX_SCALE),
        });
        assert_eq!(pre.target_size(4_096, 2), None);
        assert_eq!(pre.target_size(640, 480), Some((5_120, 3_840)));
    }

    #[test]
    fn color_target_parses_aliases() {
        assert_eq!("GREY".parse::<ColorTarget>().unwrap(), ColorTarget::Gray);
        assert_eq!("none".parse::<ColorTarget>().unwrap(), ColorTarget::Keep);
        assert!("hsv".parse::<ColorTarget>().is_err());
    }
}
