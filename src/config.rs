use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ingest::{CameraConfig, DeviceId, DEFAULT_FPS, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::monitor::DEFAULT_WINDOW;
use crate::preprocess::{
    valid_scale, ColorTarget, PreprocessConfig, Resize, MAX_DIMENSION, MAX_SCALE,
};

pub const CONFIG_ENV: &str = "LIVE_SLAM_CONFIG";

const DEFAULT_CAMERA_TRAJECTORY: &str = "CameraTrajectory.txt";
const DEFAULT_KEYFRAME_TRAJECTORY: &str = "KeyFrameTrajectory.txt";
const DEFAULT_POINT_CLOUD: &str = "pointcloud.txt";

/// Artifact an engine can persist at the end of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    CameraTrajectory,
    KeyframeTrajectory,
    PointCloud,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ExportTarget {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

impl ExportTarget {
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SessionConfigFile {
    camera: Option<CameraConfigFile>,
    preprocessing: Option<PreprocessConfigFile>,
    display: Option<bool>,
    window_size: Option<usize>,
    output_dir: Option<PathBuf>,
    exports: Option<Vec<ExportTarget>>,
    convert_to_ply: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    device: Option<DeviceId>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PreprocessConfigFile {
    color: Option<ColorTarget>,
    scale: Option<f32>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Everything a session is parameterized by, apart from the engine resources.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub camera: CameraConfig,
    pub preprocessing: PreprocessConfig,
    /// Forwarded to the engine as its viewer flag.
    pub display: bool,
    pub window_size: usize,
    pub exports: Vec<ExportTarget>,
    pub convert_to_ply: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            preprocessing: PreprocessConfig::default(),
            display: true,
            window_size: DEFAULT_WINDOW,
            exports: default_exports(),
            convert_to_ply: false,
        }
    }
}

impl SessionConfig {
    /// Load configuration: file (explicit path, else `LIVE_SLAM_CONFIG`), then
    /// environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let file_cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => read_config_file(&path)?,
            None => SessionConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SessionConfigFile) -> Result<Self> {
        let camera_file = file.camera.unwrap_or_default();
        let camera = CameraConfig {
            device: camera_file.device.unwrap_or_default(),
            width: camera_file.width.unwrap_or(DEFAULT_WIDTH),
            height: camera_file.height.unwrap_or(DEFAULT_HEIGHT),
            target_fps: camera_file.target_fps.unwrap_or(DEFAULT_FPS),
        };

        let pre_file = file.preprocessing.unwrap_or_default();
        let resize = match (pre_file.scale, pre_file.width, pre_file.height) {
            (None, None, None) => Resize::None,
            (Some(factor), None, None) => Resize::Factor(factor),
            (None, Some(width), Some(height)) => Resize::Exact { width, height },
            (Some(_), _, _) => {
                return Err(anyhow!(
                    "preprocessing takes either a scale or a width/height pair, not both"
                ))
            }
            _ => {
                return Err(anyhow!(
                    "preprocessing width and height must be given together"
                ))
            }
        };
        let preprocessing = PreprocessConfig {
            color: pre_file.color.unwrap_or_default(),
            resize,
        };

        let mut exports = file.exports.unwrap_or_else(default_exports);
        if let Some(dir) = file.output_dir.as_deref() {
            relocate_exports(&mut exports, dir);
        }

        Ok(Self {
            camera,
            preprocessing,
            display: file.display.unwrap_or(true),
            window_size: file.window_size.unwrap_or(DEFAULT_WINDOW),
            exports,
            convert_to_ply: file.convert_to_ply.unwrap_or(false),
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(device) = env_value("LIVE_SLAM_CAMERA") {
            self.camera.device = device
                .parse()
                .with_context(|| format!("invalid LIVE_SLAM_CAMERA '{}'", device))?;
        }
        if let Some(width) = env_parsed::<u32>("LIVE_SLAM_WIDTH")? {
            self.camera.width = width;
        }
        if let Some(height) = env_parsed::<u32>("LIVE_SLAM_HEIGHT")? {
            self.camera.height = height;
        }
        if let Some(fps) = env_parsed::<u32>("LIVE_SLAM_FPS")? {
            self.camera.target_fps = fps;
        }
        if let Some(scale) = env_parsed::<f32>("LIVE_SLAM_SCALE")? {
            if let Resize::Exact { width, height } = self.preprocessing.resize {
                return Err(anyhow!(
                    "LIVE_SLAM_SCALE conflicts with the configured {}x{} resize",
                    width,
                    height
                ));
            }
            self.preprocessing.resize = Resize::Factor(scale);
        }
        if let Some(color) = env_value("LIVE_SLAM_COLOR") {
            self.preprocessing.color = color
                .parse()
                .with_context(|| "invalid LIVE_SLAM_COLOR".to_string())?;
        }
        if let Some(display) = env_value("LIVE_SLAM_DISPLAY") {
            self.display = parse_bool("LIVE_SLAM_DISPLAY", &display)?;
        }
        if let Some(window) = env_parsed::<usize>("LIVE_SLAM_WINDOW")? {
            self.window_size = window;
        }
        if let Some(dir) = env_value("LIVE_SLAM_OUTPUT_DIR") {
            relocate_exports(&mut self.exports, Path::new(&dir));
        }
        if let Some(ply) = env_value("LIVE_SLAM_PLY") {
            self.convert_to_ply = parse_bool("LIVE_SLAM_PLY", &ply)?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(anyhow!("window_size must be at least 1"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be greater than zero"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        match self.preprocessing.resize {
            Resize::Factor(factor) if !valid_scale(factor) => {
                return Err(anyhow!(
                    "scale must be greater than 0 and at most {}, got {}",
                    MAX_SCALE,
                    factor
                ));
            }
            Resize::Exact { width, height }
                if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION =>
            {
                return Err(anyhow!(
                    "resize width and height must be between 1 and {}, got {}x{}",
                    MAX_DIMENSION,
                    width,
                    height
                ));
            }
            _ => {}
        }
        if self.exports.is_empty() {
            return Err(anyhow!("at least one export target is required"));
        }
        Ok(())
    }
}

fn default_exports() -> Vec<ExportTarget> {
    vec![
        ExportTarget::new(ArtifactKind::CameraTrajectory, DEFAULT_CAMERA_TRAJECTORY),
        ExportTarget::new(ArtifactKind::KeyframeTrajectory, DEFAULT_KEYFRAME_TRAJECTORY),
        ExportTarget::new(ArtifactKind::PointCloud, DEFAULT_POINT_CLOUD),
    ]
}

/// Re-root relative export paths under `dir`.
fn relocate_exports(exports: &mut [ExportTarget], dir: &Path) {
    for target in exports.iter_mut().filter(|t| t.path.is_relative()) {
        let file_name = target.path.clone();
        target.path = dir.join(file_name);
    }
}

fn read_config_file(path: &Path) -> Result<SessionConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env_value(key) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} has an invalid value '{}'", key, value)),
        None => Ok(None),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("{} must be a boolean, got '{}'", key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() -> Result<()> {
        let cfg = SessionConfig::from_file(SessionConfigFile::default())?;
        assert_eq!(cfg.camera.device, DeviceId::Index(0));
        assert_eq!((cfg.camera.width, cfg.camera.height), (640, 480));
        assert_eq!(cfg.camera.target_fps, 30);
        assert_eq!(cfg.window_size, 30);
        assert_eq!(cfg.exports.len(), 3);
        assert!(cfg.display);
        cfg.validate()
    }

    #[test]
    fn scale_and_size_are_exclusive() {
        let file: SessionConfigFile =
            serde_json::from_str(r#"{"preprocessing": {"scale": 0.5, "width": 600}}"#).unwrap();
        assert!(SessionConfig::from_file(file).is_err());
    }

    #[test]
    fn output_dir_reroots_relative_exports_only() -> Result<()> {
        let file: SessionConfigFile = serde_json::from_str(
            r#"{
                "output_dir": "/tmp/run1",
                "exports": [
                    {"kind": "camera_trajectory", "path": "CameraTrajectory.txt"},
                    {"kind": "point_cloud", "path": "/data/cloud.txt"}
                ]
            }"#,
        )?;
        let cfg = SessionConfig::from_file(file)?;
        assert_eq!(cfg.exports[0].path, PathBuf::from("/tmp/run1/CameraTrajectory.txt"));
        assert_eq!(cfg.exports[1].path, PathBuf::from("/data/cloud.txt"));
        Ok(())
    }

    #[test]
    fn validation_rejects_zero_window_and_bad_scale() {
        let mut cfg = SessionConfig {
            window_size: 0,
            ..SessionConfig::default()
        };
        assert!(cfg.validate().is_err());
        cfg.window_size = 30;
        cfg.preprocessing.resize = Resize::Factor(f32::NAN);
        assert!(cfg.validate().is_err());
        cfg.preprocessing.resize = Resize::Factor(1.0e6);
        assert!(cfg.validate().is_err());
        cfg.preprocessing.resize = Resize::Factor(MAX_SCALE);
        assert!(cfg.validate().is_ok());
        cfg.preprocessing.resize = Resize::Exact {
            width: 100_000,
            height: 350,
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed: std::result::Result<SessionConfigFile, _> =
            serde_json::from_str(r#"{"camera": {"devcie": "0"}}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn booleans_accept_common_spellings() {
        assert!(parse_bool("K", "ON").unwrap());
        assert!(!parse_bool("K", "0").unwrap());
        assert!(parse_bool("K", "maybe").is_err());
    }
}
