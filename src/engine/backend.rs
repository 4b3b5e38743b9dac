use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};

use crate::frame::Frame;

/// Sensor configuration requested from the engine.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorMode {
    Monocular,
}

/// Everything an engine constructor receives.
///
/// The resource paths are opaque here; they are forwarded exactly as given on
/// the command line.
#[derive(Clone, Debug)]
pub struct EngineSpec {
    pub vocabulary_path: PathBuf,
    pub settings_path: PathBuf,
    pub mode: SensorMode,
    pub use_viewer: bool,
}

impl EngineSpec {
    pub fn monocular(
        vocabulary_path: impl Into<PathBuf>,
        settings_path: impl Into<PathBuf>,
        use_viewer: bool,
    ) -> Self {
        Self {
            vocabulary_path: vocabulary_path.into(),
            settings_path: settings_path.into(),
            mode: SensorMode::Monocular,
            use_viewer,
        }
    }
}

/// Tracking status returned per submission. Callers only log it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingState {
    SystemNotReady,
    NotInitialized,
    Ok,
    Lost,
}

/// Tracking engine boundary.
///
/// The engine owns pose estimation, mapping and loop closing, possibly on its
/// own worker threads. A session only calls these entry points, all of them
/// synchronously from the loop thread:
/// - `track_monocular` once per frame, in arrival order, with non-decreasing
///   timestamps
/// - `shutdown` once, before any artifact is saved
/// - the `save_*` methods after `shutdown`
pub trait TrackingEngine {
    fn name(&self) -> &'static str;

    /// Submit one frame. Blocks until the engine has consumed it.
    fn track_monocular(&mut self, frame: &Frame, timestamp: f64) -> TrackingState;

    /// Stop all internal workers. Must be safe to call more than once.
    fn shutdown(&mut self);

    /// Write the per-frame camera trajectory.
    fn save_trajectory(&self, path: &Path) -> Result<()>;

    fn save_keyframe_trajectory(&self, path: &Path) -> Result<()> {
        Err(anyhow!(
            "{} cannot export a keyframe trajectory to {}",
            self.name(),
            path.display()
        ))
    }

    fn save_point_cloud(&self, path: &Path) -> Result<()> {
        Err(anyhow!(
            "{} cannot export a point cloud to {}",
            self.name(),
            path.display()
        ))
    }

    /// Scale the engine expects input images at, from its settings.
    fn image_scale(&self) -> f32 {
        1.0
    }
}
