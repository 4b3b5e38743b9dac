use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::engine::backend::{EngineSpec, TrackingEngine, TrackingState};
use crate::frame::Frame;

/// Every Nth accepted frame is recorded as a keyframe.
const KEYFRAME_INTERVAL: u64 = 10;

/// Engine used when no native tracker is linked.
///
/// It checks that the vocabulary and settings resources exist, accepts frames
/// in order and records their timestamps. Poses are always identity, so the
/// exported trajectories carry timing only.
pub struct StubEngine {
    frame_timestamps: Vec<f64>,
    keyframe_timestamps: Vec<f64>,
    frames_seen: u64,
    shut_down: bool,
}

impl StubEngine {
    pub fn construct(spec: &EngineSpec) -> Result<Self> {
        for (what, path) in [
            ("vocabulary", &spec.vocabulary_path),
            ("settings", &spec.settings_path),
        ] {
            if !path.is_file() {
                return Err(anyhow!("{} file not found: {}", what, path.display()));
            }
        }
        log::info!(
            "stub engine ready ({:?}, viewer={}, vocabulary={}, settings={})",
            spec.mode,
            spec.use_viewer,
            spec.vocabulary_path.display(),
            spec.settings_path.display()
        );
        Ok(Self {
            frame_timestamps: Vec::new(),
            keyframe_timestamps: Vec::new(),
            frames_seen: 0,
            shut_down: false,
        })
    }

    pub fn frames_tracked(&self) -> usize {
        self.frame_timestamps.len()
    }
}

impl TrackingEngine for StubEngine {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn track_monocular(&mut self, frame: &Frame, timestamp: f64) -> TrackingState {
        if self.shut_down {
            log::warn!("stub engine: frame at {:.6} submitted after shutdown", timestamp);
            return TrackingState::SystemNotReady;
        }
        if frame.is_empty() {
            return TrackingState::NotInitialized;
        }
        if self.frames_seen % KEYFRAME_INTERVAL == 0 {
            self.keyframe_timestamps.push(timestamp);
        }
        self.frames_seen += 1;
        self.frame_timestamps.push(timestamp);
        if self.frames_seen == 1 {
            TrackingState::NotInitialized
        } else {
            TrackingState::Ok
        }
    }

    fn shutdown(&mut self) {
        if !self.shut_down {
            log::info!("stub engine: shut down after {} frames", self.frames_seen);
        }
        self.shut_down = true;
    }

    fn save_trajectory(&self, path: &Path) -> Result<()> {
        write_tum(path, &self.frame_timestamps)
    }

    fn save_keyframe_trajectory(&self, path: &Path) -> Result<()> {
        write_tum(path, &self.keyframe_timestamps)
    }

    fn save_point_cloud(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create point cloud {}", path.display()))?;
        let mut out = BufWriter::new(file);
        writeln!(out, "pos_x, pos_y, pos_z")?;
        out.flush()?;
        Ok(())
    }
}

/// `timestamp tx ty tz qx qy qz qw`, one pose per line.
fn write_tum(path: &Path, timestamps: &[f64]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create trajectory {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for ts in timestamps {
        writeln!(
            out,
            "{:.6} {:.9} {:.9} {:.9} {:.9} {:.9} {:.9} {:.9}",
            ts, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0
        )?;
    }
    out.flush()
        .with_context(|| format!("failed to write trajectory {}", path.display()))?;
    Ok(())
}
