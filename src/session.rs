//! Live session orchestration.
//!
//! A `SessionController` walks `Initializing → Running → Draining →
//! Terminated` exactly once:
//!
//! 1. Initializing: construct the engine, open the frame source, configure
//!    preprocessing. A failure here terminates the session.
//! 2. Running: capture, preprocess, timestamp, submit, measure, record and
//!    (every N frames) report, strictly one frame at a time.
//! 3. Draining: shut the engine down, then persist every export target.
//! 4. Terminated: nothing else may run.
//!
//! The loop stops when the continuation flag is cleared (interruption) or the
//! source reports end-of-stream or a capture failure. Draining runs in every
//! one of those cases.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::clock::SessionClock;
use crate::config::{ArtifactKind, ExportTarget, SessionConfig};
use crate::engine::{EngineSpec, TrackingEngine, TrackingState};
use crate::error::{CaptureError, SessionError, EXIT_PERSISTENCE};
use crate::ingest::{CameraConfig, FrameSource};
use crate::monitor::{PerformanceMonitor, PerformanceReport, ProcessingSample};
use crate::ply;
use crate::preprocess::FramePreprocessor;
use crate::ui::Ui;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Initializing,
    Running,
    Draining,
    Terminated,
}

/// Why the running loop stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    Interrupted,
    EndOfStream,
    CaptureFailure(String),
}

/// The only way to stop a running session from outside the loop.
#[derive(Clone, Debug)]
pub struct StopHandle {
    keep_running: Arc<AtomicBool>,
}

impl StopHandle {
    /// Clear the continuation flag. Returns true for the call that actually
    /// cleared it; later calls are no-ops returning false.
    pub fn request_stop(&self) -> bool {
        self.keep_running.swap(false, Ordering::AcqRel)
    }

    pub fn is_stop_requested(&self) -> bool {
        !self.keep_running.load(Ordering::Acquire)
    }
}

/// An artifact that could not be written.
#[derive(Clone, Debug)]
pub struct PersistFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a session that reached Running.
#[derive(Debug)]
pub struct SessionReport {
    pub frames_processed: u64,
    pub end: SessionEnd,
    pub performance_reports: Vec<PerformanceReport>,
    pub phases: Vec<SessionPhase>,
    pub persisted: Vec<PathBuf>,
    pub persist_failures: Vec<PersistFailure>,
}

impl SessionReport {
    /// 0 when every artifact was written, whatever ended the loop.
    pub fn exit_code(&self) -> u8 {
        if self.persist_failures.is_empty() {
            0
        } else {
            EXIT_PERSISTENCE
        }
    }
}

pub struct SessionController {
    config: SessionConfig,
    keep_running: Arc<AtomicBool>,
    phase: SessionPhase,
    phases: Vec<SessionPhase>,
    ui: Ui,
}

impl SessionController {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            keep_running: Arc::new(AtomicBool::new(true)),
            phase: SessionPhase::Initializing,
            phases: vec![SessionPhase::Initializing],
            ui: Ui::plain(),
        }
    }

    pub fn with_ui(mut self, ui: Ui) -> Self {
        self.ui = ui;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            keep_running: Arc::clone(&self.keep_running),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the whole session.
    ///
    /// `construct` receives the engine spec built from the two resource paths
    /// and the display setting; `open` receives the camera configuration and
    /// is only called once the engine exists.
    pub fn run<E, S, C, O>(
        &mut self,
        vocabulary: &Path,
        settings: &Path,
        construct: C,
        open: O,
    ) -> Result<SessionReport, SessionError>
    where
        E: TrackingEngine,
        S: FrameSource,
        C: FnOnce(&EngineSpec) -> Result<E>,
        O: FnOnce(&CameraConfig) -> Result<S>,
    {
        if self.phase != SessionPhase::Initializing {
            return Err(SessionError::AlreadyTerminated);
        }

        let spec = EngineSpec::monocular(vocabulary, settings, self.config.display);
        let mut engine = {
            let stage = self.ui.stage("Starting tracking engine");
            match construct(&spec) {
                Ok(engine) => engine,
                Err(err) => {
                    stage.fail();
                    self.enter(SessionPhase::Terminated);
                    return Err(SessionError::EngineConstruction(err));
                }
            }
        };

        let mut source = match open(&self.config.camera) {
            Ok(source) => source,
            Err(err) => {
                log::error!("camera {} unavailable: {:#}", self.config.camera.device, err);
                engine.shutdown();
                self.enter(SessionPhase::Terminated);
                return Err(SessionError::DeviceOpen(err));
            }
        };

        let preprocessor =
            FramePreprocessor::with_engine_scale(self.config.preprocessing, engine.image_scale());
        let mut monitor = PerformanceMonitor::new(self.config.window_size);

        self.enter(SessionPhase::Running);
        log::info!(
            "session running: engine={} camera={} preprocessing={}",
            engine.name(),
            self.config.camera.device,
            if preprocessor.is_identity() { "none" } else { "enabled" }
        );

        let (frames_processed, end, performance_reports) =
            self.run_loop(&mut engine, &mut source, &preprocessor, &mut monitor);

        let stats = source.stats();
        log::info!(
            "capture stopped ({:?}) after {} frames from {}",
            end,
            stats.frames_captured,
            stats.device
        );
        drop(source);

        self.enter(SessionPhase::Draining);
        let (persisted, persist_failures) = self.drain(&mut engine);
        self.enter(SessionPhase::Terminated);

        Ok(SessionReport {
            frames_processed,
            end,
            performance_reports,
            phases: self.phases.clone(),
            persisted,
            persist_failures,
        })
    }

    fn run_loop<E: TrackingEngine, S: FrameSource>(
        &self,
        engine: &mut E,
        source: &mut S,
        preprocessor: &FramePreprocessor,
        monitor: &mut PerformanceMonitor,
    ) -> (u64, SessionEnd, Vec<PerformanceReport>) {
        let epoch = SessionClock::start();
        let mut reports = Vec::new();
        let mut frame_index: u64 = 0;
        let mut last_state = None;

        let end = loop {
            if !self.keep_running.load(Ordering::Acquire) {
                break SessionEnd::Interrupted;
            }

            let frame = match source.next_frame() {
                Ok(frame) if frame.is_empty() => {
                    self.halt();
                    log::error!("blank frame grabbed");
                    break SessionEnd::CaptureFailure(CaptureError::BlankFrame.to_string());
                }
                Ok(frame) => frame,
                Err(CaptureError::EndOfStream) => {
                    self.halt();
                    break SessionEnd::EndOfStream;
                }
                Err(err) => {
                    self.halt();
                    log::error!("{}", err);
                    break SessionEnd::CaptureFailure(err.to_string());
                }
            };

            let frame = preprocessor.process(frame);
            let timestamp = SessionClock::now(&epoch);

            let started = Instant::now();
            let state = engine.track_monocular(&frame, timestamp);
            monitor.record(ProcessingSample::from(started.elapsed()));
            drop(frame);

            if last_state != Some(state) {
                log_state_change(state, frame_index);
                last_state = Some(state);
            }

            frame_index += 1;
            if monitor.should_report(frame_index) {
                let report = monitor.report(frame_index);
                println!("{}", report);
                reports.push(report);
            }
        };

        (frame_index, end, reports)
    }

    fn drain<E: TrackingEngine>(&self, engine: &mut E) -> (Vec<PathBuf>, Vec<PersistFailure>) {
        {
            let _stage = self.ui.stage("Stopping tracking engine");
            engine.shutdown();
        }

        let mut persisted = Vec::new();
        let mut failures = Vec::new();
        for target in &self.config.exports {
            let stage = self.ui.stage(&format!("Saving {}", target.path.display()));
            match persist(engine, target, self.config.convert_to_ply) {
                Ok(mut paths) => persisted.append(&mut paths),
                Err(err) => {
                    stage.fail();
                    log::error!("failed to save {}: {:#}", target.path.display(), err);
                    failures.push(PersistFailure {
                        path: target.path.clone(),
                        reason: format!("{:#}", err),
                    });
                }
            }
        }
        (persisted, failures)
    }

    /// Clear the flag on source exhaustion or failure.
    fn halt(&self) {
        self.keep_running.store(false, Ordering::Release);
    }

    fn enter(&mut self, phase: SessionPhase) {
        log::debug!("session phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.phases.push(phase);
    }
}

fn persist<E: TrackingEngine>(
    engine: &E,
    target: &ExportTarget,
    convert_to_ply: bool,
) -> Result<Vec<PathBuf>> {
    match target.kind {
        ArtifactKind::CameraTrajectory => engine.save_trajectory(&target.path)?,
        ArtifactKind::KeyframeTrajectory => engine.save_keyframe_trajectory(&target.path)?,
        ArtifactKind::PointCloud => engine.save_point_cloud(&target.path)?,
    }
    let mut written = vec![target.path.clone()];
    if convert_to_ply {
        let ply_path = target.path.with_extension("ply");
        let vertices = match target.kind {
            ArtifactKind::PointCloud => ply::point_cloud_to_ply(&target.path, &ply_path)?,
            _ => ply::trajectory_to_ply(&target.path, &ply_path)?,
        };
        log::info!("wrote {} ({} vertices)", ply_path.display(), vertices);
        written.push(ply_path);
    }
    Ok(written)
}

fn log_state_change(state: TrackingState, frame_index: u64) {
    match state {
        TrackingState::Lost => log::warn!("tracking lost at frame {}", frame_index),
        other => log::debug!("tracking state {:?} at frame {}", other, frame_index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_handle_clears_flag_once() {
        let controller = SessionController::new(SessionConfig::default());
        let handle = controller.stop_handle();
        assert!(!handle.is_stop_requested());
        assert!(handle.request_stop());
        assert!(!handle.request_stop());
        assert!(handle.clone().is_stop_requested());
    }

    #[test]
    fn report_exit_code_reflects_persistence() {
        let mut report = SessionReport {
            frames_processed: 0,
            end: SessionEnd::EndOfStream,
            performance_reports: Vec::new(),
            phases: Vec::new(),
            persisted: Vec::new(),
            persist_failures: Vec::new(),
        };
        assert_eq!(report.exit_code(), 0);
        report.persist_failures.push(PersistFailure {
            path: PathBuf::from("pointcloud.txt"),
            reason: "unsupported".into(),
        });
        assert_eq!(report.exit_code(), EXIT_PERSISTENCE);
    }

    #[test]
    fn new_controller_starts_initializing() {
        let controller = SessionController::new(SessionConfig::default());
        assert_eq!(controller.phase(), SessionPhase::Initializing);
        assert_eq!(controller.config().window_size, 30);
    }
}
