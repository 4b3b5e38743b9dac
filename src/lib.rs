//! Live monocular SLAM session runner.
//!
//! This crate drives an external visual SLAM engine from a live camera: it
//! captures frames, optionally converts and rescales them, stamps them with
//! seconds since session start and hands them to the engine one at a time.
//! Every N frames the average processing time and effective frame rate over a
//! sliding window are printed. On Ctrl-C (or when the source runs dry) the
//! engine is shut down and its trajectories and map are saved.
//!
//! # Module Structure
//!
//! - `frame`: owned image buffers
//! - `ingest`: frame sources (V4L2 devices, synthetic `stub://` cameras)
//! - `preprocess`: color conversion and resizing
//! - `clock`: session-relative timestamps
//! - `monitor`: sliding-window throughput statistics
//! - `engine`: the tracking engine boundary and a file-backed stub engine
//! - `session`: the session state machine
//! - `shutdown`: Ctrl-C wiring
//! - `config`, `cli`, `ui`: process surface
//! - `ply`: PLY conversion of saved artifacts

pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod monitor;
pub mod ply;
pub mod preprocess;
pub mod session;
pub mod shutdown;
pub mod ui;

pub use clock::{EpochMarker, SessionClock};
pub use config::{ArtifactKind, ExportTarget, SessionConfig};
pub use engine::{EngineSpec, StubEngine, TrackingEngine, TrackingState};
pub use error::{CaptureError, SessionError};
pub use frame::{Frame, PixelFormat};
pub use ingest::{CameraConfig, CameraSource, DeviceId, FrameSource, SourceStats};
pub use monitor::{PerformanceMonitor, PerformanceReport, ProcessingSample};
pub use preprocess::{ColorTarget, FramePreprocessor, PreprocessConfig, Resize};
pub use session::{
    PersistFailure, SessionController, SessionEnd, SessionPhase, SessionReport, StopHandle,
};
pub use shutdown::ShutdownCoordinator;
