mod backend;
mod stub;

pub use backend::{EngineSpec, SensorMode, TrackingEngine, TrackingState};
pub use stub::StubEngine;
