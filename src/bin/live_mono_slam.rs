//! live_mono_slam - live monocular SLAM on a local camera
//!
//! This binary:
//! 1. Constructs the tracking engine from a vocabulary and a settings file
//! 2. Opens the camera and feeds frames until Ctrl-C or end of stream
//! 3. Prints throughput every N frames
//! 4. Shuts the engine down and saves trajectories and the map

use anyhow::{Context, Result};
use std::process::ExitCode;

use live_slam::cli::{parse_launch_args, Launch, LaunchArgs};
use live_slam::{
    CameraSource, DeviceId, SessionConfig, SessionController, SessionError, SessionReport,
    ShutdownCoordinator, StubEngine,
};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_launch_args(std::env::args_os()) {
        Ok(Launch::Run(args)) => args,
        Ok(Launch::Informational(text)) => {
            print!("{}", text);
            return ExitCode::SUCCESS;
        }
        Err(err) => return fail(err),
    };

    match run(args) {
        Ok(report) => {
            log::info!(
                "session finished: {} frames, ended by {:?}, {} artifacts saved",
                report.frames_processed,
                report.end,
                report.persisted.len()
            );
            for failure in &report.persist_failures {
                eprintln!("Error: could not save {}: {}", failure.path.display(), failure.reason);
            }
            ExitCode::from(report.exit_code())
        }
        Err(err) => fail(err),
    }
}

fn run(args: LaunchArgs) -> Result<SessionReport, SessionError> {
    let config = load_config(&args).map_err(SessionError::Config)?;

    let mut controller =
        SessionController::new(config).with_ui(live_slam::ui::Ui::for_stderr(args.ui));
    if let Err(err) = ShutdownCoordinator::install(controller.stop_handle()) {
        log::warn!("{:#}; Ctrl-C will not drain the session", err);
    }

    controller.run(
        &args.vocabulary,
        &args.settings,
        StubEngine::construct,
        CameraSource::open,
    )
}

fn load_config(args: &LaunchArgs) -> Result<SessionConfig> {
    let mut config = SessionConfig::load(args.config.as_deref())?;
    if let Some(camera) = &args.camera {
        config.camera.device = camera
            .parse::<DeviceId>()
            .with_context(|| format!("invalid --camera '{}'", camera))?;
    }
    Ok(config)
}

fn fail(err: SessionError) -> ExitCode {
    match &err {
        SessionError::Usage(usage) => eprintln!("{}", usage),
        other => eprintln!("Error: {}", other),
    }
    ExitCode::from(err.exit_code())
}
