//! Command line of the `live_mono_slam` binary.
//!
//! Exactly two positional arguments are required. Anything else prints the
//! usage line on stderr and exits with status 1; `--help` and `--version`
//! exit 0.

use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

use crate::config::CONFIG_ENV;
use crate::error::SessionError;
use crate::ui::UiMode;

pub const USAGE: &str = "Usage: live_mono_slam path_to_vocabulary path_to_settings";

#[derive(Parser, Debug)]
#[command(
    name = "live_mono_slam",
    version,
    about = "Run live monocular SLAM on a camera feed until interrupted"
)]
pub struct LaunchArgs {
    /// Vocabulary file handed to the tracking engine.
    #[arg(value_name = "path_to_vocabulary")]
    pub vocabulary: PathBuf,

    /// Engine settings file (camera intrinsics etc.).
    #[arg(value_name = "path_to_settings")]
    pub settings: PathBuf,

    /// Session configuration file (JSON, or TOML by extension).
    #[arg(long, env = CONFIG_ENV, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Camera device: an index, a device path or stub://name?frames=N.
    #[arg(long, env = "LIVE_SLAM_CAMERA", value_name = "DEVICE")]
    pub camera: Option<String>,

    /// Progress output for start-up and draining stages.
    #[arg(long, value_enum, default_value_t = UiMode::Auto)]
    pub ui: UiMode,
}

/// What the process should do after looking at its arguments.
#[derive(Debug)]
pub enum Launch {
    Run(LaunchArgs),
    /// `--help` or `--version`: print and exit successfully.
    Informational(String),
}

pub fn parse_launch_args<I, T>(args: I) -> Result<Launch, SessionError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match LaunchArgs::try_parse_from(args) {
        Ok(args) => Ok(Launch::Run(args)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                Ok(Launch::Informational(err.to_string()))
            }
            _ => {
                log::debug!("argument error: {}", err);
                Err(SessionError::Usage(USAGE.to_string()))
            }
        },
    }
}
