//! mp_to_ply - convert saved map points and trajectories to PLY
//!
//! Point clouds become uncolored vertices; trajectories become light-green
//! vertices so both can be loaded side by side in a mesh viewer.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;

use live_slam::ply;

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert SLAM map points and trajectories to PLY")]
struct Args {
    /// Map point CSV written at the end of a session.
    #[arg(long, value_name = "PATH")]
    pointcloud: Option<PathBuf>,

    /// Output for the point cloud.
    #[arg(long, value_name = "PATH", default_value = "out.ply")]
    pointcloud_out: PathBuf,

    /// TUM-format trajectory (camera or keyframe).
    #[arg(long, value_name = "PATH")]
    trajectory: Option<PathBuf>,

    /// Output for the trajectory.
    #[arg(long, value_name = "PATH", default_value = "out_trajectory.ply")]
    trajectory_out: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.pointcloud.is_none() && args.trajectory.is_none() {
        return Err(anyhow!("nothing to convert: pass --pointcloud and/or --trajectory"));
    }

    if let Some(input) = &args.pointcloud {
        let count = ply::point_cloud_to_ply(input, &args.pointcloud_out)?;
        log::info!("wrote {} ({} points)", args.pointcloud_out.display(), count);
    }
    if let Some(input) = &args.trajectory {
        let count = ply::trajectory_to_ply(input, &args.trajectory_out)?;
        log::info!("wrote {} ({} poses)", args.trajectory_out.display(), count);
    }
    Ok(())
}
