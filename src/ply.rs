//! ASCII PLY export of persisted session artifacts.
//!
//! Two inputs are understood:
//! - point clouds: comma separated `pos_x, pos_y, pos_z` rows after one header
//!   line, in world coordinates
//! - TUM trajectories: `timestamp tx ty tz qx qy qz qw` rows
//!
//! Trajectory vertices are colored light green so they stand out next to the
//! uncolored map when both are loaded in a viewer.

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub const TRAJECTORY_COLOR: [u8; 3] = [144, 238, 144];

pub fn read_point_cloud(path: &Path) -> Result<Vec<[f64; 3]>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open point cloud {}", path.display()))?;
    let mut points = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate().skip(1) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let coords: Vec<f64> = line
            .split(',')
            .map(|value| value.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| anyhow!("{}:{}: invalid coordinate: {}", path.display(), index + 1, e))?;
        if coords.len() < 3 {
            return Err(anyhow!(
                "{}:{}: expected 3 coordinates, got {}",
                path.display(),
                index + 1,
                coords.len()
            ));
        }
        points.push([coords[0], coords[1], coords[2]]);
    }
    Ok(points)
}

/// Translation part of every well-formed pose. Other lines are skipped.
pub fn read_tum_positions(path: &Path) -> Result<Vec<[f64; 3]>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open trajectory {}", path.display()))?;
    let mut positions = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() != 8 {
            log::warn!("skipping invalid trajectory line: {}", line.trim());
            continue;
        }
        match (cols[1].parse(), cols[2].parse(), cols[3].parse()) {
            (Ok(x), Ok(y), Ok(z)) => positions.push([x, y, z]),
            _ => log::warn!("skipping invalid trajectory line: {}", line.trim()),
        }
    }
    Ok(positions)
}

pub fn write_ply(path: &Path, vertices: &[[f64; 3]], color: Option<[u8; 3]>) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "element vertex {}", vertices.len())?;
    for axis in ["x", "y", "z"] {
        writeln!(out, "property float {}", axis)?;
    }
    if color.is_some() {
        for channel in ["red", "green", "blue"] {
            writeln!(out, "property uchar {}", channel)?;
        }
    }
    writeln!(out, "end_header")?;
    for [x, y, z] in vertices {
        match color {
            Some([r, g, b]) => writeln!(out, "{:.6} {:.6} {:.6} {} {} {}", x, y, z, r, g, b)?,
            None => writeln!(out, "{:.6} {:.6} {:.6}", x, y, z)?,
        }
    }
    out.flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Convert a point-cloud CSV. Returns the vertex count.
pub fn point_cloud_to_ply(input: &Path, output: &Path) -> Result<usize> {
    let points = read_point_cloud(input)?;
    write_ply(output, &points, None)?;
    Ok(points.len())
}

/// Convert a TUM trajectory into colored vertices. Returns the vertex count.
pub fn trajectory_to_ply(input: &Path, output: &Path) -> Result<usize> {
    let positions = read_tum_positions(input)?;
    write_ply(output, &positions, Some(TRAJECTORY_COLOR))?;
    Ok(positions.len())
}
