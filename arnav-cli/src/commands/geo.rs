//! `arnav geo`: distance, bearing and camera-relative offset.

use clap::Args;

use arnav::geo::{bearing, distance, rad_to_deg};
use arnav::placement::DEFAULT_MAX_RENDER_DISTANCE;
use arnav::pose::{place_at, Pose};
use arnav::GeoCoordinate;

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct GeoArgs {
    /// Start coordinate as "lat,lon"
    #[arg(allow_hyphen_values = true)]
    pub from: GeoCoordinate,

    /// Target coordinate as "lat,lon"
    #[arg(allow_hyphen_values = true)]
    pub to: GeoCoordinate,

    /// Clamp for the local offset in meters
    #[arg(long, default_value_t = DEFAULT_MAX_RENDER_DISTANCE)]
    pub max_distance: f64,
}

/// Computed figures for one coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoReport {
    pub distance_m: f64,
    pub bearing_deg: f64,
    /// Offset from an identity camera pose, in session space.
    pub offset: [f64; 3],
}

pub fn compute(args: &GeoArgs) -> GeoReport {
    let placed = place_at(&Pose::identity(), &args.from, &args.to, args.max_distance);
    let t = placed.translation();
    GeoReport {
        distance_m: distance(&args.from, &args.to),
        bearing_deg: rad_to_deg(bearing(&args.from, &args.to)),
        offset: [t.x, t.y, t.z],
    }
}

pub fn run(args: &GeoArgs) -> Result<(), CliError> {
    let report = compute(args);
    println!("From:     {}", args.from);
    println!("To:       {}", args.to);
    println!("Distance: {:.1} m", report.distance_m);
    println!("Bearing:  {:.1}°", report.bearing_deg);
    println!(
        "Offset:   x={:.2} y={:.2} z={:.2} (max {:.0} m)",
        report.offset[0], report.offset[1], report.offset[2], args.max_distance
    );
    Ok(())
}
