// src/main.rs

mod config;
mod distance;
mod geometry;
mod kinematics;
mod report;
mod types;
mod zone;
mod zone_tracker;

use anyhow::{Context, Result};
use distance::DistanceEstimator;
use kinematics::KinematicsSmoother;
use report::ViolationReport;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use tracing::{info, warn};
use types::{Config, FrameDetections};
use zone::Zone;
use zone_tracker::ZoneTracker;

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());
    let config = Config::load(&config_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!("danger_zone_alert={}", config.logging.level))
        .init();

    info!("🚧 Danger Zone Alert System Starting");
    info!("✓ Configuration loaded from {}", config_path);
    info!(
        "Calibration: real_height={:.2}m, pixel_ref={:.0}px, fps={:.1}, frame_skip={}, window={}",
        config.calibration.real_height_m,
        config.calibration.pixel_height_ref,
        config.calibration.fps,
        config.calibration.frame_skip,
        config.calibration.window
    );

    let zone = Zone::new(&config.zone.polygon)?;
    let estimator = DistanceEstimator::new(
        config.calibration.real_height_m,
        config.calibration.pixel_height_ref,
    );
    let smoother = KinematicsSmoother::new(config.calibration.window, config.calibration.fps);
    let mut tracker = ZoneTracker::new(zone, estimator, smoother, config.calibration.frame_skip);

    info!("Reading detections from {}", config.video.detections_path);
    let file = File::open(&config.video.detections_path)
        .with_context(|| format!("opening {}", config.video.detections_path))?;

    let mut total_events = 0usize;
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", line_no + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        // A malformed frame degrades the stream, it never halts it
        let frame: FrameDetections = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("skipping malformed frame on line {}: {}", line_no + 1, e);
                continue;
            }
        };

        total_events += tracker.process_frame(&frame).len();

        if config.video.progress_interval > 0
            && tracker.frames_processed() % config.video.progress_interval == 0
        {
            info!("Processed {} frames...", tracker.frames_processed());
        }
    }

    total_events += tracker.finalize().len();

    let report = ViolationReport::from_records(tracker.violations());
    println!("{}", report.render());

    if config.alert.save_statistics {
        if let Some(path) = &config.alert.statistics_path {
            let json = serde_json::to_string_pretty(&report)?;
            fs::write(path, json).with_context(|| format!("writing statistics to {path}"))?;
            info!("✓ Statistics saved to {}", path);
        }
    }

    info!(
        "Total frames processed: {}, zone events: {}",
        tracker.frames_processed(),
        total_events
    );
    info!("Danger Zone Alert System stopped");
    Ok(())
}
