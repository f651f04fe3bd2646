// src/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable identity assigned by the upstream tracker. Opaque to the engine;
/// only used as a map key.
pub type TrackId = i64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub video: VideoConfig,
    pub zone: ZoneConfig,
    pub calibration: CalibrationConfig,
    pub alert: AlertConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoConfig {
    /// JSON-Lines file of per-frame detections produced by the tracker stage
    pub detections_path: String,
    /// Log a progress line every N processed frames
    pub progress_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneConfig {
    /// Quadrilateral vertices in pixel coordinates, [x, y], in drawing order
    pub polygon: Vec<[f32; 2]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Assumed real-world subject height in meters
    pub real_height_m: f64,
    /// Pixel height observed at the calibration distance for that subject
    pub pixel_height_ref: f64,
    /// Frame rate of the source stream
    pub fps: f64,
    /// Kinematic sampling cadence: sample on frames where index % frame_skip == 0
    pub frame_skip: u64,
    /// Samples retained per identity for speed smoothing
    pub window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    pub save_statistics: bool,
    pub statistics_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

/// Image point in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box: top-left corner plus width/height, pixel units
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    /// Midpoint of the bottom edge, the ground-contact proxy used for
    /// zone membership.
    pub fn bottom_center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    pub id: TrackId,
    pub bbox: BoundingBox,
}

/// One frame's worth of tracker output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame_index: u64,
    /// Capture timestamp; the engine reads the wall clock when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub detections: Vec<Detection>,
}

/// Real-time side channel emitted by the tracker as transitions happen
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ZoneEvent {
    Entry {
        id: TrackId,
        timestamp: DateTime<Utc>,
    },
    Exit {
        id: TrackId,
        timestamp: DateTime<Utc>,
        duration_secs: f64,
    },
}
