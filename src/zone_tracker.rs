// src/zone_tracker.rs
//
// Occupancy lifecycle tracking: per-identity Outside/Inside state machine
// driving entry/exit events and the violation log.
//
// Design:
//   - One ZoneTracker per monitoring session, owned by the processing loop
//   - At most one open record per identity; closed records are append-only
//   - Kinematics are sampled every `frame_skip` frames while inside;
//     degenerate boxes skip the sample but never close the episode
//   - Identities missing from a frame are left untouched (a dropped track
//     is not a zone exit); finalize() closes whatever is still open

use crate::distance::DistanceEstimator;
use crate::kinematics::KinematicsSmoother;
use crate::types::{BoundingBox, FrameDetections, TrackId, ZoneEvent};
use crate::zone::Zone;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// One violation episode: a contiguous interval an identity spent inside
/// the zone. Mutated while open, immutable once it reaches the log.
#[derive(Debug, Clone)]
pub struct OccupancyRecord {
    pub id: TrackId,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub distance_traveled_m: f64,
    pub max_speed_mps: f64,
    pub last_distance_m: Option<f64>,
}

impl OccupancyRecord {
    fn open(id: TrackId, entry_time: DateTime<Utc>) -> Self {
        Self {
            id,
            entry_time,
            exit_time: None,
            distance_traveled_m: 0.0,
            max_speed_mps: 0.0,
            last_distance_m: None,
        }
    }

    /// Episode length in seconds; falls back to zero-length for a record
    /// that somehow reached the log unclosed.
    pub fn duration_secs(&self) -> f64 {
        let exit = self.exit_time.unwrap_or(self.entry_time);
        (exit - self.entry_time).num_milliseconds() as f64 / 1000.0
    }
}

pub struct ZoneTracker {
    zone: Zone,
    estimator: DistanceEstimator,
    smoother: KinematicsSmoother,
    frame_skip: u64,
    open: HashMap<TrackId, OccupancyRecord>,
    violations: Vec<OccupancyRecord>,
    frames_processed: u64,
    last_frame_time: Option<DateTime<Utc>>,
}

impl ZoneTracker {
    pub fn new(
        zone: Zone,
        estimator: DistanceEstimator,
        smoother: KinematicsSmoother,
        frame_skip: u64,
    ) -> Self {
        Self {
            zone,
            estimator,
            smoother,
            frame_skip: frame_skip.max(1),
            open: HashMap::new(),
            violations: Vec::new(),
            frames_processed: 0,
            last_frame_time: None,
        }
    }

    /// Process one frame's detections, returning the transitions it caused.
    pub fn process_frame(&mut self, frame: &FrameDetections) -> Vec<ZoneEvent> {
        let now = frame.timestamp.unwrap_or_else(Utc::now);
        self.frames_processed += 1;
        self.last_frame_time = Some(now);

        let mut events = Vec::new();
        for det in &frame.detections {
            let inside = self.zone.contains_bbox(&det.bbox);
            let was_inside = self.open.contains_key(&det.id);

            match (was_inside, inside) {
                (false, true) => {
                    self.open.insert(det.id, OccupancyRecord::open(det.id, now));
                    info!(
                        "🚨 ALERT! Person (ID: {}) entered danger zone at {}",
                        det.id,
                        now.format("%H:%M:%S%.3f")
                    );
                    events.push(ZoneEvent::Entry {
                        id: det.id,
                        timestamp: now,
                    });
                    // The entry frame participates in sampling like any other
                    self.update_kinematics(det.id, &det.bbox, frame.frame_index);
                }
                (true, true) => {
                    self.update_kinematics(det.id, &det.bbox, frame.frame_index);
                }
                (true, false) => {
                    if let Some(event) = self.close_episode(det.id, now) {
                        events.push(event);
                    }
                }
                (false, false) => {}
            }
        }

        if !self.open.is_empty() {
            debug!(
                "frame {}: {} person(s) currently in zone",
                frame.frame_index,
                self.open.len()
            );
        }
        events
    }

    /// Distance/speed bookkeeping for an identity currently inside the zone.
    /// Only runs on sampling frames; a box with no distance estimate leaves
    /// the record untouched for this frame.
    fn update_kinematics(&mut self, id: TrackId, bbox: &BoundingBox, frame_index: u64) {
        if frame_index % self.frame_skip != 0 {
            return;
        }
        let Some(distance) = self.estimator.estimate(bbox.height) else {
            debug!(
                "frame {}: invalid bbox height {:.1}px for ID {}, skipping kinematic update",
                frame_index, bbox.height, id
            );
            return;
        };

        self.smoother.record_sample(id, frame_index, distance);
        let speed = self.smoother.estimate_speed(id);

        let Some(record) = self.open.get_mut(&id) else {
            // Unreachable given the state machine, but never worth a panic
            warn!("kinematic update for ID {} with no open record", id);
            return;
        };
        if let Some(prev) = record.last_distance_m {
            record.distance_traveled_m += (distance - prev).abs();
        }
        record.last_distance_m = Some(distance);
        if let Some(speed) = speed {
            record.max_speed_mps = record.max_speed_mps.max(speed.abs());
        }
    }

    fn close_episode(&mut self, id: TrackId, exit_time: DateTime<Utc>) -> Option<ZoneEvent> {
        let Some(mut record) = self.open.remove(&id) else {
            // Defensive: an exit computed for an identity we never saw enter
            warn!("exit transition for ID {} with no open record, ignoring", id);
            return None;
        };
        record.exit_time = Some(exit_time);
        let duration = record.duration_secs();
        info!(
            "⚠ Person (ID: {}) left danger zone (Duration: {:.2}s)",
            id, duration
        );
        self.smoother.clear(id);
        self.violations.push(record);
        Some(ZoneEvent::Exit {
            id,
            timestamp: exit_time,
            duration_secs: duration,
        })
    }

    /// Force-close every episode still open, stamping the last processed
    /// frame's timestamp rather than reading the clock again. Idempotent:
    /// a second call finds nothing open. Must run before reading the report
    /// of a stream that ended mid-episode.
    pub fn finalize(&mut self) -> Vec<ZoneEvent> {
        let mut ids: Vec<TrackId> = self.open.keys().copied().collect();
        ids.sort_unstable();

        let mut events = Vec::new();
        for id in ids {
            // No frames processed means nothing could have opened; the
            // entry time is the safe fallback either way
            let exit_time = self
                .last_frame_time
                .unwrap_or_else(|| self.open[&id].entry_time);
            info!(
                "⚠ Person (ID: {}) still in danger zone at stream end",
                id
            );
            if let Some(event) = self.close_episode(id, exit_time) {
                events.push(event);
            }
        }
        events
    }

    /// Closed episodes, in closure order
    pub fn violations(&self) -> &[OccupancyRecord] {
        &self.violations
    }

    /// Identities currently inside the zone
    pub fn in_zone_count(&self) -> usize {
        self.open.len()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Equivalent to reconstructing the tracker for a fresh session
    pub fn reset(&mut self) {
        self.open.clear();
        self.violations.clear();
        self.smoother.reset();
        self.frames_processed = 0;
        self.last_frame_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Detection;
    use chrono::TimeZone;

    const FPS: f64 = 30.0;
    const FRAME_SKIP: u64 = 5;

    fn tracker() -> ZoneTracker {
        // 1000x1000 square zone anchored at the origin
        let zone = Zone::new(&[
            [0.0, 0.0],
            [1000.0, 0.0],
            [1000.0, 1000.0],
            [0.0, 1000.0],
        ])
        .unwrap();
        ZoneTracker::new(
            zone,
            DistanceEstimator::new(1.76, 200.0),
            KinematicsSmoother::new(8, FPS),
            FRAME_SKIP,
        )
    }

    /// Timestamp a frame index deterministically at 30fps
    fn ts(frame_index: u64) -> DateTime<Utc> {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        base + chrono::Duration::milliseconds((frame_index as f64 / FPS * 1000.0) as i64)
    }

    fn bbox_inside(height: f32) -> BoundingBox {
        BoundingBox {
            x: 480.0,
            y: 500.0 - height,
            width: 40.0,
            height,
        }
    }

    fn bbox_outside() -> BoundingBox {
        BoundingBox {
            x: 1500.0,
            y: 300.0,
            width: 40.0,
            height: 200.0,
        }
    }

    fn frame(frame_index: u64, detections: Vec<Detection>) -> FrameDetections {
        FrameDetections {
            frame_index,
            timestamp: Some(ts(frame_index)),
            detections,
        }
    }

    fn det(id: TrackId, bbox: BoundingBox) -> Detection {
        Detection { id, bbox }
    }

    #[test]
    fn test_entry_and_exit_transitions_emit_events() {
        let mut t = tracker();

        let events = t.process_frame(&frame(0, vec![det(1, bbox_inside(200.0))]));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ZoneEvent::Entry { id: 1, .. }));
        assert_eq!(t.in_zone_count(), 1);

        let events = t.process_frame(&frame(1, vec![det(1, bbox_outside())]));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ZoneEvent::Exit { id: 1, .. }));
        assert_eq!(t.in_zone_count(), 0);
        assert_eq!(t.violations().len(), 1);
    }

    #[test]
    fn test_entry_time_never_exceeds_exit_time() {
        let mut t = tracker();
        for i in 0..20 {
            t.process_frame(&frame(i, vec![det(1, bbox_inside(200.0))]));
        }
        t.process_frame(&frame(20, vec![det(1, bbox_outside())]));

        let record = &t.violations()[0];
        assert!(record.entry_time <= record.exit_time.unwrap());
        assert!((record.duration_secs() - 20.0 / FPS).abs() < 0.01);
    }

    #[test]
    fn test_at_most_one_open_record_per_identity() {
        let mut t = tracker();
        // Staying inside for many frames opens exactly one episode
        for i in 0..50 {
            let events = t.process_frame(&frame(i, vec![det(9, bbox_inside(200.0))]));
            if i == 0 {
                assert_eq!(events.len(), 1);
            } else {
                assert!(events.is_empty(), "no transition while staying inside");
            }
        }
        assert_eq!(t.in_zone_count(), 1);
        assert!(t.violations().is_empty());
    }

    #[test]
    fn test_reentry_opens_a_second_episode() {
        let mut t = tracker();
        t.process_frame(&frame(0, vec![det(1, bbox_inside(200.0))]));
        t.process_frame(&frame(1, vec![det(1, bbox_outside())]));
        t.process_frame(&frame(2, vec![det(1, bbox_inside(200.0))]));
        t.process_frame(&frame(3, vec![det(1, bbox_outside())]));

        assert_eq!(t.violations().len(), 2);
        let (a, b) = (&t.violations()[0], &t.violations()[1]);
        // Episodes for one identity never overlap
        assert!(a.exit_time.unwrap() <= b.entry_time);
    }

    #[test]
    fn test_absent_identity_is_left_untouched() {
        let mut t = tracker();
        t.process_frame(&frame(0, vec![det(1, bbox_inside(200.0))]));
        // Track drops out for a few frames; the episode stays open
        for i in 1..10 {
            let events = t.process_frame(&frame(i, vec![]));
            assert!(events.is_empty());
        }
        assert_eq!(t.in_zone_count(), 1);
        assert!(t.violations().is_empty());
    }

    #[test]
    fn test_finalize_closes_open_episodes_with_last_frame_time() {
        let mut t = tracker();
        t.process_frame(&frame(0, vec![det(3, bbox_inside(200.0))]));
        t.process_frame(&frame(1, vec![det(3, bbox_inside(200.0))]));
        t.process_frame(&frame(2, vec![]));

        let events = t.finalize();
        assert_eq!(events.len(), 1);
        assert_eq!(t.violations().len(), 1);
        // Exit stamped with the last processed frame's timestamp, not a
        // fresh clock read
        assert_eq!(t.violations()[0].exit_time.unwrap(), ts(2));
        assert_eq!(t.in_zone_count(), 0);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut t = tracker();
        t.process_frame(&frame(0, vec![det(3, bbox_inside(200.0))]));
        assert_eq!(t.finalize().len(), 1);
        assert!(t.finalize().is_empty());
        assert_eq!(t.violations().len(), 1);
    }

    #[test]
    fn test_degenerate_bbox_skips_kinematics_but_keeps_episode_open() {
        let mut t = tracker();
        t.process_frame(&frame(0, vec![det(5, bbox_inside(200.0))]));
        // Zero-height box on a sampling frame while inside: bottom_center
        // is still in the zone, but no distance estimate exists
        let degenerate = BoundingBox {
            x: 480.0,
            y: 500.0,
            width: 40.0,
            height: 0.0,
        };
        t.process_frame(&frame(5, vec![det(5, degenerate)]));

        assert_eq!(t.in_zone_count(), 1);
        t.finalize();
        let record = &t.violations()[0];
        // Frame 0 sampled 1.76m; the degenerate frame changed nothing
        assert_eq!(record.last_distance_m, Some(1.76));
        assert_eq!(record.distance_traveled_m, 0.0);
        assert_eq!(record.max_speed_mps, 0.0);
    }

    #[test]
    fn test_kinematics_sampled_only_on_cadence_frames() {
        let mut t = tracker();
        // Enter on frame 1 (not a sampling frame): no sample yet
        t.process_frame(&frame(1, vec![det(2, bbox_inside(200.0))]));
        t.finalize();
        assert_eq!(t.violations()[0].last_distance_m, None);
    }

    #[test]
    fn test_distance_traveled_accumulates_magnitudes() {
        let mut t = tracker();
        // Heights 200 -> 176 -> 200 give distances 1.76 -> 2.0 -> 1.76
        t.process_frame(&frame(0, vec![det(4, bbox_inside(200.0))]));
        t.process_frame(&frame(5, vec![det(4, bbox_inside(176.0))]));
        t.process_frame(&frame(10, vec![det(4, bbox_inside(200.0))]));
        t.finalize();

        let record = &t.violations()[0];
        assert!((record.distance_traveled_m - 0.48).abs() < 1e-9);
        assert_eq!(record.last_distance_m, Some(1.76));
        // 0.24m over 5 frames at 30fps = 1.44 m/s peak magnitude
        assert!(record.max_speed_mps > 0.0);
    }

    #[test]
    fn test_scenario_identity_seven_full_episode() {
        // Enters at frame 100, stays through 249, exits at frame 250
        let mut t = tracker();
        for i in 100..250 {
            t.process_frame(&frame(i, vec![det(7, bbox_inside(200.0))]));
        }
        t.process_frame(&frame(250, vec![det(7, bbox_outside())]));

        assert_eq!(t.violations().len(), 1);
        let record = &t.violations()[0];
        assert_eq!(record.id, 7);
        assert_eq!(record.entry_time, ts(100));
        assert_eq!(record.exit_time.unwrap(), ts(250));
        // Constant apparent size: no net movement, speeds all zero
        assert_eq!(record.last_distance_m, Some(1.76));
        assert!(record.distance_traveled_m >= 0.0);
        assert!(record.max_speed_mps >= 0.0);
    }

    #[test]
    fn test_scenario_identity_three_closed_only_by_finalize() {
        let mut t = tracker();
        for i in 0..30 {
            t.process_frame(&frame(i, vec![det(3, bbox_inside(200.0))]));
        }
        t.finalize();

        let closed: Vec<_> = t.violations().iter().filter(|r| r.id == 3).collect();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].exit_time.unwrap(), ts(29));
    }

    #[test]
    fn test_independent_identities_in_one_frame() {
        let mut t = tracker();
        t.process_frame(&frame(
            0,
            vec![det(1, bbox_inside(200.0)), det(2, bbox_outside())],
        ));
        assert_eq!(t.in_zone_count(), 1);

        // ID 2 enters while ID 1 leaves, same frame
        let events = t.process_frame(&frame(
            1,
            vec![det(1, bbox_outside()), det(2, bbox_inside(200.0))],
        ));
        assert_eq!(events.len(), 2);
        assert_eq!(t.in_zone_count(), 1);
        assert_eq!(t.violations().len(), 1);
        assert_eq!(t.violations()[0].id, 1);
    }

    #[test]
    fn test_reset_restores_fresh_session() {
        let mut t = tracker();
        t.process_frame(&frame(0, vec![det(1, bbox_inside(200.0))]));
        t.process_frame(&frame(1, vec![det(1, bbox_outside())]));
        t.reset();

        assert_eq!(t.violations().len(), 0);
        assert_eq!(t.in_zone_count(), 0);
        assert_eq!(t.frames_processed(), 0);
    }
}
