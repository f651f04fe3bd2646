// src/kinematics.rs
//
// Per-identity speed smoothing over a bounded window of distance samples.
// Zone-agnostic: the lifecycle tracker decides when sampling happens.

use crate::types::TrackId;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone, Copy)]
struct DistanceSample {
    frame_index: u64,
    distance_m: f64,
}

pub struct KinematicsSmoother {
    histories: HashMap<TrackId, VecDeque<DistanceSample>>,
    window: usize,
    fps: f64,
}

impl KinematicsSmoother {
    pub fn new(window: usize, fps: f64) -> Self {
        Self {
            histories: HashMap::new(),
            window,
            fps,
        }
    }

    /// Append a distance observation for `id`, evicting the oldest sample
    /// once the window is full. Samples are expected in frame order.
    pub fn record_sample(&mut self, id: TrackId, frame_index: u64, distance_m: f64) {
        let history = self
            .histories
            .entry(id)
            .or_insert_with(|| VecDeque::with_capacity(self.window));
        history.push_back(DistanceSample {
            frame_index,
            distance_m,
        });
        if history.len() > self.window {
            history.pop_front();
        }
    }

    /// Smoothed speed in m/s: the mean of instantaneous speeds across every
    /// adjacent sample pair in the window. Negative means approaching the
    /// camera. `None` until at least two samples exist.
    ///
    /// Averaging over the whole window damps the jitter a single noisy
    /// bounding box injects into the raw distance estimates.
    pub fn estimate_speed(&self, id: TrackId) -> Option<f64> {
        let history = self.histories.get(&id)?;
        if history.len() < 2 {
            return None;
        }

        let mut sum = 0.0;
        let mut pairs = 0u32;
        let samples = history.iter();
        for (prev, next) in samples.clone().zip(samples.skip(1)) {
            let df = next.frame_index.saturating_sub(prev.frame_index);
            if df == 0 {
                // Duplicate frame index, no time elapsed to divide by
                continue;
            }
            let dt = df as f64 / self.fps;
            sum += (next.distance_m - prev.distance_m) / dt;
            pairs += 1;
        }

        if pairs == 0 {
            return None;
        }
        Some(sum / pairs as f64)
    }

    /// Drop one identity's history (called when its episode closes)
    pub fn clear(&mut self, id: TrackId) {
        self.histories.remove(&id);
    }

    pub fn reset(&mut self) {
        self.histories.clear();
    }

    #[cfg(test)]
    fn history_len(&self, id: TrackId) -> usize {
        self.histories.get(&id).map_or(0, VecDeque::len)
    }
}
