// src/report.rs
//
// Read-only aggregation of the closed violation log into per-episode
// summaries and session statistics. Rendering and serialization live here;
// nothing in this module mutates tracker state.

use crate::zone_tracker::OccupancyRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write as _;

const MPS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone, Serialize)]
pub struct EpisodeSummary {
    pub id: i64,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub duration_secs: f64,
    pub distance_traveled_m: f64,
    pub max_speed_mps: f64,
    pub max_speed_kmh: f64,
    pub last_distance_m: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportStats {
    pub total_episodes: usize,
    pub distinct_identities: usize,
    pub average_duration_secs: f64,
    pub max_duration_secs: f64,
    pub min_duration_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViolationReport {
    pub episodes: Vec<EpisodeSummary>,
    pub stats: ReportStats,
}

impl ViolationReport {
    pub fn from_records(records: &[OccupancyRecord]) -> Self {
        let episodes: Vec<EpisodeSummary> = records
            .iter()
            .map(|r| EpisodeSummary {
                id: r.id,
                entry_time: r.entry_time,
                exit_time: r.exit_time.unwrap_or(r.entry_time),
                duration_secs: r.duration_secs(),
                distance_traveled_m: r.distance_traveled_m,
                max_speed_mps: r.max_speed_mps,
                max_speed_kmh: r.max_speed_mps * MPS_TO_KMH,
                last_distance_m: r.last_distance_m,
            })
            .collect();

        let identities: HashSet<i64> = episodes.iter().map(|e| e.id).collect();
        let durations: Vec<f64> = episodes.iter().map(|e| e.duration_secs).collect();
        let stats = ReportStats {
            total_episodes: episodes.len(),
            distinct_identities: identities.len(),
            average_duration_secs: if durations.is_empty() {
                0.0
            } else {
                durations.iter().sum::<f64>() / durations.len() as f64
            },
            max_duration_secs: durations.iter().copied().fold(0.0, f64::max),
            min_duration_secs: if durations.is_empty() {
                0.0
            } else {
                durations.iter().copied().fold(f64::INFINITY, f64::min)
            },
        };

        Self { episodes, stats }
    }

    /// Console rendering in the shape operators are used to reading
    pub fn render(&self) -> String {
        let bar = "=".repeat(80);
        let mut out = String::new();

        if self.episodes.is_empty() {
            let _ = writeln!(out, "\n{bar}\nNO DANGER ZONE VIOLATIONS DETECTED\n{bar}");
            return out;
        }

        let _ = writeln!(out, "\n{bar}\nDANGER ZONE VIOLATION DETAILS\n{bar}");
        for (i, episode) in self.episodes.iter().enumerate() {
            let _ = writeln!(out, "\nViolation #{}", i + 1);
            let _ = writeln!(out, "{}", "-".repeat(80));
            let _ = writeln!(out, "Person ID:        {}", episode.id);
            let _ = writeln!(
                out,
                "Entry Time:       {}",
                episode.entry_time.format("%Y-%m-%d %H:%M:%S%.3f")
            );
            let _ = writeln!(
                out,
                "Exit Time:        {}",
                episode.exit_time.format("%Y-%m-%d %H:%M:%S%.3f")
            );
            let _ = writeln!(out, "Duration:         {:.2} seconds", episode.duration_secs);
            let _ = writeln!(
                out,
                "Distance Moved:   {:.2} m",
                episode.distance_traveled_m
            );
            let _ = writeln!(
                out,
                "Peak Speed:       {:.2} m/s ({:.2} km/h)",
                episode.max_speed_mps, episode.max_speed_kmh
            );
            match episode.last_distance_m {
                Some(d) => {
                    let _ = writeln!(out, "Last Distance:    {d:.2} m from camera");
                }
                None => {
                    let _ = writeln!(out, "Last Distance:    n/a");
                }
            }
        }

        let _ = writeln!(out, "\n{bar}");
        let _ = writeln!(out, "Total Violations: {}", self.stats.total_episodes);
        let _ = writeln!(out, "Persons Involved: {}", self.stats.distinct_identities);
        let _ = writeln!(
            out,
            "Duration avg/min/max: {:.2}s / {:.2}s / {:.2}s",
            self.stats.average_duration_secs,
            self.stats.min_duration_secs,
            self.stats.max_duration_secs
        );
        let _ = writeln!(out, "{bar}");
        out
    }
}
