// src/zone.rs

use crate::geometry;
use crate::types::{BoundingBox, Point};
use anyhow::{ensure, Result};

/// The monitored quadrilateral region, fixed for the session.
///
/// Membership is decided from the bounding box's bottom-center point, which
/// approximates where the subject touches the ground. A tall box whose head
/// overlaps the zone but whose feet are outside is not a member.
#[derive(Debug, Clone)]
pub struct Zone {
    polygon: Vec<Point>,
}

impl Zone {
    pub fn new(vertices: &[[f32; 2]]) -> Result<Self> {
        ensure!(
            vertices.len() == 4,
            "zone requires exactly 4 vertices, got {}",
            vertices.len()
        );
        Ok(Self {
            polygon: vertices.iter().map(|v| Point::new(v[0], v[1])).collect(),
        })
    }

    pub fn contains_point(&self, p: Point) -> bool {
        geometry::point_in_polygon(p, &self.polygon)
    }

    /// Zone membership for a detection's bounding box
    pub fn contains_bbox(&self, bbox: &BoundingBox) -> bool {
        self.contains_point(bbox.bottom_center())
    }
}
