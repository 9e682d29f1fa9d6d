//! Proximity graph between particles

use crate::engine::Particle;
use serde::Serialize;

/// Unordered pair of particle indices closer than the threshold.
/// Always stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Connection {
    pub a: usize,
    pub b: usize,
    pub distance: f32,
}

impl Connection {
    /// Rendering weight of this edge
    pub fn opacity(&self, threshold: f32, base_opacity: f32) -> f32 {
        edge_opacity(self.distance, threshold, base_opacity)
    }
}

/// Every pair of distinct particles whose Euclidean distance is strictly
/// below `threshold`. Recomputed from scratch each call, O(n^2).
pub fn build(particles: &[Particle], threshold: f32) -> Vec<Connection> {
    if !(threshold > 0.0) {
        return Vec::new();
    }
    let threshold_sq = threshold * threshold;

    let mut connections = Vec::new();
    for (a, first) in particles.iter().enumerate() {
        for (offset, second) in particles[a + 1..].iter().enumerate() {
            let distance_sq = first.distance_squared(second);
            if distance_sq < threshold_sq {
                connections.push(Connection {
                    a,
                    b: a + 1 + offset,
                    distance: distance_sq.sqrt(),
                });
            }
        }
    }
    connections
}

/// `base * (1 - distance / threshold)`, clamped to `[0, base]`
pub fn edge_opacity(distance: f32, threshold: f32, base_opacity: f32) -> f32 {
    if !(threshold > 0.0) || !distance.is_finite() {
        return 0.0;
    }
    (base_opacity * (1.0 - distance / threshold)).clamp(0.0, base_opacity.max(0.0))
}
