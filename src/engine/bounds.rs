//! Simulation domain and boundary policies

use super::config::BoundaryBehavior;
use super::particle::Particle;
use serde::Serialize;

/// Axis-aligned region particles live in. Only the first `dims` axes are
/// bounded; in 2D the z axis stays at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Domain {
    pub min: [f32; 3],
    pub max: [f32; 3],
    pub dims: usize,
}

impl Domain {
    /// Surface rectangle `[0, width] x [0, height]`
    pub fn rect(width: f32, height: f32) -> Self {
        Self {
            min: [0.0; 3],
            max: [width.max(0.0), height.max(0.0), 0.0],
            dims: 2,
        }
    }

    /// Cube `[-half, half]` on every axis
    pub fn cube(half_extent: f32) -> Self {
        let h = half_extent.abs();
        Self {
            min: [-h; 3],
            max: [h; 3],
            dims: 3,
        }
    }

    pub fn center(&self) -> [f32; 3] {
        let mut c = [0.0; 3];
        for axis in 0..3 {
            c[axis] = (self.min[axis] + self.max[axis]) / 2.0;
        }
        c
    }

    pub fn contains(&self, position: &[f32; 3]) -> bool {
        (0..self.dims).all(|axis| {
            position[axis] >= self.min[axis] && position[axis] <= self.max[axis]
        })
    }

    /// Bring a particle back inside after it moved
    pub fn apply(&self, behavior: BoundaryBehavior, particle: &mut Particle) {
        for axis in 0..self.dims {
            let (min, max) = (self.min[axis], self.max[axis]);
            let p = &mut particle.position[axis];
            let v = &mut particle.velocity[axis];

            match behavior {
                BoundaryBehavior::Wrap => {
                    if *p > max {
                        *p = min;
                    } else if *p < min {
                        *p = max;
                    }
                }
                BoundaryBehavior::Bounce => {
                    // Only reverse when heading outward so a clamped particle
                    // does not flip back and forth on the wall
                    if *p <= min {
                        *p = min;
                        if *v < 0.0 {
                            *v = -*v;
                        }
                    } else if *p >= max {
                        *p = max;
                        if *v > 0.0 {
                            *v = -*v;
                        }
                    }
                }
            }
        }
    }
}
