//! Particle data

use super::config::Rgb;
use serde::Serialize;

/// Remaining life of a transient particle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Lifetime {
    /// Fraction of life left, starts at 1.0
    pub life: f32,
    /// Seconds the particle lives in total
    pub max_life: f32,
}

/// One simulated particle. 2D particles keep `position[2]` and
/// `velocity[2]` at zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Particle {
    pub position: [f32; 3],
    pub velocity: [f32; 3],
    pub radius: f32,
    pub color: Rgb,
    /// Decorrelates the audio forcing between particles
    pub phase_offset: f32,
    /// `None` for steady-state particles, which never expire
    pub life: Option<Lifetime>,
}

impl Particle {
    pub fn distance(&self, other: &Particle) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(&self, other: &Particle) -> f32 {
        self.position
            .iter()
            .zip(other.position.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    pub fn is_alive(&self) -> bool {
        self.life.map_or(true, |l| l.life > 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.velocity.iter().all(|v| v.is_finite())
            && self.radius.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32) -> Particle {
        Particle {
            position: [x, y, 0.0],
            velocity: [0.0; 3],
            radius: 1.0,
            color: Rgb::QUANTUM_BLUE,
            phase_offset: 0.0,
            life: None,
        }
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(at(0.0, 0.0).distance(&at(3.0, 4.0)), 5.0);
    }

    #[test]
    fn steady_particles_are_always_alive() {
        assert!(at(0.0, 0.0).is_alive());

        let mut expired = at(0.0, 0.0);
        expired.life = Some(Lifetime {
            life: 0.0,
            max_life: 2.0,
        });
        assert!(!expired.is_alive());
    }
}
