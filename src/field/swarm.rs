//! Flocking agents that steer the field.
//!
//! Agents follow the three classic boids rules (separation, alignment,
//! cohesion) on a toroidal canvas. Each agent carries a random behavior
//! variance that skews its rule weights, which keeps the flock from
//! collapsing into a single blob. The field at a point is the
//! distance-weighted sum of nearby agents' velocities plus a little noise.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::Rng;

use super::FieldVector;
use crate::particles::wrap_position;

/// Largest supported flock.
pub const MAX_AGENTS: usize = 200;

/// One flocking agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Agent {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Per-agent rule skew in `0.7..1.3`.
    pub variance: f32,
}

/// A flock on a toroidal canvas.
#[derive(Clone, Debug)]
pub struct Swarm {
    agents: Vec<Agent>,
    size: Vec2,
    separation_radius: f32,
    neighbor_radius: f32,
    influence_radius: f32,
    max_speed: f32,
}

impl Swarm {
    /// Scatter `count` agents (clamped to [`MAX_AGENTS`]) over the canvas.
    pub fn new<R: Rng + ?Sized>(width: u32, height: u32, count: usize, rng: &mut R) -> Self {
        let size = Vec2::new(width.max(1) as f32, height.max(1) as f32);
        let diagonal = size.length();
        let max_speed = (diagonal * 0.004).max(0.5);

        let agents = (0..count.clamp(1, MAX_AGENTS))
            .map(|_| Agent {
                position: Vec2::new(rng.gen_range(0.0..size.x), rng.gen_range(0.0..size.y)),
                velocity: Vec2::from_angle(rng.gen_range(0.0..TAU)) * max_speed * 0.5,
                variance: rng.gen_range(0.7..1.3),
            })
            .collect();

        Self {
            agents,
            size,
            separation_radius: diagonal * 0.02,
            neighbor_radius: diagonal * 0.08,
            influence_radius: diagonal * 0.12,
            max_speed,
        }
    }

    /// Current agents.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Top agent speed in pixels per frame.
    pub fn max_speed(&self) -> f32 {
        self.max_speed
    }

    /// Shortest offset from `b` to `a` on the torus.
    #[inline]
    fn wrapped_offset(&self, a: Vec2, b: Vec2) -> Vec2 {
        wrapped(a - b, self.size)
    }

    /// Advance the flock by `step` frames.
    pub fn step<R: Rng + ?Sized>(&mut self, step: f32, rng: &mut R) {
        if step <= 0.0 || !step.is_finite() {
            return;
        }
        let snapshot = self.agents.clone();
        let sep_r2 = self.separation_radius * self.separation_radius;
        let nbr_r2 = self.neighbor_radius * self.neighbor_radius;

        for (i, agent) in self.agents.iter_mut().enumerate() {
            let mut separation = Vec2::ZERO;
            let mut heading = Vec2::ZERO;
            let mut offset_sum = Vec2::ZERO;
            let mut neighbors = 0u32;

            for (j, other) in snapshot.iter().enumerate() {
                if i == j {
                    continue;
                }
                let d = wrapped(other.position - agent.position, self.size);
                let dist2 = d.length_squared();
                if dist2 < sep_r2 && dist2 > 1e-6 {
                    separation -= d / dist2;
                }
                if dist2 < nbr_r2 {
                    heading += other.velocity;
                    offset_sum += d;
                    neighbors += 1;
                }
            }

            let mut accel = separation * self.separation_radius * 1.5 * agent.variance;
            if neighbors > 0 {
                let n = neighbors as f32;
                accel += (heading / n - agent.velocity) * 0.05 * (2.0 - agent.variance);
                accel += (offset_sum / n) * 0.005 / agent.variance;
            }
            accel += Vec2::from_angle(rng.gen_range(0.0..TAU)) * self.max_speed * 0.05;

            let mut velocity = agent.velocity + accel * step;
            let speed = velocity.length();
            if speed > self.max_speed {
                velocity *= self.max_speed / speed;
            } else if speed < self.max_speed * 0.3 {
                velocity = if speed > 1e-6 {
                    velocity * (self.max_speed * 0.3 / speed)
                } else {
                    Vec2::from_angle(rng.gen_range(0.0..TAU)) * self.max_speed * 0.3
                };
            }
            agent.velocity = velocity;
            agent.position = wrap_position(agent.position + velocity * step, self.size.x, self.size.y);
        }
    }

    /// Field vector at `pos`. `noise` is a noise sample in `[-1, 1]` that
    /// adds a small wander.
    pub fn field_at(&self, pos: Vec2, noise: f32, strength: f32) -> FieldVector {
        let radius = self.influence_radius;
        let mut acc = Vec2::ZERO;
        for agent in &self.agents {
            let d = self.wrapped_offset(pos, agent.position);
            let dist = d.length();
            if dist >= radius {
                continue;
            }
            let w = 1.0 - dist / radius;
            acc += agent.velocity * w;
            if dist > super::SINGULAR_EPSILON {
                acc += d / dist * w * self.max_speed * 0.2;
            }
        }
        acc += Vec2::from_angle(noise * TAU) * self.max_speed * 0.1;

        let len = acc.length();
        if len <= 1e-6 {
            return FieldVector::ZERO;
        }
        FieldVector::from_vec(acc / len * (len / self.max_speed).min(1.0) * strength)
    }
}

#[inline]
fn wrapped(mut d: Vec2, size: Vec2) -> Vec2 {
    d.x -= (d.x / size.x).round() * size.x;
    d.y -= (d.y / size.y).round() * size.y;
    d
}
