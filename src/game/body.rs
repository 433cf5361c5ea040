//! Physical body shared by every entity in the arena
//!
//! Players, debris and gravity wells each own a [`PhysicalBody`] and expose it
//! through the [`Body`] trait so systems can treat them uniformly.

use serde::{Deserialize, Serialize};

use crate::util::vec2::Vec2;

/// Position, velocity and the material properties used by collision response
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalBody {
    pub position: Vec2,
    pub velocity: Vec2,
    pub radius: f32,
    pub mass: f32,
    /// Fraction of velocity kept through a collision
    pub restitution: f32,
}

impl PhysicalBody {
    pub fn new(position: Vec2, radius: f32, mass: f32, restitution: f32) -> Self {
        debug_assert!(radius > 0.0, "body radius must be positive");
        Self {
            position,
            velocity: Vec2::ZERO,
            radius,
            mass,
            restitution,
        }
    }

    /// Scale velocity (friction)
    #[inline]
    pub fn apply_factor(&mut self, factor: f32) {
        self.velocity *= factor;
    }

    /// Add an increment to velocity (gravity nudge, thrust, impulse)
    #[inline]
    pub fn apply_vector(&mut self, delta: Vec2) {
        self.velocity += delta;
    }

    /// Integrate velocity into position for one tick
    #[inline]
    pub fn apply_velocity(&mut self) {
        self.position += self.velocity;
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.radius.is_finite()
    }

    /// Exact circle overlap test against another body
    #[inline]
    pub fn overlaps(&self, other: &PhysicalBody) -> bool {
        circles_colliding(self.position, self.radius, other.position, other.radius)
    }
}

/// Shared capability of everything that owns a [`PhysicalBody`]
pub trait Body {
    fn body(&self) -> &PhysicalBody;
    fn body_mut(&mut self) -> &mut PhysicalBody;

    fn position(&self) -> Vec2 {
        self.body().position
    }

    fn set_position(&mut self, position: Vec2) {
        self.body_mut().position = position;
    }

    fn velocity(&self) -> Vec2 {
        self.body().velocity
    }

    fn set_velocity(&mut self, velocity: Vec2) {
        self.body_mut().velocity = velocity;
    }

    fn radius(&self) -> f32 {
        self.body().radius
    }

    fn apply_factor(&mut self, factor: f32) {
        self.body_mut().apply_factor(factor);
    }

    fn apply_vector(&mut self, delta: Vec2) {
        self.body_mut().apply_vector(delta);
    }

    fn apply_velocity(&mut self) {
        self.body_mut().apply_velocity();
    }
}

/// `(ax-bx)^2 + (ay-by)^2 <= (ra+rb)^2`, with no tolerance
#[inline]
pub fn circles_colliding(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let reach = ra + rb;
    a.distance_sq_to(b) <= reach * reach
}

/// Resolve a collision between two bodies by projecting their relative
/// velocity onto the line of centres.
///
/// ```text
/// n   = x1 - x2
/// v1' = v1*e1 - (2*m2/(m1+m2)) * dot(v1-v2,  n)/|n|^2 *  n
/// v2' = v2*e2 - (2*m1/(m1+m2)) * dot(v2-v1, -n)/|n|^2 * -n
/// ```
///
/// Both results are computed from the pre-collision velocities. Returns
/// `false` without touching either body when the centres coincide or the
/// combined mass is zero.
pub fn resolve_collision(a: &mut PhysicalBody, b: &mut PhysicalBody) -> bool {
    let n = a.position - b.position;
    let n_len_sq = n.length_sq();
    let total_mass = a.mass + b.mass;

    if n_len_sq == 0.0 || total_mass == 0.0 {
        return false;
    }

    let v1 = a.velocity;
    let v2 = b.velocity;

    let a_share = 2.0 * b.mass / total_mass * (v1 - v2).dot(n) / n_len_sq;
    let b_share = 2.0 * a.mass / total_mass * (v2 - v1).dot(-n) / n_len_sq;

    a.velocity = v1 * a.restitution - n * a_share;
    b.velocity = v2 * b.restitution - (-n) * b_share;

    true
}
