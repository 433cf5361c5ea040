//! Gravity well attraction
//!
//! Wells pull on any body whose circle overlaps their gravity radius. The
//! pull falls off as 1/d and scales with the well's current radius.

use crate::game::body::{circles_colliding, Body, PhysicalBody};
use crate::game::state::GravityWell;
use crate::util::vec2::Vec2;

/// Velocity increment toward the well for a body at `position`
/// Returns zero when the body sits exactly on the well centre
pub fn calculate_pull(well: &GravityWell, position: Vec2, damping: f32) -> Vec2 {
    let delta = well.position() - position;
    let distance = delta.length();

    if distance == 0.0 {
        return Vec2::ZERO;
    }

    delta.normalize() * (well.radius() / distance * damping)
}

/// Nudge `body` toward `well`
pub fn apply_gravity(well: &GravityWell, body: &mut PhysicalBody, damping: f32) {
    let pull = calculate_pull(well, body.position, damping);
    body.apply_vector(pull);
}

/// Body overlaps the well's gravity radius
#[inline]
pub fn within_gravity(well: &GravityWell, body: &PhysicalBody) -> bool {
    circles_colliding(body.position, body.radius, well.position(), well.gravity_radius)
}

/// Body touches the core of a mature well
#[inline]
pub fn within_lethal(well: &GravityWell, body: &PhysicalBody) -> bool {
    well.lethal && circles_colliding(body.position, body.radius, well.position(), well.radius())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::{debris, player};

    const EPSILON: f32 = 1e-6;

    fn test_well() -> GravityWell {
        GravityWell::new(Vec2::new(0.0, 0.0), 20.0, 2000)
    }

    #[test]
    fn test_pull_points_at_well() {
        let well = test_well();
        let pull = calculate_pull(&well, Vec2::new(100.0, 0.0), player::GRAVITY_DAMPING);
        assert!(pull.x < 0.0);
        assert!(pull.y.abs() < EPSILON);
    }

    #[test]
    fn test_pull_magnitude() {
        let well = test_well();
        let pull = calculate_pull(&well, Vec2::new(0.0, 50.0), debris::GRAVITY_DAMPING);
        // 20 / 50 * 0.025
        assert!((pull.length() - 0.01).abs() < EPSILON);
    }

    #[test]
    fn test_pull_falls_off_with_distance() {
        let well = test_well();
        let near = calculate_pull(&well, Vec2::new(50.0, 0.0), 1.0).length();
        let far = calculate_pull(&well, Vec2::new(100.0, 0.0), 1.0).length();
        assert!((near / far - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_pull_zero_at_center() {
        let well = test_well();
        assert_eq!(calculate_pull(&well, Vec2::ZERO, 1.0), Vec2::ZERO);
    }

    #[test]
    fn test_apply_gravity_changes_velocity_only() {
        let well = test_well();
        let mut body = PhysicalBody::new(Vec2::new(30.0, 40.0), 10.0, 1.0, 1.0);
        apply_gravity(&well, &mut body, 0.5);
        assert_eq!(body.position, Vec2::new(30.0, 40.0));
        assert!(body.velocity.x < 0.0 && body.velocity.y < 0.0);
    }

    #[test]
    fn test_gravity_and_lethal_ranges() {
        let mut well = test_well();
        let inside_core = PhysicalBody::new(Vec2::new(25.0, 0.0), 10.0, 1.0, 1.0);
        let inside_gravity = PhysicalBody::new(Vec2::new(100.0, 0.0), 10.0, 1.0, 1.0);
        let outside = PhysicalBody::new(Vec2::new(500.0, 0.0), 10.0, 1.0, 1.0);

        assert!(within_gravity(&well, &inside_core));
        assert!(within_gravity(&well, &inside_gravity));
        assert!(!within_gravity(&well, &outside));

        // Infant wells never kill
        assert!(!within_lethal(&well, &inside_core));
        well.lethal = true;
        assert!(within_lethal(&well, &inside_core));
        assert!(!within_lethal(&well, &inside_gravity));
    }
}
