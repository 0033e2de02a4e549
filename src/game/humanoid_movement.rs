use nalgebra::Vector3;

use super::climbing::MovementIntent;
use super::constants::physics as consts;

/// Per-tick movement plan for a humanoid outside the climb.
#[derive(Debug, Clone, Copy)]
pub struct MotionPlan {
    pub desired: [f32; 3],
    pub new_vertical_velocity: f32,
    pub new_carried_velocity: Vector3<f32>,
    pub jumped: bool,
}

/// Horizontal unit vector of `v`, or zero when `v` is (nearly) vertical.
pub fn flatten(v: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(v.x, 0.0, v.z)
        .try_normalize(consts::EPSILON)
        .unwrap_or_else(Vector3::zeros)
}

/// Launch speed that reaches `JUMP_HEIGHT` under `gravity` (negative down).
pub fn jump_launch_speed(gravity: f32) -> f32 {
    (2.0 * gravity.abs() * consts::JUMP_HEIGHT).sqrt()
}

/// Build desired translation and updated velocities for a character this tick.
///
/// `vertical` intent walks along the facing direction and `lateral` strafes.
/// Velocity carried over from a climb exit keeps pushing while airborne and
/// is dropped on landing.
#[allow(clippy::too_many_arguments)]
pub fn build_motion_plan(
    forward: Vector3<f32>,
    right: Vector3<f32>,
    intent: MovementIntent,
    walk_speed: f32,
    vertical_velocity: f32,
    carried_velocity: Vector3<f32>,
    gravity: f32,
    dt: f32,
    grounded: bool,
) -> MotionPlan {
    let mut new_vertical_velocity = vertical_velocity + gravity * dt;
    let mut jumped = false;
    if grounded && intent.jump && vertical_velocity <= 0.0 {
        new_vertical_velocity = jump_launch_speed(gravity);
        jumped = true;
    }

    let walk = flatten(forward) * intent.vertical + flatten(right) * intent.lateral;
    let walk = if walk.norm() > 1.0 { walk.normalize() } else { walk };
    let mut horizontal = walk * walk_speed * dt;

    let new_carried_velocity = if grounded && !jumped && new_vertical_velocity <= 0.0 {
        Vector3::zeros()
    } else {
        Vector3::new(carried_velocity.x, 0.0, carried_velocity.z)
    };
    horizontal += new_carried_velocity * dt;

    let desired_y = if grounded && new_vertical_velocity <= 0.0 {
        0.0
    } else {
        new_vertical_velocity * dt
    };

    MotionPlan {
        desired: [horizontal.x, desired_y, horizontal.z],
        new_vertical_velocity,
        new_carried_velocity,
        jumped,
    }
}

/// Resolve vertical velocity after the character controller applies movement constraints.
pub fn resolve_vertical_velocity_after_move(
    new_vertical_velocity: f32,
    desired_y: f32,
    applied_y: f32,
    grounded: bool,
) -> f32 {
    let mut v = new_vertical_velocity;
    if grounded && v < 0.0 {
        v = 0.0;
    }
    // Bumped a ceiling
    if desired_y > 0.0 && applied_y + 1.0e-4 < desired_y {
        v = 0.0;
    }
    v
}

/// Converts world-space horizontal velocity to character yaw so local forward (-Z)
/// aligns with the movement direction.
pub fn yaw_from_horizontal_velocity(vel: Vector3<f32>) -> f32 {
    (-vel.x).atan2(-vel.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;
    const G: f32 = -30.0;

    fn plan(intent: MovementIntent, vy: f32, carried: Vector3<f32>, grounded: bool) -> MotionPlan {
        build_motion_plan(
            -Vector3::z(),
            Vector3::x(),
            intent,
            16.0,
            vy,
            carried,
            G,
            DT,
            grounded,
        )
    }

    #[test]
    fn test_walk_forward_on_ground() {
        let p = plan(MovementIntent::new(0.0, 1.0, false), 0.0, Vector3::zeros(), true);
        assert!((p.desired[2] + 16.0 * DT).abs() < 1e-6);
        assert_eq!(p.desired[1], 0.0);
    }

    #[test]
    fn test_diagonal_input_is_not_faster() {
        let p = plan(MovementIntent::new(1.0, 1.0, false), 0.0, Vector3::zeros(), true);
        let h = (p.desired[0] * p.desired[0] + p.desired[2] * p.desired[2]).sqrt();
        assert!((h - 16.0 * DT).abs() < 1e-5);
    }

    #[test]
    fn test_jump_only_from_ground() {
        let jump = MovementIntent::new(0.0, 0.0, true);
        let grounded = plan(jump, 0.0, Vector3::zeros(), true);
        assert!(grounded.jumped);
        assert!((grounded.new_vertical_velocity - jump_launch_speed(G)).abs() < 1e-5);

        let airborne = plan(jump, -1.0, Vector3::zeros(), false);
        assert!(!airborne.jumped);
        assert!(airborne.new_vertical_velocity < -1.0);
    }

    #[test]
    fn test_carried_velocity_kept_in_air_dropped_on_landing() {
        let carried = Vector3::new(0.0, 0.0, -6.0);
        let air = plan(MovementIntent::default(), 0.0, carried, false);
        assert!((air.desired[2] + 6.0 * DT).abs() < 1e-6);
        assert_eq!(air.new_carried_velocity, carried);

        let landed = plan(MovementIntent::default(), -2.0, carried, true);
        assert_eq!(landed.new_carried_velocity, Vector3::zeros());
        assert_eq!(landed.desired, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_resolve_vertical_velocity_after_move() {
        assert_eq!(resolve_vertical_velocity_after_move(-3.0, -0.05, 0.0, true), 0.0);
        assert_eq!(resolve_vertical_velocity_after_move(5.0, 0.1, 0.0, false), 0.0);
        assert_eq!(resolve_vertical_velocity_after_move(5.0, 0.1, 0.1, false), 5.0);
    }

    #[test]
    fn test_yaw_faces_movement() {
        assert!(yaw_from_horizontal_velocity(-Vector3::z()).abs() < 1e-6);
        let yaw = yaw_from_horizontal_velocity(Vector3::new(-1.0, 0.0, 0.0));
        assert!((yaw - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }
}
