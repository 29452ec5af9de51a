//! Steering force model
//!
//! A soft "magnet" pulls the ball toward the target. The far-field pull grows
//! with fall progress so the top of the board looks random; near the bottom a
//! full strength lock-in pull is added on top of it.

use glam::Vec2;

use super::state::{Dimensions, Zone};
use crate::consts::*;
use crate::settings::PhysicsState;

/// Parameters of one pull evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pull {
    pub base_force: f32,
    /// Progress-derived scale in [0, 1]
    pub gradual: f32,
    /// Share of the pull kept on the x axis
    pub horizontal_ratio: f32,
}

impl Pull {
    #[inline]
    pub fn magnitude(&self) -> f32 {
        self.base_force * self.gradual
    }
}

/// Fraction of the board the ball has fallen through, clamped to [0, 1]
pub fn fall_progress(y: f32, dims: &Dimensions) -> f32 {
    let span = dims.height - TOP_MARGIN;
    if span <= 0.0 {
        return 1.0;
    }
    (y / span).clamp(0.0, 1.0)
}

/// Zone the ball's y belongs to, ignoring latching
pub fn zone_at(y: f32, dims: &Dimensions, strong_field: bool) -> Zone {
    if y > dims.lock_in_line(strong_field) {
        Zone::LockIn
    } else {
        Zone::Fall
    }
}

/// Progress-scaled pull, active on every sub-step
pub fn fall_pull(progress: f32, physics: &PhysicsState) -> Pull {
    if physics.use_magnetic_field {
        Pull {
            base_force: physics.field_strength * physics.magnet_force * BASE_FORCE_MULTIPLIER,
            gradual: progress.powf(physics.gradual_power),
            horizontal_ratio: physics.horizontal_ratio,
        }
    } else {
        Pull {
            base_force: physics.magnet_force * WEAK_FORCE_MULTIPLIER,
            gradual: progress.powf(GRADUAL_POWER_DEFAULT),
            horizontal_ratio: HORIZONTAL_RATIO_DEFAULT,
        }
    }
}

/// Full strength pull straight at the target, active from lock-in onward
pub fn lock_in_pull(physics: &PhysicsState) -> Pull {
    let base_force = if physics.use_magnetic_field {
        physics.field_strength * physics.magnet_force * STRONG_FORCE_MULTIPLIER
    } else {
        physics.magnet_force * WEAK_LOCK_IN_MULTIPLIER
    };
    Pull {
        base_force,
        gradual: 1.0,
        horizontal_ratio: 1.0,
    }
}

/// Pulls acting in a zone. The fall pull always applies; lock-in is added
/// once the ball has reached the lock-in zone and stays until the run ends.
pub fn pulls_for(zone: Zone, progress: f32, physics: &PhysicsState) -> (Pull, Option<Pull>) {
    let lock_in = (zone >= Zone::LockIn).then(|| lock_in_pull(physics));
    (fall_pull(progress, physics), lock_in)
}

/// Force (physics space) pulling `ball` toward `target`, both in metres
///
/// Returns `None` inside the minimum distance, where the direction is
/// meaningless and the force would blow up.
pub fn pull_force(ball: Vec2, target: Vec2, pull: &Pull) -> Option<Vec2> {
    let to_target = target - ball;
    let distance = to_target.length();
    if distance <= MIN_DISTANCE {
        return None;
    }

    let force = to_target / (distance + DISTANCE_OFFSET) * pull.magnitude();
    Some(Vec2::new(
        force.x * pull.horizontal_ratio,
        force.y * (1.0 - pull.horizontal_ratio) * VERTICAL_COMPONENT_MULTIPLIER,
    ))
}

/// Total steering force for the current zone (physics space)
///
/// `ball` and `target` are in render space.
pub fn steering_force(
    ball: Vec2,
    target: Vec2,
    zone: Zone,
    physics: &PhysicsState,
    dims: &Dimensions,
) -> Vec2 {
    let progress = fall_progress(ball.y, dims);
    let (fall, lock_in) = pulls_for(zone, progress, physics);

    let ball_m = crate::to_world(ball);
    let target_m = crate::to_world(target);
    [Some(fall), lock_in]
        .iter()
        .flatten()
        .filter_map(|pull| pull_force(ball_m, target_m, pull))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Dimensions {
        Dimensions::new(800.0, 600.0)
    }

    #[test]
    fn test_no_force_at_target() {
        let pull = Pull {
            base_force: 10.0,
            gradual: 1.0,
            horizontal_ratio: 1.0,
        };
        let p = Vec2::new(8.0, 11.52);
        assert_eq!(pull_force(p, p, &pull), None);
        assert_eq!(pull_force(p, p + Vec2::new(0.005, 0.0), &pull), None);
        assert!(pull_force(p, p + Vec2::new(0.5, 0.0), &pull).is_some());
    }

    #[test]
    fn test_horizontal_ratio_splits_components() {
        let pull = Pull {
            base_force: 10.0,
            gradual: 1.0,
            horizontal_ratio: 0.9,
        };
        let force = pull_force(Vec2::ZERO, Vec2::new(1.0, 1.0), &pull).unwrap();
        let raw = 10.0 / (2.0f32.sqrt() + DISTANCE_OFFSET);
        assert!((force.x - raw * 0.9).abs() < 1e-5);
        assert!((force.y - raw * 0.1 * VERTICAL_COMPONENT_MULTIPLIER).abs() < 1e-5);

        let full = Pull {
            horizontal_ratio: 1.0,
            ..pull
        };
        let force = pull_force(Vec2::ZERO, Vec2::new(1.0, 1.0), &full).unwrap();
        assert_eq!(force.y, 0.0);
    }

    #[test]
    fn test_force_is_bounded_near_target() {
        let pull = Pull {
            base_force: 39.0,
            gradual: 1.0,
            horizontal_ratio: 1.0,
        };
        let force = pull_force(Vec2::ZERO, Vec2::new(0.02, 0.0), &pull).unwrap();
        assert!(force.length() < pull.base_force);
    }

    #[test]
    fn test_fall_progress_clamped() {
        let dims = dims();
        assert_eq!(fall_progress(-50.0, &dims), 0.0);
        assert_eq!(fall_progress(280.0, &dims), 0.5);
        assert_eq!(fall_progress(1000.0, &dims), 1.0);
    }

    #[test]
    fn test_zone_lines() {
        let dims = dims();
        assert_eq!(zone_at(470.0, &dims, true), Zone::Fall);
        assert_eq!(zone_at(480.0, &dims, true), Zone::LockIn);
        assert_eq!(zone_at(500.0, &dims, false), Zone::Fall);
        assert_eq!(zone_at(530.0, &dims, false), Zone::LockIn);
    }

    #[test]
    fn test_pull_parameters_per_zone() {
        let physics = PhysicsState::default();
        let (fall, lock) = pulls_for(Zone::LockIn, 0.5, &physics);
        let lock = lock.unwrap();
        assert!((lock.base_force - 0.8 * 13.0 * 3.0).abs() < 1e-5);
        assert_eq!(lock.gradual, 1.0);
        assert_eq!(lock.horizontal_ratio, 1.0);
        assert!((fall.base_force - 0.8 * 13.0 * 0.8).abs() < 1e-5);
        assert!((fall.gradual - 0.5).abs() < 1e-6);

        // Falling: no lock-in yet
        let (_, lock) = pulls_for(Zone::Fall, 0.5, &physics);
        assert_eq!(lock, None);
        // Landed keeps both pulls for settling
        let (_, lock) = pulls_for(Zone::Landed, 1.0, &physics);
        assert!(lock.is_some());

        let weak = PhysicsState {
            use_magnetic_field: false,
            ..physics
        };
        let (fall, lock) = pulls_for(Zone::LockIn, 0.5, &weak);
        assert!((fall.base_force - 13.0 * 0.3).abs() < 1e-5);
        assert!((fall.gradual - 0.5f32.powf(1.2)).abs() < 1e-6);
        assert_eq!(fall.horizontal_ratio, HORIZONTAL_RATIO_DEFAULT);
        assert_eq!(lock.unwrap().base_force, 13.0);
    }

    #[test]
    fn test_lock_in_has_no_velocity_term() {
        // Straight above the target: the pull has nothing to do on x
        let dims = dims();
        let physics = PhysicsState::default();
        let force = steering_force(
            Vec2::new(400.0, 500.0),
            Vec2::new(400.0, 576.0),
            Zone::LockIn,
            &physics,
            &dims,
        );
        assert_eq!(force.x, 0.0);
    }

    #[test]
    fn test_fall_pull_adds_to_lock_in() {
        let dims = dims();
        let physics = PhysicsState {
            horizontal_ratio: 0.9,
            ..PhysicsState::default()
        };
        let ball = Vec2::new(400.0, 500.0);
        let target = Vec2::new(400.0, 576.0);
        let force = steering_force(ball, target, Zone::LockIn, &physics, &dims);
        // Lock-in is purely horizontal; the downward part comes from the fall pull
        assert!(force.y > 0.0);
        let fall_only = steering_force(ball, target, Zone::Fall, &physics, &dims);
        assert!((force.y - fall_only.y).abs() < 1e-6);
    }

    #[test]
    fn test_steering_points_at_target() {
        let dims = dims();
        let physics = PhysicsState::default();
        let ball = Vec2::new(300.0, 500.0);
        let target = Vec2::new(400.0, 576.0);

        let fall = steering_force(ball, target, Zone::Fall, &physics, &dims);
        let lock = steering_force(ball, target, Zone::LockIn, &physics, &dims);
        assert!(fall.x > 0.0);
        assert!(lock.x > fall.x);

        let left = steering_force(ball, Vec2::new(100.0, 576.0), Zone::Fall, &physics, &dims);
        assert!(left.x < 0.0);

        let landed = steering_force(ball, target, Zone::Landed, &physics, &dims);
        assert_eq!(landed, lock);
    }
}
