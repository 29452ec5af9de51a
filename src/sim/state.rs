//! Board geometry and per-run simulation state
//!
//! Everything a sub-step needs to carry from one call to the next lives in
//! `SimState`, owned by the integrator and handed to each sub-step by `&mut`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::stall::StallGuard;
use crate::consts::*;

/// Board size in render units (pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Height in metres
    #[inline]
    pub fn height_m(&self) -> f32 {
        self.height / BASE_SCALE
    }

    /// Horizontal lattice spacing
    #[inline]
    pub fn column_spacing(&self) -> f32 {
        self.width / (COLS + 1) as f32
    }

    /// Vertical lattice spacing
    #[inline]
    pub fn row_spacing(&self) -> f32 {
        self.height / ROWS as f32
    }

    /// Y of the floor edge for a given ball radius
    #[inline]
    pub fn floor_y(&self, ball_radius: f32) -> f32 {
        self.height - ball_radius - FLOOR_GAP
    }

    /// Y of the line the magnet (sector) targets sit on
    #[inline]
    pub fn magnet_line(&self) -> f32 {
        self.height - MAGNET_BOTTOM_OFFSET
    }

    /// Y past which the ball counts as landed
    ///
    /// Never below the resting height of a ball on the floor, so a settled
    /// ball always lands.
    pub fn landing_line(&self, ball_radius: f32) -> f32 {
        let nominal = self.magnet_line() - LANDING_MARGIN;
        let resting = self.floor_y(ball_radius) - ball_radius - 1.0;
        nominal.min(resting)
    }

    /// Y past which the steering switches to lock-in
    pub fn lock_in_line(&self, strong_field: bool) -> f32 {
        let height = if strong_field {
            LOCK_IN_HEIGHT
        } else {
            WEAK_LOCK_IN_HEIGHT
        };
        self.magnet_line() - height
    }

    /// Where a fresh ball appears
    #[inline]
    pub fn spawn_point(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, BALL_SPAWN_Y)
    }
}

/// Point the ball is steered to (render space)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub x: f32,
    pub y: f32,
}

impl Target {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Half a column right of centre, on the magnet line
    pub fn default_for(dims: &Dimensions) -> Self {
        Self {
            x: dims.width / 2.0 + dims.column_spacing() / 2.0,
            y: dims.magnet_line(),
        }
    }

    /// Same target, new x (keeps the magnet line)
    pub fn with_x(self, x: f32) -> Self {
        Self { x, ..self }
    }

    #[inline]
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Steering zone. Only ever moves forward within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    /// Progress-scaled pull while falling through the lattice
    Fall,
    /// Full-strength pull near the bottom
    LockIn,
    /// Crossed the landing line
    Landed,
}

impl Zone {
    /// Advance to `next` if it is further along; never step back
    pub fn advance(&mut self, next: Zone) -> bool {
        if next > *self {
            *self = next;
            true
        } else {
            false
        }
    }
}

/// Mutable simulation state for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimState {
    /// Stuck detection across sub-steps
    pub stall: StallGuard,
    /// Sub-step counter driving the deterministic lateral nudge
    pub phase_counter: u64,
    pub zone: Zone,
    /// Sub-steps executed so far
    pub substeps: u64,
    /// Forced repositionings so far
    pub recoveries: u32,
    /// Sub-steps spent rolling toward the target after landing
    pub settle_substeps: u32,
    /// Landed and close enough to the target to stop integrating
    pub settled: bool,
}

impl SimState {
    pub fn new(spawn_y: f32) -> Self {
        Self {
            stall: StallGuard::new(spawn_y),
            phase_counter: 0,
            zone: Zone::Fall,
            substeps: 0,
            recoveries: 0,
            settle_substeps: 0,
            settled: false,
        }
    }

    #[inline]
    pub fn landed(&self) -> bool {
        self.zone == Zone::Landed
    }

    /// Count one settling sub-step; true once the ball may stop.
    /// `before`/`after` are the ball's x offsets from the target.
    pub fn settle(&mut self, before: f32, after: f32) -> bool {
        if !self.landed() || self.settled {
            return self.settled;
        }
        self.settle_substeps += 1;
        let crossed = before != 0.0 && before.signum() != after.signum();
        self.settled = after.abs() <= LANDING_TOLERANCE
            || crossed
            || self.settle_substeps >= SETTLE_SUBSTEP_LIMIT;
        self.settled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_lines_800x600() {
        let dims = Dimensions::new(800.0, 600.0);
        assert_eq!(dims.magnet_line(), 576.0);
        assert_eq!(dims.floor_y(16.0), 579.0);
        assert_eq!(dims.landing_line(16.0), 561.5);
        assert_eq!(dims.lock_in_line(true), 476.0);
        assert_eq!(dims.lock_in_line(false), 526.0);
        assert_eq!(dims.spawn_point(), Vec2::new(400.0, 40.0));
    }

    #[test]
    fn test_landing_line_below_resting_ball() {
        // Big ball: the nominal line would sit under a resting ball
        let dims = Dimensions::new(800.0, 600.0);
        let radius = 20.0;
        let resting_y = dims.floor_y(radius) - radius;
        assert!(dims.magnet_line() - LANDING_MARGIN > resting_y);
        assert!(dims.landing_line(radius) < resting_y);
    }

    #[test]
    fn test_default_target() {
        let dims = Dimensions::new(800.0, 600.0);
        let target = Target::default_for(&dims);
        assert_eq!(target, Target::new(440.0, 576.0));
        assert_eq!(target.with_x(100.0), Target::new(100.0, 576.0));
    }

    #[test]
    fn test_settle_waits_for_target() {
        let mut state = SimState::new(40.0);
        // Not landed yet: never settles
        assert!(!state.settle(0.0, 0.0));

        state.zone = Zone::Landed;
        assert!(!state.settle(-120.0, -80.0));
        assert!(!state.settle(-80.0, -40.0));
        assert!(state.settle(-40.0, -8.0));
        assert_eq!(state.settle_substeps, 3);
    }

    #[test]
    fn test_settle_on_pass_over_target() {
        let mut state = SimState::new(40.0);
        state.zone = Zone::Landed;
        assert!(state.settle(-14.0, 13.0));
    }

    #[test]
    fn test_settle_gives_up_after_limit() {
        let mut state = SimState::new(40.0);
        state.zone = Zone::Landed;
        for _ in 1..SETTLE_SUBSTEP_LIMIT {
            assert!(!state.settle(200.0, 200.0));
        }
        assert!(state.settle(200.0, 200.0));
    }

    #[test]
    fn test_zone_only_moves_forward() {
        let mut zone = Zone::Fall;
        assert!(zone.advance(Zone::LockIn));
        assert!(!zone.advance(Zone::Fall));
        assert_eq!(zone, Zone::LockIn);
        assert!(zone.advance(Zone::Landed));
        assert!(!zone.advance(Zone::LockIn));
        assert_eq!(zone, Zone::Landed);
    }
}
