//! Anti-stall recovery
//!
//! Two layers keep the ball moving: soft downward nudges when it slows down,
//! and a hard reposition when it has not moved vertically for a while.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Lateral emergency nudge for a given sub-step counter
///
/// A sine of the counter, not a random draw: identical runs nudge identically.
#[inline]
pub fn lateral_nudge(phase_counter: u64) -> f32 {
    ((phase_counter as f64 * LATERAL_FORCE_FREQUENCY as f64).sin() as f32) * LATERAL_FORCE_MAGNITUDE
}

/// Total anti-stall force (physics space, y down) for the current speed
pub fn nudge_force(speed: f32, phase_counter: u64) -> Vec2 {
    let mut force = Vec2::ZERO;
    if speed < SLOW_SPEED_THRESHOLD {
        force.y += DOWNWARD_FORCE;
    }
    if speed < EMERGENCY_SPEED_THRESHOLD {
        force.y += EMERGENCY_FORCE;
        force.x += lateral_nudge(phase_counter);
    }
    force
}

/// Counts consecutive sub-steps with (almost) no vertical progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StallGuard {
    /// Ball y (pixels) at the previous observation
    last_y: f32,
    stuck_counter: u32,
}

impl StallGuard {
    pub fn new(start_y: f32) -> Self {
        Self {
            last_y: start_y,
            stuck_counter: 0,
        }
    }

    /// Feed the ball's current y (pixels). Returns true when the ball must be
    /// forcibly repositioned; the counter restarts from zero.
    pub fn observe(&mut self, y: f32) -> bool {
        let stuck = (y - self.last_y).abs() < STUCK_THRESHOLD;
        self.last_y = y;

        if !stuck {
            self.stuck_counter = 0;
            return false;
        }

        self.stuck_counter += 1;
        if self.stuck_counter > STUCK_COUNTER_LIMIT {
            self.stuck_counter = 0;
            return true;
        }
        false
    }

    pub fn stuck_counter(&self) -> u32 {
        self.stuck_counter
    }
}

/// Where a stuck ball is moved to and how fast it leaves
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recovery {
    /// Physics-space position (metres)
    pub position: Vec2,
    /// Physics-space velocity (m/s)
    pub velocity: Vec2,
}

/// Lift the ball off whatever holds it and throw it downward
pub fn recovery_for(position: Vec2) -> Recovery {
    Recovery {
        position: position - Vec2::new(0.0, STUCK_LIFT / BASE_SCALE),
        velocity: Vec2::new(0.0, STUCK_VELOCITY),
    }
}
