//! Plinko Drop - a steered plinko ball drop
//!
//! Core modules:
//! - `sim`: Deterministic simulation (world building, steering, anti-stall, fixed-step tick)
//! - `board`: Run lifecycle, published ball view, one-shot completion
//! - `settings`: Physics parameters and board configuration
//! - `wasm`: Browser bindings (wasm32 only)

pub mod board;
pub mod settings;
pub mod sim;
#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use board::{BallView, Board, BoardEvent, Frame};
pub use settings::{BoardMode, BoardSettings, PhysicsOverrides, PhysicsState};

use glam::Vec2;
use rapier2d::prelude::{Real, Vector, vector};

/// Engine configuration constants
pub mod consts {
    /// Render pixels per physics metre
    pub const BASE_SCALE: f32 = 50.0;

    /// Fixed physics sub-step (180 Hz)
    pub const PHYSICS_DT: f64 = 1.0 / 180.0;
    /// Nominal render frame fed to the integrator on every tick
    pub const FRAME_DT: f64 = 1.0 / 60.0;
    /// Global time scale applied on top of the animation speed
    pub const TIME_SCALE: f64 = 1.0;

    /// Peg lattice
    pub const ROWS: u32 = 11;
    pub const COLS: u32 = 9;
    /// Rows with fewer pegs than this are left empty
    pub const MIN_PEGS_PER_ROW: u32 = 3;
    /// Y of lattice row 0 (pixels, above the visible board)
    pub const PEG_ROW_ORIGIN: f32 = -70.0;

    /// Ball defaults
    pub const BALL_RADIUS: f32 = 16.0;
    pub const BALL_DENSITY: f32 = 1.0;
    /// Spawn height from the top edge (pixels)
    pub const BALL_SPAWN_Y: f32 = 40.0;
    /// Linear damping of the ball
    pub const SMOOTHNESS: f32 = 0.15;

    /// Peg defaults
    pub const PEG_RADIUS: f32 = 3.0;
    pub const PEG_FRICTION: f32 = 0.01;

    /// Floor sits this far (plus one ball radius) above the bottom edge
    pub const FLOOR_GAP: f32 = 5.0;
    pub const WALL_RESTITUTION: f32 = 0.2;

    /// Distance of the sector/magnet line from the bottom edge (pixels)
    pub const MAGNET_BOTTOM_OFFSET: f32 = 24.0;
    /// Landing line sits this far above the magnet line (pixels)
    pub const LANDING_MARGIN: f32 = 14.5;
    /// Once landed the ball keeps rolling under the pull until it is this
    /// close to the target x (pixels) or passes over it
    pub const LANDING_TOLERANCE: f32 = 10.0;
    /// Sub-steps of settling after which a landed ball stops regardless (10 s)
    pub const SETTLE_SUBSTEP_LIMIT: u32 = 1800;
    /// Lock-in zone height above the magnet line (strong / weak field)
    pub const LOCK_IN_HEIGHT: f32 = 100.0;
    pub const WEAK_LOCK_IN_HEIGHT: f32 = 50.0;
    /// Fall progress is measured over `height - TOP_MARGIN`
    pub const TOP_MARGIN: f32 = 40.0;

    /// Steering force model
    pub const MIN_DISTANCE: f32 = 0.01;
    pub const DISTANCE_OFFSET: f32 = 0.1;
    pub const BASE_FORCE_MULTIPLIER: f32 = 0.8;
    pub const STRONG_FORCE_MULTIPLIER: f32 = 3.0;
    pub const WEAK_FORCE_MULTIPLIER: f32 = 0.3;
    pub const WEAK_LOCK_IN_MULTIPLIER: f32 = 1.0;
    pub const VERTICAL_COMPONENT_MULTIPLIER: f32 = 0.1;
    pub const HORIZONTAL_RATIO_DEFAULT: f32 = 0.9;
    pub const GRADUAL_POWER_DEFAULT: f32 = 1.2;

    /// Anti-stall
    pub const STUCK_THRESHOLD: f32 = 1.0;
    pub const STUCK_COUNTER_LIMIT: u32 = 30;
    /// Upward lift applied by a stall recovery (pixels)
    ///
    /// Lifting away from the resting surface needs more than the 1 px stuck
    /// threshold, otherwise the next sub-step could count as stuck again.
    /// A half-pixel push into the surface is undone by the solver.
    pub const STUCK_LIFT: f32 = 3.0;
    /// Downward speed assigned by a stall recovery (m/s)
    pub const STUCK_VELOCITY: f32 = 2.0;
    pub const SLOW_SPEED_THRESHOLD: f32 = 2.0;
    pub const EMERGENCY_SPEED_THRESHOLD: f32 = 0.1;
    pub const DOWNWARD_FORCE: f32 = 10.0;
    pub const EMERGENCY_FORCE: f32 = 20.0;
    pub const LATERAL_FORCE_MAGNITUDE: f32 = 1.0;
    pub const LATERAL_FORCE_FREQUENCY: f32 = 0.1;

    /// Opacity fade distances (metres above the bottom edge)
    pub const IDLE_FADE_DISTANCE: f32 = 2.5;
    pub const MULTI_FADE_DISTANCE: f32 = 1.0;
}

/// Convert a render-space point (pixels) to physics space (metres)
#[inline]
pub fn to_world(p: Vec2) -> Vec2 {
    p / consts::BASE_SCALE
}

/// Convert a physics-space point (metres) to render space (pixels)
#[inline]
pub fn to_render(p: Vec2) -> Vec2 {
    p * consts::BASE_SCALE
}

/// glam -> rapier vector
#[inline]
pub fn to_na(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

/// rapier -> glam vector
#[inline]
pub fn from_na(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}
