//! Deterministic simulation module
//!
//! Everything that moves the ball lives here. This module must stay
//! deterministic:
//! - Fixed timestep only
//! - No random draws (the lateral nudge is a function of the sub-step counter)
//! - Stable iteration order (pegs by id, contacts in ordered sets)
//! - No rendering or platform dependencies

pub mod contact;
pub mod stall;
pub mod state;
pub mod steering;
pub mod tick;
pub mod world;

pub use contact::{ContactCollector, ContactTracker, PegContact};
pub use stall::{Recovery, StallGuard, nudge_force, recovery_for};
pub use state::{Dimensions, SimState, Target, Zone};
pub use steering::{Pull, fall_progress, fall_pull, lock_in_pull, pull_force, steering_force};
pub use tick::{Advance, FixedStep, Integrator, RunPhase, StopReason, sub_step};
pub use world::{BodyTag, Boundary, BoundaryKind, Collidable, Peg, World, peg_layout};
