//! Fixed timestep integration
//!
//! Render frames hand over elapsed time; the integrator turns it into a whole
//! number of physics sub-steps and runs the anti-stall, steering and landing
//! logic around each one.

use glam::Vec2;

use super::contact::PegContact;
use super::stall::{nudge_force, recovery_for};
use super::state::{Dimensions, SimState, Target, Zone};
use super::steering::{steering_force, zone_at};
use super::world::World;
use crate::consts::*;
use crate::settings::PhysicsState;

/// Accumulator turning variable frame time into fixed sub-steps
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStep {
    dt: f64,
    accumulator: f64,
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(PHYSICS_DT)
    }
}

impl FixedStep {
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            accumulator: 0.0,
        }
    }

    /// Add elapsed time (seconds)
    pub fn push(&mut self, elapsed: f64) {
        if elapsed > 0.0 {
            self.accumulator += elapsed;
        }
    }

    /// Consume one sub-step if enough time has accumulated
    pub fn take(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }

    /// Time carried over to the next frame
    pub fn remainder(&self) -> f64 {
        self.accumulator
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn clear(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Why a run stopped integrating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Ball crossed the landing line and rolled onto the target
    Landed,
    /// Live radii no longer match the world
    Rebuild,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Landed => "landed",
            StopReason::Rebuild => "rebuild",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Inactive,
    Active,
    Stopping(StopReason),
}

/// Run one physics sub-step
///
/// Order: clear forces, anti-stall nudge, stuck recovery, zone update,
/// steering, physics step, landing and settling check.
pub fn sub_step(
    world: &mut World,
    state: &mut SimState,
    physics: &PhysicsState,
    target: Vec2,
) -> Vec<PegContact> {
    let dims = world.dimensions();
    world.reset_forces();

    let velocity = world.ball_velocity();
    let mut force = nudge_force(velocity.length(), state.phase_counter);
    state.phase_counter += 1;

    let y = world.ball_position().y;
    if state.stall.observe(y) {
        let recovery = recovery_for(world.ball_position_m());
        world.relocate(recovery.position, recovery.velocity);
        state.recoveries += 1;
        log::debug!(
            "Stall recovery #{} at y={:.1} after {} sub-steps",
            state.recoveries,
            y,
            state.substeps
        );
    }

    let ball = world.ball_position();
    if zone_at(ball.y, &dims, physics.use_magnetic_field) == Zone::LockIn {
        state.zone.advance(Zone::LockIn);
    }
    force += steering_force(ball, target, state.zone, physics, &dims);
    world.apply_force(force);

    let contacts = world.step();
    state.substeps += 1;

    let after = world.ball_position();
    if after.y >= dims.landing_line(world.ball_radius()) && state.zone.advance(Zone::Landed) {
        log::debug!(
            "Crossed landing line at x={:.1} ({:+.1} from target)",
            after.x,
            after.x - target.x
        );
    }
    let was_settled = state.settled;
    if state.settle(ball.x - target.x, after.x - target.x) && !was_settled {
        log::debug!(
            "Settled at x={:.1} after {} sub-steps on the floor",
            after.x,
            state.settle_substeps
        );
    }
    contacts
}

/// The per-run pieces that only exist while integrating
struct Run {
    world: World,
    state: SimState,
    target: Target,
}

/// What one `advance` call did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Advance {
    pub substeps: u32,
    pub contacts: Vec<PegContact>,
    /// Set on the call that moved the run into `Stopping`
    pub stopped: Option<StopReason>,
}

/// Drives one run's world in fixed sub-steps
#[derive(Default)]
pub struct Integrator {
    phase: RunPhase,
    clock: FixedStep,
    run: Option<Run>,
}

impl Integrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh world and begin integrating toward `target`
    pub fn start(&mut self, dims: Dimensions, physics: &PhysicsState, target: Target) {
        let world = World::build(dims, physics);
        let state = SimState::new(world.ball_position().y);
        self.run = Some(Run {
            world,
            state,
            target,
        });
        self.clock.clear();
        self.phase = RunPhase::Active;
    }

    /// Feed one frame's worth of time (seconds)
    pub fn advance(&mut self, frame_dt: f64, physics: &PhysicsState) -> Advance {
        let mut report = Advance::default();
        if self.phase != RunPhase::Active {
            return report;
        }
        let Some(run) = self.run.as_mut() else {
            return report;
        };

        self.clock.push(frame_dt);
        while self.clock.take() {
            if run.world.needs_rebuild(physics) {
                report.stopped = Some(StopReason::Rebuild);
                break;
            }

            let contacts = sub_step(&mut run.world, &mut run.state, physics, run.target.as_vec2());
            report.contacts.extend(contacts);
            report.substeps += 1;

            if run.state.settled {
                report.stopped = Some(StopReason::Landed);
                break;
            }
        }

        if let Some(reason) = report.stopped {
            self.clock.clear();
            self.phase = RunPhase::Stopping(reason);
        }
        report
    }

    /// Drop the world and go idle
    pub fn stop(&mut self) {
        self.run = None;
        self.clock.clear();
        self.phase = RunPhase::Inactive;
    }

    /// Push hot-swappable parameters into the live world
    pub fn apply_live(&mut self, physics: &PhysicsState) {
        if let Some(run) = self.run.as_mut() {
            run.world.apply_live(physics);
        }
    }

    pub fn set_gravity_scale(&mut self, scale: f32, physics: &PhysicsState) {
        if let Some(run) = self.run.as_mut() {
            run.world.set_gravity_scale(scale, physics);
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == RunPhase::Active
    }

    pub fn has_world(&self) -> bool {
        self.run.is_some()
    }

    /// Ball centre (pixels) while a world exists
    pub fn ball_position(&self) -> Option<Vec2> {
        self.run.as_ref().map(|r| r.world.ball_position())
    }

    pub fn sim_state(&self) -> Option<&SimState> {
        self.run.as_ref().map(|r| &r.state)
    }

    pub fn target(&self) -> Option<Target> {
        self.run.as_ref().map(|r| r.target)
    }

    pub fn world(&self) -> Option<&World> {
        self.run.as_ref().map(|r| &r.world)
    }

    pub fn world_mut(&mut self) -> Option<&mut World> {
        self.run.as_mut().map(|r| &mut r.world)
    }
}
