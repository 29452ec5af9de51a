//! Run lifecycle and completion
//!
//! The `Board` is what a host talks to. It collects inputs (geometry, physics,
//! target, run signal, reset token), decides when a run starts or is torn
//! down, feeds frame time to the integrator and raises the one-shot
//! completion after the ball lands.

use glam::Vec2;

use crate::consts::*;
use crate::settings::{BoardMode, BoardSettings, PhysicsOverrides, PhysicsState};
use crate::sim::{
    ContactTracker, Dimensions, Integrator, Peg, RunPhase, StopReason, Target, peg_layout,
};

/// Something the host may need to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEvent {
    RunStarted { run: u64 },
    /// Integration ended. `Landed` also means the run signal was dropped.
    Stopped { run: u64, reason: StopReason },
    Completed { run: u64 },
}

/// Published ball state (render space)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallView {
    pub position: Vec2,
    pub opacity: f32,
}

/// Output of one `Board::tick`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub ball: Option<BallView>,
    pub events: Vec<BoardEvent>,
}

/// Completion deadline for one run
#[derive(Debug, Clone, Copy)]
struct PendingCompletion {
    run: u64,
    due_ms: f64,
}

/// Ball opacity for a board mode at a given height (pixels)
pub fn opacity_for(mode: BoardMode, ball_y: f32, dims: &Dimensions) -> f32 {
    let height_m = dims.height_m();
    let to_bottom = height_m - ball_y / BASE_SCALE;
    match mode {
        BoardMode::Waiting => {
            if to_bottom < IDLE_FADE_DISTANCE {
                0.0
            } else {
                to_bottom / height_m
            }
        }
        BoardMode::Multi => {
            if to_bottom < MULTI_FADE_DISTANCE {
                0.0
            } else {
                1.0
            }
        }
        BoardMode::Single | BoardMode::Round => 1.0,
    }
}

pub struct Board {
    dims: Dimensions,
    physics: PhysicsState,
    target: Target,
    mode: BoardMode,
    completion_delay_ms: f64,

    running: bool,
    reset_token: u64,
    start_armed: bool,

    integrator: Integrator,
    contacts: ContactTracker,
    pending: Option<PendingCompletion>,
    run_id: u64,
    pegs: Vec<Peg>,
    last_ball: Option<BallView>,
}

impl Board {
    pub fn new(dims: Dimensions, settings: &BoardSettings) -> Self {
        Self {
            dims,
            physics: settings.physics,
            target: Target::default_for(&dims),
            mode: settings.mode,
            completion_delay_ms: settings.completion_delay_ms.max(0.0),
            running: false,
            reset_token: 0,
            start_armed: false,
            integrator: Integrator::new(),
            contacts: ContactTracker::new(),
            pending: None,
            run_id: 0,
            pegs: peg_layout(&dims, settings.physics.peg_radius_live),
            last_ball: None,
        }
    }

    /// Run signal. Turning it on arms a start; turning it off tears down.
    pub fn set_running(&mut self, running: bool) {
        if running == self.running {
            return;
        }
        self.running = running;
        if running {
            self.start_armed = true;
        } else {
            self.teardown();
        }
    }

    /// Any change forces a fresh world
    pub fn set_reset_token(&mut self, token: u64) {
        if token == self.reset_token {
            return;
        }
        self.reset_token = token;
        self.teardown();
        self.start_armed = true;
    }

    pub fn set_dimensions(&mut self, dims: Dimensions) {
        if !(dims.width > 0.0 && dims.height > 0.0) {
            log::warn!("Ignoring board size {}x{}", dims.width, dims.height);
            return;
        }
        if dims == self.dims {
            return;
        }
        self.dims = dims;
        self.pegs = peg_layout(&dims, self.physics.peg_radius_live);
        self.teardown();
        self.start_armed = true;
    }

    /// Replace the physics snapshot. Hot-swappable values reach the live
    /// world at once; radius changes rebuild on the next sub-step.
    pub fn set_physics(&mut self, physics: PhysicsState) {
        if !physics.same_geometry(&self.physics) {
            self.pegs = peg_layout(&self.dims, physics.peg_radius_live);
            log::info!(
                "Radii changed to ball={} peg={}",
                physics.ball_radius_live,
                physics.peg_radius_live
            );
        }
        self.physics = physics;
        self.integrator.apply_live(&self.physics);
        log::debug!("Physics updated: {:?}", self.physics);
    }

    /// Merge a partial update over the current physics
    pub fn set_overrides(&mut self, overrides: &PhysicsOverrides) {
        let physics = overrides.apply_to(&self.physics);
        self.set_physics(physics);
    }

    /// Target for the next run; a running ball keeps the one it started with
    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    pub fn set_mode(&mut self, mode: BoardMode) {
        if mode == self.mode {
            return;
        }
        let was_boosted = self.mode.gravity_boost().is_some();
        self.mode = mode;
        if let Some(boost) = mode.gravity_boost()
            && !was_boosted
            && self.integrator.has_world()
        {
            self.integrator.set_gravity_scale(boost, &self.physics);
            log::debug!("Gravity boosted x{} for {} mode", boost, mode.as_str());
        }
    }

    pub fn set_completion_delay(&mut self, delay_ms: f64) {
        self.completion_delay_ms = delay_ms.max(0.0);
    }

    /// Advance one display frame. `now_ms` is the host's frame clock.
    pub fn tick(&mut self, now_ms: f64) -> Frame {
        let mut frame = Frame::default();

        if self.running && self.start_armed {
            self.begin_run(&mut frame);
        }

        if self.integrator.is_active() {
            let frame_dt = FRAME_DT * TIME_SCALE * self.physics.animation_speed as f64;
            let report = self.integrator.advance(frame_dt, &self.physics);
            self.contacts.record_all(report.contacts, now_ms);
            self.last_ball = self.ball_view();

            match report.stopped {
                Some(StopReason::Landed) => self.land(now_ms, &mut frame),
                Some(StopReason::Rebuild) => {
                    log::info!("Run {} rebuilding for new radii", self.run_id);
                    frame.events.push(BoardEvent::Stopped {
                        run: self.run_id,
                        reason: StopReason::Rebuild,
                    });
                    self.teardown();
                    if self.running {
                        self.begin_run(&mut frame);
                        self.last_ball = self.ball_view();
                    }
                }
                None => {}
            }
        } else {
            self.last_ball = self.ball_view();
        }

        frame.ball = self.last_ball;

        if let Some(pending) = self.pending
            && pending.run == self.run_id
            && now_ms >= pending.due_ms
        {
            self.pending = None;
            log::info!("Run {} complete", pending.run);
            frame.events.push(BoardEvent::Completed { run: pending.run });
        }

        frame
    }

    fn begin_run(&mut self, frame: &mut Frame) {
        self.teardown();
        self.start_armed = false;
        self.run_id += 1;
        self.integrator.start(self.dims, &self.physics, self.target);
        log::info!(
            "Run {} started: target=({:.1}, {:.1}) board={}x{}",
            self.run_id,
            self.target.x,
            self.target.y,
            self.dims.width,
            self.dims.height
        );
        frame.events.push(BoardEvent::RunStarted { run: self.run_id });
    }

    fn land(&mut self, now_ms: f64, frame: &mut Frame) {
        if let (Some(ball), Some(state)) = (self.integrator.ball_position(), self.integrator.sim_state()) {
            log::info!(
                "Run {} landed at ({:.1}, {:.1}) after {} sub-steps, {} recoveries",
                self.run_id,
                ball.x,
                ball.y,
                state.substeps,
                state.recoveries
            );
        }
        frame.events.push(BoardEvent::Stopped {
            run: self.run_id,
            reason: StopReason::Landed,
        });

        self.integrator.stop();
        self.contacts.release_all();
        // The engine drops the run signal itself; the pending completion survives it
        self.running = false;
        self.pending = Some(PendingCompletion {
            run: self.run_id,
            due_ms: now_ms + self.completion_delay_ms,
        });
    }

    /// Discard the world and any completion still waiting
    fn teardown(&mut self) {
        if self.integrator.has_world() {
            log::info!("Run {} torn down", self.run_id);
        }
        self.integrator.stop();
        self.contacts.release_all();
        self.pending = None;
        self.last_ball = None;
    }

    fn ball_view(&self) -> Option<BallView> {
        let position = self.integrator.ball_position()?;
        let opacity = if self.running {
            opacity_for(self.mode, position.y, &self.dims)
        } else {
            0.0
        };
        Some(BallView { position, opacity })
    }

    /// Ball as of the last tick
    pub fn ball(&self) -> Option<BallView> {
        self.last_ball
    }

    pub fn pegs(&self) -> &[Peg] {
        &self.pegs
    }

    pub fn contacts(&self) -> &ContactTracker {
        &self.contacts
    }

    pub fn physics(&self) -> &PhysicsState {
        &self.physics
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn mode(&self) -> BoardMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    pub fn phase(&self) -> RunPhase {
        self.integrator.phase()
    }

    pub fn has_pending_completion(&self) -> bool {
        self.pending.is_some()
    }

    /// Gravity of the live world, if any
    pub fn live_gravity(&self) -> Option<f32> {
        self.integrator.world().map(|w| w.gravity())
    }
}
