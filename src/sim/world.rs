//! Physics world construction and access
//!
//! A `World` holds one dynamic ball, the peg lattice for the current board
//! size and three static boundary edges. It lives for exactly one run and is
//! rebuilt from scratch on every reset.

use glam::Vec2;
use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use super::contact::{ContactCollector, PegContact};
use super::state::Dimensions;
use crate::consts::*;
use crate::settings::PhysicsState;
use crate::{from_na, to_na, to_world};

/// A static peg (render space)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peg {
    /// `row * COLS + column_in_row`
    pub id: u32,
    pub position: Vec2,
    pub radius: f32,
}

/// Peg lattice for a board, computable without building a world
pub fn peg_layout(dims: &Dimensions, radius: f32) -> Vec<Peg> {
    let sx = dims.column_spacing();
    let sy = dims.row_spacing();
    let mut pegs = Vec::new();

    for row in 0..ROWS {
        let count = COLS as i32 - (ROWS as i32 - 1 - row as i32).abs();
        if count < MIN_PEGS_PER_ROW as i32 {
            continue;
        }
        let count = count as u32;
        let ox = (dims.width - count as f32 * sx) / 2.0 - sx / 2.0;
        let y = PEG_ROW_ORIGIN + row as f32 * sy;
        for i in 0..count {
            pegs.push(Peg {
                id: row * COLS + i,
                position: Vec2::new(ox + i as f32 * sx + sx, y),
                radius,
            });
        }
    }
    pegs
}

/// Which static edge a boundary is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryKind {
    Floor,
    LeftWall,
    RightWall,
}

impl BoundaryKind {
    fn index(self) -> u64 {
        match self {
            BoundaryKind::Floor => 0,
            BoundaryKind::LeftWall => 1,
            BoundaryKind::RightWall => 2,
        }
    }

    fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(BoundaryKind::Floor),
            1 => Some(BoundaryKind::LeftWall),
            2 => Some(BoundaryKind::RightWall),
            _ => None,
        }
    }
}

/// A static boundary edge (render space)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub kind: BoundaryKind,
    pub start: Vec2,
    pub end: Vec2,
}

impl Boundary {
    /// Floor, left wall and right wall for a board
    pub fn all(dims: &Dimensions, ball_radius: f32) -> [Boundary; 3] {
        let floor_y = dims.floor_y(ball_radius);
        [
            Boundary {
                kind: BoundaryKind::Floor,
                start: Vec2::new(0.0, floor_y),
                end: Vec2::new(dims.width, floor_y),
            },
            Boundary {
                kind: BoundaryKind::LeftWall,
                start: Vec2::ZERO,
                end: Vec2::new(0.0, dims.height),
            },
            Boundary {
                kind: BoundaryKind::RightWall,
                start: Vec2::new(dims.width, 0.0),
                end: Vec2::new(dims.width, dims.height),
            },
        ]
    }
}

/// Identity stored in a collider's user data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyTag {
    Ball,
    Peg(u32),
    Boundary(BoundaryKind),
}

const TAG_SHIFT: u32 = 64;
const TAG_BALL: u128 = 1;
const TAG_PEG: u128 = 2;
const TAG_BOUNDARY: u128 = 3;

impl BodyTag {
    /// Kind in the high half, payload in the low half. Zero means untagged.
    pub fn to_user_data(self) -> u128 {
        match self {
            BodyTag::Ball => TAG_BALL << TAG_SHIFT,
            BodyTag::Peg(id) => (TAG_PEG << TAG_SHIFT) | id as u128,
            BodyTag::Boundary(kind) => (TAG_BOUNDARY << TAG_SHIFT) | kind.index() as u128,
        }
    }

    pub fn from_user_data(data: u128) -> Option<Self> {
        let payload = data as u64;
        match data >> TAG_SHIFT {
            TAG_BALL => Some(BodyTag::Ball),
            TAG_PEG => u32::try_from(payload).ok().map(BodyTag::Peg),
            TAG_BOUNDARY => BoundaryKind::from_index(payload).map(BodyTag::Boundary),
            _ => None,
        }
    }
}

/// Anything that can be put into the world as a collider
pub trait Collidable {
    fn tag(&self) -> BodyTag;

    /// Collider in physics space, material taken from `physics`
    fn collider(&self, physics: &PhysicsState) -> ColliderBuilder;
}

/// The ball's shape (its body is created separately, it is the only dynamic one)
#[derive(Debug, Clone, Copy)]
pub struct BallShape {
    pub radius: f32,
}

impl Collidable for BallShape {
    fn tag(&self) -> BodyTag {
        BodyTag::Ball
    }

    fn collider(&self, physics: &PhysicsState) -> ColliderBuilder {
        ColliderBuilder::ball(self.radius / BASE_SCALE)
            .density(BALL_DENSITY)
            .restitution(physics.restitution_ball)
            .friction(physics.friction_ball)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .user_data(self.tag().to_user_data())
    }
}

impl Collidable for Peg {
    fn tag(&self) -> BodyTag {
        BodyTag::Peg(self.id)
    }

    fn collider(&self, physics: &PhysicsState) -> ColliderBuilder {
        ColliderBuilder::ball(self.radius / BASE_SCALE)
            .translation(to_na(to_world(self.position)))
            .restitution(physics.restitution_ball)
            .friction(PEG_FRICTION)
            .user_data(self.tag().to_user_data())
    }
}

impl Collidable for Boundary {
    fn tag(&self) -> BodyTag {
        BodyTag::Boundary(self.kind)
    }

    fn collider(&self, physics: &PhysicsState) -> ColliderBuilder {
        let a = to_world(self.start);
        let b = to_world(self.end);
        let restitution = match self.kind {
            BoundaryKind::Floor => physics.restitution_ball,
            BoundaryKind::LeftWall | BoundaryKind::RightWall => WALL_RESTITUTION,
        };
        ColliderBuilder::segment(Point::new(a.x, a.y), Point::new(b.x, b.y))
            .restitution(restitution)
            .user_data(self.tag().to_user_data())
    }
}

/// One run's physics world
pub struct World {
    pipeline: PhysicsPipeline,
    gravity: Vector<Real>,
    gravity_scale: f32,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    collector: ContactCollector,

    ball: RigidBodyHandle,
    ball_collider: ColliderHandle,
    peg_colliders: Vec<ColliderHandle>,
    floor: Option<ColliderHandle>,

    pegs: Vec<Peg>,
    dims: Dimensions,
    /// Radii this world was built with (pixels)
    ball_radius: f32,
    peg_radius: f32,
}

impl World {
    /// Build a fresh world with the ball at the spawn point
    pub fn build(dims: Dimensions, physics: &PhysicsState) -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        let ball_body = RigidBodyBuilder::dynamic()
            .translation(to_na(to_world(dims.spawn_point())))
            .linear_damping(SMOOTHNESS)
            .ccd_enabled(true)
            .can_sleep(false)
            .build();
        let ball = bodies.insert(ball_body);
        let shape = BallShape {
            radius: physics.ball_radius_live,
        };
        let ball_collider =
            colliders.insert_with_parent(shape.collider(physics).build(), ball, &mut bodies);

        let pegs = peg_layout(&dims, physics.peg_radius_live);
        let peg_colliders = pegs
            .iter()
            .map(|peg| colliders.insert(peg.collider(physics).build()))
            .collect();

        let mut floor = None;
        for boundary in Boundary::all(&dims, physics.ball_radius_live) {
            let handle = colliders.insert(boundary.collider(physics).build());
            if boundary.kind == BoundaryKind::Floor {
                floor = Some(handle);
            }
        }

        let params = IntegrationParameters {
            dt: PHYSICS_DT as Real,
            ..IntegrationParameters::default()
        };

        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: vector![0.0, physics.gravity],
            gravity_scale: 1.0,
            params,
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            collector: ContactCollector::default(),
            ball,
            ball_collider,
            peg_colliders,
            floor,
            pegs,
            dims,
            ball_radius: physics.ball_radius_live,
            peg_radius: physics.peg_radius_live,
        }
    }

    /// Advance one fixed sub-step, returning the ball/peg contact changes
    pub fn step(&mut self) -> Vec<PegContact> {
        self.pipeline.step(
            &self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &(),
            self.collector.handler(),
        );
        self.collector.drain(&self.colliders)
    }

    /// Ball centre in render space (pixels)
    pub fn ball_position(&self) -> Vec2 {
        self.bodies
            .get(self.ball)
            .map(|b| crate::to_render(from_na(b.translation())))
            .unwrap_or_else(|| self.dims.spawn_point())
    }

    /// Ball centre in physics space (metres)
    pub fn ball_position_m(&self) -> Vec2 {
        to_world(self.ball_position())
    }

    /// Ball linear velocity (m/s)
    pub fn ball_velocity(&self) -> Vec2 {
        self.bodies
            .get(self.ball)
            .map(|b| from_na(b.linvel()))
            .unwrap_or(Vec2::ZERO)
    }

    pub fn ball_mass(&self) -> f32 {
        self.bodies.get(self.ball).map(|b| b.mass()).unwrap_or(0.0)
    }

    /// Add a force (physics space) until the next `reset_forces`
    pub fn apply_force(&mut self, force: Vec2) {
        if force == Vec2::ZERO {
            return;
        }
        if let Some(body) = self.bodies.get_mut(self.ball) {
            body.add_force(to_na(force), true);
        }
    }

    pub fn reset_forces(&mut self) {
        if let Some(body) = self.bodies.get_mut(self.ball) {
            body.reset_forces(true);
        }
    }

    /// Teleport the ball (metres) and give it a new velocity (m/s)
    pub fn relocate(&mut self, position: Vec2, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(self.ball) {
            body.set_translation(to_na(position), true);
            body.set_linvel(to_na(velocity), true);
        }
    }

    /// Update the hot-swappable parameters in place
    pub fn apply_live(&mut self, physics: &PhysicsState) {
        self.gravity = vector![0.0, physics.gravity * self.gravity_scale];

        if let Some(ball) = self.colliders.get_mut(self.ball_collider) {
            ball.set_restitution(physics.restitution_ball);
            ball.set_friction(physics.friction_ball);
        }
        for handle in &self.peg_colliders {
            if let Some(peg) = self.colliders.get_mut(*handle) {
                peg.set_restitution(physics.restitution_ball);
            }
        }
        if let Some(floor) = self.floor.and_then(|h| self.colliders.get_mut(h)) {
            floor.set_restitution(physics.restitution_ball);
        }
    }

    /// Scale gravity relative to the configured value
    pub fn set_gravity_scale(&mut self, scale: f32, physics: &PhysicsState) {
        self.gravity_scale = scale;
        self.gravity = vector![0.0, physics.gravity * scale];
    }

    /// Current gravity along y (m/s^2)
    pub fn gravity(&self) -> f32 {
        self.gravity.y
    }

    /// True when `physics` asks for radii this world cannot hot-swap
    pub fn needs_rebuild(&self, physics: &PhysicsState) -> bool {
        self.ball_radius != physics.ball_radius_live || self.peg_radius != physics.peg_radius_live
    }

    pub fn ball_radius(&self) -> f32 {
        self.ball_radius
    }

    pub fn pegs(&self) -> &[Peg] {
        &self.pegs
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    pub fn ball_uses_ccd(&self) -> bool {
        self.bodies
            .get(self.ball)
            .map(|b| b.is_ccd_enabled())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Dimensions {
        Dimensions::new(800.0, 600.0)
    }

    #[test]
    fn test_layout_row_four() {
        let pegs = peg_layout(&dims(), PEG_RADIUS);
        let row: Vec<&Peg> = pegs.iter().filter(|p| p.id / COLS == 4).collect();
        assert_eq!(row.len(), 3);
        let xs: Vec<f32> = row.iter().map(|p| p.position.x).collect();
        assert_eq!(xs, vec![320.0, 400.0, 480.0]);
        let ids: Vec<u32> = row.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![36, 37, 38]);
        assert!((row[0].position.y - 148.18).abs() < 0.01);
    }

    #[test]
    fn test_layout_skips_short_rows() {
        let pegs = peg_layout(&dims(), PEG_RADIUS);
        assert!(pegs.iter().all(|p| p.id / COLS >= 4));
        // 3 + 4 + ... + 9
        assert_eq!(pegs.len(), 42);
        let bottom: Vec<&Peg> = pegs.iter().filter(|p| p.id / COLS == 10).collect();
        assert_eq!(bottom.len(), 9);
        assert_eq!(bottom[0].position.x, 80.0);
        assert_eq!(bottom[8].position.x, 720.0);
    }

    #[test]
    fn test_user_data_tags() {
        for tag in [
            BodyTag::Ball,
            BodyTag::Peg(0),
            BodyTag::Peg(98),
            BodyTag::Boundary(BoundaryKind::Floor),
            BodyTag::Boundary(BoundaryKind::RightWall),
        ] {
            assert_eq!(BodyTag::from_user_data(tag.to_user_data()), Some(tag));
        }
        assert_eq!(BodyTag::from_user_data(0), None);
    }

    #[test]
    fn test_boundaries() {
        let [floor, left, right] = Boundary::all(&dims(), 16.0);
        assert_eq!(floor.kind, BoundaryKind::Floor);
        assert_eq!(floor.start.y, 579.0);
        assert_eq!(floor.end, Vec2::new(800.0, 579.0));
        assert_eq!(left.end, Vec2::new(0.0, 600.0));
        assert_eq!(right.start, Vec2::new(800.0, 0.0));
    }

    #[test]
    fn test_build_spawns_ball() {
        let world = World::build(dims(), &PhysicsState::default());
        let pos = world.ball_position();
        assert!((pos.x - 400.0).abs() < 1e-3);
        assert!((pos.y - 40.0).abs() < 1e-3);
        assert!(world.ball_uses_ccd());
        assert!(world.ball_mass() > 0.0);
        assert_eq!(world.pegs().len(), 42);
        assert_eq!(world.gravity(), 20.0);
    }

    #[test]
    fn test_ball_falls() {
        let mut world = World::build(dims(), &PhysicsState::default());
        for _ in 0..30 {
            world.step();
        }
        assert!(world.ball_position().y > 40.0);
        assert!(world.ball_velocity().y > 0.0);
    }

    #[test]
    fn test_live_swap_and_rebuild_detection() {
        let physics = PhysicsState::default();
        let mut world = World::build(dims(), &physics);

        let swapped = PhysicsState {
            gravity: 10.0,
            restitution_ball: 0.5,
            ..physics
        };
        world.apply_live(&swapped);
        assert_eq!(world.gravity(), 10.0);
        assert!(!world.needs_rebuild(&swapped));

        world.set_gravity_scale(2.0, &swapped);
        assert_eq!(world.gravity(), 20.0);
        world.apply_live(&swapped);
        assert_eq!(world.gravity(), 20.0);

        let bigger = PhysicsState {
            ball_radius_live: 12.0,
            ..physics
        };
        assert!(world.needs_rebuild(&bigger));
    }

    #[test]
    fn test_relocate() {
        let mut world = World::build(dims(), &PhysicsState::default());
        world.relocate(Vec2::new(2.0, 3.0), Vec2::new(0.0, 2.0));
        assert!((world.ball_position() - Vec2::new(100.0, 150.0)).length() < 1e-3);
        assert_eq!(world.ball_velocity(), Vec2::new(0.0, 2.0));
    }
}
