use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::Serialize;

use super::animation::LocomotionAnimator;
use super::climbing::MovementIntent;
use super::constants::physics as consts;
use super::humanoid::{Humanoid, HumanoidStateType, StateChange};
use super::physics::PhysicsWorld;
use crate::config::ClimbConfig;

/// Per-tick snapshot of the simulated character.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub time: f64,
    pub state: HumanoidStateType,
    pub position: [f32; 3],
    pub forward: [f32; 3],
    pub surface_id: Option<u64>,
    pub danger: f32,
    pub playback_speed: f32,
    pub locomotion: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<StateChange>,
}

/// One character in a physics world, advanced at a fixed step.
///
/// The clock is owned here and only moves when `tick` runs.
pub struct Simulation {
    pub world: PhysicsWorld,
    humanoid: Humanoid,
    animator: LocomotionAnimator,
    clock: f64,
    tick_count: u64,
    dt: f32,
}

impl Simulation {
    /// Spawns the character capsule and wires its humanoid.
    pub fn new(mut world: PhysicsWorld, character_id: u64, spawn: [f32; 3], config: ClimbConfig) -> Self {
        if !world.has_character(character_id) {
            world.add_character(
                character_id,
                spawn,
                consts::CHARACTER_RADIUS,
                consts::CHARACTER_HEIGHT,
            );
        }
        Self {
            world,
            humanoid: Humanoid::new(character_id, config),
            animator: LocomotionAnimator::new(),
            clock: 0.0,
            tick_count: 0,
            dt: consts::TIMESTEP,
        }
    }

    pub fn humanoid(&self) -> &Humanoid {
        &self.humanoid
    }

    pub fn animator(&self) -> &LocomotionAnimator {
        &self.animator
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Executes simulation phases for one tick:
    /// queries -> humanoid -> alignment -> physics -> animation -> clock.
    pub fn tick(&mut self, intent: MovementIntent) -> TickReport {
        // Update query pipeline so probes and move_shape see current collider poses.
        self.world.update_queries();

        let change = self
            .humanoid
            .tick(&mut self.world, &mut self.animator, self.clock, self.dt, intent);

        // Drive attached bodies toward their constraint targets, then integrate.
        self.world.solve_alignments(self.dt);
        self.world.step(self.dt);

        self.animator.tick(self.dt);
        self.clock += self.dt as f64;
        self.tick_count += 1;

        self.report(change)
    }

    fn report(&self, change: Option<StateChange>) -> TickReport {
        let pose = self.world.character_pose(self.humanoid.character_id());
        let position = pose.map(|p| p.position).unwrap_or_else(Point3::origin);
        let rotation = pose.map(|p| p.rotation).unwrap_or_else(UnitQuaternion::identity);
        let forward = rotation * -Vector3::z();
        let policy = self.humanoid.policy();
        TickReport {
            tick: self.tick_count,
            time: self.clock,
            state: self.humanoid.state(),
            position: [position.x, position.y, position.z],
            forward: [forward.x, forward.y, forward.z],
            surface_id: policy.session().active().map(|s| s.surface_id()),
            danger: policy.danger(),
            playback_speed: self.animator.speed(),
            locomotion: self.animator.state().name(),
            change,
        }
    }
}
