use nalgebra::Vector3;
use serde::Serialize;
use tracing::{debug, warn};

use super::climbing::{AgentPose, Animator, ClimbPolicy, ClimbTransition, MovementIntent};
use super::constants::humanoid as humanoid_consts;
use super::constants::physics as consts;
use super::humanoid_movement::{
    build_motion_plan, flatten, jump_launch_speed, resolve_vertical_velocity_after_move,
    yaw_from_horizontal_velocity,
};
use super::physics::PhysicsWorld;
use crate::config::ClimbConfig;

/// Locomotion state of a humanoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum HumanoidStateType {
    #[default]
    Running,
    Freefall,
    Climbing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateChange {
    pub from: HumanoidStateType,
    pub to: HumanoidStateType,
}

/// Owns a character's locomotion state machine.
///
/// Outside the climb it walks and falls through the kinematic controller
/// and polls for a wall to grab. While climbing it steps the policy and
/// applies whatever transition the policy asks for.
#[derive(Debug)]
pub struct Humanoid {
    character_id: u64,
    state: HumanoidStateType,
    policy: ClimbPolicy,
    walk_speed: f32,
}

impl Humanoid {
    pub fn new(character_id: u64, config: ClimbConfig) -> Self {
        Self {
            character_id,
            state: HumanoidStateType::Running,
            policy: ClimbPolicy::new(config),
            walk_speed: consts::WALK_SPEED,
        }
    }

    pub fn character_id(&self) -> u64 {
        self.character_id
    }

    pub fn state(&self) -> HumanoidStateType {
        self.state
    }

    pub fn policy(&self) -> &ClimbPolicy {
        &self.policy
    }

    pub fn set_walk_speed(&mut self, walk_speed: f32) {
        self.walk_speed = walk_speed.max(0.0);
    }

    /// Runs one tick and reports a state change, if any.
    pub fn tick<A: Animator + ?Sized>(
        &mut self,
        world: &mut PhysicsWorld,
        animator: &mut A,
        now: f64,
        dt: f32,
        intent: MovementIntent,
    ) -> Option<StateChange> {
        let Some(agent) = world.character_pose(self.character_id) else {
            warn!(character_id = self.character_id, "humanoid has no character body");
            return None;
        };
        let previous = self.state;

        if self.state == HumanoidStateType::Climbing {
            match self.policy.step(world, animator, &agent, now, dt, intent) {
                None => {}
                Some(ClimbTransition::Fallback { impulse }) => {
                    self.fall_back(world, animator, &agent, now, impulse, intent.jump);
                }
                Some(ClimbTransition::Reenter(hit)) => {
                    self.policy.leave(world, animator, now);
                    if let Err(e) = self.policy.enter(world, animator, &agent, hit, now) {
                        warn!(
                            character_id = self.character_id,
                            surface_id = hit.part_id,
                            error = %e,
                            "could not re-attach to new surface"
                        );
                        self.restore_upright(world, &agent);
                        self.state = HumanoidStateType::Freefall;
                    }
                }
            }
        } else if let Some(hit) = self.policy.can_enter(&*world, &agent, now) {
            match self.policy.enter(world, animator, &agent, hit, now) {
                Ok(()) => {
                    if let Some(state) = world.get_character_state_mut(self.character_id) {
                        state.vertical_velocity = 0.0;
                        state.carried_velocity = Vector3::zeros();
                    }
                    self.state = HumanoidStateType::Climbing;
                }
                Err(e) => {
                    warn!(character_id = self.character_id, error = %e, "could not attach to wall");
                }
            }
        }

        if self.state != HumanoidStateType::Climbing {
            self.move_outside_climb(world, &agent, dt, intent);
        }

        if previous != self.state {
            debug!(
                character_id = self.character_id,
                from = ?previous,
                to = ?self.state,
                "humanoid state changed"
            );
            Some(StateChange {
                from: previous,
                to: self.state,
            })
        } else {
            None
        }
    }

    /// Leaves the climb for free fall, carrying the exit velocity.
    fn fall_back<A: Animator + ?Sized>(
        &mut self,
        world: &mut PhysicsWorld,
        animator: &mut A,
        agent: &AgentPose,
        now: f64,
        impulse: Option<Vector3<f32>>,
        jumped: bool,
    ) {
        self.policy.leave(world, animator, now);
        self.restore_upright(world, agent);

        let gravity = world.gravity.y;
        if let Some(state) = world.get_character_state_mut(self.character_id) {
            match impulse {
                Some(v) => {
                    state.carried_velocity = Vector3::new(v.x, 0.0, v.z);
                    state.vertical_velocity = v.y;
                }
                None if jumped => {
                    state.carried_velocity =
                        -flatten(agent.forward()) * humanoid_consts::WALL_JUMP_PUSH;
                    state.vertical_velocity = jump_launch_speed(gravity);
                }
                None => {
                    state.carried_velocity = Vector3::zeros();
                    state.vertical_velocity = 0.0;
                }
            }
            state.grounded = false;
        }
        self.state = HumanoidStateType::Freefall;
    }

    /// Drops pitch and roll picked up on the wall, keeping the heading.
    fn restore_upright(&self, world: &mut PhysicsWorld, agent: &AgentPose) {
        let mut facing = flatten(agent.forward());
        if facing == Vector3::zeros() {
            facing = flatten(agent.up());
        }
        let yaw = if facing == Vector3::zeros() {
            0.0
        } else {
            yaw_from_horizontal_velocity(facing)
        };
        world.set_character_yaw(self.character_id, yaw);
    }

    fn move_outside_climb(
        &mut self,
        world: &mut PhysicsWorld,
        agent: &AgentPose,
        dt: f32,
        intent: MovementIntent,
    ) {
        let Some(state) = world.get_character_state(self.character_id) else {
            return;
        };
        let (vertical_velocity, carried_velocity, grounded) =
            (state.vertical_velocity, state.carried_velocity, state.grounded);

        let plan = build_motion_plan(
            agent.forward(),
            agent.right(),
            intent,
            self.walk_speed,
            vertical_velocity,
            carried_velocity,
            world.gravity.y,
            dt,
            grounded,
        );

        if plan.jumped {
            debug!(character_id = self.character_id, "jumped");
        }

        let mut new_vertical_velocity = plan.new_vertical_velocity;
        let mut post_move_grounded = grounded;
        if let Some(movement) = world.move_character(self.character_id, plan.desired, dt) {
            new_vertical_velocity = resolve_vertical_velocity_after_move(
                new_vertical_velocity,
                plan.desired[1],
                movement.translation.y,
                movement.grounded,
            );
            post_move_grounded = movement.grounded;
        }

        if let Some(state) = world.get_character_state_mut(self.character_id) {
            state.vertical_velocity = new_vertical_velocity;
            state.carried_velocity = if post_move_grounded && new_vertical_velocity <= 0.0 {
                Vector3::zeros()
            } else {
                plan.new_carried_velocity
            };
        }

        // A jump leaves the ground this tick even if the controller snapped.
        self.state = if post_move_grounded && !plan.jumped && new_vertical_velocity <= 0.0 {
            HumanoidStateType::Running
        } else {
            HumanoidStateType::Freefall
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::animation::LocomotionAnimator;
    use crate::game::climbing::{Animator, LocomotionState};
    use crate::game::physics::PartShape;
    use nalgebra::UnitQuaternion;

    const DT: f32 = 1.0 / 60.0;
    const CHARACTER: u64 = 1;

    fn floor_world() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world.add_part(
            100,
            [0.0, -0.5, 0.0],
            UnitQuaternion::identity(),
            [200.0, 1.0, 200.0],
            true,
            true,
            PartShape::Block,
        );
        world.add_character(CHARACTER, [0.0, 1.1, 0.0], 0.5, 2.0);
        world
    }

    fn run(
        world: &mut PhysicsWorld,
        humanoid: &mut Humanoid,
        animator: &mut LocomotionAnimator,
        ticks: usize,
        clock: &mut f64,
        intent: MovementIntent,
    ) -> Vec<StateChange> {
        let mut changes = Vec::new();
        for _ in 0..ticks {
            world.update_queries();
            if let Some(change) = humanoid.tick(world, animator, *clock, DT, intent) {
                changes.push(change);
            }
            world.solve_alignments(DT);
            world.step(DT);
            *clock += DT as f64;
        }
        changes
    }

    #[test]
    fn test_stands_on_floor_without_a_wall() {
        let mut world = floor_world();
        let mut humanoid = Humanoid::new(CHARACTER, ClimbConfig::default());
        let mut animator = LocomotionAnimator::new();
        let mut clock = 0.0;
        run(&mut world, &mut humanoid, &mut animator, 30, &mut clock, MovementIntent::default());
        assert_eq!(humanoid.state(), HumanoidStateType::Running);
        assert!(!humanoid.policy().is_climbing());
    }

    #[test]
    fn test_jump_from_floor_enters_freefall() {
        let mut world = floor_world();
        let mut humanoid = Humanoid::new(CHARACTER, ClimbConfig::default());
        let mut animator = LocomotionAnimator::new();
        let mut clock = 0.0;
        run(&mut world, &mut humanoid, &mut animator, 30, &mut clock, MovementIntent::default());
        assert_eq!(humanoid.state(), HumanoidStateType::Running);

        run(&mut world, &mut humanoid, &mut animator, 1, &mut clock, MovementIntent::new(0.0, 0.0, true));
        assert_eq!(humanoid.state(), HumanoidStateType::Freefall);
        let state = world.get_character_state(CHARACTER).unwrap();
        assert!(state.vertical_velocity > 0.0);
    }

    #[test]
    fn test_walks_into_wall_and_grabs_it() {
        let mut world = floor_world();
        world.add_part(
            10,
            [0.0, 10.0, -8.0],
            UnitQuaternion::identity(),
            [10.0, 20.0, 2.0],
            true,
            true,
            PartShape::Block,
        );
        world.set_climbable(10, true);
        let mut humanoid = Humanoid::new(CHARACTER, ClimbConfig::default());
        let mut animator = LocomotionAnimator::new();
        let mut clock = 0.0;

        let changes = run(
            &mut world,
            &mut humanoid,
            &mut animator,
            90,
            &mut clock,
            MovementIntent::new(0.0, 1.0, false),
        );
        assert!(changes.iter().any(|c| c.to == HumanoidStateType::Climbing));
        assert_eq!(animator.state(), LocomotionState::Climbing);
    }

    #[test]
    fn test_untagged_wall_is_not_grabbed() {
        let mut world = floor_world();
        world.add_part(
            10,
            [0.0, 10.0, -3.0],
            UnitQuaternion::identity(),
            [10.0, 20.0, 2.0],
            true,
            true,
            PartShape::Block,
        );
        let mut humanoid = Humanoid::new(CHARACTER, ClimbConfig::default());
        let mut animator = LocomotionAnimator::new();
        let mut clock = 0.0;
        run(&mut world, &mut humanoid, &mut animator, 30, &mut clock, MovementIntent::default());
        assert_ne!(humanoid.state(), HumanoidStateType::Climbing);
        assert_eq!(world.attachment_count(), 0);
    }

    #[test]
    fn test_missing_character_is_a_no_op() {
        let mut world = PhysicsWorld::new();
        let mut humanoid = Humanoid::new(42, ClimbConfig::default());
        let mut animator = LocomotionAnimator::new();
        animator.scale_playback_rate(3.0);
        assert_eq!(
            humanoid.tick(&mut world, &mut animator, 0.0, DT, MovementIntent::default()),
            None
        );
        assert_eq!(animator.speed(), 3.0);
    }
}
