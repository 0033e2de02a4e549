use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use rapier3d::control::{
    CharacterAutostep, CharacterLength, EffectiveCharacterMovement, KinematicCharacterController,
};
use rapier3d::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use super::climbing::{
    AgentPose, AlignKind, AlignParams, AttachError, AttachmentHost, AttachmentId, ConstraintId,
    LimbPart, RayCaster, RayHit,
};
use super::constants::physics as consts;

// Characters don't collide with each other, only with static geometry
const GROUP_STATIC: Group = Group::GROUP_1; // Walls, floors, obstacles
const GROUP_CHARACTER: Group = Group::GROUP_2; // Player characters

/// Collision shape of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartShape {
    #[default]
    Block,
    Ball,
}

/// State for a character controller
pub struct CharacterControllerState {
    pub collider_handle: ColliderHandle,
    pub body_handle: RigidBodyHandle,
    /// Limb colliders attached to the character body
    pub limb_colliders: HashMap<LimbPart, ColliderHandle>,
    pub vertical_velocity: f32,
    /// Horizontal velocity carried over from a climb exit, decays on ground
    pub carried_velocity: Vector3<f32>,
    pub grounded: bool,
}

/// A frame rigidly attached to a part or character body.
#[derive(Debug, Clone)]
struct Attachment {
    instance_id: u64,
    body_handle: RigidBodyHandle,
    local_frame: Isometry3<f32>,
}

/// A compliant constraint driving `attachment0` toward `attachment1`.
#[derive(Debug, Clone)]
struct CompliantConstraint {
    kind: AlignKind,
    attachment0: AttachmentId,
    attachment1: AttachmentId,
    params: AlignParams,
    /// Linear or angular velocity currently applied by this constraint.
    velocity: Vector3<f32>,
}

/// Wrapper around Rapier3D physics world for game physics simulation.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    /// Maps part or character id to Rapier rigid body handle
    pub instance_to_body: HashMap<u64, RigidBodyHandle>,
    /// Maps Rapier rigid body handle to part or character id (reverse lookup)
    pub body_to_instance: HashMap<RigidBodyHandle, u64>,
    /// Maps Rapier collider handle to part or character id (for ray hits)
    pub collider_to_instance: HashMap<ColliderHandle, u64>,
    /// Parts tagged as climbable
    pub climbable_parts: HashSet<u64>,
    /// Character controllers for player movement
    pub character_controllers: HashMap<u64, CharacterControllerState>,

    attachments: BTreeMap<AttachmentId, Attachment>,
    constraints: BTreeMap<ConstraintId, CompliantConstraint>,
    /// Collision groups a masked collider had before masking
    collision_overrides: HashMap<ColliderHandle, InteractionGroups>,
    next_handle_id: u64,
}

/// Builds a collider with the correct shape for a given PartShape and size.
fn build_collider(size: [f32; 3], shape: PartShape, can_collide: bool) -> Collider {
    let [sx, sy, sz] = size;
    let shared_shape = match shape {
        PartShape::Block => SharedShape::cuboid(sx / 2.0, sy / 2.0, sz / 2.0),
        PartShape::Ball => SharedShape::ball(sx / 2.0),
    };
    ColliderBuilder::new(shared_shape)
        .sensor(!can_collide)
        .collision_groups(InteractionGroups::new(GROUP_STATIC, Group::ALL))
        .build()
}

/// Limb collider half extents and body-local center.
fn limb_layout(limb: LimbPart, radius: f32, height: f32) -> ([f32; 3], [f32; 3]) {
    let arm = [0.15, height * 0.22, 0.15];
    let leg = [0.15, height * 0.25, 0.15];
    match limb {
        LimbPart::LeftArm => (arm, [-(radius + 0.15), height * 0.1, 0.0]),
        LimbPart::RightArm => (arm, [radius + 0.15, height * 0.1, 0.0]),
        LimbPart::LeftLeg => (leg, [-0.2, -height * 0.25, 0.0]),
        LimbPart::RightLeg => (leg, [0.2, -height * 0.25, 0.0]),
    }
}

fn clamp_norm(v: Vector3<f32>, max: f32) -> Vector3<f32> {
    let n = v.norm();
    if n > max && n > 0.0 {
        v * (max / n)
    } else {
        v
    }
}

/// Advances a constraint's velocity toward `error * responsiveness` and
/// returns this tick's displacement, never longer than the error itself.
fn compliant_step(
    velocity: &mut Vector3<f32>,
    error: Vector3<f32>,
    params: &AlignParams,
    dt: f32,
) -> Vector3<f32> {
    let desired = clamp_norm(error * params.responsiveness, params.max_velocity);
    let max_dv = params.max_force / consts::AGENT_MASS * dt;
    *velocity += clamp_norm(desired - *velocity, max_dv);
    let step = *velocity * dt;
    let remaining = error.norm();
    if step.norm() > remaining {
        if dt > 0.0 {
            *velocity = error / dt;
        }
        error
    } else {
        step
    }
}

impl PhysicsWorld {
    /// Creates a new physics world with default gravity
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, -consts::DEFAULT_GRAVITY, 0.0],
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            instance_to_body: HashMap::new(),
            body_to_instance: HashMap::new(),
            collider_to_instance: HashMap::new(),
            climbable_parts: HashSet::new(),
            character_controllers: HashMap::new(),
            attachments: BTreeMap::new(),
            constraints: BTreeMap::new(),
            collision_overrides: HashMap::new(),
            next_handle_id: 0,
        }
    }

    /// Steps the physics simulation forward by dt seconds
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Refreshes the query pipeline so ray casts see the latest collider poses
    pub fn update_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Adds a part to the physics world
    /// - Anchored parts become kinematic (position-based, no physics simulation)
    /// - Non-anchored parts become dynamic (affected by gravity and collisions)
    #[allow(clippy::too_many_arguments)]
    pub fn add_part(
        &mut self,
        part_id: u64,
        position: [f32; 3],
        rotation: UnitQuaternion<f32>,
        size: [f32; 3],
        anchored: bool,
        can_collide: bool,
        shape: PartShape,
    ) -> RigidBodyHandle {
        let body = if anchored {
            RigidBodyBuilder::kinematic_position_based()
        } else {
            RigidBodyBuilder::dynamic()
        }
        .translation(vector![position[0], position[1], position[2]])
        .rotation(rotation.scaled_axis())
        .build();

        let handle = self.rigid_body_set.insert(body);
        let collider = build_collider(size, shape, can_collide);
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        self.instance_to_body.insert(part_id, handle);
        self.body_to_instance.insert(handle, part_id);
        self.collider_to_instance.insert(collider_handle, part_id);

        handle
    }

    /// Tags or untags a part as climbable
    pub fn set_climbable(&mut self, part_id: u64, climbable: bool) {
        if climbable {
            self.climbable_parts.insert(part_id);
        } else {
            self.climbable_parts.remove(&part_id);
        }
    }

    pub fn is_climbable(&self, part_id: u64) -> bool {
        self.climbable_parts.contains(&part_id)
    }

    /// Removes a part from the physics world, dropping attachments on it
    /// and every constraint that references them
    pub fn remove_part(&mut self, part_id: u64) -> bool {
        if self.character_controllers.contains_key(&part_id) {
            return false;
        }
        let Some(handle) = self.instance_to_body.remove(&part_id) else {
            return false;
        };
        self.body_to_instance.remove(&handle);
        self.climbable_parts.remove(&part_id);
        self.drop_attachments_on(part_id);
        if let Some(body) = self.rigid_body_set.get(handle) {
            for &ch in body.colliders() {
                self.collider_to_instance.remove(&ch);
            }
        }
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        true
    }

    fn drop_attachments_on(&mut self, instance_id: u64) {
        let dropped: Vec<AttachmentId> = self
            .attachments
            .iter()
            .filter(|(_, a)| a.instance_id == instance_id)
            .map(|(id, _)| *id)
            .collect();
        if dropped.is_empty() {
            return;
        }
        for id in &dropped {
            self.attachments.remove(id);
        }
        self.constraints
            .retain(|_, c| !dropped.contains(&c.attachment0) && !dropped.contains(&c.attachment1));
        debug!(instance_id, count = dropped.len(), "dropped attachments of removed instance");
    }

    /// Schedules a kinematic part's next pose (moving platforms, swinging walls)
    pub fn set_part_pose(
        &mut self,
        part_id: u64,
        position: [f32; 3],
        rotation: UnitQuaternion<f32>,
    ) -> bool {
        let Some(&handle) = self.instance_to_body.get(&part_id) else {
            return false;
        };
        let Some(body) = self.rigid_body_set.get_mut(handle) else {
            return false;
        };
        let pose = Isometry3::from_parts(
            nalgebra::Translation3::new(position[0], position[1], position[2]),
            rotation,
        );
        if body.is_kinematic() {
            body.set_next_kinematic_position(pose);
        } else {
            body.set_position(pose, true);
        }
        true
    }

    pub fn get_position(&self, handle: RigidBodyHandle) -> Option<[f32; 3]> {
        let body = self.rigid_body_set.get(handle)?;
        let pos = body.translation();
        Some([pos.x, pos.y, pos.z])
    }

    pub fn has_part(&self, part_id: u64) -> bool {
        self.instance_to_body.contains_key(&part_id) && !self.character_controllers.contains_key(&part_id)
    }

    /// Adds a character controller: a capsule plus one collider per limb.
    /// Characters only collide with static geometry, not other characters.
    pub fn add_character(
        &mut self,
        character_id: u64,
        position: [f32; 3],
        radius: f32,
        height: f32,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(vector![position[0], position[1], position[2]])
            .build();
        let body_handle = self.rigid_body_set.insert(body);

        // half-height is the cylinder part, total height = 2*half_height + 2*radius
        let half_height = (height - 2.0 * radius).max(0.0) / 2.0;
        let character_groups = InteractionGroups::new(GROUP_CHARACTER, GROUP_STATIC);
        let collider = ColliderBuilder::capsule_y(half_height, radius)
            .collision_groups(character_groups)
            .build();
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);
        self.collider_to_instance.insert(collider_handle, character_id);

        let mut limb_colliders = HashMap::new();
        for limb in LimbPart::ALL {
            let (half, center) = limb_layout(limb, radius, height);
            let limb_collider = ColliderBuilder::cuboid(half[0], half[1], half[2])
                .translation(vector![center[0], center[1], center[2]])
                .collision_groups(character_groups)
                .build();
            let handle = self.collider_set.insert_with_parent(
                limb_collider,
                body_handle,
                &mut self.rigid_body_set,
            );
            self.collider_to_instance.insert(handle, character_id);
            limb_colliders.insert(limb, handle);
        }

        let state = CharacterControllerState {
            collider_handle,
            body_handle,
            limb_colliders,
            vertical_velocity: 0.0,
            carried_velocity: Vector3::zeros(),
            grounded: false,
        };

        self.character_controllers.insert(character_id, state);
        self.instance_to_body.insert(character_id, body_handle);
        self.body_to_instance.insert(body_handle, character_id);

        body_handle
    }

    /// Current pose of a character's primary body
    pub fn character_pose(&self, character_id: u64) -> Option<AgentPose> {
        let state = self.character_controllers.get(&character_id)?;
        let body = self.rigid_body_set.get(state.body_handle)?;
        let pos = body.position();
        Some(AgentPose {
            character_id,
            position: Point3::from(pos.translation.vector),
            rotation: pos.rotation,
        })
    }

    /// Teleports a character to a specific position (clears its velocities)
    pub fn set_character_position(&mut self, character_id: u64, position: [f32; 3]) {
        if let Some(state) = self.character_controllers.get_mut(&character_id) {
            if let Some(body) = self.rigid_body_set.get_mut(state.body_handle) {
                body.set_translation(vector![position[0], position[1], position[2]], true);
            }
            state.vertical_velocity = 0.0;
            state.carried_velocity = Vector3::zeros();
        }
    }

    /// Gets the current position of a character
    pub fn get_character_position(&self, character_id: u64) -> Option<[f32; 3]> {
        let state = self.character_controllers.get(&character_id)?;
        let body = self.rigid_body_set.get(state.body_handle)?;
        let pos = body.translation();
        Some([pos.x, pos.y, pos.z])
    }

    /// Sets the facing yaw for a character controller body.
    pub fn set_character_yaw(&mut self, character_id: u64, yaw: f32) -> bool {
        let Some(state) = self.character_controllers.get(&character_id) else {
            return false;
        };
        let Some(body) = self.rigid_body_set.get_mut(state.body_handle) else {
            return false;
        };
        let rot = UnitQuaternion::from_euler_angles(0.0, yaw, 0.0);
        body.set_next_kinematic_rotation(rot);
        true
    }

    pub fn get_character_state(&self, character_id: u64) -> Option<&CharacterControllerState> {
        self.character_controllers.get(&character_id)
    }

    pub fn get_character_state_mut(
        &mut self,
        character_id: u64,
    ) -> Option<&mut CharacterControllerState> {
        self.character_controllers.get_mut(&character_id)
    }

    /// Collision groups currently in effect on one of a character's limbs
    pub fn limb_collision_groups(&self, character_id: u64, limb: LimbPart) -> Option<InteractionGroups> {
        let state = self.character_controllers.get(&character_id)?;
        let handle = state.limb_colliders.get(&limb)?;
        self.collider_set.get(*handle).map(|c| c.collision_groups())
    }

    /// Removes a character controller along with its attachments
    pub fn remove_character(&mut self, character_id: u64) -> bool {
        let Some(state) = self.character_controllers.remove(&character_id) else {
            return false;
        };
        self.instance_to_body.remove(&character_id);
        self.body_to_instance.remove(&state.body_handle);
        self.collider_to_instance.remove(&state.collider_handle);
        for handle in state.limb_colliders.values() {
            self.collider_to_instance.remove(handle);
            self.collision_overrides.remove(handle);
        }
        self.drop_attachments_on(character_id);
        self.rigid_body_set.remove(
            state.body_handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        true
    }

    pub fn has_character(&self, character_id: u64) -> bool {
        self.character_controllers.contains_key(&character_id)
    }

    pub fn attachment_count(&self) -> usize {
        self.attachments.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// World-space frame of an attachment
    pub fn attachment_world_frame(&self, attachment: AttachmentId) -> Option<Isometry3<f32>> {
        let a = self.attachments.get(&attachment)?;
        let body = self.rigid_body_set.get(a.body_handle)?;
        Some(body.position() * a.local_frame)
    }

    /// Drives kinematic bodies toward their constraint targets.
    ///
    /// Constraints act on the body owning `attachment0`. Dynamic bodies are
    /// skipped; their motion belongs to the rapier solver.
    pub fn solve_alignments(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let mut translations: HashMap<RigidBodyHandle, Vector3<f32>> = HashMap::new();
        let mut rotations: HashMap<RigidBodyHandle, UnitQuaternion<f32>> = HashMap::new();

        for constraint in self.constraints.values_mut() {
            let (Some(a0), Some(a1)) = (
                self.attachments.get(&constraint.attachment0),
                self.attachments.get(&constraint.attachment1),
            ) else {
                continue;
            };
            let (Some(body0), Some(body1)) = (
                self.rigid_body_set.get(a0.body_handle),
                self.rigid_body_set.get(a1.body_handle),
            ) else {
                continue;
            };
            if !body0.is_kinematic() {
                continue;
            }
            let frame0 = body0.position() * a0.local_frame;
            let frame1 = body1.position() * a1.local_frame;

            match constraint.kind {
                AlignKind::Position => {
                    let error = frame1.translation.vector - frame0.translation.vector;
                    let step = compliant_step(&mut constraint.velocity, error, &constraint.params, dt);
                    *translations.entry(a0.body_handle).or_insert_with(Vector3::zeros) += step;
                }
                AlignKind::Orientation => {
                    let delta = frame1.rotation * frame0.rotation.inverse();
                    let error = delta.scaled_axis();
                    let step = compliant_step(&mut constraint.velocity, error, &constraint.params, dt);
                    let entry = rotations
                        .entry(a0.body_handle)
                        .or_insert_with(UnitQuaternion::identity);
                    *entry = UnitQuaternion::from_scaled_axis(step) * *entry;
                }
            }
        }

        let bodies: HashSet<RigidBodyHandle> =
            translations.keys().chain(rotations.keys()).copied().collect();
        for handle in bodies {
            let Some(body) = self.rigid_body_set.get_mut(handle) else {
                continue;
            };
            let current = *body.position();
            let translation = translations.get(&handle).copied().unwrap_or_else(Vector3::zeros);
            let rotation = rotations.get(&handle).copied().unwrap_or_else(UnitQuaternion::identity);
            let next = Isometry3::from_parts(
                (current.translation.vector + translation).into(),
                rotation * current.rotation,
            );
            body.set_next_kinematic_position(next);
        }
    }

    /// Moves a character using the kinematic controller for full 3D translation.
    pub fn move_character(
        &mut self,
        character_id: u64,
        desired_translation: [f32; 3],
        dt: f32,
    ) -> Option<EffectiveCharacterMovement> {
        let state = self.character_controllers.get(&character_id)?;
        let body_handle = state.body_handle;
        let collider_handle = state.collider_handle;

        let body = self.rigid_body_set.get(body_handle)?;
        let collider = self.collider_set.get(collider_handle)?;
        let shape = collider.shape();
        let current_pos = *body.position();

        let controller = KinematicCharacterController {
            // Larger offset prevents getting stuck when sliding against surfaces
            offset: CharacterLength::Absolute(0.05),
            autostep: Some(CharacterAutostep {
                max_height: CharacterLength::Absolute(consts::AUTOSTEP_MAX_HEIGHT),
                min_width: CharacterLength::Absolute(consts::AUTOSTEP_MIN_WIDTH),
                include_dynamic_bodies: true,
            }),
            max_slope_climb_angle: 45.0_f32.to_radians(),
            min_slope_slide_angle: 30.0_f32.to_radians(),
            snap_to_ground: Some(CharacterLength::Absolute(consts::SNAP_TO_GROUND)),
            ..Default::default()
        };

        let desired = vector![desired_translation[0], desired_translation[1], desired_translation[2]];
        let filter = QueryFilter::default()
            .exclude_rigid_body(body_handle)
            .exclude_sensors()
            .groups(InteractionGroups::new(GROUP_STATIC, Group::ALL & !GROUP_CHARACTER));

        let movement = controller.move_shape(
            dt,
            &self.rigid_body_set,
            &self.collider_set,
            &self.query_pipeline,
            shape,
            &current_pos,
            desired,
            filter,
            |_collision| {},
        );

        // Scheduled for the next physics step
        let new_pos = current_pos.translation.vector + movement.translation;
        let body = self.rigid_body_set.get_mut(body_handle)?;
        body.set_next_kinematic_translation(new_pos);

        if let Some(state) = self.character_controllers.get_mut(&character_id) {
            state.grounded = movement.grounded;
        }
        Some(movement)
    }

    fn next_id(&mut self) -> u64 {
        self.next_handle_id += 1;
        self.next_handle_id
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RayCaster for PhysicsWorld {
    fn cast_ray(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        exclude_character: u64,
    ) -> Option<RayHit> {
        let ray = Ray::new(origin, direction);
        let mut filter = QueryFilter::default()
            .exclude_sensors()
            .groups(InteractionGroups::new(GROUP_CHARACTER, GROUP_STATIC));
        if let Some(state) = self.character_controllers.get(&exclude_character) {
            filter = filter.exclude_rigid_body(state.body_handle);
        }

        let (collider, intersection) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            filter,
        )?;
        let part_id = *self.collider_to_instance.get(&collider)?;
        Some(RayHit {
            part_id,
            position: ray.point_at(intersection.time_of_impact),
            normal: intersection.normal,
            climbable: self.is_climbable(part_id),
        })
    }
}

impl AttachmentHost for PhysicsWorld {
    fn instance_pose(&self, instance_id: u64) -> Option<Isometry3<f32>> {
        let handle = self.instance_to_body.get(&instance_id)?;
        self.rigid_body_set.get(*handle).map(|b| *b.position())
    }

    fn create_attachment(
        &mut self,
        instance_id: u64,
        local_frame: Isometry3<f32>,
    ) -> Result<AttachmentId, AttachError> {
        let body_handle = *self
            .instance_to_body
            .get(&instance_id)
            .ok_or(AttachError::UnknownInstance(instance_id))?;
        let id = AttachmentId(self.next_id());
        self.attachments.insert(
            id,
            Attachment {
                instance_id,
                body_handle,
                local_frame,
            },
        );
        Ok(id)
    }

    fn set_attachment_frame(
        &mut self,
        attachment: AttachmentId,
        local_frame: Isometry3<f32>,
    ) -> Result<(), AttachError> {
        let entry = self
            .attachments
            .get_mut(&attachment)
            .ok_or(AttachError::UnknownAttachment(attachment))?;
        entry.local_frame = local_frame;
        Ok(())
    }

    fn remove_attachment(&mut self, attachment: AttachmentId) -> Result<(), AttachError> {
        self.attachments
            .remove(&attachment)
            .map(|_| ())
            .ok_or(AttachError::UnknownAttachment(attachment))
    }

    fn create_constraint(
        &mut self,
        kind: AlignKind,
        attachment0: AttachmentId,
        attachment1: AttachmentId,
        params: AlignParams,
    ) -> Result<ConstraintId, AttachError> {
        for attachment in [attachment0, attachment1] {
            if !self.attachments.contains_key(&attachment) {
                return Err(AttachError::UnknownAttachment(attachment));
            }
        }
        let id = ConstraintId(self.next_id());
        self.constraints.insert(
            id,
            CompliantConstraint {
                kind,
                attachment0,
                attachment1,
                params,
                velocity: Vector3::zeros(),
            },
        );
        Ok(id)
    }

    fn remove_constraint(&mut self, constraint: ConstraintId) -> Result<(), AttachError> {
        self.constraints
            .remove(&constraint)
            .map(|_| ())
            .ok_or(AttachError::UnknownConstraint(constraint))
    }

    fn apply_collision_mask(&mut self, character_id: u64, limbs: &[LimbPart]) {
        let Some(state) = self.character_controllers.get(&character_id) else {
            warn!(character_id, "collision mask for unknown character");
            return;
        };
        for limb in limbs {
            let Some(&handle) = state.limb_colliders.get(limb) else {
                continue;
            };
            let Some(collider) = self.collider_set.get_mut(handle) else {
                continue;
            };
            self.collision_overrides
                .entry(handle)
                .or_insert_with(|| collider.collision_groups());
            collider.set_collision_groups(InteractionGroups::new(GROUP_CHARACTER, Group::NONE));
        }
    }

    fn revert_collision_mask(&mut self, character_id: u64, limbs: &[LimbPart]) {
        let Some(state) = self.character_controllers.get(&character_id) else {
            return;
        };
        for limb in limbs {
            let Some(&handle) = state.limb_colliders.get(limb) else {
                continue;
            };
            let Some(previous) = self.collision_overrides.remove(&handle) else {
                continue;
            };
            if let Some(collider) = self.collider_set.get_mut(handle) {
                collider.set_collision_groups(previous);
            }
        }
    }
}
