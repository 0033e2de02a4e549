//! In-memory host used by the climbing unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};

use super::host::{
    AlignKind, AlignParams, Animator, AttachError, AttachmentHost, AttachmentId, ConstraintId,
    LimbPart, LocomotionState, RayCaster, RayHit,
};
use super::AgentPose;

pub(crate) const AGENT_ID: u64 = 1;

pub(crate) fn agent_at(x: f32, y: f32, z: f32) -> AgentPose {
    AgentPose {
        character_id: AGENT_ID,
        position: Point3::new(x, y, z),
        rotation: UnitQuaternion::identity(),
    }
}

/// A climbable wall facing +Z, struck `distance` ahead of an agent at the origin.
pub(crate) fn wall_hit(part_id: u64, distance: f32) -> RayHit {
    RayHit {
        part_id,
        position: Point3::new(0.0, 0.0, -distance),
        normal: Vector3::z(),
        climbable: true,
    }
}

#[derive(Debug, Clone)]
pub(crate) struct MockConstraint {
    pub kind: AlignKind,
    pub attachment0: AttachmentId,
    pub attachment1: AttachmentId,
    pub params: AlignParams,
}

/// Scripted ray results plus attachment/constraint/mask bookkeeping.
///
/// Downward rays see `floor_hit`; every other ray sees `forward_hit`. A
/// scripted hit is only reported when it lies within the ray's reach.
#[derive(Default)]
pub(crate) struct MockHost {
    forward_hit: Option<(RayHit, f32)>,
    floor_hit: Option<(RayHit, f32)>,
    casts: RefCell<Vec<(Point3<f32>, Vector3<f32>, f32, u64)>>,
    pub poses: HashMap<u64, Isometry3<f32>>,
    pub attachments: BTreeMap<AttachmentId, (u64, Isometry3<f32>)>,
    pub constraints: BTreeMap<ConstraintId, MockConstraint>,
    pub masked: HashSet<(u64, LimbPart)>,
    pub mask_applications: usize,
    pub fail_constraint: Option<AlignKind>,
    next_id: u64,
}

impl MockHost {
    pub fn new() -> Self {
        let mut host = Self::default();
        host.poses.insert(AGENT_ID, Isometry3::identity());
        host
    }

    pub fn set_forward_hit(&mut self, hit: RayHit, distance: f32) {
        self.poses.entry(hit.part_id).or_insert_with(Isometry3::identity);
        self.forward_hit = Some((hit, distance));
    }

    pub fn clear_forward_hit(&mut self) {
        self.forward_hit = None;
    }

    pub fn set_floor_hit(&mut self, hit: RayHit, distance: f32) {
        self.floor_hit = Some((hit, distance));
    }

    pub fn casts(&self) -> Vec<(Point3<f32>, Vector3<f32>, f32, u64)> {
        self.casts.borrow().clone()
    }

    pub fn attachments_on(&self, instance_id: u64) -> Vec<(AttachmentId, Isometry3<f32>)> {
        self.attachments
            .iter()
            .filter(|(_, (owner, _))| *owner == instance_id)
            .map(|(id, (_, frame))| (*id, *frame))
            .collect()
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl RayCaster for MockHost {
    fn cast_ray(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        exclude_character: u64,
    ) -> Option<RayHit> {
        self.casts
            .borrow_mut()
            .push((origin, direction, max_distance, exclude_character));
        let scripted = if direction.y < -0.9 {
            self.floor_hit
        } else {
            self.forward_hit
        };
        scripted
            .filter(|(_, distance)| *distance <= max_distance)
            .map(|(hit, _)| hit)
    }
}

impl AttachmentHost for MockHost {
    fn instance_pose(&self, instance_id: u64) -> Option<Isometry3<f32>> {
        self.poses.get(&instance_id).copied()
    }

    fn create_attachment(
        &mut self,
        instance_id: u64,
        local_frame: Isometry3<f32>,
    ) -> Result<AttachmentId, AttachError> {
        if !self.poses.contains_key(&instance_id) {
            return Err(AttachError::UnknownInstance(instance_id));
        }
        let id = AttachmentId(self.next());
        self.attachments.insert(id, (instance_id, local_frame));
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
        entry.1 = local_frame;
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
        if self.fail_constraint == Some(kind) {
            return Err(AttachError::UnknownAttachment(attachment1));
        }
        let id = ConstraintId(self.next());
        self.constraints.insert(
            id,
            MockConstraint {
                kind,
                attachment0,
                attachment1,
                params,
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
        self.mask_applications += 1;
        for limb in limbs {
            self.masked.insert((character_id, *limb));
        }
    }

    fn revert_collision_mask(&mut self, character_id: u64, limbs: &[LimbPart]) {
        for limb in limbs {
            self.masked.remove(&(character_id, *limb));
        }
    }
}

#[derive(Debug)]
pub(crate) struct RecordingAnimator {
    pub state: LocomotionState,
    pub rate: f32,
    pub states: Vec<LocomotionState>,
}

impl RecordingAnimator {
    pub fn new() -> Self {
        Self {
            state: LocomotionState::Neutral,
            rate: 1.0,
            states: Vec::new(),
        }
    }
}

impl Animator for RecordingAnimator {
    fn set_locomotion_state(&mut self, state: LocomotionState) {
        self.state = state;
        self.states.push(state);
    }

    fn scale_playback_rate(&mut self, factor: f32) {
        self.rate = factor;
    }
}
