//! Interfaces the climb state consumes from the engine: world ray queries,
//! attachment/constraint bookkeeping, collision masking, and animation.

use nalgebra::{Isometry3, Point3, Vector3};
use serde::Deserialize;

/// Raw result of a world ray query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Part id of the struck geometry.
    pub part_id: u64,
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    /// Whether the struck part is tagged climbable.
    pub climbable: bool,
}

/// Read-only world query service.
pub trait RayCaster {
    /// Casts a ray of `max_distance` along `direction` (unit length), ignoring
    /// every collider of `exclude_character`.
    fn cast_ray(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_distance: f32,
        exclude_character: u64,
    ) -> Option<RayHit>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttachmentId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId(pub u64);

/// Which part of the relative transform a compliant constraint drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignKind {
    Position,
    Orientation,
}

/// Compliant constraint tuning.
///
/// For orientation constraints `max_force` bounds torque and `max_velocity`
/// is an angular speed in rad/s.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AlignParams {
    pub max_force: f32,
    pub responsiveness: f32,
    pub max_velocity: f32,
}

/// Named limb parts of a character, used for collision masking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimbPart {
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl LimbPart {
    pub const ALL: [LimbPart; 4] = [
        LimbPart::LeftArm,
        LimbPart::RightArm,
        LimbPart::LeftLeg,
        LimbPart::RightLeg,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LimbPart::LeftArm => "LeftArm",
            LimbPart::RightArm => "RightArm",
            LimbPart::LeftLeg => "LeftLeg",
            LimbPart::RightLeg => "RightLeg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AttachError {
    #[error("no physics body for instance {0}")]
    UnknownInstance(u64),
    #[error("unknown attachment {0:?}")]
    UnknownAttachment(AttachmentId),
    #[error("unknown constraint {0:?}")]
    UnknownConstraint(ConstraintId),
}

/// Engine-owned attachments, compliant constraints, and collision masks.
///
/// Attachments are frames fixed in an instance's local space; instances are
/// parts or characters, addressed by id.
pub trait AttachmentHost {
    fn instance_pose(&self, instance_id: u64) -> Option<Isometry3<f32>>;

    fn create_attachment(
        &mut self,
        instance_id: u64,
        local_frame: Isometry3<f32>,
    ) -> Result<AttachmentId, AttachError>;

    fn set_attachment_frame(
        &mut self,
        attachment: AttachmentId,
        local_frame: Isometry3<f32>,
    ) -> Result<(), AttachError>;

    fn remove_attachment(&mut self, attachment: AttachmentId) -> Result<(), AttachError>;

    /// Creates a constraint pulling `attachment0`'s owner until its frame
    /// matches `attachment1`.
    fn create_constraint(
        &mut self,
        kind: AlignKind,
        attachment0: AttachmentId,
        attachment1: AttachmentId,
        params: AlignParams,
    ) -> Result<ConstraintId, AttachError>;

    fn remove_constraint(&mut self, constraint: ConstraintId) -> Result<(), AttachError>;

    fn apply_collision_mask(&mut self, character_id: u64, limbs: &[LimbPart]);

    fn revert_collision_mask(&mut self, character_id: u64, limbs: &[LimbPart]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocomotionState {
    Neutral,
    Climbing,
}

impl LocomotionState {
    pub fn name(&self) -> &'static str {
        match self {
            LocomotionState::Neutral => "Neutral",
            LocomotionState::Climbing => "Climbing",
        }
    }
}

/// Animation collaborator.
pub trait Animator {
    fn set_locomotion_state(&mut self, state: LocomotionState);
    fn scale_playback_rate(&mut self, factor: f32);
}
