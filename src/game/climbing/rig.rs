//! Turns a sensed surface into anchors and compliant constraints that hold the agent on it.

use std::f32::consts::PI;

use nalgebra::{Isometry3, Matrix3, Rotation3, Translation3, UnitQuaternion, Vector3};
use tracing::{debug, warn};

use super::host::{AlignKind, AttachError, AttachmentHost, AttachmentId, ConstraintId, LimbPart};
use super::probe::SurfaceHit;
use super::AgentPose;
use crate::config::AttachmentConfig;

/// Orientation whose forward (-Z) axis is the surface normal.
///
/// Right is `normal × world_up` and up is re-derived as `right × normal`.
/// When the normal is parallel to world up (floors, ceilings) that cross
/// product vanishes, so world -Z stands in for world up and the roll is
/// fixed rather than undefined.
pub fn compute_surface_frame(hit: &SurfaceHit) -> UnitQuaternion<f32> {
    let look = hit.normal;
    let mut right = look.cross(&Vector3::y());
    if right.norm_squared() < 1.0e-8 {
        right = look.cross(&-Vector3::z());
    }
    let right = right.normalize();
    let up = right.cross(&look).normalize();
    let basis = Matrix3::from_columns(&[right, up, -look]);
    UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(basis))
}

/// Live attachment resources of one climb.
///
/// Holds the surface only by id; the part itself belongs to the world.
#[derive(Debug, PartialEq)]
pub struct ClimbSession {
    character_id: u64,
    surface_id: u64,
    agent_anchor: AttachmentId,
    surface_anchor: AttachmentId,
    align_position: ConstraintId,
    align_orientation: ConstraintId,
    masked_limbs: Vec<LimbPart>,
}

impl ClimbSession {
    pub fn character_id(&self) -> u64 {
        self.character_id
    }

    pub fn surface_id(&self) -> u64 {
        self.surface_id
    }

    pub fn agent_anchor(&self) -> AttachmentId {
        self.agent_anchor
    }

    pub fn surface_anchor(&self) -> AttachmentId {
        self.surface_anchor
    }

    pub fn constraints(&self) -> [ConstraintId; 2] {
        [self.align_position, self.align_orientation]
    }
}

/// Either every attachment resource of a climb exists, or none does.
#[derive(Debug, Default, PartialEq)]
pub enum Session {
    #[default]
    Idle,
    Active(ClimbSession),
}

impl Session {
    pub fn is_active(&self) -> bool {
        matches!(self, Session::Active(_))
    }

    pub fn active(&self) -> Option<&ClimbSession> {
        match self {
            Session::Active(session) => Some(session),
            Session::Idle => None,
        }
    }

    pub fn take(&mut self) -> Option<ClimbSession> {
        match std::mem::take(self) {
            Session::Active(session) => Some(session),
            Session::Idle => None,
        }
    }
}

/// Resources created so far while building a session.
#[derive(Default)]
struct Partial {
    attachments: Vec<AttachmentId>,
    constraints: Vec<ConstraintId>,
}

impl Partial {
    fn unwind<H: AttachmentHost + ?Sized>(self, host: &mut H) {
        for constraint in self.constraints {
            let _ = host.remove_constraint(constraint);
        }
        for attachment in self.attachments {
            let _ = host.remove_attachment(attachment);
        }
    }
}

/// Realizes a sensed surface as compliant constraints between the agent and the wall.
#[derive(Debug, Clone)]
pub struct AttachmentRig {
    config: AttachmentConfig,
    limb_mask: Vec<LimbPart>,
}

impl AttachmentRig {
    pub fn new(config: AttachmentConfig, limb_mask: Vec<LimbPart>) -> Self {
        Self { config, limb_mask }
    }

    /// Agent-side anchor. The half turn makes the agent face into the wall
    /// once its anchor is aligned with the outward-facing surface frame.
    fn agent_anchor_frame(&self) -> Isometry3<f32> {
        Isometry3::from_parts(
            Translation3::from(Vector3::from(self.config.agent_offset)),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), PI),
        )
    }

    /// Hit frame shifted by a world-space offset, in the surface's local space.
    fn surface_local_frame<H: AttachmentHost + ?Sized>(
        &self,
        host: &H,
        hit: &SurfaceHit,
        offset: Vector3<f32>,
    ) -> Result<Isometry3<f32>, AttachError> {
        let surface_pose = host
            .instance_pose(hit.part_id)
            .ok_or(AttachError::UnknownInstance(hit.part_id))?;
        let world = Isometry3::from_parts(
            Translation3::from(hit.position.coords + offset),
            compute_surface_frame(hit),
        );
        Ok(surface_pose.inverse() * world)
    }

    /// Creates both anchors and both constraints, then masks the limbs.
    /// On failure everything created so far is released again.
    pub fn create_session<H: AttachmentHost + ?Sized>(
        &self,
        host: &mut H,
        agent: &AgentPose,
        hit: &SurfaceHit,
    ) -> Result<ClimbSession, AttachError> {
        let mut partial = Partial::default();
        match self.build_session(host, agent, hit, &mut partial) {
            Ok(session) => {
                host.apply_collision_mask(agent.character_id, &self.limb_mask);
                debug!(
                    character_id = agent.character_id,
                    surface_id = hit.part_id,
                    "climb session created"
                );
                Ok(session)
            }
            Err(e) => {
                warn!(
                    character_id = agent.character_id,
                    surface_id = hit.part_id,
                    error = %e,
                    "climb session rolled back"
                );
                partial.unwind(host);
                Err(e)
            }
        }
    }

    fn build_session<H: AttachmentHost + ?Sized>(
        &self,
        host: &mut H,
        agent: &AgentPose,
        hit: &SurfaceHit,
        partial: &mut Partial,
    ) -> Result<ClimbSession, AttachError> {
        let surface_frame = self.surface_local_frame(host, hit, Vector3::zeros())?;

        let agent_anchor = host.create_attachment(agent.character_id, self.agent_anchor_frame())?;
        partial.attachments.push(agent_anchor);
        let surface_anchor = host.create_attachment(hit.part_id, surface_frame)?;
        partial.attachments.push(surface_anchor);

        let align_position = host.create_constraint(
            AlignKind::Position,
            agent_anchor,
            surface_anchor,
            self.config.position,
        )?;
        partial.constraints.push(align_position);
        let align_orientation = host.create_constraint(
            AlignKind::Orientation,
            agent_anchor,
            surface_anchor,
            self.config.orientation,
        )?;
        partial.constraints.push(align_orientation);

        Ok(ClimbSession {
            character_id: agent.character_id,
            surface_id: hit.part_id,
            agent_anchor,
            surface_anchor,
            align_position,
            align_orientation,
            masked_limbs: self.limb_mask.clone(),
        })
    }

    /// Moves the surface-side anchor to `hit`, displaced by the world-space
    /// `offset`; the result is stored in the held surface's local space.
    pub fn update_tracking_frame<H: AttachmentHost + ?Sized>(
        &self,
        host: &mut H,
        session: &ClimbSession,
        hit: &SurfaceHit,
        offset: Vector3<f32>,
    ) -> Result<(), AttachError> {
        debug_assert_eq!(hit.part_id, session.surface_id);
        let frame = self.surface_local_frame(host, hit, offset)?;
        host.set_attachment_frame(session.surface_anchor, frame)
    }

    /// Releases every resource of the session and reverts the limb mask.
    pub fn destroy_session<H: AttachmentHost + ?Sized>(&self, host: &mut H, session: ClimbSession) {
        host.revert_collision_mask(session.character_id, &session.masked_limbs);
        for constraint in [session.align_position, session.align_orientation] {
            if let Err(e) = host.remove_constraint(constraint) {
                warn!(error = %e, "climb constraint already released");
            }
        }
        for attachment in [session.agent_anchor, session.surface_anchor] {
            if let Err(e) = host.remove_attachment(attachment) {
                warn!(error = %e, "climb attachment already released");
            }
        }
        debug!(
            character_id = session.character_id,
            surface_id = session.surface_id,
            "climb session destroyed"
        );
    }
}
