//! Climbing locomotion state.
//!
//! `SurfaceProbe` senses climbable geometry, `AttachmentRig` turns a sensed
//! surface into compliant constraints, and `ClimbPolicy` decides each tick
//! whether the agent stays on the wall. The owning dispatcher drives the
//! policy through `can_enter` → `enter` → `step` → `leave`.

mod host;
mod policy;
mod probe;
mod rig;

#[cfg(test)]
pub(crate) mod testing;

use nalgebra::{Point3, UnitQuaternion, Vector3};

pub use host::{
    AlignKind, AlignParams, Animator, AttachError, AttachmentHost, AttachmentId, ConstraintId,
    LimbPart, LocomotionState, RayCaster, RayHit,
};
pub use policy::{ClimbPolicy, ClimbTransition};
pub use probe::{Detection, Reach, SurfaceHit, SurfaceProbe};
pub use rig::{compute_surface_frame, AttachmentRig, ClimbSession, Session};

/// World-space pose of the agent's primary body, sampled by the host each tick.
#[derive(Debug, Clone, Copy)]
pub struct AgentPose {
    pub character_id: u64,
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl AgentPose {
    /// Local -Z in world space.
    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * -Vector3::z()
    }

    pub fn up(&self) -> Vector3<f32> {
        self.rotation * Vector3::y()
    }

    pub fn right(&self) -> Vector3<f32> {
        self.rotation * Vector3::x()
    }

    /// Transforms an agent-local offset into a world-space point.
    pub fn local_point(&self, offset: [f32; 3]) -> Point3<f32> {
        self.position + self.rotation * Vector3::from(offset)
    }
}

/// Decoded per-tick movement input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovementIntent {
    /// Sideways input, positive to the agent's right.
    pub lateral: f32,
    /// Up/down input while climbing; forward/back on the ground.
    pub vertical: f32,
    pub jump: bool,
}

impl MovementIntent {
    pub fn new(lateral: f32, vertical: f32, jump: bool) -> Self {
        Self {
            lateral,
            vertical,
            jump,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.lateral == 0.0 && self.vertical == 0.0
    }
}
