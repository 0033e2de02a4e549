//! Per-tick climbing decisions: entry debounce, steepness tolerance and exits.

use nalgebra::Vector3;
use tracing::{debug, trace, warn};

use super::host::{Animator, AttachError, AttachmentHost, LocomotionState, RayCaster};
use super::probe::{Reach, SurfaceHit, SurfaceProbe};
use super::rig::{AttachmentRig, Session};
use super::{AgentPose, MovementIntent};
use crate::config::ClimbConfig;

/// Slack for rounding in the danger sum.
const DANGER_TOLERANCE: f64 = 1e-6;

/// Transition requested by `ClimbPolicy::step`, applied by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClimbTransition {
    /// Leave the climb for the grounded/falling state, optionally carrying
    /// an outward impulse hint.
    Fallback { impulse: Option<Vector3<f32>> },
    /// Leave and re-enter the climb against a different surface.
    Reenter(SurfaceHit),
}

/// The climbing state: debounce, steepness tolerance, and the per-tick
/// decision to stay, move along, switch surfaces, or let go.
#[derive(Debug)]
pub struct ClimbPolicy {
    config: ClimbConfig,
    probe: SurfaceProbe,
    rig: AttachmentRig,
    session: Session,
    danger: f64,
    last_transition_at: Option<f64>,
}

impl ClimbPolicy {
    pub fn new(config: ClimbConfig) -> Self {
        let probe = SurfaceProbe::new(config.probe.clone());
        let rig = AttachmentRig::new(config.attachment.clone(), config.limb_mask.clone());
        Self {
            config,
            probe,
            rig,
            session: Session::Idle,
            danger: 0.0,
            last_transition_at: None,
        }
    }

    pub fn config(&self) -> &ClimbConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_climbing(&self) -> bool {
        self.session.is_active()
    }

    pub fn danger(&self) -> f32 {
        self.danger as f32
    }

    pub fn last_transition_at(&self) -> Option<f64> {
        self.last_transition_at
    }

    fn debounce_elapsed(&self, now: f64) -> bool {
        self.last_transition_at
            .map_or(true, |at| now - at >= self.config.debounce_secs)
    }

    /// Returns the surface to climb, if the cool-down has passed and a
    /// climbable wall is within initial reach.
    pub fn can_enter<W: RayCaster + ?Sized>(
        &self,
        world: &W,
        agent: &AgentPose,
        now: f64,
    ) -> Option<SurfaceHit> {
        if !self.debounce_elapsed(now) {
            return None;
        }
        self.probe.forward(world, agent, Reach::Initial)
    }

    /// Attaches to `hit`.
    ///
    /// # Panics
    ///
    /// If a session is already active; the dispatcher must `leave` first.
    pub fn enter<H, A>(
        &mut self,
        host: &mut H,
        animator: &mut A,
        agent: &AgentPose,
        hit: SurfaceHit,
        now: f64,
    ) -> Result<(), AttachError>
    where
        H: AttachmentHost + ?Sized,
        A: Animator + ?Sized,
    {
        assert!(
            !self.session.is_active(),
            "climb entered while a session is still active"
        );
        debug_assert!((hit.normal.norm() - 1.0).abs() < 1.0e-3);

        self.last_transition_at = Some(now);
        self.danger = 0.0;
        let session = self.rig.create_session(host, agent, &hit)?;
        self.session = Session::Active(session);
        animator.set_locomotion_state(LocomotionState::Climbing);
        debug!(
            character_id = agent.character_id,
            surface_id = hit.part_id,
            now,
            "entered climb"
        );
        Ok(())
    }

    /// Advances one tick. Checks run in priority order and the first one
    /// that fires returns its transition.
    pub fn step<H, A>(
        &mut self,
        host: &mut H,
        animator: &mut A,
        agent: &AgentPose,
        now: f64,
        dt: f32,
        intent: MovementIntent,
    ) -> Option<ClimbTransition>
    where
        H: RayCaster + AttachmentHost + ?Sized,
        A: Animator + ?Sized,
    {
        if intent.jump && self.debounce_elapsed(now) {
            debug!(character_id = agent.character_id, "jumped off wall");
            return Some(ClimbTransition::Fallback { impulse: None });
        }

        if intent.vertical < 0.0 && self.probe.floor_near(&*host, agent) {
            debug!(character_id = agent.character_id, "climbed down to floor");
            return Some(ClimbTransition::Fallback { impulse: None });
        }

        if self.danger + DANGER_TOLERANCE >= f64::from(self.config.steepness.danger_threshold) {
            debug!(
                character_id = agent.character_id,
                danger = self.danger,
                "surface out of tolerance for too long"
            );
            return Some(ClimbTransition::Fallback { impulse: None });
        }

        let Some(hit) = self.probe.forward(&*host, agent, Reach::Maintain) else {
            debug!(character_id = agent.character_id, "ran off climbable surface");
            return Some(ClimbTransition::Fallback {
                impulse: Some(agent.forward() * self.config.edge_impulse),
            });
        };

        self.accumulate_danger(&hit, dt);

        animator.scale_playback_rate(intent.vertical * self.config.playback_rate_scale);

        let Some(session) = self.session.active() else {
            warn!(character_id = agent.character_id, "climb step without a session");
            return Some(ClimbTransition::Fallback { impulse: None });
        };

        if session.surface_id() != hit.part_id {
            debug!(
                character_id = agent.character_id,
                from = session.surface_id(),
                to = hit.part_id,
                "switching climb surface"
            );
            return Some(ClimbTransition::Reenter(hit));
        }

        if !intent.is_idle() {
            let offset = (agent.up() * intent.vertical + agent.right() * intent.lateral)
                * self.config.climb_lead;
            if let Err(e) = self.rig.update_tracking_frame(host, session, &hit, offset) {
                warn!(character_id = agent.character_id, error = %e, "lost held surface");
                return Some(ClimbTransition::Fallback { impulse: None });
            }
        }

        None
    }

    /// Grows the danger accumulator while the surface is too flat or too
    /// overhanging, and drains it otherwise. Never drops below zero.
    fn accumulate_danger(&mut self, hit: &SurfaceHit, dt: f32) {
        let steepness = hit.steepness();
        let band = &self.config.steepness;
        if steepness >= band.flatness_bound || steepness <= band.overhang_bound {
            self.danger += f64::from(dt) * f64::from(steepness.abs());
        } else {
            self.danger = (self.danger - f64::from(dt)).max(0.0);
        }
        trace!(steepness, danger = self.danger, "steepness bookkeeping");
    }

    /// Detaches from the wall. Tolerates being called without a live session.
    pub fn leave<H, A>(&mut self, host: &mut H, animator: &mut A, now: f64)
    where
        H: AttachmentHost + ?Sized,
        A: Animator + ?Sized,
    {
        match self.session.take() {
            Some(session) => {
                debug!(
                    character_id = session.character_id(),
                    surface_id = session.surface_id(),
                    now,
                    "left climb"
                );
                self.rig.destroy_session(host, session);
            }
            None => warn!("leave called without an active climb session"),
        }
        self.danger = 0.0;
        self.last_transition_at = Some(now);
        animator.scale_playback_rate(1.0);
        animator.set_locomotion_state(LocomotionState::Neutral);
    }
}
