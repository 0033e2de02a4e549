use tracing::trace;

use super::climbing::{Animator, LocomotionState};

/// Loop length in seconds for each locomotion state's track.
pub fn default_track_length_seconds(state: LocomotionState) -> f32 {
    match state {
        LocomotionState::Neutral => 1.2,
        LocomotionState::Climbing => 0.9,
    }
}

/// Looping locomotion track driven by the humanoid's state.
///
/// The climb track plays backwards when the agent climbs down, so the
/// playback speed is signed and the time position wraps in both directions.
#[derive(Debug, Clone)]
pub struct LocomotionAnimator {
    state: LocomotionState,
    length: f32,
    speed: f32,
    time_position: f32,
}

impl LocomotionAnimator {
    pub fn new() -> Self {
        Self {
            state: LocomotionState::Neutral,
            length: default_track_length_seconds(LocomotionState::Neutral),
            speed: 1.0,
            time_position: 0.0,
        }
    }

    pub fn state(&self) -> LocomotionState {
        self.state
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn time_position(&self) -> f32 {
        self.time_position
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    /// Advances the track by `delta_time` seconds at the current speed.
    pub fn tick(&mut self, delta_time: f32) {
        let dt = delta_time.max(0.0);
        self.time_position = (self.time_position + dt * self.speed).rem_euclid(self.length);
    }
}

impl Default for LocomotionAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl Animator for LocomotionAnimator {
    fn set_locomotion_state(&mut self, state: LocomotionState) {
        if state == self.state {
            return;
        }
        trace!(from = self.state.name(), to = state.name(), "locomotion track change");
        self.state = state;
        self.length = default_track_length_seconds(state).max(0.01);
        self.time_position = 0.0;
        self.speed = 1.0;
    }

    fn scale_playback_rate(&mut self, factor: f32) {
        self.speed = factor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_loops_forward() {
        let mut animator = LocomotionAnimator::new();
        animator.tick(1.5);
        assert!((animator.time_position() - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_negative_rate_plays_backwards() {
        let mut animator = LocomotionAnimator::new();
        animator.set_locomotion_state(LocomotionState::Climbing);
        animator.scale_playback_rate(-2.0);
        animator.tick(0.1);
        assert!((animator.time_position() - 0.7).abs() < 1e-5);
        assert!(animator.time_position() < animator.length());
    }

    #[test]
    fn test_zero_rate_holds_pose() {
        let mut animator = LocomotionAnimator::new();
        animator.set_locomotion_state(LocomotionState::Climbing);
        animator.tick(0.2);
        animator.scale_playback_rate(0.0);
        let held = animator.time_position();
        animator.tick(0.5);
        assert_eq!(animator.time_position(), held);
    }

    #[test]
    fn test_state_change_restarts_track() {
        let mut animator = LocomotionAnimator::new();
        animator.tick(0.4);
        animator.set_locomotion_state(LocomotionState::Climbing);
        assert_eq!(animator.state(), LocomotionState::Climbing);
        assert_eq!(animator.time_position(), 0.0);
        assert_eq!(animator.speed(), 1.0);

        // Same state again keeps the running track.
        animator.scale_playback_rate(2.0);
        animator.set_locomotion_state(LocomotionState::Climbing);
        assert_eq!(animator.speed(), 2.0);
    }
}
