//! Game physics and climbing constants.
//! Centralizing these keeps the config defaults and the engine in agreement.

/// Physics constants
pub mod physics {
    /// Default gravity in studs/s²
    pub const DEFAULT_GRAVITY: f32 = 30.0;

    /// Fixed timestep for physics simulation (60 Hz)
    pub const TIMESTEP: f32 = 1.0 / 60.0;

    /// Character walk speed in studs/second
    pub const WALK_SPEED: f32 = 16.0;

    /// Character capsule radius
    pub const CHARACTER_RADIUS: f32 = 0.5;

    /// Character capsule total height
    pub const CHARACTER_HEIGHT: f32 = 2.0;

    /// Character controller autostep max height
    pub const AUTOSTEP_MAX_HEIGHT: f32 = 1.0;

    /// Character controller autostep min width (very small for platform edges)
    pub const AUTOSTEP_MIN_WIDTH: f32 = 0.01;

    /// Character controller snap to ground distance
    pub const SNAP_TO_GROUND: f32 = 0.2;

    /// Mass used to turn a constraint's max force into an acceleration bound
    pub const AGENT_MASS: f32 = 1.0;

    /// Jump height reached from a standing jump (studs)
    pub const JUMP_HEIGHT: f32 = 7.2;

    /// Small epsilon for float comparisons
    pub const EPSILON: f32 = 0.001;
}

/// Humanoid dispatcher constants
pub mod humanoid {
    /// Horizontal push away from the wall when jumping off it (studs/s)
    pub const WALL_JUMP_PUSH: f32 = 8.0;
}

/// Climbing defaults (used by `ClimbConfig`)
pub mod climbing {
    /// Seconds after leaving (or entering) the climb before it may be re-entered
    pub const DEBOUNCE_SECS: f64 = 0.5;

    /// Forward reach when first grabbing a wall
    pub const INITIAL_REACH: f32 = 3.0;

    /// Forward reach while holding a wall
    pub const MAINTAIN_REACH: f32 = 2.0;

    /// Downward reach of the floor probe from the ground-sensing point
    pub const FLOOR_PROBE_DISTANCE: f32 = 1.0;

    /// Forward probe origin, in agent-local space
    pub const FORWARD_PROBE_OFFSET: [f32; 3] = [0.0, 0.0, -0.5];

    /// Ground-sensing point, in agent-local space (capsule bottom)
    pub const GROUND_SENSOR_OFFSET: [f32; 3] = [0.0, -1.0, 0.0];

    /// Steepness at or above which a surface counts as floor-like
    pub const FLATNESS_BOUND: f32 = 0.6;

    /// Steepness at or below which a surface counts as overhanging
    pub const OVERHANG_BOUND: f32 = -0.5;

    /// Accumulated danger that forces a fall
    pub const DANGER_THRESHOLD: f32 = 1.0;

    /// Forward speed handed to the fallback state when running off an edge
    pub const EDGE_IMPULSE: f32 = 6.0;

    /// Playback rate per unit of vertical intent
    pub const PLAYBACK_RATE_SCALE: f32 = 2.0;

    /// How far ahead of the latest hit the tracking anchor leads the agent
    pub const CLIMB_LEAD: f32 = 1.5;

    /// Agent-side anchor, in agent-local space (just in front of the chest)
    pub const AGENT_ANCHOR_OFFSET: [f32; 3] = [0.0, 0.0, -0.6];

    pub const POSITION_MAX_FORCE: f32 = 400.0;
    pub const POSITION_RESPONSIVENESS: f32 = 25.0;
    pub const POSITION_MAX_VELOCITY: f32 = 10.0;

    pub const ORIENTATION_MAX_TORQUE: f32 = 200.0;
    pub const ORIENTATION_RESPONSIVENESS: f32 = 20.0;
    pub const ORIENTATION_MAX_ANGULAR_VELOCITY: f32 = 12.0;
}
