//! Climbing configuration parsing from climb.toml files

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::game::climbing::{AlignParams, LimbPart};
use crate::game::constants::climbing as defaults;

/// Forward and floor probe configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Forward reach when first grabbing a wall
    pub initial_reach: f32,
    /// Forward reach while holding a wall
    pub maintain_reach: f32,
    /// Downward reach of the floor probe
    pub floor_distance: f32,
    /// Forward probe origin in agent-local space
    pub forward_offset: [f32; 3],
    /// Ground-sensing point in agent-local space
    pub ground_offset: [f32; 3],
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            initial_reach: defaults::INITIAL_REACH,
            maintain_reach: defaults::MAINTAIN_REACH,
            floor_distance: defaults::FLOOR_PROBE_DISTANCE,
            forward_offset: defaults::FORWARD_PROBE_OFFSET,
            ground_offset: defaults::GROUND_SENSOR_OFFSET,
        }
    }
}

/// Steepness tolerance section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SteepnessConfig {
    pub flatness_bound: f32,
    pub overhang_bound: f32,
    pub danger_threshold: f32,
}

impl Default for SteepnessConfig {
    fn default() -> Self {
        Self {
            flatness_bound: defaults::FLATNESS_BOUND,
            overhang_bound: defaults::OVERHANG_BOUND,
            danger_threshold: defaults::DANGER_THRESHOLD,
        }
    }
}

/// Attachment rig section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AttachmentConfig {
    /// Agent-side anchor in agent-local space
    pub agent_offset: [f32; 3],
    /// Compliant position constraint
    pub position: AlignParams,
    /// Compliant orientation constraint (max_force acts as max torque)
    pub orientation: AlignParams,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            agent_offset: defaults::AGENT_ANCHOR_OFFSET,
            position: AlignParams {
                max_force: defaults::POSITION_MAX_FORCE,
                responsiveness: defaults::POSITION_RESPONSIVENESS,
                max_velocity: defaults::POSITION_MAX_VELOCITY,
            },
            orientation: AlignParams {
                max_force: defaults::ORIENTATION_MAX_TORQUE,
                responsiveness: defaults::ORIENTATION_RESPONSIVENESS,
                max_velocity: defaults::ORIENTATION_MAX_ANGULAR_VELOCITY,
            },
        }
    }
}

/// Climbing configuration from climb.toml
#[derive(Debug, Clone, Deserialize)]
pub struct ClimbConfig {
    /// Cool-down after leaving the climb before it may be re-entered
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: f64,
    /// Forward speed handed to the fallback state on a ledge exit
    #[serde(default = "default_edge_impulse")]
    pub edge_impulse: f32,
    /// Animation playback rate per unit of vertical intent
    #[serde(default = "default_playback_rate_scale")]
    pub playback_rate_scale: f32,
    /// Lead distance of the tracking anchor while moving
    #[serde(default = "default_climb_lead")]
    pub climb_lead: f32,
    /// Limbs whose collision is masked while attached
    #[serde(default = "default_limb_mask")]
    pub limb_mask: Vec<LimbPart>,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub steepness: SteepnessConfig,
    #[serde(default)]
    pub attachment: AttachmentConfig,
}

fn default_debounce_secs() -> f64 {
    defaults::DEBOUNCE_SECS
}

fn default_edge_impulse() -> f32 {
    defaults::EDGE_IMPULSE
}

fn default_playback_rate_scale() -> f32 {
    defaults::PLAYBACK_RATE_SCALE
}

fn default_climb_lead() -> f32 {
    defaults::CLIMB_LEAD
}

fn default_limb_mask() -> Vec<LimbPart> {
    LimbPart::ALL.to_vec()
}

impl Default for ClimbConfig {
    fn default() -> Self {
        Self {
            debounce_secs: default_debounce_secs(),
            edge_impulse: default_edge_impulse(),
            playback_rate_scale: default_playback_rate_scale(),
            climb_lead: default_climb_lead(),
            limb_mask: default_limb_mask(),
            probe: ProbeConfig::default(),
            steepness: SteepnessConfig::default(),
            attachment: AttachmentConfig::default(),
        }
    }
}

impl ClimbConfig {
    /// Load climbing configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the climb state cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !(self.debounce_secs >= 0.0) {
            return invalid("debounce_secs must be non-negative");
        }
        if !(self.probe.maintain_reach > 0.0) || !(self.probe.floor_distance > 0.0) {
            return invalid("probe reaches must be positive");
        }
        if self.probe.initial_reach < self.probe.maintain_reach {
            return invalid("probe.initial_reach must be at least probe.maintain_reach");
        }
        if self.steepness.overhang_bound >= self.steepness.flatness_bound {
            return invalid("steepness.overhang_bound must be below steepness.flatness_bound");
        }
        if !(self.steepness.danger_threshold > 0.0) {
            return invalid("steepness.danger_threshold must be positive");
        }
        for (name, params) in [
            ("attachment.position", &self.attachment.position),
            ("attachment.orientation", &self.attachment.orientation),
        ] {
            if !(params.max_force > 0.0 && params.responsiveness > 0.0 && params.max_velocity > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{} parameters must all be positive",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Errors that can occur when loading climbing configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Invalid climb config: {0}")]
    Invalid(String),
}
