//! Emulator configuration
//!
//! Loaded from an optional TOML file. Every section and key may be omitted;
//! missing values fall back to the controller defaults.

use std::fs;
use std::path::{Path, PathBuf};

use glowglobe_core::gateway::{CollisionDetectionConfig, DetectionMethod, Rgb, RobotId};
use glowglobe_core::sequences::RollProfile;
use glowglobe_core::session::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Top-level emulator configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EmulatorConfig {
    pub robot: RobotConfig,
    pub roll: RollConfig,
    pub collision: CollisionConfig,
    pub transcript: TranscriptConfig,
}

/// Simulated robot identity and light colours
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RobotConfig {
    pub id: u32,
    /// Light colour while armed, as `[r, g, b]`
    pub light_on: [u8; 3],
    pub light_off: [u8; 3],
}

/// Roll step issued after a collision
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RollConfig {
    /// Fraction of full speed (0.0 - 1.0)
    pub speed: f32,
    /// Roll duration, 0 rolls until stopped
    pub duration_ms: u32,
}

/// Abort threshold and robot-side detection parameters
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Impact power magnitude that stops a rolling robot
    pub threshold: f32,
    pub x_threshold: u8,
    pub y_threshold: u8,
    pub x_speed_weight: u8,
    pub y_speed_weight: u8,
    pub window_ms: u16,
}

/// Session transcript output
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// File receiving the console transcript; none when unset
    pub path: Option<PathBuf>,
}

impl Default for RobotConfig {
    fn default() -> Self {
        let SessionConfig {
            light_on,
            light_off,
            ..
        } = SessionConfig::DEFAULT;
        Self {
            id: 1,
            light_on: [light_on.r, light_on.g, light_on.b],
            light_off: [light_off.r, light_off.g, light_off.b],
        }
    }
}

impl Default for RollConfig {
    fn default() -> Self {
        Self {
            speed: RollProfile::DEFAULT.speed,
            duration_ms: RollProfile::DEFAULT.duration_ms,
        }
    }
}

impl Default for CollisionConfig {
    fn default() -> Self {
        let detection = CollisionDetectionConfig::DEFAULT;
        Self {
            threshold: SessionConfig::DEFAULT.threshold,
            x_threshold: detection.x_threshold,
            y_threshold: detection.y_threshold,
            x_speed_weight: detection.x_speed_weight,
            y_speed_weight: detection.y_speed_weight,
            window_ms: detection.window_ms,
        }
    }
}

impl EmulatorConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: EmulatorConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.roll.speed) {
            return Err(Error::InvalidParameter(format!(
                "roll.speed must be within 0.0..=1.0, got {}",
                self.roll.speed
            )));
        }
        if !self.collision.threshold.is_finite() || self.collision.threshold < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "collision.threshold must be a non-negative number, got {}",
                self.collision.threshold
            )));
        }
        Ok(())
    }

    pub fn robot_id(&self) -> RobotId {
        RobotId::new(self.robot.id)
    }

    /// Controller settings derived from this configuration
    pub fn session_config(&self) -> SessionConfig {
        let [r, g, b] = self.robot.light_on;
        let light_on = Rgb::new(r, g, b);
        let [r, g, b] = self.robot.light_off;
        let light_off = Rgb::new(r, g, b);

        SessionConfig {
            threshold: self.collision.threshold,
            roll: RollProfile::new(self.roll.speed, self.roll.duration_ms),
            detection: CollisionDetectionConfig {
                method: DetectionMethod::Default,
                x_threshold: self.collision.x_threshold,
                y_threshold: self.collision.y_threshold,
                x_speed_weight: self.collision.x_speed_weight,
                y_speed_weight: self.collision.y_speed_weight,
                window_ms: self.collision.window_ms,
            },
            light_on,
            light_off,
        }
    }
}
