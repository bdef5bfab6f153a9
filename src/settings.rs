//! Simulation tuning
//!
//! Every physics constant and field dimension the simulation uses. The planner
//! and the live simulation both read from the same `Tuning`, so a flap time
//! computed analytically lands on the same trajectory the tick loop integrates.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid tuning: {0}")]
    Invalid(String),
}

/// Physics and geometry for one simulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Physics ===
    /// Vertical acceleration (negative = down)
    pub gravity: f64,
    /// Velocity impulse per flap
    pub flap_delta_v: f64,
    /// Pipe scroll speed (magnitude; pipes move left)
    pub scroll_speed: f64,

    // === Bird ===
    pub bird_x: f64,
    pub bird_start_y: f64,
    pub bird_width: f64,
    pub bird_height: f64,

    // === Pipes ===
    /// Vertical size of the opening between a pipe pair
    pub pipe_opening: f64,
    pub pipe_width: f64,
    pub min_opening_height: f64,
    pub max_opening_height: f64,
    pub max_opening_step: f64,
    pub pipe_spawn_x: f64,
    pub pipe_spawn_threshold_x: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            flap_delta_v: FLAP_DELTA_V,
            scroll_speed: SCROLL_SPEED,

            bird_x: BIRD_X,
            bird_start_y: BIRD_START_Y,
            bird_width: BIRD_WIDTH,
            bird_height: BIRD_HEIGHT,

            pipe_opening: PIPE_OPENING,
            pipe_width: PIPE_WIDTH,
            min_opening_height: MIN_OPENING_HEIGHT,
            max_opening_height: MAX_OPENING_HEIGHT,
            max_opening_step: MAX_OPENING_STEP,
            pipe_spawn_x: PIPE_SPAWN_X,
            pipe_spawn_threshold_x: PIPE_SPAWN_THRESHOLD_X,
        }
    }
}

impl Tuning {
    /// Height of a single pipe in a pair
    pub fn pipe_single_height(&self) -> f64 {
        self.max_opening_height - self.pipe_opening / 2.0
    }

    /// Height of both pipes in a pair plus the opening between them
    pub fn pipe_pair_height(&self) -> f64 {
        self.pipe_single_height() * 2.0 + self.pipe_opening
    }

    /// Horizontal distance between adjacent pipe centers
    pub fn pipe_spacing(&self) -> f64 {
        self.pipe_spawn_x - self.pipe_spawn_threshold_x
    }

    /// Center-to-center x distance at which the bird can touch a pipe
    pub fn collision_radius(&self) -> f64 {
        self.bird_width / 2.0 + self.pipe_width / 2.0
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |msg: &str| Err(SettingsError::Invalid(msg.to_string()));

        if self.gravity >= 0.0 {
            return invalid("gravity must be negative");
        }
        if self.flap_delta_v <= 0.0 || self.scroll_speed <= 0.0 {
            return invalid("flap impulse and scroll speed must be positive");
        }
        if self.bird_width <= 0.0
            || self.bird_height <= 0.0
            || self.pipe_width <= 0.0
            || self.pipe_opening <= 0.0
        {
            return invalid("dimensions must be positive");
        }
        if self.pipe_opening <= self.bird_height {
            return invalid("pipe opening must be taller than the bird");
        }
        if self.min_opening_height >= self.max_opening_height {
            return invalid("min_opening_height must be below max_opening_height");
        }
        // The generator's edge bias only keeps heights in range with this much room
        if self.max_opening_height - self.min_opening_height < 2.0 * self.max_opening_step {
            return invalid("opening range must be at least twice max_opening_step");
        }
        if self.pipe_spacing() <= 0.0 {
            return invalid("pipe_spawn_x must be right of pipe_spawn_threshold_x");
        }
        Ok(())
    }

    /// Parse (possibly partial) JSON, falling back to defaults for missing fields
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Load tuning from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let tuning = Self::from_json(&json)?;
        log::info!("Loaded tuning from {}", path.as_ref().display());
        Ok(tuning)
    }

    /// Save tuning as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Tuning saved to {}", path.as_ref().display());
        Ok(())
    }
}
