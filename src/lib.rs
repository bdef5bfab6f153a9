//! Flappy Autopilot - side-scrolling flap simulation with an analytic autopilot
//!
//! Core modules:
//! - `sim`: Deterministic simulation (kinematics, collisions, obstacles, planner, tick)
//! - `settings`: Data-driven tuning (physics constants and field geometry)
//!
//! Rendering and input live outside this crate. They read [`sim::Snapshot`]s
//! after a tick and submit [`sim::TickInput`] commands before the next one.

pub mod settings;
pub mod sim;

pub use settings::{SettingsError, Tuning};

use glam::DVec2;

/// A point in game units: the visible field is the unit square with the
/// origin at the bottom-left, x to the right and y upward.
pub type Position = DVec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (10 ms per tick)
    pub const SIM_DT: f64 = 0.01;

    /// Downward acceleration (game units/s²)
    pub const GRAVITY: f64 = -1.7;
    /// Vertical velocity added by one flap
    pub const FLAP_DELTA_V: f64 = 0.8;
    /// Speed at which pipes scroll toward the bird (the bird never moves in x)
    pub const SCROLL_SPEED: f64 = 0.2;

    /// Bird defaults
    pub const BIRD_X: f64 = 0.25;
    pub const BIRD_START_Y: f64 = 0.5;
    pub const BIRD_WIDTH: f64 = 0.06;
    pub const BIRD_HEIGHT: f64 = 0.05;

    /// Pipe defaults
    pub const PIPE_OPENING: f64 = 0.25;
    pub const PIPE_WIDTH: f64 = 0.125;

    /// Allowed range for the center of a pipe opening
    pub const MIN_OPENING_HEIGHT: f64 = 0.2;
    pub const MAX_OPENING_HEIGHT: f64 = 1.0 - MIN_OPENING_HEIGHT;
    /// Adjacent openings differ by at most this much (before edge bias)
    pub const MAX_OPENING_STEP: f64 = 0.2;

    /// New pipes appear fully right of the field
    pub const PIPE_SPAWN_X: f64 = 1.0 + PIPE_WIDTH;
    /// A new pipe is queued once the rightmost one reaches this x
    pub const PIPE_SPAWN_THRESHOLD_X: f64 = 0.6 + PIPE_WIDTH / 2.0;
}

/// Convert a game position to a pixel location with a top-left origin
#[inline]
pub fn to_screen_location(pos: Position, screen_w: u32, screen_h: u32) -> (i32, i32) {
    let x = (pos.x * screen_w as f64).floor() as i32;
    let y = ((1.0 - pos.y) * screen_h as f64).floor() as i32;
    (x, y)
}
