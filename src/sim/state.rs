//! Simulation state and core entity types
//!
//! `SimulationState` owns everything a tick mutates. Renderers and input
//! handlers only see it through [`Snapshot`]s and the command methods.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::kinematics::{Advance, VerticalState, integrate_horizontal};
use super::obstacles::ObstacleGenerator;
use super::planner::{FlapSchedule, PlanError, TrajectoryPlanner};
use crate::{Position, Tuning};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("planner failed: {0}")]
    Plan(#[from] PlanError),
    #[error("obstacle sequence has no pipe where one is required")]
    ObstacleUnderflow,
}

/// Who decides when the bird flaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    /// Flaps come from the player
    #[default]
    Manual,
    /// Flaps come from the planner's schedule
    Autopilot,
}

impl SimulationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimulationMode::Manual => "manual",
            SimulationMode::Autopilot => "autopilot",
        }
    }
}

impl fmt::Display for SimulationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimulationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manual" => Ok(SimulationMode::Manual),
            "autopilot" | "auto" => Ok(SimulationMode::Autopilot),
            other => Err(format!("unknown mode '{other}' (expected manual or autopilot)")),
        }
    }
}

/// The bird. Its x never changes; the pipes scroll past it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bird {
    pub pos: Position,
    pub y_vel: f64,
    /// Speed the field scrolls at, i.e. the bird's speed relative to the pipes
    pub x_vel: f64,
    pub width: f64,
    pub height: f64,
    pub gravity: f64,
    pub flap_delta_v: f64,
}

impl Bird {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            pos: Position::new(tuning.bird_x, tuning.bird_start_y),
            y_vel: 0.0,
            x_vel: tuning.scroll_speed,
            width: tuning.bird_width,
            height: tuning.bird_height,
            gravity: tuning.gravity,
            flap_delta_v: tuning.flap_delta_v,
        }
    }

    pub fn flap(&mut self) {
        self.set_vertical(self.vertical().impulse(self.flap_delta_v));
    }

    pub fn vertical(&self) -> VerticalState {
        VerticalState::new(self.pos.y, self.y_vel)
    }

    fn set_vertical(&mut self, state: VerticalState) {
        self.pos.y = state.y;
        self.y_vel = state.vel;
    }

    #[inline]
    pub fn top(&self) -> f64 {
        self.pos.y + self.height / 2.0
    }

    #[inline]
    pub fn bottom(&self) -> f64 {
        self.pos.y - self.height / 2.0
    }
}

impl Advance for Bird {
    fn advance(&mut self, dt: f64) {
        self.set_vertical(self.vertical().integrate(self.gravity, dt));
    }
}

/// A pipe pair, positioned by the center of its opening
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipe {
    pub center: Position,
    /// Vertical size of the opening
    pub opening: f64,
    pub width: f64,
    /// Combined height of both pipes and the opening
    pub height: f64,
    /// Horizontal velocity (negative: scrolls left)
    pub x_vel: f64,
    /// Set once the opening center has crossed the bird
    pub passed: bool,
}

impl Pipe {
    pub fn new(tuning: &Tuning, center_height: f64, x: f64) -> Self {
        Self {
            center: Position::new(x, center_height),
            opening: tuning.pipe_opening,
            width: tuning.pipe_width,
            height: tuning.pipe_pair_height(),
            x_vel: -tuning.scroll_speed,
            passed: false,
        }
    }

    #[inline]
    pub fn gap_top(&self) -> f64 {
        self.center.y + self.opening / 2.0
    }

    #[inline]
    pub fn gap_bottom(&self) -> f64 {
        self.center.y - self.opening / 2.0
    }

    #[inline]
    pub fn right_edge(&self) -> f64 {
        self.center.x + self.width / 2.0
    }
}

impl Advance for Pipe {
    fn advance(&mut self, dt: f64) {
        self.center.x = integrate_horizontal(self.center.x, self.x_vel, dt);
    }
}

/// Read-only view of a pipe for renderers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipeView {
    pub center: Position,
    pub gap_top: f64,
    pub gap_bottom: f64,
    pub width: f64,
}

/// Read-only view of the simulation after a tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time_ticks: u64,
    pub mode: SimulationMode,
    pub score: u32,
    pub best_score: u32,
    pub crashes: u32,
    pub bird: Position,
    pub bird_y_vel: f64,
    pub pipes: Vec<PipeView>,
}

/// Complete simulation state (deterministic for a given seed and input stream)
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub tuning: Tuning,
    /// Run seed for reproducibility
    pub seed: u64,
    pub mode: SimulationMode,
    pub bird: Bird,
    /// Pipes ordered left to right; new pipes are pushed at the back
    pub pipes: VecDeque<Pipe>,
    /// Pipes passed since the last reset
    pub score: u32,
    /// Best score since the state was created
    pub best_score: u32,
    /// Collisions since the state was created
    pub crashes: u32,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Pending autopilot flaps (empty in manual mode)
    pub schedule: FlapSchedule,
    /// Time since the current schedule was planned
    pub time_on_path: f64,
    pub(super) rng: Pcg32,
    pub(super) generator: ObstacleGenerator,
    pub(super) planner: TrajectoryPlanner,
}

impl SimulationState {
    /// Create a state with the given seed, ready to tick
    pub fn new(seed: u64, tuning: Tuning, mode: SimulationMode) -> Result<Self, SimError> {
        let mut state = Self {
            seed,
            mode,
            bird: Bird::new(&tuning),
            pipes: VecDeque::new(),
            score: 0,
            best_score: 0,
            crashes: 0,
            time_ticks: 0,
            schedule: FlapSchedule::default(),
            time_on_path: 0.0,
            rng: Pcg32::seed_from_u64(seed),
            generator: ObstacleGenerator::new(&tuning),
            planner: TrajectoryPlanner::new(&tuning),
            tuning,
        };
        state.reset()?;
        Ok(state)
    }

    /// Start a fresh run: new bird, a single new pipe, zero score
    ///
    /// Any pending schedule is discarded; in autopilot a new one is planned
    /// from the bird to the first opening.
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.bird = Bird::new(&self.tuning);
        self.pipes.clear();
        let height = self.generator.initial_height(&mut self.rng);
        self.pipes
            .push_back(Pipe::new(&self.tuning, height, self.tuning.pipe_spawn_x));
        self.score = 0;
        self.schedule = FlapSchedule::default();
        self.time_on_path = 0.0;

        if self.mode == SimulationMode::Autopilot {
            let destination = self.pipes[0].center;
            self.schedule = self
                .planner
                .plan(self.bird.vertical(), self.bird.pos, destination, false)?;
        }
        Ok(())
    }

    /// Switch modes; always restarts the run
    pub fn set_mode(&mut self, mode: SimulationMode) -> Result<(), SimError> {
        log::info!("Mode: {} -> {}", self.mode, mode);
        self.mode = mode;
        self.reset()
    }

    /// Player flap. Ignored in autopilot; returns whether it was applied.
    pub fn flap(&mut self) -> bool {
        if self.mode != SimulationMode::Manual {
            log::debug!("Ignoring manual flap in autopilot");
            return false;
        }
        self.bird.flap();
        true
    }

    /// Replace the schedule with a path from `origin` to `destination`
    pub(super) fn replan(&mut self, origin: Position, destination: Position) -> Result<(), SimError> {
        let prev_lowered = self.schedule.is_lowered();
        self.schedule = self
            .planner
            .plan(self.bird.vertical(), origin, destination, prev_lowered)?;
        self.time_on_path = 0.0;
        Ok(())
    }

    /// Move the bird and every pipe forward by `dt`
    pub(super) fn advance_all(&mut self, dt: f64) {
        self.bird.advance(dt);
        for pipe in self.pipes.iter_mut() {
            pipe.advance(dt);
        }
    }

    /// Count a pipe as passed
    pub(super) fn record_pass(&mut self, index: usize) {
        self.pipes[index].passed = true;
        self.score += 1;
        if self.score > self.best_score {
            self.best_score = self.score;
            log::info!("New best score: {}", self.best_score);
        }
    }

    pub fn bird_position(&self) -> Position {
        self.bird.pos
    }

    pub fn pipes(&self) -> impl Iterator<Item = &Pipe> {
        self.pipes.iter()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            time_ticks: self.time_ticks,
            mode: self.mode,
            score: self.score,
            best_score: self.best_score,
            crashes: self.crashes,
            bird: self.bird.pos,
            bird_y_vel: self.bird.y_vel,
            pipes: self
                .pipes
                .iter()
                .map(|pipe| PipeView {
                    center: pipe.center,
                    gap_top: pipe.gap_top(),
                    gap_bottom: pipe.gap_bottom(),
                    width: pipe.width,
                })
                .collect(),
        }
    }
}
