//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (pipes left to right)
//! - No rendering or platform dependencies

pub mod collision;
pub mod kinematics;
pub mod obstacles;
pub mod planner;
pub mod state;
pub mod tick;

pub use collision::{bird_collides, hits_bounds, hits_pipe};
pub use kinematics::{Advance, VerticalState, integrate_horizontal, quadratic_roots};
pub use obstacles::{CycleSource, ObstacleGenerator, UniformSource};
pub use planner::{FlapSchedule, PathPhase, PlanError, TrajectoryPlanner};
pub use state::{Bird, Pipe, PipeView, SimError, SimulationMode, SimulationState, Snapshot};
pub use tick::{TickInput, TickOutcome, tick};
