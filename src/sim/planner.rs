//! Autopilot trajectory planner
//!
//! The planner draws an imaginary "flap line" from one pipe opening to the
//! next and makes the bird flap every time its free-fall arc would cross that
//! line from above. Each flap time comes from solving the free-fall parabola
//! against the line in closed form, so no stepping simulation is involved.
//!
//! The line has three phases:
//!
//! ```text
//!   entry flat        diagonal          exit flat
//!  |----------|--------------------|----------|
//!  origin x                          destination x
//! ```
//!
//! The flats cover the horizontal reach of each pipe, where the line runs
//! level at an offset below the opening center. The diagonal joins them.
//!
//! If a flap would carry the bird into the upper bar of a pipe, the whole
//! remaining line is dropped to the "lowered" offset and the flap is
//! recomputed. The next schedule starts from the lowered offset so the two
//! lines meet without a step.

use std::collections::VecDeque;

use thiserror::Error;

use super::kinematics::{VerticalState, quadratic_roots};
use crate::{Position, Tuning};

/// Clearance kept between the lowered line and the lowest safe bird center
pub const LOWERED_MARGIN: f64 = 1e-2;
/// Added to the projected height after each step so the next root isn't a tangency at dt ≈ 0
pub const TANGENCY_BIAS: f64 = 1e-5;
/// Smallest interval between consecutive flaps
pub const MIN_FLAP_SPACING: f64 = 1e-6;
/// A schedule needing more iterations than this is a logic error
pub const MAX_PLAN_ITERATIONS: usize = 512;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("destination x {destination} is not ahead of origin x {origin}")]
    NonPositiveSpan { origin: f64, destination: f64 },
    #[error("flap schedule did not finish within {0} iterations")]
    IterationLimit(usize),
}

/// Flap times along one path, earliest first
///
/// Times are measured from the moment the path was planned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlapSchedule {
    times: VecDeque<f64>,
    lowered: bool,
    duration: f64,
}

impl FlapSchedule {
    #[cfg(test)]
    pub(crate) fn from_times(times: impl IntoIterator<Item = f64>, lowered: bool, duration: f64) -> Self {
        Self {
            times: times.into_iter().collect(),
            lowered,
            duration,
        }
    }

    /// Earliest pending flap time
    pub fn next(&self) -> Option<f64> {
        self.times.front().copied()
    }

    /// Consume the earliest pending flap time
    pub fn pop_next(&mut self) -> Option<f64> {
        self.times.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.times.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Whether this path ended on the lowered line
    pub fn is_lowered(&self) -> bool {
        self.lowered
    }

    /// Time from planning until the destination pipe's center reaches the bird
    pub fn duration(&self) -> f64 {
        self.duration
    }
}

/// Segment of a path between two openings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathPhase {
    EntryFlat,
    Diagonal,
    ExitFlat,
}

impl PathPhase {
    fn index(self) -> usize {
        match self {
            PathPhase::EntryFlat => 0,
            PathPhase::Diagonal => 1,
            PathPhase::ExitFlat => 2,
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            PathPhase::EntryFlat => Some(PathPhase::Diagonal),
            PathPhase::Diagonal => Some(PathPhase::ExitFlat),
            PathPhase::ExitFlat => None,
        }
    }
}

/// The target line for one path, parameterized by time on the path
#[derive(Debug, Clone, Copy)]
struct FlapLine {
    /// End time of each phase
    boundaries: [f64; 3],
    /// Line height over the entry flat
    entry_y: f64,
    /// Line height over the exit flat
    exit_y: f64,
    speed: f64,
}

impl FlapLine {
    fn end_of(&self, phase: PathPhase) -> f64 {
        self.boundaries[phase.index()]
    }

    /// Rise over run of the line in field units
    fn slope(&self, phase: PathPhase) -> f64 {
        match phase {
            PathPhase::Diagonal => {
                let run = (self.boundaries[1] - self.boundaries[0]) * self.speed;
                if run > 0.0 {
                    (self.exit_y - self.entry_y) / run
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    fn y_at(&self, phase: PathPhase, t: f64) -> f64 {
        match phase {
            PathPhase::EntryFlat => self.entry_y,
            PathPhase::Diagonal => {
                self.entry_y + self.slope(phase) * self.speed * (t - self.boundaries[0])
            }
            PathPhase::ExitFlat => self.exit_y,
        }
    }
}

/// Computes flap schedules between pipe openings
#[derive(Debug, Clone)]
pub struct TrajectoryPlanner {
    tuning: Tuning,
}

impl TrajectoryPlanner {
    pub fn new(tuning: &Tuning) -> Self {
        Self { tuning: *tuning }
    }

    /// Line offset below an opening center for an ordinary path
    pub fn normal_offset(&self) -> f64 {
        self.max_offset() / 2.0
    }

    /// Line offset below an opening center after lowering
    pub fn lowered_offset(&self) -> f64 {
        self.max_offset() - LOWERED_MARGIN
    }

    /// Offset at which the bird's bottom edge would touch the lower bar
    fn max_offset(&self) -> f64 {
        self.tuning.pipe_opening / 2.0 - self.tuning.bird_height / 2.0
    }

    /// Plan flaps that carry the bird from `origin` through the opening at `destination`
    ///
    /// `bird` is the bird's current height and vertical velocity. `origin` and
    /// `destination` are opening centers (for the first path of a run the
    /// origin is the bird itself). `prev_lowered` is the previous schedule's
    /// [`FlapSchedule::is_lowered`].
    pub fn plan(
        &self,
        bird: VerticalState,
        origin: Position,
        destination: Position,
        prev_lowered: bool,
    ) -> Result<FlapSchedule, PlanError> {
        let span = destination.x - origin.x;
        if span.is_nan() || span <= 0.0 {
            return Err(PlanError::NonPositiveSpan {
                origin: origin.x,
                destination: destination.x,
            });
        }

        let gravity = self.tuning.gravity;
        let duration = span / self.tuning.scroll_speed;
        let flat = (self.tuning.collision_radius() / self.tuning.scroll_speed).min(duration / 2.0);
        let boundaries = [flat, duration - flat, duration];

        let mut lowered = false;
        let mut state = bird;
        let mut t = 0.0;
        let mut phase = PathPhase::EntryFlat;
        let mut times = VecDeque::new();

        for _ in 0..MAX_PLAN_ITERATIONS {
            let line = self.flap_line(origin, destination, boundaries, prev_lowered || lowered, lowered);
            let phase_end = line.end_of(phase);
            let dt = self.time_to_line(state, t, &line, phase);

            if t + dt > phase_end {
                // No crossing left in this phase: fall to the boundary and move on
                state = state.integrate(gravity, phase_end - t);
                state.y += TANGENCY_BIAS;
                t = phase_end;
                match phase.next() {
                    Some(next) => {
                        phase = next;
                        continue;
                    }
                    None => {
                        log::debug!(
                            "Planned {} flaps over {:.3}s (lowered: {})",
                            times.len(),
                            duration,
                            lowered
                        );
                        return Ok(FlapSchedule {
                            times,
                            lowered,
                            duration,
                        });
                    }
                }
            }

            let after_flap = state.integrate(gravity, dt).impulse(self.tuning.flap_delta_v);
            if !lowered && self.flap_hits_bar(phase, after_flap, t + dt, origin, destination, duration) {
                // Discard this flap and redo it against the lowered line
                log::debug!("Lowering flap line at t={:.4} ({:?})", t + dt, phase);
                lowered = true;
                continue;
            }

            state = VerticalState::new(after_flap.y + TANGENCY_BIAS, after_flap.vel);
            t += dt;
            times.push_back(t);
        }

        Err(PlanError::IterationLimit(MAX_PLAN_ITERATIONS))
    }

    fn flap_line(
        &self,
        origin: Position,
        destination: Position,
        boundaries: [f64; 3],
        entry_lowered: bool,
        exit_lowered: bool,
    ) -> FlapLine {
        let offset = |lowered: bool| {
            if lowered {
                self.lowered_offset()
            } else {
                self.normal_offset()
            }
        };
        FlapLine {
            boundaries,
            entry_y: origin.y - offset(entry_lowered),
            exit_y: destination.y - offset(exit_lowered),
            speed: self.tuning.scroll_speed,
        }
    }

    /// Time until the free-falling bird meets the line, from path time `t`
    ///
    /// Bird: y + v·dt + ½·g·dt². Line: L(t) + slope·speed·dt. Equating gives
    /// ½·g·dt² + (v − slope·speed)·dt + (y − L(t)) = 0; the later root is the
    /// crossing made while falling onto the line.
    fn time_to_line(&self, state: VerticalState, t: f64, line: &FlapLine, phase: PathPhase) -> f64 {
        let a = 0.5 * self.tuning.gravity;
        let b = state.vel - line.slope(phase) * self.tuning.scroll_speed;
        let c = state.y - line.y_at(phase, t);

        match quadratic_roots(a, b, c) {
            Some((_, later)) => later.max(MIN_FLAP_SPACING),
            // Below the line and pulling away from it: flap right away
            None => MIN_FLAP_SPACING,
        }
    }

    /// Whether the arc after a flap at `flap_time` reaches a pipe's upper bar
    fn flap_hits_bar(
        &self,
        phase: PathPhase,
        after_flap: VerticalState,
        flap_time: f64,
        origin: Position,
        destination: Position,
        duration: f64,
    ) -> bool {
        let gap_center = match phase {
            PathPhase::EntryFlat => origin.y,
            PathPhase::Diagonal | PathPhase::ExitFlat => destination.y,
        };
        let gap_top = gap_center + self.tuning.pipe_opening / 2.0;
        let half_height = self.tuning.bird_height / 2.0;

        if after_flap.apex(self.tuning.gravity) + half_height < gap_top {
            return false;
        }

        match phase {
            // The flats lie inside a pipe's reach by construction
            PathPhase::EntryFlat | PathPhase::ExitFlat => true,
            PathPhase::Diagonal => {
                self.above_gap_within_reach(after_flap, flap_time, gap_top, duration)
            }
        }
    }

    /// Whether the bird's top edge is above `gap_top` while the destination pipe is in reach
    fn above_gap_within_reach(
        &self,
        after_flap: VerticalState,
        flap_time: f64,
        gap_top: f64,
        duration: f64,
    ) -> bool {
        let a = 0.5 * self.tuning.gravity;
        let c = after_flap.y + self.tuning.bird_height / 2.0 - gap_top;
        let Some((rise, fall)) = quadratic_roots(a, after_flap.vel, c) else {
            return false;
        };

        let reach = self.tuning.collision_radius() / self.tuning.scroll_speed;
        let above_from = flap_time + rise;
        let above_until = flap_time + fall;
        above_from <= duration + reach && above_until >= duration - reach
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> TrajectoryPlanner {
        TrajectoryPlanner::new(&Tuning::default())
    }

    fn intervals(schedule: &FlapSchedule) -> Vec<f64> {
        let times: Vec<f64> = schedule.iter().collect();
        times.windows(2).map(|w| w[1] - w[0]).collect()
    }

    #[test]
    fn test_offsets() {
        let planner = planner();
        assert!((planner.normal_offset() - 0.05).abs() < 1e-12);
        assert!((planner.lowered_offset() - 0.09).abs() < 1e-12);
    }

    #[test]
    fn test_flat_path_sawtooth() {
        let schedule = planner()
            .plan(
                VerticalState::new(0.5, 0.0),
                Position::new(0.25, 0.5),
                Position::new(0.65, 0.5),
                false,
            )
            .unwrap();

        assert!(!schedule.is_lowered());
        assert!((schedule.duration() - 2.0).abs() < 1e-12);
        assert_eq!(schedule.len(), 4);

        // First flap: free fall of 0.05 down to the line
        let first = schedule.next().unwrap();
        assert!((first - (0.1_f64 / 1.7).sqrt()).abs() < 1e-3);

        // Alternating bounces around the line, each close to 2·0.4/|g|
        let gaps = intervals(&schedule);
        for gap in &gaps {
            assert!((0.44..0.50).contains(gap), "interval {gap}");
        }
        assert!((gaps[2] - gaps[0]).abs() < 1e-3);
    }

    #[test]
    fn test_schedule_is_strictly_increasing_and_in_range() {
        let schedule = planner()
            .plan(
                VerticalState::new(0.5, 0.0),
                Position::new(0.25, 0.5),
                Position::new(1.125, 0.7),
                false,
            )
            .unwrap();

        let times: Vec<f64> = schedule.iter().collect();
        assert!(!times.is_empty());
        assert!(times[0] > 0.0);
        assert!(times.windows(2).all(|w| w[1] > w[0]));
        assert!(*times.last().unwrap() <= schedule.duration());
    }

    #[test]
    fn test_lowers_when_flap_would_hit_bar() {
        // Barely above the line with no fall speed: a flap here shoots into the upper bar
        let schedule = planner()
            .plan(
                VerticalState::new(0.4501, 0.0),
                Position::new(0.25, 0.5),
                Position::new(0.65, 0.5),
                false,
            )
            .unwrap();

        assert!(schedule.is_lowered());
        // The first flap waits for the lowered line at 0.41
        let first = schedule.next().unwrap();
        assert!((first - (2.0 * 0.0401_f64 / 1.7).sqrt()).abs() < 1e-3);
    }

    #[test]
    fn test_previous_lowered_starts_on_lowered_line() {
        let planner = planner();
        let bird = VerticalState::new(0.5, 0.0);
        let origin = Position::new(0.25, 0.5);
        let destination = Position::new(0.65, 0.5);

        let normal = planner.plan(bird, origin, destination, false).unwrap();
        let continued = planner.plan(bird, origin, destination, true).unwrap();

        let expected = (2.0 * 0.09_f64 / 1.7).sqrt();
        assert!((continued.next().unwrap() - expected).abs() < 1e-3);
        assert!(continued.next().unwrap() > normal.next().unwrap());
    }

    #[test]
    fn test_planning_is_deterministic() {
        let planner = planner();
        let bird = VerticalState::new(0.43, 0.35);
        let origin = Position::new(0.25, 0.3);
        let destination = Position::new(0.7125, 0.55);

        let a = planner.plan(bird, origin, destination, true).unwrap();
        let b = planner.plan(bird, origin, destination, true).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_backward_path() {
        let err = planner()
            .plan(
                VerticalState::new(0.5, 0.0),
                Position::new(0.5, 0.5),
                Position::new(0.25, 0.5),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, PlanError::NonPositiveSpan { .. }));
    }

    #[test]
    fn test_climb_keeps_bird_in_destination_gap() {
        // Steepest climb the generator can produce between adjacent pipes
        let tuning = Tuning::default();
        let planner = planner();
        let origin = Position::new(tuning.bird_x, 0.2);
        let destination = Position::new(tuning.bird_x + tuning.pipe_spacing(), 0.6);
        let start = VerticalState::new(0.2 - planner.normal_offset() + 0.02, 0.0);
        let schedule = planner.plan(start, origin, destination, false).unwrap();

        // Replay the schedule and check the box at the destination pipe's center
        let mut state = start;
        let mut t = 0.0;
        for flap in schedule.iter() {
            state = state.integrate(tuning.gravity, flap - t).impulse(tuning.flap_delta_v);
            t = flap;
        }
        let at_pipe = state.integrate(tuning.gravity, schedule.duration() - t);
        let half = tuning.bird_height / 2.0;
        assert!(at_pipe.y + half < destination.y + tuning.pipe_opening / 2.0);
        assert!(at_pipe.y - half > destination.y - tuning.pipe_opening / 2.0);
    }

    #[test]
    fn test_diagonal_overshoot_outside_reach_is_ignored() {
        let planner = planner();
        let destination = Position::new(0.7125, 0.5);
        let duration = 2.3125;
        // Top edge clears the gap top from the flap until ~0.59s later
        let after_flap = VerticalState::new(0.6, 0.5);

        // Back below the gap top long before the destination comes within reach
        assert!(!planner.flap_hits_bar(
            PathPhase::Diagonal,
            after_flap,
            0.5,
            Position::new(0.25, 0.5),
            destination,
            duration,
        ));
        // Same arc on a flat is always a hit
        assert!(planner.flap_hits_bar(
            PathPhase::EntryFlat,
            after_flap,
            0.5,
            Position::new(0.25, 0.5),
            destination,
            duration,
        ));
        // Same arc while the destination pipe is in reach
        assert!(planner.flap_hits_bar(
            PathPhase::Diagonal,
            after_flap,
            1.5,
            Position::new(0.25, 0.5),
            destination,
            duration,
        ));
    }

    #[test]
    fn test_diagonal_lowering_depends_on_reach() {
        let planner = planner();

        // Diagonal flaps rise above the destination gap top, but only far from the pipe
        let early = planner
            .plan(
                VerticalState::new(0.53, 0.1),
                Position::new(0.25, 0.43),
                Position::new(0.7125, 0.41),
                false,
            )
            .unwrap();
        assert!(!early.is_lowered());

        // Climbing into a high gap: the overshoot happens within the pipe's reach
        let late = planner
            .plan(
                VerticalState::new(0.45, 0.1),
                Position::new(0.25, 0.34),
                Position::new(0.7125, 0.53),
                false,
            )
            .unwrap();
        assert!(late.is_lowered());
    }

    #[test]
    fn test_runaway_plan_hits_iteration_limit() {
        // A flap too weak to ever bring the bird back up to the line
        let tuning = Tuning {
            flap_delta_v: 1e-9,
            ..Tuning::default()
        };
        let err = TrajectoryPlanner::new(&tuning)
            .plan(
                VerticalState::new(0.1, 0.0),
                Position::new(0.25, 0.5),
                Position::new(0.7125, 0.5),
                false,
            )
            .unwrap_err();
        assert_eq!(err, PlanError::IterationLimit(MAX_PLAN_ITERATIONS));
    }
}
