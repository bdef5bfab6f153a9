//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use super::collision::bird_collides;
use super::state::{SimError, SimulationMode, SimulationState};

/// Commands collected between ticks, applied before the step runs
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Player flap (ignored in autopilot)
    pub flap: bool,
    /// Switch mode and restart
    pub set_mode: Option<SimulationMode>,
}

/// What happened during a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Running,
    /// The bird crashed and the run restarted
    Reset,
}

/// Something that happens partway through a tick
#[derive(Debug, Clone, Copy, PartialEq)]
enum SubTickEvent {
    /// Scheduled flap after `delay`
    Flap { delay: f64 },
    /// Pipe at `index` crosses the bird after `delay`
    Crossing { index: usize, delay: f64 },
}

/// Advance the simulation by one fixed timestep
pub fn tick(state: &mut SimulationState, input: &TickInput, dt: f64) -> Result<TickOutcome, SimError> {
    if let Some(mode) = input.set_mode {
        state.set_mode(mode)?;
    }
    if input.flap {
        state.flap();
    }

    state.time_ticks += 1;

    match state.mode {
        SimulationMode::Autopilot => advance_autopilot(state, dt)?,
        SimulationMode::Manual => state.advance_all(dt),
    }

    if bird_collides(&state.bird, &state.pipes) {
        state.crashes += 1;
        log::info!(
            "Crash at tick {} with score {} (crash #{})",
            state.time_ticks,
            state.score,
            state.crashes
        );
        state.reset()?;
        return Ok(TickOutcome::Reset);
    }

    update_pipes(state)?;

    if state.mode == SimulationMode::Manual {
        score_passed_pipes(state);
    }

    Ok(TickOutcome::Running)
}

/// Step through scheduled flaps and pipe crossings in time order
fn advance_autopilot(state: &mut SimulationState, dt: f64) -> Result<(), SimError> {
    let mut remaining = dt;

    while let Some(event) = next_event(state, remaining) {
        match event {
            SubTickEvent::Flap { delay } => {
                step(state, delay);
                remaining -= delay;
                state.schedule.pop_next();
                state.bird.flap();
                log::trace!("Flap at path time {:.4}", state.time_on_path);
            }
            SubTickEvent::Crossing { index, delay } => {
                step(state, delay);
                remaining -= delay;
                state.record_pass(index);

                let origin = state.pipes[index].center;
                let destination = state
                    .pipes
                    .get(index + 1)
                    .ok_or(SimError::ObstacleUnderflow)?
                    .center;
                state.replan(origin, destination)?;
                log::trace!(
                    "Passed pipe {} -> {} flaps planned",
                    state.score,
                    state.schedule.len()
                );
            }
        }
    }

    step(state, remaining);
    Ok(())
}

fn step(state: &mut SimulationState, dt: f64) {
    state.advance_all(dt);
    state.time_on_path += dt;
}

/// Earliest flap or crossing within `remaining`; flaps win ties
fn next_event(state: &SimulationState, remaining: f64) -> Option<SubTickEvent> {
    let flap = state
        .schedule
        .next()
        .map(|t| (t - state.time_on_path).max(0.0))
        .filter(|delay| *delay <= remaining);

    let crossing = next_crossing(state, remaining);

    match (flap, crossing) {
        (Some(flap), Some((index, delay))) if delay < flap => {
            Some(SubTickEvent::Crossing { index, delay })
        }
        (Some(delay), _) => Some(SubTickEvent::Flap { delay }),
        (None, Some((index, delay))) => Some(SubTickEvent::Crossing { index, delay }),
        (None, None) => None,
    }
}

/// The next unpassed pipe, if its center goes strictly left of the bird within `remaining`
fn next_crossing(state: &SimulationState, remaining: f64) -> Option<(usize, f64)> {
    // Pipes are ordered left to right, so only the first unpassed one can be next
    let (index, pipe) = state.pipes.iter().enumerate().find(|(_, p)| !p.passed)?;
    let delay = ((pipe.center.x - state.bird.pos.x) / -pipe.x_vel).max(0.0);
    (delay < remaining).then_some((index, delay))
}

/// Drop the pipe that left the field and queue the next one
fn update_pipes(state: &mut SimulationState) -> Result<(), SimError> {
    if state
        .pipes
        .front()
        .is_some_and(|pipe| state.generator.is_offscreen(pipe))
    {
        if state.pipes.len() < 2 {
            return Err(SimError::ObstacleUnderflow);
        }
        state.pipes.pop_front();
    }

    let last = state.pipes.back().ok_or(SimError::ObstacleUnderflow)?;
    if let Some(pipe) = state.generator.spawn_after(last, &mut state.rng) {
        log::trace!("Spawned pipe at x={:.4} y={:.4}", pipe.center.x, pipe.center.y);
        state.pipes.push_back(pipe);
    }
    Ok(())
}

/// Manual-mode scoring at the tick boundary
fn score_passed_pipes(state: &mut SimulationState) {
    let bird_x = state.bird.pos.x;
    let crossed: Vec<usize> = state
        .pipes
        .iter()
        .enumerate()
        .filter(|(_, pipe)| !pipe.passed && pipe.center.x < bird_x)
        .map(|(index, _)| index)
        .collect();
    for index in crossed {
        state.record_pass(index);
    }
}
