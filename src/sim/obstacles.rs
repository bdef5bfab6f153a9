//! Procedural pipe placement
//!
//! Opening heights follow a bounded random walk. Near the top or bottom of the
//! allowed range the walk is pushed back toward the middle so several pipes in
//! a row can't hug an edge.

use rand::Rng;
use rand_pcg::Pcg32;

use super::state::Pipe;
use crate::Tuning;

/// Source of uniform samples in [0, 1)
pub trait UniformSource {
    fn next_unit(&mut self) -> f64;
}

impl UniformSource for Pcg32 {
    fn next_unit(&mut self) -> f64 {
        self.random::<f64>()
    }
}

/// Replays a fixed list of samples, wrapping around at the end
///
/// A stand-in for the seeded RNG when a test or replay needs exact samples.
#[derive(Debug, Clone)]
pub struct CycleSource {
    values: Vec<f64>,
    index: usize,
}

impl CycleSource {
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "CycleSource needs at least one value");
        Self { values, index: 0 }
    }
}

impl UniformSource for CycleSource {
    fn next_unit(&mut self) -> f64 {
        let value = self.values[self.index];
        self.index = (self.index + 1) % self.values.len();
        value
    }
}

/// Decides where new pipes go and when old ones leave
#[derive(Debug, Clone)]
pub struct ObstacleGenerator {
    tuning: Tuning,
}

impl ObstacleGenerator {
    pub fn new(tuning: &Tuning) -> Self {
        Self { tuning: *tuning }
    }

    /// Opening height for the first pipe of a run: uniform over the allowed range
    pub fn initial_height<R: UniformSource + ?Sized>(&self, rng: &mut R) -> f64 {
        let range = self.tuning.max_opening_height - self.tuning.min_opening_height;
        rng.next_unit() * range + self.tuning.min_opening_height
    }

    /// Opening height for the pipe after one at `previous`
    ///
    /// A uniform step in [-D, D], plus a correction toward the middle when
    /// `previous` sits within D of either limit. The correction equals how far
    /// `previous` intrudes into that margin, which keeps the result in range
    /// without clamping.
    pub fn next_height<R: UniformSource + ?Sized>(&self, previous: f64, rng: &mut R) -> f64 {
        let max_step = self.tuning.max_opening_step;
        let low_margin = self.tuning.min_opening_height + max_step;
        let high_margin = self.tuning.max_opening_height - max_step;

        let mut delta = (rng.next_unit() - 0.5) * max_step * 2.0;
        if previous < low_margin {
            delta += low_margin - previous;
        } else if previous > high_margin {
            delta -= previous - high_margin;
        }

        previous + delta
    }

    /// Whether the rightmost pipe has scrolled far enough to queue another
    pub fn should_spawn(&self, last: &Pipe) -> bool {
        last.center.x <= self.tuning.pipe_spawn_threshold_x
    }

    /// Build the pipe that follows `last`, if it's due
    ///
    /// The new pipe is placed exactly one spacing behind `last` regardless of
    /// how far past the threshold `last` travelled during the tick.
    pub fn spawn_after<R: UniformSource + ?Sized>(&self, last: &Pipe, rng: &mut R) -> Option<Pipe> {
        if !self.should_spawn(last) {
            return None;
        }
        let overshoot = self.tuning.pipe_spawn_threshold_x - last.center.x;
        let height = self.next_height(last.center.y, rng);
        Some(Pipe::new(
            &self.tuning,
            height,
            self.tuning.pipe_spawn_x - overshoot,
        ))
    }

    /// Whether a pipe's right edge has fully left the field
    pub fn is_offscreen(&self, pipe: &Pipe) -> bool {
        pipe.right_edge() < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn generator() -> ObstacleGenerator {
        ObstacleGenerator::new(&Tuning::default())
    }

    #[test]
    fn test_initial_height_spans_range() {
        let generator = generator();
        let mut rng = CycleSource::new(vec![0.0, 0.5, 0.999_999]);
        assert!((generator.initial_height(&mut rng) - 0.2).abs() < 1e-12);
        assert!((generator.initial_height(&mut rng) - 0.5).abs() < 1e-12);
        assert!(generator.initial_height(&mut rng) < 0.8);
    }

    #[test]
    fn test_next_height_unbiased_in_middle() {
        let generator = generator();
        let mut rng = CycleSource::new(vec![0.5, 0.0, 1.0]);
        assert!((generator.next_height(0.5, &mut rng) - 0.5).abs() < 1e-12);
        assert!((generator.next_height(0.5, &mut rng) - 0.3).abs() < 1e-12);
        assert!((generator.next_height(0.5, &mut rng) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_next_height_pushed_off_edges() {
        let generator = generator();
        // Lowest draw from the minimum still lands on the minimum
        let mut rng = CycleSource::new(vec![0.0]);
        assert!((generator.next_height(0.2, &mut rng) - 0.2).abs() < 1e-12);
        // Highest draw from the maximum still lands on the maximum
        let mut rng = CycleSource::new(vec![1.0]);
        assert!((generator.next_height(0.8, &mut rng) - 0.8).abs() < 1e-12);
        // A neutral draw from an edge moves toward the middle
        let mut rng = CycleSource::new(vec![0.5]);
        assert!(generator.next_height(0.25, &mut rng) > 0.25);
        assert!(generator.next_height(0.75, &mut rng) < 0.75);
    }

    #[test]
    fn test_bias_from_minimum_is_upward_on_average() {
        let generator = generator();
        let mut rng = Pcg32::seed_from_u64(7);
        let samples = 2000;
        let mean_delta: f64 = (0..samples)
            .map(|_| generator.next_height(0.2, &mut rng) - 0.2)
            .sum::<f64>()
            / samples as f64;
        assert!(mean_delta > 0.1, "mean delta {mean_delta}");
    }

    #[test]
    fn test_spawn_keeps_spacing_exact() {
        let tuning = Tuning::default();
        let generator = ObstacleGenerator::new(&tuning);
        let mut rng = CycleSource::new(vec![0.5]);

        let far = Pipe::new(&tuning, 0.5, 0.9);
        assert!(generator.spawn_after(&far, &mut rng).is_none());

        // Rightmost pipe overshot the threshold by a partial tick
        let last = Pipe::new(&tuning, 0.5, tuning.pipe_spawn_threshold_x - 0.0013);
        let next = generator.spawn_after(&last, &mut rng).unwrap();
        assert!((next.center.x - last.center.x - tuning.pipe_spacing()).abs() < 1e-12);
        assert!(!next.passed);
    }

    #[test]
    fn test_offscreen_uses_right_edge() {
        let tuning = Tuning::default();
        let generator = ObstacleGenerator::new(&tuning);
        assert!(!generator.is_offscreen(&Pipe::new(&tuning, 0.5, -0.06)));
        assert!(generator.is_offscreen(&Pipe::new(&tuning, 0.5, -0.07)));
    }

    #[test]
    #[should_panic(expected = "at least one value")]
    fn test_cycle_source_needs_values() {
        CycleSource::new(Vec::new());
    }
}
