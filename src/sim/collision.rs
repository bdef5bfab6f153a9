//! Collision detection between the bird and the field
//!
//! The bird is an axis-aligned box. A pipe pair is two bars separated by a
//! single opening, so the only ways to hit it are poking the top of the box
//! into the upper bar or the bottom into the lower one while the box overlaps
//! the pipe horizontally. Touching counts as a hit everywhere.

use super::state::{Bird, Pipe};

/// Check if the bird's box left the [0, 1] vertical range
#[inline]
pub fn hits_bounds(bird: &Bird) -> bool {
    bird.bottom() <= 0.0 || bird.top() >= 1.0
}

/// Check if the bird overlaps either bar of a pipe pair
pub fn hits_pipe(bird: &Bird, pipe: &Pipe) -> bool {
    let x_dist = (pipe.center.x - bird.pos.x).abs();
    // Pipes out of horizontal reach can't be hit
    if x_dist > bird.width / 2.0 + pipe.width / 2.0 {
        return false;
    }
    bird.top() >= pipe.gap_top() || bird.bottom() <= pipe.gap_bottom()
}

/// Full collision predicate: bounds first, then pipes front to back
pub fn bird_collides<'a>(bird: &Bird, pipes: impl IntoIterator<Item = &'a Pipe>) -> bool {
    hits_bounds(bird) || pipes.into_iter().any(|pipe| hits_pipe(bird, pipe))
}
