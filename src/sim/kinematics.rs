//! Equations of motion
//!
//! The bird falls under constant gravity and flaps by instantaneous velocity
//! impulses; pipes scroll left at constant speed. Constant-acceleration
//! integration is exact, so splitting a step into sub-steps (as the tick loop
//! does around flap events) lands on the same trajectory the planner projects.

/// Vertical position and velocity of a body under constant acceleration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalState {
    pub y: f64,
    pub vel: f64,
}

impl VerticalState {
    pub fn new(y: f64, vel: f64) -> Self {
        Self { y, vel }
    }

    /// Advance by `dt` under acceleration `accel`
    ///
    /// y' = y + v·dt + ½·a·dt², v' = v + a·dt
    #[inline]
    pub fn integrate(self, accel: f64, dt: f64) -> Self {
        Self {
            y: self.y + self.vel * dt + 0.5 * accel * dt * dt,
            vel: self.vel + accel * dt,
        }
    }

    /// Apply an instantaneous velocity change
    #[inline]
    pub fn impulse(self, delta_v: f64) -> Self {
        Self {
            y: self.y,
            vel: self.vel + delta_v,
        }
    }

    /// Highest y reached on the current ballistic arc (`accel` < 0)
    ///
    /// Vertex of the parabola: y − v² / (2·a). A body already moving down
    /// peaks where it is.
    #[inline]
    pub fn apex(self, accel: f64) -> f64 {
        if self.vel > 0.0 {
            self.y - self.vel * self.vel / (2.0 * accel)
        } else {
            self.y
        }
    }
}

/// Advance a horizontal coordinate at constant velocity
#[inline]
pub fn integrate_horizontal(x: f64, vel: f64, dt: f64) -> f64 {
    x + vel * dt
}

/// Discriminants with magnitude below this are floating-point noise around a tangency
pub const DISCRIMINANT_TOLERANCE: f64 = 1e-12;

/// Real roots of `a·t² + b·t + c = 0` as `(smaller, larger)`
///
/// `a` must be non-zero. A discriminant within [`DISCRIMINANT_TOLERANCE`] of
/// zero is treated as exactly zero (one double root). Returns `None` when the
/// roots are genuinely complex.
pub fn quadratic_roots(a: f64, b: f64, c: f64) -> Option<(f64, f64)> {
    let mut discriminant = b * b - 4.0 * a * c;
    if discriminant.abs() < DISCRIMINANT_TOLERANCE {
        discriminant = 0.0;
    }
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let plus = (-b + sqrt_d) / (2.0 * a);
    let minus = (-b - sqrt_d) / (2.0 * a);
    Some((plus.min(minus), plus.max(minus)))
}

/// Anything that moves each tick
pub trait Advance {
    fn advance(&mut self, dt: f64);
}
