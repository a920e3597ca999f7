//! Critically-damped 1-D spring used to animate the scroll offset.
//!
//! A single spring rather than a tween yields the signature smooth-scroll
//! behavior — small jumps decay quickly, large jumps "settle" — with one
//! knob (`bounciness`) per motion.

/// Below this magnitude, position and velocity are considered at rest.
const SETTLE_EPSILON: f32 = 1e-3;

/// A 1-D critically-damped spring-mass-damper, always targeting zero.
///
/// The spring is driven by repeatedly calling [`Spring::update`] with the
/// frame's `dt`. Position and velocity are both zero when the spring is
/// inactive; callers are expected to clear their own "is animating" flag
/// once `update` returns `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spring {
    pub position: f32,
    pub velocity: f32,
}

impl Spring {
    /// A spring at rest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes position and velocity.
    pub fn reset(&mut self) {
        self.position = 0.0;
        self.velocity = 0.0;
    }

    /// Integrates one step of a critically-damped second-order ODE toward
    /// zero, parameterised so that the 1% settling time matches `duration`
    /// seconds when `bounciness == 0`. For `bounciness` in `(0, 1]` the
    /// damping ratio is reduced proportionally and the spring overshoots
    /// before settling.
    ///
    /// Returns `true` while the spring is still in motion. Once both
    /// `|position|` and `|velocity|` fall below a small epsilon, the spring
    /// is snapped to rest and this returns `false`.
    pub fn update(&mut self, dt: f32, duration: f32, bounciness: f32) -> bool {
        if duration <= 0.0 {
            self.reset();
            return false;
        }

        // angular frequency chosen so the envelope decays to ~1% by `duration`
        let omega = 4.6 / duration.max(1e-6);
        let bounciness = bounciness.clamp(0.0, 1.0);
        // damping ratio 1.0 is critically damped (no overshoot); relaxing it
        // toward 0 as bounciness grows lets the spring ring before settling.
        let zeta = 1.0 - bounciness;

        if zeta >= 1.0 {
            // Critically damped closed-form step.
            let e = (-omega * dt).exp();
            let new_position = (self.position + (self.velocity + omega * self.position) * dt) * e;
            let new_velocity =
                (self.velocity - (self.velocity + omega * self.position) * omega * dt) * e;
            self.position = new_position;
            self.velocity = new_velocity;
        } else {
            // Underdamped: integrate the exact solution for a damped
            // harmonic oscillator with damping ratio zeta < 1.
            let omega_d = omega * (1.0 - zeta * zeta).sqrt().max(1e-6);
            let e = (-zeta * omega * dt).exp();
            let cos_t = (omega_d * dt).cos();
            let sin_t = (omega_d * dt).sin();

            let a = self.position;
            let b = (self.velocity + zeta * omega * self.position) / omega_d;

            let new_position = e * (a * cos_t + b * sin_t);
            let new_velocity = e
                * ((-zeta * omega) * (a * cos_t + b * sin_t)
                    + omega_d * (-a * sin_t + b * cos_t));

            self.position = new_position;
            self.velocity = new_velocity;
        }

        if self.position.abs() < SETTLE_EPSILON && self.velocity.abs() < SETTLE_EPSILON {
            self.reset();
            false
        } else {
            true
        }
    }
}
