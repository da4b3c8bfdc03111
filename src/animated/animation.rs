//! Frame-driven animations for value nodes.
//!
//! An [`Animation`] is started with the node's current value and then
//! stepped by [`AnimatedGraph::tick`](super::AnimatedGraph::tick) with the
//! current time until it reports that it has finished.

use std::fmt;
use std::rc::Rc;

use super::easing::Easing;
use crate::error::{Error, Result};

/// Called once when an animation ends; `true` when it ran to completion,
/// `false` when it was stopped or replaced.
pub type EndCallback = Rc<dyn Fn(bool)>;

/// One evaluated frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub value: f64,
    pub finished: bool,
}

pub trait Animation: fmt::Debug {
    /// Begin animating from `from` at time `now_ms`.
    fn start(&mut self, from: f64, now_ms: f64);

    /// Value at `now_ms`.
    fn step(&mut self, now_ms: f64) -> Frame;
}

/// Configuration for a [`TimingAnimation`].
#[derive(Debug, Clone, PartialEq)]
pub struct TimingConfig {
    pub to_value: f64,
    pub duration_ms: f64,
    pub delay_ms: f64,
    pub easing: Easing,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            to_value: 0.0,
            duration_ms: 500.0,
            delay_ms: 0.0,
            easing: Easing::ease_in_out(Easing::ease()),
        }
    }
}

/// Eased interpolation from the start value to a target over a duration.
#[derive(Debug, Clone)]
pub struct TimingAnimation {
    config: TimingConfig,
    from: f64,
    start_ms: f64,
}

impl TimingAnimation {
    pub fn new(config: TimingConfig) -> Self {
        Self {
            config,
            from: 0.0,
            start_ms: 0.0,
        }
    }
}

impl Animation for TimingAnimation {
    fn start(&mut self, from: f64, now_ms: f64) {
        self.from = from;
        self.start_ms = now_ms + self.config.delay_ms;
    }

    fn step(&mut self, now_ms: f64) -> Frame {
        let TimingConfig {
            to_value,
            duration_ms,
            ref easing,
            ..
        } = self.config;

        if duration_ms <= 0.0 && now_ms >= self.start_ms {
            return Frame {
                value: to_value,
                finished: true,
            };
        }
        if now_ms < self.start_ms {
            return Frame {
                value: self.from,
                finished: false,
            };
        }

        let progress = ((now_ms - self.start_ms) / duration_ms).min(1.0);
        if progress >= 1.0 {
            return Frame {
                value: to_value,
                finished: true,
            };
        }
        Frame {
            value: self.from + easing.apply(progress) * (to_value - self.from),
            finished: false,
        }
    }
}

/// Configuration for a [`SpringAnimation`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpringConfig {
    pub to_value: f64,
    pub stiffness: f64,
    pub damping: f64,
    pub mass: f64,
    pub velocity: f64,
    pub overshoot_clamping: bool,
    pub rest_displacement_threshold: f64,
    pub rest_speed_threshold: f64,
    pub delay_ms: f64,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            to_value: 0.0,
            stiffness: 100.0,
            damping: 10.0,
            mass: 1.0,
            velocity: 0.0,
            overshoot_clamping: false,
            rest_displacement_threshold: 0.001,
            rest_speed_threshold: 0.001,
            delay_ms: 0.0,
        }
    }
}

/// Damped harmonic oscillator solved analytically per frame.
#[derive(Debug, Clone)]
pub struct SpringAnimation {
    config: SpringConfig,
    from: f64,
    start_ms: f64,
}

impl SpringAnimation {
    /// Mass must be positive; stiffness and damping must not be negative.
    /// A zero stiffness coasts at the initial velocity.
    pub fn new(config: SpringConfig) -> Result<Self> {
        let SpringConfig {
            stiffness,
            damping,
            mass,
            velocity,
            ..
        } = config;
        if !(mass.is_finite() && mass > 0.0) {
            return Err(Error::InvalidSpring(format!(
                "mass must be greater than 0, got {mass}"
            )));
        }
        if !(stiffness.is_finite() && stiffness >= 0.0) {
            return Err(Error::InvalidSpring(format!(
                "stiffness must not be negative, got {stiffness}"
            )));
        }
        if !(damping.is_finite() && damping >= 0.0) {
            return Err(Error::InvalidSpring(format!(
                "damping must not be negative, got {damping}"
            )));
        }
        if !velocity.is_finite() {
            return Err(Error::InvalidSpring(format!(
                "velocity must be finite, got {velocity}"
            )));
        }
        Ok(Self {
            config,
            from: 0.0,
            start_ms: 0.0,
        })
    }

    /// Position and velocity `t` seconds after the start.
    fn solve(&self, t: f64) -> (f64, f64) {
        let SpringConfig {
            to_value,
            stiffness: k,
            damping: c,
            mass: m,
            velocity,
            ..
        } = self.config;

        let v0 = -velocity;
        let zeta = c / (2.0 * (k * m).sqrt());
        let omega0 = (k / m).sqrt();
        let omega1 = omega0 * (1.0 - zeta * zeta).sqrt();
        let x0 = to_value - self.from;

        if zeta < 1.0 {
            let envelope = (-zeta * omega0 * t).exp();
            let a = (v0 + zeta * omega0 * x0) / omega1;
            let (sin, cos) = (omega1 * t).sin_cos();
            let position = to_value - envelope * (a * sin + x0 * cos);
            let velocity = zeta * omega0 * envelope * (a * sin + x0 * cos)
                - envelope * (cos * (v0 + zeta * omega0 * x0) - omega1 * x0 * sin);
            (position, velocity)
        } else {
            let envelope = (-omega0 * t).exp();
            let position = to_value - envelope * (x0 + (v0 + omega0 * x0) * t);
            let velocity = envelope * (v0 * (t * omega0 - 1.0) + t * x0 * omega0 * omega0);
            (position, velocity)
        }
    }
}

impl Animation for SpringAnimation {
    fn start(&mut self, from: f64, now_ms: f64) {
        self.from = from;
        self.start_ms = now_ms + self.config.delay_ms;
    }

    fn step(&mut self, now_ms: f64) -> Frame {
        if now_ms < self.start_ms {
            return Frame {
                value: self.from,
                finished: false,
            };
        }

        let to_value = self.config.to_value;
        let t = (now_ms - self.start_ms) / 1000.0;
        let (position, velocity) = self.solve(t);

        let overshot = self.config.overshoot_clamping
            && self.config.stiffness != 0.0
            && if self.from < to_value {
                position > to_value
            } else {
                position < to_value
            };
        let at_rest = velocity.abs() <= self.config.rest_speed_threshold
            && (self.config.stiffness == 0.0
                || (to_value - position).abs() <= self.config.rest_displacement_threshold);

        if overshot || at_rest {
            let value = if self.config.stiffness != 0.0 {
                to_value
            } else {
                position
            };
            return Frame {
                value,
                finished: true,
            };
        }
        Frame {
            value: position,
            finished: false,
        }
    }
}
