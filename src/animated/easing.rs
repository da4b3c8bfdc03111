//! Easing curves for timing animations and interpolations.

use std::f64::consts::PI;

/// A timing curve mapping progress in `[0, 1]` to eased progress.
///
/// Curves compose: `Easing::ease_out(Easing::Quad)` runs a quadratic backwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Easing {
    Linear,
    /// Jumps to 1 as soon as `t > 0`.
    Step0,
    /// Jumps to 1 once `t >= 1`.
    Step1,
    Quad,
    Cubic,
    Poly(f64),
    Sin,
    Circle,
    Exp,
    /// Spring-like overshoot; the argument is the bounciness.
    Elastic(f64),
    /// Backs up before moving; the argument is the overshoot amount.
    Back(f64),
    Bounce,
    Bezier(CubicBezier),
    In(Box<Easing>),
    Out(Box<Easing>),
    InOut(Box<Easing>),
}

impl Default for Easing {
    fn default() -> Self {
        Easing::Linear
    }
}

impl Easing {
    /// The standard CSS `ease` curve.
    pub fn ease() -> Self {
        Easing::Bezier(CubicBezier::new(0.42, 0.0, 1.0, 1.0))
    }

    pub fn bezier(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Easing::Bezier(CubicBezier::new(x1, y1, x2, y2))
    }

    pub fn elastic() -> Self {
        Easing::Elastic(1.0)
    }

    pub fn back() -> Self {
        Easing::Back(1.70158)
    }

    pub fn ease_in(easing: Easing) -> Self {
        Easing::In(Box::new(easing))
    }

    pub fn ease_out(easing: Easing) -> Self {
        Easing::Out(Box::new(easing))
    }

    pub fn ease_in_out(easing: Easing) -> Self {
        Easing::InOut(Box::new(easing))
    }

    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::Step0 => {
                if t > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Easing::Step1 => {
                if t >= 1.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Easing::Quad => t * t,
            Easing::Cubic => t * t * t,
            Easing::Poly(n) => t.powf(*n),
            Easing::Sin => 1.0 - (t * PI / 2.0).cos(),
            Easing::Circle => 1.0 - (1.0 - t * t).sqrt(),
            Easing::Exp => 2f64.powf(10.0 * (t - 1.0)),
            Easing::Elastic(bounciness) => {
                let p = bounciness * PI;
                1.0 - (t * PI / 2.0).cos().powi(3) * (t * p).cos()
            }
            Easing::Back(s) => t * t * ((s + 1.0) * t - s),
            Easing::Bounce => bounce(t),
            Easing::Bezier(curve) => curve.solve(t),
            Easing::In(inner) => inner.apply(t),
            Easing::Out(inner) => 1.0 - inner.apply(1.0 - t),
            Easing::InOut(inner) => {
                if t < 0.5 {
                    inner.apply(t * 2.0) / 2.0
                } else {
                    1.0 - inner.apply((1.0 - t) * 2.0) / 2.0
                }
            }
        }
    }
}

fn bounce(mut t: f64) -> f64 {
    if t < 1.0 / 2.75 {
        return 7.5625 * t * t;
    }
    if t < 2.0 / 2.75 {
        t -= 1.5 / 2.75;
        return 7.5625 * t * t + 0.75;
    }
    if t < 2.5 / 2.75 {
        t -= 2.25 / 2.75;
        return 7.5625 * t * t + 0.9375;
    }
    t -= 2.625 / 2.75;
    7.5625 * t * t + 0.984375
}

const NEWTON_ITERATIONS: usize = 4;
const NEWTON_MIN_SLOPE: f64 = 0.001;
const SUBDIVISION_PRECISION: f64 = 0.0000001;
const SUBDIVISION_MAX_ITERATIONS: usize = 10;
const SPLINE_TABLE_SIZE: usize = 11;
const SAMPLE_STEP_SIZE: f64 = 1.0 / (SPLINE_TABLE_SIZE as f64 - 1.0);

/// Cubic Bezier timing curve through (0,0), (x1,y1), (x2,y2), (1,1).
#[derive(Debug, Clone, PartialEq)]
pub struct CubicBezier {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    samples: [f64; SPLINE_TABLE_SIZE],
}

impl CubicBezier {
    /// `x1` and `x2` are clamped into `[0, 1]` so the curve stays a function.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let x1 = x1.clamp(0.0, 1.0);
        let x2 = x2.clamp(0.0, 1.0);
        let mut samples = [0.0; SPLINE_TABLE_SIZE];
        for (i, sample) in samples.iter_mut().enumerate() {
            *sample = calc_bezier(i as f64 * SAMPLE_STEP_SIZE, x1, x2);
        }
        Self {
            x1,
            y1,
            x2,
            y2,
            samples,
        }
    }

    pub fn solve(&self, x: f64) -> f64 {
        if self.x1 == self.y1 && self.x2 == self.y2 {
            return x;
        }
        if x == 0.0 || x == 1.0 {
            return x;
        }
        calc_bezier(self.t_for_x(x), self.y1, self.y2)
    }

    fn t_for_x(&self, x: f64) -> f64 {
        let mut interval_start = 0.0;
        let mut current = 1;
        let last = SPLINE_TABLE_SIZE - 1;

        while current != last && self.samples[current] <= x {
            interval_start += SAMPLE_STEP_SIZE;
            current += 1;
        }
        current -= 1;

        let dist = (x - self.samples[current]) / (self.samples[current + 1] - self.samples[current]);
        let guess = interval_start + dist * SAMPLE_STEP_SIZE;

        let slope = get_slope(guess, self.x1, self.x2);
        if slope >= NEWTON_MIN_SLOPE {
            newton_raphson(x, guess, self.x1, self.x2)
        } else if slope == 0.0 {
            guess
        } else {
            binary_subdivide(x, interval_start, interval_start + SAMPLE_STEP_SIZE, self.x1, self.x2)
        }
    }
}

fn coefficients(a1: f64, a2: f64) -> (f64, f64, f64) {
    (1.0 - 3.0 * a2 + 3.0 * a1, 3.0 * a2 - 6.0 * a1, 3.0 * a1)
}

fn calc_bezier(t: f64, a1: f64, a2: f64) -> f64 {
    let (a, b, c) = coefficients(a1, a2);
    ((a * t + b) * t + c) * t
}

fn get_slope(t: f64, a1: f64, a2: f64) -> f64 {
    let (a, b, c) = coefficients(a1, a2);
    3.0 * a * t * t + 2.0 * b * t + c
}

fn binary_subdivide(x: f64, mut a: f64, mut b: f64, x1: f64, x2: f64) -> f64 {
    let mut current_t = a;
    for _ in 0..SUBDIVISION_MAX_ITERATIONS {
        current_t = a + (b - a) / 2.0;
        let current_x = calc_bezier(current_t, x1, x2) - x;
        if current_x.abs() <= SUBDIVISION_PRECISION {
            break;
        }
        if current_x > 0.0 {
            b = current_t;
        } else {
            a = current_t;
        }
    }
    current_t
}

fn newton_raphson(x: f64, mut guess: f64, x1: f64, x2: f64) -> f64 {
    for _ in 0..NEWTON_ITERATIONS {
        let slope = get_slope(guess, x1, x2);
        if slope == 0.0 {
            return guess;
        }
        let current_x = calc_bezier(guess, x1, x2) - x;
        guess -= current_x / slope;
    }
    guess
}
