use std::time::Duration;

use keyframe::functions::{EaseOutCubic, EaseOutQuad};
use keyframe::EasingFunction;

mod clock;
mod spring;

pub use clock::{get_monotonic_time, Clock};
pub use spring::{Spring, SpringParams};

#[derive(Debug, Clone)]
pub struct Animation {
    from: f64,
    to: f64,
    initial_velocity: f64,
    is_off: bool,
    duration: Duration,
    start_time: Duration,
    clock: Clock,
    kind: Kind,
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Easing { curve: Curve },
    Spring(Spring),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Linear,
    EaseOutQuad,
    EaseOutCubic,
    EaseOutExpo,
}

impl Animation {
    pub fn new(
        clock: Clock,
        from: f64,
        to: f64,
        initial_velocity: f64,
        config: bubblebar_config::Animation,
    ) -> Self {
        // Scale the velocity by rate to keep the spring feeling the same under slowdown.
        let initial_velocity = initial_velocity / clock.rate().max(0.001);

        let mut rv = Self::ease(clock, from, to, initial_velocity, 0, Curve::EaseOutCubic);
        if config.off {
            rv.is_off = true;
            return rv;
        }

        rv.replace_config(config);
        rv
    }

    pub fn replace_config(&mut self, config: bubblebar_config::Animation) {
        self.is_off = config.off;
        if config.off {
            self.duration = Duration::ZERO;
            return;
        }

        let start_time = self.start_time;

        match config.kind {
            bubblebar_config::AnimationKind::Spring(p) => {
                let params = SpringParams::new(p.damping_ratio, f64::from(p.stiffness), p.epsilon);

                let spring = Spring {
                    from: self.from,
                    to: self.to,
                    initial_velocity: self.initial_velocity,
                    params,
                };
                *self = Self::spring(self.clock.clone(), spring);
            }
            bubblebar_config::AnimationKind::Easing(p) => {
                *self = Self::ease(
                    self.clock.clone(),
                    self.from,
                    self.to,
                    self.initial_velocity,
                    u64::from(p.duration_ms),
                    Curve::from(p.curve),
                );
            }
        }

        self.start_time = start_time;
    }

    pub fn ease(
        clock: Clock,
        from: f64,
        to: f64,
        initial_velocity: f64,
        duration_ms: u64,
        curve: Curve,
    ) -> Self {
        let now = clock.now();
        let duration = Duration::from_millis(duration_ms);
        let kind = Kind::Easing { curve };

        Self {
            from,
            to,
            initial_velocity,
            is_off: false,
            duration,
            start_time: now,
            clock,
            kind,
        }
    }

    pub fn spring(clock: Clock, spring: Spring) -> Self {
        let _span = tracy_client::span!("Animation::spring");

        let now = clock.now();
        let duration = spring.duration();
        let kind = Kind::Spring(spring);

        Self {
            from: spring.from,
            to: spring.to,
            initial_velocity: spring.initial_velocity,
            is_off: false,
            duration,
            start_time: now,
            clock,
            kind,
        }
    }

    /// Holds the animation at `from` for `delay` before it starts moving.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        if !self.is_off {
            self.start_time = self.start_time.saturating_add(delay);
        }
        self
    }

    pub fn is_done(&self) -> bool {
        if self.clock.should_complete_instantly() {
            return true;
        }

        self.clock.now() >= self.start_time + self.duration
    }

    pub fn value(&self) -> f64 {
        if self.is_done() {
            return self.to;
        }

        let passed = self.clock.now().saturating_sub(self.start_time);

        match self.kind {
            Kind::Easing { curve } => {
                let passed = passed.as_secs_f64();
                let total = self.duration.as_secs_f64();
                let x = (passed / total).clamp(0., 1.);
                curve.y(x) * (self.to - self.from) + self.from
            }
            Kind::Spring(spring) => {
                let value = spring.value_at(passed);

                // Protect against numerical instability.
                if value.is_nan() {
                    self.to
                } else {
                    value
                }
            }
        }
    }

    /// Current velocity in units per second.
    pub fn velocity(&self) -> f64 {
        if self.is_done() {
            return 0.;
        }

        let now = self.clock.now();
        if now < self.start_time {
            return 0.;
        }

        let passed = now - self.start_time;
        match self.kind {
            Kind::Easing { curve } => {
                const DELTA: f64 = 0.001;
                let total = self.duration.as_secs_f64();
                let x = (passed.as_secs_f64() / total).clamp(0., 1.);
                let x1 = (x + DELTA).min(1.);
                if x1 <= x {
                    return 0.;
                }
                (curve.y(x1) - curve.y(x)) / (x1 - x) * (self.to - self.from) / total
            }
            Kind::Spring(spring) => spring.velocity_at(passed),
        }
    }

    pub fn to(&self) -> f64 {
        self.to
    }

    pub fn from(&self) -> f64 {
        self.from
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Curve {
    pub fn y(self, x: f64) -> f64 {
        match self {
            Curve::Linear => x,
            Curve::EaseOutQuad => EaseOutQuad.y(x),
            Curve::EaseOutCubic => EaseOutCubic.y(x),
            Curve::EaseOutExpo => 1. - 2f64.powf(-10. * x),
        }
    }
}

impl From<bubblebar_config::Curve> for Curve {
    fn from(value: bubblebar_config::Curve) -> Self {
        match value {
            bubblebar_config::Curve::Linear => Curve::Linear,
            bubblebar_config::Curve::EaseOutQuad => Curve::EaseOutQuad,
            bubblebar_config::Curve::EaseOutCubic => Curve::EaseOutCubic,
            bubblebar_config::Curve::EaseOutExpo => Curve::EaseOutExpo,
        }
    }
}
