use crate::animation::{Animation, Clock};

/// A view property that is either static or animating.
#[derive(Debug, Clone)]
pub enum AnimatedValue {
    Static(f64),
    Animation(Animation),
}

impl AnimatedValue {
    pub fn new(value: f64) -> Self {
        Self::Static(value)
    }

    pub fn current(&self) -> f64 {
        match self {
            AnimatedValue::Static(value) => *value,
            AnimatedValue::Animation(anim) => anim.value(),
        }
    }

    /// Returns the value this property settles at.
    pub fn target(&self) -> f64 {
        match self {
            AnimatedValue::Static(value) => *value,
            AnimatedValue::Animation(anim) => anim.to(),
        }
    }

    /// Sets the value, stopping any ongoing animation.
    pub fn set(&mut self, value: f64) {
        *self = AnimatedValue::Static(value);
    }

    pub fn animate(&mut self, anim: Animation) {
        *self = AnimatedValue::Animation(anim);
    }

    /// Animates from the current value to `to`.
    ///
    /// An ongoing animation towards the same target is left alone.
    pub fn animate_to(&mut self, clock: &Clock, to: f64, config: bubblebar_config::Animation) {
        let velocity = match self {
            AnimatedValue::Static(value) => {
                if *value == to {
                    return;
                }
                0.
            }
            AnimatedValue::Animation(anim) => {
                if anim.to() == to {
                    return;
                }
                anim.velocity()
            }
        };

        let from = self.current();
        let anim = Animation::new(clock.clone(), from, to, velocity, config);
        *self = AnimatedValue::Animation(anim);
    }

    /// Freezes the value where it currently is.
    pub fn stop(&mut self) {
        *self = AnimatedValue::Static(self.current());
    }

    /// Collapses a finished animation into its final value.
    pub fn advance(&mut self) {
        if let AnimatedValue::Animation(anim) = self {
            if anim.is_done() {
                *self = AnimatedValue::Static(anim.to());
            }
        }
    }

    pub fn is_animation_ongoing(&self) -> bool {
        matches!(self, AnimatedValue::Animation(_))
    }
}

impl Default for AnimatedValue {
    fn default() -> Self {
        Self::Static(0.)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use approx::assert_abs_diff_eq;
    use bubblebar_config::{AnimationKind, Curve, EasingParams};

    use super::*;

    fn linear() -> bubblebar_config::Animation {
        bubblebar_config::Animation {
            off: false,
            kind: AnimationKind::Easing(EasingParams {
                duration_ms: 100,
                curve: Curve::Linear,
            }),
        }
    }

    #[test]
    fn animate_and_collapse() {
        let mut clock = Clock::with_time(Duration::ZERO);
        let mut value = AnimatedValue::new(0.);

        value.animate_to(&clock, 10., linear());
        assert!(value.is_animation_ongoing());
        assert_eq!(value.target(), 10.);

        clock.set_unadjusted(Duration::from_millis(50));
        assert_abs_diff_eq!(value.current(), 5.);
        value.advance();
        assert!(value.is_animation_ongoing());

        clock.set_unadjusted(Duration::from_millis(100));
        value.advance();
        assert!(!value.is_animation_ongoing());
        assert_eq!(value.current(), 10.);
    }

    #[test]
    fn animate_to_current_value_is_noop() {
        let clock = Clock::with_time(Duration::ZERO);
        let mut value = AnimatedValue::new(3.);
        value.animate_to(&clock, 3., linear());
        assert!(!value.is_animation_ongoing());
    }

    #[test]
    fn stop_freezes() {
        let mut clock = Clock::with_time(Duration::ZERO);
        let mut value = AnimatedValue::new(0.);
        value.animate_to(&clock, 10., linear());

        clock.set_unadjusted(Duration::from_millis(30));
        value.stop();
        clock.set_unadjusted(Duration::from_millis(90));
        assert_abs_diff_eq!(value.current(), 3.);
    }
}
