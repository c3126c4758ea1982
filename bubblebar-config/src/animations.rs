/// Resolved animation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Animation {
    pub off: bool,
    pub kind: AnimationKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationKind {
    Easing(EasingParams),
    Spring(SpringParams),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EasingParams {
    pub duration_ms: u32,
    pub curve: Curve,
}

#[derive(knuffel::DecodeScalar, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Curve {
    Linear,
    EaseOutQuad,
    EaseOutCubic,
    EaseOutExpo,
}

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    #[knuffel(property)]
    pub damping_ratio: f64,
    #[knuffel(property)]
    pub stiffness: u32,
    #[knuffel(property)]
    pub epsilon: f64,
}

/// An animation node as written in the config.
///
/// Everything is optional; missing parts are taken from the built-in default of the animation
/// this node configures.
#[derive(knuffel::Decode, Debug, Default, Clone, Copy, PartialEq)]
pub struct AnimationPart {
    #[knuffel(child)]
    pub off: bool,
    #[knuffel(child, unwrap(argument))]
    pub duration_ms: Option<u32>,
    #[knuffel(child, unwrap(argument))]
    pub curve: Option<Curve>,
    #[knuffel(child)]
    pub spring: Option<SpringParams>,
}

impl AnimationPart {
    pub fn resolve(&self, default: Animation) -> Animation {
        let off = self.off || default.off;

        if let Some(spring) = self.spring {
            return Animation {
                off,
                kind: AnimationKind::Spring(spring),
            };
        }

        if self.duration_ms.is_none() && self.curve.is_none() {
            return Animation { off, ..default };
        }

        // Switching a spring default over to easing keeps whichever half the user gave us.
        let base = match default.kind {
            AnimationKind::Easing(p) => p,
            AnimationKind::Spring(_) => EasingParams {
                duration_ms: 250,
                curve: Curve::EaseOutCubic,
            },
        };

        Animation {
            off,
            kind: AnimationKind::Easing(EasingParams {
                duration_ms: self.duration_ms.unwrap_or(base.duration_ms),
                curve: self.curve.unwrap_or(base.curve),
            }),
        }
    }
}

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Animations {
    #[knuffel(child)]
    pub off: bool,
    #[knuffel(child, unwrap(argument), default = 1.)]
    pub slowdown: f64,
    #[knuffel(child, default)]
    pub bubble_transition: AnimationPart,
    #[knuffel(child, default)]
    pub bar_translation: AnimationPart,
    #[knuffel(child, default)]
    pub stash_alpha: AnimationPart,
    #[knuffel(child, default)]
    pub stash: AnimationPart,
    #[knuffel(child, default)]
    pub handle_overshoot: AnimationPart,
    #[knuffel(child, default)]
    pub new_bubble: AnimationPart,
    #[knuffel(child, default)]
    pub bounce: AnimationPart,
}

impl Default for Animations {
    fn default() -> Self {
        Self {
            off: false,
            slowdown: 1.,
            bubble_transition: AnimationPart::default(),
            bar_translation: AnimationPart::default(),
            stash_alpha: AnimationPart::default(),
            stash: AnimationPart::default(),
            handle_overshoot: AnimationPart::default(),
            new_bubble: AnimationPart::default(),
            bounce: AnimationPart::default(),
        }
    }
}

impl Animations {
    /// Bubbles growing in or shrinking out of the expanded bar.
    pub fn bubble_transition(&self) -> Animation {
        self.bubble_transition.resolve(easing(250, Curve::Linear))
    }

    /// The bar moving between its taskbar and hotseat positions.
    pub fn bar_translation(&self) -> Animation {
        self.bar_translation.resolve(easing(300, Curve::EaseOutCubic))
    }

    pub fn stash_alpha(&self) -> Animation {
        self.stash_alpha.resolve(easing(250, Curve::Linear))
    }

    /// Translation and scale of the bar collapsing into the handle.
    pub fn stash(&self) -> Animation {
        self.stash.resolve(spring(1., 800, 0.0001))
    }

    /// The handle settling back after the stash translation is done.
    pub fn handle_overshoot(&self) -> Animation {
        self.handle_overshoot.resolve(spring(0.5, 1500, 0.0001))
    }

    /// The new-bubble notification morph and slide-in.
    pub fn new_bubble(&self) -> Animation {
        self.new_bubble.resolve(spring(0.5, 200, 0.0001))
    }

    /// The upward leg of the collapsed bar bounce.
    pub fn bounce(&self) -> Animation {
        self.bounce.resolve(easing(250, Curve::EaseOutQuad))
    }
}

fn easing(duration_ms: u32, curve: Curve) -> Animation {
    Animation {
        off: false,
        kind: AnimationKind::Easing(EasingParams { duration_ms, curve }),
    }
}

fn spring(damping_ratio: f64, stiffness: u32, epsilon: f64) -> Animation {
    Animation {
        off: false,
        kind: AnimationKind::Spring(SpringParams {
            damping_ratio,
            stiffness,
            epsilon,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_part_keeps_default() {
        let default = spring(0.5, 200, 0.0001);
        assert_eq!(AnimationPart::default().resolve(default), default);
    }

    #[test]
    fn curve_only_keeps_default_duration() {
        let part = AnimationPart {
            curve: Some(Curve::EaseOutExpo),
            ..Default::default()
        };
        assert_eq!(
            part.resolve(easing(300, Curve::Linear)),
            easing(300, Curve::EaseOutExpo)
        );
    }

    #[test]
    fn easing_over_spring_default() {
        let part = AnimationPart {
            duration_ms: Some(100),
            ..Default::default()
        };
        assert_eq!(
            part.resolve(spring(1., 800, 0.0001)),
            easing(100, Curve::EaseOutCubic)
        );
    }

    #[test]
    fn off_propagates() {
        let part = AnimationPart {
            off: true,
            ..Default::default()
        };
        assert!(part.resolve(easing(250, Curve::Linear)).off);
    }
}
