//! Bubble bar configuration.
//!
//! The config is a KDL document with three top-level sections: `bubble-bar`, `taskbar` and
//! `animations`. Every section and every field is optional.

#[macro_use]
extern crate tracing;

use std::path::Path;

use miette::{Context, IntoDiagnostic};

pub mod animations;
pub mod bubble_bar;

pub use crate::animations::{
    Animation, AnimationKind, AnimationPart, Animations, Curve, EasingParams, SpringParams,
};
pub use crate::bubble_bar::{BubbleBar, Taskbar};

#[derive(knuffel::Decode, Debug, Default, Clone, PartialEq)]
pub struct Config {
    #[knuffel(child, default)]
    pub bubble_bar: BubbleBar,
    #[knuffel(child, default)]
    pub taskbar: Taskbar,
    #[knuffel(child, default)]
    pub animations: Animations,
}

impl Config {
    pub fn load(path: &Path) -> miette::Result<Self> {
        let _span = tracy_client::span!("Config::load");

        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("error reading {path:?}"))?;

        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("config.kdl");
        let config = Self::parse(filename, &contents).context("error parsing")?;
        debug!("loaded config from {path:?}");
        Ok(config)
    }

    pub fn parse(filename: &str, text: &str) -> Result<Self, knuffel::Error> {
        let _span = tracy_client::span!("Config::parse");
        knuffel::parse(filename, text)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[track_caller]
    fn do_parse(text: &str) -> Config {
        Config::parse("test.kdl", text)
            .map_err(miette::Report::new)
            .unwrap()
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(do_parse(""), Config::default());
    }

    #[test]
    fn parse_full() {
        let config = do_parse(
            r##"
            bubble-bar {
                icon-size 48.0
                icon-spacing 8.0
                max-bubbles 4
                notification-hide-delay-ms 1000
                on-left
            }

            taskbar {
                transient
                taskbar-height 110.0
                taskbar-bottom-space 0.0
            }

            animations {
                slowdown 2.0

                bubble-transition {
                    duration-ms 100
                    curve "ease-out-expo"
                }

                new-bubble {
                    spring damping-ratio=1.0 stiffness=400 epsilon=0.001
                }

                bounce {
                    off
                }
            }
            "##,
        );

        assert_eq!(
            config.bubble_bar,
            BubbleBar {
                icon_size: 48.,
                icon_spacing: 8.,
                max_bubbles: 4,
                notification_hide_delay_ms: 1000,
                on_left: true,
                ..Default::default()
            }
        );
        assert_eq!(
            config.taskbar,
            Taskbar {
                transient: true,
                taskbar_height: 110.,
                taskbar_bottom_space: 0.,
                ..Default::default()
            }
        );

        let animations = &config.animations;
        assert_eq!(animations.slowdown, 2.);
        assert_eq!(
            animations.bubble_transition(),
            Animation {
                off: false,
                kind: AnimationKind::Easing(EasingParams {
                    duration_ms: 100,
                    curve: Curve::EaseOutExpo,
                }),
            }
        );
        assert_eq!(
            animations.new_bubble(),
            Animation {
                off: false,
                kind: AnimationKind::Spring(SpringParams {
                    damping_ratio: 1.,
                    stiffness: 400,
                    epsilon: 0.001,
                }),
            }
        );
        assert!(animations.bounce().off);
        assert!(!animations.stash().off);
    }

    #[test]
    fn unknown_curve_is_an_error() {
        let result = Config::parse(
            "test.kdl",
            r#"
            animations {
                stash-alpha {
                    curve "bouncy"
                }
            }
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn off_bubble_bar() {
        let config = do_parse("bubble-bar { off; }");
        assert!(config.bubble_bar.off);
        assert_eq!(config.bubble_bar.icon_size, BubbleBar::default().icon_size);
    }
}
