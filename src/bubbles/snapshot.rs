//! Serializable captures of the bar, for the CLI and for tests.

use serde::Serialize;

use super::bubble_animator::{BarLayout, TransitionState};
use super::view_animator::AnimatingBubbleState;
use super::BubbleBar;
use crate::scheduler::Scheduler;

/// Geometry of the bubble row at one progress value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometrySnapshot {
    pub fraction: f64,
    /// Offset of each bubble from the anchor edge.
    pub translations: Vec<f64>,
    pub expanded_width: f64,
    pub arrow_position: f64,
}

impl GeometrySnapshot {
    pub fn capture(layout: &BarLayout, state: TransitionState, fraction: f64) -> Self {
        let translations = if state == TransitionState::Idle {
            (0..layout.count)
                .map(|i| layout.steady_translation_x(i))
                .collect()
        } else {
            (0..layout.count)
                .map(|i| layout.translation_x(state, fraction, i))
                .collect()
        };

        let expanded_width = if state == TransitionState::Idle {
            layout.steady_width()
        } else {
            layout.expanded_width(state, fraction)
        };

        Self {
            fraction,
            translations,
            expanded_width,
            arrow_position: layout.arrow_position(state, fraction),
        }
    }
}

/// A whole transition sampled at evenly spaced progress values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionSnapshot {
    pub state: String,
    pub icon_size: f64,
    pub spacing: f64,
    pub count: usize,
    pub on_left: bool,
    pub frames: Vec<GeometrySnapshot>,
}

impl TransitionSnapshot {
    /// Samples `steps + 1` frames from progress 0 to 1.
    pub fn capture(layout: &BarLayout, state: TransitionState, steps: usize) -> Self {
        let steps = steps.max(1);
        let frames = (0..=steps)
            .map(|step| {
                let fraction = step as f64 / steps as f64;
                GeometrySnapshot::capture(layout, state, fraction)
            })
            .collect();

        Self {
            state: format!("{state:?}"),
            icon_size: layout.icon_size,
            spacing: layout.spacing,
            count: layout.count,
            on_left: layout.on_left,
            frames,
        }
    }
}

/// State of the whole bar at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSnapshot {
    pub bubbles: Vec<String>,
    pub selected: Option<String>,
    pub expanded: bool,
    pub visible: bool,
    pub stashed: bool,
    pub translation_y: f64,
    pub alpha: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub handle: Option<HandleSnapshot>,
    pub notification: Option<NotificationSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandleSnapshot {
    pub translation_y: f64,
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationSnapshot {
    pub bubble: String,
    pub state: String,
}

impl BarSnapshot {
    pub fn capture<S: Scheduler>(bubble_bar: &BubbleBar<S>) -> Self {
        let bar = bubble_bar.bar();
        let view = bar.view();

        let notification = bubble_bar.animator().animating_bubble().map(|key| {
            let state = bubble_bar
                .animator()
                .state()
                .map_or("none", state_name);
            NotificationSnapshot {
                bubble: key.to_owned(),
                state: state.to_owned(),
            }
        });

        Self {
            bubbles: bar.bubbles().to_vec(),
            selected: bar.selected_bubble().map(str::to_owned),
            expanded: bar.is_expanded(),
            visible: view.visible,
            stashed: bubble_bar.stash_controller().is_stashed(),
            translation_y: view.translation_y.current(),
            alpha: view.alpha.current(),
            scale_x: view.scale_x.current(),
            scale_y: view.scale_y.current(),
            handle: bubble_bar.handle().map(|handle| HandleSnapshot {
                translation_y: handle.translation_y.current(),
                alpha: handle.alpha.current(),
            }),
            notification,
        }
    }
}

fn state_name(state: AnimatingBubbleState) -> &'static str {
    match state {
        AnimatingBubbleState::Created => "created",
        AnimatingBubbleState::AnimatingIn => "animating-in",
        AnimatingBubbleState::In => "in",
        AnimatingBubbleState::AnimatingOut => "animating-out",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn transition_serializes() {
        let layout = BarLayout {
            icon_size: 100.,
            spacing: 20.,
            count: 2,
            on_left: false,
        };
        let snapshot =
            TransitionSnapshot::capture(&layout, TransitionState::AddingBubble { selected: 1 }, 1);

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["state"], json!("AddingBubble { selected: 1 }"));
        assert_eq!(value["frames"].as_array().unwrap().len(), 2);
        assert_eq!(
            value["frames"][1],
            json!({
                "fraction": 1.0,
                "translations": [0.0, 120.0],
                "expanded_width": 220.0,
                "arrow_position": 170.0,
            })
        );
    }

    #[test]
    fn idle_uses_resting_layout() {
        let layout = BarLayout {
            icon_size: 100.,
            spacing: 20.,
            count: 3,
            on_left: true,
        };
        let snapshot = GeometrySnapshot::capture(&layout, TransitionState::Idle, 0.);
        assert_eq!(snapshot.translations, vec![240., 120., 0.]);
        assert_eq!(snapshot.expanded_width, 340.);
    }
}
