//! Bubble positions while bubbles are added to or removed from the expanded bar.
//!
//! All positions are horizontal offsets from the anchor edge of the bubble row, in the same units
//! as the icon size. A bar on the right grows from a fixed left edge, so bubble 0 is leftmost and
//! indices increase to the right. A bar on the left is the mirror image: the last bubble sits at
//! the anchor and bubble 0 is rightmost.
//!
//! Bubbles scale around their center, so the translation of a scaling bubble includes a pivot
//! adjustment of `-(1 - scale) * icon_size / 2`.

use std::cmp::Ordering;

use crate::animation::{Animation, Clock};

/// Which geometry applies to the bubble row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    Idle,
    /// A new bubble grows in at index 0.
    AddingBubble { selected: usize },
    /// The bubble at `removed` shrinks out. Indices refer to the list before the removal.
    RemovingBubble {
        removed: usize,
        selected: usize,
        removing_last: bool,
    },
    /// A new bubble grows in at index 0 while the bubble at `removed` shrinks out, so that the
    /// pair takes exactly one bubble of space throughout.
    AddingAndRemoving { selected: usize, removed: usize },
}

/// Receives the progress of a [`BubbleAnimator`].
pub trait BubbleAnimatorListener {
    fn on_animation_update(&mut self, animator: &BubbleAnimator, fraction: f64);
    fn on_animation_cancel(&mut self, animator: &BubbleAnimator);
    /// Called exactly once per transition, after completion or cancellation.
    fn on_animation_end(&mut self, animator: &BubbleAnimator);
}

/// Static inputs of the bubble row geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarLayout {
    pub icon_size: f64,
    pub spacing: f64,
    /// Number of bubbles in the row, including any that are scaling.
    pub count: usize,
    pub on_left: bool,
}

impl BarLayout {
    fn pitch(&self) -> f64 {
        self.icon_size + self.spacing
    }

    /// Resting offset of bubble `index` when nothing animates.
    pub fn steady_translation_x(&self, index: usize) -> f64 {
        debug_assert!(index < self.count);

        if self.on_left {
            (self.count - index - 1) as f64 * self.pitch()
        } else {
            index as f64 * self.pitch()
        }
    }

    /// Resting width of the bubble row.
    pub fn steady_width(&self) -> f64 {
        let count = self.count as f64;
        count * self.icon_size + (count - 1.).max(0.) * self.spacing
    }

    pub fn translation_x(&self, state: TransitionState, fraction: f64, index: usize) -> f64 {
        if state == TransitionState::Idle {
            return 0.;
        }
        debug_assert!(index < self.count);

        let (edge, scale) = self.leading_edge(state, fraction, index);
        let pivot_adjustment = (scale - 1.) * self.icon_size / 2.;

        let edge = if self.on_left {
            self.expanded_width(state, fraction) - edge - scale * self.icon_size
        } else {
            edge
        };

        edge + pivot_adjustment
    }

    /// Width of the bubble row during the transition.
    pub fn expanded_width(&self, state: TransitionState, fraction: f64) -> f64 {
        let count = self.count as f64;

        let visible = match state {
            TransitionState::Idle => return 0.,
            TransitionState::AddingBubble { .. } => count - 1. + fraction,
            TransitionState::RemovingBubble { .. } => count - fraction,
            TransitionState::AddingAndRemoving { .. } => count - 1.,
        };

        // With fewer than two bubbles there is no gap left to scale.
        visible * self.icon_size + (visible - 1.).max(0.) * self.spacing
    }

    /// Center of the selection arrow.
    pub fn arrow_position(&self, state: TransitionState, fraction: f64) -> f64 {
        let half_icon = self.icon_size / 2.;

        match state {
            TransitionState::Idle => 0.,
            TransitionState::AddingBubble { selected }
            | TransitionState::AddingAndRemoving { selected, .. } => {
                self.translation_x(state, fraction, selected) + half_icon
            }
            TransitionState::RemovingBubble {
                removed,
                selected,
                removing_last,
            } => {
                if selected != removed {
                    return self.translation_x(state, fraction, selected) + half_icon;
                }

                // The arrow moves from the removed bubble over to its replacement: the previous
                // bubble when the last one goes away, the next one otherwise.
                let pitch = self.pitch();
                let from_anchor = (self.count - removed - 1) as f64 * pitch;
                match (removing_last, self.on_left) {
                    (true, true) => from_anchor + half_icon,
                    (true, false) => removed as f64 * pitch + half_icon - fraction * pitch,
                    (false, true) => from_anchor + half_icon - fraction * pitch,
                    (false, false) => removed as f64 * pitch + half_icon,
                }
            }
        }
    }

    /// Left edge of the scaled bubble and its scale, for a bar growing to the right.
    fn leading_edge(&self, state: TransitionState, fraction: f64, index: usize) -> (f64, f64) {
        let pitch = self.pitch();
        let i = index as f64;

        let (scaling, scale) = match state {
            TransitionState::Idle => return (0., 1.),
            TransitionState::AddingBubble { .. } => (0, fraction),
            TransitionState::RemovingBubble { removed, .. } => (removed, 1. - fraction),
            TransitionState::AddingAndRemoving { removed, .. } => {
                let added_scale = fraction;
                let removed_scale = 1. - fraction;

                return if index == 0 {
                    (0., added_scale)
                } else if index < removed {
                    (pitch * (i - 1. + added_scale), 1.)
                } else if index == removed {
                    (pitch * (i - 1.) + added_scale * self.icon_size, removed_scale)
                } else {
                    (pitch * (i - 1.), 1.)
                };
            }
        };

        match index.cmp(&scaling) {
            Ordering::Less => (pitch * i, 1.),
            Ordering::Equal => (pitch * i, scale),
            Ordering::Greater => (pitch * (i - 1. + scale), 1.),
        }
    }
}

/// Drives one bubble row transition from progress 0 to 1.
///
/// A new animator is created for every transition; its [`BarLayout`] does not change while it
/// runs.
#[derive(Debug)]
pub struct BubbleAnimator {
    layout: BarLayout,
    clock: Clock,
    config: bubblebar_config::Animation,
    state: TransitionState,
    fraction: f64,
    anim: Option<Animation>,
}

impl BubbleAnimator {
    pub fn new(layout: BarLayout, clock: Clock, config: bubblebar_config::Animation) -> Self {
        Self {
            layout,
            clock,
            config,
            state: TransitionState::Idle,
            fraction: 0.,
            anim: None,
        }
    }

    pub fn animate_new_bubble(&mut self, selected: usize) {
        self.start(TransitionState::AddingBubble { selected });
    }

    pub fn animate_removed_bubble(&mut self, removed: usize, selected: usize, removing_last: bool) {
        self.start(TransitionState::RemovingBubble {
            removed,
            selected,
            removing_last,
        });
    }

    pub fn animate_new_and_remove_old(&mut self, selected: usize, removed: usize) {
        debug_assert!(removed > 0, "the new bubble is always at index 0");
        self.start(TransitionState::AddingAndRemoving { selected, removed });
    }

    /// Starts `state`, replacing whatever was running without notifying anyone.
    fn start(&mut self, state: TransitionState) {
        match state {
            TransitionState::Idle => (),
            TransitionState::AddingBubble { selected } => {
                debug_assert!(selected < self.layout.count);
            }
            TransitionState::RemovingBubble {
                removed, selected, ..
            }
            | TransitionState::AddingAndRemoving { selected, removed } => {
                debug_assert!(selected < self.layout.count);
                debug_assert!(removed < self.layout.count);
            }
        }

        if self.anim.is_some() {
            trace!("replacing {:?} with {state:?}", self.state);
        }

        self.state = state;
        self.fraction = 0.;
        self.anim = Some(Animation::new(
            self.clock.clone(),
            0.,
            1.,
            0.,
            self.config,
        ));
    }

    pub fn advance_animations(&mut self, listener: &mut dyn BubbleAnimatorListener) {
        let _span = tracy_client::span!("BubbleAnimator::advance_animations");

        let Some(anim) = &self.anim else {
            return;
        };

        let fraction = anim.value().clamp(0., 1.);
        let is_done = anim.is_done();

        self.fraction = fraction;
        listener.on_animation_update(self, fraction);

        if is_done {
            self.anim = None;
            listener.on_animation_end(self);
            self.state = TransitionState::Idle;
        }
    }

    /// Stops the transition, delivering cancel and then end.
    pub fn cancel(&mut self, listener: &mut dyn BubbleAnimatorListener) {
        if self.anim.take().is_none() {
            return;
        }

        listener.on_animation_cancel(self);
        listener.on_animation_end(self);
        self.state = TransitionState::Idle;
    }

    pub fn is_running(&self) -> bool {
        self.state != TransitionState::Idle
    }

    pub fn state(&self) -> TransitionState {
        self.state
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    pub fn layout(&self) -> BarLayout {
        self.layout
    }

    pub fn bubble_count(&self) -> usize {
        self.layout.count
    }

    /// Offset of bubble `index`. Zero when idle.
    pub fn translation_x(&self, index: usize) -> f64 {
        self.layout.translation_x(self.state, self.fraction, index)
    }

    /// Width of the bubble row. Zero when idle.
    pub fn expanded_width(&self) -> f64 {
        self.layout.expanded_width(self.state, self.fraction)
    }

    /// Center of the selection arrow. Zero when idle.
    pub fn arrow_position(&self) -> f64 {
        self.layout.arrow_position(self.state, self.fraction)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use approx::assert_abs_diff_eq;
    use bubblebar_config::{AnimationKind, Curve, EasingParams};
    use proptest::prelude::*;

    use super::*;

    fn layout(count: usize, on_left: bool) -> BarLayout {
        BarLayout {
            icon_size: 100.,
            spacing: 20.,
            count,
            on_left,
        }
    }

    fn linear() -> bubblebar_config::Animation {
        bubblebar_config::Animation {
            off: false,
            kind: AnimationKind::Easing(EasingParams {
                duration_ms: 250,
                curve: Curve::Linear,
            }),
        }
    }

    fn table(layout: &BarLayout, state: TransitionState) -> String {
        [0., 0.5, 1.]
            .into_iter()
            .map(|fraction| {
                let translations: Vec<f64> = (0..layout.count)
                    .map(|i| layout.translation_x(state, fraction, i))
                    .collect();
                let width = layout.expanded_width(state, fraction);
                let arrow = layout.arrow_position(state, fraction);
                format!("{fraction:.1} {translations:?} width={width:?} arrow={arrow:?}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[derive(Default)]
    struct Recorder {
        updates: Vec<f64>,
        cancels: usize,
        ends: usize,
        running_at_end: Vec<bool>,
    }

    impl BubbleAnimatorListener for Recorder {
        fn on_animation_update(&mut self, _animator: &BubbleAnimator, fraction: f64) {
            self.updates.push(fraction);
        }

        fn on_animation_cancel(&mut self, _animator: &BubbleAnimator) {
            self.cancels += 1;
        }

        fn on_animation_end(&mut self, animator: &BubbleAnimator) {
            self.ends += 1;
            self.running_at_end.push(animator.is_running());
        }
    }

    #[test]
    fn adding_bubble_on_right() {
        let state = TransitionState::AddingBubble { selected: 1 };
        insta::assert_snapshot!(table(&layout(4, false), state), @r"
        0.0 [-50.0, 0.0, 120.0, 240.0] width=340.0 arrow=50.0
        0.5 [-25.0, 60.0, 180.0, 300.0] width=400.0 arrow=110.0
        1.0 [0.0, 120.0, 240.0, 360.0] width=460.0 arrow=170.0
        ");
    }

    #[test]
    fn adding_bubble_on_left() {
        let state = TransitionState::AddingBubble { selected: 1 };
        insta::assert_snapshot!(table(&layout(4, true), state), @r"
        0.0 [290.0, 240.0, 120.0, 0.0] width=340.0 arrow=290.0
        0.5 [325.0, 240.0, 120.0, 0.0] width=400.0 arrow=290.0
        1.0 [360.0, 240.0, 120.0, 0.0] width=460.0 arrow=290.0
        ");
    }

    #[test]
    fn new_bubble_pivot_at_start() {
        let layout = layout(4, false);
        let state = TransitionState::AddingBubble { selected: 1 };
        assert_abs_diff_eq!(layout.translation_x(state, 0., 0), -50.);
    }

    #[test]
    fn adding_ends_at_steady_state() {
        for on_left in [false, true] {
            let layout = layout(4, on_left);
            let state = TransitionState::AddingBubble { selected: 0 };
            for i in 0..4 {
                assert_abs_diff_eq!(
                    layout.translation_x(state, 1., i),
                    layout.steady_translation_x(i)
                );
            }
            assert_abs_diff_eq!(layout.expanded_width(state, 1.), layout.steady_width());
        }
    }

    #[test]
    fn adding_starts_at_previous_steady_state() {
        for on_left in [false, true] {
            let layout = layout(4, on_left);
            let before = BarLayout { count: 3, ..layout };
            let state = TransitionState::AddingBubble { selected: 1 };
            for i in 1..4 {
                assert_abs_diff_eq!(
                    layout.translation_x(state, 0., i),
                    before.steady_translation_x(i - 1)
                );
            }
            assert_abs_diff_eq!(layout.expanded_width(state, 0.), before.steady_width());
        }
    }

    #[test]
    fn removing_last_selected_on_left_keeps_arrow() {
        let layout = layout(3, true);
        let state = TransitionState::RemovingBubble {
            removed: 0,
            selected: 0,
            removing_last: true,
        };
        assert_abs_diff_eq!(layout.arrow_position(state, 1.), 290.);
        assert_abs_diff_eq!(layout.arrow_position(state, 0.), 290.);
    }

    #[test]
    fn removing_selected_moves_arrow_to_neighbor() {
        // Last of four on the right: the arrow slides over to the previous bubble.
        let state = TransitionState::RemovingBubble {
            removed: 3,
            selected: 3,
            removing_last: true,
        };
        let layout_right = layout(4, false);
        assert_abs_diff_eq!(layout_right.arrow_position(state, 0.), 410.);
        assert_abs_diff_eq!(layout_right.arrow_position(state, 1.), 290.);

        // Middle bubble on the left: the arrow moves to the next bubble.
        let state = TransitionState::RemovingBubble {
            removed: 1,
            selected: 1,
            removing_last: false,
        };
        let layout_left = layout(4, true);
        assert_abs_diff_eq!(layout_left.arrow_position(state, 0.), 290.);
        assert_abs_diff_eq!(layout_left.arrow_position(state, 1.), 170.);
        assert_abs_diff_eq!(
            layout_left.arrow_position(state, 1.),
            layout_left.translation_x(state, 1., 2) + 50.
        );
    }

    #[test]
    fn adding_and_removing_on_right() {
        let state = TransitionState::AddingAndRemoving {
            selected: 0,
            removed: 3,
        };
        insta::assert_snapshot!(table(&layout(4, false), state), @r"
        0.0 [-50.0, 0.0, 120.0, 240.0] width=340.0 arrow=0.0
        0.5 [-25.0, 60.0, 180.0, 265.0] width=340.0 arrow=25.0
        1.0 [0.0, 120.0, 240.0, 290.0] width=340.0 arrow=50.0
        ");
    }

    #[test]
    fn adding_and_removing_middle_on_left() {
        let state = TransitionState::AddingAndRemoving {
            selected: 0,
            removed: 1,
        };
        insta::assert_snapshot!(table(&layout(4, true), state), @r"
        0.0 [290.0, 240.0, 120.0, 0.0] width=340.0 arrow=340.0
        0.5 [265.0, 215.0, 120.0, 0.0] width=340.0 arrow=315.0
        1.0 [240.0, 190.0, 120.0, 0.0] width=340.0 arrow=290.0
        ");
    }

    #[test]
    fn idle_is_zero() {
        let layout = layout(3, false);
        assert_eq!(layout.translation_x(TransitionState::Idle, 0.5, 1), 0.);
        assert_eq!(layout.expanded_width(TransitionState::Idle, 0.5), 0.);
        assert_eq!(layout.arrow_position(TransitionState::Idle, 0.5), 0.);
    }

    #[test]
    fn single_bubble_width_does_not_go_negative() {
        let layout = layout(1, false);
        let state = TransitionState::AddingBubble { selected: 0 };
        assert_eq!(layout.expanded_width(state, 0.), 0.);
        assert_eq!(layout.expanded_width(state, 1.), 100.);
    }

    #[test]
    fn runs_to_idle() {
        let mut clock = Clock::with_time(Duration::ZERO);
        let mut animator = BubbleAnimator::new(layout(3, false), clock.clone(), linear());
        let mut recorder = Recorder::default();

        animator.animate_new_bubble(0);
        assert!(animator.is_running());

        clock.set_unadjusted(Duration::from_millis(125));
        animator.advance_animations(&mut recorder);
        assert!(animator.is_running());
        assert_abs_diff_eq!(animator.fraction(), 0.5);

        clock.set_unadjusted(Duration::from_millis(250));
        animator.advance_animations(&mut recorder);
        assert!(!animator.is_running());
        assert_eq!(animator.state(), TransitionState::Idle);

        assert_eq!(recorder.updates, vec![0.5, 1.]);
        assert_eq!(recorder.cancels, 0);
        assert_eq!(recorder.ends, 1);

        // Nothing more after the end.
        animator.advance_animations(&mut recorder);
        assert_eq!(recorder.ends, 1);
        assert_eq!(animator.expanded_width(), 0.);
    }

    #[test]
    fn cancel_delivers_cancel_then_end_once() {
        let clock = Clock::with_time(Duration::ZERO);
        let mut animator = BubbleAnimator::new(layout(3, false), clock, linear());
        let mut recorder = Recorder::default();

        animator.animate_removed_bubble(1, 0, false);
        animator.cancel(&mut recorder);
        animator.cancel(&mut recorder);

        assert!(!animator.is_running());
        assert_eq!(recorder.cancels, 1);
        assert_eq!(recorder.ends, 1);
        assert_eq!(recorder.running_at_end, vec![true]);
    }

    #[test]
    fn new_transition_replaces_running_one() {
        let mut clock = Clock::with_time(Duration::ZERO);
        let mut animator = BubbleAnimator::new(layout(4, false), clock.clone(), linear());
        let mut recorder = Recorder::default();

        animator.animate_new_bubble(0);
        clock.set_unadjusted(Duration::from_millis(100));
        animator.animate_new_and_remove_old(0, 3);
        assert_eq!(
            animator.state(),
            TransitionState::AddingAndRemoving {
                selected: 0,
                removed: 3
            }
        );
        assert_eq!(animator.fraction(), 0.);

        clock.set_unadjusted(Duration::from_millis(350));
        animator.advance_animations(&mut recorder);
        assert!(!animator.is_running());
        assert_eq!(recorder.ends, 1);
    }

    #[test]
    fn off_animation_finishes_on_first_advance() {
        let clock = Clock::with_time(Duration::ZERO);
        let config = bubblebar_config::Animation {
            off: true,
            ..linear()
        };
        let mut animator = BubbleAnimator::new(layout(2, true), clock, config);
        let mut recorder = Recorder::default();

        animator.animate_new_bubble(0);
        animator.advance_animations(&mut recorder);
        assert_eq!(recorder.updates, vec![1.]);
        assert!(!animator.is_running());
    }

    fn arb_fraction() -> impl Strategy<Value = f64> {
        (0..=100u32).prop_map(|x| f64::from(x) / 100.)
    }

    proptest! {
        #[test]
        fn adding_and_removing_conserves_width(
            (count, removed) in (3usize..8).prop_flat_map(|count| (Just(count), 1..count)),
            on_left: bool,
            fraction in arb_fraction(),
        ) {
            let layout = layout(count, on_left);
            let state = TransitionState::AddingAndRemoving { selected: 0, removed };
            let expected = BarLayout { count: count - 1, ..layout }.steady_width();
            prop_assert!((layout.expanded_width(state, fraction) - expected).abs() < 1e-9);
        }

        #[test]
        fn adding_and_removing_ends_at_steady_state(
            (count, removed) in (3usize..8).prop_flat_map(|count| (Just(count), 1..count)),
            on_left: bool,
        ) {
            let layout = layout(count, on_left);
            let state = TransitionState::AddingAndRemoving { selected: 0, removed };
            // The row holds one bubble less than `count` both before and after.
            let steady = BarLayout { count: count - 1, ..layout };

            for i in 1..count {
                let x = layout.translation_x(state, 0., i);
                let expected = steady.steady_translation_x(i - 1);
                prop_assert!((x - expected).abs() < 1e-9, "start of {i}: {x} != {expected}");
            }

            for i in (0..count).filter(|&i| i != removed) {
                let j = if i < removed { i } else { i - 1 };
                let x = layout.translation_x(state, 1., i);
                let expected = steady.steady_translation_x(j);
                prop_assert!((x - expected).abs() < 1e-9, "end of {i}: {x} != {expected}");
            }
        }

        #[test]
        fn removing_is_adding_backwards(
            (count, removed) in (2usize..8).prop_flat_map(|count| (Just(count), 0..count - 1)),
            on_left: bool,
            fraction in arb_fraction(),
        ) {
            let layout = layout(count, on_left);
            // From the removed bubble on, the row moves like a shorter row growing a new bubble.
            let tail = BarLayout { count: count - removed, ..layout };
            let offset = removed as f64 * layout.pitch();
            let shift = if on_left { 0. } else { offset };

            let adding = TransitionState::AddingBubble { selected: 0 };
            let removing = TransitionState::RemovingBubble {
                removed,
                selected: count - 1,
                removing_last: false,
            };

            for i in removed..count {
                let a = tail.translation_x(adding, 1. - fraction, i - removed) + shift;
                let r = layout.translation_x(removing, fraction, i);
                prop_assert!((a - r).abs() < 1e-9, "bubble {i}: {a} != {r}");
            }
            if !on_left {
                for i in 0..removed {
                    let r = layout.translation_x(removing, fraction, i);
                    prop_assert!((r - layout.steady_translation_x(i)).abs() < 1e-9);
                }
            }

            let a = tail.expanded_width(adding, 1. - fraction) + offset;
            let r = layout.expanded_width(removing, fraction);
            prop_assert!((a - r).abs() < 1e-9);
        }

        #[test]
        fn arrow_is_continuous(
            count in 2usize..8,
            on_left: bool,
            removing_last: bool,
            selected_is_removed: bool,
        ) {
            let layout = layout(count, on_left);
            let removed = if removing_last { count - 1 } else { 0 };
            let selected = if selected_is_removed { removed } else { (removed + 1) % count };
            let state = TransitionState::RemovingBubble { removed, selected, removing_last };

            let max_step = 2. * layout.pitch() / 100. + 1e-9;
            let mut prev = layout.arrow_position(state, 0.);
            for step in 1..=100 {
                let arrow = layout.arrow_position(state, f64::from(step) / 100.);
                prop_assert!((arrow - prev).abs() <= max_step, "jump at {step}: {prev} -> {arrow}");
                prev = arrow;
            }
        }

        #[test]
        fn listener_sees_exclusive_states(ops in proptest::collection::vec(0u8..4, 1..20)) {
            let mut clock = Clock::with_time(Duration::ZERO);
            let mut animator = BubbleAnimator::new(layout(5, false), clock.clone(), linear());
            let mut recorder = Recorder::default();
            let mut now = Duration::ZERO;

            for op in ops {
                match op {
                    0 => animator.animate_new_bubble(1),
                    1 => animator.animate_removed_bubble(2, 2, false),
                    2 => animator.animate_new_and_remove_old(0, 4),
                    _ => {
                        now += Duration::from_millis(100);
                        clock.set_unadjusted(now);
                        animator.advance_animations(&mut recorder);
                    }
                }
                prop_assert!((0. ..=1.).contains(&animator.fraction()));
            }

            animator.cancel(&mut recorder);
            prop_assert!(!animator.is_running());
            prop_assert!(recorder.running_at_end.iter().all(|running| *running));
        }
    }
}
