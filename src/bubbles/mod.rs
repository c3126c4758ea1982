//! The taskbar bubble bar.
//!
//! [`BubbleBar`] ties together the pieces:
//!
//! * [`BubbleBarViewController`] owns the bar view and the ordered bubbles, and runs the
//!   [`BubbleAnimator`](bubble_animator::BubbleAnimator) transitions of the expanded row.
//! * A [`BubbleStashController`] decides whether the bar is stashed into its handle or shown, and
//!   where it rests.
//! * [`BubbleBarViewAnimator`] plays the show, wait and hide sequence of a new bubble.
//!
//! Everything runs on one thread. Animations are driven by a shared [`Clock`] and advanced by the
//! embedder once per frame; delayed work goes through a [`Scheduler`].

use std::rc::Rc;
use std::time::Duration;

use bubblebar_config::Config;

use self::bar_controller::BubbleBarViewController;
#[cfg(test)]
use self::bubble_animator::TransitionState;
use self::stash::{
    stash_controller_for, BubbleStashController, StashContext, TaskbarDimensions,
    TaskbarHotseatDimensionsProvider,
};
use self::view::StashedHandleView;
use self::view_animator::{AnimatorContext, BubbleBarViewAnimator};
use crate::animation::Clock;
use crate::scheduler::{ManualScheduler, Scheduler, Task};

pub mod animated_value;
pub mod bar_controller;
pub mod bubble_animator;
pub mod snapshot;
pub mod stash;
pub mod view;
pub mod view_animator;


/// Runtime options of the bubble bar, resolved from the config.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub enabled: bool,
    pub icon_size: f64,
    pub icon_spacing: f64,
    /// Padding between the bubbles and the bar edges.
    pub bar_padding: f64,
    /// Horizontal offset of the second icon in the collapsed bar.
    pub collapsed_offset: f64,
    pub max_bubbles: usize,
    /// How far the collapsed bar jumps up for a new bubble.
    pub bounce_distance: f64,
    pub notification_hide_delay: Duration,
    pub on_left: bool,
    pub transient_taskbar: bool,
    pub taskbar: TaskbarDimensions,
    pub handle_width: f64,
    pub handle_height: f64,
    /// Distance from the bottom of the screen to the center of the stashed handle.
    pub handle_center_from_bottom: f64,
    pub animations: bubblebar_config::Animations,
}

impl Default for Options {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Options {
    pub fn from_config(config: &Config) -> Self {
        let bar = &config.bubble_bar;
        let taskbar = &config.taskbar;
        let defaults = bubblebar_config::BubbleBar::default();

        let mut max_bubbles = bar.max_bubbles as usize;
        if max_bubbles == 0 {
            warn!("max-bubbles must be at least 1, using 1");
            max_bubbles = 1;
        }

        let mut animations = config.animations;
        if !animations.slowdown.is_finite() || animations.slowdown <= 0. {
            warn!("animation slowdown must be positive, using 1");
            animations.slowdown = 1.;
        }

        Self {
            enabled: !bar.off,
            icon_size: positive("icon-size", bar.icon_size, defaults.icon_size),
            icon_spacing: non_negative("icon-spacing", bar.icon_spacing),
            bar_padding: non_negative("bar-padding", bar.bar_padding),
            collapsed_offset: non_negative("collapsed-offset", bar.collapsed_offset),
            max_bubbles,
            bounce_distance: non_negative("bounce-distance", bar.bounce_distance),
            notification_hide_delay: Duration::from_millis(u64::from(
                bar.notification_hide_delay_ms,
            )),
            on_left: bar.on_left,
            transient_taskbar: taskbar.transient,
            taskbar: TaskbarDimensions {
                taskbar_height: non_negative("taskbar-height", taskbar.taskbar_height),
                taskbar_bottom_space: taskbar.taskbar_bottom_space,
                hotseat_height: non_negative("hotseat-height", taskbar.hotseat_height),
                hotseat_bottom_space: taskbar.hotseat_bottom_space,
            },
            handle_width: non_negative("handle-width", taskbar.handle_width),
            handle_height: non_negative("handle-height", taskbar.handle_height),
            handle_center_from_bottom: taskbar.handle_center_from_bottom,
            animations,
        }
    }
}

fn positive(name: &str, value: f64, fallback: f64) -> f64 {
    if value > 0. && value.is_finite() {
        value
    } else {
        warn!("{name} must be positive, using {fallback}");
        fallback
    }
}

fn non_negative(name: &str, value: f64) -> f64 {
    if value >= 0. && value.is_finite() {
        value
    } else {
        warn!("{name} must not be negative, using 0");
        0.
    }
}

/// Changes the embedder is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BubbleBarEvent {
    Expanded(bool),
    BubbleBarVisible(bool),
}

/// The bubble bar with all of its controllers.
pub struct BubbleBar<S: Scheduler> {
    options: Rc<Options>,
    clock: Clock,
    bar: BubbleBarViewController,
    /// Present on the transient taskbar.
    handle: Option<StashedHandleView>,
    stash: Box<dyn BubbleStashController>,
    animator: BubbleBarViewAnimator<S>,
    /// Dimensions set by the embedder, replacing the ones from the config.
    custom_dimensions: Option<Rc<dyn TaskbarHotseatDimensionsProvider>>,
}

impl<S: Scheduler> BubbleBar<S> {
    pub fn new(clock: Clock, options: Options, scheduler: S) -> Self {
        let mut clock = clock;
        apply_clock_options(&mut clock, &options);

        let options = Rc::new(options);
        let bar = BubbleBarViewController::new(options.clone(), clock.clone());
        let handle = new_handle(&options);
        let stash = stash_controller_for(
            options.clone(),
            Rc::new(options.taskbar),
            clock.clone(),
        );
        let animator = BubbleBarViewAnimator::new(scheduler, options.clone(), clock.clone());

        Self {
            options,
            clock,
            bar,
            handle,
            stash,
            animator,
            custom_dimensions: None,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn bar(&self) -> &BubbleBarViewController {
        &self.bar
    }

    pub fn handle(&self) -> Option<&StashedHandleView> {
        self.handle.as_ref()
    }

    pub fn stash_controller(&self) -> &dyn BubbleStashController {
        &*self.stash
    }

    pub fn animator(&self) -> &BubbleBarViewAnimator<S> {
        &self.animator
    }

    pub fn animator_mut(&mut self) -> &mut BubbleBarViewAnimator<S> {
        &mut self.animator
    }

    pub fn touchable_height(&self) -> f64 {
        self.stash.touchable_height(&self.bar)
    }

    pub fn is_bubble_bar_visible(&self) -> bool {
        self.stash.is_bubble_bar_visible(&self.bar)
    }

    fn dimensions(&self) -> Rc<dyn TaskbarHotseatDimensionsProvider> {
        match &self.custom_dimensions {
            Some(dimensions) => dimensions.clone(),
            None => Rc::new(self.options.taskbar),
        }
    }

    /// Replaces the taskbar and hotseat dimensions from the config.
    pub fn set_dimensions_provider(&mut self, dimensions: Rc<dyn TaskbarHotseatDimensionsProvider>) {
        self.custom_dimensions = Some(dimensions);
        self.stash
            .update_options(self.options.clone(), self.dimensions());
        self.bar.invalidate_touch_region();
    }

    pub fn update_options(&mut self, options: Options) {
        apply_clock_options(&mut self.clock, &options);

        let options = Rc::new(options);
        let mode_changed = options.transient_taskbar != self.options.transient_taskbar;
        if options.enabled != self.options.enabled {
            debug!("bubble bar enabled: {}", options.enabled);
        }

        self.options = options.clone();
        self.bar.update_options(options.clone());
        self.animator.update_options(options.clone());

        if !mode_changed {
            self.stash.update_options(options.clone(), self.dimensions());
            return;
        }

        debug!("transient taskbar: {}", options.transient_taskbar);
        self.animator.cancel(&mut self.bar);

        let home = self.stash.is_bubbles_showing_on_home();
        let overview = self.stash.is_bubbles_showing_on_overview();
        let locked = self.stash.is_sysui_locked();

        self.stash = stash_controller_for(options.clone(), self.dimensions(), self.clock.clone());
        self.handle = new_handle(&options);

        let mut ctx = StashContext {
            bar: &mut self.bar,
            handle: self.handle.as_mut(),
            observer: Some(&mut self.animator),
        };
        self.stash.set_bubbles_showing_on_home(home, &mut ctx);
        self.stash.set_bubbles_showing_on_overview(overview, &mut ctx);
        self.stash.set_sysui_locked(locked, &mut ctx);

        if self.bar.has_bubbles() {
            self.place_immediately();
        }
    }

    /// Puts the bar where the stash state says, without animating.
    fn place_immediately(&mut self) {
        let mut ctx = StashContext {
            bar: &mut self.bar,
            handle: self.handle.as_mut(),
            observer: Some(&mut self.animator),
        };
        if self.stash.is_stashed() {
            self.stash.stash_bubble_bar_immediate(&mut ctx);
        } else {
            self.stash.show_bubble_bar_immediate(&mut ctx);
        }
    }

    /// A bubble was added or updated.
    pub fn on_bubble_added(&mut self, key: &str, suppress_animation: bool) {
        if !self.options.enabled {
            trace!("bubble bar is off, ignoring {key}");
            return;
        }

        let was_hidden = self.bar.is_hidden_for_no_bubbles();
        let added = self.bar.add_bubble(key, !suppress_animation);

        if suppress_animation || self.bar.is_expanded() {
            if was_hidden {
                self.place_immediately();
            }
            return;
        }

        if !added {
            trace!("bubble {key} updated");
        }

        let mut ctx = AnimatorContext {
            bar: &mut self.bar,
            handle: self.handle.as_mut(),
            stash: &mut *self.stash,
        };
        if was_hidden {
            self.animator.animate_to_initial_state(key, false, &mut ctx);
        } else if ctx.stash.is_stashed() && ctx.stash.has_handle_view() {
            self.animator
                .animate_bubble_in_for_stashed(key, false, &mut ctx);
        } else {
            self.animator.animate_bubble_bar_for_collapsed(key, &mut ctx);
        }
    }

    pub fn on_bubble_removed(&mut self, key: &str) {
        if !self.bar.remove_bubble(key, true) {
            return;
        }

        if self.bar.is_hidden_for_no_bubbles() {
            if self.animator.cancel(&mut self.bar).is_some() {
                debug!("notification dropped with the last bubble");
            }
            if let Some(handle) = &mut self.handle {
                handle.alpha.set(0.);
                handle.translation_y.set(0.);
            }
        }
    }

    pub fn select_bubble(&mut self, key: &str) -> bool {
        self.bar.select_bubble(key)
    }

    pub fn expand(&mut self) {
        if !self.bar.has_bubbles() {
            return;
        }

        if self.animator.has_animation() {
            let mut ctx = AnimatorContext {
                bar: &mut self.bar,
                handle: self.handle.as_mut(),
                stash: &mut *self.stash,
            };
            self.animator.expanded_while_animating(&mut ctx);
        } else {
            let mut ctx = StashContext {
                bar: &mut self.bar,
                handle: self.handle.as_mut(),
                observer: Some(&mut self.animator),
            };
            self.stash.show_bubble_bar(true, &mut ctx);
        }
    }

    /// Collapses the expanded bar. On the transient taskbar in apps this also stashes it.
    pub fn collapse(&mut self) {
        if !self.bar.is_expanded() {
            return;
        }

        self.stash();
    }

    pub fn stash(&mut self) {
        let mut ctx = StashContext {
            bar: &mut self.bar,
            handle: self.handle.as_mut(),
            observer: Some(&mut self.animator),
        };
        self.stash.stash_bubble_bar(&mut ctx);
    }

    pub fn show(&mut self) {
        let mut ctx = StashContext {
            bar: &mut self.bar,
            handle: self.handle.as_mut(),
            observer: Some(&mut self.animator),
        };
        self.stash.show_bubble_bar(false, &mut ctx);
    }

    pub fn on_bubble_bar_touched(&mut self) {
        let mut ctx = AnimatorContext {
            bar: &mut self.bar,
            handle: self.handle.as_mut(),
            stash: &mut *self.stash,
        };
        self.animator.on_bubble_bar_touched(&mut ctx);
    }

    pub fn set_bubbles_showing_on_home(&mut self, showing: bool) {
        let mut ctx = StashContext {
            bar: &mut self.bar,
            handle: self.handle.as_mut(),
            observer: Some(&mut self.animator),
        };
        self.stash.set_bubbles_showing_on_home(showing, &mut ctx);
    }

    pub fn set_bubbles_showing_on_overview(&mut self, showing: bool) {
        let mut ctx = StashContext {
            bar: &mut self.bar,
            handle: self.handle.as_mut(),
            observer: Some(&mut self.animator),
        };
        self.stash.set_bubbles_showing_on_overview(showing, &mut ctx);
    }

    pub fn set_sysui_locked(&mut self, locked: bool) {
        let mut ctx = StashContext {
            bar: &mut self.bar,
            handle: self.handle.as_mut(),
            observer: Some(&mut self.animator),
        };
        self.stash.set_sysui_locked(locked, &mut ctx);
    }

    /// Runs a task that came due on the scheduler.
    pub fn run_task(&mut self, task: Task) {
        let mut ctx = AnimatorContext {
            bar: &mut self.bar,
            handle: self.handle.as_mut(),
            stash: &mut *self.stash,
        };
        self.animator.run_task(task, &mut ctx);
    }

    pub fn advance_animations(&mut self) {
        let _span = tracy_client::span!("BubbleBar::advance_animations");

        self.bar.advance_animations();
        if let Some(handle) = &mut self.handle {
            handle.advance_animations();
        }

        let mut ctx = AnimatorContext {
            bar: &mut self.bar,
            handle: self.handle.as_mut(),
            stash: &mut *self.stash,
        };
        self.animator.advance_animations(&mut ctx);

        let mut ctx = StashContext {
            bar: &mut self.bar,
            handle: self.handle.as_mut(),
            observer: Some(&mut self.animator),
        };
        self.stash.advance_animations(&mut ctx);
    }

    pub fn are_animations_ongoing(&self) -> bool {
        self.bar.are_animations_ongoing()
            || self
                .handle
                .as_ref()
                .is_some_and(|handle| handle.are_animations_ongoing())
            || self.animator.is_animating()
            || self.stash.are_animations_ongoing()
    }

    pub fn take_events(&mut self) -> Vec<BubbleBarEvent> {
        self.bar.take_events()
    }

    pub fn take_touch_region_invalidation(&mut self) -> bool {
        self.bar.take_touch_region_invalidation()
    }

    #[cfg(test)]
    pub fn verify_invariants(&self) {
        let bubbles = self.bar.bubbles();
        for (i, key) in bubbles.iter().enumerate() {
            assert!(
                !bubbles[i + 1..].contains(key),
                "bubble {key} is in the bar twice"
            );
        }

        assert_eq!(self.bar.is_hidden_for_no_bubbles(), !self.bar.has_bubbles());
        match self.bar.selected_bubble() {
            Some(selected) => assert!(bubbles.iter().any(|b| b == selected)),
            None => assert!(!self.bar.has_bubbles()),
        }

        if self.bar.is_hidden_for_no_bubbles() {
            assert!(!self.bar.view().visible);
            assert!(!self.bar.is_expanded());
            assert!(!self.animator.has_animation());
        }

        if self.bar.transition_state() != TransitionState::Idle {
            assert!(self.bar.is_expanded());
        } else {
            assert!(self.bar.bubble_count() <= self.options.max_bubbles);
        }
        assert_eq!(
            self.bar.view().bubble_translations.len(),
            self.bar.bubble_count()
        );

        assert_eq!(self.handle.is_some(), self.stash.has_handle_view());
        assert_eq!(self.stash.is_transient_taskbar(), self.options.transient_taskbar);
        if !self.stash.is_transient_taskbar() {
            assert!(!self.stash.is_stashed());
        }

        let alpha = self.bar.view().alpha.current();
        assert!((0. ..=1.).contains(&alpha), "bar alpha out of range: {alpha}");
    }
}

impl BubbleBar<ManualScheduler> {
    /// Runs every task whose deadline has passed.
    pub fn run_due_tasks(&mut self) {
        while let Some(task) = self.animator.scheduler_mut().pop_due() {
            self.run_task(task);
        }
    }
}

fn new_handle(options: &Options) -> Option<StashedHandleView> {
    options.transient_taskbar.then(StashedHandleView::new)
}

fn apply_clock_options(clock: &mut Clock, options: &Options) {
    clock.set_rate(1. / options.animations.slowdown.max(0.001));
    clock.set_complete_instantly(options.animations.off);
}
