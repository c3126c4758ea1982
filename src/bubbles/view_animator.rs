//! The new-bubble notification: the bar shows up, waits, and goes back.

use std::rc::Rc;

use super::bar_controller::BubbleBarViewController;
use super::stash::{BubbleStashController, Interruption, StashContext, StashStateObserver};
use super::view::StashedHandleView;
use super::Options;
use crate::animation::{Animation, Clock};
use crate::scheduler::{Scheduler, Task};

/// Vertical scale the bar starts at when it grows out of the handle.
pub const INITIAL_SCALE_Y: f64 = 0.3;

/// Collaborators the notification animator acts on.
pub struct AnimatorContext<'a> {
    pub bar: &'a mut BubbleBarViewController,
    pub handle: Option<&'a mut StashedHandleView>,
    pub stash: &'a mut dyn BubbleStashController,
}

impl<'a> AnimatorContext<'a> {
    fn split(&mut self) -> (&mut (dyn BubbleStashController + 'a), StashContext<'_>) {
        let ctx = StashContext {
            bar: &mut *self.bar,
            handle: self.handle.as_deref_mut(),
            observer: None,
        };
        (&mut *self.stash, ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatingBubbleState {
    /// The show task is posted but did not run yet.
    Created,
    AnimatingIn,
    /// Fully shown, waiting for the hide task.
    In,
    AnimatingOut,
}

/// How the bar shows the new bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowKind {
    /// The stashed handle morphs into the bar.
    Morph,
    /// The bar slides up from below after having no bubbles.
    InitialSpring,
    /// The collapsed bar jumps up and springs back.
    Bounce,
}

#[derive(Debug)]
struct AnimatingBubble {
    key: String,
    id: u64,
    kind: ShowKind,
    expand: bool,
    state: AnimatingBubbleState,
}

impl AnimatingBubble {
    fn show_task(&self) -> Task {
        Task::ShowNotification { id: self.id }
    }

    fn hide_task(&self) -> Task {
        Task::HideNotification { id: self.id }
    }
}

#[derive(Debug)]
enum Motion {
    /// Drives the handle and the bar along one path.
    ///
    /// The animated value is the handle translation, which the bar continues once it takes over.
    Morph {
        anim: Animation,
        showing: bool,
        /// Set once the bar is fully shown so that spring oscillation does not fade it again.
        reached_bar: bool,
    },
    InitialSpring {
        anim: Animation,
        target: f64,
    },
    BounceUp {
        anim: Animation,
        rest: f64,
    },
    BounceDown {
        anim: Animation,
    },
}

/// Thresholds of the handle to bar morph, in handle translation.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MorphPath {
    /// Where the handle is fully faded out and the bar takes over.
    handle_end: f64,
    /// Difference between the handle and the bar translations.
    offset: f64,
    /// Where the bar reaches its resting position.
    total: f64,
}

impl MorphPath {
    fn new(stash: &dyn BubbleStashController, bar: &BubbleBarViewController) -> Self {
        let offset = stash.diff_between_handle_and_bar_centers(bar);
        Self {
            handle_end: stash.stashed_handle_translation_for_new_bubble_animation(bar),
            offset,
            total: stash.bubble_bar_translation_y(bar) + offset,
        }
    }

    /// Applies the morph at handle translation `ty`.
    ///
    /// Returns whether the bar is fully shown.
    fn apply(
        &self,
        ty: f64,
        reached_bar: bool,
        bar: &mut BubbleBarViewController,
        handle: Option<&mut StashedHandleView>,
    ) -> bool {
        let view = bar.view_mut();

        if reached_bar || ty < self.total {
            view.alpha.set(1.);
            view.scale_x.set(1.);
            view.scale_y.set(1.);
            view.translation_y.set(ty - self.offset);
            if let Some(handle) = handle {
                handle.alpha.set(0.);
            }
            return true;
        }

        if ty >= self.handle_end {
            // Only the handle moves while the bar is still invisible.
            let progress = if self.handle_end != 0. {
                (ty / self.handle_end).clamp(0., 1.)
            } else {
                1.
            };
            if let Some(handle) = handle {
                handle.translation_y.set(ty);
                handle.alpha.set(1. - progress);
            }
            view.alpha.set(0.);
            view.scale_x.set(1.);
            view.scale_y.set(INITIAL_SCALE_Y);
            view.translation_y.set(ty - self.offset);
            return false;
        }

        let fraction = if self.total != self.handle_end {
            ((ty - self.handle_end) / (self.total - self.handle_end)).clamp(0., 1.)
        } else {
            1.
        };
        if let Some(handle) = handle {
            handle.translation_y.set(self.handle_end);
            handle.alpha.set(0.);
        }
        view.alpha.set(fraction);
        view.scale_x.set(1.);
        view.scale_y.set(INITIAL_SCALE_Y + (1. - INITIAL_SCALE_Y) * fraction);
        view.translation_y.set(ty - self.offset);
        false
    }
}

/// Orchestrates the show, wait and hide sequence of a new bubble.
#[derive(Debug)]
pub struct BubbleBarViewAnimator<S> {
    scheduler: S,
    options: Rc<Options>,
    clock: Clock,
    next_id: u64,
    animating_bubble: Option<AnimatingBubble>,
    motion: Option<Motion>,
}

impl<S: Scheduler> BubbleBarViewAnimator<S> {
    pub fn new(scheduler: S, options: Rc<Options>, clock: Clock) -> Self {
        Self {
            scheduler,
            options,
            clock,
            next_id: 0,
            animating_bubble: None,
            motion: None,
        }
    }

    pub fn update_options(&mut self, options: Rc<Options>) {
        self.options = options;
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Whether a notification is in flight, in any state.
    pub fn has_animation(&self) -> bool {
        self.animating_bubble.is_some()
    }

    /// Whether the bar is moving because of a notification.
    pub fn is_animating(&self) -> bool {
        self.motion.is_some()
    }

    pub fn state(&self) -> Option<AnimatingBubbleState> {
        self.animating_bubble.as_ref().map(|bubble| bubble.state)
    }

    pub fn animating_bubble(&self) -> Option<&str> {
        self.animating_bubble.as_ref().map(|bubble| bubble.key.as_str())
    }

    pub fn show_kind(&self) -> Option<ShowKind> {
        self.animating_bubble.as_ref().map(|bubble| bubble.kind)
    }

    /// Shows a new bubble by morphing the stashed handle into the bar.
    pub fn animate_bubble_in_for_stashed(
        &mut self,
        key: &str,
        expand: bool,
        ctx: &mut AnimatorContext,
    ) {
        self.start(key, expand, ShowKind::Morph, ctx);
    }

    /// Brings the bar in for its first bubble.
    pub fn animate_to_initial_state(&mut self, key: &str, expand: bool, ctx: &mut AnimatorContext) {
        self.start(key, expand, ShowKind::InitialSpring, ctx);
    }

    /// Bounces the collapsed bar for a new bubble.
    pub fn animate_bubble_bar_for_collapsed(&mut self, key: &str, ctx: &mut AnimatorContext) {
        self.start(key, false, ShowKind::Bounce, ctx);
    }

    fn start(&mut self, key: &str, expand: bool, kind: ShowKind, ctx: &mut AnimatorContext) {
        if ctx.bar.is_expanded() {
            trace!("bar is expanded, not animating {key}");
            return;
        }

        if self.animating_bubble.is_some() {
            self.interrupt_for_new_bubble(key, ctx);
            return;
        }

        let id = self.next_id;
        self.next_id += 1;

        let bubble = AnimatingBubble {
            key: key.to_owned(),
            id,
            kind,
            expand,
            state: AnimatingBubbleState::Created,
        };
        debug!("new bubble notification for {key}: {kind:?}");

        self.scheduler.post(bubble.show_task());
        self.animating_bubble = Some(bubble);
    }

    /// A newer bubble arrived while a notification is in flight.
    fn interrupt_for_new_bubble(&mut self, key: &str, ctx: &mut AnimatorContext) {
        let Some(bubble) = self.animating_bubble.as_mut() else {
            return;
        };

        debug!(
            "bubble {key} replaces {} in state {:?}",
            bubble.key, bubble.state
        );
        bubble.key = key.to_owned();

        let state = bubble.state;
        match state {
            AnimatingBubbleState::Created | AnimatingBubbleState::AnimatingIn => (),
            AnimatingBubbleState::In => {
                let hide = bubble.hide_task();
                self.scheduler.cancel(hide);
                self.scheduler
                    .post_delayed(self.options.notification_hide_delay, hide);
            }
            AnimatingBubbleState::AnimatingOut => {
                bubble.state = AnimatingBubbleState::AnimatingIn;
                bubble.kind = ShowKind::Morph;

                let path = MorphPath::new(&*ctx.stash, ctx.bar);
                let from = match &self.motion {
                    Some(Motion::Morph { anim, .. }) => anim.value(),
                    _ => ctx.bar.view().translation_y.current() + path.offset,
                };
                self.start_morph(from, path.total, true, ctx);
            }
        }
    }

    pub fn run_task(&mut self, task: Task, ctx: &mut AnimatorContext) {
        let Some(bubble) = &self.animating_bubble else {
            trace!("ignoring {task:?} without a notification");
            return;
        };
        let (show, hide) = (bubble.show_task(), bubble.hide_task());

        if task == show {
            self.show(ctx);
        } else if task == hide {
            self.hide(ctx);
        } else {
            trace!("ignoring stale {task:?}");
        }
    }

    fn show(&mut self, ctx: &mut AnimatorContext) {
        let Some(bubble) = self.animating_bubble.as_mut() else {
            return;
        };
        if bubble.state != AnimatingBubbleState::Created {
            return;
        }

        bubble.state = AnimatingBubbleState::AnimatingIn;
        let kind = bubble.kind;
        trace!("showing {}: {kind:?}", bubble.key);

        match kind {
            ShowKind::Morph => {
                let path = MorphPath::new(&*ctx.stash, ctx.bar);
                self.start_morph(0., path.total, true, ctx);
            }
            ShowKind::InitialSpring => {
                let target = ctx.stash.bubble_bar_translation_y(ctx.bar);
                let height = ctx.bar.collapsed_height();

                ctx.bar.set_visible(true);
                let view = ctx.bar.view_mut();
                view.alpha.set(0.);
                view.scale_x.set(1.);
                view.scale_y.set(1.);
                view.translation_y.set(target + height);

                let anim = Animation::new(
                    self.clock.clone(),
                    target + height,
                    target,
                    0.,
                    self.options.animations.new_bubble(),
                );
                self.motion = Some(Motion::InitialSpring { anim, target });
            }
            ShowKind::Bounce => {
                let rest = ctx.stash.bubble_bar_translation_y(ctx.bar);
                let anim = Animation::new(
                    self.clock.clone(),
                    rest,
                    rest - self.options.bounce_distance,
                    0.,
                    self.options.animations.bounce(),
                );
                self.motion = Some(Motion::BounceUp { anim, rest });
            }
        }
    }

    fn start_morph(&mut self, from: f64, to: f64, showing: bool, ctx: &mut AnimatorContext) {
        if ctx.stash.are_animations_ongoing() {
            // Start the morph from a settled stash.
            let (stash, mut sctx) = ctx.split();
            if showing {
                stash.stash_bubble_bar_immediate(&mut sctx);
            } else {
                stash.show_bubble_bar_immediate(&mut sctx);
            }
        }

        ctx.bar.view_mut().relative_pivot_y = 0.5;
        ctx.bar.set_visible(true);

        let anim = Animation::new(
            self.clock.clone(),
            from,
            to,
            0.,
            self.options.animations.new_bubble(),
        );
        self.motion = Some(Motion::Morph {
            anim,
            showing,
            reached_bar: false,
        });
    }

    fn hide(&mut self, ctx: &mut AnimatorContext) {
        let Some(bubble) = self.animating_bubble.as_mut() else {
            return;
        };
        if bubble.state != AnimatingBubbleState::In {
            return;
        }

        let morph = match bubble.kind {
            ShowKind::Morph => true,
            ShowKind::InitialSpring => {
                ctx.stash.is_transient_taskbar()
                    && !ctx.stash.is_bubbles_showing_on_home()
                    && !ctx.stash.is_bubbles_showing_on_overview()
                    && !bubble.expand
            }
            ShowKind::Bounce => false,
        };

        if !morph {
            trace!("notification for {} done, the bar stays", bubble.key);
            self.animating_bubble = None;
            return;
        }

        debug!("hiding notification for {}", bubble.key);
        bubble.state = AnimatingBubbleState::AnimatingOut;

        let path = MorphPath::new(&*ctx.stash, ctx.bar);
        let from = ctx.bar.view().translation_y.current() + path.offset;
        self.start_morph(from, 0., false, ctx);
    }

    pub fn advance_animations(&mut self, ctx: &mut AnimatorContext) {
        let _span = tracy_client::span!("BubbleBarViewAnimator::advance_animations");

        let Some(motion) = self.motion.take() else {
            return;
        };

        let motion = match motion {
            Motion::Morph {
                anim,
                showing,
                reached_bar,
            } => {
                let path = MorphPath::new(&*ctx.stash, ctx.bar);
                let reached_bar = path.apply(
                    anim.value(),
                    showing && reached_bar,
                    ctx.bar,
                    ctx.handle.as_deref_mut(),
                );

                if anim.is_done() {
                    if showing {
                        self.on_show_end(ctx);
                    } else {
                        self.on_hide_end(ctx);
                    }
                    return;
                }

                Motion::Morph {
                    anim,
                    showing,
                    reached_bar,
                }
            }
            Motion::InitialSpring { anim, target } => {
                let ty = anim.value();
                let height = ctx.bar.collapsed_height();
                let alpha = if height > 0. {
                    (1. - (ty - target) / height).clamp(0., 1.)
                } else {
                    1.
                };

                let view = ctx.bar.view_mut();
                view.translation_y.set(ty);
                view.alpha.set(alpha);

                if anim.is_done() {
                    self.on_show_end(ctx);
                    return;
                }

                Motion::InitialSpring { anim, target }
            }
            Motion::BounceUp { anim, rest } => {
                ctx.bar.view_mut().translation_y.set(anim.value());

                if anim.is_done() {
                    let anim = Animation::new(
                        self.clock.clone(),
                        anim.to(),
                        rest,
                        0.,
                        self.options.animations.new_bubble(),
                    );
                    Motion::BounceDown { anim }
                } else {
                    Motion::BounceUp { anim, rest }
                }
            }
            Motion::BounceDown { anim } => {
                ctx.bar.view_mut().translation_y.set(anim.value());

                if anim.is_done() {
                    self.on_show_end(ctx);
                    return;
                }

                Motion::BounceDown { anim }
            }
        };

        self.motion = Some(motion);
    }

    fn on_show_end(&mut self, ctx: &mut AnimatorContext) {
        ctx.bar.view_mut().relative_pivot_y = 1.;

        let Some(bubble) = self.animating_bubble.as_mut() else {
            return;
        };

        if bubble.kind != ShowKind::Bounce {
            let (stash, mut sctx) = ctx.split();
            stash.show_bubble_bar_immediate(&mut sctx);
        }

        if bubble.expand {
            debug!("expanding the bar for {}", bubble.key);
            self.animating_bubble = None;
            let (stash, mut sctx) = ctx.split();
            stash.show_bubble_bar(true, &mut sctx);
            return;
        }

        bubble.state = AnimatingBubbleState::In;
        self.scheduler
            .post_delayed(self.options.notification_hide_delay, bubble.hide_task());
    }

    fn on_hide_end(&mut self, ctx: &mut AnimatorContext) {
        ctx.bar.view_mut().relative_pivot_y = 1.;

        if let Some(bubble) = self.animating_bubble.take() {
            trace!("notification for {} done", bubble.key);
        }

        let (stash, mut sctx) = ctx.split();
        stash.stash_bubble_bar_immediate(&mut sctx);
    }

    /// Drops the notification and everything it scheduled.
    ///
    /// Returns where the bar was left if a notification was in flight.
    pub fn cancel(&mut self, bar: &mut BubbleBarViewController) -> Option<Interruption> {
        let bubble = self.animating_bubble.take()?;
        debug!(
            "cancelling notification for {} in state {:?}",
            bubble.key, bubble.state
        );

        self.motion = None;
        self.scheduler.cancel(bubble.show_task());
        self.scheduler.cancel(bubble.hide_task());

        let view = bar.view_mut();
        view.relative_pivot_y = 1.;
        let alpha = view.alpha.current();
        let translation_y = view.translation_y.current();

        Some(Interruption {
            is_stashed: alpha == 0.,
            translation_y,
        })
    }

    /// The user touched the bar: the notification ends where it is.
    pub fn on_bubble_bar_touched(&mut self, ctx: &mut AnimatorContext) {
        let Some(interruption) = self.cancel(ctx.bar) else {
            return;
        };

        let (stash, mut sctx) = ctx.split();
        stash.on_new_bubble_animation_interrupted(
            interruption.is_stashed,
            interruption.translation_y,
            &mut sctx,
        );
    }

    /// The user asked to expand the bar while a notification is in flight.
    pub fn expanded_while_animating(&mut self, ctx: &mut AnimatorContext) {
        let Some(bubble) = self.animating_bubble.as_mut() else {
            return;
        };

        bubble.expand = true;
        let state = bubble.state;
        match state {
            // Expanded once the show animation ends.
            AnimatingBubbleState::Created | AnimatingBubbleState::AnimatingIn => (),
            AnimatingBubbleState::In | AnimatingBubbleState::AnimatingOut => {
                self.on_bubble_bar_touched(ctx);

                let (stash, mut sctx) = ctx.split();
                stash.show_bubble_bar(true, &mut sctx);

                let rest = stash.bubble_bar_translation_y(sctx.bar);
                let config = self.options.animations.bar_translation();
                sctx.bar
                    .view_mut()
                    .translation_y
                    .animate_to(&self.clock, rest, config);
            }
        }
    }
}

impl<S: Scheduler> StashStateObserver for BubbleBarViewAnimator<S> {
    fn on_stash_state_changing(
        &mut self,
        bar: &mut BubbleBarViewController,
    ) -> Option<Interruption> {
        self.cancel(bar)
    }
}
