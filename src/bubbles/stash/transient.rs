use std::rc::Rc;

use super::{BubbleStashController, StashContext, TaskbarHotseatDimensionsProvider};
use crate::animation::{Animation, Clock};
use crate::bubbles::bar_controller::BubbleBarViewController;
use crate::bubbles::Options;

/// Initial velocity of the handle as the bar lands in it, in pixels per second.
const HANDLE_LANDING_VELOCITY: f64 = 250.;

/// Stash controller of the transient taskbar.
///
/// In apps the bar is stashed into a small handle. On home and in overview it is always shown.
pub struct TransientBubbleStashController {
    options: Rc<Options>,
    dimensions: Rc<dyn TaskbarHotseatDimensionsProvider>,
    clock: Clock,
    is_stashed: bool,
    is_bubbles_showing_on_home: bool,
    is_bubbles_showing_on_overview: bool,
    is_sysui_locked: bool,
    /// The stash animation runs until the bar translation settles.
    stash_animation_running: bool,
}

impl TransientBubbleStashController {
    pub fn new(
        options: Rc<Options>,
        dimensions: Rc<dyn TaskbarHotseatDimensionsProvider>,
        clock: Clock,
    ) -> Self {
        Self {
            options,
            dimensions,
            clock,
            is_stashed: true,
            is_bubbles_showing_on_home: false,
            is_bubbles_showing_on_overview: false,
            is_sysui_locked: false,
            stash_animation_running: false,
        }
    }

    /// Translation of the bar shrunk into the handle.
    pub fn stash_translation_y(&self, bar: &BubbleBarViewController) -> f64 {
        -self.diff_between_handle_and_bar_centers(bar)
    }

    fn update_stashed_and_expanded_state(
        &mut self,
        stash: bool,
        expand: bool,
        ctx: &mut StashContext,
    ) {
        let is_stashed =
            stash && !self.is_bubbles_showing_on_home && !self.is_bubbles_showing_on_overview;

        if ctx.bar.is_hidden_for_no_bubbles() {
            // Nothing is drawn, the state is applied once bubbles arrive.
            self.is_stashed = is_stashed;
            return;
        }

        if self.is_stashed != is_stashed {
            self.notify_stash_state_changing(ctx);

            debug!("bubble bar stashed: {is_stashed}");
            self.is_stashed = is_stashed;

            if self.is_sysui_locked {
                trace!("sysui is locked, deferring the stash animation");
            } else {
                self.animate_stash(ctx);
            }
            self.update_taskbar_touch_region(ctx.bar);
        }

        if ctx.bar.is_expanded() != expand {
            ctx.bar.set_expanded(expand);
        }
    }

    /// Lets the observer cancel its animation and takes over the bar where it was left.
    fn notify_stash_state_changing(&mut self, ctx: &mut StashContext) {
        let bar = &mut *ctx.bar;
        let interruption = ctx
            .observer
            .as_deref_mut()
            .and_then(|observer| observer.on_stash_state_changing(bar));
        if let Some(interruption) = interruption {
            self.on_new_bubble_animation_interrupted(
                interruption.is_stashed,
                interruption.translation_y,
                ctx,
            );
        }
    }

    fn animate_stash(&mut self, ctx: &mut StashContext) {
        let alpha_config = self.options.animations.stash_alpha();
        let stash_config = self.options.animations.stash();

        if self.is_stashed {
            let scale_x = self.stash_scale_x(ctx.bar);
            let scale_y = self.stash_scale_y(ctx.bar);
            let translation_y = self.stash_translation_y(ctx.bar);

            let view = ctx.bar.view_mut();
            view.alpha.animate_to(&self.clock, 0., alpha_config);
            view.scale_x.animate_to(&self.clock, scale_x, stash_config);
            view.scale_y.animate_to(&self.clock, scale_y, stash_config);
            view.translation_y
                .animate_to(&self.clock, translation_y, stash_config);

            if let Some(handle) = ctx.handle.as_deref_mut() {
                // The handle only fades in once the bar is halfway gone.
                let anim = Animation::new(
                    self.clock.clone(),
                    handle.alpha.current(),
                    1.,
                    0.,
                    alpha_config,
                );
                let delay = anim.duration() / 2;
                handle.alpha.animate(anim.with_delay(delay));
                handle.translation_y.set(0.);
            }
        } else {
            let translation_y = self.bubble_bar_translation_y(ctx.bar);

            ctx.bar.set_visible(true);
            let view = ctx.bar.view_mut();
            view.alpha.animate_to(&self.clock, 1., alpha_config);
            view.scale_x.animate_to(&self.clock, 1., stash_config);
            view.scale_y.animate_to(&self.clock, 1., stash_config);
            view.translation_y
                .animate_to(&self.clock, translation_y, stash_config);

            if let Some(handle) = ctx.handle.as_deref_mut() {
                handle.alpha.animate_to(&self.clock, 0., alpha_config);
                handle.translation_y.set(0.);
            }
        }

        self.stash_animation_running = true;
    }

    fn on_stash_animation_end(&mut self, ctx: &mut StashContext) {
        self.stash_animation_running = false;

        if self.is_stashed {
            if let Some(handle) = ctx.handle.as_deref_mut() {
                // The handle gives a small bounce as the bar lands in it.
                let anim = Animation::new(
                    self.clock.clone(),
                    handle.translation_y.current(),
                    0.,
                    HANDLE_LANDING_VELOCITY,
                    self.options.animations.handle_overshoot(),
                );
                handle.translation_y.animate(anim);
            }
        }

        let visible = !self.is_stashed && !ctx.bar.is_hidden_for_no_bubbles();
        ctx.bar.set_visible(visible);
        self.update_taskbar_touch_region(ctx.bar);
    }
}

impl BubbleStashController for TransientBubbleStashController {
    fn is_stashed(&self) -> bool {
        self.is_stashed
    }

    fn is_transient_taskbar(&self) -> bool {
        true
    }

    fn has_handle_view(&self) -> bool {
        true
    }

    fn is_bubbles_showing_on_home(&self) -> bool {
        self.is_bubbles_showing_on_home
    }

    fn set_bubbles_showing_on_home(&mut self, showing: bool, ctx: &mut StashContext) {
        if self.is_bubbles_showing_on_home == showing {
            return;
        }

        debug!("bubbles showing on home: {showing}");
        self.is_bubbles_showing_on_home = showing;

        if showing {
            self.update_stashed_and_expanded_state(false, false, ctx);
        } else if !ctx.bar.is_expanded() {
            self.update_stashed_and_expanded_state(true, false, ctx);
        }

        // The shown bar rests at a different height on home and in apps.
        if !self.is_stashed && !self.is_sysui_locked && ctx.bar.has_bubbles() {
            let translation_y = self.bubble_bar_translation_y(ctx.bar);
            let config = self.options.animations.bar_translation();
            ctx.bar
                .view_mut()
                .translation_y
                .animate_to(&self.clock, translation_y, config);
        }
    }

    fn is_bubbles_showing_on_overview(&self) -> bool {
        self.is_bubbles_showing_on_overview
    }

    fn set_bubbles_showing_on_overview(&mut self, showing: bool, ctx: &mut StashContext) {
        if self.is_bubbles_showing_on_overview == showing {
            return;
        }

        debug!("bubbles showing on overview: {showing}");
        self.is_bubbles_showing_on_overview = showing;

        if showing {
            self.update_stashed_and_expanded_state(false, false, ctx);
        } else if !ctx.bar.is_expanded() {
            self.update_stashed_and_expanded_state(true, false, ctx);
        }
    }

    fn is_sysui_locked(&self) -> bool {
        self.is_sysui_locked
    }

    fn set_sysui_locked(&mut self, locked: bool, ctx: &mut StashContext) {
        if self.is_sysui_locked == locked {
            return;
        }

        debug!("sysui locked: {locked}");
        self.is_sysui_locked = locked;

        if !locked && ctx.bar.has_bubbles() && !ctx.bar.is_hidden_for_no_bubbles() {
            self.notify_stash_state_changing(ctx);

            // One animation towards wherever the bar belongs now.
            self.is_stashed =
                !self.is_bubbles_showing_on_home && !self.is_bubbles_showing_on_overview;
            self.animate_stash(ctx);
            self.update_taskbar_touch_region(ctx.bar);
        }
    }

    fn show_bubble_bar_immediate_at(&mut self, translation_y: f64, ctx: &mut StashContext) {
        if ctx.bar.is_hidden_for_no_bubbles() {
            return;
        }

        if let Some(handle) = ctx.handle.as_deref_mut() {
            handle.alpha.set(0.);
            handle.translation_y.set(0.);
        }

        let view = ctx.bar.view_mut();
        view.alpha.set(1.);
        view.scale_x.set(1.);
        view.scale_y.set(1.);
        view.translation_y.set(translation_y);

        self.is_stashed = false;
        self.stash_animation_running = false;
        ctx.bar.set_visible(true);
        self.update_taskbar_touch_region(ctx.bar);
    }

    fn stash_bubble_bar_immediate(&mut self, ctx: &mut StashContext) {
        if let Some(handle) = ctx.handle.as_deref_mut() {
            let alpha = if ctx.bar.is_hidden_for_no_bubbles() {
                0.
            } else {
                1.
            };
            handle.alpha.set(alpha);
            handle.translation_y.set(0.);
        }

        let scale_x = self.stash_scale_x(ctx.bar);
        let scale_y = self.stash_scale_y(ctx.bar);
        let translation_y = self.stash_translation_y(ctx.bar);

        let view = ctx.bar.view_mut();
        view.alpha.set(0.);
        view.scale_x.set(scale_x);
        view.scale_y.set(scale_y);
        view.translation_y.set(translation_y);

        self.is_stashed = true;
        self.stash_animation_running = false;
        ctx.bar.set_visible(false);
        self.update_taskbar_touch_region(ctx.bar);
    }

    fn stash_bubble_bar(&mut self, ctx: &mut StashContext) {
        self.update_stashed_and_expanded_state(true, false, ctx);
    }

    fn show_bubble_bar(&mut self, expand: bool, ctx: &mut StashContext) {
        self.update_stashed_and_expanded_state(false, expand, ctx);
    }

    fn dimensions(&self) -> &dyn TaskbarHotseatDimensionsProvider {
        &*self.dimensions
    }

    fn update_options(
        &mut self,
        options: Rc<Options>,
        dimensions: Rc<dyn TaskbarHotseatDimensionsProvider>,
    ) {
        self.options = options;
        self.dimensions = dimensions;
    }

    fn touchable_height(&self, bar: &BubbleBarViewController) -> f64 {
        if self.is_stashed {
            self.options.handle_height
        } else {
            bar.collapsed_height()
        }
    }

    fn is_bubble_bar_visible(&self, bar: &BubbleBarViewController) -> bool {
        !self.is_stashed && bar.has_bubbles() && !bar.is_hidden_for_no_bubbles()
    }

    fn diff_between_handle_and_bar_centers(&self, bar: &BubbleBarViewController) -> f64 {
        self.options.handle_center_from_bottom - bar.collapsed_height() / 2.
    }

    fn stashed_handle_translation_for_new_bubble_animation(
        &self,
        bar: &BubbleBarViewController,
    ) -> f64 {
        -(bar.collapsed_height() - self.options.handle_height) / 2.
    }

    fn stash_scale_x(&self, bar: &BubbleBarViewController) -> f64 {
        let width = bar.collapsed_width();
        if width > 0. {
            self.options.handle_width / width
        } else {
            1.
        }
    }

    fn stash_scale_y(&self, bar: &BubbleBarViewController) -> f64 {
        let height = bar.collapsed_height();
        if height > 0. {
            self.options.handle_height / height
        } else {
            1.
        }
    }

    fn advance_animations(&mut self, ctx: &mut StashContext) {
        let _span = tracy_client::span!("TransientBubbleStashController::advance_animations");

        if self.stash_animation_running
            && !ctx.bar.view().translation_y.is_animation_ongoing()
            && !ctx.bar.view().alpha.is_animation_ongoing()
        {
            self.on_stash_animation_end(ctx);
        }
    }

    fn are_animations_ongoing(&self) -> bool {
        self.stash_animation_running
    }
}
