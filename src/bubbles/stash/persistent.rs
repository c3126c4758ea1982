use std::rc::Rc;

use super::{BubbleStashController, StashContext, TaskbarHotseatDimensionsProvider};
use crate::animation::Clock;
use crate::bubbles::bar_controller::BubbleBarViewController;
use crate::bubbles::Options;

/// Stash controller of the persistent taskbar.
///
/// The bar never stashes here. It only moves between the taskbar and the hotseat.
pub struct PersistentTaskbarStashController {
    options: Rc<Options>,
    dimensions: Rc<dyn TaskbarHotseatDimensionsProvider>,
    clock: Clock,
    is_bubbles_showing_on_home: bool,
    is_bubbles_showing_on_overview: bool,
    is_sysui_locked: bool,
}

impl PersistentTaskbarStashController {
    pub fn new(
        options: Rc<Options>,
        dimensions: Rc<dyn TaskbarHotseatDimensionsProvider>,
        clock: Clock,
    ) -> Self {
        Self {
            options,
            dimensions,
            clock,
            is_bubbles_showing_on_home: false,
            is_bubbles_showing_on_overview: false,
            is_sysui_locked: false,
        }
    }

    fn animate_bubble_bar_y(&self, bar: &mut BubbleBarViewController) {
        let translation_y = self.bubble_bar_translation_y(bar);
        let config = self.options.animations.bar_translation();

        if bar.is_hidden_for_no_bubbles() {
            bar.view_mut().translation_y.set(translation_y);
        } else {
            bar.view_mut()
                .translation_y
                .animate_to(&self.clock, translation_y, config);
        }

        self.update_taskbar_touch_region(bar);
    }

    fn animate_after_unlock(&self, bar: &mut BubbleBarViewController) {
        let translation_y = self.bubble_bar_translation_y(bar);
        let animations = &self.options.animations;

        let view = bar.view_mut();
        view.alpha
            .animate_to(&self.clock, 1., animations.stash_alpha());
        view.scale_x
            .animate_to(&self.clock, 1., animations.bar_translation());
        view.scale_y
            .animate_to(&self.clock, 1., animations.bar_translation());
        view.translation_y
            .animate_to(&self.clock, translation_y, animations.bar_translation());

        bar.set_visible(true);
        self.update_taskbar_touch_region(bar);
    }
}

impl BubbleStashController for PersistentTaskbarStashController {
    fn is_stashed(&self) -> bool {
        false
    }

    fn is_transient_taskbar(&self) -> bool {
        false
    }

    fn has_handle_view(&self) -> bool {
        false
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

        // The bar is collapsed before it moves over to the hotseat.
        if showing {
            ctx.bar.set_expanded(false);
        }

        self.animate_bubble_bar_y(ctx.bar);
    }

    fn is_bubbles_showing_on_overview(&self) -> bool {
        self.is_bubbles_showing_on_overview
    }

    fn set_bubbles_showing_on_overview(&mut self, showing: bool, _ctx: &mut StashContext) {
        if self.is_bubbles_showing_on_overview == showing {
            return;
        }

        debug!("bubbles showing on overview: {showing}");
        self.is_bubbles_showing_on_overview = showing;
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

        if !locked
            && ctx.bar.has_bubbles()
            && (self.is_bubbles_showing_on_home || self.is_bubbles_showing_on_overview)
        {
            self.animate_after_unlock(ctx.bar);
        }
    }

    fn show_bubble_bar_immediate_at(&mut self, translation_y: f64, ctx: &mut StashContext) {
        if ctx.bar.is_hidden_for_no_bubbles() {
            return;
        }

        let view = ctx.bar.view_mut();
        view.alpha.set(1.);
        view.scale_x.set(1.);
        view.scale_y.set(1.);
        view.translation_y.set(translation_y);

        ctx.bar.set_visible(true);
        self.update_taskbar_touch_region(ctx.bar);
    }

    fn on_new_bubble_animation_interrupted(
        &mut self,
        _is_stashed: bool,
        translation_y: f64,
        ctx: &mut StashContext,
    ) {
        self.show_bubble_bar_immediate_at(translation_y, ctx);
        // Nothing else brings the bar back from where the bounce left it.
        self.animate_bubble_bar_y(ctx.bar);
    }

    fn stash_bubble_bar_immediate(&mut self, _ctx: &mut StashContext) {
        trace!("persistent taskbar never stashes");
    }

    fn stash_bubble_bar(&mut self, ctx: &mut StashContext) {
        ctx.bar.set_expanded(false);
    }

    fn show_bubble_bar(&mut self, expand: bool, ctx: &mut StashContext) {
        if expand {
            ctx.bar.set_expanded(true);
        }
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
        bar.collapsed_height()
    }

    fn is_bubble_bar_visible(&self, bar: &BubbleBarViewController) -> bool {
        bar.has_bubbles()
    }

    fn diff_between_handle_and_bar_centers(&self, _bar: &BubbleBarViewController) -> f64 {
        0.
    }

    fn stashed_handle_translation_for_new_bubble_animation(
        &self,
        _bar: &BubbleBarViewController,
    ) -> f64 {
        0.
    }

    fn stash_scale_x(&self, _bar: &BubbleBarViewController) -> f64 {
        1.
    }

    fn stash_scale_y(&self, _bar: &BubbleBarViewController) -> f64 {
        1.
    }

    fn advance_animations(&mut self, _ctx: &mut StashContext) {}

    fn are_animations_ongoing(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::bubbles::stash::TaskbarDimensions;

    struct Fixture {
        clock: Clock,
        bar: BubbleBarViewController,
        stash: PersistentTaskbarStashController,
    }

    impl Fixture {
        fn new() -> Self {
            let clock = Clock::with_time(Duration::ZERO);
            let mut options = Options::default();
            // Collapsed bar height of 100.
            options.icon_size = 92.;
            options.bar_padding = 4.;
            let options = Rc::new(options);

            let dimensions = Rc::new(TaskbarDimensions {
                taskbar_height: 110.,
                taskbar_bottom_space: 0.,
                hotseat_height: 150.,
                hotseat_bottom_space: 20.,
            });

            let bar = BubbleBarViewController::new(options.clone(), clock.clone());
            let stash = PersistentTaskbarStashController::new(options, dimensions, clock.clone());
            Self { clock, bar, stash }
        }

        fn run(&mut self, f: impl FnOnce(&mut PersistentTaskbarStashController, &mut StashContext)) {
            let mut ctx = StashContext {
                bar: &mut self.bar,
                handle: None,
                observer: None,
            };
            f(&mut self.stash, &mut ctx);
        }

        fn settle(&mut self) {
            self.clock
                .set_unadjusted(self.clock.now_unadjusted() + Duration::from_secs(1));
            self.bar.advance_animations();
        }
    }

    #[test]
    fn resting_translations() {
        let f = Fixture::new();
        assert_abs_diff_eq!(f.bar.collapsed_height(), 100.);
        assert_abs_diff_eq!(f.stash.bubble_bar_translation_y_for_taskbar(&f.bar), -5.);
        assert_abs_diff_eq!(f.stash.bubble_bar_translation_y_for_hotseat(&f.bar), -45.);
    }

    #[test]
    fn never_stashes() {
        let mut f = Fixture::new();
        f.bar.add_bubble("a", false);
        f.run(|stash, ctx| {
            stash.show_bubble_bar_immediate(ctx);
            stash.stash_bubble_bar_immediate(ctx);
            stash.stash_bubble_bar(ctx);
        });

        assert!(!f.stash.is_stashed());
        assert!(!f.stash.has_handle_view());
        assert!(f.bar.view().visible);
        assert_eq!(f.bar.view().alpha.current(), 1.);
        assert_abs_diff_eq!(f.bar.view().translation_y.current(), -5.);
    }

    #[test]
    fn going_home_collapses_and_moves_to_hotseat() {
        let mut f = Fixture::new();
        f.bar.add_bubble("a", false);
        f.run(|stash, ctx| {
            stash.show_bubble_bar_immediate(ctx);
            stash.show_bubble_bar(true, ctx);
        });
        assert!(f.bar.is_expanded());

        f.run(|stash, ctx| stash.set_bubbles_showing_on_home(true, ctx));
        assert!(!f.bar.is_expanded());
        assert!(f.bar.view().translation_y.is_animation_ongoing());
        assert_abs_diff_eq!(f.bar.view().translation_y.target(), -45.);

        f.settle();
        assert_abs_diff_eq!(f.bar.view().translation_y.current(), -45.);
        assert!(!f.bar.are_animations_ongoing());
    }

    #[test]
    fn unlock_on_home_restores_bar() {
        let mut f = Fixture::new();
        f.bar.add_bubble("a", false);
        f.run(|stash, ctx| {
            stash.set_bubbles_showing_on_home(true, ctx);
            stash.set_sysui_locked(true, ctx);
        });
        f.bar.view_mut().alpha.set(0.);
        f.bar.view_mut().scale_y.set(0.5);

        f.run(|stash, ctx| stash.set_sysui_locked(false, ctx));
        f.settle();

        let view = f.bar.view();
        assert_eq!(view.alpha.current(), 1.);
        assert_eq!(view.scale_y.current(), 1.);
        assert_abs_diff_eq!(view.translation_y.current(), -45.);
    }

    #[test]
    fn interrupted_animation_shows_at_translation_then_rests() {
        let mut f = Fixture::new();
        f.bar.add_bubble("a", false);
        f.run(|stash, ctx| stash.on_new_bubble_animation_interrupted(true, -12., ctx));

        assert!(f.bar.view().visible);
        assert_eq!(f.bar.view().alpha.current(), 1.);
        assert_eq!(f.bar.view().translation_y.current(), -12.);
        assert_abs_diff_eq!(f.bar.view().translation_y.target(), -5.);

        f.settle();
        assert_abs_diff_eq!(f.bar.view().translation_y.current(), -5.);
        assert!(!f.bar.are_animations_ongoing());
    }
}
