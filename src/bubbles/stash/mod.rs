//! Whether the bar is stashed into its handle or shown, and where it rests.

use std::rc::Rc;

use super::bar_controller::BubbleBarViewController;
use super::view::StashedHandleView;
use super::Options;
use crate::animation::Clock;

mod persistent;
mod transient;

pub use persistent::PersistentTaskbarStashController;
pub use transient::TransientBubbleStashController;

/// Collaborators a stash controller acts on.
pub struct StashContext<'a> {
    pub bar: &'a mut BubbleBarViewController,
    /// Only present on the transient taskbar.
    pub handle: Option<&'a mut StashedHandleView>,
    /// Notified before the stashed state flips.
    pub observer: Option<&'a mut dyn StashStateObserver>,
}

/// Where an interrupted new-bubble animation left the bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interruption {
    pub is_stashed: bool,
    pub translation_y: f64,
}

pub trait StashStateObserver {
    /// Called right before the stashed state changes.
    ///
    /// Returns where the bar was left if this cancelled an animation of the observer.
    fn on_stash_state_changing(
        &mut self,
        bar: &mut BubbleBarViewController,
    ) -> Option<Interruption>;
}

pub trait TaskbarHotseatDimensionsProvider {
    /// Space between the bottom of the taskbar and the bottom of the screen.
    fn taskbar_bottom_space(&self) -> f64;
    fn taskbar_height(&self) -> f64;
    /// Space between the bottom of the hotseat and the bottom of the screen.
    fn hotseat_bottom_space(&self) -> f64;
    fn hotseat_height(&self) -> f64;
}

/// Taskbar and hotseat dimensions taken from the config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskbarDimensions {
    pub taskbar_height: f64,
    pub taskbar_bottom_space: f64,
    pub hotseat_height: f64,
    pub hotseat_bottom_space: f64,
}

impl TaskbarHotseatDimensionsProvider for TaskbarDimensions {
    fn taskbar_bottom_space(&self) -> f64 {
        self.taskbar_bottom_space
    }

    fn taskbar_height(&self) -> f64 {
        self.taskbar_height
    }

    fn hotseat_bottom_space(&self) -> f64 {
        self.hotseat_bottom_space
    }

    fn hotseat_height(&self) -> f64 {
        self.hotseat_height
    }
}

pub trait BubbleStashController {
    fn is_stashed(&self) -> bool;
    fn is_transient_taskbar(&self) -> bool;
    fn has_handle_view(&self) -> bool;

    fn is_bubbles_showing_on_home(&self) -> bool;
    fn set_bubbles_showing_on_home(&mut self, showing: bool, ctx: &mut StashContext);
    fn is_bubbles_showing_on_overview(&self) -> bool;
    fn set_bubbles_showing_on_overview(&mut self, showing: bool, ctx: &mut StashContext);
    fn is_sysui_locked(&self) -> bool;
    fn set_sysui_locked(&mut self, locked: bool, ctx: &mut StashContext);

    /// Shows the bar at its resting position without animating.
    fn show_bubble_bar_immediate(&mut self, ctx: &mut StashContext) {
        let translation_y = self.bubble_bar_translation_y(ctx.bar);
        self.show_bubble_bar_immediate_at(translation_y, ctx);
    }
    fn show_bubble_bar_immediate_at(&mut self, translation_y: f64, ctx: &mut StashContext);
    /// Stashes the bar without animating. Does nothing without a handle.
    fn stash_bubble_bar_immediate(&mut self, ctx: &mut StashContext);
    fn stash_bubble_bar(&mut self, ctx: &mut StashContext);
    fn show_bubble_bar(&mut self, expand: bool, ctx: &mut StashContext);
    /// Takes over the bar from an interrupted new-bubble animation, without animating.
    fn on_new_bubble_animation_interrupted(
        &mut self,
        is_stashed: bool,
        translation_y: f64,
        ctx: &mut StashContext,
    ) {
        if is_stashed && self.has_handle_view() {
            self.stash_bubble_bar_immediate(ctx);
        } else {
            self.show_bubble_bar_immediate_at(translation_y, ctx);
        }
    }

    fn dimensions(&self) -> &dyn TaskbarHotseatDimensionsProvider;
    fn update_options(
        &mut self,
        options: Rc<Options>,
        dimensions: Rc<dyn TaskbarHotseatDimensionsProvider>,
    );

    /// Resting translation of the bar centered on the taskbar.
    fn bubble_bar_translation_y_for_taskbar(&self, bar: &BubbleBarViewController) -> f64 {
        let dimensions = self.dimensions();
        let height = bar.collapsed_height();
        -dimensions.taskbar_bottom_space() - (dimensions.taskbar_height() - height) / 2.
    }

    /// Resting translation of the bar centered on the hotseat.
    fn bubble_bar_translation_y_for_hotseat(&self, bar: &BubbleBarViewController) -> f64 {
        let dimensions = self.dimensions();
        let height = bar.collapsed_height();
        -dimensions.hotseat_bottom_space() - (dimensions.hotseat_height() - height) / 2.
    }

    /// Resting translation of the shown bar in the current state.
    fn bubble_bar_translation_y(&self, bar: &BubbleBarViewController) -> f64 {
        if self.is_bubbles_showing_on_home() {
            self.bubble_bar_translation_y_for_hotseat(bar)
        } else {
            self.bubble_bar_translation_y_for_taskbar(bar)
        }
    }

    /// Height of the area that accepts touches for the bar.
    fn touchable_height(&self, bar: &BubbleBarViewController) -> f64;
    fn is_bubble_bar_visible(&self, bar: &BubbleBarViewController) -> bool;
    /// Vertical distance from the bar center down to the handle center.
    fn diff_between_handle_and_bar_centers(&self, bar: &BubbleBarViewController) -> f64;
    /// Translation at which the handle disappears during the new-bubble morph.
    fn stashed_handle_translation_for_new_bubble_animation(
        &self,
        bar: &BubbleBarViewController,
    ) -> f64;
    fn update_taskbar_touch_region(&self, bar: &mut BubbleBarViewController) {
        bar.invalidate_touch_region();
    }
    fn stash_scale_x(&self, bar: &BubbleBarViewController) -> f64;
    fn stash_scale_y(&self, bar: &BubbleBarViewController) -> f64;

    fn advance_animations(&mut self, ctx: &mut StashContext);
    fn are_animations_ongoing(&self) -> bool;
}

/// Creates the stash controller for the configured taskbar mode.
pub fn stash_controller_for(
    options: Rc<Options>,
    dimensions: Rc<dyn TaskbarHotseatDimensionsProvider>,
    clock: Clock,
) -> Box<dyn BubbleStashController> {
    if options.transient_taskbar {
        Box::new(TransientBubbleStashController::new(options, dimensions, clock))
    } else {
        Box::new(PersistentTaskbarStashController::new(options, dimensions, clock))
    }
}
