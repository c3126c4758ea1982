use std::mem;
use std::rc::Rc;

use super::bubble_animator::{BarLayout, BubbleAnimator, BubbleAnimatorListener, TransitionState};
use super::view::BubbleBarView;
use super::{BubbleBarEvent, Options};
use crate::animation::Clock;

/// Owns the bar view and the bubble list, newest bubble first.
#[derive(Debug)]
pub struct BubbleBarViewController {
    options: Rc<Options>,
    clock: Clock,
    view: BubbleBarView,
    bubbles: Vec<String>,
    selected: Option<String>,
    /// Transition of the expanded bubble row, if one is running.
    animator: Option<BubbleAnimator>,
    /// Bubble that stays in the list until the running transition ends.
    pending_removal: Option<String>,
    hidden_for_no_bubbles: bool,
    touch_region_invalid: bool,
    events: Vec<BubbleBarEvent>,
}

impl BubbleBarViewController {
    pub fn new(options: Rc<Options>, clock: Clock) -> Self {
        Self {
            options,
            clock,
            view: BubbleBarView::new(),
            bubbles: Vec::new(),
            selected: None,
            animator: None,
            pending_removal: None,
            hidden_for_no_bubbles: true,
            touch_region_invalid: false,
            events: Vec::new(),
        }
    }

    pub fn update_options(&mut self, options: Rc<Options>) {
        self.options = options;
        self.relayout();
        self.touch_region_invalid = true;
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn view(&self) -> &BubbleBarView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut BubbleBarView {
        &mut self.view
    }

    pub fn bubbles(&self) -> &[String] {
        &self.bubbles
    }

    pub fn bubble_count(&self) -> usize {
        self.bubbles.len()
    }

    pub fn has_bubbles(&self) -> bool {
        !self.bubbles.is_empty()
    }

    pub fn selected_bubble(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    fn selected_index(&self) -> Option<usize> {
        let selected = self.selected.as_ref()?;
        self.bubbles.iter().position(|b| b == selected)
    }

    pub fn is_expanded(&self) -> bool {
        self.view.expanded
    }

    pub fn is_hidden_for_no_bubbles(&self) -> bool {
        self.hidden_for_no_bubbles
    }

    pub fn transition_state(&self) -> TransitionState {
        self.animator
            .as_ref()
            .map_or(TransitionState::Idle, |animator| animator.state())
    }

    /// Adds a bubble at the front of the bar.
    ///
    /// Returns `false` if the bubble is already in the bar.
    pub fn add_bubble(&mut self, key: &str, animate: bool) -> bool {
        // A bubble on its way out comes back as a new one.
        if self.pending_removal.as_deref() == Some(key) {
            self.cancel_transition();
        }

        if self.bubbles.iter().any(|b| b == key) {
            trace!("bubble {key} is already in the bar");
            return false;
        }

        // Finalizes any pending removal so that the indices below are current.
        self.cancel_transition();

        self.bubbles.insert(0, key.to_owned());
        if self.selected.is_none() {
            self.selected = Some(key.to_owned());
        }

        let animate = animate && self.view.expanded;
        let max_bubbles = self.options.max_bubbles.max(1);

        if self.bubbles.len() > max_bubbles {
            let removed = self.bubbles.len() - 1;
            let removed_key = self.bubbles[removed].clone();
            debug!("bubble bar is full, dropping {removed_key}");

            if self.selected.as_deref() == Some(removed_key.as_str()) {
                self.selected = Some(self.bubbles[removed - 1].clone());
            }

            if animate {
                let selected = self.selected_index().unwrap_or(0);
                let mut animator = self.new_animator();
                animator.animate_new_and_remove_old(selected, removed);
                self.animator = Some(animator);
                self.pending_removal = Some(removed_key);
            } else {
                self.bubbles.truncate(max_bubbles);
            }
        } else if animate {
            let selected = self.selected_index().unwrap_or(0);
            let mut animator = self.new_animator();
            animator.animate_new_bubble(selected);
            self.animator = Some(animator);
        }

        self.hidden_for_no_bubbles = false;
        self.relayout();
        self.touch_region_invalid = true;
        true
    }

    /// Removes a bubble from the bar.
    ///
    /// Returns `false` if the bubble is not in the bar.
    pub fn remove_bubble(&mut self, key: &str, animate: bool) -> bool {
        self.cancel_transition();

        let Some(index) = self.bubbles.iter().position(|b| b == key) else {
            trace!("bubble {key} is not in the bar");
            return false;
        };

        if self.bubbles.len() == 1 {
            debug!("last bubble removed, hiding the bar");
            self.bubbles.clear();
            self.selected = None;
            self.set_expanded(false);
            self.set_hidden_for_no_bubbles();
            self.relayout();
            self.touch_region_invalid = true;
            return true;
        }

        let removing_last = index == self.bubbles.len() - 1;
        let prev_selected = self.selected_index();

        if self.selected.as_deref() == Some(key) {
            let replacement = if removing_last { index - 1 } else { index + 1 };
            self.selected = Some(self.bubbles[replacement].clone());
        }

        if animate && self.view.expanded {
            let selected = prev_selected.unwrap_or(index);
            let mut animator = self.new_animator();
            animator.animate_removed_bubble(index, selected, removing_last);
            self.animator = Some(animator);
            self.pending_removal = Some(key.to_owned());
        } else {
            self.bubbles.remove(index);
        }

        self.relayout();
        self.touch_region_invalid = true;
        true
    }

    pub fn select_bubble(&mut self, key: &str) -> bool {
        if self.pending_removal.as_deref() == Some(key) || !self.bubbles.iter().any(|b| b == key) {
            return false;
        }

        self.selected = Some(key.to_owned());
        self.relayout();
        true
    }

    pub fn set_expanded(&mut self, expanded: bool) {
        if self.view.expanded == expanded {
            return;
        }

        if !expanded {
            self.cancel_transition();
        }

        debug!("bubble bar expanded: {expanded}");
        self.view.expanded = expanded;
        self.events.push(BubbleBarEvent::Expanded(expanded));
        self.relayout();
        self.touch_region_invalid = true;
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.view.visible == visible {
            return;
        }

        self.view.visible = visible;
        self.events.push(BubbleBarEvent::BubbleBarVisible(visible));
    }

    fn set_hidden_for_no_bubbles(&mut self) {
        self.hidden_for_no_bubbles = true;
        self.view.alpha.set(0.);
        self.view.translation_y.stop();
        self.view.scale_x.stop();
        self.view.scale_y.stop();
        self.set_visible(false);
    }

    pub fn invalidate_touch_region(&mut self) {
        self.touch_region_invalid = true;
    }

    pub fn take_touch_region_invalidation(&mut self) -> bool {
        mem::take(&mut self.touch_region_invalid)
    }

    pub fn take_events(&mut self) -> Vec<BubbleBarEvent> {
        mem::take(&mut self.events)
    }

    fn layout(&self) -> BarLayout {
        BarLayout {
            icon_size: self.options.icon_size,
            spacing: self.options.icon_spacing,
            count: self.bubbles.len(),
            on_left: self.options.on_left,
        }
    }

    fn new_animator(&self) -> BubbleAnimator {
        BubbleAnimator::new(
            self.layout(),
            self.clock.clone(),
            self.options.animations.bubble_transition(),
        )
    }

    fn cancel_transition(&mut self) {
        if let Some(mut animator) = self.animator.take() {
            animator.cancel(self);
            self.relayout();
        }
    }

    /// Offset of bubble `index` from the anchor edge of the bubble row.
    pub fn bubble_translation_x(&self, index: usize) -> f64 {
        match &self.animator {
            Some(animator) => animator.translation_x(index),
            None => self.layout().steady_translation_x(index),
        }
    }

    /// Width of the expanded bar, padding included.
    pub fn expanded_width(&self) -> f64 {
        let content = match &self.animator {
            Some(animator) => animator.expanded_width(),
            None => self.layout().steady_width(),
        };
        content + 2. * self.options.bar_padding
    }

    pub fn arrow_position(&self) -> f64 {
        if let Some(animator) = &self.animator {
            return animator.arrow_position();
        }

        self.selected_index().map_or(0., |index| {
            self.layout().steady_translation_x(index) + self.options.icon_size / 2.
        })
    }

    pub fn collapsed_width(&self) -> f64 {
        // The collapsed bar shows the two newest bubbles stacked.
        let offset = if self.bubbles.len() > 1 {
            self.options.collapsed_offset
        } else {
            0.
        };
        self.options.icon_size + offset + 2. * self.options.bar_padding
    }

    pub fn collapsed_height(&self) -> f64 {
        self.options.icon_size + 2. * self.options.bar_padding
    }

    fn relayout(&mut self) {
        if let Some(animator) = &self.animator {
            let count = animator.bubble_count();
            self.view.bubble_translations =
                (0..count).map(|i| animator.translation_x(i)).collect();
            self.view.content_width = animator.expanded_width();
            self.view.arrow_position = animator.arrow_position();
            return;
        }

        let layout = self.layout();
        self.view.bubble_translations = (0..layout.count)
            .map(|i| layout.steady_translation_x(i))
            .collect();
        self.view.content_width = layout.steady_width();
        self.view.arrow_position = self.arrow_position();
    }

    pub fn advance_animations(&mut self) {
        let _span = tracy_client::span!("BubbleBarViewController::advance_animations");

        if let Some(mut animator) = self.animator.take() {
            animator.advance_animations(self);
            if animator.is_running() {
                self.animator = Some(animator);
            } else {
                self.relayout();
            }
        }

        self.view.advance_animations();
    }

    pub fn are_animations_ongoing(&self) -> bool {
        self.animator.is_some() || self.view.are_animations_ongoing()
    }
}

impl BubbleAnimatorListener for BubbleBarViewController {
    fn on_animation_update(&mut self, animator: &BubbleAnimator, _fraction: f64) {
        let count = animator.bubble_count();
        self.view.bubble_translations = (0..count).map(|i| animator.translation_x(i)).collect();
        self.view.content_width = animator.expanded_width();
        self.view.arrow_position = animator.arrow_position();
    }

    fn on_animation_cancel(&mut self, animator: &BubbleAnimator) {
        trace!("bubble transition cancelled: {:?}", animator.state());
    }

    fn on_animation_end(&mut self, animator: &BubbleAnimator) {
        trace!("bubble transition ended: {:?}", animator.state());

        if let Some(key) = self.pending_removal.take() {
            self.bubbles.retain(|b| *b != key);
        }
        self.touch_region_invalid = true;
    }
}
