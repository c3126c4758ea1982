//! Renderable state of the bar and the stashed handle.
//!
//! These hold only what a renderer needs; all policy lives in the controllers.

use super::animated_value::AnimatedValue;

#[derive(Debug, Clone)]
pub struct BubbleBarView {
    pub translation_y: AnimatedValue,
    pub alpha: AnimatedValue,
    pub scale_x: AnimatedValue,
    pub scale_y: AnimatedValue,
    /// Scale pivot, relative to the bar height. 1 is the bottom edge.
    pub relative_pivot_y: f64,
    pub visible: bool,
    pub expanded: bool,
    /// Horizontal offset of each bubble from the anchor edge, newest first.
    pub bubble_translations: Vec<f64>,
    /// Width of the bubble row, without padding.
    pub content_width: f64,
    /// Center of the selection arrow, from the anchor edge.
    pub arrow_position: f64,
}

impl BubbleBarView {
    pub fn new() -> Self {
        Self {
            translation_y: AnimatedValue::new(0.),
            alpha: AnimatedValue::new(0.),
            scale_x: AnimatedValue::new(1.),
            scale_y: AnimatedValue::new(1.),
            relative_pivot_y: 1.,
            visible: false,
            expanded: false,
            bubble_translations: Vec::new(),
            content_width: 0.,
            arrow_position: 0.,
        }
    }

    pub fn advance_animations(&mut self) {
        self.translation_y.advance();
        self.alpha.advance();
        self.scale_x.advance();
        self.scale_y.advance();
    }

    pub fn are_animations_ongoing(&self) -> bool {
        self.translation_y.is_animation_ongoing()
            || self.alpha.is_animation_ongoing()
            || self.scale_x.is_animation_ongoing()
            || self.scale_y.is_animation_ongoing()
    }
}

/// The thin line the bar collapses into on the transient taskbar.
#[derive(Debug, Clone)]
pub struct StashedHandleView {
    pub translation_y: AnimatedValue,
    pub alpha: AnimatedValue,
}

impl Default for StashedHandleView {
    fn default() -> Self {
        Self::new()
    }
}

impl StashedHandleView {
    pub fn new() -> Self {
        Self {
            translation_y: AnimatedValue::new(0.),
            alpha: AnimatedValue::new(0.),
        }
    }

    pub fn advance_animations(&mut self) {
        self.translation_y.advance();
        self.alpha.advance();
    }

    pub fn are_animations_ongoing(&self) -> bool {
        self.translation_y.is_animation_ongoing() || self.alpha.is_animation_ongoing()
    }
}
