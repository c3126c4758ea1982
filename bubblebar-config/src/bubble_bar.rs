#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct BubbleBar {
    /// Disables the bubble bar entirely.
    #[knuffel(child)]
    pub off: bool,
    #[knuffel(child, unwrap(argument), default = Self::default().icon_size)]
    pub icon_size: f64,
    #[knuffel(child, unwrap(argument), default = Self::default().icon_spacing)]
    pub icon_spacing: f64,
    #[knuffel(child, unwrap(argument), default = Self::default().bar_padding)]
    pub bar_padding: f64,
    /// Horizontal offset between the stacked icons of the collapsed bar.
    #[knuffel(child, unwrap(argument), default = Self::default().collapsed_offset)]
    pub collapsed_offset: f64,
    #[knuffel(child, unwrap(argument), default = Self::default().max_bubbles)]
    pub max_bubbles: u32,
    #[knuffel(child, unwrap(argument), default = Self::default().bounce_distance)]
    pub bounce_distance: f64,
    #[knuffel(child, unwrap(argument), default = Self::default().notification_hide_delay_ms)]
    pub notification_hide_delay_ms: u32,
    #[knuffel(child)]
    pub on_left: bool,
}

impl Default for BubbleBar {
    fn default() -> Self {
        Self {
            off: false,
            icon_size: 52.,
            icon_spacing: 12.,
            bar_padding: 4.,
            collapsed_offset: 5.,
            max_bubbles: 5,
            bounce_distance: 10.,
            notification_hide_delay_ms: 2500,
            on_left: false,
        }
    }
}

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Taskbar {
    /// Uses the transient taskbar, where the bubble bar can stash into a handle.
    #[knuffel(child)]
    pub transient: bool,
    #[knuffel(child, unwrap(argument), default = Self::default().taskbar_height)]
    pub taskbar_height: f64,
    #[knuffel(child, unwrap(argument), default = Self::default().taskbar_bottom_space)]
    pub taskbar_bottom_space: f64,
    #[knuffel(child, unwrap(argument), default = Self::default().hotseat_height)]
    pub hotseat_height: f64,
    #[knuffel(child, unwrap(argument), default = Self::default().hotseat_bottom_space)]
    pub hotseat_bottom_space: f64,
    #[knuffel(child, unwrap(argument), default = Self::default().handle_width)]
    pub handle_width: f64,
    #[knuffel(child, unwrap(argument), default = Self::default().handle_height)]
    pub handle_height: f64,
    #[knuffel(child, unwrap(argument), default = Self::default().handle_center_from_bottom)]
    pub handle_center_from_bottom: f64,
}

impl Default for Taskbar {
    fn default() -> Self {
        Self {
            transient: false,
            taskbar_height: 64.,
            taskbar_bottom_space: 24.,
            hotseat_height: 150.,
            hotseat_bottom_space: 20.,
            handle_width: 40.,
            handle_height: 4.,
            handle_center_from_bottom: 14.,
        }
    }
}
