//! User-tunable overlay settings and dashboard navigation state.

use crate::mailbox::Mailbox;

/// Dashboard categories, in display order.
pub const DASHBOARD_TABS: [&str; 9] = [
    "Connection",
    "General",
    "Platforms",
    "Customize UI",
    "Audio",
    "Stream Overlay",
    "Quick Actions",
    "Plugins",
    "About",
];

/// Index of the tab that edits [`OverlaySettings`].
pub const STREAM_OVERLAY_TAB: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlaySettings {
    pub show_chat: bool,
    pub chat_opacity: f32,
    pub chat_position_x: f32,
    pub chat_position_y: f32,
    pub chat_width: f32,
    pub chat_height: f32,
    pub show_alerts: bool,
    /// Seconds.
    pub alert_duration: f32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            show_chat: true,
            chat_opacity: 0.8,
            chat_position_x: 10.0,
            chat_position_y: 10.0,
            chat_width: 400.0,
            chat_height: 600.0,
            show_alerts: true,
            alert_duration: 5.0,
        }
    }
}

impl OverlaySettings {
    /// Clamps every field into the range the dashboard widgets allow.
    /// Non-finite values fall back to the defaults.
    pub fn sanitized(self) -> Self {
        let d = Self::default();
        let fix = |v: f32, fallback: f32, lo: f32, hi: f32| {
            if v.is_finite() {
                v.clamp(lo, hi)
            } else {
                fallback
            }
        };
        Self {
            show_chat: self.show_chat,
            chat_opacity: fix(self.chat_opacity, d.chat_opacity, 0.0, 1.0),
            chat_position_x: fix(self.chat_position_x, d.chat_position_x, f32::MIN, f32::MAX),
            chat_position_y: fix(self.chat_position_y, d.chat_position_y, f32::MIN, f32::MAX),
            chat_width: fix(self.chat_width, d.chat_width, 100.0, 800.0),
            chat_height: fix(self.chat_height, d.chat_height, 100.0, 1000.0),
            show_alerts: self.show_alerts,
            alert_duration: fix(self.alert_duration, d.alert_duration, 1.0, 30.0),
        }
    }
}

/// Dashboard navigation: category list or the detail pane of `current_tab`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardState {
    /// `true` while the detail pane is open.
    pub show_settings: bool,
    pub current_tab: i32,
}

impl DashboardState {
    pub fn sanitized(self) -> Self {
        Self {
            show_settings: self.show_settings,
            current_tab: self.current_tab.clamp(0, DASHBOARD_TABS.len() as i32 - 1),
        }
    }

    pub fn tab_name(&self) -> &'static str {
        DASHBOARD_TABS[self.sanitized().current_tab as usize]
    }
}

/// Settings and navigation shared between the host and the dashboard pass,
/// with the two core→host mailboxes.
#[derive(Debug, Default)]
pub struct DashboardModel {
    pub settings: OverlaySettings,
    pub state: DashboardState,
    state_changed: Mailbox<DashboardState>,
    settings_changed: Mailbox<OverlaySettings>,
}

impl DashboardModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host push; latched so the host can read back what it set.
    pub fn apply_state(&mut self, state: DashboardState) {
        self.state = state.sanitized();
        self.state_changed.post(self.state);
    }

    /// Host push; settings flow one way and are not echoed back.
    pub fn apply_settings(&mut self, settings: OverlaySettings) {
        self.settings = settings.sanitized();
    }

    /// UI selected a category.
    pub fn open_tab(&mut self, tab: i32) {
        self.state = DashboardState {
            show_settings: true,
            current_tab: tab,
        }
        .sanitized();
        self.state_changed.post(self.state);
    }

    /// UI pressed Back.
    pub fn close_tab(&mut self) {
        self.state.show_settings = false;
        self.state_changed.post(self.state);
    }

    /// UI pressed "Apply Settings".
    pub fn commit_settings(&mut self) {
        self.settings = self.settings.sanitized();
        self.settings_changed.post(self.settings);
        self.state_changed.post(self.state);
    }

    pub fn take_state_change(&mut self) -> Option<DashboardState> {
        self.state_changed.take()
    }

    pub fn take_settings_change(&mut self) -> Option<OverlaySettings> {
        self.settings_changed.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dirty_poll_is_single_read() {
        let mut model = DashboardModel::new();
        let state = DashboardState {
            show_settings: true,
            current_tab: 3,
        };
        model.apply_state(state);
        assert_eq!(model.take_state_change(), Some(state));
        assert_eq!(model.take_state_change(), None);
    }

    #[test]
    fn updates_between_reads_collapse_to_latest() {
        let mut model = DashboardModel::new();
        model.open_tab(1);
        model.open_tab(4);
        model.close_tab();
        assert_eq!(
            model.take_state_change(),
            Some(DashboardState {
                show_settings: false,
                current_tab: 4
            })
        );
        assert_eq!(model.take_state_change(), None);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let s = OverlaySettings {
            chat_opacity: 3.0,
            chat_width: 10.0,
            alert_duration: f32::NAN,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(s.chat_opacity, 1.0);
        assert_eq!(s.chat_width, 100.0);
        assert_eq!(s.alert_duration, 5.0);

        let d = DashboardState {
            show_settings: true,
            current_tab: 42,
        }
        .sanitized();
        assert_eq!(d.current_tab, 8);
        assert_eq!(d.tab_name(), "About");
    }

    #[test]
    fn commit_posts_settings_and_state() {
        let mut model = DashboardModel::new();
        model.settings.chat_opacity = 0.25;
        model.commit_settings();
        assert_eq!(model.take_settings_change().map(|s| s.chat_opacity), Some(0.25));
        assert!(model.take_state_change().is_some());
        assert_eq!(model.take_settings_change(), None);
    }
}
