use std::fmt;

use crate::config::Config;

/// モデルの読み込み状態
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ModelStatus {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => write!(f, "loading model, please wait..."),
            Self::Ready => write!(f, "model ready"),
            Self::Failed(msg) => write!(f, "model failed: {msg}"),
        }
    }
}

/// UIのトグルと表示値
#[derive(Debug, Clone, Default)]
pub struct ViewerState {
    camera_active: bool,
    draw_skeleton: bool,
    fullscreen: bool,
    show_chart: bool,
    frame_rate: u32,
    model_status: ModelStatus,
    visible: Option<bool>,
    notification: Option<String>,
}

impl ViewerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            draw_skeleton: config.overlay.draw_skeleton,
            show_chart: config.overlay.chart,
            ..Self::default()
        }
    }

    pub fn camera_active(&self) -> bool {
        self.camera_active
    }

    pub(crate) fn set_camera_active(&mut self, active: bool) {
        self.camera_active = active;
        if !active {
            self.visible = None;
        }
    }

    pub fn draw_skeleton(&self) -> bool {
        self.draw_skeleton
    }

    pub fn toggle_skeleton(&mut self) -> bool {
        self.draw_skeleton = !self.draw_skeleton;
        self.draw_skeleton
    }

    pub fn fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn show_chart(&self) -> bool {
        self.show_chart
    }

    pub fn toggle_chart(&mut self) -> bool {
        self.show_chart = !self.show_chart;
        self.show_chart
    }

    pub fn frame_rate(&self) -> u32 {
        self.frame_rate
    }

    pub(crate) fn set_frame_rate(&mut self, rate: u32) {
        self.frame_rate = rate;
    }

    pub fn model_status(&self) -> &ModelStatus {
        &self.model_status
    }

    pub(crate) fn set_model_status(&mut self, status: ModelStatus) {
        self.model_status = status;
    }

    /// 直近ティックの全身可視フラグ
    pub fn visible(&self) -> Option<bool> {
        self.visible
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = Some(visible);
    }

    /// ブロックしない通知 (最新の1件だけ保持)
    pub fn notify(&mut self, message: impl Into<String>) {
        let message = message.into();
        crate::log!("[notice] {}", message);
        self.notification = Some(message);
    }

    pub fn take_notification(&mut self) -> Option<String> {
        self.notification.take()
    }

    /// ステータス表示用の1行
    pub fn status_line(&self, records: usize) -> String {
        let visible = match self.visible {
            Some(true) => "all visible",
            Some(false) => "partially visible",
            None => "-",
        };
        format!(
            "{} | Frame Rate: {} fps | {} | records: {}",
            self.model_status, self.frame_rate, visible, records
        )
    }
}
