use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{PoseError, Result};
use crate::render::ReferenceMarks;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub measurement: MeasurementConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CameraConfig {
    /// カメラ番号
    #[serde(default)]
    pub index: i32,
    /// 要求解像度 (幅)
    #[serde(default = "default_camera_width")]
    pub width: u32,
    /// 要求解像度 (高さ)
    #[serde(default = "default_camera_height")]
    pub height: u32,
}

fn default_camera_width() -> u32 { 640 }
fn default_camera_height() -> u32 { 360 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    /// MoveNet ONNXモデルのパス
    #[serde(default = "default_model_path")]
    pub path: String,
}

fn default_model_path() -> String { "models/movenet_lightning.onnx".to_string() }

impl Default for ModelConfig {
    fn default() -> Self {
        Self { path: default_model_path() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DetectionConfig {
    /// カメラ時の検出周期 (ミリ秒)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// 動画再生時の検出周期 (表示リフレッシュ相当)
    #[serde(default = "default_video_interval_ms")]
    pub video_interval_ms: u64,
    /// 全身可視判定の閾値
    #[serde(default = "default_visibility_threshold")]
    pub visibility_threshold: f32,
    /// 左右反転して推論するか
    #[serde(default)]
    pub flip_horizontal: bool,
    /// 全身可視のフレームを履歴に記録するか
    #[serde(default = "default_true")]
    pub record_history: bool,
}

fn default_interval_ms() -> u64 { 10 }
fn default_video_interval_ms() -> u64 { 16 }
fn default_visibility_threshold() -> f32 { 0.3 }
fn default_true() -> bool { true }

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            video_interval_ms: default_video_interval_ms(),
            visibility_threshold: default_visibility_threshold(),
            flip_horizontal: false,
            record_history: true,
        }
    }
}

impl DetectionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    pub fn video_interval(&self) -> Duration {
        Duration::from_millis(self.video_interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverlayConfig {
    /// 起動時に骨格を表示するか
    #[serde(default)]
    pub draw_skeleton: bool,
    /// キーポイント・骨格線を描画する最小信頼度
    #[serde(default = "default_keypoint_threshold")]
    pub keypoint_threshold: f32,
    #[serde(default = "default_scale")]
    pub position_scale: f32,
    #[serde(default = "default_scale")]
    pub size_scale: f32,
    /// 基準マーク ("none" / "flexibility" / "jump")
    #[serde(default)]
    pub reference_marks: ReferenceMarks,
    /// 可視インジケータを描画するか
    #[serde(default = "default_true")]
    pub indicator: bool,
    /// 起動時にチャートを表示するか
    #[serde(default)]
    pub chart: bool,
}

fn default_keypoint_threshold() -> f32 { 0.5 }
fn default_scale() -> f32 { 1.0 }

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            draw_skeleton: false,
            keypoint_threshold: default_keypoint_threshold(),
            position_scale: default_scale(),
            size_scale: default_scale(),
            reference_marks: ReferenceMarks::default(),
            indicator: true,
            chart: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MeasurementConfig {
    /// 計測開始までの猶予 (ミリ秒)
    #[serde(default = "default_start_delay_ms")]
    pub start_delay_ms: u64,
    /// 計測開始時に履歴をリセットするか
    #[serde(default = "default_true")]
    pub reset_history: bool,
}

fn default_start_delay_ms() -> u64 { 2000 }

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: default_start_delay_ms(),
            reset_history: true,
        }
    }
}

impl MeasurementConfig {
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    /// CSV出力先
    #[serde(default = "default_export_path")]
    pub path: String,
}

fn default_export_path() -> String { crate::history::CSV_FILENAME.to_string() }

impl Default for ExportConfig {
    fn default() -> Self {
        Self { path: default_export_path() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default)]
    pub verbose: bool,
}

fn default_log_dir() -> String { "logs".to_string() }

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            verbose: false,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// 構文・値の誤りは PoseError::Config
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| PoseError::Config(e.to_string()))
    }

    /// ファイルが無ければデフォルト、壊れていれば警告してデフォルト
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                crate::log!("[config] failed to load {}: {e:#}, using defaults", path.display());
                Self::default()
            }
        }
    }
}
