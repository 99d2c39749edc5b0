//! ライブラリのエラー型

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PoseError>;

#[derive(Debug, Error)]
pub enum PoseError {
    /// モデル読み込み失敗 (再試行可能)
    #[error("model initialization failed: {0:#}")]
    Initialization(anyhow::Error),
    /// 1フレーム分の推論失敗
    #[error("pose estimation failed: {0:#}")]
    Estimation(anyhow::Error),
    #[error("frame source error: {0:#}")]
    FrameSource(anyhow::Error),
    #[error("CSV export failed: {0}")]
    Export(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("fullscreen request failed: {0}")]
    Fullscreen(String),
}

impl PoseError {
    /// ループを止めずに次のティックへ進めてよいエラーか
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Estimation(_) | Self::FrameSource(_))
    }
}
