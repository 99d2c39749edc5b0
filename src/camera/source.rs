use anyhow::Result;

/// 1回の読み出し結果
#[derive(Debug, Clone, PartialEq)]
pub enum FrameStatus<F> {
    /// 新しいフレーム
    Ready(F),
    /// まだフレームが無い (初回デコード前など)
    Pending,
    /// 一時停止中 (動画)
    Paused,
    /// 終端に到達 (動画)
    Ended,
}

/// カメラや動画などのフレーム供給元
pub trait FrameSource {
    type Frame;

    /// フレームの解像度 (幅, 高さ)
    fn resolution(&self) -> (u32, u32);

    fn read(&mut self) -> Result<FrameStatus<Self::Frame>>;
}

