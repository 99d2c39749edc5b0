use anyhow::{bail, Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, CAP_ANY},
};
use std::path::{Path, PathBuf};

use super::source::{FrameSource, FrameStatus};

/// 動画ファイルの再生状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Playing,
    Paused,
    Ended,
}

/// OpenCVでデコードする動画ファイル
pub struct VideoFile {
    capture: VideoCapture,
    path: PathBuf,
    width: u32,
    height: u32,
    fps: f64,
    playback: Playback,
}

impl VideoFile {
    /// 開いた直後は再生中
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let filename = path.to_str().context("video path is not UTF-8")?;
        let capture = VideoCapture::from_file(filename, CAP_ANY)
            .with_context(|| format!("failed to open video {}", path.display()))?;

        if !capture.is_opened()? {
            bail!("video {} could not be decoded", path.display());
        }

        let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let fps = capture.get(videoio::CAP_PROP_FPS)?;
        crate::log!("[video] {} ({}x{}, {:.1}fps)", path.display(), width, height, fps);

        Ok(Self {
            capture,
            path: path.to_path_buf(),
            width,
            height,
            fps,
            playback: Playback::Playing,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// コンテナ記録のフレームレート (不明なら0)
    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    /// 再生開始。終端なら先頭に戻す
    pub fn play(&mut self) -> Result<()> {
        if self.playback == Playback::Ended {
            self.capture.set(videoio::CAP_PROP_POS_FRAMES, 0.0)?;
        }
        self.playback = Playback::Playing;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.playback == Playback::Playing {
            self.playback = Playback::Paused;
        }
    }

    /// 再生/一時停止の切り替え。切り替え後に再生中なら true
    pub fn toggle(&mut self) -> Result<bool> {
        match self.playback {
            Playback::Playing => {
                self.pause();
                Ok(false)
            }
            Playback::Paused | Playback::Ended => {
                self.play()?;
                Ok(true)
            }
        }
    }
}

impl FrameSource for VideoFile {
    type Frame = Mat;

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn read(&mut self) -> Result<FrameStatus<Mat>> {
        match self.playback {
            Playback::Paused => return Ok(FrameStatus::Paused),
            Playback::Ended => return Ok(FrameStatus::Ended),
            Playback::Playing => {}
        }

        let mut frame = Mat::default();
        let ok = self.capture.read(&mut frame).context("Failed to read video frame")?;
        if !ok || frame.empty() {
            self.playback = Playback::Ended;
            crate::log!("[video] reached end of {}", self.path.display());
            return Ok(FrameStatus::Ended);
        }
        Ok(FrameStatus::Ready(frame))
    }
}
