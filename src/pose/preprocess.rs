use anyhow::{bail, Result};
use ndarray::Array4;
use opencv::{
    core::{AlgorithmHint, Mat, Size, CV_8U},
    imgproc,
    prelude::*,
};

/// MoveNet 入力の一辺
pub const INPUT_SIZE: i32 = 192;

/// 8bit BGR フレームを [1, 192, 192, 3] の RGB テンソル (0.0-255.0) にする
///
/// 縮小してから色変換する。アスペクト比は保持しない (出力座標は正規化なので元サイズに戻せる)。
pub fn preprocess_for_movenet(frame: &Mat) -> Result<Array4<f32>> {
    if frame.empty() {
        bail!("empty frame");
    }
    if frame.channels() != 3 || frame.depth() != CV_8U {
        bail!("expected 8-bit BGR frame (channels={}, depth={})", frame.channels(), frame.depth());
    }

    let mut resized = Mat::default();
    imgproc::resize(
        frame,
        &mut resized,
        Size::new(INPUT_SIZE, INPUT_SIZE),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let mut rgb = Mat::default();
    imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;

    let side = INPUT_SIZE as usize;
    let values: Vec<f32> = rgb.data_bytes()?.iter().map(|&v| v as f32).collect();
    if values.len() != side * side * 3 {
        bail!("unexpected tensor length {}", values.len());
    }
    Ok(Array4::from_shape_vec((1, side, side, 3), values)?)
}
