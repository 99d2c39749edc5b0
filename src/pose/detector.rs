use anyhow::{anyhow, Context, Result};
use ndarray::Array4;
use opencv::core::Mat;
use opencv::prelude::*;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::estimator::{flip_pose_horizontal, EstimateOptions, EstimatorLoader, PoseEstimator};
use super::keypoint::{Keypoint, KeypointIndex, Pose};
use super::preprocess::preprocess_for_movenet;

/// MoveNet SinglePose の ONNX セッション
///
/// 入出力名はモデルから読む。出力は [1, 1, 17, 3] の (y, x, score)。
pub struct PoseDetector {
    session: Session,
    input_name: String,
    output_name: String,
}

impl PoseDetector {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(path)
            .with_context(|| format!("failed to load ONNX model {}", path.display()))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .context("model has no inputs")?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .context("model has no outputs")?;
        crate::verbose!("[model] {} input={} output={}", path.display(), input_name, output_name);

        Ok(Self {
            session,
            input_name,
            output_name,
        })
    }

    /// 正規化座標 (0.0-1.0) の姿勢を返す
    pub fn detect(&mut self, input: Array4<f32>) -> Result<Pose> {
        let input = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input])
            .context("inference failed")?;

        let output: ndarray::ArrayViewD<f32> = outputs[self.output_name.as_str()]
            .try_extract_array()
            .context("failed to extract output tensor")?;
        let rows = output
            .into_shape_with_order((KeypointIndex::COUNT, 3))
            .context("unexpected MoveNet output shape")?;

        Ok(Pose::new(std::array::from_fn(|i| {
            Keypoint::new(rows[[i, 1]], rows[[i, 0]], rows[[i, 2]])
        })))
    }
}

/// 正規化座標をフレームのピクセル座標に変換
pub fn to_frame_pixels(pose: &mut Pose, width: f32, height: f32) {
    for kp in pose.keypoints.iter_mut() {
        kp.x *= width;
        kp.y *= height;
    }
}

/// OpenCVフレームを受け取る MoveNet 推論器
///
/// 推論本体は blocking スレッドで実行する。
pub struct MoveNetEstimator {
    detector: Arc<Mutex<PoseDetector>>,
}

impl MoveNetEstimator {
    pub fn new(detector: PoseDetector) -> Self {
        Self {
            detector: Arc::new(Mutex::new(detector)),
        }
    }
}

impl PoseEstimator for MoveNetEstimator {
    type Frame = Mat;

    fn estimate(&mut self, frame: &Mat, options: EstimateOptions) -> impl Future<Output = Result<Vec<Pose>>> {
        let detector = Arc::clone(&self.detector);
        let frame = frame.clone();

        async move {
            tokio::task::spawn_blocking(move || -> Result<Vec<Pose>> {
                let width = frame.cols() as f32;
                let height = frame.rows() as f32;
                let input = preprocess_for_movenet(&frame)?;

                let mut detector = detector
                    .lock()
                    .map_err(|_| anyhow!("detector lock poisoned"))?;
                let mut pose = detector.detect(input)?;

                to_frame_pixels(&mut pose, width, height);
                if options.flip_horizontal {
                    flip_pose_horizontal(&mut pose, width);
                }
                // シングルポーズモデルなので常に1人
                Ok(vec![pose])
            })
            .await
            .context("inference task failed")?
        }
    }
}

/// モデルファイルから MoveNetEstimator を作る
pub struct MoveNetLoader {
    model_path: PathBuf,
}

impl MoveNetLoader {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }
}

impl EstimatorLoader for MoveNetLoader {
    type Estimator = MoveNetEstimator;

    fn load(&self) -> impl Future<Output = Result<MoveNetEstimator>> {
        let path = self.model_path.clone();

        async move {
            if !path.exists() {
                anyhow::bail!("model file not found: {}", path.display());
            }
            let detector = tokio::task::spawn_blocking(move || PoseDetector::new(path))
                .await
                .context("model loading task failed")??;
            Ok(MoveNetEstimator::new(detector))
        }
    }
}
