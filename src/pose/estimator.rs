use anyhow::Result;
use std::future::Future;

use super::keypoint::Pose;

/// 推論オプション
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EstimateOptions {
    /// 入力フレームを左右反転したものとして座標を返す
    pub flip_horizontal: bool,
}

/// フレームから姿勢リストを返す推論器
///
/// 初期化済みのインスタンスを全ティックで使い回す。
pub trait PoseEstimator {
    type Frame;

    fn estimate(
        &mut self,
        frame: &Self::Frame,
        options: EstimateOptions,
    ) -> impl Future<Output = Result<Vec<Pose>>>;
}

/// 推論器の一回限りの非同期初期化 (モデル読み込み)
pub trait EstimatorLoader {
    type Estimator: PoseEstimator;

    fn load(&self) -> impl Future<Output = Result<Self::Estimator>>;
}

/// 水平反転: x → width - x
pub fn flip_pose_horizontal(pose: &mut Pose, width: f32) {
    for kp in pose.keypoints.iter_mut() {
        kp.x = width - kp.x;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Keypoint, KeypointIndex};

    #[test]
    fn test_flip_pose_horizontal() {
        let mut pose = Pose::new([Keypoint::new(100.0, 50.0, 0.9); KeypointIndex::COUNT]);
        flip_pose_horizontal(&mut pose, 640.0);
        assert_eq!(pose.get(KeypointIndex::Nose).x, 540.0);
        assert_eq!(pose.get(KeypointIndex::Nose).y, 50.0);
    }
}
