use crate::pose::Pose;

/// 全姿勢の全キーポイントが閾値以上なら true。姿勢が無ければ true
pub fn all_visible(poses: &[Pose], threshold: f32) -> bool {
    poses.iter().all(|pose| pose.all_valid(threshold))
}
