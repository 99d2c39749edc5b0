use crate::pose::KeypointIndex;
use crate::render::canvas::Color;

/// 骨格の接続定義 (開始キーポイント, 終了キーポイント)
pub const SKELETON_CONNECTIONS: [(KeypointIndex, KeypointIndex); 18] = [
    // 顔
    (KeypointIndex::Nose, KeypointIndex::LeftEye),
    (KeypointIndex::Nose, KeypointIndex::RightEye),
    (KeypointIndex::LeftEye, KeypointIndex::LeftEar),
    (KeypointIndex::RightEye, KeypointIndex::RightEar),
    // 上半身
    (KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder),
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftElbow),
    (KeypointIndex::LeftElbow, KeypointIndex::LeftWrist),
    (KeypointIndex::RightShoulder, KeypointIndex::RightElbow),
    (KeypointIndex::RightElbow, KeypointIndex::RightWrist),
    (KeypointIndex::Nose, KeypointIndex::LeftShoulder),
    (KeypointIndex::Nose, KeypointIndex::RightShoulder),
    // 下半身
    (KeypointIndex::LeftHip, KeypointIndex::RightHip),
    (KeypointIndex::LeftHip, KeypointIndex::LeftKnee),
    (KeypointIndex::LeftKnee, KeypointIndex::LeftAnkle),
    (KeypointIndex::RightHip, KeypointIndex::RightKnee),
    (KeypointIndex::RightKnee, KeypointIndex::RightAnkle),
    // 胴体
    (KeypointIndex::LeftShoulder, KeypointIndex::LeftHip),
    (KeypointIndex::RightShoulder, KeypointIndex::RightHip),
];

/// キーポイントの色
pub const KEYPOINT_COLOR: Color = Color::rgb(30, 185, 128);

/// キーポイント外周の色
pub const KEYPOINT_OUTLINE_COLOR: Color = Color::rgb(255, 104, 89);

/// 骨格線の色
pub const SKELETON_COLOR: Color = Color::rgb(30, 185, 128);

/// キーポイント半径 (size_scale = 1 のとき)
pub const KEYPOINT_RADIUS: f32 = 4.0;

/// 線幅 (size_scale = 1 のとき)
pub const LINE_WIDTH: f32 = 2.0;
