//! ジャンプ計測: 開始猶予の後、腰の高さ (左右の腰の平均Y) を集める

use std::time::Duration;
use tokio::time::Instant;

use crate::pose::{KeypointIndex, Pose};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementPhase {
    Idle,
    /// 指定時刻に計測開始
    Armed(Instant),
    Measuring,
}

#[derive(Debug, Clone)]
pub struct JumpMeasurement {
    start_delay: Duration,
    phase: MeasurementPhase,
    hip_positions: Vec<f32>,
}

impl JumpMeasurement {
    pub fn new(start_delay: Duration) -> Self {
        Self {
            start_delay,
            phase: MeasurementPhase::Idle,
            hip_positions: Vec::new(),
        }
    }

    pub fn phase(&self) -> MeasurementPhase {
        self.phase
    }

    /// 猶予後に計測を始める
    pub fn arm(&mut self, now: Instant) {
        crate::log!(
            "[measure] measurement will start in {:.1}s...",
            self.start_delay.as_secs_f32()
        );
        self.phase = MeasurementPhase::Armed(now + self.start_delay);
    }

    /// 計測を開始したティックなら true
    pub fn observe(&mut self, poses: &[Pose], now: Instant) -> bool {
        let mut started = false;
        if let MeasurementPhase::Armed(start_at) = self.phase {
            if now < start_at {
                return false;
            }
            self.phase = MeasurementPhase::Measuring;
            self.hip_positions.clear();
            crate::log!("[measure] measurement started");
            started = true;
        }

        if self.phase == MeasurementPhase::Measuring {
            if let Some(pose) = poses.first() {
                let left = pose.get(KeypointIndex::LeftHip);
                let right = pose.get(KeypointIndex::RightHip);
                self.hip_positions.push((left.y + right.y) / 2.0);
            }
        }
        started
    }

    pub fn hip_positions(&self) -> &[f32] {
        &self.hip_positions
    }

    pub fn sample_count(&self) -> usize {
        self.hip_positions.len()
    }

    /// 平均の腰の高さ (ピクセルY)
    pub fn average_hip_y(&self) -> Option<f32> {
        if self.hip_positions.is_empty() {
            return None;
        }
        Some(self.hip_positions.iter().sum::<f32>() / self.hip_positions.len() as f32)
    }

    /// 最も高い位置 (Yの最小値)
    pub fn highest_hip_y(&self) -> Option<f32> {
        self.hip_positions.iter().copied().reduce(f32::min)
    }
}

impl Default for JumpMeasurement {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000))
    }
}
