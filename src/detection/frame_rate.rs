use std::time::Duration;
use tokio::time::Instant;

/// 集計窓の長さ
pub const WINDOW: Duration = Duration::from_millis(1000);

/// 1秒窓で数えるティック数カウンタ
///
/// 表示値は直前の窓で数えた値 (1窓遅れ)。窓を閉じたティック自身は数えない。
#[derive(Debug, Clone)]
pub struct FrameRateCounter {
    frame_count: u32,
    window_start: Instant,
    rate: u32,
}

impl FrameRateCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            frame_count: 0,
            window_start: now,
            rate: 0,
        }
    }

    /// ティックを記録し、窓が閉じたら新しい表示値を返す
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= WINDOW {
            self.rate = self.frame_count;
            self.frame_count = 0;
            self.window_start = now;
            Some(self.rate)
        } else {
            self.frame_count += 1;
            None
        }
    }

    /// 現在の表示値
    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn reset(&mut self, now: Instant) {
        self.frame_count = 0;
        self.window_start = now;
    }
}
