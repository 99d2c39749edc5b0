use std::collections::VecDeque;

use crate::render::canvas::{Canvas, Color, Point};

/// チャートに保持するサンプル数
pub const SERIES_CAPACITY: usize = 50;

pub const SERIES_COLOR: Color = Color::rgb(75, 192, 192);

/// 1つの座標値の時系列 (古いものから捨てる)
#[derive(Debug, Clone)]
pub struct LandmarkSeries {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl LandmarkSeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// (最小, 最大)
    pub fn range(&self) -> Option<(f32, f32)> {
        let mut iter = self.iter();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}

impl Default for LandmarkSeries {
    fn default() -> Self {
        Self::new(SERIES_CAPACITY)
    }
}

/// 描画領域
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartArea {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl ChartArea {
    /// キャンバス下部の帯 (高さ20%)
    pub fn bottom_strip(canvas_width: u32, canvas_height: u32) -> Self {
        let height = canvas_height as f32 * 0.2;
        Self {
            x: 0.0,
            y: canvas_height as f32 - height,
            width: canvas_width as f32,
            height,
        }
    }
}

/// 時系列を min/max で正規化して折れ線で描く。値が大きいほど上
pub fn draw_series<C: Canvas + ?Sized>(canvas: &mut C, series: &LandmarkSeries, area: ChartArea, color: Color) {
    let Some((lo, hi)) = series.range() else {
        return;
    };
    let span = if hi > lo { hi - lo } else { 1.0 };
    let step = if series.capacity > 1 {
        area.width / (series.capacity - 1) as f32
    } else {
        0.0
    };

    let points: Vec<Point> = series
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let t = (v - lo) / span;
            Point::new(area.x + i as f32 * step, area.y + area.height * (1.0 - t))
        })
        .collect();

    if points.len() == 1 {
        canvas.fill_circle(points[0], 1.0, color);
    } else {
        canvas.polyline(&points, color, 1.0);
    }
}
