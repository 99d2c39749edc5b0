use serde::Deserialize;
use std::f32::consts::{FRAC_PI_2, PI};

use crate::render::canvas::{Canvas, Color, Point};

/// 姿勢に依存しない固定の基準マーク
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceMarks {
    #[default]
    None,
    /// 柔軟性計測: 足位置のL字ガイドと頭の円
    Flexibility,
    /// ジャンプ計測: 身長比から足幅を決めるガイド
    Jump,
}

const MARK_STROKE: Color = Color::rgba(255, 0, 0, 128);
const JUMP_HEAD_FILL: Color = Color::rgba(255, 0, 0, 51);
const HEAD_RADIUS: f32 = 20.0;
const CORNER_RADIUS: f32 = 20.0;
const FOOT_LENGTH: f32 = 30.0;

impl ReferenceMarks {
    pub fn is_enabled(self) -> bool {
        self != Self::None
    }

    /// 切り替え順: なし → 柔軟性 → ジャンプ → なし
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Flexibility,
            Self::Flexibility => Self::Jump,
            Self::Jump => Self::None,
        }
    }

    /// キャンバスの比率に合わせてマークを描画
    pub fn draw<C: Canvas + ?Sized>(self, canvas: &mut C) {
        let (w, h) = canvas.size();
        let (w, h) = (w as f32, h as f32);

        match self {
            Self::None => {}
            Self::Flexibility => {
                let head = Point::new(w / 2.0, h * 0.2);
                canvas.stroke_circle(head, HEAD_RADIUS, MARK_STROKE, 1.0);
                draw_foot_guide(canvas, w * 0.4, h * 0.8, h * 0.93, 1.0);
                draw_foot_guide(canvas, w * 0.6, h * 0.8, h * 0.93, -1.0);
            }
            Self::Jump => {
                let head = Point::new(w / 2.0, h * 0.1);
                canvas.fill_circle(head, HEAD_RADIUS, JUMP_HEAD_FILL);
                canvas.stroke_circle(head, HEAD_RADIUS, MARK_STROKE, 1.0);

                let head_to_ankle = h * 0.93 - (head.y + HEAD_RADIUS);
                let separation = head_to_ankle / 2.5;
                draw_foot_guide(canvas, w / 2.0 - separation / 2.0, h * 0.8, h * 0.94, 1.0);
                draw_foot_guide(canvas, w / 2.0 + separation / 2.0, h * 0.8, h * 0.94, -1.0);
            }
        }
    }
}

/// 角の丸いL字。direction = 1.0 でつま先が右、-1.0 で左
fn draw_foot_guide<C: Canvas + ?Sized>(canvas: &mut C, x: f32, top: f32, bottom: f32, direction: f32) {
    let corner_y = bottom - CORNER_RADIUS;
    canvas.line(Point::new(x, top), Point::new(x, corner_y), MARK_STROKE, 1.0);

    let center = Point::new(x + direction * CORNER_RADIUS, corner_y);
    let start = if direction > 0.0 { PI } else { 0.0 };
    canvas.stroke_arc(center, CORNER_RADIUS, start, FRAC_PI_2, MARK_STROKE, 1.0);

    canvas.line(
        Point::new(x + direction * CORNER_RADIUS, bottom),
        Point::new(x + direction * FOOT_LENGTH, bottom),
        MARK_STROKE,
        1.0,
    );
}
