use std::f32::consts::TAU;

/// RGBA色 (a: 0〜255)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 128, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// 0.0〜1.0 の不透明度から生成
    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    /// 0xAARRGGBB
    pub fn to_argb(self) -> u32 {
        (self.a as u32) << 24 | (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    pub fn from_argb(v: u32) -> Self {
        Self {
            a: (v >> 24) as u8,
            r: (v >> 16) as u8,
            g: (v >> 8) as u8,
            b: v as u8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 描画先。角度はラジアン、y軸は下向き
pub trait Canvas {
    fn size(&self) -> (u32, u32);

    /// サイズ変更 (内容は消える)
    fn resize(&mut self, width: u32, height: u32);

    /// 全面を透明に戻す
    fn clear(&mut self);

    fn fill_circle(&mut self, center: Point, radius: f32, color: Color);

    fn stroke_arc(&mut self, center: Point, radius: f32, start: f32, end: f32, color: Color, width: f32);

    fn line(&mut self, from: Point, to: Point, color: Color, width: f32);

    fn stroke_circle(&mut self, center: Point, radius: f32, color: Color, width: f32) {
        self.stroke_arc(center, radius, 0.0, TAU, color, width);
    }

    /// 折れ線
    fn polyline(&mut self, points: &[Point], color: Color, width: f32) {
        for pair in points.windows(2) {
            self.line(pair[0], pair[1], color, width);
        }
    }
}
