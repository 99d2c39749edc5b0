use std::collections::HashSet;

use crate::render::canvas::{Canvas, Color, Point};

/// メモリ上のARGBピクセルバッファ
///
/// 描画はすべて source-over のアルファ合成。クリア後は全ピクセル透明(0)。
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buffer: vec![0u32; width as usize * height as usize],
            width: width as usize,
            height: height as usize,
        }
    }

    pub fn pixels(&self) -> &[u32] {
        &self.buffer
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            Some(Color::from_argb(self.buffer[y * self.width + x]))
        } else {
            None
        }
    }

    /// 不透明でないピクセルが一つも無いか
    pub fn is_blank(&self) -> bool {
        self.buffer.iter().all(|&p| p >> 24 == 0)
    }

    /// 被覆したピクセルをそれぞれ一度だけ合成する
    fn blend_covered(&mut self, covered: HashSet<usize>, color: Color) {
        if color.a == 0 {
            return;
        }
        for idx in covered {
            self.buffer[idx] = blend(Color::from_argb(self.buffer[idx]), color).to_argb();
        }
    }

    fn cover_pixel(&self, x: i64, y: i64, covered: &mut HashSet<usize>) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            covered.insert(y as usize * self.width + x as usize);
        }
    }

    /// 整数座標の塗りつぶし円。走査はキャンバス内に限る
    fn cover_disc(&self, cx: i64, cy: i64, radius: i64, covered: &mut HashSet<usize>) {
        if radius < 0 || self.width == 0 || self.height == 0 {
            return;
        }
        let y_min = cy.saturating_sub(radius).max(0);
        let y_max = cy.saturating_add(radius).min(self.height as i64 - 1);
        let x_min = cx.saturating_sub(radius).max(0);
        let x_max = cx.saturating_add(radius).min(self.width as i64 - 1);
        let r2 = radius as f64 * radius as f64;
        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let (dx, dy) = (x as f64 - cx as f64, y as f64 - cy as f64);
                if dx * dx + dy * dy <= r2 {
                    covered.insert(y as usize * self.width + x as usize);
                }
            }
        }
    }

    /// 線分をキャンバス (+スタンプ半径) に切り詰めてから Bresenham で走査する。
    /// 太さ2以上は円をスタンプする
    fn cover_segment(&self, from: Point, to: Point, width: f32, covered: &mut HashSet<usize>) {
        if !is_finite(from) || !is_finite(to) || !width.is_finite() || self.width == 0 || self.height == 0 {
            return;
        }
        let stamp = (width / 2.0).round().clamp(0.0, (self.width + self.height) as f32) as i64;
        let margin = stamp as f64;
        let rect = ClipRect {
            x_min: -margin,
            y_min: -margin,
            x_max: (self.width - 1) as f64 + margin,
            y_max: (self.height - 1) as f64 + margin,
        };
        let Some((p0, p1)) = clip_segment(
            (from.x as f64, from.y as f64),
            (to.x as f64, to.y as f64),
            &rect,
        ) else {
            return;
        };

        let (x0, y0) = (p0.0.round() as i64, p0.1.round() as i64);
        let (x1, y1) = (p1.0.round() as i64, p1.1.round() as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let (mut x, mut y) = (x0, y0);
        loop {
            if stamp == 0 {
                self.cover_pixel(x, y, covered);
            } else {
                self.cover_disc(x, y, stamp, covered);
            }

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }
}

fn is_finite(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// 円弧の分割数の上限
const MAX_ARC_STEPS: usize = 4096;

struct ClipRect {
    x_min: f64,
    y_min: f64,
    x_max: f64,
    y_max: f64,
}

const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const TOP: u8 = 4;
const BOTTOM: u8 = 8;

fn outcode((x, y): (f64, f64), rect: &ClipRect) -> u8 {
    let mut code = 0;
    if x < rect.x_min {
        code |= LEFT;
    } else if x > rect.x_max {
        code |= RIGHT;
    }
    if y < rect.y_min {
        code |= TOP;
    } else if y > rect.y_max {
        code |= BOTTOM;
    }
    code
}

/// Cohen–Sutherland。矩形と交わらなければ None
fn clip_segment(
    mut p0: (f64, f64),
    mut p1: (f64, f64),
    rect: &ClipRect,
) -> Option<((f64, f64), (f64, f64))> {
    // 各端点は高々2辺で切られる (丸め誤差の分だけ余裕を持たせる)
    for _ in 0..8 {
        let (c0, c1) = (outcode(p0, rect), outcode(p1, rect));
        if c0 | c1 == 0 {
            return Some((p0, p1));
        }
        if c0 & c1 != 0 {
            return None;
        }

        let code = if c0 != 0 { c0 } else { c1 };
        let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
        let clipped = if code & TOP != 0 {
            (p0.0 + dx * (rect.y_min - p0.1) / dy, rect.y_min)
        } else if code & BOTTOM != 0 {
            (p0.0 + dx * (rect.y_max - p0.1) / dy, rect.y_max)
        } else if code & RIGHT != 0 {
            (rect.x_max, p0.1 + dy * (rect.x_max - p0.0) / dx)
        } else {
            (rect.x_min, p0.1 + dy * (rect.x_min - p0.0) / dx)
        };

        if code == c0 {
            p0 = clipped;
        } else {
            p1 = clipped;
        }
    }

    (outcode(p0, rect) | outcode(p1, rect) == 0).then_some((p0, p1))
}

fn blend(dst: Color, src: Color) -> Color {
    if src.a == 255 {
        return src;
    }
    let sa = src.a as f32 / 255.0;
    let da = dst.a as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return Color::TRANSPARENT;
    }
    let channel = |s: u8, d: u8| -> u8 {
        ((s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a).round() as u8
    };
    Color::rgba(
        channel(src.r, dst.r),
        channel(src.g, dst.g),
        channel(src.b, dst.b),
        (out_a * 255.0).round() as u8,
    )
}

impl Canvas for FrameBuffer {
    fn size(&self) -> (u32, u32) {
        (self.width as u32, self.height as u32)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width as usize;
        self.height = height as usize;
        self.buffer = vec![0u32; self.width * self.height];
    }

    fn clear(&mut self) {
        self.buffer.fill(0);
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Color) {
        if !is_finite(center) || !radius.is_finite() {
            return;
        }
        let mut covered = HashSet::new();
        self.cover_disc(
            center.x.round() as i64,
            center.y.round() as i64,
            radius.round() as i64,
            &mut covered,
        );
        self.blend_covered(covered, color);
    }

    fn stroke_arc(&mut self, center: Point, radius: f32, start: f32, end: f32, color: Color, width: f32) {
        if !is_finite(center) || !radius.is_finite() || !start.is_finite() || !end.is_finite() {
            return;
        }
        // 外接矩形がキャンバス外なら何もしない
        let reach = radius.abs() + width.abs();
        if center.x + reach < 0.0
            || center.y + reach < 0.0
            || center.x - reach > self.width as f32
            || center.y - reach > self.height as f32
        {
            return;
        }

        // 1px 程度の間隔で円周上の点を結ぶ
        let sweep = end - start;
        let steps = ((sweep.abs() * radius.abs().max(1.0)).ceil() as usize).clamp(1, MAX_ARC_STEPS);
        let mut covered = HashSet::new();
        let mut prev = Point::new(center.x + radius * start.cos(), center.y + radius * start.sin());
        for i in 1..=steps {
            let angle = start + sweep * i as f32 / steps as f32;
            let next = Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin());
            self.cover_segment(prev, next, width, &mut covered);
            prev = next;
        }
        self.blend_covered(covered, color);
    }

    fn line(&mut self, from: Point, to: Point, color: Color, width: f32) {
        let mut covered = HashSet::new();
        self.cover_segment(from, to, width, &mut covered);
        self.blend_covered(covered, color);
    }
}
