use crate::config::OverlayConfig;
use crate::pose::{Keypoint, Pose};
use crate::render::canvas::{Canvas, Color, Point};
use crate::render::chart::{draw_series, ChartArea, LandmarkSeries, SERIES_COLOR};
use crate::render::marks::ReferenceMarks;
use crate::render::skeleton::{
    KEYPOINT_COLOR, KEYPOINT_OUTLINE_COLOR, KEYPOINT_RADIUS, LINE_WIDTH, SKELETON_COLOR,
    SKELETON_CONNECTIONS,
};

/// 可視インジケータの位置と半径
const INDICATOR_CENTER: Point = Point::new(30.0, 30.0);
const INDICATOR_RADIUS: f32 = 15.0;

/// オーバーレイ描画の設定
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayOptions {
    pub min_confidence: f32,
    pub position_scale: f32,
    pub size_scale: f32,
    pub marks: ReferenceMarks,
    pub indicator: bool,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self::from_config(&OverlayConfig::default())
    }
}

impl OverlayOptions {
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self {
            min_confidence: config.keypoint_threshold,
            position_scale: config.position_scale,
            size_scale: config.size_scale,
            marks: config.reference_marks,
            indicator: config.indicator,
        }
    }
}

/// 1フレーム分の描画入力
#[derive(Debug, Clone, Copy)]
pub struct OverlayFrame<'a> {
    pub poses: &'a [Pose],
    pub draw_skeleton: bool,
    /// 全身可視フラグ。None ならインジケータを描かない
    pub visible: Option<bool>,
    pub series: Option<&'a LandmarkSeries>,
}

/// 姿勢をキャンバスに描画する
#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    options: OverlayOptions,
}

impl OverlayRenderer {
    pub fn new(options: OverlayOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }

    pub fn set_marks(&mut self, marks: ReferenceMarks) {
        self.options.marks = marks;
    }

    /// 毎回全面クリアしてから描き直す
    pub fn render<C: Canvas + ?Sized>(&self, canvas: &mut C, frame: OverlayFrame<'_>) {
        canvas.clear();

        if frame.draw_skeleton {
            for pose in frame.poses {
                self.draw_keypoints(canvas, pose);
                self.draw_skeleton_lines(canvas, pose);
            }
        }

        self.options.marks.draw(canvas);

        if let Some(series) = frame.series {
            let (w, h) = canvas.size();
            draw_series(canvas, series, ChartArea::bottom_strip(w, h), SERIES_COLOR);
        }

        if self.options.indicator {
            if let Some(visible) = frame.visible {
                draw_indicator(canvas, visible);
            }
        }
    }

    fn scaled(&self, kp: &Keypoint) -> Point {
        Point::new(kp.x * self.options.position_scale, kp.y * self.options.position_scale)
    }

    /// 閾値を超えるキーポイントに塗り+縁取りの円を描く
    pub fn draw_keypoints<C: Canvas + ?Sized>(&self, canvas: &mut C, pose: &Pose) {
        let radius = KEYPOINT_RADIUS * self.options.size_scale;
        let width = LINE_WIDTH * self.options.size_scale;

        for kp in pose.keypoints.iter().filter(|kp| kp.exceeds(self.options.min_confidence)) {
            let center = self.scaled(kp);
            canvas.fill_circle(center, radius, KEYPOINT_COLOR);
            canvas.stroke_circle(center, radius, KEYPOINT_OUTLINE_COLOR, width);
        }
    }

    /// 両端が閾値を超える接続だけ線を引く
    pub fn draw_skeleton_lines<C: Canvas + ?Sized>(&self, canvas: &mut C, pose: &Pose) {
        let width = LINE_WIDTH * self.options.size_scale;

        for (start_idx, end_idx) in SKELETON_CONNECTIONS.iter() {
            let start = pose.get(*start_idx);
            let end = pose.get(*end_idx);

            if start.exceeds(self.options.min_confidence) && end.exceeds(self.options.min_confidence) {
                canvas.line(self.scaled(start), self.scaled(end), SKELETON_COLOR, width);
            }
        }
    }
}

/// 左上の丸: 全身可視なら緑、そうでなければ赤
pub fn draw_indicator<C: Canvas + ?Sized>(canvas: &mut C, visible: bool) {
    let color: Color = if visible { Color::GREEN } else { Color::RED };
    canvas.fill_circle(INDICATOR_CENTER, INDICATOR_RADIUS, color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{KeypointIndex, Keypoint};
    use crate::render::canvas::recording::{DrawCommand, RecordingCanvas};
    use crate::render::FrameBuffer;

    fn pose_with_score(score: f32) -> Pose {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        for (i, kp) in keypoints.iter_mut().enumerate() {
            *kp = Keypoint::new(20.0 + i as f32 * 10.0, 40.0 + i as f32 * 5.0, score);
        }
        Pose::new(keypoints)
    }

    fn frame(poses: &[Pose], draw_skeleton: bool, visible: Option<bool>) -> OverlayFrame<'_> {
        OverlayFrame { poses, draw_skeleton, visible, series: None }
    }

    #[test]
    fn test_render_starts_with_clear() {
        let mut canvas = RecordingCanvas::new(640, 480);
        let poses = [pose_with_score(0.9)];
        OverlayRenderer::default().render(&mut canvas, frame(&poses, true, None));
        assert_eq!(canvas.commands[0], DrawCommand::Clear);
    }

    #[test]
    fn test_skeleton_disabled_draws_no_markers_or_lines() {
        let mut canvas = RecordingCanvas::new(640, 480);
        let poses = [pose_with_score(0.9)];
        let renderer = OverlayRenderer::new(OverlayOptions {
            marks: ReferenceMarks::Flexibility,
            ..OverlayOptions::default()
        });
        renderer.render(&mut canvas, frame(&poses, false, Some(true)));

        assert_eq!(canvas.fills_with(KEYPOINT_COLOR), 0);
        // 基準マークとインジケータは描かれる
        assert_eq!(canvas.lines(), 4);
        assert_eq!(canvas.fills_with(Color::GREEN), 1);
    }

    #[test]
    fn test_all_confident_draws_every_marker_and_edge() {
        let mut canvas = RecordingCanvas::new(640, 480);
        let poses = [pose_with_score(0.9)];
        OverlayRenderer::default().render(&mut canvas, frame(&poses, true, None));
        assert_eq!(canvas.fills_with(KEYPOINT_COLOR), 17);
        assert_eq!(canvas.lines(), 18);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut canvas = RecordingCanvas::new(640, 480);
        let poses = [pose_with_score(0.5)];
        OverlayRenderer::default().render(&mut canvas, frame(&poses, true, None));
        assert_eq!(canvas.fills_with(KEYPOINT_COLOR), 0);
        assert_eq!(canvas.lines(), 0);
    }

    #[test]
    fn test_edge_omitted_through_low_confidence_joint() {
        let mut pose = pose_with_score(0.9);
        pose.keypoints[KeypointIndex::LeftElbow as usize].score = 0.2;

        let mut canvas = RecordingCanvas::new(640, 480);
        OverlayRenderer::default().render(&mut canvas, frame(&[pose], true, None));

        // 左肩-左肘 と 左肘-左手首 が消える
        assert_eq!(canvas.lines(), 16);
        assert_eq!(canvas.fills_with(KEYPOINT_COLOR), 16);
    }

    #[test]
    fn test_scales_apply_to_position_and_size() {
        let mut pose = pose_with_score(0.0);
        pose.keypoints[0] = Keypoint::new(100.0, 50.0, 0.9);

        let renderer = OverlayRenderer::new(OverlayOptions {
            position_scale: 0.5,
            size_scale: 2.0,
            ..OverlayOptions::default()
        });
        let mut canvas = RecordingCanvas::new(640, 480);
        renderer.render(&mut canvas, frame(&[pose], true, None));

        assert_eq!(
            canvas.commands[1],
            DrawCommand::FillCircle {
                center: Point::new(50.0, 25.0),
                radius: 8.0,
                color: KEYPOINT_COLOR,
            }
        );
    }

    #[test]
    fn test_indicator_color() {
        let mut canvas = RecordingCanvas::new(640, 480);
        OverlayRenderer::default().render(&mut canvas, frame(&[], false, Some(false)));
        assert_eq!(canvas.fills_with(Color::RED), 1);

        let renderer = OverlayRenderer::new(OverlayOptions {
            indicator: false,
            ..OverlayOptions::default()
        });
        renderer.render(&mut canvas, frame(&[], false, Some(false)));
        assert_eq!(canvas.fills_with(Color::RED), 0);
    }

    #[test]
    fn test_render_is_idempotent() {
        let poses = [pose_with_score(0.9), pose_with_score(0.7)];
        let renderer = OverlayRenderer::new(OverlayOptions {
            marks: ReferenceMarks::Jump,
            ..OverlayOptions::default()
        });
        let mut fb = FrameBuffer::new(320, 240);

        renderer.render(&mut fb, frame(&poses, true, Some(true)));
        let first = fb.pixels().to_vec();
        renderer.render(&mut fb, frame(&poses, true, Some(true)));
        assert_eq!(fb.pixels(), first.as_slice());
    }

    #[test]
    fn test_render_survives_non_finite_and_far_keypoints() {
        let mut pose = pose_with_score(0.9);
        pose.keypoints[KeypointIndex::Nose as usize].x = f32::INFINITY;
        pose.keypoints[KeypointIndex::LeftEye as usize].y = f32::NAN;
        pose.keypoints[KeypointIndex::RightAnkle as usize].x = 2.0e7;

        let mut fb = FrameBuffer::new(64, 64);
        let started = std::time::Instant::now();
        OverlayRenderer::default().render(&mut fb, frame(&[pose], true, Some(true)));
        assert!(started.elapsed() < std::time::Duration::from_secs(2));

        // 画面内の右目 (40, 50) は描かれる
        assert_eq!(fb.pixel(40, 50).map(|c| c.a), Some(255));
    }
}
