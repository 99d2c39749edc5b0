use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::camera::{FrameSource, FrameStatus};
use crate::config::Config;
use crate::detection::frame_rate::FrameRateCounter;
use crate::detection::state::{ModelStatus, ViewerState};
use crate::detection::visibility::all_visible;
use crate::error::{PoseError, Result};
use crate::history::HistoryBuffer;
use crate::measurement::JumpMeasurement;
use crate::pose::{EstimateOptions, EstimatorLoader, KeypointIndex, Pose, PoseEstimator};
use crate::render::{Canvas, LandmarkSeries, OverlayFrame, OverlayOptions, OverlayRenderer, ReferenceMarks};

/// 検出ループの設定
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub visibility_threshold: f32,
    pub record_history: bool,
    pub estimate: EstimateOptions,
    pub overlay: OverlayOptions,
    pub measurement_delay: Duration,
    pub reset_history_on_measure: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl LoopConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            visibility_threshold: config.detection.visibility_threshold,
            record_history: config.detection.record_history,
            estimate: EstimateOptions {
                flip_horizontal: config.detection.flip_horizontal,
            },
            overlay: OverlayOptions::from_config(&config.overlay),
            measurement_delay: config.measurement.start_delay(),
            reset_history_on_measure: config.measurement.reset_history,
        }
    }
}

/// ループの駆動方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// 固定周期 (カメラ)。キャンセルされるまで続く
    Interval(Duration),
    /// 表示フレーム相当の周期 (動画)。一時停止・終端で自然終了する
    FramePaced(Duration),
}

impl LoopMode {
    pub fn period(self) -> Duration {
        match self {
            Self::Interval(period) | Self::FramePaced(period) => period,
        }
    }

    fn stops_with_source(self) -> bool {
        matches!(self, Self::FramePaced(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// start() 前、または stop() 後
    Inactive,
    /// モデル未初期化
    ModelNotReady,
    /// フレーム未到着
    FramePending,
}

/// 1ティックの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Skipped(SkipReason),
    /// 供給元が一時停止・終端
    SourceStopped,
    /// 推論中にキャンセルされ、結果は捨てた
    Cancelled,
    Completed {
        poses: usize,
        visible: bool,
        recorded: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopReason {
    #[default]
    Cancelled,
    SourceStopped,
    Inactive,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// 推論まで完了したティック数
    pub ticks: usize,
    /// 履歴に記録したティック数
    pub recorded_ticks: usize,
    /// 推論・読み出しに失敗して飛ばしたティック数
    pub failures: usize,
    pub reason: StopReason,
}

/// フレーム取得 → 推論 → 解析 → 記録 → 描画 を回すループ
///
/// tick() は `&mut self` を取るので推論が重なることはない。
/// キャンバス・履歴・計測はこのループだけが書き換える。
pub struct DetectionLoop<E: PoseEstimator, C: Canvas> {
    config: LoopConfig,
    estimator: Option<E>,
    renderer: OverlayRenderer,
    canvas: C,
    frame_rate: FrameRateCounter,
    history: HistoryBuffer,
    measurement: JumpMeasurement,
    series: LandmarkSeries,
    token: CancellationToken,
    active: bool,
    last_frame: Option<E::Frame>,
    last_poses: Vec<Pose>,
}

impl<E: PoseEstimator, C: Canvas> DetectionLoop<E, C> {
    pub fn new(config: LoopConfig, canvas: C) -> Self {
        let renderer = OverlayRenderer::new(config.overlay.clone());
        let measurement = JumpMeasurement::new(config.measurement_delay);
        Self {
            config,
            estimator: None,
            renderer,
            canvas,
            frame_rate: FrameRateCounter::new(Instant::now()),
            history: HistoryBuffer::new(),
            measurement,
            series: LandmarkSeries::default(),
            token: CancellationToken::new(),
            active: false,
            last_frame: None,
            last_poses: Vec::new(),
        }
    }

    /// 初期化済みの推論器を差し込む
    pub fn with_estimator(mut self, estimator: E) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// モデルを読み込む。失敗しても再度呼べる
    pub async fn initialize<L>(&mut self, loader: &L, state: &mut ViewerState) -> Result<()>
    where
        L: EstimatorLoader<Estimator = E>,
    {
        state.set_model_status(ModelStatus::Loading);
        match loader.load().await {
            Ok(estimator) => {
                self.estimator = Some(estimator);
                state.set_model_status(ModelStatus::Ready);
                crate::log!("[model] ready");
                Ok(())
            }
            Err(e) => {
                crate::log!("[model] load failed: {e:#}");
                state.set_model_status(ModelStatus::Failed(format!("{e:#}")));
                Err(PoseError::Initialization(e))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.estimator.is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// 供給元の準備ができたら呼ぶ。キャンバスを解像度に合わせ、新しいキャンセルトークンを返す
    pub fn start(&mut self, resolution: (u32, u32), state: &mut ViewerState) -> CancellationToken {
        self.token = CancellationToken::new();
        self.canvas.resize(resolution.0, resolution.1);
        self.frame_rate.reset(Instant::now());
        self.active = true;
        state.set_camera_active(true);
        crate::log!("[detect] started ({}x{})", resolution.0, resolution.1);
        self.token.clone()
    }

    /// 停止してキャンバスを即座にクリアする。推論中の結果は捨てられる
    pub fn stop(&mut self, state: &mut ViewerState) {
        self.token.cancel();
        self.halt(state);
        crate::log!("[detect] stopped");
    }

    fn halt(&mut self, state: &mut ViewerState) {
        self.active = false;
        self.canvas.clear();
        self.last_frame = None;
        self.last_poses.clear();
        state.set_camera_active(false);
    }

    pub async fn tick<S>(&mut self, source: &mut S, state: &mut ViewerState) -> Result<TickOutcome>
    where
        S: FrameSource<Frame = E::Frame>,
    {
        if !self.active {
            return Ok(TickOutcome::Skipped(SkipReason::Inactive));
        }
        if self.token.is_cancelled() {
            self.halt(state);
            return Ok(TickOutcome::Cancelled);
        }
        let Some(estimator) = self.estimator.as_mut() else {
            return Ok(TickOutcome::Skipped(SkipReason::ModelNotReady));
        };

        let frame = match source.read().map_err(PoseError::FrameSource)? {
            FrameStatus::Ready(frame) => frame,
            FrameStatus::Pending => return Ok(TickOutcome::Skipped(SkipReason::FramePending)),
            FrameStatus::Paused | FrameStatus::Ended => return Ok(TickOutcome::SourceStopped),
        };

        let now = Instant::now();
        if let Some(rate) = self.frame_rate.tick(now) {
            state.set_frame_rate(rate);
            crate::verbose!("Frame Rate: {} fps", rate);
        }

        let token = self.token.clone();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = estimator.estimate(&frame, self.config.estimate) => Some(result),
        };
        let Some(result) = result else {
            self.halt(state);
            return Ok(TickOutcome::Cancelled);
        };
        let poses = result.map_err(PoseError::Estimation)?;

        let visible = all_visible(&poses, self.config.visibility_threshold);
        state.set_visible(visible);

        let recorded = if self.config.record_history && visible {
            self.history.append(&poses, epoch_millis())
        } else {
            0
        };

        self.measurement.observe(&poses, now);
        if let Some(first) = poses.first() {
            self.series.push(first.get(KeypointIndex::Nose).x);
        }

        self.renderer.render(
            &mut self.canvas,
            OverlayFrame {
                poses: &poses,
                draw_skeleton: state.draw_skeleton(),
                visible: Some(visible),
                series: state.show_chart().then_some(&self.series),
            },
        );

        let outcome = TickOutcome::Completed {
            poses: poses.len(),
            visible,
            recorded,
        };
        self.last_frame = Some(frame);
        self.last_poses = poses;
        Ok(outcome)
    }

    /// start() 済みのループを回す。推論・読み出しの失敗はログに残して続行する
    pub async fn run<S>(&mut self, source: &mut S, state: &mut ViewerState, mode: LoopMode) -> Result<RunSummary>
    where
        S: FrameSource<Frame = E::Frame>,
    {
        let token = self.token.clone();
        let mut interval = tokio::time::interval(mode.period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut summary = RunSummary::default();

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    self.halt(state);
                    summary.reason = StopReason::Cancelled;
                    break;
                }
                _ = interval.tick() => {}
            }

            match self.tick(source, state).await {
                Ok(TickOutcome::Completed { recorded, .. }) => {
                    summary.ticks += 1;
                    if recorded > 0 {
                        summary.recorded_ticks += 1;
                    }
                }
                Ok(TickOutcome::Skipped(SkipReason::Inactive)) => {
                    summary.reason = StopReason::Inactive;
                    break;
                }
                Ok(TickOutcome::Skipped(_)) => {}
                Ok(TickOutcome::SourceStopped) => {
                    if mode.stops_with_source() {
                        summary.reason = StopReason::SourceStopped;
                        break;
                    }
                }
                Ok(TickOutcome::Cancelled) => {
                    summary.reason = StopReason::Cancelled;
                    break;
                }
                Err(e) if e.is_recoverable() => {
                    summary.failures += 1;
                    crate::log!("[detect] tick skipped: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        crate::log!(
            "[detect] run finished: {} ticks, {} recorded, {} failures ({:?})",
            summary.ticks,
            summary.recorded_ticks,
            summary.failures,
            summary.reason
        );
        Ok(summary)
    }

    /// ジャンプ計測を予約する
    pub fn start_measurement(&mut self) {
        if self.config.reset_history_on_measure {
            self.history.reset();
        }
        self.series.clear();
        self.measurement.arm(Instant::now());
    }

    pub fn export_csv<P: AsRef<std::path::Path>>(&self, path: P) -> Result<usize> {
        self.history.export_to(path)
    }

    pub fn marks(&self) -> ReferenceMarks {
        self.renderer.options().marks
    }

    /// 基準マークを差し替える。次の描画から反映される
    pub fn set_marks(&mut self, marks: ReferenceMarks) {
        self.renderer.set_marks(marks);
    }

    /// 直近の姿勢で描き直す (一時停止中のトグル反映用)。停止中は何もしない
    pub fn redraw(&mut self, state: &ViewerState) {
        if !self.active {
            return;
        }
        self.renderer.render(
            &mut self.canvas,
            OverlayFrame {
                poses: &self.last_poses,
                draw_skeleton: state.draw_skeleton(),
                visible: state.visible(),
                series: state.show_chart().then_some(&self.series),
            },
        );
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryBuffer {
        &mut self.history
    }

    pub fn measurement(&self) -> &JumpMeasurement {
        &self.measurement
    }

    pub fn series(&self) -> &LandmarkSeries {
        &self.series
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    pub fn estimator(&self) -> Option<&E> {
        self.estimator.as_ref()
    }

    /// 直近に推論したフレーム
    pub fn last_frame(&self) -> Option<&E::Frame> {
        self.last_frame.as_ref()
    }

    pub fn last_poses(&self) -> &[Pose] {
        &self.last_poses
    }
}

fn epoch_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Keypoint;
    use crate::render::canvas::recording::RecordingCanvas;
    use crate::render::skeleton::KEYPOINT_COLOR;
    use crate::render::{Color, FrameBuffer};
    use std::collections::VecDeque;
    use std::future::Future;

    fn pose(score: f32) -> Pose {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        for (i, kp) in keypoints.iter_mut().enumerate() {
            *kp = Keypoint::new(50.0 + i as f32 * 10.0, 40.0 + i as f32 * 8.0, score);
        }
        Pose::new(keypoints)
    }

    struct ScriptedSource {
        frames: VecDeque<FrameStatus<u32>>,
        repeat: bool,
    }

    impl ScriptedSource {
        fn new(frames: Vec<FrameStatus<u32>>) -> Self {
            Self { frames: frames.into(), repeat: false }
        }

        fn endless() -> Self {
            Self { frames: VecDeque::new(), repeat: true }
        }
    }

    impl FrameSource for ScriptedSource {
        type Frame = u32;

        fn resolution(&self) -> (u32, u32) {
            (320, 240)
        }

        fn read(&mut self) -> anyhow::Result<FrameStatus<u32>> {
            Ok(match self.frames.pop_front() {
                Some(status) => status,
                None if self.repeat => FrameStatus::Ready(0),
                None => FrameStatus::Ended,
            })
        }
    }

    #[derive(Default)]
    struct FakeEstimator {
        script: VecDeque<anyhow::Result<Vec<Pose>>>,
        delay: Duration,
        calls: usize,
    }

    impl FakeEstimator {
        fn scripted(script: Vec<anyhow::Result<Vec<Pose>>>) -> Self {
            Self { script: script.into(), ..Self::default() }
        }
    }

    impl PoseEstimator for FakeEstimator {
        type Frame = u32;

        fn estimate(&mut self, _frame: &u32, _options: EstimateOptions) -> impl Future<Output = anyhow::Result<Vec<Pose>>> {
            self.calls += 1;
            let next = self.script.pop_front().unwrap_or_else(|| Ok(vec![pose(0.9)]));
            let delay = self.delay;
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                next
            }
        }
    }

    struct FakeLoader {
        fail: bool,
    }

    impl EstimatorLoader for FakeLoader {
        type Estimator = FakeEstimator;

        fn load(&self) -> impl Future<Output = anyhow::Result<FakeEstimator>> {
            let fail = self.fail;
            async move {
                if fail {
                    anyhow::bail!("model file not found");
                }
                Ok(FakeEstimator::default())
            }
        }
    }

    fn recording_loop(estimator: FakeEstimator) -> DetectionLoop<FakeEstimator, RecordingCanvas> {
        DetectionLoop::new(LoopConfig::default(), RecordingCanvas::default()).with_estimator(estimator)
    }

    #[tokio::test]
    async fn test_tick_inactive_is_noop() {
        let mut detector = recording_loop(FakeEstimator::default());
        let mut state = ViewerState::new();
        let mut source = ScriptedSource::endless();

        let outcome = detector.tick(&mut source, &mut state).await.unwrap();
        assert_eq!(outcome, TickOutcome::Skipped(SkipReason::Inactive));
        assert_eq!(detector.estimator().unwrap().calls, 0);
    }

    #[tokio::test]
    async fn test_tick_before_initialize_is_noop() {
        let mut detector: DetectionLoop<FakeEstimator, _> =
            DetectionLoop::new(LoopConfig::default(), RecordingCanvas::default());
        let mut state = ViewerState::new();
        let mut source = ScriptedSource::endless();
        detector.start(source.resolution(), &mut state);

        let outcome = detector.tick(&mut source, &mut state).await.unwrap();
        assert_eq!(outcome, TickOutcome::Skipped(SkipReason::ModelNotReady));
        assert!(detector.history().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_failure_then_retry() {
        let mut detector: DetectionLoop<FakeEstimator, _> =
            DetectionLoop::new(LoopConfig::default(), RecordingCanvas::default());
        let mut state = ViewerState::new();

        let err = detector.initialize(&FakeLoader { fail: true }, &mut state).await.unwrap_err();
        assert!(matches!(err, PoseError::Initialization(_)));
        assert!(matches!(state.model_status(), ModelStatus::Failed(msg) if msg.contains("not found")));
        assert!(!detector.is_ready());

        detector.initialize(&FakeLoader { fail: false }, &mut state).await.unwrap();
        assert_eq!(*state.model_status(), ModelStatus::Ready);
        assert!(detector.is_ready());
    }

    #[tokio::test]
    async fn test_start_resizes_canvas() {
        let mut detector = recording_loop(FakeEstimator::default());
        let mut state = ViewerState::new();
        detector.start((640, 360), &mut state);
        assert_eq!(detector.canvas().size(), (640, 360));
        assert!(state.camera_active());
    }

    #[tokio::test]
    async fn test_pending_frame_is_skipped() {
        let mut detector = recording_loop(FakeEstimator::default());
        let mut state = ViewerState::new();
        let mut source = ScriptedSource::new(vec![FrameStatus::Pending]);
        detector.start(source.resolution(), &mut state);

        let outcome = detector.tick(&mut source, &mut state).await.unwrap();
        assert_eq!(outcome, TickOutcome::Skipped(SkipReason::FramePending));
        assert_eq!(detector.estimator().unwrap().calls, 0);
    }

    #[tokio::test]
    async fn test_visible_tick_records_and_renders() {
        let mut detector = recording_loop(FakeEstimator::scripted(vec![Ok(vec![pose(0.9)])]));
        let mut state = ViewerState::new();
        let mut source = ScriptedSource::endless();
        detector.start(source.resolution(), &mut state);

        let outcome = detector.tick(&mut source, &mut state).await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Completed { poses: 1, visible: true, recorded: 17 }
        );
        assert_eq!(state.visible(), Some(true));
        assert_eq!(detector.history().len(), 17);
        assert_eq!(detector.last_frame(), Some(&0));
        assert_eq!(detector.series().len(), 1);

        // 骨格表示オフでもインジケータは描かれる
        assert_eq!(detector.canvas().fills_with(KEYPOINT_COLOR), 0);
        assert_eq!(detector.canvas().fills_with(Color::GREEN), 1);
    }

    #[tokio::test]
    async fn test_partially_visible_tick_renders_without_recording() {
        let mut low = pose(0.9);
        low.keypoints[KeypointIndex::LeftAnkle as usize].score = 0.1;
        let mut detector = recording_loop(FakeEstimator::scripted(vec![Ok(vec![low])]));
        let mut state = ViewerState::new();
        state.toggle_skeleton();
        let mut source = ScriptedSource::endless();
        detector.start(source.resolution(), &mut state);

        let outcome = detector.tick(&mut source, &mut state).await.unwrap();
        assert_eq!(
            outcome,
            TickOutcome::Completed { poses: 1, visible: false, recorded: 0 }
        );
        assert!(detector.history().is_empty());
        assert_eq!(detector.canvas().fills_with(KEYPOINT_COLOR), 16);
        assert_eq!(detector.canvas().lines(), 17);
        assert_eq!(detector.canvas().fills_with(Color::RED), 1);
    }

    #[tokio::test]
    async fn test_history_length_is_sum_of_qualifying_ticks() {
        let mut low = pose(0.9);
        low.keypoints[0].score = 0.0;
        let script = vec![
            Ok(vec![pose(0.9), pose(0.8)]),
            Ok(vec![pose(0.9), low]),
            Ok(vec![pose(0.4)]),
            Ok(vec![]),
        ];
        let mut detector = recording_loop(FakeEstimator::scripted(script));
        let mut state = ViewerState::new();
        let mut source = ScriptedSource::endless();
        detector.start(source.resolution(), &mut state);

        for _ in 0..4 {
            detector.tick(&mut source, &mut state).await.unwrap();
        }
        assert_eq!(detector.history().len(), 2 * 17 + 17);
    }

    #[tokio::test]
    async fn test_record_history_disabled() {
        let config = LoopConfig {
            record_history: false,
            ..LoopConfig::default()
        };
        let mut detector =
            DetectionLoop::new(config, RecordingCanvas::default()).with_estimator(FakeEstimator::default());
        let mut state = ViewerState::new();
        let mut source = ScriptedSource::endless();
        detector.start(source.resolution(), &mut state);

        detector.tick(&mut source, &mut state).await.unwrap();
        assert!(detector.history().is_empty());
    }

    #[tokio::test]
    async fn test_estimation_error_is_recoverable() {
        let mut detector = recording_loop(FakeEstimator::scripted(vec![Err(anyhow::anyhow!("backend lost"))]));
        let mut state = ViewerState::new();
        let mut source = ScriptedSource::endless();
        detector.start(source.resolution(), &mut state);

        let err = detector.tick(&mut source, &mut state).await.unwrap_err();
        assert!(matches!(err, PoseError::Estimation(_)));
        assert!(err.is_recoverable());

        let outcome = detector.tick(&mut source, &mut state).await.unwrap();
        assert!(matches!(outcome, TickOutcome::Completed { .. }));
    }

    #[tokio::test]
    async fn test_stop_clears_surface() {
        let mut detector =
            DetectionLoop::new(LoopConfig::default(), FrameBuffer::new(1, 1)).with_estimator(FakeEstimator::default());
        let mut state = ViewerState::new();
        state.toggle_skeleton();
        let mut source = ScriptedSource::endless();
        detector.start(source.resolution(), &mut state);

        detector.tick(&mut source, &mut state).await.unwrap();
        assert!(!detector.canvas().is_blank());

        detector.stop(&mut state);
        assert!(detector.canvas().is_blank());
        assert!(!state.camera_active());
        assert!(detector.last_poses().is_empty());

        let outcome = detector.tick(&mut source, &mut state).await.unwrap();
        assert_eq!(outcome, TickOutcome::Skipped(SkipReason::Inactive));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_in_flight_result() {
        let estimator = FakeEstimator {
            delay: Duration::from_millis(100),
            ..FakeEstimator::default()
        };
        let mut detector = DetectionLoop::new(LoopConfig::default(), FrameBuffer::new(1, 1)).with_estimator(estimator);
        let mut state = ViewerState::new();
        state.toggle_skeleton();
        let mut source = ScriptedSource::endless();
        let token = detector.start(source.resolution(), &mut state);

        let (outcome, _) = tokio::join!(detector.tick(&mut source, &mut state), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        });

        assert_eq!(outcome.unwrap(), TickOutcome::Cancelled);
        assert!(detector.history().is_empty());
        assert!(detector.canvas().is_blank());
        assert!(!state.camera_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_continues_after_estimation_error() {
        let script = vec![Err(anyhow::anyhow!("transient")), Ok(vec![pose(0.9)]), Ok(vec![pose(0.1)])];
        let mut detector = recording_loop(FakeEstimator::scripted(script));
        let mut state = ViewerState::new();
        let mut source = ScriptedSource::new(vec![
            FrameStatus::Ready(1),
            FrameStatus::Ready(2),
            FrameStatus::Ready(3),
        ]);
        detector.start(source.resolution(), &mut state);

        let summary = detector
            .run(&mut source, &mut state, LoopMode::FramePaced(Duration::from_millis(16)))
            .await
            .unwrap();
        assert_eq!(
            summary,
            RunSummary {
                ticks: 2,
                recorded_ticks: 1,
                failures: 1,
                reason: StopReason::SourceStopped,
            }
        );
        assert_eq!(detector.last_frame(), Some(&3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_paced_run_stops_on_pause_and_restarts() {
        let mut detector = recording_loop(FakeEstimator::default());
        let mut state = ViewerState::new();
        let mut source = ScriptedSource::new(vec![FrameStatus::Ready(1), FrameStatus::Paused]);
        detector.start(source.resolution(), &mut state);

        let mode = LoopMode::FramePaced(Duration::from_millis(16));
        let summary = detector.run(&mut source, &mut state, mode).await.unwrap();
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.reason, StopReason::SourceStopped);
        // 一時停止では最後の描画が残る
        assert!(state.camera_active());

        source.frames.extend([FrameStatus::Ready(2), FrameStatus::Ready(3)]);
        let summary = detector.run(&mut source, &mut state, mode).await.unwrap();
        assert_eq!(summary.ticks, 2);
        assert_eq!(detector.history().len(), 3 * 17);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_run_until_cancelled() {
        let mut detector =
            DetectionLoop::new(LoopConfig::default(), FrameBuffer::new(1, 1)).with_estimator(FakeEstimator::default());
        let mut state = ViewerState::new();
        state.toggle_skeleton();
        let mut source = ScriptedSource::endless();
        let token = detector.start(source.resolution(), &mut state);

        let (summary, _) = tokio::join!(
            detector.run(&mut source, &mut state, LoopMode::Interval(Duration::from_millis(10))),
            async {
                tokio::time::sleep(Duration::from_millis(1505)).await;
                token.cancel();
            }
        );

        let summary = summary.unwrap();
        assert_eq!(summary.reason, StopReason::Cancelled);
        assert!(summary.ticks >= 100);
        assert!((99..=100).contains(&state.frame_rate()));
        assert!(detector.canvas().is_blank());
        assert!(!state.camera_active());
    }

    #[tokio::test]
    async fn test_run_without_start_returns_immediately() {
        let mut detector = recording_loop(FakeEstimator::default());
        let mut state = ViewerState::new();
        let mut source = ScriptedSource::endless();

        let summary = detector
            .run(&mut source, &mut state, LoopMode::Interval(Duration::from_millis(10)))
            .await
            .unwrap();
        assert_eq!(summary.reason, StopReason::Inactive);
        assert_eq!(summary.ticks, 0);
    }

    #[tokio::test]
    async fn test_start_measurement_resets_history() {
        let mut detector = recording_loop(FakeEstimator::default());
        let mut state = ViewerState::new();
        let mut source = ScriptedSource::endless();
        detector.start(source.resolution(), &mut state);

        detector.tick(&mut source, &mut state).await.unwrap();
        assert_eq!(detector.history().len(), 17);

        detector.start_measurement();
        assert!(detector.history().is_empty());
        assert!(matches!(
            detector.measurement().phase(),
            crate::measurement::MeasurementPhase::Armed(_)
        ));
    }

    #[tokio::test]
    async fn test_switching_marks_redraws_last_poses() {
        let mut detector = recording_loop(FakeEstimator::default());
        let mut state = ViewerState::new();
        state.toggle_skeleton();
        let mut source = ScriptedSource::new(vec![FrameStatus::Ready(1), FrameStatus::Paused]);
        detector.start(source.resolution(), &mut state);

        detector.tick(&mut source, &mut state).await.unwrap();
        assert_eq!(detector.marks(), ReferenceMarks::None);
        assert_eq!(detector.canvas().lines(), 18);

        let next = detector.marks().next();
        detector.set_marks(next);
        let outcome = detector.tick(&mut source, &mut state).await.unwrap();
        assert_eq!(outcome, TickOutcome::SourceStopped);
        detector.redraw(&state);

        // 骨格 18 本 + 柔軟性マークの直線 4 本
        assert_eq!(detector.marks(), ReferenceMarks::Flexibility);
        assert_eq!(detector.canvas().lines(), 22);
        assert_eq!(detector.canvas().fills_with(KEYPOINT_COLOR), 17);
        assert_eq!(detector.canvas().fills_with(Color::GREEN), 1);
    }

    #[tokio::test]
    async fn test_redraw_after_stop_keeps_surface_clear() {
        let mut detector = recording_loop(FakeEstimator::default());
        let mut state = ViewerState::new();
        let mut source = ScriptedSource::endless();
        detector.start(source.resolution(), &mut state);
        detector.tick(&mut source, &mut state).await.unwrap();

        detector.stop(&mut state);
        detector.redraw(&state);
        assert!(detector.canvas().visible().is_empty());
    }
}
