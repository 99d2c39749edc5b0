use anyhow::{bail, Context, Result};
use opencv::core::Mat;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use pose_overlay::camera::{FrameSource, FrameStatus, OpenCvCamera, VideoFile};
use pose_overlay::config::Config;
use pose_overlay::detection::{DetectionLoop, LoopConfig, TickOutcome, ViewerState};
use pose_overlay::log;
use pose_overlay::logging;
use pose_overlay::measurement::MeasurementPhase;
use pose_overlay::pose::{MoveNetEstimator, MoveNetLoader};
use pose_overlay::render::{FrameBuffer, Key, MinifbRenderer};

const DEFAULT_CONFIG: &str = "pose_overlay.toml";
const STATUS_PERIOD: Duration = Duration::from_secs(1);

type Detector = DetectionLoop<MoveNetEstimator, FrameBuffer>;

struct Args {
    video: Option<PathBuf>,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut video = None;
    let mut config = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--video" => video = Some(args.next().context("--video requires a path")?.into()),
            "--config" => config = Some(args.next().context("--config requires a path")?.into()),
            "-h" | "--help" => {
                eprintln!("Usage: pose_viewer [--video <path>] [--config <path>]");
                std::process::exit(0);
            }
            other => bail!("unknown argument: {}", other),
        }
    }
    Ok(Args { video, config })
}

/// カメラか動画ファイル
enum Source {
    Camera(OpenCvCamera),
    Video(VideoFile),
}

impl FrameSource for Source {
    type Frame = Mat;

    fn resolution(&self) -> (u32, u32) {
        match self {
            Source::Camera(camera) => camera.resolution(),
            Source::Video(video) => video.resolution(),
        }
    }

    fn read(&mut self) -> Result<FrameStatus<Mat>> {
        match self {
            Source::Camera(camera) => FrameSource::read(camera),
            Source::Video(video) => video.read(),
        }
    }
}

fn export(detector: &Detector, path: &str, state: &mut ViewerState) {
    match detector.export_csv(path) {
        Ok(count) => state.notify(format!("exported {} records to {}", count, path)),
        Err(e) => state.notify(format!("{}", e)),
    }
}

fn report_measurement(detector: &Detector) {
    let measurement = detector.measurement();
    if measurement.phase() != MeasurementPhase::Measuring {
        return;
    }
    if let (Some(avg), Some(top)) = (measurement.average_hip_y(), measurement.highest_hip_y()) {
        log!(
            "[measure] {} samples, average hip y {:.1}px, highest {:.1}px",
            measurement.sample_count(),
            avg,
            top
        );
    }
}

/// Space: カメラは開始/停止、動画は再生/一時停止
fn toggle_capture(
    detector: &mut Detector,
    source: &mut Option<Source>,
    state: &mut ViewerState,
    config: &Config,
) -> Result<()> {
    match source {
        Some(Source::Video(video)) => {
            let playing = video.toggle()?;
            if playing && !detector.is_active() {
                detector.start(video.resolution(), state);
            }
            log!("[video] {}", if playing { "playing" } else { "paused" });
        }
        Some(Source::Camera(_)) => {
            detector.stop(state);
            // カメラを解放する
            *source = None;
        }
        None => {
            let camera = &config.camera;
            match OpenCvCamera::open_with_resolution(camera.index, Some(camera.width), Some(camera.height)) {
                Ok(opened) => {
                    detector.start(opened.resolution(), state);
                    *source = Some(Source::Camera(opened));
                }
                Err(e) => state.notify(format!("camera unavailable: {:#}", e)),
            }
        }
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("failed to read {}", path.display()))?,
        None => Config::load_or_default(DEFAULT_CONFIG),
    };

    logging::set_verbose(config.log.verbose);
    logging::open_log_file(&config.log.dir, "pose_viewer")?;
    log!("Pose Viewer ({})", env!("GIT_VERSION"));
    log!(
        "[config] model={}, interval={}ms, visibility_threshold={}, marks={:?}",
        config.model.path,
        config.detection.interval_ms,
        config.detection.visibility_threshold,
        config.overlay.reference_marks
    );

    let mut state = ViewerState::from_config(&config);
    let loader = MoveNetLoader::new(&config.model.path);

    let mut source = match &args.video {
        Some(path) => {
            let mut video = VideoFile::open(path)?;
            // Space で再生開始
            video.pause();
            Some(Source::Video(video))
        }
        None => None,
    };
    let (width, height) = match &source {
        Some(s) => s.resolution(),
        None => (config.camera.width, config.camera.height),
    };

    let mut detector: Detector =
        DetectionLoop::new(LoopConfig::from_config(&config), FrameBuffer::new(width, height));
    let mut window = MinifbRenderer::new("Pose Viewer", width as usize, height as usize)?;

    if let Err(e) = detector.initialize(&loader, &mut state).await {
        state.notify(format!("{} (press L to retry)", e));
    }

    // SIGUSR1 → CSVエクスポート
    let export_requested = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&export_requested))?;

    let period = if args.video.is_some() {
        config.detection.video_interval()
    } else {
        config.detection.interval()
    };
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    log!("Space: start/stop  S: skeleton  F: fullscreen  E: export  M: measure  G: chart  K: marks  R: reset  L: reload model  Esc: quit");

    let mut last_status = Instant::now();

    while window.is_open() {
        tokio::select! {
            _ = &mut ctrl_c => {
                log!("[main] interrupted");
                break;
            }
            _ = interval.tick() => {}
        }

        let mut quit = false;
        for key in window.pressed_keys() {
            match key {
                Key::Escape => quit = true,
                Key::Space => toggle_capture(&mut detector, &mut source, &mut state, &config)?,
                Key::S => {
                    let on = state.toggle_skeleton();
                    log!("[overlay] skeleton {}", if on { "on" } else { "off" });
                }
                Key::F => match window.toggle_fullscreen() {
                    Ok(fullscreen) => state.set_fullscreen(fullscreen),
                    Err(e) => state.notify(e.to_string()),
                },
                Key::E => export(&detector, &config.export.path, &mut state),
                Key::M => {
                    report_measurement(&detector);
                    detector.start_measurement();
                }
                Key::G => {
                    state.toggle_chart();
                }
                Key::K => {
                    let marks = detector.marks().next();
                    detector.set_marks(marks);
                    detector.redraw(&state);
                    if marks.is_enabled() {
                        log!("[overlay] reference marks {:?}", marks);
                    } else {
                        log!("[overlay] reference marks off");
                    }
                }
                Key::R => {
                    detector.history_mut().reset();
                    log!("[history] reset");
                }
                Key::L if !detector.is_ready() => {
                    if let Err(e) = detector.initialize(&loader, &mut state).await {
                        state.notify(e.to_string());
                    }
                }
                _ => {}
            }
        }
        if quit {
            break;
        }

        if export_requested.swap(false, Ordering::Relaxed) {
            log!("[signal] SIGUSR1 export");
            export(&detector, &config.export.path, &mut state);
        }

        if let Some(src) = source.as_mut() {
            match detector.tick(src, &mut state).await {
                Ok(TickOutcome::Completed { .. }) | Ok(TickOutcome::Skipped(_)) | Ok(TickOutcome::SourceStopped) => {}
                Ok(TickOutcome::Cancelled) => log!("[detect] cancelled"),
                Err(e) if e.is_recoverable() => log!("[detect] tick skipped: {}", e),
                Err(e) => return Err(e.into()),
            }
        }

        match detector.last_frame() {
            Some(frame) => window.draw_frame(frame)?,
            None => window.clear_background(),
        }
        window.compose(detector.canvas());
        window.update()?;

        if last_status.elapsed() >= STATUS_PERIOD {
            last_status = Instant::now();
            let status = state.status_line(detector.history().len());
            match state.take_notification() {
                Some(notice) => window.set_title(&format!("Pose Viewer - {}", notice)),
                None => window.set_title(&format!("Pose Viewer - {}", status)),
            }
            if detector.is_active() {
                log!("[status] {}", status);
            }
        }
    }

    detector.stop(&mut state);
    report_measurement(&detector);
    log!("Shutting down ({} records in history)", detector.history().len());
    Ok(())
}
