use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use pose_overlay::camera::{FrameSource, VideoFile};
use pose_overlay::config::Config;
use pose_overlay::detection::{DetectionLoop, LoopConfig, LoopMode, StopReason, ViewerState};
use pose_overlay::log;
use pose_overlay::logging;
use pose_overlay::pose::MoveNetLoader;
use pose_overlay::render::FrameBuffer;

const DEFAULT_CONFIG: &str = "pose_overlay.toml";
/// 表示が無いのでデコードできる速さで回す
const HEADLESS_PERIOD: Duration = Duration::from_millis(1);

struct Args {
    video: PathBuf,
    out: Option<String>,
    config: Option<PathBuf>,
}

fn usage() -> ! {
    eprintln!("Usage: pose_export <video> [--out <csv>] [--config <path>]");
    std::process::exit(2);
}

fn parse_args() -> Result<Args> {
    let mut video = None;
    let mut out = None;
    let mut config = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--out" => out = Some(args.next().context("--out requires a path")?),
            "--config" => config = Some(args.next().context("--config requires a path")?.into()),
            "-h" | "--help" => usage(),
            flag if flag.starts_with("--") => bail!("unknown argument: {}", flag),
            path if video.is_none() => video = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument: {}", extra),
        }
    }
    let Some(video) = video else { usage() };
    Ok(Args { video, out, config })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("failed to read {}", path.display()))?,
        None => Config::load_or_default(DEFAULT_CONFIG),
    };
    let out = args.out.clone().unwrap_or_else(|| config.export.path.clone());

    logging::set_verbose(config.log.verbose);
    logging::open_log_file(&config.log.dir, "pose_export")?;
    log!("Pose Export ({})", env!("GIT_VERSION"));

    let mut video = VideoFile::open(&args.video)?;
    let (width, height) = video.resolution();
    log!("[video] {} ({}x{}, {:.1} fps)", video.path().display(), width, height, video.fps());

    let mut state = ViewerState::from_config(&config);
    let mut detector = DetectionLoop::new(LoopConfig::from_config(&config), FrameBuffer::new(width, height));
    detector
        .initialize(&MoveNetLoader::new(&config.model.path), &mut state)
        .await
        .context("failed to load pose model")?;

    let token = detector.start((width, height), &mut state);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log!("[main] interrupted, writing partial history");
            token.cancel();
        }
    });

    let started = Instant::now();
    let summary = detector
        .run(&mut video, &mut state, LoopMode::FramePaced(HEADLESS_PERIOD))
        .await?;
    let elapsed = started.elapsed().as_secs_f32();
    log!(
        "[export] {} frames in {:.1}s ({:.1} fps), {} fully visible, {} failed",
        summary.ticks,
        elapsed,
        summary.ticks as f32 / elapsed.max(f32::EPSILON),
        summary.recorded_ticks,
        summary.failures
    );
    if summary.reason == StopReason::Cancelled {
        log!("[export] stopped before end of video");
    }

    let count = detector.export_csv(&out)?;
    log!("[export] {} records -> {}", count, out);
    Ok(())
}
