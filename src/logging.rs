//! stderr + ログファイルへの二重出力

use anyhow::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

static LOG_FILE: OnceLock<Mutex<BufWriter<File>>> = OnceLock::new();
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// `<dir>/<prefix>_YYYYmmdd_HHMMSS.log` を開く。2回目以降の呼び出しは既存ファイルを使い続ける
pub fn open_log_file<P: AsRef<Path>>(dir: P, prefix: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir.as_ref())?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.as_ref().join(format!("{}_{}.log", prefix, ts));
    let file = File::create(&path)?;
    if LOG_FILE.set(Mutex::new(BufWriter::new(file))).is_ok() {
        eprintln!("Log: {}", path.display());
    }
    Ok(path)
}

pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// 1行出力する。ログファイル未オープンなら stderr のみ
pub fn write_line(msg: &str) {
    eprintln!("{}", msg);
    if let Some(file) = LOG_FILE.get() {
        if let Ok(mut f) = file.lock() {
            let _ = writeln!(f, "{}", msg);
            let _ = f.flush();
        }
    }
}

#[macro_export]
macro_rules! log {
    ($($arg:tt)*) => {{
        $crate::logging::write_line(&format!($($arg)*));
    }};
}

#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {{
        if $crate::logging::is_verbose() {
            $crate::logging::write_line(&format!("[verbose] {}", format!($($arg)*)));
        }
    }};
}
