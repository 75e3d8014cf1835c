//! Rolling Logger
//!
//! Installs a `tracing` subscriber that writes to stderr and to a size-rotated
//! log file, keeping the most recent lines in memory for in-app inspection.
//! `log` records reach the same subscriber through its `tracing-log` bridge.
//!
//! Rotated files are named `<app>.<stamp>.<seq>.log` with a fixed-width stamp
//! and a zero-padded sequence, so name order is age order.

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use thiserror::Error;
use tracing_subscriber::fmt::{self, time::ChronoLocal, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Rotate once the active file would grow past this size
pub const DEFAULT_MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;
/// Rotated files kept next to the active one
pub const DEFAULT_KEEP_ROTATED: usize = 3;
/// Lines kept in the in-memory ring buffer
pub const DEFAULT_BUFFER_LINES: usize = 500;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

static BUFFER: OnceLock<Arc<LogBuffer>> = OnceLock::new();

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("log file error: {0}")]
    Io(#[from] io::Error),
    #[error("logger already initialized")]
    AlreadyInitialized,
    #[error("logger not initialized")]
    NotInitialized,
}

/// Rotation and buffering limits
#[derive(Debug, Clone, Copy)]
pub struct RollingConfig {
    pub max_file_bytes: u64,
    pub keep_rotated: usize,
    pub buffer_lines: usize,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            keep_rotated: DEFAULT_KEEP_ROTATED,
            buffer_lines: DEFAULT_BUFFER_LINES,
        }
    }
}

/// Initialize global logging into `log_dir/<app_name>.log`.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_logger(log_dir: PathBuf, app_name: &str) -> Result<(), LoggerError> {
    init_logger_with(log_dir, app_name, RollingConfig::default())
}

pub fn init_logger_with(
    log_dir: PathBuf,
    app_name: &str,
    config: RollingConfig,
) -> Result<(), LoggerError> {
    if BUFFER.get().is_some() {
        return Err(LoggerError::AlreadyInitialized);
    }

    fs::create_dir_all(&log_dir)?;
    let writer = RollingWriter::open(&log_dir, app_name, config)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                .with_writer(io::stderr),
        )
        .with(
            fmt::layer()
                .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
                .with_ansi(false)
                .with_writer(writer.clone()),
        )
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)?;

    BUFFER
        .set(writer.buffer())
        .map_err(|_| LoggerError::AlreadyInitialized)
}

/// Log an info line through the installed subscriber
pub fn info(message: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    tracing::info!("{}", message);
    Ok(())
}

/// Log an error line through the installed subscriber
pub fn error(message: &str) -> Result<(), LoggerError> {
    ensure_initialized()?;
    tracing::error!("{}", message);
    Ok(())
}

/// Most recent log lines, oldest first. Empty before `init_logger`.
pub fn recent_lines() -> Vec<String> {
    BUFFER.get().map(|b| b.lines()).unwrap_or_default()
}

fn ensure_initialized() -> Result<(), LoggerError> {
    if BUFFER.get().is_none() {
        return Err(LoggerError::NotInitialized);
    }
    Ok(())
}

/// Fixed-capacity ring of formatted lines
#[derive(Debug)]
pub struct LogBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn push(&self, chunk: &[u8]) {
        if self.capacity == 0 {
            return;
        }
        let text = String::from_utf8_lossy(chunk);
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            if lines.len() == self.capacity {
                lines.pop_front();
            }
            lines.push_back(line.to_string());
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.iter().cloned().collect()
    }
}

struct RollingFile {
    dir: PathBuf,
    app_name: String,
    file: File,
    written: u64,
    config: RollingConfig,
}

impl RollingFile {
    fn open(dir: &Path, app_name: &str, config: RollingConfig) -> io::Result<Self> {
        let path = active_path(dir, app_name);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            dir: dir.to_path_buf(),
            app_name: app_name.to_string(),
            file,
            written,
            config,
        })
    }

    fn write_chunk(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.written > 0 && self.written + buf.len() as u64 > self.config.max_file_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%3f").to_string();
        self.rotate_at(&stamp)
    }

    fn rotate_at(&mut self, stamp: &str) -> io::Result<()> {
        self.file.flush()?;
        let rotated_path =
            |seq: u32| self.dir.join(format!("{}.{}.{:03}.log", self.app_name, stamp, seq));
        let mut seq = 0;
        let mut target = rotated_path(seq);
        while target.exists() {
            seq += 1;
            target = rotated_path(seq);
        }
        let active = active_path(&self.dir, &self.app_name);
        fs::rename(&active, &target)?;
        self.file = OpenOptions::new().create(true).append(true).open(&active)?;
        self.written = 0;
        self.prune()
    }

    fn prune(&self) -> io::Result<()> {
        let mut rotated = rotated_files(&self.dir, &self.app_name)?;
        rotated.sort();
        // Oldest first
        let excess = rotated.len().saturating_sub(self.config.keep_rotated);
        for path in rotated.into_iter().take(excess) {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

fn active_path(dir: &Path, app_name: &str) -> PathBuf {
    dir.join(format!("{}.log", app_name))
}

/// Rotated files for `app_name`, unsorted
fn rotated_files(dir: &Path, app_name: &str) -> io::Result<Vec<PathBuf>> {
    let prefix = format!("{}.", app_name);
    let active = format!("{}.log", app_name);
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if name != active && name.starts_with(&prefix) && name.ends_with(".log") {
            found.push(entry.path());
        }
    }
    Ok(found)
}

/// `MakeWriter` that feeds both the rotating file and the ring buffer
#[derive(Clone)]
pub struct RollingWriter {
    file: Arc<Mutex<RollingFile>>,
    buffer: Arc<LogBuffer>,
}

impl RollingWriter {
    pub fn open(dir: &Path, app_name: &str, config: RollingConfig) -> io::Result<Self> {
        Ok(Self {
            file: Arc::new(Mutex::new(RollingFile::open(dir, app_name, config)?)),
            buffer: Arc::new(LogBuffer::new(config.buffer_lines)),
        })
    }

    pub fn buffer(&self) -> Arc<LogBuffer> {
        Arc::clone(&self.buffer)
    }
}

impl Write for RollingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_chunk(buf)?;
        self.buffer.push(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingWriter {
    type Writer = RollingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
