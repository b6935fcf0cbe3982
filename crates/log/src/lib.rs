//! Leveled logging for the daemon and its libraries.
//!
//! Lines go to stderr as text or JSON. A global level applies unless a
//! per-target directive (`cropd_masternode=debug`) matches the module path of
//! the call site; the longest matching directive wins. An optional in-memory
//! ring keeps the most recent lines for inspection.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock, RwLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::json;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Level {
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

const LEVEL_NAMES: [(Level, &str); 5] = [
    (Level::Error, "ERROR"),
    (Level::Warn, "WARN"),
    (Level::Info, "INFO"),
    (Level::Debug, "DEBUG"),
    (Level::Trace, "TRACE"),
];

impl Level {
    pub fn as_str(self) -> &'static str {
        LEVEL_NAMES[self as usize - 1].1
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("warning") {
            return Some(Self::Warn);
        }
        LEVEL_NAMES
            .iter()
            .find(|(_, name)| raw.eq_ignore_ascii_case(name))
            .map(|(level, _)| *level)
    }

    fn from_raw(raw: u8) -> Self {
        LEVEL_NAMES
            .get(usize::from(raw).saturating_sub(1))
            .map_or(Self::Trace, |(level, _)| *level)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Format {
    #[default]
    Text,
    Json,
}

impl Format {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("text") {
            Some(Self::Text)
        } else if raw.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }
}

/// `target=level`: applies to `target` and every module nested under it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Directive {
    pub target: String,
    pub level: Level,
}

impl Directive {
    fn matches(&self, target: &str) -> bool {
        match target.strip_prefix(self.target.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with("::"),
            None => false,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FilterError {
    EmptyTarget(String),
    UnknownLevel(String),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::EmptyTarget(raw) => write!(f, "log directive '{raw}' has no target"),
            FilterError::UnknownLevel(raw) => write!(f, "unknown log level '{raw}'"),
        }
    }
}

impl std::error::Error for FilterError {}

fn parse_level(raw: &str) -> Result<Level, FilterError> {
    Level::parse(raw).ok_or_else(|| FilterError::UnknownLevel(raw.trim().to_string()))
}

/// Parses `info,cropd_masternode::registry=trace` into a default level plus directives.
///
/// A bare level sets the default; the last bare level listed wins.
pub fn parse_filter(raw: &str) -> Result<(Option<Level>, Vec<Directive>), FilterError> {
    let mut default = None;
    let mut directives = Vec::new();
    for part in raw.split(',').map(str::trim) {
        if part.is_empty() {
            continue;
        }
        let Some((target, level)) = part.split_once('=') else {
            default = Some(parse_level(part)?);
            continue;
        };
        let target = target.trim();
        if target.is_empty() {
            return Err(FilterError::EmptyTarget(part.to_string()));
        }
        directives.push(Directive {
            target: target.to_string(),
            level: parse_level(level)?,
        });
    }
    Ok((default, directives))
}

#[derive(Clone, Debug)]
pub struct LogConfig {
    pub level: Level,
    pub format: Format,
    pub timestamps: bool,
    pub directives: Vec<Directive>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Text,
            timestamps: true,
            directives: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CapturedLog {
    pub ts_ms: u64,
    pub level: Level,
    pub target: &'static str,
    pub file: &'static str,
    pub line: u32,
    pub msg: String,
}

struct CaptureRing {
    capacity: usize,
    lines: VecDeque<CapturedLog>,
}

impl CaptureRing {
    fn push(&mut self, entry: CapturedLog) {
        if self.capacity == 0 {
            return;
        }
        while self.lines.len() >= self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(entry);
    }

    fn tail(&self, limit: usize) -> Vec<CapturedLog> {
        let skip = self.lines.len().saturating_sub(limit);
        self.lines.iter().skip(skip).cloned().collect()
    }
}

/// Most verbose level any target may log at; read on every macro call.
static MAX_LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);
static STDERR: AtomicBool = AtomicBool::new(true);
static CAPTURING: AtomicBool = AtomicBool::new(false);
static SETTINGS: OnceLock<RwLock<LogConfig>> = OnceLock::new();
static CAPTURE: OnceLock<Mutex<CaptureRing>> = OnceLock::new();

fn settings() -> &'static RwLock<LogConfig> {
    SETTINGS.get_or_init(|| RwLock::new(LogConfig::default()))
}

fn capture_ring() -> &'static Mutex<CaptureRing> {
    CAPTURE.get_or_init(|| {
        Mutex::new(CaptureRing {
            capacity: 0,
            lines: VecDeque::new(),
        })
    })
}

pub fn init(config: LogConfig) {
    let max = config
        .directives
        .iter()
        .map(|directive| directive.level)
        .fold(config.level, Ord::max);
    if let Ok(mut current) = settings().write() {
        *current = config;
    }
    MAX_LEVEL.store(max as u8, Ordering::Relaxed);
}

pub fn set_stderr_enabled(enabled: bool) {
    STDERR.store(enabled, Ordering::Relaxed);
}

/// Keeps the last `capacity` lines in memory. Zero turns capture off.
pub fn enable_capture(capacity: usize) {
    if capacity == 0 {
        disable_capture();
        return;
    }
    if let Ok(mut ring) = capture_ring().lock() {
        ring.capacity = capacity;
        while ring.lines.len() > capacity {
            ring.lines.pop_front();
        }
    }
    CAPTURING.store(true, Ordering::Relaxed);
}

pub fn disable_capture() {
    CAPTURING.store(false, Ordering::Relaxed);
}

pub fn clear_captured_logs() {
    if let Ok(mut ring) = capture_ring().lock() {
        ring.lines.clear();
    }
}

pub fn capture_snapshot(limit: usize) -> Vec<CapturedLog> {
    capture_ring()
        .lock()
        .map(|ring| ring.tail(limit))
        .unwrap_or_default()
}

pub fn enabled(level: Level) -> bool {
    level <= Level::from_raw(MAX_LEVEL.load(Ordering::Relaxed))
}

pub fn enabled_for(level: Level, target: &str) -> bool {
    enabled(level) && level <= effective_level(target)
}

fn effective_level(target: &str) -> Level {
    let Ok(config) = settings().read() else {
        return Level::Info;
    };
    config
        .directives
        .iter()
        .filter(|directive| directive.matches(target))
        .max_by_key(|directive| directive.target.len())
        .map_or(config.level, |directive| directive.level)
}

fn output_style() -> (Format, bool) {
    settings()
        .read()
        .map(|config| (config.format, config.timestamps))
        .unwrap_or((Format::Text, true))
}

pub fn log(
    level: Level,
    target: &'static str,
    file: &'static str,
    line: u32,
    args: fmt::Arguments<'_>,
) {
    if !enabled_for(level, target) {
        return;
    }

    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let ts_ms = u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX);
    let msg = args.to_string();

    if STDERR.load(Ordering::Relaxed) {
        let (format, timestamps) = output_style();
        let rendered = match format {
            Format::Text => {
                let prefix = if timestamps {
                    format!("{} ", UtcTime(since_epoch))
                } else {
                    String::new()
                };
                format!("{prefix}{level} {target}: {msg}")
            }
            Format::Json => json!({
                "ts_ms": ts_ms,
                "level": level.as_str(),
                "target": target,
                "file": file,
                "line": line,
                "msg": msg,
            })
            .to_string(),
        };
        let _ = writeln!(io::stderr().lock(), "{rendered}");
    }

    if CAPTURING.load(Ordering::Relaxed) {
        if let Ok(mut ring) = capture_ring().lock() {
            ring.push(CapturedLog {
                ts_ms,
                level,
                target,
                file,
                line,
                msg,
            });
        }
    }
}

#[macro_export]
macro_rules! log_at {
    ($level:expr, $($arg:tt)*) => {{
        if $crate::enabled($level) {
            $crate::log($level, module_path!(), file!(), line!(), format_args!($($arg)*));
        }
    }};
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Error, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Warn, $($arg)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Info, $($arg)*) };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Debug, $($arg)*) };
}

#[macro_export]
macro_rules! log_trace {
    ($($arg:tt)*) => { $crate::log_at!($crate::Level::Trace, $($arg)*) };
}

/// RFC 3339 UTC rendering with millisecond precision.
struct UtcTime(Duration);

impl fmt::Display for UtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        let (year, month, day) = civil_date(secs / 86_400);
        let clock = secs % 86_400;
        write!(
            f,
            "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{:03}Z",
            clock / 3600,
            clock / 60 % 60,
            clock % 60,
            self.0.subsec_millis()
        )
    }
}

/// Gregorian date for a day count since 1970-01-01 (days-from-civil inverse).
fn civil_date(days: u64) -> (u64, u64, u64) {
    let shifted = days + 719_468;
    let era = shifted / 146_097;
    let day_of_era = shifted % 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let month_index = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * month_index + 2) / 5 + 1;
    let month = if month_index < 10 {
        month_index + 3
    } else {
        month_index - 9
    };
    let year = era * 400 + year_of_era + u64::from(month <= 2);
    (year, month, day)
}
