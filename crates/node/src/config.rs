//! Daemon configuration: `cropd.conf` plus `-key=value` command-line flags.
//!
//! The file is read first; flags given on the command line replace file values
//! for the same key. Keys are case-insensitive and share one namespace, so
//! `testnet=1` in the file and `-testnet` on the command line mean the same.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cropd_consensus::{ConfigurationError, Network};
use cropd_log::{self as logging, Directive, Format, Level};
use cropd_masternode::ElectionConfig;
use thiserror::Error;

pub const DEFAULT_CONF_FILE: &str = "cropd.conf";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_STATUS_INTERVAL_SECS: u64 = 300;

const KNOWN_KEYS: &[&str] = &[
    "conf",
    "testnet",
    "network",
    "loglevel",
    "logformat",
    "logtimestamps",
    "sweepinterval",
    "statusinterval",
    "cooldownpercent",
    "scoreoffset",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),
    #[error("unknown option '{0}'")]
    UnknownOption(String),
    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },
    #[error("config file {} not found", .0.display())]
    MissingConf(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Network(#[from] ConfigurationError),
}

#[derive(Clone, Debug)]
pub struct Config {
    pub network: Network,
    pub conf_path: PathBuf,
    pub log_level: Level,
    pub log_format: Format,
    pub log_timestamps: bool,
    pub log_directives: Vec<Directive>,
    pub sweep_interval_secs: u64,
    pub status_interval_secs: u64,
    pub election: ElectionConfig,
    /// File keys this daemon does not understand; reported once logging is up.
    pub ignored_keys: Vec<String>,
}

#[derive(Debug)]
pub enum CliAction {
    PrintHelp,
    PrintVersion,
    Run(Config),
}

pub fn parse_args() -> Result<CliAction, ConfigError> {
    parse_args_from(std::env::args().skip(1))
}

pub fn parse_args_from<I>(raw_args: I) -> Result<CliAction, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let mut flags: Vec<(String, String)> = Vec::new();
    for arg in raw_args {
        match arg.as_str() {
            "help" | "-h" | "-help" | "--help" | "-?" => return Ok(CliAction::PrintHelp),
            "version" | "-V" | "-version" | "--version" => return Ok(CliAction::PrintVersion),
            _ => {}
        }
        let Some(flag) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
            return Err(ConfigError::UnexpectedArgument(arg));
        };
        let (key, value) = match flag.split_once('=') {
            Some((key, value)) => (key.trim().to_ascii_lowercase(), value.trim().to_string()),
            None => (flag.trim().to_ascii_lowercase(), "1".to_string()),
        };
        if !KNOWN_KEYS.contains(&key.as_str()) {
            return Err(ConfigError::UnknownOption(arg));
        }
        flags.push((key, value));
    }

    let explicit_conf = flags
        .iter()
        .rev()
        .find(|(key, _)| key == "conf")
        .map(|(_, value)| PathBuf::from(value));
    let conf_path = explicit_conf
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONF_FILE));
    let mut settings = match load_conf(&conf_path)? {
        Some(settings) => settings,
        None if explicit_conf.is_some() => return Err(ConfigError::MissingConf(conf_path)),
        None => HashMap::new(),
    };
    for (key, value) in flags {
        settings.insert(key, value);
    }

    Config::from_settings(&settings, conf_path).map(CliAction::Run)
}

/// Reads a config file; `Ok(None)` when it does not exist.
pub fn load_conf(path: &Path) -> Result<Option<HashMap<String, String>>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(parse_conf(&contents))),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// `key=value` lines; `#` starts a comment and a bare key means `key=1`.
/// Later lines override earlier ones.
pub fn parse_conf(contents: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for raw_line in contents.lines() {
        let line = match raw_line.find('#') {
            Some(idx) => &raw_line[..idx],
            None => raw_line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = match line.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => (line, "1"),
        };
        if key.is_empty() {
            continue;
        }
        out.insert(key.to_ascii_lowercase(), value.to_string());
    }
    out
}

impl Config {
    pub fn from_settings(
        settings: &HashMap<String, String>,
        conf_path: PathBuf,
    ) -> Result<Self, ConfigError> {
        let mut network = Network::Mainnet;
        if let Some(value) = settings.get("network") {
            network = Network::from_name(value)?;
        }
        if let Some(value) = settings.get("testnet") {
            if parse_bool("testnet", value)? {
                network = Network::Testnet;
            }
        }

        let mut log_level = Level::Info;
        let mut log_directives = Vec::new();
        if let Some(value) = settings.get("loglevel") {
            let (level, directives) =
                logging::parse_filter(value).map_err(|_| invalid("loglevel", value))?;
            log_level = level.unwrap_or(Level::Info);
            log_directives = directives;
        }

        let log_format = match settings.get("logformat") {
            Some(value) => Format::parse(value).ok_or_else(|| invalid("logformat", value))?,
            None => Format::Text,
        };
        let log_timestamps = match settings.get("logtimestamps") {
            Some(value) => parse_bool("logtimestamps", value)?,
            None => true,
        };

        let sweep_interval_secs =
            parse_positive(settings, "sweepinterval", DEFAULT_SWEEP_INTERVAL_SECS)?;
        let status_interval_secs =
            parse_positive(settings, "statusinterval", DEFAULT_STATUS_INTERVAL_SECS)?;

        let mut election = ElectionConfig::default();
        if let Some(value) = settings.get("cooldownpercent") {
            election.cooldown_percent = value
                .parse::<u32>()
                .map_err(|_| invalid("cooldownpercent", value))?;
        }
        if let Some(value) = settings.get("scoreoffset") {
            election.score_offset = value
                .parse::<i32>()
                .ok()
                .filter(|offset| *offset >= 1)
                .ok_or_else(|| invalid("scoreoffset", value))?;
        }

        let mut ignored_keys: Vec<String> = settings
            .keys()
            .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
            .cloned()
            .collect();
        ignored_keys.sort();

        Ok(Self {
            network,
            conf_path,
            log_level,
            log_format,
            log_timestamps,
            log_directives,
            sweep_interval_secs,
            status_interval_secs,
            election,
            ignored_keys,
        })
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn parse_positive(
    settings: &HashMap<String, String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match settings.get(key) {
        Some(value) => value
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| invalid(key, value)),
        None => Ok(default),
    }
}

pub fn usage() -> String {
    [
        "Usage:",
        "  cropd [options]",
        "",
        "Commands:",
        "  help     Print this help and exit",
        "  version  Print version and exit",
        "",
        "Options (also accepted as key=value in cropd.conf):",
        "  -conf=<path>             Config file (default: ./cropd.conf)",
        "  -testnet                 Use the test network",
        "  -network=<main|test>     Select the network by name",
        "  -loglevel=<filter>       Level and per-target directives, e.g. info,cropd_masternode=debug",
        "  -logformat=<text|json>   Log line format (default: text)",
        "  -logtimestamps=<0|1>     Prefix log lines with a timestamp (default: 1)",
        "  -sweepinterval=<secs>    Seconds between registry sweeps (default: 60)",
        "  -statusinterval=<secs>   Seconds between status lines (default: 300)",
        "  -cooldownpercent=<n>     Payment cooldown as a percent of the tier size (default: 100)",
        "  -scoreoffset=<blocks>    Depth of the block hash seeding the election, at least 1 (default: 100)",
    ]
    .join("\n")
}
