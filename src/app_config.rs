//! Application configuration loading for CLI defaults.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use exporter_core::EngineConfig;

use crate::cli::Args;

/// TOML-backed file configuration for exporter defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    /// Conversion Service base URL.
    pub base_url: Option<String>,
    /// Default directory for downloaded artifacts.
    pub output_dir: Option<PathBuf>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: Option<u64>,
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// Attempts per request, including the first.
    pub max_attempts: Option<u32>,
    /// Base delay of the linear retry backoff in milliseconds.
    pub retry_base_delay_ms: Option<u64>,
    /// Delay between status checks in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Consecutive poll errors tolerated before giving up.
    pub poll_max_errors: Option<u32>,
    /// How long fetched capabilities stay fresh, in seconds.
    pub capabilities_ttl_secs: Option<u64>,
    /// Default verbosity mode.
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        validate_range("request_timeout_secs", self.request_timeout_secs, 1..=3600)?;
        validate_range("connect_timeout_secs", self.connect_timeout_secs, 1..=3600)?;
        validate_range("max_attempts", self.max_attempts.map(u64::from), 1..=10)?;
        validate_range("retry_base_delay_ms", self.retry_base_delay_ms, 0..=3_600_000)?;
        validate_range("poll_interval_ms", self.poll_interval_ms, 1..=3_600_000)?;
        validate_range("poll_max_errors", self.poll_max_errors.map(u64::from), 1..=100)?;
        validate_range("capabilities_ttl_secs", self.capabilities_ttl_secs, 0..=86_400)?;
        Ok(())
    }
}

fn validate_range(
    field: &str,
    value: Option<u64>,
    range: std::ops::RangeInclusive<u64>,
) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !range.contains(&value) {
        bail!(
            "Invalid config value for `{field}`: {value}. Expected range: {}..={}",
            range.start(),
            range.end()
        );
    }
    Ok(())
}

/// Supported config verbosity labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Log filter used when neither `RUST_LOG` nor a CLI flag decides.
    #[must_use]
    pub fn log_level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

impl LoadedConfig {
    #[must_use]
    pub fn loaded_from_file(&self) -> bool {
        self.config.is_some()
    }

    /// Merges CLI flags over file values over library defaults.
    pub fn engine_config(&self, args: &Args) -> Result<EngineConfig> {
        let file = self.config.clone().unwrap_or_default();

        let mut config = match args.base_url.as_deref().or(file.base_url.as_deref()) {
            Some(url) => EngineConfig::new(url).context("Invalid Conversion Service base URL")?,
            None => EngineConfig::default(),
        };

        if let Some(dir) = args.output_dir.clone().or(file.output_dir) {
            config = config.with_output_dir(dir);
        }
        if let Some(secs) = args.timeout.or(file.request_timeout_secs) {
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = file.connect_timeout_secs {
            config = config.with_connect_timeout(Duration::from_secs(secs));
        }
        if let Some(attempts) = args.max_attempts.or(file.max_attempts) {
            config = config.with_max_attempts(attempts);
        }
        if let Some(ms) = file.retry_base_delay_ms {
            config = config.with_retry_base_delay(Duration::from_millis(ms));
        }
        if let Some(ms) = file.poll_interval_ms {
            config = config.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(errors) = file.poll_max_errors {
            config = config.with_poll_max_errors(errors);
        }
        if let Some(secs) = file.capabilities_ttl_secs {
            config = config.with_capabilities_ttl(Duration::from_secs(secs));
        }

        config.validate().context("Invalid exporter configuration")?;
        Ok(config)
    }

    /// Verbosity from the config file, if any.
    #[must_use]
    pub fn verbosity(&self) -> Option<VerbositySetting> {
        self.config.as_ref().and_then(|c| c.verbosity)
    }
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/exporter/config.toml`
/// 2. `$HOME/.config/exporter/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("exporter")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("exporter")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from default path if present.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line_no = line_index + 1;
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!("Invalid config syntax on line {line_no}: expected key = value");
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let invalid = || format!("Invalid `{key}` value on line {line_no}");

        match key {
            "base_url" => cfg.base_url = Some(parse_string_literal(value).with_context(invalid)?),
            "output_dir" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.output_dir = Some(PathBuf::from(parsed));
            }
            "request_timeout_secs" => {
                cfg.request_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "max_attempts" => cfg.max_attempts = Some(parse_integer_u32(value).with_context(invalid)?),
            "retry_base_delay_ms" => {
                cfg.retry_base_delay_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "poll_interval_ms" => {
                cfg.poll_interval_ms = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "poll_max_errors" => {
                cfg.poll_max_errors = Some(parse_integer_u32(value).with_context(invalid)?);
            }
            "capabilities_ttl_secs" => {
                cfg.capabilities_ttl_secs = Some(parse_integer_u64(value).with_context(invalid)?);
            }
            "verbosity" => {
                let parsed = parse_string_literal(value).with_context(invalid)?;
                cfg.verbosity = Some(parse_verbosity(&parsed).with_context(|| {
                    format!("Invalid `verbosity` value '{parsed}' on line {line_no}")
                })?);
            }
            unknown => {
                bail!("Unknown configuration key: '{unknown}' on line {line_no}");
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_integer_u32(raw_value: &str) -> Result<u32> {
    let value = parse_integer_u64(raw_value)?;
    u32::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u32"))
}

fn parse_verbosity(value: &str) -> Result<VerbositySetting> {
    match value {
        "default" => Ok(VerbositySetting::Default),
        "verbose" => Ok(VerbositySetting::Verbose),
        "quiet" => Ok(VerbositySetting::Quiet),
        "debug" => Ok(VerbositySetting::Debug),
        _ => bail!("Expected one of: default, verbose, quiet, debug"),
    }
}
