//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::toc::{DEFAULT_ACTIVATION_DELAYS_MS, DEFAULT_SCAN_DELAYS_MS};
use crate::domain::headings::HeadingLevel;
use crate::infra::document::LayoutSettings;

pub use cli::{CliArgs, Command, RenderArgs, SimulateArgs, TocOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "tocsync";
const ENV_PREFIX: &str = "TOCSYNC";
const DEFAULT_THRESHOLD_RATIO: f64 = 0.3;
const DEFAULT_BOTTOM_TOLERANCE_PX: f64 = 100.0;
const DEFAULT_HEADER_OFFSET_PX: f64 = 80.0;
const DEFAULT_SUPPRESSION_MS: u64 = 1_000;
const DEFAULT_SCROLL_THROTTLE_MS: u64 = 16;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub toc: TocSettings,
    pub layout: LayoutSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TocSettings {
    pub max_level: HeadingLevel,
    pub threshold_ratio: f64,
    pub bottom_tolerance_px: f64,
    pub header_offset_px: f64,
    pub suppression_window: Duration,
    pub scroll_throttle: Duration,
    pub scan_delays: Vec<Duration>,
    pub activation_delays: Vec<Duration>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(environment());

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match &cli.command {
        Command::Render(args) => raw.apply_overrides(&args.overrides),
        Command::Simulate(args) => raw.apply_overrides(&args.overrides),
    }

    Settings::from_raw(raw)
}

/// Reads `TOCSYNC__SECTION__KEY` variables. Delay schedules are comma-separated.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("toc.scan_delays_ms")
        .with_list_parse_key("toc.activation_delays_ms")
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    toc: RawTocSettings,
    layout: RawLayoutSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &TocOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(max_level) = overrides.max_level {
            self.toc.max_level = Some(max_level);
        }
        if let Some(ratio) = overrides.threshold_ratio {
            self.toc.threshold_ratio = Some(ratio);
        }
        if let Some(offset) = overrides.header_offset_px {
            self.toc.header_offset_px = Some(offset);
        }
        if let Some(ms) = overrides.suppression_ms {
            self.toc.suppression_ms = Some(ms);
        }
        if let Some(height) = overrides.viewport_height {
            self.layout.viewport_height = Some(height);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            toc,
            layout,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let toc = build_toc_settings(toc)?;
        let layout = build_layout_settings(layout)?;

        Ok(Self {
            logging,
            toc,
            layout,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_toc_settings(toc: RawTocSettings) -> Result<TocSettings, LoadError> {
    let max_level = match toc.max_level {
        Some(level) => HeadingLevel::new(level)
            .map_err(|err| LoadError::invalid("toc.max_level", err.to_string()))?,
        None => HeadingLevel::DEEPEST,
    };

    let threshold_ratio = toc.threshold_ratio.unwrap_or(DEFAULT_THRESHOLD_RATIO);
    if !(0.0..=1.0).contains(&threshold_ratio) {
        return Err(LoadError::invalid(
            "toc.threshold_ratio",
            "must lie between 0 and 1",
        ));
    }

    let bottom_tolerance_px = non_negative(
        toc.bottom_tolerance_px
            .unwrap_or(DEFAULT_BOTTOM_TOLERANCE_PX),
        "toc.bottom_tolerance_px",
    )?;
    let header_offset_px = non_negative(
        toc.header_offset_px.unwrap_or(DEFAULT_HEADER_OFFSET_PX),
        "toc.header_offset_px",
    )?;

    let scan_delays = toc
        .scan_delays_ms
        .unwrap_or_else(|| DEFAULT_SCAN_DELAYS_MS.to_vec());
    let activation_delays = toc
        .activation_delays_ms
        .unwrap_or_else(|| DEFAULT_ACTIVATION_DELAYS_MS.to_vec());

    Ok(TocSettings {
        max_level,
        threshold_ratio,
        bottom_tolerance_px,
        header_offset_px,
        suppression_window: Duration::from_millis(
            toc.suppression_ms.unwrap_or(DEFAULT_SUPPRESSION_MS),
        ),
        scroll_throttle: Duration::from_millis(
            toc.scroll_throttle_ms.unwrap_or(DEFAULT_SCROLL_THROTTLE_MS),
        ),
        scan_delays: scan_delays.into_iter().map(Duration::from_millis).collect(),
        activation_delays: activation_delays
            .into_iter()
            .map(Duration::from_millis)
            .collect(),
    })
}

fn build_layout_settings(layout: RawLayoutSettings) -> Result<LayoutSettings, LoadError> {
    let defaults = LayoutSettings::default();

    let viewport_height = positive(
        layout.viewport_height.unwrap_or(defaults.viewport_height),
        "layout.viewport_height",
    )?;
    let line_height = positive(
        layout.line_height.unwrap_or(defaults.line_height),
        "layout.line_height",
    )?;
    let chars_per_line = layout.chars_per_line.unwrap_or(defaults.chars_per_line);
    if chars_per_line == 0 {
        return Err(LoadError::invalid(
            "layout.chars_per_line",
            "must be greater than zero",
        ));
    }
    let block_margin = non_negative(
        layout.block_margin.unwrap_or(defaults.block_margin),
        "layout.block_margin",
    )?;
    let image_height = non_negative(
        layout.image_height.unwrap_or(defaults.image_height),
        "layout.image_height",
    )?;

    Ok(LayoutSettings {
        viewport_height,
        line_height,
        chars_per_line,
        block_margin,
        image_height,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTocSettings {
    max_level: Option<u8>,
    threshold_ratio: Option<f64>,
    bottom_tolerance_px: Option<f64>,
    header_offset_px: Option<f64>,
    suppression_ms: Option<u64>,
    scroll_throttle_ms: Option<u64>,
    scan_delays_ms: Option<Vec<u64>>,
    activation_delays_ms: Option<Vec<u64>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLayoutSettings {
    viewport_height: Option<f64>,
    line_height: Option<f64>,
    chars_per_line: Option<usize>,
    block_margin: Option<f64>,
    image_height: Option<f64>,
}

fn non_negative(value: f64, key: &'static str) -> Result<f64, LoadError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(LoadError::invalid(key, "must be a non-negative number"))
    }
}

fn positive(value: f64, key: &'static str) -> Result<f64, LoadError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(LoadError::invalid(key, "must be greater than zero"))
    }
}
