use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the tocsync binary.
#[derive(Debug, Parser)]
#[command(
    name = "tocsync",
    version,
    about = "Render markdown articles and keep their table of contents in sync"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TOCSYNC_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a markdown file and print its headings and content metrics.
    Render(RenderArgs),
    /// Mount a rendered article headlessly and replay scroll and activation
    /// events against the table of contents.
    Simulate(SimulateArgs),
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Markdown source to render.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Print the table-of-contents markup instead of the JSON summary.
    #[arg(long = "toc-html", action = clap::ArgAction::SetTrue)]
    pub toc_html: bool,

    #[command(flatten)]
    pub overrides: TocOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Markdown source to render and mount.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,

    /// Scroll positions to visit, in order. May be repeated.
    #[arg(long = "scroll", value_name = "PX", allow_negative_numbers = true)]
    pub scroll: Vec<f64>,

    /// Entry id to activate after the scroll positions were visited.
    #[arg(long = "activate", value_name = "ID")]
    pub activate: Option<String>,

    /// Delay before the mounted content reports headings, simulating a slow paint.
    #[arg(long = "render-delay-ms", value_name = "MILLISECONDS", default_value_t = 0)]
    pub render_delay_ms: u64,

    #[command(flatten)]
    pub overrides: TocOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct TocOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Deepest heading level to include (1-6).
    #[arg(long = "toc-max-level", value_name = "LEVEL")]
    pub max_level: Option<u8>,

    /// Fraction of the viewport height where the reading line sits.
    #[arg(long = "toc-threshold-ratio", value_name = "RATIO")]
    pub threshold_ratio: Option<f64>,

    /// Height of the fixed header that activations scroll past.
    #[arg(long = "toc-header-offset", value_name = "PX")]
    pub header_offset_px: Option<f64>,

    /// How long scroll tracking stays muted after an activation.
    #[arg(long = "toc-suppression-ms", value_name = "MILLISECONDS")]
    pub suppression_ms: Option<u64>,

    /// Viewport height used by the headless layout.
    #[arg(long = "layout-viewport-height", value_name = "PX")]
    pub viewport_height: Option<f64>,
}
