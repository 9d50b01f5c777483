use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

use crate::domain::options::{Dimension, Layout, Margin, Media, PaperFormat, PrintOptions};

/// Command-line arguments for the webprint binary.
#[derive(Debug, Parser)]
#[command(
    name = "webprint",
    version,
    about = "Print web pages to PDF and store them in S3"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "WEBPRINT_CONFIG_FILE",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub config_file: Option<PathBuf>,

    /// Destination S3 base URL, e.g. `s3://bucket/prefix?region=eu-west-1`.
    #[arg(long = "base", env = "WEBPRINT_BASE", value_name = "S3_URL", global = true)]
    pub base: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print a URL to PDF, store it and write the resulting URL to stdout.
    Print(Box<PrintArgs>),
    /// Run the HTTP print server.
    #[command(name = "server", alias = "serve")]
    Serve(ServeArgs),
}

#[derive(Debug, Args, Clone)]
pub struct PrintArgs {
    /// The source URL to print.
    #[arg(value_name = "SOURCE", value_hint = ValueHint::Url)]
    pub source: String,

    /// The destination file name.
    #[arg(value_name = "FILE_NAME")]
    pub file_name: String,

    #[command(flatten)]
    pub options: PrintOptionArgs,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PrintOptionArgs {
    /// Media type emulated while printing (print|screen).
    #[arg(long, value_name = "MEDIA")]
    pub media: Option<Media>,

    /// Paper format (Letter|Legal|Tabloid|Ledger|A0..A5).
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<PaperFormat>,

    /// Print background graphics.
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub background: Option<bool>,

    /// Page orientation (portrait|landscape).
    #[arg(long, value_name = "LAYOUT")]
    pub layout: Option<Layout>,

    /// Rendering scale factor.
    #[arg(long, value_name = "FACTOR")]
    pub scale: Option<f64>,

    /// Top margin, e.g. `10px`, `1cm`, `0.5in`.
    #[arg(long = "margin-top", value_name = "LENGTH")]
    pub margin_top: Option<Dimension>,

    /// Bottom margin.
    #[arg(long = "margin-bottom", value_name = "LENGTH")]
    pub margin_bottom: Option<Dimension>,

    /// Left margin.
    #[arg(long = "margin-left", value_name = "LENGTH")]
    pub margin_left: Option<Dimension>,

    /// Right margin.
    #[arg(long = "margin-right", value_name = "LENGTH")]
    pub margin_right: Option<Dimension>,
}

impl PrintOptionArgs {
    /// Merge the supplied flags over the default print options.
    pub fn into_options(self) -> PrintOptions {
        let defaults = PrintOptions::default();
        let margin = Margin {
            top: self.margin_top,
            bottom: self.margin_bottom,
            left: self.margin_left,
            right: self.margin_right,
        };
        let has_margin = margin != Margin::default();

        PrintOptions {
            media: self.media.unwrap_or(defaults.media),
            format: self.format.unwrap_or(defaults.format),
            background: self.background.unwrap_or(defaults.background),
            layout: self.layout.unwrap_or(defaults.layout),
            margin: has_margin.then_some(margin),
            scale: self.scale.unwrap_or(defaults.scale),
        }
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    /// Override the listener host.
    #[arg(long = "host", value_name = "HOST")]
    pub host: Option<String>,

    /// Override the listener port.
    #[arg(long = "port", env = "PORT", value_name = "PORT")]
    pub port: Option<u16>,
}
