//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{CliArgs, Command, PrintArgs, PrintOptionArgs, ServeArgs};

use crate::domain::{address::RegionDefaults, job::parse_destination};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "webprint";
const ENV_PREFIX: &str = "WEBPRINT";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "*";
const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;
const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_JOB_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_CONCURRENT_PAGES: usize = 4;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub render: RenderSettings,
    pub storage: StorageSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
    pub cors_allowed_origin: String,
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

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub settle_delay: Duration,
    pub navigation_timeout: Duration,
    pub job_timeout: Duration,
    pub max_concurrent_pages: NonZeroUsize,
    pub chrome_executable: Option<PathBuf>,
    pub chrome_args: Vec<String>,
    pub headless: bool,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    /// Destination base used when a caller does not name one.
    pub base: Option<Url>,
    /// Client region override; the AWS provider chain decides otherwise.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible stores, addressed path-style.
    pub endpoint_url: Option<String>,
    pub regions: RegionDefaults,
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

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("render.chrome_args")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_cli_overrides(cli);

    let mut settings = Settings::from_raw(raw)?;
    settings.storage.regions = RegionDefaults::from_env();
    Ok(settings)
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
    server: RawServerSettings,
    logging: RawLoggingSettings,
    render: RawRenderSettings,
    storage: RawStorageSettings,
}

impl RawSettings {
    fn apply_cli_overrides(&mut self, cli: &CliArgs) {
        if let Some(base) = cli.base.as_ref() {
            self.storage.base = Some(base.clone());
        }
        if let Some(level) = cli.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = cli.log_json {
            self.logging.json = Some(json);
        }
        if let Some(Command::Serve(args)) = cli.command.as_ref() {
            self.apply_serve_overrides(args);
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeArgs) {
        if let Some(host) = overrides.host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.port {
            self.server.port = Some(port);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            render,
            storage,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let render = build_render_settings(render)?;
        let storage = build_storage_settings(storage)?;

        Ok(Self {
            server,
            logging,
            render,
            storage,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    let cors_allowed_origin = non_empty(server.cors_allowed_origin)
        .unwrap_or_else(|| DEFAULT_CORS_ALLOWED_ORIGIN.to_string());

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
        cors_allowed_origin,
    })
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

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let settle_delay =
        Duration::from_millis(render.settle_delay_ms.unwrap_or(DEFAULT_SETTLE_DELAY_MS));

    let navigation_secs = render
        .navigation_timeout_seconds
        .unwrap_or(DEFAULT_NAVIGATION_TIMEOUT_SECS);
    if navigation_secs == 0 {
        return Err(LoadError::invalid(
            "render.navigation_timeout_seconds",
            "must be greater than zero",
        ));
    }

    let job_secs = render.job_timeout_seconds.unwrap_or(DEFAULT_JOB_TIMEOUT_SECS);
    if job_secs == 0 {
        return Err(LoadError::invalid(
            "render.job_timeout_seconds",
            "must be greater than zero",
        ));
    }
    if job_secs <= navigation_secs {
        return Err(LoadError::invalid(
            "render.job_timeout_seconds",
            "must exceed render.navigation_timeout_seconds",
        ));
    }

    let max_concurrent_pages = NonZeroUsize::new(
        render
            .max_concurrent_pages
            .unwrap_or(DEFAULT_MAX_CONCURRENT_PAGES),
    )
    .ok_or_else(|| {
        LoadError::invalid("render.max_concurrent_pages", "must be greater than zero")
    })?;

    let chrome_executable = render
        .chrome_executable
        .filter(|path| !path.as_os_str().is_empty());

    let chrome_args = render
        .chrome_args
        .unwrap_or_default()
        .into_iter()
        .filter_map(|arg| non_empty(Some(arg)))
        .collect();

    Ok(RenderSettings {
        settle_delay,
        navigation_timeout: Duration::from_secs(navigation_secs),
        job_timeout: Duration::from_secs(job_secs),
        max_concurrent_pages,
        chrome_executable,
        chrome_args,
        headless: render.headless.unwrap_or(true),
    })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let base = non_empty(storage.base)
        .map(|raw| parse_destination(&raw))
        .transpose()
        .map_err(|err| LoadError::invalid("storage.base", err.to_string()))?;

    let endpoint_url = non_empty(storage.endpoint_url);
    if let Some(endpoint) = endpoint_url.as_deref() {
        Url::parse(endpoint).map_err(|err| {
            LoadError::invalid("storage.endpoint_url", format!("invalid URL: {err}"))
        })?;
    }

    Ok(StorageSettings {
        base,
        region: non_empty(storage.region),
        endpoint_url,
        regions: RegionDefaults::default(),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
    cors_allowed_origin: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    settle_delay_ms: Option<u64>,
    navigation_timeout_seconds: Option<u64>,
    job_timeout_seconds: Option<u64>,
    max_concurrent_pages: Option<usize>,
    chrome_executable: Option<PathBuf>,
    chrome_args: Option<Vec<String>>,
    headless: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    base: Option<String>,
    region: Option<String>,
    endpoint_url: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests;
