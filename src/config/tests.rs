use super::*;

use crate::domain::options::{Dimension, Layout, LengthUnit, Media, PaperFormat, PrintOptions};

#[test]
fn defaults_are_applied() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr, "0.0.0.0:8080".parse().expect("addr"));
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert_eq!(settings.server.cors_allowed_origin, "*");
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.render.settle_delay, Duration::from_millis(1_000));
    assert_eq!(settings.render.navigation_timeout, Duration::from_secs(30));
    assert_eq!(settings.render.job_timeout, Duration::from_secs(120));
    assert_eq!(settings.render.max_concurrent_pages.get(), 4);
    assert!(settings.render.headless);
    assert!(settings.storage.base.is_none());
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());
    raw.storage.base = Some("s3://from-file/".to_string());

    let cli = CliArgs::parse_from([
        "webprint",
        "--log-level",
        "debug",
        "--base",
        "s3://from-cli/reports",
        "server",
        "--port",
        "4321",
    ]);

    raw.apply_cli_overrides(&cli);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    let base = settings.storage.base.expect("base configured");
    assert_eq!(base.host_str(), Some("from-cli"));
    assert_eq!(base.path(), "/reports");
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let cli = CliArgs::parse_from(["webprint", "--log-json", "true"]);

    raw.apply_cli_overrides(&cli);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn invalid_base_is_rejected() {
    let mut raw = RawSettings::default();
    raw.storage.base = Some("https://bucket/".to_string());

    let err = Settings::from_raw(raw).expect_err("non-s3 base rejected");
    assert!(matches!(err, LoadError::Invalid { key: "storage.base", .. }));
}

#[test]
fn zero_concurrency_is_rejected() {
    let mut raw = RawSettings::default();
    raw.render.max_concurrent_pages = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero pages rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.max_concurrent_pages",
            ..
        }
    ));
}

#[test]
fn job_timeout_must_outlast_navigation() {
    let mut raw = RawSettings::default();
    raw.render.navigation_timeout_seconds = Some(60);
    raw.render.job_timeout_seconds = Some(30);

    let err = Settings::from_raw(raw).expect_err("short job timeout rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "render.job_timeout_seconds",
            ..
        }
    ));
}

#[test]
fn blank_values_fall_back_to_defaults() {
    let mut raw = RawSettings::default();
    raw.server.cors_allowed_origin = Some("  ".to_string());
    raw.storage.region = Some(String::new());
    raw.render.chrome_args = Some(vec!["--disable-gpu".to_string(), " ".to_string()]);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.server.cors_allowed_origin, "*");
    assert!(settings.storage.region.is_none());
    assert_eq!(settings.render.chrome_args, vec!["--disable-gpu".to_string()]);
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["webprint"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(ServeArgs::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn server_command_accepts_port() {
    for name in ["server", "serve"] {
        let args = CliArgs::try_parse_from(["webprint", name, "--port", "9000"])
            .expect("server command parses");
        match args.command {
            Some(Command::Serve(serve)) => assert_eq!(serve.port, Some(9000)),
            other => panic!("{name}: unexpected command {other:?}"),
        }
    }
}

#[test]
fn parse_print_arguments() {
    let args = CliArgs::parse_from([
        "webprint",
        "print",
        "https://example.com",
        "report.pdf",
        "--media",
        "screen",
        "--format",
        "Tabload",
        "--layout",
        "landscape",
        "--background",
        "false",
        "--scale",
        "0.8",
        "--margin-top",
        "1cm",
        "--base",
        "s3://bucket/",
    ]);

    assert_eq!(args.base.as_deref(), Some("s3://bucket/"));
    match args.command.expect("print command") {
        Command::Print(print) => {
            assert_eq!(print.source, "https://example.com");
            assert_eq!(print.file_name, "report.pdf");

            let options = print.options.into_options();
            assert_eq!(options.media, Media::Screen);
            assert_eq!(options.format, PaperFormat::Tabloid);
            assert_eq!(options.layout, Layout::Landscape);
            assert!(!options.background);
            assert_eq!(options.scale, 0.8);
            let margin = options.margin.expect("margin set");
            assert_eq!(margin.top, Some(Dimension::new(1.0, LengthUnit::Cm)));
            assert_eq!(margin.left, None);
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn print_without_flags_uses_default_options() {
    let args = CliArgs::parse_from(["webprint", "print", "https://example.com", "a.pdf"]);

    match args.command.expect("print command") {
        Command::Print(print) => {
            assert_eq!(print.options.into_options(), PrintOptions::default());
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn unknown_format_is_a_parse_error() {
    let result = CliArgs::try_parse_from([
        "webprint",
        "print",
        "https://example.com",
        "a.pdf",
        "--format",
        "B5",
    ]);
    assert!(result.is_err());
}

#[test]
fn config_file_is_layered_under_cli_flags() {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    writeln!(
        file,
        r#"
[server]
port = 9000
cors_allowed_origin = "https://app.example.com"

[render]
settle_delay_ms = 250
chrome_args = ["--disable-gpu"]

[storage]
base = "s3://file-bucket/exports"
"#
    )
    .expect("write config");

    let path = file.path().to_string_lossy().into_owned();
    let cli = CliArgs::parse_from([
        "webprint",
        "--config-file",
        path.as_str(),
        "server",
        "--port",
        "9100",
    ]);
    let settings = load(&cli).expect("settings load");

    assert_eq!(settings.server.addr.port(), 9100);
    assert_eq!(settings.server.cors_allowed_origin, "https://app.example.com");
    assert_eq!(settings.render.settle_delay, Duration::from_millis(250));
    assert_eq!(settings.render.chrome_args, vec!["--disable-gpu".to_string()]);
    let base = settings.storage.base.expect("base from file");
    assert_eq!(base.host_str(), Some("file-bucket"));
}
