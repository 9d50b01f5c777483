use std::{process, sync::Arc};

use axum::http::HeaderValue;
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use url::Url;
use webprint::{
    application::{
        error::AppError,
        print::{
            ArtifactStore, LaunchOptions, PageRenderer, PoolSettings, PrintPipeline, RenderPool,
            RendererSettings,
        },
    },
    config::{self, Command, PrintArgs, ServeArgs, Settings},
    domain::address::AddressBuilder,
    infra::{
        chrome::ChromeEngine,
        error::InfraError,
        http::{self, HttpState},
        s3::S3ObjectStore,
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(Command::Serve(ServeArgs::default()));

    telemetry::init(&settings.logging)?;

    let base = require_base(&settings)?;
    let pipeline = Arc::new(build_pipeline(&settings).await);

    let outcome = match command {
        Command::Print(args) => print_once(&pipeline, &base, *args).await,
        Command::Serve(_) => serve_http(&settings, Arc::clone(&pipeline), base).await,
    };

    pipeline.pool().shutdown().await;
    outcome
}

fn require_base(settings: &Settings) -> Result<Url, AppError> {
    settings.storage.base.clone().ok_or_else(|| {
        AppError::validation(
            "a destination base is required: pass --base, set WEBPRINT_BASE or storage.base",
        )
    })
}

async fn build_pipeline(settings: &Settings) -> PrintPipeline {
    let render = &settings.render;
    let pool = RenderPool::new(
        Arc::new(ChromeEngine::new()),
        PoolSettings {
            launch: LaunchOptions {
                executable: render.chrome_executable.clone(),
                args: render.chrome_args.clone(),
                headless: render.headless,
                request_timeout: Some(render.navigation_timeout),
            },
            max_concurrent_pages: render.max_concurrent_pages.get(),
        },
    );
    let renderer = PageRenderer::new(RendererSettings {
        settle_delay: render.settle_delay,
        navigation_timeout: render.navigation_timeout,
    });
    let store = ArtifactStore::new(Arc::new(
        S3ObjectStore::from_settings(&settings.storage).await,
    ));

    PrintPipeline::new(
        Arc::new(pool),
        renderer,
        AddressBuilder::new(settings.storage.regions.clone()),
        store,
    )
}

async fn print_once(pipeline: &PrintPipeline, base: &Url, args: PrintArgs) -> Result<(), AppError> {
    let PrintArgs {
        source,
        file_name,
        options,
    } = args;
    let url = pipeline
        .print(&source, base, &file_name, options.into_options())
        .await?;
    println!("{url}");
    Ok(())
}

async fn serve_http(
    settings: &Settings,
    pipeline: Arc<PrintPipeline>,
    base: Url,
) -> Result<(), AppError> {
    let cors_allowed_origin = HeaderValue::from_str(&settings.server.cors_allowed_origin)
        .map_err(|err| {
            InfraError::configuration(format!("invalid server.cors_allowed_origin: {err}"))
        })?;
    let router = http::build_router(HttpState {
        pipeline,
        base,
        cors_allowed_origin,
        job_timeout: settings.render.job_timeout,
    });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "webprint::server",
        addr = %settings.server.addr,
        "HTTP server listening"
    );

    let (signalled_tx, mut signalled_rx) = watch::channel(false);
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(true);
        },
    );
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => return server_outcome(joined),
        _ = signalled_rx.wait_for(|signalled| *signalled) => {}
    }

    let grace = settings.server.graceful_shutdown;
    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!(
                target = "webprint::server",
                timeout_ms = grace.as_millis() as u64,
                "In-flight requests did not drain before the shutdown deadline"
            );
            server.abort();
            Ok(())
        }
    }
}

fn server_outcome(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(target = "webprint::server", error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(target = "webprint::server", error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!(target = "webprint::server", "Shutdown signal received; draining requests");
}
