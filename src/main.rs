use std::{
    io::{self, Write},
    process,
    sync::Arc,
};

use marginalia::{
    application::{
        error::AppError,
        router::RequestRouter,
        site::{SiteParts, build_site},
    },
    config,
    infra::{
        assets::DiskAssetStore,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

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

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    let router = build_request_router(&settings).await?;

    match command {
        config::Command::Serve(_) => serve_http(&settings, router).await,
        config::Command::Render(args) => render_once(&router, &args.path).await,
    }
}

async fn build_request_router(settings: &config::Settings) -> Result<Arc<RequestRouter>, AppError> {
    let assets = Arc::new(DiskAssetStore::new(settings.assets.directory.clone()));
    let router = build_site(settings, SiteParts::new(assets)).await?;
    Ok(Arc::new(router))
}

async fn serve_http(
    settings: &config::Settings,
    router: Arc<RequestRouter>,
) -> Result<(), AppError> {
    let app = http::build_router(HttpState { router });

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "marginalia::server",
        addr = %settings.server.addr,
        "Listening"
    );

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn render_once(router: &RequestRouter, path: &str) -> Result<(), AppError> {
    let response = router.handle_request(path).await;
    info!(
        target = "marginalia::render",
        path,
        status = response.status.as_u16(),
        content_type = %response.content_type,
        "Rendered request"
    );

    let mut stdout = io::stdout().lock();
    stdout
        .write_all(&response.body)
        .and_then(|()| stdout.flush())
        .map_err(|err| AppError::from(InfraError::from(err)))
}
