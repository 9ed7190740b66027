use std::{io::Write, net::SocketAddr, process, time::Duration};

use bulletin::{
    application::error::{AppError, error_chain},
    bootstrap::AppContext,
    config::{self, FetchArgs},
    infra::{error::InfraError, http, telemetry},
};
use tokio::{net::TcpListener, signal, sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let chain = error_chain(error);
    if dispatcher::has_been_set() {
        error!(error = %error, chain = ?chain, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, chain = ?chain, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    match cli_args.command.unwrap_or(config::Command::Serve) {
        config::Command::Serve => run_serve(settings).await,
        config::Command::Fetch(args) => run_fetch(settings, args).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let context = AppContext::from_settings(&settings);
    context.start(settings.cache.warm_on_startup).await;

    let public_router = http::build_router(context.http_state());
    let admin_router = http::build_admin_router(context.admin_state());

    let public_listener = bind("public", settings.server.public_addr).await?;
    let admin_listener = bind("admin", settings.server.admin_addr).await?;

    info!(
        target = "bulletin::server",
        public_addr = %settings.server.public_addr,
        admin_addr = %settings.server.admin_addr,
        "Listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for(shutdown_rx));

    let servers = async {
        try_join!(public_server.into_future(), admin_server.into_future())
            .map(|_| ())
            .map_err(|err| AppError::unexpected(format!("server error: {err}")))
    };
    tokio::pin!(servers);

    tokio::select! {
        result = &mut servers => return result,
        _ = shutdown_signal() => {
            let _ = shutdown_tx.send(true);
        }
    }

    drain(servers, settings.server.graceful_shutdown).await
}

async fn bind(listener: &'static str, addr: SocketAddr) -> Result<TcpListener, AppError> {
    TcpListener::bind(addr)
        .await
        .map_err(|err| InfraError::bind(listener, addr, err).into())
}

async fn drain(
    servers: impl Future<Output = Result<(), AppError>>,
    grace: Duration,
) -> Result<(), AppError> {
    match tokio::time::timeout(grace, servers).await {
        Ok(result) => {
            info!(target = "bulletin::server", "Shutdown complete");
            result
        }
        Err(_) => {
            warn!(
                target = "bulletin::server",
                grace_seconds = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(target = "bulletin::server", error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(target = "bulletin::server", error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!(target = "bulletin::server", "Received Ctrl+C, shutting down"),
        _ = terminate => info!(target = "bulletin::server", "Received SIGTERM, shutting down"),
    }
}

async fn run_fetch(settings: config::Settings, args: FetchArgs) -> Result<(), AppError> {
    let context = AppContext::from_settings(&settings);
    let document = context.content.get(args.key).await;

    let rendered = if args.pretty {
        serde_json::to_string_pretty(document.as_ref())
    } else {
        serde_json::to_string(document.as_ref())
    }
    .map_err(|err| AppError::unexpected(format!("failed to encode document: {err}")))?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}").map_err(|err| AppError::from(InfraError::from(err)))?;
    Ok(())
}
