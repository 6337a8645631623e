// Copyright (c) 2026 Meridian Contributors. MIT License.
// See LICENSE for details.

//! # Meridian Ledger Server
//!
//! Entry point for the `meridian-server` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the store, and serves the
//! HTTP API.
//!
//! The binary supports four subcommands:
//!
//! - `run`     — start the ledger service
//! - `init`    — initialize the data directory and generate a token secret
//! - `status`  — query a running server's health endpoint
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use meridian_ledger::account::AccountService;
use meridian_ledger::auth::TokenService;
use meridian_ledger::store::LedgerDb;
use meridian_ledger::transfer::TransferEngine;

use cli::{Commands, MeridianCli};
use logging::LogFormat;
use metrics::ServiceMetrics;

/// File inside the data directory holding the token signing secret.
/// Written by `init` with owner-only permissions.
const TOKEN_SECRET_FILE: &str = "token.secret";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = MeridianCli::parse();

    match cli.command {
        Commands::Run(args) => run_server(args).await,
        Commands::Init(args) => init_data_dir(args),
        Commands::Status(args) => query_status(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the full service: API server and metrics endpoint.
async fn run_server(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "meridian_server=info,meridian_ledger=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting meridian-server"
    );

    // --- Token secret ---
    // Externally supplied: flag/env first, then the secret file written
    // by `init`. There is no compiled-in fallback.
    let secret = load_token_secret(&args)?;
    let tokens =
        TokenService::new(secret.as_bytes()).map_err(|e| anyhow::anyhow!("token secret: {e}"))?;

    // --- Persistent storage ---
    let db_path = args.data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create store directory: {}", db_path.display()))?;
    let db = Arc::new(
        LedgerDb::open(&db_path)
            .with_context(|| format!("failed to open store at {}", db_path.display()))?,
    );
    tracing::info!(
        path = %db_path.display(),
        accounts = db.account_count(),
        "store opened"
    );

    // --- Metrics ---
    let service_metrics = Arc::new(ServiceMetrics::new());

    // --- Application state ---
    let app_state = api::AppState {
        accounts: Arc::new(AccountService::new(Arc::clone(&db))),
        transfers: Arc::new(TransferEngine::new(Arc::clone(&db))),
        tokens: Arc::new(tokens),
        metrics: Arc::clone(&service_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&service_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    db.flush().context("final store flush failed")?;
    tracing::info!("meridian-server stopped");
    Ok(())
}

/// Resolves the token signing secret: flag/env first, then the secret
/// file in the data directory.
fn load_token_secret(args: &cli::RunArgs) -> Result<String> {
    if let Some(secret) = &args.token_secret {
        return Ok(secret.trim().to_string());
    }

    let path = args.data_dir.join(TOKEN_SECRET_FILE);
    let secret = std::fs::read_to_string(&path).with_context(|| {
        format!(
            "failed to read token secret from {} — set MERIDIAN_TOKEN_SECRET or run `meridian-server init` first",
            path.display()
        )
    })?;
    Ok(secret.trim().to_string())
}

/// Initializes a new data directory and generates a token secret.
fn init_data_dir(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("meridian_server=info", LogFormat::Pretty);

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing data directory");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let secret_path = data_dir.join(TOKEN_SECRET_FILE);
    if secret_path.exists() {
        println!("Already initialized.");
        println!("  Data directory : {}", data_dir.display());
        println!("  Token secret   : {} (kept)", secret_path.display());
        return Ok(());
    }

    // 32 random bytes, hex-encoded: 64 ASCII characters of secret.
    let secret_bytes: [u8; 32] = rand::random();
    std::fs::write(&secret_path, hex::encode(secret_bytes))
        .with_context(|| format!("failed to write token secret to {}", secret_path.display()))?;

    // Restrict permissions on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&secret_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(path = %secret_path.display(), "token secret generated");

    println!("Data directory initialized.");
    println!("  Data directory : {}", data_dir.display());
    println!("  Token secret   : {}", secret_path.display());

    Ok(())
}

/// Queries a running server's health endpoint and prints the body.
///
/// Raw HTTP/1.1 over a tokio TCP stream — not worth an HTTP client
/// dependency for one GET.
async fn query_status(args: cli::StatusArgs) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut stream = tokio::net::TcpStream::connect(&args.addr)
        .await
        .with_context(|| format!("failed to connect to {}", args.addr))?;

    let request = format!(
        "GET /health HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        args.addr,
    );
    stream.write_all(request.as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await?;
    let response = String::from_utf8_lossy(&buf);

    // Everything after the first blank line is the body.
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_else(|| response.to_string());

    println!("{}", body.trim());
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("meridian-server {}", env!("CARGO_PKG_VERSION"));
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
