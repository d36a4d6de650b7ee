// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use corral::api::{build_health_router, build_router, AppState};
use corral::config::Config;
use corral::hooks::HookTable;
use corral::orchestrator::Orchestrator;

/// Initialize tracing from config. Uses `try_init` so it's safe to call
/// more than once (e.g. from tests).
fn init_tracing(config: &Config) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let result = match config.log_format.as_str() {
        "json" => fmt::fmt().with_env_filter(filter).json().try_init(),
        _ => fmt::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    if let Err(e) = run(config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    let preset = config.build_preset()?;
    let settings = corral::session::SessionSettings {
        persistence_window: config.persistence_window(),
        tick_interval: config.tick_interval(),
        auto_approval_enabled: config.auto_approval_enabled,
        policy_oracle: config.policy_oracle_config(),
        ring_capacity: config.ring_size,
        visible_lines: config.visible_lines,
        term: config.term.clone(),
        return_to_menu: corral::session::DEFAULT_RETURN_TO_MENU.to_vec(),
    };

    // Hooks and the command preset are data, not CLI flags (§6); the
    // standalone binary starts with an empty table and relies on embedders
    // to build their own `Orchestrator` when hooks are needed.
    let orchestrator = Arc::new(Orchestrator::new(
        preset,
        settings,
        HookTable::new(),
        config.worktree_root.clone(),
        config.cols,
        config.rows,
    ));

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    if let Some(health_port) = config.health_port {
        let addr = format!("{}:{health_port}", config.host);
        let listener = TcpListener::bind(&addr).await?;
        info!("health probe listening on {addr}");
        let sd = shutdown.clone();
        tokio::spawn(async move {
            let result = axum::serve(listener, build_health_router()).with_graceful_shutdown(sd.cancelled_owned()).await;
            if let Err(e) = result {
                error!("health server error: {e}");
            }
        });
    }

    let state = Arc::new(AppState { orchestrator: orchestrator.clone(), auth_token: config.auth_token.clone() });
    let router = build_router(state);

    if let Some(port) = config.port {
        let addr = format!("{}:{port}", config.host);
        let listener = TcpListener::bind(&addr).await?;
        info!("event API listening on {}", listener.local_addr()?);
        let sd = shutdown.clone();
        axum::serve(listener, router).with_graceful_shutdown(sd.cancelled_owned()).await?;
    } else if let Some(ref socket_path) = config.socket {
        let _ = std::fs::remove_file(socket_path);
        let listener = tokio::net::UnixListener::bind(socket_path)?;
        info!("event API listening on {socket_path}");
        let mut make_service = router.into_make_service();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                accept = listener.accept() => {
                    let stream = match accept {
                        Ok((stream, _)) => stream,
                        Err(e) => {
                            tracing::debug!("unix socket accept error: {e}");
                            continue;
                        }
                    };
                    let service_future = <_ as tower::Service<_>>::call(&mut make_service, ());
                    tokio::spawn(async move {
                        let service = match service_future.await {
                            Ok(service) => service,
                            Err(never) => match never {},
                        };
                        let io = hyper_util::rt::TokioIo::new(stream);
                        let hyper_service = hyper_util::service::TowerToHyperService::new(service);
                        let _ = hyper_util::server::conn::auto::Builder::new(hyper_util::rt::TokioExecutor::new())
                            .serve_connection_with_upgrades(io, hyper_service)
                            .await;
                    });
                }
            }
        }
    }

    orchestrator.destroy_all().await;
    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()).ok();
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt()).ok();

        tokio::select! {
            _ = async {
                if let Some(ref mut s) = sigterm { s.recv().await } else { std::future::pending().await }
            } => info!("received SIGTERM"),
            _ = async {
                if let Some(ref mut s) = sigint { s.recv().await } else { std::future::pending().await }
            } => info!("received SIGINT"),
        }
        shutdown.cancel();
    });
}
