use crate::{create_router, AppState, Readiness};
use sportsdesk_core::{Result, Settings, SportsdeskError};
use std::net::SocketAddr;
use tokio::{
    net::{TcpListener, TcpSocket},
    signal,
};
use tracing::{info, warn};

pub struct Server {
    state: AppState,
    addr: SocketAddr,
}

impl Server {
    pub fn new(settings: &Settings) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
            .parse()
            .map_err(|e| SportsdeskError::Config(format!("invalid listen address: {e}")))?;

        if settings.secrets.session_key.is_none() {
            warn!("SECRET_KEY is not set; running without a session key");
        }

        let state = AppState::new(settings);
        Ok(Self { state, addr })
    }

    pub async fn run(self) -> Result<()> {
        let not_ready = match &self.state.readiness {
            Readiness::NotReady(reason) => Some(reason.clone()),
            Readiness::Ready(_) => None,
        };
        let router = create_router(self.state);

        info!("Starting Sportsdesk API server on {}", self.addr);

        let listener = bind_listener(self.addr)?;

        info!("Server listening on http://{}", self.addr);
        info!("  GET /api/f1[/{{country}}]");
        info!("  GET /api/football[/{{team}}]");
        info!("  GET /api/epic_games");
        if let Some(reason) = not_ready {
            warn!(%reason, "Backends are not ready; /api routes will answer 503");
        }

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

fn bind_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let socket = if addr.is_ipv6() {
        TcpSocket::new_v6()
    } else {
        TcpSocket::new_v4()
    }?;

    // SO_REUSEADDR only: a second instance on the same port must fail to bind.
    if let Err(e) = socket.set_reuseaddr(true) {
        warn!(error = %e, "Failed to set SO_REUSEADDR");
    }
    if let Err(e) = socket.set_keepalive(true) {
        warn!(error = %e, "Failed to set SO_KEEPALIVE");
    }

    socket.bind(addr)?;
    socket.listen(1024)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully");
        },
    }
}
