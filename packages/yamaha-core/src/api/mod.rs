//! HTTP API layer.
//!
//! Serves the UPnP NOTIFY callback devices deliver events to, plus a health
//! probe. Handlers are thin: they resolve the sender and hand the event to
//! the push dispatch registry.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::context::NetworkContext;
use crate::push::{DeviceRegistry, SubscriptionStore};

pub mod http;

pub use http::create_router;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Shared application state for the API layer.
#[derive(Clone)]
pub struct AppState {
    /// Routes events to device inboxes.
    pub registry: Arc<DeviceRegistry>,
    /// SID -> device lookup for NOTIFY requests.
    pub subscriptions: Arc<SubscriptionStore>,
    /// Network configuration (port, local IP).
    pub network: NetworkContext,
}

impl AppState {
    #[must_use]
    pub fn new(
        registry: Arc<DeviceRegistry>,
        subscriptions: Arc<SubscriptionStore>,
        network: NetworkContext,
    ) -> Self {
        Self {
            registry,
            subscriptions,
            network,
        }
    }
}

async fn find_available_port(start: u16, end: u16) -> Result<(u16, TcpListener), ServerError> {
    for port in start..=end {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort { start, end })
}

/// Binds the event server on the configured port, or the first free port of
/// the fallback range when it is 0.
///
/// The bound port is written into the network context so callback URLs can
/// be built before the server starts accepting.
pub async fn bind_event_server(network: &NetworkContext) -> Result<TcpListener, ServerError> {
    let preferred_port = network.get_port();
    let (port, listener) = if preferred_port > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], preferred_port));
        (preferred_port, TcpListener::bind(&addr).await?)
    } else {
        find_available_port(49500, 49510).await?
    };
    network.set_port(port);
    log::info!("[Server] Event server bound on http://0.0.0.0:{}", port);
    Ok(listener)
}

/// Serves the event endpoint until `cancel` fires.
pub async fn serve_events(
    listener: TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let app = http::create_router(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { cancel.cancelled().await })
    .await?;

    log::info!("[Server] Event server stopped");
    Ok(())
}
