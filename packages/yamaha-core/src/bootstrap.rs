//! Application bootstrap and dependency wiring.
//!
//! This module contains the composition root - the single place where all
//! services are instantiated and wired together. The wiring order matters:
//!
//! 1. Shared infrastructure (HTTP client, registry, cancellation token)
//! 2. Event server, bound first so the UPnP callback URL has its real port
//! 3. Unicast listener and UPnP subscriber
//! 4. Device manager (depends on all of the above)

use std::sync::Arc;

use reqwest::Client;
use tokio_util::sync::CancellationToken;

use crate::api::{self, AppState};
use crate::context::{LocalIpDetector, NetworkContext};
use crate::error::{CoreError, CoreResult};
use crate::events::HostPlatform;
use crate::push::{DeviceRegistry, SubscriptionStore, UnicastListener, UpnpSubscriber};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::DeviceManager;
use crate::state::Config;
use crate::yamaha::discovery::{self, PairingCandidate};
use crate::yamaha::types::Protocol;

/// Container for all bootstrapped services.
#[derive(Clone)]
pub struct BootstrappedServices {
    /// Runs one monitor per paired device.
    pub manager: Arc<DeviceManager>,
    /// Routes push events to device inboxes.
    pub registry: Arc<DeviceRegistry>,
    /// SID -> device map read by the NOTIFY endpoint.
    pub subscriptions: Arc<SubscriptionStore>,
    /// UPnP subscriber, when UPnP events are enabled.
    pub subscriber: Option<Arc<UpnpSubscriber>>,
    /// Callback address (event server port, local IP).
    pub network: NetworkContext,
    /// Bound unicast port, when the unicast listener runs.
    pub unicast_port: Option<u16>,
    config: Config,
    /// Shared HTTP client for connection pooling.
    http_client: Client,
    /// Task spawner for background operations.
    pub spawner: TokioSpawner,
    /// Parent of every listener, renewal and monitor token.
    pub cancel_token: CancellationToken,
}

impl BootstrappedServices {
    /// Returns the shared HTTP client.
    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one SSDP scan and resolves the responders.
    pub async fn discover(&self, protocol: Option<Protocol>) -> CoreResult<Vec<PairingCandidate>> {
        let candidates =
            discovery::discover(&self.http_client, &self.config.ssdp_config(), protocol).await?;
        Ok(candidates)
    }

    /// Initiates graceful shutdown of all services.
    pub async fn shutdown(&self) {
        log::info!("[Bootstrap] Beginning graceful shutdown...");

        // Remove devices first so UNSUBSCRIBE still has a live client.
        let devices = self.manager.len();
        self.manager.shutdown().await;
        log::info!("[Bootstrap] Stopped {} device(s)", devices);

        self.cancel_token.cancel();

        log::info!("[Bootstrap] Shutdown complete");
    }
}

/// Creates the shared HTTP client for all device communication.
fn create_http_client(config: &Config) -> CoreResult<Client> {
    Client::builder()
        .timeout(config.http_timeout())
        .build()
        .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))
}

/// Bootstraps all services, detecting the callback IP unless the config
/// names one.
///
/// # Errors
///
/// Fails when the config is invalid, the local IP cannot be detected or a
/// listener cannot be bound.
pub async fn bootstrap_services(
    config: &Config,
    platform: Arc<dyn HostPlatform>,
) -> CoreResult<BootstrappedServices> {
    let network = match config.advertise_ip {
        Some(ip) => NetworkContext::explicit(config.event_port, ip),
        None => NetworkContext::auto_detect(config.event_port, LocalIpDetector::arc())
            .map_err(|e| CoreError::Configuration(e.to_string()))?,
    };
    bootstrap_services_with_network(config, platform, network).await
}

/// Bootstraps all services with an explicit network context.
///
/// The event server binds the port held by `network` (0 picks a free one).
pub async fn bootstrap_services_with_network(
    config: &Config,
    platform: Arc<dyn HostPlatform>,
    network: NetworkContext,
) -> CoreResult<BootstrappedServices> {
    config.validate().map_err(CoreError::Configuration)?;

    let spawner = TokioSpawner::current();
    let http_client = create_http_client(config)?;
    let cancel_token = CancellationToken::new();
    let registry = Arc::new(DeviceRegistry::new());
    let subscriptions = Arc::new(SubscriptionStore::new());

    // Event server
    let listener = api::bind_event_server(&network)
        .await
        .map_err(|e| CoreError::Configuration(e.to_string()))?;
    let state = AppState::new(
        Arc::clone(&registry),
        Arc::clone(&subscriptions),
        network.clone(),
    );
    let server_cancel = cancel_token.child_token();
    spawner.spawn(async move {
        if let Err(e) = api::serve_events(listener, state, server_cancel).await {
            log::error!("[Bootstrap] Event server error: {}", e);
        }
    });

    // Unicast listener
    let unicast_port = if config.unicast_port > 0 {
        let listener = UnicastListener::bind(config.unicast_port, Arc::clone(&registry))?;
        let port = listener.local_addr()?.port();
        let unicast_cancel = cancel_token.child_token();
        spawner.spawn(listener.run(unicast_cancel));
        Some(port)
    } else {
        log::info!("[Bootstrap] Unicast events disabled");
        None
    };

    // UPnP subscriptions
    let subscriber = config.upnp_events.then(|| {
        UpnpSubscriber::new(
            http_client.clone(),
            Arc::clone(&subscriptions),
            network.event_callback_url(),
            spawner.clone(),
            cancel_token.child_token(),
        )
    });

    let mut manager = DeviceManager::new(
        http_client.clone(),
        platform,
        Arc::clone(&registry),
        spawner.clone(),
        cancel_token.child_token(),
    )
    .with_default_interval(config.default_update_interval_secs);
    if let Some(port) = unicast_port {
        manager = manager.with_push_channel(config.resolved_push_channel_name(), port);
    }
    if let Some(subscriber) = &subscriber {
        manager = manager.with_subscriber(Arc::clone(subscriber));
    }

    log::info!(
        "[Bootstrap] Ready (events: {}, unicast: {})",
        network.event_callback_url(),
        unicast_port.map_or_else(|| "off".to_string(), |p| p.to_string())
    );

    Ok(BootstrappedServices {
        manager: Arc::new(manager),
        registry,
        subscriptions,
        subscriber,
        network,
        unicast_port,
        config: config.clone(),
        http_client,
        spawner,
        cancel_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::LoggingPlatform;
    use crate::services::test_support::{state, ScriptedClient, Step};
    use std::net::{IpAddr, Ipv4Addr};

    fn local_config() -> Config {
        Config {
            event_port: 0,
            unicast_port: 0,
            advertise_ip: Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            ..Config::default()
        }
    }

    async fn boot(config: &Config) -> BootstrappedServices {
        let network = NetworkContext::explicit(0, IpAddr::V4(Ipv4Addr::LOCALHOST));
        bootstrap_services_with_network(config, Arc::new(LoggingPlatform::new()), network)
            .await
            .unwrap()
    }

    #[test]
    fn http_client_has_timeout() {
        let client = create_http_client(&Config::default()).unwrap();
        assert!(client.get("http://example.com").build().is_ok());
    }

    #[tokio::test]
    async fn event_server_is_reachable_after_bootstrap() {
        let services = boot(&local_config()).await;
        let port = services.network.get_port();
        assert_ne!(port, 0);
        assert!(services
            .subscriber
            .as_ref()
            .unwrap()
            .callback_url()
            .ends_with(&format!(":{}/upnp/event", port)));

        let body: serde_json::Value = reqwest::get(format!("http://127.0.0.1:{}/health", port))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");

        services.shutdown().await;
        assert!(services.cancel_token.is_cancelled());
    }

    #[tokio::test]
    async fn shutdown_stops_attached_devices() {
        let services = boot(&local_config()).await;
        let client = Arc::new(ScriptedClient::new(
            Protocol::Legacy,
            vec![Step::State(state(true, false, "HDMI1"))],
        ));
        let handle = services.manager.attach("den", client).unwrap();
        assert!(services.registry.contains("den"));

        services.shutdown().await;
        assert!(handle.is_stopped());
        assert!(!services.registry.contains("den"));
        assert!(services.manager.is_empty());
    }

    #[tokio::test]
    async fn unicast_listener_is_optional() {
        let services = boot(&local_config()).await;
        assert_eq!(services.unicast_port, None);
        services.shutdown().await;

        let services = boot(&Config {
            unicast_port: 41999,
            upnp_events: false,
            ..local_config()
        })
        .await;
        assert_eq!(services.unicast_port, Some(41999));
        assert!(services.subscriber.is_none());
        services.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let config = Config {
            http_timeout_secs: 0,
            ..local_config()
        };
        let network = NetworkContext::explicit(0, IpAddr::V4(Ipv4Addr::LOCALHOST));
        let err = bootstrap_services_with_network(&config, Arc::new(LoggingPlatform::new()), network)
            .await
            .err()
            .unwrap();
        assert_eq!(err.code(), "configuration_error");
    }
}
