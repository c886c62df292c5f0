//! Network configuration context for the push ingress endpoints.
//!
//! Devices call back into the bridge in two ways: UPnP NOTIFY requests to the
//! HTTP event server, and unicast JSON datagrams to the registered app port.
//! Both need an address the devices can reach, which [`NetworkContext`]
//! provides either from configuration or from interface detection.

use std::net::IpAddr;
#[cfg(test)]
use std::net::Ipv4Addr;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Notify;

use crate::protocol_constants::UPNP_CALLBACK_PATH;

/// Network configuration shared across services.
///
/// # Modes
///
/// - **Explicit**: the advertise IP is given in configuration. Use
///   [`NetworkContext::explicit`].
/// - **Auto-detect**: the local IP is looked up from the interfaces. Use
///   [`NetworkContext::auto_detect`].
#[derive(Clone)]
pub struct NetworkContext {
    /// Event server port (0 until the listener is bound).
    pub port: Arc<RwLock<u16>>,
    /// Notifier signaled when the port is assigned.
    pub port_notify: Arc<Notify>,
    /// IP address that devices can reach us at.
    pub local_ip: Arc<RwLock<String>>,
    ip_detector: Option<Arc<dyn IpDetector>>,
}

impl NetworkContext {
    /// Creates a `NetworkContext` with a fixed advertise address.
    #[must_use]
    pub fn explicit(bind_port: u16, advertise_ip: IpAddr) -> Self {
        Self {
            port: Arc::new(RwLock::new(bind_port)),
            port_notify: Arc::new(Notify::new()),
            local_ip: Arc::new(RwLock::new(advertise_ip.to_string())),
            ip_detector: None,
        }
    }

    /// Creates a `NetworkContext` whose IP comes from `ip_detector`.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial IP detection fails.
    pub fn auto_detect(
        preferred_port: u16,
        ip_detector: Arc<dyn IpDetector>,
    ) -> Result<Self, NetworkError> {
        let local_ip = ip_detector.detect()?;
        Ok(Self {
            port: Arc::new(RwLock::new(preferred_port)),
            port_notify: Arc::new(Notify::new()),
            local_ip: Arc::new(RwLock::new(local_ip)),
            ip_detector: Some(ip_detector),
        })
    }

    #[cfg(test)]
    pub fn for_test() -> Self {
        Self::explicit(0, IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)))
    }

    /// Re-runs detection. Fails in explicit mode.
    pub fn detect_ip(&self) -> Result<String, NetworkError> {
        match &self.ip_detector {
            Some(detector) => detector.detect(),
            None => Err(NetworkError::NoDetector),
        }
    }

    #[must_use]
    pub fn get_port(&self) -> u16 {
        *self.port.read()
    }

    #[must_use]
    pub fn get_local_ip(&self) -> String {
        self.local_ip.read().clone()
    }

    /// Sets the port and notifies waiters.
    pub fn set_port(&self, port: u16) {
        *self.port.write() = port;
        self.port_notify.notify_waiters();
    }

    pub fn set_local_ip(&self, ip: String) {
        *self.local_ip.write() = ip;
    }

    #[must_use]
    pub fn url_builder(&self) -> UrlBuilder {
        UrlBuilder::new(self.get_local_ip(), self.get_port())
    }

    /// Returns the URL devices deliver UPnP NOTIFY requests to.
    #[must_use]
    pub fn event_callback_url(&self) -> String {
        self.url_builder().event_callback_url()
    }
}

/// Trait for detecting the local IP address.
pub trait IpDetector: Send + Sync {
    fn detect(&self) -> Result<String, NetworkError>;
}

/// Default IP detector using the system's network interfaces.
#[derive(Debug, Clone, Default)]
pub struct LocalIpDetector;

impl LocalIpDetector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn arc() -> Arc<dyn IpDetector> {
        Arc::new(Self::new())
    }
}

impl IpDetector for LocalIpDetector {
    fn detect(&self) -> Result<String, NetworkError> {
        local_ip_address::local_ip()
            .map(|ip| ip.to_string())
            .map_err(|e| NetworkError::Detection(e.to_string()))
    }
}

/// Errors that can occur during network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Failed to detect local IP: {0}")]
    Detection(String),

    #[error("No IP detector configured (using explicit mode)")]
    NoDetector,
}

/// Builds URLs served by the event server.
pub struct UrlBuilder {
    ip: String,
    port: u16,
}

impl UrlBuilder {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// Returns the base URL (e.g. `http://192.168.1.100:41101`).
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.port)
    }

    #[must_use]
    pub fn event_callback_url(&self) -> String {
        format!("{}{}", self.base_url(), UPNP_CALLBACK_PATH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockIpDetector {
        ip: String,
    }

    impl IpDetector for MockIpDetector {
        fn detect(&self) -> Result<String, NetworkError> {
            Ok(self.ip.clone())
        }
    }

    #[test]
    fn explicit_context_uses_provided_ip() {
        let ctx = NetworkContext::explicit(41101, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 100)));
        assert_eq!(ctx.get_local_ip(), "192.168.1.100");
        assert_eq!(ctx.get_port(), 41101);
        assert!(matches!(ctx.detect_ip(), Err(NetworkError::NoDetector)));
    }

    #[test]
    fn auto_detect_context_uses_detector() {
        let detector = Arc::new(MockIpDetector {
            ip: "10.0.0.5".to_string(),
        });
        let ctx = NetworkContext::auto_detect(0, detector).unwrap();
        assert_eq!(ctx.get_local_ip(), "10.0.0.5");
    }

    #[test]
    fn callback_url_follows_assigned_port() {
        let ctx = NetworkContext::for_test();
        ctx.set_port(49152);
        assert_eq!(
            ctx.event_callback_url(),
            format!("http://127.0.0.1:49152{}", UPNP_CALLBACK_PATH)
        );
    }
}
