//! SSDP search for Yamaha media renderers.
//!
//! One socket per non-virtual IPv4 interface sends the M-SEARCH and receives
//! the unicast replies. Only replies that look like Yamaha devices and carry
//! both LOCATION and USN become [`DiscoveryRecord`]s; the description
//! document decides the rest.

use local_ip_address::list_afinet_netifas;
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::types::{is_virtual_interface, normalize_uuid, DiscoveryError, DiscoveryRecord};
use crate::protocol_constants::SSDP_SEARCH_TARGET;

// ─────────────────────────────────────────────────────────────────────────────
// ASCII Case-Insensitive Helpers
// ─────────────────────────────────────────────────────────────────────────────

#[inline]
fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    find_ignore_ascii_case(haystack, needle).is_some()
}

#[inline]
fn starts_with_ignore_ascii_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

#[inline]
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

// ─────────────────────────────────────────────────────────────────────────────

const MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Header substrings that identify Yamaha responders. `Network_Module` is the
/// SERVER token of MusicCast firmware.
const VENDOR_MARKERS: &[&str] = &["yamaha", "musiccast", "network_module"];

fn build_msearch_message(mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\r\n",
        mx, SSDP_SEARCH_TARGET
    )
}

/// Value of the first header named `name` (with trailing colon), trimmed.
fn header_value<'a>(response: &'a str, name: &str) -> Option<&'a str> {
    response
        .lines()
        .find(|l| starts_with_ignore_ascii_case(l, name))
        .and_then(|l| l.find(':').map(|idx| l[idx + 1..].trim()))
        .filter(|v| !v.is_empty())
}

/// Parses an SSDP response into a record, or `None` when it is not usable.
fn parse_ssdp_response(response: &str, src_ip: &str) -> Option<DiscoveryRecord> {
    if !VENDOR_MARKERS
        .iter()
        .any(|marker| contains_ignore_ascii_case(response, marker))
    {
        return None;
    }

    let location = header_value(response, "location:")?;
    let usn = header_value(response, "usn:")?;
    let id = normalize_uuid(usn);
    if id.is_empty() {
        return None;
    }

    Some(DiscoveryRecord {
        id,
        address: src_ip.to_string(),
        location: location.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    pub name: String,
    pub ip: Ipv4Addr,
}

/// Usable IPv4 interfaces; virtual and loopback ones are skipped.
pub fn get_interfaces() -> Vec<InterfaceInfo> {
    list_afinet_netifas()
        .unwrap_or_else(|e| {
            log::warn!("[Discovery] Failed to list network interfaces: {}", e);
            Vec::new()
        })
        .into_iter()
        .filter_map(|(name, addr)| {
            if is_virtual_interface(&name) {
                log::debug!("[Discovery] Skipping virtual interface: {}", name);
                return None;
            }
            match addr {
                IpAddr::V4(ip) if !ip.is_loopback() => Some(InterfaceInfo { name, ip }),
                _ => None,
            }
        })
        .collect()
}

fn create_socket(iface_ip: Ipv4Addr) -> Result<UdpSocket, DiscoveryError> {
    let bind_addr = SocketAddr::new(IpAddr::V4(iface_ip), 0);

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(DiscoveryError::SocketBind)?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[Discovery] Failed to set SO_REUSEADDR on {}: {}", iface_ip, e);
    }

    #[cfg(unix)]
    if let Err(e) = socket.set_reuse_port(true) {
        log::warn!("[Discovery] Failed to set SO_REUSEPORT on {}: {}", iface_ip, e);
    }

    // UPnP 1.0 recommends TTL 4 for SSDP multicast
    if let Err(e) = socket.set_multicast_ttl_v4(4) {
        log::warn!("[Discovery] Failed to set multicast TTL on {}: {}", iface_ip, e);
    }

    socket
        .set_nonblocking(true)
        .map_err(DiscoveryError::SocketBind)?;
    socket
        .bind(&bind_addr.into())
        .map_err(DiscoveryError::SocketBind)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(DiscoveryError::SocketBind)
}

/// Configuration for SSDP discovery.
#[derive(Debug, Clone)]
pub struct SsdpConfig {
    /// Number of M-SEARCH packets to send per interface.
    pub send_count: u64,
    /// Delay between M-SEARCH packets.
    pub retry_delay: Duration,
    /// Total time to collect responses.
    pub discovery_timeout: Duration,
    /// MX value (max response delay in seconds).
    pub mx_value: u64,
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            send_count: 3,
            retry_delay: Duration::from_millis(800),
            discovery_timeout: Duration::from_secs(5),
            mx_value: 1,
        }
    }
}

/// Searches all interfaces and returns records deduplicated by device id.
pub async fn search(config: &SsdpConfig) -> Result<Vec<DiscoveryRecord>, DiscoveryError> {
    let interfaces = get_interfaces();
    if interfaces.is_empty() {
        return Err(DiscoveryError::NoInterfaces);
    }

    let mut sockets: Vec<(InterfaceInfo, Arc<UdpSocket>)> = Vec::new();
    for iface in interfaces {
        match create_socket(iface.ip) {
            Ok(socket) => sockets.push((iface, Arc::new(socket))),
            Err(e) => log::warn!(
                "[Discovery] Failed to create socket for {} ({}): {}",
                iface.name,
                iface.ip,
                e
            ),
        }
    }

    if sockets.is_empty() {
        return Err(DiscoveryError::NoInterfaces);
    }

    log::debug!(
        "[Discovery] SSDP search on {} interface(s) ({} sends, {}ms spacing)",
        sockets.len(),
        config.send_count,
        config.retry_delay.as_millis()
    );

    let msg = build_msearch_message(config.mx_value);
    let discovered: Arc<Mutex<Vec<DiscoveryRecord>>> = Arc::new(Mutex::new(Vec::new()));

    let send_futures: Vec<_> = sockets
        .iter()
        .map(|(iface, socket)| {
            let socket = Arc::clone(socket);
            let iface_name = iface.name.clone();
            let msg = msg.as_bytes().to_vec();
            let send_count = config.send_count;
            let retry_delay = config.retry_delay;

            async move {
                for i in 0..send_count {
                    if i > 0 {
                        tokio::time::sleep(retry_delay).await;
                    }
                    if let Err(e) = socket.send_to(&msg, MULTICAST_ADDR).await {
                        log::warn!(
                            "[Discovery] Failed to send M-SEARCH on {} (attempt {}): {}",
                            iface_name,
                            i + 1,
                            e
                        );
                    }
                }
            }
        })
        .collect();

    let recv_futures: Vec<_> = sockets
        .iter()
        .map(|(iface, socket)| {
            let socket = Arc::clone(socket);
            let iface_name = iface.name.clone();
            let discovered = Arc::clone(&discovered);
            let discovery_timeout = config.discovery_timeout;

            async move {
                let mut buf = [0u8; 2048];
                let start = std::time::Instant::now();

                while start.elapsed() < discovery_timeout {
                    let remaining = discovery_timeout.saturating_sub(start.elapsed());
                    match timeout(remaining, socket.recv_from(&mut buf)).await {
                        Ok(Ok((amt, src))) => {
                            let response = String::from_utf8_lossy(&buf[..amt]);
                            if let Some(record) =
                                parse_ssdp_response(&response, &src.ip().to_string())
                            {
                                log::debug!(
                                    "[Discovery] SSDP response: id={}, address={}, via {}",
                                    record.id,
                                    record.address,
                                    iface_name
                                );
                                discovered.lock().await.push(record);
                            }
                        }
                        Ok(Err(e)) => {
                            log::warn!("[Discovery] Socket recv error on {}: {}", iface_name, e);
                        }
                        Err(_) => break,
                    }
                }
            }
        })
        .collect();

    tokio::join!(
        futures::future::join_all(send_futures),
        futures::future::join_all(recv_futures)
    );

    let mut discovered = std::mem::take(&mut *discovered.lock().await);
    let mut seen = HashSet::new();
    discovered.retain(|r| seen.insert(r.id.clone()));
    discovered.sort_by(|a, b| a.id.cmp(&b.id));

    log::info!("[Discovery] SSDP found {} device(s)", discovered.len());
    Ok(discovered)
}
