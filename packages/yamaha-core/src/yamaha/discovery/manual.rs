//! Pairing by IP address, for networks where SSDP does not reach the device.

use reqwest::Client;

use super::description::fallback_name;
use super::types::PairingCandidate;
use crate::yamaha::extended::ExtendedClient;
use crate::yamaha::legacy::LegacyClient;
use crate::yamaha::transport::ClientResult;
use crate::yamaha::types::{ConnectionEndpoint, Protocol};
use crate::yamaha::traits::ZoneControl;

/// Builds a candidate for `ip` without contacting it.
#[must_use]
pub fn unvalidated(ip: &str, protocol: Protocol) -> PairingCandidate {
    let url_base = format!("http://{}:80/", ip);
    PairingCandidate {
        id: ip.to_string(),
        name: fallback_name(protocol, ip),
        protocol,
        address: ip.to_string(),
        endpoint: ConnectionEndpoint::new(protocol, url_base),
        protocol_version: None,
        model_name: None,
        event_urls: Vec::new(),
    }
}

/// Contacts the device at `ip` and names the candidate after what it reports.
///
/// Fails when the device does not answer the protocol.
pub async fn probe(http: &Client, ip: &str, protocol: Protocol) -> ClientResult<PairingCandidate> {
    let mut candidate = unvalidated(ip, protocol);

    let (name, model_name) = match protocol {
        Protocol::Extended => {
            let client = ExtendedClient::new(http.clone(), &candidate.endpoint);
            let name = client.device_name().await?;
            let info = client.get_device_info().await?;
            (name, info.model_name)
        }
        Protocol::Legacy => {
            let client = LegacyClient::new(http.clone(), &candidate.endpoint);
            let name = client.get_network_name().await?;
            let model = client.get_unit_name().await?;
            (name, model)
        }
    };

    candidate.name = match (name, &model_name) {
        (Some(name), Some(model)) => format!("{} - {}", name, model),
        (Some(name), None) => name,
        (None, _) => candidate.name,
    };
    candidate.model_name = model_name;

    log::info!("[Discovery] Probed {} as {} ({})", ip, candidate.name, protocol);
    Ok(candidate)
}
