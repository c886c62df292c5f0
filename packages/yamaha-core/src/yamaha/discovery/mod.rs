//! Device discovery: SSDP search, description resolution and manual probing.
//!
//! - `ssdp` - M-SEARCH on every usable interface
//! - `description` - description document checks producing pairing candidates
//! - `manual` - pairing by IP address
//! - `types` - records, candidates and rejection reasons

pub mod description;
pub mod manual;
pub mod ssdp;
pub mod types;

use reqwest::Client;

pub use description::{resolve, resolve_all, resolve_description};
pub use ssdp::SsdpConfig;
pub use types::{
    DiscoveryError, DiscoveryRecord, DiscoveryResult, PairingCandidate, PairingRecord, Rejection,
};

use crate::yamaha::types::Protocol;

/// Runs one SSDP search and resolves every response.
///
/// With `protocol` unset, both families are accepted.
pub async fn discover(
    http: &Client,
    config: &SsdpConfig,
    protocol: Option<Protocol>,
) -> DiscoveryResult<Vec<PairingCandidate>> {
    let records = ssdp::search(config).await?;
    let candidates = resolve_all(http, &records, protocol).await;
    log::info!(
        "[Discovery] {} of {} responder(s) can be paired",
        candidates.len(),
        records.len()
    );
    Ok(candidates)
}
