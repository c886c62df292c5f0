//! Resolves UPnP description documents into pairing candidates.
//!
//! Every check that fails produces a distinct [`Rejection`] and logs the
//! offending part of the document. A rejection only excludes that device.

use std::time::Duration;

use futures::future::join_all;
use reqwest::{Client, Url};

use super::types::{DiscoveryRecord, PairingCandidate, Rejection};
use crate::protocol_constants::{
    EXTENDED_SERVICE_TYPE, HTTP_TIMEOUT_SECS, LEGACY_SERVICE_TYPE, MODEL_DESCRIPTION_EXTENDED,
    MODEL_DESCRIPTION_LEGACY,
};
use crate::yamaha::retry::with_retry;
use crate::yamaha::transport::ClientError;
use crate::yamaha::types::{ConnectionEndpoint, Protocol};
use crate::yamaha::xml::{XmlDocument, XmlElement};

/// Model description each protocol family reports.
#[must_use]
pub fn expected_model_description(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Extended => MODEL_DESCRIPTION_EXTENDED,
        Protocol::Legacy => MODEL_DESCRIPTION_LEGACY,
    }
}

fn service_type(protocol: Protocol) -> &'static str {
    match protocol {
        Protocol::Extended => EXTENDED_SERVICE_TYPE,
        Protocol::Legacy => LEGACY_SERVICE_TYPE,
    }
}

/// Name shown when the description lacks `friendlyName` or `modelName`.
#[must_use]
pub fn fallback_name(protocol: Protocol, address: &str) -> String {
    match protocol {
        Protocol::Extended => format!("Yamaha MusicCast [{}]", address),
        Protocol::Legacy => format!("Yamaha AV Receiver [{}]", address),
    }
}

fn reject(doc: &XmlDocument, at: &XmlElement, record: &DiscoveryRecord, rejection: Rejection) -> Rejection {
    log::warn!(
        "[Discovery] Rejected {} ({}): {} in {}",
        record.address,
        rejection.code(),
        rejection,
        doc.fragment(at)
    );
    rejection
}

/// Checks a description document against `protocol`.
///
/// With `protocol` unset, the family is inferred from `modelDescription`.
pub fn resolve_description(
    xml: &str,
    record: &DiscoveryRecord,
    protocol: Option<Protocol>,
) -> Result<PairingCandidate, Rejection> {
    let doc = XmlDocument::parse(xml).map_err(|e| {
        log::warn!("[Discovery] Unparseable description from {}: {}", record.address, e);
        Rejection::Parse(e.to_string())
    })?;
    let root = doc.root();
    let device = root.child("device");
    let model_description = device.and_then(|d| d.non_empty_text("modelDescription"));

    let protocol = match protocol {
        Some(protocol) => protocol,
        None => match model_description {
            Some(MODEL_DESCRIPTION_EXTENDED) => Protocol::Extended,
            Some(MODEL_DESCRIPTION_LEGACY) => Protocol::Legacy,
            found => {
                let rejection = Rejection::WrongModel {
                    expected: "MusicCast or AV Receiver",
                    found: found.map(str::to_string),
                };
                return Err(reject(&doc, device.unwrap_or(root), record, rejection));
            }
        },
    };

    let expected = expected_model_description(protocol);
    if model_description != Some(expected) {
        let rejection = Rejection::WrongModel {
            expected,
            found: model_description.map(str::to_string),
        };
        return Err(reject(&doc, device.unwrap_or(root), record, rejection));
    }

    let x_device = root
        .child("yamaha:X_device")
        .ok_or_else(|| reject(&doc, root, record, Rejection::MissingVendorExtension))?;

    let url_base = x_device
        .non_empty_text("yamaha:X_URLBase")
        .ok_or_else(|| reject(&doc, x_device, record, Rejection::MissingUrlBase))?;

    let service_list = x_device
        .child("yamaha:X_serviceList")
        .filter(|list| list.child("yamaha:X_service").is_some())
        .ok_or_else(|| reject(&doc, x_device, record, Rejection::MissingServiceList))?;

    let spec_type = service_type(protocol);
    let not_found = || {
        reject(
            &doc,
            service_list,
            record,
            Rejection::ServiceNotFound { spec_type },
        )
    };
    let service = service_list
        .children_named("yamaha:X_service")
        .find(|s| s.text_at("yamaha:X_specType") == Some(spec_type))
        .ok_or_else(not_found)?;

    let (control_path, protocol_version) = match protocol {
        Protocol::Extended => (
            service.non_empty_text("yamaha:X_yxcControlURL"),
            service
                .non_empty_text("yamaha:X_yxcVersion")
                .map(str::to_string),
        ),
        Protocol::Legacy => (service.non_empty_text("yamaha:X_controlURL"), None),
    };
    let control_path = control_path.ok_or_else(not_found)?;

    let friendly_name = device.and_then(|d| d.non_empty_text("friendlyName"));
    let model_name = device.and_then(|d| d.non_empty_text("modelName"));
    let name = match (friendly_name, model_name) {
        (Some(friendly), Some(model)) => format!("{} - {}", friendly, model),
        _ => fallback_name(protocol, &record.address),
    };

    let event_urls = device
        .map(|d| event_urls(d, &record.location))
        .unwrap_or_default();

    log::info!(
        "[Discovery] Resolved {} at {} ({}, version {:?})",
        name,
        url_base,
        protocol,
        protocol_version
    );

    Ok(PairingCandidate {
        id: record.id.clone(),
        name,
        protocol,
        address: record.address.clone(),
        endpoint: ConnectionEndpoint::new(protocol, url_base).with_control_path(control_path),
        protocol_version,
        model_name: model_name.map(str::to_string),
        event_urls,
    })
}

/// Event subscription URLs of the standard UPnP services, made absolute
/// against the description location.
fn event_urls(device: &XmlElement, location: &str) -> Vec<String> {
    let Ok(base) = Url::parse(location) else {
        return Vec::new();
    };
    device
        .child("serviceList")
        .map(|list| {
            list.children_named("service")
                .filter_map(|s| s.non_empty_text("eventSubURL"))
                .filter_map(|path| base.join(path).ok())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

/// Fetches and checks the description of one record.
pub async fn resolve(
    http: &Client,
    record: &DiscoveryRecord,
    protocol: Option<Protocol>,
) -> Result<PairingCandidate, Rejection> {
    let body = with_retry("description", || async {
        let res = http
            .get(&record.location)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }
        Ok(res.text().await?)
    })
    .await
    .map_err(|e| {
        log::warn!("[Discovery] Description fetch from {} failed: {}", record.location, e);
        Rejection::Fetch(e.to_string())
    })?;

    resolve_description(&body, record, protocol)
}

/// Resolves every record independently and keeps the ones that pass.
pub async fn resolve_all(
    http: &Client,
    records: &[DiscoveryRecord],
    protocol: Option<Protocol>,
) -> Vec<PairingCandidate> {
    join_all(records.iter().map(|r| resolve(http, r, protocol)))
        .await
        .into_iter()
        .filter_map(Result::ok)
        .collect()
}
