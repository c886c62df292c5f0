//! `YAMAHA_AV` request envelopes and HTTP transport.
//!
//! Every legacy call is a POST of one XML document to the control URL:
//!
//! ```text
//! <YAMAHA_AV cmd="PUT"><Main_Zone><Volume><Mute>On</Mute></Volume></Main_Zone></YAMAHA_AV>
//! ```

use std::fmt;
use std::time::Duration;

use reqwest::Client;

use crate::protocol_constants::{HTTP_TIMEOUT_SECS, LEGACY_ROOT_ELEMENT};
use crate::yamaha::transport::{ClientError, ClientResult};

/// Envelope command attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Get,
    Put,
}

impl Command {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wraps a zone fragment in the request envelope.
#[must_use]
pub fn build_envelope(command: Command, zone: &str, fragment: &str) -> String {
    format!(
        r#"<{root} cmd="{cmd}"><{zone}>{fragment}</{zone}></{root}>"#,
        root = LEGACY_ROOT_ELEMENT,
        cmd = command,
        zone = zone,
        fragment = fragment
    )
}

/// Sends one envelope and returns the response body.
///
/// Non-2xx answers become [`ClientError::HttpStatus`] carrying the body.
pub async fn send_envelope(
    client: &Client,
    control_url: &str,
    command: Command,
    zone: &str,
    fragment: &str,
) -> ClientResult<String> {
    let body = build_envelope(command, zone, fragment);

    log::debug!("[Legacy] {} {} -> {}", command, zone, control_url);
    log::trace!("[Legacy] Request body: {}", body);

    let start = std::time::Instant::now();
    let res = client
        .post(control_url)
        .header("Content-Type", "text/xml; charset=\"utf-8\"")
        .body(body)
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .send()
        .await;

    log::debug!(
        "[Legacy] {} {} completed in {:?}: {:?}",
        command,
        zone,
        start.elapsed(),
        res.as_ref().map(|r| r.status())
    );

    let res = res?;
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        return Err(ClientError::HttpStatus {
            status: status.as_u16(),
            body: text,
        });
    }

    log::trace!("[Legacy] Response body: {}", text);
    Ok(text)
}

/// Fluent builder for legacy requests.
///
/// ```ignore
/// let xml = EnvelopeBuilder::new(&client, &control_url)
///     .get()
///     .zone("Main_Zone")
///     .fragment("<Basic_Status>GetParam</Basic_Status>")
///     .send()
///     .await?;
/// ```
pub struct EnvelopeBuilder<'a> {
    client: &'a Client,
    control_url: &'a str,
    command: Option<Command>,
    zone: Option<&'a str>,
    fragment: String,
}

impl<'a> EnvelopeBuilder<'a> {
    #[must_use]
    pub fn new(client: &'a Client, control_url: &'a str) -> Self {
        Self {
            client,
            control_url,
            command: None,
            zone: None,
            fragment: String::new(),
        }
    }

    #[must_use]
    pub fn get(mut self) -> Self {
        self.command = Some(Command::Get);
        self
    }

    #[must_use]
    pub fn put(mut self) -> Self {
        self.command = Some(Command::Put);
        self
    }

    #[must_use]
    pub fn zone(mut self, zone: &'a str) -> Self {
        self.zone = Some(zone);
        self
    }

    #[must_use]
    pub fn fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = fragment.into();
        self
    }

    pub async fn send(self) -> ClientResult<String> {
        let command = self
            .command
            .ok_or(ClientError::Unsupported("envelope without command"))?;
        let zone = self
            .zone
            .ok_or(ClientError::Unsupported("envelope without zone"))?;
        send_envelope(self.client, self.control_url, command, zone, &self.fragment).await
    }

    /// Returns the request parts without sending (for testing).
    #[cfg(test)]
    pub fn into_parts(self) -> Option<(Command, &'a str, String)> {
        Some((self.command?, self.zone?, self.fragment))
    }
}
