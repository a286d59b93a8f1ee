//! Tailscale administrative API client.

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::device::{Device, DeviceList};
use crate::error::{Result, TailnetError};

/// Tailscale API base URL.
pub const TAILSCALE_API_BASE: &str = "https://api.tailscale.com";

/// Characters of an error response body kept in [`TailnetError::Status`].
pub const MAX_ERROR_BODY_CHARS: usize = 512;

/// Anything that can list the devices of a tailnet.
#[async_trait]
pub trait DeviceSource: Send + Sync {
    /// Fetch the current device list. Called once per request, never cached.
    async fn fetch_devices(&self) -> Result<Vec<Device>>;
}

/// Client for the tailnet device-listing endpoint.
///
/// Authenticates with HTTP Basic auth, the API key as username and an empty
/// password. Performs no retries.
#[derive(Clone)]
pub struct TailnetClient {
    client: reqwest::Client,
    base_url: String,
    tailnet: String,
    api_key: String,
}

impl TailnetClient {
    /// Create a client for `tailnet` against the public Tailscale API.
    pub fn new(tailnet: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: TAILSCALE_API_BASE.to_string(),
            tailnet: tailnet.into(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a different API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The tailnet this client lists devices for.
    pub fn tailnet(&self) -> &str {
        &self.tailnet
    }

    /// Full URL of the device-listing endpoint.
    pub fn devices_url(&self) -> String {
        format!(
            "{}/api/v2/tailnet/{}/devices",
            self.base_url.trim_end_matches('/'),
            self.tailnet
        )
    }
}

#[async_trait]
impl DeviceSource for TailnetClient {
    async fn fetch_devices(&self) -> Result<Vec<Device>> {
        let url = self.devices_url();
        debug!(tailnet = %self.tailnet, "Fetching tailnet devices");

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.api_key, Some(""))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        trace!(status = %status, bytes = body.len(), "Device list response received");

        if !status.is_success() {
            return Err(TailnetError::Status {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let devices = parse_devices(&body)?;
        debug!(count = devices.len(), "Tailnet devices fetched");
        Ok(devices)
    }
}

/// Parse a device-listing response body.
pub fn parse_devices(body: &str) -> Result<Vec<Device>> {
    let list: DeviceList = serde_json::from_str(body)?;
    Ok(list.devices)
}
