//! Device records returned by the Tailscale API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A device last seen at most this long ago counts as connected.
pub const CONNECTED_THRESHOLD_MS: i64 = 5 * 60 * 1000;

/// Body of `GET /api/v2/tailnet/{tailnet}/devices`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceList {
    /// Devices in the tailnet, in API order.
    pub devices: Vec<Device>,
}

/// A single tailnet device.
///
/// Only the fields the bot reports on are kept; the API returns many more.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Machine hostname.
    pub hostname: String,
    /// Tailnet addresses, IPv4 first then IPv6.
    #[serde(default)]
    pub addresses: Vec<String>,
    /// When the coordination server last heard from the device.
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Whether a device is currently reachable on the tailnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl Connectivity {
    /// Classify a last-seen timestamp against `now`.
    ///
    /// The threshold is inclusive; a device that has never been seen is
    /// disconnected.
    pub fn classify(last_seen: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match last_seen {
            Some(seen) if (now - seen).num_milliseconds() <= CONNECTED_THRESHOLD_MS => {
                Connectivity::Connected
            }
            _ => Connectivity::Disconnected,
        }
    }

    pub fn is_connected(self) -> bool {
        self == Connectivity::Connected
    }
}

impl Device {
    /// Create a device record.
    pub fn new(
        hostname: impl Into<String>,
        addresses: Vec<String>,
        last_seen: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            addresses,
            last_seen,
        }
    }

    /// The IPv4 tailnet address, if the API returned one.
    pub fn ipv4(&self) -> Option<&str> {
        self.addresses.first().map(String::as_str)
    }

    /// The IPv6 tailnet address, if the API returned one.
    pub fn ipv6(&self) -> Option<&str> {
        self.addresses.get(1).map(String::as_str)
    }

    /// Connectivity of this device as of `now`.
    pub fn connectivity(&self, now: DateTime<Utc>) -> Connectivity {
        Connectivity::classify(self.last_seen, now)
    }
}
