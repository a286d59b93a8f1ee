//! Tailscale API access for tailbot.
//!
//! Fetches the devices of a tailnet from the Tailscale administrative API and
//! classifies each one as connected or disconnected based on when it was last
//! seen by the coordination server.
//!
//! # Example
//!
//! ```no_run
//! use tailbot_tailnet::{DeviceSource, TailnetClient};
//!
//! # async fn run() -> tailbot_tailnet::Result<()> {
//! let client = TailnetClient::new("example.com", "tskey-api-xxxx");
//! for device in client.fetch_devices().await? {
//!     println!("{} {:?}", device.hostname, device.connectivity(chrono::Utc::now()));
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod device;
pub mod error;

pub use client::{parse_devices, DeviceSource, TailnetClient, MAX_ERROR_BODY_CHARS, TAILSCALE_API_BASE};
pub use device::{Connectivity, Device, DeviceList, CONNECTED_THRESHOLD_MS};
pub use error::{Result, TailnetError};
