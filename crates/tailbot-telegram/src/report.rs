//! Device status messages.

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Asia::Kolkata;
use tailbot_tailnet::{Connectivity, Device};
use teloxide::utils::html;

/// Shown for fields the API did not return.
const MISSING: &str = "N/A";

/// Connectivity line at the top of a device report.
pub fn connectivity_line(connectivity: Connectivity) -> &'static str {
    match connectivity {
        Connectivity::Connected => "🟢 Connected",
        Connectivity::Disconnected => "🔴 Disconnected",
    }
}

/// Render an instant in Indian Standard Time, e.g. `Mon, Jan 15 3:04 PM IST`.
///
/// The offset of `ts` and the host time zone have no effect on the output.
pub fn format_last_seen<T: TimeZone>(ts: &DateTime<T>) -> String {
    ts.with_timezone(&Kolkata)
        .format("%a, %b %-d %-I:%M %p IST")
        .to_string()
}

/// HTML status report for one device as of `now`.
pub fn format_device_status(device: &Device, now: DateTime<Utc>) -> String {
    let last_seen = device
        .last_seen
        .as_ref()
        .map(format_last_seen)
        .unwrap_or_else(|| MISSING.to_string());

    format!(
        "{}\n\n<b>{}\n\nAddresses:</b>\n<i>IPv4: <code>{}</code>\nIPv6: <code>{}</code></i>\n\n<b>Last seen:</b>\n<i>{}</i>",
        connectivity_line(device.connectivity(now)),
        html::escape(&device.hostname),
        html::escape(device.ipv4().unwrap_or(MISSING)),
        html::escape(device.ipv6().unwrap_or(MISSING)),
        last_seen,
    )
}
