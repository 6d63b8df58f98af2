//! Status pseudo-link shown first in every subscription.
//!
//! Clients display the fragment as the entry name, so the link doubles as a
//! read-only quota banner. It points at a placeholder endpoint and never
//! connects anywhere useful.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use percent_encoding::utf8_percent_encode;

use panelsync_core::{STATUS_LINK_HOST, STATUS_LINK_PORT, STATUS_LINK_UUID, bytes_to_gb};

use crate::encode::FRAGMENT;

/// Aggregated quota figures rendered into the banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaStatus {
    pub used_bytes: u64,
    /// Accounting quota (0 = unlimited).
    pub quota_bytes: u64,
    pub next_reset: Option<DateTime<Utc>>,
    /// Expiry in ms since epoch (0 = never).
    pub expiry_ms: i64,
}

impl QuotaStatus {
    #[inline]
    pub fn remaining_bytes(&self) -> u64 {
        self.quota_bytes.saturating_sub(self.used_bytes)
    }

    /// Render the banner text, e.g. `🌐 7.00/10.00 GB 🔁 3d 4h 0m ⏳ 12d 0h 5m`.
    pub fn label(&self, now: DateTime<Utc>) -> String {
        let mut label = if self.quota_bytes == 0 {
            "🌐 Unlimited".to_string()
        } else {
            format!(
                "🌐 {:.2}/{:.2} GB",
                bytes_to_gb(self.remaining_bytes()),
                bytes_to_gb(self.quota_bytes)
            )
        };
        if let Some(reset) = self.next_reset {
            label.push_str(" 🔁 ");
            label.push_str(&format_countdown(reset - now));
        }
        label.push_str(" ⏳ ");
        match Utc.timestamp_millis_opt(self.expiry_ms).single() {
            Some(expiry) if self.expiry_ms > 0 => label.push_str(&format_countdown(expiry - now)),
            _ => label.push_str("Unlimited"),
        }
        label
    }
}

/// Format a duration as `{d}d {h}h {m}m`, or `Passed` when negative.
pub fn format_countdown(delta: TimeDelta) -> String {
    if delta < TimeDelta::zero() {
        return "Passed".to_string();
    }
    let secs = delta.num_seconds();
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;
    format!("{days}d {hours}h {minutes}m")
}

/// Wrap a banner label into the placeholder link.
pub fn status_link(label: &str) -> String {
    format!(
        "vless://{STATUS_LINK_UUID}@{STATUS_LINK_HOST}:{STATUS_LINK_PORT}?type=ws#{}",
        utf8_percent_encode(label, FRAGMENT)
    )
}

#[cfg(test)]
mod tests {
    use panelsync_core::GB_TO_BYTES;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn countdown_format() {
        assert_eq!(
            format_countdown(TimeDelta::days(3) + TimeDelta::hours(4) + TimeDelta::minutes(5)),
            "3d 4h 5m"
        );
        assert_eq!(format_countdown(TimeDelta::seconds(59)), "0d 0h 0m");
        assert_eq!(format_countdown(TimeDelta::minutes(-1)), "Passed");
    }

    #[test]
    fn label_with_reset_and_expiry() {
        let status = QuotaStatus {
            used_bytes: 3 * GB_TO_BYTES,
            quota_bytes: 10 * GB_TO_BYTES,
            next_reset: Some(now() + TimeDelta::days(2)),
            expiry_ms: (now() + TimeDelta::days(10) + TimeDelta::hours(1)).timestamp_millis(),
        };
        assert_eq!(status.label(now()), "🌐 7.00/10.00 GB 🔁 2d 0h 0m ⏳ 10d 1h 0m");
    }

    #[test]
    fn label_over_quota_and_expired() {
        let status = QuotaStatus {
            used_bytes: 12 * GB_TO_BYTES,
            quota_bytes: 10 * GB_TO_BYTES,
            next_reset: None,
            expiry_ms: (now() - TimeDelta::days(1)).timestamp_millis(),
        };
        assert_eq!(status.label(now()), "🌐 0.00/10.00 GB ⏳ Passed");
    }

    #[test]
    fn label_unlimited() {
        let status = QuotaStatus {
            used_bytes: GB_TO_BYTES,
            quota_bytes: 0,
            next_reset: None,
            expiry_ms: 0,
        };
        assert_eq!(status.label(now()), "🌐 Unlimited ⏳ Unlimited");
    }

    #[test]
    fn link_encodes_label() {
        let link = status_link("🌐 7.00/10.00 GB");
        assert_eq!(
            link,
            "vless://00000000-0000-0000-0000-000000000000@1.1.1.1:1?type=ws#%F0%9F%8C%90%207.00/10.00%20GB"
        );
    }
}
