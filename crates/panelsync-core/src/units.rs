//! Byte and time unit conversions.

/// Bytes in one GB as panels count it (binary gigabyte).
pub const GB_TO_BYTES: u64 = 1024 * 1024 * 1024;
/// Milliseconds in one day.
pub const DAYS_TO_MS: i64 = 24 * 60 * 60 * 1000;

/// Convert a GB value to bytes, saturating negatives to zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn gb_to_bytes(gb: f64) -> u64 {
    if gb <= 0.0 {
        0
    } else {
        (gb * GB_TO_BYTES as f64) as u64
    }
}

/// Convert bytes to (fractional) GB.
#[allow(clippy::cast_precision_loss)]
pub fn bytes_to_gb(bytes: u64) -> f64 {
    bytes as f64 / GB_TO_BYTES as f64
}

/// Format bytes to a human readable string.
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
