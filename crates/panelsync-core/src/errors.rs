//! Error kind labels for metrics and logging.
//!
//! These constants provide consistent error classification across all crates.

/// Panel rejected the credentials.
pub const ERROR_AUTH: &str = "auth";
/// Network-level failure talking to a panel.
pub const ERROR_TRANSPORT: &str = "transport";
/// Panel call exceeded its timeout.
pub const ERROR_TIMEOUT: &str = "timeout";
/// Inbound or client absent.
pub const ERROR_NOT_FOUND: &str = "not_found";
/// Client already exists.
pub const ERROR_CONFLICT: &str = "conflict";
/// Panel answered with malformed data.
pub const ERROR_DECODE: &str = "decode";
/// Panel answered `success: false`.
pub const ERROR_REJECTED: &str = "rejected";
/// Subscription artifact write failure.
pub const ERROR_PUBLISH: &str = "publish";
/// Account registry read/write failure.
pub const ERROR_REGISTRY: &str = "registry";
/// Configuration could not be loaded or is invalid.
pub const ERROR_CONFIG: &str = "config";
/// Notification could not be queued or delivered.
pub const ERROR_NOTIFY: &str = "notify";
/// Worker task or runtime failure.
pub const ERROR_INTERNAL: &str = "internal";
