//! Default value functions for serde deserialization.
//!
//! These functions forward to constants defined in `panelsync_core::defaults`.

use panelsync_core::defaults;

/// Generate default value functions that forward to panelsync_core::defaults constants.
macro_rules! default_fns {
    // For Copy types (integers, bool, etc.)
    ($($fn_name:ident => $const_name:ident : $ty:ty),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> $ty {
                defaults::$const_name
            }
        )*
    };
}

/// Generate default value functions that return String from &str constants.
macro_rules! default_string_fns {
    ($($fn_name:ident => $const_name:ident),* $(,)?) => {
        $(
            pub(crate) fn $fn_name() -> String {
                defaults::$const_name.to_string()
            }
        )*
    };
}

default_fns! {
    default_sync_interval_secs      => DEFAULT_SYNC_INTERVAL_SECS: u64,
    default_sync_concurrency        => DEFAULT_SYNC_CONCURRENCY: usize,
    default_warning_threshold       => DEFAULT_WARNING_THRESHOLD_PERCENT: u8,
    default_call_timeout_secs       => DEFAULT_PANEL_CALL_TIMEOUT_SECS: u64,
    default_connect_timeout_secs    => DEFAULT_PANEL_CONNECT_TIMEOUT_SECS: u64,
    default_insecure_skip_verify    => DEFAULT_INSECURE_SKIP_VERIFY: bool,
    default_total_gb                => DEFAULT_TOTAL_GB: f64,
    default_duration_days           => DEFAULT_DURATION_DAYS: u32,
    default_notify_timeout_secs     => DEFAULT_NOTIFY_TIMEOUT_SECS: u64,
}

default_string_fns! {
    default_panel_path       => DEFAULT_PANEL_PATH,
    default_subscription_dir => DEFAULT_SUBSCRIPTION_DIR,
    default_registry_path    => DEFAULT_REGISTRY_PATH,
}
