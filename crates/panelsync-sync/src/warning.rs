//! Quota-warning hysteresis.

use crate::quota::QuotaSummary;

/// Per-account warning state, persisted as the `warning_sent` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningState {
    Normal,
    Warned,
}

impl WarningState {
    #[inline]
    pub fn from_flag(warning_sent: bool) -> Self {
        if warning_sent { Self::Warned } else { Self::Normal }
    }

    #[inline]
    pub fn is_warned(self) -> bool {
        self == Self::Warned
    }
}

/// Action required after evaluating a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    /// Crossed the threshold upward: notify once and set the flag.
    Warn,
    /// Dropped below the threshold: clear the flag silently.
    Clear,
}

impl Transition {
    /// State after applying this transition to `from`.
    pub fn apply(self, from: WarningState) -> WarningState {
        match self {
            Self::Stay => from,
            Self::Warn => WarningState::Warned,
            Self::Clear => WarningState::Normal,
        }
    }
}

/// Threshold check with hysteresis between [`WarningState`]s.
#[derive(Debug, Clone, Copy)]
pub struct WarningPolicy {
    threshold_percent: u8,
}

impl WarningPolicy {
    pub fn new(threshold_percent: u8) -> Self {
        Self { threshold_percent }
    }

    /// Whether usage is at or above the threshold. Unlimited quotas never are.
    pub fn over_threshold(&self, summary: &QuotaSummary) -> bool {
        if summary.quota_bytes == 0 {
            return false;
        }
        u128::from(summary.used_bytes) * 100
            >= u128::from(summary.quota_bytes) * u128::from(self.threshold_percent)
    }

    /// Decide the transition for one pass. Passes without a single
    /// successful read leave the state alone.
    ///
    /// A sum with failed reads is a lower bound on usage: enough to warn,
    /// never enough to clear.
    pub fn evaluate(&self, state: WarningState, summary: &QuotaSummary) -> Transition {
        if !summary.has_reads() {
            return Transition::Stay;
        }
        match (state, self.over_threshold(summary)) {
            (WarningState::Normal, true) => Transition::Warn,
            (WarningState::Warned, false) if summary.failed_reads == 0 => Transition::Clear,
            _ => Transition::Stay,
        }
    }
}
