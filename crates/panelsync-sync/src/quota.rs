//! Per-user quota aggregation across server/inbound pairs.

use chrono::{DateTime, TimeZone, Utc};

use panelsync_link::QuotaStatus;
use panelsync_panel::{InboundConfig, PanelError, TrafficSample};

use crate::reset::next_reset;

/// Aggregated usage for one user over one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaSummary {
    pub used_bytes: u64,
    /// Accounting quota from the account policy (0 = unlimited).
    pub quota_bytes: u64,
    /// First non-zero expiry seen in pair order (0 = none).
    pub master_expiry_ms: i64,
    pub next_reset: Option<DateTime<Utc>>,
    pub successful_reads: usize,
    pub failed_reads: usize,
}

impl QuotaSummary {
    #[inline]
    pub fn remaining_bytes(&self) -> u64 {
        self.quota_bytes.saturating_sub(self.used_bytes)
    }

    /// Whether usage is known at all this pass.
    #[inline]
    pub fn has_reads(&self) -> bool {
        self.successful_reads > 0
    }

    /// Usage as a percentage of quota; `None` for unlimited quotas.
    pub fn usage_percent(&self) -> Option<f64> {
        if self.quota_bytes == 0 {
            return None;
        }
        #[expect(clippy::cast_precision_loss)]
        let percent = self.used_bytes as f64 * 100.0 / self.quota_bytes as f64;
        Some(percent)
    }

    /// Figures for the status banner.
    pub fn status(&self) -> QuotaStatus {
        QuotaStatus {
            used_bytes: self.used_bytes,
            quota_bytes: self.quota_bytes,
            next_reset: self.next_reset,
            expiry_ms: self.master_expiry_ms,
        }
    }
}

/// Accumulates traffic reads and inbound reset data for one user.
///
/// Failed reads are counted but contribute nothing to the sum; a missing
/// traffic row (`Ok(None)`) is a successful read of zero.
#[derive(Debug)]
pub struct QuotaAggregator {
    summary: QuotaSummary,
}

impl QuotaAggregator {
    pub fn new(quota_bytes: u64) -> Self {
        Self {
            summary: QuotaSummary {
                used_bytes: 0,
                quota_bytes,
                master_expiry_ms: 0,
                next_reset: None,
                successful_reads: 0,
                failed_reads: 0,
            },
        }
    }

    /// Record the outcome of one traffic read.
    pub fn record_read(&mut self, read: Result<Option<TrafficSample>, &PanelError>) {
        match read {
            Ok(sample) => {
                self.summary.successful_reads += 1;
                if let Some(sample) = sample {
                    self.summary.used_bytes = self.summary.used_bytes.saturating_add(sample.used());
                    if self.summary.master_expiry_ms == 0 && sample.expiry_ms > 0 {
                        self.summary.master_expiry_ms = sample.expiry_ms;
                    }
                }
            }
            Err(_) => self.summary.failed_reads += 1,
        }
    }

    /// Count a pair that could not be read at all (no session).
    #[inline]
    pub fn record_unavailable(&mut self) {
        self.summary.failed_reads += 1;
    }

    /// Fold an inbound's reset schedule into the earliest upcoming reset.
    pub fn record_inbound<Tz: TimeZone>(&mut self, inbound: &InboundConfig, tz: &Tz) {
        let Some(next) = next_reset(inbound.last_reset_ms, inbound.reset_interval, tz) else {
            return;
        };
        self.summary.next_reset = Some(match self.summary.next_reset {
            Some(current) => current.min(next),
            None => next,
        });
    }

    pub fn finish(self) -> QuotaSummary {
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use panelsync_core::GB_TO_BYTES;

    use super::*;

    fn sample(up: u64, down: u64, expiry_ms: i64) -> TrafficSample {
        TrafficSample {
            uploaded: up,
            downloaded: down,
            total_bytes: 0,
            expiry_ms,
        }
    }

    #[test]
    fn sums_successful_reads() {
        let mut agg = QuotaAggregator::new(10 * GB_TO_BYTES);
        agg.record_read(Ok(Some(sample(1, 2, 0))));
        agg.record_read(Ok(Some(sample(30, 40, 0))));
        agg.record_read(Ok(None));
        let summary = agg.finish();
        assert_eq!(summary.used_bytes, 73);
        assert_eq!(summary.successful_reads, 3);
        assert_eq!(summary.failed_reads, 0);
    }

    #[test]
    fn failed_read_contributes_nothing() {
        let err = PanelError::Timeout;
        let mut agg = QuotaAggregator::new(10 * GB_TO_BYTES);
        agg.record_read(Ok(Some(sample(GB_TO_BYTES, 2 * GB_TO_BYTES, 0))));
        agg.record_read(Err(&err));
        agg.record_unavailable();
        let summary = agg.finish();
        assert_eq!(summary.used_bytes, 3 * GB_TO_BYTES);
        assert_eq!(summary.remaining_bytes(), 7 * GB_TO_BYTES);
        assert_eq!(summary.failed_reads, 2);
        assert!(summary.has_reads());
    }

    #[test]
    fn first_non_zero_expiry_wins() {
        let mut agg = QuotaAggregator::new(0);
        agg.record_read(Ok(Some(sample(0, 0, 0))));
        agg.record_read(Ok(Some(sample(0, 0, 2_000))));
        agg.record_read(Ok(Some(sample(0, 0, 1_000))));
        assert_eq!(agg.finish().master_expiry_ms, 2_000);
    }

    #[test]
    fn usage_percent() {
        let mut agg = QuotaAggregator::new(10 * GB_TO_BYTES);
        agg.record_read(Ok(Some(sample(0, 9 * GB_TO_BYTES, 0))));
        let percent = agg.finish().usage_percent().unwrap();
        assert!((percent - 90.0).abs() < 1e-9);

        let unlimited = QuotaAggregator::new(0).finish();
        assert_eq!(unlimited.usage_percent(), None);
        assert!(!unlimited.has_reads());
    }

    #[test]
    fn earliest_reset_across_inbounds() {
        use panelsync_panel::{ResetInterval, Security, StreamSettings, Transport};

        let day_ms = 86_400_000;
        let inbound = |interval, last| InboundConfig {
            id: 1,
            remark: String::new(),
            protocol: "vless".into(),
            enabled: true,
            listen: String::new(),
            port: 443,
            clients: Vec::new(),
            stream: Ok(StreamSettings {
                transport: Transport::Tcp {
                    http_header: false,
                    http_path: None,
                },
                security: Security::None,
                external_proxies: Vec::new(),
            }),
            reset_interval: interval,
            last_reset_ms: last,
        };

        let mut agg = QuotaAggregator::new(0);
        agg.record_inbound(&inbound(ResetInterval::Monthly, 10 * day_ms), &Utc);
        agg.record_inbound(&inbound(ResetInterval::Weekly, 20 * day_ms), &Utc);
        agg.record_inbound(&inbound(ResetInterval::Daily, 0), &Utc);
        agg.record_inbound(&inbound(ResetInterval::Never, day_ms), &Utc);
        let next = agg.finish().next_reset.unwrap();
        assert_eq!(next.timestamp_millis(), 27 * day_ms);
    }
}
