//! Session-level counters, generalized from the teacher's
//! `variable_versions::metrics::CacheMetrics` (atomics + point-in-time
//! snapshot) to this crate's Session.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracking a [`crate::session::Session`]'s template and record
/// traffic. All fields use atomics for consistent reads even though the
/// Session itself is not safe for concurrent mutation (spec §5).
#[derive(Debug, Default)]
pub struct SessionMetrics {
    pub templates_added: AtomicU64,
    pub templates_revoked: AtomicU64,
    pub template_collisions: AtomicU64,
    pub records_encoded: AtomicU64,
    pub records_decoded: AtomicU64,
    pub sets_skipped_unknown_template: AtomicU64,
    pub elements_auto_learned: AtomicU64,
}

impl SessionMetrics {
    pub fn new() -> Self {
        SessionMetrics::default()
    }

    pub fn snapshot(&self) -> SessionMetricsSnapshot {
        SessionMetricsSnapshot {
            templates_added: self.templates_added.load(Ordering::Relaxed),
            templates_revoked: self.templates_revoked.load(Ordering::Relaxed),
            template_collisions: self.template_collisions.load(Ordering::Relaxed),
            records_encoded: self.records_encoded.load(Ordering::Relaxed),
            records_decoded: self.records_decoded.load(Ordering::Relaxed),
            sets_skipped_unknown_template: self
                .sets_skipped_unknown_template
                .load(Ordering::Relaxed),
            elements_auto_learned: self.elements_auto_learned.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of [`SessionMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionMetricsSnapshot {
    pub templates_added: u64,
    pub templates_revoked: u64,
    pub template_collisions: u64,
    pub records_encoded: u64,
    pub records_decoded: u64,
    pub sets_skipped_unknown_template: u64,
    pub elements_auto_learned: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_counters() {
        let metrics = SessionMetrics::new();
        SessionMetrics::inc(&metrics.templates_added);
        SessionMetrics::inc(&metrics.templates_added);
        SessionMetrics::inc(&metrics.records_decoded);
        let snap = metrics.snapshot();
        assert_eq!(snap.templates_added, 2);
        assert_eq!(snap.records_decoded, 1);
        assert_eq!(snap.templates_revoked, 0);
    }
}
