/// Product analytics hooks of the deletion flow.
pub trait DeletionAnalytics: Send + Sync {
    fn deletion_enqueued(&self, count: usize);
    fn deletion_confirmed(&self, count: usize, freed_bytes: i64);
    fn deletion_cancelled(&self, batch_id: &str);
    fn deletion_failed(&self, count: usize);
    fn auto_delete_setting_changed(&self, enabled: bool);
}

/// Writes analytics events to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDeletionAnalytics;

impl DeletionAnalytics for TracingDeletionAnalytics {
    fn deletion_enqueued(&self, count: usize) {
        tracing::info!(target: "analytics", event = "deletion_enqueued", count);
    }

    fn deletion_confirmed(&self, count: usize, freed_bytes: i64) {
        tracing::info!(target: "analytics", event = "deletion_confirmed", count, freed_bytes);
    }

    fn deletion_cancelled(&self, batch_id: &str) {
        tracing::info!(target: "analytics", event = "deletion_cancelled", batch_id);
    }

    fn deletion_failed(&self, count: usize) {
        tracing::info!(target: "analytics", event = "deletion_failed", count);
    }

    fn auto_delete_setting_changed(&self, enabled: bool) {
        tracing::info!(target: "analytics", event = "auto_delete_setting_changed", enabled);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpDeletionAnalytics;

impl DeletionAnalytics for NoOpDeletionAnalytics {
    fn deletion_enqueued(&self, _count: usize) {}
    fn deletion_confirmed(&self, _count: usize, _freed_bytes: i64) {}
    fn deletion_cancelled(&self, _batch_id: &str) {}
    fn deletion_failed(&self, _count: usize) {}
    fn auto_delete_setting_changed(&self, _enabled: bool) {}
}
