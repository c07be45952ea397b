use std::time::Instant;

/// Throughput accounting for the sync service.
pub struct SyncMetrics {
    started_at: Instant,
    imported: u64,
}

impl SyncMetrics {
    pub fn register() -> Self {
        Self { started_at: Instant::now(), imported: 0 }
    }

    pub fn record_imported(&mut self, count: u64) {
        self.imported += count;
    }

    pub fn imported(&self) -> u64 {
        self.imported
    }

    /// Blocks imported per second since the service started.
    pub fn throughput(&self) -> f64 {
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.imported as f64 / elapsed
        } else {
            0.0
        }
    }
}
