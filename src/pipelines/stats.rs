use std::time::{Duration, Instant};

/// Statistics for one sentiment prediction.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    /// Total execution time, tokenization included.
    pub total_time: Duration,
    /// Sequence length fed to the model.
    pub tokens_processed: usize,
}

impl PipelineStats {
    /// Create a new stats tracker (call at start of operation).
    pub(crate) fn start() -> PipelineStatsBuilder {
        PipelineStatsBuilder {
            start_time: Instant::now(),
        }
    }
}

/// Tracks timing from creation to finish.
pub(crate) struct PipelineStatsBuilder {
    start_time: Instant,
}

impl PipelineStatsBuilder {
    pub fn finish(self, tokens_processed: usize) -> PipelineStats {
        PipelineStats {
            total_time: self.start_time.elapsed(),
            tokens_processed,
        }
    }
}
