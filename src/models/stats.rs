use serde::Serialize;

/// Terminal state of one record's pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RecordOutcome {
    Done { public_url: String },
    NoImage,
    FetchFailed,
    UploadFailed,
    Error(String),
}

/// Counters for one invocation. Built fresh per run and returned by the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub no_image: usize,
    pub errors: Vec<String>,
}

impl RunStatistics {
    /// Counts a finished record. Every outcome bumps `total` and exactly one other counter.
    pub fn record(&mut self, outcome: &RecordOutcome) {
        self.total += 1;
        match outcome {
            RecordOutcome::Done { .. } => self.success += 1,
            RecordOutcome::NoImage => self.no_image += 1,
            RecordOutcome::FetchFailed | RecordOutcome::UploadFailed => self.failed += 1,
            RecordOutcome::Error(msg) => {
                self.failed += 1;
                self.errors.push(msg.clone());
            }
        }
    }

    pub fn merge(&mut self, other: RunStatistics) {
        self.total += other.total;
        self.success += other.success;
        self.failed += other.failed;
        self.no_image += other.no_image;
        self.errors.extend(other.errors);
    }

    pub fn processed(&self) -> usize {
        self.success + self.failed + self.no_image
    }

    pub fn success_rate(&self) -> f64 {
        self.success as f64 / self.total.max(1) as f64 * 100.0
    }
}
