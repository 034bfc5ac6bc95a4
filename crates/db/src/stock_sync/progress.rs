//! Records which stages of a multi-table write have completed.

use std::sync::{Mutex, PoisonError};

use super::StockSyncError;

/// Stage recorder shared by the concurrent sub-writes of one operation.
///
/// Each stage is listed once, in the order it first completed.
#[derive(Debug)]
pub struct Progress {
    verb: &'static str,
    stages: Mutex<Vec<&'static str>>,
}

impl Progress {
    /// `verb` describes the operation in messages, e.g. `"inserted"`.
    pub fn new(verb: &'static str) -> Self {
        Self {
            verb,
            stages: Mutex::new(Vec::new()),
        }
    }

    pub fn record(&self, stage: &'static str) {
        let mut stages = self.stages.lock().unwrap_or_else(PoisonError::into_inner);
        if !stages.contains(&stage) {
            stages.push(stage);
        }
    }

    pub fn stages(&self) -> Vec<&'static str> {
        self.stages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `"<verb> a, b"`, or `"nothing <verb>"` before the first stage.
    pub fn summary(&self) -> String {
        let stages = self.stages();
        if stages.is_empty() {
            format!("nothing {}", self.verb)
        } else {
            format!("{} {}", self.verb, stages.join(", "))
        }
    }

    pub fn success_message(&self) -> String {
        format!("Success {}", self.summary())
    }

    /// Wrap a storage error, logging it with the completed stages.
    pub fn fail(&self, source: sqlx::Error) -> StockSyncError {
        let completed = self.summary();
        tracing::error!(error = %source, completed = %completed, "Stock write aborted");
        StockSyncError::StorageFailure { completed, source }
    }
}
