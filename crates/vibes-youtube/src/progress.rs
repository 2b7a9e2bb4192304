//! Progress reporting channel between backends and the worker.
//!
//! Backends emit [`ProgressPayload`] values on an unbounded channel; the
//! worker side drains them into job-row updates. Three payload shapes exist
//! because different fetch phases naturally carry different context; the
//! receiver is required to coerce all of them to the same `(processed,
//! total)` pair and must drop updates it cannot coerce.

use serde_json::{Map, Value};

/// One progress update from a backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressPayload {
    /// Bare counts.
    Counts { processed: u64, total: u64 },
    /// Counts plus phase metadata (e.g. `{"phase": "fetching_ids"}`).
    CountsWithMeta {
        processed: u64,
        total: u64,
        meta: Map<String, Value>,
    },
    /// Free-form map containing at least `processed` and `total` keys.
    Map(Map<String, Value>),
}

impl ProgressPayload {
    pub fn counts(processed: u64, total: u64) -> Self {
        Self::Counts { processed, total }
    }

    pub fn with_meta(processed: u64, total: u64, meta: Map<String, Value>) -> Self {
        Self::CountsWithMeta {
            processed,
            total,
            meta,
        }
    }
}

/// Sending half handed to a backend for one fetch.
pub type ProgressSender = tokio::sync::mpsc::UnboundedSender<ProgressPayload>;

/// Emit a progress payload if a channel is attached.
///
/// A closed channel means the receiving side has gone away (shutdown or an
/// abandoned job); the update is silently discarded.
pub fn send_progress(progress: Option<&ProgressSender>, payload: ProgressPayload) {
    if let Some(sender) = progress {
        let _ = sender.send(payload);
    }
}
