// src/watch/queue.rs

use std::collections::BTreeSet;

use tracing::debug;

/// Paths that changed since a binding last started its task.
///
/// However many events pile up while a task runs, draining the queue yields
/// a single batch, i.e. at most one follow-up run. Duplicate paths collapse.
#[derive(Debug, Default)]
pub struct ChangeQueue {
    pending: BTreeSet<String>,
    events: usize,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of distinct paths waiting.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Record one change event. Returns false if the path was already queued.
    pub fn record(&mut self, rel_path: impl Into<String>) -> bool {
        let rel_path = rel_path.into();
        self.events += 1;
        let inserted = self.pending.insert(rel_path.clone());
        debug!(path = %rel_path, inserted, "queued change");
        inserted
    }

    /// Take everything queued so far as one batch, sorted.
    pub fn drain(&mut self) -> Vec<String> {
        let batch: Vec<String> = std::mem::take(&mut self.pending).into_iter().collect();
        debug!(
            paths = batch.len(),
            events = self.events,
            "drained queued changes into one run"
        );
        self.events = 0;
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bursts_collapse_into_one_batch() {
        let mut queue = ChangeQueue::new();
        assert!(queue.record("src/js/a.js"));
        assert!(!queue.record("src/js/a.js"));
        assert!(queue.record("src/js/b.js"));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.drain(), vec!["src/js/a.js", "src/js/b.js"]);
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }
}
