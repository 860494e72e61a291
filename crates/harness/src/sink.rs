use std::sync::Mutex;

use crease_core::MatchId;
use crease_engine::{MatchSignal, NotificationSink};

/// Keeps every published signal in order for later inspection.
#[derive(Default)]
pub struct RecordingSink {
    published: Mutex<Vec<(MatchId, MatchSignal)>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<(MatchId, MatchSignal)> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Signals for one match, oldest first.
    pub fn signals_for(&self, match_id: MatchId) -> Vec<MatchSignal> {
        self.signals()
            .into_iter()
            .filter(|(id, _)| *id == match_id)
            .map(|(_, signal)| signal)
            .collect()
    }

    pub fn count(&self, match_id: MatchId, signal: MatchSignal) -> usize {
        self.signals_for(match_id)
            .into_iter()
            .filter(|s| *s == signal)
            .count()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<(MatchId, MatchSignal)> {
        self.published
            .lock()
            .map(|mut p| std::mem::take(&mut *p))
            .unwrap_or_default()
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&self, match_id: MatchId, signal: MatchSignal) {
        if let Ok(mut published) = self.published.lock() {
            published.push((match_id, signal));
        }
    }
}
