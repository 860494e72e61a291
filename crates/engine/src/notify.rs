use std::fmt;

use tracing::info;

use crease_core::MatchId;

/// Phase-change signals broadcast to observers of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchSignal {
    ScoreUpdated,
    OverCompleted,
    InningCompleted,
    MatchTied,
    SuperOverTied,
    MatchCompleted,
    WicketFallen,
}

impl MatchSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ScoreUpdated => "scoreUpdated",
            Self::OverCompleted => "overCompleted",
            Self::InningCompleted => "inningCompleted",
            Self::MatchTied => "matchTied",
            Self::SuperOverTied => "superOverTied",
            Self::MatchCompleted => "matchCompleted",
            Self::WicketFallen => "wicketFallen",
        }
    }
}

impl fmt::Display for MatchSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives signals after the state that produced them has been saved.
/// Delivery to subscribers is the sink's concern; publishing never fails.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, match_id: MatchId, signal: MatchSignal);
}

/// Writes every signal to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn publish(&self, match_id: MatchId, signal: MatchSignal) {
        info!(%match_id, signal = signal.as_str(), "match signal");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn publish(&self, _match_id: MatchId, _signal: MatchSignal) {}
}
