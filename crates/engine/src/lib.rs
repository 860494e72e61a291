pub mod commands;
pub mod config;
pub mod error;
pub mod notify;
pub mod phase;
pub mod processor;
pub mod undo;

#[cfg(test)]
mod testing;

pub use commands::{ManualResult, Openers};
pub use config::EngineConfig;
pub use error::EngineError;
pub use notify::{MatchSignal, NotificationSink, NullSink, TracingSink};

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tracing::{info, warn};

use crease_core::{DeliveryEvent, Match, MatchId, MatchSetup, PlayerId, Toss};
use crease_storage::{MatchStore, StorageError};

/// Command surface over a [`MatchStore`].
///
/// Every mutating command runs load, apply, save under a per-match lock.
/// Another writer sharing the store can still win the race; the save then
/// fails its version check and the command is re-applied to the fresh
/// document, up to `max_save_attempts` times. Signals are published only
/// after the save that produced them succeeds.
pub struct ScoringEngine<S: MatchStore> {
    store: S,
    sink: Arc<dyn NotificationSink>,
    locks: DashMap<MatchId, Arc<Mutex<()>>>,
    config: EngineConfig,
}

impl<S: MatchStore> ScoringEngine<S> {
    pub fn new(store: S, sink: Arc<dyn NotificationSink>, config: EngineConfig) -> Self {
        Self {
            store,
            sink,
            locks: DashMap::new(),
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn create_match(&self, setup: &MatchSetup) -> Result<Match, EngineError> {
        let m = Match::from_setup(setup)?;
        self.store.insert(&m)?;
        info!(match_id = %m.match_id, overs = m.overs, "match created");
        Ok(m)
    }

    pub fn get_match(&self, match_id: MatchId) -> Result<Match, EngineError> {
        self.store
            .load(match_id)?
            .ok_or_else(|| EngineError::NotFound(format!("match {match_id}")))
    }

    pub fn list_matches(&self) -> Result<Vec<MatchId>, EngineError> {
        Ok(self.store.list()?)
    }

    pub fn record_toss(&self, match_id: MatchId, toss: Toss) -> Result<Match, EngineError> {
        self.mutate(match_id, "record_toss", |m| commands::record_toss(m, toss))
    }

    pub fn start_inning(&self, match_id: MatchId, openers: Openers) -> Result<Match, EngineError> {
        self.mutate(match_id, "start_inning", |m| commands::start_inning(m, openers))
    }

    pub fn submit_delivery(
        &self,
        match_id: MatchId,
        event: &DeliveryEvent,
    ) -> Result<Match, EngineError> {
        self.mutate(match_id, "submit_delivery", |m| {
            commands::submit_delivery(m, event)
        })
    }

    pub fn undo_delivery(&self, match_id: MatchId) -> Result<Match, EngineError> {
        self.mutate(match_id, "undo_delivery", |m| {
            undo::undo_last(m).map(|(_, signals)| signals)
        })
    }

    pub fn change_bowler(&self, match_id: MatchId, bowler: PlayerId) -> Result<Match, EngineError> {
        self.mutate(match_id, "change_bowler", |m| commands::change_bowler(m, bowler))
    }

    pub fn change_strike(&self, match_id: MatchId) -> Result<Match, EngineError> {
        self.mutate(match_id, "change_strike", commands::change_strike)
    }

    pub fn select_batter(&self, match_id: MatchId, batter: PlayerId) -> Result<Match, EngineError> {
        self.mutate(match_id, "select_batter", |m| commands::select_batter(m, batter))
    }

    pub fn start_super_over(&self, match_id: MatchId) -> Result<Match, EngineError> {
        self.mutate(match_id, "start_super_over", commands::start_super_over)
    }

    pub fn end_inning_manually(&self, match_id: MatchId) -> Result<Match, EngineError> {
        self.mutate(match_id, "end_inning_manually", commands::end_inning_manually)
    }

    pub fn end_match_manually(
        &self,
        match_id: MatchId,
        outcome: ManualResult,
    ) -> Result<Match, EngineError> {
        self.mutate(match_id, "end_match_manually", |m| {
            commands::end_match_manually(m, outcome)
        })
    }

    fn mutate<F>(
        &self,
        match_id: MatchId,
        command: &'static str,
        apply: F,
    ) -> Result<Match, EngineError>
    where
        F: Fn(&mut Match) -> Result<Vec<MatchSignal>, EngineError>,
    {
        let lock = self.locks.entry(match_id).or_default().value().clone();
        let outcome = {
            // The mutex guards no data.
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.apply_and_save(match_id, command, apply)
        };
        drop(lock);
        // Only the map's handle left means no other command is waiting.
        self.locks.remove_if(&match_id, |_, lock| Arc::strong_count(lock) == 1);
        outcome
    }

    fn apply_and_save<F>(
        &self,
        match_id: MatchId,
        command: &'static str,
        apply: F,
    ) -> Result<Match, EngineError>
    where
        F: Fn(&mut Match) -> Result<Vec<MatchSignal>, EngineError>,
    {
        let attempts = self.config.max_save_attempts.max(1);
        for attempt in 1..=attempts {
            let mut doc = self.get_match(match_id)?;
            let signals = match apply(&mut doc) {
                Ok(signals) => signals,
                Err(e) => {
                    warn!(%match_id, command, error = %e, "command rejected");
                    return Err(e);
                }
            };

            match self.store.save(&doc) {
                Ok(version) => {
                    doc.version = version;
                    info!(%match_id, command, version, status = %doc.status, "command applied");
                    for signal in signals {
                        self.sink.publish(match_id, signal);
                    }
                    return Ok(doc);
                }
                Err(StorageError::VersionConflict { expected, found, .. }) => {
                    warn!(%match_id, command, attempt, expected, found, "version conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::PersistenceConflict { match_id, attempts })
    }
}
