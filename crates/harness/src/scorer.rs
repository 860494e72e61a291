use std::sync::Arc;

use tempfile::TempDir;

use crease_core::{
    DeliveryEvent, Match, MatchId, MatchSetup, PlayerId, TeamId, TeamSetup, Toss, TossDecision,
};
use crease_engine::{EngineConfig, EngineError, Openers, ScoringEngine};
use crease_storage::{SqliteStore, StorageError};

use crate::sink::RecordingSink;

/// Eleven players named after the side, plus one substitute.
pub fn team_setup(name: &str) -> TeamSetup {
    TeamSetup {
        name: name.to_string(),
        players: (1..=11).map(|i| format!("{name} {i}")).collect(),
        substitutes: vec![format!("{name} 12th")],
        captain: Some(0),
    }
}

pub fn standard_setup(overs: u32) -> MatchSetup {
    MatchSetup {
        overs,
        team_a: team_setup("Kestrels"),
        team_b: team_setup("Ravens"),
    }
}

/// A scoring engine over a private store, recording every signal it publishes.
pub struct TestScorer {
    pub engine: ScoringEngine<SqliteStore>,
    pub sink: Arc<RecordingSink>,
    _dir: Option<TempDir>,
}

impl TestScorer {
    pub fn new() -> Result<Self, StorageError> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, StorageError> {
        let sink = Arc::new(RecordingSink::new());
        Ok(Self {
            engine: ScoringEngine::new(SqliteStore::open_in_memory()?, sink.clone(), config),
            sink,
            _dir: None,
        })
    }

    /// Backed by a database file in a temporary directory removed on drop.
    pub fn on_disk() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("crease.db");
        let store = SqliteStore::open(path.to_str().ok_or("non-utf8 temp path")?)?;
        let sink = Arc::new(RecordingSink::new());
        Ok(Self {
            engine: ScoringEngine::new(store, sink.clone(), EngineConfig::default()),
            sink,
            _dir: Some(dir),
        })
    }

    pub fn create_match(&self, overs: u32) -> Result<Match, EngineError> {
        self.engine.create_match(&standard_setup(overs))
    }

    /// Create a match, give the toss to team A who bat, and open the first inning.
    pub fn started_match(&self, overs: u32) -> Result<Match, EngineError> {
        let m = self.create_match(overs)?;
        let toss = Toss {
            winner: m.team_a.team_id,
            decision: TossDecision::Bat,
        };
        self.engine.record_toss(m.match_id, toss)?;
        self.open_inning(m.match_id)
    }

    /// Open the live inning with the batting side's first two players and the
    /// fielding side's last player bowling.
    pub fn open_inning(&self, match_id: MatchId) -> Result<Match, EngineError> {
        let m = self.engine.get_match(match_id)?;
        let inning = m.live_inning();
        let side = |team_id: Option<TeamId>| {
            team_id
                .and_then(|id| m.team(id))
                .ok_or_else(|| EngineError::NotFound("inning teams".into()))
        };
        let batting = side(inning.batting_team)?;
        let bowling = side(inning.bowling_team)?;
        let openers = Openers {
            striker: batting.playing_xi[0],
            non_striker: batting.playing_xi[1],
            bowler: bowling.playing_xi[10],
        };
        self.engine.start_inning(match_id, openers)
    }

    pub fn bowl(&self, match_id: MatchId, event: DeliveryEvent) -> Result<Match, EngineError> {
        self.engine.submit_delivery(match_id, &event)
    }

    /// Submit each event in turn, stopping at the first error.
    pub fn bowl_all(
        &self,
        match_id: MatchId,
        events: impl IntoIterator<Item = DeliveryEvent>,
    ) -> Result<Match, EngineError> {
        let mut last = self.engine.get_match(match_id)?;
        for event in events {
            last = self.engine.submit_delivery(match_id, &event)?;
        }
        Ok(last)
    }

    /// The next batter in the XI without a card in the live inning.
    pub fn next_batter(&self, match_id: MatchId) -> Result<PlayerId, EngineError> {
        let m = self.engine.get_match(match_id)?;
        let inning = m.live_inning();
        inning
            .batting_team
            .and_then(|id| m.team(id))
            .and_then(|team| {
                team.playing_xi
                    .iter()
                    .copied()
                    .find(|p| inning.batting_card(*p).is_none())
            })
            .ok_or_else(|| EngineError::NotFound("batter yet to bat".into()))
    }

    /// Bowl `event` and, if it dismissed someone, send in the next batter.
    pub fn bowl_and_replace(
        &self,
        match_id: MatchId,
        event: DeliveryEvent,
    ) -> Result<Match, EngineError> {
        let m = self.bowl(match_id, event)?;
        let inning = m.live_inning();
        let vacancy = m.status.is_playing()
            && inning.crease.is_some_and(|c| {
                c.players()
                    .iter()
                    .any(|p| inning.batting_card(*p).is_some_and(|card| card.is_out()))
            });
        if !vacancy {
            return Ok(m);
        }
        let incoming = self.next_batter(match_id)?;
        self.engine.select_batter(match_id, incoming)
    }
}
