//! Applies a single delivery to the live inning.
//!
//! Everything that can reject the ball is checked before the first write, so
//! an error leaves the match untouched. Over completion and innings closure
//! are left to [`crate::phase`].

use tracing::debug;

use crease_core::{
    Crease, DeliveryEvent, DeliveryKind, DeliveryRecord, Dismissal, Match, PlayerId,
};

use crate::error::EngineError;
use crate::notify::MatchSignal;

/// Runs credited to the team, the striker and the bowler for one ball.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credit {
    pub team: u32,
    pub batter: u32,
    pub bowler: u32,
    /// Whether the striker is charged a ball faced.
    pub faced: bool,
}

impl Credit {
    pub fn for_delivery(kind: DeliveryKind, runs: u32) -> Self {
        let extra = runs.saturating_add(1);
        let (team, batter, bowler, faced) = match kind {
            DeliveryKind::Normal => (runs, runs, runs, true),
            DeliveryKind::Wide => (extra, 0, extra, false),
            DeliveryKind::NoBall => (extra, runs, extra, true),
            DeliveryKind::Bye | DeliveryKind::LegBye => (extra, 0, 0, true),
            DeliveryKind::DeadBall => (0, 0, 0, false),
        };
        Self {
            team,
            batter,
            bowler,
            faced,
        }
    }
}

/// Whether deliveries are accepted in the match's current status.
pub fn ensure_playing(m: &Match) -> Result<(), EngineError> {
    if m.status.is_terminal() {
        return Err(EngineError::invariant(format!("match is {}", m.status)));
    }
    if !m.status.is_playing() {
        return Err(EngineError::invariant(format!(
            "no inning under way while the match is {}",
            m.status
        )));
    }
    Ok(())
}

/// The crease and bowler a delivery would be bowled to, once checked.
fn ready_to_bowl(m: &Match) -> Result<(Crease, PlayerId), EngineError> {
    let inning = m.live_inning();
    let crease = inning
        .crease
        .ok_or_else(|| EngineError::invariant("no batters at the crease"))?;
    let bowler = inning
        .bowler
        .ok_or_else(|| EngineError::invariant("no bowler selected"))?;

    for player_id in crease.players() {
        match inning.batting_card(player_id) {
            None => {
                return Err(EngineError::invariant(format!(
                    "{} has no batting card",
                    m.player_name(player_id)
                )));
            }
            Some(card) if card.is_out() => {
                return Err(EngineError::invariant(format!(
                    "{} is out, select the incoming batter",
                    m.player_name(player_id)
                )));
            }
            Some(_) => {}
        }
    }
    if inning.bowling_card(bowler).is_none() {
        return Err(EngineError::invariant(format!(
            "{} has no bowling card",
            m.player_name(bowler)
        )));
    }
    if inning.is_all_out() || inning.overs_exhausted() {
        return Err(EngineError::invariant("inning is already complete"));
    }
    Ok((crease, bowler))
}

/// Apply `event` to the live inning and append its record to the timeline.
pub fn apply(m: &mut Match, event: &DeliveryEvent) -> Result<Vec<MatchSignal>, EngineError> {
    ensure_playing(m)?;
    let kind = event.kind()?;
    let (crease, bowler) = ready_to_bowl(m)?;

    if let Some(fielder) = event.fielder {
        let fielding_side = m
            .live_inning()
            .bowling_team
            .and_then(|team_id| m.team(team_id))
            .ok_or_else(|| EngineError::invariant("bowling team not assigned"))?;
        if !fielding_side.has_player(fielder) {
            return Err(EngineError::NotFound(format!(
                "fielder {fielder} in {}",
                fielding_side.name
            )));
        }
    }

    let credit = Credit::for_delivery(kind, event.runs);
    let legal = kind.is_legal();
    let dismissal = event.out_method.map(|method| Dismissal {
        player_id: if method.dismisses_non_striker() {
            crease.non_striker
        } else {
            crease.striker
        },
        method,
        fielder: event.fielder,
        bowler: method.credits_bowler().then_some(bowler),
    });
    let rotated = kind == DeliveryKind::Normal && event.runs % 2 == 1;

    let inning = m.live_inning_mut();
    inning.total_score = inning.total_score.saturating_add(credit.team);

    if let Some(card) = inning.batting_card_mut(crease.striker) {
        card.runs = card.runs.saturating_add(credit.batter);
        if credit.faced {
            card.balls_faced += 1;
        }
        match credit.batter {
            4 => card.fours += 1,
            6 => card.sixes += 1,
            _ => {}
        }
    }

    if let Some(card) = inning.bowling_card_mut(bowler) {
        if legal {
            card.balls_bowled += 1;
        }
        card.runs_conceded = card.runs_conceded.saturating_add(credit.bowler);
        if dismissal.as_ref().is_some_and(|d| d.bowler.is_some()) {
            card.wickets += 1;
        }
    }

    if let Some(dismissal) = &dismissal {
        if let Some(card) = inning.batting_card_mut(dismissal.player_id) {
            card.dismissal = Some(dismissal.clone());
        }
        inning.wickets_fallen += 1;
    }

    if legal {
        inning.current_over_balls += 1;
    }
    if rotated && let Some(c) = inning.crease.as_mut() {
        c.swap();
    }

    let record = DeliveryRecord {
        over: inning.current_overs,
        ball: inning.current_over_balls,
        kind,
        runs: event.runs,
        striker: crease.striker,
        non_striker: crease.non_striker,
        bowler,
        team_runs: credit.team,
        batter_runs: credit.batter,
        bowler_runs: credit.bowler,
        faced: credit.faced,
        notation: DeliveryRecord::notation_for(kind, event.runs, credit.team, dismissal.is_some()),
        wicket: dismissal,
        rotated,
        over_end: None,
        closure: None,
    };
    debug!(
        ball = %record.label(),
        notation = %record.notation,
        total = inning.total_score,
        wickets = inning.wickets_fallen,
        "delivery recorded"
    );

    let mut signals = vec![MatchSignal::ScoreUpdated];
    if record.wicket.is_some() {
        signals.push(MatchSignal::WicketFallen);
    }
    inning.timeline.push(record);
    Ok(signals)
}
