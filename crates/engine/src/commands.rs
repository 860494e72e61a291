//! Scorer commands as pure transitions on a match document.
//!
//! Each function either mutates `m` and returns the signals to publish, or
//! returns an error with `m` unchanged. Loading, saving and publishing are
//! the engine's job.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crease_core::{
    Crease, DeliveryEvent, InningNumber, InningsPair, Match, MatchResult, MatchStatus, PlayerId,
    ResultKind, TeamId, Toss, TossDecision,
};

use crate::error::EngineError;
use crate::notify::MatchSignal;
use crate::{phase, processor};

/// Overs bowled per side in a super over.
pub const SUPER_OVER_OVERS: u32 = 1;

/// The two opening batters and the opening bowler of an inning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Openers {
    pub striker: PlayerId,
    pub non_striker: PlayerId,
    pub bowler: PlayerId,
}

/// Outcome declared by an official when a match is ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManualResult {
    Winner(TeamId),
    Tie,
    Abandoned,
}

pub fn submit_delivery(
    m: &mut Match,
    event: &DeliveryEvent,
) -> Result<Vec<MatchSignal>, EngineError> {
    let mut signals = processor::apply(m, event)?;
    signals.extend(phase::evaluate(m));
    Ok(signals)
}

pub fn record_toss(m: &mut Match, toss: Toss) -> Result<Vec<MatchSignal>, EngineError> {
    if m.status != MatchStatus::NoToss {
        return Err(EngineError::invariant(format!(
            "toss already recorded, match is {}",
            m.status
        )));
    }
    let opponent = m
        .opponent(toss.winner)
        .ok_or_else(|| EngineError::NotFound(format!("team {}", toss.winner)))?;
    let (batting, bowling) = match toss.decision {
        TossDecision::Bat => (toss.winner, opponent),
        TossDecision::Bowl => (opponent, toss.winner),
    };

    let [first, second] = &mut m.main.innings;
    first.batting_team = Some(batting);
    first.bowling_team = Some(bowling);
    second.batting_team = Some(bowling);
    second.bowling_team = Some(batting);
    m.toss = Some(toss);
    m.status = MatchStatus::TossDone;
    debug!(winner = %toss.winner, decision = ?toss.decision, "toss recorded");
    Ok(Vec::new())
}

/// Whether `player_id` is in the XI of `team_id`.
fn require_in_xi(
    m: &Match,
    team_id: Option<TeamId>,
    player_id: PlayerId,
    field: &'static str,
) -> Result<(), EngineError> {
    if m.player(player_id).is_none() {
        return Err(EngineError::NotFound(format!("player {player_id}")));
    }
    let team = team_id
        .and_then(|id| m.team(id))
        .ok_or_else(|| EngineError::invariant("teams not assigned to this inning"))?;
    if !team.in_xi(player_id) {
        return Err(EngineError::validation(
            field,
            format!("{} is not in the {} XI", m.player_name(player_id), team.name),
        ));
    }
    Ok(())
}

pub fn start_inning(m: &mut Match, openers: Openers) -> Result<Vec<MatchSignal>, EngineError> {
    let next_status = match m.status {
        MatchStatus::TossDone | MatchStatus::InningBreak => MatchStatus::InProgress,
        MatchStatus::SuperOver | MatchStatus::SuperOverBreak => MatchStatus::SuperOver,
        status => {
            return Err(EngineError::invariant(format!(
                "cannot open an inning while the match is {status}"
            )));
        }
    };
    let inning = m.live_inning();
    if inning.is_started() {
        return Err(EngineError::invariant("inning already under way"));
    }
    if openers.striker == openers.non_striker {
        return Err(EngineError::validation(
            "non_striker",
            "the openers must be two different players",
        ));
    }
    require_in_xi(m, inning.batting_team, openers.striker, "striker")?;
    require_in_xi(m, inning.batting_team, openers.non_striker, "non_striker")?;
    require_in_xi(m, inning.bowling_team, openers.bowler, "bowler")?;

    let inning = m.live_inning_mut();
    inning.crease = Some(Crease::new(openers.striker, openers.non_striker));
    inning.bowler = Some(openers.bowler);
    inning.seat_batter(openers.striker);
    inning.seat_batter(openers.non_striker);
    inning.seat_bowler(openers.bowler);
    m.status = next_status;
    Ok(Vec::new())
}

pub fn change_bowler(m: &mut Match, bowler: PlayerId) -> Result<Vec<MatchSignal>, EngineError> {
    processor::ensure_playing(m)?;
    require_in_xi(m, m.live_inning().bowling_team, bowler, "bowler")?;

    let inning = m.live_inning_mut();
    inning.bowler = Some(bowler);
    inning.seat_bowler(bowler);
    Ok(Vec::new())
}

pub fn change_strike(m: &mut Match) -> Result<Vec<MatchSignal>, EngineError> {
    processor::ensure_playing(m)?;
    let crease = m
        .live_inning_mut()
        .crease
        .as_mut()
        .ok_or_else(|| EngineError::invariant("no batters at the crease"))?;
    crease.swap();
    Ok(Vec::new())
}

/// Send in `incoming` in place of the dismissed batter at the crease.
pub fn select_batter(m: &mut Match, incoming: PlayerId) -> Result<Vec<MatchSignal>, EngineError> {
    processor::ensure_playing(m)?;
    let inning = m.live_inning();
    let crease = inning
        .crease
        .ok_or_else(|| EngineError::invariant("no batters at the crease"))?;
    let outgoing = crease
        .players()
        .into_iter()
        .find(|p| inning.batting_card(*p).is_some_and(|c| c.is_out()))
        .ok_or_else(|| EngineError::invariant("no dismissed batter to replace"))?;
    require_in_xi(m, inning.batting_team, incoming, "batter")?;
    if inning.batting_card(incoming).is_some() {
        return Err(EngineError::validation(
            "batter",
            format!("{} has already batted", m.player_name(incoming)),
        ));
    }

    let inning = m.live_inning_mut();
    if let Some(c) = inning.crease.as_mut() {
        c.replace(outgoing, incoming);
    }
    inning.seat_batter(incoming);
    Ok(Vec::new())
}

/// Begin the one-over eliminator after a tied main match.
pub fn start_super_over(m: &mut Match) -> Result<Vec<MatchSignal>, EngineError> {
    if m.status != MatchStatus::Tied || m.super_over.is_some() {
        return Err(EngineError::invariant(format!(
            "a super over needs a tied match, match is {}",
            m.status
        )));
    }
    // The side that chased in the main match bats first.
    let chase = m.main.inning(InningNumber::Second);
    let (batting, bowling) = (chase.batting_team, chase.bowling_team);

    let mut pair = InningsPair::new(SUPER_OVER_OVERS);
    let [first, second] = &mut pair.innings;
    first.batting_team = batting;
    first.bowling_team = bowling;
    second.batting_team = bowling;
    second.bowling_team = batting;

    m.super_over = Some(pair);
    m.status = MatchStatus::SuperOver;
    m.result = None;
    Ok(Vec::new())
}

pub fn end_inning_manually(m: &mut Match) -> Result<Vec<MatchSignal>, EngineError> {
    processor::ensure_playing(m)?;
    if m.live_inning().timeline.is_empty() {
        return Err(EngineError::invariant("no deliveries bowled in this inning"));
    }
    Ok(phase::close_inning(m))
}

pub fn end_match_manually(
    m: &mut Match,
    outcome: ManualResult,
) -> Result<Vec<MatchSignal>, EngineError> {
    if m.status.is_terminal() {
        return Err(EngineError::invariant(format!("match is already {}", m.status)));
    }
    let (status, result) = match outcome {
        ManualResult::Winner(team_id) => {
            if m.team(team_id).is_none() {
                return Err(EngineError::NotFound(format!("team {team_id}")));
            }
            let result = MatchResult {
                kind: ResultKind::Win,
                winner: Some(team_id),
                margin: None,
            };
            (MatchStatus::Completed, result)
        }
        ManualResult::Tie => (MatchStatus::Completed, MatchResult::no_winner(ResultKind::Tie)),
        ManualResult::Abandoned => (
            MatchStatus::Abandoned,
            MatchResult::no_winner(ResultKind::Abandoned),
        ),
    };
    m.status = status;
    m.result = Some(result);
    Ok(vec![MatchSignal::MatchCompleted])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{new_match, started_match};
    use crease_core::OutMethod;

    #[test]
    fn toss_assigns_both_innings() {
        let mut m = new_match(5);
        let toss = Toss {
            winner: m.team_b.team_id,
            decision: TossDecision::Bowl,
        };
        record_toss(&mut m, toss).unwrap();
        assert_eq!(m.status, MatchStatus::TossDone);
        assert_eq!(m.main.innings[0].batting_team, Some(m.team_a.team_id));
        assert_eq!(m.main.innings[1].batting_team, Some(m.team_b.team_id));
        assert!(record_toss(&mut m, toss).is_err());
    }

    #[test]
    fn openers_must_come_from_the_right_sides() {
        let mut m = new_match(5);
        let toss = Toss {
            winner: m.team_a.team_id,
            decision: TossDecision::Bat,
        };
        record_toss(&mut m, toss).unwrap();
        let openers = Openers {
            striker: m.team_a.playing_xi[0],
            non_striker: m.team_a.playing_xi[1],
            bowler: m.team_a.playing_xi[10],
        };
        let err = start_inning(&mut m, openers).unwrap_err();
        assert!(matches!(err, EngineError::Validation(ref v) if v.field == "bowler"));
        assert_eq!(m.status, MatchStatus::TossDone);
    }

    #[test]
    fn select_batter_fills_the_vacancy() {
        let mut m = started_match(5);
        let striker = m.live_inning().crease.unwrap().striker;
        submit_delivery(&mut m, &DeliveryEvent::wicket(OutMethod::Bowled)).unwrap();

        let incoming = m.team_a.playing_xi[2];
        select_batter(&mut m, incoming).unwrap();
        let crease = m.live_inning().crease.unwrap();
        assert_eq!(crease.striker, incoming);
        assert!(!crease.contains(striker));
        // The dismissed batter cannot come back.
        assert!(select_batter(&mut m, striker).is_err());
    }

    #[test]
    fn strike_and_bowler_changes() {
        let mut m = started_match(5);
        let crease = m.live_inning().crease.unwrap();
        change_strike(&mut m).unwrap();
        let swapped = m.live_inning().crease.unwrap();
        assert_eq!(swapped.striker, crease.non_striker);
        assert_eq!(swapped.non_striker, crease.striker);

        let change = m.team_b.playing_xi[4];
        change_bowler(&mut m, change).unwrap();
        assert_eq!(m.live_inning().bowler, Some(change));
        assert!(m.live_inning().bowling_card(change).is_some());

        let batter = m.team_a.playing_xi[4];
        assert!(change_bowler(&mut m, batter).is_err());
        assert_eq!(m.live_inning().bowler, Some(change));
    }

    #[test]
    fn manual_close_needs_a_ball() {
        let mut m = started_match(5);
        assert!(end_inning_manually(&mut m).is_err());
        submit_delivery(&mut m, &DeliveryEvent::runs(2)).unwrap();
        let signals = end_inning_manually(&mut m).unwrap();
        assert_eq!(signals, vec![MatchSignal::InningCompleted]);
        assert_eq!(m.status, MatchStatus::InningBreak);
        assert_eq!(m.main.current, InningNumber::Second);
        assert_eq!(m.main.target_score, Some(3));
    }

    #[test]
    fn abandon_is_terminal() {
        let mut m = started_match(5);
        end_match_manually(&mut m, ManualResult::Abandoned).unwrap();
        assert_eq!(m.status, MatchStatus::Abandoned);
        assert_eq!(m.result.unwrap().kind, ResultKind::Abandoned);
        assert!(end_match_manually(&mut m, ManualResult::Tie).is_err());
        assert!(submit_delivery(&mut m, &DeliveryEvent::runs(1)).is_err());
    }
}
