//! Reverting the most recent delivery.
//!
//! Every [`DeliveryRecord`] carries the deltas it applied, the crease and
//! bowler it was bowled to, whether it ended an over and, if it closed an
//! inning, the phase state it replaced. Undo pops the record and reverses
//! those deltas, so no replay of the timeline is needed.

use tracing::info;

use crease_core::{
    BALLS_PER_OVER, Crease, DeliveryRecord, InningNumber, InningsPair, Match,
};

use crate::error::EngineError;
use crate::notify::MatchSignal;

/// Where the last delivery of the match lives.
struct UndoTarget {
    /// A super over was opened but not a ball bowled in it.
    drop_super_over: bool,
    inning: InningNumber,
}

fn locate(m: &Match) -> Result<UndoTarget, EngineError> {
    if m.status.is_terminal() {
        return Err(EngineError::invariant(format!(
            "cannot undo once the match is {}",
            m.status
        )));
    }
    let drop_super_over = m
        .super_over
        .as_ref()
        .is_some_and(|p| p.innings.iter().all(|i| i.timeline.is_empty()));
    let pair = if drop_super_over { &m.main } else { m.live_pair() };

    let inning = last_bowled(pair).ok_or_else(|| EngineError::invariant("no deliveries to undo"))?;
    Ok(UndoTarget {
        drop_super_over,
        inning,
    })
}

fn last_bowled(pair: &InningsPair) -> Option<InningNumber> {
    if !pair.current_inning().timeline.is_empty() {
        return Some(pair.current);
    }
    match pair.current {
        InningNumber::Second if !pair.innings[0].timeline.is_empty() => Some(InningNumber::First),
        _ => None,
    }
}

/// Reverse the last delivery. Returns the removed record.
pub fn undo_last(m: &mut Match) -> Result<(DeliveryRecord, Vec<MatchSignal>), EngineError> {
    let target = locate(m)?;
    if target.drop_super_over {
        m.super_over = None;
    }

    let pair = m.live_pair_mut();
    let mut record = pair
        .inning_mut(target.inning)
        .timeline
        .pop()
        .ok_or_else(|| EngineError::invariant("no deliveries to undo"))?;

    let mut reopened = None;
    if let Some(closure) = record.closure.take() {
        let closure = *closure;
        pair.current = target.inning;
        pair.target_score = closure.prior_target;
        if let Some(next) = closure.prior_next {
            pair.innings[1] = next;
        }
        reopened = Some((closure.prior_status, closure.prior_result));
    }

    let inning = pair.inning_mut(target.inning);
    if record.over_end.is_some() {
        inning.current_overs = inning.current_overs.saturating_sub(1);
        inning.current_over_balls = BALLS_PER_OVER;
    }
    if record.is_legal() {
        inning.current_over_balls = inning.current_over_balls.saturating_sub(1);
    }
    inning.total_score = inning.total_score.saturating_sub(record.team_runs);

    if let Some(card) = inning.batting_card_mut(record.striker) {
        card.runs = card.runs.saturating_sub(record.batter_runs);
        if record.faced {
            card.balls_faced = card.balls_faced.saturating_sub(1);
        }
        match record.batter_runs {
            4 => card.fours = card.fours.saturating_sub(1),
            6 => card.sixes = card.sixes.saturating_sub(1),
            _ => {}
        }
    }
    if let Some(card) = inning.bowling_card_mut(record.bowler) {
        if record.is_legal() {
            card.balls_bowled = card.balls_bowled.saturating_sub(1);
        }
        card.runs_conceded = card.runs_conceded.saturating_sub(record.bowler_runs);
        if record.wicket.as_ref().is_some_and(|d| d.bowler.is_some()) {
            card.wickets = card.wickets.saturating_sub(1);
        }
    }
    if let Some(dismissal) = &record.wicket {
        if let Some(card) = inning.batting_card_mut(dismissal.player_id) {
            card.dismissal = None;
        }
        inning.wickets_fallen = inning.wickets_fallen.saturating_sub(1);
    }

    // Put back the crease and bowler the ball was bowled to. Players brought
    // in since then lose their cards if they never took part.
    let displaced_batters: Vec<_> = inning
        .crease
        .map(|c| c.players().to_vec())
        .unwrap_or_default()
        .into_iter()
        .filter(|p| *p != record.striker && *p != record.non_striker)
        .collect();
    let displaced_bowler = inning.bowler.filter(|b| *b != record.bowler);

    inning.crease = Some(Crease::new(record.striker, record.non_striker));
    inning.bowler = Some(record.bowler);
    for player_id in displaced_batters {
        inning.unseat_batter(player_id);
    }
    if let Some(bowler) = displaced_bowler {
        inning.unseat_bowler(bowler);
    }

    if let Some((status, result)) = reopened {
        m.status = status;
        m.result = result;
    }
    info!(
        match_id = %m.match_id,
        ball = %record.label(),
        notation = %record.notation,
        status = %m.status,
        "delivery undone"
    );
    Ok((record, vec![MatchSignal::ScoreUpdated]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{self, ManualResult};
    use crate::testing::started_match;
    use crease_core::{DeliveryEvent, MatchStatus, OutMethod};

    fn bowl(m: &mut Match, event: DeliveryEvent) {
        commands::submit_delivery(m, &event).unwrap();
    }

    #[test]
    fn undo_reverses_a_single() {
        let mut m = started_match(20);
        let before = m.clone();
        bowl(&mut m, DeliveryEvent::runs(1));
        let (record, signals) = undo_last(&mut m).unwrap();
        assert_eq!(record.runs, 1);
        assert_eq!(signals, vec![MatchSignal::ScoreUpdated]);
        assert_eq!(m, before);
    }

    #[test]
    fn undo_reverses_a_wicket() {
        let mut m = started_match(20);
        let before = m.clone();
        bowl(&mut m, DeliveryEvent::wicket(OutMethod::CaughtAndBowled));
        undo_last(&mut m).unwrap();
        assert_eq!(m, before);
    }

    #[test]
    fn undo_across_over_boundary() {
        let mut m = started_match(20);
        for _ in 0..5 {
            bowl(&mut m, DeliveryEvent::runs(0));
        }
        let before = m.clone();
        bowl(&mut m, DeliveryEvent::runs(2));
        assert_eq!(m.live_inning().current_overs, 1);

        undo_last(&mut m).unwrap();
        let inning = m.live_inning();
        assert_eq!((inning.current_overs, inning.current_over_balls), (0, 5));
        assert_eq!(m, before);
    }

    #[test]
    fn undo_reopens_closed_inning() {
        let mut m = started_match(1);
        for _ in 0..5 {
            bowl(&mut m, DeliveryEvent::runs(1));
        }
        let before = m.clone();
        bowl(&mut m, DeliveryEvent::runs(4));
        assert_eq!(m.status, MatchStatus::InningBreak);
        assert_eq!(m.main.target_score, Some(10));

        undo_last(&mut m).unwrap();
        assert_eq!(m.status, MatchStatus::InProgress);
        assert_eq!(m.main.current, InningNumber::First);
        assert_eq!(m.main.target_score, None);
        assert_eq!(m, before);
    }

    #[test]
    fn undo_after_replacement_batter_unseats_them() {
        let mut m = started_match(20);
        let before = m.clone();
        bowl(&mut m, DeliveryEvent::wicket(OutMethod::Bowled));
        let incoming = m.team_a.playing_xi[2];
        commands::select_batter(&mut m, incoming).unwrap();

        undo_last(&mut m).unwrap();
        assert!(m.live_inning().batting_card(incoming).is_none());
        assert_eq!(m, before);
    }

    #[test]
    fn nothing_to_undo() {
        let mut m = started_match(20);
        assert!(matches!(undo_last(&mut m), Err(EngineError::InvariantViolation(_))));
    }

    #[test]
    fn completed_match_cannot_be_undone() {
        let mut m = started_match(20);
        bowl(&mut m, DeliveryEvent::runs(1));
        commands::end_match_manually(&mut m, ManualResult::Abandoned).unwrap();
        assert!(undo_last(&mut m).is_err());
    }
}
