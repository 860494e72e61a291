//! Over completion, innings closure and match results.

use tracing::info;

use crease_core::{
    ALL_OUT, BALLS_PER_OVER, InningNumber, InningsClosure, Margin, Match, MatchResult,
    MatchStatus, OverEnd, ResultKind, Stage, TeamId,
};

use crate::notify::MatchSignal;

/// Run after every accepted delivery.
pub fn evaluate(m: &mut Match) -> Vec<MatchSignal> {
    let mut signals = Vec::new();

    let inning = m.live_inning_mut();
    if inning.current_over_balls >= BALLS_PER_OVER {
        inning.current_overs += 1;
        inning.current_over_balls = 0;

        // The batters swap ends between overs; an odd final ball has already swapped them back.
        let last_runs = inning.timeline.last().map_or(0, |r| r.runs);
        let rotated = last_runs % 2 == 0;
        if rotated && let Some(c) = inning.crease.as_mut() {
            c.swap();
        }
        if let Some(record) = inning.timeline.last_mut() {
            record.over_end = Some(OverEnd { rotated });
        }
        info!(overs = inning.current_overs, score = inning.total_score, "over completed");
        signals.push(MatchSignal::OverCompleted);
    }

    if inning_complete(m) {
        signals.extend(close_inning(m));
    }
    signals
}

fn inning_complete(m: &Match) -> bool {
    let pair = m.live_pair();
    let inning = pair.current_inning();
    let chased = pair.current == InningNumber::Second
        && pair.target_score.is_some_and(|t| inning.total_score >= t);
    inning.is_all_out() || inning.overs_exhausted() || chased
}

/// Close the live inning. The replaced phase state is stashed on the
/// inning's last delivery so an undo of that ball can reopen it.
pub fn close_inning(m: &mut Match) -> Vec<MatchSignal> {
    let stage = m.stage();
    let prior_status = m.status;
    let prior_result = m.result;
    let pair = m.live_pair_mut();
    let prior_target = pair.target_score;

    let closed = pair.current;
    let (status, result, closure, signals) = match closed {
        InningNumber::First => {
            let first = &pair.innings[0];
            let target = first.total_score + 1;
            let (batting, bowling) = (first.bowling_team, first.batting_team);
            info!(score = first.total_score, wickets = first.wickets_fallen, target, "first inning closed");

            let prior_next = pair.innings[1].clone();
            let next = &mut pair.innings[1];
            next.batting_team = batting;
            next.bowling_team = bowling;
            pair.target_score = Some(target);
            pair.current = InningNumber::Second;

            let status = match stage {
                Stage::Main => MatchStatus::InningBreak,
                Stage::SuperOver => MatchStatus::SuperOverBreak,
            };
            let closure = InningsClosure {
                prior_status,
                prior_target,
                prior_result,
                prior_next: Some(prior_next),
            };
            (status, prior_result, closure, vec![MatchSignal::InningCompleted])
        }
        InningNumber::Second => {
            let target = pair
                .target_score
                .unwrap_or(pair.innings[0].total_score + 1);
            let chase = &pair.innings[1];
            let (status, result, signals) = if chase.total_score >= target {
                let margin = Margin::Wickets(ALL_OUT.saturating_sub(chase.wickets_fallen));
                (
                    MatchStatus::Completed,
                    decided(chase.batting_team, margin),
                    vec![MatchSignal::MatchCompleted],
                )
            } else if chase.total_score + 1 == target {
                match stage {
                    Stage::Main => (
                        MatchStatus::Tied,
                        MatchResult::no_winner(ResultKind::Tie),
                        vec![MatchSignal::MatchTied],
                    ),
                    Stage::SuperOver => (
                        MatchStatus::Completed,
                        MatchResult::no_winner(ResultKind::SuperOverTie),
                        vec![MatchSignal::SuperOverTied, MatchSignal::MatchCompleted],
                    ),
                }
            } else {
                let margin = Margin::Runs(target - chase.total_score);
                (
                    MatchStatus::Completed,
                    decided(chase.bowling_team, margin),
                    vec![MatchSignal::MatchCompleted],
                )
            };
            info!(
                score = chase.total_score,
                wickets = chase.wickets_fallen,
                target,
                status = %status,
                "second inning closed"
            );
            let closure = InningsClosure {
                prior_status,
                prior_target,
                prior_result,
                prior_next: None,
            };
            (status, Some(result), closure, signals)
        }
    };

    if let Some(record) = pair.inning_mut(closed).timeline.last_mut() {
        record.closure = Some(Box::new(closure));
    }
    m.status = status;
    m.result = result;
    signals
}

fn decided(winner: Option<TeamId>, margin: Margin) -> MatchResult {
    MatchResult {
        kind: ResultKind::Win,
        winner,
        margin: Some(margin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{self, Openers};
    use crate::testing::started_match;
    use crease_core::{DeliveryEvent, OutMethod};

    fn bowl(m: &mut Match, event: DeliveryEvent) -> Vec<MatchSignal> {
        commands::submit_delivery(m, &event).unwrap()
    }

    /// Open the second inning with team B's first two batters against team A's last player.
    fn open_chase(m: &mut Match) {
        let openers = Openers {
            striker: m.team_b.playing_xi[0],
            non_striker: m.team_b.playing_xi[1],
            bowler: m.team_a.playing_xi[10],
        };
        commands::start_inning(m, openers).unwrap();
    }

    #[test]
    fn over_end_rotates_after_even_final_ball() {
        let mut m = started_match(20);
        let crease = m.live_inning().crease.unwrap();
        for _ in 0..5 {
            bowl(&mut m, DeliveryEvent::runs(0));
        }
        let signals = bowl(&mut m, DeliveryEvent::runs(0));
        assert_eq!(signals, vec![MatchSignal::ScoreUpdated, MatchSignal::OverCompleted]);

        let inning = m.live_inning();
        assert_eq!((inning.current_overs, inning.current_over_balls), (1, 0));
        assert_eq!(inning.crease.unwrap().striker, crease.non_striker);
        assert_eq!(inning.timeline[5].over_end, Some(OverEnd { rotated: true }));
    }

    #[test]
    fn odd_final_ball_keeps_runner_on_strike() {
        let mut m = started_match(20);
        let crease = m.live_inning().crease.unwrap();
        for _ in 0..5 {
            bowl(&mut m, DeliveryEvent::runs(0));
        }
        bowl(&mut m, DeliveryEvent::runs(1));
        // Ran a single, then no change of ends.
        assert_eq!(m.live_inning().crease.unwrap().striker, crease.non_striker);
    }

    #[test]
    fn extras_do_not_complete_an_over() {
        let mut m = started_match(20);
        for _ in 0..5 {
            bowl(&mut m, DeliveryEvent::runs(0));
        }
        let signals = bowl(&mut m, DeliveryEvent::wide(0));
        assert!(!signals.contains(&MatchSignal::OverCompleted));
        assert_eq!(m.live_inning().current_over_balls, 5);
    }

    #[test]
    fn first_inning_closes_when_overs_run_out() {
        let mut m = started_match(1);
        for _ in 0..5 {
            bowl(&mut m, DeliveryEvent::runs(2));
        }
        let signals = bowl(&mut m, DeliveryEvent::runs(1));
        assert_eq!(
            signals,
            vec![
                MatchSignal::ScoreUpdated,
                MatchSignal::OverCompleted,
                MatchSignal::InningCompleted
            ]
        );
        assert_eq!(m.status, MatchStatus::InningBreak);
        assert_eq!(m.main.target_score, Some(12));
        assert_eq!(m.main.current, InningNumber::Second);
        assert_eq!(m.main.innings[1].batting_team, Some(m.team_b.team_id));
        assert!(m.main.innings[0].timeline[5].closure.is_some());
    }

    #[test]
    fn chase_completes_with_wickets_in_hand() {
        let mut m = started_match(2);
        bowl(&mut m, DeliveryEvent::runs(6));
        commands::end_inning_manually(&mut m).unwrap();
        open_chase(&mut m);
        assert_eq!(m.status, MatchStatus::InProgress);

        bowl(&mut m, DeliveryEvent::wicket(OutMethod::Bowled));
        let incoming = m.team_b.playing_xi[2];
        commands::select_batter(&mut m, incoming).unwrap();
        bowl(&mut m, DeliveryEvent::runs(4));
        let signals = bowl(&mut m, DeliveryEvent::runs(3));

        assert_eq!(signals.last(), Some(&MatchSignal::MatchCompleted));
        assert_eq!(m.status, MatchStatus::Completed);
        let result = m.result.unwrap();
        assert_eq!(result.winner, Some(m.team_b.team_id));
        assert_eq!(result.margin, Some(Margin::Wickets(9)));
    }

    #[test]
    fn defence_wins_by_runs() {
        let mut m = started_match(1);
        bowl(&mut m, DeliveryEvent::runs(6));
        commands::end_inning_manually(&mut m).unwrap();
        open_chase(&mut m);
        for _ in 0..6 {
            bowl(&mut m, DeliveryEvent::runs(0));
        }
        assert_eq!(m.status, MatchStatus::Completed);
        let result = m.result.unwrap();
        assert_eq!(result.winner, Some(m.team_a.team_id));
        assert_eq!(result.margin, Some(Margin::Runs(7)));
    }

    #[test]
    fn level_scores_tie_then_super_over() {
        let mut m = started_match(1);
        bowl(&mut m, DeliveryEvent::runs(4));
        commands::end_inning_manually(&mut m).unwrap();
        open_chase(&mut m);
        bowl(&mut m, DeliveryEvent::runs(4));
        let signals = commands::end_inning_manually(&mut m).unwrap();

        assert_eq!(signals, vec![MatchSignal::MatchTied]);
        assert_eq!(m.status, MatchStatus::Tied);
        assert_eq!(m.result.map(|r| r.kind), Some(ResultKind::Tie));

        commands::start_super_over(&mut m).unwrap();
        assert_eq!(m.stage(), Stage::SuperOver);
        let pair = m.super_over.as_ref().unwrap();
        // The chasing side bats first in the eliminator.
        assert_eq!(pair.innings[0].batting_team, Some(m.team_b.team_id));
        assert_eq!(pair.innings[0].total_overs, 1);
    }

    #[test]
    fn tied_super_over_completes_match() {
        let mut m = started_match(1);
        bowl(&mut m, DeliveryEvent::runs(1));
        commands::end_inning_manually(&mut m).unwrap();
        open_chase(&mut m);
        bowl(&mut m, DeliveryEvent::runs(1));
        commands::end_inning_manually(&mut m).unwrap();
        commands::start_super_over(&mut m).unwrap();

        let openers = Openers {
            striker: m.team_b.playing_xi[0],
            non_striker: m.team_b.playing_xi[1],
            bowler: m.team_a.playing_xi[10],
        };
        commands::start_inning(&mut m, openers).unwrap();
        bowl(&mut m, DeliveryEvent::runs(6));
        commands::end_inning_manually(&mut m).unwrap();
        assert_eq!(m.status, MatchStatus::SuperOverBreak);

        let openers = Openers {
            striker: m.team_a.playing_xi[0],
            non_striker: m.team_a.playing_xi[1],
            bowler: m.team_b.playing_xi[10],
        };
        commands::start_inning(&mut m, openers).unwrap();
        assert_eq!(m.status, MatchStatus::SuperOver);
        bowl(&mut m, DeliveryEvent::runs(6));
        let signals = commands::end_inning_manually(&mut m).unwrap();

        assert_eq!(signals, vec![MatchSignal::SuperOverTied, MatchSignal::MatchCompleted]);
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.result.map(|r| r.kind), Some(ResultKind::SuperOverTie));
    }
}
