//! Plain-text scorecards.

use std::fmt::Write;

use crease_core::{Inning, InningNumber, InningsPair, Match, PlayerSummary, ResultKind, TeamId};

fn team_name(m: &Match, team_id: Option<TeamId>) -> &str {
    team_id
        .and_then(|id| m.team(id))
        .map_or("?", |t| t.name.as_str())
}

fn inning_card(out: &mut String, m: &Match, inning: &Inning, target: Option<u32>) {
    let _ = writeln!(
        out,
        "{} {}/{} ({} ov)  RR {:.2}",
        team_name(m, inning.batting_team),
        inning.total_score,
        inning.wickets_fallen,
        inning.overs_display(),
        inning.run_rate(),
    );
    if let Some(target) = target {
        let _ = write!(out, "  target {target}");
        if let Some(rrr) = inning.required_run_rate(target)
            && inning.total_score < target
        {
            let _ = write!(out, ", need {} at {rrr:.2}", target - inning.total_score);
        }
        out.push('\n');
    }

    for card in &inning.batting {
        let on_strike = inning.crease.is_some_and(|c| c.striker == card.player_id);
        let status = card
            .dismissal
            .as_ref()
            .map_or_else(|| "not out".to_string(), |d| d.method.to_string());
        let _ = writeln!(
            out,
            "  {:<24}{} {:>3} ({:>3})  4s {} 6s {}  SR {:.1}  {}",
            m.player_name(card.player_id),
            if on_strike { "*" } else { " " },
            card.runs,
            card.balls_faced,
            card.fours,
            card.sixes,
            card.strike_rate(),
            status,
        );
    }
    let extras = inning.extras();
    let _ = writeln!(
        out,
        "  extras {} (wd {}, nb {}, b {}, lb {})",
        extras.total(),
        extras.wides,
        extras.no_balls,
        extras.byes,
        extras.leg_byes,
    );

    for card in &inning.bowling {
        let current = inning.bowler == Some(card.player_id);
        let _ = writeln!(
            out,
            "  {:<24}{} {}-{}-{}  econ {:.2}",
            m.player_name(card.player_id),
            if current { "*" } else { " " },
            card.overs_display(),
            card.runs_conceded,
            card.wickets,
            card.economy(),
        );
    }

    let this_over: Vec<&str> = inning
        .timeline
        .iter()
        .rev()
        .take_while(|r| r.over == inning.current_overs)
        .map(|r| r.notation.as_str())
        .collect();
    if !this_over.is_empty() {
        let balls: Vec<&str> = this_over.into_iter().rev().collect();
        let _ = writeln!(out, "  this over: {}", balls.join(" "));
    }
}

fn pair_cards(out: &mut String, m: &Match, pair: &InningsPair) {
    for number in [InningNumber::First, InningNumber::Second] {
        let inning = pair.inning(number);
        if !inning.is_started() {
            continue;
        }
        let target = match number {
            InningNumber::First => None,
            InningNumber::Second => pair.target_score,
        };
        inning_card(out, m, inning, target);
    }
}

pub fn scorecard(m: &Match) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} v {}  ({} overs)  [{}]  {}",
        m.team_a.name, m.team_b.name, m.overs, m.status, m.match_id
    );
    pair_cards(&mut out, m, &m.main);
    if let Some(pair) = &m.super_over {
        out.push_str("super over\n");
        pair_cards(&mut out, m, pair);
    }
    if let Some(result) = &m.result {
        let line = match (result.kind, result.winner, result.margin) {
            (ResultKind::Win, winner, Some(margin)) => {
                format!("{} won by {margin}", team_name(m, winner))
            }
            (ResultKind::Win, winner, None) => format!("{} won", team_name(m, winner)),
            (ResultKind::Tie, ..) => "match tied".to_string(),
            (ResultKind::SuperOverTie, ..) => "super over tied".to_string(),
            (ResultKind::Abandoned, ..) => "match abandoned".to_string(),
        };
        let _ = writeln!(out, "result: {line}");
    }
    out
}

pub fn player(summary: &PlayerSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}{}",
        summary.name,
        if summary.on_strike { " (on strike)" } else { "" }
    );
    let status = summary.out_method.map_or("not out", |m| m.as_str());
    let _ = writeln!(
        out,
        "  batting  {} ({})  4s {} 6s {}  {}",
        summary.runs, summary.balls_faced, summary.fours, summary.sixes, status,
    );
    if summary.balls_bowled > 0 {
        let per_over = u32::from(crease_core::BALLS_PER_OVER);
        let _ = writeln!(
            out,
            "  bowling  {}.{}-{}-{}",
            summary.balls_bowled / per_over,
            summary.balls_bowled % per_over,
            summary.runs_conceded,
            summary.wickets,
        );
    }
    out
}

pub fn match_list(matches: &[Match]) -> String {
    let mut out = String::new();
    for m in matches {
        let inning = m.live_inning();
        let _ = writeln!(
            out,
            "{}  {} v {}  [{}]  {}/{} ({})",
            m.match_id,
            m.team_a.name,
            m.team_b.name,
            m.status,
            inning.total_score,
            inning.wickets_fallen,
            inning.overs_display(),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crease_core::{MatchSetup, TeamSetup};

    fn setup() -> MatchSetup {
        let team = |name: &str| TeamSetup {
            name: name.into(),
            players: (1..=11).map(|i| format!("{name} {i}")).collect(),
            substitutes: Vec::new(),
            captain: None,
        };
        MatchSetup {
            overs: 20,
            team_a: team("Larks"),
            team_b: team("Finches"),
        }
    }

    #[test]
    fn header_names_both_sides() {
        let m = Match::from_setup(&setup()).unwrap();
        let card = scorecard(&m);
        assert!(card.starts_with("Larks v Finches  (20 overs)  [no-toss]"));
        assert!(!card.contains("result:"));
    }

    #[test]
    fn player_figures_before_a_ball() {
        let m = Match::from_setup(&setup()).unwrap();
        let summary = m.player_summary(m.team_a.playing_xi[0]).unwrap();
        let text = player(&summary);
        assert!(text.starts_with("Larks 1\n"));
        assert!(text.contains("batting  0 (0)"));
        assert!(text.contains("not out"));
        assert!(!text.contains("bowling"));
    }

    #[test]
    fn list_shows_live_score() {
        let m = Match::from_setup(&setup()).unwrap();
        let listing = match_list(std::slice::from_ref(&m));
        assert!(listing.contains("0/0 (0.0)"));
    }
}
