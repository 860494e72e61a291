//! Match fixtures for unit tests.

use crease_core::{Match, MatchSetup, TeamSetup, Toss, TossDecision};

use crate::commands::{self, Openers};

fn team(name: &str) -> TeamSetup {
    TeamSetup {
        name: name.into(),
        players: (1..=11).map(|i| format!("{name} {i}")).collect(),
        substitutes: vec![format!("{name} 12th")],
        captain: Some(0),
    }
}

pub fn new_match(overs: u32) -> Match {
    Match::from_setup(&MatchSetup {
        overs,
        team_a: team("Hawks"),
        team_b: team("Owls"),
    })
    .unwrap()
}

/// Team A bats first with its first two players; team B's last player bowls.
pub fn started_match(overs: u32) -> Match {
    let mut m = new_match(overs);
    let toss = Toss {
        winner: m.team_a.team_id,
        decision: TossDecision::Bat,
    };
    commands::record_toss(&mut m, toss).unwrap();
    let openers = Openers {
        striker: m.team_a.playing_xi[0],
        non_striker: m.team_a.playing_xi[1],
        bowler: m.team_b.playing_xi[10],
    };
    commands::start_inning(&mut m, openers).unwrap();
    m
}
