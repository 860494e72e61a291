use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::delivery::{DeliveryKind, DeliveryRecord, Dismissal, OutMethod};
use crate::error::{CoreError, ValidationError};
use crate::ids::*;

pub const BALLS_PER_OVER: u8 = 6;
pub const ALL_OUT: u8 = 10;
pub const PLAYING_XI: usize = 11;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    NoToss,
    TossDone,
    InProgress,
    InningBreak,
    Tied,
    SuperOver,
    SuperOverBreak,
    Completed,
    Abandoned,
}

impl MatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Abandoned)
    }

    /// Deliveries are accepted only while an inning is under way.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::InProgress | Self::SuperOver)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoToss => "no-toss",
            Self::TossDone => "toss-done",
            Self::InProgress => "in-progress",
            Self::InningBreak => "inning-break",
            Self::Tied => "tied",
            Self::SuperOver => "super-over",
            Self::SuperOverBreak => "super-over-break",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Main,
    SuperOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InningNumber {
    First,
    Second,
}

impl InningNumber {
    pub fn index(&self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TossDecision {
    Bat,
    Bowl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toss {
    pub winner: TeamId,
    pub decision: TossDecision,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    Win,
    Tie,
    SuperOverTie,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Margin {
    Runs(u32),
    Wickets(u8),
}

impl fmt::Display for Margin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Runs(1) => write!(f, "1 run"),
            Self::Runs(n) => write!(f, "{n} runs"),
            Self::Wickets(1) => write!(f, "1 wicket"),
            Self::Wickets(n) => write!(f, "{n} wickets"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub kind: ResultKind,
    pub winner: Option<TeamId>,
    pub margin: Option<Margin>,
}

impl MatchResult {
    pub fn win(winner: TeamId, margin: Margin) -> Self {
        Self {
            kind: ResultKind::Win,
            winner: Some(winner),
            margin: Some(margin),
        }
    }

    pub fn no_winner(kind: ResultKind) -> Self {
        Self {
            kind,
            winner: None,
            margin: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub team_id: TeamId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_id: TeamId,
    pub name: String,
    pub playing_xi: Vec<PlayerId>,
    pub substitutes: Vec<PlayerId>,
    pub captain: Option<PlayerId>,
}

impl Team {
    pub fn in_xi(&self, player_id: PlayerId) -> bool {
        self.playing_xi.contains(&player_id)
    }

    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.in_xi(player_id) || self.substitutes.contains(&player_id)
    }
}

/// The two batters at the crease. Exactly one of them is on strike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crease {
    pub striker: PlayerId,
    pub non_striker: PlayerId,
}

impl Crease {
    pub fn new(striker: PlayerId, non_striker: PlayerId) -> Self {
        Self {
            striker,
            non_striker,
        }
    }

    pub fn swap(&mut self) {
        std::mem::swap(&mut self.striker, &mut self.non_striker);
    }

    pub fn contains(&self, player_id: PlayerId) -> bool {
        self.striker == player_id || self.non_striker == player_id
    }

    pub fn players(&self) -> [PlayerId; 2] {
        [self.striker, self.non_striker]
    }

    /// Put `incoming` in place of `outgoing`, keeping its end.
    pub fn replace(&mut self, outgoing: PlayerId, incoming: PlayerId) -> bool {
        if self.striker == outgoing {
            self.striker = incoming;
            true
        } else if self.non_striker == outgoing {
            self.non_striker = incoming;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattingCard {
    pub player_id: PlayerId,
    pub runs: u32,
    pub balls_faced: u32,
    pub fours: u32,
    pub sixes: u32,
    pub dismissal: Option<Dismissal>,
}

impl BattingCard {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            runs: 0,
            balls_faced: 0,
            fours: 0,
            sixes: 0,
            dismissal: None,
        }
    }

    pub fn is_out(&self) -> bool {
        self.dismissal.is_some()
    }

    /// A card that has seen no ball and no dismissal.
    pub fn is_untouched(&self) -> bool {
        self.balls_faced == 0 && self.runs == 0 && self.dismissal.is_none()
    }

    pub fn strike_rate(&self) -> f64 {
        if self.balls_faced == 0 {
            return 0.0;
        }
        f64::from(self.runs) * 100.0 / f64::from(self.balls_faced)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BowlingCard {
    pub player_id: PlayerId,
    pub balls_bowled: u32,
    pub runs_conceded: u32,
    pub wickets: u32,
}

impl BowlingCard {
    pub fn new(player_id: PlayerId) -> Self {
        Self {
            player_id,
            balls_bowled: 0,
            runs_conceded: 0,
            wickets: 0,
        }
    }

    pub fn is_untouched(&self) -> bool {
        self.balls_bowled == 0 && self.runs_conceded == 0 && self.wickets == 0
    }

    pub fn overs_display(&self) -> String {
        let per_over = u32::from(BALLS_PER_OVER);
        format!("{}.{}", self.balls_bowled / per_over, self.balls_bowled % per_over)
    }

    pub fn economy(&self) -> f64 {
        if self.balls_bowled == 0 {
            return 0.0;
        }
        f64::from(self.runs_conceded) * f64::from(BALLS_PER_OVER) / f64::from(self.balls_bowled)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extras {
    pub wides: u32,
    pub no_balls: u32,
    pub byes: u32,
    pub leg_byes: u32,
}

impl Extras {
    pub fn total(&self) -> u32 {
        self.wides + self.no_balls + self.byes + self.leg_byes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inning {
    pub batting_team: Option<TeamId>,
    pub bowling_team: Option<TeamId>,
    pub crease: Option<Crease>,
    pub bowler: Option<PlayerId>,
    pub current_over_balls: u8,
    pub current_overs: u32,
    pub total_overs: u32,
    pub total_score: u32,
    pub wickets_fallen: u8,
    pub batting: Vec<BattingCard>,
    pub bowling: Vec<BowlingCard>,
    pub timeline: Vec<DeliveryRecord>,
}

impl Inning {
    pub fn new(total_overs: u32) -> Self {
        Self {
            batting_team: None,
            bowling_team: None,
            crease: None,
            bowler: None,
            current_over_balls: 0,
            current_overs: 0,
            total_overs,
            total_score: 0,
            wickets_fallen: 0,
            batting: Vec::new(),
            bowling: Vec::new(),
            timeline: Vec::new(),
        }
    }

    pub fn batting_card(&self, player_id: PlayerId) -> Option<&BattingCard> {
        self.batting.iter().find(|c| c.player_id == player_id)
    }

    pub fn batting_card_mut(&mut self, player_id: PlayerId) -> Option<&mut BattingCard> {
        self.batting.iter_mut().find(|c| c.player_id == player_id)
    }

    pub fn bowling_card(&self, player_id: PlayerId) -> Option<&BowlingCard> {
        self.bowling.iter().find(|c| c.player_id == player_id)
    }

    pub fn bowling_card_mut(&mut self, player_id: PlayerId) -> Option<&mut BowlingCard> {
        self.bowling.iter_mut().find(|c| c.player_id == player_id)
    }

    /// Open a batting card for `player_id` unless one exists.
    pub fn seat_batter(&mut self, player_id: PlayerId) {
        if self.batting_card(player_id).is_none() {
            self.batting.push(BattingCard::new(player_id));
        }
    }

    /// Open a bowling card for `player_id` unless one exists.
    pub fn seat_bowler(&mut self, player_id: PlayerId) {
        if self.bowling_card(player_id).is_none() {
            self.bowling.push(BowlingCard::new(player_id));
        }
    }

    /// Drop the batting card of a player who never took part.
    pub fn unseat_batter(&mut self, player_id: PlayerId) {
        self.batting
            .retain(|c| c.player_id != player_id || !c.is_untouched());
    }

    pub fn unseat_bowler(&mut self, player_id: PlayerId) {
        self.bowling
            .retain(|c| c.player_id != player_id || !c.is_untouched());
    }

    pub fn legal_balls(&self) -> u32 {
        self.current_overs * u32::from(BALLS_PER_OVER) + u32::from(self.current_over_balls)
    }

    pub fn max_balls(&self) -> u32 {
        self.total_overs * u32::from(BALLS_PER_OVER)
    }

    pub fn overs_display(&self) -> String {
        format!("{}.{}", self.current_overs, self.current_over_balls)
    }

    pub fn run_rate(&self) -> f64 {
        let balls = self.legal_balls();
        if balls == 0 {
            return 0.0;
        }
        f64::from(self.total_score) * f64::from(BALLS_PER_OVER) / f64::from(balls)
    }

    /// Runs per over needed from the remaining balls to reach `target`.
    pub fn required_run_rate(&self, target: u32) -> Option<f64> {
        let remaining = self.max_balls().checked_sub(self.legal_balls())?;
        if remaining == 0 {
            return None;
        }
        let needed = target.saturating_sub(self.total_score);
        Some(f64::from(needed) * f64::from(BALLS_PER_OVER) / f64::from(remaining))
    }

    pub fn extras(&self) -> Extras {
        let mut extras = Extras::default();
        for record in &self.timeline {
            let extra = record.team_runs - record.batter_runs;
            match record.kind {
                DeliveryKind::Wide => extras.wides += extra,
                DeliveryKind::NoBall => extras.no_balls += extra,
                DeliveryKind::Bye => extras.byes += extra,
                DeliveryKind::LegBye => extras.leg_byes += extra,
                DeliveryKind::Normal | DeliveryKind::DeadBall => {}
            }
        }
        extras
    }

    pub fn is_started(&self) -> bool {
        self.crease.is_some() || !self.timeline.is_empty()
    }

    pub fn is_all_out(&self) -> bool {
        self.wickets_fallen >= ALL_OUT
    }

    pub fn overs_exhausted(&self) -> bool {
        self.current_overs >= self.total_overs
    }
}

/// Two innings played against each other, either the main match or the super over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InningsPair {
    pub innings: [Inning; 2],
    pub current: InningNumber,
    pub target_score: Option<u32>,
}

impl InningsPair {
    pub fn new(total_overs: u32) -> Self {
        Self {
            innings: [Inning::new(total_overs), Inning::new(total_overs)],
            current: InningNumber::First,
            target_score: None,
        }
    }

    pub fn current_inning(&self) -> &Inning {
        &self.innings[self.current.index()]
    }

    pub fn current_inning_mut(&mut self) -> &mut Inning {
        &mut self.innings[self.current.index()]
    }

    pub fn inning(&self, number: InningNumber) -> &Inning {
        &self.innings[number.index()]
    }

    pub fn inning_mut(&mut self, number: InningNumber) -> &mut Inning {
        &mut self.innings[number.index()]
    }
}

/// Aggregated view of one player's contribution across the match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub player_id: PlayerId,
    pub name: String,
    pub team_id: TeamId,
    pub runs: u32,
    pub balls_faced: u32,
    pub fours: u32,
    pub sixes: u32,
    pub is_out: bool,
    pub out_method: Option<OutMethod>,
    pub fielder: Option<PlayerId>,
    pub balls_bowled: u32,
    pub runs_conceded: u32,
    pub wickets: u32,
    pub on_strike: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSetup {
    pub name: String,
    pub players: Vec<String>,
    #[serde(default)]
    pub substitutes: Vec<String>,
    /// Index into `players`.
    #[serde(default)]
    pub captain: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSetup {
    pub overs: u32,
    pub team_a: TeamSetup,
    pub team_b: TeamSetup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub match_id: MatchId,
    pub version: u64,
    pub overs: u32,
    pub team_a: Team,
    pub team_b: Team,
    pub roster: BTreeMap<PlayerId, RosterEntry>,
    pub toss: Option<Toss>,
    pub status: MatchStatus,
    pub main: InningsPair,
    pub super_over: Option<InningsPair>,
    pub result: Option<MatchResult>,
}

impl Match {
    pub fn from_setup(setup: &MatchSetup) -> Result<Self, ValidationError> {
        if setup.overs == 0 {
            return Err(ValidationError::new("overs", "a match needs at least one over"));
        }
        let mut roster = BTreeMap::new();
        let team_a = build_team(&setup.team_a, "team_a", &mut roster)?;
        let team_b = build_team(&setup.team_b, "team_b", &mut roster)?;

        Ok(Self {
            match_id: MatchId::new(),
            version: 0,
            overs: setup.overs,
            team_a,
            team_b,
            roster,
            toss: None,
            status: MatchStatus::NoToss,
            main: InningsPair::new(setup.overs),
            super_over: None,
            result: None,
        })
    }

    pub fn stage(&self) -> Stage {
        if self.super_over.is_some() {
            Stage::SuperOver
        } else {
            Stage::Main
        }
    }

    /// The innings pair currently being played.
    pub fn live_pair(&self) -> &InningsPair {
        match &self.super_over {
            Some(pair) => pair,
            None => &self.main,
        }
    }

    pub fn live_pair_mut(&mut self) -> &mut InningsPair {
        match &mut self.super_over {
            Some(pair) => pair,
            None => &mut self.main,
        }
    }

    pub fn live_inning(&self) -> &Inning {
        self.live_pair().current_inning()
    }

    pub fn live_inning_mut(&mut self) -> &mut Inning {
        self.live_pair_mut().current_inning_mut()
    }

    pub fn team(&self, team_id: TeamId) -> Option<&Team> {
        [&self.team_a, &self.team_b]
            .into_iter()
            .find(|t| t.team_id == team_id)
    }

    pub fn opponent(&self, team_id: TeamId) -> Option<TeamId> {
        if team_id == self.team_a.team_id {
            Some(self.team_b.team_id)
        } else if team_id == self.team_b.team_id {
            Some(self.team_a.team_id)
        } else {
            None
        }
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&RosterEntry> {
        self.roster.get(&player_id)
    }

    pub fn player_name(&self, player_id: PlayerId) -> &str {
        self.player(player_id).map_or("unknown", |p| p.name.as_str())
    }

    fn all_innings(&self) -> impl Iterator<Item = &Inning> {
        self.main
            .innings
            .iter()
            .chain(self.super_over.iter().flat_map(|p| p.innings.iter()))
    }

    pub fn player_summary(&self, player_id: PlayerId) -> Option<PlayerSummary> {
        let entry = self.player(player_id)?;
        let mut summary = PlayerSummary {
            player_id,
            name: entry.name.clone(),
            team_id: entry.team_id,
            runs: 0,
            balls_faced: 0,
            fours: 0,
            sixes: 0,
            is_out: false,
            out_method: None,
            fielder: None,
            balls_bowled: 0,
            runs_conceded: 0,
            wickets: 0,
            on_strike: false,
        };
        for inning in self.all_innings() {
            if let Some(card) = inning.batting_card(player_id) {
                summary.runs += card.runs;
                summary.balls_faced += card.balls_faced;
                summary.fours += card.fours;
                summary.sixes += card.sixes;
                if let Some(dismissal) = &card.dismissal {
                    summary.is_out = true;
                    summary.out_method = Some(dismissal.method);
                    summary.fielder = dismissal.fielder;
                }
            }
            if let Some(card) = inning.bowling_card(player_id) {
                summary.balls_bowled += card.balls_bowled;
                summary.runs_conceded += card.runs_conceded;
                summary.wickets += card.wickets;
            }
        }
        summary.on_strike = !self.status.is_terminal()
            && self
                .live_inning()
                .crease
                .is_some_and(|c| c.striker == player_id);
        Some(summary)
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, CoreError> {
        rmp_serde::to_vec(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, CoreError> {
        rmp_serde::from_slice(bytes).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

fn build_team(
    setup: &TeamSetup,
    field: &'static str,
    roster: &mut BTreeMap<PlayerId, RosterEntry>,
) -> Result<Team, ValidationError> {
    if setup.name.trim().is_empty() {
        return Err(ValidationError::new(field, "team name is empty"));
    }
    if setup.players.len() != PLAYING_XI {
        return Err(ValidationError::new(
            field,
            format!("playing XI has {} players, expected {PLAYING_XI}", setup.players.len()),
        ));
    }
    if let Some(index) = setup.captain
        && index >= setup.players.len()
    {
        return Err(ValidationError::new(field, format!("captain index {index} out of range")));
    }

    let team_id = TeamId::new();
    let mut enrol = |name: &String| {
        let player_id = PlayerId::new();
        roster.insert(
            player_id,
            RosterEntry {
                player_id,
                name: name.clone(),
                team_id,
            },
        );
        player_id
    };
    let playing_xi: Vec<PlayerId> = setup.players.iter().map(&mut enrol).collect();
    let substitutes: Vec<PlayerId> = setup.substitutes.iter().map(&mut enrol).collect();
    let captain = setup.captain.map(|i| playing_xi[i]);

    Ok(Team {
        team_id,
        name: setup.name.clone(),
        playing_xi,
        substitutes,
        captain,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(name: &str) -> TeamSetup {
        TeamSetup {
            name: name.into(),
            players: (1..=11).map(|i| format!("{name} {i}")).collect(),
            substitutes: vec![format!("{name} 12th")],
            captain: Some(0),
        }
    }

    fn setup() -> MatchSetup {
        MatchSetup {
            overs: 20,
            team_a: team("Reds"),
            team_b: team("Blues"),
        }
    }

    #[test]
    fn setup_builds_roster_and_empty_innings() {
        let m = Match::from_setup(&setup()).unwrap();
        assert_eq!(m.roster.len(), 24);
        assert_eq!(m.status, MatchStatus::NoToss);
        assert_eq!(m.team_a.playing_xi.len(), PLAYING_XI);
        assert_eq!(m.team_a.captain, Some(m.team_a.playing_xi[0]));
        for inning in &m.main.innings {
            assert_eq!(inning.total_overs, 20);
            assert_eq!(inning.total_score, 0);
            assert!(inning.timeline.is_empty());
        }
        assert_eq!(m.stage(), Stage::Main);
    }

    #[test]
    fn setup_rejects_short_xi() {
        let mut s = setup();
        s.team_b.players.pop();
        assert_eq!(Match::from_setup(&s).unwrap_err().field, "team_b");
    }

    #[test]
    fn setup_rejects_zero_overs() {
        let mut s = setup();
        s.overs = 0;
        assert_eq!(Match::from_setup(&s).unwrap_err().field, "overs");
    }

    #[test]
    fn msgpack_roundtrip_preserves_document() {
        let m = Match::from_setup(&setup()).unwrap();
        let bytes = m.to_msgpack().unwrap();
        assert_eq!(Match::from_msgpack(&bytes).unwrap(), m);
    }

    #[test]
    fn margin_display() {
        assert_eq!(Margin::Wickets(6).to_string(), "6 wickets");
        assert_eq!(Margin::Wickets(1).to_string(), "1 wicket");
        assert_eq!(Margin::Runs(1).to_string(), "1 run");
        assert_eq!(Margin::Runs(23).to_string(), "23 runs");
    }

    #[test]
    fn crease_replace_keeps_end() {
        let (a, b, c) = (PlayerId::new(), PlayerId::new(), PlayerId::new());
        let mut crease = Crease::new(a, b);
        assert!(crease.replace(b, c));
        assert_eq!(crease, Crease::new(a, c));
        crease.swap();
        assert_eq!(crease.striker, c);
        assert!(!crease.replace(b, a));
    }

    #[test]
    fn required_run_rate_counts_remaining_balls() {
        let mut inning = Inning::new(2);
        inning.current_overs = 1;
        inning.total_score = 10;
        assert_eq!(inning.required_run_rate(22), Some(12.0));
        inning.current_overs = 2;
        assert_eq!(inning.required_run_rate(22), None);
    }
}
