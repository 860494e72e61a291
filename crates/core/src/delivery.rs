use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::ids::PlayerId;
use crate::model::{Inning, MatchResult, MatchStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutMethod {
    Bowled,
    Caught,
    CaughtBehind,
    CaughtAndBowled,
    RunOutStrikerEnd,
    RunOutNonStrikerEnd,
    Lbw,
    Stumped,
    RetiredHurt,
    RetiredOut,
    HitWicket,
}

impl OutMethod {
    pub const ALL: [OutMethod; 11] = [
        Self::Bowled,
        Self::Caught,
        Self::CaughtBehind,
        Self::CaughtAndBowled,
        Self::RunOutStrikerEnd,
        Self::RunOutNonStrikerEnd,
        Self::Lbw,
        Self::Stumped,
        Self::RetiredHurt,
        Self::RetiredOut,
        Self::HitWicket,
    ];

    pub fn is_run_out(&self) -> bool {
        matches!(self, Self::RunOutStrikerEnd | Self::RunOutNonStrikerEnd)
    }

    /// Every method except the two run-outs counts towards the bowler's wickets.
    pub fn credits_bowler(&self) -> bool {
        !self.is_run_out()
    }

    /// The non-striker is the dismissed batter only when run out at their own end.
    pub fn dismisses_non_striker(&self) -> bool {
        matches!(self, Self::RunOutNonStrikerEnd)
    }

    pub fn is_retirement(&self) -> bool {
        matches!(self, Self::RetiredHurt | Self::RetiredOut)
    }

    /// Whether this dismissal can happen off a delivery of the given kind.
    pub fn allowed_on(&self, kind: DeliveryKind) -> bool {
        match kind {
            DeliveryKind::NoBall => self.is_run_out() || self.is_retirement(),
            DeliveryKind::Wide => {
                self.is_run_out()
                    || self.is_retirement()
                    || matches!(self, Self::Stumped | Self::HitWicket)
            }
            DeliveryKind::DeadBall => false,
            DeliveryKind::Normal | DeliveryKind::Bye | DeliveryKind::LegBye => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bowled => "bowled",
            Self::Caught => "caught",
            Self::CaughtBehind => "caught-behind",
            Self::CaughtAndBowled => "caught-and-bowled",
            Self::RunOutStrikerEnd => "run-out-striker-end",
            Self::RunOutNonStrikerEnd => "run-out-non-striker-end",
            Self::Lbw => "lbw",
            Self::Stumped => "stumped",
            Self::RetiredHurt => "retired-hurt",
            Self::RetiredOut => "retired-out",
            Self::HitWicket => "hit-wicket",
        }
    }
}

impl fmt::Display for OutMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ValidationError::new("out_method", format!("unknown dismissal {s:?}")))
    }
}

/// The single kind derived from a delivery event's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryKind {
    Normal,
    Wide,
    NoBall,
    Bye,
    LegBye,
    DeadBall,
}

impl DeliveryKind {
    /// Legal deliveries count towards the six-ball over.
    pub fn is_legal(&self) -> bool {
        matches!(self, Self::Normal | Self::Bye | Self::LegBye)
    }

    pub fn is_extra(&self) -> bool {
        matches!(self, Self::Wide | Self::NoBall | Self::Bye | Self::LegBye)
    }

    fn suffix(&self) -> &'static str {
        match self {
            Self::Normal => "",
            Self::Wide => "wd",
            Self::NoBall => "nb",
            Self::Bye => "b",
            Self::LegBye => "lb",
            Self::DeadBall => "db",
        }
    }
}

/// One ball as submitted by a scorer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub runs: u32,
    pub is_wide: bool,
    pub is_no_ball: bool,
    pub is_leg_bye: bool,
    pub is_bye: bool,
    pub is_wicket: bool,
    pub is_dead_ball: bool,
    pub out_method: Option<OutMethod>,
    pub fielder: Option<PlayerId>,
}

impl DeliveryEvent {
    pub fn runs(runs: u32) -> Self {
        Self {
            runs,
            ..Self::default()
        }
    }

    pub fn wide(runs: u32) -> Self {
        Self {
            runs,
            is_wide: true,
            ..Self::default()
        }
    }

    pub fn no_ball(runs: u32) -> Self {
        Self {
            runs,
            is_no_ball: true,
            ..Self::default()
        }
    }

    pub fn bye(runs: u32) -> Self {
        Self {
            runs,
            is_bye: true,
            ..Self::default()
        }
    }

    pub fn leg_bye(runs: u32) -> Self {
        Self {
            runs,
            is_leg_bye: true,
            ..Self::default()
        }
    }

    pub fn dead_ball() -> Self {
        Self {
            is_dead_ball: true,
            ..Self::default()
        }
    }

    pub fn wicket(method: OutMethod) -> Self {
        Self::runs(0).with_wicket(method)
    }

    pub fn with_wicket(mut self, method: OutMethod) -> Self {
        self.is_wicket = true;
        self.out_method = Some(method);
        self
    }

    pub fn with_fielder(mut self, fielder: PlayerId) -> Self {
        self.fielder = Some(fielder);
        self
    }

    /// Derive the delivery kind, rejecting contradictory flag combinations.
    pub fn kind(&self) -> Result<DeliveryKind, ValidationError> {
        let extras = [
            (self.is_wide, DeliveryKind::Wide),
            (self.is_no_ball, DeliveryKind::NoBall),
            (self.is_bye, DeliveryKind::Bye),
            (self.is_leg_bye, DeliveryKind::LegBye),
        ];
        let mut flagged = extras.iter().filter(|(set, _)| *set).map(|(_, kind)| *kind);
        let kind = match (flagged.next(), flagged.next()) {
            (None, _) => DeliveryKind::Normal,
            (Some(kind), None) => kind,
            (Some(a), Some(b)) => {
                return Err(ValidationError::new(
                    "extras",
                    format!("{a:?} and {b:?} cannot both apply to one delivery"),
                ));
            }
        };

        if self.is_dead_ball {
            if kind != DeliveryKind::Normal || self.runs > 0 || self.is_wicket {
                return Err(ValidationError::new(
                    "is_dead_ball",
                    "a dead ball carries no runs, extras or wicket",
                ));
            }
            return Ok(DeliveryKind::DeadBall);
        }

        match (self.is_wicket, self.out_method) {
            (true, None) => {
                return Err(ValidationError::new("out_method", "required when is_wicket is set"));
            }
            (false, Some(_)) => {
                return Err(ValidationError::new("out_method", "given without is_wicket"));
            }
            (true, Some(method)) if !method.allowed_on(kind) => {
                return Err(ValidationError::new(
                    "out_method",
                    format!("{method} is not possible off a {kind:?} delivery"),
                ));
            }
            _ => {}
        }

        if self.fielder.is_some() && !self.is_wicket {
            return Err(ValidationError::new("fielder", "given without a wicket"));
        }

        Ok(kind)
    }
}

/// How a batter got out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dismissal {
    pub player_id: PlayerId,
    pub method: OutMethod,
    pub fielder: Option<PlayerId>,
    /// Bowler credited with the wicket, if the method credits one.
    pub bowler: Option<PlayerId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverEnd {
    pub rotated: bool,
}

/// Phase state replaced when a delivery closed an inning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InningsClosure {
    pub prior_status: MatchStatus,
    pub prior_target: Option<u32>,
    pub prior_result: Option<MatchResult>,
    /// The following inning as it was before teams were swapped into it.
    pub prior_next: Option<Inning>,
}

/// A resolved ball in an inning's timeline. Carries every delta applied so
/// the ball can be reversed without replaying the inning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// Completed overs when the ball was bowled.
    pub over: u32,
    /// Legal balls of the over bowled once this delivery is counted.
    pub ball: u8,
    pub kind: DeliveryKind,
    pub runs: u32,
    pub striker: PlayerId,
    pub non_striker: PlayerId,
    pub bowler: PlayerId,
    pub team_runs: u32,
    pub batter_runs: u32,
    pub bowler_runs: u32,
    pub faced: bool,
    pub wicket: Option<Dismissal>,
    pub rotated: bool,
    pub notation: String,
    pub over_end: Option<OverEnd>,
    pub closure: Option<Box<InningsClosure>>,
}

impl DeliveryRecord {
    pub fn is_legal(&self) -> bool {
        self.kind.is_legal()
    }

    /// "over.ball" as shown on a scoreboard, e.g. "3.4".
    pub fn label(&self) -> String {
        format!("{}.{}", self.over, self.ball)
    }

    pub fn notation_for(kind: DeliveryKind, runs: u32, team_runs: u32, wicket: bool) -> String {
        let mut out = match kind {
            DeliveryKind::Normal if runs == 0 && !wicket => "•".to_string(),
            DeliveryKind::Normal if runs == 0 => String::new(),
            DeliveryKind::Normal => runs.to_string(),
            DeliveryKind::DeadBall => kind.suffix().to_string(),
            _ => format!("{team_runs}{}", kind.suffix()),
        };
        if wicket {
            out.push('W');
        }
        out
    }
}
