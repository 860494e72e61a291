//! Command line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crease_core::TossDecision;

/// Ball-by-ball scoring for limited-overs cricket.
#[derive(Parser, Debug)]
#[command(name = "crease", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// SQLite database file (overrides configuration).
    #[arg(long, global = true, env = "CREASE_DATABASE")]
    pub database: Option<PathBuf>,

    /// Configuration file (toml, yaml or json).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the match document as JSON instead of a scorecard.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a match from a JSON setup file.
    Create { setup: PathBuf },

    /// Record the toss.
    Toss {
        match_id: String,
        /// Team name or id.
        #[arg(long)]
        winner: String,
        #[arg(long, value_enum)]
        decision: Decision,
    },

    /// Open the next inning with two batters and a bowler.
    Open {
        match_id: String,
        #[arg(long)]
        striker: String,
        #[arg(long)]
        non_striker: String,
        #[arg(long)]
        bowler: String,
    },

    /// Score one delivery.
    Ball(BallArgs),

    /// Undo the last delivery.
    Undo { match_id: String },

    /// Change the bowler.
    Bowler { match_id: String, player: String },

    /// Swap the batters' ends.
    Strike { match_id: String },

    /// Send in the next batter after a wicket.
    Batter { match_id: String, player: String },

    /// Start the super over of a tied match.
    SuperOver { match_id: String },

    /// Close the current inning.
    EndInning { match_id: String },

    /// End the match with a declared outcome.
    EndMatch(EndMatchArgs),

    /// Show the scorecard.
    Show { match_id: String },

    /// Show one player's figures across the match.
    Player { match_id: String, player: String },

    /// List stored matches.
    List,
}

#[derive(Args, Debug)]
pub struct BallArgs {
    pub match_id: String,

    /// Runs taken (or extras run for byes, leg byes, wides and no balls).
    #[arg(default_value_t = 0)]
    pub runs: u32,

    #[arg(long)]
    pub wide: bool,

    #[arg(long)]
    pub no_ball: bool,

    #[arg(long)]
    pub bye: bool,

    #[arg(long)]
    pub leg_bye: bool,

    #[arg(long)]
    pub dead: bool,

    /// Dismissal, e.g. bowled, caught, run-out-non-striker-end.
    #[arg(long)]
    pub out: Option<String>,

    /// Fielder involved in the dismissal.
    #[arg(long, requires = "out")]
    pub fielder: Option<String>,
}

#[derive(Args, Debug)]
pub struct EndMatchArgs {
    pub match_id: String,

    /// Award the match to a team.
    #[arg(long, conflicts_with_all = ["tie", "abandon"])]
    pub winner: Option<String>,

    #[arg(long, conflicts_with = "abandon")]
    pub tie: bool,

    #[arg(long)]
    pub abandon: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Decision {
    Bat,
    Bowl,
}

impl From<Decision> for TossDecision {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Bat => TossDecision::Bat,
            Decision::Bowl => TossDecision::Bowl,
        }
    }
}
