//! Executes a parsed command against the engine.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use tracing::debug;

use crease_core::{
    DeliveryEvent, Match, MatchId, MatchSetup, OutMethod, PlayerId, TeamId, Toss,
};
use crease_engine::{EngineConfig, ManualResult, Openers, ScoringEngine, TracingSink};
use crease_storage::SqliteStore;

use crate::args::{BallArgs, Cli, Command, EndMatchArgs};
use crate::render;

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("config path is not valid UTF-8")?;
            EngineConfig::from_file(path)?
        }
        None => EngineConfig::from_env()?,
    };
    if let Some(db) = &cli.database {
        config.database_path = db.to_str().context("database path is not valid UTF-8")?.to_string();
    }
    Ok(config)
}

fn match_id(raw: &str) -> Result<MatchId> {
    Ok(raw.parse::<MatchId>()?)
}

/// Accept a player id or a unique name from the match roster.
fn player(m: &Match, raw: &str) -> Result<PlayerId> {
    if let Ok(id) = raw.parse::<PlayerId>() {
        return Ok(id);
    }
    let mut found = m.roster.values().filter(|p| p.name.eq_ignore_ascii_case(raw));
    match (found.next(), found.next()) {
        (Some(p), None) => Ok(p.player_id),
        (None, _) => bail!("no player named {raw:?} in this match"),
        (Some(_), Some(_)) => bail!("player name {raw:?} is ambiguous, use the id"),
    }
}

fn team(m: &Match, raw: &str) -> Result<TeamId> {
    if let Ok(id) = raw.parse::<TeamId>() {
        return Ok(id);
    }
    [&m.team_a, &m.team_b]
        .into_iter()
        .find(|t| t.name.eq_ignore_ascii_case(raw))
        .map(|t| t.team_id)
        .ok_or_else(|| anyhow!("no team named {raw:?} in this match"))
}

fn delivery(m: &Match, args: &BallArgs) -> Result<DeliveryEvent> {
    let out_method = args.out.as_deref().map(str::parse::<OutMethod>).transpose()?;
    let fielder = args.fielder.as_deref().map(|f| player(m, f)).transpose()?;
    Ok(DeliveryEvent {
        runs: args.runs,
        is_wide: args.wide,
        is_no_ball: args.no_ball,
        is_leg_bye: args.leg_bye,
        is_bye: args.bye,
        is_wicket: out_method.is_some(),
        is_dead_ball: args.dead,
        out_method,
        fielder,
    })
}

fn manual_result(m: &Match, args: &EndMatchArgs) -> Result<ManualResult> {
    match (&args.winner, args.tie, args.abandon) {
        (Some(winner), false, false) => Ok(ManualResult::Winner(team(m, winner)?)),
        (None, true, false) => Ok(ManualResult::Tie),
        (None, false, true) => Ok(ManualResult::Abandoned),
        _ => bail!("give exactly one of --winner, --tie or --abandon"),
    }
}

fn print<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    debug!(database = %config.database_path, attempts = config.max_save_attempts, "configuration loaded");
    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("opening {}", config.database_path))?;
    let engine = ScoringEngine::new(store, Arc::new(TracingSink), config);

    let m = match &cli.command {
        Command::Create { setup } => {
            let raw = std::fs::read_to_string(setup)
                .with_context(|| format!("reading {}", setup.display()))?;
            let setup: MatchSetup = serde_json::from_str(&raw).context("parsing match setup")?;
            engine.create_match(&setup)?
        }
        Command::Toss {
            match_id: id,
            winner,
            decision,
        } => {
            let id = match_id(id)?;
            let m = engine.get_match(id)?;
            let toss = Toss {
                winner: team(&m, winner)?,
                decision: (*decision).into(),
            };
            engine.record_toss(id, toss)?
        }
        Command::Open {
            match_id: id,
            striker,
            non_striker,
            bowler,
        } => {
            let id = match_id(id)?;
            let m = engine.get_match(id)?;
            let openers = Openers {
                striker: player(&m, striker)?,
                non_striker: player(&m, non_striker)?,
                bowler: player(&m, bowler)?,
            };
            engine.start_inning(id, openers)?
        }
        Command::Ball(args) => {
            let id = match_id(&args.match_id)?;
            let event = delivery(&engine.get_match(id)?, args)?;
            engine.submit_delivery(id, &event)?
        }
        Command::Undo { match_id: id } => engine.undo_delivery(match_id(id)?)?,
        Command::Bowler { match_id: id, player: p } => {
            let id = match_id(id)?;
            let bowler = player(&engine.get_match(id)?, p)?;
            engine.change_bowler(id, bowler)?
        }
        Command::Strike { match_id: id } => engine.change_strike(match_id(id)?)?,
        Command::Batter { match_id: id, player: p } => {
            let id = match_id(id)?;
            let batter = player(&engine.get_match(id)?, p)?;
            engine.select_batter(id, batter)?
        }
        Command::SuperOver { match_id: id } => engine.start_super_over(match_id(id)?)?,
        Command::EndInning { match_id: id } => engine.end_inning_manually(match_id(id)?)?,
        Command::EndMatch(args) => {
            let id = match_id(&args.match_id)?;
            let outcome = manual_result(&engine.get_match(id)?, args)?;
            engine.end_match_manually(id, outcome)?
        }
        Command::Show { match_id: id } => engine.get_match(match_id(id)?)?,
        Command::Player { match_id: id, player: p } => {
            let m = engine.get_match(match_id(id)?)?;
            let player_id = player(&m, p)?;
            let summary = m
                .player_summary(player_id)
                .ok_or_else(|| anyhow!("{p:?} is not in this match"))?;
            return print(cli.json, &summary, || render::player(&summary));
        }
        Command::List => {
            let matches = engine
                .list_matches()?
                .into_iter()
                .map(|id| engine.get_match(id))
                .collect::<Result<Vec<_>, _>>()?;
            return print(cli.json, &matches, || render::match_list(&matches));
        }
    };

    print(cli.json, &m, || render::scorecard(&m))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crease_core::{TeamSetup, TossDecision};

    fn new_match() -> Match {
        let team = |name: &str| TeamSetup {
            name: name.into(),
            players: (1..=11).map(|i| format!("{name} {i}")).collect(),
            substitutes: Vec::new(),
            captain: None,
        };
        Match::from_setup(&MatchSetup {
            overs: 10,
            team_a: team("Larks"),
            team_b: team("Finches"),
        })
        .unwrap()
    }

    #[test]
    fn players_resolve_by_name_or_id() {
        let m = new_match();
        let id = m.team_b.playing_xi[3];
        assert_eq!(player(&m, "finches 4").unwrap(), id);
        assert_eq!(player(&m, &id.to_string()).unwrap(), id);
        assert!(player(&m, "nobody").is_err());
    }

    #[test]
    fn teams_resolve_by_name() {
        let m = new_match();
        assert_eq!(team(&m, "Larks").unwrap(), m.team_a.team_id);
        assert!(team(&m, "Owls").is_err());
    }

    #[test]
    fn ball_flags_become_an_event() {
        let m = new_match();
        let args = BallArgs {
            match_id: m.match_id.to_string(),
            runs: 1,
            wide: false,
            no_ball: false,
            bye: false,
            leg_bye: false,
            dead: false,
            out: Some("run-out-striker-end".into()),
            fielder: Some("Finches 2".into()),
        };
        let event = delivery(&m, &args).unwrap();
        assert!(event.is_wicket);
        assert_eq!(event.out_method, Some(OutMethod::RunOutStrikerEnd));
        assert_eq!(event.fielder, Some(m.team_b.playing_xi[1]));
        assert!(event.kind().is_ok());
    }

    #[test]
    fn decision_maps_to_toss() {
        assert_eq!(TossDecision::from(crate::args::Decision::Bowl), TossDecision::Bowl);
    }
}
