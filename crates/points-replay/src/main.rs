//! Command-line replay of points ledger scenarios

use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use points_ledger::{init_tracing, LogFormat, PointsConfig};
use std::path::PathBuf;

mod scenario;

use scenario::{replay, Scenario};

fn cli() -> Command {
    let config_arg = Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("Point table (.toml, .yaml or .yml); defaults apply when omitted");

    Command::new("points-replay")
        .version(points_ledger::VERSION)
        .about("Replays scoring scenarios against an in-memory points ledger")
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .global(true)
                .default_value("pretty")
                .value_parser(value_parser!(LogFormat))
                .help("Log output: pretty or json (stderr, filtered by RUST_LOG)"),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("replay")
                .about("Run a scenario and print the resulting ledgers")
                .arg(
                    Arg::new("scenario")
                        .long("scenario")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Scenario file (JSON)"),
                )
                .arg(config_arg.clone())
                .arg(
                    Arg::new("leaderboard")
                        .long("leaderboard")
                        .default_value("10")
                        .value_parser(value_parser!(usize))
                        .help("Leaderboard rows to show"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Validate a point table and print it as JSON")
                .arg(config_arg),
        )
}

fn load_config(args: &ArgMatches) -> anyhow::Result<PointsConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => PointsConfig::load(path)
            .with_context(|| format!("loading point table {}", path.display())),
        None => Ok(PointsConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let log_format = matches
        .get_one::<LogFormat>("log-format")
        .copied()
        .unwrap_or_default();
    init_tracing(log_format).map_err(|err| anyhow::anyhow!("installing tracing: {err}"))?;

    match matches.subcommand() {
        Some(("replay", args)) => {
            let config = load_config(args)?;
            let limit = args.get_one::<usize>("leaderboard").copied().unwrap_or(10);
            let scenario = match args.get_one::<PathBuf>("scenario") {
                Some(path) => Scenario::load(path)?,
                None => anyhow::bail!("--scenario is required"),
            };

            tracing::info!(events = scenario.events.len(), "replaying scenario");
            let report = replay(&scenario, config, limit).await?;

            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.generate_text());
            }

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        Some(("config", args)) => {
            let config = load_config(args)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        _ => {}
    }

    Ok(())
}
