use anyhow::{Context, Result, anyhow};

use atp_terminal::config::AppConfig;
use atp_terminal::encoding::{BestOf, Category, Court, Round, Series, Surface};
use atp_terminal::engine::Engine;
use atp_terminal::features::{FEATURE_NAMES, MatchSetup};
use atp_terminal::logging;

const USAGE: &str = "usage: predict --surface=Hard --court=Outdoor --series=\"Masters 1000\" \
--round=Quarterfinals --best-of=3 --p1=\"Sinner J.\" --p2=\"Alcaraz C.\" [--explain]";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init_stderr_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{USAGE}");
        println!();
        println!("  surface: {}", Surface::labels().join(" | "));
        println!("  court:   {}", Court::labels().join(" | "));
        println!("  series:  {}", Series::labels().join(" | "));
        println!("  round:   {}", Round::labels().join(" | "));
        return Ok(());
    }

    let setup = MatchSetup {
        surface: required(&args, "surface")?.parse::<Surface>()?,
        court: required(&args, "court")?.parse::<Court>()?,
        series: required(&args, "series")?.parse::<Series>()?,
        round: required(&args, "round")?.parse::<Round>()?,
        best_of: arg_value(&args, "best-of")
            .map(|raw| raw.parse::<BestOf>())
            .transpose()?
            .unwrap_or(BestOf::Three),
        player_1: required(&args, "p1")?,
        player_2: required(&args, "p2")?,
    };
    let explain = args.iter().any(|a| a == "--explain");

    let config = AppConfig::from_env();
    let engine = Engine::load(&config.model_path, &config.ranks_path)
        .context("failed loading model or rank table")?;

    if setup.same_players() {
        eprintln!("warning: both slots hold the same player");
    }
    for name in [&setup.player_1, &setup.player_2] {
        if engine.ranks().lookup(name).is_none() {
            eprintln!("warning: {name} is unranked, using the sentinel rank");
        }
    }

    let record = engine.build(&setup);
    println!("Features");
    for (name, value) in FEATURE_NAMES.iter().zip(record.values()) {
        println!("  {name:<12} {value}");
    }

    let result = engine.predict(&record)?;
    println!();
    println!(
        "{:<28} {:>7.2}%  (ATP Rank: {})",
        setup.player_1,
        result.p1 * 100.0,
        record.rank_1
    );
    println!(
        "{:<28} {:>7.2}%  (ATP Rank: {})",
        setup.player_2,
        result.p2 * 100.0,
        record.rank_2
    );

    if explain {
        let attribution = engine.explain(&record)?;
        println!();
        println!("Attribution (baseline {:.4})", attribution.baseline);
        for c in &attribution.contributions {
            println!("  {:<12} {:>8} {:+.4}", c.feature, c.value, c.contribution);
        }
    }

    Ok(())
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("--{name}=");
    let flag = format!("--{name}");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if *arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn required(args: &[String], name: &str) -> Result<String> {
    arg_value(args, name).ok_or_else(|| anyhow!("missing --{name}\n{USAGE}"))
}
