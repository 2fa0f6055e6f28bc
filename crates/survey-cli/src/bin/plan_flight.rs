//! CLI tool to plan a sensor-survey flight.
//!
//! Loads a scenario file, plans the flight and prints the tour and one line
//! per move to stdout. Log output goes to stderr; tune it with `RUST_LOG`.

use clap::Parser;
use std::path::PathBuf;
use survey_cli::{load_scenario, move_lines};
use survey_core::{FlightPlanner, PlannerConfig, Point};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Plan a drone flight that reads every sensor in a scenario
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Scenario JSON file (confinement, no-fly zones, sensors, start)
    #[arg(long, default_value = "crates/survey-cli/scenarios/sample.json")]
    scenario: PathBuf,

    /// Override the start longitude
    #[arg(long, requires = "start_lat")]
    start_lng: Option<f64>,

    /// Override the start latitude
    #[arg(long, requires = "start_lng")]
    start_lat: Option<f64>,

    /// Seed for randomised tour restarts
    #[arg(long)]
    seed: Option<u64>,

    /// Number of randomised tour restarts
    #[arg(long)]
    restarts: Option<usize>,

    /// Number of tour candidates to fly
    #[arg(long)]
    candidates: Option<usize>,

    /// Fly tour candidates one after another on the main thread
    #[arg(long, default_value_t = false)]
    sequential: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("survey_core=info".parse()?))
        .init();

    let args = Args::parse();

    let scenario = load_scenario(&args.scenario)?;
    let start = match (args.start_lng, args.start_lat) {
        (Some(lng), Some(lat)) => Point::new(lng, lat),
        _ => scenario.start,
    };

    let mut config = PlannerConfig::from_env();
    if let Some(seed) = args.seed {
        config.tour_seed = seed;
    }
    if let Some(restarts) = args.restarts {
        config.tour_restarts = restarts;
    }
    if let Some(candidates) = args.candidates {
        config.max_candidates = candidates;
    }
    if args.sequential {
        config.parallel_candidates = false;
    }

    tracing::info!(
        "Loaded {}: {} sensors, {} no-fly zones",
        args.scenario.display(),
        scenario.sensors.len(),
        scenario.no_fly_zones.len()
    );

    let planner = FlightPlanner::from_scenario(&scenario, config);
    let plan = match planner.plan(start, &scenario.sensors) {
        Ok(plan) => plan,
        Err(failure) => {
            if let Some(partial) = &failure.partial {
                eprintln!(
                    "Partial plan ({} moves, {} legs):",
                    partial.move_count(),
                    partial.legs.len()
                );
                for line in move_lines(partial) {
                    eprintln!("{}", line);
                }
            }
            return Err(failure.into());
        }
    };

    let tour: Vec<String> = plan.tour.iter().map(|s| s.to_string()).collect();
    println!("tour: {}", tour.join(" "));
    println!("moves: {}", plan.move_count());
    for line in move_lines(&plan) {
        println!("{}", line);
    }

    Ok(())
}
