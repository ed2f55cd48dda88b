use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use core_sim::{load_simulation_config_from_env, SimulationConfig, World};
use sim_schema::ScenarioFlag;
use tracing::info;

mod command_text;
mod console;
mod scheduler;

use console::{kpi_line, run_console, Console};
use scheduler::{run_scheduled, TickScheduler};

#[derive(Parser, Debug)]
#[command(author, version, about = "Supply-chain autopilot driver", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the generated baseline for a seed as pretty JSON.
    Baseline {
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "baseline.json")]
        out: PathBuf,
    },
    /// Run a fixed number of scheduled ticks and report KPIs after each.
    Run {
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value_t = 10)]
        ticks: u32,
        /// Defaults to the configured tick interval.
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Scenario to switch on before the first tick; repeatable.
        #[arg(long = "scenario")]
        scenarios: Vec<ScenarioFlag>,
        /// Directory to write the final snapshot into.
        #[arg(long)]
        snapshot_out: Option<PathBuf>,
    },
    /// Interactive line console on stdin.
    Console {
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

fn build_world(config: &SimulationConfig, seed: Option<u64>) -> World {
    World::with_config(SimulationConfig {
        base_seed: seed.unwrap_or(config.base_seed),
        ..config.clone()
    })
}

fn tick_period(config: &SimulationConfig, interval_ms: Option<u64>) -> Duration {
    Duration::from_millis(interval_ms.unwrap_or(config.tick_interval_ms).max(1))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_simulation_config_from_env();

    match cli.command {
        Command::Baseline { seed, out } => {
            let world = build_world(&config, seed);
            world.export_baseline(&out)?;
            println!(
                "wrote {} (seed {}, fingerprint {:016x})",
                out.display(),
                world.seed(),
                world.baseline().fingerprint()
            );
        }
        Command::Run {
            seed,
            ticks,
            interval_ms,
            scenarios,
            snapshot_out,
        } => {
            let mut world = build_world(&config, seed);
            for flag in scenarios {
                world.set_scenario(flag, true);
            }
            let mut scheduler = TickScheduler::new(tick_period(&config, interval_ms));
            info!(
                target: "supply_autopilot::cli",
                seed = world.seed(),
                ticks,
                "run.started"
            );
            run_scheduled(&mut world, &mut scheduler, ticks, |world, _| {
                println!("{}", kpi_line(world));
            })
            .await;
            if let Some(dir) = snapshot_out {
                let path = world.export_snapshot(&dir)?;
                println!("wrote {}", path.display());
            }
        }
        Command::Console { seed, interval_ms } => {
            let world = build_world(&config, seed);
            let scheduler = TickScheduler::new(tick_period(&config, interval_ms));
            info!(
                target: "supply_autopilot::cli",
                seed = world.seed(),
                "console.started"
            );
            run_console(Console::new(world, scheduler)).await?;
        }
    }

    Ok(())
}
