#![allow(dead_code)]

use std::path::PathBuf;

use core_sim::{SimulationConfig, TimestampSource, World};
use sim_schema::{Action, ScenarioFlag};

pub const SEED: u64 = 20251212;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn test_config() -> anyhow::Result<SimulationConfig> {
    Ok(SimulationConfig::from_file(&fixture_path(
        "test_simulation_config.json",
    ))?)
}

/// World with a frozen clock so audit timestamps compare equal.
pub fn frozen_world(seed: u64) -> World {
    World::new(seed).with_timestamps(TimestampSource::Frozen(1_765_500_000_000))
}

/// A mixed session: scenarios, every action kind, and a week of ticks.
pub fn run_script(world: &mut World) {
    world.toggle_scenario(ScenarioFlag::DemandSpike);
    world.toggle_scenario(ScenarioFlag::DcOutage);
    world.tick();

    let skus: Vec<_> = world.baseline().skus.iter().map(|s| s.id.clone()).collect();
    for sku in &skus {
        world.execute_top_rebalance(sku);
    }
    let dcs: Vec<_> = world.baseline().dcs.iter().map(|d| d.id.clone()).collect();
    world.execute_action(&Action::ExpediteInbound {
        dc: dcs[0].clone(),
        sku: skus[0].clone(),
        add_qty: 800,
    });
    world.execute_action(&Action::RerouteOverflow { dc: dcs[1].clone() });

    let derived = world.derive();
    if let Some(exception) = derived.ranked_exceptions.first() {
        let id = exception.id.clone();
        world.execute_recommendation(&id, 0);
    }
    let late: Vec<_> = world
        .shipments()
        .iter()
        .filter(|s| !s.is_delivered())
        .take(3)
        .map(|s| s.id.clone())
        .collect();
    for id in late {
        if let Some(quote) = world.best_retender_quote(&id) {
            world.execute_action(&Action::Retender {
                shipment_id: id,
                new_carrier: quote.carrier,
            });
        }
    }

    world.toggle_scenario(ScenarioFlag::CarrierDisruption);
    for _ in 0..6 {
        world.tick();
    }
}
