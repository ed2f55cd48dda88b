mod common;

use common::{fixture_path, test_config, SEED};
use core_sim::config::CONFIG_PATH_ENV;
use core_sim::{load_simulation_config_from_env, SimulationConfig, SimulationConfigError, World};

#[test]
fn fixture_overrides_and_defaults_merge() -> anyhow::Result<()> {
    let config = test_config()?;
    assert_eq!(config.base_seed, SEED);
    assert_eq!(config.tick_interval_ms, 50);
    assert_eq!(config.cost_index_history_limit, 20);
    assert_eq!(
        config.expedite_default_qty,
        SimulationConfig::default().expedite_default_qty
    );
    Ok(())
}

#[test]
fn history_limit_and_snapshot_size_follow_config() -> anyhow::Result<()> {
    let mut world = World::with_config(test_config()?);
    for _ in 0..30 {
        world.tick();
    }
    assert_eq!(world.cost_index().len(), 20);
    assert!(world.snapshot().body.top_exceptions.len() <= 12);
    Ok(())
}

#[test]
fn malformed_config_is_a_parse_error() {
    let err = SimulationConfig::from_json_str("{ base_seed: }").expect_err("invalid json");
    assert!(matches!(err, SimulationConfigError::Parse(_)));
}

// The only test in this binary that touches the override variable.
#[test]
fn env_override_loads_file_and_falls_back_when_missing() -> anyhow::Result<()> {
    std::env::set_var(CONFIG_PATH_ENV, fixture_path("test_simulation_config.json"));
    assert_eq!(load_simulation_config_from_env(), test_config()?);

    std::env::set_var(CONFIG_PATH_ENV, fixture_path("missing.json"));
    assert_eq!(load_simulation_config_from_env(), SimulationConfig::builtin());

    std::env::remove_var(CONFIG_PATH_ENV);
    assert_eq!(load_simulation_config_from_env(), SimulationConfig::builtin());
    Ok(())
}
