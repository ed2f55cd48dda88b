mod common;

use common::SEED;
use core_sim::scenario::select_outage_dc;
use core_sim::{Baseline, World};
use sim_schema::{AuditKind, ScenarioFlag};

#[test]
fn outage_pin_is_stable_while_on_and_cleared_when_off() {
    let mut world = World::new(SEED);
    let expected = select_outage_dc(&Baseline::generate(SEED));
    assert!(expected.is_some());

    world.toggle_scenario(ScenarioFlag::DcOutage);
    let pinned = world.scenario().pins.outage_dc.clone();
    assert_eq!(pinned, expected);

    for _ in 0..4 {
        world.derive();
        world.tick();
        assert_eq!(world.scenario().pins.outage_dc, pinned);
    }

    world.toggle_scenario(ScenarioFlag::DcOutage);
    assert_eq!(world.scenario().pins.outage_dc, None);

    world.toggle_scenario(ScenarioFlag::DcOutage);
    assert_eq!(world.scenario().pins.outage_dc, pinned);
    assert_eq!(world.audit_log().count_of(AuditKind::ScenarioToggled), 3);
}

#[test]
fn outage_lowers_capacity_of_the_pinned_dc_only() {
    let mut world = World::new(SEED);
    let calm = world.derive();
    world.toggle_scenario(ScenarioFlag::DcOutage);
    let stressed = world.derive();
    let pinned = world.scenario().pins.outage_dc.clone().expect("pinned dc");

    for (dc, before) in &calm.utilization_by_dc {
        let after = &stressed.utilization_by_dc[dc];
        if *dc == pinned {
            assert!(after.effective_capacity < before.effective_capacity);
            assert!(after.risk >= before.risk);
        } else {
            assert_eq!(after.effective_capacity, before.effective_capacity);
        }
    }
}

#[test]
fn demand_spike_pins_one_sku_and_raises_its_demand() {
    let mut world = World::new(SEED);
    world.toggle_scenario(ScenarioFlag::DemandSpike);
    let sku = world.scenario().pins.spike_sku.clone().expect("pinned sku");
    let m = world.multipliers();
    assert!(m.demand_multiplier(&sku) > 1.0);
    for other in world.baseline().skus.iter().filter(|s| s.id != sku) {
        assert_eq!(m.demand_multiplier(&other.id), 1.0);
    }
}
