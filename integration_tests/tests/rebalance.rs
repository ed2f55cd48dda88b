mod common;

use common::{frozen_world, run_script, SEED};
use core_sim::exceptions::DOC_FLOOR_DAYS;
use core_sim::World;
use sim_schema::ScenarioFlag;

#[test]
fn proposals_always_carry_positive_net_value() {
    let mut world = frozen_world(SEED);
    run_script(&mut world);
    for sku in world.baseline().skus.clone() {
        for proposal in world.rebalance_proposals(&sku.id) {
            assert!(proposal.net_value > 0, "{proposal:?}");
            assert!(proposal.qty > 0);
            assert_ne!(proposal.from_dc, proposal.to_dc);
        }
    }
}

#[test]
fn well_covered_skus_get_no_proposals() {
    let mut world = World::new(SEED);
    world.toggle_scenario(ScenarioFlag::DemandSpike);
    for _ in 0..3 {
        world.tick();
    }
    let derived = world.derive();
    for sku in world.baseline().skus.clone() {
        let positions = core_sim::views::inventory_positions(&world, &derived, &sku.id);
        if positions.iter().all(|p| p.doc >= DOC_FLOOR_DAYS) {
            assert!(world.rebalance_proposals(&sku.id).is_empty());
        }
    }
}

#[test]
fn ranking_is_sorted_by_value_then_score() {
    let mut world = frozen_world(SEED);
    run_script(&mut world);
    let derived = world.derive();
    assert!(!derived.ranked_exceptions.is_empty());
    for pair in derived.ranked_exceptions.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(
            a.value_at_risk > b.value_at_risk
                || (a.value_at_risk == b.value_at_risk && a.risk_score >= b.risk_score)
        );
    }
}
