mod common;

use common::{frozen_world, run_script, SEED};
use core_sim::baseline::FREIGHT_RATE_PER_MILE;
use core_sim::retender::quote;
use core_sim::{ActionOutcome, World};
use sim_schema::{Action, AuditKind, CarrierId, ScenarioFlag, ShipmentKind};

fn every_kind(world: &World) -> Vec<Action> {
    let sku = world.baseline().skus[0].id.clone();
    let from_dc = world.baseline().dcs[0].id.clone();
    let to_dc = world.baseline().dcs[1].id.clone();
    let shipment = world
        .shipments()
        .iter()
        .find(|s| !s.is_delivered())
        .expect("open shipment");
    let new_carrier = world
        .baseline()
        .carriers
        .iter()
        .map(|c| c.id.clone())
        .find(|c| *c != shipment.carrier)
        .expect("other carrier");
    vec![
        Action::RebalanceTransfer {
            from_dc: from_dc.clone(),
            to_dc,
            sku: sku.clone(),
            qty: 300,
            transit_days: 2,
            transfer_cost: 1_500,
        },
        Action::Retender {
            shipment_id: shipment.id.clone(),
            new_carrier,
        },
        Action::ExpediteInbound {
            dc: from_dc.clone(),
            sku,
            add_qty: 500,
        },
        Action::RerouteOverflow { dc: from_dc },
    ]
}

#[test]
fn guardrail_blocks_every_kind_without_side_effects() {
    let mut world = frozen_world(SEED);
    run_script(&mut world);
    world.toggle_scenario(ScenarioFlag::CyberDegraded);

    let inventory = world.inventory().clone();
    let shipments = world.shipments().to_vec();
    let relief = world.relief().clone();
    let kpis = world.derive().kpis;
    let blocks_before = world.audit_log().count_of(AuditKind::GuardrailBlock);

    for action in every_kind(&world) {
        assert_eq!(world.execute_action(&action), ActionOutcome::Blocked);
    }

    assert_eq!(world.inventory(), &inventory);
    assert_eq!(world.shipments(), shipments.as_slice());
    assert_eq!(world.relief(), &relief);
    assert_eq!(world.derive().kpis, kpis);
    assert_eq!(
        world.audit_log().count_of(AuditKind::GuardrailBlock),
        blocks_before + 4
    );
}

#[test]
fn every_kind_applies_when_the_guardrail_is_open() {
    let mut world = frozen_world(SEED);
    for action in every_kind(&world) {
        assert_eq!(world.execute_action(&action), ActionOutcome::Applied);
    }
    assert_eq!(world.audit_log().len(), 4);
}

#[test]
fn retender_expected_total_is_freight_plus_weighted_penalty() {
    let world = World::new(SEED);
    let mut shipment = world.shipments()[0].clone();
    shipment.kind = ShipmentKind::Transfer;
    shipment.lane_id = None;
    shipment.miles = Some(1_000);
    shipment.penalty = 7_000;

    let multipliers = world.multipliers();
    let risk = world.risk_context(&multipliers);
    // Unlisted carriers price at cost index 1.0.
    let q = quote(&risk, &shipment, &CarrierId::new("CAR-SPOT"));
    assert_eq!(q.freight, (1_000.0 * FREIGHT_RATE_PER_MILE).round() as i64);
    assert_eq!(q.freight, 2_450);
    assert_eq!(q.expected_total, 2_450 + (q.late_prob * 7_000.0).round() as i64);
}

#[test]
fn retender_stores_the_quoted_freight() {
    let mut world = World::new(SEED);
    let shipment = world
        .shipments()
        .iter()
        .find(|s| !s.is_delivered())
        .cloned()
        .expect("open shipment");
    let target = world
        .retender_quotes(&shipment.id)
        .into_iter()
        .find(|q| q.carrier != shipment.carrier)
        .expect("alternative quote");

    let outcome = world.execute_action(&Action::Retender {
        shipment_id: shipment.id.clone(),
        new_carrier: target.carrier.clone(),
    });
    assert_eq!(outcome, ActionOutcome::Applied);
    let updated = world.shipment(&shipment.id).expect("shipment");
    assert_eq!(updated.carrier, target.carrier);
    assert_eq!(updated.cost, target.freight);
}

#[test]
fn unknown_action_documents_are_audited_only() -> anyhow::Result<()> {
    let mut world = World::new(SEED);
    let inventory = world.inventory().clone();
    let request = core_sim::ActionRequest::parse(r#"{"type":"AIRLIFT","dc":"DC-GA","qty":10}"#)?;
    assert_eq!(world.execute_request(request), ActionOutcome::Ignored);
    assert_eq!(world.inventory(), &inventory);
    let entry = world.audit_log().latest().expect("entry");
    assert_eq!(entry.kind, AuditKind::UnknownAction);
    Ok(())
}
