//! One simulated day, applied as a single step.

use serde::Serialize;
use serde_json::json;
use sim_schema::{AuditKind, CostIndexPoint, NodeId, ShipmentId, ShipmentStatus};

use crate::baseline::{COST_INDEX_MAX, COST_INDEX_MIN};
use crate::numeric::{format_units, round_to, round_units};
use crate::world::World;

/// Daily cost-index drift is uniform in `[-DRIFT, +DRIFT)`.
const COST_INDEX_DAILY_DRIFT: f64 = 0.009;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub day: u32,
    pub units_consumed: u64,
    pub delivered: Vec<ShipmentId>,
    pub relief_expired: Vec<NodeId>,
    pub cost_index: f64,
}

pub(crate) fn advance_day(world: &mut World) -> TickReport {
    world.day += 1;
    let relief_expired = world.relief.decay();

    let units_consumed = burn_demand(world);
    let delivered = advance_shipments(world);
    let cost_index = drift_cost_index(world);

    tracing::debug!(
        target: "supply_autopilot::clock",
        day = world.day,
        units_consumed,
        delivered = delivered.len(),
        cost_index,
        "tick.completed"
    );

    TickReport {
        day: world.day,
        units_consumed,
        delivered,
        relief_expired,
        cost_index,
    }
}

fn burn_demand(world: &mut World) -> u64 {
    let multipliers = world.multipliers();
    let mut consumed = 0u64;
    for dc in &world.baseline.dcs {
        for sku in &world.baseline.skus {
            let burn = round_units(multipliers.effective_demand(
                world.baseline.demand.per_day(&dc.id, &sku.id),
                &sku.id,
            ));
            consumed += u64::from(world.inventory.withdraw(&dc.id, &sku.id, burn));
        }
    }
    consumed
}

fn advance_shipments(world: &mut World) -> Vec<ShipmentId> {
    let mut delivered = Vec::new();
    for shipment in world.shipments.iter_mut().filter(|s| !s.is_delivered()) {
        shipment.eta_days = shipment.eta_days.saturating_sub(1);
        if shipment.eta_days > 0 {
            continue;
        }
        shipment.status = ShipmentStatus::Delivered;
        if !world.inventory.credit(&shipment.to, &shipment.sku, shipment.qty) {
            tracing::warn!(
                target: "supply_autopilot::clock",
                shipment = %shipment.id,
                dc = %shipment.to,
                "delivery.uncredited"
            );
        }
        delivered.push((
            shipment.id.clone(),
            format!(
                "Delivered {} to {} ({} units of {}).",
                shipment.id,
                shipment.to,
                format_units(i64::from(shipment.qty)),
                shipment.sku
            ),
        ));
    }

    delivered
        .into_iter()
        .map(|(id, detail)| {
            world.record(
                AuditKind::ShipmentDelivered,
                detail,
                json!({ "shipment_id": id }),
            );
            id
        })
        .collect()
}

fn drift_cost_index(world: &mut World) -> f64 {
    let last = world.cost_index.last().map(|p| p.index).unwrap_or(1.0);
    let drift = world
        .rng
        .span(-COST_INDEX_DAILY_DRIFT, 2.0 * COST_INDEX_DAILY_DRIFT);
    let next = round_to((last * (1.0 + drift)).clamp(COST_INDEX_MIN, COST_INDEX_MAX), 3);
    world.cost_index.push_bounded(
        CostIndexPoint {
            day: i64::from(world.day),
            index: next,
        },
        world.config.cost_index_history_limit,
    );
    next
}
