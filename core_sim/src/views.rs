//! Read-only operator views assembled from a [`DerivedState`].

use std::cmp::Ordering;

use serde::Serialize;
use sim_schema::{CarrierId, NodeId, ShipmentId, SkuId};

use crate::exceptions::DerivedState;
use crate::rebalance::{coverage_positions, CoveragePosition};
use crate::risk::{adjusted_on_time, fuel_drift};
use crate::scenario::active_disrupted_carrier;
use crate::world::World;

/// Only the newest in-flight shipments are screened for the at-risk list.
const AT_RISK_SCREEN: usize = 40;
pub const AT_RISK_LIMIT: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CarrierStatus {
    Normal,
    Disrupted,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierScore {
    pub carrier: CarrierId,
    pub name: String,
    pub on_time_adjusted: f64,
    pub cost_index: f64,
    pub status: CarrierStatus,
}

pub fn carrier_scorecard(world: &World, derived: &DerivedState) -> Vec<CarrierScore> {
    let disrupted = active_disrupted_carrier(world.scenario());
    world
        .baseline()
        .carriers
        .iter()
        .map(|carrier| CarrierScore {
            carrier: carrier.id.clone(),
            name: carrier.name.clone(),
            on_time_adjusted: adjusted_on_time(
                carrier.on_time,
                derived.multipliers.on_time_delta(&carrier.id),
            ),
            cost_index: carrier.cost_index,
            status: if disrupted == Some(&carrier.id) {
                CarrierStatus::Disrupted
            } else {
                CarrierStatus::Normal
            },
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtRiskShipment {
    pub shipment: ShipmentId,
    pub from: NodeId,
    pub to: NodeId,
    pub sku: SkuId,
    pub qty: u32,
    pub carrier: CarrierId,
    pub eta_days: u32,
    pub late_prob: f64,
}

/// Highest late probability first, scored with the same model as ranking.
pub fn at_risk_shipments(world: &World, derived: &DerivedState, limit: usize) -> Vec<AtRiskShipment> {
    let risk = world.risk_context(&derived.multipliers);
    let mut rows: Vec<AtRiskShipment> = world
        .shipments()
        .iter()
        .filter(|s| !s.is_delivered())
        .take(AT_RISK_SCREEN)
        .map(|s| AtRiskShipment {
            shipment: s.id.clone(),
            from: s.from.clone(),
            to: s.to.clone(),
            sku: s.sku.clone(),
            qty: s.qty,
            carrier: s.carrier.clone(),
            eta_days: s.eta_days,
            late_prob: risk.late_probability(s),
        })
        .collect();
    rows.sort_by(|a, b| b.late_prob.partial_cmp(&a.late_prob).unwrap_or(Ordering::Equal));
    rows.truncate(limit);
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChokeRow {
    pub dc: NodeId,
    pub name: String,
    pub effective_capacity: u32,
    pub inbound: u64,
    pub outbound: u64,
    pub utilization: f64,
    pub risk: f64,
    pub relief_days: u32,
}

/// DCs ordered from most to least likely to choke.
pub fn choke_watchlist(world: &World, derived: &DerivedState) -> Vec<ChokeRow> {
    let mut rows: Vec<ChokeRow> = world
        .baseline()
        .dcs
        .iter()
        .filter_map(|dc| {
            let u = derived.utilization_by_dc.get(&dc.id)?;
            Some(ChokeRow {
                dc: dc.id.clone(),
                name: dc.name.clone(),
                effective_capacity: u.effective_capacity,
                inbound: u.inbound,
                outbound: u.outbound,
                utilization: u.utilization,
                risk: u.risk,
                relief_days: world.relief().days_left(&dc.id),
            })
        })
        .collect();
    rows.sort_by(|a, b| b.risk.partial_cmp(&a.risk).unwrap_or(Ordering::Equal));
    rows
}

/// Coverage of one SKU across DCs, thinnest first.
pub fn inventory_positions(world: &World, derived: &DerivedState, sku: &SkuId) -> Vec<CoveragePosition> {
    let mut rows = coverage_positions(world, &derived.multipliers, sku);
    rows.sort_by(|a, b| a.doc.partial_cmp(&b.doc).unwrap_or(Ordering::Equal));
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostIndexDrift {
    pub latest: f64,
    pub drift: f64,
}

pub fn cost_index_drift(world: &World) -> CostIndexDrift {
    CostIndexDrift {
        latest: world.cost_index().last().map(|p| p.index).unwrap_or(1.0),
        drift: fuel_drift(world.cost_index()),
    }
}
