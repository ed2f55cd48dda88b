//! Greedy DC-to-DC inventory rebalancing for a single SKU.
//!
//! Needs are served largest first from whichever excess pools are largest at
//! that moment. There is no global cost minimisation: the first pairing that
//! fits wins, even if a later one would have been cheaper.

use std::cmp::Reverse;

use serde::Serialize;
use sim_schema::{Action, NodeId, SkuId};

use crate::baseline::{haversine_miles, transfer_transit_days};
use crate::exceptions::DOC_FLOOR_DAYS;
use crate::numeric::{round_to, round_usd};
use crate::scenario::ScenarioMultipliers;
use crate::world::World;

/// Days of cover above which a DC is considered overstocked.
pub const DOC_CEILING_DAYS: f64 = 21.0;
const BENEFIT_PER_MARGIN: f64 = 2.8;
const HANDLING_PER_UNIT: f64 = 0.06;
const PER_MILE_PER_UNIT: f64 = 0.00085;
const HOLDING_PER_UNIT_DAY: f64 = 0.008;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebalanceProposal {
    pub sku: SkuId,
    pub from_dc: NodeId,
    pub to_dc: NodeId,
    pub qty: u32,
    pub miles: u32,
    pub transit_days: u32,
    pub benefit: i64,
    pub transfer_cost: i64,
    pub net_value: i64,
}

impl RebalanceProposal {
    pub fn to_action(&self) -> Action {
        Action::RebalanceTransfer {
            from_dc: self.from_dc.clone(),
            to_dc: self.to_dc.clone(),
            sku: self.sku.clone(),
            qty: self.qty,
            transit_days: self.transit_days,
            transfer_cost: self.transfer_cost,
        }
    }
}

/// Per-DC coverage of one SKU under the current scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoveragePosition {
    pub dc: NodeId,
    pub on_hand: u32,
    pub in_transit: u64,
    /// Effective units/day, one decimal.
    pub demand_per_day: f64,
    pub doc: f64,
}

impl CoveragePosition {
    pub fn excess_units(&self) -> u32 {
        if self.doc > DOC_CEILING_DAYS {
            round_units_nonneg((self.doc - DOC_CEILING_DAYS) * self.demand_per_day)
        } else {
            0
        }
    }

    pub fn need_units(&self) -> u32 {
        if self.doc < DOC_FLOOR_DAYS {
            round_units_nonneg((DOC_FLOOR_DAYS - self.doc) * self.demand_per_day)
        } else {
            0
        }
    }
}

fn round_units_nonneg(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

pub fn coverage_positions(
    world: &World,
    multipliers: &ScenarioMultipliers,
    sku: &SkuId,
) -> Vec<CoveragePosition> {
    world
        .baseline
        .dcs
        .iter()
        .map(|dc| {
            let demand_per_day = round_to(world.effective_demand(&dc.id, sku, multipliers), 1);
            let on_hand = world.inventory.on_hand(&dc.id, sku);
            CoveragePosition {
                dc: dc.id.clone(),
                on_hand,
                in_transit: world.in_transit_to(&dc.id, sku),
                demand_per_day,
                doc: f64::from(on_hand) / demand_per_day.max(0.1),
            }
        })
        .collect()
}

pub fn transfer_cost(qty: u32, miles: f64, transit_days: u32) -> i64 {
    let qty = f64::from(qty);
    round_usd(
        qty * (HANDLING_PER_UNIT + miles * PER_MILE_PER_UNIT)
            + qty * HOLDING_PER_UNIT_DAY * f64::from(transit_days),
    )
}

pub fn proposals_for_sku(world: &World, sku: &SkuId) -> Vec<RebalanceProposal> {
    let multipliers = world.multipliers();
    let positions = coverage_positions(world, &multipliers, sku);
    let unit_margin = world.baseline.unit_margin(sku);
    let cap = world.config.transfer_qty_cap;

    let mut excess: Vec<(NodeId, u32)> = positions
        .iter()
        .map(|p| (p.dc.clone(), p.excess_units()))
        .filter(|(_, units)| *units > 0)
        .collect();
    let mut needs: Vec<(NodeId, u32)> = positions
        .iter()
        .map(|p| (p.dc.clone(), p.need_units()))
        .filter(|(_, units)| *units > 0)
        .collect();
    needs.sort_by_key(|(_, units)| Reverse(*units));

    let mut proposals = Vec::new();
    for (need_dc, need_units) in &needs {
        let mut remaining_need = *need_units;
        excess.sort_by_key(|(_, units)| Reverse(*units));
        for (excess_dc, remaining_excess) in excess.iter_mut() {
            if remaining_need == 0 {
                break;
            }
            if *remaining_excess == 0 {
                continue;
            }
            let qty = remaining_need.min(*remaining_excess).min(cap);
            if qty == 0 {
                break;
            }
            let (Some(from), Some(to)) = (world.baseline.dc(excess_dc), world.baseline.dc(need_dc))
            else {
                continue;
            };
            let miles = haversine_miles(from, to);
            let transit_days = transfer_transit_days(miles);
            let benefit = round_usd(f64::from(qty) * unit_margin * BENEFIT_PER_MARGIN);
            let cost = transfer_cost(qty, miles, transit_days);
            let net_value = benefit - cost;
            if net_value > 0 {
                proposals.push(RebalanceProposal {
                    sku: sku.clone(),
                    from_dc: excess_dc.clone(),
                    to_dc: need_dc.clone(),
                    qty,
                    miles: miles.round() as u32,
                    transit_days,
                    benefit,
                    transfer_cost: cost,
                    net_value,
                });
            }
            *remaining_excess -= qty;
            remaining_need -= qty;
        }
    }

    proposals.sort_by_key(|p| Reverse(p.net_value));
    tracing::debug!(
        target: "supply_autopilot::rebalance",
        sku = %sku,
        excess = excess.len(),
        needs = needs.len(),
        proposals = proposals.len(),
        "rebalance.proposed"
    );
    proposals
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_schema::ScenarioFlag;

    fn starved_world() -> World {
        let mut world = World::new(20251212);
        let sku = world.baseline.skus[0].id.clone();
        let dc = world.baseline.dcs[0].id.clone();
        let on_hand = world.inventory.on_hand(&dc, &sku);
        world.inventory.withdraw(&dc, &sku, on_hand);
        let rich = world.baseline.dcs[1].id.clone();
        world.inventory.credit(&rich, &sku, 20_000);
        world
    }

    #[test]
    fn transfer_cost_formula() {
        // 1000 * (0.06 + 500 * 0.00085) + 1000 * 0.008 * 2 = 485 + 16
        assert_eq!(transfer_cost(1_000, 500.0, 2), 501);
    }

    #[test]
    fn proposals_are_profitable_and_sorted() {
        let world = starved_world();
        let sku = world.baseline.skus[0].id.clone();
        let proposals = world.rebalance_proposals(&sku);
        assert!(!proposals.is_empty());
        assert!(proposals.iter().all(|p| p.net_value > 0));
        assert!(proposals.iter().all(|p| p.qty <= world.config.transfer_qty_cap));
        assert!(proposals.iter().all(|p| p.from_dc != p.to_dc));
        assert!(proposals.windows(2).all(|w| w[0].net_value >= w[1].net_value));
        assert!(proposals
            .iter()
            .all(|p| p.net_value == p.benefit - p.transfer_cost));
    }

    #[test]
    fn no_needy_dc_means_no_proposals() {
        let mut world = World::new(20251212);
        let sku = world.baseline.skus[2].id.clone();
        let dcs: Vec<NodeId> = world.baseline.dcs.iter().map(|dc| dc.id.clone()).collect();
        for dc in &dcs {
            world.inventory.credit(dc, &sku, 50_000);
        }
        assert!(world.rebalance_proposals(&sku).is_empty());
    }

    #[test]
    fn starved_dc_is_the_destination() {
        let world = starved_world();
        let sku = world.baseline.skus[0].id.clone();
        let starved = world.baseline.dcs[0].id.clone();
        let top = world.top_rebalance(&sku).expect("proposal");
        assert_eq!(top.to_dc, starved);
        assert_eq!(top.to_action().audit_kind(), sim_schema::AuditKind::RebalanceTransfer);
    }

    #[test]
    fn spike_raises_need() {
        let world = starved_world();
        let mut spiked = world.clone();
        spiked.toggle_scenario(ScenarioFlag::DemandSpike);
        let sku = spiked.scenario.pins.spike_sku.clone().expect("pinned");
        let plain = coverage_positions(&world, &world.multipliers(), &sku);
        let hot = coverage_positions(&spiked, &spiked.multipliers(), &sku);
        for (a, b) in plain.iter().zip(&hot) {
            assert!(b.demand_per_day >= a.demand_per_day);
            assert!(b.need_units() >= a.need_units());
        }
    }
}
