//! Disruption toggles, their pinned targets and the multipliers derived from them.

use std::collections::BTreeMap;

use serde::Serialize;
use sim_schema::{CapacityRelief, CarrierId, NodeId, ScenarioFlag, ScenarioState, SkuId};

use crate::baseline::Baseline;
use crate::rng::RandomStream;

pub const OUTAGE_CAPACITY_MULTIPLIER: f64 = 0.42;
pub const RELIEF_CAPACITY_MULTIPLIER: f64 = 1.18;
pub const DISRUPTED_ON_TIME_DELTA: f64 = -0.14;
pub const SPIKE_DEMAND_MULTIPLIER: f64 = 1.28;
pub const CYBER_PLANNING_FRICTION: f64 = 0.18;
/// Degraded visibility is modelled as a small uplift on every demand read.
pub const CYBER_DEMAND_FRICTION: f64 = 1.05;

/// Offsets added to the base seed for each toggle's pin stream.
pub const OUTAGE_PIN_SEED_OFFSET: u64 = 11;
pub const CARRIER_PIN_SEED_OFFSET: u64 = 22;
pub const SPIKE_PIN_SEED_OFFSET: u64 = 33;

/// First draw of a fresh stream seeded `base + offset`, so the choice never
/// depends on what else happened in the session.
fn pinned_index(base_seed: u64, offset: u64, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    Some(RandomStream::new(base_seed.wrapping_add(offset)).index(len))
}

pub fn select_outage_dc(baseline: &Baseline) -> Option<NodeId> {
    pinned_index(baseline.seed(), OUTAGE_PIN_SEED_OFFSET, baseline.dcs.len())
        .map(|idx| baseline.dcs[idx].id.clone())
}

pub fn select_disrupted_carrier(baseline: &Baseline) -> Option<CarrierId> {
    pinned_index(baseline.seed(), CARRIER_PIN_SEED_OFFSET, baseline.carriers.len())
        .map(|idx| baseline.carriers[idx].id.clone())
}

pub fn select_spike_sku(baseline: &Baseline) -> Option<SkuId> {
    pinned_index(baseline.seed(), SPIKE_PIN_SEED_OFFSET, baseline.skus.len())
        .map(|idx| baseline.skus[idx].id.clone())
}

/// Flips `flag` and keeps the pins consistent with the toggles: a pin is
/// chosen when its toggle turns on without one and cleared when it turns off.
/// Returns the new toggle state.
pub fn toggle(state: &mut ScenarioState, flag: ScenarioFlag, baseline: &Baseline) -> bool {
    let on = !state.toggles.is_on(flag);
    set(state, flag, on, baseline);
    on
}

pub fn set(state: &mut ScenarioState, flag: ScenarioFlag, on: bool, baseline: &Baseline) {
    state.toggles.set(flag, on);
    let pins = &mut state.pins;
    match flag {
        ScenarioFlag::DcOutage => {
            pins.outage_dc = if on {
                pins.outage_dc.take().or_else(|| select_outage_dc(baseline))
            } else {
                None
            };
        }
        ScenarioFlag::CarrierDisruption => {
            pins.disrupted_carrier = if on {
                pins.disrupted_carrier
                    .take()
                    .or_else(|| select_disrupted_carrier(baseline))
            } else {
                None
            };
        }
        ScenarioFlag::DemandSpike => {
            pins.spike_sku = if on {
                pins.spike_sku.take().or_else(|| select_spike_sku(baseline))
            } else {
                None
            };
        }
        ScenarioFlag::CyberDegraded => {}
    }
}

/// The pinned outage DC, if the outage toggle is on.
pub fn active_outage_dc(state: &ScenarioState) -> Option<&NodeId> {
    state
        .toggles
        .dc_outage
        .then_some(state.pins.outage_dc.as_ref())
        .flatten()
}

pub fn active_disrupted_carrier(state: &ScenarioState) -> Option<&CarrierId> {
    state
        .toggles
        .carrier_disruption
        .then_some(state.pins.disrupted_carrier.as_ref())
        .flatten()
}

pub fn active_spike_sku(state: &ScenarioState) -> Option<&SkuId> {
    state
        .toggles
        .demand_spike
        .then_some(state.pins.spike_sku.as_ref())
        .flatten()
}

/// Scenario effects in multiplier form. Recomputed on every read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioMultipliers {
    pub dc_capacity: BTreeMap<NodeId, f64>,
    pub carrier_on_time_delta: BTreeMap<CarrierId, f64>,
    pub demand: BTreeMap<SkuId, f64>,
    pub planning_friction: f64,
    pub demand_friction: f64,
}

impl ScenarioMultipliers {
    pub fn compute(baseline: &Baseline, state: &ScenarioState, relief: &CapacityRelief) -> Self {
        let mut dc_capacity: BTreeMap<NodeId, f64> =
            baseline.dcs.iter().map(|dc| (dc.id.clone(), 1.0)).collect();
        let mut carrier_on_time_delta: BTreeMap<CarrierId, f64> = baseline
            .carriers
            .iter()
            .map(|carrier| (carrier.id.clone(), 0.0))
            .collect();
        let mut demand: BTreeMap<SkuId, f64> =
            baseline.skus.iter().map(|sku| (sku.id.clone(), 1.0)).collect();

        if let Some(dc) = active_outage_dc(state) {
            dc_capacity.insert(dc.clone(), OUTAGE_CAPACITY_MULTIPLIER);
        }
        if let Some(carrier) = active_disrupted_carrier(state) {
            carrier_on_time_delta.insert(carrier.clone(), DISRUPTED_ON_TIME_DELTA);
        }
        if let Some(sku) = active_spike_sku(state) {
            demand.insert(sku.clone(), SPIKE_DEMAND_MULTIPLIER);
        }
        for (dc, days_left) in relief.iter() {
            if days_left > 0 {
                *dc_capacity.entry(dc.clone()).or_insert(1.0) *= RELIEF_CAPACITY_MULTIPLIER;
            }
        }

        let cyber = state.toggles.cyber_degraded;
        Self {
            dc_capacity,
            carrier_on_time_delta,
            demand,
            planning_friction: if cyber { CYBER_PLANNING_FRICTION } else { 0.0 },
            demand_friction: if cyber { CYBER_DEMAND_FRICTION } else { 1.0 },
        }
    }

    pub fn dc_capacity_multiplier(&self, dc: &NodeId) -> f64 {
        self.dc_capacity.get(dc).copied().unwrap_or(1.0)
    }

    pub fn on_time_delta(&self, carrier: &CarrierId) -> f64 {
        self.carrier_on_time_delta.get(carrier).copied().unwrap_or(0.0)
    }

    pub fn demand_multiplier(&self, sku: &SkuId) -> f64 {
        self.demand.get(sku).copied().unwrap_or(1.0)
    }

    /// Baseline units/day scaled by the SKU multiplier and cyber friction.
    pub fn effective_demand(&self, baseline_per_day: f64, sku: &SkuId) -> f64 {
        baseline_per_day * self.demand_multiplier(sku) * self.demand_friction
    }
}
