//! Ranked exceptions and headline KPIs, recomputed from scratch on every call.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;
use sim_schema::{
    Exception, ExceptionDetail, ExceptionKind, Kpis, Node, NodeId, Shipment, ShipmentKind, SkuId,
};

use crate::numeric::{format_percent, format_units, round_to, round_usd, sigmoid};
use crate::risk::{dc_throughput_risk, effective_capacity, DcFlow, DcUtilization};
use crate::scenario::{
    active_disrupted_carrier, active_outage_dc, active_spike_sku, ScenarioMultipliers,
};
use crate::world::World;

/// Days of cover below which coverage risk starts to climb.
pub const DOC_FLOOR_DAYS: f64 = 7.0;
const DOC_ALERT_DAYS: f64 = 10.0;
const MIN_DEMAND_PER_DAY: f64 = 0.1;
const SHORTAGE_HORIZON_DAYS: f64 = 7.0;
const INBOUND_CREDIT: f64 = 0.55;
const INVENTORY_VAR_FACTOR: f64 = 3.0;
const RISK_SCORE_ALERT: f64 = 0.62;
const LATE_PROB_ALERT: f64 = 0.40;
const UTILIZATION_ALERT: f64 = 0.92;
/// Service and expediting cost proxy for a fully choked DC.
const CHOKE_VAR_USD: f64 = 120_000.0;
const SERVICE_RISK_SCALE_USD: f64 = 220_000.0;

/// Everything the query surface derives from one consistent read of the world.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedState {
    pub multipliers: ScenarioMultipliers,
    pub utilization_by_dc: BTreeMap<NodeId, DcUtilization>,
    pub ranked_exceptions: Vec<Exception>,
    pub kpis: Kpis,
}

impl DerivedState {
    pub fn exception(&self, id: &str) -> Option<&Exception> {
        self.ranked_exceptions.iter().find(|exception| exception.id == id)
    }

    pub fn top(&self, limit: usize) -> &[Exception] {
        &self.ranked_exceptions[..limit.min(self.ranked_exceptions.len())]
    }

    pub fn of_kind(&self, kind: ExceptionKind) -> impl Iterator<Item = &Exception> {
        self.ranked_exceptions
            .iter()
            .filter(move |exception| exception.kind() == kind)
    }
}

pub fn derive_kpis_and_exceptions(world: &World) -> DerivedState {
    let multipliers = world.multipliers();
    let utilization_by_dc = utilization_by_dc(world, &multipliers);

    let mut ranked = inventory_exceptions(world, &multipliers, &utilization_by_dc);
    let shipment_exceptions = shipment_exceptions(world, &multipliers);
    let late_shipments = shipment_exceptions.len();
    ranked.extend(shipment_exceptions);
    ranked.extend(choke_exceptions(world, &utilization_by_dc));
    rank(&mut ranked);

    let value_at_risk: i64 = ranked.iter().map(|exception| exception.value_at_risk).sum();
    let avg_dc_utilization = if utilization_by_dc.is_empty() {
        0.0
    } else {
        utilization_by_dc.values().map(|u| u.utilization).sum::<f64>()
            / utilization_by_dc.len() as f64
    };
    let kpis = Kpis {
        value_at_risk,
        service_risk: service_risk(value_at_risk),
        avg_dc_utilization,
        late_shipments,
    };

    tracing::trace!(
        target: "supply_autopilot::derive",
        exceptions = ranked.len(),
        value_at_risk,
        "derive.completed"
    );

    DerivedState {
        multipliers,
        utilization_by_dc,
        ranked_exceptions: ranked,
        kpis,
    }
}

pub fn service_risk(value_at_risk: i64) -> f64 {
    sigmoid(value_at_risk as f64 / SERVICE_RISK_SCALE_USD - 0.6).clamp(0.03, 0.96)
}

/// Descending value-at-risk, then descending risk score. Stable, so full
/// ties keep inventory/shipment/DC emission order.
pub fn rank(exceptions: &mut [Exception]) {
    exceptions.sort_by(|a, b| {
        b.value_at_risk
            .cmp(&a.value_at_risk)
            .then_with(|| b.risk_score.partial_cmp(&a.risk_score).unwrap_or(Ordering::Equal))
    });
}

pub fn utilization_by_dc(
    world: &World,
    multipliers: &ScenarioMultipliers,
) -> BTreeMap<NodeId, DcUtilization> {
    let mut flows: BTreeMap<&NodeId, DcFlow> = world
        .baseline
        .dcs
        .iter()
        .map(|dc| (&dc.id, DcFlow::default()))
        .collect();
    for shipment in world.shipments.iter().filter(|s| !s.is_delivered()) {
        if let Some(flow) = flows.get_mut(&shipment.to) {
            flow.inbound += u64::from(shipment.qty);
        }
        if shipment.kind == ShipmentKind::Transfer {
            if let Some(flow) = flows.get_mut(&shipment.from) {
                flow.outbound += u64::from(shipment.qty);
            }
        }
    }

    world
        .baseline
        .dcs
        .iter()
        .map(|dc| {
            let flow = flows.get(&dc.id).copied().unwrap_or_default();
            let capacity = effective_capacity(
                dc.capacity.unwrap_or(0),
                multipliers.dc_capacity_multiplier(&dc.id),
            );
            (dc.id.clone(), dc_throughput_risk(flow, capacity))
        })
        .collect()
}

fn inventory_exceptions(
    world: &World,
    multipliers: &ScenarioMultipliers,
    utilization: &BTreeMap<NodeId, DcUtilization>,
) -> Vec<Exception> {
    let outage_dc = active_outage_dc(&world.scenario);
    let spike_sku = active_spike_sku(&world.scenario);
    let cyber = world.scenario.toggles.cyber_degraded;

    let mut exceptions = Vec::new();
    for dc in &world.baseline.dcs {
        let dc_risk = utilization.get(&dc.id).map(|u| u.risk).unwrap_or(0.0);
        let outage_here = outage_dc == Some(&dc.id);
        for sku in &world.baseline.skus {
            let on_hand = world.inventory.on_hand(&dc.id, &sku.id) as f64;
            let demand = world
                .effective_demand(&dc.id, &sku.id, multipliers)
                .max(MIN_DEMAND_PER_DAY);
            let doc = on_hand / demand;
            let pending = world.in_transit_to(&dc.id, &sku.id) as f64;
            let shortage =
                (SHORTAGE_HORIZON_DAYS * demand - (on_hand + INBOUND_CREDIT * pending))
                    .round()
                    .max(0.0);
            let spike_here = spike_sku == Some(&sku.id);

            let coverage_gap = ((DOC_FLOOR_DAYS - doc) / DOC_FLOOR_DAYS).clamp(0.0, 1.0);
            let risk_score = (0.55 * coverage_gap
                + 0.25 * dc_risk
                + 0.12 * indicator(outage_here)
                + 0.08 * indicator(spike_here))
            .clamp(0.0, 1.0);

            if doc < DOC_ALERT_DAYS || risk_score > RISK_SCORE_ALERT {
                let unit_margin = world.baseline.unit_margin(&sku.id);
                exceptions.push(Exception {
                    id: format!("EXC-INV-{}-{}", dc.id, sku.id),
                    detail: ExceptionDetail::InventoryCoverage {
                        dc: dc.id.clone(),
                        sku: sku.id.clone(),
                        doc: round_to(doc, 1),
                        shortage: shortage as u32,
                    },
                    value_at_risk: round_usd(shortage * unit_margin * INVENTORY_VAR_FACTOR),
                    risk_score: round_to(risk_score, 2),
                    rationale: coverage_rationale(CoverageSignals {
                        doc,
                        shortage: shortage as i64,
                        dc_risk,
                        outage_here,
                        spike_here,
                        cyber,
                        relief_days: world.relief.days_left(&dc.id),
                    }),
                });
            }
        }
    }
    exceptions
}

fn shipment_exceptions(world: &World, multipliers: &ScenarioMultipliers) -> Vec<Exception> {
    let risk = world.risk_context(multipliers);
    let toggles = world.scenario.toggles;
    let disrupted = active_disrupted_carrier(&world.scenario);

    world
        .shipments
        .iter()
        .filter(|s| !s.is_delivered())
        .filter_map(|shipment| {
            let inputs = risk.inputs(shipment);
            let late_prob = inputs.late_probability();
            if late_prob <= LATE_PROB_ALERT {
                return None;
            }
            let risk_score = (0.55 * late_prob
                + 0.25 * if toggles.cyber_degraded { 0.2 } else { 0.0 }
                + 0.20 * if toggles.dc_outage { 0.15 } else { 0.0 })
            .clamp(0.0, 1.0);
            Some(Exception {
                id: format!("EXC-SHP-{}", shipment.id),
                detail: ExceptionDetail::ShipmentLate {
                    shipment_id: shipment.id.clone(),
                    from: shipment.from.clone(),
                    to: shipment.to.clone(),
                    sku: shipment.sku.clone(),
                    qty: shipment.qty,
                    late_prob: round_to(late_prob, 3),
                },
                value_at_risk: round_usd(late_prob * shipment.penalty as f64),
                risk_score: round_to(risk_score, 2),
                rationale: late_rationale(
                    shipment,
                    late_prob,
                    inputs.touches_outage,
                    disrupted == Some(&shipment.carrier),
                    toggles.cyber_degraded,
                ),
            })
        })
        .collect()
}

fn choke_exceptions(
    world: &World,
    utilization: &BTreeMap<NodeId, DcUtilization>,
) -> Vec<Exception> {
    world
        .baseline
        .dcs
        .iter()
        .filter_map(|dc| {
            let u = utilization.get(&dc.id)?;
            if u.utilization <= UTILIZATION_ALERT && u.risk <= RISK_SCORE_ALERT {
                return None;
            }
            Some(Exception {
                id: format!("EXC-DC-{}", dc.id),
                detail: ExceptionDetail::DcThroughputChoke {
                    dc: dc.id.clone(),
                    utilization: round_to(u.utilization, 2),
                },
                value_at_risk: round_usd(u.risk * CHOKE_VAR_USD),
                risk_score: round_to(u.risk.clamp(0.0, 1.0), 2),
                rationale: choke_rationale(dc, u, world.relief.days_left(&dc.id)),
            })
        })
        .collect()
}

fn indicator(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}

struct CoverageSignals {
    doc: f64,
    shortage: i64,
    dc_risk: f64,
    outage_here: bool,
    spike_here: bool,
    cyber: bool,
    relief_days: u32,
}

fn coverage_rationale(signals: CoverageSignals) -> String {
    let mut bits = vec![format!(
        "DOC is {} days (risk increases below 7).",
        round_to(signals.doc, 1)
    )];
    if signals.shortage > 0 {
        bits.push(format!(
            "Projected shortage ≈ {} units over 7 days if inbound doesn't land.",
            format_units(signals.shortage)
        ));
    }
    if signals.dc_risk > 0.5 {
        bits.push(format!(
            "DC utilization risk is elevated ({}).",
            format_percent(signals.dc_risk, 0)
        ));
    }
    if signals.relief_days > 0 {
        bits.push(format!(
            "Overflow relief is active for {} more day(s).",
            signals.relief_days
        ));
    }
    if signals.outage_here {
        bits.push("Scenario: DC outage reduces effective throughput and increases delay risk.".into());
    }
    if signals.spike_here {
        bits.push("Scenario: demand spike on this SKU increases burn-rate.".into());
    }
    if signals.cyber {
        bits.push(
            "Scenario: cyber degraded mode adds planning friction (higher late/stockout risk)."
                .into(),
        );
    }
    bits.join(" ")
}

fn late_rationale(
    shipment: &Shipment,
    late_prob: f64,
    touches_outage: bool,
    carrier_disrupted: bool,
    cyber: bool,
) -> String {
    let mut bits = vec![format!(
        "Late probability is {} based on lane miles, carrier on-time, fuel drift, and scenario signals.",
        format_percent(late_prob, 1)
    )];
    if touches_outage {
        bits.push("Touches the outage DC (higher disruption risk).".into());
    }
    if carrier_disrupted {
        bits.push(format!("Carrier {} is disrupted (lower on-time).", shipment.carrier));
    }
    if cyber {
        bits.push("Cyber degraded mode increases handoffs and planning latency.".into());
    }
    bits.join(" ")
}

fn choke_rationale(dc: &Node, utilization: &DcUtilization, relief_days: u32) -> String {
    let mut text = format!(
        "Utilization is {} of effective capacity ({} units/day, adjusted by scenario). Risk ramps sharply beyond ~86%.",
        format_percent(utilization.utilization, 0),
        format_units(i64::from(utilization.effective_capacity)),
    );
    if relief_days > 0 {
        text.push_str(&format!(
            " Overflow relief at {} is active for {} more day(s).",
            dc.name, relief_days
        ));
    }
    text
}

/// Lowest days-of-cover SKU among this DC's coverage exceptions.
pub fn worst_sku_at_dc<'a>(derived: &'a DerivedState, dc: &NodeId) -> Option<&'a SkuId> {
    derived
        .of_kind(ExceptionKind::InventoryCoverage)
        .filter_map(|exception| match &exception.detail {
            ExceptionDetail::InventoryCoverage { dc: at, sku, doc, .. } if at == dc => {
                Some((sku, *doc))
            }
            _ => None,
        })
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .map(|(sku, _)| sku)
}
