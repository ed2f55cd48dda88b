//! Shared data model for the supply-chain autopilot simulation.
//!
//! Everything here is plain serializable data: the immutable network
//! description (nodes, lanes, carriers, SKUs), the mutable tables owned by the
//! engine's `World`, scenario flags, the action union and the audit log.
//! Behaviour lives in `core_sim`.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(
    /// Identifier of a plant or distribution center.
    NodeId
);
string_id!(LaneId);
string_id!(CarrierId);
string_id!(SkuId);
string_id!(ShipmentId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Plant,
    Dc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub lat: f64,
    pub lon: f64,
    /// Nominal throughput in units per day. Only distribution centers carry one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

impl Node {
    pub fn is_dc(&self) -> bool {
        self.kind == NodeKind::Dc
    }
}

/// Directed plant to DC route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub id: LaneId,
    pub from: NodeId,
    pub to: NodeId,
    pub miles: u32,
    pub transit_days: u32,
    pub rate_per_mile: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    pub id: CarrierId,
    pub name: String,
    pub on_time: f64,
    pub cost_index: f64,
    pub capacity_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DemandClass {
    Fast,
    Med,
    Slow,
    Seasonal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sku {
    pub id: SkuId,
    pub name: String,
    pub unit_price: f64,
    pub unit_margin: f64,
    pub demand_class: DemandClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentKind {
    Inbound,
    Transfer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    InTransit,
    Arriving,
    Delivered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub kind: ShipmentKind,
    pub from: NodeId,
    pub to: NodeId,
    /// Set for inbound shipments travelling a plant lane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane_id: Option<LaneId>,
    /// Recorded distance for transfers, which have no lane.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub miles: Option<u32>,
    pub sku: SkuId,
    pub qty: u32,
    pub carrier: CarrierId,
    pub created_day: u32,
    pub eta_days: u32,
    pub base_transit_days: u32,
    /// USD owed if the shipment lands late.
    pub penalty: i64,
    pub status: ShipmentStatus,
    /// Freight cost in whole USD.
    pub cost: i64,
}

impl Shipment {
    pub fn is_delivered(&self) -> bool {
        self.status == ShipmentStatus::Delivered
    }

    pub fn touches(&self, node: &NodeId) -> bool {
        &self.from == node || &self.to == node
    }
}

/// On-hand units per (DC, SKU). Unsigned, so it cannot go negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InventoryTable(pub BTreeMap<NodeId, BTreeMap<SkuId, u32>>);

impl InventoryTable {
    pub fn on_hand(&self, dc: &NodeId, sku: &SkuId) -> u32 {
        self.0
            .get(dc)
            .and_then(|row| row.get(sku))
            .copied()
            .unwrap_or(0)
    }

    pub fn contains(&self, dc: &NodeId, sku: &SkuId) -> bool {
        self.0.get(dc).is_some_and(|row| row.contains_key(sku))
    }

    pub fn insert(&mut self, dc: NodeId, sku: SkuId, units: u32) {
        self.0.entry(dc).or_default().insert(sku, units);
    }

    /// Removes up to `units`, flooring at zero. Returns the units actually removed.
    pub fn withdraw(&mut self, dc: &NodeId, sku: &SkuId, units: u32) -> u32 {
        match self.0.get_mut(dc).and_then(|row| row.get_mut(sku)) {
            Some(on_hand) => {
                let removed = units.min(*on_hand);
                *on_hand -= removed;
                removed
            }
            None => 0,
        }
    }

    /// Adds units to an existing entry. Entries are only created at generation.
    pub fn credit(&mut self, dc: &NodeId, sku: &SkuId, units: u32) -> bool {
        match self.0.get_mut(dc).and_then(|row| row.get_mut(sku)) {
            Some(on_hand) => {
                *on_hand = on_hand.saturating_add(units);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &SkuId, u32)> {
        self.0
            .iter()
            .flat_map(|(dc, row)| row.iter().map(move |(sku, units)| (dc, sku, *units)))
    }
}

/// Baseline forecast units per day for each (DC, SKU).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DemandTable(pub BTreeMap<NodeId, BTreeMap<SkuId, f64>>);

impl DemandTable {
    pub fn per_day(&self, dc: &NodeId, sku: &SkuId) -> f64 {
        self.0
            .get(dc)
            .and_then(|row| row.get(sku))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn insert(&mut self, dc: NodeId, sku: SkuId, units_per_day: f64) {
        self.0.entry(dc).or_default().insert(sku, units_per_day);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostIndexPoint {
    pub day: i64,
    pub index: f64,
}

/// Time-ascending cost (fuel) index history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostIndexSeries(pub Vec<CostIndexPoint>);

impl CostIndexSeries {
    pub fn points(&self) -> &[CostIndexPoint] {
        &self.0
    }

    pub fn last(&self) -> Option<&CostIndexPoint> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a point and evicts the oldest entries beyond `limit`.
    pub fn push_bounded(&mut self, point: CostIndexPoint, limit: usize) {
        self.0.push(point);
        if self.0.len() > limit {
            let overflow = self.0.len() - limit;
            self.0.drain(..overflow);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScenarioFlag {
    DcOutage,
    CarrierDisruption,
    DemandSpike,
    CyberDegraded,
}

impl ScenarioFlag {
    pub const ALL: [ScenarioFlag; 4] = [
        ScenarioFlag::DcOutage,
        ScenarioFlag::CarrierDisruption,
        ScenarioFlag::DemandSpike,
        ScenarioFlag::CyberDegraded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioFlag::DcOutage => "dcOutage",
            ScenarioFlag::CarrierDisruption => "carrierDisruption",
            ScenarioFlag::DemandSpike => "demandSpike",
            ScenarioFlag::CyberDegraded => "cyberDegraded",
        }
    }
}

impl fmt::Display for ScenarioFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scenario flag `{0}`")]
pub struct ParseScenarioFlagError(pub String);

impl FromStr for ScenarioFlag {
    type Err = ParseScenarioFlagError;

    /// Accepts camelCase, kebab-case and snake_case spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "dcoutage" => Ok(ScenarioFlag::DcOutage),
            "carrierdisruption" => Ok(ScenarioFlag::CarrierDisruption),
            "demandspike" => Ok(ScenarioFlag::DemandSpike),
            "cyberdegraded" => Ok(ScenarioFlag::CyberDegraded),
            _ => Err(ParseScenarioFlagError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioToggles {
    pub dc_outage: bool,
    pub carrier_disruption: bool,
    pub demand_spike: bool,
    pub cyber_degraded: bool,
}

impl ScenarioToggles {
    pub fn is_on(&self, flag: ScenarioFlag) -> bool {
        match flag {
            ScenarioFlag::DcOutage => self.dc_outage,
            ScenarioFlag::CarrierDisruption => self.carrier_disruption,
            ScenarioFlag::DemandSpike => self.demand_spike,
            ScenarioFlag::CyberDegraded => self.cyber_degraded,
        }
    }

    pub fn set(&mut self, flag: ScenarioFlag, on: bool) {
        match flag {
            ScenarioFlag::DcOutage => self.dc_outage = on,
            ScenarioFlag::CarrierDisruption => self.carrier_disruption = on,
            ScenarioFlag::DemandSpike => self.demand_spike = on,
            ScenarioFlag::CyberDegraded => self.cyber_degraded = on,
        }
    }
}

/// Entities a scenario toggle is currently pinned to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioPins {
    pub outage_dc: Option<NodeId>,
    pub disrupted_carrier: Option<CarrierId>,
    pub spike_sku: Option<SkuId>,
}

impl ScenarioPins {
    /// Label of the entity `flag` is pinned to. Cyber mode never pins.
    pub fn pinned_for(&self, flag: ScenarioFlag) -> Option<&str> {
        match flag {
            ScenarioFlag::DcOutage => self.outage_dc.as_ref().map(NodeId::as_str),
            ScenarioFlag::CarrierDisruption => self.disrupted_carrier.as_ref().map(CarrierId::as_str),
            ScenarioFlag::DemandSpike => self.spike_sku.as_ref().map(SkuId::as_str),
            ScenarioFlag::CyberDegraded => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioState {
    pub toggles: ScenarioToggles,
    pub pins: ScenarioPins,
}

/// Remaining days of temporary throughput relief per DC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapacityRelief(pub BTreeMap<NodeId, u32>);

impl CapacityRelief {
    /// Sets (not extends) the relief window for a DC.
    pub fn grant(&mut self, dc: NodeId, days: u32) {
        if days == 0 {
            self.0.remove(&dc);
        } else {
            self.0.insert(dc, days);
        }
    }

    pub fn days_left(&self, dc: &NodeId) -> u32 {
        self.0.get(dc).copied().unwrap_or(0)
    }

    pub fn is_active(&self, dc: &NodeId) -> bool {
        self.days_left(dc) > 0
    }

    /// Decrements every counter by one day and drops the ones that hit zero.
    /// Returns the DCs whose relief expired.
    pub fn decay(&mut self) -> Vec<NodeId> {
        let mut expired = Vec::new();
        self.0.retain(|dc, days| {
            *days = days.saturating_sub(1);
            if *days == 0 {
                expired.push(dc.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, u32)> {
        self.0.iter().map(|(dc, days)| (dc, *days))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Corrective actions accepted by the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    RebalanceTransfer {
        from_dc: NodeId,
        to_dc: NodeId,
        sku: SkuId,
        qty: u32,
        transit_days: u32,
        transfer_cost: i64,
    },
    Retender {
        shipment_id: ShipmentId,
        new_carrier: CarrierId,
    },
    ExpediteInbound {
        dc: NodeId,
        sku: SkuId,
        add_qty: u32,
    },
    RerouteOverflow {
        dc: NodeId,
    },
}

impl Action {
    pub const KINDS: [&'static str; 4] = [
        "REBALANCE_TRANSFER",
        "RETENDER",
        "EXPEDITE_INBOUND",
        "REROUTE_OVERFLOW",
    ];

    pub fn audit_kind(&self) -> AuditKind {
        match self {
            Action::RebalanceTransfer { .. } => AuditKind::RebalanceTransfer,
            Action::Retender { .. } => AuditKind::Retender,
            Action::ExpediteInbound { .. } => AuditKind::ExpediteInbound,
            Action::RerouteOverflow { .. } => AuditKind::RerouteOverflow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditKind {
    RebalanceTransfer,
    Retender,
    ExpediteInbound,
    RerouteOverflow,
    GuardrailBlock,
    UnknownAction,
    ShipmentDelivered,
    ScenarioToggled,
    SnapshotExported,
}

impl AuditKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditKind::RebalanceTransfer => "REBALANCE_TRANSFER",
            AuditKind::Retender => "RETENDER",
            AuditKind::ExpediteInbound => "EXPEDITE_INBOUND",
            AuditKind::RerouteOverflow => "REROUTE_OVERFLOW",
            AuditKind::GuardrailBlock => "GUARDRAIL_BLOCK",
            AuditKind::UnknownAction => "UNKNOWN_ACTION",
            AuditKind::ShipmentDelivered => "SHIPMENT_DELIVERED",
            AuditKind::ScenarioToggled => "SCENARIO_TOGGLED",
            AuditKind::SnapshotExported => "SNAPSHOT_EXPORTED",
        }
    }
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp_ms: u64,
    pub day: u32,
    pub kind: AuditKind,
    pub detail: String,
    #[serde(default)]
    pub payload: Value,
}

/// Append-only, newest-first action history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditLog(VecDeque<AuditLogEntry>);

impl AuditLog {
    pub fn record(&mut self, entry: AuditLogEntry) {
        self.0.push_front(entry);
    }

    pub fn latest(&self) -> Option<&AuditLogEntry> {
        self.0.front()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuditLogEntry> {
        self.0.iter()
    }

    pub fn count_of(&self, kind: AuditKind) -> usize {
        self.0.iter().filter(|entry| entry.kind == kind).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    InventoryCoverage,
    ShipmentLate,
    DcThroughputChoke,
}

impl ExceptionKind {
    pub fn label(self) -> &'static str {
        match self {
            ExceptionKind::InventoryCoverage => "Inventory Coverage Risk",
            ExceptionKind::ShipmentLate => "Shipment Late Risk",
            ExceptionKind::DcThroughputChoke => "DC Throughput Choke Risk",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Entities and measurements an exception refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExceptionDetail {
    #[serde(rename = "Inventory Coverage Risk")]
    InventoryCoverage {
        dc: NodeId,
        sku: SkuId,
        doc: f64,
        shortage: u32,
    },
    #[serde(rename = "Shipment Late Risk")]
    ShipmentLate {
        shipment_id: ShipmentId,
        from: NodeId,
        to: NodeId,
        sku: SkuId,
        qty: u32,
        late_prob: f64,
    },
    #[serde(rename = "DC Throughput Choke Risk")]
    DcThroughputChoke { dc: NodeId, utilization: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exception {
    pub id: String,
    #[serde(flatten)]
    pub detail: ExceptionDetail,
    pub value_at_risk: i64,
    pub risk_score: f64,
    pub rationale: String,
}

impl Exception {
    pub fn kind(&self) -> ExceptionKind {
        match self.detail {
            ExceptionDetail::InventoryCoverage { .. } => ExceptionKind::InventoryCoverage,
            ExceptionDetail::ShipmentLate { .. } => ExceptionKind::ShipmentLate,
            ExceptionDetail::DcThroughputChoke { .. } => ExceptionKind::DcThroughputChoke,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub value_at_risk: i64,
    pub service_risk: f64,
    pub avg_dc_utilization: f64,
    pub late_shipments: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_flag_parses_common_spellings() {
        assert_eq!("dcOutage".parse(), Ok(ScenarioFlag::DcOutage));
        assert_eq!("carrier-disruption".parse(), Ok(ScenarioFlag::CarrierDisruption));
        assert_eq!("demand_spike".parse(), Ok(ScenarioFlag::DemandSpike));
        assert!("meteor".parse::<ScenarioFlag>().is_err());
    }

    #[test]
    fn inventory_withdraw_floors_at_zero() {
        let mut table = InventoryTable::default();
        let dc = NodeId::from("DC-NJ");
        let sku = SkuId::from("SKU-1");
        table.insert(dc.clone(), sku.clone(), 40);
        assert_eq!(table.withdraw(&dc, &sku, 100), 40);
        assert_eq!(table.on_hand(&dc, &sku), 0);
        assert!(!table.credit(&dc, &SkuId::from("SKU-404"), 5));
    }

    #[test]
    fn cost_index_series_evicts_oldest() {
        let mut series = CostIndexSeries::default();
        for day in 0..5 {
            series.push_bounded(CostIndexPoint { day, index: 1.0 }, 3);
        }
        let days: Vec<i64> = series.points().iter().map(|p| p.day).collect();
        assert_eq!(days, vec![2, 3, 4]);
    }

    #[test]
    fn relief_decays_and_expires() {
        let mut relief = CapacityRelief::default();
        let tx = NodeId::from("DC-TX");
        let il = NodeId::from("DC-IL");
        relief.grant(tx.clone(), 3);
        relief.grant(il.clone(), 1);

        assert_eq!(relief.decay(), vec![il.clone()]);
        assert_eq!(relief.days_left(&tx), 2);
        assert!(!relief.is_active(&il));

        relief.decay();
        assert_eq!(relief.decay(), vec![tx.clone()]);
        assert!(relief.is_empty());
    }

    #[test]
    fn action_uses_screaming_type_tag() {
        let action = Action::RerouteOverflow {
            dc: NodeId::from("DC-TX"),
        };
        let json = serde_json::to_value(&action).expect("serialize");
        assert_eq!(json["type"], "REROUTE_OVERFLOW");
        let back: Action = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, action);
    }

    #[test]
    fn audit_log_is_newest_first() {
        let mut log = AuditLog::default();
        for day in 0..3 {
            log.record(AuditLogEntry {
                timestamp_ms: 0,
                day,
                kind: AuditKind::ShipmentDelivered,
                detail: String::new(),
                payload: Value::Null,
            });
        }
        assert_eq!(log.latest().map(|entry| entry.day), Some(2));
        assert_eq!(log.count_of(AuditKind::ShipmentDelivered), 3);
    }
}
