use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use sim_schema::{
    Action, AuditKind, AuditLog, AuditLogEntry, CapacityRelief, CostIndexSeries, InventoryTable,
    NodeId, ScenarioFlag, ScenarioState, Shipment, ShipmentId, SkuId,
};

use crate::actions::{self, ActionOutcome, ActionRequest};
use crate::baseline::Baseline;
use crate::clock::{self, TickReport};
use crate::config::SimulationConfig;
use crate::exceptions::{self, DerivedState};
use crate::rebalance::{self, RebalanceProposal};
use crate::retender::{self, RetenderQuote};
use crate::risk::RiskContext;
use crate::rng::RandomStream;
use crate::scenario::{self, ScenarioMultipliers};

/// Mixed into the base seed for the session stream so it never replays the
/// baseline generator's draws.
const SESSION_RNG_SALT: u64 = 0x5e55_10a0_d7f1_c3b9;

/// Where audit timestamps come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampSource {
    System,
    /// Every entry gets the same instant. Used to compare sessions byte for byte.
    Frozen(u64),
}

impl TimestampSource {
    pub fn now_ms(self) -> u64 {
        match self {
            TimestampSource::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            TimestampSource::Frozen(ms) => ms,
        }
    }
}

/// One operator session: the immutable baseline plus every mutable table.
///
/// Commands (`toggle_scenario`, `execute_action`, `tick`, `reset_to_baseline`)
/// take `&mut self` and run to completion, so a query can never observe a
/// half-applied mutation.
#[derive(Debug, Clone)]
pub struct World {
    pub(crate) config: SimulationConfig,
    pub(crate) baseline: Baseline,
    pub(crate) day: u32,
    pub(crate) scenario: ScenarioState,
    pub(crate) relief: CapacityRelief,
    pub(crate) inventory: InventoryTable,
    pub(crate) shipments: Vec<Shipment>,
    pub(crate) cost_index: CostIndexSeries,
    pub(crate) audit_log: AuditLog,
    pub(crate) rng: RandomStream,
    pub(crate) next_shipment_seq: u64,
    pub(crate) timestamps: TimestampSource,
}

impl World {
    pub fn new(seed: u64) -> Self {
        Self::with_config(SimulationConfig {
            base_seed: seed,
            ..SimulationConfig::builtin()
        })
    }

    pub fn with_config(config: SimulationConfig) -> Self {
        let baseline = Baseline::generate(config.base_seed);
        Self::from_baseline(baseline, config)
    }

    pub fn from_baseline(baseline: Baseline, config: SimulationConfig) -> Self {
        let seed = baseline.seed();
        tracing::info!(
            target: "supply_autopilot::world",
            seed,
            shipments = baseline.shipments.len(),
            "world.created"
        );
        Self {
            inventory: baseline.inventory.clone(),
            shipments: baseline.shipments.clone(),
            cost_index: baseline.cost_index.clone(),
            baseline,
            config,
            day: 0,
            scenario: ScenarioState::default(),
            relief: CapacityRelief::default(),
            audit_log: AuditLog::default(),
            rng: RandomStream::new(seed ^ SESSION_RNG_SALT),
            next_shipment_seq: 1,
            timestamps: TimestampSource::System,
        }
    }

    pub fn with_timestamps(mut self, timestamps: TimestampSource) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn seed(&self) -> u64 {
        self.baseline.seed()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn scenario(&self) -> &ScenarioState {
        &self.scenario
    }

    pub fn relief(&self) -> &CapacityRelief {
        &self.relief
    }

    pub fn inventory(&self) -> &InventoryTable {
        &self.inventory
    }

    /// Newest first; actions prepend the shipments they create.
    pub fn shipments(&self) -> &[Shipment] {
        &self.shipments
    }

    pub fn shipment(&self, id: &ShipmentId) -> Option<&Shipment> {
        self.shipments.iter().find(|shipment| &shipment.id == id)
    }

    pub fn cost_index(&self) -> &CostIndexSeries {
        &self.cost_index
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    pub fn guardrail_closed(&self) -> bool {
        self.scenario.toggles.cyber_degraded
    }

    pub fn multipliers(&self) -> ScenarioMultipliers {
        ScenarioMultipliers::compute(&self.baseline, &self.scenario, &self.relief)
    }

    pub fn risk_context<'a>(&'a self, multipliers: &'a ScenarioMultipliers) -> RiskContext<'a> {
        RiskContext::new(&self.baseline, &self.scenario, multipliers, &self.cost_index)
    }

    pub fn effective_demand(
        &self,
        dc: &NodeId,
        sku: &SkuId,
        multipliers: &ScenarioMultipliers,
    ) -> f64 {
        multipliers.effective_demand(self.baseline.demand.per_day(dc, sku), sku)
    }

    /// Units headed to `dc` on shipments that have not landed yet.
    pub fn in_transit_to(&self, dc: &NodeId, sku: &SkuId) -> u64 {
        self.shipments
            .iter()
            .filter(|s| !s.is_delivered() && &s.to == dc && &s.sku == sku)
            .map(|s| u64::from(s.qty))
            .sum()
    }

    // ---- commands -------------------------------------------------------

    /// Flips a scenario toggle and returns its new state.
    pub fn toggle_scenario(&mut self, flag: ScenarioFlag) -> bool {
        let on = scenario::toggle(&mut self.scenario, flag, &self.baseline);
        self.log_toggle(flag, on);
        on
    }

    /// Forces a toggle to a state. No-op (and no audit entry) if already there.
    pub fn set_scenario(&mut self, flag: ScenarioFlag, on: bool) -> bool {
        if self.scenario.toggles.is_on(flag) == on {
            return false;
        }
        scenario::set(&mut self.scenario, flag, on, &self.baseline);
        self.log_toggle(flag, on);
        true
    }

    fn log_toggle(&mut self, flag: ScenarioFlag, on: bool) {
        let pinned = self.scenario.pins.pinned_for(flag).map(str::to_string);
        tracing::info!(
            target: "supply_autopilot::scenario",
            flag = %flag,
            on,
            pinned = pinned.as_deref().unwrap_or("-"),
            "scenario.toggled"
        );
        let detail = match &pinned {
            Some(entity) => format!(
                "Scenario {flag} turned {} (pinned {entity}).",
                if on { "ON" } else { "OFF" }
            ),
            None => format!("Scenario {flag} turned {}.", if on { "ON" } else { "OFF" }),
        };
        self.record(
            AuditKind::ScenarioToggled,
            detail,
            serde_json::json!({ "flag": flag, "on": on, "pinned": pinned }),
        );
    }

    pub fn execute_action(&mut self, action: &Action) -> ActionOutcome {
        actions::execute(self, action)
    }

    /// Executes a decoded request, logging unknown kinds instead of applying them.
    pub fn execute_request(&mut self, request: ActionRequest) -> ActionOutcome {
        match request {
            ActionRequest::Known(action) => self.execute_action(&action),
            ActionRequest::Unknown { kind, payload } => actions::record_unknown(self, &kind, payload),
        }
    }

    pub fn tick(&mut self) -> TickReport {
        clock::advance_day(self)
    }

    /// Discards all session state and regenerates the baseline for `seed`.
    pub fn reset_to_baseline(&mut self, seed: u64) {
        let config = SimulationConfig {
            base_seed: seed,
            ..self.config.clone()
        };
        let timestamps = self.timestamps;
        *self = World::with_config(config).with_timestamps(timestamps);
        tracing::info!(target: "supply_autopilot::world", seed, "world.reset");
    }

    // ---- queries --------------------------------------------------------

    pub fn derive(&self) -> DerivedState {
        exceptions::derive_kpis_and_exceptions(self)
    }

    pub fn rebalance_proposals(&self, sku: &SkuId) -> Vec<RebalanceProposal> {
        rebalance::proposals_for_sku(self, sku)
    }

    pub fn top_rebalance(&self, sku: &SkuId) -> Option<RebalanceProposal> {
        self.rebalance_proposals(sku).into_iter().next()
    }

    /// Executes the highest net-value transfer for `sku`, if one exists.
    pub fn execute_top_rebalance(&mut self, sku: &SkuId) -> Option<ActionOutcome> {
        let best = self.top_rebalance(sku)?;
        Some(self.execute_action(&best.to_action()))
    }

    pub fn retender_quotes(&self, shipment: &ShipmentId) -> Vec<RetenderQuote> {
        retender::quotes_for_shipment(self, shipment)
    }

    pub fn best_retender_quote(&self, shipment: &ShipmentId) -> Option<RetenderQuote> {
        self.retender_quotes(shipment).into_iter().next()
    }

    // ---- internals ------------------------------------------------------

    pub(crate) fn record(&mut self, kind: AuditKind, detail: String, payload: Value) {
        self.audit_log.record(AuditLogEntry {
            timestamp_ms: self.timestamps.now_ms(),
            day: self.day,
            kind,
            detail,
            payload,
        });
    }

    pub(crate) fn next_shipment_id(&mut self, prefix: &str) -> ShipmentId {
        let id = ShipmentId(format!("SHP-{prefix}-{}", self.next_shipment_seq));
        self.next_shipment_seq += 1;
        id
    }
}
