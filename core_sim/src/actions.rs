//! Guardrail gate and the four corrective actions.

use serde::Serialize;
use serde_json::{json, Value};
use sim_schema::{
    Action, AuditKind, CarrierId, NodeId, Shipment, ShipmentId, ShipmentKind, ShipmentStatus,
    SkuId,
};
use thiserror::Error;

use crate::baseline::{FALLBACK_LANE_MILES, FALLBACK_LANE_TRANSIT_DAYS, TRANSFER_PENALTY_USD};
use crate::numeric::{format_units, format_usd, round_usd};
use crate::retender;
use crate::scenario::active_disrupted_carrier;
use crate::world::World;

pub const EXPEDITE_PENALTY_USD: i64 = 9_000;
const EXPEDITE_RATE_PER_MILE: f64 = 3.2;
const EXPEDITE_ETA_DAYS: u32 = 1;
const TRANSFER_MIN_MILES: u32 = 200;
const MILES_PER_TRANSIT_DAY: u32 = 520;
const RETENDER_ETA_FACTOR: f64 = 0.92;
const RETENDER_ETA_MAX: u32 = 7;

pub const GUARDRAIL_REASON: &str = "Cyber degraded mode: execution is restricted. \
Use Playbooks to generate a manual plan (simulated guardrail).";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Applied,
    /// Rejected by the guardrail. Logged, nothing else changed.
    Blocked,
    /// Not applicable (zero quantity, unknown or delivered shipment, unknown kind).
    Ignored,
}

impl ActionOutcome {
    pub fn is_applied(self) -> bool {
        self == ActionOutcome::Applied
    }
}

#[derive(Debug, Error)]
pub enum ActionParseError {
    #[error("action is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("action is missing a string `type` field")]
    MissingType,
    #[error("malformed {kind} action: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// An action as received from a caller. Kinds outside the known union are
/// kept so they can be audited instead of silently dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    Known(Action),
    Unknown { kind: String, payload: Value },
}

impl ActionRequest {
    pub fn parse(text: &str) -> Result<Self, ActionParseError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json(value)
    }

    pub fn from_json(value: Value) -> Result<Self, ActionParseError> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ActionParseError::MissingType)?
            .to_string();
        if !Action::KINDS.contains(&kind.as_str()) {
            return Ok(ActionRequest::Unknown {
                kind,
                payload: value,
            });
        }
        serde_json::from_value(value)
            .map(ActionRequest::Known)
            .map_err(|source| ActionParseError::Malformed { kind, source })
    }
}

impl From<Action> for ActionRequest {
    fn from(action: Action) -> Self {
        ActionRequest::Known(action)
    }
}

/// Execution is closed while cyber-degraded mode is on.
pub fn guardrail(world: &World) -> Result<(), &'static str> {
    if world.guardrail_closed() {
        Err(GUARDRAIL_REASON)
    } else {
        Ok(())
    }
}

pub(crate) fn execute(world: &mut World, action: &Action) -> ActionOutcome {
    let payload = serde_json::to_value(action).unwrap_or(Value::Null);
    if let Err(reason) = guardrail(world) {
        tracing::warn!(
            target: "supply_autopilot::actions",
            kind = %action.audit_kind(),
            "action.blocked=guardrail"
        );
        world.record(AuditKind::GuardrailBlock, reason.to_string(), payload);
        return ActionOutcome::Blocked;
    }

    let applied = match action {
        Action::RebalanceTransfer {
            from_dc,
            to_dc,
            sku,
            qty,
            transit_days,
            transfer_cost,
        } => rebalance_transfer(
            world,
            from_dc,
            to_dc,
            sku,
            *qty,
            *transit_days,
            *transfer_cost,
        ),
        Action::Retender {
            shipment_id,
            new_carrier,
        } => retender_shipment(world, shipment_id, new_carrier),
        Action::ExpediteInbound { dc, sku, add_qty } => {
            expedite_inbound(world, dc, sku, *add_qty)
        }
        Action::RerouteOverflow { dc } => reroute_overflow(world, dc),
    };

    match applied {
        Some((detail, extra)) => {
            tracing::info!(
                target: "supply_autopilot::actions",
                kind = %action.audit_kind(),
                day = world.day,
                "action.applied"
            );
            let payload = merge(payload, extra);
            world.record(action.audit_kind(), detail, payload);
            ActionOutcome::Applied
        }
        None => {
            tracing::debug!(
                target: "supply_autopilot::actions",
                kind = %action.audit_kind(),
                "action.ignored"
            );
            ActionOutcome::Ignored
        }
    }
}

pub(crate) fn record_unknown(world: &mut World, kind: &str, payload: Value) -> ActionOutcome {
    if let Err(reason) = guardrail(world) {
        world.record(AuditKind::GuardrailBlock, reason.to_string(), payload);
        return ActionOutcome::Blocked;
    }
    tracing::warn!(target: "supply_autopilot::actions", kind, "action.unknown");
    world.record(
        AuditKind::UnknownAction,
        format!("Unknown action type: {kind}"),
        payload,
    );
    ActionOutcome::Ignored
}

fn merge(mut payload: Value, extra: Value) -> Value {
    if let (Some(base), Value::Object(extra)) = (payload.as_object_mut(), extra) {
        base.extend(extra);
    }
    payload
}

type Applied = Option<(String, Value)>;

/// Highest on-time carrier that is not currently disrupted.
pub fn best_available_carrier(world: &World) -> Option<CarrierId> {
    let disrupted = active_disrupted_carrier(&world.scenario);
    world
        .baseline
        .carriers
        .iter()
        .filter(|carrier| Some(&carrier.id) != disrupted)
        .max_by(|a, b| a.on_time.total_cmp(&b.on_time))
        .or_else(|| world.baseline.carriers.first())
        .map(|carrier| carrier.id.clone())
}

fn rebalance_transfer(
    world: &mut World,
    from_dc: &NodeId,
    to_dc: &NodeId,
    sku: &SkuId,
    qty: u32,
    transit_days: u32,
    transfer_cost: i64,
) -> Applied {
    if qty == 0 {
        return None;
    }
    let carrier = best_available_carrier(world)?;
    let withdrawn = world.inventory.withdraw(from_dc, sku, qty);
    let id = world.next_shipment_id("XFER");
    world.shipments.insert(
        0,
        Shipment {
            id: id.clone(),
            kind: ShipmentKind::Transfer,
            from: from_dc.clone(),
            to: to_dc.clone(),
            lane_id: None,
            miles: Some(
                transit_days
                    .saturating_mul(MILES_PER_TRANSIT_DAY)
                    .max(TRANSFER_MIN_MILES),
            ),
            sku: sku.clone(),
            qty,
            carrier: carrier.clone(),
            created_day: world.day,
            eta_days: transit_days,
            base_transit_days: transit_days,
            penalty: TRANSFER_PENALTY_USD,
            status: arrival_status(transit_days),
            cost: transfer_cost,
        },
    );
    Some((
        format!(
            "Transferred {} units of {sku} from {from_dc} → {to_dc} (ETA {transit_days}d).",
            format_units(i64::from(qty))
        ),
        json!({ "shipment_id": id, "carrier": carrier, "withdrawn": withdrawn }),
    ))
}

fn retender_shipment(
    world: &mut World,
    shipment_id: &ShipmentId,
    new_carrier: &CarrierId,
) -> Applied {
    let index = world
        .shipments
        .iter()
        .position(|s| &s.id == shipment_id && !s.is_delivered())?;

    let quote = {
        let multipliers = world.multipliers();
        let risk = world.risk_context(&multipliers);
        retender::quote(&risk, &world.shipments[index], new_carrier)
    };

    let shipment = &mut world.shipments[index];
    let previous = std::mem::replace(&mut shipment.carrier, new_carrier.clone());
    shipment.cost = quote.freight;
    if &previous != new_carrier {
        let eta = (f64::from(shipment.eta_days) * RETENDER_ETA_FACTOR).round() as u32;
        shipment.eta_days = eta.min(RETENDER_ETA_MAX);
    }

    Some((
        format!(
            "Re-tendered {shipment_id} from {previous} → {new_carrier}. Expected total cost ≈ {}.",
            format_usd(quote.expected_total)
        ),
        json!({ "previous_carrier": previous, "quote": quote }),
    ))
}

fn expedite_inbound(world: &mut World, dc: &NodeId, sku: &SkuId, add_qty: u32) -> Applied {
    if add_qty == 0 || world.baseline.plants.is_empty() {
        return None;
    }
    let carrier = best_available_carrier(world)?;
    let plant = world.baseline.plants[world.rng.index(world.baseline.plants.len())]
        .id
        .clone();
    let (lane_id, miles, lane_days) = match world.baseline.lane_between(&plant, dc) {
        Some(lane) => (Some(lane.id.clone()), lane.miles, lane.transit_days),
        None => {
            tracing::warn!(
                target: "supply_autopilot::actions",
                plant = %plant,
                dc = %dc,
                "lookup.fallback=lane"
            );
            (None, FALLBACK_LANE_MILES, FALLBACK_LANE_TRANSIT_DAYS)
        }
    };
    let id = world.next_shipment_id("EXP");
    world.shipments.insert(
        0,
        Shipment {
            id: id.clone(),
            kind: ShipmentKind::Inbound,
            from: plant.clone(),
            to: dc.clone(),
            miles: lane_id.is_none().then_some(miles),
            lane_id,
            sku: sku.clone(),
            qty: add_qty,
            carrier: carrier.clone(),
            created_day: world.day,
            eta_days: EXPEDITE_ETA_DAYS,
            base_transit_days: lane_days,
            penalty: EXPEDITE_PENALTY_USD,
            status: ShipmentStatus::InTransit,
            cost: round_usd(f64::from(miles) * EXPEDITE_RATE_PER_MILE),
        },
    );
    Some((
        format!(
            "Expedited {} units of {sku} to {dc} (ETA {EXPEDITE_ETA_DAYS}d).",
            format_units(i64::from(add_qty))
        ),
        json!({ "shipment_id": id, "plant": plant, "carrier": carrier }),
    ))
}

fn reroute_overflow(world: &mut World, dc: &NodeId) -> Applied {
    let days = world.config.overflow_relief_days;
    world.relief.grant(dc.clone(), days);
    Some((
        format!("Activated overflow plan for {dc} (temporary throughput relief)."),
        json!({ "relief_days": days }),
    ))
}

fn arrival_status(eta_days: u32) -> ShipmentStatus {
    if eta_days == 0 {
        ShipmentStatus::Arriving
    } else {
        ShipmentStatus::InTransit
    }
}
