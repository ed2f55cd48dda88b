//! Recommended responses per exception and the static response playbooks.

use serde::Serialize;
use sim_schema::{Action, Exception, ExceptionDetail};

use crate::actions::ActionOutcome;
use crate::exceptions::{worst_sku_at_dc, DerivedState};
use crate::numeric::{format_units, format_usd};
use crate::world::World;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub label: String,
    pub rationale: String,
    pub impact: String,
    pub action: Action,
}

/// Candidate actions for an exception, best first. Computed against the
/// current world; executing one does not refresh the others.
pub fn recommended_actions(
    world: &World,
    derived: &DerivedState,
    exception: &Exception,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    match &exception.detail {
        ExceptionDetail::InventoryCoverage { dc, sku, .. } => {
            if let Some(best) = world.top_rebalance(sku) {
                let name = world
                    .baseline()
                    .sku(sku)
                    .map(|s| s.name.as_str())
                    .unwrap_or(sku.as_str());
                out.push(Recommendation {
                    label: format!("Rebalance: transfer {} units ({name})", format_units(i64::from(best.qty))),
                    rationale: "Highest net value transfer for this SKU (benefit − transfer cost). Includes transit days.".into(),
                    impact: format!(
                        "Net value ≈ {} • ETA {}d • reduces stockout exposure at {}",
                        format_usd(best.net_value),
                        best.transit_days,
                        best.to_dc
                    ),
                    action: best.to_action(),
                });
            }
            let qty = world.config().expedite_default_qty;
            out.push(Recommendation {
                label: "Expedite inbound (1 day)".into(),
                rationale: "Fastest prevention when stockout risk is imminent; increases on-hand quickly.".into(),
                impact: format!("Adds ~{} units to {dc} next day.", format_units(i64::from(qty))),
                action: Action::ExpediteInbound {
                    dc: dc.clone(),
                    sku: sku.clone(),
                    add_qty: qty,
                },
            });
        }
        ExceptionDetail::ShipmentLate { shipment_id, .. } => {
            if let Some(quote) = world.best_retender_quote(shipment_id) {
                out.push(Recommendation {
                    label: "Re-tender to lowest expected total cost".into(),
                    rationale: "Expected total cost = freight + (late probability × penalty). Picks the cheapest risk-adjusted option.".into(),
                    impact: format!(
                        "Moves {shipment_id} to {} at ≈ {} expected total.",
                        quote.carrier,
                        format_usd(quote.expected_total)
                    ),
                    action: Action::Retender {
                        shipment_id: shipment_id.clone(),
                        new_carrier: quote.carrier,
                    },
                });
            }
        }
        ExceptionDetail::DcThroughputChoke { dc, .. } => {
            let sku = worst_sku_at_dc(derived, dc)
                .cloned()
                .or_else(|| world.baseline().skus.first().map(|s| s.id.clone()));
            if let Some(best) = sku.and_then(|sku| world.top_rebalance(&sku)) {
                out.push(Recommendation {
                    label: format!(
                        "Shift volume away: rebalance {} units of {}",
                        format_units(i64::from(best.qty)),
                        best.sku
                    ),
                    rationale: "Reduce outbound pressure by shifting allocation to less-utilized DCs.".into(),
                    impact: format!(
                        "Net value ≈ {} • ETA {}d",
                        format_usd(best.net_value),
                        best.transit_days
                    ),
                    action: best.to_action(),
                });
            }
            out.push(Recommendation {
                label: "Activate overflow / reroute plan".into(),
                rationale: "Temporary throughput relief (labor, slotting, overflow trailer yard).".into(),
                impact: format!(
                    "Effective capacity ×1.18 at {dc} for {} days.",
                    world.config().overflow_relief_days
                ),
                action: Action::RerouteOverflow { dc: dc.clone() },
            });
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Playbook {
    pub title: &'static str,
    pub steps: &'static [&'static str],
}

pub const PLAYBOOKS: [Playbook; 3] = [
    Playbook {
        title: "Inventory stockout prevention",
        steps: &[
            "Detect low DOC + inbound uncertainty",
            "Diagnose root cause (demand spike? DC choke? supplier delay?)",
            "Propose actions (rebalance, expedite, allocation changes)",
            "Guardrails (cost thresholds, cyber mode, approval policy)",
            "Approve & execute",
            "Audit trail (snapshot + action log)",
        ],
    },
    Playbook {
        title: "Shipment late-risk mitigation",
        steps: &[
            "Detect high late probability + penalty exposure",
            "Compute expected total cost by carrier",
            "Recommend retender (or split shipment)",
            "Guardrails (carrier capacity, cyber mode)",
            "Approve & execute retender",
            "Audit trail",
        ],
    },
    Playbook {
        title: "DC choke response",
        steps: &[
            "Detect utilization > 86% and rising",
            "Identify flow drivers (inbound wave, outbound peak)",
            "Propose overflow/reroute + inventory shifts",
            "Guardrails (service impact, cost caps)",
            "Approve & execute",
            "Audit trail",
        ],
    },
];

impl World {
    /// Recommendations for a currently ranked exception; empty when the id no
    /// longer appears in the ranking.
    pub fn recommendations_for(&self, exception_id: &str) -> Vec<Recommendation> {
        let derived = self.derive();
        derived
            .exception(exception_id)
            .map(|exception| recommended_actions(self, &derived, exception))
            .unwrap_or_default()
    }

    /// Executes the `index`-th recommendation for an exception. `None` when
    /// there is no such recommendation.
    pub fn execute_recommendation(
        &mut self,
        exception_id: &str,
        index: usize,
    ) -> Option<ActionOutcome> {
        let recommendation = self.recommendations_for(exception_id).into_iter().nth(index)?;
        tracing::info!(
            target: "supply_autopilot::actions",
            exception = exception_id,
            label = %recommendation.label,
            "recommendation.selected"
        );
        Some(self.execute_action(&recommendation.action))
    }
}

/// Operator note shown with the playbooks; depends on the guardrail state.
pub fn execution_note(world: &World) -> &'static str {
    if world.guardrail_closed() {
        "Execution is blocked: generate a manual plan and export a snapshot for approval."
    } else {
        "Execution is enabled: approve recommended actions directly."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_schema::{ExceptionKind, ScenarioFlag};

    fn stressed() -> World {
        let mut world = World::new(20251212);
        world.toggle_scenario(ScenarioFlag::DemandSpike);
        world.toggle_scenario(ScenarioFlag::DcOutage);
        for _ in 0..5 {
            world.tick();
        }
        world
    }

    #[test]
    fn coverage_exceptions_always_offer_expedite() {
        let world = stressed();
        let derived = world.derive();
        let exception = derived
            .of_kind(ExceptionKind::InventoryCoverage)
            .next()
            .expect("coverage exception");
        let recs = recommended_actions(&world, &derived, exception);
        assert!(recs.iter().any(|r| matches!(
            r.action,
            Action::ExpediteInbound { add_qty: 1200, .. }
        )));
    }

    #[test]
    fn late_shipments_get_the_cheapest_quote() {
        let world = stressed();
        let derived = world.derive();
        let exception = derived
            .of_kind(ExceptionKind::ShipmentLate)
            .next()
            .expect("late exception");
        let recs = recommended_actions(&world, &derived, exception);
        let ExceptionDetail::ShipmentLate { shipment_id, .. } = &exception.detail else {
            unreachable!("filtered by kind");
        };
        let best = world.best_retender_quote(shipment_id).expect("quote");
        assert_eq!(
            recs[0].action,
            Action::Retender {
                shipment_id: shipment_id.clone(),
                new_carrier: best.carrier
            }
        );
    }

    #[test]
    fn note_tracks_guardrail() {
        let mut world = World::new(1);
        assert!(execution_note(&world).starts_with("Execution is enabled"));
        world.toggle_scenario(ScenarioFlag::CyberDegraded);
        assert!(execution_note(&world).starts_with("Execution is blocked"));
        assert_eq!(PLAYBOOKS.len(), 3);
    }

    #[test]
    fn executing_a_stale_exception_is_a_no_op() {
        let mut world = World::new(20251212);
        assert_eq!(world.execute_recommendation("EXC-DOES-NOT-EXIST", 0), None);
        assert!(world.audit_log().is_empty());
    }

    #[test]
    fn first_recommendation_executes_through_the_guardrail() {
        let mut world = stressed();
        let derived = world.derive();
        let id = derived.ranked_exceptions[0].id.clone();
        world.toggle_scenario(ScenarioFlag::CyberDegraded);
        let outcome = world.execute_recommendation(&id, 0);
        assert!(matches!(outcome, None | Some(ActionOutcome::Blocked)));
    }
}
