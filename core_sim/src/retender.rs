use serde::Serialize;
use sim_schema::{CarrierId, Shipment, ShipmentId};

use crate::baseline::freight_cost;
use crate::numeric::round_usd;
use crate::risk::RiskContext;
use crate::world::World;

/// Risk-adjusted cost of moving a shipment to one carrier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetenderQuote {
    pub carrier: CarrierId,
    pub freight: i64,
    pub late_prob: f64,
    pub penalty: i64,
    /// `freight + round(late_prob * penalty)`.
    pub expected_total: i64,
}

pub fn quote(risk: &RiskContext<'_>, shipment: &Shipment, carrier: &CarrierId) -> RetenderQuote {
    let (_, cost_index) = risk.baseline.carrier_profile(carrier);
    let freight = round_usd(freight_cost(risk.baseline.shipment_miles(shipment), cost_index));
    let late_prob = risk
        .inputs_with_carrier(shipment, carrier)
        .late_probability();
    RetenderQuote {
        carrier: carrier.clone(),
        freight,
        late_prob,
        penalty: shipment.penalty,
        expected_total: freight + round_usd(late_prob * shipment.penalty as f64),
    }
}

/// One quote per carrier, cheapest expected total first. Empty for unknown or
/// delivered shipments.
pub fn quotes_for_shipment(world: &World, shipment_id: &ShipmentId) -> Vec<RetenderQuote> {
    let Some(shipment) = world.shipment(shipment_id).filter(|s| !s.is_delivered()) else {
        return Vec::new();
    };
    let multipliers = world.multipliers();
    let risk = world.risk_context(&multipliers);
    let mut quotes: Vec<RetenderQuote> = world
        .baseline
        .carriers
        .iter()
        .map(|carrier| quote(&risk, shipment, &carrier.id))
        .collect();
    quotes.sort_by_key(|quote| quote.expected_total);
    quotes
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_schema::{CarrierId, ScenarioFlag, ShipmentKind};

    #[test]
    fn quotes_cover_every_carrier_sorted() {
        let world = World::new(20251212);
        let id = world.shipments()[0].id.clone();
        let quotes = world.retender_quotes(&id);
        assert_eq!(quotes.len(), world.baseline().carriers.len());
        assert!(quotes
            .windows(2)
            .all(|w| w[0].expected_total <= w[1].expected_total));
    }

    #[test]
    fn expected_total_is_freight_plus_rounded_penalty() {
        let mut world = World::new(20251212);
        let shipment = world
            .shipments
            .iter_mut()
            .find(|s| s.kind == ShipmentKind::Transfer)
            .expect("transfer shipment");
        shipment.miles = Some(1_000);
        shipment.penalty = 7_000;
        let id = shipment.id.clone();

        let omni = CarrierId::from("CAR-OMNI");
        let quote = world
            .retender_quotes(&id)
            .into_iter()
            .find(|q| q.carrier == omni)
            .expect("omni quote");
        assert_eq!(quote.freight, 2_450);
        assert_eq!(
            quote.expected_total,
            2_450 + (quote.late_prob * 7_000.0).round() as i64
        );
    }

    #[test]
    fn disruption_raises_late_probability_for_that_carrier() {
        let mut world = World::new(20251212);
        let id = world.shipments()[0].id.clone();
        let before = world.retender_quotes(&id);
        world.toggle_scenario(ScenarioFlag::CarrierDisruption);
        let disrupted = world.scenario().pins.disrupted_carrier.clone().expect("pin");
        let after = world.retender_quotes(&id);

        let lp = |quotes: &[RetenderQuote]| {
            quotes
                .iter()
                .find(|q| q.carrier == disrupted)
                .map(|q| q.late_prob)
                .expect("quote")
        };
        assert!(lp(&after) > lp(&before) || lp(&before) == crate::risk::LATE_PROB_MAX);
    }

    #[test]
    fn unknown_shipment_has_no_quotes() {
        let world = World::new(20251212);
        assert!(world
            .retender_quotes(&ShipmentId::from("SHP-NOPE"))
            .is_empty());
    }
}
