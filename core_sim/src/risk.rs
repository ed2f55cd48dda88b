//! Late-delivery and DC throughput risk.
//!
//! Both scores are fixed linear blends pushed through a sigmoid and clamped.
//! The weights below are load-bearing for reproducibility and must not drift.

use serde::Serialize;
use sim_schema::{CarrierId, CostIndexSeries, ScenarioState, Shipment};

use crate::baseline::Baseline;
use crate::numeric::sigmoid;
use crate::scenario::{active_outage_dc, ScenarioMultipliers};

pub const LATE_PROB_MIN: f64 = 0.03;
pub const LATE_PROB_MAX: f64 = 0.92;
pub const ON_TIME_MIN: f64 = 0.65;
pub const ON_TIME_MAX: f64 = 0.98;
pub const FUEL_VOLATILITY_MAX: f64 = 0.25;
pub const UTILIZATION_MAX: f64 = 1.6;
pub const DC_RISK_MAX: f64 = 0.99;
/// Utilization where throughput risk crosses 50%.
pub const CHOKE_KNEE: f64 = 0.86;

const W_DISTANCE: f64 = 1.15;
const W_CARRIER: f64 = 2.00;
const W_FUEL: f64 = 2.25;
const W_OUTAGE: f64 = 1.25;
const W_FRICTION: f64 = 1.55;
const DISTANCE_PIVOT_K_MILES: f64 = 0.7;
const CHOKE_STEEPNESS: f64 = 9.0;
const INBOUND_FLOW_WEIGHT: f64 = 0.6;
const OUTBOUND_FLOW_WEIGHT: f64 = 0.4;

/// Relative change between the last two cost-index points.
pub fn fuel_drift(series: &CostIndexSeries) -> f64 {
    match series.points() {
        [.., earlier, latest] if earlier.index != 0.0 => {
            (latest.index - earlier.index) / earlier.index
        }
        _ => 0.0,
    }
}

pub fn fuel_volatility(drift: f64) -> f64 {
    (drift.abs() * 12.0).clamp(0.0, FUEL_VOLATILITY_MAX)
}

/// Carrier on-time after the scenario delta, clamped to a plausible band.
pub fn adjusted_on_time(on_time: f64, delta: f64) -> f64 {
    (on_time + delta).clamp(ON_TIME_MIN, ON_TIME_MAX)
}

/// Raw signals behind a late probability.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateRiskInputs {
    pub miles: f64,
    pub on_time: f64,
    pub fuel_volatility: f64,
    pub touches_outage: bool,
    pub planning_friction: f64,
}

impl LateRiskInputs {
    pub fn score(&self) -> f64 {
        W_DISTANCE * (self.miles / 1000.0 - DISTANCE_PIVOT_K_MILES)
            + W_CARRIER * (1.0 - self.on_time)
            + W_FUEL * self.fuel_volatility
            + W_OUTAGE * if self.touches_outage { 1.0 } else { 0.0 }
            + W_FRICTION * self.planning_friction
    }

    pub fn late_probability(&self) -> f64 {
        sigmoid(self.score()).clamp(LATE_PROB_MIN, LATE_PROB_MAX)
    }
}

/// Everything the late-risk model reads from the current state.
#[derive(Debug, Clone, Copy)]
pub struct RiskContext<'a> {
    pub baseline: &'a Baseline,
    pub scenario: &'a ScenarioState,
    pub multipliers: &'a ScenarioMultipliers,
    pub fuel_volatility: f64,
}

impl<'a> RiskContext<'a> {
    pub fn new(
        baseline: &'a Baseline,
        scenario: &'a ScenarioState,
        multipliers: &'a ScenarioMultipliers,
        cost_index: &CostIndexSeries,
    ) -> Self {
        Self {
            baseline,
            scenario,
            multipliers,
            fuel_volatility: fuel_volatility(fuel_drift(cost_index)),
        }
    }

    pub fn carrier_on_time(&self, carrier: &CarrierId) -> f64 {
        let (on_time, _) = self.baseline.carrier_profile(carrier);
        adjusted_on_time(on_time, self.multipliers.on_time_delta(carrier))
    }

    pub fn inputs(&self, shipment: &Shipment) -> LateRiskInputs {
        self.inputs_with_carrier(shipment, &shipment.carrier)
    }

    /// Same shipment, hypothetically tendered to `carrier`.
    pub fn inputs_with_carrier(&self, shipment: &Shipment, carrier: &CarrierId) -> LateRiskInputs {
        LateRiskInputs {
            miles: self.baseline.shipment_miles(shipment),
            on_time: self.carrier_on_time(carrier),
            fuel_volatility: self.fuel_volatility,
            touches_outage: active_outage_dc(self.scenario)
                .is_some_and(|dc| shipment.touches(dc)),
            planning_friction: self.multipliers.planning_friction,
        }
    }

    pub fn late_probability(&self, shipment: &Shipment) -> f64 {
        self.inputs(shipment).late_probability()
    }
}

/// In-flight volume touching a DC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DcFlow {
    pub inbound: u64,
    pub outbound: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DcUtilization {
    pub inbound: u64,
    pub outbound: u64,
    pub effective_capacity: u32,
    pub utilization: f64,
    pub risk: f64,
}

pub fn effective_capacity(nominal: u32, multiplier: f64) -> u32 {
    (nominal as f64 * multiplier).round().max(0.0) as u32
}

pub fn dc_throughput_risk(flow: DcFlow, effective_capacity: u32) -> DcUtilization {
    let weighted =
        flow.inbound as f64 * INBOUND_FLOW_WEIGHT + flow.outbound as f64 * OUTBOUND_FLOW_WEIGHT;
    let utilization =
        (weighted / f64::from(effective_capacity.max(1))).clamp(0.0, UTILIZATION_MAX);
    let risk = sigmoid(CHOKE_STEEPNESS * (utilization - CHOKE_KNEE)).clamp(0.0, DC_RISK_MAX);
    DcUtilization {
        inbound: flow.inbound,
        outbound: flow.outbound,
        effective_capacity,
        utilization,
        risk,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_schema::CostIndexPoint;

    fn inputs(miles: f64, on_time: f64, fuel: f64, outage: bool, friction: f64) -> LateRiskInputs {
        LateRiskInputs {
            miles,
            on_time,
            fuel_volatility: fuel,
            touches_outage: outage,
            planning_friction: friction,
        }
    }

    #[test]
    fn late_probability_saturates_at_ceiling() {
        let worst = inputs(5_000.0, ON_TIME_MIN, FUEL_VOLATILITY_MAX, true, 0.18);
        assert_eq!(worst.late_probability(), LATE_PROB_MAX);

        // Zero miles on the best carrier still scores around 32%.
        let best = inputs(0.0, ON_TIME_MAX, 0.0, false, 0.0);
        assert!((best.late_probability() - sigmoid(-0.765)).abs() < 1e-12);
    }

    #[test]
    fn late_probability_matches_linear_blend() {
        let case = inputs(1_000.0, 0.90, 0.06, false, 0.0);
        let expected_score = 1.15 * 0.3 + 2.0 * 0.1 + 2.25 * 0.06;
        assert!((case.score() - expected_score).abs() < 1e-12);
        assert!((case.late_probability() - sigmoid(expected_score)).abs() < 1e-12);
    }

    #[test]
    fn late_probability_stays_in_band_over_a_grid() {
        for miles in [0.0, 250.0, 900.0, 2_500.0, 10_000.0] {
            for on_time in [0.5, 0.65, 0.8, 0.98, 1.0] {
                for fuel in [0.0, 0.1, 0.25] {
                    for outage in [false, true] {
                        let p = inputs(miles, on_time, fuel, outage, 0.18).late_probability();
                        assert!((LATE_PROB_MIN..=LATE_PROB_MAX).contains(&p));
                    }
                }
            }
        }
    }

    #[test]
    fn fuel_drift_uses_last_two_points() {
        let series = CostIndexSeries(vec![
            CostIndexPoint { day: 0, index: 1.0 },
            CostIndexPoint { day: 1, index: 1.0 },
            CostIndexPoint { day: 2, index: 1.02 },
        ]);
        assert!((fuel_drift(&series) - 0.02).abs() < 1e-12);
        assert!((fuel_volatility(-0.02) - 0.24).abs() < 1e-12);
        assert_eq!(fuel_volatility(0.5), FUEL_VOLATILITY_MAX);
        assert_eq!(fuel_drift(&CostIndexSeries::default()), 0.0);
    }

    #[test]
    fn throughput_risk_ramps_around_the_knee() {
        let idle = dc_throughput_risk(DcFlow::default(), 1_000);
        assert_eq!(idle.utilization, 0.0);
        assert!(idle.risk < 0.01);

        let at_knee = dc_throughput_risk(DcFlow { inbound: 1_000, outbound: 650 }, 1_000);
        assert!((at_knee.utilization - 0.86).abs() < 1e-12);
        assert!((at_knee.risk - 0.5).abs() < 1e-9);

        let flooded = dc_throughput_risk(DcFlow { inbound: 100_000, outbound: 0 }, 0);
        assert_eq!(flooded.utilization, UTILIZATION_MAX);
        assert!(flooded.risk <= DC_RISK_MAX);
    }

    #[test]
    fn effective_capacity_rounds() {
        assert_eq!(effective_capacity(1_000, 0.42), 420);
        assert_eq!(effective_capacity(1_250, 1.18), 1_475);
    }
}
