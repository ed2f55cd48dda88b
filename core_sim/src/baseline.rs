//! Seeded generation of the immutable baseline network.

use serde::{Deserialize, Serialize};
use sim_schema::{
    Carrier, CarrierId, CostIndexPoint, CostIndexSeries, DemandClass, DemandTable, InventoryTable,
    Lane, LaneId, Node, NodeId, NodeKind, Shipment, ShipmentId, ShipmentKind, ShipmentStatus, Sku,
    SkuId,
};

use crate::hashing::fingerprint;
use crate::numeric::{round_to, round_usd};
use crate::rng::RandomStream;

pub const EARTH_RADIUS_MILES: f64 = 3958.8;
/// Freight $/mile before the carrier cost index is applied.
pub const FREIGHT_RATE_PER_MILE: f64 = 2.45;
pub const INBOUND_PENALTY_USD: i64 = 8_500;
pub const TRANSFER_PENALTY_USD: i64 = 6_000;
pub const COST_INDEX_MIN: f64 = 0.85;
pub const COST_INDEX_MAX: f64 = 1.25;

const BASELINE_INBOUND_SHIPMENTS: usize = 34;
const BASELINE_TRANSFER_SHIPMENTS: usize = 10;
const FIRST_SHIPMENT_NUMBER: u32 = 1000;
const COST_INDEX_HISTORY_DAYS: i64 = 14;

const SKU_CATALOG: [(&str, &str, f64, f64, DemandClass); 6] = [
    ("SKU-CLX-001", "Disinfecting Wipes 35ct", 6.49, 2.10, DemandClass::Fast),
    ("SKU-CLX-002", "Bleach 121oz", 4.99, 1.60, DemandClass::Fast),
    ("SKU-CLX-003", "Trash Bags 13gal 80ct", 10.99, 3.10, DemandClass::Med),
    ("SKU-CLX-004", "Pine-Sol 60oz", 5.79, 1.90, DemandClass::Med),
    ("SKU-CLX-005", "Glad Wrap 200sqft", 4.59, 1.35, DemandClass::Slow),
    ("SKU-CLX-006", "Kingsford Charcoal 16lb", 12.99, 3.60, DemandClass::Seasonal),
];

const PLANT_CATALOG: [(&str, &str, f64, f64); 4] = [
    ("PL-ATL", "Plant - Atlanta, GA", 33.7490, -84.3880),
    ("PL-CHI", "Plant - Chicago, IL", 41.8781, -87.6298),
    ("PL-DAL", "Plant - Dallas, TX", 32.7767, -96.7970),
    ("PL-LAX", "Plant - Los Angeles, CA", 34.0522, -118.2437),
];

const DC_CATALOG: [(&str, &str, f64, f64, u32); 6] = [
    ("DC-NJ", "DC - New Jersey", 40.0583, -74.4057, 1250),
    ("DC-PA", "DC - Central PA", 40.2732, -76.8867, 1050),
    ("DC-GA", "DC - Atlanta", 33.7490, -84.3880, 980),
    ("DC-TX", "DC - Dallas", 32.7767, -96.7970, 1120),
    ("DC-IL", "DC - Joliet", 41.5250, -88.0817, 1000),
    ("DC-CA", "DC - Inland Empire", 34.1064, -117.5931, 1320),
];

const CARRIER_CATALOG: [(&str, &str, f64, f64, f64); 4] = [
    ("CAR-OMNI", "OmniTrans", 0.91, 1.00, 1.00),
    ("CAR-NOVA", "Nova Freight", 0.88, 0.96, 0.92),
    ("CAR-ARROW", "Arrow Logistics", 0.93, 1.06, 0.98),
    ("CAR-HARBOR", "HarborLine", 0.86, 0.93, 0.88),
];

/// Fallbacks used when a derived computation references an unknown entity.
pub const FALLBACK_CARRIER_ON_TIME: f64 = 0.88;
pub const FALLBACK_CARRIER_COST_INDEX: f64 = 1.0;
pub const FALLBACK_SKU_MARGIN: f64 = 1.0;
pub const FALLBACK_LANE_MILES: u32 = 1000;
pub const FALLBACK_LANE_TRANSIT_DAYS: u32 = 3;

pub fn haversine_miles(a: &Node, b: &Node) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_MILES * h.sqrt().asin()
}

/// Plant lanes: roughly 520 miles per day plus handling.
pub fn lane_transit_days(miles: f64) -> u32 {
    (miles / 520.0 + 1.2).round().clamp(1.0, 7.0) as u32
}

/// DC to DC moves use a shorter handling allowance and a 6 day ceiling.
pub fn transfer_transit_days(miles: f64) -> u32 {
    (miles / 520.0 + 1.1).round().clamp(1.0, 6.0) as u32
}

pub fn freight_cost(miles: f64, cost_index: f64) -> f64 {
    miles * FREIGHT_RATE_PER_MILE * cost_index
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineMeta {
    pub seed: u64,
}

/// Immutable world description produced once per seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub meta: BaselineMeta,
    pub skus: Vec<Sku>,
    pub plants: Vec<Node>,
    pub dcs: Vec<Node>,
    pub carriers: Vec<Carrier>,
    pub lanes: Vec<Lane>,
    pub inventory: InventoryTable,
    pub demand: DemandTable,
    pub cost_index: CostIndexSeries,
    pub shipments: Vec<Shipment>,
}

impl Baseline {
    pub fn generate(seed: u64) -> Self {
        BaselineGenerator::new(seed).generate()
    }

    pub fn seed(&self) -> u64 {
        self.meta.seed
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.plants.iter().chain(self.dcs.iter())
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes().find(|node| &node.id == id)
    }

    pub fn dc(&self, id: &NodeId) -> Option<&Node> {
        self.dcs.iter().find(|dc| &dc.id == id)
    }

    pub fn sku(&self, id: &SkuId) -> Option<&Sku> {
        self.skus.iter().find(|sku| &sku.id == id)
    }

    pub fn carrier(&self, id: &CarrierId) -> Option<&Carrier> {
        self.carriers.iter().find(|carrier| &carrier.id == id)
    }

    pub fn lane(&self, id: &LaneId) -> Option<&Lane> {
        self.lanes.iter().find(|lane| &lane.id == id)
    }

    pub fn lane_between(&self, plant: &NodeId, dc: &NodeId) -> Option<&Lane> {
        self.lanes
            .iter()
            .find(|lane| &lane.from == plant && &lane.to == dc)
    }

    /// Carrier on-time and cost index, or a conservative default for unknown ids.
    pub fn carrier_profile(&self, id: &CarrierId) -> (f64, f64) {
        match self.carrier(id) {
            Some(carrier) => (carrier.on_time, carrier.cost_index),
            None => {
                tracing::warn!(
                    target: "supply_autopilot::world",
                    carrier = %id,
                    "lookup.fallback=carrier"
                );
                (FALLBACK_CARRIER_ON_TIME, FALLBACK_CARRIER_COST_INDEX)
            }
        }
    }

    pub fn unit_margin(&self, id: &SkuId) -> f64 {
        match self.sku(id) {
            Some(sku) => sku.unit_margin,
            None => {
                tracing::warn!(
                    target: "supply_autopilot::world",
                    sku = %id,
                    "lookup.fallback=sku"
                );
                FALLBACK_SKU_MARGIN
            }
        }
    }

    /// Lane distance for inbound shipments, recorded distance for transfers.
    pub fn shipment_miles(&self, shipment: &Shipment) -> f64 {
        let resolved = match shipment.kind {
            ShipmentKind::Inbound => shipment
                .lane_id
                .as_ref()
                .and_then(|id| self.lane(id))
                .map(|lane| lane.miles)
                .or(shipment.miles),
            ShipmentKind::Transfer => shipment.miles,
        };
        match resolved {
            Some(miles) => miles as f64,
            None => {
                tracing::warn!(
                    target: "supply_autopilot::world",
                    shipment = %shipment.id,
                    "lookup.fallback=lane"
                );
                FALLBACK_LANE_MILES as f64
            }
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Stable FNV-1a fingerprint of the serialized bundle.
    pub fn fingerprint(&self) -> u64 {
        match serde_json::to_vec(self) {
            Ok(bytes) => fingerprint(&bytes),
            Err(err) => {
                tracing::warn!(
                    target: "supply_autopilot::world",
                    seed = self.meta.seed,
                    error = %err,
                    "baseline.fingerprint_failed"
                );
                0
            }
        }
    }
}

/// Builds a [`Baseline`] from a seed. Generation is total for every seed.
#[derive(Debug)]
pub struct BaselineGenerator {
    seed: u64,
    rand: RandomStream,
}

impl BaselineGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rand: RandomStream::new(seed),
        }
    }

    pub fn generate(mut self) -> Baseline {
        let skus = sku_catalog();
        let plants = plant_catalog();
        let dcs = dc_catalog();
        let carriers = carrier_catalog();

        let lanes = self.lanes(&plants, &dcs);
        let inventory = self.inventory(&dcs, &skus);
        let demand = self.demand(&dcs, &skus);
        let cost_index = self.cost_index();
        let mut shipments = self.inbound_shipments(&plants, &dcs, &skus, &carriers, &lanes);
        let transfers = self.transfer_shipments(&dcs, &skus, &carriers, shipments.len());
        shipments.extend(transfers);

        for shipment in &mut shipments {
            let miles = match shipment.lane_id.as_ref() {
                Some(lane_id) => lanes
                    .iter()
                    .find(|lane| &lane.id == lane_id)
                    .map(|lane| lane.miles)
                    .unwrap_or(FALLBACK_LANE_MILES),
                None => shipment.miles.unwrap_or(FALLBACK_LANE_MILES),
            };
            let cost_index = carriers
                .iter()
                .find(|carrier| carrier.id == shipment.carrier)
                .map(|carrier| carrier.cost_index)
                .unwrap_or(FALLBACK_CARRIER_COST_INDEX);
            shipment.cost = round_usd(freight_cost(miles as f64, cost_index));
        }

        tracing::debug!(
            target: "supply_autopilot::world",
            seed = self.seed,
            lanes = lanes.len(),
            shipments = shipments.len(),
            "baseline.generated"
        );

        Baseline {
            meta: BaselineMeta { seed: self.seed },
            skus,
            plants,
            dcs,
            carriers,
            lanes,
            inventory,
            demand,
            cost_index,
            shipments,
        }
    }

    fn lanes(&mut self, plants: &[Node], dcs: &[Node]) -> Vec<Lane> {
        let mut lanes = Vec::with_capacity(plants.len() * dcs.len());
        for plant in plants {
            for dc in dcs {
                let miles = haversine_miles(plant, dc);
                let rate = self.rand.span(2.10, 0.75);
                lanes.push(Lane {
                    id: LaneId(format!("LANE-{}-{}", plant.id, dc.id)),
                    from: plant.id.clone(),
                    to: dc.id.clone(),
                    miles: miles.round() as u32,
                    transit_days: lane_transit_days(miles),
                    rate_per_mile: round_to(rate, 2),
                });
            }
        }
        lanes
    }

    fn inventory(&mut self, dcs: &[Node], skus: &[Sku]) -> InventoryTable {
        let mut table = InventoryTable::default();
        for dc in dcs {
            let coastal = if matches!(dc.id.as_str(), "DC-CA" | "DC-NJ") {
                1.12
            } else {
                1.00
            };
            for sku in skus {
                let base = match sku.demand_class {
                    DemandClass::Fast => 2200.0 + (self.rand.next_f64() * 900.0).floor(),
                    DemandClass::Med => 1600.0 + (self.rand.next_f64() * 800.0).floor(),
                    DemandClass::Slow => 900.0 + (self.rand.next_f64() * 500.0).floor(),
                    DemandClass::Seasonal => 1300.0 + (self.rand.next_f64() * 1200.0).floor(),
                };
                let factor = self.rand.span(0.75, 0.6);
                let units = (base * coastal * factor).floor() as u32;
                table.insert(dc.id.clone(), sku.id.clone(), units);
            }
        }
        table
    }

    fn demand(&mut self, dcs: &[Node], skus: &[Sku]) -> DemandTable {
        let mut table = DemandTable::default();
        for dc in dcs {
            let west = if dc.id.as_str() == "DC-CA" { 1.14 } else { 1.00 };
            let east = if matches!(dc.id.as_str(), "DC-NJ" | "DC-PA") {
                1.10
            } else {
                1.00
            };
            for sku in skus {
                let base = match sku.demand_class {
                    DemandClass::Fast => self.rand.span(160.0, 60.0),
                    DemandClass::Med => self.rand.span(90.0, 40.0),
                    DemandClass::Slow => self.rand.span(45.0, 20.0),
                    DemandClass::Seasonal => self.rand.span(60.0, 70.0),
                };
                table.insert(dc.id.clone(), sku.id.clone(), round_to(base * west * east, 1));
            }
        }
        table
    }

    fn cost_index(&mut self) -> CostIndexSeries {
        let mut value = 1.00 + self.rand.span(-0.04, 0.08);
        let mut points = Vec::with_capacity(COST_INDEX_HISTORY_DAYS as usize);
        for offset in (0..COST_INDEX_HISTORY_DAYS).rev() {
            value += self.rand.span(-0.01, 0.02);
            points.push(CostIndexPoint {
                day: -offset,
                index: round_to(value.clamp(COST_INDEX_MIN, COST_INDEX_MAX), 3),
            });
        }
        CostIndexSeries(points)
    }

    fn inbound_shipments(
        &mut self,
        plants: &[Node],
        dcs: &[Node],
        skus: &[Sku],
        carriers: &[Carrier],
        lanes: &[Lane],
    ) -> Vec<Shipment> {
        let mut shipments = Vec::with_capacity(BASELINE_INBOUND_SHIPMENTS);
        for offset in 0..BASELINE_INBOUND_SHIPMENTS {
            let plant = self.rand.pick(plants).id.clone();
            let dc = self.rand.pick(dcs).id.clone();
            let (lane_id, transit_days) = lanes
                .iter()
                .find(|lane| lane.from == plant && lane.to == dc)
                .map(|lane| (Some(lane.id.clone()), lane.transit_days))
                .unwrap_or((None, FALLBACK_LANE_TRANSIT_DAYS));
            let sku = self.rand.pick(skus).id.clone();
            let qty = 600 + (self.rand.next_f64() * 900.0).floor() as u32;
            let carrier = self.rand.pick(carriers).id.clone();
            let progress = self.rand.next_f64();
            let eta_days = (transit_days as f64 * (1.0 - progress))
                .ceil()
                .clamp(0.0, transit_days as f64) as u32;
            shipments.push(Shipment {
                id: ShipmentId(format!("SHP-{}", FIRST_SHIPMENT_NUMBER + offset as u32)),
                kind: ShipmentKind::Inbound,
                from: plant,
                to: dc,
                lane_id,
                miles: None,
                sku,
                qty,
                carrier,
                created_day: 0,
                eta_days,
                base_transit_days: transit_days,
                penalty: INBOUND_PENALTY_USD,
                status: if eta_days == 0 {
                    ShipmentStatus::Arriving
                } else {
                    ShipmentStatus::InTransit
                },
                cost: 0,
            });
        }
        shipments
    }

    fn transfer_shipments(
        &mut self,
        dcs: &[Node],
        skus: &[Sku],
        carriers: &[Carrier],
        numbered_so_far: usize,
    ) -> Vec<Shipment> {
        let dc_ids: Vec<NodeId> = dcs.iter().map(|dc| dc.id.clone()).collect();
        let mut shipments = Vec::with_capacity(BASELINE_TRANSFER_SHIPMENTS);
        for offset in 0..BASELINE_TRANSFER_SHIPMENTS {
            // Shuffling guarantees two distinct endpoints.
            let order = self.rand.shuffle(&dc_ids);
            let from = order[0].clone();
            let to = order[1].clone();
            let sku = self.rand.pick(skus).id.clone();
            let qty = 300 + (self.rand.next_f64() * 600.0).floor() as u32;
            let miles = 350 + (self.rand.next_f64() * 850.0).floor() as u32;
            let transit_days = transfer_transit_days(miles as f64);
            let carrier = self.rand.pick(carriers).id.clone();
            let progress = self.rand.span(0.3, 0.8);
            // Progress can overshoot 1.0; remaining ETA never exceeds the lane.
            let eta_days = (transit_days as f64 * progress)
                .ceil()
                .clamp(0.0, transit_days as f64) as u32;
            let number = FIRST_SHIPMENT_NUMBER + (numbered_so_far + offset) as u32;
            shipments.push(Shipment {
                id: ShipmentId(format!("SHP-{number}")),
                kind: ShipmentKind::Transfer,
                from,
                to,
                lane_id: None,
                miles: Some(miles),
                sku,
                qty,
                carrier,
                created_day: 0,
                eta_days,
                base_transit_days: transit_days,
                penalty: TRANSFER_PENALTY_USD,
                status: ShipmentStatus::InTransit,
                cost: 0,
            });
        }
        shipments
    }
}

fn sku_catalog() -> Vec<Sku> {
    SKU_CATALOG
        .iter()
        .map(|&(id, name, unit_price, unit_margin, demand_class)| Sku {
            id: SkuId::from(id),
            name: name.to_string(),
            unit_price,
            unit_margin,
            demand_class,
        })
        .collect()
}

fn plant_catalog() -> Vec<Node> {
    PLANT_CATALOG
        .iter()
        .map(|&(id, name, lat, lon)| Node {
            id: NodeId::from(id),
            name: name.to_string(),
            kind: NodeKind::Plant,
            lat,
            lon,
            capacity: None,
        })
        .collect()
}

fn dc_catalog() -> Vec<Node> {
    DC_CATALOG
        .iter()
        .map(|&(id, name, lat, lon, capacity)| Node {
            id: NodeId::from(id),
            name: name.to_string(),
            kind: NodeKind::Dc,
            lat,
            lon,
            capacity: Some(capacity),
        })
        .collect()
}

fn carrier_catalog() -> Vec<Carrier> {
    CARRIER_CATALOG
        .iter()
        .map(|&(id, name, on_time, cost_index, capacity_index)| Carrier {
            id: CarrierId::from(id),
            name: name.to_string(),
            on_time,
            cost_index,
            capacity_index,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: u64 = 20251212;

    #[test]
    fn same_seed_generates_identical_bundles() {
        let a = Baseline::generate(SEED);
        let b = Baseline::generate(SEED);
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn remaining_eta_never_exceeds_lane_transit() {
        for seed in 0..300u64 {
            let baseline = Baseline::generate(seed);
            assert_ne!(baseline.fingerprint(), 0);
            for shipment in &baseline.shipments {
                assert!(
                    shipment.eta_days <= shipment.base_transit_days,
                    "seed {seed}: {} eta {} over transit {}",
                    shipment.id,
                    shipment.eta_days,
                    shipment.base_transit_days
                );
                assert_eq!(
                    shipment.status == ShipmentStatus::Arriving,
                    shipment.eta_days == 0
                );
            }
        }
    }

    #[test]
    fn different_seeds_diverge() {
        assert_ne!(
            Baseline::generate(SEED).fingerprint(),
            Baseline::generate(SEED + 1).fingerprint()
        );
    }

    #[test]
    fn one_lane_per_plant_dc_pair() {
        let baseline = Baseline::generate(SEED);
        assert_eq!(baseline.lanes.len(), baseline.plants.len() * baseline.dcs.len());
        for lane in &baseline.lanes {
            assert!((1..=7).contains(&lane.transit_days));
            assert!((2.10..=2.85).contains(&lane.rate_per_mile));
        }
    }

    #[test]
    fn haversine_matches_known_distance() {
        let baseline = Baseline::generate(SEED);
        let atl = baseline.node(&NodeId::from("PL-ATL")).expect("plant");
        let dal = baseline.node(&NodeId::from("PL-DAL")).expect("plant");
        let miles = haversine_miles(atl, dal);
        assert!((miles - 720.0).abs() < 10.0, "ATL-DAL was {miles}");
        assert_eq!(haversine_miles(atl, atl), 0.0);
    }

    #[test]
    fn inventory_and_demand_respect_class_ranges() {
        let baseline = Baseline::generate(SEED);
        for dc in &baseline.dcs {
            for sku in &baseline.skus {
                let on_hand = baseline.inventory.on_hand(&dc.id, &sku.id);
                assert!(on_hand > 0);
                let demand = baseline.demand.per_day(&dc.id, &sku.id);
                let (low, high) = match sku.demand_class {
                    DemandClass::Fast => (160.0, 220.0 * 1.14 * 1.10),
                    DemandClass::Med => (90.0, 130.0 * 1.14 * 1.10),
                    DemandClass::Slow => (45.0, 65.0 * 1.14 * 1.10),
                    DemandClass::Seasonal => (60.0, 130.0 * 1.14 * 1.10),
                };
                assert!((low..=high).contains(&demand), "{} {} {}", dc.id, sku.id, demand);
            }
        }
    }

    #[test]
    fn cost_index_history_is_bounded_and_ascending() {
        let baseline = Baseline::generate(SEED);
        let points = baseline.cost_index.points();
        assert_eq!(points.len(), 14);
        assert_eq!(points.first().map(|p| p.day), Some(-13));
        assert_eq!(points.last().map(|p| p.day), Some(0));
        assert!(points.windows(2).all(|w| w[0].day < w[1].day));
        assert!(points
            .iter()
            .all(|p| (COST_INDEX_MIN..=COST_INDEX_MAX).contains(&p.index)));
    }

    #[test]
    fn baseline_shipments_are_priced_and_bounded() {
        let baseline = Baseline::generate(SEED);
        assert_eq!(baseline.shipments.len(), 44);
        for shipment in &baseline.shipments {
            match shipment.kind {
                ShipmentKind::Inbound => {
                    assert_eq!(shipment.penalty, INBOUND_PENALTY_USD);
                    assert!(shipment.lane_id.is_some());
                }
                ShipmentKind::Transfer => {
                    assert_eq!(shipment.penalty, TRANSFER_PENALTY_USD);
                    assert_ne!(shipment.from, shipment.to);
                }
            }
            let (_, cost_index) = baseline.carrier_profile(&shipment.carrier);
            let expected = round_usd(freight_cost(baseline.shipment_miles(shipment), cost_index));
            assert_eq!(shipment.cost, expected);
        }
    }

    #[test]
    fn unknown_carrier_falls_back_to_conservative_profile() {
        let baseline = Baseline::generate(SEED);
        assert_eq!(
            baseline.carrier_profile(&CarrierId::from("CAR-GHOST")),
            (FALLBACK_CARRIER_ON_TIME, FALLBACK_CARRIER_COST_INDEX)
        );
        assert_eq!(baseline.unit_margin(&SkuId::from("SKU-GHOST")), FALLBACK_SKU_MARGIN);
    }
}
