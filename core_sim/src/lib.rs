//! Core engine for the supply-chain autopilot.
//!
//! A [`World`] owns one session: an immutable [`Baseline`] generated from a
//! seed plus the mutable inventory, shipments, scenario state and audit log.
//! Every query (KPIs, exceptions, proposals, quotes) is recomputed from that
//! state on demand, so results never go stale between ticks.

pub mod actions;
pub mod baseline;
pub mod clock;
pub mod config;
pub mod exceptions;
pub mod hashing;
pub mod numeric;
pub mod playbook;
pub mod rebalance;
pub mod retender;
pub mod risk;
pub mod rng;
pub mod scenario;
pub mod snapshot;
pub mod views;
pub mod world;

pub use actions::{guardrail, ActionOutcome, ActionParseError, ActionRequest, GUARDRAIL_REASON};
pub use baseline::{haversine_miles, Baseline, BaselineMeta};
pub use clock::TickReport;
pub use config::{
    load_simulation_config_from_env, SimulationConfig, SimulationConfigError,
    BUILTIN_SIMULATION_CONFIG,
};
pub use exceptions::{derive_kpis_and_exceptions, DerivedState};
pub use playbook::{recommended_actions, Playbook, Recommendation, PLAYBOOKS};
pub use rebalance::{CoveragePosition, RebalanceProposal};
pub use retender::RetenderQuote;
pub use risk::{DcUtilization, LateRiskInputs, RiskContext};
pub use scenario::ScenarioMultipliers;
pub use snapshot::{SnapshotBody, SnapshotExportError, SnapshotHeader, WorldSnapshot};
pub use views::{AtRiskShipment, CarrierScore, CarrierStatus, ChokeRow, CostIndexDrift};
pub use world::{TimestampSource, World};
