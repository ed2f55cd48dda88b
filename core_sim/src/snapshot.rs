use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sim_schema::{
    AuditKind, AuditLog, CapacityRelief, CostIndexSeries, Exception, InventoryTable, Kpis,
    ScenarioPins, ScenarioToggles, Shipment,
};
use thiserror::Error;

use crate::hashing::fingerprint;
use crate::world::World;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub captured_at_ms: u64,
    pub day: u32,
    pub seed: u64,
    /// FNV-1a of the body, excluding this header.
    pub fingerprint: u64,
}

/// Mutable session state at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBody {
    pub scenario: ScenarioToggles,
    pub scenario_pinned: ScenarioPins,
    pub capacity_relief: CapacityRelief,
    pub kpis: Kpis,
    pub top_exceptions: Vec<Exception>,
    pub inventory: InventoryTable,
    pub shipments: Vec<Shipment>,
    pub cost_index: CostIndexSeries,
    pub audit_log: AuditLog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub header: SnapshotHeader,
    #[serde(flatten)]
    pub body: SnapshotBody,
}

impl WorldSnapshot {
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn file_name(&self) -> String {
        snapshot_file_name(self.header.day)
    }
}

pub fn snapshot_file_name(day: u32) -> String {
    format!("snapshot_day_{day}.json")
}

#[derive(Debug, Error)]
pub enum SnapshotExportError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write snapshot to {path:?}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl World {
    /// Captures the current state. Pure: nothing is logged or changed.
    pub fn snapshot(&self) -> WorldSnapshot {
        let derived = self.derive();
        let body = SnapshotBody {
            scenario: self.scenario.toggles,
            scenario_pinned: self.scenario.pins.clone(),
            capacity_relief: self.relief.clone(),
            kpis: derived.kpis,
            top_exceptions: derived.top(self.config.snapshot_top_exceptions).to_vec(),
            inventory: self.inventory.clone(),
            shipments: self.shipments.clone(),
            cost_index: self.cost_index.clone(),
            audit_log: self.audit_log.clone(),
        };
        let body_fingerprint = match serde_json::to_vec(&body) {
            Ok(bytes) => fingerprint(&bytes),
            Err(err) => {
                tracing::warn!(
                    target: "supply_autopilot::snapshot",
                    day = self.day,
                    error = %err,
                    "snapshot.fingerprint_failed"
                );
                0
            }
        };
        WorldSnapshot {
            header: SnapshotHeader {
                captured_at_ms: self.timestamps.now_ms(),
                day: self.day,
                seed: self.seed(),
                fingerprint: body_fingerprint,
            },
            body,
        }
    }

    /// Writes a snapshot into `dir` as `snapshot_day_<day>.json` and audits the
    /// export. The audit entry is not part of the written document.
    pub fn export_snapshot(&mut self, dir: &Path) -> Result<PathBuf, SnapshotExportError> {
        let snapshot = self.snapshot();
        let path = dir.join(snapshot.file_name());
        let json = snapshot.to_json_pretty()?;
        fs::write(&path, json).map_err(|source| SnapshotExportError::WriteFailed {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            target: "supply_autopilot::snapshot",
            path = %path.display(),
            day = self.day,
            "snapshot.exported"
        );
        let file_name = snapshot.file_name();
        self.record(
            AuditKind::SnapshotExported,
            format!("Exported {file_name}"),
            serde_json::json!({ "day": self.day, "fingerprint": snapshot.header.fingerprint }),
        );
        Ok(path)
    }

    /// Writes the immutable baseline bundle as pretty JSON.
    pub fn export_baseline(&self, path: &Path) -> Result<(), SnapshotExportError> {
        let json = self.baseline.to_json_pretty()?;
        fs::write(path, json).map_err(|source| SnapshotExportError::WriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            target: "supply_autopilot::snapshot",
            path = %path.display(),
            seed = self.seed(),
            "baseline.exported"
        );
        Ok(())
    }
}
