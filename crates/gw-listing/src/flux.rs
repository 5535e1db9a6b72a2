//! Flat table of boundary-condition fluxes extracted from a listing file.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use gw_core::{BcType, ReachId, Snapshot, StressPeriod};
use serde::{Deserialize, Serialize};

use crate::error::{ListingError, ListingResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FluxKey {
    pub bc_type: BcType,
    pub reach_id: ReachId,
    pub snapshot: Snapshot,
}

impl FluxKey {
    pub fn new(bc_type: BcType, reach_id: ReachId, snapshot: Snapshot) -> Self {
        Self {
            bc_type,
            reach_id,
            snapshot,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluxRecord {
    #[serde(flatten)]
    pub key: FluxKey,
    /// Signed volumetric rate in the listing file's units.
    pub flux: f64,
}

/// Immutable once the parser hands it out.
#[derive(Clone, Debug, Default)]
pub struct FluxTable {
    fluxes: BTreeMap<FluxKey, f64>,
    counts: BTreeMap<(BcType, Snapshot), usize>,
    master_snapshots: BTreeMap<BcType, Snapshot>,
    master: BTreeMap<BcType, Vec<ReachId>>,
    stress_period_markers: usize,
    max_stress_period: Option<StressPeriod>,
}

impl FluxTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the snapshot whose records make up the master reach list of
    /// `bc_type`. Only the first call per bc type has an effect.
    pub(crate) fn begin_master(&mut self, bc_type: BcType, snapshot: Snapshot) {
        if let Entry::Vacant(slot) = self.master_snapshots.entry(bc_type) {
            tracing::debug!(bc_type = %bc_type, snapshot = %snapshot, "Master reach list follows this snapshot");
            slot.insert(snapshot);
        }
    }

    pub(crate) fn note_stress_period_marker(&mut self) {
        self.stress_period_markers += 1;
    }

    pub(crate) fn note_stress_period(&mut self, stress_period: StressPeriod) {
        self.max_stress_period = self.max_stress_period.max(Some(stress_period));
    }

    pub fn insert(&mut self, record: FluxRecord) -> ListingResult<()> {
        let key = record.key;
        if self.fluxes.contains_key(&key) {
            return Err(ListingError::DuplicateFluxRecord {
                bc_type: key.bc_type,
                reach_id: key.reach_id,
                snapshot: key.snapshot,
            });
        }
        self.fluxes.insert(key, record.flux);
        *self.counts.entry((key.bc_type, key.snapshot)).or_default() += 1;
        self.note_stress_period(key.snapshot.stress_period);
        if self.master_snapshots.get(&key.bc_type) == Some(&key.snapshot) {
            self.master.entry(key.bc_type).or_default().push(key.reach_id);
        }
        Ok(())
    }

    pub fn get(&self, bc_type: BcType, reach_id: ReachId, snapshot: Snapshot) -> Option<f64> {
        self.fluxes
            .get(&FluxKey::new(bc_type, reach_id, snapshot))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.fluxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fluxes.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = FluxRecord> + '_ {
        self.fluxes
            .iter()
            .map(|(key, flux)| FluxRecord { key: *key, flux: *flux })
    }

    /// Number of records parsed for a `(bc_type, snapshot)` block.
    pub fn count(&self, bc_type: BcType, snapshot: Snapshot) -> usize {
        self.counts.get(&(bc_type, snapshot)).copied().unwrap_or(0)
    }

    /// Records of a bc type across every time step of a stress period.
    pub fn count_in_period(&self, bc_type: BcType, stress_period: StressPeriod) -> usize {
        self.counts
            .iter()
            .filter(|((bc, snap), _)| *bc == bc_type && snap.stress_period == stress_period)
            .map(|(_, n)| *n)
            .sum()
    }

    pub fn total(&self, bc_type: BcType, snapshot: Snapshot) -> f64 {
        self.fluxes
            .iter()
            .filter(|(key, _)| key.bc_type == bc_type && key.snapshot == snapshot)
            .map(|(_, flux)| *flux)
            .sum()
    }

    pub fn snapshots(&self) -> BTreeSet<Snapshot> {
        self.counts.keys().map(|(_, snap)| *snap).collect()
    }

    /// Snapshot of the first `bc_type` block in the listing.
    pub fn master_snapshot(&self, bc_type: BcType) -> Option<Snapshot> {
        self.master_snapshots.get(&bc_type).copied()
    }

    /// Stable ids in output order for the master snapshot of `bc_type`.
    pub fn master_reach_ids(&self, bc_type: BcType) -> &[ReachId] {
        self.master.get(&bc_type).map(Vec::as_slice).unwrap_or_default()
    }

    /// Larger of the stress-period markers seen and the highest stress period
    /// any block reported.
    pub fn stress_period_count(&self) -> u32 {
        let markers = u32::try_from(self.stress_period_markers).unwrap_or(u32::MAX);
        let highest = self.max_stress_period.map(StressPeriod::get).unwrap_or(0);
        markers.max(highest)
    }

    pub fn to_dump(&self) -> FluxDump {
        FluxDump {
            stress_period_count: self.stress_period_count(),
            master_snapshots: self.master_snapshots.clone(),
            master_reach_ids: self.master.clone(),
            records: self.records().collect(),
        }
    }

    /// Comma-delimited table for one bc type: a row per stable id and a
    /// `SP<n>_TS<m>` column per snapshot.
    pub fn to_csv(&self, bc_type: BcType) -> String {
        let mut snapshots: Vec<Snapshot> = self
            .counts
            .keys()
            .filter(|(bc, _)| *bc == bc_type)
            .map(|(_, snap)| *snap)
            .collect();
        snapshots.sort_by_key(|s| (s.stress_period, s.time_step));

        let mut rows: BTreeMap<ReachId, BTreeMap<Snapshot, f64>> = BTreeMap::new();
        for (key, flux) in self.fluxes.iter().filter(|(k, _)| k.bc_type == bc_type) {
            rows.entry(key.reach_id)
                .or_default()
                .insert(key.snapshot, *flux);
        }

        let mut out = String::from("bc_reach_id");
        for s in &snapshots {
            let _ = write!(out, ",SP{}_TS{}", s.stress_period, s.time_step);
        }
        out.push('\n');
        for (id, values) in &rows {
            let _ = write!(out, "{id}");
            for s in &snapshots {
                out.push(',');
                if let Some(v) = values.get(s) {
                    let _ = write!(out, "{v}");
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Serializable snapshot of a parsed flux table, written next to the reports
/// for debugging.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FluxDump {
    pub stress_period_count: u32,
    pub master_snapshots: BTreeMap<BcType, Snapshot>,
    pub master_reach_ids: BTreeMap<BcType, Vec<ReachId>>,
    pub records: Vec<FluxRecord>,
}
