//! Reach lookup: the indirection from listing-file output order to stable
//! boundary-condition reach ids, plus the 2D to 3D membership of layered
//! packages.
//!
//! The persisted form is JSON with exactly two top-level keys:
//!
//! ```json
//! {
//!   "reach_ids": { "riv:1": [101, 102, 103] },
//!   "reach_ids_from_2d_ids": { "riv:1": { "9": [101, 103] } }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use gw_core::{BcType, Reach2dId, ReachId, StressPeriod};
use serde::{Deserialize, Serialize};

use crate::error::{ListingError, ListingResult};

type PeriodKey = (BcType, StressPeriod);

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LookupFile {
    reach_ids: BTreeMap<String, Vec<ReachId>>,
    reach_ids_from_2d_ids: BTreeMap<String, BTreeMap<Reach2dId, Vec<ReachId>>>,
}

/// Read-only for the lifetime of a pipeline run once loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReachLookup {
    sequences: BTreeMap<PeriodKey, Vec<ReachId>>,
    members: BTreeMap<PeriodKey, BTreeMap<Reach2dId, Vec<ReachId>>>,
}

impl ReachLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> ListingResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ListingError::io(path, e))?;
        let lookup = Self::parse(&text, path)?;
        tracing::info!(
            path = %path.display(),
            sequences = lookup.sequences.len(),
            layered = lookup.members.len(),
            "Loaded reach lookup"
        );
        Ok(lookup)
    }

    pub fn from_json_str(text: &str) -> ListingResult<Self> {
        Self::parse(text, Path::new("<string>"))
    }

    fn parse(text: &str, path: &Path) -> ListingResult<Self> {
        let load_err = |reason: String| ListingError::LookupLoad {
            path: path.to_path_buf(),
            reason,
        };
        let file: LookupFile = serde_json::from_str(text).map_err(|e| load_err(e.to_string()))?;

        let mut lookup = Self::new();
        for (key, ids) in file.reach_ids {
            let (bc, sp) = parse_key(&key).map_err(load_err)?;
            lookup.insert_sequence(bc, sp, ids)?;
        }
        for (key, groups) in file.reach_ids_from_2d_ids {
            let (bc, sp) = parse_key(&key).map_err(load_err)?;
            for (reach_2d, ids) in groups {
                lookup.insert_members(bc, sp, reach_2d, ids);
            }
        }
        Ok(lookup)
    }

    pub fn to_json_string(&self) -> ListingResult<String> {
        let file = LookupFile {
            reach_ids: self
                .sequences
                .iter()
                .map(|(key, ids)| (format_key(*key), ids.clone()))
                .collect(),
            reach_ids_from_2d_ids: self
                .members
                .iter()
                .map(|(key, groups)| (format_key(*key), groups.clone()))
                .collect(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| ListingError::LookupLoad {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> ListingResult<()> {
        let text = self.to_json_string()?;
        std::fs::write(path, text).map_err(|e| ListingError::io(path, e))
    }

    /// Register the output-order sequence of stable ids for one
    /// `(bc_type, stress_period)`. A stable id may occur only once.
    pub fn insert_sequence(
        &mut self,
        bc_type: BcType,
        stress_period: StressPeriod,
        ids: Vec<ReachId>,
    ) -> ListingResult<()> {
        let mut seen = HashSet::with_capacity(ids.len());
        for id in &ids {
            if !seen.insert(*id) {
                return Err(ListingError::DuplicateStableId {
                    bc_type,
                    stress_period,
                    reach_id: *id,
                });
            }
        }
        self.sequences.insert((bc_type, stress_period), ids);
        Ok(())
    }

    pub fn insert_members(
        &mut self,
        bc_type: BcType,
        stress_period: StressPeriod,
        reach_2d: Reach2dId,
        ids: Vec<ReachId>,
    ) {
        self.members
            .entry((bc_type, stress_period))
            .or_default()
            .insert(reach_2d, ids);
    }

    pub fn sequence(&self, bc_type: BcType, stress_period: StressPeriod) -> Option<&[ReachId]> {
        self.sequences
            .get(&(bc_type, stress_period))
            .map(Vec::as_slice)
    }

    /// Stable id of the `ordinal`-th (1-based) `bc_type` record printed for
    /// `stress_period`.
    pub fn translate(
        &self,
        bc_type: BcType,
        stress_period: StressPeriod,
        ordinal: usize,
    ) -> ListingResult<ReachId> {
        let seq = self
            .sequence(bc_type, stress_period)
            .ok_or(ListingError::MissingLookupSequence {
                bc_type,
                stress_period,
            })?;
        ordinal
            .checked_sub(1)
            .and_then(|i| seq.get(i))
            .copied()
            .ok_or(ListingError::LookupTooShort {
                bc_type,
                stress_period,
                ordinal,
                len: seq.len(),
            })
    }

    /// Layered members of a 2D reach.
    pub fn ids_3d_for_2d(
        &self,
        bc_type: BcType,
        stress_period: StressPeriod,
        reach_2d: Reach2dId,
    ) -> ListingResult<&[ReachId]> {
        self.members
            .get(&(bc_type, stress_period))
            .and_then(|groups| groups.get(&reach_2d))
            .map(Vec::as_slice)
            .ok_or(ListingError::Missing2dId {
                bc_type,
                stress_period,
                reach_2d,
            })
    }

    pub fn stress_periods(&self, bc_type: BcType) -> Vec<StressPeriod> {
        let periods: BTreeSet<StressPeriod> = self
            .sequences
            .keys()
            .chain(self.members.keys())
            .filter(|(bc, _)| *bc == bc_type)
            .map(|(_, sp)| *sp)
            .collect();
        periods.into_iter().collect()
    }

    pub fn bc_types(&self) -> Vec<BcType> {
        let types: BTreeSet<BcType> = self
            .sequences
            .keys()
            .chain(self.members.keys())
            .map(|(bc, _)| *bc)
            .collect();
        types.into_iter().collect()
    }

    /// Overwrite every stress period's sequence and 2D membership with the
    /// entries of `source`, per bc type. Returns the number of entries
    /// replaced.
    pub fn replicate_period(&mut self, source: StressPeriod) -> ListingResult<usize> {
        let mut replaced = 0;

        let keys: Vec<PeriodKey> = self.sequences.keys().copied().collect();
        for (bc_type, sp) in keys {
            let ids = self
                .sequences
                .get(&(bc_type, source))
                .cloned()
                .ok_or(ListingError::MissingSourcePeriod {
                    bc_type,
                    source_period: source,
                })?;
            if sp != source {
                self.sequences.insert((bc_type, sp), ids);
                replaced += 1;
            }
        }

        let keys: Vec<PeriodKey> = self.members.keys().copied().collect();
        for (bc_type, sp) in keys {
            let groups = self
                .members
                .get(&(bc_type, source))
                .cloned()
                .ok_or(ListingError::MissingSourcePeriod {
                    bc_type,
                    source_period: source,
                })?;
            if sp != source {
                self.members.insert((bc_type, sp), groups);
                replaced += 1;
            }
        }

        tracing::info!(source = %source, replaced, "Replicated reach lookup period");
        Ok(replaced)
    }

    /// One comma-delimited table per bc type: a row per stable id, an `x`
    /// under `SP<n>` when the id is printed in that stress period, and for
    /// layered packages the owning 2D id under `SP<n>_2d_id`.
    pub fn export_csv(&self) -> ListingResult<BTreeMap<BcType, String>> {
        let mut tables = BTreeMap::new();
        for bc_type in self.bc_types() {
            tables.insert(bc_type, self.export_one(bc_type)?);
        }
        Ok(tables)
    }

    fn export_one(&self, bc_type: BcType) -> ListingResult<String> {
        let periods = self.stress_periods(bc_type);
        let layered = bc_type.has_layered_features()
            || self.members.keys().any(|(bc, _)| *bc == bc_type);

        // row id -> period -> owning 2D id (if any)
        let mut rows: BTreeMap<ReachId, BTreeMap<StressPeriod, Option<Reach2dId>>> =
            BTreeMap::new();
        for &sp in &periods {
            for &id in self.sequence(bc_type, sp).unwrap_or_default() {
                rows.entry(id).or_default().insert(sp, None);
            }
            let Some(groups) = self.members.get(&(bc_type, sp)) else {
                continue;
            };
            for (&reach_2d, ids) in groups {
                for &id in ids {
                    let slot = rows
                        .get_mut(&id)
                        .and_then(|periods| periods.get_mut(&sp))
                        .ok_or(ListingError::Dangling3dId {
                            bc_type,
                            stress_period: sp,
                            reach_2d,
                            reach_id: id,
                        })?;
                    *slot = Some(reach_2d);
                }
            }
        }

        let mut out = String::from("bc_reach_id");
        for sp in &periods {
            let _ = write!(out, ",SP{sp}");
            if layered {
                let _ = write!(out, ",SP{sp}_2d_id");
            }
        }
        out.push('\n');

        for (id, present) in &rows {
            let _ = write!(out, "{id}");
            for sp in &periods {
                match present.get(sp) {
                    Some(owner) => {
                        out.push_str(",x");
                        if layered {
                            out.push(',');
                            if let Some(reach_2d) = owner {
                                let _ = write!(out, "{reach_2d}");
                            }
                        }
                    }
                    None => {
                        out.push(',');
                        if layered {
                            out.push(',');
                        }
                    }
                }
            }
            out.push('\n');
        }
        Ok(out)
    }
}

fn parse_key(key: &str) -> Result<PeriodKey, String> {
    let (bc, sp) = key
        .split_once(':')
        .ok_or_else(|| format!("key '{key}' is not of the form '<bc>:<stress period>'"))?;
    let bc: BcType = bc.parse().map_err(|e| format!("key '{key}': {e}"))?;
    let sp: StressPeriod = sp.parse().map_err(|e| format!("key '{key}': {e}"))?;
    Ok((bc, sp))
}

fn format_key((bc, sp): PeriodKey) -> String {
    format!("{}:{}", bc.code(), sp)
}
