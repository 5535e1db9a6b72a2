//! Sum parsed boundary fluxes into gaged-reach totals.

use std::collections::BTreeMap;

use gw_core::{BcType, GagedReachId, ReachId, Snapshot, StressPeriod, TimeStep};
use gw_listing::{FluxTable, ReachLookup};

use crate::definitions::GagedReachDefinitions;
use crate::error::{ReachError, ReachResult};

pub struct ReachAggregator<'a> {
    lookup: &'a ReachLookup,
    fluxes: &'a FluxTable,
    time_step: TimeStep,
}

impl<'a> ReachAggregator<'a> {
    /// Aggregates the first time step of every stress period.
    pub fn new(lookup: &'a ReachLookup, fluxes: &'a FluxTable) -> Self {
        Self {
            lookup,
            fluxes,
            time_step: TimeStep::FIRST,
        }
    }

    pub fn with_time_step(mut self, time_step: TimeStep) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn aggregate(
        &self,
        definitions: &GagedReachDefinitions,
        stress_period_count: u32,
    ) -> ReachResult<GagedReachFluxes> {
        let mut out = GagedReachFluxes {
            order: Vec::with_capacity(definitions.len()),
            time_step: self.time_step,
            stress_period_count,
            values: BTreeMap::new(),
        };

        for reach in definitions.iter() {
            out.order.push(reach.id.clone());
            for bc_type in reach.bc_types() {
                for &member in reach.members(bc_type) {
                    for sp in 1..=stress_period_count {
                        let stress_period = StressPeriod::new(sp)?;
                        let snapshot = Snapshot::new(self.time_step, stress_period);
                        let ids: Vec<ReachId> = if bc_type.has_layered_features() {
                            self.lookup
                                .ids_3d_for_2d(bc_type, stress_period, member)?
                                .to_vec()
                        } else {
                            vec![member.as_stable()]
                        };
                        for reach_id in ids {
                            let flux = self.fluxes.get(bc_type, reach_id, snapshot).ok_or_else(
                                || {
                                    let err = ReachError::MissingFlux {
                                        gaged_reach: reach.id.clone(),
                                        bc_type,
                                        reach_id,
                                        snapshot,
                                    };
                                    tracing::error!(%err, "Halting reach aggregation");
                                    err
                                },
                            )?;
                            *out
                                .values
                                .entry((reach.id.clone(), bc_type, snapshot))
                                .or_insert(0.0) += flux;
                        }
                    }
                }
            }
        }

        tracing::info!(
            gaged_reaches = out.order.len(),
            stress_periods = stress_period_count,
            "Aggregated gaged-reach fluxes"
        );
        Ok(out)
    }
}

/// Summed fluxes keyed by (gaged reach, bc type, snapshot).
#[derive(Debug, Clone, PartialEq)]
pub struct GagedReachFluxes {
    order: Vec<GagedReachId>,
    time_step: TimeStep,
    stress_period_count: u32,
    values: BTreeMap<(GagedReachId, BcType, Snapshot), f64>,
}

impl GagedReachFluxes {
    /// Gaged reaches in definition order.
    pub fn gaged_reaches(&self) -> &[GagedReachId] {
        &self.order
    }

    pub fn time_step(&self) -> TimeStep {
        self.time_step
    }

    pub fn stress_period_count(&self) -> u32 {
        self.stress_period_count
    }

    pub fn get(&self, gaged_reach: &str, bc_type: BcType, snapshot: Snapshot) -> Option<f64> {
        self.values
            .get(&(gaged_reach.to_string(), bc_type, snapshot))
            .copied()
    }

    /// Missing combinations mean the reach has no features of that type.
    pub fn flux_or_zero(&self, gaged_reach: &str, bc_type: BcType, snapshot: Snapshot) -> f64 {
        self.get(gaged_reach, bc_type, snapshot).unwrap_or(0.0)
    }

    pub fn total(&self, gaged_reach: &str, bc_types: &[BcType], snapshot: Snapshot) -> f64 {
        bc_types
            .iter()
            .map(|bc| self.flux_or_zero(gaged_reach, *bc, snapshot))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::Reach2dId;
    use gw_listing::{FluxKey, FluxRecord};
    use std::path::Path;

    fn sp1() -> Snapshot {
        Snapshot::from_raw(1, 1).unwrap()
    }

    fn table(records: &[(BcType, u32, f64)]) -> FluxTable {
        let mut table = FluxTable::new();
        for (bc, id, flux) in records {
            table
                .insert(FluxRecord {
                    key: FluxKey::new(*bc, ReachId(*id), sp1()),
                    flux: *flux,
                })
                .unwrap();
        }
        table
    }

    #[test]
    fn non_layered_members_are_stable_ids() {
        let lookup = ReachLookup::new();
        let fluxes = table(&[(BcType::Drain, 7, -2.0), (BcType::Drain, 8, -1.5)]);
        let defs =
            GagedReachDefinitions::parse("h\nG,drn,7\nG,drn,8\n", Path::new("d.csv")).unwrap();
        let out = ReachAggregator::new(&lookup, &fluxes)
            .aggregate(&defs, 1)
            .unwrap();
        assert_eq!(out.get("G", BcType::Drain, sp1()), Some(-3.5));
        assert_eq!(out.flux_or_zero("G", BcType::River, sp1()), 0.0);
        assert_eq!(out.get("G", BcType::River, sp1()), None);
    }

    #[test]
    fn missing_2d_group_is_a_consistency_error() {
        let mut lookup = ReachLookup::new();
        lookup.insert_members(BcType::River, StressPeriod::FIRST, Reach2dId(1), vec![ReachId(10)]);
        let fluxes = table(&[(BcType::River, 10, 1.0)]);
        let defs = GagedReachDefinitions::parse("h\nG,riv,2\n", Path::new("d.csv")).unwrap();
        let err = ReachAggregator::new(&lookup, &fluxes)
            .aggregate(&defs, 1)
            .unwrap_err();
        assert!(err.is_consistency(), "{err}");
    }
}
