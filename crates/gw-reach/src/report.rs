//! Per-gaged-reach flux report.
//!
//! The report is a blank-padded table: a `{:>20}` id column followed by one
//! `% .8e` column per (stress period, bc type), a per-period total and, for
//! two-period runs, the inter-period change. The roll-up re-reads it through
//! [`StationFluxReport`].

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use gw_core::{BcType, RatioGuard, Snapshot, StationId, StressPeriod, sci_space_signed};

use crate::aggregate::GagedReachFluxes;
use crate::error::{ReachError, ReachResult};

pub const ID_FIELD: &str = "gaged_reach_id";
pub const DELTA_FIELD: &str = "del_total_sim_flux";
pub const DELTA_FRACTION_FIELD: &str = "del_total_sim_flux_fraction";
const FRACTION_SUFFIX: &str = "_fraction";

#[derive(Clone, Debug, PartialEq)]
pub struct ReachReportOptions {
    /// Column order of the per-type fluxes.
    pub bc_types: Vec<BcType>,
    /// Applied to every flux, total and change; the fraction is unitless.
    pub conversion_factor: f64,
    /// Emit the change as a fraction of the first-period total.
    pub include_fraction: bool,
    pub fraction_guard: RatioGuard,
}

impl Default for ReachReportOptions {
    fn default() -> Self {
        Self {
            bc_types: BcType::REPORT_ORDER.to_vec(),
            conversion_factor: 1.0,
            include_fraction: true,
            fraction_guard: RatioGuard::default(),
        }
    }
}

pub fn flux_field(bc_type: BcType, snapshot: Snapshot) -> String {
    format!(
        "{}_sim_flux_sp{}_ts{}",
        bc_type.code(),
        snapshot.stress_period,
        snapshot.time_step
    )
}

pub fn total_field(snapshot: Snapshot) -> String {
    format!(
        "total_sim_flux_sp{}_ts{}",
        snapshot.stress_period, snapshot.time_step
    )
}

fn snapshots(fluxes: &GagedReachFluxes) -> ReachResult<Vec<Snapshot>> {
    (1..=fluxes.stress_period_count())
        .map(|sp| -> ReachResult<Snapshot> {
            Ok(Snapshot::new(fluxes.time_step(), StressPeriod::new(sp)?))
        })
        .collect()
}

pub fn render_reach_report(
    fluxes: &GagedReachFluxes,
    options: &ReachReportOptions,
) -> ReachResult<String> {
    let snapshots = snapshots(fluxes)?;
    let with_delta = snapshots.len() == 2;

    let mut out = format!("{ID_FIELD:>20}");
    for snapshot in &snapshots {
        for bc_type in &options.bc_types {
            let _ = write!(out, " {}", flux_field(*bc_type, *snapshot));
        }
        let _ = write!(out, " {}", total_field(*snapshot));
    }
    if with_delta {
        let _ = write!(out, " {DELTA_FIELD}");
        if options.include_fraction {
            let _ = write!(out, " {DELTA_FRACTION_FIELD}");
        }
    }
    out.push('\n');

    let cf = options.conversion_factor;
    for gaged_reach in fluxes.gaged_reaches() {
        let _ = write!(out, "{gaged_reach:>20}");
        let mut totals = Vec::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            for bc_type in &options.bc_types {
                push(&mut out, fluxes.flux_or_zero(gaged_reach, *bc_type, *snapshot) * cf);
            }
            let total = fluxes.total(gaged_reach, &options.bc_types, *snapshot);
            push(&mut out, total * cf);
            totals.push(total);
        }
        if with_delta {
            let delta = totals[1] - totals[0];
            push(&mut out, delta * cf);
            if options.include_fraction {
                push(&mut out, options.fraction_guard.ratio(delta, totals[0]));
            }
        }
        out.push('\n');
    }
    Ok(out)
}

fn push(out: &mut String, v: f64) {
    out.push_str("      ");
    out.push_str(&sci_space_signed(v, 8));
}

/// A per-station flux report read back from its whitespace-delimited text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StationFluxReport {
    fields: Vec<String>,
    stations: Vec<StationId>,
    rows: HashMap<StationId, Vec<f64>>,
}

impl StationFluxReport {
    pub fn load(path: &Path) -> ReachResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReachError::io(path, e))?;
        Self::parse(&text, path)
    }

    /// The first header token names the id column; the remaining tokens name
    /// the value columns.
    pub fn parse(text: &str, origin: &Path) -> ReachResult<Self> {
        let malformed = |line_no: usize, reason: String| ReachError::Report {
            path: origin.to_path_buf(),
            line_no,
            reason,
        };
        let mut lines = text.lines().enumerate();
        let fields: Vec<String> = match lines.next() {
            Some((_, header)) => header.split_whitespace().skip(1).map(String::from).collect(),
            None => return Err(malformed(1, "missing header row".into())),
        };

        let mut report = Self {
            fields,
            ..Self::default()
        };
        for (idx, line) in lines {
            let mut tokens = line.split_whitespace();
            let Some(station) = tokens.next() else {
                continue;
            };
            let values = tokens
                .map(|t| {
                    t.parse::<f64>()
                        .map_err(|_| malformed(idx + 1, format!("can't convert '{t}' to a float")))
                })
                .collect::<ReachResult<Vec<f64>>>()?;
            if values.len() != report.fields.len() {
                return Err(malformed(
                    idx + 1,
                    format!(
                        "expected {} values but found {}",
                        report.fields.len(),
                        values.len()
                    ),
                ));
            }
            if report.rows.insert(station.to_string(), values).is_some() {
                return Err(ReachError::DuplicateStation {
                    station: station.to_string(),
                });
            }
            report.stations.push(station.to_string());
        }
        tracing::debug!(
            stations = report.stations.len(),
            fields = report.fields.len(),
            "Parsed station flux report"
        );
        Ok(report)
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Additive columns: everything except ratio columns.
    pub fn flux_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .map(String::as_str)
            .filter(|f| !f.ends_with(FRACTION_SUFFIX))
    }

    pub fn stations(&self) -> &[StationId] {
        &self.stations
    }

    pub fn contains(&self, station: &str) -> bool {
        self.rows.contains_key(station)
    }

    pub fn field_index(&self, field: &str) -> ReachResult<usize> {
        self.fields
            .iter()
            .position(|f| f == field)
            .ok_or_else(|| ReachError::MissingReportField {
                field: field.to_string(),
            })
    }

    pub fn value(&self, station: &str, field: &str) -> Option<f64> {
        let idx = self.fields.iter().position(|f| f == field)?;
        self.rows.get(station).and_then(|row| row.get(idx)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_follow_snapshot() {
        let s = Snapshot::from_raw(1, 2).unwrap();
        assert_eq!(flux_field(BcType::GeneralHead, s), "ghb_sim_flux_sp2_ts1");
        assert_eq!(total_field(s), "total_sim_flux_sp2_ts1");
    }

    #[test]
    fn parses_padded_report() {
        let text = "      gaged_reach_id riv_sim_flux_sp1_ts1 del_total_sim_flux_fraction\n\
                    \x20              US1       5.00000000e+00      -1.23450000e+25\n\
                    \n\
                    \x20              US2      -3.00000000e-01       1.00000000e-01\n";
        let report = StationFluxReport::parse(text, Path::new("r.asc")).unwrap();
        assert_eq!(report.stations(), &["US1".to_string(), "US2".to_string()]);
        assert_eq!(report.value("US2", "riv_sim_flux_sp1_ts1"), Some(-0.3));
        assert_eq!(report.flux_fields().collect::<Vec<_>>(), vec!["riv_sim_flux_sp1_ts1"]);
        assert!(report.field_index("total_sim_flux_sp9_ts1").unwrap_err().is_consistency());
    }

    #[test]
    fn short_rows_are_malformed() {
        let text = "id a b\nS1 1.0\n";
        let err = StationFluxReport::parse(text, Path::new("r.asc")).unwrap_err();
        assert!(matches!(err, ReachError::Report { line_no: 2, .. }));
    }

    #[test]
    fn repeated_station_is_rejected() {
        let text = "id a\nS1 1.0\nS1 2.0\n";
        let err = StationFluxReport::parse(text, Path::new("r.asc")).unwrap_err();
        assert!(matches!(err, ReachError::DuplicateStation { .. }));
    }
}
