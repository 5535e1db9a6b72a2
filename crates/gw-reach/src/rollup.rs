//! Network-aware roll-up of per-station fluxes.
//!
//! Every downstream station accumulates, field by field, the reported values
//! of the contributors its network row lists. The sum is one level deep: a
//! contributor's own contributors count only if they are listed too.

use std::fmt::Write as _;
use std::path::Path;

use gw_core::{FlowUnit, RatioGuard, StationId, sci};
use serde::{Deserialize, Serialize};

use crate::error::{ReachError, ReachResult};
use crate::network::UpstreamNetwork;
use crate::report::{DELTA_FIELD, StationFluxReport};

const GALLONS_PER_CUBIC_FOOT: f64 = 7.48052;

/// Written for a percent change whose baseline flow is effectively zero.
pub const PERCENT_SENTINEL: f64 = -1.2345e30;

/// Total withdrawal the change in flow is compared against.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: Option<String>,
    pub rate_mgd: f64,
}

impl Withdrawal {
    pub fn from_mgd(rate_mgd: f64) -> Self {
        Self { id: None, rate_mgd }
    }

    /// One-line `id,rate_mgd` file.
    pub fn load_cup_file(path: &Path) -> ReachResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReachError::io(path, e))?;
        Self::parse_cup(&text, path)
    }

    pub fn parse_cup(text: &str, origin: &Path) -> ReachResult<Self> {
        let malformed = |reason: String| ReachError::Withdrawal {
            path: origin.to_path_buf(),
            reason,
        };
        let line = text
            .lines()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| malformed("file is empty".into()))?;
        let Some((id, rate)) = line.trim_end().split_once(',') else {
            return Err(malformed(format!("expected id,rate_mgd but found '{line}'")));
        };
        let rate_mgd: f64 = rate
            .trim()
            .parse()
            .map_err(|_| malformed(format!("can't convert '{}' to a float", rate.trim())))?;
        let rate_mgd = gw_core::ensure_finite(rate_mgd, "withdrawal rate")?;
        Ok(Self {
            id: Some(id.trim().to_string()),
            rate_mgd,
        })
    }

    pub fn rate_in(&self, unit: FlowUnit) -> f64 {
        let cfd = self.rate_mgd * 1.0e6 / GALLONS_PER_CUBIC_FOOT;
        match unit {
            FlowUnit::Mgd => self.rate_mgd,
            _ => unit.from_cfd(cfd),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RollupOptions {
    /// Unit of the values in the station report.
    pub input_unit: FlowUnit,
    /// Unit of the summary table and the withdrawal comparison.
    pub report_unit: FlowUnit,
    pub percent_guard: RatioGuard,
    pub fraction_guard: RatioGuard,
    /// Count every downstream station's own reach even when its row does not
    /// list it.
    pub include_downstream_station: bool,
    pub baseline_field: String,
    pub with_withdrawal_field: String,
    pub change_field: String,
}

impl Default for RollupOptions {
    fn default() -> Self {
        Self {
            input_unit: FlowUnit::Cfd,
            report_unit: FlowUnit::Cfs,
            percent_guard: RatioGuard::new(1e-10, PERCENT_SENTINEL),
            fraction_guard: RatioGuard::default(),
            include_downstream_station: false,
            baseline_field: "total_sim_flux_sp1_ts1".into(),
            with_withdrawal_field: "total_sim_flux_sp2_ts1".into(),
            change_field: DELTA_FIELD.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StationRollup {
    pub id: StationId,
    pub name: String,
    /// One sum per roll-up field, in field order.
    pub sums: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StationSummary {
    pub id: StationId,
    pub name: String,
    pub baseline: f64,
    pub with_withdrawal: f64,
    pub change: f64,
    pub percent_change: f64,
    pub fraction_of_withdrawal: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Rollup {
    fields: Vec<String>,
    stations: Vec<StationRollup>,
    options: RollupOptions,
}

impl Rollup {
    pub fn cumulate(
        report: &StationFluxReport,
        network: &UpstreamNetwork,
        options: RollupOptions,
    ) -> ReachResult<Self> {
        let fields: Vec<String> = report.flux_fields().map(String::from).collect();
        let mut stations = Vec::with_capacity(network.len());

        for station in network.stations() {
            let unlisted = network.unlisted_upstream(&station.id);
            if !unlisted.is_empty() {
                tracing::warn!(
                    station = %station.id,
                    unlisted = ?unlisted,
                    "Upstream chain is not flattened; only listed contributors are summed"
                );
            }

            let mut contributors: Vec<&str> = station.upstream.iter().map(String::as_str).collect();
            if options.include_downstream_station && !contributors.contains(&station.id.as_str()) {
                contributors.push(&station.id);
            }

            let mut sums = vec![0.0; fields.len()];
            for us in contributors {
                if !report.contains(us) {
                    let err = ReachError::MissingStation {
                        downstream: station.id.clone(),
                        station: us.to_string(),
                    };
                    tracing::error!(%err, "Halting roll-up");
                    return Err(err);
                }
                for (sum, field) in sums.iter_mut().zip(&fields) {
                    *sum += report.value(us, field).unwrap_or(0.0);
                }
            }
            stations.push(StationRollup {
                id: station.id.clone(),
                name: station.name.clone(),
                sums,
            });
        }

        tracing::info!(stations = stations.len(), fields = fields.len(), "Cumulated upstream fluxes");
        Ok(Self {
            fields,
            stations,
            options,
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn stations(&self) -> &[StationRollup] {
        &self.stations
    }

    pub fn value(&self, station: &str, field: &str) -> Option<f64> {
        let idx = self.fields.iter().position(|f| f == field)?;
        self.stations
            .iter()
            .find(|s| s.id == station)
            .and_then(|s| s.sums.get(idx))
            .copied()
    }

    fn field_index(&self, field: &str) -> ReachResult<usize> {
        self.fields
            .iter()
            .position(|f| f == field)
            .ok_or_else(|| ReachError::MissingReportField {
                field: field.to_string(),
            })
    }

    fn to_report_unit(&self, v: f64) -> f64 {
        self.options
            .report_unit
            .value_of(self.options.input_unit.rate(v))
    }

    pub fn summaries(&self, withdrawal: &Withdrawal) -> ReachResult<Vec<StationSummary>> {
        let base = self.field_index(&self.options.baseline_field)?;
        let with = self.field_index(&self.options.with_withdrawal_field)?;
        let change = self.field_index(&self.options.change_field)?;
        let withdrawal_rate = withdrawal.rate_in(self.options.report_unit);

        Ok(self
            .stations
            .iter()
            .map(|s| {
                let baseline = self.to_report_unit(s.sums[base]);
                let with_withdrawal = self.to_report_unit(s.sums[with]);
                let change = self.to_report_unit(s.sums[change]);
                StationSummary {
                    id: s.id.clone(),
                    name: s.name.clone(),
                    baseline,
                    with_withdrawal,
                    change,
                    percent_change: self.options.percent_guard.ratio(100.0 * change, baseline),
                    fraction_of_withdrawal: self
                        .options
                        .fraction_guard
                        .ratio(change, withdrawal_rate),
                }
            })
            .collect())
    }

    /// `gaged_fluxes_sum.csv`: summed fields in the report's own unit.
    pub fn render_cumulative(&self) -> String {
        let mut out = String::from("station_id,station_name");
        for field in &self.fields {
            let _ = write!(out, ",{field}");
        }
        out.push('\n');
        for s in &self.stations {
            let _ = write!(out, "{},{}", s.id, s.name);
            for v in &s.sums {
                let _ = write!(out, ",{v:.6}");
            }
            out.push('\n');
        }
        out
    }

    /// `delta_q_details.csv`: every field in the input unit, then in the
    /// report unit, then the change as a fraction of the withdrawal.
    pub fn render_details(&self, withdrawal: &Withdrawal) -> ReachResult<String> {
        let change = self.field_index(&self.options.change_field)?;
        let (input, report) = (self.options.input_unit, self.options.report_unit);
        let withdrawal_rate = withdrawal.rate_in(report);

        let mut out = String::from("station_number,station_name");
        for unit in [input, report] {
            for field in &self.fields {
                let _ = write!(out, ",{field}_{}", unit.label());
            }
        }
        let _ = writeln!(out, ",{}_fraction_of_withdrawal", self.options.change_field);

        for s in &self.stations {
            let _ = write!(out, "{},{}", s.id, s.name);
            for v in &s.sums {
                let _ = write!(out, ",{v:.6}");
            }
            for v in &s.sums {
                let _ = write!(out, ",{:.6}", self.to_report_unit(*v));
            }
            let fraction = self
                .options
                .fraction_guard
                .ratio(self.to_report_unit(s.sums[change]), withdrawal_rate);
            let _ = writeln!(out, ",{fraction:.6}");
        }
        Ok(out)
    }

    /// `delta_q_summary.csv`.
    pub fn render_summary(&self, withdrawal: &Withdrawal) -> ReachResult<String> {
        let unit = self.options.report_unit.label();
        let mut out = format!(
            "station_number,station_name,simulated_flux_base_condition_{unit},\
             simulated_flux_with_withdrawal_{unit},simulated_change_in_flow_{unit},\
             simulated_percent_change_in_flow,\
             simulated_change_in_flow_as_a_fraction_of_withdrawal\n"
        );
        for s in self.summaries(withdrawal)? {
            let _ = writeln!(
                out,
                "{},{},{},{},{},{},{}",
                s.id,
                s.name,
                sci(s.baseline, 8),
                sci(s.with_withdrawal, 8),
                sci(s.change, 8),
                sci(s.percent_change, 8),
                sci(s.fraction_of_withdrawal, 8)
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::{Tolerances, nearly_equal};

    #[test]
    fn cup_file_converts_to_cfs() {
        let w = Withdrawal::parse_cup("CUP-7,1.0\n", Path::new("cup.csv")).unwrap();
        assert_eq!(w.id.as_deref(), Some("CUP-7"));
        let expected = 1.0e6 / (7.48052 * 86_400.0);
        assert!(nearly_equal(w.rate_in(FlowUnit::Cfs), expected, Tolerances::default()));
        assert_eq!(w.rate_in(FlowUnit::Mgd), 1.0);
    }

    #[test]
    fn malformed_cup_files() {
        for text in ["", "only-an-id\n", "id,abc\n"] {
            let err = Withdrawal::parse_cup(text, Path::new("cup.csv")).unwrap_err();
            assert!(matches!(err, ReachError::Withdrawal { .. }), "{text:?}: {err}");
        }
    }

    #[test]
    fn downstream_station_is_appended_on_request() {
        let report = StationFluxReport::parse(
            "id total_sim_flux_sp1_ts1\nDS 1.0\nUS 2.0\n",
            Path::new("r"),
        )
        .unwrap();
        let network = UpstreamNetwork::parse("DS,down,US\n", Path::new("n")).unwrap();

        let flat = Rollup::cumulate(&report, &network, RollupOptions::default()).unwrap();
        assert_eq!(flat.value("DS", "total_sim_flux_sp1_ts1"), Some(2.0));

        let options = RollupOptions {
            include_downstream_station: true,
            ..RollupOptions::default()
        };
        let with_self = Rollup::cumulate(&report, &network, options).unwrap();
        assert_eq!(with_self.value("DS", "total_sim_flux_sp1_ts1"), Some(3.0));
    }

    #[test]
    fn cumulative_table_uses_six_decimals() {
        let report =
            StationFluxReport::parse("id a b_fraction\nS 1.5 0.3\n", Path::new("r")).unwrap();
        let network = UpstreamNetwork::parse("S,Station S,S\n", Path::new("n")).unwrap();
        let rollup = Rollup::cumulate(&report, &network, RollupOptions::default()).unwrap();
        assert_eq!(
            rollup.render_cumulative(),
            "station_id,station_name,a\nS,Station S,1.500000\n"
        );
    }
}
