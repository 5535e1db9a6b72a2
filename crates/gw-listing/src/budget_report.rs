//! Text reports built from a [`BudgetDifference`].

use std::fmt::Write as _;

use gw_core::{BcType, FlowUnit, RatioGuard};
use serde::Serialize;

use crate::budget::{BudgetDifference, ConvertedTerm, TermChange};
use crate::error::ListingResult;

const DIFFERENCE_HEADER: [&str; 16] = [
    "bc_flux_type",
    "flux_units",
    "timeStep_1",
    "stressPeriod_1",
    "timeStep_2",
    "stressPeriod_2",
    "in_rate_1",
    "in_rate_2",
    "in_rate_2_minus_1",
    "out_rate_1",
    "out_rate_2",
    "out_rate_2_minus_1",
    "net_rate_1",
    "net_rate_2",
    "net_rate_2_minus_1",
    "net_rate_2_minus_1_fraction_of_netWellPkg",
];

/// Comma-delimited difference table: every category once per unit
/// (cfd, cfs, mgd), categories sorted by name.
pub fn render_budget_difference(diff: &BudgetDifference, guard: RatioGuard) -> ListingResult<String> {
    let mut out = DIFFERENCE_HEADER.join(",");
    out.push('\n');
    for unit in FlowUnit::ALL {
        for term in diff.converted(unit, guard)? {
            write_record(&mut out, diff, &term);
        }
    }
    Ok(out)
}

fn write_record(out: &mut String, diff: &BudgetDifference, term: &ConvertedTerm) {
    let _ = write!(
        out,
        "{},{:>3},{:>3},{:>3},{:>3},{:>3}",
        term.category,
        term.unit.label(),
        diff.t1.time_step,
        diff.t1.stress_period,
        diff.t2.time_step,
        diff.t2.stress_period
    );
    for change in [term.inflow, term.outflow, term.net] {
        write_change(out, term.unit, change);
    }
    let _ = writeln!(out, ",{:.2}", term.fraction_of_wells);
}

fn write_change(out: &mut String, unit: FlowUnit, change: TermChange) {
    for v in [change.before, change.after, change.delta] {
        let _ = match unit {
            FlowUnit::Cfd => write!(out, ",{v:16.6}"),
            FlowUnit::Cfs | FlowUnit::Mgd => write!(out, ",{v:.4}"),
        };
    }
}

/// Combined net change of the river, drain and general-head packages.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundarySummary {
    pub net_delta_cfs: f64,
    pub net_delta_mgd: f64,
    /// Combined change as a fraction of the wells net change.
    pub fraction_of_wells: f64,
}

impl BoundarySummary {
    /// A boundary package absent from the budget contributes zero.
    pub fn from_difference(diff: &BudgetDifference, guard: RatioGuard) -> ListingResult<Self> {
        let wells_cfs = FlowUnit::Cfs.from_cfd(diff.wells_net_delta()?);
        let mut net_cfd = 0.0;
        for bc_type in [BcType::River, BcType::Drain, BcType::GeneralHead] {
            match diff.term(bc_type.budget_label()) {
                Some(term) => net_cfd += term.net.delta,
                None => tracing::warn!(
                    category = bc_type.budget_label(),
                    "Boundary category missing from budget; counted as zero"
                ),
            }
        }
        let net_delta_cfs = FlowUnit::Cfs.from_cfd(net_cfd);
        Ok(Self {
            net_delta_cfs,
            net_delta_mgd: FlowUnit::Mgd.from_cfd(net_cfd),
            fraction_of_wells: guard.ratio(net_delta_cfs, wells_cfs),
        })
    }
}

pub fn render_boundary_summary(summary: &BoundarySummary) -> String {
    format!(
        "river + drain + ghb flux change, in cfs: {:.4}\n\
         river + drain + ghb flux change, in mgd: {:.4}\n\
         river + drain + ghb flux change, as a fraction of change in well pkg flux: {:.4}\n",
        summary.net_delta_cfs, summary.net_delta_mgd, summary.fraction_of_wells
    )
}
