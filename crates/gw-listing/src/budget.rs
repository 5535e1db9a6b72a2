//! Global volumetric budget: parsing and differencing between two snapshots.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use gw_core::{FlowUnit, RatioGuard, Snapshot, StressPeriod, TimeStep};
use serde::Serialize;

use crate::cursor::{Line, LineCursor};
use crate::error::{ListingError, ListingResult};
use crate::layout::{BudgetLayout, ColumnRange, ListingLayout};

/// Budget category every difference is normalized against.
pub const WELLS_CATEGORY: &str = "WELLS";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    In,
    Out,
}

impl FlowDirection {
    pub fn label(self) -> &'static str {
        match self {
            FlowDirection::In => "in",
            FlowDirection::Out => "out",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BudgetTotals {
    pub cumulative: f64,
    pub rate: f64,
}

/// Budget items of one `(time_step, stress_period)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BudgetSnapshot {
    rates: BTreeMap<(FlowDirection, String), f64>,
    cumulative: BTreeMap<(FlowDirection, String), f64>,
    totals: BTreeMap<FlowDirection, BudgetTotals>,
    active_terms: BTreeSet<String>,
}

impl BudgetSnapshot {
    pub fn rate(&self, direction: FlowDirection, category: &str) -> Option<f64> {
        self.rates.get(&(direction, category.to_string())).copied()
    }

    pub fn cumulative(&self, direction: FlowDirection, category: &str) -> Option<f64> {
        self.cumulative
            .get(&(direction, category.to_string()))
            .copied()
    }

    pub fn totals(&self, direction: FlowDirection) -> Option<BudgetTotals> {
        self.totals.get(&direction).copied()
    }

    /// Rate categories printed for this snapshot, in either direction.
    pub fn active_terms(&self) -> &BTreeSet<String> {
        &self.active_terms
    }

    pub fn insert_rate(&mut self, direction: FlowDirection, category: &str, value: f64) {
        self.active_terms.insert(category.to_string());
        self.rates.insert((direction, category.to_string()), value);
    }

    pub fn insert_cumulative(&mut self, direction: FlowDirection, category: &str, value: f64) {
        self.cumulative
            .insert((direction, category.to_string()), value);
    }

    pub fn set_totals(&mut self, direction: FlowDirection, totals: BudgetTotals) {
        self.totals.insert(direction, totals);
    }

    fn rate_or_missing(
        &self,
        snapshot: Snapshot,
        direction: FlowDirection,
        category: &str,
    ) -> ListingResult<f64> {
        self.rate(direction, category)
            .ok_or_else(|| ListingError::MissingBudgetItem {
                snapshot,
                direction: direction.label(),
                category: category.to_string(),
            })
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VolumetricBudget {
    snapshots: BTreeMap<Snapshot, BudgetSnapshot>,
}

impl VolumetricBudget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, snapshot: Snapshot, items: BudgetSnapshot) {
        self.snapshots.insert(snapshot, items);
    }

    pub fn get(&self, snapshot: Snapshot) -> Option<&BudgetSnapshot> {
        self.snapshots.get(&snapshot)
    }

    pub fn snapshots(&self) -> impl Iterator<Item = Snapshot> + '_ {
        self.snapshots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn snapshot(&self, snapshot: Snapshot) -> ListingResult<&BudgetSnapshot> {
        self.get(snapshot)
            .ok_or(ListingError::MissingBudgetSnapshot { snapshot })
    }

    /// Rate differences `t2 - t1` for every category active at `t1`.
    ///
    /// Both snapshots must print the same set of categories.
    pub fn difference(&self, t1: Snapshot, t2: Snapshot) -> ListingResult<BudgetDifference> {
        let first = self.snapshot(t1)?;
        let second = self.snapshot(t2)?;

        let only_in_first: Vec<String> = first
            .active_terms
            .difference(&second.active_terms)
            .cloned()
            .collect();
        let only_in_second: Vec<String> = second
            .active_terms
            .difference(&first.active_terms)
            .cloned()
            .collect();
        if !only_in_first.is_empty() || !only_in_second.is_empty() {
            return Err(ListingError::ActiveTermMismatch {
                t1,
                t2,
                only_in_first,
                only_in_second,
            });
        }

        let mut terms = BTreeMap::new();
        for category in &first.active_terms {
            let inflow = TermChange::between(
                first.rate_or_missing(t1, FlowDirection::In, category)?,
                second.rate_or_missing(t2, FlowDirection::In, category)?,
            );
            let outflow = TermChange::between(
                first.rate_or_missing(t1, FlowDirection::Out, category)?,
                second.rate_or_missing(t2, FlowDirection::Out, category)?,
            );
            let net = TermChange::between(
                inflow.before - outflow.before,
                inflow.after - outflow.after,
            );
            terms.insert(
                category.clone(),
                TermDifference {
                    category: category.clone(),
                    inflow,
                    outflow,
                    net,
                },
            );
        }

        tracing::debug!(t1 = %t1, t2 = %t2, terms = terms.len(), "Budget difference");
        Ok(BudgetDifference { t1, t2, terms })
    }
}

/// A value at two instants and its change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TermChange {
    pub before: f64,
    pub after: f64,
    pub delta: f64,
}

impl TermChange {
    pub fn between(before: f64, after: f64) -> Self {
        Self {
            before,
            after,
            delta: after - before,
        }
    }

    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            before: f(self.before),
            after: f(self.after),
            delta: f(self.delta),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TermDifference {
    pub category: String,
    pub inflow: TermChange,
    pub outflow: TermChange,
    /// `in - out` at each instant.
    pub net: TermChange,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BudgetDifference {
    pub t1: Snapshot,
    pub t2: Snapshot,
    pub terms: BTreeMap<String, TermDifference>,
}

/// A term expressed in one reporting unit.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConvertedTerm {
    pub category: String,
    pub unit: FlowUnit,
    pub inflow: TermChange,
    pub outflow: TermChange,
    pub net: TermChange,
    /// Net change as a fraction of the wells net change.
    pub fraction_of_wells: f64,
}

impl BudgetDifference {
    pub fn term(&self, category: &str) -> Option<&TermDifference> {
        self.terms.get(category)
    }

    /// Net change of the wells category, the normalization base of every
    /// report. Absence is fatal.
    pub fn wells_net_delta(&self) -> ListingResult<f64> {
        self.term(WELLS_CATEGORY)
            .map(|term| term.net.delta)
            .ok_or_else(|| ListingError::MissingNormalizationCategory {
                category: WELLS_CATEGORY.to_string(),
                t1: self.t1,
                t2: self.t2,
            })
    }

    /// Every term converted from cubic feet per day into `unit`, sorted by
    /// category.
    pub fn converted(&self, unit: FlowUnit, guard: RatioGuard) -> ListingResult<Vec<ConvertedTerm>> {
        let wells = self.wells_net_delta()?;
        Ok(self
            .terms
            .values()
            .map(|term| ConvertedTerm {
                category: term.category.clone(),
                unit,
                inflow: term.inflow.map(|v| unit.from_cfd(v)),
                outflow: term.outflow.map(|v| unit.from_cfd(v)),
                net: term.net.map(|v| unit.from_cfd(v)),
                fraction_of_wells: guard.ratio(term.net.delta, wells),
            })
            .collect())
    }
}

/// Scanner for `VOLUMETRIC BUDGET FOR ENTIRE MODEL` blocks.
pub struct BudgetParser {
    layout: BudgetLayout,
}

impl Default for BudgetParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BudgetParser {
    pub fn new() -> Self {
        Self {
            layout: ListingLayout::default().budget,
        }
    }

    pub fn with_layout(layout: BudgetLayout) -> Self {
        Self { layout }
    }

    pub fn parse_file(&self, path: &Path) -> ListingResult<VolumetricBudget> {
        let file = File::open(path).map_err(|e| ListingError::io(path, e))?;
        self.parse(BufReader::new(file), path)
    }

    pub fn parse<R: BufRead>(&self, reader: R, origin: &Path) -> ListingResult<VolumetricBudget> {
        let mut cursor = LineCursor::new(reader, origin);
        let mut budget = VolumetricBudget::new();

        while let Some(line) = cursor.next_line()? {
            if !line.text.starts_with(&self.layout.header) {
                continue;
            }
            let snapshot = self.header_snapshot(&line)?;
            let items = self.read_block(&mut cursor, snapshot)?;
            tracing::debug!(
                snapshot = %snapshot,
                terms = items.active_terms.len(),
                "Volumetric budget"
            );
            budget.insert(snapshot, items);
        }

        tracing::info!(
            path = %origin.display(),
            snapshots = budget.len(),
            "Parsed volumetric budget"
        );
        Ok(budget)
    }

    fn header_snapshot(&self, line: &Line) -> ListingResult<Snapshot> {
        let context = "budget header";
        let width = line.text.chars().count();
        let tail = ColumnRange::to_end(width.saturating_sub(self.layout.stress_period_width));
        let stress_period: StressPeriod = line.field(tail, "stress period", context)?;
        let time_step: TimeStep = line.field(self.layout.time_step, "time step", context)?;
        Ok(Snapshot::new(time_step, stress_period))
    }

    fn read_block<R: BufRead>(
        &self,
        cursor: &mut LineCursor<R>,
        snapshot: Snapshot,
    ) -> ListingResult<BudgetSnapshot> {
        let mut items = BudgetSnapshot::default();
        loop {
            let line = next_or_eof(cursor, snapshot)?;
            let marker = line.column(self.layout.direction);
            if marker == self.layout.in_marker {
                self.read_direction(cursor, snapshot, FlowDirection::In, &mut items)?;
            } else if marker == self.layout.out_marker {
                self.read_direction(cursor, snapshot, FlowDirection::Out, &mut items)?;
                return Ok(items);
            }
        }
    }

    fn read_direction<R: BufRead>(
        &self,
        cursor: &mut LineCursor<R>,
        snapshot: Snapshot,
        direction: FlowDirection,
        items: &mut BudgetSnapshot,
    ) -> ListingResult<()> {
        let context = format!("budget {} {snapshot}", direction.label());
        // underline below the IN:/OUT: marker
        next_or_eof(cursor, snapshot)?;
        loop {
            let line = next_or_eof(cursor, snapshot)?;
            if line.is_blank() {
                break;
            }
            let cum_label = label(line.column(self.layout.cumulative_label));
            let cum_value: f64 =
                line.field(self.layout.cumulative_value, "cumulative value", &context)?;
            let rate_label = label(line.column(self.layout.rate_label));
            let rate_value: f64 = line.field(self.layout.rate_value, "rate value", &context)?;
            if rate_label.is_empty() {
                return Err(line.invalid("rate label", &context));
            }
            items.insert_cumulative(direction, cum_label, cum_value);
            items.insert_rate(direction, rate_label, rate_value);
        }

        let totals = next_or_eof(cursor, snapshot)?;
        let cumulative: f64 = totals.field(self.layout.total_cumulative, "cumulative total", &context)?;
        let rate: f64 = totals.field(self.layout.total_rate, "rate total", &context)?;
        items.set_totals(direction, BudgetTotals { cumulative, rate });
        Ok(())
    }
}

fn next_or_eof<R: BufRead>(cursor: &mut LineCursor<R>, snapshot: Snapshot) -> ListingResult<Line> {
    cursor
        .next_line()?
        .ok_or_else(|| ListingError::UnexpectedEof {
            what: format!("volumetric budget for {snapshot}"),
        })
}

fn label(raw: &str) -> &str {
    raw.trim().trim_end_matches('=').trim_end()
}
