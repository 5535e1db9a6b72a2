//! Fixed-column layout of the listing file.
//!
//! Every offset the parsers read lives here so a different solver build can
//! override it from configuration. [`ListingLayout::modflow_nwt`] carries the
//! offsets of the supported solver version.

use gw_core::BcType;
use serde::{Deserialize, Serialize};

/// Half-open character range `[start, end)` with an open end meaning "to end
/// of line". Slicing clamps to the line length the way fixed-column readers
/// expect: a range past the end yields an empty field, never a panic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRange {
    pub start: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl ColumnRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub const fn to_end(start: usize) -> Self {
        Self { start, end: None }
    }

    pub fn slice<'a>(&self, line: &'a str) -> &'a str {
        let start = byte_offset(line, self.start);
        let end = match self.end {
            Some(end) => byte_offset(line, end.max(self.start)),
            None => line.len(),
        };
        &line[start..end]
    }
}

fn byte_offset(line: &str, chars: usize) -> usize {
    if line.is_ascii() {
        return chars.min(line.len());
    }
    line.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(line.len())
}

/// Column layout of one boundary-condition flux block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluxBlockLayout {
    /// Exact prefix of the block header line.
    pub header: String,
    pub stress_period: ColumnRange,
    pub time_step: ColumnRange,
    /// Exact prefix of every record line inside the block.
    pub record_prefix: String,
    pub sequence: ColumnRange,
    pub flux: ColumnRange,
}

/// Column layout of the global volumetric budget block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetLayout {
    pub header: String,
    /// Stress period is the last `stress_period_width` characters of the header.
    pub stress_period_width: usize,
    pub time_step: ColumnRange,
    pub direction: ColumnRange,
    pub in_marker: String,
    pub out_marker: String,
    pub cumulative_label: ColumnRange,
    pub cumulative_value: ColumnRange,
    pub rate_label: ColumnRange,
    pub rate_value: ColumnRange,
    pub total_cumulative: ColumnRange,
    pub total_rate: ColumnRange,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingLayout {
    pub stress_period_marker: String,
    pub stress_period: ColumnRange,
    pub river: FluxBlockLayout,
    pub drain: FluxBlockLayout,
    pub general_head: FluxBlockLayout,
    pub budget: BudgetLayout,
}

impl ListingLayout {
    /// Offsets written by MODFLOW-NWT.
    pub fn modflow_nwt() -> Self {
        Self {
            stress_period_marker: "                            STRESS PERIOD NO.".to_string(),
            stress_period: ColumnRange::new(46, 50),
            river: FluxBlockLayout {
                header: "    RIVER LEAKAGE   PERIOD".to_string(),
                stress_period: ColumnRange::new(27, 31),
                time_step: ColumnRange::new(38, 42),
                record_prefix: " REACH".to_string(),
                sequence: ColumnRange::new(7, 13),
                flux: ColumnRange::to_end(58),
            },
            drain: FluxBlockLayout {
                header: "           DRAINS   PERIOD".to_string(),
                stress_period: ColumnRange::new(27, 31),
                time_step: ColumnRange::new(38, 42),
                record_prefix: " DRAIN".to_string(),
                sequence: ColumnRange::new(7, 13),
                flux: ColumnRange::to_end(59),
            },
            general_head: FluxBlockLayout {
                header: "  HEAD DEP BOUNDS   PERIOD".to_string(),
                stress_period: ColumnRange::new(27, 31),
                time_step: ColumnRange::new(39, 42),
                record_prefix: " BOUNDARY".to_string(),
                sequence: ColumnRange::new(10, 16),
                flux: ColumnRange::to_end(62),
            },
            budget: BudgetLayout {
                header: "  VOLUMETRIC BUDGET FOR ENTIRE MODEL AT END OF TIME STEP".to_string(),
                stress_period_width: 3,
                time_step: ColumnRange::new(58, 61),
                direction: ColumnRange::new(10, 14),
                in_marker: " IN:".to_string(),
                out_marker: "OUT:".to_string(),
                cumulative_label: ColumnRange::new(0, 20),
                cumulative_value: ColumnRange::new(22, 39),
                rate_label: ColumnRange::new(39, 61),
                rate_value: ColumnRange::new(64, 80),
                total_cumulative: ColumnRange::new(24, 39),
                total_rate: ColumnRange::new(64, 80),
            },
        }
    }

    pub fn block(&self, bc_type: BcType) -> &FluxBlockLayout {
        match bc_type {
            BcType::River => &self.river,
            BcType::Drain => &self.drain,
            BcType::GeneralHead => &self.general_head,
        }
    }
}

impl Default for ListingLayout {
    fn default() -> Self {
        Self::modflow_nwt()
    }
}
