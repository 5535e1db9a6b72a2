//! gw-listing: readers for the groundwater-flow solver's listing file.
//!
//! Provides:
//! - the fixed-column layout table for the supported solver version
//! - the reach lookup translating output ordinals into stable reach ids
//! - the boundary-condition flux parser (river, drain, general-head blocks)
//! - the global volumetric budget parser, differencer and its reports

pub mod budget;
pub mod budget_report;
pub mod error;
pub mod flux;
pub mod layout;
pub mod lookup;
pub mod parser;

mod cursor;

pub use budget::{
    BudgetDifference, BudgetParser, BudgetSnapshot, BudgetTotals, ConvertedTerm, FlowDirection,
    TermChange, TermDifference, VolumetricBudget, WELLS_CATEGORY,
};
pub use budget_report::{BoundarySummary, render_boundary_summary, render_budget_difference};
pub use error::{ErrorKind, ListingError, ListingResult};
pub use flux::{FluxDump, FluxKey, FluxRecord, FluxTable};
pub use layout::{BudgetLayout, ColumnRange, FluxBlockLayout, ListingLayout};
pub use lookup::ReachLookup;
pub use parser::ListingParser;
