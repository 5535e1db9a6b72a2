//! gw-reach: gaged-reach aggregation and upstream roll-up.
//!
//! Provides:
//! - gaged-reach definitions (which boundary-condition reaches make up a gage)
//! - the reach aggregator summing parsed fluxes per gaged reach
//! - the per-reach report and its re-parser
//! - the upstream contributing network and the roll-up reports built on it

pub mod aggregate;
pub mod definitions;
pub mod error;
pub mod network;
pub mod report;
pub mod rollup;

pub use aggregate::{GagedReachFluxes, ReachAggregator};
pub use definitions::{GagedReachDefinition, GagedReachDefinitions};
pub use error::{ReachError, ReachResult};
pub use network::{Station, UpstreamNetwork};
pub use report::{ReachReportOptions, StationFluxReport, render_reach_report};
pub use rollup::{PERCENT_SENTINEL, Rollup, RollupOptions, StationRollup, StationSummary, Withdrawal};
