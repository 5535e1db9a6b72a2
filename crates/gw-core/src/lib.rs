//! gw-core: shared foundation for the gwflux post-processor.
//!
//! Contains:
//! - ids (boundary-condition types, stress periods, time steps, reach ids)
//! - numeric (Real + tolerances + guarded ratios + fixed-format helpers)
//! - units (uom volume-rate types + report unit systems)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
