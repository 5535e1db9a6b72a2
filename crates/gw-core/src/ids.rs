use core::fmt;
use core::num::NonZeroU32;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Boundary-condition package whose per-feature fluxes are echoed in the
/// solver listing file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BcType {
    #[cfg_attr(feature = "serde", serde(rename = "riv"))]
    River,
    #[cfg_attr(feature = "serde", serde(rename = "drn"))]
    Drain,
    #[cfg_attr(feature = "serde", serde(rename = "ghb"))]
    GeneralHead,
}

impl BcType {
    /// Column order used by the production reach reports.
    pub const REPORT_ORDER: [BcType; 3] = [BcType::Drain, BcType::River, BcType::GeneralHead];

    /// Short code used in definition files, lookup keys and report headers.
    pub fn code(self) -> &'static str {
        match self {
            BcType::River => "riv",
            BcType::Drain => "drn",
            BcType::GeneralHead => "ghb",
        }
    }

    /// Category label of this package in the global volumetric budget.
    pub fn budget_label(self) -> &'static str {
        match self {
            BcType::River => "RIVER LEAKAGE",
            BcType::Drain => "DRAINS",
            BcType::GeneralHead => "HEAD DEP BOUNDS",
        }
    }

    /// Whether gaged-reach members of this type are 2D ids that expand to
    /// several layered (3D) features through the reach lookup.
    pub fn has_layered_features(self) -> bool {
        matches!(self, BcType::River)
    }
}

impl fmt::Display for BcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for BcType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "riv" => Ok(BcType::River),
            "drn" => Ok(BcType::Drain),
            "ghb" => Ok(BcType::GeneralHead),
            _ => Err(CoreError::UnknownBcType {
                value: s.to_string(),
            }),
        }
    }
}

macro_rules! positive_index {
    ($(#[$meta:meta])* $name:ident, $what:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
        pub struct $name(NonZeroU32);

        impl $name {
            pub const FIRST: Self = Self(NonZeroU32::MIN);

            pub fn new(value: u32) -> CoreResult<Self> {
                NonZeroU32::new(value)
                    .map(Self)
                    .ok_or(CoreError::NonPositive {
                        what: $what,
                        value: i64::from(value),
                    })
            }

            pub fn get(self) -> u32 {
                self.0.get()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value: i64 = s.trim().parse().map_err(|_| CoreError::NonPositive {
                    what: $what,
                    value: 0,
                })?;
                u32::try_from(value)
                    .ok()
                    .and_then(NonZeroU32::new)
                    .map(Self)
                    .ok_or(CoreError::NonPositive { what: $what, value })
            }
        }
    };
}

positive_index!(
    /// Model-wide simulation interval with constant boundary conditions (1-based).
    StressPeriod,
    "stress period"
);

positive_index!(
    /// Subdivision of a stress period at which the solver reports state (1-based).
    TimeStep,
    "time step"
);

/// A solver output instant: `(time_step, stress_period)`.
///
/// Ordering is time step first, matching how the budget blocks are keyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Snapshot {
    pub time_step: TimeStep,
    pub stress_period: StressPeriod,
}

impl Snapshot {
    pub fn new(time_step: TimeStep, stress_period: StressPeriod) -> Self {
        Self {
            time_step,
            stress_period,
        }
    }

    /// Build from raw `(time_step, stress_period)` integers.
    pub fn from_raw(time_step: u32, stress_period: u32) -> CoreResult<Self> {
        Ok(Self::new(
            TimeStep::new(time_step)?,
            StressPeriod::new(stress_period)?,
        ))
    }

    /// First time step of the given stress period.
    pub fn first_step_of(stress_period: StressPeriod) -> Self {
        Self::new(TimeStep::FIRST, stress_period)
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sp{}/ts{}", self.stress_period, self.time_step)
    }
}

/// Stable boundary-condition reach identifier (a "3D" id for layered packages).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct ReachId(pub u32);

/// Horizontally collocated grouping key uniting one or more layered reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Reach2dId(pub u32);

impl Reach2dId {
    /// Members of non-layered packages are stable ids already.
    pub fn as_stable(self) -> ReachId {
        ReachId(self.0)
    }
}

impl fmt::Display for ReachId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Reach2dId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User-defined aggregation point, usually a stream gage number.
pub type GagedReachId = String;

/// Monitoring station id in the upstream contributing network.
pub type StationId = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bc_type_codes_round_trip() {
        for bc in BcType::REPORT_ORDER {
            assert_eq!(bc.code().parse::<BcType>().unwrap(), bc);
        }
        assert_eq!(" RIV ".parse::<BcType>().unwrap(), BcType::River);
        assert!("wel".parse::<BcType>().is_err());
    }

    #[test]
    fn stress_period_rejects_zero() {
        assert!(StressPeriod::new(0).is_err());
        assert_eq!(StressPeriod::new(2).unwrap().get(), 2);
        assert!("-3".parse::<TimeStep>().is_err());
        assert_eq!("  7".parse::<TimeStep>().unwrap().get(), 7);
    }

    #[test]
    fn index_display_honours_width() {
        let sp = StressPeriod::new(1).unwrap();
        assert_eq!(format!("{sp:>3}"), "  1");
        assert_eq!(format!("{:<4}|", TimeStep::new(12).unwrap()), "12  |");
        assert_eq!(sp.to_string(), "1");
    }

    #[test]
    fn option_index_is_small() {
        assert_eq!(
            core::mem::size_of::<StressPeriod>(),
            core::mem::size_of::<Option<StressPeriod>>()
        );
    }

    #[test]
    fn snapshot_orders_by_time_step_first() {
        let a = Snapshot::from_raw(1, 2).unwrap();
        let b = Snapshot::from_raw(2, 1).unwrap();
        assert!(a < b);
        assert_eq!(format!("{a}"), "sp2/ts1");
    }
}
