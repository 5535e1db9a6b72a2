// gw-core/src/units.rs

use core::fmt;
use core::str::FromStr;

use uom::si::f64::VolumeRate as UomVolumeRate;

use crate::CoreError;

/// Canonical volumetric flow rate (uom SI, f64).
pub type FlowRate = UomVolumeRate;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Cubic feet per day: the unit the regional model writes to its listing file.
#[inline]
pub fn cfd(v: f64) -> FlowRate {
    cfs(v / SECONDS_PER_DAY)
}

#[inline]
pub fn cfs(v: f64) -> FlowRate {
    use uom::si::volume_rate::cubic_foot_per_second;
    FlowRate::new::<cubic_foot_per_second>(v)
}

/// Millions of US gallons per day.
#[inline]
pub fn mgd(v: f64) -> FlowRate {
    use uom::si::volume_rate::gallon_per_day;
    FlowRate::new::<gallon_per_day>(v * 1.0e6)
}

/// Unit systems the budget and roll-up reports are written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FlowUnit {
    Cfd,
    Cfs,
    Mgd,
}

impl FlowUnit {
    pub const ALL: [FlowUnit; 3] = [FlowUnit::Cfd, FlowUnit::Cfs, FlowUnit::Mgd];

    pub fn label(self) -> &'static str {
        match self {
            FlowUnit::Cfd => "cfd",
            FlowUnit::Cfs => "cfs",
            FlowUnit::Mgd => "mgd",
        }
    }

    /// Wrap a value expressed in this unit.
    pub fn rate(self, v: f64) -> FlowRate {
        match self {
            FlowUnit::Cfd => cfd(v),
            FlowUnit::Cfs => cfs(v),
            FlowUnit::Mgd => mgd(v),
        }
    }

    /// Express a rate in this unit.
    pub fn value_of(self, rate: FlowRate) -> f64 {
        use uom::si::volume_rate::{cubic_foot_per_second, gallon_per_day};
        match self {
            FlowUnit::Cfd => rate.get::<cubic_foot_per_second>() * SECONDS_PER_DAY,
            FlowUnit::Cfs => rate.get::<cubic_foot_per_second>(),
            FlowUnit::Mgd => rate.get::<gallon_per_day>() / 1.0e6,
        }
    }

    /// Convert a value given in cubic feet per day into this unit.
    pub fn from_cfd(self, v: f64) -> f64 {
        match self {
            FlowUnit::Cfd => v,
            _ => self.value_of(cfd(v)),
        }
    }
}

impl fmt::Display for FlowUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FlowUnit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cfd" => Ok(FlowUnit::Cfd),
            "cfs" => Ok(FlowUnit::Cfs),
            "mgd" => Ok(FlowUnit::Mgd),
            _ => Err(CoreError::UnknownFlowUnit {
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Tolerances, nearly_equal};

    #[test]
    fn cfd_to_cfs_divides_by_seconds_per_day() {
        let tol = Tolerances::default();
        assert!(nearly_equal(FlowUnit::Cfs.from_cfd(86_400.0), 1.0, tol));
        assert!(nearly_equal(FlowUnit::Cfs.from_cfd(60.0), 60.0 / 86_400.0, tol));
        assert_eq!(FlowUnit::Cfd.from_cfd(60.0), 60.0);
    }

    #[test]
    fn mgd_uses_us_gallon() {
        let tol = Tolerances {
            abs: 1e-9,
            rel: 1e-6,
        };
        // one million cubic feet per day is ~7.48 million gallons per day
        assert!(nearly_equal(FlowUnit::Mgd.from_cfd(1.0e6), 7.48052, tol));
        // 1 mgd is ~1.547 cfs
        assert!(nearly_equal(FlowUnit::Cfs.value_of(mgd(1.0)), 1.547_229, tol));
    }

    #[test]
    fn cfd_reads_back_through_typed_rate() {
        let tol = Tolerances::default();
        assert!(nearly_equal(FlowUnit::Cfd.value_of(cfd(-1880.5)), -1880.5, tol));
        assert!(nearly_equal(FlowUnit::Cfd.value_of(cfs(1.0)), 86_400.0, tol));
        assert!(nearly_equal(FlowUnit::Mgd.from_cfd(0.0), 0.0, tol));
    }

    #[test]
    fn unit_labels_parse() {
        for unit in FlowUnit::ALL {
            assert_eq!(unit.label().parse::<FlowUnit>().unwrap(), unit);
        }
    }
}
