//! Pipeline configuration file (YAML).

use std::path::{Path, PathBuf};

use gw_core::{BcType, FlowUnit, RatioGuard, Snapshot, Tolerances, nearly_equal};
use gw_listing::ListingLayout;
use gw_reach::{PERCENT_SENTINEL, ReachReportOptions, RollupOptions, Withdrawal};
use serde::{Deserialize, Serialize};

use crate::command::CommandSpec;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub listing_file: PathBuf,
    pub lookup_file: PathBuf,
    pub definitions_file: PathBuf,
    /// Roll-up stage runs only when a network is given.
    #[serde(default)]
    pub network_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_bc_types")]
    pub bc_types: Vec<BcType>,
    #[serde(default = "default_conversion_factor")]
    pub conversion_factor: f64,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub withdrawal: Option<WithdrawalSource>,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub rollup: RollupConfig,
    #[serde(default)]
    pub layout: ListingLayout,
    #[serde(default)]
    pub solver: Option<CommandSpec>,
}

fn default_bc_types() -> Vec<BcType> {
    BcType::REPORT_ORDER.to_vec()
}

fn default_conversion_factor() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalSource {
    RateMgd(f64),
    CupFile(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BudgetConfig {
    pub t1: Snapshot,
    pub t2: Snapshot,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            t1: Snapshot::first_step_of(gw_core::StressPeriod::FIRST),
            t2: Snapshot::first_step_of(second_period()),
        }
    }
}

fn second_period() -> gw_core::StressPeriod {
    gw_core::StressPeriod::new(2).unwrap_or(gw_core::StressPeriod::FIRST)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    /// Change as a fraction of the first-period total, per gaged reach.
    pub reach_fraction: RatioGuard,
    /// Boundary and budget changes as a fraction of the wells change.
    pub wells_fraction: RatioGuard,
    /// Roll-up percent change against the baseline flow.
    pub rollup_percent: RatioGuard,
    /// Roll-up change against the withdrawal rate.
    pub withdrawal_fraction: RatioGuard,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            reach_fraction: RatioGuard::default(),
            wells_fraction: RatioGuard::default(),
            rollup_percent: RatioGuard::new(1e-10, PERCENT_SENTINEL),
            withdrawal_fraction: RatioGuard::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RollupConfig {
    pub input_unit: FlowUnit,
    pub report_unit: FlowUnit,
    pub include_downstream_station: bool,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            input_unit: FlowUnit::Cfd,
            report_unit: FlowUnit::Cfs,
            include_downstream_station: false,
        }
    }
}

impl PipelineConfig {
    /// Read a config file; relative paths resolve against its directory.
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml_str(&content, base).map_err(|e| match e {
            AppError::Config { message, .. } => AppError::Config {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    pub fn from_yaml_str(content: &str, base_dir: &Path) -> AppResult<Self> {
        let mut config: PipelineConfig =
            serde_yaml::from_str(content).map_err(|e| AppError::Config {
                path: base_dir.to_path_buf(),
                message: e.to_string(),
            })?;
        config.resolve_paths(base_dir);
        config.validate(base_dir)?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.listing_file);
        resolve(&mut self.lookup_file);
        resolve(&mut self.definitions_file);
        resolve(&mut self.output_dir);
        if let Some(p) = self.network_file.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.log_file.as_mut() {
            resolve(p);
        }
        if let Some(WithdrawalSource::CupFile(p)) = self.withdrawal.as_mut() {
            resolve(p);
        }
        if let Some(dir) = self.solver.as_mut().and_then(|s| s.working_dir.as_mut()) {
            resolve(dir);
        }
    }

    fn validate(&self, base: &Path) -> AppResult<()> {
        let invalid = |message: String| AppError::Config {
            path: base.to_path_buf(),
            message,
        };
        if self.bc_types.is_empty() {
            return Err(invalid("bc_types must name at least one package".into()));
        }
        for (i, bc) in self.bc_types.iter().enumerate() {
            if self.bc_types[..i].contains(bc) {
                return Err(invalid(format!("bc_types lists {bc} twice")));
            }
        }
        if !self.conversion_factor.is_finite() || self.conversion_factor == 0.0 {
            return Err(invalid(format!(
                "conversion_factor must be finite and non-zero, got {}",
                self.conversion_factor
            )));
        }
        if self.network_file.is_some() && self.withdrawal.is_none() {
            return Err(invalid("network_file requires a withdrawal".into()));
        }
        // The roll-up reads the reach report, which conversion_factor has already scaled.
        let expected = self.rollup.input_unit.from_cfd(1.0);
        let tol = Tolerances {
            abs: 0.0,
            rel: 1e-6,
        };
        if self.network_file.is_some() && !nearly_equal(self.conversion_factor, expected, tol) {
            return Err(invalid(format!(
                "conversion_factor {} does not match rollup.input_unit {} (expected {})",
                self.conversion_factor, self.rollup.input_unit, expected
            )));
        }
        Ok(())
    }

    /// Default log location inside the output directory.
    pub fn log_path(&self) -> PathBuf {
        self.log_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("gwflux.log"))
    }

    pub fn withdrawal(&self) -> AppResult<Option<Withdrawal>> {
        match &self.withdrawal {
            None => Ok(None),
            Some(WithdrawalSource::RateMgd(rate)) => Ok(Some(Withdrawal::from_mgd(*rate))),
            Some(WithdrawalSource::CupFile(path)) => Ok(Some(Withdrawal::load_cup_file(path)?)),
        }
    }

    pub fn reach_report_options(&self) -> ReachReportOptions {
        ReachReportOptions {
            bc_types: self.bc_types.clone(),
            conversion_factor: self.conversion_factor,
            include_fraction: true,
            fraction_guard: self.thresholds.reach_fraction,
        }
    }

    pub fn rollup_options(&self) -> RollupOptions {
        RollupOptions {
            input_unit: self.rollup.input_unit,
            report_unit: self.rollup.report_unit,
            percent_guard: self.thresholds.rollup_percent,
            fraction_guard: self.thresholds.withdrawal_fraction,
            include_downstream_station: self.rollup.include_downstream_station,
            ..RollupOptions::default()
        }
    }
}
