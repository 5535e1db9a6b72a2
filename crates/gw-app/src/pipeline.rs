//! Post-processing pipeline service.

use std::path::{Path, PathBuf};
use std::time::Instant;

use gw_listing::{
    BoundarySummary, BudgetParser, ListingParser, ReachLookup, render_boundary_summary,
    render_budget_difference,
};
use gw_reach::{
    GagedReachDefinitions, ReachAggregator, Rollup, StationFluxReport, UpstreamNetwork,
    render_reach_report,
};
use gw_results::{OutputDir, RunFingerprint, RunManifest};

use crate::command::{CommandRunner, check_command_output};
use crate::config::{PipelineConfig, WithdrawalSource};
use crate::error::{AppError, AppResult};
use crate::progress::{PipelineProgressEvent, PipelineStage};

pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const BUDGET_DIFFERENCE_FILE: &str = "budget_difference.csv";
pub const BOUNDARY_SUMMARY_FILE: &str = "boundary_flux_change.txt";
pub const FLUX_DUMP_FILE: &str = "bc_fluxes.json";
pub const REACH_REPORT_FILE: &str = "gaged_reach_fluxes.asc";
pub const CUMULATIVE_FILE: &str = "gaged_fluxes_sum.csv";
pub const DETAILS_FILE: &str = "delta_q_details.csv";
pub const SUMMARY_FILE: &str = "delta_q_summary.csv";

pub fn flux_csv_file(bc_type: gw_core::BcType) -> String {
    format!("bc_fluxes_{}.csv", bc_type.code())
}

/// Outcome of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub output_dir: PathBuf,
    pub boundary_summary: BoundarySummary,
    pub total_time_s: f64,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(PipelineProgressEvent)>,
    stage: PipelineStage,
    started: Instant,
    message: Option<String>,
) {
    tracing::info!(stage = ?stage, message = message.as_deref().unwrap_or(""), "Pipeline stage");
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(PipelineProgressEvent::stage(
            stage,
            started.elapsed().as_secs_f64(),
            message,
        ));
    }
}

/// Log a fatal error with its stage before handing it to the caller.
fn failed<E: Into<AppError>>(stage: PipelineStage) -> impl FnOnce(E) -> AppError {
    move |err| {
        let err = err.into();
        tracing::error!(stage = ?stage, error = %err, "Pipeline stage failed");
        err
    }
}

pub fn run_pipeline(
    config: &PipelineConfig,
    runner: &dyn CommandRunner,
    mut progress_cb: Option<&mut dyn FnMut(PipelineProgressEvent)>,
) -> AppResult<PipelineResponse> {
    let started = Instant::now();
    let mut out = OutputDir::new(&config.output_dir).map_err(failed(PipelineStage::WritingManifest))?;

    if let Some(solver) = &config.solver {
        let stage = PipelineStage::RunningSolver;
        emit_progress(&mut progress_cb, stage, started, Some(format!("Running {}", solver.program)));
        let output = runner.run(solver).map_err(failed(stage))?;
        check_command_output(solver, &output).map_err(failed(stage))?;
    }

    let stage = PipelineStage::DifferencingBudget;
    emit_progress(&mut progress_cb, stage, started, Some("Reading volumetric budget".into()));
    let budget = BudgetParser::with_layout(config.layout.budget.clone())
        .parse_file(&config.listing_file)
        .map_err(failed(stage))?;
    let diff = budget
        .difference(config.budget.t1, config.budget.t2)
        .map_err(failed(stage))?;
    let table = render_budget_difference(&diff, config.thresholds.wells_fraction).map_err(failed(stage))?;
    out.write_text(BUDGET_DIFFERENCE_FILE, &table).map_err(failed(stage))?;

    let stage = PipelineStage::SummarizingBoundaries;
    emit_progress(&mut progress_cb, stage, started, None);
    let boundary_summary = BoundarySummary::from_difference(&diff, config.thresholds.wells_fraction)
        .map_err(failed(stage))?;
    out.write_text(BOUNDARY_SUMMARY_FILE, &render_boundary_summary(&boundary_summary))
        .map_err(failed(stage))?;

    let stage = PipelineStage::ParsingFluxes;
    emit_progress(&mut progress_cb, stage, started, Some("Parsing boundary fluxes".into()));
    let lookup = ReachLookup::load(&config.lookup_file).map_err(failed(stage))?;
    let fluxes = ListingParser::new(&lookup)
        .with_layout(config.layout.clone())
        .with_bc_types(&config.bc_types)
        .parse_file(&config.listing_file)
        .map_err(failed(stage))?;
    let stress_period_count = fluxes.stress_period_count();

    let stage = PipelineStage::DumpingFluxes;
    emit_progress(&mut progress_cb, stage, started, None);
    out.save_json(FLUX_DUMP_FILE, &fluxes.to_dump()).map_err(failed(stage))?;
    for bc_type in &config.bc_types {
        out.write_text(&flux_csv_file(*bc_type), &fluxes.to_csv(*bc_type))
            .map_err(failed(stage))?;
    }

    let stage = PipelineStage::AggregatingReaches;
    emit_progress(&mut progress_cb, stage, started, Some("Aggregating gaged reaches".into()));
    let definitions = GagedReachDefinitions::load(&config.definitions_file).map_err(failed(stage))?;
    let reach_fluxes = ReachAggregator::new(&lookup, &fluxes)
        .aggregate(&definitions, stress_period_count)
        .map_err(failed(stage))?;
    let report = render_reach_report(&reach_fluxes, &config.reach_report_options()).map_err(failed(stage))?;
    let report_path = out.write_text(REACH_REPORT_FILE, &report).map_err(failed(stage))?;

    if let Some(network_file) = &config.network_file {
        let stage = PipelineStage::RollingUp;
        emit_progress(&mut progress_cb, stage, started, Some("Cumulating upstream fluxes".into()));
        let withdrawal = config
            .withdrawal()
            .map_err(failed(stage))?
            .ok_or_else(|| AppError::InvalidInput("roll-up needs a withdrawal".into()))
            .map_err(failed(stage))?;
        let stations = StationFluxReport::parse(&report, &report_path).map_err(failed(stage))?;
        let network = UpstreamNetwork::load(network_file).map_err(failed(stage))?;
        let rollup = Rollup::cumulate(&stations, &network, config.rollup_options()).map_err(failed(stage))?;
        out.write_text(CUMULATIVE_FILE, &rollup.render_cumulative())
            .map_err(failed(stage))?;
        let details = rollup.render_details(&withdrawal).map_err(failed(stage))?;
        out.write_text(DETAILS_FILE, &details).map_err(failed(stage))?;
        let summary = rollup.render_summary(&withdrawal).map_err(failed(stage))?;
        out.write_text(SUMMARY_FILE, &summary).map_err(failed(stage))?;
    } else {
        tracing::info!("No network_file configured; skipping roll-up");
    }

    let stage = PipelineStage::WritingManifest;
    emit_progress(&mut progress_cb, stage, started, None);
    let fingerprint = fingerprint(config).map_err(failed(stage))?;
    let run_id = fingerprint.run_id(TOOL_VERSION);
    let manifest = RunManifest::new(
        run_id.clone(),
        TOOL_VERSION,
        stress_period_count,
        fingerprint.into_inputs(),
        out.written().to_vec(),
    );
    out.save_manifest(&manifest).map_err(failed(stage))?;

    let total_time_s = started.elapsed().as_secs_f64();
    emit_progress(
        &mut progress_cb,
        PipelineStage::Completed,
        started,
        Some(format!("Run {run_id} complete")),
    );
    Ok(PipelineResponse {
        run_id,
        manifest,
        output_dir: out.root().to_path_buf(),
        boundary_summary,
        total_time_s,
    })
}

fn fingerprint(config: &PipelineConfig) -> AppResult<RunFingerprint> {
    let mut inputs: Vec<(&str, &Path)> = vec![
        ("listing", config.listing_file.as_path()),
        ("lookup", config.lookup_file.as_path()),
        ("definitions", config.definitions_file.as_path()),
    ];
    if let Some(network) = &config.network_file {
        inputs.push(("network", network.as_path()));
    }
    if let Some(WithdrawalSource::CupFile(cup)) = &config.withdrawal {
        inputs.push(("withdrawal", cup.as_path()));
    }

    let mut fp = RunFingerprint::new();
    for (role, path) in inputs {
        fp.add_input(role, path)?;
    }
    fp.set_config(config)?;
    Ok(fp)
}
