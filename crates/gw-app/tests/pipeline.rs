//! End-to-end pipeline runs over a synthetic listing file.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use gw_app::{
    AppError, CommandOutput, CommandRunner, CommandSpec, PipelineConfig, PipelineProgressEvent,
    PipelineResponse, PipelineStage, run_pipeline,
};
use gw_core::{Tolerances, nearly_equal};
use gw_results::{MANIFEST_FILE, OutputDir};

struct ScriptedRunner {
    output: CommandOutput,
    calls: RefCell<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    fn new(output: CommandOutput) -> Self {
        Self {
            output,
            calls: RefCell::new(Vec::new()),
        }
    }

    fn clean() -> Self {
        Self::new(CommandOutput {
            exit_code: Some(0),
            stdout: " Normal termination of simulation\n".into(),
            stderr: String::new(),
        })
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &CommandSpec) -> gw_app::AppResult<CommandOutput> {
        self.calls.borrow_mut().push(cmd.clone());
        Ok(self.output.clone())
    }
}

fn stress_period_marker(sp: u32) -> String {
    format!("                            STRESS PERIOD NO. {sp:>4}, LENGTH = 1.000000")
}

fn river(sp: u32, fluxes: [f64; 2]) -> Vec<String> {
    let mut lines = vec![format!("    RIVER LEAKAGE   PERIOD {sp:>4}   STEP{:>4}", 1)];
    for (i, flux) in fluxes.iter().enumerate() {
        let head = format!(" REACH {:>6}   LAYER   1   ROW   10   COL   20", i + 1);
        lines.push(format!("{head:<58}{flux:>14.6E}"));
    }
    lines.push(String::new());
    lines
}

fn drain(sp: u32, flux: f64) -> Vec<String> {
    let head = format!(" DRAIN {:>6}   LAYER   2   ROW   11   COL   21", 1);
    vec![
        format!("           DRAINS   PERIOD {sp:>4}   STEP{:>4}", 1),
        format!("{head:<59}{flux:>14.6E}"),
        String::new(),
    ]
}

fn budget_block(sp: u32, terms: &[(&str, f64, f64)]) -> Vec<String> {
    let mut lines = vec![
        format!("  VOLUMETRIC BUDGET FOR ENTIRE MODEL AT END OF TIME STEP{:>5}, STRESS PERIOD{sp:>5}", 1),
        "  ------------------------------------------------------------------------------".to_string(),
        String::new(),
        "     CUMULATIVE VOLUMES      L**3       RATES FOR THIS TIME STEP      L**3/T".to_string(),
        "     ------------------                 ------------------------".to_string(),
        String::new(),
    ];
    for (direction, pick_in) in [(" IN:", true), ("OUT:", false)] {
        lines.push(format!("{:10}{direction}", ""));
        lines.push(format!("{:10}----", ""));
        let mut total = 0.0;
        for (label, inflow, outflow) in terms {
            let v = if pick_in { *inflow } else { *outflow };
            total += v;
            lines.push(format!("{label:>20} ={:>17.4}{label:>22} = {v:>16.4}", v * 10.0));
        }
        lines.push(String::new());
        let total_label = if pick_in { "TOTAL IN" } else { "TOTAL OUT" };
        lines.push(format!(
            "{total_label:>20}    {:>15.4}{total_label:>22}   {total:>16.4}",
            total * 10.0
        ));
        lines.push(String::new());
    }
    lines
}

fn listing_text() -> String {
    let mut lines = Vec::new();
    let periods: [(u32, [f64; 2], f64, f64); 2] = [(1, [10.0, 20.0], -4.0, 0.0), (2, [8.0, 16.0], -2.0, 100.0)];
    for (sp, riv, drn, wells) in periods {
        lines.push(stress_period_marker(sp));
        lines.extend(drain(sp, drn));
        lines.extend(river(sp, riv));
        lines.extend(budget_block(
            sp,
            &[
                ("WELLS", 0.0, wells),
                ("DRAINS", 0.0, -drn),
                ("RIVER LEAKAGE", 50.0, 50.0 + riv[0] + riv[1]),
            ],
        ));
    }
    let mut text = lines.join("\n");
    text.push_str("\n\n");
    text
}

const LOOKUP: &str = r#"{
  "reach_ids": { "riv:1": [101, 102], "riv:2": [101, 102], "drn:1": [30], "drn:2": [30] },
  "reach_ids_from_2d_ids": { "riv:1": { "9": [101, 102] }, "riv:2": { "9": [101, 102] } }
}"#;

const DEFINITIONS: &str = "gaged_reach_id,bc_type,bc_id\nUS1,riv,9\nUS2,drn,30\n";

const NETWORK: &str = "DS,Downstream gage,US1,US2\nUS1,Upper gage,US1\n";

fn fixture_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gw_app_{name}_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("fixture dir");
    std::fs::write(dir.join("model.lst"), listing_text()).expect("listing");
    std::fs::write(dir.join("lookup.json"), LOOKUP).expect("lookup");
    std::fs::write(dir.join("defs.csv"), DEFINITIONS).expect("definitions");
    std::fs::write(dir.join("network.csv"), NETWORK).expect("network");
    dir
}

fn config(dir: &Path, extra: &str) -> PipelineConfig {
    let text = format!(
        "\
listing_file: model.lst
lookup_file: lookup.json
definitions_file: defs.csv
output_dir: out
bc_types: [drn, riv]
{extra}"
    );
    PipelineConfig::from_yaml_str(&text, dir).expect("config")
}

fn collect_events(
    config: &PipelineConfig,
    runner: &dyn CommandRunner,
) -> (gw_app::AppResult<PipelineResponse>, Vec<PipelineProgressEvent>) {
    let mut events = Vec::new();
    let result = run_pipeline(config, runner, Some(&mut |event| events.push(event)));
    (result, events)
}

#[test]
fn full_pipeline_writes_every_report() {
    let dir = fixture_dir("full");
    let config = config(
        &dir,
        "network_file: network.csv\nwithdrawal:\n  rate_mgd: 1.0\nsolver:\n  program: mfnwt\n  args: [model.nam]\n",
    );
    let runner = ScriptedRunner::clean();

    let (result, events) = collect_events(&config, &runner);
    let response = result.expect("pipeline should succeed");

    assert_eq!(runner.calls.borrow().len(), 1);
    assert_eq!(runner.calls.borrow()[0].args, vec!["model.nam".to_string()]);

    let stages: Vec<PipelineStage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(
        stages,
        vec![
            PipelineStage::RunningSolver,
            PipelineStage::DifferencingBudget,
            PipelineStage::SummarizingBoundaries,
            PipelineStage::ParsingFluxes,
            PipelineStage::DumpingFluxes,
            PipelineStage::AggregatingReaches,
            PipelineStage::RollingUp,
            PipelineStage::WritingManifest,
            PipelineStage::Completed,
        ]
    );
    assert!(events.windows(2).all(|w| w[0].elapsed_wall_s <= w[1].elapsed_wall_s));

    let out = response.output_dir.clone();
    for name in [
        "budget_difference.csv",
        "boundary_flux_change.txt",
        "bc_fluxes.json",
        "bc_fluxes_drn.csv",
        "bc_fluxes_riv.csv",
        "gaged_reach_fluxes.asc",
        "gaged_fluxes_sum.csv",
        "delta_q_details.csv",
        "delta_q_summary.csv",
        MANIFEST_FILE,
    ] {
        assert!(out.join(name).is_file(), "missing {name}");
    }

    let manifest = OutputDir::new(&out)
        .expect("output dir")
        .load_manifest()
        .expect("manifest");
    assert_eq!(manifest.run_id, response.run_id);
    assert_eq!(manifest.stress_period_count, 2);
    let roles: Vec<&str> = manifest.inputs.iter().map(|i| i.role.as_str()).collect();
    assert_eq!(roles, vec!["listing", "lookup", "definitions", "network"]);
    assert_eq!(manifest.outputs.first().map(String::as_str), Some("budget_difference.csv"));

    let cumulative = std::fs::read_to_string(out.join("gaged_fluxes_sum.csv")).expect("sum");
    let ds = cumulative
        .lines()
        .find(|l| l.starts_with("DS,"))
        .expect("downstream row");
    let header: Vec<&str> = cumulative.lines().next().expect("header").split(',').collect();
    let row: Vec<&str> = ds.split(',').collect();
    let value = |field: &str| -> f64 {
        let idx = header.iter().position(|h| *h == field).expect(field);
        row[idx].parse().expect("number")
    };
    assert_eq!(value("total_sim_flux_sp1_ts1"), 26.0);
    assert_eq!(value("total_sim_flux_sp2_ts1"), 22.0);
    assert_eq!(value("del_total_sim_flux"), -4.0);

    let tol = Tolerances::default();
    // Nets: river -30 -> -24, drain -4 -> -2, wells 0 -> -100.
    let summary = response.boundary_summary;
    assert!(nearly_equal(summary.net_delta_cfs, 8.0 / 86_400.0, tol));
    assert!(nearly_equal(summary.fraction_of_wells, -0.08, tol));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn rollup_is_skipped_without_network() {
    let dir = fixture_dir("no_network");
    let config = config(&dir, "");
    let (result, events) = collect_events(&config, &ScriptedRunner::clean());
    let response = result.expect("pipeline should succeed");

    assert!(!events.iter().any(|e| e.stage == PipelineStage::RunningSolver));
    assert!(!events.iter().any(|e| e.stage == PipelineStage::RollingUp));
    assert!(!response.output_dir.join("delta_q_summary.csv").exists());
    assert!(response.output_dir.join("gaged_reach_fluxes.asc").is_file());
    assert!(response.total_time_s >= 0.0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn solver_diagnostics_halt_before_parsing() {
    let dir = fixture_dir("solver_fail");
    let config = config(&dir, "solver:\n  program: mfnwt\n");
    let runner = ScriptedRunner::new(CommandOutput {
        exit_code: Some(0),
        stdout: "Floating-point exception: divide by zero\n".into(),
        stderr: String::new(),
    });

    let (result, events) = collect_events(&config, &runner);
    let err = result.expect_err("diagnostic keyword should fail the run");
    assert!(err.is_environment(), "{err}");
    assert!(matches!(err, AppError::DiagnosticKeyword { .. }));
    assert_eq!(events.len(), 1);
    assert!(!config.output_dir.join("gaged_reach_fluxes.asc").exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn stale_lookup_surfaces_as_consistency_error() {
    let dir = fixture_dir("stale_lookup");
    std::fs::write(
        dir.join("lookup.json"),
        r#"{ "reach_ids": { "riv:1": [101], "riv:2": [101, 102], "drn:1": [30], "drn:2": [30] },
             "reach_ids_from_2d_ids": {} }"#,
    )
    .expect("lookup");
    let config = config(&dir, "");

    let err = run_pipeline(&config, &ScriptedRunner::clean(), None).expect_err("lookup too short");
    assert_eq!(err.data_kind(), Some(gw_listing::ErrorKind::Consistency));

    let _ = std::fs::remove_dir_all(&dir);
}
