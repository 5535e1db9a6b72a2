//! The shipped demo configuration runs end to end.

use std::path::Path;

use gw_app::{AppResult, CommandOutput, CommandRunner, CommandSpec, PipelineConfig, run_pipeline};

struct NoSolver;

impl CommandRunner for NoSolver {
    fn run(&self, cmd: &CommandSpec) -> AppResult<CommandOutput> {
        panic!("demo config should not run {}", cmd.program);
    }
}

fn field(csv: &str, row_id: &str, column: &str) -> f64 {
    let mut lines = csv.lines();
    let header: Vec<&str> = lines.next().expect("header").split(',').collect();
    let idx = header
        .iter()
        .position(|h| *h == column)
        .unwrap_or_else(|| panic!("no column {column}"));
    let row = lines
        .find(|l| l.starts_with(&format!("{row_id},")))
        .unwrap_or_else(|| panic!("no row {row_id}"));
    row.split(',').nth(idx).expect("value").parse().expect("number")
}

#[test]
fn demo_pipeline_rolls_up_lower_creek() {
    let mut config = PipelineConfig::load(Path::new("../../demos/config.yaml")).expect("demo config");
    config.output_dir = std::env::temp_dir().join(format!("gw_app_demo_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&config.output_dir);

    let response = run_pipeline(&config, &NoSolver, None).expect("demo pipeline");
    assert_eq!(response.manifest.stress_period_count, 2);

    let sums = std::fs::read_to_string(response.output_dir.join("gaged_fluxes_sum.csv")).expect("sums");
    assert_eq!(field(&sums, "05420500", "total_sim_flux_sp1_ts1"), -1880.5);
    assert_eq!(field(&sums, "05420600", "del_total_sim_flux"), 35.75);
    assert_eq!(field(&sums, "05420680", "total_sim_flux_sp2_ts1"), -2712.5);
    assert_eq!(field(&sums, "05420680", "del_total_sim_flux"), 123.0);

    let summary = std::fs::read_to_string(response.output_dir.join("delta_q_summary.csv")).expect("summary");
    let change = field(&summary, "05420680", "simulated_change_in_flow_cfs");
    assert!((change - 123.0 / 86_400.0).abs() < 1e-9);

    let _ = std::fs::remove_dir_all(&config.output_dir);
}
