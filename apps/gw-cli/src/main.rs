mod logging;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Parser, Subcommand};
use gw_app::{
    AppError, AppResult, PipelineConfig, PipelineProgressEvent, SystemCommandRunner, run_pipeline,
};
use gw_core::{BcType, Snapshot, StressPeriod};
use gw_listing::{
    BoundarySummary, BudgetParser, ListingParser, ReachLookup, render_boundary_summary,
    render_budget_difference,
};
use gw_reach::{
    GagedReachDefinitions, ReachAggregator, ReachReportOptions, Rollup, RollupOptions,
    StationFluxReport, UpstreamNetwork, Withdrawal, render_reach_report,
};
use gw_results::OutputDir;

#[derive(Parser)]
#[command(name = "gwflux")]
#[command(about = "gwflux - MODFLOW listing-file flux post-processing", long_about = None)]
struct Cli {
    /// Log at DEBUG instead of INFO
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Also write the log to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline described by a config file
    Run {
        /// Path to the pipeline YAML file
        config_path: PathBuf,
    },
    /// Parse boundary fluxes and write the per-gaged-reach report
    Fluxes {
        #[arg(long)]
        listing: PathBuf,
        #[arg(long)]
        lookup: PathBuf,
        #[arg(long)]
        definitions: PathBuf,
        /// Report file to write
        #[arg(long)]
        output: PathBuf,
        /// Report column order, e.g. drn,riv,ghb
        #[arg(long, value_delimiter = ',', default_values = ["drn", "riv", "ghb"])]
        bc_types: Vec<BcType>,
        #[arg(long, default_value_t = 1.0)]
        conversion_factor: f64,
    },
    /// Difference the volumetric budget between two snapshots
    Budget {
        #[arg(long)]
        listing: PathBuf,
        /// Difference table to write
        #[arg(long)]
        output: PathBuf,
        /// First snapshot as ts,sp
        #[arg(long, value_parser = parse_snapshot, default_value = "1,1")]
        t1: Snapshot,
        /// Second snapshot as ts,sp
        #[arg(long, value_parser = parse_snapshot, default_value = "1,2")]
        t2: Snapshot,
    },
    /// Cumulate a per-station report over the upstream network
    Rollup {
        /// Per-gaged-reach report written by `fluxes`
        #[arg(long)]
        report: PathBuf,
        #[arg(long)]
        network: PathBuf,
        #[arg(long)]
        withdrawal_mgd: f64,
        #[arg(long)]
        output_dir: PathBuf,
        /// Count each station's own reach even when its row omits it
        #[arg(long)]
        include_downstream_station: bool,
    },
    /// Copy one stress period's lookup onto every other period
    LookupAuto {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value = "1")]
        source_period: StressPeriod,
    },
    /// Export the lookup as one CSV per boundary-condition type
    LookupExport {
        #[arg(long)]
        input: PathBuf,
        /// Files are written as <prefix>_<bc>.csv
        #[arg(long)]
        output_prefix: PathBuf,
    },
}

fn parse_snapshot(s: &str) -> Result<Snapshot, String> {
    let (ts, sp) = s
        .split_once(',')
        .ok_or_else(|| format!("expected ts,sp but found '{s}'"))?;
    let parse = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("'{v}': {e}"));
    Snapshot::from_raw(parse(ts)?, parse(sp)?).map_err(|e| e.to_string())
}

fn main() -> AppResult<()> {
    let Cli {
        verbose,
        log_file,
        command,
    } = Cli::parse();
    let init_logging = || logging::init(verbose, log_file.as_deref());

    match command {
        Commands::Run { config_path } => {
            let config = PipelineConfig::load(&config_path)?;
            let log_file = log_file.clone().unwrap_or_else(|| config.log_path());
            logging::init(verbose, Some(&log_file))?;
            cmd_run(&config)
        }
        Commands::Fluxes {
            listing,
            lookup,
            definitions,
            output,
            bc_types,
            conversion_factor,
        } => {
            init_logging()?;
            cmd_fluxes(
                &listing,
                &lookup,
                &definitions,
                &output,
                bc_types,
                conversion_factor,
            )
        }
        Commands::Budget {
            listing,
            output,
            t1,
            t2,
        } => {
            init_logging()?;
            cmd_budget(&listing, &output, t1, t2)
        }
        Commands::Rollup {
            report,
            network,
            withdrawal_mgd,
            output_dir,
            include_downstream_station,
        } => {
            init_logging()?;
            cmd_rollup(
                &report,
                &network,
                withdrawal_mgd,
                &output_dir,
                include_downstream_station,
            )
        }
        Commands::LookupAuto {
            input,
            output,
            source_period,
        } => {
            init_logging()?;
            cmd_lookup_auto(&input, &output, source_period)
        }
        Commands::LookupExport {
            input,
            output_prefix,
        } => {
            init_logging()?;
            cmd_lookup_export(&input, &output_prefix)
        }
    }
}

fn cmd_run(config: &PipelineConfig) -> AppResult<()> {
    println!("Running pipeline on {}", config.listing_file.display());

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = run_pipeline(
        config,
        &SystemCommandRunner,
        Some(&mut |event: PipelineProgressEvent| {
            let emit_now = last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    println!("✓ Pipeline completed: {}", response.run_id);
    println!("  Output: {}", response.output_dir.display());
    println!("  Stress periods: {}", response.manifest.stress_period_count);
    println!("  Files written: {}", response.manifest.outputs.len());
    print_boundary_summary(&response.boundary_summary);
    println!("  Total time: {:.2}s", response.total_time_s);
    Ok(())
}

fn cmd_fluxes(
    listing: &Path,
    lookup: &Path,
    definitions: &Path,
    output: &Path,
    bc_types: Vec<BcType>,
    conversion_factor: f64,
) -> AppResult<()> {
    if bc_types.is_empty() {
        return Err(AppError::InvalidInput("--bc-types must name at least one package".into()));
    }
    let lookup = ReachLookup::load(lookup)?;
    let fluxes = ListingParser::new(&lookup)
        .with_bc_types(&bc_types)
        .parse_file(listing)?;
    let definitions = GagedReachDefinitions::load(definitions)?;
    let reach_fluxes =
        ReachAggregator::new(&lookup, &fluxes).aggregate(&definitions, fluxes.stress_period_count())?;
    let options = ReachReportOptions {
        bc_types,
        conversion_factor,
        ..ReachReportOptions::default()
    };
    std::fs::write(output, render_reach_report(&reach_fluxes, &options)?)?;

    println!(
        "✓ {} gaged reaches over {} stress period(s) written to {}",
        definitions.len(),
        fluxes.stress_period_count(),
        output.display()
    );
    Ok(())
}

fn cmd_budget(listing: &Path, output: &Path, t1: Snapshot, t2: Snapshot) -> AppResult<()> {
    let budget = BudgetParser::new().parse_file(listing)?;
    let diff = budget.difference(t1, t2)?;
    let guard = gw_core::RatioGuard::default();
    std::fs::write(output, render_budget_difference(&diff, guard)?)?;

    println!("✓ Budget difference {t1} -> {t2} written to {}", output.display());
    print_boundary_summary(&BoundarySummary::from_difference(&diff, guard)?);
    Ok(())
}

fn cmd_rollup(
    report: &Path,
    network: &Path,
    withdrawal_mgd: f64,
    output_dir: &Path,
    include_downstream_station: bool,
) -> AppResult<()> {
    let report = StationFluxReport::load(report)?;
    let network = UpstreamNetwork::load(network)?;
    let withdrawal = Withdrawal::from_mgd(withdrawal_mgd);
    let options = RollupOptions {
        include_downstream_station,
        ..RollupOptions::default()
    };
    let rollup = Rollup::cumulate(&report, &network, options)?;

    let mut out = OutputDir::new(output_dir)?;
    out.write_text(gw_app::pipeline::CUMULATIVE_FILE, &rollup.render_cumulative())?;
    out.write_text(gw_app::pipeline::DETAILS_FILE, &rollup.render_details(&withdrawal)?)?;
    out.write_text(gw_app::pipeline::SUMMARY_FILE, &rollup.render_summary(&withdrawal)?)?;

    println!(
        "✓ {} stations rolled up into {}",
        rollup.stations().len(),
        out.root().display()
    );
    Ok(())
}

fn cmd_lookup_auto(input: &Path, output: &Path, source_period: StressPeriod) -> AppResult<()> {
    let mut lookup = ReachLookup::load(input)?;
    let replaced = lookup.replicate_period(source_period)?;
    lookup.save(output)?;
    println!(
        "✓ Replicated stress period {source_period} onto {replaced} period(s); saved {}",
        output.display()
    );
    Ok(())
}

fn cmd_lookup_export(input: &Path, output_prefix: &Path) -> AppResult<()> {
    let lookup = ReachLookup::load(input)?;
    let tables = lookup.export_csv()?;
    if tables.is_empty() {
        println!("Lookup holds no sequences; nothing exported");
        return Ok(());
    }
    for (bc_type, csv) in tables {
        let mut name = output_prefix.as_os_str().to_os_string();
        name.push(format!("_{}.csv", bc_type.code()));
        let path = PathBuf::from(name);
        std::fs::write(&path, csv)?;
        println!("  {bc_type}: {}", path.display());
    }
    Ok(())
}

fn print_boundary_summary(summary: &BoundarySummary) {
    for line in render_boundary_summary(summary).lines() {
        println!("  {line}");
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &PipelineProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {msg}"));
    }
    print!("{line:<120}");
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn snapshot_argument_is_ts_then_sp() {
        let snap = parse_snapshot("3,2").unwrap();
        assert_eq!(snap, Snapshot::from_raw(3, 2).unwrap());
        assert!(parse_snapshot("3").is_err());
        assert!(parse_snapshot("0,1").is_err());
    }

    #[test]
    fn fluxes_defaults() {
        let cli = Cli::parse_from([
            "gwflux",
            "fluxes",
            "--listing",
            "m.lst",
            "--lookup",
            "l.json",
            "--definitions",
            "d.csv",
            "--output",
            "r.asc",
            "--bc-types",
            "riv,drn",
        ]);
        match cli.command {
            Commands::Fluxes {
                bc_types,
                conversion_factor,
                ..
            } => {
                assert_eq!(bc_types, vec![BcType::River, BcType::Drain]);
                assert_eq!(conversion_factor, 1.0);
            }
            _ => panic!("expected fluxes"),
        }
    }
}
