mod descriptor;
mod generator;
mod output;
mod plot;
mod properties;
mod request;
mod workload;

use crate::generator::KeyDistribution;
use crate::properties::Properties;
use crate::workload::{WorkloadConfig, WorkloadParams};
use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use thousands::Separable;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a replayable targets file: every key once, then a shuffled read/write mix
    Generate(GenerateArgs),
    /// Parse a targets file, print its composition and verify payload files exist
    Check {
        path: PathBuf,
    },
    /// Chart mean latency against request rate for two result CSV files
    Plot {
        baseline: PathBuf,
        candidate: PathBuf,

        #[arg(short, long, default_value = "comparison.svg")]
        output: PathBuf,

        /// Legend name of the baseline, defaults to its file stem
        #[arg(long)]
        baseline_label: Option<String>,

        /// Legend name of the candidate, defaults to its file stem
        #[arg(long)]
        candidate_label: Option<String>,
    },
}

#[derive(Args)]
struct GenerateArgs {
    #[arg(short, long, value_enum, default_value_t = WorkloadType::Mixed)]
    workload: WorkloadType,

    /// Base address of the key-value server
    #[arg(long)]
    url: Option<String>,

    /// Key space size
    #[arg(short = 'n', long)]
    keys: Option<u64>,

    /// Number of requests in the mixed phase
    #[arg(short = 't', long)]
    requests: Option<u64>,

    #[arg(long)]
    put_ratio: Option<f64>,

    /// Must equal 1 - put ratio when given
    #[arg(long)]
    get_ratio: Option<f64>,

    #[arg(long, value_enum)]
    distribution: Option<KeyDistribution>,

    #[arg(long)]
    zipf_exponent: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Body file referenced by every write
    #[arg(long)]
    payload: Option<PathBuf>,

    #[arg(long)]
    content_type: Option<String>,

    #[arg(short, long, default_value = "targets.txt")]
    output: PathBuf,

    /// Optional properties
    #[arg(short = 'p', long)]
    properties: Option<PathBuf>,
}

#[derive(Copy, Clone, ValueEnum)]
// Update get_wl when adding new variation
enum WorkloadType {
    Mixed,
    ReadHeavy,
    ReadWrite,
    WriteHeavy,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Generate(args) => generate(args),
        Command::Check { path } => {
            let report = descriptor::check(&path)?;
            println!("{report}");
            Ok(())
        }
        Command::Plot {
            baseline,
            candidate,
            output,
            baseline_label,
            candidate_label,
        } => {
            plot::compare(&baseline, baseline_label, &candidate, candidate_label, &output)?;
            println!("Chart written to {}", output.display());
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kvtargets={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn generate(args: GenerateArgs) -> Result<()> {
    let output = args.output.clone();
    let params = resolve_params(args)?;
    let wl = workload::generate(&params)?;
    descriptor::save(&output, wl.requests())?;
    info!(requests = wl.len(), "done");

    println!(
        "{}: {} initial writes followed by {} mixed requests in {}",
        wl.name,
        wl.stats.key_count.separate_with_underscores(),
        wl.stats.mixed_ops.separate_with_underscores(),
        output.display()
    );
    println!("{}", wl.stats);
    Ok(())
}

/// Preset first, then the properties file, then explicit flags.
fn resolve_params(args: GenerateArgs) -> Result<WorkloadParams> {
    let mut params = WorkloadParams::from_preset(get_wl(args.workload).as_ref());
    if let Some(path) = &args.properties {
        Properties::load(path)?.apply(&mut params);
    }

    let flags = Properties {
        name: None,
        url: args.url,
        keys: args.keys,
        requests: args.requests,
        put_ratio: args.put_ratio,
        get_ratio: args.get_ratio,
        distribution: args.distribution,
        zipf_exponent: args.zipf_exponent,
        seed: args.seed,
        payload: args.payload,
        content_type: args.content_type,
    };
    flags.apply(&mut params);
    Ok(params)
}

fn get_wl(wl: WorkloadType) -> Box<dyn WorkloadConfig> {
    match wl {
        WorkloadType::Mixed => Box::new(workload::mixed::Mixed),
        WorkloadType::ReadHeavy => Box::new(workload::read_heavy::ReadHeavy),
        WorkloadType::ReadWrite => Box::new(workload::read_write::ReadWrite),
        WorkloadType::WriteHeavy => Box::new(workload::write_heavy::WriteHeavy),
    }
}
