#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pairwise_robustness::plot::{parse_size, NoopPlotSink, PlotSink, SvgPlotSink};
use pairwise_robustness::{
    run_experiment, Benchmark, CompareKey, ExperimentConfig, ExperimentReport, NoisePolicy,
};

#[derive(Parser)]
#[command(
    name = "robustness",
    version,
    about = "Noisy pairwise ranking vs. CMA-ES convergence"
)]
struct Cli {
    /// Log filter (e.g. "debug", "pairwise_robustness=debug"); defaults to RUST_LOG or "info"
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the noise sweep
    Run {
        /// JSON config file; flags below override its fields
        #[arg(long)]
        config: Option<PathBuf>,
        /// Benchmark function (repeatable or comma-separated)
        #[arg(long = "function", value_delimiter = ',')]
        functions: Vec<String>,
        /// Dimensionalities, comma-separated
        #[arg(long, value_delimiter = ',')]
        n_var: Option<Vec<usize>>,
        /// Noise probabilities, comma-separated
        #[arg(long, value_delimiter = ',')]
        p_err: Option<Vec<f64>>,
        #[arg(long)]
        max_eval: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        sigma0: Option<f64>,
        #[arg(long, value_enum)]
        noise_policy: Option<CliNoisePolicy>,
        /// Compare this candidate coordinate instead of the objective value
        #[arg(long)]
        component: Option<usize>,
        /// JSONL output, one record per run
        #[arg(long)]
        out: Option<PathBuf>,
        /// CSV of every trace point
        #[arg(long)]
        curve_csv: Option<PathBuf>,
        /// Directory for one SVG per function and n_var
        #[arg(long)]
        plot_dir: Option<PathBuf>,
        /// SVG size in pixels as WIDTHxHEIGHT (used with --plot-dir)
        #[arg(long, value_parser = parse_size, requires = "plot_dir")]
        plot_size: Option<(u32, u32)>,
    },
    /// List supported benchmark functions
    Functions,
    /// Print the default configuration as JSON
    Config,
}

/// CLI-facing noise policy enum (clap::ValueEnum).
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliNoisePolicy {
    PerPair,
    PerComparison,
}

impl From<CliNoisePolicy> for NoisePolicy {
    fn from(value: CliNoisePolicy) -> Self {
        match value {
            CliNoisePolicy::PerPair => NoisePolicy::PerPair,
            CliNoisePolicy::PerComparison => NoisePolicy::PerComparison,
        }
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Run {
            config,
            functions,
            n_var,
            p_err,
            max_eval,
            seed,
            sigma0,
            noise_policy,
            component,
            out,
            curve_csv,
            plot_dir,
            plot_size,
        } => {
            let mut cfg = match config {
                Some(path) => ExperimentConfig::load(path)?,
                None => ExperimentConfig::default(),
            };
            if !functions.is_empty() {
                cfg.functions = functions;
            }
            if let Some(n_var) = n_var {
                cfg.n_var_list = n_var;
            }
            if let Some(p_err) = p_err {
                cfg.p_err_list = p_err;
            }
            if let Some(max_eval) = max_eval {
                cfg.max_eval = max_eval;
            }
            if let Some(seed) = seed {
                cfg.seed = seed;
            }
            if let Some(sigma0) = sigma0 {
                cfg.sigma0 = sigma0;
            }
            if let Some(policy) = noise_policy {
                cfg.noise_policy = policy.into();
            }
            if let Some(d) = component {
                cfg.compare_key = CompareKey::Component(d);
            }
            cfg.validate()?;

            let report = match plot_dir {
                Some(dir) => {
                    let mut sink = SvgPlotSink::new(dir);
                    if let Some((width, height)) = plot_size {
                        sink = sink.with_size(width, height);
                    }
                    run_with_sink(&cfg, &mut sink)?
                }
                None => run_with_sink(&cfg, &mut NoopPlotSink)?,
            };

            match out {
                Some(path) => {
                    let mut file = BufWriter::new(File::create(path)?);
                    for run in &report.runs {
                        let line = serde_json::to_string(run)?;
                        writeln!(file, "{line}")?;
                    }
                    file.flush()?;
                }
                None => {
                    for run in &report.runs {
                        println!(
                            "{} n_var={} p_err={} iterations={} final_best={}",
                            run.function,
                            run.n_var,
                            run.p_err,
                            run.iterations,
                            run.final_best
                                .map(|v| format!("{v:.6e}"))
                                .unwrap_or_else(|| "-".to_string())
                        );
                    }
                }
            }

            if let Some(csv_path) = curve_csv {
                let mut csv = BufWriter::new(File::create(csv_path)?);
                writeln!(csv, "function,n_var,p_err,iteration,evaluations,best")?;
                for run in &report.runs {
                    for point in &run.trace {
                        writeln!(
                            csv,
                            "{},{},{},{},{},{}",
                            run.function,
                            run.n_var,
                            run.p_err,
                            point.iteration,
                            point.evaluations,
                            point.best
                        )?;
                    }
                }
                csv.flush()?;
            }
        }
        Commands::Functions => {
            for function in Benchmark::ALL {
                println!("{function}");
            }
        }
        Commands::Config => {
            let json = serde_json::to_string_pretty(&ExperimentConfig::default())?;
            println!("{json}");
        }
    }

    Ok(())
}

fn run_with_sink(
    cfg: &ExperimentConfig,
    sink: &mut dyn PlotSink,
) -> Result<ExperimentReport, Box<dyn std::error::Error>> {
    Ok(run_experiment(cfg, sink)?)
}
