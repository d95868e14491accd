use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use persee_series::heat_pump::TemperatureSeries;
use persee_series::{sensitivity, AssemblyError, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "persee-series")]
#[command(about = "Build hourly PERSEE input series from profiles and external data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble the series described by a run configuration
    Assemble {
        /// Path to the run configuration (TOML)
        #[arg(long)]
        config: PathBuf,

        /// Seed for the profile jitter, overrides profiles.seed
        #[arg(long)]
        seed: Option<u64>,

        /// Output path, overrides output.path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write sensitivity tables from a baseline results PLAN file
    Sensitivity {
        #[arg(long)]
        plan: PathBuf,

        /// Constraint model names to sweep
        #[arg(long = "target", required = true)]
        targets: Vec<String>,

        /// Location label used in the output file names
        #[arg(long)]
        location: String,

        #[arg(long, default_value = "tab_ech")]
        out_dir: PathBuf,
    },
    /// Print mean and seasonal temperatures of a weather export
    Weather {
        file: PathBuf,

        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,
    },
}

fn run(cli: Cli) -> Result<(), AssemblyError> {
    match cli.command {
        Command::Assemble {
            config,
            seed,
            output,
        } => {
            let mut run_config = RunConfig::load(&config)?;
            if let Some(output) = output {
                run_config.output.path = output;
            }
            let path = persee_series::run(&run_config, seed)?;
            info!("Series written to {}", path.display());
        }
        Command::Sensitivity {
            plan,
            targets,
            location,
            out_dir,
        } => {
            let written = sensitivity::write_tables(&plan, &targets, &location, &out_dir)?;
            info!("Wrote {} sensitivity tables", written.len());
        }
        Command::Weather { file, latitude } => {
            let temps = TemperatureSeries::from_csv(&file)?;
            let (summer, winter) = temps.seasonal_means(latitude);
            let show = |v: Option<f64>| v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));
            println!(
                "{}: mean {} winter {} summer {}",
                file.display(),
                show(temps.mean()),
                show(winter),
                show(summer)
            );
        }
    }
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "persee_series=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!("{e}");
        std::process::exit(1);
    }
}
