//! tagflood command line
//!
//! Usage:
//!     tagflood --bench fleet.json recon --ip-list 10.0.0.1,10.0.0.2 -o tags.json
//!     tagflood --bench fleet.json flood -f tags.json --interval 0.5

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tagflood::simulator::SimulatedFleet;
use tagflood::{
    parse_fleet, CancelToken, ClientConfig, FloodConfig, FloodEngine, FloodPlan, JsonWorkbook,
    Reconnaissance, TagError, DEFAULT_PORT,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "tagflood", about = "Gather PLC tags and flood them back")]
struct Args {
    /// Controller port
    #[arg(short, long, default_value_t = DEFAULT_PORT, global = true)]
    port: u16,

    /// Route to the emulator processor slot
    #[arg(long, global = true)]
    emulator: bool,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 5000, global = true)]
    timeout_ms: u64,

    /// Simulated fleet fixture (JSON) used as the controller backend
    #[arg(long, env = "TAGFLOOD_BENCH", global = true)]
    bench: Option<PathBuf>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Gather tags from every controller and save one sheet per device
    Recon {
        /// Controller addresses, e.g. 10.0.0.1,10.0.0.2
        #[arg(long)]
        ip_list: Option<String>,

        /// File holding a comma or newline separated address list
        #[arg(long)]
        ip_file: Option<PathBuf>,

        /// Output workbook
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write workbook values to the controllers until interrupted
    Flood {
        /// Input workbook
        #[arg(short = 'f', long)]
        tags_file: Option<PathBuf>,

        /// Pause between iterations in seconds (prompted when omitted)
        #[arg(short, long)]
        interval: Option<f64>,
    },
}

fn client_config(args: &Args) -> ClientConfig {
    let config = ClientConfig::new()
        .with_port(args.port)
        .with_timeout(Duration::from_millis(args.timeout_ms));
    if args.emulator {
        config.emulated()
    } else {
        config
    }
}

fn prompt_interval() -> anyhow::Result<f64> {
    println!("Please enter interval (sec):");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    line.trim()
        .parse()
        .with_context(|| format!("'{}' is not a number of seconds", line.trim()))
}

fn recon(
    fleet: SimulatedFleet,
    config: ClientConfig,
    ip_list: Option<String>,
    ip_file: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let addresses = match (ip_list, ip_file) {
        (Some(list), _) => parse_fleet(&list),
        (None, Some(path)) => parse_fleet(
            &std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?,
        ),
        (None, None) => {
            eprintln!("Specify ip. Use --ip-list or --ip-file");
            return Ok(());
        }
    };
    let Some(output) = output else {
        eprintln!("Provide output file path. Use -o");
        return Ok(());
    };

    let report = Reconnaissance::new(fleet, config).run(&addresses);
    match report.persist(&JsonWorkbook::new(&output)) {
        Ok(()) => {
            tracing::info!("Tags have been saved in {}", output.display());
            Ok(())
        }
        Err(TagError::EmptyResult) => {
            tracing::warn!("All devices are not responding. Tags have not been saved.");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

async fn flood(
    fleet: SimulatedFleet,
    config: ClientConfig,
    tags_file: Option<PathBuf>,
    interval: Option<f64>,
) -> anyhow::Result<()> {
    let Some(tags_file) = tags_file else {
        eprintln!("Provide tag file path. Use -f");
        return Ok(());
    };
    let plan = FloodPlan::load(&JsonWorkbook::new(&tags_file))
        .with_context(|| format!("loading {}", tags_file.display()))?;
    let interval = match interval {
        Some(secs) => secs,
        None => tokio::task::spawn_blocking(prompt_interval).await??,
    };
    let mut engine = FloodEngine::new(fleet, config, plan, FloodConfig::from_secs(interval)?)?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after this iteration");
            on_interrupt.cancel();
        }
    });

    let summary = tokio::task::spawn_blocking(move || engine.run(&cancel)).await?;
    tracing::info!(
        iterations = summary.iterations,
        rows = summary.rows_written,
        skipped = summary.devices_skipped,
        "Drying... See Ya!"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tagflood=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = client_config(&args);

    let Some(bench) = args.bench.as_ref() else {
        eprintln!("No controller backend configured. Use --bench <fleet.json>");
        return Ok(());
    };
    let fleet = SimulatedFleet::load(bench)
        .with_context(|| format!("loading bench fleet {}", bench.display()))?;

    match args.action {
        Action::Recon {
            ip_list,
            ip_file,
            output,
        } => recon(fleet, config, ip_list, ip_file, output),
        Action::Flood {
            tags_file,
            interval,
        } => flood(fleet, config, tags_file, interval).await,
    }
}
