//! make_leader - move Elasticsearch leadership to this machine
//!
//! Reads every node's address from `{LOCAL,REMOTE}_{SITE}_ELASTICSEARCH_[VOTER_]IP`
//! and exits 0 once the local machine holds the voting majority of every
//! site, 1 on any failure.

use clap::Parser;
use make_leader::utils::constants::{
    APP_NAME, APP_VERSION, DEFAULT_ELASTICSEARCH_PORT, ERROR_EXIT_CODE, SUCCESS_EXIT_CODE,
};
use make_leader::{AppError, ClusterConfig, LeaderElector, Outcome};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "make_leader",
    about = "Make this machine the Elasticsearch cluster leader by excluding the remote voters",
    version
)]
struct Args {
    /// Sites to process, one Elasticsearch cluster each
    #[arg(long, env = "MAKE_LEADER_SITES", value_delimiter = ',', default_value = "cs,phy")]
    sites: Vec<String>,

    /// Port for node addresses that don't carry one
    #[arg(short = 'p', long, env = "ELASTICSEARCH_PORT", default_value_t = DEFAULT_ELASTICSEARCH_PORT)]
    port: u16,

    /// Per-request timeout in seconds (default: wait indefinitely)
    #[arg(long, env = "MAKE_LEADER_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Only report what would be excluded; change nothing
    #[arg(long)]
    dry_run: bool,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    let args = Args::parse();

    // Logs go to stderr, stdout carries the report
    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    info!("{} v{}", APP_NAME, APP_VERSION);

    let result = run(&args).await;
    if let Some(app) = result.as_ref().err().and_then(|e| e.downcast_ref::<AppError>()) {
        warn!("{} failed with {}", APP_NAME, app.code_str());
    }

    let (code, lines) = report(&result);
    for line in lines {
        println!("{}", line);
    }

    std::process::exit(code)
}

async fn run(args: &Args) -> eyre::Result<Outcome> {
    let config = ClusterConfig::from_env(args.sites.clone(), args.port)?
        .with_request_timeout(args.timeout_secs.map(Duration::from_secs));

    let elector = LeaderElector::new(config)?;
    Ok(elector.run(args.dry_run).await?)
}

/// Exit code and stdout lines for a finished run
fn report(result: &eyre::Result<Outcome>) -> (i32, Vec<String>) {
    match result {
        Ok(outcome) => (SUCCESS_EXIT_CODE, outcome_lines(outcome)),
        Err(e) => {
            let line = match e.downcast_ref::<AppError>() {
                Some(app) => format!("ERROR: {}", app.message),
                None => format!("ERROR: {:#}", e),
            };
            (ERROR_EXIT_CODE, vec![line])
        }
    }
}

fn outcome_lines(outcome: &Outcome) -> Vec<String> {
    let mut lines = vec![outcome.message().to_string()];
    match outcome {
        Outcome::AlreadyLeader(_) => {}
        Outcome::BecameLeader { excluded, .. } => {
            lines.extend(excluded.iter().map(|exclusion| format!("  {}", exclusion)));
        }
        Outcome::WouldExclude { report, planned } => {
            lines.push(format!("  {}", report.summary()));
            lines.extend(planned.iter().map(|exclusion| format!("  {} (planned)", exclusion)));
        }
    }
    lines
}
