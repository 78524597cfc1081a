//! WCS gateway command line.
//!
//! Translates a WCS 2.0 GetCoverage request (KVP or XML) into the DAP
//! data-access URL that serves it, using the configured coverage catalog.

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use wcs_common::WcsError;
use wcs_gateway::config::GatewayConfig;
use wcs_gateway::Gateway;

#[derive(Parser, Debug)]
#[command(name = "wcs-gateway")]
#[command(about = "Translate WCS 2.0 GetCoverage requests into DAP data-access URLs")]
#[command(group(
    ArgGroup::new("input")
        .required(true)
        .args(["request", "xml", "describe", "series"]),
))]
struct Args {
    /// Gateway configuration file
    #[arg(short, long, default_value = "config/gateway.yaml", env = "WCS_CONFIG")]
    config: PathBuf,

    /// Log level
    #[arg(long, default_value = "info", env = "WCS_LOG_LEVEL")]
    log_level: String,

    /// GetCoverage KVP query string
    #[arg(short, long)]
    request: Option<String>,

    /// File holding a GetCoverage XML document
    #[arg(short, long)]
    xml: Option<PathBuf>,

    /// Print the description of a coverage
    #[arg(long)]
    describe: Option<String>,

    /// Print the envelope of a dataset series
    #[arg(long)]
    series: Option<String>,

    /// Print the full result as JSON instead of just the URL
    #[arg(long)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "WCS_LOG_JSON")]
    log_json: bool,
}

fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create Tokio runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: Args) -> Result<ExitCode> {
    info!(config = %args.config.display(), "Starting WCS gateway");
    let config = GatewayConfig::load(&args.config)?;
    let gateway = Gateway::from_config(&config)
        .await
        .context("Failed to build catalog")?;

    match execute(&gateway, &args).await? {
        Ok(output) => {
            println!("{}", output);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            error!(code = err.exception_code(), status = err.http_status_code(), "{}", err);
            println!("{}", err.to_exception_report());
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Run the requested operation. The outer error is a gateway failure, the
/// inner one a WCS exception to report to the client.
async fn execute(gateway: &Gateway, args: &Args) -> Result<Result<String, WcsError>> {
    if let Some(coverage_id) = &args.describe {
        return Ok(gateway
            .describe(coverage_id)
            .await
            .map(|description| format!("{:#?}", description)));
    }

    if let Some(series_id) = &args.series {
        return Ok(gateway.series_envelope(series_id).await.map(|envelope| {
            envelope.unwrap_or_else(|| format!("Dataset series '{}' has no extent", series_id))
        }));
    }

    let access = match (&args.request, &args.xml) {
        (Some(query), _) => gateway.get_coverage_kvp(query).await,
        (None, Some(path)) => {
            let xml = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read: {:?}", path))?;
            gateway.get_coverage_xml(&xml).await
        }
        (None, None) => anyhow::bail!("No GetCoverage request given"),
    };

    Ok(match access {
        Ok(access) if args.json => {
            Ok(serde_json::to_string_pretty(&access).context("Failed to render JSON")?)
        }
        Ok(access) => Ok(access.url),
        Err(err) => Err(err),
    })
}
