// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use gslb::{
    config::GslbConfig,
    constants::{ENV_CONFIG_PATH, TOKIO_WORKER_THREADS},
    gateway::{
        http::{build_client, BasicAuth},
        infoblox::InfobloxClient,
        memory::{MemoryDnsGateway, MemoryTrafficGateway},
        torbit::TorbitClient,
    },
    metrics,
    model::{GslbDesiredState, GslbProvisionedState, ReconcileResult},
    provider::GslbProvider,
    reconcilers::TopologyCache,
    request::GslbRequest,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};


/// GSLB reconciliation and verification for MTD traffic distribution and Infoblox DNS
#[derive(Debug, Parser)]
#[command(name = "gslb", version, about)]
struct Cli {
    /// Configuration file (falls back to the `GSLB_CONFIG` environment variable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write Prometheus metrics to this file when the command finishes
    #[arg(long, global = true)]
    metrics_file: Option<PathBuf>,

    /// Run against in-memory gateways instead of the configured services
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or update an application's GSLB configuration
    Create {
        /// Desired state JSON file
        #[arg(long)]
        desired: PathBuf,
        /// Verify the result after a successful create
        #[arg(long)]
        verify: bool,
    },
    /// Compare remote state with a desired state without changing anything
    Status {
        #[arg(long)]
        desired: PathBuf,
    },
    /// Verify remote state against a desired state
    Verify {
        #[arg(long)]
        desired: PathBuf,
        /// Result JSON of a previous create; a status check is run when omitted
        #[arg(long)]
        result: Option<PathBuf>,
    },
    /// Remove an application's GSLB configuration
    Delete {
        /// Provisioned state JSON file
        #[arg(long)]
        provisioned: PathBuf,
        /// Verify the removal after a successful delete
        #[arg(long)]
        verify: bool,
    },
    /// Print the desired state derived from a platform deployment request
    Plan {
        #[arg(long)]
        request: PathBuf,
    },
    /// Print a shell completion script
    Completions { shell: Shell },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("gslb-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

/// Initialize logging.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT=json`. Logs go to
/// stderr so stdout carries only command output.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<ExitCode> {
    let code = match &cli.command {
        Command::Create { desired, verify } => {
            let desired: GslbDesiredState = read_json(desired).await?;
            let provider = build_provider(&cli, &desired)?;
            let result = provider.create(&desired).await;
            print_json(&result)?;
            let mut passed = !result.is_failed();
            if passed && *verify {
                passed = report_verification(provider.verify(&desired, &result).await)?;
            }
            exit_code(passed)
        }
        Command::Status { desired } => {
            let desired: GslbDesiredState = read_json(desired).await?;
            let provider = build_provider(&cli, &desired)?;
            let result = provider.check_status(&desired).await;
            print_json(&result)?;
            exit_code(!result.is_failed())
        }
        Command::Verify { desired, result } => {
            let desired: GslbDesiredState = read_json(desired).await?;
            let provider = build_provider(&cli, &desired)?;
            let result: ReconcileResult = match result {
                Some(path) => read_json(path).await?,
                None => {
                    debug!("No result given, running a status check first");
                    provider.check_status(&desired).await
                }
            };
            exit_code(report_verification(provider.verify(&desired, &result).await)?)
        }
        Command::Delete {
            provisioned,
            verify,
        } => {
            let provisioned: GslbProvisionedState = read_json(provisioned).await?;
            let config = load_config(cli.config.as_deref())?;
            let provider = if cli.dry_run {
                dry_run_provider(&config, &[])
            } else {
                live_provider(&config)?
            };
            let result = provider.delete(&provisioned).await;
            print_json(&result)?;
            let mut passed = !result.is_failed();
            if passed && *verify {
                passed = report_verification(provider.verify_delete(&provisioned).await)?;
            }
            exit_code(passed)
        }
        Command::Plan { request } => {
            let request: GslbRequest = read_json(request).await?;
            let desired = request
                .to_desired_state()
                .context("Failed to derive desired state from request")?;
            print_json(&desired)?;
            ExitCode::SUCCESS
        }
        Command::Completions { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "gslb", &mut std::io::stdout());
            return Ok(ExitCode::SUCCESS);
        }
    };

    if let Some(path) = &cli.metrics_file {
        write_metrics(path).await?;
    }
    Ok(code)
}

fn load_config(path: Option<&Path>) -> Result<GslbConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .with_context(|| {
                format!("No configuration given: use --config or set {ENV_CONFIG_PATH}")
            })?,
    };
    info!(path = %path.display(), "Loading configuration");
    GslbConfig::from_file(&path)
}

fn build_provider(cli: &Cli, desired: &GslbDesiredState) -> Result<GslbProvider> {
    let config = load_config(cli.config.as_deref())?;
    if cli.dry_run {
        let clouds: Vec<&str> = desired.targets.iter().map(|t| t.cloud.as_str()).collect();
        return Ok(dry_run_provider(&config, &clouds));
    }
    live_provider(&config)
}

/// Provider backed by the MTD and Infoblox HTTP APIs.
fn live_provider(config: &GslbConfig) -> Result<GslbProvider> {
    let mtd_http = build_client(Duration::from_secs(config.mtd.timeout_secs), false)?;
    let traffic = TorbitClient::new(
        mtd_http,
        &config.mtd.url,
        BasicAuth {
            user: config.mtd.user.clone(),
            password: config.mtd.auth_key.clone(),
        },
        config.mtd.group_id,
    );

    if !config.dns.tls_verify {
        warn!(host = %config.dns.host, "TLS certificate verification disabled for DNS gateway");
    }
    let dns_http = build_client(
        Duration::from_secs(config.dns.timeout_secs),
        !config.dns.tls_verify,
    )?;
    let dns = InfobloxClient::new(
        dns_http,
        &config.dns.host,
        &config.dns.wapi_version,
        BasicAuth {
            user: config.dns.user.clone(),
            password: config.dns.password.clone(),
        },
    );

    Ok(GslbProvider::with_topology(
        Arc::new(traffic),
        Arc::new(dns),
        config.mtd.gslb_base_domain.clone(),
        Arc::new(TopologyCache::new()),
        config.retry_policy(),
    ))
}

/// Provider backed by empty in-memory gateways whose topology knows `clouds`.
fn dry_run_provider(config: &GslbConfig, clouds: &[&str]) -> GslbProvider {
    info!("Dry run, using in-memory gateways");
    let topology = (1u64..)
        .zip(clouds)
        .map(|(id, name)| gslb::gateway::DcCloud {
            id,
            name: (*name).to_string(),
            data_center_id: id,
        })
        .collect();

    GslbProvider::with_topology(
        Arc::new(MemoryTrafficGateway::with_topology(topology)),
        Arc::new(MemoryDnsGateway::new()),
        config.mtd.gslb_base_domain.clone(),
        Arc::new(TopologyCache::new()),
        config.retry_policy(),
    )
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("Failed to render output")?;
    println!("{rendered}");
    Ok(())
}

/// Print a verification outcome and return whether it passed.
fn report_verification(outcome: Result<(), gslb::errors::VerificationError>) -> Result<bool> {
    let report = match &outcome {
        Ok(()) => serde_json::json!({ "verified": true }),
        Err(e) => serde_json::json!({
            "verified": false,
            "condition": e.condition,
            "expected": e.expected,
            "actual": e.actual,
            "message": e.to_string(),
        }),
    };
    print_json(&report)?;
    Ok(outcome.is_ok())
}

async fn write_metrics(path: &Path) -> Result<()> {
    let rendered = metrics::gather_metrics().map_err(|e| anyhow!("Failed to gather metrics: {e}"))?;
    tokio::fs::write(path, rendered)
        .await
        .with_context(|| format!("Failed to write metrics to {}", path.display()))
}

fn exit_code(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
