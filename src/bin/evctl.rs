//! EvCtl - Command line tool for driving e-voting elections
//!
//! Usage:
//!   evctl status             - Show the election status and legal actions
//!   evctl actions            - List the legal actions
//!   evctl run <action>       - Perform an action and wait for it to settle
//!   evctl init               - Initialize the DKG actor on every node
//!   evctl check-config       - Validate the configuration file

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

use evoting_orchestrator::config::LoggingConfig;
use evoting_orchestrator::confirm::{AutoConfirm, Confirmer};
use evoting_orchestrator::dkg::Readiness;
use evoting_orchestrator::network::{authoritative_status, ControlPlane, HttpControlPlane};
use evoting_orchestrator::orchestrator::{ActionOrchestrator, ActionOutcome};
use evoting_orchestrator::status::{available_actions, Action, ElectionStatus};
use evoting_orchestrator::OrchestratorConfig;

/// E-Voting Election Control Tool
#[derive(Parser)]
#[command(name = "evctl")]
#[command(about = "Drive e-voting elections through their lifecycle", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "evctl.toml")]
    config: PathBuf,

    /// Proxy base URL (overrides config)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides config
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the authoritative election status
    Status,
    /// List the actions legal from a status
    Actions {
        /// Status to look up (defaults to the authoritative status)
        #[arg(long, value_parser = parse_status)]
        status: Option<ElectionStatus>,
    },
    /// Perform an action (setup, open, close, cancel, shuffle, beginDecryption)
    Run {
        action: Action,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Initialize the DKG actor of the election on every roster node
    Init {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Check configuration file for errors
    CheckConfig {
        /// Path to config file to check (defaults to --config path)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

fn parse_status(s: &str) -> Result<ElectionStatus, String> {
    ElectionStatus::ALL
        .into_iter()
        .find(|status| status.to_string().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown status '{}'", s))
}

// ============ Main ============

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::CheckConfig { file } => {
            let config_path = file.clone().unwrap_or_else(|| cli.config.clone());
            check_config(&config_path)
        }
        command => run_command(&cli, command).await,
    };

    // An abandoned stdin prompt must not keep the runtime alive
    let code = match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("\x1b[1;31mError:\x1b[0m {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run_command(cli: &Cli, command: &Commands) -> anyhow::Result<()> {
    let mut config = OrchestratorConfig::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(endpoint) = &cli.endpoint {
        config.proxy.base_url = endpoint.clone();
        config.validate()?;
    }

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level, &config.logging)?;

    let plane = Arc::new(HttpControlPlane::new(&config.proxy.base_url, config.request_timeout())?);

    match command {
        Commands::Status => show_status(&config, plane.as_ref()).await,
        Commands::Actions { status } => show_actions(&config, plane.as_ref(), *status).await,
        Commands::Run { action, force } => run_action(&config, plane, *action, *force).await,
        Commands::Init { force } => init_nodes(&config, plane, *force).await,
        Commands::CheckConfig { .. } => Ok(()),
    }
}

fn init_logging(level: &str, logging: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    match logging.format.as_str() {
        "compact" => layers.push(tracing_subscriber::fmt::layer().compact().boxed()),
        _ => layers.push(tracing_subscriber::fmt::layer().pretty().boxed()),
    }

    if let Some(path) = &logging.file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .init();
    Ok(())
}

async fn fetch_status(config: &OrchestratorConfig, plane: &dyn ControlPlane) -> anyhow::Result<ElectionStatus> {
    authoritative_status(plane, &config.election.id)
        .await
        .with_context(|| format!("Failed to fetch status of election {}", config.election.id))
}

fn format_actions(actions: &[Action]) -> String {
    if actions.is_empty() {
        "(none)".to_string()
    } else {
        actions.iter().map(|a| a.as_str()).collect::<Vec<_>>().join(", ")
    }
}

// ============ Commands ============

async fn show_status(config: &OrchestratorConfig, plane: &dyn ControlPlane) -> anyhow::Result<()> {
    let status = fetch_status(config, plane).await?;

    println!();
    println!("\x1b[1;36mElection {}\x1b[0m", config.election.id);
    println!("{}", "=".repeat(50));
    println!("  Status:   \x1b[1m{}\x1b[0m", status);
    println!("  Actions:  {}", format_actions(&available_actions(status)));
    println!("  Roster:   {} nodes", config.election.roster.len());
    if status.is_ongoing() {
        println!("  \x1b[1;33m!\x1b[0m A long-running operation is in progress");
    }
    println!();
    Ok(())
}

async fn show_actions(
    config: &OrchestratorConfig,
    plane: &dyn ControlPlane,
    status: Option<ElectionStatus>,
) -> anyhow::Result<()> {
    let status = match status {
        Some(status) => status,
        None => fetch_status(config, plane).await?,
    };

    let actions = available_actions(status);
    if actions.is_empty() {
        println!("No action is available while the election is {}", status);
    }
    for action in actions {
        let note = if action.is_destructive() { " (requires confirmation)" } else { "" };
        println!("  {}{}", action, note);
    }
    Ok(())
}

/// Asks the operator to type the action name
struct StdinConfirmer {
    cancel: CancellationToken,
}

#[async_trait]
impl Confirmer for StdinConfirmer {
    async fn confirm(&self, action: Action) -> bool {
        let keyword = action.as_str().to_uppercase();
        println!();
        println!("\x1b[1;31m WARNING: {} cannot be undone!\x1b[0m", action);
        println!("Type '{}' to confirm: ", keyword);

        let read = tokio::task::spawn_blocking(|| {
            let mut input = String::new();
            std::io::stdin().read_line(&mut input).map(|_| input)
        });

        tokio::select! {
            _ = self.cancel.cancelled() => false,
            input = read => match input {
                Ok(Ok(input)) => input.trim() == keyword,
                _ => false,
            },
        }
    }
}

/// Print orchestrator events until the orchestrator is dropped
fn print_events(orchestrator: &ActionOrchestrator) -> JoinHandle<()> {
    let mut events = BroadcastStream::new(orchestrator.subscribe());
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => println!("  {}", event),
                Err(e) => tracing::warn!("Event stream lagged: {}", e),
            }
        }
    })
}

async fn finish(orchestrator: Arc<ActionOrchestrator>, printer: JoinHandle<()>) {
    orchestrator.shutdown();
    drop(orchestrator);
    let _ = tokio::time::timeout(Duration::from_secs(1), printer).await;
}

fn cancel_on_ctrlc() -> anyhow::Result<CancellationToken> {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    ctrlc::set_handler(move || {
        token.cancel();
    })?;
    Ok(cancel)
}

async fn run_action(
    config: &OrchestratorConfig,
    plane: Arc<HttpControlPlane>,
    action: Action,
    force: bool,
) -> anyhow::Result<()> {
    let status = fetch_status(config, plane.as_ref()).await?;
    let cancel = cancel_on_ctrlc()?;

    let confirmer: Arc<dyn Confirmer> = if force {
        Arc::new(AutoConfirm)
    } else {
        Arc::new(StdinConfirmer {
            cancel: cancel.clone(),
        })
    };

    let orchestrator = ActionOrchestrator::new(
        &config.election,
        status,
        plane,
        confirmer,
        config.poll_interval(),
        cancel.clone(),
    );
    let printer = print_events(&orchestrator);

    println!("Election {} is {}", config.election.id, status);
    let outcome = orchestrator.request_action(action).await;

    let result = match outcome {
        Ok(ActionOutcome::Applied(status)) if status.is_ongoing() => {
            println!("Waiting for {} to finish (Ctrl+C to stop waiting)...", action);
            let settled = orchestrator.wait_until_settled().await;
            if cancel.is_cancelled() {
                println!("\x1b[1;33mStopped waiting.\x1b[0m The operation continues on the proxy.");
            } else {
                println!("\x1b[1;32m✓\x1b[0m Election {} is {}", config.election.id, settled);
            }
            Ok(())
        }
        Ok(ActionOutcome::Applied(status)) => {
            println!("\x1b[1;32m✓\x1b[0m Election {} is {}", config.election.id, status);
            Ok(())
        }
        Ok(ActionOutcome::Declined) => {
            println!("Aborted.");
            Ok(())
        }
        Ok(ActionOutcome::Failed(message)) => Err(anyhow::anyhow!(message)),
        Err(e) => Err(e.into()),
    };

    if result.is_ok() {
        let actions = orchestrator.available_actions();
        println!("Next: {}", format_actions(&actions));
    }

    finish(orchestrator, printer).await;
    result
}

async fn init_nodes(config: &OrchestratorConfig, plane: Arc<HttpControlPlane>, force: bool) -> anyhow::Result<()> {
    let status = fetch_status(config, plane.as_ref()).await?;
    if status != ElectionStatus::Initial {
        bail!("Nodes can only be initialized while the election is Initial (currently {})", status);
    }

    println!();
    println!("Proxy addresses for election {}:", config.election.id);
    for node in &config.election.roster {
        match config.nodes.get(node) {
            Some(address) => println!("  - {} ({})", node, address),
            None => println!("  - {} \x1b[1;33m(no address, will be skipped)\x1b[0m", node),
        }
    }
    println!();

    if !force {
        print!("Type 'INIT' to confirm: ");
        std::io::stdout().flush()?;
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        if input.trim() != "INIT" {
            println!("Aborted.");
            return Ok(());
        }
    }

    let cancel = cancel_on_ctrlc()?;
    let orchestrator = ActionOrchestrator::new(
        &config.election,
        status,
        plane,
        Arc::new(AutoConfirm),
        config.poll_interval(),
        cancel,
    );
    let printer = print_events(&orchestrator);

    println!("Initializing {} nodes...", config.election.roster.len());
    let result = orchestrator.trigger_node_initialization(&config.nodes).await;

    let result = match result {
        Ok(Readiness::Ready) => {
            println!("\x1b[1;32m✓\x1b[0m All nodes initialized, election is {}", orchestrator.current_status());
            Ok(())
        }
        Ok(Readiness::NotReady) => Err(anyhow::anyhow!(
            "Some nodes failed to initialize; fix them and run init again"
        )),
        Ok(Readiness::Indeterminate) => Err(anyhow::anyhow!(
            "Not every roster node has a proxy address: {}",
            config.nodes_missing_address().join(", ")
        )),
        Err(e) => Err(e.into()),
    };

    finish(orchestrator, printer).await;
    result
}

fn check_config(path: &Path) -> anyhow::Result<()> {
    println!();
    println!("\x1b[1;36m╔══════════════════════════════════════════════════════════════╗\x1b[0m");
    println!("\x1b[1;36m║\x1b[0m              \x1b[1;37mEvCtl Configuration Check\x1b[0m                       \x1b[1;36m║\x1b[0m");
    println!("\x1b[1;36m╚══════════════════════════════════════════════════════════════╝\x1b[0m");
    println!();

    if !path.exists() {
        println!("\x1b[1;31m✗ ERROR:\x1b[0m Config file not found: {}", path.display());
        return Ok(());
    }
    println!("\x1b[1;32m✓\x1b[0m Config file: {}", path.display());

    let config = match OrchestratorConfig::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            println!("\x1b[1;31m✗ ERROR:\x1b[0m {}", e);
            println!();
            println!("\x1b[1;31mConfiguration has errors that must be fixed!\x1b[0m");
            return Ok(());
        }
    };

    println!("\x1b[1;32m✓\x1b[0m Proxy: {} (timeout {}s)", config.proxy.base_url, config.proxy.request_timeout_secs);
    println!("\x1b[1;32m✓\x1b[0m Election: {}", config.election.id);
    println!("\x1b[1;32m✓\x1b[0m Roster: {} nodes", config.election.roster.len());
    println!("\x1b[1;32m✓\x1b[0m Poll interval: {}ms", config.polling.interval_ms);

    let missing = config.nodes_missing_address();
    if missing.is_empty() {
        println!("\x1b[1;32m✓\x1b[0m Every roster node has a proxy address");
        println!();
        println!("\x1b[1;32m✓ Configuration looks good!\x1b[0m");
    } else {
        println!();
        println!("\x1b[1;33mWarnings ({}):\x1b[0m", missing.len());
        for node in missing {
            println!("  \x1b[33m!\x1b[0m [nodes] has no proxy address for '{}', init cannot complete", node);
        }
    }
    println!();
    Ok(())
}
