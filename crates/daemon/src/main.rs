// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `qld` — quicklook node daemon.

use clap::error::ErrorKind;
use clap::Parser;
use ql_config::{Config, ConfigError, NetworkError, ProcessingNetwork};
use ql_core::{BalanceMode, WorkArea, WorkAreaError};
use ql_daemon::containers::{ContainerRuntime, DockerCli};
use ql_daemon::manager::TaskManager;
use ql_daemon::master::Master;
use ql_daemon::orchestrator::TaskOrchestrator;
use ql_daemon::server::{self, ServerState, DEFAULT_BODY_LIMIT};
use ql_daemon::watcher::WatcherError;
use ql_store::{Archive, ConnectionParams, PgArchive};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Quicklook processing node daemon.
#[derive(Debug, Parser)]
#[command(name = "qld", version, about)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', value_name = "cfgFile")]
    config: PathBuf,

    /// This node's name; must appear in network.processingNodes
    #[arg(short = 'i', value_name = "nodeId")]
    node: String,

    /// HTTP listen port (defaults to this node's configured port)
    #[arg(short = 'p', value_name = "port")]
    port: Option<u16>,

    /// Work-area root folder (defaults to general.workArea)
    #[arg(short = 'w', value_name = "workArea")]
    work_area: Option<PathBuf>,

    /// Balancing mode: 0 sequential, 1 load-balance, 2 random
    #[arg(short = 'b', value_name = "mode", default_value_t = 1)]
    balance: u8,

    /// Increase verbosity
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Fatal startup failures.
#[derive(Debug, Error)]
enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    WorkArea(#[from] WorkAreaError),

    #[error(transparent)]
    Watcher(#[from] WatcherError),

    #[error("no work area given: pass -w or set general.workArea")]
    NoWorkArea,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("qld: {e}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run(args: Args) -> Result<(), StartupError> {
    let cfg = Config::load(&args.config)?;

    let wa_root = args
        .work_area
        .clone()
        .or_else(|| cfg.general.work_area.clone().map(PathBuf::from))
        .ok_or(StartupError::NoWorkArea)?;
    let wa = WorkArea::new(&wa_root)?;

    let _log_guard = init_logging(&wa, args.verbose);

    let net = ProcessingNetwork::new(&cfg, &args.node)?;
    let balance_mode = BalanceMode::from_cli(args.balance);
    let port = args.port.unwrap_or(net.node_ports[net.this_node_idx]);

    info!(
        node = %net.this_node,
        commander = net.this_is_commander,
        agents = net.this_node_num_agents,
        %balance_mode,
        "node starting"
    );

    let quit = CancellationToken::new();
    install_signal_handlers(&quit);

    // The archive lives on the commander; workers reach it indirectly
    // through the commander's HTTP surface.
    let archive: Option<Arc<dyn Archive>> = if net.this_is_commander {
        let pg = Arc::new(PgArchive::new(ConnectionParams {
            host: cfg.db.host.clone(),
            port: cfg.db.port,
            name: cfg.db.name.clone(),
            user: cfg.db.user.clone(),
            pwd: cfg.db.pwd.clone(),
        }));
        match pg.open_connection().await {
            Ok(()) => info!(db = %cfg.db.name, "archive connection checked"),
            Err(e) => warn!("archive not reachable yet: {e}"),
        }
        Some(pg)
    } else {
        None
    };

    let runtime: Arc<dyn ContainerRuntime> = Arc::new(DockerCli::new());
    let (manager, agents) = TaskManager::new(&wa, &net, runtime, &quit)?;
    for agent in agents {
        tokio::spawn(agent.run());
    }

    let state = ServerState {
        node: net.this_node.clone(),
        info: manager.info_handle(),
        tstatus: manager.tstatus_handle(),
        wa: wa.clone(),
        body_limit: DEFAULT_BODY_LIMIT,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_quit = quit.clone();
    tokio::spawn(async move {
        if let Err(e) = server::serve(addr, state, server_quit).await {
            warn!("HTTP server stopped: {e}");
        }
    });

    let orchestrator = TaskOrchestrator::new(&cfg.orchestration);
    let heart_beat = Duration::from_millis(cfg.general.master_heart_beat);
    let mut master = Master::new(
        net,
        wa,
        balance_mode,
        heart_beat,
        manager,
        orchestrator,
        archive,
        quit.clone(),
    )?;
    master.run().await;

    info!("done");
    Ok(())
}

/// SIGTERM starts the soft shutdown; SIGINT is ignored, as usual for a
/// long-running service.
fn install_signal_handlers(quit: &CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            let quit = quit.clone();
            tokio::spawn(async move {
                term.recv().await;
                info!("SIGTERM received, shutting down");
                quit.cancel();
            });
        }
        Err(e) => warn!("cannot install SIGTERM handler: {e}"),
    }

    match signal(SignalKind::interrupt()) {
        Ok(mut int) => {
            tokio::spawn(async move {
                loop {
                    int.recv().await;
                    info!("SIGINT ignored");
                }
            });
        }
        Err(e) => warn!("cannot install SIGINT handler: {e}"),
    }
}

/// Route tracing to stderr and to a session log file.
fn init_logging(wa: &WorkArea, verbosity: u8) -> tracing_appender::non_blocking::WorkerGuard {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let appender = tracing_appender::rolling::never(&wa.logs, "qld.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();
    guard
}
