mod server;
mod ws;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use rocu_nav::{doctor as nav_doctor, mission_log_csv, Autopilot, AutopilotConfig};
use rocu_qos::{doctor as qos_doctor, BitrateAdvisor, DEFAULT_TARGET_KBPS};
use rocu_session::{safety, Journal, SessionState};

use server::AppState;

#[derive(Debug, Parser)]
#[command(name = "rocu", version, about = "ROCU-Lite - vehicle telemetry relay, dead-man monitor and mission autopilot")]
struct Cli {
    #[arg(long)]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate the configuration file.
    Doctor,
    /// Serve the relay: HTTP API, vehicle and observer sockets, autopilot loop.
    Run,
    Mission { #[command(subcommand)] cmd: MissionCmd },
}

#[derive(Debug, Subcommand)]
enum MissionCmd {
    /// Render the mission log as CSV.
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, serde::Deserialize)]
struct Config {
    server: ServerCfg,
    #[serde(default)]
    safety: SafetyCfg,
    #[serde(default)]
    mission: MissionCfg,
    #[serde(default)]
    qos: QosCfg,
}

#[derive(Debug, serde::Deserialize)]
struct ServerCfg {
    bind: String,
    static_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    cors_permissive: bool,
}

fn default_true() -> bool { true }

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
struct SafetyCfg { heartbeat_timeout_ms: u64 }

impl Default for SafetyCfg {
    fn default() -> Self { Self { heartbeat_timeout_ms: 800 } }
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
struct MissionCfg {
    log_path: PathBuf,
    #[serde(flatten)]
    autopilot: AutopilotConfig,
}

impl Default for MissionCfg {
    fn default() -> Self {
        Self { log_path: "/tmp/rocu_mission.jsonl".into(), autopilot: AutopilotConfig::default() }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(default)]
struct QosCfg {
    log_path: PathBuf,
    initial_target_kbps: u32,
}

impl Default for QosCfg {
    fn default() -> Self {
        Self { log_path: "/tmp/rocu_qos.jsonl".into(), initial_target_kbps: DEFAULT_TARGET_KBPS }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;

    match cli.cmd {
        Command::Doctor => doctor(&cfg).await?,
        Command::Run => run(&cfg).await?,
        Command::Mission { cmd } => mission_cmd(&cfg, cmd).await?,
    }
    Ok(())
}

async fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    let addrs: Vec<_> = tokio::net::lookup_host(&cfg.server.bind)
        .await
        .with_context(|| format!("server.bind unresolvable: {}", cfg.server.bind))?
        .collect();
    anyhow::ensure!(!addrs.is_empty(), "server.bind resolves to nothing");

    safety::check_heartbeat_timeout(cfg.safety.heartbeat_timeout_ms)?;
    nav_doctor::check_autopilot(&cfg.mission.autopilot)?;
    nav_doctor::check_log_path(&cfg.mission.log_path).context("mission.log_path")?;
    qos_doctor::check_target(cfg.qos.initial_target_kbps)?;
    nav_doctor::check_log_path(&cfg.qos.log_path).context("qos.log_path")?;

    if let Some(dir) = &cfg.server.static_dir {
        if !dir.is_dir() {
            warn!("server.static_dir {} missing; UI will not be served", dir.display());
        }
    }

    info!("doctor: OK");
    Ok(())
}

async fn mission_cmd(cfg: &Config, cmd: MissionCmd) -> Result<()> {
    match cmd {
        MissionCmd::Export { out } => {
            let csv = mission_log_csv(&Journal::new(&cfg.mission.log_path)).await?;
            match out {
                Some(path) => {
                    tokio::fs::write(&path, csv).await.with_context(|| format!("write {}", path.display()))?;
                    info!("mission log exported to {}", path.display());
                }
                None => print!("{}", csv),
            }
            Ok(())
        }
    }
}

async fn run(cfg: &Config) -> Result<()> {
    info!("run: starting");

    let session = Arc::new(SessionState::new(Duration::from_millis(cfg.safety.heartbeat_timeout_ms)));
    let autopilot = Arc::new(Autopilot::new(
        session.clone(),
        Journal::new(&cfg.mission.log_path),
        cfg.mission.autopilot.clone(),
    ));
    let qos = Arc::new(BitrateAdvisor::new(cfg.qos.initial_target_kbps, Journal::new(&cfg.qos.log_path)));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let autopilot_task = tokio::spawn(autopilot.clone().run(shutdown_rx.clone()));

    let state = AppState { session, autopilot, qos };
    let app = server::router(state, cfg.server.static_dir.as_deref(), cfg.server.cors_permissive);

    let listener = tokio::net::TcpListener::bind(&cfg.server.bind)
        .await
        .with_context(|| format!("bind {}", cfg.server.bind))?;
    info!("run: listening on {}", cfg.server.bind);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("ctrl-c handler failed: {}", e);
        }
        info!("run: shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .context("http server")?;

    if let Err(e) = autopilot_task.await {
        warn!("autopilot task ended abnormally: {}", e);
    }
    info!("run: stopped");
    Ok(())
}
