use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vireo_control::{ControlListener, ControlSender};
use vireo_engine::LuaEngine;
use vireo_host::{ErrorPolicy, EventRouter, Flow, ScriptSession, WatchMode};
use vireo_watch::PathWatcher;

mod config;
use config::VireoConfig;

#[derive(Parser)]
#[command(name = "vireo", version, about = "Live Lua script runtime controller")]
struct Cli {
    /// Script to load on startup
    script: Option<PathBuf>,

    /// Arguments handed to the script through its arg table
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,

    /// Increases log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Exit the process when the script errors
    #[arg(long, conflicts_with = "reload_after")]
    exit_on_error: bool,

    /// Reload the script this many seconds after an error
    #[arg(long, value_name = "SECONDS")]
    reload_after: Option<f64>,

    /// Disable filesystem watching
    #[arg(long)]
    no_watch: bool,

    /// Keep watching previously loaded scripts instead of only the
    /// active one
    #[arg(long)]
    keep_watching: bool,

    /// Disable the control message listener
    #[arg(long)]
    no_listen: bool,

    /// UDP port to receive control messages on
    #[arg(long, value_name = "PORT")]
    listen_port: Option<u16>,

    /// Host outbound messages are sent to
    #[arg(long, value_name = "HOST")]
    send_host: Option<String>,

    /// Port outbound messages are sent to
    #[arg(long, value_name = "PORT")]
    send_port: Option<u16>,

    /// Address prefix for control commands
    #[arg(long, value_name = "PREFIX")]
    namespace: Option<String>,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = VireoConfig::load()?;
    let namespace = cli.namespace.unwrap_or(config.namespace);
    let listen_port = cli.listen_port.unwrap_or(config.listen.port);
    let listen_enabled = config.listen.enabled && !cli.no_listen;
    let send_host = cli.send_host.unwrap_or(config.send.host);
    let send_port = cli.send_port.unwrap_or(config.send.port);
    let watch_enabled = config.watch.enabled && !cli.no_watch;
    let watch_mode = if cli.keep_watching || !config.watch.replace_on_load {
        WatchMode::Accumulate
    } else {
        WatchMode::ReplaceOnLoad
    };

    // Bridge script-initiated messages out through the UDP sender.
    let (outbound_tx, mut outbound_rx) = unbounded_channel();
    let sender = ControlSender::new(send_host, send_port).await?;
    tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = sender.send(&msg).await {
                warn!(target: "control", "outbound send failed: {e}");
            }
        }
    });

    let mut session = ScriptSession::new(LuaEngine::with_outbound(outbound_tx));
    if cli.exit_on_error {
        session.set_error_policy(ErrorPolicy::ExitOnError);
    } else if let Some(secs) = cli.reload_after {
        session.set_error_policy(ErrorPolicy::ReloadAfterDelay(Duration::from_secs_f64(secs)));
    }

    let mut watcher = PathWatcher::new();
    if watch_enabled {
        watcher.start()?;
    }

    let mut listener = ControlListener::new(listen_port);
    if listen_enabled {
        listener.start().await?;
    }

    let mut router = EventRouter::new(session, watcher, listener, namespace, watch_mode);

    if let Some(script) = &cli.script {
        if router.load(script, cli.args.clone(), Instant::now()) == Flow::Terminate {
            router.shutdown();
            return Ok(());
        }
    }

    info!("vireo running, ctrl-c to quit");

    let mut interval = tokio::time::interval(Duration::from_millis(config.tick_ms.max(1)));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if router.tick(Instant::now()) == Flow::Terminate {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("interrupted, exiting...");
                break;
            }
        }
    }

    router.shutdown();
    Ok(())
}
