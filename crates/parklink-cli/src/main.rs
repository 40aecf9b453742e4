//! Parklink command-line tool
//!
//! Runs either side of the parking link.
//!
//! # Usage
//!
//! ```bash
//! # Development endpoint on mock hardware
//! parklink agent --bind 127.0.0.1:8080
//!
//! # Activate the configured endpoints and react to button presses
//! parklink --config parklink.toml monitor
//!
//! # One-shot status of two endpoints
//! parklink monitor --device 10.0.0.5 --device 10.0.0.6 --once
//!
//! # Single command
//! parklink send 10.0.0.5 mover_servo angulo=90
//! ```

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use parklink_agent::{AgentServer, DeviceAgent};
use parklink_core::DeviceEndpoint;
use parklink_hardware::MonotonicClock;
use parklink_hardware::mock::MockBoard;
use parklink_network::{
    BarrierReaction, DeviceLink, LinkEventSink, LinkPool, StatusPoller, TracingEventSink,
};
use parklink_protocol::Command;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ParklinkConfig;

/// Parking controller and endpoint agent
#[derive(Parser, Debug)]
#[command(name = "parklink")]
#[command(about = "Parking controller link - monitor endpoints or run a development agent")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the endpoint protocol on mock hardware
    Agent {
        /// Listen address
        #[arg(short, long)]
        bind: Option<String>,

        /// Input debounce window (milliseconds)
        #[arg(long)]
        debounce_ms: Option<u64>,
    },

    /// Activate endpoints, then poll them and react to presses
    Monitor {
        /// Endpoint address (repeatable); replaces the configured list
        #[arg(short, long = "device")]
        devices: Vec<String>,

        #[arg(short, long)]
        port: Option<u16>,

        /// Per-request timeout (seconds)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Polling interval (milliseconds)
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Print one round of statuses and exit
        #[arg(long)]
        once: bool,
    },

    /// Send a single command and print the outcome as JSON
    Send {
        /// Endpoint address
        device: String,

        /// Action name, e.g. `ocupar`, `mover_servo`, `actualizar_display`
        action: String,

        /// Parameters as `name=value`; values parse as JSON, else string
        params: Vec<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write an example configuration file
    GenConfig {
        #[arg(short, long, default_value = "parklink.toml")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut config = ParklinkConfig::load(args.config.as_deref())
        .with_context(|| format!("loading configuration {:?}", args.config))?;

    match args.command {
        Commands::Agent { bind, debounce_ms } => {
            if let Some(bind) = bind {
                config.agent.bind = bind;
            }
            if let Some(debounce_ms) = debounce_ms {
                config.agent.debounce_ms = debounce_ms;
            }
            cmd_agent(&config).await
        }
        Commands::Monitor {
            devices,
            port,
            timeout_secs,
            poll_interval_ms,
            once,
        } => {
            let controller = &mut config.controller;
            if !devices.is_empty() {
                controller.devices = devices;
            }
            if let Some(port) = port {
                controller.port = port;
            }
            if let Some(timeout_secs) = timeout_secs {
                controller.timeout_secs = timeout_secs;
            }
            if let Some(poll_interval_ms) = poll_interval_ms {
                controller.poll_interval_ms = poll_interval_ms;
            }
            cmd_monitor(&config, once).await
        }
        Commands::Send {
            device,
            action,
            params,
            port,
        } => {
            config.controller.devices = vec![device];
            if let Some(port) = port {
                config.controller.port = port;
            }
            cmd_send(&config, &action, &params).await
        }
        Commands::GenConfig { output } => cmd_gen_config(output),
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn cmd_agent(config: &ParklinkConfig) -> Result<()> {
    let agent_config = config.agent.agent_config()?;
    let (board, _mock) =
        MockBoard::build_with_clock(agent_config.debounce, Arc::new(MonotonicClock::new()))?;
    let agent = DeviceAgent::new(board)?;
    let server = AgentServer::bind(agent_config, agent).await?;

    println!("Parklink agent v{}", env!("CARGO_PKG_VERSION"));
    println!("Listening on {} (mock hardware)", server.local_addr()?);
    println!("Press Ctrl+C to stop...");

    server.serve_until(shutdown_signal()).await?;
    Ok(())
}

async fn cmd_monitor(config: &ParklinkConfig, once: bool) -> Result<()> {
    let controller = &config.controller;
    let poll_interval = controller.poll_interval()?;
    let events: Arc<dyn LinkEventSink> = Arc::new(TracingEventSink);
    let mut pool = LinkPool::from_endpoints(
        controller.endpoints()?,
        controller.link_config(),
        controller.pool_config(),
        Some(events),
    );

    let activated = pool.activate_all().await;
    for (index, connected) in &activated {
        if let Some(link) = pool.get(*index) {
            println!(
                "[{index}] {} {}",
                link.endpoint(),
                if *connected { "connected" } else { "unreachable" }
            );
        }
    }

    if once {
        for (index, status) in pool.fetch_all_statuses().await {
            match status {
                Some(snapshot) => println!("[{index}] {}", serde_json::to_string(&snapshot)?),
                None => {
                    let state = pool
                        .get(index)
                        .map(DeviceLink::connection_state_text)
                        .unwrap_or_default();
                    println!("[{index}] {state}");
                }
            }
        }
        return Ok(());
    }

    let poller = StatusPoller::new(poll_interval);
    info!(interval_ms = controller.poll_interval_ms, "Polling started");
    poller
        .run(&mut pool, &mut BarrierReaction, shutdown_signal())
        .await;

    println!("\nShutting down...");
    for link in pool.iter() {
        println!("{}: {}", link.endpoint(), link.connection_state_text());
    }
    pool.deactivate_all();
    Ok(())
}

async fn cmd_send(config: &ParklinkConfig, action: &str, params: &[String]) -> Result<()> {
    let command = build_command(action, params)?;
    let endpoint: DeviceEndpoint = config
        .controller
        .endpoints()?
        .into_iter()
        .next()
        .context("no device given")?;

    let mut link = DeviceLink::with_config(endpoint, config.controller.link_config());
    if !link.activate().await {
        bail!("{}: {}", link.endpoint(), link.connection_state_text());
    }

    let outcome = link.send_command(&command).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.is_success() {
        bail!("command failed: {}", outcome.status);
    }
    Ok(())
}

fn build_command(action: &str, params: &[String]) -> Result<Command> {
    let mut command = Command::named(action);
    for param in params {
        let Some((name, raw)) = param.split_once('=') else {
            bail!("parameter {param:?} is not name=value");
        };
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
        command = command.param(name, value);
    }
    Ok(command)
}

fn cmd_gen_config(output: PathBuf) -> Result<()> {
    let content = toml::to_string_pretty(&ParklinkConfig::default())?;
    std::fs::write(&output, content)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Wrote example configuration to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parklink_protocol::Action;

    #[test]
    fn test_build_command_params() {
        let command = build_command("mover_servo", &["angulo=90".into()]).unwrap();
        assert_eq!(command.action(), "mover_servo");
        assert_eq!(command.kind().unwrap(), Action::MoveActuator);
        assert_eq!(command.int_param("angulo").unwrap(), Some(90));

        let command = build_command("toggle_led", &["color=rojo".into(), "espacio=1".into()])
            .unwrap();
        assert_eq!(command.str_param("color"), Some("rojo"));
        assert_eq!(command.int_param("espacio").unwrap(), Some(1));

        let command = build_command("actualizar_display", &["numero=\"7\"".into()]).unwrap();
        assert_eq!(command.kind().unwrap(), Action::UpdateDisplay);
        assert_eq!(command.int_param("numero").unwrap(), Some(7));
    }

    #[test]
    fn test_build_command_rejects_bare_param() {
        assert!(build_command("mover_servo", &["90".into()]).is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "parklink",
            "monitor",
            "--device",
            "10.0.0.5",
            "-d",
            "10.0.0.6",
            "--once",
        ])
        .unwrap();
        match args.command {
            Commands::Monitor { devices, once, .. } => {
                assert_eq!(devices, vec!["10.0.0.5", "10.0.0.6"]);
                assert!(once);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
