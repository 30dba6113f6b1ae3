// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Frigate Alerts - MQTT bridge from Frigate events to filtered alerts

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::FmtSubscriber;

use frigate_alerts::config::{ConfigWatcher, LoggingConfig};
use frigate_alerts::logging::RotatingFile;
use frigate_alerts::streaming::{read_recording, replay_recording, LogPublisher, MessageRecorder};
use frigate_alerts::{Config, Engine, EventBus, MqttBridge, Settings, NAME, VERSION};

/// Frigate Alerts - event correlation and alerting for Frigate NVR
#[derive(Parser, Debug)]
#[command(name = "frigate-alerts")]
#[command(author = "bad-antics")]
#[command(version = VERSION)]
#[command(about = "Filters Frigate detection events into de-duplicated MQTT alerts")]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// MQTT broker host, overrides the configuration
    #[arg(long)]
    mqtt_broker: Option<String>,

    /// Append every inbound event message to this JSON-lines file
    #[arg(long)]
    record: Option<PathBuf>,

    /// Process a recorded JSON-lines file offline instead of connecting
    #[arg(long, conflicts_with = "record")]
    replay: Option<PathBuf>,

    /// Do not reload the configuration file when it changes
    #[arg(long)]
    no_watch: bool,

    /// Disable the interactive stdin console
    #[arg(long)]
    no_console: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;
    if let Some(broker) = &args.mqtt_broker {
        config.mqtt.host = broker.clone();
    }

    init_logging(&args, &config.logging)?;

    info!("{} v{}", NAME, VERSION);
    info!("Configuration loaded from {:?}", config_path);

    match args.replay.clone() {
        Some(path) => {
            // recorded gaps are skipped instead of waited out
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .start_paused(true)
                .build()?;
            rt.block_on(run_replay(config, &path))
        }
        None => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_bridge(config, config_path, args))
        }
    }
}

fn init_logging(args: &Args, logging: &LoggingConfig) -> Result<()> {
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        logging.level.parse().unwrap_or(Level::INFO)
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug);

    match &logging.path {
        Some(path) => {
            let file = RotatingFile::from_config(path, logging)
                .with_context(|| format!("opening log file {:?}", path))?;
            let subscriber = builder
                .with_ansi(false)
                .with_writer(std::io::stdout.and(Mutex::new(file)))
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        None => {
            let subscriber = builder.with_ansi(true).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

/// Connect to the broker and process events until shutdown
async fn run_bridge(config: Config, config_path: PathBuf, args: Args) -> Result<()> {
    let (shutdown_tx, _) = broadcast::channel(4);
    let bus = Arc::new(EventBus::new(1024));

    let (bridge, mut inbound) = MqttBridge::start(&config.mqtt, shutdown_tx.subscribe())?;
    let engine = Engine::new(Settings::from_config(&config), bridge.clone(), Arc::clone(&bus));

    let recorder = match &args.record {
        Some(path) => Some(Arc::new(MessageRecorder::open(path)?)),
        None => None,
    };

    // Single consumer keeps broker order
    let consumer = {
        let engine = engine.clone();
        let recorder = recorder.clone();
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                if let Some(recorder) = &recorder {
                    if let Err(e) = recorder.record(&message.topic, &message.payload) {
                        warn!("Failed to record message: {:#}", e);
                    }
                }
                // decode failures are already logged by the engine
                let _ = engine.process_payload(&message.topic, &message.payload);
            }
        })
    };

    if !args.no_watch {
        let mut updates = ConfigWatcher::new(&config_path, Duration::from_secs(2))
            .spawn(config.clone(), shutdown_tx.subscribe());
        let engine = engine.clone();
        tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let latest = Arc::clone(&updates.borrow_and_update());
                if latest.mqtt != config.mqtt {
                    warn!("MQTT settings changed; restart to apply them");
                }
                engine.reconfigure(Settings::from_config(&latest));
            }
        });
    }

    info!("Press Ctrl+C to shutdown");
    run_console(&engine, &bridge, !args.no_console).await;

    info!("Shutting down...");
    // stop intake first so nothing schedules a timer after the engine stops
    consumer.abort();
    let _ = consumer.await;
    engine.shutdown();

    if let Err(e) = bridge.disconnect().await {
        warn!("{:#}", e);
    }
    // let the event loop flush the offline status before stopping it
    tokio::time::sleep(Duration::from_millis(250)).await;
    let _ = shutdown_tx.send(());

    if let Some(recorder) = &recorder {
        info!("Recorded {} message(s) to {:?}", recorder.count(), recorder.path());
    }
    info!("Disconnected. {} engine event(s) emitted", bus.emitted());
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Print,
    Quit,
    Alert(String),
    Info(String),
    Unknown,
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let (verb, arg) = match line.split_once(char::is_whitespace) {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (line, ""),
        };
        match (verb.to_lowercase().as_str(), arg) {
            ("p", "") => Command::Print,
            ("q", "") => Command::Quit,
            ("a", id) if !id.is_empty() => Command::Alert(id.to_string()),
            ("i", id) if !id.is_empty() => Command::Info(id.to_string()),
            _ => Command::Unknown,
        }
    }
}

/// Serve console commands until `q`, Ctrl+C, or (without a console) Ctrl+C only
async fn run_console(engine: &Engine, bridge: &MqttBridge, interactive: bool) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interactive = interactive;

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("App received signal to shutdown.");
                return;
            }
            line = lines.next_line(), if interactive => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("App received an EOF from stdin - disabling interactive mode");
                interactive = false;
                continue;
            }
            Err(e) => {
                warn!("Console read failed: {} - disabling interactive mode", e);
                interactive = false;
                continue;
            }
        };

        match Command::parse(&line) {
            Command::Print => print_ongoing(engine, bridge),
            Command::Quit => return,
            Command::Alert(id) => match engine.force_alert(&id) {
                Ok(notification) => info!("Alert sent: {}", notification.message),
                Err(e) => info!("{}", e),
            },
            Command::Info(id) => match engine.describe(&id) {
                Ok(event) => match serde_json::to_string_pretty(&event) {
                    Ok(json) => info!("Event {}:\n{}", id, json),
                    Err(e) => warn!("Could not render event {}: {}", id, e),
                },
                Err(e) => info!("{}", e),
            },
            Command::Unknown => info!("Unrecognized command. Expected: [p, q, a <id>, i <id>]"),
        }
    }
}

fn print_ongoing(engine: &Engine, bridge: &MqttBridge) {
    let events = engine.ongoing_events();
    info!(
        "Broker {}; {} ongoing event(s), {} awaiting minimum duration",
        if bridge.is_connected() { "connected" } else { "disconnected" },
        events.len(),
        engine.pending_count()
    );
    for event in events {
        info!(
            "  {} camera={} label={} score={:.2} zones={:?} clip={} snapshot={}",
            event.id,
            event.camera,
            event.label,
            event.score,
            event.current_zones,
            event.has_clip,
            event.has_snapshot
        );
    }
}

/// Feed a recording through the engine on recorded time, logging alerts
/// instead of publishing them
async fn run_replay(config: Config, path: &Path) -> Result<()> {
    let messages = read_recording(path)?;
    info!("Replaying {} message(s) from {:?}", messages.len(), path);

    let bus = Arc::new(EventBus::default());
    replay_recording(
        &messages,
        Settings::from_config(&config),
        Arc::new(LogPublisher),
        Arc::clone(&bus),
    )
    .await;
    info!("{} engine event(s) emitted", bus.emitted());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("p"), Command::Print);
        assert_eq!(Command::parse(" Q "), Command::Quit);
        assert_eq!(Command::parse("a 1718.5-abc"), Command::Alert("1718.5-abc".into()));
        assert_eq!(Command::parse("I  xyz"), Command::Info("xyz".into()));
        assert_eq!(Command::parse("a"), Command::Unknown);
        assert_eq!(Command::parse("hello"), Command::Unknown);
    }
}
