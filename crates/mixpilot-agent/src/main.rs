//! mixpilot - autonomous co-pilot for a live sound engineer
//!
//! Connects to a digital mixing console, mirrors its state, analyses
//! the mix in real time, asks an LLM what to adjust and applies the
//! approved adjustments back to the console.
//!
//! Usage: `mixpilot [config.yaml]`
//!
//! Environment:
//! - `MIXPILOT_API_KEY`: LLM API key (falls back to local model if unset)
//! - `RUST_LOG`: log level (default info)

mod agent;
mod config;
mod events;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use mixpilot_core::console::sim::SimConsole;
use mixpilot_core::console::ConsoleAdapter;

use agent::Agent;
use config::AgentConfig;
use events::AgentEvent;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("mixpilot starting up");

    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config/show.yaml".to_string());
    let mut config: AgentConfig = mixpilot_core::config::load_config(Path::new(&config_path));

    // API key comes from the environment, never from the config file
    if let Ok(key) = std::env::var("MIXPILOT_API_KEY") {
        config.llm.api_key = key;
    }

    let (adapter, default_port): (Arc<dyn ConsoleAdapter>, u16) = match config.console_type.as_str()
    {
        "sim" => {
            let caps_channels = 32;
            let caps_buses = 8;
            (Arc::new(SimConsole::new(caps_channels, caps_buses)), 0)
        }
        // Hardware adapters (X32/Wing/Avantis) implement ConsoleAdapter
        // in their own crates and get wired in here
        other => bail!("Unknown console type: {}", other),
    };

    let port = if config.console_port != 0 { config.console_port } else { default_port };
    log::info!("Console: {} at {}:{}", config.console_type, config.console_host, port);

    if !adapter.connect(&config.console_host, port) {
        bail!("Failed to connect to console");
    }

    let headless = config.headless;
    let mut agent = Agent::new(adapter.clone(), config);
    agent.start().context("Failed to start agent")?;

    // Ctrl-C flips the running flag; the drain loop below exits
    let stop_flag = {
        let shared_running = Arc::new(std::sync::atomic::AtomicBool::new(true));
        let flag = shared_running.clone();
        ctrlc::set_handler(move || {
            log::info!("Shutdown requested");
            flag.store(false, std::sync::atomic::Ordering::SeqCst);
        })
        .context("Failed to install signal handler")?;
        shared_running
    };

    log::info!("Agent running - press Ctrl+C to stop");

    // Event drain: the terminal UI would subscribe here; headless mode
    // mirrors everything into the log instead
    let events = agent.events();
    while stop_flag.load(std::sync::atomic::Ordering::SeqCst) && agent.is_running() {
        match events.recv_timeout(Duration::from_millis(200)) {
            Ok(AgentEvent::Log(line)) => {
                if headless {
                    log::info!("{}", line);
                } else {
                    println!("{}", line);
                }
            }
            Ok(AgentEvent::ChatReply(reply)) => println!("LLM> {}", reply),
            Ok(AgentEvent::Status(status)) => log::info!("Status: {}", status),
            Ok(AgentEvent::Connection(_)) => {}
            Err(flume::RecvTimeoutError::Timeout) => continue,
            Err(flume::RecvTimeoutError::Disconnected) => break,
        }
    }

    agent.stop();
    adapter.disconnect();
    log::info!("mixpilot exited cleanly");
    Ok(())
}
