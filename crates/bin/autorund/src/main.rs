//! autorund — composition root.
//!
//! Loads configuration, wires the virtual thieving world into a runner and
//! drives it from a fixed-rate tick loop until Ctrl-C.

mod config;

use tokio::sync::broadcast::{self, error::RecvError};

use autorun_adapter_virtual::{Thief, ThievingCatalog};
use autorun_app::break_handler::IntervalBreakHandler;
use autorun_app::config::ExecutionStrategy;
use autorun_app::coordinator::Runner;
use autorun_app::event_bus::InProcessEventBus;
use autorun_app::service::{RunnerHandle, RunnerService};
use autorun_domain::context::Context;
use autorun_domain::event::{EngineEvent, EngineEventKind};
use autorun_domain::interaction::ObservedInteraction;

use crate::config::Config;

const EVENT_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_new(&config.logging.filter)?)
        .init();

    tracing::info!(
        strategy = ?config.runner.strategy,
        tick_ms = config.runner.tick_ms,
        target = %config.simulation.target,
        "starting autorund"
    );

    let bus = InProcessEventBus::new(EVENT_CAPACITY);
    tokio::spawn(log_events(bus.subscribe()));

    let gate = IntervalBreakHandler::new(&config.runner.breaks);
    let context = Context::new(Thief::new(&config.simulation));
    let runner = Runner::new(config.runner.clone(), ThievingCatalog, context, gate, bus)?;
    let (handle, task) = RunnerService::spawn(runner);

    let mut interval = tokio::time::interval(config.runner.tick_duration());
    loop {
        tokio::select! {
            _ = interval.tick() => {
                handle.tick().await?;
                if config.runner.strategy == ExecutionStrategy::Interception {
                    play_favored_option(&handle).await?;
                }
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("shutdown requested");
                break;
            }
        }
    }

    let status = handle.status().await?;
    tracing::info!(runtime = %status.runtime, "final statistics");
    for line in &status.statistics {
        tracing::info!(label = %line.label, value = %line.value, "statistic");
    }

    drop(handle);
    task.await?;
    Ok(())
}

/// Stand in for a player who clicks whatever the runner currently favours.
async fn play_favored_option(handle: &RunnerHandle<Thief>) -> anyhow::Result<()> {
    let status = handle.status().await?;
    if let Some(label) = status.favored_option {
        let verdict = handle.observe(ObservedInteraction::new(label.as_str())).await?;
        tracing::debug!(%label, ?verdict, "player clicked");
    }
    Ok(())
}

async fn log_events(mut events: broadcast::Receiver<EngineEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match &event.kind {
                EngineEventKind::InterceptionMismatch { .. } | EngineEventKind::SlowResolution { .. } => {
                    tracing::warn!(session = %event.session, kind = ?event.kind, "engine event");
                }
                EngineEventKind::BreakStarted | EngineEventKind::BreakEnded => {
                    tracing::info!(session = %event.session, kind = ?event.kind, "engine event");
                }
                _ => tracing::debug!(session = %event.session, kind = ?event.kind, "engine event"),
            },
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event log subscriber lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
