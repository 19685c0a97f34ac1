//! `envmon-agent` -- environmental monitoring subagent.
//!
//! Polls the A/C temperature data file once per period, raises and clears
//! high-temperature alarms with hysteresis, and regenerates the SNMP daemon
//! configuration whenever it receives SIGHUP.
//!
//! See [`envmon_agent::config::AgentConfig::from_env`] for the environment
//! variables understood by the agent.

use std::sync::Arc;

use envmon_agent::config::AgentConfig;
use envmon_agent::notify::{BroadcastSink, FanoutSink, TracingSink};
use envmon_agent::poller::Poller;
use envmon_agent::regenerator::ConfigRegenerator;
use envmon_agent::restart::SystemctlRestarter;
use envmon_agent::signal::{self, ConfigChangeSignal};
use envmon_core::alarm::thresholds::{ThresholdPair, ThresholdPolicy};
use envmon_core::alert::AlarmEvent;
use envmon_core::registry::ObjectRegistry;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "envmon_agent=info,envmon_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AgentConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    let thresholds = ThresholdPair::new(config.alarm_low, config.alarm_high).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid initial alarm thresholds");
        std::process::exit(1);
    });

    tracing::info!(
        data_file = %config.data_file.display(),
        change_file = %config.change_file.display(),
        target_config = %config.target_config.display(),
        restart_service = %config.restart_service,
        poll_period_ms = config.poll_period.as_millis() as u64,
        alarm_low = thresholds.low(),
        alarm_high = thresholds.high(),
        "Starting envmon-agent",
    );

    let registry = ObjectRegistry::standard();
    for object in registry.iter() {
        tracing::info!(
            object = object.name,
            oid = %object.oid_string(),
            access = ?object.access,
            "Registered object",
        );
    }

    // Alarm events are also published for the protocol layer to turn into traps.
    let broadcast = BroadcastSink::default();
    let trap_events = broadcast.subscribe();
    let sink = FanoutSink::new()
        .with(Arc::new(TracingSink))
        .with(Arc::new(broadcast));

    let restarter = SystemctlRestarter::new(&config.restart_service, config.restart_timeout);
    let regenerator = ConfigRegenerator::new(
        &config.change_file,
        &config.target_config,
        Arc::new(restarter),
    );

    let change_signal = ConfigChangeSignal::new();
    let cancel = CancellationToken::new();

    let (poller, objects) = Poller::new(
        &config.data_file,
        config.poll_period,
        registry,
        ThresholdPolicy::new(thresholds),
        Arc::new(sink),
        change_signal.clone(),
        regenerator,
    );

    // The management protocol layer serves GET/SET through `objects` and
    // sends a trap for each event on `trap_events`.
    tokio::spawn(drain_trap_events(trap_events, cancel.clone()));
    tracing::debug!(?objects, "Object handle ready for the protocol layer");

    #[cfg(unix)]
    tokio::spawn(signal::forward_reload_requests(change_signal, cancel.clone()));
    tokio::spawn(signal::cancel_on_shutdown(cancel.clone()));

    poller.run(cancel).await;
    drop(objects);

    tracing::info!("envmon-agent terminated");
}

/// Consume alarm events on behalf of the trap sender until shutdown, so the
/// broadcast channel always has a live receiver.
async fn drain_trap_events(
    mut events: broadcast::Receiver<AlarmEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            received = events.recv() => match received {
                Ok(event) => tracing::debug!(
                    sensor = %event.subject_id,
                    kind = ?event.kind,
                    "Alarm event queued for trap delivery",
                ),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Trap consumer lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}
