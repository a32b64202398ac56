//! Headless monitor: runs the engine without a display and logs what a bedside screen would show
//!
//! Usage: monitor-headless [scenario_id] [seconds]

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use monitor_core::config::{ConfigLoader, ThresholdStore, TomlThresholdStore};
use monitor_core::events::{ChannelEventSink, MonitorEvent};
use monitor_core::runtime::{EngineRuntime, TokioTimeProvider};
use monitor_core::scenario::ScenarioLibrary;
use monitor_core::MonitorEngine;

const DEFAULT_RUN_SECONDS: u64 = 30;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let scenario_id = args.next();
    let run_seconds = match args.next() {
        Some(raw) => raw.parse::<u64>()?,
        None => DEFAULT_RUN_SECONDS,
    };

    let config = ConfigLoader::new().load_or_default();
    let thresholds = TomlThresholdStore::new(&config.alarms.thresholds_file).load_or_default();
    let (sink, events) = ChannelEventSink::bounded(config.events.channel_capacity);

    let mut engine = MonitorEngine::new(config)?
        .with_thresholds(thresholds)
        .with_event_sink(Box::new(sink))
        .with_clock(Arc::new(TokioTimeProvider::new()));

    if let Some(id) = scenario_id.as_deref() {
        let library = ScenarioLibrary::built_in();
        if let Err(err) = engine.start_library_scenario(&library, id) {
            let known: Vec<&str> = library.ids().collect();
            warn!(error = %err, known = ?known, "scenario not started");
        }
    }

    let engine = engine.into_shared();
    let mut runtime = EngineRuntime::new(engine.clone());
    runtime.start();

    let mut report = tokio::time::interval(Duration::from_secs(1));
    for _ in 0..run_seconds {
        report.tick().await;

        for event in events.try_iter() {
            match event {
                MonitorEvent::AlarmFired { key, value, .. } => warn!(alarm = %key, value, "ALARM"),
                other => info!(event = ?other, "event"),
            }
        }

        let engine = engine.lock();
        let displayed = engine.displayed();
        info!(
            rhythm = %engine.rhythm(),
            hr = ?displayed.heart_rate,
            spo2 = ?displayed.spo2,
            rr = ?displayed.resp_rate,
            bp = ?(displayed.systolic_bp, displayed.diastolic_bp),
            etco2 = ?displayed.etco2,
            scenario = ?engine.scenario_progress().map(|p| p.fraction),
            "monitor"
        );
    }

    runtime.shutdown();
    info!("headless run finished");
    Ok(())
}
