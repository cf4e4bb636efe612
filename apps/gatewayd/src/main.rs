//! Standalone binary tying protocol adapters, the router, the detection
//! pipeline, and the alert engine into one process (spec §2/§5), the way
//! `mavkit::vehicle::Vehicle::connect_with_config` ties its own task
//! groups together behind one `CancellationToken`, generalized here to
//! the whole gateway rather than one vehicle connection.

mod api;
mod config;
mod shutdown;
mod state;
mod stream;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use cyphal_adapter::CyphalAdapter;
use fleet_alert::{AlertEngine, CorrelationEngine};
use fleet_proto::{CapabilityRegistry, Normalizer, ProtocolAdapter, TelemetryBus};
use fleet_router::{Router, RouterConfig};
use mav_adapter::MavAdapter;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::GatewayConfig;
use crate::state::GatewayState;

#[derive(Parser, Debug)]
#[command(name = "gatewayd", about = "Drone fleet protocol gateway")]
struct Args {
    /// Path to a TOML config file. Missing/absent file falls back to
    /// defaults plus environment overrides.
    #[arg(long, env = "GATEWAYD_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Address the control API and `/stream` websocket bind to.
    #[arg(long, env = "GATEWAYD_BIND", default_value = "0.0.0.0:8088")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = GatewayConfig::load(args.config.as_deref())?;

    info!(bind = %args.bind, "starting gatewayd");

    let cancel = CancellationToken::new();
    let capabilities = Arc::new(CapabilityRegistry::new());
    let telemetry_bus = Arc::new(Mutex::new(TelemetryBus::new(config.detection.telemetry_buffer_size)));

    let router_config = RouterConfig {
        default_strategy: fleet_router::RoutingStrategy::Direct,
        failover: fleet_router::FailoverConfig::default(),
        breaker_threshold: config.routing.circuit_breaker_threshold,
        breaker_recovery_time: config.routing.health_check_interval,
        ewma_alpha: fleet_router::DEFAULT_EWMA_ALPHA,
        load_balance_algorithm: config.routing.algorithm.into(),
    };
    let router = Arc::new(Router::new(router_config));

    let mut adapters: Vec<Arc<dyn ProtocolAdapter>> = Vec::new();
    // One generator shared by every adapter's normalizer task so
    // `message_id` ordering is meaningful across protocols, not just
    // within one adapter's stream.
    let id_gen = Arc::new(fleet_proto::MessageIdGenerator::new());

    if config.gateway.mavlink.enabled {
        let mav_config = mav_adapter::MavAdapterConfig { connect_timeout: config.gateway.mavlink.timeout, ..Default::default() };
        let adapter = Arc::new(MavAdapter::new(config.gateway.mavlink.url.clone(), mav_config));
        let inbound = adapter.take_inbound().await.context("mavlink adapter inbound already taken")?;
        adapter.start().await.context("mavlink adapter failed to start")?;
        router.register(adapter.clone()).await;
        spawn_normalizer(inbound, telemetry_bus.clone(), id_gen.clone(), capabilities.clone(), cancel.clone());
        adapters.push(adapter);
    }

    if config.gateway.cyphal.enabled {
        let cyphal_config = cyphal_adapter::CyphalAdapterConfig {
            local_node_id: config.gateway.cyphal.node_id,
            multicast_group: config.gateway.cyphal.multicast,
            primary_port: config.gateway.cyphal.port,
            redundant_ports: config.gateway.cyphal.redundant_ports.clone(),
            ..Default::default()
        };
        let adapter = Arc::new(CyphalAdapter::new(cyphal_config));
        let inbound = adapter.take_inbound().await.context("cyphal adapter inbound already taken")?;
        adapter.start().await.context("cyphal adapter failed to start")?;
        router.register(adapter.clone()).await;
        spawn_normalizer(inbound, telemetry_bus.clone(), id_gen.clone(), capabilities.clone(), cancel.clone());
        adapters.push(adapter);
    }

    let (findings_tx, mut findings_rx) = tokio::sync::mpsc::channel(4096);
    let pipeline = fleet_detect::DetectionPipeline::new(findings_tx);
    let pipeline_rx = telemetry_bus.lock().await.subscribe_lossy();
    tokio::spawn(pipeline.run(pipeline_rx, cancel.clone()));

    let (alert_engine, fired_rx) = AlertEngine::new(
        CorrelationEngine::new(config.alerts.correlation_rules.clone()),
        config.alerts.escalation_rules.clone(),
        config.alerts.recipients.clone(),
        Vec::new(),
        config.alerts.templates.first().cloned().unwrap_or(fleet_alert::NotificationTemplate {
            name: "default".into(),
            body: "drone {drone_id}: {severity} {finding_type} ({detail})".into(),
        }),
    );
    let alert_engine = Arc::new(Mutex::new(alert_engine));
    tokio::spawn(fleet_alert::run_escalation_loop(alert_engine.clone(), fired_rx, cancel.clone()));

    let state = Arc::new(GatewayState::new(
        router.clone(),
        alert_engine.clone(),
        telemetry_bus.clone(),
        capabilities.clone(),
        config.clone(),
        id_gen.clone(),
        cancel.clone(),
    ));

    let findings_state = state.clone();
    let findings_engine = alert_engine.clone();
    let findings_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = findings_cancel.cancelled() => break,
                received = findings_rx.recv() => {
                    match received {
                        Some(finding) => {
                            findings_state.record_finding(finding.clone());
                            let mut engine = findings_engine.lock().await;
                            if let Some(alert_id) = engine.handle_finding(finding, chrono::Utc::now()).await {
                                if let Some(alert) = engine.get(alert_id) {
                                    findings_state.publish_alert(alert.clone());
                                }
                            }
                        }
                        None => break,
                    }
                }
            }
        }
    });

    let app = api::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&args.bind).await.context("binding control API listener")?;
    info!(bind = %args.bind, "control API listening");

    let serve_cancel = cancel.clone();
    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
        serve_cancel.cancelled().await;
    });

    tokio::select! {
        result = serve => {
            if let Err(err) = result {
                warn!("control API server exited with an error: {err}");
            }
        }
        _ = shutdown::wait_for_signal() => {}
    }

    shutdown::shutdown(state, adapters).await;
    Ok(())
}

fn spawn_normalizer(
    mut inbound: tokio::sync::mpsc::Receiver<fleet_proto::UnifiedMessage>,
    bus: Arc<Mutex<TelemetryBus>>,
    id_gen: Arc<fleet_proto::MessageIdGenerator>,
    capabilities: Arc<CapabilityRegistry>,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut normalizer = Normalizer::new(id_gen);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = inbound.recv() => {
                    match received {
                        Some(message) => match normalizer.normalize(message) {
                            Ok(normalized) => {
                                if let Err(err) = capabilities.observe(normalized.drone_id, normalized.source_protocol) {
                                    warn!("dropped inbound frame: {err}");
                                    continue;
                                }
                                if let Err(err) = bus.lock().await.publish(normalized).await {
                                    warn!("telemetry bus publish failed: {err}");
                                }
                            }
                            Err(err) => warn!("dropped inbound frame: {err}"),
                        },
                        None => break,
                    }
                }
            }
        }
    });
}
