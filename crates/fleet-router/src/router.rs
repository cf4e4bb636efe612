use crate::balancer::{LoadBalanceAlgorithm, LoadBalancer};
use crate::breaker::CircuitBreaker;
use crate::metrics::{RoutingMetrics, DEFAULT_EWMA_ALPHA};
use crate::scoring::{rank, score};
use crate::strategy::{FailoverConfig, RoutingStrategy};
use fleet_proto::{adapter::classify_send_failure, DroneCapabilities, ProtocolAdapter, RoutingError, SourceProtocol, UnifiedMessage};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub default_strategy: RoutingStrategy,
    pub failover: FailoverConfig,
    pub breaker_threshold: u32,
    pub breaker_recovery_time: Duration,
    pub ewma_alpha: f64,
    pub load_balance_algorithm: LoadBalanceAlgorithm,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_strategy: RoutingStrategy::Direct,
            failover: FailoverConfig::default(),
            breaker_threshold: 5,
            breaker_recovery_time: Duration::from_secs(30),
            ewma_alpha: DEFAULT_EWMA_ALPHA,
            load_balance_algorithm: LoadBalanceAlgorithm::Adaptive,
        }
    }
}

struct ProtocolState {
    adapter: Arc<dyn ProtocolAdapter>,
    metrics: RoutingMetrics,
    breaker: CircuitBreaker,
}

/// Selects and drives outbound sends across registered protocol adapters,
/// applying scoring, circuit-breaker discipline, and the configured
/// routing strategy (spec §4.3). Metrics and breaker state live behind one
/// `RwLock` per the "single-owner update task, readers see a consistent
/// snapshot" resource-model rule (§5) — the router itself is that owner.
pub struct Router {
    config: RouterConfig,
    protocols: RwLock<HashMap<SourceProtocol, ProtocolState>>,
    balancer: LoadBalancer,
}

impl Router {
    pub fn new(config: RouterConfig) -> Self {
        let balancer = LoadBalancer::new(config.load_balance_algorithm);
        Self {
            config,
            protocols: RwLock::new(HashMap::new()),
            balancer,
        }
    }

    pub async fn register(&self, adapter: Arc<dyn ProtocolAdapter>) {
        let protocol = adapter.protocol();
        let mut protocols = self.protocols.write().await;
        protocols.insert(
            protocol,
            ProtocolState {
                adapter,
                metrics: RoutingMetrics::new(protocol),
                breaker: CircuitBreaker::new(self.config.breaker_threshold, self.config.breaker_recovery_time),
            },
        );
    }

    /// Snapshot of (protocol, score, may_send) for every registered
    /// protocol, used by `/drones/{id}` and `/status` reporting.
    pub async fn snapshot(&self, message: &UnifiedMessage) -> Vec<(SourceProtocol, f64, bool)> {
        let mut protocols = self.protocols.write().await;
        protocols
            .values_mut()
            .map(|state| {
                let s = score(&state.metrics, message.priority);
                let available = state.adapter.is_available() && state.breaker.may_send();
                (state.metrics.protocol, s, available)
            })
            .collect()
    }

    /// Route and send `message` according to the configured strategy,
    /// returning once the strategy's success/failure criterion is met.
    pub async fn route(
        &self,
        message: &UnifiedMessage,
        capabilities: Option<&DroneCapabilities>,
    ) -> Result<SourceProtocol, RoutingError> {
        match self.config.default_strategy {
            RoutingStrategy::Direct => self.route_direct(message).await,
            RoutingStrategy::Failover => self.route_failover(message).await,
            RoutingStrategy::Redundant { n } => self.route_redundant(message, n).await,
            RoutingStrategy::Mesh => self.route_mesh(message, capabilities).await,
        }
    }

    async fn candidates(&self, message: &UnifiedMessage) -> Vec<(RoutingMetrics, f64)> {
        let mut protocols = self.protocols.write().await;
        let mut out = Vec::new();
        for state in protocols.values_mut() {
            if state.adapter.is_available() && state.breaker.may_send() {
                let s = score(&state.metrics, message.priority);
                out.push((state.metrics.clone(), s));
            }
        }
        out
    }

    async fn route_direct(&self, message: &UnifiedMessage) -> Result<SourceProtocol, RoutingError> {
        let candidates = self.candidates(message).await;
        let best = rank(&candidates)
            .into_iter()
            .next()
            .ok_or(RoutingError::NoAvailableProtocol)?;
        let protocol = best.0.protocol;
        self.attempt_send(protocol, message).await?;
        Ok(protocol)
    }

    async fn route_failover(&self, message: &UnifiedMessage) -> Result<SourceProtocol, RoutingError> {
        let candidates = self.candidates(message).await;
        let ranked = rank(&candidates);
        if ranked.is_empty() {
            return Err(RoutingError::NoAvailableProtocol);
        }

        let mut attempts = 0u8;
        let mut last_err = RoutingError::NoAvailableProtocol;
        for (metrics, _) in ranked.into_iter() {
            if attempts >= self.config.failover.max_retries {
                break;
            }
            attempts += 1;
            let protocol = metrics.protocol;
            let send = tokio::time::timeout(
                self.config.failover.fallback_timeout,
                self.attempt_send(protocol, message),
            )
            .await;
            match send {
                Ok(Ok(())) => return Ok(protocol),
                Ok(Err(err)) => {
                    debug!(%protocol, "failover attempt failed: {err}");
                    last_err = err;
                }
                Err(_) => {
                    debug!(%protocol, "failover attempt timed out");
                    last_err = RoutingError::RetriesExhausted(attempts as u32);
                }
            }
        }
        Err(last_err)
    }

    async fn route_redundant(&self, message: &UnifiedMessage, n: usize) -> Result<SourceProtocol, RoutingError> {
        let candidates = self.candidates(message).await;
        let ranked = rank(&candidates);
        let top: Vec<SourceProtocol> = ranked.into_iter().take(n.max(1)).map(|(m, _)| m.protocol).collect();
        if top.is_empty() {
            return Err(RoutingError::NoAvailableProtocol);
        }

        let mut futures = Vec::new();
        for protocol in top {
            futures.push(async move { (protocol, self.attempt_send(protocol, message).await) });
        }

        let mut pending: futures::stream::FuturesUnordered<_> = futures.into_iter().collect();
        use futures::StreamExt;
        let mut last_err = RoutingError::NoAvailableProtocol;
        while let Some((protocol, result)) = pending.next().await {
            match result {
                Ok(()) => return Ok(protocol),
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }

    /// Mesh routing assumes the drone has more than one reachable link and
    /// spreads traffic across them with the configured `LoadBalancer`
    /// rather than always picking the single top-scoring protocol the way
    /// `route_direct` does — a mesh-capable drone gains nothing from mesh
    /// routing if every message still lands on one link. A non-mesh-capable
    /// drone falls back to `route_direct` since there's no second link to
    /// spread across.
    async fn route_mesh(
        &self,
        message: &UnifiedMessage,
        capabilities: Option<&DroneCapabilities>,
    ) -> Result<SourceProtocol, RoutingError> {
        let mesh_capable = capabilities.map(|c| c.mesh_capable).unwrap_or(false);
        if !mesh_capable {
            return self.route_direct(message).await;
        }
        let candidates = self.candidates(message).await;
        if candidates.is_empty() {
            return Err(RoutingError::NoAvailableProtocol);
        }
        let metrics: Vec<RoutingMetrics> = candidates.iter().map(|(m, _)| m.clone()).collect();
        let scores: Vec<f64> = candidates.iter().map(|(_, s)| *s).collect();
        let best_score = scores.iter().cloned().fold(f64::MIN, f64::max);
        let protocol = self.balancer.select(&metrics, best_score, &scores);
        self.attempt_send(protocol, message).await?;
        Ok(protocol)
    }

    async fn attempt_send(&self, protocol: SourceProtocol, message: &UnifiedMessage) -> Result<(), RoutingError> {
        let adapter = {
            let protocols = self.protocols.read().await;
            let state = protocols.get(&protocol).ok_or(RoutingError::NoAvailableProtocol)?;
            state.adapter.clone()
        };

        let started = Instant::now();
        let result = adapter.send(message).await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        let mut protocols = self.protocols.write().await;
        if let Some(state) = protocols.get_mut(&protocol) {
            match &result {
                Ok(()) => {
                    state.metrics.record(self.config.ewma_alpha, true, Some(latency_ms));
                    state.breaker.record_success();
                }
                Err(_) => {
                    state.metrics.record(self.config.ewma_alpha, false, None);
                    state.breaker.record_failure();
                }
            }
        }
        drop(protocols);

        result.map_err(|err| {
            warn!(%protocol, "send failed: {err}");
            classify_send_failure(&err)
        })
    }
}
