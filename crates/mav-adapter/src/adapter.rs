use crate::assembly::apply_message;
use crate::config::MavAdapterConfig;
use crate::liveness::{LivenessState, LivenessTracker};
use crate::outbound;
use crate::quarantine::QuarantineTracker;
use crate::signing::{HmacSigner, Signer};
use async_trait::async_trait;
use fleet_proto::{
    DeliveryOptions, DroneId, MessageId, MessagePayload, Priority, ProtocolAdapter, SourceProtocol,
    StatusPayload, TelemetrySample, TransportError, UnifiedMessage,
};
use mavlink::common::MavMessage;
use mavlink::{AsyncMavConnection, MavHeader};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// One drone's assembly state: the running telemetry sample and the last
/// emitted copy, used to decide whether the 100ms pacing gate should defer
/// emission (§4.1).
struct DroneAssembly {
    drone_id: DroneId,
    system_id: u8,
    running: TelemetrySample,
    last_emitted: TelemetrySample,
    last_emitted_at: std::time::Instant,
    last_inbound_seq: Option<u8>,
}

/// Pending acknowledgements this adapter is waiting on, keyed by the drone
/// that should answer. One outstanding mission/command ack per drone at a
/// time; a second `send()` before the first resolves replaces the waiter,
/// mirroring the single-outstanding-command discipline
/// `mavkit::event_loop` uses per vehicle.
type PendingAcks = Arc<Mutex<HashMap<DroneId, oneshot::Sender<bool>>>>;

/// MAVLink v2 protocol adapter. Built on the `mavlink` crate's async
/// connection (UDP/TCP/serial framing, CRC_EXTRA all come from there); this
/// adapter owns per-drone assembly, pacing, liveness, quarantine, signing,
/// and ack-gated command/mission delivery on top of it.
pub struct MavAdapter {
    config: MavAdapterConfig,
    address: String,
    started: AtomicBool,
    cancel: CancellationToken,
    outbound_seq: AtomicU32,
    inbound_tx: mpsc::Sender<UnifiedMessage>,
    inbound_rx: Mutex<Option<mpsc::Receiver<UnifiedMessage>>>,
    connection: Mutex<Option<Arc<dyn AsyncMavConnection<MavMessage> + Send + Sync>>>,
    signer: Option<Arc<dyn Signer>>,
    pending_mission_acks: PendingAcks,
    pending_command_acks: PendingAcks,
}

impl MavAdapter {
    pub fn new(address: impl Into<String>, config: MavAdapterConfig) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(4096);
        let signer = config.signing_key.map(|key| Arc::new(HmacSigner::new(key)) as Arc<dyn Signer>);
        Self {
            config,
            address: address.into(),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            outbound_seq: AtomicU32::new(0),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            connection: Mutex::new(None),
            signer,
            pending_mission_acks: Arc::new(Mutex::new(HashMap::new())),
            pending_command_acks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Takes ownership of the inbound stream. Call once, before or shortly
    /// after `start`; the normalizer reads from it for the adapter's
    /// lifetime.
    pub async fn take_inbound(&self) -> Option<mpsc::Receiver<UnifiedMessage>> {
        self.inbound_rx.lock().await.take()
    }

    fn next_header(&self) -> MavHeader {
        MavHeader {
            system_id: self.config.gcs_system_id,
            component_id: self.config.gcs_component_id,
            sequence: (self.outbound_seq.fetch_add(1, Ordering::Relaxed) & 0xFF) as u8,
        }
    }

    /// Sends one already-encoded frame, signing it first when a signer is
    /// configured. Signing here is a sign-then-self-verify symmetry guard:
    /// it catches a broken signer implementation before a frame goes out,
    /// not a wire-level signature the peer checks (see `outbound::sign_frame`).
    async fn send_once(
        &self,
        connection: &Arc<dyn AsyncMavConnection<MavMessage> + Send + Sync>,
        frame: &MavMessage,
    ) -> Result<(), TransportError> {
        let header = self.next_header();
        if let Some(signer) = &self.signer {
            let timestamp = UnifiedMessage::now_millis();
            let signature = outbound::sign_frame(frame, signer.as_ref(), header.sequence, timestamp);
            if !outbound::verify_frame(frame, signer.as_ref(), header.sequence, timestamp, &signature) {
                return Err(TransportError::SignatureFailure);
            }
        }
        connection
            .send(&header, frame)
            .await
            .map(|_| ())
            .map_err(|err| TransportError::Socket(err.to_string()))
    }

    /// Sends a mission item and blocks until MISSION_ACK answers it or
    /// `mission_item_timeout` elapses (§4.1's ack-gated mission upload).
    async fn send_with_mission_ack(
        &self,
        connection: &Arc<dyn AsyncMavConnection<MavMessage> + Send + Sync>,
        frame: &MavMessage,
        drone_id: DroneId,
    ) -> Result<(), TransportError> {
        let (tx, rx) = oneshot::channel();
        self.pending_mission_acks.lock().await.insert(drone_id, tx);
        if let Err(err) = self.send_once(connection, frame).await {
            self.pending_mission_acks.lock().await.remove(&drone_id);
            return Err(err);
        }
        let result = tokio::time::timeout(self.config.mission_item_timeout, rx).await;
        self.pending_mission_acks.lock().await.remove(&drone_id);
        match result {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(TransportError::Unreachable),
            Ok(Err(_)) => Err(TransportError::Unreachable),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// Sends a command and retries it up to `command_max_retries` times,
    /// each attempt waiting `command_timeout` for COMMAND_ACK before
    /// resending (§4.1's command retry discipline, generalizing
    /// `mavkit::event_loop::handle_command`'s single-vehicle retry loop).
    async fn send_with_command_ack(
        &self,
        connection: &Arc<dyn AsyncMavConnection<MavMessage> + Send + Sync>,
        frame: &MavMessage,
        drone_id: DroneId,
    ) -> Result<(), TransportError> {
        let mut attempts = 0u8;
        loop {
            attempts += 1;
            let (tx, rx) = oneshot::channel();
            self.pending_command_acks.lock().await.insert(drone_id, tx);
            if let Err(err) = self.send_once(connection, frame).await {
                self.pending_command_acks.lock().await.remove(&drone_id);
                return Err(err);
            }
            let result = tokio::time::timeout(self.config.command_timeout, rx).await;
            self.pending_command_acks.lock().await.remove(&drone_id);
            let retry_exhausted = attempts >= self.config.command_max_retries;
            match result {
                Ok(Ok(true)) => return Ok(()),
                Ok(Ok(false)) | Ok(Err(_)) if retry_exhausted => return Err(TransportError::Unreachable),
                Ok(Ok(false)) | Ok(Err(_)) => continue,
                Err(_) if retry_exhausted => return Err(TransportError::Timeout),
                Err(_) => continue,
            }
        }
    }
}

#[async_trait]
impl ProtocolAdapter for MavAdapter {
    fn protocol(&self) -> SourceProtocol {
        SourceProtocol::Mavlink
    }

    async fn start(&self) -> Result<(), TransportError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let connection = mavlink::connect_async::<MavMessage>(&self.address)
            .await
            .map_err(|err| TransportError::Socket(err.to_string()))?;
        let connection: Arc<dyn AsyncMavConnection<MavMessage> + Send + Sync> = connection.into();
        *self.connection.lock().await = Some(connection.clone());

        let cancel = self.cancel.clone();
        let tx = self.inbound_tx.clone();
        let degraded_after = self.config.degraded_after;
        let lost_after = self.config.lost_after;
        let pace = self.config.telemetry_pace;
        let quarantine_threshold = self.config.quarantine_threshold;
        let quarantine_duration = self.config.quarantine_duration;
        let pending_mission_acks = self.pending_mission_acks.clone();
        let pending_command_acks = self.pending_command_acks.clone();

        tokio::spawn(async move {
            run_inbound_loop(
                connection,
                tx,
                cancel,
                degraded_after,
                lost_after,
                pace,
                quarantine_threshold,
                quarantine_duration,
                pending_mission_acks,
                pending_command_acks,
            )
            .await;
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.cancel.cancel();
        self.started.store(false, Ordering::SeqCst);
        *self.connection.lock().await = None;
        Ok(())
    }

    async fn send(&self, message: &UnifiedMessage) -> Result<(), TransportError> {
        let connection = self
            .connection
            .lock()
            .await
            .clone()
            .ok_or(TransportError::Unreachable)?;

        // target identity is carried as the low byte of drone_id by
        // convention for MAVLink (§ assembly: system_id maps 1:1 to
        // DroneId on this adapter).
        let target_system = (message.drone_id.0 & 0xFF) as u8;
        let target_component = 1;

        let frame = outbound::encode(message, target_system, target_component)
            .map_err(TransportError::Socket)?;

        match &message.payload {
            MessagePayload::Mission(_) => {
                self.send_with_mission_ack(&connection, &frame, message.drone_id).await
            }
            MessagePayload::Command(_) => {
                self.send_with_command_ack(&connection, &frame, message.drone_id).await
            }
            _ => self.send_once(&connection, &frame).await,
        }
    }

    fn is_available(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// The `mavlink` crate retries/resyncs internally on a bad CRC rather than
/// surfacing a typed CRC error from `recv()`, so there's no distinct
/// variant to match on; this classifies the opaque error's own message
/// text, which is the only signal available at this boundary.
fn classify_recv_error(message: &str) -> TransportError {
    let lower = message.to_lowercase();
    if lower.contains("crc") {
        TransportError::CrcFailure
    } else if lower.contains("signature") {
        TransportError::SignatureFailure
    } else {
        TransportError::Socket(message.to_string())
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_inbound_loop(
    connection: Arc<dyn AsyncMavConnection<MavMessage> + Send + Sync>,
    tx: mpsc::Sender<UnifiedMessage>,
    cancel: CancellationToken,
    degraded_after: std::time::Duration,
    lost_after: std::time::Duration,
    pace: std::time::Duration,
    quarantine_threshold: u32,
    quarantine_duration: std::time::Duration,
    pending_mission_acks: PendingAcks,
    pending_command_acks: PendingAcks,
) {
    let mut assemblies: HashMap<u8, DroneAssembly> = HashMap::new();
    let mut liveness = LivenessTracker::new(degraded_after, lost_after);
    let mut quarantine = QuarantineTracker::new(quarantine_threshold, quarantine_duration);
    let mut liveness_interval = tokio::time::interval(degraded_after.min(lost_after));

    // The mavlink crate's connections don't expose the transport's peer
    // address uniformly, so recv-level failures (no header to derive a
    // per-system pseudo source from) are quarantined against one fixed
    // connection-wide address rather than per-drone.
    let conn_pseudo_source: std::net::SocketAddr = "0.0.0.0:65535".parse().unwrap();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("mav adapter inbound loop cancelled");
                break;
            }
            _ = liveness_interval.tick() => {
                for (drone, state) in liveness.tick() {
                    let status = match state {
                        LivenessState::Nominal => continue,
                        LivenessState::Degraded => fleet_proto::DroneStatus::Degraded,
                        LivenessState::Lost => fleet_proto::DroneStatus::Lost,
                    };
                    let msg = UnifiedMessage {
                        message_id: MessageId(0),
                        drone_id: drone,
                        source_protocol: SourceProtocol::Mavlink,
                        timestamp: UnifiedMessage::now_millis(),
                        priority: Priority::High,
                        payload: MessagePayload::Status(StatusPayload { status, detail: None }),
                        delivery: DeliveryOptions::default(),
                        external_sequence_number: None,
                    };
                    let _ = tx.send(msg).await;
                }
            }
            result = connection.recv() => {
                match result {
                    Ok((header, msg)) => {
                        // A loopback-free address is treated as the source
                        // for quarantine purposes; the mavlink crate
                        // doesn't expose the peer socket on every
                        // transport, so quarantine keys on system_id here.
                        let pseudo_source: std::net::SocketAddr =
                            format!("0.0.0.0:{}", header.system_id as u16 + 20000)
                                .parse()
                                .unwrap();
                        if quarantine.is_quarantined(pseudo_source) {
                            trace!(system_id = header.system_id, "dropping frame from quarantined source");
                            continue;
                        }
                        quarantine.record_success(pseudo_source);

                        let drone_id = DroneId(header.system_id as u64);
                        liveness.record_frame(drone_id);

                        match &msg {
                            MavMessage::MISSION_ACK(ack) => {
                                if let Some(waiter) = pending_mission_acks.lock().await.remove(&drone_id) {
                                    let accepted = ack.mavtype == mavlink::common::MavMissionResult::MAV_MISSION_ACCEPTED;
                                    let _ = waiter.send(accepted);
                                }
                            }
                            MavMessage::COMMAND_ACK(ack) => {
                                if let Some(waiter) = pending_command_acks.lock().await.remove(&drone_id) {
                                    let accepted = ack.result == mavlink::common::MavResult::MAV_RESULT_ACCEPTED;
                                    let _ = waiter.send(accepted);
                                }
                            }
                            _ => {}
                        }

                        let assembly = assemblies.entry(header.system_id).or_insert_with(|| {
                            DroneAssembly {
                                drone_id,
                                system_id: header.system_id,
                                running: TelemetrySample::default(),
                                last_emitted: TelemetrySample::default(),
                                last_emitted_at: std::time::Instant::now() - pace,
                                last_inbound_seq: None,
                            }
                        });

                        apply_message(&mut assembly.running, &msg);

                        let critical_change = assembly
                            .running
                            .critical_fields_changed(&assembly.last_emitted);
                        let paced_ok = assembly.last_emitted_at.elapsed() >= pace;

                        if (paced_ok || critical_change) && assembly.running.has_any_reading() {
                            assembly.last_emitted = assembly.running.clone();
                            assembly.last_emitted_at = std::time::Instant::now();
                            let seq = match &msg {
                                MavMessage::HEARTBEAT(_) => Some(header.sequence as u32),
                                _ => Some(header.sequence as u32),
                            };
                            assembly.last_inbound_seq = seq.map(|s| s as u8);
                            let unified = UnifiedMessage {
                                message_id: MessageId(0),
                                drone_id: assembly.drone_id,
                                source_protocol: SourceProtocol::Mavlink,
                                timestamp: UnifiedMessage::now_millis(),
                                priority: Priority::Normal,
                                payload: MessagePayload::Telemetry(assembly.running.clone()),
                                delivery: DeliveryOptions::default(),
                                external_sequence_number: seq,
                            };
                            if tx.send(unified).await.is_err() {
                                break;
                            }
                        }
                        let _ = assembly.system_id;
                    }
                    Err(err) => {
                        let classified = classify_recv_error(&err.to_string());
                        warn!(error = %classified, "MAVLink recv error: {err}");
                        if quarantine.record_failure(conn_pseudo_source) {
                            warn!("mav adapter connection quarantined after repeated recv failures");
                        }
                    }
                }
            }
        }
    }
}
