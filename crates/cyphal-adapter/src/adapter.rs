use crate::config::CyphalAdapterConfig;
use crate::dedup::TransferDedup;
use crate::frame::{decode_frame, encode_frame, CyphalFrame, TransferKind};
use async_trait::async_trait;
use fleet_proto::{DroneId, MessageId, ProtocolAdapter, SourceProtocol, TransportError, UnifiedMessage};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

fn subject_id_for(message: &UnifiedMessage) -> u16 {
    match message.kind() {
        fleet_proto::MessageKind::Telemetry => 100,
        fleet_proto::MessageKind::Status => 101,
        fleet_proto::MessageKind::Heartbeat => 102,
        fleet_proto::MessageKind::Command => 200,
        fleet_proto::MessageKind::Mission => 201,
        fleet_proto::MessageKind::Ack => 202,
    }
}

fn transfer_kind_for(message: &UnifiedMessage) -> TransferKind {
    match message.kind() {
        fleet_proto::MessageKind::Command | fleet_proto::MessageKind::Mission => {
            TransferKind::Request
        }
        fleet_proto::MessageKind::Ack => TransferKind::Response,
        _ => TransferKind::Message,
    }
}

/// Cyphal/UDP protocol adapter: subject/service messaging over multicast,
/// with optional redundant transmission across 2-3 ports and receiver-side
/// dedup by `(node_id, transfer_id)` (spec §4.1).
pub struct CyphalAdapter {
    config: CyphalAdapterConfig,
    started: AtomicBool,
    cancel: CancellationToken,
    transfer_seq: AtomicU64,
    inbound_tx: mpsc::Sender<UnifiedMessage>,
    inbound_rx: Mutex<Option<mpsc::Receiver<UnifiedMessage>>>,
    send_sockets: Mutex<Vec<Arc<UdpSocket>>>,
}

impl CyphalAdapter {
    pub fn new(config: CyphalAdapterConfig) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(4096);
        Self {
            config,
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            transfer_seq: AtomicU64::new(1),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            send_sockets: Mutex::new(Vec::new()),
        }
    }

    pub async fn take_inbound(&self) -> Option<mpsc::Receiver<UnifiedMessage>> {
        self.inbound_rx.lock().await.take()
    }

    async fn bind_receiver(&self, port: u16) -> Result<UdpSocket, TransportError> {
        let socket = UdpSocket::bind((self.config.bind_address, port))
            .await
            .map_err(|err| TransportError::Socket(err.to_string()))?;
        socket
            .join_multicast_v4(self.config.multicast_group, self.config.bind_address)
            .map_err(|err| TransportError::Socket(err.to_string()))?;
        Ok(socket)
    }
}

#[async_trait]
impl ProtocolAdapter for CyphalAdapter {
    fn protocol(&self) -> SourceProtocol {
        SourceProtocol::Cyphal
    }

    async fn start(&self) -> Result<(), TransportError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut sockets = Vec::new();
        for port in self.config.all_ports() {
            let socket = self.bind_receiver(port).await?;
            sockets.push(Arc::new(socket));
        }

        // Outbound sends use an ephemeral socket per port rather than the
        // bound multicast receivers (sending from a multicast-joined socket
        // works but binding a fresh one for transmit keeps the two paths
        // independent, matching the adapter's send/receive symmetry with
        // the MAVLink side).
        let mut send_sockets = Vec::new();
        for _ in &self.config.all_ports() {
            let socket = UdpSocket::bind((self.config.bind_address, 0))
                .await
                .map_err(|err| TransportError::Socket(err.to_string()))?;
            send_sockets.push(Arc::new(socket));
        }
        *self.send_sockets.lock().await = send_sockets;

        let cancel = self.cancel.clone();
        let tx = self.inbound_tx.clone();
        let dedup_window = self.config.transfer_dedup_window;

        tokio::spawn(async move {
            run_inbound_loop(sockets, tx, cancel, dedup_window).await;
        });
        Ok(())
    }

    async fn stop(&self) -> Result<(), TransportError> {
        self.cancel.cancel();
        self.started.store(false, Ordering::SeqCst);
        self.send_sockets.lock().await.clear();
        Ok(())
    }

    async fn send(&self, message: &UnifiedMessage) -> Result<(), TransportError> {
        let sockets = self.send_sockets.lock().await;
        if sockets.is_empty() {
            return Err(TransportError::Unreachable);
        }

        let payload = fleet_proto_payload_bytes(message)?;
        let transfer_id = self.transfer_seq.fetch_add(1, Ordering::Relaxed);
        let frame = CyphalFrame {
            node_id: self.config.local_node_id,
            transfer_id,
            subject_or_service_id: subject_id_for(message),
            kind: transfer_kind_for(message),
            priority: message.priority.into(),
            payload,
        };
        let bytes = encode_frame(&frame).map_err(|err| TransportError::Socket(err.to_string()))?;

        let ports = self.config.all_ports();
        for (socket, port) in sockets.iter().zip(ports.iter()) {
            let dest: SocketAddr = SocketAddr::new(self.config.multicast_group.into(), *port);
            if let Err(err) = socket.send_to(&bytes, dest).await {
                warn!(port, "cyphal send failed: {err}");
            }
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

/// `MessagePayload` is internally tagged (`#[serde(tag = "kind")]`), which
/// needs a self-describing format to deserialize; bincode's frame envelope
/// isn't one, so the payload itself travels as JSON inside the envelope's
/// `payload: Vec<u8>`.
fn fleet_proto_payload_bytes(message: &UnifiedMessage) -> Result<Vec<u8>, TransportError> {
    serde_json::to_vec(&message.payload).map_err(|err| TransportError::Socket(err.to_string()))
}

/// One task per bound port, each pushing raw datagrams into a shared
/// channel; a single consumer task owns the dedup table so `(node_id,
/// transfer_id)` suppression is correct across ports without locking.
async fn run_inbound_loop(
    sockets: Vec<Arc<UdpSocket>>,
    tx: mpsc::Sender<UnifiedMessage>,
    cancel: CancellationToken,
    dedup_window: std::time::Duration,
) {
    let (raw_tx, mut raw_rx) = mpsc::channel::<Vec<u8>>(4096);

    for socket in sockets {
        let raw_tx = raw_tx.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut buf = vec![0u8; 65536];
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    result = socket.recv_from(&mut buf) => {
                        match result {
                            Ok((len, _peer)) => {
                                if raw_tx.send(buf[..len].to_vec()).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => warn!("cyphal recv error: {err}"),
                        }
                    }
                }
            }
        });
    }
    drop(raw_tx);

    let mut dedup = TransferDedup::new(dedup_window);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("cyphal adapter inbound loop cancelled");
                break;
            }
            datagram = raw_rx.recv() => {
                let Some(bytes) = datagram else { break };
                match decode_frame(&bytes) {
                    Ok(frame) => {
                        if !dedup.admit(frame.node_id, frame.transfer_id) {
                            trace!(node_id = frame.node_id, transfer_id = frame.transfer_id, "duplicate cyphal transfer suppressed");
                            continue;
                        }
                        match serde_json::from_slice::<fleet_proto::MessagePayload>(&frame.payload) {
                            Ok(payload) => {
                                let unified = UnifiedMessage {
                                    message_id: MessageId(0),
                                    drone_id: DroneId(frame.node_id as u64),
                                    source_protocol: SourceProtocol::Cyphal,
                                    timestamp: UnifiedMessage::now_millis(),
                                    priority: fleet_proto::Priority::Normal,
                                    payload,
                                    delivery: fleet_proto::DeliveryOptions::default(),
                                    external_sequence_number: Some(frame.transfer_id as u32),
                                };
                                if tx.send(unified).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => warn!("cyphal payload decode failed: {err}"),
                        }
                    }
                    Err(err) => warn!("cyphal frame decode failed: {err}"),
                }
            }
        }
    }
}
