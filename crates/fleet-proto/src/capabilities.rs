use crate::error::BackpressureError;
use crate::message::SourceProtocol;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Admission window and per-drone cap for [`CapabilityRegistry::observe`]
/// (spec §4.2 bootstrap control): a spoofed or misbehaving drone id can
/// otherwise churn the registry with sightings on every frame.
const ADMISSION_WINDOW: Duration = Duration::from_secs(60 * 60);
const ADMISSION_LIMIT: usize = 10;

/// Capabilities a drone advertises. Created on first sighting, updated only
/// on an explicit advertisement frame, never removed for the life of the
/// gateway process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneCapabilities {
    pub supported_protocols: Vec<SourceProtocol>,
    pub preferred_protocol: Option<SourceProtocol>,
    pub mesh_capable: bool,
    pub max_throughput_bps: f64,
    pub encryption_support: bool,
}

impl Default for DroneCapabilities {
    fn default() -> Self {
        Self {
            supported_protocols: Vec::new(),
            preferred_protocol: None,
            mesh_capable: false,
            max_throughput_bps: 0.0,
            encryption_support: false,
        }
    }
}

/// Registry of per-drone capabilities, shared between adapters (writers on
/// advertisement) and the router / control API (readers).
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    inner: RwLock<HashMap<crate::ids::DroneId, DroneCapabilities>>,
    admissions: RwLock<HashMap<crate::ids::DroneId, VecDeque<Instant>>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, drone_id: crate::ids::DroneId) -> DroneCapabilities {
        self.inner
            .read()
            .unwrap()
            .get(&drone_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Record a sighting: if the drone is unknown, create a default entry.
    /// Never overwrites an existing entry's fields — only `advertise` does.
    /// Rejects the sighting with `AdmissionDenied` once a drone id has been
    /// observed `ADMISSION_LIMIT` times within `ADMISSION_WINDOW`, so a
    /// single id can't be used to spam registry churn.
    pub fn observe(&self, drone_id: crate::ids::DroneId, protocol: SourceProtocol) -> Result<(), BackpressureError> {
        self.admit(drone_id)?;
        let mut guard = self.inner.write().unwrap();
        let entry = guard.entry(drone_id).or_default();
        if !entry.supported_protocols.contains(&protocol) {
            entry.supported_protocols.push(protocol);
        }
        Ok(())
    }

    fn admit(&self, drone_id: crate::ids::DroneId) -> Result<(), BackpressureError> {
        let now = Instant::now();
        let mut guard = self.admissions.write().unwrap();
        let window = guard.entry(drone_id).or_default();
        while window.front().is_some_and(|&seen| now.duration_since(seen) > ADMISSION_WINDOW) {
            window.pop_front();
        }
        if window.len() >= ADMISSION_LIMIT {
            return Err(BackpressureError::AdmissionDenied(drone_id.0.to_string()));
        }
        window.push_back(now);
        Ok(())
    }

    /// Apply an explicit capability advertisement, replacing the stored
    /// record wholesale.
    pub fn advertise(&self, drone_id: crate::ids::DroneId, capabilities: DroneCapabilities) {
        self.inner.write().unwrap().insert(drone_id, capabilities);
    }

    pub fn all(&self) -> HashMap<crate::ids::DroneId, DroneCapabilities> {
        self.inner.read().unwrap().clone()
    }
}
