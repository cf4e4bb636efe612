/// Summary of one inbound-traffic observation window used by the network
/// anomaly heuristics (spec §4.4). Detectors here operate on shape, not
/// payload contents, except `injection` which takes an already-extracted
/// signature match.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrafficWindow {
    pub packets_per_sec: f64,
    pub mean_packet_size_bytes: f64,
    pub packet_size_stddev_bytes: f64,
    pub large_packet_fraction: f64,
    pub weak_encryption_signal: bool,
    pub scan_signature_hits: u32,
    pub small_probe_count: u32,
    pub injection_signature_hits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkThreat {
    DenialOfService,
    Injection,
    Exfiltration,
    Reconnaissance,
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkFinding {
    pub threat: NetworkThreat,
    pub score: f64,
}

const DOS_PPS_THRESHOLD: f64 = 500.0;
const UNIFORM_SIZE_STDDEV_FRACTION: f64 = 0.05;
const EXFIL_LARGE_FRACTION_THRESHOLD: f64 = 0.4;
const RECON_SCAN_THRESHOLD: u32 = 5;

/// Runs every heuristic against one window and returns the findings whose
/// score clears 0.5, highest score first.
pub fn evaluate(window: &TrafficWindow) -> Vec<NetworkFinding> {
    let mut findings = vec![
        NetworkFinding { threat: NetworkThreat::DenialOfService, score: dos_score(window) },
        NetworkFinding { threat: NetworkThreat::Injection, score: injection_score(window) },
        NetworkFinding { threat: NetworkThreat::Exfiltration, score: exfiltration_score(window) },
        NetworkFinding { threat: NetworkThreat::Reconnaissance, score: reconnaissance_score(window) },
    ];
    findings.retain(|f| f.score > 0.5);
    findings.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
    findings
}

/// DoS: abnormally high packet rate of uniformly small packets.
fn dos_score(window: &TrafficWindow) -> f64 {
    if window.mean_packet_size_bytes <= 0.0 {
        return 0.0;
    }
    let rate_score = (window.packets_per_sec / DOS_PPS_THRESHOLD).clamp(0.0, 1.0);
    let uniformity = window.packet_size_stddev_bytes / window.mean_packet_size_bytes;
    let uniformity_score = (1.0 - uniformity / UNIFORM_SIZE_STDDEV_FRACTION).clamp(0.0, 1.0);
    (0.7 * rate_score + 0.3 * uniformity_score).min(1.0)
}

/// Injection: presence of known payload-signature matches in the window.
fn injection_score(window: &TrafficWindow) -> f64 {
    (window.injection_signature_hits as f64 / 3.0).clamp(0.0, 1.0)
}

/// Exfiltration: a heavy tail of large packets combined with a weak or
/// absent encryption signal.
fn exfiltration_score(window: &TrafficWindow) -> f64 {
    let size_score = (window.large_packet_fraction / EXFIL_LARGE_FRACTION_THRESHOLD).clamp(0.0, 1.0);
    let encryption_score = if window.weak_encryption_signal { 1.0 } else { 0.0 };
    (0.6 * size_score + 0.4 * encryption_score).min(1.0)
}

/// Reconnaissance: port/subject scan signatures plus a burst of small
/// probe packets.
fn reconnaissance_score(window: &TrafficWindow) -> f64 {
    let scan_score = (window.scan_signature_hits as f64 / RECON_SCAN_THRESHOLD as f64).clamp(0.0, 1.0);
    let probe_score = (window.small_probe_count as f64 / 50.0).clamp(0.0, 1.0);
    (0.6 * scan_score + 0.4 * probe_score).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flood_of_uniform_small_packets_flags_denial_of_service() {
        let window = TrafficWindow {
            packets_per_sec: 2_000.0,
            mean_packet_size_bytes: 64.0,
            packet_size_stddev_bytes: 1.0,
            ..Default::default()
        };
        let findings = evaluate(&window);
        assert!(findings.iter().any(|f| f.threat == NetworkThreat::DenialOfService));
    }

    #[test]
    fn large_packets_without_encryption_flags_exfiltration() {
        let window = TrafficWindow {
            large_packet_fraction: 0.8,
            weak_encryption_signal: true,
            packets_per_sec: 10.0,
            mean_packet_size_bytes: 500.0,
            packet_size_stddev_bytes: 200.0,
            ..Default::default()
        };
        let findings = evaluate(&window);
        assert!(findings.iter().any(|f| f.threat == NetworkThreat::Exfiltration));
    }

    #[test]
    fn quiet_window_flags_nothing() {
        let window = TrafficWindow {
            packets_per_sec: 5.0,
            mean_packet_size_bytes: 300.0,
            packet_size_stddev_bytes: 150.0,
            ..Default::default()
        };
        assert!(evaluate(&window).is_empty());
    }
}
