use crate::zscore::ZScoreTracker;
use fleet_proto::TelemetrySample;

const BASELINE_WINDOW: usize = 30;
pub const JAMMING_THRESHOLD: f64 = 0.6;

/// Tracks packet_loss / latency / signal_strength / throughput baselines
/// per drone and combines their deviations (spec §4.4): packet_loss 0.35,
/// latency 0.25, signal_strength increase 0.25, throughput decrease 0.15.
pub struct JammingDetector {
    packet_loss: ZScoreTracker,
    latency: ZScoreTracker,
    signal_strength: ZScoreTracker,
    throughput: ZScoreTracker,
}

impl Default for JammingDetector {
    fn default() -> Self {
        Self {
            packet_loss: ZScoreTracker::new(BASELINE_WINDOW),
            latency: ZScoreTracker::new(BASELINE_WINDOW),
            signal_strength: ZScoreTracker::new(BASELINE_WINDOW),
            throughput: ZScoreTracker::new(BASELINE_WINDOW),
        }
    }
}

impl JammingDetector {
    pub fn observe(&mut self, sample: &TelemetrySample) -> f64 {
        let loss_z = sample.comms.packet_loss_pct.and_then(|v| self.packet_loss.observe(v));
        let latency_z = sample.comms.latency_ms.and_then(|v| self.latency.observe(v));
        let signal_z = sample
            .systems
            .signal_strength_dbm
            .and_then(|v| self.signal_strength.observe(v));
        let throughput_z = sample.comms.throughput_bps.and_then(|v| self.throughput.observe(v));

        // Jamming raises packet loss/latency, weakens signal (less negative
        // dBm reads as an *increase* in magnitude terms), and drops
        // throughput, so only the adverse-direction half of each z-score
        // counts.
        let loss_score = loss_z.map(|z| z.max(0.0) / 4.0).unwrap_or(0.0).min(1.0);
        let latency_score = latency_z.map(|z| z.max(0.0) / 4.0).unwrap_or(0.0).min(1.0);
        let signal_score = signal_z.map(|z| z.max(0.0) / 4.0).unwrap_or(0.0).min(1.0);
        let throughput_score = throughput_z.map(|z| (-z).max(0.0) / 4.0).unwrap_or(0.0).min(1.0);

        (0.35 * loss_score + 0.25 * latency_score + 0.25 * signal_score + 0.15 * throughput_score).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(packet_loss: f64, latency: f64, signal: f64, throughput: f64) -> TelemetrySample {
        let mut s = TelemetrySample::default();
        s.comms.packet_loss_pct = Some(packet_loss);
        s.comms.latency_ms = Some(latency);
        s.systems.signal_strength_dbm = Some(signal);
        s.comms.throughput_bps = Some(throughput);
        s
    }

    #[test]
    fn degraded_link_triggers_combined_score_above_threshold() {
        let mut detector = JammingDetector::default();
        for _ in 0..30 {
            detector.observe(&sample(0.5, 20.0, -55.0, 2_000_000.0));
        }
        let score = detector.observe(&sample(40.0, 400.0, -95.0, 20_000.0));
        assert!(score > JAMMING_THRESHOLD, "score was {score}");
    }

    #[test]
    fn stable_link_stays_below_threshold() {
        let mut detector = JammingDetector::default();
        for _ in 0..30 {
            detector.observe(&sample(0.5, 20.0, -55.0, 2_000_000.0));
        }
        let score = detector.observe(&sample(0.6, 22.0, -56.0, 1_950_000.0));
        assert!(score < JAMMING_THRESHOLD);
    }
}
