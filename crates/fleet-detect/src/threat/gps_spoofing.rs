use crate::zscore::ZScoreTracker;
use fleet_proto::TelemetrySample;

const MAX_SPEED_MPS: f64 = 40.0;
const MAX_ACCEL_MPS2: f64 = 20.0;
const SIGNAL_BASELINE_WINDOW: usize = 50;

/// Point-estimate source localization: the detector reports where it
/// thinks the spoofed signal originates along with an accuracy radius,
/// not a triangulated fix (spec §4.4 Non-goals: no multi-receiver
/// triangulation).
#[derive(Debug, Clone, Copy)]
pub struct SourceEstimate {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub accuracy_radius_m: f64,
}

pub struct GpsSpoofingDetector {
    signal_baseline: ZScoreTracker,
    last_position: Option<(f64, f64, u64)>,
    last_velocity: Option<[f64; 3]>,
}

impl Default for GpsSpoofingDetector {
    fn default() -> Self {
        Self {
            signal_baseline: ZScoreTracker::new(SIGNAL_BASELINE_WINDOW),
            last_position: None,
            last_velocity: None,
        }
    }
}

pub struct SpoofingScore {
    pub score: f64,
    pub source_estimate: Option<SourceEstimate>,
}

impl GpsSpoofingDetector {
    /// Weighted sum (spec §4.4): position-jump plausibility dominates at
    /// 0.7 since an implausible jump alone is the strongest signal this
    /// detector has, with signal-strength deviation and velocity/
    /// acceleration plausibility contributing 0.15 each as corroborating
    /// evidence. A jump score of 1.0 alone already clears the pipeline's
    /// spoofing gate; the other two terms push a borderline jump over it
    /// when the signal or motion readings corroborate it too.
    pub fn observe(&mut self, sample: &TelemetrySample, timestamp_ms: u64) -> SpoofingScore {
        let jump_score = self.position_jump_score(sample, timestamp_ms);
        let signal_score = self.signal_deviation_score(sample);
        let motion_score = Self::motion_plausibility_score(sample);

        let score = 0.7 * jump_score + 0.15 * signal_score + 0.15 * motion_score;

        let source_estimate = if jump_score > 0.5 {
            sample.position.lat_deg.zip(sample.position.lon_deg).map(|(lat, lon)| SourceEstimate {
                lat_deg: lat,
                lon_deg: lon,
                accuracy_radius_m: sample.systems.gps_accuracy_m.unwrap_or(50.0).max(10.0),
            })
        } else {
            None
        };

        if let (Some(lat), Some(lon)) = (sample.position.lat_deg, sample.position.lon_deg) {
            self.last_position = Some((lat, lon, timestamp_ms));
        }
        if let Some(v) = sample.motion.velocity_mps {
            self.last_velocity = Some(v);
        }

        SpoofingScore { score: score.min(1.0), source_estimate }
    }

    fn position_jump_score(&self, sample: &TelemetrySample, timestamp_ms: u64) -> f64 {
        let (Some(lat), Some(lon)) = (sample.position.lat_deg, sample.position.lon_deg) else {
            return 0.0;
        };
        let Some((prev_lat, prev_lon, prev_ts)) = self.last_position else {
            return 0.0;
        };
        let dt_s = (timestamp_ms.saturating_sub(prev_ts) as f64 / 1000.0).max(0.001);
        let distance_m = haversine_m(prev_lat, prev_lon, lat, lon);
        let max_plausible = 2.0 * MAX_SPEED_MPS * dt_s;
        if max_plausible <= 0.0 {
            return 0.0;
        }
        ((distance_m - max_plausible) / max_plausible).clamp(0.0, 1.0)
    }

    fn signal_deviation_score(&mut self, sample: &TelemetrySample) -> f64 {
        let Some(dbm) = sample.systems.signal_strength_dbm else {
            return 0.0;
        };
        match self.signal_baseline.observe(dbm) {
            Some(z) => (z.abs() / 6.0).clamp(0.0, 1.0),
            None => 0.0,
        }
    }

    fn motion_plausibility_score(sample: &TelemetrySample) -> f64 {
        let Some(a) = sample.motion.acceleration_mps2 else {
            return 0.0;
        };
        let magnitude = (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt();
        ((magnitude - MAX_ACCEL_MPS2) / MAX_ACCEL_MPS2).clamp(0.0, 1.0)
    }
}

fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let (lat1, lat2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_at(lat: f64, lon: f64) -> TelemetrySample {
        let mut sample = TelemetrySample::default();
        sample.position.lat_deg = Some(lat);
        sample.position.lon_deg = Some(lon);
        sample.systems.signal_strength_dbm = Some(-60.0);
        sample.motion.acceleration_mps2 = Some([0.1, 0.0, 0.0]);
        sample
    }

    #[test]
    fn teleport_between_samples_scores_high() {
        let mut detector = GpsSpoofingDetector::default();
        detector.observe(&sample_at(37.0, -122.0), 0);
        let jumped = detector.observe(&sample_at(38.0, -120.0), 1_000);
        assert!(jumped.score > 0.5);
        assert!(jumped.source_estimate.is_some());
    }

    #[test]
    fn plausible_motion_scores_low() {
        let mut detector = GpsSpoofingDetector::default();
        detector.observe(&sample_at(37.0, -122.0), 0);
        let steady = detector.observe(&sample_at(37.0001, -122.0), 1_000);
        assert!(steady.score < 0.3);
    }
}
