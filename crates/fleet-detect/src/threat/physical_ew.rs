use fleet_proto::telemetry::FlightMode;
use fleet_proto::TelemetrySample;

const PRESSURE_DELTA_PA_THRESHOLD: f64 = 500.0;
const EXTREME_WIND_MPS: f64 = 25.0;

/// Electronic-warfare/physical interference detector (spec §4.4): rapid
/// pressure deltas (altitude spoofing via pressure sensor attack or
/// sudden depressurization), implausible wind readings, and unexpected
/// flight-mode transitions into EMERGENCY/FAILSAFE/UNKNOWN.
#[derive(Default)]
pub struct PhysicalEwDetector {
    last_pressure_pa: Option<f64>,
}

impl PhysicalEwDetector {
    pub fn observe(&mut self, sample: &TelemetrySample) -> f64 {
        let pressure_score = self.pressure_delta_score(sample);
        let wind_score = Self::extreme_wind_score(sample);
        let mode_score = Self::flight_mode_score(sample);

        if let Some(p) = sample.environment.pressure_pa {
            self.last_pressure_pa = Some(p);
        }

        (0.4 * pressure_score + 0.3 * wind_score + 0.3 * mode_score).min(1.0)
    }

    fn pressure_delta_score(&self, sample: &TelemetrySample) -> f64 {
        let (Some(prev), Some(now)) = (self.last_pressure_pa, sample.environment.pressure_pa) else {
            return 0.0;
        };
        ((now - prev).abs() / PRESSURE_DELTA_PA_THRESHOLD).clamp(0.0, 1.0)
    }

    fn extreme_wind_score(sample: &TelemetrySample) -> f64 {
        let Some(wind) = sample.environment.wind_speed_mps else {
            return 0.0;
        };
        ((wind - EXTREME_WIND_MPS) / EXTREME_WIND_MPS).clamp(0.0, 1.0)
    }

    fn flight_mode_score(sample: &TelemetrySample) -> f64 {
        match sample.mission.flight_mode {
            FlightMode::Emergency | FlightMode::Failsafe | FlightMode::Unknown => 1.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sudden_pressure_swing_and_failsafe_mode_scores_high() {
        let mut detector = PhysicalEwDetector::default();
        let mut first = TelemetrySample::default();
        first.environment.pressure_pa = Some(101_325.0);
        detector.observe(&first);

        let mut second = TelemetrySample::default();
        second.environment.pressure_pa = Some(99_000.0);
        second.mission.flight_mode = FlightMode::Failsafe;
        second.environment.wind_speed_mps = Some(5.0);
        let score = detector.observe(&second);
        assert!(score > 0.6, "score was {score}");
    }

    #[test]
    fn stable_conditions_score_zero() {
        let mut detector = PhysicalEwDetector::default();
        let mut sample = TelemetrySample::default();
        sample.environment.pressure_pa = Some(101_325.0);
        sample.environment.wind_speed_mps = Some(3.0);
        sample.mission.flight_mode = FlightMode::Guided;
        detector.observe(&sample);
        let score = detector.observe(&sample);
        assert_eq!(score, 0.0);
    }
}
