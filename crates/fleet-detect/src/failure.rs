use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FailurePrediction {
    pub remaining_useful_life_hours: f64,
    pub confidence: f64,
    pub degradation_rate: f64,
}

const TEMPERATURE_ACCEL_THRESHOLD_C: f64 = 40.0;
const TEMPERATURE_ACCEL_FACTOR: f64 = 1.5;
const CYCLE_ACCEL_THRESHOLD: u32 = 500;
const CYCLE_ACCEL_FACTOR: f64 = 1.3;

fn clamp_confidence(value: f64) -> f64 {
    value.clamp(0.3, 1.0)
}

/// Battery health model (spec §4.4): voltage 0.4, temperature 0.25,
/// cycle-count 0.2, age 0.15.
#[derive(Debug, Clone, Copy)]
pub struct BatteryHealthModel {
    pub nominal_voltage_v: f64,
}

impl Default for BatteryHealthModel {
    fn default() -> Self {
        Self { nominal_voltage_v: 12.6 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatteryReading {
    pub voltage_v: f64,
    pub temperature_c: f64,
    pub cycle_count: u32,
    pub age_days: f64,
}

impl BatteryHealthModel {
    pub fn predict(&self, reading: BatteryReading) -> FailurePrediction {
        let voltage_score = (1.0 - (reading.voltage_v / self.nominal_voltage_v).clamp(0.0, 1.0)).clamp(0.0, 1.0);
        let temperature_score = ((reading.temperature_c - 20.0) / 60.0).clamp(0.0, 1.0);
        let cycle_score = (reading.cycle_count as f64 / 1000.0).clamp(0.0, 1.0);
        let age_score = (reading.age_days / 730.0).clamp(0.0, 1.0);

        let degradation = 0.4 * voltage_score + 0.25 * temperature_score + 0.2 * cycle_score + 0.15 * age_score;

        let mut rate = degradation;
        if reading.temperature_c > TEMPERATURE_ACCEL_THRESHOLD_C {
            rate *= TEMPERATURE_ACCEL_FACTOR;
        }
        if reading.cycle_count > CYCLE_ACCEL_THRESHOLD {
            rate *= CYCLE_ACCEL_FACTOR;
        }

        let rul_hours = ((1.0 - degradation).max(0.0) * 500.0) / rate.max(0.01);

        FailurePrediction {
            remaining_useful_life_hours: rul_hours,
            confidence: clamp_confidence(1.0 - degradation * 0.5),
            degradation_rate: rate,
        }
    }
}

/// Motor health model (spec §4.4): vibration 0.35, temperature 0.3,
/// efficiency 0.25, hours 0.1.
#[derive(Debug, Clone, Copy, Default)]
pub struct MotorHealthModel;

#[derive(Debug, Clone, Copy)]
pub struct MotorReading {
    pub vibration_mm_s: f64,
    pub temperature_c: f64,
    pub efficiency_pct: f64,
    pub operating_hours: f64,
}

impl MotorHealthModel {
    pub fn predict(&self, reading: MotorReading) -> FailurePrediction {
        let vibration_score = (reading.vibration_mm_s / 20.0).clamp(0.0, 1.0);
        let temperature_score = ((reading.temperature_c - 30.0) / 70.0).clamp(0.0, 1.0);
        let efficiency_score = (1.0 - (reading.efficiency_pct / 100.0)).clamp(0.0, 1.0);
        let hours_score = (reading.operating_hours / 2000.0).clamp(0.0, 1.0);

        let degradation =
            0.35 * vibration_score + 0.3 * temperature_score + 0.25 * efficiency_score + 0.1 * hours_score;

        let mut rate = degradation;
        if reading.temperature_c > TEMPERATURE_ACCEL_THRESHOLD_C {
            rate *= TEMPERATURE_ACCEL_FACTOR;
        }

        let rul_hours = ((1.0 - degradation).max(0.0) * 1000.0) / rate.max(0.01);

        FailurePrediction {
            remaining_useful_life_hours: rul_hours,
            confidence: clamp_confidence(1.0 - degradation * 0.5),
            degradation_rate: rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_voltage_and_high_temp_shortens_remaining_life() {
        let model = BatteryHealthModel::default();
        let healthy = model.predict(BatteryReading {
            voltage_v: 12.5,
            temperature_c: 25.0,
            cycle_count: 50,
            age_days: 30.0,
        });
        let degraded = model.predict(BatteryReading {
            voltage_v: 9.0,
            temperature_c: 45.0,
            cycle_count: 600,
            age_days: 500.0,
        });
        assert!(degraded.remaining_useful_life_hours < healthy.remaining_useful_life_hours);
        assert!(degraded.degradation_rate > healthy.degradation_rate);
    }

    #[test]
    fn confidence_stays_within_bounds() {
        let model = BatteryHealthModel::default();
        let reading = BatteryReading {
            voltage_v: 1.0,
            temperature_c: 90.0,
            cycle_count: 5000,
            age_days: 3000.0,
        };
        let prediction = model.predict(reading);
        assert!(prediction.confidence >= 0.3 && prediction.confidence <= 1.0);
    }

    #[test]
    fn high_temperature_accelerates_motor_degradation() {
        let model = MotorHealthModel;
        let cool = model.predict(MotorReading {
            vibration_mm_s: 5.0,
            temperature_c: 35.0,
            efficiency_pct: 95.0,
            operating_hours: 100.0,
        });
        let hot = model.predict(MotorReading {
            vibration_mm_s: 5.0,
            temperature_c: 55.0,
            efficiency_pct: 95.0,
            operating_hours: 100.0,
        });
        assert!(hot.degradation_rate > cool.degradation_rate);
    }
}
