//! Physical and virtual temperature sensor math.
//!
//! Grounded in `original_source/src/sensors.c`'s `get_temperature()` and
//! `get_vsensor()`. ADC sampling itself is hardware (the firmware crate's
//! job); this module starts from an already-averaged bus voltage.

use crate::board::SENSOR_SERIES_RESISTANCE;
use crate::config::{SensorInput, SensorType, VsensorInput, VsensorMode};
use crate::util::source_indices;

/// ADC reference voltage used by sensors.c's volt conversion.
pub const ADC_REF_VOLTAGE: f32 = 3.0;

/// Converts an averaged ADC bus voltage into a temperature reading for one
/// physical sensor, then applies its map-independent coefficient/offset
/// and its filter. Sensor math does not consult the map; the map is
/// applied downstream by whatever fan/mbfan uses this sensor as a PWM or
/// tacho source (§4.1), matching the original's separation between
/// `get_temperature()` and `pwm_map()`/`sensor_get_duty()`.
pub fn read_temperature(sensor: &mut SensorInput, volts: f32, dt_s: f32) -> f32 {
    let raw = match sensor.sensor_type {
        SensorType::Internal => 27.0 - (volts - 0.706) / 0.001721,
        SensorType::External => {
            if volts <= 0.1 || volts >= ADC_REF_VOLTAGE - 0.1 {
                0.0
            } else {
                steinhart(sensor, volts)
            }
        }
    };
    let adjusted = raw * sensor.temp_coefficient + sensor.temp_offset;
    sensor.filter.apply(adjusted, dt_s)
}

fn steinhart(sensor: &SensorInput, volts: f32) -> f32 {
    // Voltage divider: sensor->GND thermistor in series with a fixed
    // reference resistor, ADC taps the midpoint.
    let r = SENSOR_SERIES_RESISTANCE * volts / (ADC_REF_VOLTAGE - volts);
    let t0 = sensor.temp_nominal + 273.15;
    let ln = libm::logf(r / sensor.thermistor_nominal);
    let inv_t = 1.0 / t0 + ln / sensor.beta_coefficient;
    1.0 / inv_t - 273.15
}

/// Resolves one virtual sensor's current temperature from the physical
/// sensor snapshot `temps` (one entry per configured physical sensor).
/// `last_manual_value`/`manual_value_age_s` come from
/// `ControlState::vtemp_manual`/`vtemp_manual_age_s`, which persist
/// across cycles until `ControlState::request_vsensor_write` lands a new
/// value — a single tick's "was there a fresh write this cycle" flag
/// would forget the value on the very next tick, which is not what MANUAL
/// mode's hold-until-timeout semantics require.
pub fn read_vsensor(
    vsensor: &mut VsensorInput,
    temps: &[f32],
    last_manual_value: Option<f32>,
    manual_value_age_s: Option<u32>,
    dt_s: f32,
) -> f32 {
    let raw = match vsensor.mode {
        VsensorMode::Manual => match last_manual_value {
            Some(v) if vsensor.timeout_s == 0 || manual_value_age_s.map(|s| s < vsensor.timeout_s).unwrap_or(true) => v,
            _ => vsensor.default_temp,
        },
        VsensorMode::Max => source_indices(&vsensor.sensors)
            .filter_map(|i| temps.get(i).copied())
            .fold(f32::MIN, f32::max),
        VsensorMode::Min => source_indices(&vsensor.sensors)
            .filter_map(|i| temps.get(i).copied())
            .fold(f32::MAX, f32::min),
        VsensorMode::Avg => {
            let (sum, n) = source_indices(&vsensor.sensors).filter_map(|i| temps.get(i).copied()).fold(
                (0.0f32, 0u32),
                |(s, n), t| (s + t, n + 1),
            );
            if n == 0 { vsensor.default_temp } else { sum / n as f32 }
        }
        VsensorMode::Delta => {
            let mut vals = source_indices(&vsensor.sensors).filter_map(|i| temps.get(i).copied());
            match (vals.next(), vals.next()) {
                (Some(a), Some(b)) => a - b,
                _ => vsensor.default_temp,
            }
        }
        // 1-Wire and I2C readings arrive from the firmware crate's bus
        // tasks as an out-of-band write, same shape as MANUAL's, but never
        // expire on their own timeout (the bus task keeps refreshing them).
        VsensorMode::Onewire | VsensorMode::I2c => last_manual_value.unwrap_or(vsensor.default_temp),
    };
    vsensor.filter.apply(raw, dt_s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Filter;
    use crate::map::Map;
    use heapless::String;

    fn sensor(sensor_type: SensorType) -> SensorInput {
        SensorInput {
            name: String::new(),
            sensor_type,
            thermistor_nominal: 10_000.0,
            temp_nominal: 25.0,
            beta_coefficient: 3950.0,
            temp_offset: 0.0,
            temp_coefficient: 1.0,
            map: Map::new(&[(0.0, 0.0), (100.0, 100.0)]).unwrap(),
            filter: Filter::none(),
        }
    }

    #[test]
    fn internal_sensor_formula() {
        let mut s = sensor(SensorType::Internal);
        let t = read_temperature(&mut s, 0.706, 1.0);
        assert!((t - 27.0).abs() < 1e-4);
    }

    #[test]
    fn external_sensor_rejects_out_of_window_voltage() {
        let mut s = sensor(SensorType::External);
        assert_eq!(read_temperature(&mut s, 0.0, 1.0), 0.0);
        assert_eq!(read_temperature(&mut s, ADC_REF_VOLTAGE, 1.0), 0.0);
    }

    #[test]
    fn external_sensor_at_nominal_resistance_matches_nominal_temp() {
        let mut s = sensor(SensorType::External);
        // Midpoint voltage where R = thermistor_nominal.
        let volts = ADC_REF_VOLTAGE * SENSOR_SERIES_RESISTANCE
            / (SENSOR_SERIES_RESISTANCE + s.thermistor_nominal);
        let t = read_temperature(&mut s, volts, 1.0);
        assert!((t - 25.0).abs() < 0.1);
    }

    #[test]
    fn vsensor_max_min_avg() {
        let mut vs = VsensorInput {
            name: String::new(),
            mode: VsensorMode::Max,
            default_temp: 0.0,
            timeout_s: 0,
            sensors: [1, 2, 0, 0, 0, 0, 0, 0],
            onewire_addr: None,
            i2c_type: 0,
            i2c_addr: 0,
            map: Map::new(&[(0.0, 0.0), (100.0, 100.0)]).unwrap(),
            filter: Filter::none(),
        };
        let temps = [30.0, 50.0, 10.0];
        assert_eq!(read_vsensor(&mut vs, &temps, None, None, 1.0), 50.0);
        vs.mode = VsensorMode::Min;
        vs.filter = Filter::none();
        assert_eq!(read_vsensor(&mut vs, &temps, None, None, 1.0), 30.0);
        vs.mode = VsensorMode::Avg;
        vs.filter = Filter::none();
        assert_eq!(read_vsensor(&mut vs, &temps, None, None, 1.0), 40.0);
    }

    #[test]
    fn vsensor_manual_uses_fresh_write_else_default() {
        let mut vs = VsensorInput {
            name: String::new(),
            mode: VsensorMode::Manual,
            default_temp: 22.0,
            timeout_s: 60,
            sensors: [0; 8],
            onewire_addr: None,
            i2c_type: 0,
            i2c_addr: 0,
            map: Map::new(&[(0.0, 0.0), (100.0, 100.0)]).unwrap(),
            filter: Filter::none(),
        };
        assert_eq!(read_vsensor(&mut vs, &[], Some(45.0), Some(1), 1.0), 45.0);
        assert_eq!(read_vsensor(&mut vs, &[], None, Some(120), 1.0), 22.0);
    }

    #[test]
    fn vsensor_manual_holds_written_value_until_timeout() {
        let mut vs = VsensorInput {
            name: String::new(),
            mode: VsensorMode::Manual,
            default_temp: 25.0,
            timeout_s: 5,
            sensors: [0; 8],
            onewire_addr: None,
            i2c_type: 0,
            i2c_addr: 0,
            map: Map::new(&[(0.0, 0.0), (100.0, 100.0)]).unwrap(),
            filter: Filter::none(),
        };
        // Written at t=0; still held at t=4 (age 4 < timeout 5).
        assert_eq!(read_vsensor(&mut vs, &[], Some(70.0), Some(4), 1.0), 70.0);
        vs.filter = Filter::none();
        // By t=6 (age 6 >= timeout 5) it reverts to the default.
        assert_eq!(read_vsensor(&mut vs, &[], Some(70.0), Some(6), 1.0), 25.0);
    }
}
