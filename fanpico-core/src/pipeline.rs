//! The control pipeline: resolving a fan's PWM duty and a mainboard
//! connector's tachometer output frequency from their configured source.
//!
//! Grounded in `original_source/src/pwm.c`'s `calculate_pwm_duty()` and
//! `src/tacho.c`'s `calculate_tacho_freq()`.

use crate::config::{FanOutput, MbInput, Reduction, SignalSource};
use crate::state::ControlState;
use crate::util::source_indices;

/// Resolves `fan`'s source signal (§4.1: FIXED uses `source_id` as the
/// fixed value, MB/SENSOR/FAN/VSENSOR read the named upstream value),
/// applies the fan's map, scales by its coefficient, and clamps to
/// `[min_pwm, max_pwm]`.
pub fn calculate_pwm_duty(fan: &FanOutput, state: &ControlState) -> u8 {
    let input = match fan.source {
        SignalSource::Fixed => fan.source_id as f32,
        SignalSource::Mb => state.mbfan_duty.get(fan.source_id).map(|h| h.current).unwrap_or(0.0),
        SignalSource::Sensor => state.temp.get(fan.source_id).map(|h| h.current).unwrap_or(0.0),
        SignalSource::Fan => state.fan_duty.get(fan.source_id).map(|h| h.current as f32).unwrap_or(0.0),
        SignalSource::Vsensor => state.vtemp.get(fan.source_id).map(|h| h.current).unwrap_or(0.0),
    };
    let mapped = fan.map.apply(input) * fan.pwm_coefficient;
    mapped.clamp(fan.min_pwm as f32, fan.max_pwm as f32).round() as u8
}

/// Resolves `mb`'s source signal, reducing over its `sources` fan list
/// when `reduction` is MIN/MAX/AVG (§4.1), applies its map and
/// coefficient, and clamps to `[min_rpm, max_rpm]`. The result is
/// expressed in Hz (RPM / 60 * rpm_factor) the way `set_tacho_output_freq`
/// expects, mirroring the original's final `val/60*rpm_factor` conversion.
pub fn calculate_tacho_freq(mb: &MbInput, state: &ControlState) -> f32 {
    let rpm_input = match mb.source {
        SignalSource::Fixed => mb.source_id as f32,
        SignalSource::Vsensor => state.vtemp.get(mb.source_id).map(|h| h.current).unwrap_or(0.0),
        SignalSource::Sensor => state.temp.get(mb.source_id).map(|h| h.current).unwrap_or(0.0),
        SignalSource::Mb | SignalSource::Fan => reduce_fan_rpm(mb, state),
    };
    let mapped = mb.map.apply(rpm_input) * mb.rpm_coefficient;
    let clamped = mapped.clamp(mb.min_rpm, mb.max_rpm);
    clamped / 60.0 * mb.rpm_factor as f32
}

fn reduce_fan_rpm(mb: &MbInput, state: &ControlState) -> f32 {
    let rpms = source_indices(&mb.sources).filter_map(|i| {
        state
            .fan_freq
            .get(i)
            .map(|h| h.current * 60.0 / mb.rpm_factor.max(1) as f32)
    });
    match mb.reduction {
        Reduction::Min => rpms.fold(f32::MAX, f32::min),
        Reduction::Max => rpms.fold(f32::MIN, f32::max),
        Reduction::Avg => {
            let (sum, n) = rpms.fold((0.0f32, 0u32), |(s, n), v| (s + v, n + 1));
            if n == 0 { 0.0 } else { sum / n as f32 }
        }
        Reduction::Fixed | Reduction::Single => rpms.next().unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RpmMode};
    use crate::filters::Filter;
    use crate::map::Map;
    use heapless::String;

    fn fan(source: SignalSource, source_id: usize) -> FanOutput {
        FanOutput {
            name: String::new(),
            tacho_hysteresis: 1.0,
            pwm_hysteresis: 1.0,
            min_pwm: 10,
            max_pwm: 100,
            pwm_coefficient: 1.0,
            source,
            source_id,
            map: Map::new(&[(0.0, 0.0), (100.0, 100.0)]).unwrap(),
            filter: Filter::none(),
            rpm_mode: RpmMode::Tacho,
            rpm_factor: 2,
            lra_low: 0.0,
            lra_high: 0.0,
        }
    }

    #[test]
    fn fixed_duty_uses_source_id_as_the_fixed_value() {
        let mut f = fan(SignalSource::Fixed, 42);
        f.min_pwm = 0;
        let state = ControlState::new(1, 0, 1, 0);
        assert_eq!(calculate_pwm_duty(&f, &state), 42);
    }

    #[test]
    fn sensor_driven_duty_follows_map_and_clamps() {
        let f = fan(SignalSource::Sensor, 0);
        let mut state = ControlState::new(1, 0, 1, 0);
        state.temp[0].current = 50.0;
        assert_eq!(calculate_pwm_duty(&f, &state), 50);
        state.temp[0].current = 200.0;
        assert_eq!(calculate_pwm_duty(&f, &state), 100);
        state.temp[0].current = -50.0;
        assert_eq!(calculate_pwm_duty(&f, &state), 10);
    }

    fn mb(reduction: Reduction) -> MbInput {
        MbInput {
            name: String::new(),
            rpm_mode: RpmMode::Tacho,
            min_rpm: 0.0,
            max_rpm: 3000.0,
            rpm_coefficient: 1.0,
            rpm_factor: 2,
            lra_threshold: 0.0,
            lra_invert: false,
            source: SignalSource::Fan,
            source_id: 0,
            sources: [1, 2, 0, 0, 0, 0, 0, 0],
            reduction,
            map: Map::new(&[(0.0, 0.0), (3000.0, 3000.0)]).unwrap(),
            filter: Filter::none(),
        }
    }

    #[test]
    fn aggregate_tacho_takes_max_of_sources() {
        let m = mb(Reduction::Max);
        let mut state = ControlState::new(2, 1, 0, 0);
        state.fan_freq[0].current = 20.0; // 20Hz * 60 / 2 = 600rpm
        state.fan_freq[1].current = 40.0; // 1200rpm
        let hz = calculate_tacho_freq(&m, &state);
        assert!((hz - (1200.0 / 60.0 * 2.0)).abs() < 1e-3);
    }
}
