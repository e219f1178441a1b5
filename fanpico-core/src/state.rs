//! The control-state snapshot exchanged between the real-time control
//! task and the supervisor task (§4.4).
//!
//! Mirrors `original_source/src/fanpico.h`'s `struct fanpico_state`: every
//! input/output field carries a "previous" shadow that is only updated
//! once a hysteresis threshold is crossed, so consumers (logging, the
//! display, the supervisor's own copy) see stable values instead of
//! sample-to-sample jitter.

use crate::board::{FAN_MAX_COUNT, MBFAN_MAX_COUNT, SENSOR_MAX_COUNT, VSENSOR_MAX_COUNT};
use heapless::Vec;

/// One fan's measured tachometer frequency, in Hz, plus its hysteresis-gated shadow.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Hysteresis<T> {
    pub current: T,
    pub previous: T,
}

impl Hysteresis<f32> {
    pub fn update_if_changed(&mut self, new_value: f32, threshold: f32) -> bool {
        self.current = new_value;
        if crate::util::check_for_change(self.previous, new_value, threshold) {
            self.previous = new_value;
            true
        } else {
            false
        }
    }
}

impl Hysteresis<u8> {
    pub fn update_if_changed(&mut self, new_value: u8, threshold: u8) -> bool {
        self.current = new_value;
        if self.previous.abs_diff(new_value) >= threshold {
            self.previous = new_value;
            true
        } else {
            false
        }
    }
}

/// The full control-loop snapshot. One instance lives in the control
/// task's working memory; a consistent copy is exchanged with the
/// supervisor through the state mutex (§4.4, §5).
#[derive(Debug, Clone)]
pub struct ControlState {
    pub fan_freq: Vec<Hysteresis<f32>, FAN_MAX_COUNT>,
    pub fan_duty: Vec<Hysteresis<u8>, FAN_MAX_COUNT>,
    pub mbfan_duty: Vec<Hysteresis<f32>, MBFAN_MAX_COUNT>,
    pub mbfan_freq: Vec<Hysteresis<f32>, MBFAN_MAX_COUNT>,
    pub temp: Vec<Hysteresis<f32>, SENSOR_MAX_COUNT>,
    pub vtemp: Vec<Hysteresis<f32>, VSENSOR_MAX_COUNT>,
    /// Generation counter bumped each time a `WRITE:VSENSORx` command
    /// lands, so MANUAL-mode vsensors can tell "fresh write" from "no
    /// write since last cycle" the way `vtemp_updated` does in the original.
    pub vtemp_updated: Vec<u32, VSENSOR_MAX_COUNT>,
    /// The last value written to a MANUAL/ONEWIRE/I2C vsensor, persisted
    /// across cycles until a new write lands (§4.3). `None` until the
    /// first write, matching the original's "not yet written" state.
    pub vtemp_manual: Vec<Option<f32>, VSENSOR_MAX_COUNT>,
    /// Seconds elapsed since `vtemp_manual`'s last write, reset to 0 on
    /// every `request_vsensor_write` call and advanced once per second by
    /// the control task. Feeds the MANUAL-mode timeout (§4.3).
    pub vtemp_manual_age_s: Vec<u32, VSENSOR_MAX_COUNT>,
    pub rebooted_by_watchdog: bool,
    pub loop_max_delta_us: u32,
}

impl ControlState {
    pub fn new(fan_count: usize, mbfan_count: usize, sensor_count: usize, vsensor_count: usize) -> Self {
        let mut s = ControlState {
            fan_freq: Vec::new(),
            fan_duty: Vec::new(),
            mbfan_duty: Vec::new(),
            mbfan_freq: Vec::new(),
            temp: Vec::new(),
            vtemp: Vec::new(),
            vtemp_updated: Vec::new(),
            vtemp_manual: Vec::new(),
            vtemp_manual_age_s: Vec::new(),
            rebooted_by_watchdog: false,
            loop_max_delta_us: 0,
        };
        for _ in 0..fan_count {
            let _ = s.fan_freq.push(Hysteresis::default());
            let _ = s.fan_duty.push(Hysteresis::default());
        }
        for _ in 0..mbfan_count {
            let _ = s.mbfan_duty.push(Hysteresis::default());
            let _ = s.mbfan_freq.push(Hysteresis::default());
        }
        for _ in 0..sensor_count {
            let _ = s.temp.push(Hysteresis::default());
        }
        for _ in 0..vsensor_count {
            let _ = s.vtemp.push(Hysteresis::default());
            let _ = s.vtemp_updated.push(0);
            let _ = s.vtemp_manual.push(None);
            let _ = s.vtemp_manual_age_s.push(0);
        }
        s
    }

    /// §6's `WRITE:VSENSORx`/1-Wire/I2C-bus-task write contract: records a
    /// fresh out-of-band value for vsensor `index` and resets its timeout
    /// clock. Out of range indices are ignored, matching the original's
    /// bounds-checked command dispatcher.
    pub fn request_vsensor_write(&mut self, index: usize, value: f32) {
        if let (Some(slot), Some(age)) = (self.vtemp_manual.get_mut(index), self.vtemp_manual_age_s.get_mut(index)) {
            *slot = Some(value);
            *age = 0;
            if let Some(gen) = self.vtemp_updated.get_mut(index) {
                *gen = gen.wrapping_add(1);
            }
        }
    }

    /// Advances every vsensor's manual-write age by one second; called
    /// once per second by the control task's cadence.
    pub fn tick_vsensor_manual_age(&mut self) {
        for age in self.vtemp_manual_age_s.iter_mut() {
            *age = age.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hysteresis_gates_small_changes() {
        let mut h = Hysteresis { current: 0.0, previous: 50.0 };
        assert!(!h.update_if_changed(50.4, 1.0));
        assert_eq!(h.previous, 50.0);
        assert!(h.update_if_changed(52.0, 1.0));
        assert_eq!(h.previous, 52.0);
    }

    #[test]
    fn new_state_has_expected_lengths() {
        let s = ControlState::new(8, 4, 3, 8);
        assert_eq!(s.fan_freq.len(), 8);
        assert_eq!(s.mbfan_freq.len(), 4);
        assert_eq!(s.temp.len(), 3);
        assert_eq!(s.vtemp.len(), 8);
    }

    #[test]
    fn vsensor_write_persists_and_resets_age() {
        let mut s = ControlState::new(0, 0, 0, 1);
        assert_eq!(s.vtemp_manual[0], None);
        s.tick_vsensor_manual_age();
        s.tick_vsensor_manual_age();
        assert_eq!(s.vtemp_manual_age_s[0], 2);
        s.request_vsensor_write(0, 70.0);
        assert_eq!(s.vtemp_manual[0], Some(70.0));
        assert_eq!(s.vtemp_manual_age_s[0], 0);
    }
}
