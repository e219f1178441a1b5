//! Compile-time board profile: pin tables, counts, and feature flags.
//!
//! This mirrors `original_source/src/boards/*.h` and `fanpico.h`'s
//! `FAN_MAX_COUNT`/`MBFAN_MAX_COUNT`/`SENSOR_MAX_COUNT`. It is plain data —
//! the firmware binary is the one that turns a pin number into a concrete
//! `embassy_rp` peripheral.

/// Maximum number of fan (PWM output / tacho input) connectors any board may have.
pub const FAN_MAX_COUNT: usize = 8;
/// Maximum number of motherboard fan (PWM input / tacho output) connectors.
pub const MBFAN_MAX_COUNT: usize = 4;
/// Maximum number of physical (ADC) temperature sensor inputs.
pub const SENSOR_MAX_COUNT: usize = 3;
/// Maximum number of virtual sensors.
pub const VSENSOR_MAX_COUNT: usize = 8;
/// Maximum number of physical sensors an aggregate virtual sensor can draw from.
pub const VSENSOR_SOURCE_MAX_COUNT: usize = 8;
/// Maximum number of 1-Wire devices discovered by a bus scan.
pub const ONEWIRE_MAX_COUNT: usize = 8;

pub const MAX_NAME_LEN: usize = 64;
pub const MAX_MAP_POINTS: usize = 32;

/// Fixed series resistor paired with each external thermistor, in ohms.
pub const SENSOR_SERIES_RESISTANCE: f32 = 10_000.0;

/// A fan's PWM output pin and tacho input pin, paired by board wiring.
#[derive(Debug, Clone, Copy)]
pub struct FanPins {
    /// GPIO driving the PWM slice channel used to generate this fan's duty signal.
    pub pwm_gen_pin: u8,
    /// GPIO used to read this fan's tachometer (direct mode), or the
    /// multiplexer port index (multiplexed mode).
    pub tacho_read_pin: u8,
}

/// A motherboard connector's tacho output pin and PWM input ("B channel") pin.
#[derive(Debug, Clone, Copy)]
pub struct MbFanPins {
    pub tacho_gen_pin: u8,
    /// Must be the B channel of its PWM slice (§4.2.1 invariant).
    pub pwm_read_pin: u8,
}

/// Strategy used to read fan tachometer inputs (§4.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TachoReadMode {
    /// One GPIO per fan, counted by edge interrupt.
    Direct,
    /// A single shared input pin behind a 3-bit multiplexer.
    Multiplexed {
        shared_pin: u8,
        select_pins: [u8; 3],
    },
}

#[derive(Debug, Clone, Copy)]
pub struct BoardProfile {
    pub model: &'static str,
    pub fan_count: usize,
    pub mbfan_count: usize,
    pub sensor_count: usize,
    pub fans: &'static [FanPins],
    pub mbfans: &'static [MbFanPins],
    /// ADC channel per physical sensor (the last one is typically the
    /// on-chip temperature sensor channel).
    pub sensor_adc_channel: &'static [u8],
    pub tacho_read_mode: TachoReadMode,
    pub i2c_sda_pin: u8,
    pub i2c_scl_pin: u8,
    /// `None` on boards with no `ONEWIRE_SUPPORT` (the 0804D has none;
    /// `0401D`/`0200` do).
    pub onewire_pin: Option<u8>,
    pub led_pin: Option<u8>,
}

impl BoardProfile {
    /// Validates the hard invariants from §3: every two consecutive fan
    /// PWM pins must belong to one PWM slice's A/B channel pair, and
    /// every mbfan PWM-read pin must be a slice's B channel. Pin-to-slice
    /// mapping is RP2040 hardware knowledge (`gpio_num % 16 / 2` is the
    /// slice, `gpio_num % 2` is the channel); that part lives in the
    /// firmware's PWM module, which calls this after confirming the
    /// counts line up.
    pub const fn validate_counts(&self) -> bool {
        self.fan_count <= FAN_MAX_COUNT
            && self.mbfan_count <= MBFAN_MAX_COUNT
            && self.sensor_count <= SENSOR_MAX_COUNT
            && self.fan_count % 2 == 0
    }
}

/// The FanPico 0804D: 8 fan outputs, 4 motherboard inputs, 3 sensors,
/// multiplexed tachometer reads. Grounded on
/// `original_source/src/boards/0804D.h`.
pub const FANPICO_0804D: BoardProfile = BoardProfile {
    model: "0804D",
    fan_count: 8,
    mbfan_count: 4,
    sensor_count: 3,
    fans: &[
        FanPins { pwm_gen_pin: 4, tacho_read_pin: 7 },
        FanPins { pwm_gen_pin: 5, tacho_read_pin: 5 },
        FanPins { pwm_gen_pin: 6, tacho_read_pin: 3 },
        FanPins { pwm_gen_pin: 7, tacho_read_pin: 0 },
        FanPins { pwm_gen_pin: 8, tacho_read_pin: 1 },
        FanPins { pwm_gen_pin: 9, tacho_read_pin: 2 },
        FanPins { pwm_gen_pin: 10, tacho_read_pin: 6 },
        FanPins { pwm_gen_pin: 11, tacho_read_pin: 4 },
    ],
    mbfans: &[
        MbFanPins { tacho_gen_pin: 12, pwm_read_pin: 13 },
        MbFanPins { tacho_gen_pin: 14, pwm_read_pin: 15 },
        MbFanPins { tacho_gen_pin: 16, pwm_read_pin: 17 },
        MbFanPins { tacho_gen_pin: 18, pwm_read_pin: 19 },
    ],
    sensor_adc_channel: &[1, 2, 4],
    tacho_read_mode: TachoReadMode::Multiplexed {
        shared_pin: 26,
        select_pins: [22, 21, 20],
    },
    i2c_sda_pin: 2,
    i2c_scl_pin: 3,
    onewire_pin: None,
    led_pin: Some(25),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_counts_are_within_max() {
        assert!(FANPICO_0804D.validate_counts());
        assert_eq!(FANPICO_0804D.fans.len(), FANPICO_0804D.fan_count);
        assert_eq!(FANPICO_0804D.mbfans.len(), FANPICO_0804D.mbfan_count);
        assert_eq!(FANPICO_0804D.sensor_adc_channel.len(), FANPICO_0804D.sensor_count);
    }
}
