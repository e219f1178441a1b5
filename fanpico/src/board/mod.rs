//! Binds the compile-time pin table in `fanpico_core::board` to concrete
//! `embassy_rp` peripherals for the 0804D board.
//!
//! Mirrors the per-pin commentary style of the teacher's `main.rs`/
//! `pinouts.rs`: every pin gets a one-line note on what it does on this
//! board, taken from `original_source/src/boards/0804D.h`.

use embassy_rp::gpio::{AnyPin, Level, Output};
use embassy_rp::peripherals;
use fanpico_core::board::FANPICO_0804D;

/// Everything `main` hands off to the task modules, already split into
/// the pin groups each task owns. Built once at boot from `Peripherals`.
pub struct BoardPins {
    // Fan 1..8 PWM generator pins, paired into PWM slices 2A/2B .. 5A/5B.
    pub fan_pwm_pins: [AnyPin; 8],
    // Shared tachometer-read pin (behind the 3-bit multiplexer) plus its
    // three select lines. The 0804D always multiplexes (TACHO_READ_MULTIPLEX=1).
    pub fan_tacho_shared_pin: AnyPin,
    pub fan_tacho_select_pins: [Output<'static>; 3],
    // Motherboard 1..4 tacho-output pins (PIO-driven square wave). PIO
    // state machines bind to concrete pin types, not the type-erased
    // `AnyPin` used everywhere else, so these stay concrete.
    pub mbfan_tacho_pins: (peripherals::PIN_12, peripherals::PIN_14, peripherals::PIN_16, peripherals::PIN_18),
    // Paired PWM-read ("B channel") pins.
    pub mbfan_pwm_read_pins: [AnyPin; 4],
    // Sensor 1/2 are external thermistors on ADC1/ADC2; sensor 3 is the
    // RP2040's own temperature sensor on ADC4, no GPIO needed for it.
    pub sensor_adc_pins: [AnyPin; 2],
    pub i2c_sda: AnyPin,
    pub i2c_scl: AnyPin,
    pub led_pin: Option<Output<'static>>,
}

impl BoardPins {
    #[allow(clippy::type_complexity)]
    pub fn init(
        p: peripherals::Peripherals,
    ) -> (
        Self,
        peripherals::PWM_SLICE2,
        peripherals::PWM_SLICE3,
        peripherals::PWM_SLICE4,
        peripherals::PWM_SLICE5,
        peripherals::PWM_SLICE6,
        peripherals::PWM_SLICE7,
        peripherals::PWM_SLICE0,
        peripherals::PWM_SLICE1,
        peripherals::ADC,
        peripherals::ADC_TEMP_SENSOR,
        peripherals::I2C1,
        peripherals::PIO0,
    ) {
        debug_assert!(FANPICO_0804D.validate_counts());

        let fan_pwm_pins = [
            AnyPin::from(p.PIN_4),
            AnyPin::from(p.PIN_5),
            AnyPin::from(p.PIN_6),
            AnyPin::from(p.PIN_7),
            AnyPin::from(p.PIN_8),
            AnyPin::from(p.PIN_9),
            AnyPin::from(p.PIN_10),
            AnyPin::from(p.PIN_11),
        ];

        // Multiplexer: shared tacho-read line plus S0/S1/S2 select pins.
        let fan_tacho_shared_pin = AnyPin::from(p.PIN_26);
        let fan_tacho_select_pins = [
            Output::new(p.PIN_22, Level::Low),
            Output::new(p.PIN_21, Level::Low),
            Output::new(p.PIN_20, Level::Low),
        ];

        let mbfan_tacho_pins = (p.PIN_12, p.PIN_14, p.PIN_16, p.PIN_18);
        let mbfan_pwm_read_pins = [
            AnyPin::from(p.PIN_13),
            AnyPin::from(p.PIN_15),
            AnyPin::from(p.PIN_17),
            AnyPin::from(p.PIN_19),
        ];

        let sensor_adc_pins = [AnyPin::from(p.PIN_27), AnyPin::from(p.PIN_28)];

        let i2c_sda = AnyPin::from(p.PIN_2);
        let i2c_scl = AnyPin::from(p.PIN_3);
        let led_pin = Some(Output::new(p.PIN_25, Level::Low));

        let pins = BoardPins {
            fan_pwm_pins,
            fan_tacho_shared_pin,
            fan_tacho_select_pins,
            mbfan_tacho_pins,
            mbfan_pwm_read_pins,
            sensor_adc_pins,
            i2c_sda,
            i2c_scl,
            led_pin,
        };

        (
            pins,
            p.PWM_SLICE2,
            p.PWM_SLICE3,
            p.PWM_SLICE4,
            p.PWM_SLICE5,
            p.PWM_SLICE6,
            p.PWM_SLICE7,
            p.PWM_SLICE0,
            p.PWM_SLICE1,
            p.ADC,
            p.ADC_TEMP_SENSOR,
            p.I2C1,
            p.PIO0,
        )
    }
}

/// Reads the multiplexer port currently assigned to `fan_index` back out
/// of the board's static pin table, for the tacho task's queue logic.
pub fn mux_port_for_fan(fan_index: usize) -> u8 {
    FANPICO_0804D.fans[fan_index].tacho_read_pin
}
