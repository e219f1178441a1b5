//! PWM output (fan duty) and PWM input (motherboard duty read) hardware
//! layer.
//!
//! Grounded in `original_source/src/pwm.c`: `setup_pwm_outputs()` (25kHz
//! phase-correct, one slice per A/B fan pair), `set_pwm_duty_cycle()`,
//! and `get_pwm_duty_cycles()` (gated-counter read over a fixed sample
//! window, discarding overflowed counts).

use embassy_rp::peripherals::{PWM_SLICE0, PWM_SLICE1, PWM_SLICE2, PWM_SLICE3, PWM_SLICE4, PWM_SLICE5, PWM_SLICE6, PWM_SLICE7};
use embassy_rp::pwm::{Config as PwmConfig, Pwm, SetDutyCycle};
use embassy_time::{Duration, Timer};

/// Matches `PWM_IN_SAMPLE_INTERVAL` in the original: the window over
/// which an incoming PWM signal's high-pulse count is sampled.
const PWM_IN_SAMPLE_INTERVAL: Duration = Duration::from_millis(10);
/// Matches `PWM_IN_CLOCK_DIVIDER`.
const PWM_IN_CLOCK_DIVIDER: u8 = 100;
/// A discarded sample's count threshold — matches the original's
/// "count would have wrapped a u16" guard.
const PWM_IN_MAX_COUNT: u32 = 65_535;

/// Four PWM slices, each driving one A/B fan pair (fans 1-8 on this board).
pub struct FanPwmOutputs {
    slices: [Pwm<'static>; 4],
    top: u16,
}

impl FanPwmOutputs {
    /// `top = sysclock / 25_000 / 2 - 1`, the phase-correct top value for a
    /// 25kHz carrier at the given system clock.
    pub fn new(
        sys_clock_hz: u32,
        slice2: PWM_SLICE2,
        pin4: embassy_rp::gpio::AnyPin,
        pin5: embassy_rp::gpio::AnyPin,
        slice3: PWM_SLICE3,
        pin6: embassy_rp::gpio::AnyPin,
        pin7: embassy_rp::gpio::AnyPin,
        slice4: PWM_SLICE4,
        pin8: embassy_rp::gpio::AnyPin,
        pin9: embassy_rp::gpio::AnyPin,
        slice5: PWM_SLICE5,
        pin10: embassy_rp::gpio::AnyPin,
        pin11: embassy_rp::gpio::AnyPin,
    ) -> Self {
        let top = (sys_clock_hz / 25_000 / 2 - 1) as u16;
        let mut cfg = PwmConfig::default();
        cfg.top = top;
        cfg.phase_correct = true;
        cfg.divider = 1u8.into();

        let slices = [
            Pwm::new_output_ab(slice2, pin4, pin5, cfg.clone()),
            Pwm::new_output_ab(slice3, pin6, pin7, cfg.clone()),
            Pwm::new_output_ab(slice4, pin8, pin9, cfg.clone()),
            Pwm::new_output_ab(slice5, pin10, pin11, cfg),
        ];
        FanPwmOutputs { slices, top }
    }

    /// Sets fan `index`'s (0..8) duty cycle as a percentage 0..=100,
    /// saturating at `top + 1` for duty >= 100 the way the original does.
    pub fn set_duty(&mut self, index: usize, duty_pct: u8) {
        let slice = &mut self.slices[index / 2];
        let level = if duty_pct >= 100 {
            self.top as u32 + 1
        } else {
            (duty_pct as u32) * (self.top as u32 + 1) / 100
        };
        let level = level.min(self.top as u32 + 1) as u16;
        if index % 2 == 0 {
            let _ = slice.set_duty_cycle_a(level);
        } else {
            let _ = slice.set_duty_cycle_b(level);
        }
    }
}

/// One PWM slice per motherboard connector, its B channel wired as an
/// input counter reading the motherboard's own PWM signal back.
pub struct MbfanPwmInputs {
    slices: [Pwm<'static>; 4],
}

impl MbfanPwmInputs {
    pub fn new(
        slice6: PWM_SLICE6,
        pin13: embassy_rp::gpio::AnyPin,
        slice7: PWM_SLICE7,
        pin15: embassy_rp::gpio::AnyPin,
        slice0: PWM_SLICE0,
        pin17: embassy_rp::gpio::AnyPin,
        slice1: PWM_SLICE1,
        pin19: embassy_rp::gpio::AnyPin,
    ) -> Self {
        let mut cfg = PwmConfig::default();
        cfg.divider = PWM_IN_CLOCK_DIVIDER.into();
        let slices = [
            Pwm::new_input(slice6, pin13, embassy_rp::gpio::Pull::None, embassy_rp::pwm::InputMode::RisingEdge, cfg.clone()),
            Pwm::new_input(slice7, pin15, embassy_rp::gpio::Pull::None, embassy_rp::pwm::InputMode::RisingEdge, cfg.clone()),
            Pwm::new_input(slice0, pin17, embassy_rp::gpio::Pull::None, embassy_rp::pwm::InputMode::RisingEdge, cfg.clone()),
            Pwm::new_input(slice1, pin19, embassy_rp::gpio::Pull::None, embassy_rp::pwm::InputMode::RisingEdge, cfg),
        ];
        MbfanPwmInputs { slices }
    }

    /// Samples every connector's incoming duty cycle over one
    /// `PWM_IN_SAMPLE_INTERVAL` window: resets each counter, waits, reads
    /// back the count, and discards (returns `None`) any channel whose
    /// count would have overflowed a 16-bit counter.
    pub async fn sample_all(&mut self) -> [Option<u8>; 4] {
        for s in &mut self.slices {
            s.set_counter(0);
        }
        Timer::after(PWM_IN_SAMPLE_INTERVAL).await;

        let mut out = [None; 4];
        for (i, s) in self.slices.iter().enumerate() {
            let count = s.counter() as u32;
            if count >= PWM_IN_MAX_COUNT {
                continue;
            }
            let rate = count * PWM_IN_CLOCK_DIVIDER as u32 * 1000 / PWM_IN_SAMPLE_INTERVAL.as_millis() as u32;
            out[i] = Some(rate.min(100) as u8);
        }
        out
    }
}
