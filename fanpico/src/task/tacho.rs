//! Fan tachometer input (multiplexed) and motherboard tachometer output.
//!
//! Grounded in `original_source/src/tacho.c`. The 0804D board multiplexes
//! all 8 fan tacho lines behind a single shared pin and a 3-bit selector
//! (`TACHO_READ_MULTIPLEX=1`), so only the multiplexed read strategy is
//! implemented; the direct-read variant in the original is a different
//! board's compile-time branch, out of scope for this board profile.
//!
//! Queue fairness: the original keeps two queues — spinning fans (queue
//! 0, re-measured every sweep) and silent fans (queue 1, a fan moves here
//! once a measurement window produces no pulse). Its comment says "only
//! process one entry from queue 1 at a time" but the surrounding code
//! unconditionally resets the queue cursor on every queue-1 visit, which
//! reads as ambiguous between "one queue-1 fan per whole sweep of queue
//! 0" and "one queue-1 fan every time the state machine reaches queue 1,
//! however often that is". This implementation takes the first, stronger
//! reading: every fan in queue 0 is re-measured each sweep, and exactly
//! one fan advances out of queue 1 per sweep, round-robin. A fan that
//! regains a pulse moves back into queue 0 immediately.

use embassy_rp::gpio::{AnyPin, Level, Output};
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{Common, Config as PioConfig, Pio, StateMachine};
use embassy_time::{Duration, Instant, Timer};
use fixed::types::U24F8;
use heapless::Vec;

const SETTLE_TIME: Duration = Duration::from_micros(50);
/// Matches the original's 600ms measurement ceiling (down to 50 RPM).
const MAX_MEASURE_WINDOW: Duration = Duration::from_millis(600);

pub struct MultiplexedTachoReader {
    shared_pin: embassy_rp::gpio::Input<'static>,
    select: [Output<'static>; 3],
    queue0: Vec<u8, 8>,
    queue1: Vec<u8, 8>,
    queue1_cursor: usize,
}

impl MultiplexedTachoReader {
    pub fn new(shared_pin: AnyPin, select: [Output<'static>; 3], fan_count: u8) -> Self {
        let shared_pin = embassy_rp::gpio::Input::new(shared_pin, embassy_rp::gpio::Pull::None);
        let mut queue0 = Vec::new();
        for i in 0..fan_count {
            let _ = queue0.push(i);
        }
        MultiplexedTachoReader { shared_pin, select, queue0, queue1: Vec::new(), queue1_cursor: 0 }
    }

    fn select_port(&mut self, port: u8) {
        self.select[0].set_level(if port & 0b001 != 0 { embassy_rp::gpio::Level::High } else { embassy_rp::gpio::Level::Low });
        self.select[1].set_level(if port & 0b010 != 0 { embassy_rp::gpio::Level::High } else { embassy_rp::gpio::Level::Low });
        self.select[2].set_level(if port & 0b100 != 0 { embassy_rp::gpio::Level::High } else { embassy_rp::gpio::Level::Low });
    }

    /// Measures one fan's pulse interval: selects its mux port, waits for
    /// the mux to settle, then waits for one full rising-edge period (or
    /// times out after [`MAX_MEASURE_WINDOW`], meaning "no pulse, at or
    /// below 50 RPM"). Returns a frequency in Hz.
    async fn measure_one(&mut self, fan_index: u8) -> Option<f32> {
        self.select_port(fan_index);
        Timer::after(SETTLE_TIME).await;

        let deadline = Instant::now() + MAX_MEASURE_WINDOW;
        self.shared_pin.wait_for_rising_edge().await;
        let t0 = Instant::now();
        if t0 >= deadline {
            return None;
        }
        match embassy_time::with_timeout(deadline - t0, self.shared_pin.wait_for_rising_edge()).await {
            Ok(()) => {
                let period = Instant::now() - t0;
                Some(1_000_000.0 / period.as_micros() as f32)
            }
            Err(_) => None,
        }
    }

    /// Runs one sweep: re-measures every fan currently in queue 0, then
    /// advances exactly one fan out of queue 1. Returns `(fan_index,
    /// frequency_hz_or_none)` pairs for everything measured this sweep.
    pub async fn sweep(&mut self) -> Vec<(u8, Option<f32>), 8> {
        let mut results = Vec::new();
        let spinning: Vec<u8, 8> = self.queue0.iter().copied().collect();
        for fan in spinning {
            let freq = self.measure_one(fan).await;
            if freq.is_none() {
                self.queue0.retain(|&f| f != fan);
                if self.queue1.iter().all(|&f| f != fan) {
                    let _ = self.queue1.push(fan);
                }
            }
            let _ = results.push((fan, freq));
        }

        if !self.queue1.is_empty() {
            self.queue1_cursor %= self.queue1.len();
            let fan = self.queue1[self.queue1_cursor];
            let freq = self.measure_one(fan).await;
            if freq.is_some() {
                self.queue1.retain(|&f| f != fan);
                if self.queue0.iter().all(|&f| f != fan) {
                    let _ = self.queue0.push(fan);
                }
            } else {
                self.queue1_cursor += 1;
            }
            let _ = results.push((fan, freq));
        }

        results
    }
}

/// Motherboard tacho output frequency generator: one PIO state machine per
/// connector either drives a synthesized square wave (`TACHO` mode) or
/// holds the line at a steady level, optionally inverted (`LRA` mode),
/// via [`StateMachine::set_pins`] rather than a separate GPIO `Output` —
/// a single PIO-owned pin per connector covers both modes, so there's no
/// runtime hand-off between two different peripheral owners of the same
/// pin. `PIO0` state machines 0..3 are distinct types (the const generic
/// index), so they're named fields rather than an array, the same way
/// `embassy_rp::pio::Pio::new` itself exposes `sm0`..`sm3`.
/// Grounded in `tacho.c`'s `set_tacho_output_freq()`/`set_lra_output()`.
pub struct MbfanTachoOutputs {
    common: Common<'static, PIO0>,
    sm0: StateMachine<'static, PIO0, 0>,
    sm1: StateMachine<'static, PIO0, 1>,
    sm2: StateMachine<'static, PIO0, 2>,
    sm3: StateMachine<'static, PIO0, 3>,
    pins: [embassy_rp::pio::Pin<'static, PIO0>; 4],
}

impl MbfanTachoOutputs {
    pub fn new(
        pio: Pio<'static, PIO0>,
        pins: (
            embassy_rp::peripherals::PIN_12,
            embassy_rp::peripherals::PIN_14,
            embassy_rp::peripherals::PIN_16,
            embassy_rp::peripherals::PIN_18,
        ),
    ) -> Self {
        let Pio { mut common, sm0, sm1, sm2, sm3, .. } = pio;
        let pins = [
            common.make_pio_pin(pins.0),
            common.make_pio_pin(pins.1),
            common.make_pio_pin(pins.2),
            common.make_pio_pin(pins.3),
        ];
        MbfanTachoOutputs { common, sm0, sm1, sm2, sm3, pins }
    }

    /// Drives connector `index`'s line for LRA mode: a steady level
    /// (optionally inverted) rather than a synthesized tachometer wave.
    /// Stops whatever tachometer wave was running on that connector first.
    pub fn set_lra(&mut self, index: usize, asserted: bool, invert: bool) {
        let level = if asserted ^ invert { Level::High } else { Level::Low };
        let Some(pin) = self.pins.get(index) else { return };
        macro_rules! hold {
            ($sm:expr) => {{
                $sm.set_enable(false);
                $sm.set_pins(level, &[pin]);
            }};
        }
        match index {
            0 => hold!(self.sm0),
            1 => hold!(self.sm1),
            2 => hold!(self.sm2),
            3 => hold!(self.sm3),
            _ => {}
        }
    }

    /// Programs connector `index`'s state machine to output `freq_hz` (0
    /// stops the wave and parks the pin low), loading `square_wave::program`
    /// on first use. `sys_clock_hz` is the RP2040 system clock the divider
    /// is computed against, mirroring `set_tacho_output_freq()`'s
    /// `clock_get_hz(clk_sys) / (freq * cycles_per_period)` calculation.
    pub fn set_frequency(&mut self, index: usize, freq_hz: f32, sys_clock_hz: u32) {
        if freq_hz <= 0.0 {
            self.set_lra(index, false, false);
            return;
        }
        let Some(pin) = self.pins.get(index) else { return };
        let program = self.common.load_program(&square_wave::program());
        let mut cfg = PioConfig::default();
        cfg.set_set_pins(&[pin]);
        cfg.use_program(&program, &[]);
        let divider = (sys_clock_hz as f32) / (freq_hz * square_wave::CYCLES_PER_PERIOD as f32);
        cfg.clock_divider = U24F8::from_num(divider.clamp(1.0, 65536.0));
        macro_rules! run {
            ($sm:expr) => {{
                $sm.set_config(&cfg);
                $sm.set_enable(true);
            }};
        }
        match index {
            0 => run!(self.sm0),
            1 => run!(self.sm1),
            2 => run!(self.sm2),
            3 => run!(self.sm3),
            _ => {}
        }
    }
}

/// PIO program generating a 50% duty square wave — the clock divider
/// picked by [`MbfanTachoOutputs::set_frequency`] controls the output
/// frequency; one full period is two `set` instructions of 32 cycles
/// each (64 total).
pub mod square_wave {
    use pio_proc::pio_asm;

    pub fn program() -> pio::Program<32> {
        pio_asm!(
            ".wrap_target",
            "set pins, 1 [31]",
            "set pins, 0 [31]",
            ".wrap",
        )
        .program
    }

    pub const CYCLES_PER_PERIOD: u32 = 64;
}
