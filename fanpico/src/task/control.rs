//! The real-time control loop (core1 in the original firmware).
//!
//! Grounded in `original_source/src/fanpico.c`'s `core1_main()`: this task
//! never touches I2C, flash, UART, or USB (§5's core split invariant),
//! and drives every cadence (tacho sampling, PWM duty commit, sensor
//! read, output update, mutex exchange) off one fixed tick instead of the
//! original's free-running `time_us_64()` deltas, which is equivalent but
//! easier to reason about under `embassy_time`.

use embassy_time::{Duration, Instant, Ticker};
use fanpico_core::config::Config;
use fanpico_core::pipeline::{calculate_pwm_duty, calculate_tacho_freq};
use fanpico_core::sensors::{read_temperature, read_vsensor};
use fanpico_core::state::ControlState;

use crate::persistent_mem::SharedPersistentMemory;
use crate::shared::{
    try_with_timeout, SharedConfig, SharedControlState, CONFIG_MUTEX_TIMEOUT, PERSISTENT_MUTEX_TIMEOUT,
    STATE_MUTEX_TIMEOUT,
};
use crate::task::adc_sensor;
use crate::task::pwm::{FanPwmOutputs, MbfanPwmInputs};
use crate::task::tacho::{MbfanTachoOutputs, MultiplexedTachoReader};

const TICK: Duration = Duration::from_millis(50);
/// RP2040 system clock, used to compute the PIO clock divider for
/// synthesized mainboard tachometer waveforms. Matches the fixed
/// `125_000_000` clock the fan PWM slices are configured against in `main`.
const SYS_CLOCK_HZ: u32 = 125_000_000;
/// Ticks per second at the 50ms cadence; used to pace the once-a-second
/// persistent-memory/vsensor-age updates.
const TICKS_PER_SECOND: u64 = 20;

/// Resources the control task owns exclusively. Built in `main` and moved
/// in whole; nothing here is shared with the supervisor except through
/// `shared_config`/`shared_state`.
pub struct ControlResources {
    pub fan_pwm: FanPwmOutputs,
    pub mbfan_pwm_in: MbfanPwmInputs,
    pub tacho_reader: MultiplexedTachoReader,
    pub mbfan_tacho_out: MbfanTachoOutputs,
    pub adc: embassy_rp::adc::Adc<'static, embassy_rp::adc::Async>,
    pub sensor_channels: [embassy_rp::adc::Channel<'static>; 3],
}

#[embassy_executor::task]
pub async fn control(
    mut resources: ControlResources,
    shared_config: SharedConfig,
    shared_state: SharedControlState,
    shared_persistent: SharedPersistentMemory,
    mut local_config: Config,
    mut unix_clock_s: u64,
) {
    let mut state = ControlState::new(
        local_config.fans.len(),
        local_config.mbfans.len(),
        local_config.sensors.len(),
        local_config.vsensors.len(),
    );

    let mut ticker = Ticker::every(TICK);
    let mut tick_count: u64 = 0;
    let mut last_loop = Instant::now();

    loop {
        ticker.next().await;
        let now = Instant::now();
        let delta = now - last_loop;
        last_loop = now;
        let dt_s = delta.as_micros() as f32 / 1_000_000.0;

        // Tacho input: every cycle. A full sweep over the multiplexed
        // queue naturally paces itself slower than 50ms when many fans
        // are present; that's fine, it only feeds `update_tacho_input_freq`.
        for (fan_idx, freq) in resources.tacho_reader.sweep().await {
            if let (Some(freq), Some(slot)) = (freq, state.fan_freq.get_mut(fan_idx as usize)) {
                slot.update_if_changed(freq, local_config.fans[fan_idx as usize].tacho_hysteresis);
            }
        }

        // Mainboard PWM input: sampled every cycle, committed with hysteresis.
        for (i, duty) in resources.mbfan_pwm_in.sample_all().await.iter().enumerate() {
            if let (Some(duty), Some(slot)) = (duty, state.mbfan_duty.get_mut(i)) {
                slot.update_if_changed(*duty as f32, local_config.mbfans[i].pwm_hysteresis);
            }
        }

        // Physical sensors: every 2 seconds (40 ticks at 50ms). Every
        // board-declared ADC channel gets its own sample; there is one
        // channel per configured sensor, never shared between two.
        if tick_count % 40 == 0 {
            for (i, sensor) in local_config.sensors.iter_mut().enumerate() {
                if let Some(channel) = resources.sensor_channels.get_mut(i) {
                    let volts = adc_sensor::read_averaged_voltage(&mut resources.adc, channel).await;
                    let t = read_temperature(sensor, volts, dt_s);
                    if let Some(slot) = state.temp.get_mut(i) {
                        slot.update_if_changed(t, 0.5);
                    }
                }
            }
        }

        // Virtual sensors: every 2 seconds, right after physical sensors
        // are refreshed, so MAX/MIN/AVG/DELTA see the latest readings.
        if tick_count % 40 == 0 {
            let mut temps: heapless::Vec<f32, { fanpico_core::board::SENSOR_MAX_COUNT }> = heapless::Vec::new();
            for h in state.temp.iter() {
                let _ = temps.push(h.current);
            }
            for (i, vsensor) in local_config.vsensors.iter_mut().enumerate() {
                let last_value = state.vtemp_manual.get(i).copied().flatten();
                let age = state.vtemp_manual_age_s.get(i).copied();
                let v = read_vsensor(vsensor, &temps, last_value, age, dt_s);
                if let Some(slot) = state.vtemp.get_mut(i) {
                    slot.update_if_changed(v, 0.5);
                }
            }
        }

        // Outputs: every 500ms (10 ticks).
        if tick_count % 10 == 0 {
            update_outputs(&local_config, &mut state, &mut resources);
        }

        // Config exchange: copy a fresh config every second (20 ticks).
        if tick_count % TICKS_PER_SECOND == 0 {
            try_with_timeout(shared_config, CONFIG_MUTEX_TIMEOUT, |cfg| {
                local_config = cfg.clone();
            })
            .await;
        }

        // State exchange: publish a snapshot every 500ms (10 ticks).
        if tick_count % 10 == 0 {
            try_with_timeout(shared_state, STATE_MUTEX_TIMEOUT, |shared| {
                *shared = state.clone();
            })
            .await;
        }

        // Persistent-memory tick and vsensor manual-write aging: once a
        // second (§4.4 assigns this to the control task, through a
        // dedicated short try-acquire mutex rather than a blocking lock).
        if tick_count % TICKS_PER_SECOND == 0 {
            unix_clock_s += 1;
            state.tick_vsensor_manual_age();
            try_with_timeout(shared_persistent, PERSISTENT_MUTEX_TIMEOUT, |block| {
                block.tick_one_second(unix_clock_s);
            })
            .await;
        }

        tick_count = tick_count.wrapping_add(1);
    }
}

fn update_outputs(config: &Config, state: &mut ControlState, resources: &mut ControlResources) {
    for (i, fan) in config.fans.iter().enumerate() {
        let duty = calculate_pwm_duty(fan, state);
        if let Some(slot) = state.fan_duty.get_mut(i) {
            if slot.update_if_changed(duty, 1) {
                resources.fan_pwm.set_duty(i, duty);
            }
        }
    }

    for (i, mb) in config.mbfans.iter().enumerate() {
        let freq = calculate_tacho_freq(mb, state);
        if let Some(slot) = state.mbfan_freq.get_mut(i) {
            if slot.update_if_changed(freq, 1.0) {
                use fanpico_core::config::RpmMode;
                match mb.rpm_mode {
                    RpmMode::Tacho => {
                        resources.mbfan_tacho_out.set_frequency(i, freq, SYS_CLOCK_HZ);
                    }
                    RpmMode::Lra => {
                        let asserted = freq >= mb.lra_threshold;
                        resources.mbfan_tacho_out.set_lra(i, asserted, mb.lra_invert);
                    }
                }
            }
        }
    }
}
