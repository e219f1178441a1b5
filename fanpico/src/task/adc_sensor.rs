//! ADC sampling for the physical temperature sensors.
//!
//! Grounded in `original_source/src/sensors.c`'s `get_temperature()`,
//! which averages [`ADC_AVG_WINDOW`] raw samples before converting to
//! volts. The conversion from volts to temperature lives in
//! `fanpico_core::sensors`; this task only owns the ADC peripheral.

use embassy_rp::adc::{Adc, Channel};
use embassy_time::{Duration, Timer};
use fanpico_core::sensors::ADC_REF_VOLTAGE;

const ADC_AVG_WINDOW: u32 = 10;
const ADC_MAX_VALUE: u32 = 1 << 12;
const SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Reads and averages [`ADC_AVG_WINDOW`] samples from `channel`, returning
/// the resulting bus voltage.
pub async fn read_averaged_voltage(adc: &mut Adc<'static, embassy_rp::adc::Async>, channel: &mut Channel<'_>) -> f32 {
    let mut sum: u32 = 0;
    for _ in 0..ADC_AVG_WINDOW {
        let raw = adc.read(channel).await.unwrap_or(0);
        sum += raw as u32;
        Timer::after(SAMPLE_INTERVAL / ADC_AVG_WINDOW).await;
    }
    let avg = sum / ADC_AVG_WINDOW;
    ADC_REF_VOLTAGE * avg as f32 / ADC_MAX_VALUE as f32
}
