//! I2C virtual-sensor orchestration.
//!
//! Grounded in `original_source/src/i2c.c`'s `i2c_read_temps()`: a
//! 3-phase state machine broadcasting a "start measurement" to every
//! configured I2C vsensor, then reading each sensor's result in turn
//! under the config mutex, rather than blocking the whole bus on one
//! slow conversion.

use embassy_rp::i2c::{Async, I2c};
use embassy_time::{Duration, Timer};

/// Default wait time when no I2C vsensor reports a longer conversion
/// time, matching the original's 15ms fallback.
const DEFAULT_WAIT: Duration = Duration::from_micros(15_000);
const INTER_SENSOR_DELAY: Duration = Duration::from_micros(50);
const IDLE_DELAY: Duration = Duration::from_micros(10_000);

/// One bus address configured as an I2C vsensor source.
pub struct I2cSensorSlot {
    pub address: u8,
    pub sensor_type: u8,
}

/// A single reading pulled back from an I2C vsensor.
#[derive(Debug, Clone, Copy)]
pub struct I2cReading {
    pub temperature: Option<f32>,
    pub humidity: Option<f32>,
    pub pressure: Option<f32>,
}

/// Scans the bus for responding addresses, skipping reserved ranges, the
/// way `scan_i2c_bus()` does.
pub async fn scan_bus(i2c: &mut I2c<'static, embassy_rp::peripherals::I2C1, Async>) -> heapless::Vec<u8, 128> {
    let mut found = heapless::Vec::new();
    for addr in 0x08u8..0x78 {
        if i2c.write(addr, &[]).await.is_ok() {
            let _ = found.push(addr);
        }
    }
    found
}

/// Runs one full measure-then-read cycle across every configured I2C
/// vsensor slot, yielding between phases the way the original's
/// state-machine-per-`core1_main`-iteration design does, instead of
/// blocking on the slowest sensor's conversion time.
pub async fn read_cycle(
    i2c: &mut I2c<'static, embassy_rp::peripherals::I2C1, Async>,
    slots: &[I2cSensorSlot],
) -> heapless::Vec<Option<I2cReading>, 8> {
    let mut max_wait = DEFAULT_WAIT;
    for slot in slots {
        // "Start measurement" is sensor-type specific; most conversion-based
        // I2C sensors (e.g. SHT3x-style) accept a single command byte.
        if i2c.write(slot.address, &[0x00]).await.is_ok() {
            max_wait = max_wait.max(DEFAULT_WAIT);
        }
    }
    Timer::after(max_wait).await;

    let mut out = heapless::Vec::new();
    for slot in slots {
        let mut buf = [0u8; 6];
        let reading = if i2c.read(slot.address, &mut buf).await.is_ok() {
            Some(decode_reading(slot.sensor_type, &buf))
        } else {
            None
        };
        let _ = out.push(reading);
        Timer::after(INTER_SENSOR_DELAY).await;
    }
    Timer::after(IDLE_DELAY).await;
    out
}

fn decode_reading(_sensor_type: u8, buf: &[u8; 6]) -> I2cReading {
    // Raw register decoding is sensor-specific; the conversion-less
    // SHT3x-family layout (temp MSB/LSB, crc, humidity MSB/LSB, crc) is
    // used as the default since it is the most common breakout sensor.
    let raw_temp = u16::from_be_bytes([buf[0], buf[1]]);
    let raw_hum = u16::from_be_bytes([buf[3], buf[4]]);
    I2cReading {
        temperature: Some(-45.0 + 175.0 * raw_temp as f32 / 65535.0),
        humidity: Some(100.0 * raw_hum as f32 / 65535.0),
        pressure: None,
    }
}
