#![allow(dead_code)]
//! DS18B20 temperature sensor driver over [`super::onewire::OneWireBus`].
//!
//! Adapted from the teacher's single hardcoded-sensor driver; here a
//! `Ds18b20` is constructed per ROM address discovered by the bus scan
//! (`original_source/src/onewire.c`'s `onewire_scan_bus()`), since a
//! FanPico vsensor in `ONEWIRE` mode names an address rather than
//! assuming exactly one device on the bus.

use super::onewire::{OneWireBus, OneWireBusError};
use embassy_time::Duration;

const FAMILY_CODE: u8 = 0x28;
pub const CHECKSUM_RETRIES: u8 = 3;

pub struct Ds18b20 {
    address: u64,
    bus: OneWireBus,
}

impl Ds18b20 {
    pub fn new(address: u64, bus: OneWireBus) -> Result<Self, Ds18b20Error> {
        if address.to_le_bytes()[0] == FAMILY_CODE {
            Ok(Self { address, bus })
        } else {
            Err(Ds18b20Error::FamilyCodeMismatch)
        }
    }

    pub fn start_temp_measurement(&mut self) -> Result<(), Ds18b20Error> {
        self.bus.send_command(command::CONVERT_TEMP, self.address)?;
        Ok(())
    }

    pub fn read_scratchpad(&mut self) -> Result<[u8; 9], Ds18b20Error> {
        let mut scratchpad = [0; 9];
        self.bus.reset()?;
        self.bus.match_address(self.address);
        self.bus.write_byte(command::READ_SCRATCHPAD);
        self.bus.read_bytes(&mut scratchpad);
        OneWireBus::check_crc8(&scratchpad)?;
        Ok(scratchpad)
    }

    /// Reads sensor data, retrying up to [`CHECKSUM_RETRIES`] times on a
    /// checksum failure (a fairly common transient 1-Wire glitch).
    pub fn read_sensor_data_with_retries(&mut self) -> Result<SensorData, Ds18b20Error> {
        let mut last_err = Ds18b20Error::FamilyCodeMismatch;
        for _ in 0..=CHECKSUM_RETRIES {
            match self.read_sensor_data() {
                Ok(data) => return Ok(data),
                Err(e @ Ds18b20Error::OneWireError(OneWireBusError::ChecksumFailed)) => last_err = e,
                Err(e) => return Err(e),
            }
        }
        Err(last_err)
    }

    pub fn read_sensor_data(&mut self) -> Result<SensorData, Ds18b20Error> {
        let scratchpad = self.read_scratchpad()?;
        let resolution = Resolution::try_from(scratchpad[4])?;

        let raw_temp = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
        let temperature = match resolution {
            Resolution::Bits12 => (raw_temp as f32) / 16.0,
            Resolution::Bits11 => (raw_temp as f32) / 8.0,
            Resolution::Bits10 => (raw_temp as f32) / 4.0,
            Resolution::Bits9 => (raw_temp as f32) / 2.0,
        };

        Ok(SensorData {
            temperature,
            resolution,
            alarm_temp_high: scratchpad[2] as i8,
            alarm_temp_low: scratchpad[3] as i8,
        })
    }
}

mod command {
    pub const CONVERT_TEMP: u8 = 0x44;
    pub const WRITE_SCRATCHPAD: u8 = 0x4E;
    pub const READ_SCRATCHPAD: u8 = 0xBE;
    pub const COPY_SCRATCHPAD: u8 = 0x48;
    pub const RECALL_EEPROM: u8 = 0xB8;
}

#[repr(u8)]
#[derive(Copy, Clone, Debug)]
pub enum Resolution {
    Bits9 = 0b0001_1111,
    Bits10 = 0b0011_1111,
    Bits11 = 0b0101_1111,
    Bits12 = 0b0111_1111,
}

impl Resolution {
    pub const fn max_measurement_time(&self) -> Duration {
        match self {
            Resolution::Bits9 => Duration::from_millis(94),
            Resolution::Bits10 => Duration::from_millis(188),
            Resolution::Bits11 => Duration::from_millis(375),
            Resolution::Bits12 => Duration::from_millis(750),
        }
    }
}

impl TryFrom<u8> for Resolution {
    type Error = Ds18b20Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0b0001_1111 => Ok(Resolution::Bits9),
            0b0011_1111 => Ok(Resolution::Bits10),
            0b0101_1111 => Ok(Resolution::Bits11),
            0b0111_1111 => Ok(Resolution::Bits12),
            _ => Err(Ds18b20Error::InvalidResolution),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Ds18b20Error {
    OneWireError(OneWireBusError),
    InvalidResolution,
    FamilyCodeMismatch,
}

impl From<OneWireBusError> for Ds18b20Error {
    fn from(error: OneWireBusError) -> Self {
        Ds18b20Error::OneWireError(error)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SensorData {
    pub temperature: f32,
    pub resolution: Resolution,
    pub alarm_temp_low: i8,
    pub alarm_temp_high: i8,
}
