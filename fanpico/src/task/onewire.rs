#![allow(dead_code)]
//! Bit-banged 1-Wire bus driver, adapted for `embassy_rp`'s open-drain
//! `Flex` pin. Timing and structure follow the teacher's onewire driver
//! closely; see `original_source/src/onewire.c` for the scan/search-ROM
//! behavior this bus is used for.

use embassy_rp::gpio::{AnyPin, Flex, Pull};
use embassy_time::{block_for, Duration, Instant};

pub struct OneWireBus {
    pin: Flex<'static>,
}

mod command {
    pub const SEARCH_NORMAL: u8 = 0xF0;
    pub const MATCH_ROM: u8 = 0x55;
    pub const SKIP_ROM: u8 = 0xCC;
    pub const SEARCH_ALARM: u8 = 0xEC;
    pub const READ_POWER_SUPPLY: u8 = 0xB4;
}

impl OneWireBus {
    pub fn new(onewire_pin: AnyPin) -> Self {
        let mut pin = Flex::new(onewire_pin);
        pin.set_pull(Pull::None);
        pin.set_as_input();
        Self { pin }
    }

    pub fn send_command(&mut self, command: u8, address: u64) -> Result<(), OneWireBusError> {
        self.reset()?;
        self.match_address(address);
        self.write_byte(command);
        Ok(())
    }

    /// Returns an error if no device responds to the reset pulse.
    #[inline]
    pub fn reset(&mut self) -> Result<(), OneWireBusError> {
        // During the initialization sequence the bus master transmits (TX)
        // the reset pulse by pulling the 1-Wire bus low for a minimum of 480us.
        // The bus master then releases the bus and goes into receive mode (RX).
        // When the bus is released, the pullup resistor pulls the 1-Wire
        // bus high. When the device detects this rising edge, it waits 15us to
        // 60us and then transmits a presence pulse by pulling the 1-Wire bus
        // low for 60us to 240us.
        const RESET_TIME_HIGH: u64 = 480 + 24;
        const RESET_TIME_LOW: u64 = 480 + 24;

        self.wait_for_high()?;
        self.pin.set_as_output();
        self.pin.set_low();
        block_for(Duration::from_micros(RESET_TIME_HIGH));
        self.pin.set_as_input();

        let mut device_present = false;
        let start = Instant::now();
        while (Instant::now() - start) < Duration::from_micros(RESET_TIME_LOW) {
            if !device_present {
                device_present = self.pin.is_low();
            }
            block_for(Duration::from_micros(20));
        }

        if device_present {
            Ok(())
        } else {
            Err(OneWireBusError::DeviceNotPresent)
        }
    }

    #[inline]
    fn wait_for_high(&self) -> Result<(), OneWireBusError> {
        let start = Instant::now();
        while (Instant::now() - start) < Duration::from_micros(250) {
            if self.pin.is_high() {
                return Ok(());
            }
            block_for(Duration::from_micros(10));
        }
        Err(OneWireBusError::BusNotHighTimeout)
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        const RECOVERY_TIME: u64 = 2;
        const TIME_SLOT: u64 = 80;
        const WRITE_1_LOW_TIME: u64 = 5;
        const WRITE_0_LOW_TIME: u64 = TIME_SLOT;

        for i in 0..8 {
            block_for(Duration::from_micros(RECOVERY_TIME));
            self.pin.set_as_output();
            if (byte >> i) & 1 == 1 {
                self.pin.set_low();
                block_for(Duration::from_micros(WRITE_1_LOW_TIME));
                self.pin.set_as_input();
                block_for(Duration::from_micros(TIME_SLOT - WRITE_1_LOW_TIME));
            } else {
                self.pin.set_low();
                block_for(Duration::from_micros(WRITE_0_LOW_TIME));
                self.pin.set_as_input();
            }
        }
    }

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.write_byte(*byte);
        }
    }

    #[inline]
    pub fn match_address(&mut self, address: u64) {
        self.write_byte(command::MATCH_ROM);
        self.write_bytes(&address.to_le_bytes());
    }

    #[inline]
    fn read_bit(&mut self) -> bool {
        self.pin.set_as_output();
        self.pin.set_low();
        block_for(Duration::from_micros(6));
        self.pin.set_as_input();
        block_for(Duration::from_micros(9));
        let read_bit = self.pin.is_high();
        block_for(Duration::from_micros(55));
        read_bit
    }

    #[inline]
    fn read_byte(&mut self) -> u8 {
        (0..8).fold(0u8, |acc, bit_index| {
            if self.read_bit() {
                acc | (1 << bit_index)
            } else {
                acc
            }
        })
    }

    #[inline]
    pub fn read_bytes<const N: usize>(&mut self, buffer: &mut [u8; N]) {
        for slot in buffer.iter_mut() {
            *slot = self.read_byte();
        }
    }

    /// Checks a scratchpad's trailing CRC-8/MAXIM byte against the
    /// preceding bytes, per the 1-Wire family's standard CRC.
    pub fn check_crc8(bytes: &[u8]) -> Result<(), OneWireBusError> {
        let (data, expected) = bytes.split_at(bytes.len() - 1);
        let mut crc = 0u8;
        for &byte in data {
            let mut b = byte;
            for _ in 0..8 {
                let mix = (crc ^ b) & 0x01;
                crc >>= 1;
                if mix != 0 {
                    crc ^= 0x8C;
                }
                b >>= 1;
            }
        }
        if crc == expected[0] {
            Ok(())
        } else {
            Err(OneWireBusError::ChecksumFailed)
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum OneWireBusError {
    BusNotHighTimeout,
    DeviceNotPresent,
    ChecksumFailed,
}
