#![allow(unused_imports)]

pub mod adc_sensor;
pub mod control;
pub mod ds18b20;
pub mod i2c_sensor;
pub mod onewire;
pub mod pwm;
pub mod supervisor;
pub mod tacho;

pub use control::control;
pub use supervisor::supervisor;
