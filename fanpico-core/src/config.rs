//! The persisted configuration data model (§3).
//!
//! Mirrors `original_source/src/fanpico.h`'s `struct fanpico_config` and
//! its nested `fan_output`/`mb_input`/`sensor_input`/`vsensor_input`
//! structs. Opaque MQTT/SNMP/Telnet/SSH/display blocks are carried as data
//! (never interpreted here) per the expanded spec's supplemented-features
//! section.

use crate::board::{FAN_MAX_COUNT, MAX_NAME_LEN, VSENSOR_SOURCE_MAX_COUNT};
use crate::filters::Filter;
use crate::map::Map;
use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

pub type Name = String<MAX_NAME_LEN>;

/// Where a fan's PWM duty, or a mainboard connector's tacho frequency,
/// gets its input value from. Mirrors `pwm_source_types`/`tacho_source_types`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    Fixed,
    Mb,
    Sensor,
    Fan,
    Vsensor,
}

/// How a mainboard connector's tacho-output frequency is derived when it
/// has more than one upstream fan (§4.1). Mirrors the `TACHO_MIN`/`MAX`/
/// `AVG` reduction kinds; `Fixed`/`Fan` pass a single source through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    Fixed,
    Single,
    Min,
    Max,
    Avg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RpmMode {
    Tacho,
    Lra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Internal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VsensorMode {
    Manual,
    Max,
    Min,
    Avg,
    Delta,
    Onewire,
    I2c,
}

/// A fan output connector's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanOutput {
    pub name: Name,
    pub tacho_hysteresis: f32,
    pub pwm_hysteresis: f32,
    pub min_pwm: u8,
    pub max_pwm: u8,
    pub pwm_coefficient: f32,
    pub source: SignalSource,
    /// 0-based index into whichever table `source` names.
    pub source_id: usize,
    pub map: Map,
    pub filter: Filter,
    pub rpm_mode: RpmMode,
    /// Divides the raw pulse-per-minute count to get RPM; valid range `1..=8`.
    pub rpm_factor: u8,
    pub lra_low: f32,
    pub lra_high: f32,
}

/// A motherboard fan connector's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MbInput {
    pub name: Name,
    pub rpm_mode: RpmMode,
    pub min_rpm: f32,
    pub max_rpm: f32,
    pub rpm_coefficient: f32,
    pub rpm_factor: u8,
    pub lra_threshold: f32,
    pub lra_invert: bool,
    pub source: SignalSource,
    pub source_id: usize,
    pub sources: [u8; VSENSOR_SOURCE_MAX_COUNT],
    pub reduction: Reduction,
    pub map: Map,
    pub filter: Filter,
}

/// A physical temperature sensor's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorInput {
    pub name: Name,
    pub sensor_type: SensorType,
    pub thermistor_nominal: f32,
    pub temp_nominal: f32,
    pub beta_coefficient: f32,
    pub temp_offset: f32,
    pub temp_coefficient: f32,
    pub map: Map,
    pub filter: Filter,
}

/// A virtual sensor's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VsensorInput {
    pub name: Name,
    pub mode: VsensorMode,
    pub default_temp: f32,
    /// Seconds after which a MANUAL-mode vsensor reverts to `default_temp`
    /// if no new write is observed. Zero means "never".
    pub timeout_s: u32,
    /// 1-based, zero-terminated physical-sensor index list for
    /// MAX/MIN/AVG/DELTA modes.
    pub sensors: [u8; VSENSOR_SOURCE_MAX_COUNT],
    pub onewire_addr: Option<u64>,
    pub i2c_type: u8,
    pub i2c_addr: u8,
    pub map: Map,
    pub filter: Filter,
}

/// Boot-time settings that gate whether `Config` is even loaded; not part
/// of the persisted document itself. Mirrors `fanpico_fw_settings`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FirmwareSettings {
    pub safe_mode: bool,
    pub boot_delay_s: u8,
    pub sys_clock_khz: u32,
}

impl Default for FirmwareSettings {
    fn default() -> Self {
        FirmwareSettings { safe_mode: false, boot_delay_s: 0, sys_clock_khz: 125_000 }
    }
}

/// Carried, uninterpreted configuration blocks. Each is serialized and
/// deserialized verbatim; none of their contents are consumed anywhere in
/// this crate or the firmware binary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpaqueBlocks {
    pub wifi: Option<serde_json::Value>,
    pub mqtt: Option<serde_json::Value>,
    pub snmp: Option<serde_json::Value>,
    pub telnet: Option<serde_json::Value>,
    pub ssh: Option<serde_json::Value>,
    pub display: Option<serde_json::Value>,
}

/// The full persisted configuration document (§3/§4.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub name: Name,
    pub timezone: Name,
    pub i2c_speed_hz: u32,
    pub fans: Vec<FanOutput, 8>,
    pub mbfans: Vec<MbInput, 4>,
    pub sensors: Vec<SensorInput, 3>,
    pub vsensors: Vec<VsensorInput, 8>,
    #[serde(default)]
    pub opaque: OpaqueBlocks,
}

impl Config {
    /// Every index a fan/mbfan/vsensor's `source_id`/`sensors`/`sources`
    /// field names must fall inside the actually-configured table sizes.
    pub fn validate_indices(&self) -> Result<(), crate::error::CoreError> {
        use crate::error::CoreError;
        for fan in &self.fans {
            let in_range = match fan.source {
                SignalSource::Fixed => true,
                SignalSource::Mb => fan.source_id < self.mbfans.len(),
                SignalSource::Sensor => fan.source_id < self.sensors.len(),
                SignalSource::Fan => fan.source_id < self.fans.len(),
                SignalSource::Vsensor => fan.source_id < self.vsensors.len(),
            };
            if !in_range {
                return Err(CoreError::ConfigIndexOutOfRange);
            }
            if !(1..=8).contains(&fan.rpm_factor) {
                return Err(CoreError::RpmFactorOutOfRange);
            }
        }
        for mb in &self.mbfans {
            if !(1..=8).contains(&mb.rpm_factor) {
                return Err(CoreError::RpmFactorOutOfRange);
            }
            for idx in crate::util::source_indices(&mb.sources) {
                if idx >= self.fans.len() {
                    return Err(CoreError::ConfigIndexOutOfRange);
                }
            }
        }
        for vs in &self.vsensors {
            for idx in crate::util::source_indices(&vs.sensors) {
                if idx >= self.sensors.len() {
                    return Err(CoreError::ConfigIndexOutOfRange);
                }
            }
        }
        self.validate_fan_source_acyclic()?;
        Ok(())
    }

    /// A fan sourced from another fan (`SignalSource::Fan`) must not name
    /// itself, and following the `Fan → Fan` chain from any starting fan
    /// must terminate at a non-`Fan` source rather than loop back on
    /// itself (§4.1, §9). Runs after index-range validation, so every
    /// `source_id` visited here is already known to be in bounds.
    fn validate_fan_source_acyclic(&self) -> Result<(), crate::error::CoreError> {
        use crate::error::CoreError;
        for start in 0..self.fans.len() {
            let mut current = start;
            let mut visited = [false; FAN_MAX_COUNT];
            loop {
                let fan = &self.fans[current];
                if fan.source != SignalSource::Fan {
                    break;
                }
                if fan.source_id == current || visited[current] {
                    return Err(CoreError::ConfigCyclicSource);
                }
                visited[current] = true;
                current = fan.source_id;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Filter;
    use crate::map::Map;

    fn sample_fan() -> FanOutput {
        FanOutput {
            name: Name::try_from("fan1").unwrap(),
            tacho_hysteresis: 1.0,
            pwm_hysteresis: 1.0,
            min_pwm: 0,
            max_pwm: 100,
            pwm_coefficient: 1.0,
            source: SignalSource::Sensor,
            source_id: 0,
            map: Map::new(&[(0.0, 0.0), (100.0, 100.0)]).unwrap(),
            filter: Filter::none(),
            rpm_mode: RpmMode::Tacho,
            rpm_factor: 2,
            lra_low: 0.0,
            lra_high: 0.0,
        }
    }

    #[test]
    fn rejects_rpm_factor_out_of_range() {
        let mut fan = sample_fan();
        fan.rpm_factor = 0;
        let cfg = Config {
            name: Name::new(),
            timezone: Name::new(),
            i2c_speed_hz: 100_000,
            fans: Vec::from_slice(&[fan]).unwrap(),
            mbfans: Vec::new(),
            sensors: Vec::from_slice(&[SensorInput {
                name: Name::new(),
                sensor_type: SensorType::Internal,
                thermistor_nominal: 10000.0,
                temp_nominal: 25.0,
                beta_coefficient: 3950.0,
                temp_offset: 0.0,
                temp_coefficient: 1.0,
                map: Map::new(&[(0.0, 0.0), (100.0, 100.0)]).unwrap(),
                filter: Filter::none(),
            }])
            .unwrap(),
            vsensors: Vec::new(),
            opaque: OpaqueBlocks::default(),
        };
        assert!(cfg.validate_indices().is_err());
    }

    #[test]
    fn rejects_fan_sourced_from_itself() {
        let mut fan = sample_fan();
        fan.source = SignalSource::Fan;
        fan.source_id = 0;
        let cfg = Config {
            name: Name::new(),
            timezone: Name::new(),
            i2c_speed_hz: 100_000,
            fans: Vec::from_slice(&[fan]).unwrap(),
            mbfans: Vec::new(),
            sensors: Vec::new(),
            vsensors: Vec::new(),
            opaque: OpaqueBlocks::default(),
        };
        assert_eq!(cfg.validate_indices(), Err(crate::error::CoreError::ConfigCyclicSource));
    }

    #[test]
    fn rejects_cyclic_fan_source_chain() {
        let mut fan0 = sample_fan();
        fan0.source = SignalSource::Fan;
        fan0.source_id = 1;
        let mut fan1 = sample_fan();
        fan1.source = SignalSource::Fan;
        fan1.source_id = 0;
        let cfg = Config {
            name: Name::new(),
            timezone: Name::new(),
            i2c_speed_hz: 100_000,
            fans: Vec::from_slice(&[fan0, fan1]).unwrap(),
            mbfans: Vec::new(),
            sensors: Vec::new(),
            vsensors: Vec::new(),
            opaque: OpaqueBlocks::default(),
        };
        assert_eq!(cfg.validate_indices(), Err(crate::error::CoreError::ConfigCyclicSource));
    }

    #[test]
    fn accepts_non_cyclic_fan_source_chain() {
        let mut fan0 = sample_fan();
        fan0.source = SignalSource::Fan;
        fan0.source_id = 1;
        let fan1 = sample_fan();
        let cfg = Config {
            name: Name::new(),
            timezone: Name::new(),
            i2c_speed_hz: 100_000,
            fans: Vec::from_slice(&[fan0, fan1]).unwrap(),
            mbfans: Vec::new(),
            sensors: Vec::from_slice(&[SensorInput {
                name: Name::new(),
                sensor_type: SensorType::Internal,
                thermistor_nominal: 10000.0,
                temp_nominal: 25.0,
                beta_coefficient: 3950.0,
                temp_offset: 0.0,
                temp_coefficient: 1.0,
                map: Map::new(&[(0.0, 0.0), (100.0, 100.0)]).unwrap(),
                filter: Filter::none(),
            }])
            .unwrap(),
            vsensors: Vec::new(),
            opaque: OpaqueBlocks::default(),
        };
        assert!(cfg.validate_indices().is_ok());
    }

    #[test]
    fn rejects_out_of_range_source_id() {
        let mut fan = sample_fan();
        fan.source_id = 5;
        let cfg = Config {
            name: Name::new(),
            timezone: Name::new(),
            i2c_speed_hz: 100_000,
            fans: Vec::from_slice(&[fan]).unwrap(),
            mbfans: Vec::new(),
            sensors: Vec::new(),
            vsensors: Vec::new(),
            opaque: OpaqueBlocks::default(),
        };
        assert!(cfg.validate_indices().is_err());
    }
}
