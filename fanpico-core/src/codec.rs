//! Top-level JSON encode/decode for [`Config`] (§4.5).
//!
//! Grounded in `original_source/src/config.c`'s `config_to_json()` /
//! `json_to_config()`. Per-field conversions (maps, filters) live next to
//! their types ([`crate::map`], [`crate::filters`]); this module is the
//! thin `fanpico.cfg` read/write surface plus index validation.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use alloc::string::String;

/// Serializes `config` to its persisted JSON form.
pub fn to_json(config: &Config) -> CoreResult<String> {
    serde_json::to_string(config).map_err(|_| CoreError::ConfigParse)
}

/// Serializes `config` with 2-space indentation, for `print_config` /
/// config-download collaborator surfaces.
pub fn to_json_pretty(config: &Config) -> CoreResult<String> {
    serde_json::to_string_pretty(config).map_err(|_| CoreError::ConfigParse)
}

/// Parses and validates a persisted JSON document, rejecting configs that
/// reference out-of-range fan/mbfan/sensor/vsensor indices.
pub fn from_json(text: &str) -> CoreResult<Config> {
    let config: Config = serde_json::from_str(text).map_err(|_| CoreError::ConfigParse)?;
    config.validate_indices()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FanOutput, MbInput, OpaqueBlocks, Reduction, RpmMode, SensorInput, SensorType, SignalSource, VsensorInput, VsensorMode};
    use crate::filters::Filter;
    use crate::map::Map;
    use heapless::{String as HString, Vec as HVec};

    fn sample_config() -> Config {
        Config {
            name: HString::try_from("bench-rig").unwrap(),
            timezone: HString::try_from("UTC").unwrap(),
            i2c_speed_hz: 100_000,
            fans: HVec::from_slice(&[FanOutput {
                name: HString::try_from("fan1").unwrap(),
                tacho_hysteresis: 1.0,
                pwm_hysteresis: 1.0,
                min_pwm: 20,
                max_pwm: 100,
                pwm_coefficient: 1.0,
                source: SignalSource::Sensor,
                source_id: 0,
                map: Map::new(&[(20.0, 30.0), (60.0, 100.0)]).unwrap(),
                filter: Filter::sma("4").unwrap(),
                rpm_mode: RpmMode::Tacho,
                rpm_factor: 2,
                lra_low: 0.0,
                lra_high: 0.0,
            }])
            .unwrap(),
            mbfans: HVec::from_slice(&[MbInput {
                name: HString::try_from("mb1").unwrap(),
                rpm_mode: RpmMode::Tacho,
                min_rpm: 0.0,
                max_rpm: 3000.0,
                rpm_coefficient: 1.0,
                rpm_factor: 2,
                lra_threshold: 0.0,
                lra_invert: false,
                source: SignalSource::Fan,
                source_id: 0,
                sources: [1, 0, 0, 0, 0, 0, 0, 0],
                reduction: Reduction::Max,
                map: Map::new(&[(0.0, 0.0), (3000.0, 3000.0)]).unwrap(),
                filter: Filter::none(),
            }])
            .unwrap(),
            sensors: HVec::from_slice(&[SensorInput {
                name: HString::try_from("case").unwrap(),
                sensor_type: SensorType::External,
                thermistor_nominal: 10_000.0,
                temp_nominal: 25.0,
                beta_coefficient: 3950.0,
                temp_offset: 0.0,
                temp_coefficient: 1.0,
                map: Map::new(&[(0.0, 0.0), (100.0, 100.0)]).unwrap(),
                filter: Filter::lossypeak("5.0,2.0").unwrap(),
            }])
            .unwrap(),
            vsensors: HVec::from_slice(&[VsensorInput {
                name: HString::try_from("avg").unwrap(),
                mode: VsensorMode::Avg,
                default_temp: 20.0,
                timeout_s: 60,
                sensors: [1, 0, 0, 0, 0, 0, 0, 0],
                onewire_addr: None,
                i2c_type: 0,
                i2c_addr: 0,
                map: Map::new(&[(0.0, 0.0), (100.0, 100.0)]).unwrap(),
                filter: Filter::none(),
            }])
            .unwrap(),
            opaque: OpaqueBlocks::default(),
        }
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = sample_config();
        let text = to_json(&cfg).unwrap();
        let parsed = from_json(&text).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(from_json("not json").is_err());
    }

    #[test]
    fn rejects_dangling_source_reference() {
        let mut cfg = sample_config();
        cfg.fans[0].source_id = 9;
        let text = to_json(&cfg).unwrap();
        assert!(from_json(&text).is_err());
    }
}
