//! Signal filters applied after a map lookup, before a value is committed
//! to control state.
//!
//! Grounded in `original_source/src/filters.c`, `filter_lossypeak.c`, and
//! `filter_sma.c`. Each filter kind owns its own mutable state (a malloc'd
//! `void *` context in the original C, an owned enum variant here).

use crate::error::{CoreError, CoreResult};
use heapless::{String, Vec};
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const SMA_MAX_WINDOW: usize = 32;

/// A filter together with whatever running state it needs between calls.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    None,
    /// Tracks a decaying peak: jumps up immediately to match a rising
    /// input, then decays back down at a fixed rate after a hold delay.
    LossyPeak {
        decay_per_s: f32,
        delay_s: f32,
        state: LossyPeakState,
    },
    /// Simple moving average over the last `window` samples.
    Sma {
        window: usize,
        state: SmaState,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossyPeakState {
    peak: f32,
    /// Seconds since this filter was first applied; used as the clock for
    /// `delay_s`/decay instead of a wall-clock timestamp so the type stays
    /// pure and host-testable.
    elapsed_s: f32,
    peak_set_at_s: f32,
    initialized: bool,
}

impl Default for LossyPeakState {
    fn default() -> Self {
        LossyPeakState {
            peak: 0.0,
            elapsed_s: 0.0,
            peak_set_at_s: 0.0,
            initialized: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmaState {
    data: Vec<f32, SMA_MAX_WINDOW>,
    sum: f32,
    index: usize,
    used: usize,
}

impl SmaState {
    fn new(window: usize) -> Self {
        let mut data = Vec::new();
        for _ in 0..window {
            let _ = data.push(0.0);
        }
        SmaState { data, sum: 0.0, index: 0, used: 0 }
    }
}

impl Filter {
    pub fn none() -> Self {
        Filter::None
    }

    /// Parses `"decay,delay"` (both non-negative) as produced by
    /// `filter2str`/consumed by `str2filter` for `FILTER_LOSSYPEAK`.
    pub fn lossypeak(args: &str) -> CoreResult<Self> {
        let (decay_str, delay_str) = args.split_once(',').ok_or(CoreError::FilterArgsInvalid)?;
        let decay: f32 = decay_str.trim().parse().map_err(|_| CoreError::FilterArgsInvalid)?;
        let delay: f32 = delay_str.trim().parse().map_err(|_| CoreError::FilterArgsInvalid)?;
        if decay < 0.0 || delay < 0.0 {
            return Err(CoreError::FilterArgsInvalid);
        }
        Ok(Filter::LossyPeak {
            decay_per_s: decay,
            delay_s: delay,
            state: LossyPeakState::default(),
        })
    }

    /// Parses a single integer window size in `2..=32` for `FILTER_SMA`.
    pub fn sma(args: &str) -> CoreResult<Self> {
        let window: i32 = args.trim().parse().map_err(|_| CoreError::FilterArgsInvalid)?;
        if !(2..=SMA_MAX_WINDOW as i32).contains(&window) {
            return Err(CoreError::FilterWindowOutOfRange);
        }
        let window = window as usize;
        Ok(Filter::Sma { window, state: SmaState::new(window) })
    }

    pub fn args_to_string(&self) -> String<32> {
        let mut s = String::new();
        match self {
            Filter::None => {}
            Filter::LossyPeak { decay_per_s, delay_s, .. } => {
                let _ = core::fmt::write(&mut s, format_args!("{},{}", decay_per_s, delay_s));
            }
            Filter::Sma { window, .. } => {
                let _ = core::fmt::write(&mut s, format_args!("{}", window));
            }
        }
        s
    }

    /// Applies the filter to `input`, advancing `dt_s` seconds of
    /// simulated time since the previous call.
    pub fn apply(&mut self, input: f32, dt_s: f32) -> f32 {
        match self {
            Filter::None => input,
            Filter::LossyPeak { decay_per_s, delay_s, state } => {
                state.elapsed_s += dt_s;
                if !state.initialized || input >= state.peak {
                    state.peak = input;
                    state.peak_set_at_s = state.elapsed_s;
                    state.initialized = true;
                } else {
                    let held_for = state.elapsed_s - state.peak_set_at_s;
                    if held_for > *delay_s {
                        // Decay only the portion of this step that falls
                        // past the hold delay, at a flat rate per second,
                        // so decay proceeds linearly instead of compounding
                        // against an already-decayed `state.peak`.
                        let decay_time = dt_s.min(held_for - *delay_s).max(0.0);
                        state.peak = (state.peak - decay_per_s * decay_time).max(input);
                    }
                }
                state.peak
            }
            Filter::Sma { window, state } => {
                state.sum -= state.data[state.index];
                state.data[state.index] = input;
                state.sum += input;
                state.index = (state.index + 1) % *window;
                if state.used < *window {
                    state.used += 1;
                }
                state.sum / state.used as f32
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
struct FilterWire<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(default)]
    args: String<32>,
}

impl Serialize for Filter {
    /// Encodes as `{"type": "...", "args": "..."}`, matching
    /// `filter2json`'s `str2filter`/`filter_print_args` round trip — only
    /// the parsed configuration survives, not in-flight runtime state.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = match self {
            Filter::None => "none",
            Filter::LossyPeak { .. } => "lossypeak",
            Filter::Sma { .. } => "sma",
        };
        FilterWire { kind, args: self.args_to_string() }.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = FilterWire::deserialize(deserializer)?;
        match wire.kind {
            "none" => Ok(Filter::None),
            "lossypeak" => Filter::lossypeak(&wire.args).map_err(D::Error::custom),
            "sma" => Filter::sma(&wire.args).map_err(D::Error::custom),
            _ => Err(D::Error::custom("unrecognized filter type")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_identity() {
        let mut f = Filter::none();
        assert_eq!(f.apply(42.0, 1.0), 42.0);
    }

    #[test]
    fn sma_parses_window_bounds() {
        assert!(Filter::sma("1").is_err());
        assert!(Filter::sma("33").is_err());
        assert!(Filter::sma("4").is_ok());
    }

    #[test]
    fn sma_averages_over_window() {
        let mut f = Filter::sma("4").unwrap();
        for v in [10.0, 20.0, 30.0, 40.0] {
            f.apply(v, 1.0);
        }
        assert_eq!(f.apply(100.0, 1.0), (20.0 + 30.0 + 40.0 + 100.0) / 4.0);
    }

    #[test]
    fn lossypeak_parses_args() {
        assert!(Filter::lossypeak("1.0,2.0").is_ok());
        assert!(Filter::lossypeak("-1.0,2.0").is_err());
        assert!(Filter::lossypeak("bogus").is_err());
    }

    #[test]
    fn lossypeak_tracks_rising_input_immediately() {
        let mut f = Filter::lossypeak("5.0,1.0").unwrap();
        assert_eq!(f.apply(50.0, 1.0), 50.0);
        assert_eq!(f.apply(80.0, 1.0), 80.0);
    }

    #[test]
    fn lossypeak_decays_linearly_not_compounding() {
        let mut f = Filter::lossypeak("10.0,0.0").unwrap();
        assert_eq!(f.apply(100.0, 0.0), 100.0);
        assert_eq!(f.apply(0.0, 1.0), 90.0);
        assert_eq!(f.apply(0.0, 1.0), 80.0);
        assert_eq!(f.apply(0.0, 1.0), 70.0);
        assert_eq!(f.apply(0.0, 1.0), 60.0);
    }

    #[test]
    fn lossypeak_holds_then_decays() {
        let mut f = Filter::lossypeak("10.0,2.0").unwrap();
        f.apply(80.0, 0.0);
        // Still within the hold delay: peak should not have decayed yet.
        assert_eq!(f.apply(0.0, 1.0), 80.0);
        // Past the delay: peak decays but never below the live input.
        let decayed = f.apply(0.0, 5.0);
        assert!(decayed < 80.0);
    }
}
