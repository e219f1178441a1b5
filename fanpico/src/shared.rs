//! The two short-timeout mutexes the control and supervisor tasks use to
//! exchange configuration and state snapshots (§4.4/§5).
//!
//! Grounded in `original_source/src/fanpico.c`'s `config_mutex`/
//! `state_mutex` (`auto_init_mutex`, `mutex_enter_timeout_us`) and in the
//! teacher's `Box::leak`-for-`'static` pattern (`state.rs`'s
//! `SharedState`).

use alloc::boxed::Box;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Duration;
use fanpico_core::config::Config;
use fanpico_core::state::ControlState;

/// The supervisor owns and writes `Config`; the control task only ever
/// try-acquires it to copy a fresh snapshot into its own working memory.
pub type SharedConfig = &'static Mutex<CriticalSectionRawMutex, Config>;

/// The control task owns and writes `ControlState`; the supervisor only
/// ever try-acquires it to copy a snapshot out for logging/display/the
/// command dispatcher.
pub type SharedControlState = &'static Mutex<CriticalSectionRawMutex, ControlState>;

/// Matches the original's 1000us config-copy try-timeout.
pub const CONFIG_MUTEX_TIMEOUT: Duration = Duration::from_micros(1000);
/// Matches the original's 1000us/500us state-copy try-timeouts (the
/// larger of the two, used uniformly here since both directions are
/// equally non-blocking by design).
pub const STATE_MUTEX_TIMEOUT: Duration = Duration::from_micros(1000);
/// §4.4 requires the persistent-memory tick to go through "a dedicated
/// mutex with a short try-acquire timeout", the same non-blocking
/// contract as config/state exchange, so the control task's real-time
/// cadence never stalls on it.
pub const PERSISTENT_MUTEX_TIMEOUT: Duration = Duration::from_micros(1000);

pub fn leak_config(config: Config) -> SharedConfig {
    Box::leak(Box::new(Mutex::new(config)))
}

pub fn leak_control_state(state: ControlState) -> SharedControlState {
    Box::leak(Box::new(Mutex::new(state)))
}

/// Tries to lock `mutex` within `timeout`; on timeout, the caller simply
/// retries next cycle rather than blocking the real-time loop — mirrors
/// `mutex_enter_timeout_us`'s non-blocking contract.
pub async fn try_with_timeout<T>(
    mutex: &Mutex<CriticalSectionRawMutex, T>,
    timeout: Duration,
    f: impl FnOnce(&mut T),
) -> bool {
    match embassy_time::with_timeout(timeout, mutex.lock()).await {
        Ok(mut guard) => {
            f(&mut guard);
            true
        }
        Err(_) => false,
    }
}
