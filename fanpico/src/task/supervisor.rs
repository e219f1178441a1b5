//! The supervisor task (core0 in the original firmware).
//!
//! Grounded in `original_source/src/fanpico.c`'s `main()`: owns the
//! watchdog and LED, and (stubbed, since command dispatch and display
//! rendering are out of scope per the expanded spec) the collaborator
//! surfaces that read the control state snapshot and the in-memory log.
//! The persistent-memory tick lives on the control task instead (§4.4
//! assigns it there, through its own short try-acquire mutex).

use embassy_rp::gpio::Output;
use embassy_rp::watchdog::Watchdog;
use embassy_time::{Duration, Ticker};

use crate::memlog::SharedLogger;
use crate::shared::{try_with_timeout, SharedControlState, STATE_MUTEX_TIMEOUT};
use crate::watchdog as wd;

const TICK: Duration = Duration::from_millis(1000);

#[embassy_executor::task]
pub async fn supervisor(
    mut watchdog: Watchdog,
    mut led: Option<Output<'static>>,
    shared_state: SharedControlState,
    logger: SharedLogger,
) {
    wd::enable(&mut watchdog);
    logger.info("supervisor task started");

    let mut ticker = Ticker::every(TICK);
    let mut led_on = false;
    loop {
        ticker.next().await;
        wd::feed(&mut watchdog);

        if let Some(led) = led.as_mut() {
            led_on = !led_on;
            led.set_level(if led_on { embassy_rp::gpio::Level::High } else { embassy_rp::gpio::Level::Low });
        }

        // Pull the latest control-state snapshot for whatever
        // collaborator surface needs it (display, command dispatcher);
        // neither is implemented here, both are out of scope.
        try_with_timeout(shared_state, STATE_MUTEX_TIMEOUT, |_state| {}).await;
    }
}

/// Reads `rebooted_by_watchdog` off the RP2040's reset-reason register.
/// `embassy_rp` exposes this via the watchdog peripheral's scratch
/// registers, the same place the original checks with
/// `watchdog_caused_reboot()`.
pub fn rebooted_by_watchdog(watchdog: &Watchdog) -> bool {
    watchdog.reset_reason().is_some()
}
