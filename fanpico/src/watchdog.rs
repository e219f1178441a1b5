//! Hardware watchdog wiring.
//!
//! Grounded in `original_source/src/fanpico.c`'s `main()`, which enables
//! an 8000ms watchdog and feeds it once a second from core0 only — the
//! control task on core1 never touches it, matching §5's "only the
//! supervisor feeds the watchdog" invariant.
use embassy_rp::watchdog::Watchdog;
use embassy_time::Duration;

pub const WATCHDOG_REBOOT_DELAY: Duration = Duration::from_millis(8000);

pub fn enable(watchdog: &mut Watchdog) {
    watchdog.start(WATCHDOG_REBOOT_DELAY);
}

pub fn feed(watchdog: &mut Watchdog) {
    watchdog.feed();
}
