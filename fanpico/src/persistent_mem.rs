//! RAM-retained persistent-memory block.
//!
//! Grounded in `original_source/src/fanpico.c`'s `__uninitialized_ram
//! persistent_mem` and `init_persistent_memory()`. The RP2040 keeps SRAM
//! powered across a soft reset (but not a power-on reset), so placing the
//! block in a linker section excluded from `.data`/`.bss` initialization
//! lets a watchdog-triggered reboot recover uptime/timezone state, the
//! same trick the original firmware uses.
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use fanpico_core::persistent::PersistentMemory;

#[unsafe(link_section = ".uninit")]
static mut RAW_BLOCK: Option<PersistentMemory> = None;

/// Reads whatever was in the retained RAM region at boot, validates it,
/// and either resumes it (bumping `warmstart_count`) or starts fresh.
/// Returns `(block, rebooted_by_watchdog)`.
pub fn init(watchdog_caused_reboot: bool) -> (PersistentMemory, bool) {
    // SAFETY: runs once at boot before any task can race this read.
    let existing = unsafe { core::ptr::addr_of!(RAW_BLOCK).read() };
    match existing {
        Some(block) if block.validate().is_ok() => {
            let mut block = block;
            block.warm_start();
            (block, watchdog_caused_reboot)
        }
        _ => (PersistentMemory::fresh(), false),
    }
}

/// Shared handle the supervisor task updates once a second and the
/// firmware's config/display collaborators may read.
pub type SharedPersistentMemory = &'static Mutex<CriticalSectionRawMutex, PersistentMemory>;

pub fn leak(block: PersistentMemory) -> SharedPersistentMemory {
    alloc::boxed::Box::leak(alloc::boxed::Box::new(Mutex::new(block)))
}
