#![no_std]
#![no_main]

extern crate alloc;

mod board;
mod memlog;
mod persistent_mem;
mod shared;
mod task;
mod watchdog;

use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::adc::{Adc, Config as AdcConfig};
use embassy_rp::gpio::Pull;
use embassy_rp::pio::Pio;
use embedded_alloc::LlffHeap as Heap;
use fanpico_core::config::Config as FanpicoConfig;
use panic_probe as _;

#[global_allocator]
static HEAP: Heap = Heap::empty();

const HEAP_SIZE: usize = 96 * 1024;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    {
        use core::mem::MaybeUninit;
        static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
        unsafe { HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE) }
    }

    let p = embassy_rp::init(Default::default());

    // Initialize the in-memory ring-buffer logger the command dispatcher
    // and display collaborator surfaces read from (§6).
    let memlog = memlog::init(2048);
    memlog.info("fanpico firmware initialized");

    // Retained RAM survives a watchdog-triggered soft reset; a power-on
    // reset always starts fresh.
    let watchdog = embassy_rp::watchdog::Watchdog::new(p.WATCHDOG);
    let watchdog_caused_reboot = task::supervisor::rebooted_by_watchdog(&watchdog);
    let (persistent_block, rebooted_by_watchdog) = persistent_mem::init(watchdog_caused_reboot);
    let unix_clock_s = persistent_block.saved_time;
    let persistent = persistent_mem::leak(persistent_block);

    // Board pin wiring.
    let (
        pins,
        slice2,
        slice3,
        slice4,
        slice5,
        slice6,
        slice7,
        slice0,
        slice1,
        adc_periph,
        adc_temp_sensor,
        _i2c_periph,
        pio0_periph,
    ) = board::BoardPins::init(p);

    let [fan_pwm0, fan_pwm1, fan_pwm2, fan_pwm3, fan_pwm4, fan_pwm5, fan_pwm6, fan_pwm7] = pins.fan_pwm_pins;
    let fan_pwm = task::pwm::FanPwmOutputs::new(
        125_000_000,
        slice2,
        fan_pwm0,
        fan_pwm1,
        slice3,
        fan_pwm2,
        fan_pwm3,
        slice4,
        fan_pwm4,
        fan_pwm5,
        slice5,
        fan_pwm6,
        fan_pwm7,
    );

    let [mbfan_pwm_read0, mbfan_pwm_read1, mbfan_pwm_read2, mbfan_pwm_read3] = pins.mbfan_pwm_read_pins;
    let mbfan_pwm_in = task::pwm::MbfanPwmInputs::new(
        slice6,
        mbfan_pwm_read0,
        slice7,
        mbfan_pwm_read1,
        slice0,
        mbfan_pwm_read2,
        slice1,
        mbfan_pwm_read3,
    );

    let tacho_reader = task::tacho::MultiplexedTachoReader::new(
        pins.fan_tacho_shared_pin,
        pins.fan_tacho_select_pins,
        8,
    );
    embassy_rp::bind_interrupts!(struct Pio0Irqs {
        PIO0_IRQ_0 => embassy_rp::pio::InterruptHandler<embassy_rp::peripherals::PIO0>;
    });
    let pio0 = Pio::new(pio0_periph, Pio0Irqs);
    let mbfan_tacho_out = task::tacho::MbfanTachoOutputs::new(pio0, pins.mbfan_tacho_pins);

    embassy_rp::bind_interrupts!(struct AdcIrqs {
        ADC_IRQ_FIFO => embassy_rp::adc::InterruptHandler;
    });
    let adc = Adc::new(adc_periph, AdcIrqs, AdcConfig::default());
    let [sensor_pin0, sensor_pin1] = pins.sensor_adc_pins;
    // Sensor 1/2 are external thermistors on their own ADC pins; sensor 3
    // is the RP2040's own on-chip temperature sensor (ADC channel 4, no
    // GPIO) per `FANPICO_0804D.sensor_adc_channel`.
    let sensor_channels = [
        embassy_rp::adc::Channel::new_pin(sensor_pin0, Pull::None),
        embassy_rp::adc::Channel::new_pin(sensor_pin1, Pull::None),
        embassy_rp::adc::Channel::new_temp_sensor(adc_temp_sensor),
    ];

    let control_resources = task::control::ControlResources {
        fan_pwm,
        mbfan_pwm_in,
        tacho_reader,
        mbfan_tacho_out,
        adc,
        sensor_channels,
    };

    // Loads whatever was last saved (flash config storage is an
    // out-of-scope collaborator; this ships with a safe default so the
    // firmware boots even with no `fanpico.cfg` present yet).
    let default_config = FanpicoConfig {
        name: heapless::String::new(),
        timezone: heapless::String::new(),
        i2c_speed_hz: 100_000,
        fans: heapless::Vec::new(),
        mbfans: heapless::Vec::new(),
        sensors: heapless::Vec::new(),
        vsensors: heapless::Vec::new(),
        opaque: Default::default(),
    };
    let shared_config = shared::leak_config(default_config.clone());
    let shared_state = shared::leak_control_state(fanpico_core::state::ControlState::new(0, 0, 0, 0));

    spawner
        .spawn(task::control::control(
            control_resources,
            shared_config,
            shared_state,
            persistent,
            default_config,
            unix_clock_s,
        ))
        .unwrap();
    spawner
        .spawn(task::supervisor::supervisor(watchdog, pins.led_pin, shared_state, memlog))
        .unwrap();

    memlog.info_if_watchdog_reboot(rebooted_by_watchdog);
}

trait LogRebootReason {
    fn info_if_watchdog_reboot(&self, rebooted: bool);
}

impl LogRebootReason for memlog::SharedLogger {
    fn info_if_watchdog_reboot(&self, rebooted: bool) {
        if rebooted {
            self.warn("reboot was caused by the watchdog");
        }
    }
}
