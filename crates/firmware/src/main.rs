//! SonoProbe Firmware - Main Entry Point
//!
//! Hardware-only entry point for the nRF52832 with SoftDevice S132.
//! See `firmware::boot::BOOT_SEQUENCE_STEPS` for the ordering rules.

#![no_std]
#![no_main]

use defmt_rtt as _;
use panic_probe as _;

use embassy_executor::Spawner;
use embassy_nrf::gpio::{Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::interrupt::{InterruptExt, Priority};
use embassy_nrf::pac::interrupt;
use embassy_nrf::spim::{self, Spim};
use embassy_nrf::{bind_interrupts, peripherals};
use embassy_sync::once_lock::OnceLock;
use embassy_time::Timer;
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;

use capture::{CaptureTrigger, FrameRing};
use firmware::hw::{self, HardwareApp, NusServer, PpiSequencer, SpiCompanion};
use firmware::{boot, EventHub, HeartbeatLed, LinkIndicator, ProbeApp};
use platform::config::{self, FRAME_BYTES, RING_CAPACITY, SEGMENT_LEN};

bind_interrupts!(struct Irqs {
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => spim::InterruptHandler<peripherals::TWISPI0>;
});

// Frame ring in .bss (data RAM, EasyDMA reachable).
static RING: FrameRing<RING_CAPACITY, FRAME_BYTES> = FrameRing::new();
static TRIGGER: CaptureTrigger = CaptureTrigger::new();

static SPI_TX: StaticCell<[u8; SEGMENT_LEN]> = StaticCell::new();
static APP: StaticCell<HardwareApp> = StaticCell::new();
static INDICATOR: StaticCell<LinkIndicator<Output<'static>>> = StaticCell::new();
static HUB: StaticCell<EventHub<'static>> = StaticCell::new();
static SERVER: StaticCell<NusServer> = StaticCell::new();

/// Hub as seen from the TIMER4 interrupt; set once boot step 6 is done.
static ISR_HUB: OnceLock<&'static EventHub<'static>> = OnceLock::new();

#[interrupt]
fn TIMER4() {
    if PpiSequencer::acknowledge_completion() {
        if let Some(hub) = ISR_HUB.try_get() {
            hub.sequence_complete();
        }
    }
}

#[embassy_executor::task]
async fn data_ready_task(mut pin: Input<'static>, hub: &'static EventHub<'static>) -> ! {
    loop {
        pin.wait_for_rising_edge().await;
        hub.data_ready();
    }
}

fn halt() -> ! {
    loop {
        cortex_m::asm::wfe();
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    defmt::info!("{=str} Firmware v{=str}", config::APP_NAME, config::APP_VERSION);

    // Step 1: HAL with interrupt priorities the SoftDevice tolerates.
    let p = embassy_nrf::init(boot::embassy_config());

    // Step 2: pins to idle levels.
    let led = Output::new(p.P0_17, Level::High, OutputDrive::Standard);
    let mut led = HeartbeatLed::new(led, config::pins::LED_ACTIVE_LOW).unwrap_or_else(|never| match never {});
    let link_pin = Output::new(p.P0_18, Level::Low, OutputDrive::Standard);
    // SPIM0 has no CSN; the companion sees one long transaction.
    let _cs = Output::new(p.P0_07, Level::Low, OutputDrive::Standard);
    let data_ready = Input::new(p.P0_13, Pull::None);

    // Step 3: SPIM0. Transfers are started by PPI, never by the driver.
    embassy_nrf::interrupt::SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0.set_priority(Priority::P3);
    let mut spi_config = spim::Config::default();
    spi_config.frequency = spim::Frequency::M8;
    spi_config.mode = spim::MODE_1;
    let _spim = Spim::new(p.TWISPI0, Irqs, p.P0_08, p.P0_09, p.P0_10, spi_config);

    // Step 4: capture chain.
    let companion = SpiCompanion::new(SPI_TX.init([0u8; SEGMENT_LEN]));
    let sequencer = PpiSequencer::new(
        p.TIMER3,
        p.TIMER4,
        p.PPI_CH0,
        p.PPI_CH1,
        p.PPI_CH2,
        companion.tx_address(),
    );
    let app: &'static HardwareApp = APP.init(ProbeApp::new(&RING, &TRIGGER, sequencer, companion));

    // Step 5: SoftDevice.
    let sd = Softdevice::enable(&hw::softdevice_config());
    let server: &'static NusServer = match NusServer::new(sd) {
        Ok(server) => SERVER.init(server),
        Err(error) => {
            defmt::error!("NUS registration failed: {}", defmt::Debug2Format(&error));
            halt();
        }
    };
    let sd: &'static Softdevice = sd;

    // Step 6: event hub.
    let indicator = INDICATOR.init(LinkIndicator::new(link_pin));
    let hub = HUB.init(EventHub::new());
    let registered = hub
        .register_data_ready(app)
        .and_then(|()| hub.register_sequence_complete(app))
        .and_then(|()| hub.register_link(app))
        .and_then(|()| hub.register_link(indicator));
    if let Err(error) = registered {
        defmt::error!("{}", error);
        halt();
    }
    let hub: &'static EventHub<'static> = hub;
    if ISR_HUB.init(hub).is_err() {
        defmt::error!("event hub published twice");
        halt();
    }

    // Step 7: tasks.
    let spawned = [
        spawner.spawn(hw::softdevice_task(sd)),
        spawner.spawn(data_ready_task(data_ready, hub)),
        spawner.spawn(hw::ble_task(sd, server, app, hub)),
    ];
    if spawned.iter().any(Result::is_err) {
        defmt::error!("task spawn failed");
        halt();
    }
    defmt::info!(
        "capture: {=usize} x {=usize} bytes per frame, {=usize} slots",
        config::TRANSFERS_PER_FRAME,
        SEGMENT_LEN,
        RING_CAPACITY
    );

    // Main loop - heartbeat. Keeps `_spim` and `_cs` alive.
    let mut tick = 0u32;
    loop {
        Timer::after_millis(boot::HEARTBEAT_PERIOD_MS).await;
        tick = tick.wrapping_add(1);
        let _ = led.toggle();
        let diagnostics = app.diagnostics();
        defmt::debug!(
            "heartbeat tick={=u32} state={} {}",
            tick,
            app.state(),
            diagnostics
        );
    }
}
