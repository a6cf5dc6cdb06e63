//! Split keyboard firmware for AT90USB1286 (Teensy++ 2.0).
//!
//! - Switches sampled through MCP23008 expanders on TWI
//! - Debounce, overlap removal, tap/hold and layers in `splitkb-core`
//! - USB HID keyboard and media reports

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]

mod clock;
mod mcp23008;
mod usb;

use avr_device::at90usb1286::Peripherals;
use splitkb_core::{BoardRevision, Pipeline, Timing, Wiring, DEFAULT_KEYMAP};

use mcp23008::Expanders;
use usb::UsbKeyboard;

/// Board this image is built for.
const BOARD: BoardRevision = BoardRevision::Rev2;

/// Polling period of the main loop.
const TICK_US: u32 = 1_000;

/// Panic handler: on AVR we just loop forever.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Disable clock prescaler: run at the full 16MHz
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    // On-board LED on PD6, lit while the firmware runs
    dp.PORTD.ddrd.modify(|r, w| unsafe { w.bits(r.bits() | 0x40) });

    clock::init(&dp.TC0);

    let wiring = Wiring::for_revision(BOARD);
    let mut bus = Expanders::new(&dp.TWI, wiring.chips);
    let mut pipeline = Pipeline::new(wiring, &DEFAULT_KEYMAP, Timing::default());
    pipeline.init(&mut bus);

    let mut usb = UsbKeyboard::new(&dp);
    usb.init();

    unsafe { avr_device::interrupt::enable() };

    dp.PORTD
        .portd
        .modify(|r, w| unsafe { w.bits(r.bits() | 0x40) });

    let mut last_tick = clock::micros(&dp.TC0);
    loop {
        if usb.poll() {
            // Whatever the host saw before is gone.
            pipeline.release_all(&mut usb);
        }

        let now = clock::micros(&dp.TC0);
        if now.wrapping_sub(last_tick) < TICK_US {
            continue;
        }
        last_tick = now;

        // A failed sample already reset the bus; the next tick retries.
        let _ = pipeline.tick(now, &mut bus, &mut usb);
    }
}
