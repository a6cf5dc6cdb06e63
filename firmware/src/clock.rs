//! Microsecond clock on timer 0.
//!
//! Timer 0 runs in CTC mode at CPU/64 (4 µs per count) and overflows every
//! millisecond; the compare interrupt counts milliseconds and the counter
//! supplies the sub-millisecond part.

use core::cell::Cell;

use avr_device::at90usb1286::TC0;
use avr_device::interrupt::Mutex;
use splitkb_core::Micros;

/// Counts per millisecond at 16MHz / 64.
const TOP: u8 = 249;
/// Microseconds per timer count.
const US_PER_COUNT: u32 = 4;

const OCF0A: u8 = 1 << 1;

static MILLIS: Mutex<Cell<u32>> = Mutex::new(Cell::new(0));

pub fn init(tc0: &TC0) {
    // WGM01: clear timer on compare match
    tc0.tccr0a.write(|w| unsafe { w.bits(1 << 1) });
    tc0.ocr0a.write(|w| unsafe { w.bits(TOP) });
    tc0.tcnt0.write(|w| unsafe { w.bits(0) });
    // CS01 | CS00: prescaler 64
    tc0.tccr0b.write(|w| unsafe { w.bits(0b011) });
    // OCIE0A
    tc0.timsk0.write(|w| unsafe { w.bits(OCF0A) });
}

#[avr_device::interrupt(at90usb1286)]
fn TIMER0_COMPA() {
    avr_device::interrupt::free(|cs| {
        let millis = MILLIS.borrow(cs);
        millis.set(millis.get().wrapping_add(1));
    });
}

/// Time since [`init`], wrapping like [`Micros`] does.
pub fn micros(tc0: &TC0) -> Micros {
    avr_device::interrupt::free(|cs| {
        let mut millis = MILLIS.borrow(cs).get();
        let mut counts = tc0.tcnt0.read().bits();
        // Compare match pending but not serviced yet: the counter already
        // restarted.
        if tc0.tifr0.read().bits() & OCF0A != 0 {
            millis = millis.wrapping_add(1);
            counts = tc0.tcnt0.read().bits();
        }
        millis
            .wrapping_mul(1_000)
            .wrapping_add(counts as u32 * US_PER_COUNT)
    })
}
