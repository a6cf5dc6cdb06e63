//! MCP23008 expanders on the TWI bus.
//!
//! Every expander pin is an input with its pull-up enabled, so a pressed
//! switch pulls its pin low. Chips answer at 0x20 plus their 3-bit
//! hardware address.

use avr_device::at90usb1286::TWI;
use splitkb_core::sampler::ChipWiring;
use splitkb_core::{BusFault, SwitchBus};

/// Base TWI address of the MCP23008 family.
const MCP23008_BASE: u8 = 0x20;

// MCP23008 registers
const IODIR: u8 = 0x00; // I/O direction, 1 = input
const GPPU: u8 = 0x06; // Pull-up enable
const GPIO: u8 = 0x09; // Port value

/// SCL freq = CPU_FREQ / (16 + 2 * TWBR * prescaler)
/// 400kHz = 16MHz / (16 + 2 * 12 * 1) => TWBR = 12
const TWBR_VALUE: u8 = 12;

/// Polls of TWINT before a transfer is declared stuck.
const TWINT_TIMEOUT: u16 = 0xFFFF;

/// Bus resets attempted back to back; a few in a row clears a slave that
/// was left holding SDA.
const RESET_ROUNDS: u8 = 10;

// TWI status codes
const TW_START: u8 = 0x08;
const TW_REP_START: u8 = 0x10;
const TW_MT_SLA_ACK: u8 = 0x18;
const TW_MT_DATA_ACK: u8 = 0x28;
const TW_ARB_LOST: u8 = 0x38;
const TW_MR_SLA_ACK: u8 = 0x40;
const TW_MR_DATA_NACK: u8 = 0x58;

/// The expander chips of one board revision.
pub struct Expanders<'a> {
    twi: &'a TWI,
    chips: &'static [ChipWiring],
}

impl<'a> Expanders<'a> {
    pub const fn new(twi: &'a TWI, chips: &'static [ChipWiring]) -> Self {
        Self { twi, chips }
    }

    fn enable(&self) {
        self.twi.twbr.write(|w| unsafe { w.bits(TWBR_VALUE) });
        self.twi.twsr.write(|w| w.twps().prescaler_1());
        self.twi.twcr.write(|w| w.twen().set_bit());
    }

    /// All pins pulled-up inputs.
    fn configure(&self, address: u8) -> Result<(), BusFault> {
        self.write_register(address, IODIR, 0xFF)?;
        self.write_register(address, GPPU, 0xFF)
    }

    fn write_register(&self, address: u8, reg: u8, value: u8) -> Result<(), BusFault> {
        let sla = (MCP23008_BASE | address) << 1;
        let result = self
            .start()
            .and_then(|()| self.write(sla, address))
            .and_then(|()| self.write(reg, address))
            .and_then(|()| self.write(value, address));
        self.stop();
        result
    }

    fn read_register(&self, address: u8, reg: u8) -> Result<u8, BusFault> {
        let sla = (MCP23008_BASE | address) << 1;
        let result = self
            .start()
            .and_then(|()| self.write(sla, address))
            .and_then(|()| self.write(reg, address))
            // Repeated start for read
            .and_then(|()| self.start())
            .and_then(|()| self.write(sla | 1, address))
            .and_then(|()| self.read_nack());
        self.stop();
        result
    }

    fn start(&self) -> Result<(), BusFault> {
        self.twi
            .twcr
            .write(|w| w.twint().set_bit().twsta().set_bit().twen().set_bit());
        self.wait_twint()?;
        match self.status() {
            TW_START | TW_REP_START => Ok(()),
            TW_ARB_LOST => Err(BusFault::ArbitrationLost),
            _ => Err(BusFault::Timeout),
        }
    }

    fn write(&self, data: u8, address: u8) -> Result<(), BusFault> {
        self.twi.twdr.write(|w| unsafe { w.bits(data) });
        self.twi.twcr.write(|w| w.twint().set_bit().twen().set_bit());
        self.wait_twint()?;
        match self.status() {
            TW_MT_SLA_ACK | TW_MT_DATA_ACK | TW_MR_SLA_ACK => Ok(()),
            TW_ARB_LOST => Err(BusFault::ArbitrationLost),
            _ => Err(BusFault::Nack { address }),
        }
    }

    /// Read one byte with NACK (last byte).
    fn read_nack(&self) -> Result<u8, BusFault> {
        self.twi.twcr.write(|w| w.twint().set_bit().twen().set_bit());
        self.wait_twint()?;
        if self.status() != TW_MR_DATA_NACK {
            return Err(BusFault::Timeout);
        }
        Ok(self.twi.twdr.read().bits())
    }

    fn stop(&self) {
        self.twi
            .twcr
            .write(|w| w.twint().set_bit().twsto().set_bit().twen().set_bit());
    }

    fn status(&self) -> u8 {
        self.twi.twsr.read().bits() & 0xF8
    }

    fn wait_twint(&self) -> Result<(), BusFault> {
        let mut timeout = TWINT_TIMEOUT;
        while self.twi.twcr.read().twint().bit_is_clear() {
            timeout -= 1;
            if timeout == 0 {
                return Err(BusFault::Timeout);
            }
        }
        Ok(())
    }
}

impl SwitchBus for Expanders<'_> {
    fn read_pins(&mut self, address: u8) -> Result<u8, BusFault> {
        self.read_register(address, GPIO)
    }

    fn reset(&mut self) {
        for _ in 0..RESET_ROUNDS {
            self.twi.twcr.write(|w| unsafe { w.bits(0) });
            self.enable();
        }
        // A chip that stays silent is caught by the next sample.
        for chip in self.chips {
            let _ = self.configure(chip.address);
        }
    }
}
