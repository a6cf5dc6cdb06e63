//! USB HID for AT90USB1286: a keyboard report and a media report on one
//! interrupt endpoint, told apart by report ID.
//!
//! Register-level driver over avr-device; no USB stack.

use avr_device::at90usb1286::Peripherals;
use splitkb_core::{HidTransport, Report};

const REPORT_ID_KEYBOARD: u8 = 1;
const REPORT_ID_MEDIA: u8 = 3;

const EP0_SIZE: u8 = 64; // Control endpoint size
const EP1_SIZE: u8 = 16; // Interrupt IN endpoint, fits the 9-byte keyboard report

/// Keyboard collection (ID 1) with the usual modifier/reserved/LED/6-key
/// layout, then a consumer collection (ID 3) with one bit per media key in
/// `MediaKey` bit order.
const HID_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID_KEYBOARD, // Report ID
    // Modifier keys (8 bits)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224) - LCtrl
    0x29, 0xE7, //   Usage Maximum (231) - RGui
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    // Reserved byte
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x01, //   Input (Constant)
    // LEDs (5 bits)
    0x95, 0x05, //   Report Count (5)
    0x75, 0x01, //   Report Size (1)
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    // LED padding (3 bits)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x03, //   Report Size (3)
    0x91, 0x01, //   Output (Constant)
    // Keycodes (6 bytes)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x15, 0x00, //   Logical Minimum (0)
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0xFF, //   Usage Maximum (255)
    0x81, 0x00, //   Input (Data, Array)
    0xC0, // End Collection
    0x05, 0x0C, // Usage Page (Consumer)
    0x09, 0x01, // Usage (Consumer Control)
    0xA1, 0x01, // Collection (Application)
    0x85, REPORT_ID_MEDIA, // Report ID
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x07, //   Report Count (7)
    0x09, 0xB5, //   Usage (Next Track)
    0x09, 0xB6, //   Usage (Previous Track)
    0x09, 0xB7, //   Usage (Stop)
    0x09, 0xCD, //   Usage (Play/Pause)
    0x09, 0xE2, //   Usage (Mute)
    0x09, 0xE9, //   Usage (Volume Up)
    0x09, 0xEA, //   Usage (Volume Down)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x01, //   Input (Constant)
    0xC0, // End Collection
];

static DEVICE_DESCRIPTOR: [u8; 18] = [
    18,   // bLength
    1,    // bDescriptorType (Device)
    0x00, 0x02, // bcdUSB (2.0)
    0,    // bDeviceClass (defined at interface level)
    0,    // bDeviceSubClass
    0,    // bDeviceProtocol
    EP0_SIZE, // bMaxPacketSize0
    0x35, 0x12, // idVendor (0x1235)
    0x50, 0x00, // idProduct (0x0050)
    0x01, 0x00, // bcdDevice (0.01)
    1,    // iManufacturer
    2,    // iProduct
    0,    // iSerialNumber
    1,    // bNumConfigurations
];

static CONFIG_DESCRIPTOR: [u8; 34] = [
    // Configuration descriptor
    9,    // bLength
    2,    // bDescriptorType (Configuration)
    34, 0, // wTotalLength
    1,    // bNumInterfaces
    1,    // bConfigurationValue
    0,    // iConfiguration
    0x80, // bmAttributes (bus powered)
    50,   // bMaxPower (100mA)
    // Interface descriptor
    9,    // bLength
    4,    // bDescriptorType (Interface)
    0,    // bInterfaceNumber
    0,    // bAlternateSetting
    1,    // bNumEndpoints
    3,    // bInterfaceClass (HID)
    0,    // bInterfaceSubClass (none: report IDs rule out the boot protocol)
    1,    // bInterfaceProtocol (Keyboard)
    0,    // iInterface
    // HID descriptor
    9,    // bLength
    0x21, // bDescriptorType (HID)
    0x11, 0x01, // bcdHID (1.11)
    0,    // bCountryCode
    1,    // bNumDescriptors
    0x22, // bDescriptorType (Report)
    HID_REPORT_DESCRIPTOR.len() as u8, 0, // wDescriptorLength
    // Endpoint descriptor (EP1 IN, interrupt)
    7,    // bLength
    5,    // bDescriptorType (Endpoint)
    0x81, // bEndpointAddress (EP1 IN)
    0x03, // bmAttributes (Interrupt)
    EP1_SIZE, 0, // wMaxPacketSize
    1,    // bInterval (1ms polling)
];

/// String descriptor 0 (language ID)
static STRING_DESC_0: [u8; 4] = [4, 3, 0x09, 0x04]; // English (US)

/// String descriptor 1 (manufacturer): "splitkb"
static STRING_DESC_1: [u8; 16] = [
    16, 3, // bLength, bDescriptorType
    b's', 0, b'p', 0, b'l', 0, b'i', 0, b't', 0, b'k', 0, b'b', 0,
];

/// String descriptor 2 (product): "Keyboard"
static STRING_DESC_2: [u8; 18] = [
    18, 3, // bLength, bDescriptorType
    b'K', 0, b'e', 0, b'y', 0, b'b', 0, b'o', 0, b'a', 0, b'r', 0, b'd', 0,
];

/// USB device state.
pub struct UsbKeyboard<'a> {
    dp: &'a Peripherals,
    configured: bool,
    /// Set by SET_CONFIGURATION, taken by the next [`poll`](Self::poll).
    just_configured: bool,
    last_report: Report,
}

impl<'a> UsbKeyboard<'a> {
    pub const fn new(dp: &'a Peripherals) -> Self {
        Self {
            dp,
            configured: false,
            just_configured: false,
            last_report: Report::empty(),
        }
    }

    /// Initialize the AT90USB1286 USB controller in device mode.
    pub fn init(&mut self) {
        let usb = &self.dp.USB_DEVICE;

        // UIMOD (device mode) | UVREGE (pad regulator)
        usb.uhwcon.write(|w| unsafe { w.bits(0x81) });
        // USBE | FRZCLK while the PLL starts
        usb.usbcon.write(|w| unsafe { w.bits(0xA0) });

        // 16MHz crystal: PLLP = 0b101, PLLE
        self.dp.PLL.pllcsr.write(|w| unsafe { w.bits(0x16) });
        while self.dp.PLL.pllcsr.read().plock().bit_is_clear() {}

        // USBE | OTGPADE, clock unfrozen
        usb.usbcon.write(|w| unsafe { w.bits(0x90) });

        // Attach to bus (clear DETACH)
        usb.udcon.modify(|_, w| w.detach().clear_bit());

        // Enable End-Of-Reset interrupt
        usb.udien.write(|w| w.eorste().set_bit());

        self.configured = false;
    }

    /// Handle bus reset and control requests. Call this from the main
    /// loop. Returns true once after the host (re)configured the device.
    pub fn poll(&mut self) -> bool {
        let usb = &self.dp.USB_DEVICE;

        if usb.udint.read().eorsti().bit_is_set() {
            usb.udint.modify(|_, w| w.eorsti().clear_bit());
            self.configure_ep0();
            self.configured = false;
        }

        self.select_endpoint(0);
        if usb.ueintx.read().rxstpi().bit_is_set() {
            self.handle_setup();
        }

        core::mem::take(&mut self.just_configured)
    }

    /// Write one report to EP1. Gives up when the host does not drain the
    /// endpoint.
    fn write_in(&self, id: u8, payload: &[u8]) {
        let usb = &self.dp.USB_DEVICE;
        self.select_endpoint(1);

        // Wait for endpoint ready (RWAL set means we can write)
        let mut timeout: u16 = 0xFFFF;
        while usb.ueintx.read().rwal().bit_is_clear() {
            timeout -= 1;
            if timeout == 0 {
                return;
            }
        }

        usb.uedatx.write(|w| w.bits(id));
        for &byte in payload {
            usb.uedatx.write(|w| w.bits(byte));
        }

        // Clear FIFOCON and TXINI to send
        usb.ueintx
            .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());
    }

    fn configure_ep0(&self) {
        let usb = &self.dp.USB_DEVICE;

        self.select_endpoint(0);
        // Enable EP0 as control endpoint, 64 bytes
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x.write(|w| w.eptype().bits(0b00));
        usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());
    }

    fn configure_ep1(&self) {
        let usb = &self.dp.USB_DEVICE;

        self.select_endpoint(1);
        usb.ueconx.write(|w| w.epen().set_bit());
        // Interrupt IN endpoint, 16 bytes
        usb.uecfg0x
            .write(|w| w.eptype().bits(0b11).epdir().set_bit());
        usb.uecfg1x.write(|w| w.epsize().bits(0b001).alloc().set_bit());
    }

    fn select_endpoint(&self, ep: u8) {
        self.dp.USB_DEVICE.uenum.write(|w| w.bits(ep & 0x07));
    }

    fn handle_setup(&mut self) {
        let usb = &self.dp.USB_DEVICE;

        // Read 8-byte SETUP packet
        let bm_request_type = usb.uedatx.read().bits();
        let b_request = usb.uedatx.read().bits();
        let w_value_l = usb.uedatx.read().bits();
        let w_value_h = usb.uedatx.read().bits();
        let _w_index_l = usb.uedatx.read().bits();
        let _w_index_h = usb.uedatx.read().bits();
        let w_length_l = usb.uedatx.read().bits();
        let w_length_h = usb.uedatx.read().bits();

        // Acknowledge SETUP
        usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());

        let w_length = (w_length_h as u16) << 8 | w_length_l as u16;

        match (bm_request_type, b_request) {
            // GET_DESCRIPTOR
            (0x80, 0x06) => match (w_value_h, w_value_l) {
                (1, _) => self.send_descriptor(&DEVICE_DESCRIPTOR, w_length),
                (2, _) => self.send_descriptor(&CONFIG_DESCRIPTOR, w_length),
                (3, 0) => self.send_descriptor(&STRING_DESC_0, w_length),
                (3, 1) => self.send_descriptor(&STRING_DESC_1, w_length),
                (3, 2) => self.send_descriptor(&STRING_DESC_2, w_length),
                _ => self.stall(),
            },

            // SET_ADDRESS
            (0x00, 0x05) => {
                // Send ZLP first, then set address
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.udaddr
                    .write(|w| w.uadd().bits(w_value_l & 0x7F).adden().set_bit());
            }

            // SET_CONFIGURATION
            (0x00, 0x09) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                self.configure_ep1();
                self.configured = true;
                self.just_configured = true;
                self.last_report = Report::empty();
            }

            // GET_CONFIGURATION
            (0x80, 0x08) => {
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.uedatx.write(|w| w.bits(self.configured as u8));
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            // HID GET_DESCRIPTOR (interface-level)
            (0x81, 0x06) if w_value_h == 0x22 => {
                self.send_descriptor(HID_REPORT_DESCRIPTOR, w_length)
            }

            // HID SET_IDLE, SET_PROTOCOL: acknowledge with a ZLP
            (0x21, 0x0A) | (0x21, 0x0B) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            _ => self.stall(),
        }
    }

    fn send_descriptor(&self, desc: &[u8], max_length: u16) {
        let usb = &self.dp.USB_DEVICE;
        let len = core::cmp::min(desc.len(), max_length as usize);
        let mut sent = 0;

        while sent < len {
            while usb.ueintx.read().txini().bit_is_clear() {}

            let chunk_end = core::cmp::min(sent + EP0_SIZE as usize, len);
            for &byte in &desc[sent..chunk_end] {
                usb.uedatx.write(|w| w.bits(byte));
            }

            usb.ueintx.modify(|_, w| w.txini().clear_bit());
            sent = chunk_end;
        }

        // Wait for status stage (host sends ZLP)
        while usb.ueintx.read().rxouti().bit_is_clear() {}
        usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
    }

    fn stall(&self) {
        self.dp.USB_DEVICE.ueconx.modify(|_, w| w.stallrq().set_bit());
    }
}

impl HidTransport for UsbKeyboard<'_> {
    /// Send whichever of the two reports changed since the last send.
    fn send(&mut self, report: &Report) {
        if !self.configured {
            return;
        }
        if report.keyboard_bytes() != self.last_report.keyboard_bytes() {
            self.write_in(REPORT_ID_KEYBOARD, &report.keyboard_bytes());
        }
        if report.media != self.last_report.media {
            self.write_in(REPORT_ID_MEDIA, &[report.media]);
        }
        self.last_report = *report;
    }
}
