#![allow(dead_code)] // not every test file uses every helper

use splitkb_core::queue::EventQueue;
use splitkb_core::sampler::MAX_CHIPS;
use splitkb_core::{
    BusFault, Coord, Event, HidTransport, Micros, Pipeline, Report, Resolver, SwitchBus, Timing,
    Transition, Wiring, DEFAULT_KEYMAP,
};

/// Polling period of the simulated main loop.
pub const TICK_US: Micros = 1_000;

/// Expander bus backed by a plain pin table.
pub struct MatrixBus {
    wiring: Wiring,
    pins: [u8; MAX_CHIPS],
    pub failing: bool,
    pub resets: usize,
}

impl MatrixBus {
    pub fn new(wiring: Wiring) -> Self {
        Self {
            wiring,
            pins: [0xFF; MAX_CHIPS],
            failing: false,
            resets: 0,
        }
    }

    pub fn set(&mut self, pos: Coord, pressed: bool) {
        let (chip, pin) = self.wiring.locate(pos).expect("position is wired");
        let address = self.wiring.chips[chip].address as usize;
        if pressed {
            self.pins[address] &= !(1 << pin);
        } else {
            self.pins[address] |= 1 << pin;
        }
    }
}

impl SwitchBus for MatrixBus {
    fn read_pins(&mut self, address: u8) -> Result<u8, BusFault> {
        if self.failing {
            return Err(BusFault::Timeout);
        }
        Ok(self.pins[address as usize])
    }

    fn reset(&mut self) {
        self.resets += 1;
    }
}

/// Keeps every report handed to the transport.
#[derive(Default)]
pub struct Recorder {
    pub reports: Vec<Report>,
}

impl HidTransport for Recorder {
    fn send(&mut self, report: &Report) {
        self.reports.push(*report);
    }
}

impl Recorder {
    /// Pressed keycodes of each report, in order.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        self.reports
            .iter()
            .map(|report| report.pressed_keys().collect())
            .collect()
    }
}

enum Action {
    Set(Coord, bool),
    Fault,
}

/// Full pipeline on the rev 1 board, driven one millisecond tick at a time.
pub struct Harness {
    pub pipeline: Pipeline,
    pub bus: MatrixBus,
    pub recorder: Recorder,
    pub now: Micros,
    script: Vec<(Micros, Action)>,
}

impl Harness {
    pub fn new() -> Self {
        let wiring = Wiring::REV1;
        let mut bus = MatrixBus::new(wiring);
        let mut pipeline = Pipeline::new(wiring, &DEFAULT_KEYMAP, Timing::default());
        pipeline.init(&mut bus);
        Self {
            pipeline,
            bus,
            recorder: Recorder::default(),
            now: 0,
            script: Vec::new(),
        }
    }

    pub fn press(mut self, at_ms: u32, pos: Coord) -> Self {
        self.script.push((at_ms * 1_000, Action::Set(pos, true)));
        self
    }

    pub fn release(mut self, at_ms: u32, pos: Coord) -> Self {
        self.script.push((at_ms * 1_000, Action::Set(pos, false)));
        self
    }

    /// Every read fails on ticks in `[from_ms, to_ms)`.
    pub fn fault(mut self, from_ms: u32, to_ms: u32) -> Self {
        for ms in from_ms..to_ms {
            self.script.push((ms * 1_000, Action::Fault));
        }
        self
    }

    /// Tick up to and including `until_ms`.
    pub fn run_until(&mut self, until_ms: u32) {
        let until = until_ms * 1_000;
        while self.now <= until {
            self.bus.failing = false;
            for (at, action) in &self.script {
                if *at != self.now {
                    continue;
                }
                match *action {
                    Action::Set(pos, pressed) => self.bus.set(pos, pressed),
                    Action::Fault => self.bus.failing = true,
                }
            }
            let _ = self
                .pipeline
                .tick(self.now, &mut self.bus, &mut self.recorder);
            self.now += TICK_US;
        }
    }
}

/// Feed `events` into a fresh resolver as their time comes, draining every
/// tick up to `until`.
pub fn resolve(events: &[Event], until: Micros) -> (Vec<Transition>, Resolver) {
    let mut queue = EventQueue::new();
    let (mut producer, mut consumer) = queue.split();
    let mut resolver = Resolver::new(Timing::default());
    let mut seen = Vec::new();
    let mut pending = events.iter().peekable();
    let mut now = 0;
    while now <= until {
        while let Some(event) = pending.next_if(|e| e.at <= now) {
            producer.push_back(*event);
        }
        resolver.drain(now, &mut consumer, &DEFAULT_KEYMAP, |t, _| seen.push(*t));
        now += TICK_US;
    }
    (seen, resolver)
}
