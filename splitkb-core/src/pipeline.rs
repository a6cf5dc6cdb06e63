//! One polling tick from switch samples to HID reports.

use crate::error::SampleError;
use crate::event::{Event, Micros};
use crate::keycode::Keycode;
use crate::keymap::Keymap;
use crate::output::{HidTransport, Output, Report};
use crate::queue::EventQueue;
use crate::resolver::{Resolver, ResolverState};
use crate::sampler::{Sampler, SwitchBus, Wiring};
use crate::timing::Timing;

/// All pipeline state, owned by the main loop.
pub struct Pipeline {
    sampler: Sampler,
    queue: EventQueue,
    resolver: Resolver,
    output: Output,
    keymap: &'static Keymap,
    sent: Report,
}

impl Pipeline {
    pub fn new(wiring: Wiring, keymap: &'static Keymap, timing: Timing) -> Self {
        Self {
            sampler: Sampler::new(wiring),
            queue: EventQueue::new(),
            resolver: Resolver::new(timing),
            output: Output::new(),
            keymap,
            sent: Report::empty(),
        }
    }

    /// Reset the bus and start from all switches released.
    pub fn init<B: SwitchBus>(&mut self, bus: &mut B) {
        self.sampler.init(bus);
    }

    /// Sample, queue one event per changed switch, resolve what is settled
    /// and send a report whenever the result changes.
    ///
    /// A failed sample queues nothing but still resolves older events: hold
    /// and overlap timers run on `now`, not on successful ticks.
    pub fn tick<B, T>(&mut self, now: Micros, bus: &mut B, transport: &mut T) -> Result<(), SampleError>
    where
        B: SwitchBus,
        T: HidTransport,
    {
        let sampled = self.sampler.step(bus);

        let (mut producer, mut consumer) = self.queue.split();
        if sampled.is_ok() {
            for (pos, pressed) in self.sampler.changes() {
                producer.push_back(Event { pos, pressed, at: now });
            }
        }

        let output = &mut self.output;
        let sent = &mut self.sent;
        self.resolver
            .drain(now, &mut consumer, self.keymap, |_, state| {
                output.project(state);
                if *output.report() != *sent {
                    output.send(transport);
                    *sent = *output.report();
                }
            });

        sampled
    }

    /// Drop every held key and layer bit and tell the host nothing is
    /// pressed.
    pub fn release_all<T: HidTransport>(&mut self, transport: &mut T) {
        self.resolver.reset();
        self.output.release_all();
        self.output.send(transport);
        self.sent = Report::empty();
    }

    /// Inject a single keystroke, then restore the held keys.
    pub fn tap<T, D>(&mut self, key: Keycode, transport: &mut T, delay_ms: D)
    where
        T: HidTransport,
        D: FnMut(u32),
    {
        let length = self.resolver.timing().key_press_length_ms;
        self.output.tap(key, length, transport, delay_ms);
        self.output.project(self.resolver.state());
        if self.output.is_any_key_pressed() {
            self.output.send(transport);
        }
        self.sent = *self.output.report();
    }

    pub fn state(&self) -> &ResolverState {
        self.resolver.state()
    }

    pub fn report(&self) -> &Report {
        self.output.report()
    }

    pub fn sampler(&self) -> &Sampler {
        &self.sampler
    }

    pub fn keymap(&self) -> &'static Keymap {
        self.keymap
    }
}
