//! Event resolver: turns queued switch transitions into logical key presses.
//!
//! Each drain walks the queue oldest-first and stops at the first event whose
//! fate is not known yet:
//! - a pair of events at one position closer than the debounce time is
//!   bounce, both are discarded;
//! - an event is only considered once it is older than the debounce time;
//! - a press waits for its overlap verdict. Presses grouped with it that are
//!   all released before any reached the overlap time are dropped together;
//! - an accepted press resolves against the layer bank active before it, or
//!   goes hold-pending on resolve-on-release positions;
//! - an accepted release undoes its press, or turns a short hold-pending
//!   press into a tap.
//!
//! Timing decisions compare timestamps against `now`, so nothing needs to
//! be cancelled when a tick is skipped.

use heapless::Vec;
use log::{debug, trace, warn};

use crate::event::{elapsed, Coord, Event, Micros};
use crate::keymap::{Keymap, LayerMask, Resolved};
use crate::queue::{Consumer, QueueIndex};
use crate::timing::Timing;
use crate::{NUM_COLUMNS, NUM_LINES};

/// Positions that can be logically held at once.
pub const MAX_HELD: usize = NUM_LINES * NUM_COLUMNS;

/// Logical state of one position.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PositionState {
    #[default]
    Idle,
    /// Resolve-on-release position pressed; `bank` is the mask in effect
    /// when it went down.
    HoldPending {
        since: Micros,
        bank: LayerMask,
        layer: LayerMask,
    },
    /// Pressed and asserting `resolved`.
    Resolved {
        since: Micros,
        resolved: Resolved,
        layer: LayerMask,
    },
}

impl PositionState {
    pub fn is_held(&self) -> bool {
        !matches!(self, PositionState::Idle)
    }

    /// Layer bit this position contributes while held.
    fn layer(&self) -> LayerMask {
        match *self {
            PositionState::Idle => LayerMask::EMPTY,
            PositionState::HoldPending { layer, .. } | PositionState::Resolved { layer, .. } => {
                layer
            }
        }
    }
}

/// One accepted logical transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub pos: Coord,
    pub resolved: Resolved,
    pub pressed: bool,
    pub at: Micros,
}

/// Everything the resolver knows about held keys.
#[derive(Clone, Debug, Default)]
pub struct ResolverState {
    positions: [[PositionState; NUM_COLUMNS]; NUM_LINES],
    /// Resolved positions, in the order they were pressed.
    order: Vec<Coord, MAX_HELD>,
    /// Bits of released reset-immune selectors, kept until nothing is held.
    retained: LayerMask,
}

impl ResolverState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self, pos: Coord) -> PositionState {
        self.positions[pos.line_index()][pos.column_index()]
    }

    fn set(&mut self, pos: Coord, state: PositionState) {
        self.positions[pos.line_index()][pos.column_index()] = state;
    }

    pub fn is_held(&self, pos: Coord) -> bool {
        self.position(pos).is_held()
    }

    /// When the position was pressed, if it is held.
    pub fn press_start(&self, pos: Coord) -> Option<Micros> {
        match self.position(pos) {
            PositionState::Idle => None,
            PositionState::HoldPending { since, .. } | PositionState::Resolved { since, .. } => {
                Some(since)
            }
        }
    }

    /// Layer bits of every held selector, plus retained ones.
    pub fn active_mask(&self) -> LayerMask {
        let mut mask = self.retained;
        for line in &self.positions {
            for state in line {
                mask |= state.layer();
            }
        }
        mask
    }

    /// Keys asserted by resolved positions, oldest press first.
    pub fn pressed(&self) -> impl Iterator<Item = (Coord, Resolved)> + '_ {
        self.order.iter().filter_map(|&pos| match self.position(pos) {
            PositionState::Resolved { resolved, .. } => Some((pos, resolved)),
            _ => None,
        })
    }

    /// Positions waiting for their tap/hold decision.
    pub fn pending_holds(&self) -> impl Iterator<Item = Coord> + '_ {
        Coord::all().filter(|&pos| matches!(self.position(pos), PositionState::HoldPending { .. }))
    }

    pub fn is_idle(&self) -> bool {
        Coord::all().all(|pos| !self.is_held(pos))
    }

    fn resolve(&mut self, pos: Coord, since: Micros, resolved: Resolved, layer: LayerMask) {
        self.set(
            pos,
            PositionState::Resolved {
                since,
                resolved,
                layer,
            },
        );
        if !self.order.contains(&pos) {
            // Every position fits, so this cannot fail.
            let _ = self.order.push(pos);
        }
    }

    fn release(&mut self, pos: Coord) {
        self.set(pos, PositionState::Idle);
        self.order.retain(|&held| held != pos);
    }
}

/// Outcome of the overlap check for the press at the queue head.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Verdict {
    Keep,
    Drop,
    Wait,
}

/// A press group already judged to be kept: later presses up to `window`
/// after `start` belong to it and skip the check.
#[derive(Copy, Clone, Debug)]
struct KeptGroup {
    start: Micros,
    window: u32,
}

pub struct Resolver {
    state: ResolverState,
    timing: Timing,
    kept: Option<KeptGroup>,
}

impl Resolver {
    pub fn new(timing: Timing) -> Self {
        Self {
            state: ResolverState::new(),
            timing,
            kept: None,
        }
    }

    pub fn state(&self) -> &ResolverState {
        &self.state
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Forget every held key and retained layer bit.
    pub fn reset(&mut self) {
        self.state = ResolverState::new();
        self.kept = None;
    }

    /// Resolve every queued event whose outcome is settled at `now`.
    ///
    /// `sink` sees each accepted transition together with the state right
    /// after it.
    pub fn drain<F>(&mut self, now: Micros, queue: &mut Consumer<'_>, keymap: &Keymap, mut sink: F)
    where
        F: FnMut(&Transition, &ResolverState),
    {
        self.remove_bounces(queue);

        while let Some((index, event)) = queue.peek() {
            if elapsed(event.at, now) < self.timing.debounce_us {
                break;
            }
            if event.pressed {
                match self.overlap_verdict(queue, index, event, now) {
                    Verdict::Wait => break,
                    Verdict::Drop => {
                        self.drop_group(queue, index, event);
                        continue;
                    }
                    Verdict::Keep => {}
                }
            }
            queue.remove(index);
            if event.pressed {
                self.accept_press(event, keymap, &mut sink);
            } else {
                self.accept_release(event, keymap, &mut sink);
            }
        }
    }

    /// Discard every pair of events at one position closer than the
    /// debounce time.
    fn remove_bounces(&self, queue: &mut Consumer<'_>) {
        let end = queue.end();
        let mut index = queue.begin();
        while index != end {
            let event = queue.get(index);
            if let Some(later) = queue.find_next_at(event.pos, index, end) {
                let partner = queue.get(later);
                if elapsed(event.at, partner.at) < self.timing.debounce_us {
                    debug!(
                        "bounce at {:?}: {}us apart",
                        event.pos,
                        elapsed(event.at, partner.at)
                    );
                    queue.remove(later);
                    queue.remove(index);
                }
            }
            index = queue.next(index, end);
        }
    }

    fn overlap_verdict(
        &mut self,
        queue: &Consumer<'_>,
        index: QueueIndex,
        first: Event,
        now: Micros,
    ) -> Verdict {
        let window = self.timing.overlap_removal_us;

        if let Some(group) = self.kept {
            if elapsed(group.start, first.at) < group.window {
                return Verdict::Keep;
            }
            self.kept = None;
        }

        let end = queue.end();
        let held = match queue.find_next_at(first.pos, index, end) {
            None if elapsed(first.at, now) >= window => window,
            None => return Verdict::Wait,
            Some(release) => {
                let release = queue.get(release);
                if elapsed(release.at, now) < self.timing.debounce_us {
                    // The release may still turn out to be bounce.
                    return Verdict::Wait;
                }
                elapsed(first.at, release.at)
            }
        };
        if held >= window {
            self.keep(first.at, window);
            return Verdict::Keep;
        }

        // Released early: the group is every press made while it was down.
        let mut members = false;
        let mut pending = false;
        let mut member = queue.next(index, end);
        while member != end {
            let event = queue.get(member);
            if elapsed(first.at, event.at) >= held {
                break;
            }
            if event.pressed {
                members = true;
                match queue.find_next_at(event.pos, member, end) {
                    None if elapsed(event.at, now) >= window => {
                        self.keep(first.at, held);
                        return Verdict::Keep;
                    }
                    None => pending = true,
                    Some(release) => {
                        let release = queue.get(release);
                        if elapsed(event.at, release.at) >= window {
                            self.keep(first.at, held);
                            return Verdict::Keep;
                        }
                        if elapsed(release.at, now) < self.timing.debounce_us {
                            pending = true;
                        }
                    }
                }
            }
            member = queue.next(member, end);
        }

        if !members {
            Verdict::Keep
        } else if pending {
            Verdict::Wait
        } else {
            Verdict::Drop
        }
    }

    fn keep(&mut self, start: Micros, window: u32) {
        self.kept = Some(KeptGroup { start, window });
    }

    /// Remove the head press, every press of its group and their releases.
    fn drop_group(&mut self, queue: &mut Consumer<'_>, index: QueueIndex, first: Event) {
        let end = queue.end();
        let held = match queue.find_next_at(first.pos, index, end) {
            Some(release) => elapsed(first.at, queue.get(release).at),
            None => return,
        };

        let mut dropped = 0usize;
        let mut member = queue.next(index, end);
        while member != end {
            let event = queue.get(member);
            if elapsed(first.at, event.at) >= held {
                break;
            }
            if event.pressed {
                if let Some(release) = queue.find_next_at(event.pos, member, end) {
                    queue.remove(release);
                }
                queue.remove(member);
                dropped += 1;
            }
            member = queue.next(member, end);
        }
        if let Some(release) = queue.find_next_at(first.pos, index, end) {
            queue.remove(release);
        }
        queue.remove(index);
        debug!(
            "overlap at {:?}: dropped {} keys released within {}us",
            first.pos,
            dropped + 1,
            held
        );
    }

    fn accept_press<F>(&mut self, event: Event, keymap: &Keymap, sink: &mut F)
    where
        F: FnMut(&Transition, &ResolverState),
    {
        let pos = event.pos;
        if self.state.is_held(pos) {
            warn!("press at {pos:?} while already held, ignored");
            return;
        }

        let flags = keymap.flags(pos);
        let bank = self.state.active_mask();
        let layer = flags.selector.mask();

        if flags.resolves_on_release {
            trace!("{pos:?} hold pending");
            self.state.set(
                pos,
                PositionState::HoldPending {
                    since: event.at,
                    bank,
                    layer,
                },
            );
            return;
        }

        let resolved = keymap.resolve(bank, pos);
        self.state.resolve(pos, event.at, resolved, layer);
        self.emit(pos, resolved, true, event.at, sink);
    }

    fn accept_release<F>(&mut self, event: Event, keymap: &Keymap, sink: &mut F)
    where
        F: FnMut(&Transition, &ResolverState),
    {
        let pos = event.pos;
        match self.state.position(pos) {
            PositionState::Idle => {
                trace!("release at {pos:?} with nothing held, ignored");
                return;
            }
            PositionState::Resolved {
                resolved, layer, ..
            } => {
                self.state.release(pos);
                let flags = keymap.flags(pos);
                if flags.reset_immune && !flags.resolves_on_release {
                    self.state.retained |= layer;
                }
                self.emit(pos, resolved, false, event.at, sink);
            }
            PositionState::HoldPending { since, bank, .. } => {
                let held = elapsed(since, event.at);
                self.state.release(pos);
                if self.timing.is_hold(held) {
                    debug!("{pos:?} held {held}us, no tap");
                } else {
                    debug!("{pos:?} tapped after {held}us");
                    let resolved = keymap.binding(bank.bank(), pos).resolve_primary();
                    self.state.resolve(pos, since, resolved, LayerMask::EMPTY);
                    self.emit(pos, resolved, true, event.at, sink);
                    self.state.release(pos);
                    self.emit(pos, resolved, false, event.at, sink);
                }
            }
        }

        if self.state.is_idle() {
            self.state.retained = LayerMask::EMPTY;
        }
    }

    fn emit<F>(&self, pos: Coord, resolved: Resolved, pressed: bool, at: Micros, sink: &mut F)
    where
        F: FnMut(&Transition, &ResolverState),
    {
        let transition = Transition {
            pos,
            resolved,
            pressed,
            at,
        };
        trace!("{transition:?}");
        sink(&transition, &self.state);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec::Vec as StdVec;

    use super::*;
    use crate::keycode::{azerty, Keycode};
    use crate::layers::DEFAULT_KEYMAP;
    use crate::queue::EventQueue;
    use crate::timing::{DEBOUNCE_TIME, MAX_HOLD_TIME, OVERLAP_REMOVAL_TIME};

    const A: Coord = Coord::new(1, 1);
    const B: Coord = Coord::new(3, 5);
    const SHIFT: Coord = Coord::new(4, 4);
    const FUNCTION: Coord = Coord::new(4, 6);

    /// Feed `events`, then drain once per millisecond up to `until`.
    fn run(events: &[Event], until: Micros) -> (StdVec<Transition>, Resolver) {
        let mut queue = EventQueue::new();
        let (mut producer, mut consumer) = queue.split();
        let mut resolver = Resolver::new(Timing::default());
        let mut seen = StdVec::new();
        let mut pending = events.iter().peekable();
        let mut now = 0;
        while now <= until {
            while let Some(event) = pending.next_if(|e| e.at <= now) {
                producer.push_back(*event);
            }
            resolver.drain(now, &mut consumer, &DEFAULT_KEYMAP, |t, _| seen.push(*t));
            now += 1_000;
        }
        (seen, resolver)
    }

    fn keys(transitions: &[Transition]) -> StdVec<(Option<Keycode>, bool)> {
        transitions.iter().map(|t| (t.resolved.key, t.pressed)).collect()
    }

    #[test]
    fn tap_emits_one_pair() {
        let (seen, resolver) = run(&[Event::press(A, 0), Event::release(A, 50_000)], 200_000);
        assert_eq!(keys(&seen), [(Some(azerty::A), true), (Some(azerty::A), false)]);
        assert!(resolver.state().is_idle());
    }

    #[test]
    fn bounce_pair_is_invisible() {
        let (seen, _) = run(
            &[Event::press(A, 0), Event::release(A, DEBOUNCE_TIME - 1)],
            200_000,
        );
        assert!(seen.is_empty());
    }

    #[test]
    fn press_waits_for_debounce() {
        let mut queue = EventQueue::new();
        let (mut producer, mut consumer) = queue.split();
        let mut resolver = Resolver::new(Timing::default());
        producer.push_back(Event::press(A, 0));
        producer.push_back(Event::release(A, 30_000));

        let mut count = 0;
        resolver.drain(35_000, &mut consumer, &DEFAULT_KEYMAP, |_, _| count += 1);
        assert_eq!(count, 0, "release not settled yet");
        resolver.drain(40_000, &mut consumer, &DEFAULT_KEYMAP, |_, _| count += 1);
        assert_eq!(count, 2);
    }

    #[test]
    fn quick_overlap_is_dropped() {
        let (seen, _) = run(
            &[
                Event::press(A, 0),
                Event::press(B, 20_000),
                Event::release(A, 60_000),
                Event::release(B, 70_000),
            ],
            300_000,
        );
        assert!(seen.is_empty());
    }

    #[test]
    fn overlap_with_one_long_member_is_kept() {
        let (seen, _) = run(
            &[
                Event::press(A, 0),
                Event::press(B, 20_000),
                Event::release(A, 60_000),
                Event::release(B, 20_000 + OVERLAP_REMOVAL_TIME),
            ],
            400_000,
        );
        assert_eq!(seen.iter().filter(|t| t.pressed).count(), 2);
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn press_after_release_is_not_a_member() {
        let (seen, _) = run(
            &[
                Event::press(A, 0),
                Event::release(A, 40_000),
                Event::press(B, 60_000),
                Event::release(B, 90_000),
            ],
            300_000,
        );
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn shift_selector_changes_bank() {
        let (seen, _) = run(
            &[
                Event::press(SHIFT, 0),
                Event::press(A, 200_000),
                Event::release(A, 320_000),
                Event::release(SHIFT, 400_000),
            ],
            600_000,
        );
        let a = seen.iter().find(|t| t.pos == A && t.pressed).unwrap();
        assert_eq!(a.resolved.key, Some(azerty::A));
        assert_eq!(a.resolved.forced, Some(Keycode::LShift));
    }

    #[test]
    fn short_function_press_taps_enter() {
        let (seen, resolver) = run(
            &[Event::press(FUNCTION, 0), Event::release(FUNCTION, 150_000)],
            400_000,
        );
        assert_eq!(keys(&seen), [(Some(Keycode::Enter), true), (Some(Keycode::Enter), false)]);
        assert_eq!(resolver.state().active_mask(), LayerMask::EMPTY);
    }

    #[test]
    fn long_function_press_emits_nothing() {
        let (seen, _) = run(
            &[Event::press(FUNCTION, 0), Event::release(FUNCTION, MAX_HOLD_TIME)],
            800_000,
        );
        assert!(seen.is_empty());
    }

    #[test]
    fn hold_pending_contributes_its_layer() {
        let mut queue = EventQueue::new();
        let (mut producer, mut consumer) = queue.split();
        let mut resolver = Resolver::new(Timing::default());
        producer.push_back(Event::press(FUNCTION, 0));
        resolver.drain(OVERLAP_REMOVAL_TIME, &mut consumer, &DEFAULT_KEYMAP, |_, _| {});
        assert_eq!(resolver.state().active_mask(), LayerMask::FUNCTION);
        assert_eq!(resolver.state().pending_holds().collect::<StdVec<_>>(), [FUNCTION]);
        assert_eq!(resolver.state().press_start(FUNCTION), Some(0));
    }

    #[test]
    fn reset_immune_bit_is_retained_while_keys_are_held() {
        let (seen, resolver) = run(
            &[
                Event::press(B, 0),
                Event::press(SHIFT, 200_000),
                Event::release(SHIFT, 400_000),
                Event::press(A, 500_000),
                Event::release(A, 650_000),
            ],
            800_000,
        );
        let a = seen.iter().find(|t| t.pos == A && t.pressed).unwrap();
        assert_eq!(a.resolved.forced, Some(Keycode::LShift));
        assert_eq!(resolver.state().active_mask(), LayerMask::SHIFT);
    }

    #[test]
    fn retained_bits_clear_once_everything_is_released() {
        let (_, resolver) = run(
            &[
                Event::press(B, 0),
                Event::press(SHIFT, 200_000),
                Event::release(SHIFT, 400_000),
                Event::release(B, 500_000),
            ],
            800_000,
        );
        assert_eq!(resolver.state().active_mask(), LayerMask::EMPTY);
        assert!(resolver.state().is_idle());
    }

    #[test]
    fn duplicate_press_is_ignored() {
        let mut queue = EventQueue::new();
        let (mut producer, mut consumer) = queue.split();
        let mut resolver = Resolver::new(Timing::default());
        producer.push_back(Event::press(A, 0));
        producer.push_back(Event::press(A, 200_000));
        let mut presses = 0;
        resolver.drain(400_000, &mut consumer, &DEFAULT_KEYMAP, |t, _| {
            presses += usize::from(t.pressed)
        });
        assert_eq!(presses, 1);
        assert_eq!(resolver.state().pressed().count(), 1);
    }
}
