mod common;

use common::resolve;
use proptest::prelude::*;
use splitkb_core::timing::{DEBOUNCE_TIME, MAX_HOLD_TIME, OVERLAP_REMOVAL_TIME};
use splitkb_core::{Coord, Event, Keycode, LayerMask};

const FUNCTION: Coord = Coord::new(4, 6);
const ACCENT: Coord = Coord::new(4, 5);

/// Plain letter positions: no selector, no tap/hold.
const LETTERS: [Coord; 8] = [
    Coord::new(1, 1),
    Coord::new(1, 2),
    Coord::new(1, 3),
    Coord::new(2, 2),
    Coord::new(2, 8),
    Coord::new(3, 3),
    Coord::new(3, 7),
    Coord::new(1, 9),
];

/// Positions mixing letters, a reset-immune selector and a dual-role key.
const MIXED: [Coord; 4] = [
    Coord::new(1, 1),
    Coord::new(3, 5),
    Coord::new(4, 4),
    FUNCTION,
];

/// Gap within one bounce pair and the gap to the next pair.
fn bounce_pair() -> impl Strategy<Value = (u32, u32)> {
    (0..DEBOUNCE_TIME, 0u32..200_000)
}

/// Member presses of an accidental combo: delay after the first press and
/// hold time, all short of the overlap window.
fn combo_members() -> impl Strategy<Value = Vec<(u32, u32)>> {
    prop::collection::vec((1_000u32..40_000, DEBOUNCE_TIME..OVERLAP_REMOVAL_TIME), 1..4)
}

/// (position index, delay since previous event) pairs.
fn mixed_trace() -> impl Strategy<Value = Vec<(usize, u32)>> {
    prop::collection::vec((0..MIXED.len(), 0u32..300_000), 1..40)
}

fn tail(events: &[Event]) -> u32 {
    events.last().map_or(0, |e| e.at) + 2 * MAX_HOLD_TIME
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn bounce_pairs_never_reach_the_output(pairs in prop::collection::vec(bounce_pair(), 1..6)) {
        let pos = LETTERS[0];
        let mut events = Vec::new();
        let mut at = 0;
        for (bounce, gap) in pairs {
            events.push(Event::press(pos, at));
            at += bounce;
            events.push(Event::release(pos, at));
            at += gap;
        }
        let (seen, _) = resolve(&events, tail(&events));
        prop_assert!(seen.is_empty(), "{seen:?}");
    }

    #[test]
    fn quick_combos_are_dropped(
        first_hold in 50_000u32..OVERLAP_REMOVAL_TIME,
        members in combo_members(),
    ) {
        let mut events = vec![Event::press(LETTERS[0], 0), Event::release(LETTERS[0], first_hold)];
        for (i, (delay, hold)) in members.iter().enumerate() {
            let pos = LETTERS[i + 1];
            events.push(Event::press(pos, *delay));
            events.push(Event::release(pos, delay + hold));
        }
        events.sort_by_key(|e| e.at);

        let (seen, resolver) = resolve(&events, tail(&events));
        prop_assert!(seen.is_empty(), "{seen:?}");
        prop_assert!(resolver.state().is_idle());
    }

    #[test]
    fn short_dual_role_press_taps_once(
        pos in prop::sample::select(vec![FUNCTION, ACCENT]),
        held in DEBOUNCE_TIME..MAX_HOLD_TIME,
    ) {
        let events = [Event::press(pos, 0), Event::release(pos, held)];
        let (seen, resolver) = resolve(&events, tail(&events));

        let expected = if pos == FUNCTION { Keycode::Enter } else { Keycode::Space };
        prop_assert_eq!(seen.len(), 2);
        prop_assert!(seen[0].pressed && !seen[1].pressed);
        prop_assert!(seen.iter().all(|t| t.pos == pos && t.resolved.key == Some(expected)));
        prop_assert_eq!(resolver.state().active_mask(), LayerMask::EMPTY);
    }

    #[test]
    fn long_dual_role_press_only_selects_a_layer(held in MAX_HOLD_TIME..2 * MAX_HOLD_TIME) {
        let events = [Event::press(FUNCTION, 0), Event::release(FUNCTION, held)];

        // Just before the release the layer bit is active.
        let (seen, resolver) = resolve(&events[..1], held - 1);
        prop_assert!(seen.is_empty());
        prop_assert!(resolver.state().active_mask().contains(LayerMask::FUNCTION));

        let (seen, resolver) = resolve(&events, tail(&events));
        prop_assert!(seen.is_empty());
        prop_assert_eq!(resolver.state().active_mask(), LayerMask::EMPTY);
    }

    #[test]
    fn presses_and_releases_alternate(trace in mixed_trace()) {
        let mut held = [false; MIXED.len()];
        let mut events = Vec::new();
        let mut at = 0;
        for (index, delay) in trace {
            at += delay;
            held[index] = !held[index];
            events.push(Event { pos: MIXED[index], pressed: held[index], at });
        }

        let (seen, _) = resolve(&events, tail(&events));
        for pos in MIXED {
            let mut down = false;
            for t in seen.iter().filter(|t| t.pos == pos) {
                prop_assert_ne!(t.pressed, down, "{:?} repeated a {} at {}", pos, t.pressed, t.at);
                down = t.pressed;
            }
        }
    }
}
