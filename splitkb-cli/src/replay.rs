//! Replay a recorded switch trace through the event pipeline on the host.
//!
//! A trace is a TOML file of physical switch transitions and bus faults:
//!
//! ```toml
//! [[event]]
//! at_ms = 0
//! line = 1
//! column = 1
//! pressed = true
//!
//! [[fault]]
//! from_ms = 40
//! to_ms = 80
//! ```

use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{debug, info};
use serde::Deserialize;
use splitkb_core::sampler::MAX_CHIPS;
use splitkb_core::{
    BusFault, Coord, HidTransport, Micros, Pipeline, Report, SwitchBus, Wiring, DEFAULT_KEYMAP,
};

use crate::config::Config;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TraceEvent {
    pub at_ms: u32,
    pub line: usize,
    pub column: usize,
    pub pressed: bool,
}

/// Every bus read fails on ticks in `[from_ms, to_ms)`; a single tick when
/// `to_ms` is absent.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Fault {
    pub from_ms: u32,
    pub to_ms: Option<u32>,
}

impl Fault {
    /// Ticks covered, in µs. `None` past the end of the µs clock.
    fn span(&self) -> Option<Range<Micros>> {
        let from = to_micros(self.from_ms)?;
        let to = match self.to_ms {
            Some(ms) => to_micros(ms)?,
            None => from.checked_add(1)?,
        };
        Some(from..to)
    }
}

fn to_micros(ms: u32) -> Option<Micros> {
    ms.checked_mul(1_000)
}

#[derive(Debug, Default, Deserialize)]
pub struct Trace {
    #[serde(default, rename = "event")]
    pub events: Vec<TraceEvent>,
    #[serde(default, rename = "fault")]
    pub faults: Vec<Fault>,
}

impl Trace {
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }
}

/// Expander bus whose pins follow the trace.
struct ScriptedBus {
    wiring: Wiring,
    pins: [u8; MAX_CHIPS],
    failing: bool,
}

impl ScriptedBus {
    fn new(wiring: Wiring) -> Self {
        Self {
            wiring,
            pins: [0xFF; MAX_CHIPS],
            failing: false,
        }
    }

    fn set(&mut self, pos: Coord, pressed: bool) -> Result<()> {
        let Some((chip, pin)) = self.wiring.locate(pos) else {
            bail!("position ({}, {}) is not wired on this board", pos.line, pos.column);
        };
        let address = self.wiring.chips[chip].address as usize;
        // Switches pull the pin low.
        if pressed {
            self.pins[address] &= !(1 << pin);
        } else {
            self.pins[address] |= 1 << pin;
        }
        Ok(())
    }
}

impl SwitchBus for ScriptedBus {
    fn read_pins(&mut self, address: u8) -> Result<u8, BusFault> {
        if self.failing {
            return Err(BusFault::Timeout);
        }
        Ok(self.pins[address as usize])
    }

    fn reset(&mut self) {}
}

/// One report as the host would have received it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sent {
    pub at: Micros,
    pub report: Report,
}

impl fmt::Display for Sent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.report;
        write!(
            f,
            "{:>9.3} ms  mods={:08b} keys=[",
            self.at as f64 / 1_000.0,
            r.modifiers
        )?;
        for (i, key) in r.pressed_keys().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{key:02X}")?;
        }
        write!(f, "] media={:02X}", r.media)
    }
}

#[derive(Default)]
struct Recorder {
    now: Micros,
    sent: Vec<Sent>,
}

impl HidTransport for Recorder {
    fn send(&mut self, report: &Report) {
        self.sent.push(Sent {
            at: self.now,
            report: *report,
        });
    }
}

/// Outcome of a replay.
#[derive(Debug, Default)]
pub struct Replay {
    pub sent: Vec<Sent>,
    pub ticks: usize,
    pub failed_ticks: usize,
}

/// Run `trace` through a fresh pipeline, one tick every `tick_us`, until
/// every pending hold and overlap window has expired.
pub fn run(trace: &Trace, config: &Config, tick_us: Micros) -> Result<Replay> {
    if tick_us == 0 {
        bail!("tick period must be at least 1 µs");
    }
    let wiring = config.wiring();

    let mut events = Vec::with_capacity(trace.events.len());
    for (i, e) in trace.events.iter().enumerate() {
        let Some(pos) = Coord::try_new(e.line, e.column) else {
            bail!("event {i}: ({}, {}) is outside the matrix", e.line, e.column);
        };
        if wiring.locate(pos).is_none() {
            bail!("event {i}: ({}, {}) is not wired on {:?}", e.line, e.column, config.board);
        }
        let Some(at) = to_micros(e.at_ms) else {
            bail!("event {i}: at_ms {} does not fit the µs clock", e.at_ms);
        };
        events.push((at, pos, e.pressed));
    }
    events.sort_by_key(|&(at, _, _)| at);

    let mut faults = Vec::with_capacity(trace.faults.len());
    for (i, f) in trace.faults.iter().enumerate() {
        let Some(span) = f.span() else {
            bail!("fault {i}: {} to {:?} ms does not fit the µs clock", f.from_ms, f.to_ms);
        };
        faults.push(span);
    }

    let timing = config.timing;
    let last = events.last().map_or(0, |&(at, _, _)| at);
    let fault_end = faults.iter().map(|span| span.end).max().unwrap_or(0);
    let trace_end = last.max(fault_end);
    let Some(until) = trace_end
        .checked_add(timing.max_hold_us)
        .and_then(|t| t.checked_add(timing.overlap_removal_us))
    else {
        bail!("trace ends at {trace_end} µs, too late for pending holds to expire");
    };

    let mut bus = ScriptedBus::new(wiring);
    let mut recorder = Recorder::default();
    let mut pipeline = Pipeline::new(wiring, &DEFAULT_KEYMAP, timing);
    pipeline.init(&mut bus);

    let mut replay = Replay::default();
    let mut pending = events.iter().peekable();
    let mut now: Micros = 0;
    while now <= until {
        while let Some(&(at, pos, pressed)) = pending.next_if(|&&(at, _, _)| at <= now) {
            debug!("{at} µs: ({}, {}) {}", pos.line, pos.column, if pressed { "down" } else { "up" });
            bus.set(pos, pressed)?;
        }
        bus.failing = faults.iter().any(|span| span.contains(&now));

        recorder.now = now;
        if pipeline.tick(now, &mut bus, &mut recorder).is_err() {
            replay.failed_ticks += 1;
        }
        replay.ticks += 1;
        let Some(next) = now.checked_add(tick_us) else {
            break;
        };
        now = next;
    }

    info!(
        "replayed {} events over {} ticks ({} failed), {} reports",
        events.len(),
        replay.ticks,
        replay.failed_ticks,
        recorder.sent.len()
    );
    replay.sent = recorder.sent;
    Ok(replay)
}
