//! Event pipeline of a split keyboard: switch sampling, debounce, overlap
//! removal, tap/hold and layer resolution, HID report assembly.
//!
//! This crate is `no_std` so it runs both in the AVR firmware and in the
//! host CLI, where it is exercised against recorded traces.

#![no_std]

pub mod error;
pub mod event;
pub mod keycode;
pub mod keymap;
pub mod layers;
pub mod output;
pub mod pipeline;
pub mod queue;
pub mod resolver;
pub mod sampler;
pub mod timing;

/// Lines of the key matrix.
pub const NUM_LINES: usize = 5;
/// Columns of the key matrix, both halves.
pub const NUM_COLUMNS: usize = 12;

pub use error::{BusFault, SampleError};
pub use event::{Coord, Event, Micros};
pub use keycode::{Keycode, MediaKey};
pub use keymap::{Binding, Keymap, LayerBit, LayerMask, PositionFlags, Resolved};
pub use layers::DEFAULT_KEYMAP;
pub use output::{HidTransport, Output, Report};
pub use pipeline::Pipeline;
pub use queue::{Consumer, EventQueue, Producer};
pub use resolver::{PositionState, Resolver, ResolverState, Transition};
pub use sampler::{BoardRevision, Sampler, SwitchBus, Wiring};
pub use timing::Timing;
