//! Utility modules.
//!
//! Provides:
//! - [`RingBuffer`] - Bounded buffer for history and transcript
//! - [`format`] - Size, duration and number formatting

pub mod format;
mod ring_buffer;

pub use ring_buffer::RingBuffer;
