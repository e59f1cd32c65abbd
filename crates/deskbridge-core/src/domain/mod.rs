//! Domain entities for Deskbridge.
//!
//! Pure data types with no infrastructure dependencies: the latest-frame
//! snapshot and the bounded audio accumulator.

pub mod audio;
pub mod frame;

pub use audio::{AudioAccumulator, AudioFormat};
pub use frame::Frame;
