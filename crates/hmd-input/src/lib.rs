//! Held-key view adjustments plus polled gamepad and positional-tracker
//! sources. Key-to-binding mapping stays with the windowing layer; this
//! crate owns what a binding does once asserted.

pub mod controller;
pub mod gamepad;

mod adjust;

pub use adjust::{apply_adjustment, AdjustBinding, AdjustTarget, AdjustmentRouter};
pub use controller::{NoController, PositionalController};
pub use gamepad::{GamepadSource, GamepadState, NoGamepad};
