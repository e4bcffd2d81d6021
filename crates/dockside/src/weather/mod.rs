//! Weather effects.

pub mod rain;

pub use rain::{RainPlugin, RainSettings};
