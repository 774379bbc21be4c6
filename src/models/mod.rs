//! Transit model implementations.
//!
//! Models are small, pure functions of time and `TransitParams` so that the
//! simulator and the `model` subcommand can share them.

pub mod orbit;
pub mod transit;

pub use orbit::*;
pub use transit::*;
