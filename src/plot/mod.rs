//! Terminal plots for `slc bls --plot`.

pub mod ascii;

pub use ascii::{render_folded, render_periodogram};
