//! `spotlight-curve` library crate.
//!
//! The binary (`slc`) is a thin wrapper around this library so that:
//!
//! - the search pipeline is testable without spawning processes
//! - the archive client, detrending and BLS engine are reusable on their own

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod preprocess;
pub mod report;
pub mod search;
pub mod tui;
