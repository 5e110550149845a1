//! Tests against a real board.
//!
//! Ignored by default; run them with `--ignored` and the environment
//! variables described in [`utils`].

pub mod board_tests;
pub mod utils;

#[cfg(feature = "hidraw")]
pub mod hid_tests;
