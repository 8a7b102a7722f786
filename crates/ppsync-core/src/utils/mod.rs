//! Small helpers shared across the crate.

pub mod quote;

pub use quote::{unquote, unquote_or_raw};
