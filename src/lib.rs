//! wiresynth: a patch language for polyphonic synthesizers.
//!
//! Source text is compiled by [`dsl::Compiler`] into an [`ir::Structure`],
//! which [`engine::Engine`] instantiates into a per-sample signal network
//! built from the units in [`unit`].

pub mod catalog;
pub mod config;
pub mod convert;
pub mod dsl;
pub mod engine;
pub mod ir;
pub mod unit;
