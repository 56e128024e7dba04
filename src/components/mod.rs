//! Kernel device components
//!
//! Compile-time composed device drivers. The concrete console device is
//! selected in `config.rs` based on cargo features.

pub mod console;
