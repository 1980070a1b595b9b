//! Trace I/O modules
//!
//! NPY container decoding and IQ trace loading.

pub mod npy;
pub mod trace;

pub use trace::{time_duration, Trace, TraceFormat};
