//! Result reporting
//!
//! Textual results of the module: the `results.txt` file and the string
//! returned to the host.

pub mod results;

pub use results::{write_results, RESULTS_FILE_NAME};
