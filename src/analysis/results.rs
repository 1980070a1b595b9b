//! Results file writer

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ModuleError;
use crate::ml::Prediction;

/// Name of the textual results file inside the module results directory
pub const RESULTS_FILE_NAME: &str = "results.txt";

/// Prefix of the line written to the results file
pub const RESULTS_FILE_PREFIX: &str = "Classification Result: ";

/// Prefix of the string returned to the host
pub const RETURN_PREFIX: &str = "Classification: ";

/// Path of the results file for a module results directory
pub fn results_file_path(results_dir: &Path) -> PathBuf {
    results_dir.join(RESULTS_FILE_NAME)
}

/// Write `results.txt` and build the host return string
///
/// The file is created or truncated and holds exactly
/// `Classification Result: <prediction>` with no trailing newline. It is
/// synced to disk before returning.
///
/// # Returns
///
/// `Classification: <prediction>`
pub fn write_results(results_dir: &Path, prediction: &Prediction) -> Result<String, ModuleError> {
    let path = results_file_path(results_dir);
    let result = prediction.to_string();

    let mut file = File::create(&path).map_err(|e| ModuleError::filesystem(&path, e))?;
    write_line(&mut file, &result).map_err(|e| ModuleError::filesystem(&path, e))?;

    log::info!("Wrote results to {}", path.display());

    Ok(format!("{}{}", RETURN_PREFIX, result))
}

fn write_line(file: &mut File, result: &str) -> std::io::Result<()> {
    file.write_all(RESULTS_FILE_PREFIX.as_bytes())?;
    file.write_all(result.as_bytes())?;
    file.flush()?;
    file.sync_all()
}
