//! EM trace loading and duration lookup

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rustfft::num_complex::Complex;

use super::npy;
use crate::error::ModuleError;

/// Size of one raw interleaved complex sample (two little-endian f32)
const RAW_SAMPLE_BYTES: usize = 8;

/// On-disk trace format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    /// NumPy `.npy` array container
    Npy,
    /// Headerless interleaved little-endian f32 I/Q (`.cfile`, `.raw`)
    Raw,
}

/// Captured EM trace: complex IQ samples at a known sample rate
#[derive(Debug, Clone)]
pub struct Trace {
    samples: Vec<Complex<f32>>,
    sample_rate: f32,
}

impl Trace {
    /// Wrap already-decoded samples
    pub fn new(samples: Vec<Complex<f32>>, sample_rate: f32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Load a trace from disk
    pub fn load(path: &Path, sample_rate: f32, format: TraceFormat) -> Result<Self, ModuleError> {
        check_sample_rate(sample_rate)?;

        let bytes = std::fs::read(path).map_err(|e| {
            ModuleError::TraceLoad(format!("cannot read trace {}: {}", path.display(), e))
        })?;

        let samples = match format {
            TraceFormat::Npy => {
                let header = npy::read_header(&mut &bytes[..])?;
                npy::decode_iq(&header, &bytes[header.data_offset..])?
            }
            TraceFormat::Raw => decode_raw(&bytes),
        };

        log::debug!(
            "Loaded trace {}: {} samples at {} Hz",
            path.display(),
            samples.len(),
            sample_rate
        );

        Ok(Self::new(samples, sample_rate))
    }

    /// IQ samples
    pub fn samples(&self) -> &[Complex<f32>] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the trace holds no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate
    }
}

/// Duration in seconds of the trace stored at `path`
///
/// For NPY files only the header is read; the payload size is checked
/// against the file length so a truncated capture is rejected here rather
/// than during feature extraction.
pub fn time_duration(
    path: &Path,
    sample_rate: f32,
    format: TraceFormat,
) -> Result<f32, ModuleError> {
    check_sample_rate(sample_rate)?;
    let count = sample_count(path, format)?;
    Ok(count as f32 / sample_rate)
}

/// Number of complex samples stored at `path`
pub fn sample_count(path: &Path, format: TraceFormat) -> Result<usize, ModuleError> {
    let file = File::open(path).map_err(|e| {
        ModuleError::TraceLoad(format!("cannot open trace {}: {}", path.display(), e))
    })?;
    let file_len = file
        .metadata()
        .map_err(|e| {
            ModuleError::TraceLoad(format!("cannot stat trace {}: {}", path.display(), e))
        })?
        .len() as usize;

    match format {
        TraceFormat::Npy => {
            let header = npy::read_header(&mut BufReader::new(file))?;
            let (needed, count) = header
                .payload_end()
                .zip(header.iq_sample_count())
                .ok_or_else(|| {
                    ModuleError::TraceLoad(format!(
                        "trace {} has an oversized shape {:?}",
                        path.display(),
                        header.shape
                    ))
                })?;
            if file_len < needed {
                return Err(ModuleError::TraceLoad(format!(
                    "trace {} truncated: header describes {} bytes, file has {}",
                    path.display(),
                    needed,
                    file_len
                )));
            }
            Ok(count)
        }
        TraceFormat::Raw => {
            if file_len % RAW_SAMPLE_BYTES != 0 {
                log::warn!(
                    "Raw trace {} has {} trailing bytes, ignoring them",
                    path.display(),
                    file_len % RAW_SAMPLE_BYTES
                );
            }
            Ok(file_len / RAW_SAMPLE_BYTES)
        }
    }
}

fn decode_raw(bytes: &[u8]) -> Vec<Complex<f32>> {
    bytes
        .chunks_exact(RAW_SAMPLE_BYTES)
        .map(|b| {
            let re = f32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            let im = f32::from_le_bytes([b[4], b[5], b[6], b[7]]);
            Complex::new(re, im)
        })
        .collect()
}

fn check_sample_rate(sample_rate: f32) -> Result<(), ModuleError> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(ModuleError::FeatureExtraction(format!(
            "invalid sample rate {}",
            sample_rate
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::npy::tests::{complex64_payload, npy_bytes};

    fn tone(n: usize) -> Vec<Complex<f32>> {
        (0..n)
            .map(|i| Complex::from_polar(1.0, i as f32 * 0.1))
            .collect()
    }

    #[test]
    fn test_npy_duration_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.npy");
        let samples = tone(16000);
        std::fs::write(&path, npy_bytes("<c8", "(16000,)", false, &complex64_payload(&samples)))
            .unwrap();

        let duration = time_duration(&path, 32000.0, TraceFormat::Npy).unwrap();
        assert!((duration - 0.5).abs() < 1e-6);

        let trace = Trace::load(&path, 32000.0, TraceFormat::Npy).unwrap();
        assert_eq!(trace.len(), 16000);
        assert_eq!(trace.samples()[3], samples[3]);
        assert!((trace.duration_seconds() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_raw_trace() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.cfile");
        let samples = tone(100);
        std::fs::write(&path, complex64_payload(&samples)).unwrap();

        assert_eq!(sample_count(&path, TraceFormat::Raw).unwrap(), 100);
        let trace = Trace::load(&path, 1000.0, TraceFormat::Raw).unwrap();
        assert_eq!(trace.samples(), &samples[..]);
    }

    #[test]
    fn test_missing_trace() {
        let result = time_duration(Path::new("/nonexistent/trace.npy"), 32000.0, TraceFormat::Npy);
        assert!(matches!(result, Err(ModuleError::TraceLoad(_))));
    }

    #[test]
    fn test_truncated_npy_rejected_by_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.npy");
        let payload = complex64_payload(&tone(10));
        std::fs::write(&path, npy_bytes("<c8", "(1000,)", false, &payload)).unwrap();

        let result = time_duration(&path, 32000.0, TraceFormat::Npy);
        assert!(matches!(result, Err(ModuleError::TraceLoad(_))));
    }

    #[test]
    fn test_not_npy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.npy");
        std::fs::write(&path, b"just some text, not an array").unwrap();

        let result = time_duration(&path, 32000.0, TraceFormat::Npy);
        assert!(matches!(result, Err(ModuleError::TraceLoad(_))));
    }

    #[test]
    fn test_invalid_sample_rate() {
        let result = time_duration(Path::new("x.npy"), 0.0, TraceFormat::Npy);
        assert!(matches!(result, Err(ModuleError::FeatureExtraction(_))));

        let result = Trace::load(Path::new("x.npy"), f32::NAN, TraceFormat::Npy);
        assert!(matches!(result, Err(ModuleError::FeatureExtraction(_))));
    }

    #[test]
    fn test_overflowing_shape_is_trace_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostile.npy");
        std::fs::write(&path, npy_bytes("<c8", "(4611686018427387904, 8)", false, &[])).unwrap();

        let result = time_duration(&path, 32000.0, TraceFormat::Npy);
        assert!(matches!(result, Err(ModuleError::TraceLoad(_))));
        let result = Trace::load(&path, 32000.0, TraceFormat::Npy);
        assert!(matches!(result, Err(ModuleError::TraceLoad(_))));
    }
}
