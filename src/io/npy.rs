//! NPY array container decoding
//!
//! Reads the self-describing `.npy` format: a magic string, a version, a
//! little-endian header length and a Python-literal header dictionary
//! (`descr`, `fortran_order`, `shape`), followed by the raw element payload.
//!
//! Only the element types that show up in captured IQ traces are supported:
//! complex64/complex128, float32/float64 and 8/16-bit integers.
//!
//! # Example
//!
//! ```no_run
//! use em_binary_classifier::io::npy::{read_header, decode_iq};
//!
//! let bytes = std::fs::read("trace.npy").unwrap();
//! let mut reader = &bytes[..];
//! let header = read_header(&mut reader)?;
//! let samples = decode_iq(&header, &bytes[header.data_offset..])?;
//! # Ok::<(), em_binary_classifier::ModuleError>(())
//! ```

use std::io::Read;

use rustfft::num_complex::Complex;

use crate::error::ModuleError;

/// Magic prefix of every NPY file
pub const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Largest header dictionary accepted; numpy writes a few hundred bytes
pub const MAX_HEADER_LEN: usize = 1 << 20;

/// Scalar element type of an NPY array
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    /// `c8`: two f32 (I, Q)
    Complex64,
    /// `c16`: two f64 (I, Q)
    Complex128,
    /// `f4`
    Float32,
    /// `f8`
    Float64,
    /// `i2`
    Int16,
    /// `i1`
    Int8,
    /// `u1`
    UInt8,
}

/// Element type plus byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpyDtype {
    /// Scalar element type
    pub kind: ScalarKind,
    /// Byte order of multi-byte elements
    pub little_endian: bool,
}

impl NpyDtype {
    /// Parse a numpy `descr` string such as `<c8`, `>f4` or `|u1`
    pub fn parse(descr: &str) -> Result<Self, ModuleError> {
        let (order, code) = match descr.chars().next() {
            Some(c @ ('<' | '>' | '|' | '=')) => (c, &descr[1..]),
            _ => ('=', descr),
        };

        let kind = match code {
            "c8" => ScalarKind::Complex64,
            "c16" => ScalarKind::Complex128,
            "f4" => ScalarKind::Float32,
            "f8" => ScalarKind::Float64,
            "i2" => ScalarKind::Int16,
            "i1" => ScalarKind::Int8,
            "u1" => ScalarKind::UInt8,
            _ => {
                return Err(ModuleError::TraceLoad(format!(
                    "unsupported npy dtype {:?}",
                    descr
                )))
            }
        };

        let little_endian = match order {
            '>' => false,
            '<' | '|' => true,
            _ => cfg!(target_endian = "little"),
        };

        Ok(Self { kind, little_endian })
    }

    /// Size in bytes of one element
    pub fn item_size(&self) -> usize {
        match self.kind {
            ScalarKind::Complex128 => 16,
            ScalarKind::Complex64 | ScalarKind::Float64 => 8,
            ScalarKind::Float32 => 4,
            ScalarKind::Int16 => 2,
            ScalarKind::Int8 | ScalarKind::UInt8 => 1,
        }
    }

    /// Whether one element already holds an I/Q pair
    pub fn is_complex(&self) -> bool {
        matches!(self.kind, ScalarKind::Complex64 | ScalarKind::Complex128)
    }
}

/// Parsed NPY header
#[derive(Debug, Clone, PartialEq)]
pub struct NpyHeader {
    /// Format major version (1, 2 or 3)
    pub major_version: u8,
    /// Element type
    pub dtype: NpyDtype,
    /// Column-major payload layout
    pub fortran_order: bool,
    /// Array shape; empty for a 0-d scalar
    pub shape: Vec<usize>,
    /// Byte offset of the payload from the start of the file
    pub data_offset: usize,
}

impl NpyHeader {
    /// Total number of elements in the array; `None` if it overflows `usize`
    pub fn element_count(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
    }

    /// Expected payload length in bytes; `None` if it overflows `usize`
    pub fn payload_len(&self) -> Option<usize> {
        self.element_count()?.checked_mul(self.dtype.item_size())
    }

    /// Byte offset one past the end of the payload
    pub fn payload_end(&self) -> Option<usize> {
        self.data_offset.checked_add(self.payload_len()?)
    }

    /// Whether a real-valued array stores I/Q as two columns (`shape == (N, 2)`)
    pub fn is_paired_iq(&self) -> bool {
        !self.dtype.is_complex() && self.shape.len() == 2 && self.shape[1] == 2
    }

    /// Number of complex IQ samples the payload decodes to
    pub fn iq_sample_count(&self) -> Option<usize> {
        if self.is_paired_iq() {
            self.payload_len().map(|_| self.shape[0])
        } else {
            self.element_count()
        }
    }
}

/// Read and parse an NPY header, leaving `reader` positioned at the payload
///
/// Headers whose shape describes more bytes than fit in `usize`, or whose
/// dictionary is longer than [`MAX_HEADER_LEN`], are rejected.
pub fn read_header<R: Read>(reader: &mut R) -> Result<NpyHeader, ModuleError> {
    let mut preamble = [0u8; 8];
    reader
        .read_exact(&mut preamble)
        .map_err(|e| ModuleError::TraceLoad(format!("npy preamble unreadable: {}", e)))?;

    if &preamble[..6] != NPY_MAGIC {
        return Err(ModuleError::TraceLoad("not an npy file (bad magic)".to_string()));
    }

    let major_version = preamble[6];
    let (header_len, len_field) = match major_version {
        1 => {
            let mut len = [0u8; 2];
            reader
                .read_exact(&mut len)
                .map_err(|e| ModuleError::TraceLoad(format!("npy header length: {}", e)))?;
            (u16::from_le_bytes(len) as usize, 2)
        }
        2 | 3 => {
            let mut len = [0u8; 4];
            reader
                .read_exact(&mut len)
                .map_err(|e| ModuleError::TraceLoad(format!("npy header length: {}", e)))?;
            (u32::from_le_bytes(len) as usize, 4)
        }
        v => {
            return Err(ModuleError::TraceLoad(format!(
                "unsupported npy format version {}.{}",
                v, preamble[7]
            )))
        }
    };

    if header_len > MAX_HEADER_LEN {
        return Err(ModuleError::TraceLoad(format!(
            "npy header of {} bytes exceeds the {} byte limit",
            header_len, MAX_HEADER_LEN
        )));
    }

    let mut dict = vec![0u8; header_len];
    reader
        .read_exact(&mut dict)
        .map_err(|e| ModuleError::TraceLoad(format!("npy header truncated: {}", e)))?;
    let dict = String::from_utf8_lossy(&dict);

    let descr = dict_value(&dict, "descr")
        .and_then(quoted)
        .ok_or_else(|| ModuleError::TraceLoad("npy header has no descr".to_string()))?;
    let dtype = NpyDtype::parse(descr)?;

    let fortran_order = match dict_value(&dict, "fortran_order") {
        Some(v) if v.starts_with("True") => true,
        Some(v) if v.starts_with("False") => false,
        _ => {
            return Err(ModuleError::TraceLoad(
                "npy header has no fortran_order".to_string(),
            ))
        }
    };

    let shape = dict_value(&dict, "shape")
        .and_then(parse_shape)
        .ok_or_else(|| ModuleError::TraceLoad("npy header has no valid shape".to_string()))?;

    let header = NpyHeader {
        major_version,
        dtype,
        fortran_order,
        shape,
        data_offset: 8 + len_field + header_len,
    };
    if header.payload_end().is_none() {
        return Err(ModuleError::TraceLoad(format!(
            "npy shape {:?} is too large",
            header.shape
        )));
    }
    Ok(header)
}

/// Decode the payload of an NPY array into complex IQ samples
///
/// Complex arrays map element-wise. Real arrays of shape `(N, 2)` are read as
/// I/Q columns; any other real array becomes samples with a zero Q component.
/// Integer samples are scaled to [-1.0, 1.0].
pub fn decode_iq(header: &NpyHeader, payload: &[u8]) -> Result<Vec<Complex<f32>>, ModuleError> {
    let expected = header.payload_len().ok_or_else(|| {
        ModuleError::TraceLoad(format!("npy shape {:?} is too large", header.shape))
    })?;
    if payload.len() < expected {
        return Err(ModuleError::TraceLoad(format!(
            "npy payload truncated: expected {} bytes, found {}",
            expected,
            payload.len()
        )));
    }

    let scalars = decode_scalars(header.dtype, &payload[..expected]);

    let samples = if header.dtype.is_complex() {
        scalars
            .chunks_exact(2)
            .map(|iq| Complex::new(iq[0], iq[1]))
            .collect()
    } else if header.is_paired_iq() {
        let n = header.shape[0];
        if header.fortran_order {
            // Column-major: all I values, then all Q values
            (0..n)
                .map(|i| Complex::new(scalars[i], scalars[n + i]))
                .collect()
        } else {
            scalars
                .chunks_exact(2)
                .map(|iq| Complex::new(iq[0], iq[1]))
                .collect()
        }
    } else {
        scalars.into_iter().map(|re| Complex::new(re, 0.0)).collect()
    };

    Ok(samples)
}

/// Decode raw elements to f32; complex elements yield two values each
fn decode_scalars(dtype: NpyDtype, bytes: &[u8]) -> Vec<f32> {
    let le = dtype.little_endian;
    match dtype.kind {
        ScalarKind::Complex64 | ScalarKind::Float32 => bytes
            .chunks_exact(4)
            .map(|b| {
                let raw = to_array::<4>(b);
                if le {
                    f32::from_le_bytes(raw)
                } else {
                    f32::from_be_bytes(raw)
                }
            })
            .collect(),
        ScalarKind::Complex128 | ScalarKind::Float64 => bytes
            .chunks_exact(8)
            .map(|b| {
                let raw = to_array::<8>(b);
                let v = if le {
                    f64::from_le_bytes(raw)
                } else {
                    f64::from_be_bytes(raw)
                };
                v as f32
            })
            .collect(),
        ScalarKind::Int16 => bytes
            .chunks_exact(2)
            .map(|b| {
                let raw = to_array::<2>(b);
                let v = if le {
                    i16::from_le_bytes(raw)
                } else {
                    i16::from_be_bytes(raw)
                };
                v as f32 / 32768.0
            })
            .collect(),
        ScalarKind::Int8 => bytes.iter().map(|&b| b as i8 as f32 / 128.0).collect(),
        ScalarKind::UInt8 => bytes.iter().map(|&b| (b as f32 - 127.5) / 127.5).collect(),
    }
}

fn to_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

/// Text following `'key':` in the header dictionary
fn dict_value<'a>(dict: &'a str, key: &str) -> Option<&'a str> {
    let single = format!("'{}'", key);
    let double = format!("\"{}\"", key);
    let start = dict
        .find(&single)
        .map(|i| i + single.len())
        .or_else(|| dict.find(&double).map(|i| i + double.len()))?;
    let rest = dict[start..].trim_start();
    let rest = rest.strip_prefix(':')?;
    Some(rest.trim_start())
}

/// Contents of a leading quoted string literal
fn quoted(value: &str) -> Option<&str> {
    let quote = value.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &value[1..];
    let end = body.find(quote)?;
    Some(&body[..end])
}

/// Parse a Python tuple of integers, e.g. `(1000,)`, `(10, 2)` or `()`
fn parse_shape(value: &str) -> Option<Vec<usize>> {
    let body = value.strip_prefix('(')?;
    let end = body.find(')')?;
    body[..end]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('L').parse::<usize>().ok())
        .collect()
}
