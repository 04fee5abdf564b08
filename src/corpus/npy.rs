//! Reader for NumPy `.npy` embedding matrices.
//!
//! Only what embedding exports actually produce is supported: a 2-D, C-ordered,
//! little-endian `float32` or `float64` array. `float64` input is narrowed to
//! `f32` on load.

use std::path::Path;

use ndarray::Array2;

use crate::error::EngineError;

const MAGIC: &[u8] = b"\x93NUMPY";

/// Load a 2-D matrix from a `.npy` file.
pub fn read_matrix(path: &Path) -> Result<Array2<f32>, EngineError> {
    let bytes = std::fs::read(path).map_err(|e| {
        EngineError::load(format!("cannot read embeddings {}: {e}", path.display()))
    })?;
    decode(&bytes).map_err(|e| EngineError::load(format!("{}: {e}", path.display())))
}

/// Decode an in-memory `.npy` payload.
pub fn decode(bytes: &[u8]) -> Result<Array2<f32>, String> {
    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err("not an .npy file (bad magic)".into());
    }
    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                return Err("truncated .npy header".into());
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
            (len as usize, 12)
        }
        v => return Err(format!("unsupported .npy version {v}")),
    };
    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err("truncated .npy header".into());
    }
    let header = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| "header is not valid text".to_string())?;
    let header = Header::parse(header)?;

    let (rows, cols) = header.shape;
    let expected = rows
        .checked_mul(cols)
        .and_then(|count| count.checked_mul(header.dtype.width()))
        .ok_or_else(|| "shape overflows".to_string())?;
    let data = &bytes[data_start..];
    if data.len() != expected {
        return Err(format!(
            "expected {expected} bytes of {} data for shape ({rows}, {cols}), found {}",
            header.dtype.descr(),
            data.len()
        ));
    }

    let values: Vec<f32> = match header.dtype {
        Dtype::F32 => data
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        Dtype::F64 => data
            .chunks_exact(8)
            .map(|c| {
                f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32
            })
            .collect(),
    };

    Array2::from_shape_vec((rows, cols), values).map_err(|e| e.to_string())
}

/// Encode a matrix as a version 1.0 `<f4` `.npy` payload.
pub fn encode(matrix: &Array2<f32>) -> Vec<u8> {
    let (rows, cols) = matrix.dim();
    let mut header =
        format!("{{'descr': '<f4', 'fortran_order': False, 'shape': ({rows}, {cols}), }}");
    // magic(6) + version(2) + len(2) + header + '\n' must be a multiple of 64
    let unpadded = MAGIC.len() + 4 + header.len() + 1;
    header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
    header.push('\n');

    let mut out = Vec::with_capacity(10 + header.len() + rows * cols * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in matrix.iter() {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Dtype {
    F32,
    F64,
}

impl Dtype {
    fn width(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    fn descr(self) -> &'static str {
        match self {
            Self::F32 => "<f4",
            Self::F64 => "<f8",
        }
    }
}

struct Header {
    dtype: Dtype,
    shape: (usize, usize),
}

impl Header {
    fn parse(text: &str) -> Result<Self, String> {
        let descr = quoted_value(text, "descr").ok_or("header has no 'descr'")?;
        let dtype = match descr {
            "<f4" => Dtype::F32,
            "<f8" => Dtype::F64,
            other => return Err(format!("unsupported dtype {other:?}, expected '<f4' or '<f8'")),
        };

        let fortran = raw_value(text, "fortran_order").ok_or("header has no 'fortran_order'")?;
        if fortran.starts_with("True") {
            return Err("Fortran-ordered arrays are not supported".into());
        }

        let shape = raw_value(text, "shape").ok_or("header has no 'shape'")?;
        let inner = shape
            .strip_prefix('(')
            .and_then(|s| s.split(')').next())
            .ok_or("malformed 'shape'")?;
        let dims = inner
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<usize>().map_err(|_| format!("bad dimension {s:?}")))
            .collect::<Result<Vec<_>, _>>()?;
        match dims.as_slice() {
            [rows, cols] => Ok(Self {
                dtype,
                shape: (*rows, *cols),
            }),
            _ => Err(format!("expected a 2-D array, found shape {dims:?}")),
        }
    }
}

/// Text following `'key':`, with leading whitespace trimmed.
fn raw_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("'{key}':");
    let at = text.find(&needle)?;
    Some(text[at + needle.len()..].trim_start())
}

fn quoted_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    let rest = raw_value(text, key)?;
    let quote = rest.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let rest = &rest[1..];
    rest.find(quote).map(|end| &rest[..end])
}
