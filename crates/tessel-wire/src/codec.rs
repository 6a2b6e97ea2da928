//! Primitive encoders and the [`Wire`] trait.
//!
//! All integers and floats are little-endian. Sequences are prefixed
//! with a `u32` element count. No alignment padding, no self-describing
//! schema: both ends agree on the layout by type.

use std::io::{Read, Write};

use tessel_core::{CellIndex, IntBox, WorkerId};

use crate::error::WireError;

/// Upper bound on the capacity pre-allocated from a decoded length
/// prefix. Longer sequences still decode, they just grow as they go.
const MAX_PREALLOC: usize = 4096;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), WireError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), WireError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian i32.
pub fn write_i32_le(w: &mut dyn Write, v: i32) -> Result<(), WireError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), WireError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a sequence length, rejecting lengths that do not fit a u32.
pub fn write_len(w: &mut dyn Write, len: usize) -> Result<(), WireError> {
    let len = u32::try_from(len).map_err(|_| WireError::MalformedFrame {
        detail: format!("sequence of {len} elements exceeds u32::MAX"),
    })?;
    write_u32_le(w, len)
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, WireError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, WireError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian i32.
pub fn read_i32_le(r: &mut dyn Read) -> Result<i32, WireError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, WireError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

// ── Wire ────────────────────────────────────────────────────────

/// A value with a fixed binary layout.
///
/// The physics collaborator implements this for its cell and particle
/// types; `decode` must consume exactly the bytes `encode` produced.
pub trait Wire: Sized {
    /// Append the encoded value to `w`.
    fn encode(&self, w: &mut dyn Write) -> Result<(), WireError>;

    /// Read one value from `r`.
    fn decode(r: &mut dyn Read) -> Result<Self, WireError>;
}

impl Wire for WorkerId {
    fn encode(&self, w: &mut dyn Write) -> Result<(), WireError> {
        write_u32_le(w, self.0)
    }

    fn decode(r: &mut dyn Read) -> Result<Self, WireError> {
        Ok(WorkerId(read_u32_le(r)?))
    }
}

impl Wire for CellIndex {
    fn encode(&self, w: &mut dyn Write) -> Result<(), WireError> {
        write_i32_le(w, self.x)?;
        write_i32_le(w, self.y)
    }

    fn decode(r: &mut dyn Read) -> Result<Self, WireError> {
        let x = read_i32_le(r)?;
        let y = read_i32_le(r)?;
        Ok(CellIndex::new(x, y))
    }
}

impl Wire for IntBox {
    fn encode(&self, w: &mut dyn Write) -> Result<(), WireError> {
        write_i32_le(w, self.xmin)?;
        write_i32_le(w, self.xmax)?;
        write_i32_le(w, self.ymin)?;
        write_i32_le(w, self.ymax)
    }

    fn decode(r: &mut dyn Read) -> Result<Self, WireError> {
        let xmin = read_i32_le(r)?;
        let xmax = read_i32_le(r)?;
        let ymin = read_i32_le(r)?;
        let ymax = read_i32_le(r)?;
        Ok(IntBox::new(xmin, xmax, ymin, ymax))
    }
}

impl<T: Wire> Wire for Vec<T> {
    fn encode(&self, w: &mut dyn Write) -> Result<(), WireError> {
        write_len(w, self.len())?;
        for item in self {
            item.encode(w)?;
        }
        Ok(())
    }

    fn decode(r: &mut dyn Read) -> Result<Self, WireError> {
        let len = read_u32_le(r)? as usize;
        let mut out = Vec::with_capacity(len.min(MAX_PREALLOC));
        for _ in 0..len {
            out.push(T::decode(r)?);
        }
        Ok(out)
    }
}

// ── Frames ──────────────────────────────────────────────────────

/// Encode a value into a standalone frame.
pub fn encode_frame<T: Wire>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut buf = Vec::new();
    value.encode(&mut buf)?;
    Ok(buf)
}

/// Decode a standalone frame, rejecting trailing bytes.
pub fn decode_frame<T: Wire>(frame: &[u8]) -> Result<T, WireError> {
    let mut cursor = frame;
    let value = T::decode(&mut cursor).map_err(|e| match e {
        WireError::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            WireError::MalformedFrame {
                detail: format!("truncated frame of {} bytes", frame.len()),
            }
        }
        other => other,
    })?;
    if !cursor.is_empty() {
        return Err(WireError::MalformedFrame {
            detail: format!("{} trailing bytes", cursor.len()),
        });
    }
    Ok(value)
}
