//! Primitive XDR decoders.
//!
//! Every decoder here validates length prefixes against a caller-supplied
//! maximum (or, for vectors without one, simply refuses lengths that could
//! not possibly fit in memory) before allocating, so a hostile or truncated
//! reply can only ever produce [`Error::CodecFailed`], never a panic.

use super::{pad4, ALIGNMENT};
use crate::error::Error;
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Read;

fn io_err(_: std::io::Error) -> Error {
    Error::CodecFailed("truncated buffer")
}

/// Reads and discards XDR alignment padding for a field of `n` bytes.
pub fn padding(src: &mut dyn Read, n: usize) -> Result<(), Error> {
    let mut buf = [0u8; ALIGNMENT];
    let pad = pad4(n);
    src.read_exact(&mut buf[..pad]).map_err(|_| Error::CodecFailed("bad padding"))
}

pub fn u8(src: &mut dyn Read) -> Result<u8, Error> {
    src.read_u8().map_err(io_err)
}

pub fn u32(src: &mut dyn Read) -> Result<u32, Error> {
    src.read_u32::<BigEndian>().map_err(io_err)
}

pub fn i32(src: &mut dyn Read) -> Result<i32, Error> {
    src.read_i32::<BigEndian>().map_err(io_err)
}

pub fn u64(src: &mut dyn Read) -> Result<u64, Error> {
    src.read_u64::<BigEndian>().map_err(io_err)
}

pub fn i64(src: &mut dyn Read) -> Result<i64, Error> {
    src.read_i64::<BigEndian>().map_err(io_err)
}

pub fn f32(src: &mut dyn Read) -> Result<f32, Error> {
    src.read_f32::<BigEndian>().map_err(io_err)
}

pub fn f64(src: &mut dyn Read) -> Result<f64, Error> {
    src.read_f64::<BigEndian>().map_err(io_err)
}

pub fn boolean(src: &mut dyn Read) -> Result<bool, Error> {
    match u32(src)? {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(Error::CodecFailed("bool discriminant not 0/1")),
    }
}

/// Decodes an XDR `optional T`: present-flag followed by `T` if set.
pub fn option<T>(
    src: &mut dyn Read,
    cont: impl FnOnce(&mut dyn Read) -> Result<T, Error>,
) -> Result<Option<T>, Error> {
    match boolean(src)? {
        true => Ok(Some(cont(src)?)),
        false => Ok(None),
    }
}

/// Decodes a fixed-size `opaque[N]`, consuming its padding.
pub fn opaque_fixed<const N: usize>(src: &mut dyn Read) -> Result<[u8; N], Error> {
    let mut buf = [0u8; N];
    src.read_exact(&mut buf).map_err(io_err)?;
    padding(src, N)?;
    Ok(buf)
}

/// Decodes a length-prefixed `opaque<max>`, rejecting lengths above `max`.
pub fn opaque_var(src: &mut dyn Read, max: usize) -> Result<Vec<u8>, Error> {
    let len = u32(src)? as usize;
    if len > max {
        return Err(Error::CodecFailed("opaque length exceeds maximum"));
    }
    let mut buf = vec![0u8; len];
    src.read_exact(&mut buf).map_err(io_err)?;
    padding(src, len)?;
    Ok(buf)
}

/// Decodes a length-prefixed `string<max>` as UTF-8.
pub fn string(src: &mut dyn Read, max: usize) -> Result<String, Error> {
    let bytes = opaque_var(src, max)?;
    String::from_utf8(bytes).map_err(|_| Error::CodecFailed("string is not valid UTF-8"))
}

/// Decodes a variable-length array: `u32` count followed by `count` elements
/// produced by `elem`. `max_count` bounds the count against an absurd
/// allocation request from a malformed length prefix.
pub fn array<T>(
    src: &mut dyn Read,
    max_count: usize,
    mut elem: impl FnMut(&mut dyn Read) -> Result<T, Error>,
) -> Result<Vec<T>, Error> {
    let count = u32(src)? as usize;
    if count > max_count {
        return Err(Error::CodecFailed("array count exceeds maximum"));
    }
    let mut out = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        out.push(elem(src)?);
    }
    Ok(out)
}
