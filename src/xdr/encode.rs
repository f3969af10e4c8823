//! Primitive XDR encoders. The mirror image of [`super::decode`].

use super::pad4;
use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Write};

fn padding(dest: &mut dyn Write, n: usize) -> io::Result<()> {
    let buf = [0u8; super::ALIGNMENT];
    dest.write_all(&buf[..pad4(n)])
}

pub fn u8(dest: &mut dyn Write, v: u8) -> io::Result<()> {
    dest.write_u8(v)
}

pub fn u32(dest: &mut dyn Write, v: u32) -> io::Result<()> {
    dest.write_u32::<BigEndian>(v)
}

pub fn i32(dest: &mut dyn Write, v: i32) -> io::Result<()> {
    dest.write_i32::<BigEndian>(v)
}

pub fn u64(dest: &mut dyn Write, v: u64) -> io::Result<()> {
    dest.write_u64::<BigEndian>(v)
}

pub fn i64(dest: &mut dyn Write, v: i64) -> io::Result<()> {
    dest.write_i64::<BigEndian>(v)
}

pub fn f32(dest: &mut dyn Write, v: f32) -> io::Result<()> {
    dest.write_f32::<BigEndian>(v)
}

pub fn f64(dest: &mut dyn Write, v: f64) -> io::Result<()> {
    dest.write_f64::<BigEndian>(v)
}

pub fn boolean(dest: &mut dyn Write, v: bool) -> io::Result<()> {
    u32(dest, if v { 1 } else { 0 })
}

pub fn option<T>(
    dest: &mut dyn Write,
    value: &Option<T>,
    cont: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> io::Result<()> {
    match value {
        Some(v) => {
            boolean(dest, true)?;
            cont(v, dest)
        }
        None => boolean(dest, false),
    }
}

pub fn opaque_fixed<const N: usize>(dest: &mut dyn Write, value: &[u8; N]) -> io::Result<()> {
    dest.write_all(value)?;
    padding(dest, N)
}

pub fn opaque_var(dest: &mut dyn Write, value: &[u8]) -> io::Result<()> {
    let len: u32 = value
        .len()
        .try_into()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "opaque too long for XDR"))?;
    u32(dest, len)?;
    dest.write_all(value)?;
    padding(dest, value.len())
}

pub fn string(dest: &mut dyn Write, value: &str) -> io::Result<()> {
    opaque_var(dest, value.as_bytes())
}

pub fn array<T>(
    dest: &mut dyn Write,
    values: &[T],
    mut elem: impl FnMut(&T, &mut dyn Write) -> io::Result<()>,
) -> io::Result<()> {
    let len: u32 = values
        .len()
        .try_into()
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "array too long for XDR"))?;
    u32(dest, len)?;
    for v in values {
        elem(v, dest)?;
    }
    Ok(())
}
