//! `SETATTR` (proc 2, RFC 1813 §3.3.2).
//!
//! This crate only ever drives `SETATTR` through [`crate::facade`]'s
//! `set_file_size`, so the guard is always unchecked (`false`); the wire
//! format still supports the full `sattrguard3` for completeness.

use crate::error::{self, Error};
use crate::nfs3::{FileHandle3, Sattr3, WccData};
use crate::xdr::{decode, encode};
use std::io::Cursor;

pub fn encode_args(file: &FileHandle3, attr: &Sattr3) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.encode(&mut buf)?;
    attr.encode(&mut buf)?;
    encode::boolean(&mut buf, false)?; // sattrguard3: no ctime guard
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<WccData, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let wcc = WccData::decode(&mut cursor)?;
    if let Some(e) = error::from_nfs3_status(status) {
        return Err(e);
    }
    Ok(wcc)
}
