//! `GETATTR` (proc 1, RFC 1813 §3.3.1).

use crate::error::{self, Error};
use crate::nfs3::{Fattr3, FileHandle3};
use std::io::Cursor;

pub fn encode_args(file: &FileHandle3) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.encode(&mut buf)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<Fattr3, Error> {
    let mut cursor = Cursor::new(reply);
    let status = crate::xdr::decode::u32(&mut cursor)?;
    if let Some(e) = error::from_nfs3_status(status) {
        return Err(e);
    }
    Fattr3::decode(&mut cursor)
}
