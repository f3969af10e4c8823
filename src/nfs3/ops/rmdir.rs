//! `RMDIR` (proc 13, RFC 1813 §3.3.13).

use crate::error::{self, Error};
use crate::nfs3::{FileHandle3, WccData};
use crate::xdr::{decode, encode};
use std::io::Cursor;

pub fn encode_args(dir: &FileHandle3, name: &str) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    dir.encode(&mut buf)?;
    encode::string(&mut buf, name)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<WccData, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let dir_wcc = WccData::decode(&mut cursor)?;
    if let Some(e) = error::from_nfs3_status(status) {
        return Err(e);
    }
    Ok(dir_wcc)
}
