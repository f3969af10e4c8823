//! `COMMIT` (proc 21, RFC 1813 §3.3.21).

use crate::error::{self, Error};
use crate::nfs3::{FileHandle3, WccData};
use crate::xdr::{decode, encode};
use std::io::Cursor;

pub struct CommitResult {
    pub wcc: WccData,
    pub verifier: u64,
}

pub fn encode_args(file: &FileHandle3, offset: u64, count: u32) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.encode(&mut buf)?;
    encode::u64(&mut buf, offset)?;
    encode::u32(&mut buf, count)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<CommitResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let wcc = WccData::decode(&mut cursor)?;
    if let Some(e) = error::from_nfs3_status(status) {
        return Err(e);
    }
    let verifier = decode::u64(&mut cursor)?;
    Ok(CommitResult { wcc, verifier })
}
