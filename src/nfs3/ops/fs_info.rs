//! `FSINFO` (proc 19, RFC 1813 §3.3.19).
//!
//! [`crate::nfs3::client::Nfs3Client`] uses `wtmax`/`rtmax` from this result
//! to negotiate the chunk size for `READ`/`WRITE` loops, per the ambient
//! "block size negotiation" requirement.

use crate::error::{self, Error};
use crate::nfs3::attr::decode_post_op_attr;
use crate::nfs3::{Fattr3, FileHandle3};
use crate::xdr::decode;
use std::io::Cursor;

pub struct FsInfoResult {
    pub obj_attr: Option<Fattr3>,
    pub rtmax: u32,
    pub rtpref: u32,
    pub rtmult: u32,
    pub wtmax: u32,
    pub wtpref: u32,
    pub wtmult: u32,
    pub dtpref: u32,
    pub maxfilesize: u64,
    pub time_delta_seconds: u32,
    pub time_delta_nseconds: u32,
    pub properties: u32,
}

pub fn encode_args(file: &FileHandle3) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.encode(&mut buf)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<FsInfoResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let obj_attr = decode_post_op_attr(&mut cursor)?;
    if let Some(e) = error::from_nfs3_status(status) {
        return Err(e);
    }
    let rtmax = decode::u32(&mut cursor)?;
    let rtpref = decode::u32(&mut cursor)?;
    let rtmult = decode::u32(&mut cursor)?;
    let wtmax = decode::u32(&mut cursor)?;
    let wtpref = decode::u32(&mut cursor)?;
    let wtmult = decode::u32(&mut cursor)?;
    let dtpref = decode::u32(&mut cursor)?;
    let maxfilesize = decode::u64(&mut cursor)?;
    let time_delta_seconds = decode::u32(&mut cursor)?;
    let time_delta_nseconds = decode::u32(&mut cursor)?;
    let properties = decode::u32(&mut cursor)?;
    Ok(FsInfoResult {
        obj_attr,
        rtmax,
        rtpref,
        rtmult,
        wtmax,
        wtpref,
        wtmult,
        dtpref,
        maxfilesize,
        time_delta_seconds,
        time_delta_nseconds,
        properties,
    })
}
