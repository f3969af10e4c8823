//! `FSSTAT` (proc 18, RFC 1813 §3.3.18).

use crate::error::{self, Error};
use crate::nfs3::attr::decode_post_op_attr;
use crate::nfs3::{Fattr3, FileHandle3};
use crate::xdr::decode;
use std::io::Cursor;

pub struct FsStatResult {
    pub obj_attr: Option<Fattr3>,
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub available_bytes: u64,
    pub total_files: u64,
    pub free_files: u64,
    pub available_files: u64,
    pub invarsec: u32,
}

pub fn encode_args(file: &FileHandle3) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.encode(&mut buf)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<FsStatResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let obj_attr = decode_post_op_attr(&mut cursor)?;
    if status != 0 {
        return match error::from_nfs3_status(status) {
            Some(e) => Err(e),
            None => Ok(FsStatResult {
                obj_attr,
                total_bytes: 0,
                free_bytes: 0,
                available_bytes: 0,
                total_files: 0,
                free_files: 0,
                available_files: 0,
                invarsec: 0,
            }),
        };
    }
    let total_bytes = decode::u64(&mut cursor)?;
    let free_bytes = decode::u64(&mut cursor)?;
    let available_bytes = decode::u64(&mut cursor)?;
    let total_files = decode::u64(&mut cursor)?;
    let free_files = decode::u64(&mut cursor)?;
    let available_files = decode::u64(&mut cursor)?;
    let invarsec = decode::u32(&mut cursor)?;
    Ok(FsStatResult {
        obj_attr,
        total_bytes,
        free_bytes,
        available_bytes,
        total_files,
        free_files,
        available_files,
        invarsec,
    })
}
