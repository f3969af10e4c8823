//! `READ` (proc 6, RFC 1813 §3.3.6).

use crate::error::{self, Error};
use crate::nfs3::attr::decode_post_op_attr;
use crate::nfs3::{Fattr3, FileHandle3};
use crate::xdr::{decode, encode};
use std::io::Cursor;

pub struct ReadResult {
    pub data: Vec<u8>,
    pub eof: bool,
    pub file_attr: Option<Fattr3>,
}

pub fn encode_args(file: &FileHandle3, offset: u64, count: u32) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.encode(&mut buf)?;
    encode::u64(&mut buf, offset)?;
    encode::u32(&mut buf, count)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>, max_count: usize) -> Result<ReadResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let file_attr = decode_post_op_attr(&mut cursor)?;
    if status != 0 {
        return match error::from_nfs3_status(status) {
            Some(e) => Err(e),
            None => Ok(ReadResult { data: Vec::new(), eof: false, file_attr }),
        };
    }
    let _count = decode::u32(&mut cursor)?;
    let eof = decode::boolean(&mut cursor)?;
    let data = decode::opaque_var(&mut cursor, max_count)?;
    Ok(ReadResult { data, eof, file_attr })
}
