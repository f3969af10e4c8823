//! `READLINK` (proc 5, RFC 1813 §3.3.5).

use crate::error::{self, Error};
use crate::nfs3::attr::decode_post_op_attr;
use crate::nfs3::{Fattr3, FileHandle3, MAXPATHLEN};
use crate::xdr::decode;
use std::io::Cursor;

pub struct ReadLinkResult {
    pub target: String,
    pub symlink_attr: Option<Fattr3>,
}

pub fn encode_args(file: &FileHandle3) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.encode(&mut buf)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<ReadLinkResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let symlink_attr = decode_post_op_attr(&mut cursor)?;
    if status != 0 {
        return match error::from_nfs3_status(status) {
            Some(e) => Err(e),
            None => Ok(ReadLinkResult { target: String::new(), symlink_attr }),
        };
    }
    let target = decode::string(&mut cursor, MAXPATHLEN)?;
    Ok(ReadLinkResult { target, symlink_attr })
}
