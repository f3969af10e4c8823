//! `LOOKUP` (proc 3, RFC 1813 §3.3.3): resolves one path component.

use crate::error::{self, Error};
use crate::nfs3::attr::decode_post_op_attr;
use crate::nfs3::{Fattr3, FileHandle3};
use crate::xdr::{decode, encode};
use std::io::Cursor;

pub struct LookupResult {
    pub file: FileHandle3,
    pub object_attr: Option<Fattr3>,
    pub directory_attr: Option<Fattr3>,
}

pub fn encode_args(dir: &FileHandle3, name: &str) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    dir.encode(&mut buf)?;
    encode::string(&mut buf, name)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<LookupResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    if status != 0 {
        let directory_attr = decode_post_op_attr(&mut cursor)?;
        return match error::from_nfs3_status(status) {
            Some(e) => Err(e),
            None => Ok(LookupResult {
                file: FileHandle3(Vec::new()),
                object_attr: None,
                directory_attr,
            }),
        };
    }
    let file = FileHandle3::decode(&mut cursor)?;
    let object_attr = decode_post_op_attr(&mut cursor)?;
    let directory_attr = decode_post_op_attr(&mut cursor)?;
    Ok(LookupResult { file, object_attr, directory_attr })
}
