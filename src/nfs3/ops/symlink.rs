//! `SYMLINK` (proc 10, RFC 1813 §3.3.10).

use crate::error::{self, Error};
use crate::nfs3::attr::decode_post_op_attr;
use crate::nfs3::{Fattr3, FileHandle3, Sattr3, WccData};
use crate::xdr::{decode, encode};
use std::io::Cursor;

pub struct SymlinkResult {
    pub file: Option<FileHandle3>,
    pub object_attr: Option<Fattr3>,
    pub dir_wcc: WccData,
}

pub fn encode_args(
    dir: &FileHandle3,
    name: &str,
    attr: &Sattr3,
    target: &str,
) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    dir.encode(&mut buf)?;
    encode::string(&mut buf, name)?;
    attr.encode(&mut buf)?;
    encode::string(&mut buf, target)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<SymlinkResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    if status != 0 {
        let dir_wcc = WccData::decode(&mut cursor)?;
        return match error::from_nfs3_status(status) {
            Some(e) => Err(e),
            None => Ok(SymlinkResult { file: None, object_attr: None, dir_wcc }),
        };
    }
    let file = decode::option(&mut cursor, FileHandle3::decode)?;
    let object_attr = decode_post_op_attr(&mut cursor)?;
    let dir_wcc = WccData::decode(&mut cursor)?;
    Ok(SymlinkResult { file, object_attr, dir_wcc })
}
