//! `PATHCONF` (proc 20, RFC 1813 §3.3.20).

use crate::error::{self, Error};
use crate::nfs3::attr::decode_post_op_attr;
use crate::nfs3::{Fattr3, FileHandle3};
use crate::xdr::decode;
use std::io::Cursor;

pub struct PathConfResult {
    pub obj_attr: Option<Fattr3>,
    pub linkmax: u32,
    pub name_max: u32,
    pub no_trunc: bool,
    pub chown_restricted: bool,
    pub case_insensitive: bool,
    pub case_preserving: bool,
}

pub fn encode_args(file: &FileHandle3) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.encode(&mut buf)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<PathConfResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let obj_attr = decode_post_op_attr(&mut cursor)?;
    if let Some(e) = error::from_nfs3_status(status) {
        return Err(e);
    }
    let linkmax = decode::u32(&mut cursor)?;
    let name_max = decode::u32(&mut cursor)?;
    let no_trunc = decode::boolean(&mut cursor)?;
    let chown_restricted = decode::boolean(&mut cursor)?;
    let case_insensitive = decode::boolean(&mut cursor)?;
    let case_preserving = decode::boolean(&mut cursor)?;
    Ok(PathConfResult {
        obj_attr,
        linkmax,
        name_max,
        no_trunc,
        chown_restricted,
        case_insensitive,
        case_preserving,
    })
}
