//! `LINK` (proc 15, RFC 1813 §3.3.15).

use crate::error::{self, Error};
use crate::nfs3::{FileHandle3, WccData};
use crate::xdr::{decode, encode};
use std::io::Cursor;

pub struct LinkResult {
    pub file_attr: Option<crate::nfs3::Fattr3>,
    pub link_dir_wcc: WccData,
}

pub fn encode_args(file: &FileHandle3, link_dir: &FileHandle3, link_name: &str) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.encode(&mut buf)?;
    link_dir.encode(&mut buf)?;
    encode::string(&mut buf, link_name)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<LinkResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let file_attr = crate::nfs3::attr::decode_post_op_attr(&mut cursor)?;
    let link_dir_wcc = WccData::decode(&mut cursor)?;
    if let Some(e) = error::from_nfs3_status(status) {
        return Err(e);
    }
    Ok(LinkResult { file_attr, link_dir_wcc })
}
