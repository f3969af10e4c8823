//! `RENAME` (proc 14, RFC 1813 §3.3.14).

use crate::error::{self, Error};
use crate::nfs3::{FileHandle3, WccData};
use crate::xdr::{decode, encode};
use std::io::Cursor;

pub struct RenameResult {
    pub from_dir_wcc: WccData,
    pub to_dir_wcc: WccData,
}

pub fn encode_args(
    from_dir: &FileHandle3,
    from_name: &str,
    to_dir: &FileHandle3,
    to_name: &str,
) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    from_dir.encode(&mut buf)?;
    encode::string(&mut buf, from_name)?;
    to_dir.encode(&mut buf)?;
    encode::string(&mut buf, to_name)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<RenameResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let from_dir_wcc = WccData::decode(&mut cursor)?;
    let to_dir_wcc = WccData::decode(&mut cursor)?;
    if let Some(e) = error::from_nfs3_status(status) {
        return Err(e);
    }
    Ok(RenameResult { from_dir_wcc, to_dir_wcc })
}
