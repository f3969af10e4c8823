//! `READDIR` (proc 16, RFC 1813 §3.3.16).

use crate::error::{self, Error};
use crate::nfs3::attr::decode_post_op_attr;
use crate::nfs3::{Fattr3, MAXNAMLEN};
use crate::xdr::{decode, encode};
use std::io::Cursor;

pub struct DirEntry {
    pub fileid: u64,
    pub name: String,
    pub cookie: u64,
}

pub struct ReadDirResult {
    pub dir_attr: Option<Fattr3>,
    pub cookie_verifier: u64,
    pub entries: Vec<DirEntry>,
    pub eof: bool,
}

pub fn encode_args(
    dir: &crate::nfs3::FileHandle3,
    cookie: u64,
    cookie_verifier: u64,
    count: u32,
) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    dir.encode(&mut buf)?;
    encode::u64(&mut buf, cookie)?;
    encode::u64(&mut buf, cookie_verifier)?;
    encode::u32(&mut buf, count)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<ReadDirResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let dir_attr = decode_post_op_attr(&mut cursor)?;
    if status != 0 {
        return match error::from_nfs3_status(status) {
            Some(e) => Err(e),
            None => Ok(ReadDirResult {
                dir_attr,
                cookie_verifier: 0,
                entries: Vec::new(),
                eof: true,
            }),
        };
    }
    let cookie_verifier = decode::u64(&mut cursor)?;

    let mut entries = Vec::new();
    loop {
        if !decode::boolean(&mut cursor)? {
            break;
        }
        let fileid = decode::u64(&mut cursor)?;
        let name = decode::string(&mut cursor, MAXNAMLEN)?;
        let cookie = decode::u64(&mut cursor)?;
        entries.push(DirEntry { fileid, name, cookie });
    }
    let eof = decode::boolean(&mut cursor)?;
    Ok(ReadDirResult { dir_attr, cookie_verifier, entries, eof })
}
