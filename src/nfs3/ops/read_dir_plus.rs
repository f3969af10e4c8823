//! `READDIRPLUS` (proc 17, RFC 1813 §3.3.17).

use crate::error::{self, Error};
use crate::nfs3::attr::decode_post_op_attr;
use crate::nfs3::{Fattr3, FileHandle3, MAXNAMLEN};
use crate::xdr::{decode, encode};
use std::io::Cursor;

pub struct DirEntryPlus {
    pub fileid: u64,
    pub name: String,
    pub cookie: u64,
    pub name_attr: Option<Fattr3>,
    pub name_handle: Option<FileHandle3>,
}

pub struct ReadDirPlusResult {
    pub dir_attr: Option<Fattr3>,
    pub entries: Vec<DirEntryPlus>,
    pub eof: bool,
}

pub fn encode_args(
    dir: &FileHandle3,
    cookie: u64,
    cookie_verifier: u64,
    dir_count: u32,
    max_count: u32,
) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    dir.encode(&mut buf)?;
    encode::u64(&mut buf, cookie)?;
    encode::u64(&mut buf, cookie_verifier)?;
    encode::u32(&mut buf, dir_count)?;
    encode::u32(&mut buf, max_count)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<ReadDirPlusResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let dir_attr = decode_post_op_attr(&mut cursor)?;
    if status != 0 {
        return match error::from_nfs3_status(status) {
            Some(e) => Err(e),
            None => Ok(ReadDirPlusResult { dir_attr, entries: Vec::new(), eof: true }),
        };
    }
    let _cookie_verifier = decode::u64(&mut cursor)?;

    let mut entries = Vec::new();
    loop {
        if !decode::boolean(&mut cursor)? {
            break;
        }
        let fileid = decode::u64(&mut cursor)?;
        let name = decode::string(&mut cursor, MAXNAMLEN)?;
        let cookie = decode::u64(&mut cursor)?;
        let name_attr = decode_post_op_attr(&mut cursor)?;
        let name_handle = decode::option(&mut cursor, FileHandle3::decode)?;
        entries.push(DirEntryPlus { fileid, name, cookie, name_attr, name_handle });
    }
    let eof = decode::boolean(&mut cursor)?;
    Ok(ReadDirPlusResult { dir_attr, entries, eof })
}
