//! `CREATE` (proc 8, RFC 1813 §3.3.8).

use crate::error::{self, Error};
use crate::nfs3::attr::decode_post_op_attr;
use crate::nfs3::{Fattr3, FileHandle3, Sattr3, WccData};
use crate::xdr::{decode, encode};
use std::io::Cursor;

/// `createmode3`: how `CREATE` should behave if the name already exists.
#[derive(Debug, Clone)]
pub enum CreateMode {
    Unchecked(Sattr3),
    Guarded(Sattr3),
    Exclusive(u64),
}

impl CreateMode {
    fn encode(&self, dest: &mut dyn std::io::Write) -> std::io::Result<()> {
        match self {
            CreateMode::Unchecked(attr) => {
                encode::u32(dest, 0)?;
                attr.encode(dest)
            }
            CreateMode::Guarded(attr) => {
                encode::u32(dest, 1)?;
                attr.encode(dest)
            }
            CreateMode::Exclusive(verifier) => {
                encode::u32(dest, 2)?;
                encode::u64(dest, *verifier)
            }
        }
    }
}

pub struct CreateResult {
    pub file: Option<FileHandle3>,
    pub object_attr: Option<Fattr3>,
    pub dir_wcc: WccData,
}

pub fn encode_args(dir: &FileHandle3, name: &str, mode: &CreateMode) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    dir.encode(&mut buf)?;
    encode::string(&mut buf, name)?;
    mode.encode(&mut buf)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<CreateResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    if status != 0 {
        let dir_wcc = WccData::decode(&mut cursor)?;
        return match error::from_nfs3_status(status) {
            Some(e) => Err(e),
            None => Ok(CreateResult { file: None, object_attr: None, dir_wcc }),
        };
    }
    let file = decode::option(&mut cursor, FileHandle3::decode)?;
    let object_attr = decode_post_op_attr(&mut cursor)?;
    let dir_wcc = WccData::decode(&mut cursor)?;
    Ok(CreateResult { file, object_attr, dir_wcc })
}
