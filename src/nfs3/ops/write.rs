//! `WRITE` (proc 7, RFC 1813 §3.3.7).

use crate::error::{self, Error};
use crate::nfs3::{FileHandle3, WccData};
use crate::xdr::{decode, encode};
use std::io::Cursor;

/// `stable_how`: durability the caller requests for this write.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StableHow {
    Unstable,
    DataSync,
    FileSync,
}

impl StableHow {
    fn to_wire(self) -> u32 {
        match self {
            StableHow::Unstable => 0,
            StableHow::DataSync => 1,
            StableHow::FileSync => 2,
        }
    }

    fn from_wire(v: u32) -> Result<Self, Error> {
        Ok(match v {
            0 => StableHow::Unstable,
            1 => StableHow::DataSync,
            2 => StableHow::FileSync,
            _ => return Err(Error::CodecFailed("unknown stable_how discriminant")),
        })
    }
}

pub struct WriteResult {
    pub count: u32,
    pub committed: StableHow,
    pub verifier: u64,
    pub wcc: WccData,
}

pub fn encode_args(
    file: &FileHandle3,
    offset: u64,
    stable: StableHow,
    data: &[u8],
) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.encode(&mut buf)?;
    encode::u64(&mut buf, offset)?;
    encode::u32(&mut buf, data.len() as u32)?;
    encode::u32(&mut buf, stable.to_wire())?;
    encode::opaque_var(&mut buf, data)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<WriteResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let wcc = WccData::decode(&mut cursor)?;
    if let Some(e) = error::from_nfs3_status(status) {
        return Err(e);
    }
    let count = decode::u32(&mut cursor)?;
    let committed = StableHow::from_wire(decode::u32(&mut cursor)?)?;
    let verifier = decode::u64(&mut cursor)?;
    Ok(WriteResult { count, committed, verifier, wcc })
}
