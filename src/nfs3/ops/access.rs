//! `ACCESS` (proc 4, RFC 1813 §3.3.4): bitmask of desired/granted rights.

use crate::error::{self, Error};
use crate::nfs3::attr::decode_post_op_attr;
use crate::nfs3::{Fattr3, FileHandle3};
use crate::xdr::decode;
use std::io::Cursor;

pub const ACCESS_READ: u32 = 0x0001;
pub const ACCESS_LOOKUP: u32 = 0x0002;
pub const ACCESS_MODIFY: u32 = 0x0004;
pub const ACCESS_EXTEND: u32 = 0x0008;
pub const ACCESS_DELETE: u32 = 0x0010;
pub const ACCESS_EXECUTE: u32 = 0x0020;

/// Typed bitmask of desired/granted access rights (RFC 1813 §3.3.4),
/// named constants over RFC 1813's bare bitmask.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AccessMask(pub u32);

impl AccessMask {
    pub const ALL: AccessMask = AccessMask(
        ACCESS_READ | ACCESS_LOOKUP | ACCESS_MODIFY | ACCESS_EXTEND | ACCESS_DELETE | ACCESS_EXECUTE,
    );

    pub fn contains(self, bit: u32) -> bool {
        self.0 & bit != 0
    }
}

pub struct AccessResult {
    pub granted: AccessMask,
    pub object_attr: Option<Fattr3>,
}

pub fn encode_args(file: &FileHandle3, desired: AccessMask) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    file.encode(&mut buf)?;
    crate::xdr::encode::u32(&mut buf, desired.0)?;
    Ok(buf)
}

pub fn decode_result(reply: Vec<u8>) -> Result<AccessResult, Error> {
    let mut cursor = Cursor::new(reply);
    let status = decode::u32(&mut cursor)?;
    let object_attr = decode_post_op_attr(&mut cursor)?;
    if status != 0 {
        return match error::from_nfs3_status(status) {
            Some(e) => Err(e),
            None => Ok(AccessResult { granted: AccessMask(0), object_attr }),
        };
    }
    let granted = AccessMask(decode::u32(&mut cursor)?);
    Ok(AccessResult { granted, object_attr })
}
