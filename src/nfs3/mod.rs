//! NFSv3 file protocol client (RFC 1813, program 100003 version 3).
//!
//! Procedure numbers below are the canonical RFC 1813 §3.3 assignments.
//! Each procedure's argument/result wire layout lives in its own file under
//! [`ops`], one file per procedure; each file owns both directions (encode
//! the call, decode the reply) since a client only ever plays one side of
//! each exchange.

pub mod attr;
pub mod client;
pub mod ops;
pub mod path;

#[cfg(test)]
mod tests;

/// NFSv3 program number.
pub const PROGRAM: u32 = 100003;
/// NFSv3 protocol version this client speaks.
pub const VERSION: u32 = 3;

pub const NFSPROC3_NULL: u32 = 0;
pub const NFSPROC3_GETATTR: u32 = 1;
pub const NFSPROC3_SETATTR: u32 = 2;
pub const NFSPROC3_LOOKUP: u32 = 3;
pub const NFSPROC3_ACCESS: u32 = 4;
pub const NFSPROC3_READLINK: u32 = 5;
pub const NFSPROC3_READ: u32 = 6;
pub const NFSPROC3_WRITE: u32 = 7;
pub const NFSPROC3_CREATE: u32 = 8;
pub const NFSPROC3_MKDIR: u32 = 9;
pub const NFSPROC3_SYMLINK: u32 = 10;
pub const NFSPROC3_REMOVE: u32 = 12;
pub const NFSPROC3_RMDIR: u32 = 13;
pub const NFSPROC3_RENAME: u32 = 14;
pub const NFSPROC3_LINK: u32 = 15;
pub const NFSPROC3_READDIR: u32 = 16;
pub const NFSPROC3_READDIRPLUS: u32 = 17;
pub const NFSPROC3_FSSTAT: u32 = 18;
pub const NFSPROC3_FSINFO: u32 = 19;
pub const NFSPROC3_PATHCONF: u32 = 20;
pub const NFSPROC3_COMMIT: u32 = 21;

/// Maximum bytes in an NFSv3 file handle (RFC 1813 §2.3.3, `FHSIZE3`).
pub const FHSIZE3: usize = 64;
/// Maximum bytes in a path component (`MAXNAMLEN`).
pub const MAXNAMLEN: usize = 255;
/// Maximum bytes in a full path (`MAXPATHLEN`).
pub const MAXPATHLEN: usize = 1024;

pub use attr::{Fattr3, FileType3, Sattr3, SetTime, SpecData3, WccAttr, WccData};
pub use client::Nfs3Client;
pub use ops::access::AccessMask;
pub use ops::create::CreateMode;
pub use ops::write::StableHow;

/// Opaque NFSv3 file handle, ≤ [`FHSIZE3`] bytes. Never interpreted by this
/// client — only ever fed back into subsequent calls.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FileHandle3(pub Vec<u8>);

impl FileHandle3 {
    pub fn decode(src: &mut dyn std::io::Read) -> Result<Self, crate::error::Error> {
        Ok(FileHandle3(crate::xdr::decode::opaque_var(src, FHSIZE3)?))
    }

    pub fn encode(&self, dest: &mut dyn std::io::Write) -> std::io::Result<()> {
        crate::xdr::encode::opaque_var(dest, &self.0)
    }
}

impl std::fmt::Debug for FileHandle3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FileHandle3({} bytes)", self.0.len())
    }
}

impl From<crate::mount_client::FileHandle3> for FileHandle3 {
    fn from(fh: crate::mount_client::FileHandle3) -> Self {
        FileHandle3(fh.0)
    }
}
