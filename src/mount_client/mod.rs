//! NFSv3 MOUNT protocol client (RFC 1813 §5, program 100005 version 3).

#[cfg(test)]
mod tests;

use crate::error::Error;
use crate::rpc::auth::Credential;
use crate::rpc::client::RpcClient;
use crate::xdr::{decode, encode};
use std::net::SocketAddr;

/// MOUNT program number.
pub const PROGRAM: u32 = 100005;
/// MOUNT protocol version this client speaks.
pub const VERSION: u32 = 3;

const PROC_NULL: u32 = 0;
const PROC_MNT: u32 = 1;
const PROC_UMNT: u32 = 3;
const PROC_UMNTALL: u32 = 4;
const PROC_EXPORT: u32 = 5;

/// Maximum bytes in a `dirpath` argument (RFC 1813 §5.1).
pub const MNTPATHLEN: usize = 1024;
/// Maximum bytes in an NFSv3 file handle.
pub const FHSIZE3: usize = 64;

/// Opaque NFSv3 file handle, ≤ [`FHSIZE3`] bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct FileHandle3(pub Vec<u8>);

impl FileHandle3 {
    fn decode(src: &mut dyn std::io::Read) -> Result<Self, Error> {
        Ok(FileHandle3(decode::opaque_var(src, FHSIZE3)?))
    }
}

impl std::fmt::Debug for FileHandle3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FileHandle3({} bytes)", self.0.len())
    }
}

/// Export entry returned by `EXPORT(5)`.
#[derive(Debug, Clone)]
pub struct ExportEntry {
    pub directory: String,
    pub groups: Vec<String>,
}

/// Successful `MNT(1)` result.
pub struct MountResult {
    pub file_handle: FileHandle3,
    pub auth_flavors: Vec<u32>,
}

/// A connected MOUNT client. Always over TCP in this crate (RFC 1813's
/// socket-choice table only requires TCP for the mount step).
pub struct MountClient {
    rpc: RpcClient,
}

impl MountClient {
    pub async fn connect(
        addr: SocketAddr,
        use_secure_port: bool,
        credential: Credential,
    ) -> Result<Self, Error> {
        let rpc = RpcClient::connect_tcp(addr, use_secure_port, credential).await?;
        Ok(MountClient { rpc })
    }

    pub async fn null(&mut self) -> Result<(), Error> {
        self.rpc.call(PROGRAM, VERSION, PROC_NULL, &[]).await?;
        Ok(())
    }

    /// `MNT(1)`: mounts `dirpath`, returning the root file handle.
    pub async fn mnt(&mut self, dirpath: &str) -> Result<MountResult, Error> {
        let mut args = Vec::new();
        encode::string(&mut args, dirpath)?;

        let reply = self.rpc.call(PROGRAM, VERSION, PROC_MNT, &args).await?;
        let mut cursor = std::io::Cursor::new(reply);
        let status = decode::u32(&mut cursor)?;
        if status != 0 {
            return Err(Error::MountFailed(status));
        }
        let file_handle = FileHandle3::decode(&mut cursor)?;
        let auth_flavors = decode::array(&mut cursor, 16, |r| decode::u32(r))?;
        Ok(MountResult { file_handle, auth_flavors })
    }

    /// `UMNT(3)`: unmounts `dirpath`. No reply body beyond the RPC header.
    pub async fn umnt(&mut self, dirpath: &str) -> Result<(), Error> {
        let mut args = Vec::new();
        encode::string(&mut args, dirpath)?;
        self.rpc.call(PROGRAM, VERSION, PROC_UMNT, &args).await?;
        Ok(())
    }

    /// `UMNTALL(4)`: unmounts every directory this client previously mounted.
    pub async fn umnt_all(&mut self) -> Result<(), Error> {
        self.rpc.call(PROGRAM, VERSION, PROC_UMNTALL, &[]).await?;
        Ok(())
    }

    /// `EXPORT(5)`: lists the server's exported directories. The wire form
    /// is a linked list terminated by a present-flag of `false`; this
    /// flattens it into a `Vec`.
    pub async fn export(&mut self) -> Result<Vec<ExportEntry>, Error> {
        let reply = self.rpc.call(PROGRAM, VERSION, PROC_EXPORT, &[]).await?;
        let mut cursor = std::io::Cursor::new(reply);

        let mut entries = Vec::new();
        while decode::boolean(&mut cursor)? {
            let directory = decode::string(&mut cursor, MNTPATHLEN)?;
            let mut groups = Vec::new();
            while decode::boolean(&mut cursor)? {
                groups.push(decode::string(&mut cursor, 255)?);
            }
            entries.push(ExportEntry { directory, groups });
        }
        Ok(entries)
    }
}
