//! Thin per-procedure RPC driver for the NFSv3 file protocol.
//!
//! [`Nfs3Client`] owns one [`RpcClient`] connected to the NFS server's
//! `nfs` program (distinct from the MOUNT program's connection) and
//! negotiates an effective block size from `FSINFO` on first use so callers
//! never have to think about transfer chunking themselves.

use super::ops::{
    access, commit, create, fs_info, fs_stat, get_attr, link, lookup, mkdir, path_conf, read,
    read_dir, read_dir_plus, read_link, remove, rename, rmdir, set_attr, symlink, write,
};
use super::*;
use crate::error::Error;
use crate::rpc::auth::Credential;
use crate::rpc::client::RpcClient;
use std::net::SocketAddr;

/// A connected NFSv3 file-protocol client plus the effective I/O block
/// size negotiated from the server's `FSINFO`.
pub struct Nfs3Client {
    rpc: RpcClient,
    block_size: u32,
}

impl Nfs3Client {
    pub async fn connect(
        addr: SocketAddr,
        use_secure_port: bool,
        credential: Credential,
    ) -> Result<Self, Error> {
        let rpc = RpcClient::connect_tcp(addr, use_secure_port, credential).await?;
        Ok(Nfs3Client { rpc, block_size: 64 * 1024 })
    }

    async fn call(&mut self, proc: u32, args: Vec<u8>) -> Result<Vec<u8>, Error> {
        self.rpc.call(PROGRAM, VERSION, proc, &args).await
    }

    pub async fn null(&mut self) -> Result<(), Error> {
        self.call(NFSPROC3_NULL, Vec::new()).await?;
        Ok(())
    }

    /// Fetches `FSINFO` for `root` and caches `min(rtmax, wtmax, 65536)` as
    /// the effective block size for subsequent chunked `read_file`/
    /// `write_file` calls.
    pub async fn negotiate(&mut self, root: &FileHandle3) -> Result<fs_info::FsInfoResult, Error> {
        let args = fs_info::encode_args(root).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_FSINFO, args).await?;
        let info = fs_info::decode_result(reply)?;
        self.block_size = info.rtmax.min(info.wtmax).min(65536).max(4096);
        Ok(info)
    }

    pub async fn get_attr(&mut self, file: &FileHandle3) -> Result<Fattr3, Error> {
        let args = get_attr::encode_args(file).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_GETATTR, args).await?;
        get_attr::decode_result(reply)
    }

    pub async fn set_attr(&mut self, file: &FileHandle3, attr: &Sattr3) -> Result<WccData, Error> {
        let args = set_attr::encode_args(file, attr).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_SETATTR, args).await?;
        set_attr::decode_result(reply)
    }

    pub async fn lookup(
        &mut self,
        dir: &FileHandle3,
        name: &str,
    ) -> Result<lookup::LookupResult, Error> {
        let args = lookup::encode_args(dir, name).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_LOOKUP, args).await?;
        lookup::decode_result(reply)
    }

    pub async fn access(
        &mut self,
        file: &FileHandle3,
        desired: access::AccessMask,
    ) -> Result<access::AccessResult, Error> {
        let args = access::encode_args(file, desired).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_ACCESS, args).await?;
        access::decode_result(reply)
    }

    pub async fn read_link(
        &mut self,
        file: &FileHandle3,
    ) -> Result<read_link::ReadLinkResult, Error> {
        let args = read_link::encode_args(file).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_READLINK, args).await?;
        read_link::decode_result(reply)
    }

    /// Reads `count` bytes at `offset`, clamped to the negotiated block size.
    pub async fn read(
        &mut self,
        file: &FileHandle3,
        offset: u64,
        count: u32,
    ) -> Result<read::ReadResult, Error> {
        let count = count.min(self.block_size);
        let args = read::encode_args(file, offset, count).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_READ, args).await?;
        read::decode_result(reply, self.block_size as usize)
    }

    /// Reads the whole file by issuing chunked `READ` calls until EOF.
    pub async fn read_file(&mut self, file: &FileHandle3) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        let mut offset = 0u64;
        loop {
            let chunk = self.read(file, offset, self.block_size).await?;
            let n = chunk.data.len();
            out.extend_from_slice(&chunk.data);
            offset += n as u64;
            if chunk.eof || n == 0 {
                break;
            }
        }
        Ok(out)
    }

    /// Writes `data` at `offset`, clamped to the negotiated block size the
    /// same way `read` clamps its `count` — callers that need to write more
    /// than one block should use [`Self::write_file`] instead.
    pub async fn write(
        &mut self,
        file: &FileHandle3,
        offset: u64,
        stable: write::StableHow,
        data: &[u8],
    ) -> Result<write::WriteResult, Error> {
        let data = &data[..data.len().min(self.block_size as usize)];
        let args = write::encode_args(file, offset, stable, data).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_WRITE, args).await?;
        write::decode_result(reply)
    }

    /// Writes the whole buffer by issuing chunked `WRITE` calls sized to
    /// the negotiated block size, each `FILE_SYNC` so no trailing `COMMIT`
    /// is required.
    pub async fn write_file(&mut self, file: &FileHandle3, data: &[u8]) -> Result<(), Error> {
        let mut offset = 0u64;
        for chunk in data.chunks(self.block_size.max(1) as usize) {
            self.write(file, offset, write::StableHow::FileSync, chunk).await?;
            offset += chunk.len() as u64;
        }
        Ok(())
    }

    pub async fn create(
        &mut self,
        dir: &FileHandle3,
        name: &str,
        mode: &create::CreateMode,
    ) -> Result<create::CreateResult, Error> {
        let args = create::encode_args(dir, name, mode).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_CREATE, args).await?;
        create::decode_result(reply)
    }

    pub async fn mkdir(
        &mut self,
        dir: &FileHandle3,
        name: &str,
        attr: &Sattr3,
    ) -> Result<mkdir::MkdirResult, Error> {
        let args = mkdir::encode_args(dir, name, attr).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_MKDIR, args).await?;
        mkdir::decode_result(reply)
    }

    pub async fn symlink(
        &mut self,
        dir: &FileHandle3,
        name: &str,
        attr: &Sattr3,
        target: &str,
    ) -> Result<symlink::SymlinkResult, Error> {
        let args = symlink::encode_args(dir, name, attr, target).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_SYMLINK, args).await?;
        symlink::decode_result(reply)
    }

    pub async fn remove(&mut self, dir: &FileHandle3, name: &str) -> Result<WccData, Error> {
        let args = remove::encode_args(dir, name).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_REMOVE, args).await?;
        remove::decode_result(reply)
    }

    pub async fn rmdir(&mut self, dir: &FileHandle3, name: &str) -> Result<WccData, Error> {
        let args = rmdir::encode_args(dir, name).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_RMDIR, args).await?;
        rmdir::decode_result(reply)
    }

    pub async fn rename(
        &mut self,
        from_dir: &FileHandle3,
        from_name: &str,
        to_dir: &FileHandle3,
        to_name: &str,
    ) -> Result<rename::RenameResult, Error> {
        let args =
            rename::encode_args(from_dir, from_name, to_dir, to_name).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_RENAME, args).await?;
        rename::decode_result(reply)
    }

    pub async fn link(
        &mut self,
        file: &FileHandle3,
        link_dir: &FileHandle3,
        link_name: &str,
    ) -> Result<link::LinkResult, Error> {
        let args = link::encode_args(file, link_dir, link_name).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_LINK, args).await?;
        link::decode_result(reply)
    }

    pub async fn read_dir(
        &mut self,
        dir: &FileHandle3,
        cookie: u64,
        cookie_verifier: u64,
        count: u32,
    ) -> Result<read_dir::ReadDirResult, Error> {
        let args =
            read_dir::encode_args(dir, cookie, cookie_verifier, count).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_READDIR, args).await?;
        read_dir::decode_result(reply)
    }

    pub async fn read_dir_plus(
        &mut self,
        dir: &FileHandle3,
        cookie: u64,
        cookie_verifier: u64,
        dir_count: u32,
        max_count: u32,
    ) -> Result<read_dir_plus::ReadDirPlusResult, Error> {
        let args = read_dir_plus::encode_args(dir, cookie, cookie_verifier, dir_count, max_count)
            .map_err(Error::from)?;
        let reply = self.call(NFSPROC3_READDIRPLUS, args).await?;
        read_dir_plus::decode_result(reply)
    }

    /// Lists an entire directory by driving `READDIR` to `eof`.
    pub async fn list_dir(&mut self, dir: &FileHandle3) -> Result<Vec<read_dir::DirEntry>, Error> {
        let mut out = Vec::new();
        let mut cookie = 0u64;
        let mut verifier = 0u64;
        loop {
            let page = self.read_dir(dir, cookie, verifier, 8192).await?;
            if page.entries.is_empty() {
                break;
            }
            cookie = page.entries.last().unwrap().cookie;
            verifier = page.cookie_verifier;
            out.extend(page.entries);
            if page.eof {
                break;
            }
        }
        Ok(out)
    }

    pub async fn fs_stat(&mut self, root: &FileHandle3) -> Result<fs_stat::FsStatResult, Error> {
        let args = fs_stat::encode_args(root).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_FSSTAT, args).await?;
        fs_stat::decode_result(reply)
    }

    pub async fn fs_info(&mut self, root: &FileHandle3) -> Result<fs_info::FsInfoResult, Error> {
        self.negotiate(root).await
    }

    pub async fn path_conf(
        &mut self,
        file: &FileHandle3,
    ) -> Result<path_conf::PathConfResult, Error> {
        let args = path_conf::encode_args(file).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_PATHCONF, args).await?;
        path_conf::decode_result(reply)
    }

    pub async fn commit(
        &mut self,
        file: &FileHandle3,
        offset: u64,
        count: u32,
    ) -> Result<commit::CommitResult, Error> {
        let args = commit::encode_args(file, offset, count).map_err(Error::from)?;
        let reply = self.call(NFSPROC3_COMMIT, args).await?;
        commit::decode_result(reply)
    }
}
