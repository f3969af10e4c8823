//! The NFSv3 half of [`super::NfsClient`]: a MOUNT connection bound to one
//! exported directory plus the file-protocol connection negotiated against
//! it, behind the path-based operations the façade exposes uniformly.

use super::attrs::Attributes;
use super::options::ConnectOptions;
use crate::error::Error;
use crate::mount_client::MountClient;
use crate::nfs3::ops::create::CreateMode;
use crate::nfs3::{path, FileHandle3, FileType3, Nfs3Client, Sattr3, StableHow};
use crate::portmap::{PortmapClient, Protocol};
use crate::rpc::auth::Credential;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

/// Fallback port used when the portmapper has no registration for mountd —
/// many v3 servers fix this historical port rather than registering it.
const DEFAULT_MOUNT_PORT: u16 = 635;
/// Fallback port for nfsd, same reasoning.
const DEFAULT_NFS_PORT: u16 = 2049;

/// Resolves `program`/`version` to a port: the caller's fixed value if
/// non-zero, otherwise a portmapper `GETPORT` (querying for the target
/// service's own transport, TCP, since MOUNT and NFS connections are always
/// TCP — the portmap RPC itself travels over UDP regardless),
/// falling back to the historical default if unregistered.
async fn resolve_port(
    server: IpAddr,
    program: u32,
    version: u32,
    fixed_port: u16,
    fallback: u16,
    use_secure_port: bool,
) -> Result<u16, Error> {
    if fixed_port != 0 {
        return Ok(fixed_port);
    }
    let pmap_addr = SocketAddr::new(server, crate::portmap::PORT);
    let mut pmap = PortmapClient::connect_udp(pmap_addr, use_secure_port).await?;
    match pmap.get_port(program, version, Protocol::Tcp).await? {
        Some(port) => Ok(port),
        None => {
            debug!(program, version, fallback, "portmapper has no registration, using fallback port");
            Ok(fallback)
        }
    }
}

/// A mounted NFSv3 export: the MOUNT connection that produced the root
/// handle, the file-protocol connection negotiated against it, and the
/// export path (needed again at `UMNT` time).
pub struct V3Engine {
    mount: MountClient,
    nfs: Nfs3Client,
    root: FileHandle3,
    export: String,
}

impl V3Engine {
    /// Resolves the MOUNT port, connects, issues `MNT(export)`, resolves the
    /// NFS port, connects the file-protocol client and negotiates `FSINFO`
    /// for the transfer block size.
    pub async fn connect(
        server: IpAddr,
        export: &str,
        options: &ConnectOptions,
        credential: Credential,
    ) -> Result<Self, Error> {
        let mount_port = resolve_port(
            server,
            crate::mount_client::PROGRAM,
            crate::mount_client::VERSION,
            options.mount_port,
            DEFAULT_MOUNT_PORT,
            options.use_secure_port,
        )
        .await?;
        let mut mount = MountClient::connect(
            SocketAddr::new(server, mount_port),
            options.use_secure_port,
            credential.clone(),
        )
        .await?;
        let mnt_result = mount.mnt(export).await?;
        let root = FileHandle3::from(mnt_result.file_handle);

        let nfs_port = resolve_port(
            server,
            crate::nfs3::PROGRAM,
            crate::nfs3::VERSION,
            options.nfs_port,
            DEFAULT_NFS_PORT,
            options.use_secure_port,
        )
        .await?;
        let mut nfs = Nfs3Client::connect(
            SocketAddr::new(server, nfs_port),
            options.use_secure_port,
            credential,
        )
        .await?;
        nfs.negotiate(&root).await?;

        Ok(V3Engine { mount, nfs, root, export: export.to_string() })
    }

    /// Standalone `EXPORT` listing against a MOUNT connection that is never
    /// turned into a mount — used by `get_exported_devices` before any
    /// `mount_device` call.
    pub async fn list_exports(
        server: IpAddr,
        options: &ConnectOptions,
        credential: Credential,
    ) -> Result<Vec<String>, Error> {
        let mount_port = resolve_port(
            server,
            crate::mount_client::PROGRAM,
            crate::mount_client::VERSION,
            options.mount_port,
            DEFAULT_MOUNT_PORT,
            options.use_secure_port,
        )
        .await?;
        let mut mount = MountClient::connect(
            SocketAddr::new(server, mount_port),
            options.use_secure_port,
            credential,
        )
        .await?;
        let entries = mount.export().await?;
        Ok(entries.into_iter().map(|e| e.directory).collect())
    }

    /// `UMNT(export)`: on disconnect, close the socket and issue `UMNT` to
    /// the mount service.
    pub async fn disconnect(mut self) -> Result<(), Error> {
        self.mount.umnt(&self.export).await
    }

    /// Harmless `EXPORT` call, used as the pool's health probe.
    pub async fn health_ping(&mut self) -> Result<(), Error> {
        self.mount.export().await?;
        Ok(())
    }

    async fn resolve(&mut self, path: &str) -> Result<FileHandle3, Error> {
        if path.is_empty() || path == "." {
            return Ok(self.root.clone());
        }
        path::resolve(&mut self.nfs, &self.root, &normalize(path)).await
    }

    /// As [`Self::resolve`], but consults `cache` for the whole path first —
    /// a full-path hit avoids every `LOOKUP` this walk would otherwise issue.
    async fn resolve_cached(
        &mut self,
        path: &str,
        cache: Option<&crate::cache::HandleCache>,
    ) -> Result<FileHandle3, Error> {
        if path.is_empty() || path == "." {
            return Ok(self.root.clone());
        }
        if let Some(cache) = cache {
            if let Some((handle, _)) = cache.get(path) {
                return Ok(FileHandle3(handle));
            }
        }
        self.resolve(path).await
    }

    async fn resolve_parent(&mut self, path: &str) -> Result<(FileHandle3, String), Error> {
        let normalized = normalize(path);
        let (dir, name) = path::resolve_parent(&mut self.nfs, &self.root, &normalized).await?;
        Ok((dir, name.to_string()))
    }

    /// Returns both the resolved handle's raw bytes and its attributes, so
    /// the façade can populate the cache without issuing a second lookup.
    pub async fn get_attributes(
        &mut self,
        path: &str,
        cache: Option<&crate::cache::HandleCache>,
    ) -> Result<(Vec<u8>, Attributes), Error> {
        let handle = self.resolve_cached(path, cache).await?;
        let attr = self.nfs.get_attr(&handle).await?;
        Ok((handle.0, Attributes::from_v3(&attr)))
    }

    /// Entry names of a directory, `.`/`..` included exactly as returned by
    /// the server.
    pub async fn list_dir(
        &mut self,
        path: &str,
        cache: Option<&crate::cache::HandleCache>,
    ) -> Result<Vec<String>, Error> {
        let handle = self.resolve_cached(path, cache).await?;
        let entries = self.nfs.list_dir(&handle).await?;
        Ok(entries.into_iter().map(|e| e.name).collect())
    }

    pub async fn is_directory(
        &mut self,
        path: &str,
        cache: Option<&crate::cache::HandleCache>,
    ) -> Result<bool, Error> {
        let handle = self.resolve_cached(path, cache).await?;
        let attr = self.nfs.get_attr(&handle).await?;
        Ok(attr.file_type == FileType3::Directory)
    }

    pub async fn file_exists(
        &mut self,
        path: &str,
        cache: Option<&crate::cache::HandleCache>,
    ) -> bool {
        self.resolve_cached(path, cache).await.is_ok()
    }

    pub async fn create_file(&mut self, path: &str) -> Result<(), Error> {
        let (dir, name) = self.resolve_parent(path).await?;
        self.nfs.create(&dir, &name, &CreateMode::Unchecked(Sattr3::default())).await?;
        Ok(())
    }

    pub async fn create_directory(&mut self, path: &str) -> Result<(), Error> {
        let (dir, name) = self.resolve_parent(path).await?;
        self.nfs.mkdir(&dir, &name, &Sattr3::default()).await?;
        Ok(())
    }

    pub async fn delete_file(&mut self, path: &str) -> Result<(), Error> {
        let (dir, name) = self.resolve_parent(path).await?;
        self.nfs.remove(&dir, &name).await?;
        Ok(())
    }

    pub async fn delete_directory(&mut self, path: &str) -> Result<(), Error> {
        let (dir, name) = self.resolve_parent(path).await?;
        self.nfs.rmdir(&dir, &name).await?;
        Ok(())
    }

    /// Reads `len` bytes at `offset`, chunked to the negotiated block size
    /// internally by [`Nfs3Client::read`].
    pub async fn read(&mut self, path: &str, offset: u64, len: u32) -> Result<Vec<u8>, Error> {
        let handle = self.resolve(path).await?;
        let mut out = Vec::new();
        let mut pos = offset;
        while (out.len() as u64) < len as u64 {
            let want = (len - out.len() as u32).min(64 * 1024);
            let chunk = self.nfs.read(&handle, pos, want).await?;
            let n = chunk.data.len();
            out.extend_from_slice(&chunk.data);
            pos += n as u64;
            if chunk.eof || n == 0 {
                break;
            }
        }
        out.truncate(len as usize);
        Ok(out)
    }

    /// Writes `data` at `offset`, `FILE_SYNC` per call for correctness —
    /// the default stability mode for this crate's writes. Chunked to the
    /// negotiated block size by [`Nfs3Client::write`] itself.
    pub async fn write(&mut self, path: &str, offset: u64, data: &[u8]) -> Result<(), Error> {
        let handle = self.resolve(path).await?;
        let mut pos = offset;
        let mut remaining = data;
        while !remaining.is_empty() {
            let result = self.nfs.write(&handle, pos, StableHow::FileSync, remaining).await?;
            let n = (result.count as usize).max(1).min(remaining.len());
            pos += n as u64;
            remaining = &remaining[n..];
        }
        Ok(())
    }

    pub async fn set_file_size(&mut self, path: &str, size: u64) -> Result<(), Error> {
        let handle = self.resolve(path).await?;
        self.nfs.set_attr(&handle, &Sattr3::size_only(size)).await?;
        Ok(())
    }

    pub async fn move_item(&mut self, from: &str, to: &str) -> Result<(), Error> {
        let (from_dir, from_name) = self.resolve_parent(from).await?;
        let (to_dir, to_name) = self.resolve_parent(to).await?;
        self.nfs.rename(&from_dir, &from_name, &to_dir, &to_name).await?;
        Ok(())
    }
}

/// Accepts either `/` or `\` as a path separator and folds them
/// to the `/`-separated form [`path::resolve`] expects.
fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}
