//! The client façade: one uniform surface over the v3 and v4.1
//! engines, dispatching on whichever [`NfsVersion`] `connect` was given.
//!
//! Each operation exists in a single `async` form — this crate's suspension
//! points are exactly its RPC round trips, so there is no separate
//! blocking entry point to maintain; callers that want a blocking call wrap
//! one of these in their own executor.

pub mod attrs;
pub mod events;
pub mod options;
mod v3;
mod v4;

use crate::cache::HandleCache;
use crate::error::Error;
use attrs::Attributes;
use events::{EventBus, TransferDirection, TransferEvent};
use options::{ConnectOptions, NfsVersion};
use std::net::IpAddr;

/// Observable client lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connected,
    Mounted,
    /// v4-only: session established and `RECLAIM_COMPLETE` has run.
    SessionActive,
}

enum Engine {
    V3(v3::V3Engine),
    V4(v4::V4Engine),
}

/// Evaluates `$call` and, if it fails with `Error::StaleHandle`, invalidates
/// `$path` in `$self`'s cache and evaluates `$call` exactly once more —
/// the one transparent retry the propagation policy (spec §7) grants
/// `StaleHandle` before it is allowed to reach the caller, mirrored here at
/// the façade layer the same way `GraceInProgress` is recovered inside
/// `nfs4::session::Session::execute`.
macro_rules! retry_stale {
    ($self:ident, $path:expr, $call:expr) => {{
        match $call {
            Err(Error::StaleHandle) => {
                $self.invalidate_after_mutation($path);
                $call
            }
            other => other,
        }
    }};
}

/// A single mounted NFS session, v3 or v4.1, behind one path-based API.
///
/// Not safe for concurrent use from multiple callers: a single
/// instance is not meant for simultaneous multi-call use from different
/// tasks. The
/// connection pool (see [`crate::pool`]) is what gives each caller its own
/// instance.
pub struct NfsClient {
    engine: Option<Engine>,
    version: NfsVersion,
    server: IpAddr,
    options: ConnectOptions,
    machine_name: String,
    cache: Option<HandleCache>,
    state: ClientState,
    transfer_events: EventBus<TransferEvent>,
}

impl NfsClient {
    /// Constructs a client in `DISCONNECTED` state; no I/O happens until
    /// [`Self::connect`].
    pub fn new(server: IpAddr, version: NfsVersion, options: ConnectOptions) -> Self {
        let cache = options.use_handle_cache.then(HandleCache::new);
        NfsClient {
            engine: None,
            version,
            server,
            options,
            machine_name: hostname(),
            cache,
            state: ClientState::Disconnected,
            transfer_events: EventBus::new(),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Subscribes to per-chunk transfer notifications.
    pub fn subscribe_transfers(&self, capacity: usize) -> async_channel::Receiver<TransferEvent> {
        self.transfer_events.subscribe(capacity)
    }

    /// `DISCONNECTED -> CONNECTED`: establishes the underlying session
    /// (v4.1) with no mount yet, or simply validates reachability (v3,
    /// which has no connect step independent of a mount/export listing).
    pub async fn connect(&mut self) -> Result<(), Error> {
        if self.state != ClientState::Disconnected {
            return Err(Error::InvalidState("connect called outside DISCONNECTED"));
        }
        match self.version {
            NfsVersion::V3 => {
                // v3 has no persistent connection prior to a mount; reachability
                // is confirmed by the first MOUNT/EXPORT call itself.
                self.state = ClientState::Connected;
            }
            NfsVersion::V4_1 => {
                let credential = self.options.credential(&self.machine_name);
                let engine = v4::V4Engine::connect(self.server, &self.options, credential).await?;
                self.engine = Some(Engine::V4(engine));
                self.state = ClientState::SessionActive;
            }
        }
        Ok(())
    }

    /// `get_exported_devices`: `EXPORT` for v3, the fixed
    /// pseudo-root list for v4.
    pub async fn get_exported_devices(&mut self) -> Result<Vec<String>, Error> {
        match self.version {
            NfsVersion::V3 => {
                let credential = self.options.credential(&self.machine_name);
                v3::V3Engine::list_exports(self.server, &self.options, credential).await
            }
            NfsVersion::V4_1 => Ok(v4::V4Engine::list_exports()),
        }
    }

    /// Mounts `device` (v3: issues `MNT`; v4: the pseudo-root is already
    /// resolved at `connect` time, so this only checks reachability).
    pub async fn mount_device(&mut self, device: &str) -> Result<(), Error> {
        match self.version {
            NfsVersion::V3 => {
                if self.state != ClientState::Connected {
                    return Err(Error::InvalidState("mount_device called outside CONNECTED"));
                }
                let credential = self.options.credential(&self.machine_name);
                let engine = v3::V3Engine::connect(self.server, device, &self.options, credential).await?;
                self.engine = Some(Engine::V3(engine));
            }
            NfsVersion::V4_1 => {
                if self.state != ClientState::SessionActive {
                    return Err(Error::InvalidState("mount_device called before connect"));
                }
            }
        }
        self.state = ClientState::Mounted;
        Ok(())
    }

    /// Unmounts the current export (v3: `UMNT`; v4: no-op, the pseudo-root
    /// has no mount state to tear down) and drops the handle cache, per
    /// the rule that a cache never survives a mount change or disconnect.
    pub async fn unmount_device(&mut self) -> Result<(), Error> {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
        match (self.version, self.engine.take()) {
            (NfsVersion::V3, Some(Engine::V3(engine))) => {
                engine.disconnect().await?;
                self.state = ClientState::Connected;
            }
            (NfsVersion::V4_1, engine) => {
                // v4 keeps its session; only the mount-level bookkeeping resets.
                self.engine = engine;
                self.state = ClientState::SessionActive;
            }
            _ => return Err(Error::InvalidState("unmount_device called without a mount")),
        }
        Ok(())
    }

    /// Tears down the client entirely: v3 ensures `unmount_device` ran
    /// first ("a mount must be paired with an unmount before
    /// disconnect when the protocol is v3"); v4 destroys the session.
    pub async fn disconnect(mut self) -> Result<(), Error> {
        match self.engine.take() {
            Some(Engine::V3(_)) => {
                return Err(Error::InvalidState("v3 client must be unmounted before disconnect"));
            }
            Some(Engine::V4(engine)) => engine.disconnect().await?,
            None => {}
        }
        Ok(())
    }

    fn engine_mut(&mut self) -> Result<&mut Engine, Error> {
        self.engine.as_mut().ok_or(Error::InvalidState("operation requires an active mount"))
    }

    pub async fn get_item_list(&mut self, path: &str) -> Result<Vec<String>, Error> {
        let cache = self.cache.clone();
        retry_stale!(
            self,
            path,
            match self.engine_mut()? {
                Engine::V3(engine) => engine.list_dir(path, cache.as_ref()).await,
                Engine::V4(engine) => engine.list_dir(path, cache.as_ref()).await,
            }
        )
    }

    pub async fn get_item_attributes(&mut self, path: &str) -> Result<Attributes, Error> {
        let cache = self.cache.clone();
        let (handle, attrs) = retry_stale!(
            self,
            path,
            match self.engine_mut()? {
                Engine::V3(engine) => engine
                    .get_attributes(path, cache.as_ref())
                    .await
                    .map(|(handle, attrs)| (Some(handle), attrs)),
                Engine::V4(engine) => engine
                    .get_attributes(path, cache.as_ref())
                    .await
                    .map(|(handle, attrs)| (Some(handle), attrs)),
            }
        )?;
        if let (Some(cache), Some(handle)) = (&cache, handle) {
            cache.put(path, handle, to_cached(&attrs), None);
        }
        Ok(attrs)
    }

    pub async fn is_directory(&mut self, path: &str) -> Result<bool, Error> {
        let cache = self.cache.clone();
        retry_stale!(
            self,
            path,
            match self.engine_mut()? {
                Engine::V3(engine) => engine.is_directory(path, cache.as_ref()).await,
                Engine::V4(engine) => engine.is_directory(path, cache.as_ref()).await,
            }
        )
    }

    pub async fn file_exists(&mut self, path: &str) -> Result<bool, Error> {
        let cache = self.cache.clone();
        Ok(match self.engine_mut()? {
            Engine::V3(engine) => engine.file_exists(path, cache.as_ref()).await,
            Engine::V4(engine) => engine.file_exists(path, cache.as_ref()).await,
        })
    }

    /// A successful mutating call on `path` invalidates it in the cache
    /// (exactly-once invalidation).
    fn invalidate_after_mutation(&self, path: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(path);
        }
    }

    pub async fn create_file(&mut self, path: &str) -> Result<(), Error> {
        let result = retry_stale!(
            self,
            path,
            match self.engine_mut()? {
                Engine::V3(engine) => engine.create_file(path).await,
                Engine::V4(engine) => engine.create_file(path).await,
            }
        );
        if result.is_ok() {
            self.invalidate_after_mutation(path);
        }
        result
    }

    pub async fn create_directory(&mut self, path: &str) -> Result<(), Error> {
        let result = retry_stale!(
            self,
            path,
            match self.engine_mut()? {
                Engine::V3(engine) => engine.create_directory(path).await,
                Engine::V4(engine) => engine.create_directory(path).await,
            }
        );
        if result.is_ok() {
            self.invalidate_after_mutation(path);
        }
        result
    }

    pub async fn delete_file(&mut self, path: &str) -> Result<(), Error> {
        let result = retry_stale!(
            self,
            path,
            match self.engine_mut()? {
                Engine::V3(engine) => engine.delete_file(path).await,
                Engine::V4(engine) => engine.delete_file(path).await,
            }
        );
        if result.is_ok() {
            self.invalidate_after_mutation(path);
        }
        result
    }

    /// `RMDIR`/`REMOVE(NF4DIR)` also invalidates every cached descendant
    /// (rename and rmdir invalidate `P` and `P/...`).
    pub async fn delete_directory(&mut self, path: &str) -> Result<(), Error> {
        let result = retry_stale!(
            self,
            path,
            match self.engine_mut()? {
                Engine::V3(engine) => engine.delete_directory(path).await,
                Engine::V4(engine) => engine.delete_directory(path).await,
            }
        );
        if result.is_ok() {
            if let Some(cache) = &self.cache {
                cache.invalidate_prefix(path);
            }
        }
        result
    }

    pub async fn read(&mut self, path: &str, offset: u64, len: u32) -> Result<Vec<u8>, Error> {
        let data = retry_stale!(
            self,
            path,
            match self.engine_mut()? {
                Engine::V3(engine) => engine.read(path, offset, len).await,
                Engine::V4(engine) => engine.read(path, offset, len).await,
            }
        )?;
        self.transfer_events.emit(TransferEvent {
            path: path.to_string(),
            direction: TransferDirection::Read,
            bytes: data.len(),
        });
        Ok(data)
    }

    pub async fn write(&mut self, path: &str, offset: u64, data: &[u8]) -> Result<(), Error> {
        let result = retry_stale!(
            self,
            path,
            match self.engine_mut()? {
                Engine::V3(engine) => engine.write(path, offset, data).await,
                Engine::V4(engine) => engine.write(path, offset, data).await,
            }
        );
        if result.is_ok() {
            self.invalidate_after_mutation(path);
            self.transfer_events.emit(TransferEvent {
                path: path.to_string(),
                direction: TransferDirection::Write,
                bytes: data.len(),
            });
        }
        result
    }

    pub async fn set_file_size(&mut self, path: &str, size: u64) -> Result<(), Error> {
        let result = retry_stale!(
            self,
            path,
            match self.engine_mut()? {
                Engine::V3(engine) => engine.set_file_size(path, size).await,
                Engine::V4(engine) => engine.set_file_size(path, size).await,
            }
        );
        if result.is_ok() {
            self.invalidate_after_mutation(path);
        }
        result
    }

    /// Renames/moves `from` to `to`. Invalidates `from` (and its subtree,
    /// since a renamed directory's children move with it) plus anything at
    /// the destination already cached under a different identity.
    ///
    /// A `StaleHandle` here can come from resolving either side, so the
    /// retry invalidates both `from` and `to` before trying once more,
    /// mirroring the success-path invalidation below.
    pub async fn move_item(&mut self, from: &str, to: &str) -> Result<(), Error> {
        let mut result = match self.engine_mut()? {
            Engine::V3(engine) => engine.move_item(from, to).await,
            Engine::V4(engine) => engine.move_item(from, to).await,
        };
        if let Err(Error::StaleHandle) = result {
            if let Some(cache) = &self.cache {
                cache.invalidate_prefix(from);
                cache.invalidate_containing(to);
            }
            result = match self.engine_mut()? {
                Engine::V3(engine) => engine.move_item(from, to).await,
                Engine::V4(engine) => engine.move_item(from, to).await,
            };
        }
        if result.is_ok() {
            if let Some(cache) = &self.cache {
                cache.invalidate_prefix(from);
                cache.invalidate_containing(to);
            }
        }
        result
    }

    /// Runs the cache's periodic sweep; the embedding
    /// application drives this on [`crate::cache::SWEEP_INTERVAL`], and for
    /// v4 clients it is also where the keep-alive tick belongs (see
    /// [`Self::keepalive_if_idle`]).
    pub fn sweep_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.sweep();
        }
    }

    /// Issues a SEQUENCE-only compound if the v4 session has been idle past
    /// its keep-alive threshold. A no-op for v3, which has no
    /// session lease to refresh.
    pub async fn keepalive_if_idle(&mut self) -> Result<(), Error> {
        if let Some(Engine::V4(engine)) = &mut self.engine {
            engine.keepalive_if_idle().await?;
        }
        Ok(())
    }

    /// Harmless on-demand probe used by [`crate::pool`]'s health checker
    /// probe: `EXPORT` for v3, a SEQUENCE-only compound for v4.
    pub async fn health_check(&mut self) -> Result<(), Error> {
        match self.engine_mut()? {
            Engine::V3(engine) => engine.health_ping().await,
            Engine::V4(engine) => engine.health_ping().await,
        }
    }
}

fn to_cached(attrs: &Attributes) -> crate::cache::CachedAttributes {
    crate::cache::CachedAttributes {
        file_type: match attrs.file_type {
            attrs::FileType::Regular => crate::cache::FileKind::Regular,
            attrs::FileType::Directory => crate::cache::FileKind::Directory,
            attrs::FileType::Symlink => crate::cache::FileKind::Symlink,
            attrs::FileType::Other => crate::cache::FileKind::Other,
        },
        permission: (attrs.permission.user, attrs.permission.group, attrs.permission.other),
        size: attrs.size,
        atime_secs: attrs.atime_secs,
        mtime_secs: attrs.mtime_secs,
        ctime_secs: attrs.created_secs,
    }
}

/// Best-effort local machine name for the `AUTH_SYS` credential.
fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "nfs-mamont-client".to_string())
}
