//! A pure userland client library for the Network File System (NFS)
//! protocol family: ONC/RPC transport, XDR codec, Portmapper, NFSv3 Mount
//! and file protocols, and the NFSv4.1 session state machine, behind one
//! version-agnostic façade.
//!
//! ```no_run
//! use nfs_mamont_client::facade::options::{ConnectOptions, NfsVersion};
//! use nfs_mamont_client::facade::NfsClient;
//!
//! # async fn run() -> nfs_mamont_client::error::Result<()> {
//! let server = "192.0.2.1".parse().unwrap();
//! let mut client = NfsClient::new(server, NfsVersion::V3, ConnectOptions::default());
//! client.connect().await?;
//! client.mount_device("/srv/nfs").await?;
//! let entries = client.get_item_list(".").await?;
//! # let _ = entries;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod facade;
pub mod mount_client;
pub mod nfs3;
pub mod nfs4;
pub mod pool;
pub mod portmap;
pub mod rpc;
pub mod xdr;
