//! NFSv4.1 protocol client (RFC 5661, program 100003, version 4, minor
//! version 1). Unlike the v3 engine, everything travels inside a single
//! `COMPOUND` procedure, so there is no per-procedure module split here —
//! [`compound`] builds the operation array, [`session`] owns the state
//! machine that frames it with `SEQUENCE` and retries grace/delay, and
//! [`client`] is the thin façade-facing driver.

pub mod client;
pub mod compound;
pub mod session;
pub mod types;

#[cfg(test)]
mod tests;

/// NFS program number (shared with v3; version field distinguishes them).
pub const PROGRAM: u32 = 100003;
/// NFSv4 protocol version.
pub const VERSION: u32 = 4;
/// Minor version this client speaks.
pub const MINOR_VERSION: u32 = 1;

pub const PROC_NULL: u32 = 0;
pub const PROC_COMPOUND: u32 = 1;

// Operation codes (RFC 5661 §1.9.1 / `nfs_opnum4`). Only the subset this
// client ever emits or decodes is named; the rest would decode as ILLEGAL.
pub const OP_ACCESS: u32 = 3;
pub const OP_CLOSE: u32 = 4;
pub const OP_COMMIT: u32 = 5;
pub const OP_CREATE: u32 = 6;
pub const OP_GETATTR: u32 = 9;
pub const OP_GETFH: u32 = 10;
pub const OP_LINK: u32 = 11;
pub const OP_LOOKUP: u32 = 15;
pub const OP_OPEN: u32 = 18;
pub const OP_PUTFH: u32 = 22;
pub const OP_PUTROOTFH: u32 = 24;
pub const OP_READ: u32 = 25;
pub const OP_READDIR: u32 = 26;
pub const OP_READLINK: u32 = 27;
pub const OP_REMOVE: u32 = 28;
pub const OP_RENAME: u32 = 29;
pub const OP_RESTOREFH: u32 = 31;
pub const OP_SAVEFH: u32 = 32;
pub const OP_SETATTR: u32 = 34;
pub const OP_WRITE: u32 = 38;
pub const OP_EXCHANGE_ID: u32 = 42;
pub const OP_CREATE_SESSION: u32 = 43;
pub const OP_DESTROY_SESSION: u32 = 44;
pub const OP_SEQUENCE: u32 = 53;
pub const OP_RECLAIM_COMPLETE: u32 = 58;
pub const OP_ILLEGAL: u32 = 10044;

// Status codes (RFC 5661 §15.1, `nfsstat4`) this client inspects by name;
// everything else falls through [`crate::error::from_nfs4_status`]'s
// catch-all `Protocol(code)` arm.
pub const NFS4_OK: u32 = 0;
pub const NFS4ERR_DELAY: u32 = 10008;
pub const NFS4ERR_GRACE: u32 = 10013;
pub const NFS4ERR_BADSESSION: u32 = 10052;
pub const NFS4ERR_BAD_SEQID: u32 = 10026;

/// Maximum bytes in an NFSv4 file handle (`NFS4_FHSIZE`).
pub const FHSIZE4: usize = 128;
/// Maximum bytes in a path component (`NFS4_MAXNAMLEN`-equivalent bound used
/// by this client; the protocol itself has no fixed limit).
pub const MAXNAMLEN: usize = 255;

pub use client::Nfs4Client;
pub use types::{ClientOwner, Fattr4, NfsFh4, SessionId, StateId};
