//! Crate-wide error taxonomy.
//!
//! A flat, `Copy`-friendly tag set rather than a boxed hierarchy, plus a
//! hand-written [`std::fmt::Display`]/[`std::error::Error`] impl so callers
//! outside this crate get ordinary error-handling ergonomics without pulling
//! in `thiserror`.

use std::fmt;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// RPC-level rejection kinds (RFC 5531 `accept_stat`/`reject_stat`/`auth_stat`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RpcRejectKind {
    ProgUnavail,
    ProgMismatch { low: u32, high: u32 },
    ProcUnavail,
    GarbageArgs,
    SystemError,
    AuthError,
}

impl fmt::Display for RpcRejectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcRejectKind::ProgUnavail => write!(f, "PROG_UNAVAIL"),
            RpcRejectKind::ProgMismatch { low, high } => {
                write!(f, "PROG_MISMATCH (supported {low}..={high})")
            }
            RpcRejectKind::ProcUnavail => write!(f, "PROC_UNAVAIL"),
            RpcRejectKind::GarbageArgs => write!(f, "GARBAGE_ARGS"),
            RpcRejectKind::SystemError => write!(f, "SYSTEM_ERR"),
            RpcRejectKind::AuthError => write!(f, "AUTH_ERROR"),
        }
    }
}

/// The full error taxonomy surfaced by every client operation.
#[derive(Debug)]
pub enum Error {
    /// Socket-level failure, unexpected EOF, or record-framing violation.
    /// Not recoverable on the same socket.
    Transport(std::io::Error),
    /// Per-request deadline exceeded.
    Timeout,
    /// ONC/RPC-level rejection.
    RpcRejected(RpcRejectKind),
    /// Authentication scheme rejected by the server.
    AuthFailed,
    /// XDR decode inconsistency: bad length, negative count, truncated buffer.
    CodecFailed(&'static str),
    /// v3 MOUNT returned a non-zero status (POSIX errno).
    MountFailed(u32),
    NotFound,
    PermissionDenied,
    AlreadyExists,
    NotEmpty,
    IsNotDirectory,
    IsDirectory,
    /// File handle went stale; caller-visible only after the one
    /// transparent retry permitted by the propagation policy failed too.
    StaleHandle,
    /// Server is inside its NFSv4 grace period and the retry budget was
    /// exhausted without success.
    Unavailable,
    /// Any NFS status that does not map to a named variant above.
    Protocol(u32),
    /// The v4 session entered a state from which it cannot recover
    /// without the caller reconnecting (e.g. `NFS4ERR_BAD_SEQID`).
    SessionDead,
    /// A public API was used outside of its required client state
    /// (e.g. reading before `mount_device`).
    InvalidState(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "transport error: {e}"),
            Error::Timeout => write!(f, "request timed out"),
            Error::RpcRejected(kind) => write!(f, "RPC call rejected: {kind}"),
            Error::AuthFailed => write!(f, "authentication failed"),
            Error::CodecFailed(why) => write!(f, "XDR decode failed: {why}"),
            Error::MountFailed(errno) => write!(f, "MOUNT failed with errno {errno}"),
            Error::NotFound => write!(f, "no such file or directory"),
            Error::PermissionDenied => write!(f, "permission denied"),
            Error::AlreadyExists => write!(f, "file exists"),
            Error::NotEmpty => write!(f, "directory not empty"),
            Error::IsNotDirectory => write!(f, "not a directory"),
            Error::IsDirectory => write!(f, "is a directory"),
            Error::StaleHandle => write!(f, "stale file handle"),
            Error::Unavailable => write!(f, "server unavailable (grace period exceeded)"),
            Error::Protocol(code) => write!(f, "unmapped protocol status {code}"),
            Error::SessionDead => write!(f, "session unrecoverable, must reconnect"),
            Error::InvalidState(why) => write!(f, "invalid client state: {why}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::TimedOut => Error::Timeout,
            ErrorKind::UnexpectedEof => Error::Transport(e),
            _ => Error::Transport(e),
        }
    }
}

/// Maps an NFSv3 `nfsstat3` wire value (RFC 1813 §2.6) to the crate taxonomy.
pub fn from_nfs3_status(status: u32) -> Option<Error> {
    match status {
        0 => None,
        2 => Some(Error::NotFound),
        13 => Some(Error::PermissionDenied),
        17 => Some(Error::AlreadyExists),
        20 => Some(Error::IsNotDirectory),
        21 => Some(Error::IsDirectory),
        66 => Some(Error::NotEmpty),
        70 => Some(Error::StaleHandle),
        other => Some(Error::Protocol(other)),
    }
}

/// Maps an NFSv4 `nfsstat4` wire value (RFC 5661 §15.1) to the crate taxonomy.
///
/// `NFS4ERR_GRACE`/`NFS4ERR_DELAY`/`NFS4ERR_BADSESSION` are handled by the
/// session state machine before a call ever reaches this mapping (they drive
/// a retry or a session rebuild, not a caller-visible error).
pub fn from_nfs4_status(status: u32) -> Option<Error> {
    match status {
        0 => None,
        2 => Some(Error::NotFound),
        13 => Some(Error::PermissionDenied),
        17 => Some(Error::AlreadyExists),
        20 => Some(Error::IsNotDirectory),
        21 => Some(Error::IsDirectory),
        66 => Some(Error::NotEmpty),
        70 | 10001 | 10014 => Some(Error::StaleHandle), // STALE, BADHANDLE, FHEXPIRED
        10026 => Some(Error::SessionDead),               // BAD_SEQID
        other => Some(Error::Protocol(other)),
    }
}
