//! ONC/RPC v2 client-side message framing (RFC 5531).
//!
//! A server decodes incoming `call_body` and encodes outgoing
//! `reply_body`. A client does the opposite — it encodes `call_body` and
//! decodes `reply_body` — so the enum shapes below are the same wire types
//! with the encode/decode directions swapped.

pub mod auth;
pub mod client;
pub mod transport;


use crate::error::{Error, RpcRejectKind};
use crate::xdr::{decode, encode};
use auth::OpaqueAuth;
use std::io::{Read, Write};

/// RPC protocol version this client speaks.
pub const RPC_VERSION: u32 = 2;

const MSG_TYPE_CALL: u32 = 0;
const MSG_TYPE_REPLY: u32 = 1;

const REPLY_STAT_ACCEPTED: u32 = 0;
const REPLY_STAT_DENIED: u32 = 1;

const ACCEPT_STAT_SUCCESS: u32 = 0;
const ACCEPT_STAT_PROG_UNAVAIL: u32 = 1;
const ACCEPT_STAT_PROG_MISMATCH: u32 = 2;
const ACCEPT_STAT_PROC_UNAVAIL: u32 = 3;
const ACCEPT_STAT_GARBAGE_ARGS: u32 = 4;
const ACCEPT_STAT_SYSTEM_ERR: u32 = 5;

const REJECT_STAT_RPC_MISMATCH: u32 = 0;
const REJECT_STAT_AUTH_ERROR: u32 = 1;

/// `call_body` (RFC 5531 §9), with the caller-supplied procedure arguments
/// encoded separately and appended by [`Self::encode_header`]'s caller.
pub struct CallHeader {
    pub xid: u32,
    pub program: u32,
    pub version: u32,
    pub procedure: u32,
    pub cred: OpaqueAuth,
    pub verf: OpaqueAuth,
}

impl CallHeader {
    /// Encodes the full `rpc_msg { xid, CALL(call_body) }` prefix; the
    /// caller writes the procedure-specific arguments immediately after.
    pub fn encode(&self, dest: &mut dyn Write) -> std::io::Result<()> {
        encode::u32(dest, self.xid)?;
        encode::u32(dest, MSG_TYPE_CALL)?;
        encode::u32(dest, RPC_VERSION)?;
        encode::u32(dest, self.program)?;
        encode::u32(dest, self.version)?;
        encode::u32(dest, self.procedure)?;
        self.cred.encode(dest)?;
        self.verf.encode(dest)?;
        Ok(())
    }
}

/// Outcome of a fully-decoded reply, before the caller decodes its
/// procedure-specific result payload.
pub enum ReplyOutcome {
    /// The call was accepted and executed; the caller may now decode its
    /// result payload from the remaining bytes of `src`.
    Accepted,
    /// The call was accepted but rejected at the procedure level, or denied
    /// outright. No result payload follows.
    Rejected(Error),
}

/// Decodes an `rpc_msg` reply header (`xid`, `REPLY`, accept/reject status)
/// and returns the outcome plus the `xid` it was addressed to.
pub fn decode_reply_header(src: &mut dyn Read) -> Result<(u32, ReplyOutcome), Error> {
    let xid = decode::u32(src)?;
    let msg_type = decode::u32(src)?;
    if msg_type != MSG_TYPE_REPLY {
        return Err(Error::CodecFailed("expected REPLY message type"));
    }

    let reply_stat = decode::u32(src)?;
    match reply_stat {
        REPLY_STAT_ACCEPTED => {
            let verf = OpaqueAuth::decode(src)?;
            if !verf.is_auth_none() {
                return Ok((xid, ReplyOutcome::Rejected(Error::AuthFailed)));
            }
            let accept_stat = decode::u32(src)?;
            match accept_stat {
                ACCEPT_STAT_SUCCESS => Ok((xid, ReplyOutcome::Accepted)),
                ACCEPT_STAT_PROG_UNAVAIL => {
                    Ok((xid, ReplyOutcome::Rejected(Error::RpcRejected(RpcRejectKind::ProgUnavail))))
                }
                ACCEPT_STAT_PROG_MISMATCH => {
                    let low = decode::u32(src)?;
                    let high = decode::u32(src)?;
                    Ok((
                        xid,
                        ReplyOutcome::Rejected(Error::RpcRejected(RpcRejectKind::ProgMismatch {
                            low,
                            high,
                        })),
                    ))
                }
                ACCEPT_STAT_PROC_UNAVAIL => {
                    Ok((xid, ReplyOutcome::Rejected(Error::RpcRejected(RpcRejectKind::ProcUnavail))))
                }
                ACCEPT_STAT_GARBAGE_ARGS => {
                    Ok((xid, ReplyOutcome::Rejected(Error::RpcRejected(RpcRejectKind::GarbageArgs))))
                }
                ACCEPT_STAT_SYSTEM_ERR => {
                    Ok((xid, ReplyOutcome::Rejected(Error::RpcRejected(RpcRejectKind::SystemError))))
                }
                _ => Err(Error::CodecFailed("unknown accept_stat")),
            }
        }
        REPLY_STAT_DENIED => {
            let reject_stat = decode::u32(src)?;
            match reject_stat {
                REJECT_STAT_RPC_MISMATCH => {
                    let low = decode::u32(src)?;
                    let high = decode::u32(src)?;
                    Ok((
                        xid,
                        ReplyOutcome::Rejected(Error::RpcRejected(RpcRejectKind::ProgMismatch {
                            low,
                            high,
                        })),
                    ))
                }
                REJECT_STAT_AUTH_ERROR => {
                    let _auth_stat = decode::u32(src)?;
                    Ok((xid, ReplyOutcome::Rejected(Error::RpcRejected(RpcRejectKind::AuthError))))
                }
                _ => Err(Error::CodecFailed("unknown reject_stat")),
            }
        }
        _ => Err(Error::CodecFailed("unknown reply_stat")),
    }
}
