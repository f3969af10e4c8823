//! Fluent accumulation of NFSv4 operations into one `COMPOUND` request, and
//! the matching cursor for walking its reply.
//!
//! A [`CompoundBuilder`] is one-shot: it borrows nothing from the session
//! beyond the `{session_id, sequence_id}` values the caller passes to
//! [`CompoundBuilder::sequence`], and [`CompoundBuilder::build`] consumes it.
//! The session's sequence ID itself is owned and advanced by
//! [`super::session::Session`], never by the builder.

use super::types::{encode_requested_bitmap, ClientOwner, Fattr4, NfsFh4, SessionId, StateId};
use super::{MINOR_VERSION, OP_ILLEGAL};
use crate::error::Error;
use crate::xdr::{decode, encode};
use std::io::Cursor;

pub const OPEN4_SHARE_ACCESS_READ: u32 = 1;
pub const OPEN4_SHARE_ACCESS_WRITE: u32 = 2;
pub const OPEN4_SHARE_DENY_NONE: u32 = 0;
/// `minorversion 1` want-flag folded into `share_access`, asking the server
/// to never hand back a delegation (this client never requests one).
const OPEN4_SHARE_ACCESS_WANT_NO_DELEG: u32 = 0x0001_0000;

const OPENTYPE4_NOCREATE: u32 = 0;
const OPENTYPE4_CREATE: u32 = 1;
const CREATEMODE4_GUARDED: u32 = 1;
const CLAIM_NULL: u32 = 0;

/// Builds one `COMPOUND(1)` argument list: `{ tag, minorversion, array of
/// nfs_argop4 }`.
pub struct CompoundBuilder {
    tag: String,
    ops: Vec<u8>,
    op_count: u32,
}

impl CompoundBuilder {
    pub fn new(tag: &str) -> Self {
        CompoundBuilder { tag: tag.to_string(), ops: Vec::new(), op_count: 0 }
    }

    fn push_op(
        &mut self,
        opcode: u32,
        body: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>,
    ) -> std::io::Result<&mut Self> {
        encode::u32(&mut self.ops, opcode)?;
        body(&mut self.ops)?;
        self.op_count += 1;
        Ok(self)
    }

    /// `SEQUENCE`: must be the first op of every OPERATING-state compound.
    /// `slotid`/`highest_slotid` are always 0 (this client keeps a single slot);
    /// `cache_this` is always false (this client never replays a compound).
    pub fn sequence(
        &mut self,
        session_id: SessionId,
        sequence_id: u32,
    ) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_SEQUENCE, |buf| {
            session_id.encode(buf)?;
            encode::u32(buf, sequence_id)?;
            encode::u32(buf, 0)?;
            encode::u32(buf, 0)?;
            encode::boolean(buf, false)
        })
    }

    pub fn put_root_fh(&mut self) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_PUTROOTFH, |_| Ok(()))
    }

    pub fn put_fh(&mut self, fh: &NfsFh4) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_PUTFH, |buf| fh.encode(buf))
    }

    pub fn get_fh(&mut self) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_GETFH, |_| Ok(()))
    }

    pub fn get_attr(&mut self) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_GETATTR, encode_requested_bitmap)
    }

    pub fn lookup(&mut self, name: &str) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_LOOKUP, |buf| encode::string(buf, name))
    }

    pub fn access(&mut self, desired: u32) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_ACCESS, |buf| encode::u32(buf, desired))
    }

    pub fn save_fh(&mut self) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_SAVEFH, |_| Ok(()))
    }

    pub fn restore_fh(&mut self) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_RESTOREFH, |_| Ok(()))
    }

    pub fn remove(&mut self, name: &str) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_REMOVE, |buf| encode::string(buf, name))
    }

    pub fn rename(&mut self, old_name: &str, new_name: &str) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_RENAME, |buf| {
            encode::string(buf, old_name)?;
            encode::string(buf, new_name)
        })
    }

    pub fn link(&mut self, new_name: &str) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_LINK, |buf| encode::string(buf, new_name))
    }

    pub fn readlink(&mut self) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_READLINK, |_| Ok(()))
    }

    pub fn read(&mut self, stateid: &StateId, offset: u64, count: u32) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_READ, |buf| {
            stateid.encode(buf)?;
            encode::u64(buf, offset)?;
            encode::u32(buf, count)
        })
    }

    /// `stable` is the `stable_how4` discriminant: `0` unstable, `1` data
    /// sync, `2` file sync (same numbering as v3's `stable_how`).
    pub fn write(
        &mut self,
        stateid: &StateId,
        offset: u64,
        stable: u32,
        data: &[u8],
    ) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_WRITE, |buf| {
            stateid.encode(buf)?;
            encode::u64(buf, offset)?;
            encode::u32(buf, stable)?;
            encode::opaque_var(buf, data)
        })
    }

    pub fn readdir(
        &mut self,
        cookie: u64,
        cookie_verifier: u64,
        dircount: u32,
        maxcount: u32,
    ) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_READDIR, |buf| {
            encode::u64(buf, cookie)?;
            encode::u64(buf, cookie_verifier)?;
            encode::u32(buf, dircount)?;
            encode::u32(buf, maxcount)?;
            encode_requested_bitmap(buf)
        })
    }

    /// `OPEN` with `CLAIM_NULL` and no create — used by the "read file"
    /// named compound.
    pub fn open_read(&mut self, client_id: u64, name: &str) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_OPEN, |buf| {
            encode::u32(buf, 0)?; // seqid, ignored under minorversion 1
            encode::u32(buf, OPEN4_SHARE_ACCESS_READ | OPEN4_SHARE_ACCESS_WANT_NO_DELEG)?;
            encode::u32(buf, OPEN4_SHARE_DENY_NONE)?;
            encode_open_owner(buf, client_id)?;
            encode::u32(buf, OPENTYPE4_NOCREATE)?;
            encode::u32(buf, CLAIM_NULL)?;
            encode::string(buf, name)
        })
    }

    /// `OPEN` with `CLAIM_NULL` and no create, share access write — used
    /// when writing at a non-zero offset into a file that must already
    /// exist (unlike [`Self::open_write_create`], which always creates).
    pub fn open_write(&mut self, client_id: u64, name: &str) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_OPEN, |buf| {
            encode::u32(buf, 0)?;
            encode::u32(buf, OPEN4_SHARE_ACCESS_WRITE | OPEN4_SHARE_ACCESS_WANT_NO_DELEG)?;
            encode::u32(buf, OPEN4_SHARE_DENY_NONE)?;
            encode_open_owner(buf, client_id)?;
            encode::u32(buf, OPENTYPE4_NOCREATE)?;
            encode::u32(buf, CLAIM_NULL)?;
            encode::string(buf, name)
        })
    }

    /// `OPEN` with `CLAIM_NULL`, `GUARDED4` create, attributes `{ SIZE,
    /// MODE }` and the given `mode` — the "write file"/"create" shape from
    /// the named-compounds table.
    pub fn open_write_create(
        &mut self,
        client_id: u64,
        name: &str,
        size: u64,
        mode: u32,
    ) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_OPEN, |buf| {
            encode::u32(buf, 0)?;
            encode::u32(buf, OPEN4_SHARE_ACCESS_WRITE | OPEN4_SHARE_ACCESS_WANT_NO_DELEG)?;
            encode::u32(buf, OPEN4_SHARE_DENY_NONE)?;
            encode_open_owner(buf, client_id)?;
            encode::u32(buf, OPENTYPE4_CREATE)?;
            encode::u32(buf, CREATEMODE4_GUARDED)?;
            // createattrs: fattr4 { bitmap={SIZE,MODE}, attr_vals }
            let mut attr_vals = Vec::new();
            encode::u64(&mut attr_vals, size)?;
            encode::u32(&mut attr_vals, mode)?;
            const FATTR4_SIZE: u32 = 4;
            const FATTR4_MODE: u32 = 33;
            let mut words = [0u32; 2];
            words[(FATTR4_SIZE / 32) as usize] |= 1 << (FATTR4_SIZE % 32);
            words[(FATTR4_MODE / 32) as usize] |= 1 << (FATTR4_MODE % 32);
            encode::array(buf, &words, |w, d| encode::u32(d, *w))?;
            encode::opaque_var(buf, &attr_vals)?;
            encode::u32(buf, CLAIM_NULL)?;
            encode::string(buf, name)
        })
    }

    /// `SYMLINK` is modeled as `CREATE(NF4LNK, linkdata, name, attrs)`;
    /// `attrs` here is always the empty bitmap (no attribute overrides).
    pub fn create_symlink(&mut self, name: &str, link_data: &str) -> std::io::Result<&mut Self> {
        const NF4LNK: u32 = 5;
        self.push_op(super::OP_CREATE, |buf| {
            encode::u32(buf, NF4LNK)?;
            encode::string(buf, link_data)?;
            encode::string(buf, name)?;
            encode::array(buf, &[0u32, 0u32], |w, d| encode::u32(d, *w))
        })
    }

    /// `CREATE(NF4DIR, name, attrs)`; `attrs` is the empty bitmap, the same
    /// as [`Self::create_symlink`] uses for its attribute overrides.
    pub fn create_directory(&mut self, name: &str) -> std::io::Result<&mut Self> {
        const NF4DIR: u32 = 2;
        self.push_op(super::OP_CREATE, |buf| {
            encode::u32(buf, NF4DIR)?;
            encode::string(buf, name)?;
            encode::array(buf, &[0u32, 0u32], |w, d| encode::u32(d, *w))
        })
    }

    pub fn close(&mut self, stateid: &StateId) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_CLOSE, |buf| {
            encode::u32(buf, 0)?; // seqid, ignored under minorversion 1
            stateid.encode(buf)
        })
    }

    /// `SETATTR` for a `size`-only change, the only attribute this crate's
    /// façade ever sets through v4 (`SetFileSize`).
    pub fn setattr_size(&mut self, stateid: &StateId, size: u64) -> std::io::Result<&mut Self> {
        const FATTR4_SIZE: u32 = 4;
        self.push_op(super::OP_SETATTR, |buf| {
            stateid.encode(buf)?;
            let mut words = [0u32; 2];
            words[(FATTR4_SIZE / 32) as usize] |= 1 << (FATTR4_SIZE % 32);
            encode::array(buf, &words, |w, d| encode::u32(d, *w))?;
            let mut attr_vals = Vec::new();
            encode::u64(&mut attr_vals, size)?;
            encode::opaque_var(buf, &attr_vals)
        })
    }

    pub fn reclaim_complete(&mut self) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_RECLAIM_COMPLETE, |buf| encode::boolean(buf, false))
    }

    /// `EXCHANGE_ID`, the session-bootstrap op that establishes `client_id`.
    /// Always `SP4_NONE` (no RPCSEC_GSS state protection) and no
    /// `eia_client_impl_id`, matching this crate's `AUTH_SYS`-only scope.
    pub fn exchange_id(&mut self, owner: &ClientOwner) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_EXCHANGE_ID, |buf| {
            owner.encode(buf)?;
            encode::u32(buf, 0)?; // eia_flags
            encode::u32(buf, 0)?; // eia_state_protect.spa_how = SP4_NONE
            encode::u32(buf, 0) // eia_client_impl_id<1>, count 0
        })
    }

    /// `CREATE_SESSION`. `ca_maxrequests = 1` on both channels matches the
    /// a single-slot scheduling model; the callback channel is left
    /// unconfigured (`csa_cb_program = 0`) since this client never accepts
    /// callbacks.
    pub fn create_session(&mut self, client_id: u64, sequence_id: u32) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_CREATE_SESSION, |buf| {
            encode::u64(buf, client_id)?;
            encode::u32(buf, sequence_id)?;
            encode::u32(buf, 0)?; // csa_flags
            encode_channel_attrs(buf)?; // csa_fore_chan_attrs
            encode_channel_attrs(buf)?; // csa_back_chan_attrs
            encode::u32(buf, 0)?; // csa_cb_program
            // csa_sec_parms<>: one callback_sec_parms4 { cb_secflavor: AUTH_NONE }
            encode::u32(buf, 1)?;
            encode::u32(buf, 0)
        })
    }

    /// `DESTROY_SESSION`, the inverse of [`Self::create_session`]
    /// (the `SESSION_ACTIVE` -> `CLIENT_ID` transition on
    /// disconnect). Sent as a standalone, non-`SEQUENCE`-framed compound,
    /// the same way the bootstrap ops are.
    pub fn destroy_session(&mut self, session_id: SessionId) -> std::io::Result<&mut Self> {
        self.push_op(super::OP_DESTROY_SESSION, |buf| session_id.encode(buf))
    }

    pub fn build(self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        encode::string(&mut buf, &self.tag)?;
        encode::u32(&mut buf, MINOR_VERSION)?;
        encode::u32(&mut buf, self.op_count)?;
        buf.extend_from_slice(&self.ops);
        Ok(buf)
    }
}

fn encode_open_owner(buf: &mut Vec<u8>, client_id: u64) -> std::io::Result<()> {
    encode::u64(buf, client_id)?;
    encode::opaque_var(buf, b"nfsclient")
}

/// `channel_attrs4` with generous defaults and an empty RDMA attribute
/// array; this crate never uses RDMA transport.
fn encode_channel_attrs(buf: &mut Vec<u8>) -> std::io::Result<()> {
    encode::u32(buf, 0)?; // ca_headerpadsize
    encode::u32(buf, 1_048_576)?; // ca_maxrequestsize
    encode::u32(buf, 1_048_576)?; // ca_maxresponsesize
    encode::u32(buf, 4096)?; // ca_maxresponsesize_cached
    encode::u32(buf, 8)?; // ca_maxoperations
    encode::u32(buf, 1)?; // ca_maxrequests: single slot
    encode::u32(buf, 0) // ca_rdma_ior<>, count 0
}

/// Walks a `COMPOUND` reply `{ status, tag, resarray<> }` one operation at a
/// time. The overall `status` is the status of the last op the server
/// processed; any op after the first failure is simply absent from the
/// wire, matching `resarray`'s early-stop semantics.
pub struct CompoundCursor {
    cursor: Cursor<Vec<u8>>,
    pub status: u32,
    pub tag: String,
    pub op_count: u32,
}

impl CompoundCursor {
    pub fn decode(reply: Vec<u8>) -> Result<Self, Error> {
        let mut cursor = Cursor::new(reply);
        let status = decode::u32(&mut cursor)?;
        let tag = decode::string(&mut cursor, 64)?;
        let op_count = decode::u32(&mut cursor)?;
        Ok(CompoundCursor { cursor, status, tag, op_count })
    }

    /// Reads the next op's `{ opcode, status }` pair. Callers must check
    /// `status == NFS4_OK` before attempting to decode that op's payload
    /// via [`Self::reader`].
    pub fn op_header(&mut self) -> Result<(u32, u32), Error> {
        let opcode = decode::u32(&mut self.cursor)?;
        if opcode == OP_ILLEGAL {
            return Err(Error::CodecFailed("server returned ILLEGAL op in compound reply"));
        }
        let status = decode::u32(&mut self.cursor)?;
        Ok((opcode, status))
    }

    pub fn reader(&mut self) -> &mut dyn std::io::Read {
        &mut self.cursor
    }
}

/// `SEQUENCE` op result: `{ sessionid, sequenceid, slotid, highest_slotid,
/// target_highest_slotid, status_flags }`.
pub struct SequenceResult {
    pub session_id: SessionId,
    pub sequence_id: u32,
}

pub fn decode_sequence_result(r: &mut dyn std::io::Read) -> Result<SequenceResult, Error> {
    let session_id = SessionId::decode(r)?;
    let sequence_id = decode::u32(r)?;
    let _slotid = decode::u32(r)?;
    let _highest_slotid = decode::u32(r)?;
    let _target_highest_slotid = decode::u32(r)?;
    let _status_flags = decode::u32(r)?;
    Ok(SequenceResult { session_id, sequence_id })
}

pub fn decode_getfh_result(r: &mut dyn std::io::Read) -> Result<NfsFh4, Error> {
    NfsFh4::decode(r)
}

pub fn decode_getattr_result(r: &mut dyn std::io::Read) -> Result<Fattr4, Error> {
    Fattr4::decode(r)
}

pub struct OpenResult {
    pub stateid: StateId,
}

/// Decodes an `OPEN` result, tolerating only `OPEN_DELEGATE_NONE`/`_EXT` —
/// any other delegation type would mean the server ignored
/// `OPEN4_SHARE_ACCESS_WANT_NO_DELEG`, which this client cannot act on
/// (delegation state is out of scope).
pub fn decode_open_result(r: &mut dyn std::io::Read) -> Result<OpenResult, Error> {
    let stateid = StateId::decode(r)?;
    let _atomic = decode::boolean(r)?;
    let _before = decode::u64(r)?;
    let _after = decode::u64(r)?;
    let _rflags = decode::u32(r)?;
    let _attrset = decode::array(r, 4, |rr| decode::u32(rr))?;
    let delegation_type = decode::u32(r)?;
    match delegation_type {
        0 => {}
        4 => {
            let why = decode::u32(r)?;
            if why == 2 || why == 3 {
                let _server_will_push_deleg = decode::boolean(r)?;
            }
        }
        _other => {
            return Err(Error::CodecFailed(
                "server granted a delegation this client never requested",
            ))
        }
    }
    Ok(OpenResult { stateid })
}

pub struct ReadResult {
    pub eof: bool,
    pub data: Vec<u8>,
}

pub fn decode_read_result(r: &mut dyn std::io::Read, max_count: usize) -> Result<ReadResult, Error> {
    let eof = decode::boolean(r)?;
    let data = decode::opaque_var(r, max_count)?;
    Ok(ReadResult { eof, data })
}

pub struct WriteResult {
    pub count: u32,
    pub committed: u32,
    pub verifier: u64,
}

pub fn decode_write_result(r: &mut dyn std::io::Read) -> Result<WriteResult, Error> {
    let count = decode::u32(r)?;
    let committed = decode::u32(r)?;
    let verifier = decode::u64(r)?;
    Ok(WriteResult { count, committed, verifier })
}

pub struct ReadDirEntry {
    pub cookie: u64,
    pub name: String,
    pub attr: Fattr4,
}

pub struct ReadDirResult {
    pub cookie_verifier: u64,
    pub entries: Vec<ReadDirEntry>,
    pub eof: bool,
}

pub fn decode_readdir_result(
    r: &mut dyn std::io::Read,
    max_name: usize,
) -> Result<ReadDirResult, Error> {
    let cookie_verifier = decode::u64(r)?;
    let mut entries = Vec::new();
    while decode::boolean(r)? {
        let cookie = decode::u64(r)?;
        let name = decode::string(r, max_name)?;
        let attr = Fattr4::decode(r)?;
        entries.push(ReadDirEntry { cookie, name, attr });
    }
    let eof = decode::boolean(r)?;
    Ok(ReadDirResult { cookie_verifier, entries, eof })
}

pub fn decode_readlink_result(r: &mut dyn std::io::Read, max_len: usize) -> Result<String, Error> {
    decode::string(r, max_len)
}

pub struct ExchangeIdResult {
    pub client_id: u64,
    pub sequence_id: u32,
}

/// Decodes `EXCHANGE_ID`'s result, tolerating only `SP4_NONE` state
/// protection — the only kind this client ever requests.
pub fn decode_exchange_id_result(r: &mut dyn std::io::Read) -> Result<ExchangeIdResult, Error> {
    let client_id = decode::u64(r)?;
    let sequence_id = decode::u32(r)?;
    let _flags = decode::u32(r)?;
    let spr_how = decode::u32(r)?;
    if spr_how != 0 {
        return Err(Error::CodecFailed("server requires unsupported state protection"));
    }
    let _minor_id = decode::u64(r)?;
    let _major_id = decode::opaque_var(r, 256)?;
    let _server_scope = decode::opaque_var(r, 256)?;
    let _server_impl_id = decode::array(r, 4, |rr| {
        decode::string(rr, 256)?;
        decode::string(rr, 256)?;
        decode::i64(rr)?;
        decode::u32(rr)
    })?;
    Ok(ExchangeIdResult { client_id, sequence_id })
}

pub struct CreateSessionResult {
    pub session_id: SessionId,
    pub sequence_id: u32,
}

fn skip_channel_attrs(r: &mut dyn std::io::Read) -> Result<(), Error> {
    decode::u32(r)?;
    decode::u32(r)?;
    decode::u32(r)?;
    decode::u32(r)?;
    decode::u32(r)?;
    decode::u32(r)?;
    decode::array(r, 64, |rr| decode::u32(rr))?;
    Ok(())
}

pub fn decode_create_session_result(r: &mut dyn std::io::Read) -> Result<CreateSessionResult, Error> {
    let session_id = SessionId::decode(r)?;
    let sequence_id = decode::u32(r)?;
    let _flags = decode::u32(r)?;
    skip_channel_attrs(r)?;
    skip_channel_attrs(r)?;
    Ok(CreateSessionResult { session_id, sequence_id })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_produces_tag_minorversion_and_op_count() {
        let mut builder = CompoundBuilder::new("lookup");
        builder.sequence(SessionId([1; 16]), 0).unwrap();
        builder.put_root_fh().unwrap();
        builder.lookup("etc").unwrap();
        let bytes = builder.build().unwrap();

        let mut cursor = Cursor::new(bytes);
        assert_eq!(decode::string(&mut cursor, 64).unwrap(), "lookup");
        assert_eq!(decode::u32(&mut cursor).unwrap(), MINOR_VERSION);
        assert_eq!(decode::u32(&mut cursor).unwrap(), 3);
    }
}
