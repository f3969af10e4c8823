//! NFSv4.1 session state machine (RFC 5661 §2.10, §18.35-18.36).
//!
//! Walks `CONNECTED -> CLIENT_ID -> SESSION_READY -> OPERATING` on
//! [`Session::establish`], then every subsequent compound submitted through
//! [`Session::execute`] is framed with `SEQUENCE`, retried on
//! `NFS4ERR_GRACE`/`NFS4ERR_DELAY`, and rebuilt from `CLIENT_ID` on
//! `NFS4ERR_BADSESSION`.

use super::compound::{self, CompoundBuilder, CompoundCursor};
use super::types::{ClientOwner, SessionId};
use super::{NFS4ERR_BADSESSION, NFS4ERR_BAD_SEQID, NFS4ERR_DELAY, NFS4ERR_GRACE};
use crate::error::Error;
use crate::rpc::auth::Credential;
use crate::rpc::client::RpcClient;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Grace/delay retry budget: ~100 attempts at 1s each.
const RETRY_BUDGET: u32 = 100;
const RETRY_DELAY: Duration = Duration::from_secs(1);
/// Keep-alive threshold: a SEQUENCE-only compound is issued once this much
/// time has passed since the last successfully processed SEQUENCE.
pub const KEEPALIVE_THRESHOLD: Duration = Duration::from_secs(59);

fn seed_verifier() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos();
    (nanos as u64) ^ (std::process::id() as u64).rotate_left(32)
}

/// `{ client_id, verifier, session_id, sequence_id, max_req_size,
/// max_rep_size, last_activity_at }` tracked for one NFSv4.1 session.
pub struct Session {
    rpc: RpcClient,
    client_id: u64,
    client_verifier: u64,
    session_id: SessionId,
    sequence_id: u32,
    pub max_req_size: u32,
    pub max_rep_size: u32,
    last_activity_at: Instant,
}

impl Session {
    pub async fn establish(
        addr: SocketAddr,
        use_secure_port: bool,
        credential: Credential,
    ) -> Result<Self, Error> {
        let rpc = RpcClient::connect_tcp(addr, use_secure_port, credential).await?;
        let mut session = Session {
            rpc,
            client_id: 0,
            client_verifier: 0,
            session_id: SessionId([0; 16]),
            sequence_id: 0,
            max_req_size: 1_048_576,
            max_rep_size: 1_048_576,
            last_activity_at: Instant::now(),
        };
        session.exchange_id().await?;
        session.create_session().await?;
        session.reclaim_complete().await?;
        Ok(session)
    }

    fn owner(&self) -> ClientOwner {
        ClientOwner { verifier: self.client_verifier, owner_id: b"nfs-mamont-client".to_vec() }
    }

    pub fn client_id(&self) -> u64 {
        self.client_id
    }

    async fn raw_compound(&mut self, args: Vec<u8>) -> Result<CompoundCursor, Error> {
        let reply = self
            .rpc
            .call(super::PROGRAM, super::VERSION, super::PROC_COMPOUND, &args)
            .await?;
        CompoundCursor::decode(reply)
    }

    /// `EXCHANGE_ID`: CONNECTED -> CLIENT_ID.
    async fn exchange_id(&mut self) -> Result<(), Error> {
        self.client_verifier = seed_verifier();
        let mut builder = CompoundBuilder::new("exchange_id");
        builder.exchange_id(&self.owner()).map_err(Error::from)?;
        let args = builder.build().map_err(Error::from)?;

        let mut cursor = self.raw_compound(args).await?;
        if let Some(e) = crate::error::from_nfs4_status(cursor.status) {
            return Err(e);
        }
        let (_opcode, status) = cursor.op_header()?;
        if let Some(e) = crate::error::from_nfs4_status(status) {
            return Err(e);
        }
        let result = compound::decode_exchange_id_result(cursor.reader())?;
        self.client_id = result.client_id;
        debug!(client_id = self.client_id, "exchange_id complete");
        Ok(())
    }

    /// `CREATE_SESSION`: CLIENT_ID -> SESSION_READY. Resets `sequence_id`
    /// to 0, since `CREATE_SESSION` always starts a session's sequencing fresh.
    async fn create_session(&mut self) -> Result<(), Error> {
        let mut builder = CompoundBuilder::new("create_session");
        builder.create_session(self.client_id, 0).map_err(Error::from)?;
        let args = builder.build().map_err(Error::from)?;

        let mut cursor = self.raw_compound(args).await?;
        if let Some(e) = crate::error::from_nfs4_status(cursor.status) {
            return Err(e);
        }
        let (_opcode, status) = cursor.op_header()?;
        if let Some(e) = crate::error::from_nfs4_status(status) {
            return Err(e);
        }
        let result = compound::decode_create_session_result(cursor.reader())?;
        self.session_id = result.session_id;
        self.sequence_id = 0;
        self.last_activity_at = Instant::now();
        debug!("create_session complete");
        Ok(())
    }

    /// `SEQUENCE, RECLAIM_COMPLETE`: SESSION_READY -> OPERATING. There is no
    /// state to reclaim (this client never restarted a prior session), so
    /// `rca_one_fs` is always `false`.
    async fn reclaim_complete(&mut self) -> Result<(), Error> {
        self.execute(|builder| builder.reclaim_complete().map_err(Error::from).map(|_| ()))
            .await?;
        Ok(())
    }

    /// Rebuilds the session from `CLIENT_ID` after `NFS4ERR_BADSESSION`:
    /// `CREATE_SESSION` again against the existing `client_id`, skipping
    /// `EXCHANGE_ID` since the client identity is still valid.
    async fn rebuild_session(&mut self) -> Result<(), Error> {
        warn!(client_id = self.client_id, "session dropped by server, rebuilding");
        self.create_session().await?;
        self.reclaim_complete().await
    }

    /// Submits one compound, prefixed with `SEQUENCE`, applying the
    /// grace/delay retry policy and session-rebuild-on-`BADSESSION` policy.
    /// `build_ops` appends the compound's non-`SEQUENCE` operations.
    pub async fn execute(
        &mut self,
        build_ops: impl Fn(&mut CompoundBuilder) -> Result<(), Error>,
    ) -> Result<CompoundCursor, Error> {
        for attempt in 0..RETRY_BUDGET {
            let mut builder = CompoundBuilder::new("compound");
            builder.sequence(self.session_id, self.sequence_id).map_err(Error::from)?;
            build_ops(&mut builder)?;
            let args = builder.build().map_err(Error::from)?;

            let mut cursor = self.raw_compound(args).await?;
            let (_opcode, seq_status) = cursor.op_header()?;

            if seq_status == NFS4ERR_BADSESSION {
                self.rebuild_session().await?;
                continue;
            }
            if seq_status == NFS4ERR_BAD_SEQID {
                return Err(Error::SessionDead);
            }
            if let Some(e) = crate::error::from_nfs4_status(seq_status) {
                return Err(e);
            }

            // SEQUENCE itself succeeded, so it already advanced the slot's
            // sequence id on the server regardless of what the rest of the
            // compound does — consume that before inspecting anything else.
            let sequence_result = compound::decode_sequence_result(cursor.reader())?;
            self.sequence_id = sequence_result.sequence_id.wrapping_add(1);
            self.last_activity_at = Instant::now();

            // `cursor.status` is the compound's overall status, which RFC
            // 5661 §17.2.1 sets to the status of the first operation that
            // failed — GRACE/DELAY are returned by the state-changing op
            // later in the compound (OPEN, CREATE, REMOVE, ...), not by
            // SEQUENCE, so they only ever show up here.
            if cursor.status == NFS4ERR_GRACE || cursor.status == NFS4ERR_DELAY {
                debug!(attempt, status = cursor.status, "compound deferred, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }

            return Ok(cursor);
        }
        Err(Error::Unavailable)
    }

    /// Issues a `SEQUENCE`-only compound if the session has been idle past
    /// [`KEEPALIVE_THRESHOLD`], refreshing the server's lease without
    /// touching any file state.
    pub async fn keepalive_if_idle(&mut self) -> Result<(), Error> {
        if self.last_activity_at.elapsed() < KEEPALIVE_THRESHOLD {
            return Ok(());
        }
        self.execute(|_| Ok(())).await?;
        Ok(())
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity_at.elapsed()
    }

    /// `DESTROY_SESSION`: `OPERATING`/`SESSION_READY` -> `CLIENT_ID`. Sent
    /// standalone, without a `SEQUENCE` prefix, like the other
    /// session-bootstrap compounds.
    pub async fn destroy(&mut self) -> Result<(), Error> {
        let mut builder = CompoundBuilder::new("destroy_session");
        builder.destroy_session(self.session_id).map_err(Error::from)?;
        let args = builder.build().map_err(Error::from)?;

        let mut cursor = self.raw_compound(args).await?;
        let (_opcode, status) = cursor.op_header()?;
        if let Some(e) = crate::error::from_nfs4_status(status) {
            return Err(e);
        }
        debug!("destroy_session complete");
        Ok(())
    }
}

