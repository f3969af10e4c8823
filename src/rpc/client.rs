//! A single ONC/RPC call/reply round trip over either TCP or UDP.
//!
//! One [`RpcClient`] owns one socket and issues calls serially — this
//! matches the concurrency model of a single connection: reply to
//! request N is observed before request N+1 is issued.

use super::auth::Credential;
use super::{transport, CallHeader, ReplyOutcome};
use crate::error::Error;
use std::io::Cursor;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// The two wire transports this crate speaks; NFSv3/Mount/Portmapper may use
/// either, NFSv4.1 always uses TCP.
enum Socket {
    Tcp(TcpStream),
    Udp { socket: UdpSocket, peer: SocketAddr },
}

/// A connected ONC/RPC client: one socket, one credential, one xid stream.
pub struct RpcClient {
    socket: Socket,
    next_xid: u32,
    pub timeout: Duration,
    pub credential: Credential,
}

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

fn seed_xid() -> u32 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().subsec_nanos();
    nanos ^ std::process::id()
}

impl RpcClient {
    /// Connects over TCP, optionally from a secure (`<1024`) source port.
    pub async fn connect_tcp(
        addr: SocketAddr,
        use_secure_port: bool,
        credential: Credential,
    ) -> Result<Self, Error> {
        let stream = transport::connect_tcp(addr, use_secure_port).await?;
        Ok(RpcClient {
            socket: Socket::Tcp(stream),
            next_xid: seed_xid(),
            timeout: DEFAULT_TIMEOUT,
            credential,
        })
    }

    /// Binds a UDP socket (used by the Portmapper client) addressed at `peer`.
    pub async fn connect_udp(
        peer: SocketAddr,
        use_secure_port: bool,
        credential: Credential,
    ) -> Result<Self, Error> {
        let socket = transport::bind_udp(use_secure_port).await?;
        Ok(RpcClient {
            socket: Socket::Udp { socket, peer },
            next_xid: seed_xid(),
            timeout: DEFAULT_TIMEOUT,
            credential,
        })
    }

    fn fresh_xid(&mut self) -> u32 {
        self.next_xid = self.next_xid.wrapping_add(1);
        self.next_xid
    }

    /// Issues `program.version.procedure(args)` and returns the decoded
    /// result payload bytes (i.e. everything after the RPC reply header).
    ///
    /// Replies whose `xid` doesn't match the call just sent are discarded
    /// as stale/duplicate and the wait continues, all within one overall
    /// `self.timeout` deadline.
    pub async fn call(
        &mut self,
        program: u32,
        version: u32,
        procedure: u32,
        args: &[u8],
    ) -> Result<Vec<u8>, Error> {
        let xid = self.fresh_xid();
        let header = CallHeader {
            xid,
            program,
            version,
            procedure,
            cred: self.credential.to_opaque_auth(xid),
            verf: super::auth::OpaqueAuth::none(),
        };

        let mut message = Vec::with_capacity(64 + args.len());
        header.encode(&mut message).map_err(Error::from)?;
        message.extend_from_slice(args);

        debug!(xid, program, version, procedure, "rpc call");

        let deadline = self.timeout;
        let result = timeout(deadline, self.send_and_correlate(xid, &message)).await;
        match result {
            Ok(inner) => inner,
            Err(_) => {
                warn!(xid, "rpc call timed out");
                Err(Error::Timeout)
            }
        }
    }

    async fn send_and_correlate(&mut self, xid: u32, message: &[u8]) -> Result<Vec<u8>, Error> {
        match &mut self.socket {
            Socket::Tcp(stream) => {
                transport::write_tcp_message(stream, message).await?;
                loop {
                    let reply = transport::read_tcp_message(stream, self.timeout).await?;
                    if let Some(payload) = Self::correlate(xid, &reply)? {
                        return Ok(payload);
                    }
                }
            }
            Socket::Udp { socket, peer } => {
                socket.send_to(message, *peer).await?;
                loop {
                    let reply = transport::read_udp_message(socket, self.timeout).await?;
                    if let Some(payload) = Self::correlate(xid, &reply)? {
                        return Ok(payload);
                    }
                }
            }
        }
    }

    fn correlate(xid: u32, reply: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let mut cursor = Cursor::new(reply);
        let (reply_xid, outcome) = super::decode_reply_header(&mut cursor)?;
        if reply_xid != xid {
            trace!(expected = xid, got = reply_xid, "discarding stale rpc reply");
            return Ok(None);
        }
        match outcome {
            ReplyOutcome::Accepted => {
                let pos = cursor.position() as usize;
                Ok(Some(reply[pos..].to_vec()))
            }
            ReplyOutcome::Rejected(e) => Err(e),
        }
    }
}
