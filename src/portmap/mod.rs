//! Portmapper v2 client (RFC 1833 §3, program 100000 version 2).
//!
//! Used to resolve `(program, version, protocol)` to a TCP/UDP port on the
//! target host's port 111 when the caller hasn't fixed a port in
//! [`crate::facade::ConnectOptions`].

#[cfg(test)]
mod tests;

use crate::error::Error;
use crate::rpc::auth::Credential;
use crate::rpc::client::RpcClient;
use crate::xdr::{decode, encode};
use std::net::SocketAddr;

/// Portmapper well-known program number.
pub const PROGRAM: u32 = 100000;
/// Portmapper protocol version this client speaks.
pub const VERSION: u32 = 2;
/// Well-known Portmapper port.
pub const PORT: u16 = 111;

const PROC_NULL: u32 = 0;
const PROC_GETPORT: u32 = 3;

/// `protocol` field of a `GETPORT` request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    fn as_ipproto(self) -> u32 {
        match self {
            Protocol::Tcp => 6,
            Protocol::Udp => 17,
        }
    }
}

/// A connected Portmapper client over either transport.
pub struct PortmapClient {
    rpc: RpcClient,
}

impl PortmapClient {
    pub async fn connect_tcp(host: SocketAddr, use_secure_port: bool) -> Result<Self, Error> {
        let rpc = RpcClient::connect_tcp(host, use_secure_port, Credential::None).await?;
        Ok(PortmapClient { rpc })
    }

    pub async fn connect_udp(host: SocketAddr, use_secure_port: bool) -> Result<Self, Error> {
        let rpc = RpcClient::connect_udp(host, use_secure_port, Credential::None).await?;
        Ok(PortmapClient { rpc })
    }

    /// `NULL(0)`: liveness ping.
    pub async fn null(&mut self) -> Result<(), Error> {
        self.rpc.call(PROGRAM, VERSION, PROC_NULL, &[]).await?;
        Ok(())
    }

    /// `GETPORT(3)`: resolves `program`/`version`/`protocol` to a port.
    /// Returns `None` if the service isn't registered (wire value `0`).
    pub async fn get_port(
        &mut self,
        program: u32,
        version: u32,
        protocol: Protocol,
    ) -> Result<Option<u16>, Error> {
        let mut args = Vec::new();
        encode::u32(&mut args, program)?;
        encode::u32(&mut args, version)?;
        encode::u32(&mut args, protocol.as_ipproto())?;
        encode::u32(&mut args, 0)?; // port field is ignored on the wire for requests

        let reply = self.rpc.call(PROGRAM, VERSION, PROC_GETPORT, &args).await?;
        let mut cursor = std::io::Cursor::new(reply);
        let port = decode::u32(&mut cursor)?;
        if port == 0 {
            Ok(None)
        } else {
            Ok(Some(port as u16))
        }
    }
}
