//! Wire framing for ONC/RPC over TCP (record marking) and UDP (datagram).
//!
//! TCP messages are split into one or more XDR record fragments: a `u32`
//! header whose high bit marks the last fragment and whose low 31 bits carry
//! the fragment's byte length. This client always sends a single fragment
//! per message but must coalesce multiple incoming fragments, since a
//! server is free to split a reply across several.

use crate::error::Error;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;

const LAST_FRAGMENT_BIT: u32 = 1 << 31;
const FRAGMENT_LEN_MASK: u32 = !LAST_FRAGMENT_BIT;

/// Candidate source ports tried, in order, when binding a "secure" socket
/// (port `< 1024`), as RFC 1057/1813 recommend for trusted clients.
fn secure_port_candidates() -> impl Iterator<Item = u16> {
    1u16..=1023
}

/// Connects a TCP stream to `addr`, optionally binding the local endpoint to
/// a low (`<1024`) source port first.
pub async fn connect_tcp(addr: SocketAddr, use_secure_port: bool) -> Result<TcpStream, Error> {
    if !use_secure_port {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        return Ok(stream);
    }

    let local_family = if addr.is_ipv4() { "0.0.0.0" } else { "::" };
    for port in secure_port_candidates() {
        let local: SocketAddr = format!("{local_family}:{port}").parse().expect("valid local addr");
        let socket = if addr.is_ipv4() {
            tokio::net::TcpSocket::new_v4()?
        } else {
            tokio::net::TcpSocket::new_v6()?
        };
        match socket.bind(local) {
            Ok(()) => match socket.connect(addr).await {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => continue,
                Err(e) => return Err(e.into()),
            },
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::Transport(std::io::Error::new(
        std::io::ErrorKind::AddrInUse,
        "no secure port available in [1, 1023]",
    )))
}

/// Binds a UDP socket, optionally on a low source port, per the same
/// secure-port contract as [`connect_tcp`].
pub async fn bind_udp(use_secure_port: bool) -> Result<UdpSocket, Error> {
    if !use_secure_port {
        return Ok(UdpSocket::bind("0.0.0.0:0").await?);
    }
    for port in secure_port_candidates() {
        match UdpSocket::bind(("0.0.0.0", port)).await {
            Ok(socket) => return Ok(socket),
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(Error::Transport(std::io::Error::new(
        std::io::ErrorKind::AddrInUse,
        "no secure port available in [1, 1023]",
    )))
}

/// Writes one complete RPC message as a single last-fragment TCP record.
pub async fn write_tcp_message(stream: &mut TcpStream, msg: &[u8]) -> Result<(), Error> {
    let len: u32 = msg
        .len()
        .try_into()
        .map_err(|_| Error::CodecFailed("message too large to frame"))?;
    let header = len | LAST_FRAGMENT_BIT;
    stream.write_u32(header).await?;
    stream.write_all(msg).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads one complete RPC message, coalescing fragments until the
/// last-fragment bit is observed, under an overall deadline.
pub async fn read_tcp_message(stream: &mut TcpStream, deadline: Duration) -> Result<Vec<u8>, Error> {
    timeout(deadline, async {
        let mut message = Vec::new();
        loop {
            let header = stream.read_u32().await?;
            let len = (header & FRAGMENT_LEN_MASK) as usize;
            let last = header & LAST_FRAGMENT_BIT != 0;
            let mut fragment = vec![0u8; len];
            stream.read_exact(&mut fragment).await?;
            message.extend_from_slice(&fragment);
            if last {
                return Ok::<_, Error>(message);
            }
        }
    })
    .await
    .map_err(|_| Error::Timeout)?
}

/// Sends a single UDP datagram containing the whole message.
pub async fn write_udp_message(socket: &UdpSocket, msg: &[u8]) -> Result<(), Error> {
    socket.send(msg).await?;
    Ok(())
}

/// Receives a single UDP datagram under a deadline.
pub async fn read_udp_message(socket: &UdpSocket, deadline: Duration) -> Result<Vec<u8>, Error> {
    let mut buf = vec![0u8; 65536];
    let n = timeout(deadline, socket.recv(&mut buf)).await.map_err(|_| Error::Timeout)??;
    buf.truncate(n);
    Ok(buf)
}
