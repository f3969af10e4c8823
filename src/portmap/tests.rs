use super::*;
use crate::rpc::auth::OpaqueAuth;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Minimal fake Portmapper server: accepts one connection, answers exactly
/// one `GETPORT` call with the given port, framed as a single TCP fragment.
async fn fake_portmap_server(listener: TcpListener, answer_port: u32) {
    let (mut sock, _) = listener.accept().await.unwrap();

    let header = sock.read_u32().await.unwrap();
    let len = (header & 0x7fff_ffff) as usize;
    let mut body = vec![0u8; len];
    sock.read_exact(&mut body).await.unwrap();

    let mut cursor = std::io::Cursor::new(&body[..]);
    let xid = decode::u32(&mut cursor).unwrap();
    // skip msg_type, rpcvers, program, version, procedure
    for _ in 0..5 {
        decode::u32(&mut cursor).unwrap();
    }
    let _cred = OpaqueAuth::decode(&mut cursor).unwrap();
    let _verf = OpaqueAuth::decode(&mut cursor).unwrap();

    let mut reply = Vec::new();
    encode::u32(&mut reply, xid).unwrap();
    encode::u32(&mut reply, 1).unwrap(); // REPLY
    encode::u32(&mut reply, 0).unwrap(); // MSG_ACCEPTED
    OpaqueAuth::none().encode(&mut reply).unwrap();
    encode::u32(&mut reply, 0).unwrap(); // SUCCESS
    encode::u32(&mut reply, answer_port).unwrap();

    let out_header = (reply.len() as u32) | (1 << 31);
    sock.write_u32(out_header).await.unwrap();
    sock.write_all(&reply).await.unwrap();
    sock.flush().await.unwrap();
}

#[tokio::test]
async fn get_port_resolves_registered_service() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(fake_portmap_server(listener, 2049));

    let mut client = PortmapClient::connect_tcp(addr, false).await.unwrap();
    let port = client.get_port(100003, 3, Protocol::Tcp).await.unwrap();
    assert_eq!(port, Some(2049));

    server.await.unwrap();
}

#[tokio::test]
async fn get_port_returns_none_when_unregistered() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(fake_portmap_server(listener, 0));

    let mut client = PortmapClient::connect_tcp(addr, false).await.unwrap();
    let port = client.get_port(100003, 3, Protocol::Tcp).await.unwrap();
    assert_eq!(port, None);

    server.await.unwrap();
}
