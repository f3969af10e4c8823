use super::*;
use crate::rpc::auth::{Credential, OpaqueAuth};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn read_call(sock: &mut TcpStream) -> (u32, u32) {
    let header = sock.read_u32().await.unwrap();
    let len = (header & 0x7fff_ffff) as usize;
    let mut body = vec![0u8; len];
    sock.read_exact(&mut body).await.unwrap();
    let mut cursor = std::io::Cursor::new(body);
    let xid = decode::u32(&mut cursor).unwrap();
    decode::u32(&mut cursor).unwrap(); // msg_type
    decode::u32(&mut cursor).unwrap(); // rpcvers
    decode::u32(&mut cursor).unwrap(); // program
    decode::u32(&mut cursor).unwrap(); // version
    let procedure = decode::u32(&mut cursor).unwrap();
    OpaqueAuth::decode(&mut cursor).unwrap();
    OpaqueAuth::decode(&mut cursor).unwrap();
    (xid, procedure)
}

async fn write_reply(sock: &mut TcpStream, xid: u32, payload: &[u8]) {
    let mut reply = Vec::new();
    encode::u32(&mut reply, xid).unwrap();
    encode::u32(&mut reply, 1).unwrap();
    encode::u32(&mut reply, 0).unwrap();
    OpaqueAuth::none().encode(&mut reply).unwrap();
    encode::u32(&mut reply, 0).unwrap();
    reply.extend_from_slice(payload);
    let header = (reply.len() as u32) | (1 << 31);
    sock.write_u32(header).await.unwrap();
    sock.write_all(&reply).await.unwrap();
    sock.flush().await.unwrap();
}

#[tokio::test]
async fn mnt_returns_handle_and_auth_flavors() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let (xid, proc) = read_call(&mut sock).await;
        assert_eq!(proc, PROC_MNT);

        let mut payload = Vec::new();
        encode::u32(&mut payload, 0).unwrap(); // status OK
        encode::opaque_var(&mut payload, &[1, 2, 3, 4]).unwrap();
        encode::array(&mut payload, &[0u32, 1u32], |v, w| encode::u32(w, *v)).unwrap();
        write_reply(&mut sock, xid, &payload).await;
    });

    let mut client = MountClient::connect(addr, false, Credential::None).await.unwrap();
    let result = client.mnt("/srv/nfs").await.unwrap();
    assert_eq!(result.file_handle.0, vec![1, 2, 3, 4]);
    assert_eq!(result.auth_flavors, vec![0, 1]);

    server.await.unwrap();
}

#[tokio::test]
async fn mnt_failure_maps_to_mount_failed_errno() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let (xid, _) = read_call(&mut sock).await;
        let mut payload = Vec::new();
        encode::u32(&mut payload, 2).unwrap(); // ENOENT
        write_reply(&mut sock, xid, &payload).await;
    });

    let mut client = MountClient::connect(addr, false, Credential::None).await.unwrap();
    let result = client.mnt("/nope").await;
    assert!(matches!(result, Err(Error::MountFailed(2))));

    server.await.unwrap();
}

#[tokio::test]
async fn export_flattens_linked_list() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let (xid, proc) = read_call(&mut sock).await;
        assert_eq!(proc, PROC_EXPORT);

        let mut payload = Vec::new();
        // First entry: "/srv/nfs" with groups ["*"]
        encode::boolean(&mut payload, true).unwrap();
        encode::string(&mut payload, "/srv/nfs").unwrap();
        encode::boolean(&mut payload, true).unwrap();
        encode::string(&mut payload, "*").unwrap();
        encode::boolean(&mut payload, false).unwrap();
        // Second entry: "/srv/home" with no groups
        encode::boolean(&mut payload, true).unwrap();
        encode::string(&mut payload, "/srv/home").unwrap();
        encode::boolean(&mut payload, false).unwrap();
        // terminator
        encode::boolean(&mut payload, false).unwrap();

        write_reply(&mut sock, xid, &payload).await;
    });

    let mut client = MountClient::connect(addr, false, Credential::None).await.unwrap();
    let entries = client.export().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].directory, "/srv/nfs");
    assert_eq!(entries[0].groups, vec!["*".to_string()]);
    assert_eq!(entries[1].directory, "/srv/home");
    assert!(entries[1].groups.is_empty());

    server.await.unwrap();
}
