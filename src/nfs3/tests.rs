use super::client::Nfs3Client;
use super::*;
use crate::rpc::auth::{Credential, OpaqueAuth};
use crate::xdr::{decode, encode};
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

fn encode_fattr3(buf: &mut Vec<u8>, size: u64) {
    encode::u32(buf, 1).unwrap(); // Regular
    encode::u32(buf, 0o644).unwrap();
    encode::u32(buf, 1).unwrap();
    encode::u32(buf, 0).unwrap();
    encode::u32(buf, 0).unwrap();
    encode::u64(buf, size).unwrap();
    encode::u64(buf, size).unwrap();
    encode::u32(buf, 0).unwrap();
    encode::u32(buf, 0).unwrap();
    encode::u64(buf, 0).unwrap();
    encode::u64(buf, 1).unwrap();
    encode::u32(buf, 0).unwrap();
    encode::u32(buf, 0).unwrap();
    encode::u32(buf, 0).unwrap();
    encode::u32(buf, 0).unwrap();
    encode::u32(buf, 0).unwrap();
    encode::u32(buf, 0).unwrap();
}

#[tokio::test]
async fn get_attr_decodes_fattr3() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let (xid, proc) = read_call(&mut sock).await;
        assert_eq!(proc, NFSPROC3_GETATTR);

        let mut payload = Vec::new();
        encode_fattr3(&mut payload, 4096);
        write_reply(&mut sock, xid, &payload).await;
    });

    let mut client = Nfs3Client::connect(addr, false, Credential::None).await.unwrap();
    let handle = FileHandle3(vec![1, 2, 3]);
    let attr = client.get_attr(&handle).await.unwrap();
    assert_eq!(attr.size, 4096);
    assert_eq!(attr.file_type, FileType3::Regular);

    server.await.unwrap();
}

#[tokio::test]
async fn lookup_failure_maps_to_not_found() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let (xid, proc) = read_call(&mut sock).await;
        assert_eq!(proc, NFSPROC3_LOOKUP);

        let mut payload = Vec::new();
        encode::u32(&mut payload, 2).unwrap(); // NFS3ERR_NOENT
        encode::boolean(&mut payload, false).unwrap(); // no directory_attr
        write_reply(&mut sock, xid, &payload).await;
    });

    let mut client = Nfs3Client::connect(addr, false, Credential::None).await.unwrap();
    let handle = FileHandle3(vec![0]);
    let result = client.lookup(&handle, "missing").await;
    assert!(matches!(result, Err(crate::error::Error::NotFound)));

    server.await.unwrap();
}

#[tokio::test]
async fn read_file_drives_chunked_reads_to_eof() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();

        // FSINFO negotiates a tiny rtmax so two READs are needed.
        let (xid, proc) = read_call(&mut sock).await;
        assert_eq!(proc, NFSPROC3_FSINFO);
        let mut payload = Vec::new();
        encode::u32(&mut payload, 0).unwrap();
        encode::boolean(&mut payload, false).unwrap(); // no obj_attr
        encode::u32(&mut payload, 4).unwrap(); // rtmax
        encode::u32(&mut payload, 4).unwrap(); // rtpref
        encode::u32(&mut payload, 4).unwrap(); // rtmult
        encode::u32(&mut payload, 4).unwrap(); // wtmax
        encode::u32(&mut payload, 4).unwrap(); // wtpref
        encode::u32(&mut payload, 4).unwrap(); // wtmult
        encode::u32(&mut payload, 4).unwrap(); // dtpref
        encode::u64(&mut payload, u64::MAX).unwrap(); // maxfilesize
        encode::u32(&mut payload, 1).unwrap(); // time_delta secs
        encode::u32(&mut payload, 0).unwrap(); // time_delta nsecs
        encode::u32(&mut payload, 0).unwrap(); // properties
        write_reply(&mut sock, xid, &payload).await;

        let (xid, proc) = read_call(&mut sock).await;
        assert_eq!(proc, NFSPROC3_READ);
        let mut payload = Vec::new();
        encode::u32(&mut payload, 0).unwrap();
        encode::boolean(&mut payload, false).unwrap();
        encode::u32(&mut payload, 4).unwrap();
        encode::boolean(&mut payload, false).unwrap(); // not eof
        encode::opaque_var(&mut payload, b"abcd").unwrap();
        write_reply(&mut sock, xid, &payload).await;

        let (xid, proc) = read_call(&mut sock).await;
        assert_eq!(proc, NFSPROC3_READ);
        let mut payload = Vec::new();
        encode::u32(&mut payload, 0).unwrap();
        encode::boolean(&mut payload, false).unwrap();
        encode::u32(&mut payload, 2).unwrap();
        encode::boolean(&mut payload, true).unwrap(); // eof
        encode::opaque_var(&mut payload, b"ef").unwrap();
        write_reply(&mut sock, xid, &payload).await;
    });

    let mut client = Nfs3Client::connect(addr, false, Credential::None).await.unwrap();
    let handle = FileHandle3(vec![9]);
    client.negotiate(&handle).await.unwrap();
    let data = client.read_file(&handle).await.unwrap();
    assert_eq!(data, b"abcdef");

    server.await.unwrap();
}

#[tokio::test]
async fn path_resolve_chains_lookups() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();

        for expect_handle in [vec![0u8], vec![1u8]] {
            let (xid, proc) = read_call(&mut sock).await;
            assert_eq!(proc, NFSPROC3_LOOKUP);
            let mut payload = Vec::new();
            encode::u32(&mut payload, 0).unwrap();
            encode::opaque_var(&mut payload, &[expect_handle[0] + 1]).unwrap();
            encode::boolean(&mut payload, false).unwrap();
            encode::boolean(&mut payload, false).unwrap();
            write_reply(&mut sock, xid, &payload).await;
        }
    });

    let mut client = Nfs3Client::connect(addr, false, Credential::None).await.unwrap();
    let root = FileHandle3(vec![0]);
    let resolved = path::resolve(&mut client, &root, "a/b").await.unwrap();
    assert_eq!(resolved.0, vec![2]);

    server.await.unwrap();
}
