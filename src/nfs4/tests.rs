use super::client::Nfs4Client;
use super::compound::*;
use super::types::NfsFh4;
use super::*;
use crate::rpc::auth::{Credential, OpaqueAuth};
use crate::xdr::{decode, encode};
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn read_call(sock: &mut TcpStream) -> (u32, Vec<u8>) {
    let header = sock.read_u32().await.unwrap();
    let len = (header & 0x7fff_ffff) as usize;
    let mut body = vec![0u8; len];
    sock.read_exact(&mut body).await.unwrap();
    let mut cursor = Cursor::new(body);
    let xid = decode::u32(&mut cursor).unwrap();
    decode::u32(&mut cursor).unwrap(); // msg_type
    decode::u32(&mut cursor).unwrap(); // rpcvers
    decode::u32(&mut cursor).unwrap(); // program
    decode::u32(&mut cursor).unwrap(); // version
    decode::u32(&mut cursor).unwrap(); // procedure, always PROC_COMPOUND
    OpaqueAuth::decode(&mut cursor).unwrap();
    OpaqueAuth::decode(&mut cursor).unwrap();
    let mut rest = Vec::new();
    std::io::Read::read_to_end(&mut cursor, &mut rest).unwrap();
    (xid, rest)
}

/// Decodes a compound call's `{ tag, minorversion, op_count }` header,
/// walking past each op's argument bytes in turn, and returns the opcodes in
/// call order. Only knows the shapes the tests below actually send.
fn decode_call_ops(args: &[u8]) -> (Cursor<Vec<u8>>, Vec<u32>) {
    let mut cursor = Cursor::new(args.to_vec());
    decode::string(&mut cursor, 64).unwrap();
    decode::u32(&mut cursor).unwrap();
    let op_count = decode::u32(&mut cursor).unwrap();
    let mut opcodes = Vec::new();
    for _ in 0..op_count {
        let opcode = decode::u32(&mut cursor).unwrap();
        skip_op_args(&mut cursor, opcode);
        opcodes.push(opcode);
    }
    (cursor, opcodes)
}

fn skip_channel_attrs(cursor: &mut Cursor<Vec<u8>>) {
    for _ in 0..5 {
        decode::u32(cursor).unwrap();
    }
    decode::array(cursor, 64, |r| decode::u32(r)).unwrap();
}

fn skip_op_args(cursor: &mut Cursor<Vec<u8>>, opcode: u32) {
    match opcode {
        OP_PUTROOTFH | OP_GETFH | OP_SAVEFH | OP_RESTOREFH | OP_READLINK => {}
        OP_SEQUENCE => {
            decode::opaque_fixed::<16>(cursor).unwrap();
            decode::u32(cursor).unwrap(); // sequence_id
            decode::u32(cursor).unwrap(); // slotid
            decode::u32(cursor).unwrap(); // highest_slotid
            decode::boolean(cursor).unwrap(); // cache_this
        }
        OP_PUTFH => {
            decode::opaque_var(cursor, FHSIZE4).unwrap();
        }
        OP_GETATTR => {
            decode::array(cursor, 4, |r| decode::u32(r)).unwrap();
        }
        OP_LOOKUP | OP_REMOVE | OP_LINK => {
            decode::string(cursor, MAXNAMLEN).unwrap();
        }
        OP_RENAME => {
            decode::string(cursor, MAXNAMLEN).unwrap();
            decode::string(cursor, MAXNAMLEN).unwrap();
        }
        OP_ACCESS => {
            decode::u32(cursor).unwrap();
        }
        OP_READDIR => {
            decode::u64(cursor).unwrap(); // cookie
            decode::u64(cursor).unwrap(); // cookie_verifier
            decode::u32(cursor).unwrap(); // dircount
            decode::u32(cursor).unwrap(); // maxcount
            decode::array(cursor, 4, |r| decode::u32(r)).unwrap();
        }
        OP_RECLAIM_COMPLETE => {
            decode::boolean(cursor).unwrap();
        }
        OP_EXCHANGE_ID => {
            decode::u64(cursor).unwrap(); // verifier
            decode::opaque_var(cursor, 256).unwrap(); // owner_id
            decode::u32(cursor).unwrap(); // eia_flags
            decode::u32(cursor).unwrap(); // spa_how
            decode::u32(cursor).unwrap(); // eia_client_impl_id count
        }
        OP_CREATE_SESSION => {
            decode::u64(cursor).unwrap(); // client_id
            decode::u32(cursor).unwrap(); // sequence_id
            decode::u32(cursor).unwrap(); // csa_flags
            skip_channel_attrs(cursor);
            skip_channel_attrs(cursor);
            decode::u32(cursor).unwrap(); // csa_cb_program
            decode::u32(cursor).unwrap(); // sec_parms count
            decode::u32(cursor).unwrap(); // cb_secflavor
        }
        other => panic!("test helper doesn't know how to skip op {other}"),
    }
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

/// Builds a `COMPOUND` reply `{ status, tag, resarray<> }` from
/// `(opcode, status, payload)` triples, mirroring `CompoundCursor`'s wire
/// shape exactly.
async fn write_compound_reply(sock: &mut TcpStream, xid: u32, ops: &[(u32, u32, Vec<u8>)]) {
    let mut body = Vec::new();
    let last_status = ops.last().map(|(_, s, _)| *s).unwrap_or(0);
    encode::u32(&mut body, last_status).unwrap();
    encode::string(&mut body, "reply").unwrap();
    encode::u32(&mut body, ops.len() as u32).unwrap();
    for (opcode, status, payload) in ops {
        encode::u32(&mut body, *opcode).unwrap();
        encode::u32(&mut body, *status).unwrap();
        body.extend_from_slice(payload);
    }
    write_reply(sock, xid, &body).await;
}

fn sequence_result_payload(session_id: [u8; 16], sequence_id: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    encode::opaque_fixed(&mut buf, &session_id).unwrap();
    encode::u32(&mut buf, sequence_id).unwrap();
    encode::u32(&mut buf, 0).unwrap(); // slotid
    encode::u32(&mut buf, 0).unwrap(); // highest_slotid
    encode::u32(&mut buf, 0).unwrap(); // target_highest_slotid
    encode::u32(&mut buf, 0).unwrap(); // status_flags
    buf
}

fn channel_attrs_reply(buf: &mut Vec<u8>) {
    encode::u32(buf, 0).unwrap();
    encode::u32(buf, 1_048_576).unwrap();
    encode::u32(buf, 1_048_576).unwrap();
    encode::u32(buf, 4096).unwrap();
    encode::u32(buf, 8).unwrap();
    encode::u32(buf, 1).unwrap();
    encode::u32(buf, 0).unwrap(); // ca_rdma_ior<>, count 0
}

fn fattr4_payload(file_type: u32, size: u64, mode: u32) -> Vec<u8> {
    let mut words = [0u32; 2];
    for bit in [1u32, 4, 33, 47, 50, 52] {
        words[(bit / 32) as usize] |= 1 << (bit % 32);
    }
    let mut attr_vals = Vec::new();
    encode::u32(&mut attr_vals, file_type).unwrap();
    encode::u64(&mut attr_vals, size).unwrap();
    encode::u32(&mut attr_vals, mode).unwrap();
    for _ in 0..3 {
        encode::i64(&mut attr_vals, 0).unwrap();
        encode::u32(&mut attr_vals, 0).unwrap();
    }

    let mut buf = Vec::new();
    encode::array(&mut buf, &words, |w, d| encode::u32(d, *w)).unwrap();
    encode::opaque_var(&mut buf, &attr_vals).unwrap();
    buf
}

/// Drives the three bootstrap compounds (`EXCHANGE_ID`, `CREATE_SESSION`,
/// `SEQUENCE+RECLAIM_COMPLETE`) plus `connect()`'s own `SEQUENCE,
/// PUTROOTFH, GETFH`, replying as a cooperative server would. Returns the
/// root handle bytes the client will have received.
async fn drive_handshake(sock: &mut TcpStream, session_id: [u8; 16], root_fh: &[u8]) {
    let (xid, args) = read_call(sock).await;
    let (_cursor, opcodes) = decode_call_ops(&args);
    assert_eq!(opcodes, vec![OP_EXCHANGE_ID]);
    let mut payload = Vec::new();
    encode::u64(&mut payload, 99).unwrap(); // client_id
    encode::u32(&mut payload, 0).unwrap(); // sequence_id
    encode::u32(&mut payload, 0).unwrap(); // flags
    encode::u32(&mut payload, 0).unwrap(); // spr_how = SP4_NONE
    encode::u64(&mut payload, 0).unwrap(); // minor_id
    encode::opaque_var(&mut payload, b"").unwrap(); // major_id
    encode::opaque_var(&mut payload, b"").unwrap(); // server_scope
    encode::u32(&mut payload, 0).unwrap(); // server_impl_id<1>, count 0
    write_compound_reply(sock, xid, &[(OP_EXCHANGE_ID, 0, payload)]).await;

    let (xid, args) = read_call(sock).await;
    let (_cursor, opcodes) = decode_call_ops(&args);
    assert_eq!(opcodes, vec![OP_CREATE_SESSION]);
    let mut payload = Vec::new();
    encode::opaque_fixed(&mut payload, &session_id).unwrap();
    encode::u32(&mut payload, 0).unwrap(); // sequence_id
    encode::u32(&mut payload, 0).unwrap(); // flags
    channel_attrs_reply(&mut payload);
    channel_attrs_reply(&mut payload);
    write_compound_reply(sock, xid, &[(OP_CREATE_SESSION, 0, payload)]).await;

    let (xid, args) = read_call(sock).await;
    let (_cursor, opcodes) = decode_call_ops(&args);
    assert_eq!(opcodes, vec![OP_SEQUENCE, OP_RECLAIM_COMPLETE]);
    write_compound_reply(
        sock,
        xid,
        &[(OP_SEQUENCE, 0, sequence_result_payload(session_id, 1)), (OP_RECLAIM_COMPLETE, 0, vec![])],
    )
    .await;

    let (xid, args) = read_call(sock).await;
    let (_cursor, opcodes) = decode_call_ops(&args);
    assert_eq!(opcodes, vec![OP_SEQUENCE, OP_PUTROOTFH, OP_GETFH]);
    let mut fh_payload = Vec::new();
    encode::opaque_var(&mut fh_payload, root_fh).unwrap();
    write_compound_reply(
        sock,
        xid,
        &[
            (OP_SEQUENCE, 0, sequence_result_payload(session_id, 2)),
            (OP_PUTROOTFH, 0, vec![]),
            (OP_GETFH, 0, fh_payload),
        ],
    )
    .await;
}

#[tokio::test]
async fn connect_resolves_root_handle_through_handshake() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let session_id = [7u8; 16];

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        drive_handshake(&mut sock, session_id, &[0u8]).await;
    });

    let client = Nfs4Client::connect(addr, false, Credential::None).await.unwrap();
    assert_eq!(client.root().0, vec![0u8]);

    server.await.unwrap();
}

#[tokio::test]
async fn lookup_decodes_file_handle_and_attrs() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let session_id = [3u8; 16];

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        drive_handshake(&mut sock, session_id, &[0u8]).await;

        let (xid, args) = read_call(&mut sock).await;
        let (_cursor, opcodes) = decode_call_ops(&args);
        assert_eq!(opcodes, vec![OP_SEQUENCE, OP_PUTFH, OP_LOOKUP, OP_GETFH, OP_GETATTR]);

        let mut fh_payload = Vec::new();
        encode::opaque_var(&mut fh_payload, &[5u8]).unwrap();
        write_compound_reply(
            &mut sock,
            xid,
            &[
                (OP_SEQUENCE, 0, sequence_result_payload(session_id, 3)),
                (OP_PUTFH, 0, vec![]),
                (OP_LOOKUP, 0, vec![]),
                (OP_GETFH, 0, fh_payload),
                (OP_GETATTR, 0, fattr4_payload(1, 4096, 0o644)),
            ],
        )
        .await;
    });

    let mut client = Nfs4Client::connect(addr, false, Credential::None).await.unwrap();
    let root = client.root().clone();
    let looked_up = client.lookup(&root, "etc").await.unwrap();
    assert_eq!(looked_up.file.0, vec![5u8]);
    assert_eq!(looked_up.attr.size, 4096);

    server.await.unwrap();
}

#[tokio::test]
async fn read_dir_collects_entries_and_verifier() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let session_id = [4u8; 16];

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        drive_handshake(&mut sock, session_id, &[0u8]).await;

        let (xid, args) = read_call(&mut sock).await;
        let (_cursor, opcodes) = decode_call_ops(&args);
        assert_eq!(opcodes, vec![OP_SEQUENCE, OP_PUTFH, OP_ACCESS, OP_READDIR]);

        let mut access_payload = Vec::new();
        encode::u32(&mut access_payload, 0x3f).unwrap();
        encode::u32(&mut access_payload, 0x3f).unwrap();

        let mut readdir_payload = Vec::new();
        encode::u64(&mut readdir_payload, 77).unwrap(); // cookie_verifier
        encode::boolean(&mut readdir_payload, true).unwrap();
        encode::u64(&mut readdir_payload, 1).unwrap(); // cookie
        encode::string(&mut readdir_payload, "file.txt").unwrap();
        readdir_payload.extend_from_slice(&fattr4_payload(1, 10, 0o644));
        encode::boolean(&mut readdir_payload, false).unwrap(); // no more entries
        encode::boolean(&mut readdir_payload, true).unwrap(); // eof

        write_compound_reply(
            &mut sock,
            xid,
            &[
                (OP_SEQUENCE, 0, sequence_result_payload(session_id, 3)),
                (OP_PUTFH, 0, vec![]),
                (OP_ACCESS, 0, access_payload),
                (OP_READDIR, 0, readdir_payload),
            ],
        )
        .await;
    });

    let mut client = Nfs4Client::connect(addr, false, Credential::None).await.unwrap();
    let root = client.root().clone();
    let entries = client.list_dir(&root).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "file.txt");
    assert_eq!(entries[0].attr.size, 10);

    server.await.unwrap();
}

#[tokio::test]
async fn grace_status_triggers_retry_with_bumped_sequence() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let session_id = [9u8; 16];

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        drive_handshake(&mut sock, session_id, &[0u8]).await;

        // First attempt: SEQUENCE itself succeeds (and still advances the
        // slot's sequence id), but GETATTR — the state-changing-ish op
        // later in the compound — reports NFS4ERR_GRACE, which is what the
        // compound's overall status carries.
        let (xid, args) = read_call(&mut sock).await;
        let (_cursor, opcodes) = decode_call_ops(&args);
        assert_eq!(opcodes, vec![OP_SEQUENCE, OP_PUTFH, OP_GETATTR]);
        write_compound_reply(
            &mut sock,
            xid,
            &[
                (OP_SEQUENCE, 0, sequence_result_payload(session_id, 2)),
                (OP_PUTFH, 0, vec![]),
                (OP_GETATTR, NFS4ERR_GRACE, vec![]),
            ],
        )
        .await;

        // Retry succeeds.
        let (xid, args) = read_call(&mut sock).await;
        let (_cursor, opcodes) = decode_call_ops(&args);
        assert_eq!(opcodes, vec![OP_SEQUENCE, OP_PUTFH, OP_GETATTR]);
        write_compound_reply(
            &mut sock,
            xid,
            &[
                (OP_SEQUENCE, 0, sequence_result_payload(session_id, 3)),
                (OP_PUTFH, 0, vec![]),
                (OP_GETATTR, 0, fattr4_payload(2, 0, 0o755)),
            ],
        )
        .await;
    });

    let mut client = Nfs4Client::connect(addr, false, Credential::None).await.unwrap();
    let root = client.root().clone();
    let attr = client.get_attr(&root).await.unwrap();
    assert_eq!(attr.mode, 0o755);

    server.await.unwrap();
}
