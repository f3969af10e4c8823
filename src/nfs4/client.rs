//! High-level NFSv4.1 driver: the named compounds from the protocol
//! engine's common-compounds table, each built from [`CompoundBuilder`] and
//! driven through one [`Session::execute`] round trip.

use super::compound;
use super::session::Session;
use super::types::{Fattr4, NfsFh4, StateId};
use super::MAXNAMLEN;
use crate::error::Error;
use crate::rpc::auth::Credential;
use std::net::SocketAddr;

/// `stable_how4` discriminants, numbered identically to v3's `stable_how`.
pub mod stable {
    pub const UNSTABLE: u32 = 0;
    pub const DATA_SYNC: u32 = 1;
    pub const FILE_SYNC: u32 = 2;
}

pub struct LookupResult {
    pub file: NfsFh4,
    pub attr: Fattr4,
}

pub struct DirEntry {
    pub cookie: u64,
    pub name: String,
    pub attr: Fattr4,
}

/// A connected, OPERATING-state NFSv4.1 client.
pub struct Nfs4Client {
    session: Session,
    root: NfsFh4,
}

impl Nfs4Client {
    /// Establishes the session and fetches the root file handle via
    /// `PUTROOTFH, GETFH`.
    pub async fn connect(
        addr: SocketAddr,
        use_secure_port: bool,
        credential: Credential,
    ) -> Result<Self, Error> {
        let mut session = Session::establish(addr, use_secure_port, credential).await?;
        let mut cursor = session
            .execute(|b| {
                b.put_root_fh().map_err(Error::from)?;
                b.get_fh().map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_GETFH)?;
        let root = compound::decode_getfh_result(cursor.reader())?;
        Ok(Nfs4Client { session, root })
    }

    pub fn root(&self) -> &NfsFh4 {
        &self.root
    }

    /// `DESTROY_SESSION`: `SESSION_ACTIVE` -> `CLIENT_ID`. Consumes the
    /// client since nothing can be issued on a destroyed session.
    pub async fn disconnect(mut self) -> Result<(), Error> {
        self.session.destroy().await
    }

    pub async fn keepalive_if_idle(&mut self) -> Result<(), Error> {
        self.session.keepalive_if_idle().await
    }

    /// SEQUENCE-only compound, issued unconditionally regardless of idle
    /// time — a health check wants a harmless probe
    /// on demand, not the threshold-gated keep-alive.
    pub async fn health_ping(&mut self) -> Result<(), Error> {
        self.session.execute(|_| Ok(())).await?;
        Ok(())
    }

    /// "Lookup path component": `PUTFH(parent), LOOKUP(name), GETFH, GETATTR`.
    pub async fn lookup(&mut self, parent: &NfsFh4, name: &str) -> Result<LookupResult, Error> {
        let name = name.to_string();
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(parent).map_err(Error::from)?;
                b.lookup(&name).map_err(Error::from)?;
                b.get_fh().map_err(Error::from)?;
                b.get_attr().map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_LOOKUP)?;
        expect_op(&mut cursor, super::OP_GETFH)?;
        let file = compound::decode_getfh_result(cursor.reader())?;
        expect_op(&mut cursor, super::OP_GETATTR)?;
        let attr = compound::decode_getattr_result(cursor.reader())?;
        Ok(LookupResult { file, attr })
    }

    /// "Read dir": `PUTFH(dir), ACCESS, READDIR(cookie, verifier)`.
    pub async fn read_dir(
        &mut self,
        dir: &NfsFh4,
        cookie: u64,
        cookie_verifier: u64,
    ) -> Result<(Vec<DirEntry>, u64, bool), Error> {
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(dir).map_err(Error::from)?;
                b.access(0x3f).map_err(Error::from)?;
                b.readdir(cookie, cookie_verifier, 8192, 32768).map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_ACCESS)?;
        skip_access_result(cursor.reader())?;
        expect_op(&mut cursor, super::OP_READDIR)?;
        let result = compound::decode_readdir_result(cursor.reader(), MAXNAMLEN)?;
        let entries = result
            .entries
            .into_iter()
            .map(|e| DirEntry { cookie: e.cookie, name: e.name, attr: e.attr })
            .collect();
        Ok((entries, result.cookie_verifier, result.eof))
    }

    /// Lists an entire directory, driving `read_dir` to `eof`.
    pub async fn list_dir(&mut self, dir: &NfsFh4) -> Result<Vec<DirEntry>, Error> {
        let mut out = Vec::new();
        let mut cookie = 0u64;
        let mut verifier = 0u64;
        loop {
            let (entries, next_verifier, eof) = self.read_dir(dir, cookie, verifier).await?;
            if entries.is_empty() {
                break;
            }
            cookie = entries.last().unwrap().cookie;
            verifier = next_verifier;
            out.extend(entries);
            if eof {
                break;
            }
        }
        Ok(out)
    }

    /// "Rename": `PUTFH(src_dir), SAVEFH, PUTFH(dst_dir), RENAME(old, new)`.
    pub async fn rename(
        &mut self,
        from_dir: &NfsFh4,
        from_name: &str,
        to_dir: &NfsFh4,
        to_name: &str,
    ) -> Result<(), Error> {
        let (from_name, to_name) = (from_name.to_string(), to_name.to_string());
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(from_dir).map_err(Error::from)?;
                b.save_fh().map_err(Error::from)?;
                b.put_fh(to_dir).map_err(Error::from)?;
                b.rename(&from_name, &to_name).map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_SAVEFH)?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_RENAME)?;
        Ok(())
    }

    /// "Remove": `PUTFH(parent), REMOVE(name)`.
    pub async fn remove(&mut self, parent: &NfsFh4, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(parent).map_err(Error::from)?;
                b.remove(&name).map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_REMOVE)?;
        Ok(())
    }

    /// "Hard link": `PUTFH(target), SAVEFH, PUTFH(parent), LINK(name)`.
    pub async fn link(
        &mut self,
        target: &NfsFh4,
        parent: &NfsFh4,
        name: &str,
    ) -> Result<(), Error> {
        let name = name.to_string();
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(target).map_err(Error::from)?;
                b.save_fh().map_err(Error::from)?;
                b.put_fh(parent).map_err(Error::from)?;
                b.link(&name).map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_SAVEFH)?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_LINK)?;
        Ok(())
    }

    /// "Symlink": `PUTFH(parent), CREATE(NF4LNK, linkdata, name, attrs)`.
    pub async fn symlink(
        &mut self,
        parent: &NfsFh4,
        name: &str,
        target: &str,
    ) -> Result<(), Error> {
        let (name, target) = (name.to_string(), target.to_string());
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(parent).map_err(Error::from)?;
                b.create_symlink(&name, &target).map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_CREATE)?;
        Ok(())
    }

    /// "Make directory": `PUTFH(parent), CREATE(NF4DIR, name, attrs)`, the
    /// directory counterpart to [`Self::symlink`].
    pub async fn make_directory(&mut self, parent: &NfsFh4, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(parent).map_err(Error::from)?;
                b.create_directory(&name).map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_CREATE)?;
        Ok(())
    }

    /// "Readlink": `PUTFH(link), READLINK`.
    pub async fn read_link(&mut self, link: &NfsFh4) -> Result<String, Error> {
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(link).map_err(Error::from)?;
                b.readlink().map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_READLINK)?;
        compound::decode_readlink_result(cursor.reader(), 4096)
    }

    /// "Read file": `PUTFH(parent), OPEN(read), SEQUENCE, PUTFH(file),
    /// READ(stateid)`, minus the table's redundant inner `SEQUENCE` — this
    /// client's single-slot model issues it as two back-to-back compounds
    /// instead, each already `SEQUENCE`-framed by [`Session::execute`].
    pub async fn read_file(&mut self, parent: &NfsFh4, name: &str) -> Result<Vec<u8>, Error> {
        let client_id = self.session.client_id();
        let name_owned = name.to_string();
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(parent).map_err(Error::from)?;
                b.open_read(client_id, &name_owned).map_err(Error::from)?;
                b.get_fh().map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_OPEN)?;
        let open_result = compound::decode_open_result(cursor.reader())?;
        expect_op(&mut cursor, super::OP_GETFH)?;
        let file = compound::decode_getfh_result(cursor.reader())?;

        let data = self.read_whole_file(&file, &open_result.stateid).await?;
        self.close(&file, &open_result.stateid).await?;
        Ok(data)
    }

    async fn read_whole_file(
        &mut self,
        file: &NfsFh4,
        stateid: &StateId,
    ) -> Result<Vec<u8>, Error> {
        const CHUNK: u32 = 32 * 1024;
        let mut out = Vec::new();
        let mut offset = 0u64;
        loop {
            let stateid = *stateid;
            let mut cursor = self
                .session
                .execute(move |b| {
                    b.put_fh(file).map_err(Error::from)?;
                    b.read(&stateid, offset, CHUNK).map_err(Error::from).map(|_| ())
                })
                .await?;
            expect_op(&mut cursor, super::OP_PUTFH)?;
            expect_op(&mut cursor, super::OP_READ)?;
            let read = compound::decode_read_result(cursor.reader(), CHUNK as usize)?;
            let n = read.data.len();
            out.extend_from_slice(&read.data);
            offset += n as u64;
            if read.eof || n == 0 {
                break;
            }
        }
        Ok(out)
    }

    /// "Write file": `PUTFH(parent), OPEN(write|create), GETFH, PUTFH(file),
    /// WRITE(stateid)`.
    pub async fn write_file(
        &mut self,
        parent: &NfsFh4,
        name: &str,
        data: &[u8],
    ) -> Result<(), Error> {
        let client_id = self.session.client_id();
        let name_owned = name.to_string();
        let size = data.len() as u64;
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(parent).map_err(Error::from)?;
                b.open_write_create(client_id, &name_owned, size, 0o777)
                    .map_err(Error::from)?;
                b.get_fh().map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_OPEN)?;
        let open_result = compound::decode_open_result(cursor.reader())?;
        expect_op(&mut cursor, super::OP_GETFH)?;
        let file = compound::decode_getfh_result(cursor.reader())?;

        let stateid = open_result.stateid;
        let mut cursor = self
            .session
            .execute(|b| {
                b.put_fh(&file).map_err(Error::from)?;
                b.write(&stateid, 0, stable::FILE_SYNC, data).map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_WRITE)?;
        compound::decode_write_result(cursor.reader())?;

        self.close(&file, &stateid).await
    }

    /// Reads `len` bytes starting at `offset` from an existing file. Unlike
    /// [`Self::read_file`], which always reads start-to-`EOF`, this opens
    /// read-only and stops once `len` bytes are collected or `EOF` is hit.
    pub async fn read_range(
        &mut self,
        parent: &NfsFh4,
        name: &str,
        offset: u64,
        len: u32,
    ) -> Result<Vec<u8>, Error> {
        let client_id = self.session.client_id();
        let name_owned = name.to_string();
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(parent).map_err(Error::from)?;
                b.open_read(client_id, &name_owned).map_err(Error::from)?;
                b.get_fh().map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_OPEN)?;
        let open_result = compound::decode_open_result(cursor.reader())?;
        expect_op(&mut cursor, super::OP_GETFH)?;
        let file = compound::decode_getfh_result(cursor.reader())?;

        let data = self.read_bounded(&file, &open_result.stateid, offset, len).await?;
        self.close(&file, &open_result.stateid).await?;
        Ok(data)
    }

    async fn read_bounded(
        &mut self,
        file: &NfsFh4,
        stateid: &StateId,
        offset: u64,
        len: u32,
    ) -> Result<Vec<u8>, Error> {
        const CHUNK: u32 = 32 * 1024;
        let mut out = Vec::new();
        let mut pos = offset;
        while (out.len() as u64) < len as u64 {
            let want = CHUNK.min(len - out.len() as u32);
            let stateid = *stateid;
            let mut cursor = self
                .session
                .execute(move |b| {
                    b.put_fh(file).map_err(Error::from)?;
                    b.read(&stateid, pos, want).map_err(Error::from).map(|_| ())
                })
                .await?;
            expect_op(&mut cursor, super::OP_PUTFH)?;
            expect_op(&mut cursor, super::OP_READ)?;
            let read = compound::decode_read_result(cursor.reader(), want as usize)?;
            let n = read.data.len();
            out.extend_from_slice(&read.data);
            pos += n as u64;
            if read.eof || n == 0 {
                break;
            }
        }
        Ok(out)
    }

    /// Writes `data` at `offset` into an existing file. Unlike
    /// [`Self::write_file`], which always creates the file and writes from
    /// offset 0, this opens without create and fails if the name is absent.
    pub async fn write_at(
        &mut self,
        parent: &NfsFh4,
        name: &str,
        offset: u64,
        data: &[u8],
    ) -> Result<(), Error> {
        let client_id = self.session.client_id();
        let name_owned = name.to_string();
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(parent).map_err(Error::from)?;
                b.open_write(client_id, &name_owned).map_err(Error::from)?;
                b.get_fh().map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_OPEN)?;
        let open_result = compound::decode_open_result(cursor.reader())?;
        expect_op(&mut cursor, super::OP_GETFH)?;
        let file = compound::decode_getfh_result(cursor.reader())?;

        let stateid = open_result.stateid;
        let mut cursor = self
            .session
            .execute(|b| {
                b.put_fh(&file).map_err(Error::from)?;
                b.write(&stateid, offset, stable::FILE_SYNC, data).map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_WRITE)?;
        compound::decode_write_result(cursor.reader())?;

        self.close(&file, &stateid).await
    }

    /// "Setattr size": `PUTFH(parent), OPEN(write), GETFH, PUTFH(file),
    /// SETATTR(stateid, size), CLOSE` — `OPEN` paired with `CLOSE` within
    /// reach, per the redesign note that every `OPEN` must be closed.
    pub async fn set_file_size(
        &mut self,
        parent: &NfsFh4,
        name: &str,
        size: u64,
    ) -> Result<(), Error> {
        let client_id = self.session.client_id();
        let name_owned = name.to_string();
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(parent).map_err(Error::from)?;
                b.open_write_create(client_id, &name_owned, size, 0o777)
                    .map_err(Error::from)?;
                b.get_fh().map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_OPEN)?;
        let open_result = compound::decode_open_result(cursor.reader())?;
        expect_op(&mut cursor, super::OP_GETFH)?;
        let file = compound::decode_getfh_result(cursor.reader())?;

        let stateid = open_result.stateid;
        let mut cursor = self
            .session
            .execute(|b| {
                b.put_fh(&file).map_err(Error::from)?;
                b.setattr_size(&stateid, size).map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_SETATTR)?;

        self.close(&file, &stateid).await
    }

    async fn close(&mut self, file: &NfsFh4, stateid: &StateId) -> Result<(), Error> {
        let stateid = *stateid;
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(file).map_err(Error::from)?;
                b.close(&stateid).map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_CLOSE)?;
        Ok(())
    }

    pub async fn get_attr(&mut self, file: &NfsFh4) -> Result<Fattr4, Error> {
        let mut cursor = self
            .session
            .execute(move |b| {
                b.put_fh(file).map_err(Error::from)?;
                b.get_attr().map_err(Error::from).map(|_| ())
            })
            .await?;
        expect_op(&mut cursor, super::OP_PUTFH)?;
        expect_op(&mut cursor, super::OP_GETATTR)?;
        compound::decode_getattr_result(cursor.reader())
    }
}

/// Reads one op's `{ opcode, status }` header, asserting it is `opcode` and
/// mapping a non-`NFS4_OK` status to the crate's error taxonomy. Every named
/// compound above is built from a fixed, known op sequence, so a mismatch
/// here means the server reordered or dropped an op this client depends on.
fn expect_op(cursor: &mut compound::CompoundCursor, opcode: u32) -> Result<(), Error> {
    let (got, status) = cursor.op_header()?;
    if got != opcode {
        return Err(Error::CodecFailed("compound reply op sequence did not match request"));
    }
    if let Some(e) = crate::error::from_nfs4_status(status) {
        return Err(e);
    }
    Ok(())
}

fn skip_access_result(r: &mut dyn std::io::Read) -> Result<(), Error> {
    use crate::xdr::decode;
    let _supported = decode::u32(r)?;
    let _access = decode::u32(r)?;
    Ok(())
}
