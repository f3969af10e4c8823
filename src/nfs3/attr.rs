//! NFSv3 attribute types (RFC 1813 §2.3.3, §2.6, §3.3.2).

use crate::error::Error;
use crate::xdr::{decode, encode};
use std::io::{Read, Write};

/// `ftype3`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FileType3 {
    Regular,
    Directory,
    BlockDevice,
    CharDevice,
    Symlink,
    Socket,
    Fifo,
}

impl FileType3 {
    fn from_wire(v: u32) -> Result<Self, Error> {
        Ok(match v {
            1 => FileType3::Regular,
            2 => FileType3::Directory,
            3 => FileType3::BlockDevice,
            4 => FileType3::CharDevice,
            5 => FileType3::Symlink,
            6 => FileType3::Socket,
            7 => FileType3::Fifo,
            _ => return Err(Error::CodecFailed("unknown ftype3 discriminant")),
        })
    }

    fn to_wire(self) -> u32 {
        match self {
            FileType3::Regular => 1,
            FileType3::Directory => 2,
            FileType3::BlockDevice => 3,
            FileType3::CharDevice => 4,
            FileType3::Symlink => 5,
            FileType3::Socket => 6,
            FileType3::Fifo => 7,
        }
    }
}

/// `specdata3`: major/minor device numbers for block/char special files.
#[derive(Debug, Copy, Clone)]
pub struct SpecData3 {
    pub specdata1: u32,
    pub specdata2: u32,
}

/// `nfstime3`: seconds and nanoseconds since the epoch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NfsTime3 {
    pub seconds: u32,
    pub nseconds: u32,
}

impl NfsTime3 {
    pub fn decode(src: &mut dyn Read) -> Result<Self, Error> {
        Ok(NfsTime3 { seconds: decode::u32(src)?, nseconds: decode::u32(src)? })
    }

    pub fn encode(&self, dest: &mut dyn Write) -> std::io::Result<()> {
        encode::u32(dest, self.seconds)?;
        encode::u32(dest, self.nseconds)
    }
}

/// `fattr3`: full attributes returned by `GETATTR` and as post-op attrs
/// elsewhere.
#[derive(Debug, Clone)]
pub struct Fattr3 {
    pub file_type: FileType3,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub used: u64,
    pub rdev: SpecData3,
    pub fsid: u64,
    pub fileid: u64,
    pub atime: NfsTime3,
    pub mtime: NfsTime3,
    pub ctime: NfsTime3,
}

impl Fattr3 {
    pub fn decode(src: &mut dyn Read) -> Result<Self, Error> {
        let file_type = FileType3::from_wire(decode::u32(src)?)?;
        let mode = decode::u32(src)?;
        let nlink = decode::u32(src)?;
        let uid = decode::u32(src)?;
        let gid = decode::u32(src)?;
        let size = decode::u64(src)?;
        let used = decode::u64(src)?;
        let rdev = SpecData3 { specdata1: decode::u32(src)?, specdata2: decode::u32(src)? };
        let fsid = decode::u64(src)?;
        let fileid = decode::u64(src)?;
        let atime = NfsTime3::decode(src)?;
        let mtime = NfsTime3::decode(src)?;
        let ctime = NfsTime3::decode(src)?;
        Ok(Fattr3 {
            file_type,
            mode,
            nlink,
            uid,
            gid,
            size,
            used,
            rdev,
            fsid,
            fileid,
            atime,
            mtime,
            ctime,
        })
    }

    /// Permission triple `(user, group, other)`, derived from the low
    /// 9 bits of `mode`.
    pub fn permission(&self) -> (u8, u8, u8) {
        (((self.mode >> 6) & 0o7) as u8, ((self.mode >> 3) & 0o7) as u8, (self.mode & 0o7) as u8)
    }
}

/// Decodes an optional `post_op_attr`.
pub fn decode_post_op_attr(src: &mut dyn Read) -> Result<Option<Fattr3>, Error> {
    decode::option(src, |r| Fattr3::decode(r))
}

/// `wcc_attr`: the subset of attributes needed for weak cache consistency.
#[derive(Debug, Copy, Clone)]
pub struct WccAttr {
    pub size: u64,
    pub mtime: NfsTime3,
    pub ctime: NfsTime3,
}

impl WccAttr {
    pub fn decode(src: &mut dyn Read) -> Result<Self, Error> {
        Ok(WccAttr { size: decode::u64(src)?, mtime: NfsTime3::decode(src)?, ctime: NfsTime3::decode(src)? })
    }
}

/// `wcc_data`: before/after attributes bracketing a mutating call, used to
/// refresh the cache without an extra `GETATTR` round trip.
#[derive(Debug, Clone)]
pub struct WccData {
    pub before: Option<WccAttr>,
    pub after: Option<Fattr3>,
}

impl WccData {
    pub fn decode(src: &mut dyn Read) -> Result<Self, Error> {
        let before = decode::option(src, WccAttr::decode)?;
        let after = decode_post_op_attr(src)?;
        Ok(WccData { before, after })
    }
}

/// Strategy for a `sattr3` time field: leave as-is, set to the server's
/// clock, or set to a client-supplied value.
#[derive(Debug, Copy, Clone)]
pub enum SetTime {
    DontChange,
    SetToServerTime,
    SetToClientTime(NfsTime3),
}

impl SetTime {
    fn encode(&self, dest: &mut dyn Write) -> std::io::Result<()> {
        match self {
            SetTime::DontChange => encode::u32(dest, 0),
            SetTime::SetToServerTime => encode::u32(dest, 1),
            SetTime::SetToClientTime(t) => {
                encode::u32(dest, 2)?;
                t.encode(dest)
            }
        }
    }
}

/// `sattr3`: attributes a caller may set via `SETATTR` or supply at
/// `CREATE`/`MKDIR` time. Every field is optional on the wire.
#[derive(Debug, Clone, Default)]
pub struct Sattr3 {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime: Option<SetTime>,
    pub mtime: Option<SetTime>,
}

impl Sattr3 {
    /// A `sattr3` that only sets `size`, used by `SetFileSize`.
    pub fn size_only(size: u64) -> Self {
        Sattr3 { size: Some(size), ..Default::default() }
    }

    pub fn encode(&self, dest: &mut dyn Write) -> std::io::Result<()> {
        encode::option(dest, &self.mode, |v, w| encode::u32(w, *v))?;
        encode::option(dest, &self.uid, |v, w| encode::u32(w, *v))?;
        encode::option(dest, &self.gid, |v, w| encode::u32(w, *v))?;
        encode::option(dest, &self.size, |v, w| encode::u64(w, *v))?;
        match &self.atime {
            Some(t) => t.encode(dest)?,
            None => SetTime::DontChange.encode(dest)?,
        }
        match &self.mtime {
            Some(t) => t.encode(dest)?,
            None => SetTime::DontChange.encode(dest)?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn fattr3_round_trips_through_decode() {
        let mut buf = Vec::new();
        encode::u32(&mut buf, 2).unwrap(); // Directory
        encode::u32(&mut buf, 0o755).unwrap();
        encode::u32(&mut buf, 2).unwrap();
        encode::u32(&mut buf, 1000).unwrap();
        encode::u32(&mut buf, 1000).unwrap();
        encode::u64(&mut buf, 4096).unwrap();
        encode::u64(&mut buf, 4096).unwrap();
        encode::u32(&mut buf, 0).unwrap();
        encode::u32(&mut buf, 0).unwrap();
        encode::u64(&mut buf, 1).unwrap();
        encode::u64(&mut buf, 2).unwrap();
        NfsTime3 { seconds: 1, nseconds: 0 }.encode(&mut buf).unwrap();
        NfsTime3 { seconds: 2, nseconds: 0 }.encode(&mut buf).unwrap();
        NfsTime3 { seconds: 3, nseconds: 0 }.encode(&mut buf).unwrap();

        let attr = Fattr3::decode(&mut Cursor::new(buf)).unwrap();
        assert_eq!(attr.file_type, FileType3::Directory);
        assert_eq!(attr.permission(), (7, 5, 5));
        assert_eq!(attr.size, 4096);
    }

    #[test]
    fn sattr3_size_only_sets_nothing_else() {
        let sattr = Sattr3::size_only(42);
        let mut buf = Vec::new();
        sattr.encode(&mut buf).unwrap();

        let mut cursor = Cursor::new(buf);
        assert_eq!(decode::boolean(&mut cursor).unwrap(), false); // mode
        assert_eq!(decode::boolean(&mut cursor).unwrap(), false); // uid
        assert_eq!(decode::boolean(&mut cursor).unwrap(), false); // gid
        assert_eq!(decode::boolean(&mut cursor).unwrap(), true); // size
        assert_eq!(decode::u64(&mut cursor).unwrap(), 42);
        assert_eq!(decode::u32(&mut cursor).unwrap(), 0); // atime DONT_CHANGE
        assert_eq!(decode::u32(&mut cursor).unwrap(), 0); // mtime DONT_CHANGE
    }
}
