//! Version-agnostic attribute record, built
//! from either engine's native attribute type so the façade never leaks
//! `Fattr3`/`Fattr4` across its uniform surface.

use crate::nfs3::{Fattr3, FileType3};
use crate::nfs4::types::{Fattr4, FileType4};

/// `type` field of `NFSAttributes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Regular,
    Directory,
    Symlink,
    Other,
}

/// `NFSPermission`: three fields in `0..=7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permission {
    pub user: u8,
    pub group: u8,
    pub other: u8,
}

impl Permission {
    /// Canonical mode integer: `(user<<6)|(group<<3)|other`.
    pub fn mode(&self) -> u32 {
        ((self.user as u32) << 6) | ((self.group as u32) << 3) | self.other as u32
    }
}

/// `NFSAttributes`: type, permission triple, size, and the three
/// timestamps, independent of which protocol version fetched them.
#[derive(Debug, Clone)]
pub struct Attributes {
    pub file_type: FileType,
    pub permission: Permission,
    pub size: u64,
    pub atime_secs: u64,
    pub mtime_secs: u64,
    /// v3 has no birth/creation time on the wire; this carries `ctime`
    /// instead, the nearest available timestamp (see DESIGN.md's Open
    /// Question decisions).
    pub created_secs: u64,
}

impl Attributes {
    pub fn from_v3(attr: &Fattr3) -> Self {
        let (user, group, other) = attr.permission();
        Attributes {
            file_type: match attr.file_type {
                FileType3::Regular => FileType::Regular,
                FileType3::Directory => FileType::Directory,
                FileType3::Symlink => FileType::Symlink,
                _ => FileType::Other,
            },
            permission: Permission { user, group, other },
            size: attr.size,
            atime_secs: attr.atime.seconds as u64,
            mtime_secs: attr.mtime.seconds as u64,
            created_secs: attr.ctime.seconds as u64,
        }
    }

    pub fn from_v4(attr: &Fattr4) -> Self {
        let (user, group, other) = attr.permission();
        Attributes {
            file_type: match attr.file_type {
                FileType4::Regular => FileType::Regular,
                FileType4::Directory => FileType::Directory,
                FileType4::Symlink => FileType::Symlink,
                FileType4::Other(_) => FileType::Other,
            },
            permission: Permission { user, group, other },
            size: attr.size,
            atime_secs: attr.atime.seconds.max(0) as u64,
            mtime_secs: attr.mtime.seconds.max(0) as u64,
            created_secs: attr.ctime.seconds.max(0) as u64,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.file_type, FileType::Directory)
    }
}
