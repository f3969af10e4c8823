//! One module per NFSv3 procedure: each owns its `Args`/`Result` wire types
//! and the encode/decode pair for them, client-directional (encode the
//! args, decode the result).

pub mod access;
pub mod commit;
pub mod create;
pub mod fs_info;
pub mod fs_stat;
pub mod get_attr;
pub mod link;
pub mod lookup;
pub mod mkdir;
pub mod path_conf;
pub mod read;
pub mod read_dir;
pub mod read_dir_plus;
pub mod read_link;
pub mod remove;
pub mod rename;
pub mod rmdir;
pub mod set_attr;
pub mod symlink;
pub mod write;
