//! Connection configuration for `NfsClient::connect`.

use serde::{Deserialize, Serialize};

/// Which NFS protocol a [`super::NfsClient`] drives underneath the uniform
/// surface. `V4_1` is the only minor version this crate speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NfsVersion {
    V3,
    V4_1,
}

/// Connection-time options, `Deserialize`/`Serialize` so an embedding
/// application can load them from its own config file the way a CLI binary
/// CLI loads its own settings via `serde` + `toml` — this crate never reads
/// a file itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    pub user_id: u32,
    pub group_id: u32,
    pub timeout_ms: u32,
    pub character_encoding: String,
    pub use_secure_port: bool,
    pub use_handle_cache: bool,
    /// Fixed NFS/MOUNT-equivalent port; `0` asks the portmapper.
    pub nfs_port: u16,
    pub mount_port: u16,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            user_id: 0,
            group_id: 0,
            timeout_ms: 60_000,
            character_encoding: "ASCII".to_string(),
            use_secure_port: true,
            use_handle_cache: false,
            nfs_port: 0,
            mount_port: 0,
        }
    }
}

impl ConnectOptions {
    pub(crate) fn credential(&self, machine_name: &str) -> crate::rpc::auth::Credential {
        crate::rpc::auth::Credential::Sys {
            machine_name: machine_name.to_string(),
            uid: self.user_id,
            gid: self.group_id,
            gids: vec![self.group_id],
        }
    }

    pub(crate) fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_table() {
        let opts = ConnectOptions::default();
        assert_eq!(opts.user_id, 0);
        assert_eq!(opts.group_id, 0);
        assert_eq!(opts.timeout_ms, 60_000);
        assert_eq!(opts.character_encoding, "ASCII");
        assert!(opts.use_secure_port);
        assert!(!opts.use_handle_cache);
        assert_eq!(opts.nfs_port, 0);
        assert_eq!(opts.mount_port, 0);
    }

    #[test]
    fn round_trips_through_toml() {
        let opts = ConnectOptions { user_id: 1000, ..Default::default() };
        let text = toml::to_string(&opts).unwrap();
        let round: ConnectOptions = toml::from_str(&text).unwrap();
        assert_eq!(round.user_id, 1000);
    }
}
