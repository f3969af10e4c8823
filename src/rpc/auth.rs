//! ONC/RPC authentication flavors: `AUTH_NONE` and `AUTH_SYS` (RFC 5531 §8.2).

use crate::error::Error;
use crate::xdr::{decode, encode};
use std::io::{Read, Write};

const FLAVOR_NONE: u32 = 0;
const FLAVOR_SYS: u32 = 1;

/// `opaque_auth { flavor, body<400> }`.
pub struct OpaqueAuth {
    pub flavor: u32,
    pub body: Vec<u8>,
}

impl OpaqueAuth {
    pub const MAX_BODY_LEN: usize = 400;

    /// The empty `AUTH_NONE` credential/verifier used for calls that don't
    /// authenticate and for every reply verifier this client expects back
    /// under `AUTH_SYS` (the server's verifier is always `AUTH_NONE`).
    pub fn none() -> Self {
        OpaqueAuth { flavor: FLAVOR_NONE, body: Vec::new() }
    }

    /// Builds an `AUTH_SYS` credential: `{ stamp, machine_name, uid, gid, gids }`.
    pub fn sys(stamp: u32, machine_name: &str, uid: u32, gid: u32, gids: &[u32]) -> Self {
        let mut body = Vec::new();
        encode::u32(&mut body, stamp).expect("writing to Vec cannot fail");
        encode::string(&mut body, machine_name).expect("writing to Vec cannot fail");
        encode::u32(&mut body, uid).expect("writing to Vec cannot fail");
        encode::u32(&mut body, gid).expect("writing to Vec cannot fail");
        encode::array(&mut body, gids, |g, w| encode::u32(w, *g)).expect("writing to Vec cannot fail");
        OpaqueAuth { flavor: FLAVOR_SYS, body }
    }

    pub fn encode(&self, dest: &mut dyn Write) -> std::io::Result<()> {
        encode::u32(dest, self.flavor)?;
        encode::opaque_var(dest, &self.body)
    }

    pub fn decode(src: &mut dyn Read) -> Result<Self, Error> {
        let flavor = decode::u32(src)?;
        let body = decode::opaque_var(src, Self::MAX_BODY_LEN)?;
        Ok(OpaqueAuth { flavor, body })
    }

    /// `true` if this is a verifier this client is willing to trust, i.e.
    /// `AUTH_NONE` — the only verifier an `AUTH_SYS` reply is allowed to
    /// carry on the wire.
    pub fn is_auth_none(&self) -> bool {
        self.flavor == FLAVOR_NONE && self.body.is_empty()
    }
}

/// Credential strategy a [`super::client::RpcClient`] stamps onto every call.
#[derive(Clone)]
pub enum Credential {
    None,
    Sys { machine_name: String, uid: u32, gid: u32, gids: Vec<u32> },
}

impl Credential {
    pub fn to_opaque_auth(&self, stamp: u32) -> OpaqueAuth {
        match self {
            Credential::None => OpaqueAuth::none(),
            Credential::Sys { machine_name, uid, gid, gids } => {
                OpaqueAuth::sys(stamp, machine_name, *uid, *gid, gids)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn auth_none_round_trips_empty() {
        let auth = OpaqueAuth::none();
        let mut buf = Vec::new();
        auth.encode(&mut buf).unwrap();
        let round = OpaqueAuth::decode(&mut Cursor::new(buf)).unwrap();
        assert!(round.is_auth_none());
    }

    #[test]
    fn auth_sys_round_trips_fields() {
        let auth = OpaqueAuth::sys(42, "client.example", 1000, 1000, &[1000, 27]);
        let mut buf = Vec::new();
        auth.encode(&mut buf).unwrap();
        let round = OpaqueAuth::decode(&mut Cursor::new(buf)).unwrap();
        assert_eq!(round.flavor, FLAVOR_SYS);

        let mut body = Cursor::new(round.body);
        assert_eq!(decode::u32(&mut body).unwrap(), 42);
        assert_eq!(decode::string(&mut body, 255).unwrap(), "client.example");
        assert_eq!(decode::u32(&mut body).unwrap(), 1000);
        assert_eq!(decode::u32(&mut body).unwrap(), 1000);
        let gids = decode::array(&mut body, 16, |r| decode::u32(r)).unwrap();
        assert_eq!(gids, vec![1000, 27]);
    }
}
