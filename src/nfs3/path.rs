//! Resolves a slash-separated path into a file handle via iterated `LOOKUP`.
//!
//! The v3 protocol has no server-side path resolution (RFC 1813 §3.3.3
//! resolves one component at a time), so anything beyond a single `LOOKUP`
//! is a client-side convenience built on top of it.

use super::client::Nfs3Client;
use super::FileHandle3;
use crate::error::Error;

/// Resolves `path` (e.g. `"a/b/c"`) starting from `root`, issuing one
/// `LOOKUP` per component. An empty path resolves to `root` itself.
pub async fn resolve(
    client: &mut Nfs3Client,
    root: &FileHandle3,
    path: &str,
) -> Result<FileHandle3, Error> {
    let mut current = root.clone();
    for component in path.split('/').filter(|c| !c.is_empty()) {
        let result = client.lookup(&current, component).await?;
        current = result.file;
    }
    Ok(current)
}

/// Resolves all but the last component of `path`, returning the parent
/// directory handle and the final component's name. Used by callers that
/// need the containing directory for `CREATE`/`REMOVE`/`RENAME`-style calls.
pub async fn resolve_parent<'a>(
    client: &mut Nfs3Client,
    root: &FileHandle3,
    path: &'a str,
) -> Result<(FileHandle3, &'a str), Error> {
    let mut components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    let name = components.pop().ok_or(Error::InvalidState("empty path has no parent"))?;
    let mut current = root.clone();
    for component in components {
        let result = client.lookup(&current, component).await?;
        current = result.file;
    }
    Ok((current, name))
}
