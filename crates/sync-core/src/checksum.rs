//! Content-digest helpers backing `contentDigest` on `StoredObject` and the
//! `digest-differs` freshness mode. The rsync-style rolling checksum the
//! teacher crate carries for delta transfer has no counterpart here: the
//! planner only ever compares whole-object digests, never sub-file blocks.

use eyre::{bail, Context, Result};
use log::warn;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Algorithm used to compute a `contentDigest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumType {
    Blake3,
    Md5,
}

impl Default for ChecksumType {
    fn default() -> Self {
        Self::Blake3
    }
}

/// Hash a whole file with the given algorithm, producing the bytes stored as
/// a `StoredObject::content_digest`.
pub fn hash_file(path: &Path, ty: ChecksumType) -> Result<Vec<u8>> {
    let mut f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut buf = vec![0u8; 256 * 1024];
    match ty {
        ChecksumType::Blake3 => {
            let mut hasher = blake3::Hasher::new();
            loop {
                let n = f.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
            Ok(hasher.finalize().as_bytes().to_vec())
        }
        ChecksumType::Md5 => {
            warn!("MD5 content digests are for interop only; prefer Blake3");
            let mut ctx = md5::Context::new();
            loop {
                let n = f.read(&mut buf)?;
                if n == 0 {
                    break;
                }
                ctx.consume(&buf[..n]);
            }
            Ok(ctx.compute().to_vec())
        }
    }
}

/// Hash an in-memory buffer, used by the in-memory remote test doubles that
/// stand in for a real object-store response body.
pub fn hash_bytes(data: &[u8], ty: ChecksumType) -> Vec<u8> {
    match ty {
        ChecksumType::Blake3 => blake3::hash(data).as_bytes().to_vec(),
        ChecksumType::Md5 => md5::compute(data).to_vec(),
    }
}

/// Validate that a string names a supported checksum type. Kept separate
/// from `FromStr` so CLI parsing can produce a `ConfigurationError`.
pub fn parse_checksum_type(name: &str) -> Result<ChecksumType> {
    match name {
        "blake3" => Ok(ChecksumType::Blake3),
        "md5" => Ok(ChecksumType::Md5),
        other => bail!("unknown checksum type {other:?}, expected blake3 or md5"),
    }
}
