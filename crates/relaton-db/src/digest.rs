use std::io::{Cursor, Read};

use sha2::{Digest, Sha256};

fn sha256_reader<R: Read>(mut reader: R) -> std::io::Result<Sha256> {
    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher)
}

/// Digest of a cached payload (`sha256:<hex>`).
pub(crate) fn compute_digest(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

/// Short hex fingerprint of a cache key, used to keep path stems unique.
pub(crate) fn key_fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..6])
}

/// Fingerprint a resolver's grammar from its source documents.
///
/// Resolvers return this from `schema_version()` so that any change to the
/// grammar invalidates entries serialized with the previous one. Sources are
/// hashed in the order given.
pub fn grammar_hash<I, R>(sources: I) -> std::io::Result<String>
where
    I: IntoIterator<Item = R>,
    R: Read,
{
    let mut outer = Sha256::new();
    for source in sources {
        let inner = sha256_reader(source)?.finalize();
        outer.update(inner);
    }
    Ok(hex::encode(outer.finalize()))
}

/// [`grammar_hash`] over in-memory grammar texts.
pub fn grammar_hash_str(sources: &[&str]) -> String {
    grammar_hash(sources.iter().map(|s| Cursor::new(s.as_bytes())))
        .expect("hashing in-memory grammar via cursor must not fail")
}
