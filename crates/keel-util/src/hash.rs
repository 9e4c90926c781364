//! Hex digests for published files and their checksum sidecars.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_bytes(data: &[u8]) -> String {
    hex::<Sha256>(data)
}

/// The three digests Maven repositories publish as sidecar files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digests {
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

impl Digests {
    pub fn of(data: &[u8]) -> Self {
        Self {
            md5: hex::<Md5>(data),
            sha1: hex::<Sha1>(data),
            sha256: hex::<Sha256>(data),
        }
    }

    /// `(extension, hex)` pairs in the order sidecars are written.
    pub fn sidecars(&self) -> [(&'static str, &str); 3] {
        [
            ("md5", self.md5.as_str()),
            ("sha1", self.sha1.as_str()),
            ("sha256", self.sha256.as_str()),
        ]
    }
}

fn hex<D: Digest>(data: &[u8]) -> String {
    D::digest(data).iter().map(|b| format!("{b:02x}")).collect()
}
