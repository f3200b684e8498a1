//! BLAKE3 content fingerprints for scanned files

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::str::FromStr;

/// Read buffer used when streaming a file through the hasher
const READ_CHUNK: usize = 64 * 1024;

/// Number of hex characters shown by [`Fingerprint::short`]
const SHORT_LEN: usize = 12;

/// Content fingerprint of a regular file (BLAKE3, 32 bytes)
///
/// Serialized as a 64 character lowercase hex string
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Create a fingerprint from raw digest bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the digest as a byte slice
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to a lowercase hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64 character hex string
    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() != 64 {
            anyhow::bail!("Invalid hex length: expected 64 characters, got {}", hex.len());
        }

        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex, &mut bytes)
            .with_context(|| format!("Invalid fingerprint hex: {}", hex))?;
        Ok(Self(bytes))
    }

    /// Abbreviated hex form for log lines and terminal output
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(SHORT_LEN);
        hex
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl From<Fingerprint> for String {
    fn from(fingerprint: Fingerprint) -> Self {
        fingerprint.to_hex()
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        Self::from_hex(&value)
    }
}

/// Fingerprint an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> Fingerprint {
    let hash = blake3::hash(data);
    Fingerprint::from_bytes(*hash.as_bytes())
}

/// Fingerprint a file by streaming its contents through BLAKE3
///
/// Any I/O failure (missing file, permission denied, read error) is returned
/// as an error carrying the path; callers decide whether it is fatal. A path
/// that is no longer a regular file when opened is an error as well.
pub fn hash_file(path: &Path) -> Result<Fingerprint> {
    let mut file = open_regular(path)?;
    let mut hasher = blake3::Hasher::new();

    let mut buffer = vec![0u8; READ_CHUNK];
    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read: {}", path.display()))
            }
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Fingerprint::from_bytes(*hasher.finalize().as_bytes()))
}

/// Open `path` for reading and check it is still a regular file
///
/// On unix the open is non-blocking, so a FIFO renamed over a listed file
/// fails the type check instead of waiting for a writer.
fn open_regular(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_NONBLOCK);
    }

    let file = options
        .open(path)
        .with_context(|| format!("Failed to open for hashing: {}", path.display()))?;
    let metadata = file
        .metadata()
        .with_context(|| format!("Failed to stat: {}", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("Not a regular file: {}", path.display());
    }
    Ok(file)
}
